//! Evaluation matches captured when an alert condition fired.
//!
//! Matches arrive as loosely-typed JSON records in one of two field-naming
//! schemes: the current `{metric, value}` and the legacy `{Metric, Value}`.
//! Each record is resolved to an [`EvalMatch`] by shape; records satisfying
//! neither scheme are dropped rather than failing the whole list.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Field-naming scheme a match record was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSchema {
    /// `{ "metric": .., "value": .. }`
    Current,
    /// `{ "Metric": .., "Value": .. }`
    Legacy,
}

impl MatchSchema {
    const fn keys(self) -> (&'static str, &'static str) {
        match self {
            Self::Current => ("metric", "value"),
            Self::Legacy => ("Metric", "Value"),
        }
    }
}

/// A match value as reported, kept in its original form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MatchValue {
    Number(f64),
    /// Strings verbatim; booleans, objects and arrays as their JSON text
    Text(String),
    Null,
}

impl MatchValue {
    fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Number(n) => n
                .as_f64()
                .map_or_else(|| Self::Text(n.to_string()), Self::Number),
            Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl fmt::Display for MatchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => f.write_str(&format_number(*v)),
            Self::Text(s) => f.write_str(s),
            Self::Null => f.write_str("null"),
        }
    }
}

/// One (metric, value) pair from an alert evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalMatch {
    pub metric: String,
    pub value: MatchValue,
    #[serde(skip)]
    pub schema: MatchSchema,
}

impl EvalMatch {
    #[must_use]
    pub fn new(metric: impl Into<String>, value: f64) -> Self {
        Self {
            metric: metric.into(),
            value: MatchValue::Number(value),
            schema: MatchSchema::Current,
        }
    }

    /// Resolve a raw record, trying the current scheme before the legacy one.
    ///
    /// Returns `None` when neither scheme has both fields present.
    #[must_use]
    pub fn from_value(record: &Value) -> Option<Self> {
        let fields = record.as_object()?;
        [MatchSchema::Current, MatchSchema::Legacy]
            .into_iter()
            .find_map(|schema| Self::from_fields(fields, schema))
    }

    fn from_fields(fields: &Map<String, Value>, schema: MatchSchema) -> Option<Self> {
        let (metric_key, value_key) = schema.keys();
        let metric = match fields.get(metric_key)? {
            Value::Null => return None,
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let value = MatchValue::from_json(fields.get(value_key)?);

        Some(Self {
            metric,
            value,
            schema,
        })
    }

    /// `metric=value`, with whole numbers printed without a fraction.
    #[must_use]
    pub fn render(&self) -> String {
        format!("{}={}", self.metric, self.value)
    }
}

/// Print a number the way the alert views do: whole numbers without a
/// fraction.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
pub fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 9_007_199_254_740_992.0 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Resolve every record in `records`, skipping malformed ones.
#[must_use]
pub fn parse_eval_matches(records: &[Value]) -> Vec<EvalMatch> {
    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let parsed = EvalMatch::from_value(record);
            if parsed.is_none() {
                debug!(index, "Skipping eval match with no recognised fields");
            }
            parsed
        })
        .collect()
}

/// Join resolved matches as `m1=v1<sep>m2=v2...`, preserving order.
#[must_use]
pub fn join_eval_matches(matches: &[EvalMatch], separator: &str) -> String {
    matches
        .iter()
        .map(EvalMatch::render)
        .collect::<Vec<_>>()
        .join(separator)
}

/// Render raw match records, accepting either naming scheme per record.
#[must_use]
pub fn render_eval_matches(records: &[Value], separator: &str) -> String {
    join_eval_matches(&parse_eval_matches(records), separator)
}
