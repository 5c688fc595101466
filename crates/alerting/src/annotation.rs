//! Alert annotation payloads and their one-line summaries.
//!
//! Annotations written by the alerting engine carry a free-form `data` field
//! that has changed shape over time:
//!
//! 1. a bare list of eval matches (oldest format),
//! 2. an object wrapping the list as `evalMatches`,
//! 3. an object carrying an `error` message,
//! 4. anything else, which summarises to an empty string.
//!
//! [`AnnotationPayload::resolve`] picks the first shape that fits, in that
//! order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::matches::render_eval_matches;

/// Separator used between matches in annotation summaries.
pub const DEFAULT_MATCH_SEPARATOR: &str = ", ";

/// An annotation record as returned by the annotations API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_state: Option<String>,
    /// Epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl Annotation {
    /// Wrap a raw `data` payload.
    #[must_use]
    pub fn with_data(data: Value) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// Resolve the shape of this annotation's `data`.
    #[must_use]
    pub fn payload(&self) -> AnnotationPayload<'_> {
        AnnotationPayload::resolve(&self.data)
    }

    /// Summary line using `separator` between matches.
    #[must_use]
    pub fn summary_with(&self, separator: &str) -> String {
        self.payload().summary(separator)
    }
}

/// The recognised shapes of an annotation's `data` field.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationPayload<'a> {
    /// `data` is itself the list of matches
    MatchList(&'a [Value]),
    /// `data.evalMatches` holds the list of matches
    MatchesWrapper(&'a [Value]),
    /// `data.error` holds a non-empty error
    ErrorPayload(String),
    /// None of the above
    Empty,
}

impl<'a> AnnotationPayload<'a> {
    /// Classify `data` by shape, first match wins.
    #[must_use]
    pub fn resolve(data: &'a Value) -> Self {
        let payload = if let Value::Array(list) = data {
            Self::MatchList(list)
        } else if let Some(Value::Array(list)) = data.get("evalMatches") {
            Self::MatchesWrapper(list)
        } else if let Some(message) = data.get("error").and_then(error_text) {
            Self::ErrorPayload(message)
        } else {
            Self::Empty
        };

        debug!(shape = payload.shape(), "Resolved annotation payload");
        payload
    }

    /// Short name of the resolved shape, for logging.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::MatchList(_) => "match_list",
            Self::MatchesWrapper(_) => "matches_wrapper",
            Self::ErrorPayload(_) => "error",
            Self::Empty => "empty",
        }
    }

    /// Render the payload as a single display line.
    #[must_use]
    pub fn summary(&self, separator: &str) -> String {
        match self {
            Self::MatchList(list) | Self::MatchesWrapper(list) => {
                render_eval_matches(list, separator)
            }
            Self::ErrorPayload(message) => format!("Error: {message}"),
            Self::Empty => String::new(),
        }
    }
}

/// Text of an `error` field, or `None` when it is empty, false, zero or null.
fn error_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

/// One-line summary of an alert annotation.
#[must_use]
pub fn get_annotation_summary(annotation: &Annotation) -> String {
    annotation.summary_with(DEFAULT_MATCH_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn summary(data: Value) -> String {
        get_annotation_summary(&Annotation::with_data(data))
    }

    #[test]
    fn test_each_shape() {
        assert_eq!(summary(json!([{"metric": "a", "value": 1}])), "a=1");
        assert_eq!(
            summary(json!({"evalMatches": [{"metric": "a", "value": 1}]})),
            "a=1"
        );
        assert_eq!(summary(json!({"error": "timeout"})), "Error: timeout");
        assert_eq!(summary(json!({})), "");
    }

    #[test]
    fn test_priority_order() {
        let data = json!({"evalMatches": [{"Metric": "m", "Value": 2}], "error": "ignored"});
        let annotation = Annotation::with_data(data);
        assert_eq!(annotation.payload().shape(), "matches_wrapper");
        assert_eq!(get_annotation_summary(&annotation), "m=2");
    }

    #[test]
    fn test_falsy_errors_are_empty() {
        assert_eq!(summary(json!({"error": ""})), "");
        assert_eq!(summary(json!({"error": null})), "");
        assert_eq!(summary(json!({"error": false})), "");
        assert_eq!(summary(json!({"error": 0})), "");
        assert_eq!(summary(json!({"error": 504})), "Error: 504");
    }

    #[test]
    fn test_missing_or_scalar_data() {
        assert_eq!(summary(Value::Null), "");
        assert_eq!(summary(json!("text")), "");
        assert_eq!(summary(json!({"evalMatches": "nope"})), "");
    }

    #[test]
    fn test_deserialize_api_record() {
        let annotation: Annotation = serde_json::from_value(json!({
            "id": 7,
            "alertId": 3,
            "newState": "alerting",
            "time": 1_546_300_800_000_i64,
            "data": {"evalMatches": [{"metric": "cpu", "value": 97.5}]}
        }))
        .unwrap();

        assert_eq!(annotation.alert_id, Some(3));
        assert_eq!(annotation.new_state.as_deref(), Some("alerting"));
        assert_eq!(annotation.summary_with(" | "), "cpu=97.5");
    }
}
