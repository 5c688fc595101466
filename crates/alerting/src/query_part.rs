//! Typed, parameterised query parts.
//!
//! A [`QueryPartDef`] declares a part type, its parameter specs and one
//! default per parameter. A [`QueryPart`] binds a definition to the values
//! the user is editing. Binding never fails; checking the values against the
//! specs is a separate [`QueryPart::validate`] step so that half-edited parts
//! can still be rendered.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DefinitionError, QueryPartError, ValidationError};

/// Relative time spans such as `10s`, `5m`, `24h` or `now-1h`.
static INTERVAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(now(-\d+(ms|s|m|h|d|w|M|y))?|\d+(ms|s|m|h|d|w|M|y))$")
        .expect("interval pattern is valid")
});

/// Value type of a part parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    Int,
    Interval,
}

impl ParamType {
    fn accepts(self, value: &str) -> bool {
        match self {
            Self::String => true,
            Self::Int => value.parse::<i64>().is_ok(),
            Self::Interval => INTERVAL_RE.is_match(value),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "string",
            Self::Int => "integer",
            Self::Interval => "interval",
        })
    }
}

/// One parameter of a part definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPartParamSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub param_type: ParamType,
    /// Allowed literal values, in display order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Candidates come from a live provider rather than `options`
    #[serde(default)]
    pub dynamic_lookup: bool,
}

impl QueryPartParamSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            options: None,
            dynamic_lookup: false,
        }
    }

    #[must_use]
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub const fn with_dynamic_lookup(mut self) -> Self {
        self.dynamic_lookup = true;
        self
    }

    /// Static candidates for this parameter.
    ///
    /// Returns `None` for dynamic-lookup params; their candidates must come
    /// from a [`DynamicOptions`] provider.
    #[must_use]
    pub fn list_static_options(&self) -> Option<&[String]> {
        if self.dynamic_lookup {
            None
        } else {
            self.options.as_deref()
        }
    }
}

/// Free-function form of [`QueryPartParamSpec::list_static_options`].
#[must_use]
pub fn list_static_options(spec: &QueryPartParamSpec) -> Option<&[String]> {
    spec.list_static_options()
}

/// Resolves candidates for dynamic-lookup params from live context.
pub trait DynamicOptions {
    /// Candidate values for `param` of a part of type `part_type`.
    fn resolve(&self, part_type: &str, param: &QueryPartParamSpec) -> Vec<String>;
}

/// Query reference IDs currently defined on the panel (`A`, `B`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRefIds(pub Vec<String>);

impl DynamicOptions for QueryRefIds {
    fn resolve(&self, _part_type: &str, _param: &QueryPartParamSpec) -> Vec<String> {
        self.0.clone()
    }
}

/// Candidate values for `spec`: its static options, or the provider's.
#[must_use]
pub fn candidate_options(
    part_type: &str,
    spec: &QueryPartParamSpec,
    provider: &dyn DynamicOptions,
) -> Vec<String> {
    if spec.dynamic_lookup {
        provider.resolve(part_type, spec)
    } else {
        spec.options.clone().unwrap_or_default()
    }
}

/// Declarative definition of a query part. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQueryPartDef", rename_all = "camelCase")]
pub struct QueryPartDef {
    #[serde(rename = "type")]
    part_type: String,
    params: Vec<QueryPartParamSpec>,
    default_params: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQueryPartDef {
    #[serde(rename = "type")]
    part_type: String,
    #[serde(default)]
    params: Vec<QueryPartParamSpec>,
    #[serde(default)]
    default_params: Vec<String>,
}

impl TryFrom<RawQueryPartDef> for QueryPartDef {
    type Error = DefinitionError;

    fn try_from(raw: RawQueryPartDef) -> Result<Self, Self::Error> {
        Self::new(raw.part_type, raw.params, raw.default_params)
    }
}

impl QueryPartDef {
    /// Build a definition.
    ///
    /// # Errors
    ///
    /// Fails when `part_type` is blank or when `default_params` does not
    /// hold exactly one value per param.
    pub fn new(
        part_type: impl Into<String>,
        params: Vec<QueryPartParamSpec>,
        default_params: Vec<String>,
    ) -> Result<Self, DefinitionError> {
        let part_type = part_type.into();
        if part_type.trim().is_empty() {
            return Err(DefinitionError::EmptyType);
        }
        if params.len() != default_params.len() {
            return Err(DefinitionError::DefaultArity {
                part_type,
                params: params.len(),
                defaults: default_params.len(),
            });
        }

        Ok(Self {
            part_type,
            params,
            default_params,
        })
    }

    /// Definitions whose arity is fixed in source.
    pub(crate) fn builtin(
        part_type: &str,
        params: Vec<QueryPartParamSpec>,
        default_params: Vec<String>,
    ) -> Self {
        debug_assert_eq!(params.len(), default_params.len());
        Self {
            part_type: part_type.to_string(),
            params,
            default_params,
        }
    }

    /// A parameterless definition, as used for reducers.
    #[must_use]
    pub fn parameterless(part_type: impl Into<String>) -> Self {
        Self {
            part_type: part_type.into(),
            params: Vec::new(),
            default_params: Vec::new(),
        }
    }

    #[must_use]
    pub fn part_type(&self) -> &str {
        &self.part_type
    }

    #[must_use]
    pub fn params(&self) -> &[QueryPartParamSpec] {
        &self.params
    }

    #[must_use]
    pub fn default_params(&self) -> &[String] {
        &self.default_params
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Overlay `raw` onto `defaults` by index.
///
/// The result has `max(raw.len(), defaults.len())` entries. Values past the
/// end of `defaults` are kept as given; [`QueryPart::validate`] reports them.
#[must_use]
pub fn merge(raw: &[String], defaults: &[String]) -> Vec<String> {
    let len = raw.len().max(defaults.len());
    (0..len)
        .map(|i| raw.get(i).or_else(|| defaults.get(i)).cloned().unwrap_or_default())
        .collect()
}

/// Serialisable form of a part: its type and bound values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPartModel {
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(default)]
    pub params: Vec<String>,
}

impl QueryPartModel {
    #[must_use]
    pub fn new(part_type: impl Into<String>) -> Self {
        Self {
            part_type: part_type.into(),
            params: Vec::new(),
        }
    }
}

/// A definition bound to the values currently being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPart {
    def: QueryPartDef,
    params: Vec<String>,
}

impl QueryPart {
    /// Bind `raw` onto `def`, filling missing trailing values from the
    /// definition's defaults.
    #[must_use]
    pub fn new(def: QueryPartDef, raw: &[String]) -> Self {
        let params = merge(raw, &def.default_params);
        Self { def, params }
    }

    /// Bind a serialised model onto `def`. The model's type is ignored.
    #[must_use]
    pub fn from_model(def: QueryPartDef, model: &QueryPartModel) -> Self {
        Self::new(def, &model.params)
    }

    #[must_use]
    pub fn def(&self) -> &QueryPartDef {
        &self.def
    }

    #[must_use]
    pub fn part_type(&self) -> &str {
        &self.def.part_type
    }

    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Set the value at `index`.
    ///
    /// Editing a defined param that has no bound value yet pads the gap with
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`QueryPartError::ParamIndexOutOfRange`] when `index` is past
    /// both the bound values and the definition's params.
    pub fn update_param(&mut self, index: usize, value: impl Into<String>) -> Result<(), QueryPartError> {
        let limit = self.params.len().max(self.def.arity());
        if index >= limit {
            return Err(QueryPartError::ParamIndexOutOfRange {
                part_type: self.def.part_type.clone(),
                index,
                arity: self.def.arity(),
            });
        }

        while self.params.len() <= index {
            let next = self.params.len();
            self.params
                .push(self.def.default_params.get(next).cloned().unwrap_or_default());
        }
        self.params[index] = value.into();
        Ok(())
    }

    /// `type(p1, p2, ...)`
    #[must_use]
    pub fn render(&self) -> String {
        format!("{}({})", self.def.part_type, self.params.join(", "))
    }

    /// Serialisable form for the query serialiser.
    #[must_use]
    pub fn to_model(&self) -> QueryPartModel {
        QueryPartModel {
            part_type: self.def.part_type.clone(),
            params: self.params.clone(),
        }
    }

    /// Check bound values against the definition's specs.
    ///
    /// Dynamic-lookup params are only checked for presence; use
    /// [`QueryPart::validate_with`] to check them against live candidates.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationError> {
        self.check(None)
    }

    /// Like [`QueryPart::validate`], also resolving dynamic-lookup params
    /// through `provider`.
    #[must_use]
    pub fn validate_with(&self, provider: &dyn DynamicOptions) -> Vec<ValidationError> {
        self.check(Some(provider))
    }

    fn check(&self, provider: Option<&dyn DynamicOptions>) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (index, value) in self.params.iter().enumerate() {
            let Some(spec) = self.def.params.get(index) else {
                errors.push(ValidationError::Unexpected {
                    index,
                    value: value.clone(),
                });
                continue;
            };

            if value.is_empty() {
                errors.push(ValidationError::Missing {
                    index,
                    name: spec.name.clone(),
                });
                continue;
            }

            if spec.dynamic_lookup {
                if let Some(provider) = provider {
                    let candidates = provider.resolve(&self.def.part_type, spec);
                    if !candidates.iter().any(|c| refers_to(value, c)) {
                        errors.push(ValidationError::UnresolvedReference {
                            index,
                            name: spec.name.clone(),
                            value: value.clone(),
                        });
                    }
                }
                continue;
            }

            if let Some(options) = &spec.options {
                if !options.contains(value) {
                    errors.push(ValidationError::NotAnOption {
                        index,
                        name: spec.name.clone(),
                        value: value.clone(),
                    });
                    continue;
                }
            }

            if !spec.param_type.accepts(value) {
                errors.push(ValidationError::WrongType {
                    index,
                    name: spec.name.clone(),
                    value: value.clone(),
                    expected: spec.param_type,
                });
            }
        }

        errors
    }
}

/// Query references may be written bare (`A`) or with the `#` marker (`#A`).
fn refers_to(value: &str, candidate: &str) -> bool {
    value.strip_prefix('#').unwrap_or(value) == candidate.strip_prefix('#').unwrap_or(candidate)
}

impl fmt::Display for QueryPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Build a parameterless part of the model's type.
///
/// Reducers carry no configurable params in this model; any values in
/// `model.params` are bound as given and reported by `validate`.
#[must_use]
pub fn create_reducer_part(model: &QueryPartModel) -> QueryPart {
    QueryPart::from_model(QueryPartDef::parameterless(&model.part_type), model)
}
