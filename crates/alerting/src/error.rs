//! Error types for the alerting model.

use serde::Serialize;
use thiserror::Error;

use crate::query_part::ParamType;

/// An alert state token outside the known set.
///
/// Raised instead of falling back to a default rendering so that a new or
/// misspelled backend state is visible at the UI boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown alert state: {state}")]
pub struct UnknownStateError {
    /// The offending token, as received.
    pub state: String,
}

impl UnknownStateError {
    #[must_use]
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
        }
    }
}

/// Errors building a query part definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// Default values must line up with the parameter specs
    #[error("Part '{part_type}' declares {params} params but {defaults} defaults")]
    DefaultArity {
        part_type: String,
        params: usize,
        defaults: usize,
    },

    /// Part type is blank
    #[error("Part type must not be empty")]
    EmptyType,
}

/// A sort policy name outside `last`, `first` and `reject`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown sort policy '{0}', expected last, first or reject")]
pub struct UnknownPolicyError(pub String);

/// Errors editing a bound query part.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryPartError {
    /// Edit targets a position past both the bound values and the definition
    #[error("Parameter index {index} out of range for part '{part_type}' ({arity} params)")]
    ParamIndexOutOfRange {
        part_type: String,
        index: usize,
        arity: usize,
    },
}

/// A problem found when checking a part's values against its definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// Value is empty
    #[error("param {index} ({name}) is empty")]
    Missing { index: usize, name: String },

    /// Value is not one of the param's static options
    #[error("param {index} ({name}): '{value}' is not an allowed option")]
    NotAnOption {
        index: usize,
        name: String,
        value: String,
    },

    /// Value does not parse as the param's type
    #[error("param {index} ({name}): '{value}' is not a valid {expected}")]
    WrongType {
        index: usize,
        name: String,
        value: String,
        expected: ParamType,
    },

    /// Value is not among the candidates of a dynamic-lookup param
    #[error("param {index} ({name}): '{value}' does not match any query")]
    UnresolvedReference {
        index: usize,
        name: String,
        value: String,
    },

    /// Value has no param spec in the definition
    #[error("param {index}: unexpected value '{value}'")]
    Unexpected { index: usize, value: String },
}

/// Errors loading the model configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML for this schema
    #[error("Failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Environment override holds an unusable value
    #[error("Invalid value '{value}' for {var}: {source}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        #[source]
        source: UnknownPolicyError,
    },

    /// Config parsed but a field is out of bounds
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;
