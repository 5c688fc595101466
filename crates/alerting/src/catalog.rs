//! Built-in alert condition vocabulary.
//!
//! Option tables offered by the alert rule editor, and the definition of the
//! `query` part every condition starts from.

use serde::Serialize;

use crate::query_part::{ParamType, QueryPartDef, QueryPartParamSpec};

/// Reducer applied when a condition does not name one.
pub const DEFAULT_REDUCER: &str = "avg";

/// One entry of a select dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub text: &'static str,
    pub value: &'static str,
}

const fn opt(text: &'static str, value: &'static str) -> SelectOption {
    SelectOption { text, value }
}

pub const CONDITION_TYPES: &[SelectOption] = &[opt("Query", "query")];

pub const EVAL_FUNCTIONS: &[SelectOption] = &[
    opt("IS ABOVE", "gt"),
    opt("IS BELOW", "lt"),
    opt("IS OUTSIDE RANGE", "outside_range"),
    opt("IS WITHIN RANGE", "within_range"),
    opt("HAS NO VALUE", "no_value"),
];

pub const EVAL_OPERATORS: &[SelectOption] = &[opt("OR", "or"), opt("AND", "and")];

pub const REDUCER_TYPES: &[SelectOption] = &[
    opt("avg()", "avg"),
    opt("min()", "min"),
    opt("max()", "max"),
    opt("sum()", "sum"),
    opt("count()", "count"),
    opt("last()", "last"),
    opt("median()", "median"),
    opt("diff()", "diff"),
    opt("percent_diff()", "percent_diff"),
    opt("count_non_null()", "count_non_null"),
];

pub const NO_DATA_MODES: &[SelectOption] = &[
    opt("Alerting", "alerting"),
    opt("No Data", "no_data"),
    opt("Keep Last State", "keep_state"),
    opt("Ok", "ok"),
];

pub const EXECUTION_ERROR_MODES: &[SelectOption] =
    &[opt("Alerting", "alerting"), opt("Keep Last State", "keep_state")];

/// Whether `value` appears in `options`.
#[must_use]
pub fn contains(options: &[SelectOption], value: &str) -> bool {
    options.iter().any(|o| o.value == value)
}

/// Display text for `value`, if listed.
#[must_use]
pub fn text_for(options: &[SelectOption], value: &str) -> Option<&'static str> {
    options.iter().find(|o| o.value == value).map(|o| o.text)
}

#[must_use]
pub fn is_reducer(part_type: &str) -> bool {
    contains(REDUCER_TYPES, part_type)
}

/// Definition of the `query` part: which query, and over what time range.
#[must_use]
pub fn alert_query_def() -> QueryPartDef {
    let params = vec![
        QueryPartParamSpec::new("queryRefId", ParamType::String).with_dynamic_lookup(),
        QueryPartParamSpec::new("from", ParamType::String)
            .with_options(["10s", "1m", "5m", "10m", "15m", "1h", "24h", "48h"]),
        QueryPartParamSpec::new("to", ParamType::String)
            .with_options(["now", "now-1m", "now-5m", "now-10m", "now-1h"]),
    ];
    let defaults = Vec::from(["#A", "15m", "now"].map(String::from));

    QueryPartDef::builtin("query", params, defaults)
}
