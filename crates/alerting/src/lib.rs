//! Alert state classification and query part model.
//!
//! This crate holds the pure, synchronous model behind the dashboard's
//! alerting views. It does no I/O of its own; callers fetch rules and
//! annotations over HTTP and hand the records in.
//!
//! # Usage
//!
//! ```
//! use alerting::{get_state_display_model, render_eval_matches, QueryPart};
//! use alerting::catalog::alert_query_def;
//! use serde_json::json;
//!
//! let display = get_state_display_model("alerting").unwrap();
//! assert_eq!(display.text, "ALERTING");
//! assert!(get_state_display_model("firing").is_err());
//!
//! let matches = [json!({"metric": "cpu", "value": 90}), json!({"Metric": "mem", "Value": 50})];
//! assert_eq!(render_eval_matches(&matches, ", "), "cpu=90, mem=50");
//!
//! let part = QueryPart::new(alert_query_def(), &["#B".to_string()]);
//! assert_eq!(part.render(), "query(#B, 15m, now)");
//! ```
//!
//! # Architecture
//!
//! - [`state`]: closed [`AlertState`] enum, display descriptors, urgency sort
//! - [`matches`]: eval match records in either naming scheme
//! - [`annotation`]: annotation payload shapes and summaries
//! - [`rules`]: rule list items, state filter and search
//! - [`query_part`]: part definitions, binding, editing and validation
//! - [`catalog`]: built-in option tables and the `query` part definition
//! - [`config`]: YAML + environment configuration

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod annotation;
pub mod catalog;
pub mod config;
pub mod error;
pub mod matches;
pub mod query_part;
pub mod rules;
pub mod state;

pub use annotation::{get_annotation_summary, Annotation, AnnotationPayload};
pub use config::ModelConfig;
pub use error::{
    ConfigError, DefinitionError, QueryPartError, UnknownPolicyError, UnknownStateError,
    ValidationError,
};
pub use matches::{render_eval_matches, EvalMatch, MatchSchema, MatchValue};
pub use query_part::{
    create_reducer_part, list_static_options, merge, DynamicOptions, ParamType, QueryPart,
    QueryPartDef, QueryPartModel, QueryPartParamSpec, QueryRefIds,
};
pub use rules::{AlertRule, AlertRuleItem, RuleListQuery, StateFilter};
pub use state::{
    get_state_display_model, sort_by_state, sort_score, AlertState, StateDisplayDescriptor,
    UnknownStatePolicy,
};
