//! Alert evaluation states and their display descriptors.
//!
//! The backend reports one state token per alert rule. This module turns the
//! token into a closed [`AlertState`], maps each state onto the fixed
//! [`StateDisplayDescriptor`] the views render, and ranks states for sorting
//! rule lists with the most urgent first.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{UnknownPolicyError, UnknownStateError};

/// Evaluation state of an alert rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    Ok,
    Alerting,
    NoData,
    Paused,
    Pending,
    Unknown,
}

impl AlertState {
    /// All states, in display-table order.
    pub const ALL: [Self; 6] = [
        Self::Ok,
        Self::Alerting,
        Self::NoData,
        Self::Paused,
        Self::Pending,
        Self::Unknown,
    ];

    /// Wire token for this state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Alerting => "alerting",
            Self::NoData => "no_data",
            Self::Paused => "paused",
            Self::Pending => "pending",
            Self::Unknown => "unknown",
        }
    }

    /// Fixed display descriptor for this state.
    #[must_use]
    pub const fn display(&self) -> StateDisplayDescriptor {
        match self {
            Self::Ok => StateDisplayDescriptor::new("OK", "online-icon", "ok"),
            Self::Alerting => StateDisplayDescriptor::new("ALERTING", "critical-icon", "critical"),
            Self::NoData => StateDisplayDescriptor::new("NO DATA", "question-icon", "warning"),
            Self::Paused => StateDisplayDescriptor::new("PAUSED", "pause-icon", "paused"),
            Self::Pending => StateDisplayDescriptor::new("PENDING", "exclamation-icon", "warning"),
            Self::Unknown => StateDisplayDescriptor::new("UNKNOWN", "question-icon", "paused"),
        }
    }

    /// Urgency rank used to order rule lists; lower sorts first.
    ///
    /// `Unknown` has no rank. Callers decide where it goes through
    /// [`UnknownStatePolicy`].
    #[must_use]
    pub const fn sort_score(&self) -> Option<u8> {
        match self {
            Self::Alerting => Some(1),
            Self::NoData => Some(2),
            Self::Pending => Some(3),
            Self::Ok => Some(4),
            Self::Paused => Some(5),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertState {
    type Err = UnknownStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(Self::Ok),
            "alerting" => Ok(Self::Alerting),
            "no_data" => Ok(Self::NoData),
            "paused" => Ok(Self::Paused),
            "pending" => Ok(Self::Pending),
            "unknown" => Ok(Self::Unknown),
            other => Err(UnknownStateError::new(other)),
        }
    }
}

/// What the views need to render a state: label, icon and severity styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDisplayDescriptor {
    pub text: &'static str,
    pub icon_class: &'static str,
    pub severity_class: &'static str,
}

impl StateDisplayDescriptor {
    const fn new(text: &'static str, icon_class: &'static str, severity_class: &'static str) -> Self {
        Self {
            text,
            icon_class,
            severity_class,
        }
    }
}

/// Look up the display descriptor for a raw state token.
///
/// # Errors
///
/// Returns [`UnknownStateError`] carrying the token when it is not one of the
/// six known states.
pub fn get_state_display_model(state: &str) -> Result<StateDisplayDescriptor, UnknownStateError> {
    state.parse::<AlertState>().map(|s| s.display())
}

/// Urgency rank for a raw state token.
///
/// Returns `None` both for `unknown` and for tokens that do not parse.
#[must_use]
pub fn sort_score(state: &str) -> Option<u8> {
    state.parse::<AlertState>().ok().and_then(|s| s.sort_score())
}

/// Where rules without an urgency rank go when sorting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownStatePolicy {
    /// Unranked states sort after every ranked one
    #[default]
    Last,
    /// Unranked states sort before every ranked one
    First,
    /// Sorting fails on the first unranked state
    Reject,
}

impl FromStr for UnknownStatePolicy {
    type Err = UnknownPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "last" => Ok(Self::Last),
            "first" => Ok(Self::First),
            "reject" => Ok(Self::Reject),
            _ => Err(UnknownPolicyError(s.to_string())),
        }
    }
}

impl UnknownStatePolicy {
    /// Sort key for a raw state token under this policy.
    ///
    /// # Errors
    ///
    /// Under [`UnknownStatePolicy::Reject`], returns [`UnknownStateError`] for
    /// any token without a rank.
    pub fn sort_key(self, state: &str) -> Result<u16, UnknownStateError> {
        match (sort_score(state), self) {
            (Some(score), _) => Ok(u16::from(score)),
            (None, Self::Last) => Ok(u16::MAX),
            (None, Self::First) => Ok(0),
            (None, Self::Reject) => Err(UnknownStateError::new(state)),
        }
    }
}

/// Stable ascending sort of `items` by the urgency of the state each carries.
///
/// Items with equal rank keep their input order.
///
/// # Errors
///
/// Returns [`UnknownStateError`] when `policy` is
/// [`UnknownStatePolicy::Reject`] and any item is unranked; `items` is left
/// untouched in that case.
pub fn sort_by_state<T, F>(
    items: &mut [T],
    policy: UnknownStatePolicy,
    state_of: F,
) -> Result<(), UnknownStateError>
where
    F: Fn(&T) -> &str,
{
    for item in items.iter() {
        policy.sort_key(state_of(item))?;
    }

    items.sort_by_key(|item| policy.sort_key(state_of(item)).unwrap_or(u16::MAX));
    Ok(())
}
