//! Alert rule records and the list view built from them.
//!
//! Rules come from the alerts API with a raw state token. [`AlertRuleItem`]
//! decorates a rule with what the list renders: state label and styling, how
//! long the rule has been in that state, and an info line explaining
//! execution errors or missing data.

use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog::SelectOption;
use crate::error::UnknownStateError;
use crate::state::{sort_by_state, AlertState, UnknownStatePolicy};

/// An alert rule as returned by the alerts API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    pub id: i64,
    #[serde(default)]
    pub dashboard_id: i64,
    #[serde(default)]
    pub panel_id: i64,
    pub name: String,
    /// Raw state token
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_state_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub eval_data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_error: Option<String>,
    #[serde(default)]
    pub url: String,
}

impl AlertRule {
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            id,
            dashboard_id: 0,
            panel_id: 0,
            name: name.into(),
            state: state.into(),
            new_state_date: None,
            eval_date: None,
            eval_data: Value::Null,
            execution_error: None,
            url: String::new(),
        }
    }
}

/// The `paused` flag a pause/resume toggle should send for `rule`.
#[must_use]
pub fn pause_toggle_target(rule: &AlertRule) -> bool {
    rule.state != AlertState::Paused.as_str()
}

/// A rule decorated for display in the rule list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRuleItem {
    #[serde(flatten)]
    pub rule: AlertRule,
    pub state_text: &'static str,
    pub state_icon: &'static str,
    pub state_class: &'static str,
    pub state_age: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl AlertRuleItem {
    /// Decorate `rule`, measuring its state age against `now`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownStateError`] when the rule's state token is not known.
    pub fn from_rule(rule: AlertRule, now: DateTime<Utc>) -> Result<Self, UnknownStateError> {
        let state: AlertState = rule.state.parse()?;
        let display = state.display();

        let mut info = None;
        if state != AlertState::Paused {
            if let Some(err) = rule.execution_error.as_deref().filter(|e| !e.is_empty()) {
                info = Some(format!("Execution Error: {err}"));
            }
            if rule.eval_data.get("noData").and_then(Value::as_bool) == Some(true) {
                info = Some("Query returned no data".to_string());
            }
        }

        let state_age = rule
            .new_state_date
            .map(|since| describe_age(now - since))
            .unwrap_or_default();

        Ok(Self {
            rule,
            state_text: display.text,
            state_icon: display.icon_class,
            state_class: display.severity_class,
            state_age,
            info,
        })
    }

    /// Whether `re` matches the name, state text or info line.
    fn matches_search(&self, re: &Regex) -> bool {
        re.is_match(&self.rule.name)
            || re.is_match(self.state_text)
            || self.info.as_deref().is_some_and(|info| re.is_match(info))
    }
}

/// Decorate every rule.
///
/// # Errors
///
/// Fails on the first rule carrying an unknown state token.
pub fn build_rule_items(
    rules: Vec<AlertRule>,
    now: DateTime<Utc>,
) -> Result<Vec<AlertRuleItem>, UnknownStateError> {
    rules
        .into_iter()
        .map(|rule| {
            let id = rule.id;
            AlertRuleItem::from_rule(rule, now).inspect_err(|e| {
                warn!(rule_id = id, state = %e.state, "Alert rule has an unknown state");
            })
        })
        .collect()
}

/// Coarse, unsigned human description of a duration ("5 minutes", "a day").
#[must_use]
pub fn describe_age(age: chrono::Duration) -> String {
    let secs = age.num_seconds().unsigned_abs();
    let minutes = (secs + 30) / 60;
    let hours = (secs + 1800) / 3600;
    let days = (secs + 43_200) / 86_400;

    match secs {
        0..45 => "a few seconds".to_string(),
        45..90 => "a minute".to_string(),
        90..2_700 => format!("{minutes} minutes"),
        2_700..5_400 => "an hour".to_string(),
        5_400..79_200 => format!("{hours} hours"),
        79_200..129_600 => "a day".to_string(),
        129_600..2_246_400 => format!("{days} days"),
        2_246_400..3_888_000 => "a month".to_string(),
        3_888_000..27_648_000 => format!("{} months", (days + 15) / 30),
        27_648_000..47_347_200 => "a year".to_string(),
        _ => format!("{} years", (days + 182) / 365),
    }
}

/// State filter offered above the rule list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateFilter {
    #[default]
    All,
    Ok,
    NotOk,
    Alerting,
    NoData,
    Paused,
    Pending,
}

/// Filter dropdown entries, in display order.
pub const STATE_FILTERS: &[SelectOption] = &[
    SelectOption { text: "All", value: "all" },
    SelectOption { text: "OK", value: "ok" },
    SelectOption { text: "Not OK", value: "not_ok" },
    SelectOption { text: "Alerting", value: "alerting" },
    SelectOption { text: "No Data", value: "no_data" },
    SelectOption { text: "Paused", value: "paused" },
    SelectOption { text: "Pending", value: "pending" },
];

impl StateFilter {
    /// Parse a filter token; anything unrecognised, including empty, is `All`.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token {
            "ok" => Self::Ok,
            "not_ok" => Self::NotOk,
            "alerting" => Self::Alerting,
            "no_data" => Self::NoData,
            "paused" => Self::Paused,
            "pending" => Self::Pending,
            "all" | "" => Self::All,
            other => {
                debug!(filter = other, "Unrecognised state filter, showing all");
                Self::All
            }
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Ok => "ok",
            Self::NotOk => "not_ok",
            Self::Alerting => "alerting",
            Self::NoData => "no_data",
            Self::Paused => "paused",
            Self::Pending => "pending",
        }
    }

    /// Whether a rule in `state` passes this filter.
    #[must_use]
    pub fn matches(&self, state: &str) -> bool {
        match self {
            Self::All => true,
            Self::NotOk => state != AlertState::Ok.as_str(),
            other => state == other.as_str(),
        }
    }
}

/// Items whose name, state text or info matches `query`.
///
/// `query` is a regular expression; when it does not compile it is matched
/// literally. An empty query keeps everything.
#[must_use]
pub fn search_rules<'a>(
    items: &'a [AlertRuleItem],
    query: &str,
    case_insensitive: bool,
) -> Vec<&'a AlertRuleItem> {
    if query.is_empty() {
        return items.iter().collect();
    }

    let re = RegexBuilder::new(query)
        .case_insensitive(case_insensitive)
        .build()
        .or_else(|e| {
            debug!(query, error = %e, "Search is not a valid regex, matching literally");
            RegexBuilder::new(&regex::escape(query))
                .case_insensitive(case_insensitive)
                .build()
        });

    match re {
        Ok(re) => items.iter().filter(|item| item.matches_search(&re)).collect(),
        Err(e) => {
            warn!(query, error = %e, "Search query could not be compiled");
            Vec::new()
        }
    }
}

/// Everything the rule list view applies to a fetched page of rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleListQuery {
    pub filter: StateFilter,
    pub search: String,
    pub case_insensitive: bool,
    /// Sort by urgency with this policy; `None` keeps API order
    pub sort: Option<UnknownStatePolicy>,
}

impl RuleListQuery {
    /// Filter, decorate, search and optionally sort `rules`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownStateError`] when a rule that passes the state filter
    /// has an unknown state, or when sorting rejects an unranked state.
    pub fn apply(
        &self,
        mut rules: Vec<AlertRule>,
        now: DateTime<Utc>,
    ) -> Result<Vec<AlertRuleItem>, UnknownStateError> {
        rules.retain(|rule| self.filter.matches(&rule.state));
        if let Some(policy) = self.sort {
            sort_by_state(&mut rules, policy, |rule| rule.state.as_str())?;
        }

        let items = build_rule_items(rules, now)?;
        let items = search_rules(&items, &self.search, self.case_insensitive)
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();

        debug!(
            filter = self.filter.as_str(),
            count = items.len(),
            "Built rule list"
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_item_from_rule() {
        let mut rule = AlertRule::new(1, "CPU high", "alerting");
        rule.new_state_date = Some(now() - Duration::minutes(5));
        let item = AlertRuleItem::from_rule(rule, now()).unwrap();

        assert_eq!(item.state_text, "ALERTING");
        assert_eq!(item.state_icon, "critical-icon");
        assert_eq!(item.state_class, "critical");
        assert_eq!(item.state_age, "5 minutes");
        assert_eq!(item.info, None);
    }

    #[test]
    fn test_item_info_lines() {
        let mut rule = AlertRule::new(1, "r", "alerting");
        rule.execution_error = Some("tsdb timeout".to_string());
        let item = AlertRuleItem::from_rule(rule.clone(), now()).unwrap();
        assert_eq!(item.info.as_deref(), Some("Execution Error: tsdb timeout"));

        rule.eval_data = json!({"noData": true});
        let item = AlertRuleItem::from_rule(rule.clone(), now()).unwrap();
        assert_eq!(item.info.as_deref(), Some("Query returned no data"));

        rule.state = "paused".to_string();
        let item = AlertRuleItem::from_rule(rule, now()).unwrap();
        assert_eq!(item.info, None);
    }

    #[test]
    fn test_item_unknown_state() {
        let err = AlertRuleItem::from_rule(AlertRule::new(1, "r", "firing"), now()).unwrap_err();
        assert_eq!(err.state, "firing");
    }

    #[test]
    fn test_describe_age() {
        let cases = [
            (Duration::seconds(10), "a few seconds"),
            (Duration::seconds(60), "a minute"),
            (Duration::minutes(30), "30 minutes"),
            (Duration::minutes(60), "an hour"),
            (Duration::hours(5), "5 hours"),
            (Duration::hours(24), "a day"),
            (Duration::days(3), "3 days"),
            (Duration::days(30), "a month"),
            (Duration::days(90), "3 months"),
            (Duration::days(400), "a year"),
            (Duration::days(365 * 3), "3 years"),
            (Duration::minutes(-30), "30 minutes"),
        ];
        for (age, expected) in cases {
            assert_eq!(describe_age(age), expected, "{age:?}");
        }
    }

    #[test]
    fn test_state_filter() {
        assert_eq!(StateFilter::from_token("not_ok"), StateFilter::NotOk);
        assert_eq!(StateFilter::from_token("bogus"), StateFilter::All);
        assert!(StateFilter::NotOk.matches("alerting"));
        assert!(!StateFilter::NotOk.matches("ok"));
        assert!(StateFilter::Paused.matches("paused"));
        assert!(!StateFilter::Paused.matches("pending"));
        assert_eq!(STATE_FILTERS.len(), 7);
        for option in STATE_FILTERS {
            assert_eq!(StateFilter::from_token(option.value).as_str(), option.value);
        }
    }

    #[test]
    fn test_search() {
        let items = build_rule_items(
            vec![
                AlertRule::new(1, "Disk usage", "ok"),
                AlertRule::new(2, "API latency", "alerting"),
                AlertRule::new(3, "queue depth (c++)", "pending"),
            ],
            now(),
        )
        .unwrap();

        let names = |found: Vec<&AlertRuleItem>| -> Vec<i64> { found.iter().map(|i| i.rule.id).collect() };
        assert_eq!(names(search_rules(&items, "disk", true)), vec![1]);
        assert_eq!(names(search_rules(&items, "disk", false)), Vec::<i64>::new());
        assert_eq!(names(search_rules(&items, "ALERT", true)), vec![2]);
        assert_eq!(names(search_rules(&items, "^(api|queue)", true)), vec![2, 3]);
        assert_eq!(names(search_rules(&items, "(c++", true)), vec![3]);
        assert_eq!(names(search_rules(&items, "", true)).len(), 3);
    }

    #[test]
    fn test_pause_toggle() {
        assert!(pause_toggle_target(&AlertRule::new(1, "r", "ok")));
        assert!(!pause_toggle_target(&AlertRule::new(1, "r", "paused")));
    }

    #[test]
    fn test_list_query() {
        let rules = vec![
            AlertRule::new(1, "a", "ok"),
            AlertRule::new(2, "b", "paused"),
            AlertRule::new(3, "c", "alerting"),
            AlertRule::new(4, "d", "no_data"),
        ];
        let query = RuleListQuery {
            filter: StateFilter::NotOk,
            sort: Some(UnknownStatePolicy::Last),
            ..RuleListQuery::default()
        };
        let ids: Vec<_> = query
            .apply(rules, now())
            .unwrap()
            .iter()
            .map(|i| i.rule.id)
            .collect();
        assert_eq!(ids, vec![3, 4, 2]);
    }

    #[test]
    fn test_deserialize_api_rule() {
        let rule: AlertRule = serde_json::from_value(json!({
            "id": 12,
            "dashboardId": 4,
            "panelId": 2,
            "name": "Memory",
            "state": "no_data",
            "newStateDate": "2019-06-01T11:00:00Z",
            "evalData": {"noData": true},
            "url": "/d/abc/memory"
        }))
        .unwrap();

        let item = AlertRuleItem::from_rule(rule, now()).unwrap();
        assert_eq!(item.state_age, "an hour");
        assert_eq!(item.info.as_deref(), Some("Query returned no data"));

        let out = serde_json::to_value(&item).unwrap();
        assert_eq!(out["stateText"], "NO DATA");
        assert_eq!(out["dashboardId"], 4);
    }
}
