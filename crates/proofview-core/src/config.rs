//! Display settings shared across the view boundary

use serde::{Deserialize, Serialize};

/// One saved goal-state filter.
///
/// `regex` and `flags` are carried verbatim for whoever renders the goal
/// state; `matches` selects keep-matching (`true`) or drop-matching
/// (`false`) mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TacticFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub regex: String,
    #[serde(rename = "match")]
    pub matches: bool,
    pub flags: String,
}

/// Settings the host owns and the view mirrors.
///
/// Field names on the wire are camelCase, matching the host's settings
/// store keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub filter_index: i32,
    pub info_view_tactic_state_filters: Vec<TacticFilter>,
    pub info_view_all_errors_on_line: bool,
    pub info_view_auto_open_show_goal: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            filter_index: -1,
            info_view_tactic_state_filters: Vec::new(),
            info_view_all_errors_on_line: true,
            info_view_auto_open_show_goal: true,
        }
    }
}

impl Config {
    /// Overlay `patch` onto this config. Absent fields keep their current
    /// value; no field ever resets to default.
    pub fn apply(&mut self, patch: &ConfigPatch) {
        if let Some(filter_index) = patch.filter_index {
            self.filter_index = filter_index;
        }
        if let Some(filters) = &patch.info_view_tactic_state_filters {
            self.info_view_tactic_state_filters = filters.clone();
        }
        if let Some(all_errors) = patch.info_view_all_errors_on_line {
            self.info_view_all_errors_on_line = all_errors;
        }
        if let Some(auto_open) = patch.info_view_auto_open_show_goal {
            self.info_view_auto_open_show_goal = auto_open;
        }
    }

    /// The filter selected by `filter_index`, if it points at one.
    pub fn active_filter(&self) -> Option<&TacticFilter> {
        usize::try_from(self.filter_index)
            .ok()
            .and_then(|i| self.info_view_tactic_state_filters.get(i))
    }

    /// A patch carrying every field, for seeding a fresh mirror.
    pub fn to_patch(&self) -> ConfigPatch {
        ConfigPatch {
            filter_index: Some(self.filter_index),
            info_view_tactic_state_filters: Some(self.info_view_tactic_state_filters.clone()),
            info_view_all_errors_on_line: Some(self.info_view_all_errors_on_line),
            info_view_auto_open_show_goal: Some(self.info_view_auto_open_show_goal),
        }
    }
}

/// A partial [`Config`]: only the fields present in the payload are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_view_tactic_state_filters: Option<Vec<TacticFilter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_view_all_errors_on_line: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_view_auto_open_show_goal: Option<bool>,
}
