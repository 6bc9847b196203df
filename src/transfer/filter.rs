//! Category filter for selective export
//!
//! Each category is one row in [`RULES`]: a predicate over the file name and
//! the export scope. A file is exported when any enabled category's rule
//! accepts it, so adding a category only means adding a row.

use serde::{Deserialize, Serialize};

use crate::store::record::is_picture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    EventData,
    Results,
    ScoutConfigs,
    SmartStats,
    CoachConfig,
    Settings,
    Picklists,
    Whiteboard,
    Avatars,
    Pictures,
}

/// Event and year an export is limited to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub event_id: String,
    /// First four characters of the event id, empty if it is shorter
    pub year: String,
}

impl Scope {
    pub fn new(event_id: &str) -> Self {
        let year = if event_id.chars().count() >= 4 {
            event_id.chars().take(4).collect()
        } else {
            String::new()
        };
        Self {
            event_id: event_id.to_string(),
            year,
        }
    }

    fn config_prefix(&self) -> String {
        format!("config-{}", self.year)
    }
}

type Rule = fn(&str, &Scope) -> bool;

/// Category -> file name predicate
pub const RULES: &[(Category, Rule)] = &[
    (Category::EventData, event_data),
    (Category::Results, results),
    (Category::Picklists, picklists),
    (Category::ScoutConfigs, scout_configs),
    (Category::SmartStats, smart_stats),
    (Category::CoachConfig, coach_config),
    (Category::Whiteboard, whiteboard),
    (Category::Avatars, avatars),
    (Category::Settings, settings),
    (Category::Pictures, pictures),
];

fn json_stem(name: &str) -> Option<&str> {
    name.strip_suffix(".json")
}

fn event_scoped(name: &str, scope: &Scope, prefixes: &[&str]) -> bool {
    json_stem(name).is_some_and(|stem| {
        stem.contains(scope.event_id.as_str()) && prefixes.iter().any(|p| stem.starts_with(p))
    })
}

fn year_config(name: &str, scope: &Scope, suffixes: &[&str]) -> bool {
    if scope.year.is_empty() {
        return false;
    }
    json_stem(name).is_some_and(|stem| {
        stem.starts_with(&scope.config_prefix()) && suffixes.iter().any(|s| stem.ends_with(s))
    })
}

fn event_data(name: &str, scope: &Scope) -> bool {
    event_scoped(name, scope, &["teams-", "matches-", "rankings-"])
}

fn results(name: &str, scope: &Scope) -> bool {
    event_scoped(name, scope, &["match-", "pit-", "note-"])
}

fn picklists(name: &str, scope: &Scope) -> bool {
    event_scoped(name, scope, &["picklists-"])
}

fn scout_configs(name: &str, scope: &Scope) -> bool {
    year_config(name, scope, &["-pit", "-match"])
}

fn smart_stats(name: &str, scope: &Scope) -> bool {
    year_config(name, scope, &["-smart_stats"])
}

fn coach_config(name: &str, scope: &Scope) -> bool {
    year_config(name, scope, &["-coach"])
}

fn whiteboard(name: &str, scope: &Scope) -> bool {
    year_config(name, scope, &["-whiteboard"])
}

fn avatars(name: &str, scope: &Scope) -> bool {
    !scope.year.is_empty()
        && json_stem(name).is_some_and(|stem| stem.starts_with(&format!("avatar-{}-", scope.year)))
}

// The current year's configs belong to the year-scoped categories above.
fn settings(name: &str, scope: &Scope) -> bool {
    json_stem(name).is_some_and(|stem| {
        stem.starts_with("config-")
            && (scope.year.is_empty() || !stem.starts_with(&scope.config_prefix()))
    })
}

fn pictures(name: &str, _scope: &Scope) -> bool {
    is_picture(name)
}

/// Flags and scope of one export request. Absent flags are off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryFilter {
    pub event_id: String,
    pub event_data: bool,
    pub results: bool,
    pub scout_configs: bool,
    pub smart_stats: bool,
    pub coach_config: bool,
    pub settings: bool,
    pub picklists: bool,
    pub whiteboard: bool,
    pub avatars: bool,
    pub pictures: bool,
}

impl CategoryFilter {
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            ..Default::default()
        }
    }

    /// Builder-style flag setter
    pub fn with(mut self, category: Category) -> Self {
        *self.flag_mut(category) = true;
        self
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        match category {
            Category::EventData => self.event_data,
            Category::Results => self.results,
            Category::ScoutConfigs => self.scout_configs,
            Category::SmartStats => self.smart_stats,
            Category::CoachConfig => self.coach_config,
            Category::Settings => self.settings,
            Category::Picklists => self.picklists,
            Category::Whiteboard => self.whiteboard,
            Category::Avatars => self.avatars,
            Category::Pictures => self.pictures,
        }
    }

    fn flag_mut(&mut self, category: Category) -> &mut bool {
        match category {
            Category::EventData => &mut self.event_data,
            Category::Results => &mut self.results,
            Category::ScoutConfigs => &mut self.scout_configs,
            Category::SmartStats => &mut self.smart_stats,
            Category::CoachConfig => &mut self.coach_config,
            Category::Settings => &mut self.settings,
            Category::Picklists => &mut self.picklists,
            Category::Whiteboard => &mut self.whiteboard,
            Category::Avatars => &mut self.avatars,
            Category::Pictures => &mut self.pictures,
        }
    }

    pub fn scope(&self) -> Scope {
        Scope::new(&self.event_id)
    }

    pub fn enabled(&self) -> Vec<Category> {
        RULES
            .iter()
            .map(|(category, _)| *category)
            .filter(|c| self.is_enabled(*c))
            .collect()
    }

    /// Whether a record name passes at least one enabled category.
    pub fn matches(&self, name: &str) -> bool {
        self.matches_in(name, &self.scope())
    }

    pub(crate) fn matches_in(&self, name: &str, scope: &Scope) -> bool {
        RULES
            .iter()
            .any(|(category, rule)| self.is_enabled(*category) && rule(name, scope))
    }
}
