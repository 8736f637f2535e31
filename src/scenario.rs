//! Scenario catalog
//!
//! A scenario bundles the prompts for one practice topic: the system prompt
//! that frames the assistant, the opening prompt that elicits its first
//! question, and a description shown at selection time. The built-in set is
//! compiled into the binary; a directory of JSON files can override or
//! extend it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A named practice topic
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Display name, also the lookup key
    pub name: String,

    /// System prompt framing the assistant's role
    pub system_prompt: String,

    /// First user turn, submitted on conversation start to elicit the opener
    pub opening_prompt: String,

    /// Human-readable description for the selection UI
    pub description: String,
}

/// Scenario JSON compiled into the binary
const EMBEDDED_SCENARIOS: &[&str] = &[
    include_str!("../scenarios/casual_chat.json"),
    include_str!("../scenarios/daily_routines.json"),
    include_str!("../scenarios/giving_directions.json"),
    include_str!("../scenarios/personal_information.json"),
    include_str!("../scenarios/time_expressions.json"),
    include_str!("../scenarios/numbers_practice.json"),
    include_str!("../scenarios/party_meeting.json"),
    include_str!("../scenarios/dating_scenario.json"),
];

/// Immutable collection of scenarios, built once at startup
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    scenarios: Vec<Scenario>,
}

impl ScenarioCatalog {
    /// Load the built-in scenarios, plus any JSON files from `custom_dir`
    ///
    /// A custom scenario with the same name as a built-in replaces it;
    /// otherwise it is appended. Unreadable or malformed custom files are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns error if the embedded scenario data fails to parse
    pub fn load(custom_dir: Option<&Path>) -> Result<Self> {
        let mut scenarios = Vec::with_capacity(EMBEDDED_SCENARIOS.len());
        for json in EMBEDDED_SCENARIOS {
            let scenario: Scenario = serde_json::from_str(json)?;
            scenarios.push(scenario);
        }

        let mut catalog = Self { scenarios };

        if let Some(dir) = custom_dir {
            catalog.merge_dir(dir);
        }

        tracing::debug!(count = catalog.scenarios.len(), "scenario catalog loaded");
        Ok(catalog)
    }

    /// Merge scenario JSON files from a directory into the catalog
    fn merge_dir(&mut self, dir: &Path) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "cannot read scenario directory");
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            match std::fs::read_to_string(&path)
                .map_err(Error::from)
                .and_then(|content| serde_json::from_str::<Scenario>(&content).map_err(Error::from))
            {
                Ok(scenario) => {
                    tracing::debug!(path = %path.display(), name = %scenario.name, "loaded custom scenario");
                    self.insert(scenario);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping malformed scenario file");
                }
            }
        }
    }

    /// Replace a same-named scenario or append a new one
    fn insert(&mut self, scenario: Scenario) {
        match self.scenarios.iter_mut().find(|s| s.name == scenario.name) {
            Some(existing) => *existing = scenario,
            None => self.scenarios.push(scenario),
        }
    }

    /// Look up a scenario by name (case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns `Error::ScenarioNotFound` if no scenario matches
    pub fn get(&self, name: &str) -> Result<&Scenario> {
        self.scenarios
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::ScenarioNotFound(name.to_string()))
    }

    /// All scenarios in catalog order
    #[must_use]
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Number of scenarios
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Whether the catalog is empty (never true for the built-in set)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_eight_scenarios() {
        let catalog = ScenarioCatalog::load(None).unwrap();
        assert_eq!(catalog.len(), 8);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let catalog = ScenarioCatalog::load(None).unwrap();

        let scenario = catalog.get("casual chat").unwrap();
        assert_eq!(scenario.name, "Casual Chat");
        assert!(!scenario.system_prompt.is_empty());
        assert!(!scenario.opening_prompt.is_empty());
    }

    #[test]
    fn unknown_scenario_errors() {
        let catalog = ScenarioCatalog::load(None).unwrap();

        let err = catalog.get("Job Interview").unwrap_err();
        assert!(matches!(err, Error::ScenarioNotFound(_)));
    }

    #[test]
    fn custom_dir_replaces_same_name_and_appends_new() {
        let dir = tempfile::tempdir().unwrap();

        std::fs::write(
            dir.path().join("override.json"),
            r#"{"name": "Casual Chat", "systemPrompt": "p", "openingPrompt": "o", "description": "d"}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("extra.json"),
            r#"{"name": "Ordering Food", "systemPrompt": "p", "openingPrompt": "o", "description": "d"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        let catalog = ScenarioCatalog::load(Some(dir.path())).unwrap();
        assert_eq!(catalog.len(), 9);
        assert_eq!(catalog.get("Casual Chat").unwrap().system_prompt, "p");
        assert!(catalog.get("Ordering Food").is_ok());
    }
}
