// Ecosystem - a deployment set of launch configurations

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::error::{DomainError, Result};
use super::launch::LaunchConfig;

/// Deployment set read by the supervisor
///
/// Serialized as `{"apps": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ecosystem {
    pub apps: Vec<LaunchConfig>,
}

impl Ecosystem {
    pub fn new(apps: Vec<LaunchConfig>) -> Self {
        Self { apps }
    }

    /// Build from any accepted document shape
    ///
    /// Accepts `{"apps": [...]}`, a bare list of configs or a single config.
    pub fn from_value(value: serde_json::Value) -> std::result::Result<Self, serde_json::Error> {
        let is_apps_document = value.get("apps").is_some();
        match value {
            serde_json::Value::Array(_) => Ok(Self::new(serde_json::from_value(value)?)),
            _ if is_apps_document => serde_json::from_value(value),
            other => Ok(Self::new(vec![serde_json::from_value(other)?])),
        }
    }

    pub fn find(&self, name: &str) -> Option<&LaunchConfig> {
        self.apps.iter().find(|app| app.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.apps.iter().map(|app| app.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Fail on the first name that appears twice
    pub fn ensure_unique_names(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.apps.len());
        for app in &self.apps {
            if !seen.insert(app.name.as_str()) {
                return Err(DomainError::DuplicateName(app.name.clone()));
            }
        }
        Ok(())
    }

    /// Names that appear more than once, in first-seen order
    pub fn duplicate_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut dups: Vec<String> = Vec::new();
        for app in &self.apps {
            if !seen.insert(app.name.as_str()) && !dups.contains(&app.name) {
                dups.push(app.name.clone());
            }
        }
        dups
    }
}
