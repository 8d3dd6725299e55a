//! Persisted user selections.
//!
//! The selected strategy and investment goal survive between runs in a
//! small TOML file, so `analyze` can be called with just a URL.

use crate::models::Strategy;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What is stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_strategy: Option<Strategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investment_goal: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

/// File-backed settings store.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings; a missing file yields empty settings.
    pub fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            debug!("No settings file at {}", self.path.display());
            return Ok(Settings::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings: {}", self.path.display()))?;
        let settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings: {}", self.path.display()))?;
        Ok(settings)
    }

    pub fn save_strategy(&self, strategy: Strategy) -> Result<Settings> {
        info!("Saving strategy: {}", strategy);
        self.update(|s| s.selected_strategy = Some(strategy))
    }

    pub fn clear_strategy(&self) -> Result<Settings> {
        info!("Clearing strategy");
        self.update(|s| s.selected_strategy = None)
    }

    pub fn save_goal(&self, goal: &str) -> Result<Settings> {
        info!("Saving goal: {}", goal);
        let goal = goal.trim().to_string();
        self.update(|s| s.investment_goal = (!goal.is_empty()).then_some(goal))
    }

    pub fn clear_goal(&self) -> Result<Settings> {
        info!("Clearing goal");
        self.update(|s| s.investment_goal = None)
    }

    /// Record that the settings were just used for a submission.
    pub fn touch(&self) -> Result<Settings> {
        self.update(|_| {})
    }

    fn update(&self, change: impl FnOnce(&mut Settings)) -> Result<Settings> {
        let mut settings = self.load()?;
        change(&mut settings);
        settings.last_used = Some(Utc::now());
        self.write(&settings)?;
        Ok(settings)
    }

    fn write(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create settings directory: {}", parent.display())
                })?;
            }
        }

        let content = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write settings: {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, SettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("nested").join("settings.toml"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (_dir, store) = store();
        assert_eq!(store.load().unwrap(), Settings::default());
    }

    #[test]
    fn test_strategy_round_trip() {
        let (_dir, store) = store();
        store.save_strategy(Strategy::Hmo).unwrap();

        let settings = store.load().unwrap();
        assert_eq!(settings.selected_strategy, Some(Strategy::Hmo));
        assert!(settings.last_used.is_some());

        store.clear_strategy().unwrap();
        assert_eq!(store.load().unwrap().selected_strategy, None);
    }

    #[test]
    fn test_goal_is_independent_of_strategy() {
        let (_dir, store) = store();
        store.save_strategy(Strategy::Flip).unwrap();
        store.save_goal("  20% ROI in 12 months ").unwrap();

        let settings = store.load().unwrap();
        assert_eq!(settings.selected_strategy, Some(Strategy::Flip));
        assert_eq!(
            settings.investment_goal.as_deref(),
            Some("20% ROI in 12 months")
        );

        store.save_goal("   ").unwrap();
        assert_eq!(store.load().unwrap().investment_goal, None);

        store.save_goal("cash flow").unwrap();
        store.clear_goal().unwrap();
        let settings = store.load().unwrap();
        assert_eq!(settings.investment_goal, None);
        assert_eq!(settings.selected_strategy, Some(Strategy::Flip));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "selected_strategy = \"villa\"").unwrap();
        assert!(store.load().is_err());
    }
}
