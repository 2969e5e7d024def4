//! calnote configuration.
//!
//! Loaded from `~/.config/calnote/config.toml` (or an explicit path) with
//! `CALNOTE_*` environment overrides, e.g. `CALNOTE_STRATEGY__DIRECTION`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::date_range::DateRange;
use crate::diff::Strategy;
use crate::error::{CalNoteError, CalNoteResult};
use crate::provider::{DEFAULT_PAGE_SIZE, FetchFilter, ProviderProcess};
use crate::store::{FileStore, Slots};
use crate::sync::{DEFAULT_CONCURRENCY, Orchestrator};

static DEFAULT_STATE_DIR: &str = "~/.local/state/calnote";
static DEFAULT_WINDOW: &str = "7d";
static DEFAULT_PROVIDER_TIMEOUT: &str = "30s";

fn default_state_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_DIR)
}

fn default_window() -> String {
    DEFAULT_WINDOW.to_string()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_provider_timeout() -> String {
    DEFAULT_PROVIDER_TIMEOUT.to_string()
}

/// One service's provider table. Everything besides `provider` is passed to
/// the provider executable untouched.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProviderConfig {
    pub provider: String,
    #[serde(flatten)]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl ProviderConfig {
    pub fn params_map(&self) -> serde_json::Map<String, serde_json::Value> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CalNoteConfig {
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// How far ahead of now a full pass looks, as a humantime duration
    #[serde(default = "default_window")]
    pub window: String,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_provider_timeout")]
    pub provider_timeout: String,

    #[serde(default)]
    pub strategy: Strategy,

    #[serde(default)]
    pub slots: Slots,

    pub calendar: ProviderConfig,
    pub document: ProviderConfig,
}

impl CalNoteConfig {
    pub fn config_path() -> CalNoteResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CalNoteError::Config("Could not determine config directory".into()))?
            .join("calnote");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from `path`, or from the default location. A missing default
    /// file is created first; a missing explicit path is an error.
    pub fn load(path: Option<&Path>) -> CalNoteResult<Self> {
        let config_path = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CalNoteError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => {
                let path = Self::config_path()?;
                if !path.exists() {
                    Self::create_default_config(&path)?;
                    tracing::info!(path = %path.display(), "Created default config");
                }
                path
            }
        };

        let config: CalNoteConfig = Config::builder()
            .add_source(File::from(config_path))
            .add_source(
                Environment::with_prefix("CALNOTE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| CalNoteError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CalNoteError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CalNoteResult<()> {
        for (section, table) in [("calendar", &self.calendar), ("document", &self.document)] {
            if table.provider.trim().is_empty() {
                return Err(CalNoteError::Config(format!(
                    "[{section}] needs a provider name"
                )));
            }
        }
        if self.page_size == 0 {
            return Err(CalNoteError::Config("page_size must be at least 1".into()));
        }
        self.window()?;
        self.provider_timeout()?;
        Ok(())
    }

    pub fn state_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.state_dir.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    pub fn window(&self) -> CalNoteResult<Duration> {
        humantime::parse_duration(&self.window)
            .map_err(|e| CalNoteError::Config(format!("Invalid window {:?}: {e}", self.window)))
    }

    pub fn provider_timeout(&self) -> CalNoteResult<Duration> {
        humantime::parse_duration(&self.provider_timeout).map_err(|e| {
            CalNoteError::Config(format!(
                "Invalid provider_timeout {:?}: {e}",
                self.provider_timeout
            ))
        })
    }

    pub fn fetch_filter(&self) -> CalNoteResult<FetchFilter> {
        let span = chrono::Duration::from_std(self.window()?)
            .map_err(|e| CalNoteError::Config(format!("Window out of range: {e}")))?;

        Ok(FetchFilter {
            window: DateRange::ahead(span),
            page_size: self.page_size,
            cursor: None,
        })
    }

    /// Wire up providers, state store and strategy into an orchestrator.
    pub fn orchestrator(&self) -> CalNoteResult<Orchestrator> {
        let timeout = self.provider_timeout()?;
        let calendar = ProviderProcess::new(&self.calendar.provider, self.calendar.params_map())
            .with_timeout(timeout);
        let document = ProviderProcess::new(&self.document.provider, self.document.params_map())
            .with_timeout(timeout);
        let store = FileStore::new(self.state_path());

        Ok(Orchestrator::new(
            Arc::new(calendar),
            Arc::new(document),
            Arc::new(store),
            &self.slots,
        )
        .with_strategy(self.strategy)
        .with_filter(self.fetch_filter()?)
        .with_concurrency(self.concurrency))
    }

    /// Create a default config file. Provider tables are required, the rest
    /// is commented out.
    pub fn create_default_config(path: &Path) -> CalNoteResult<()> {
        let contents = format!(
            "\
# calnote configuration

# Where the snapshot, run lock and sync token are kept:
# state_dir = \"{DEFAULT_STATE_DIR}\"

# How far ahead of now to sync:
# window = \"{DEFAULT_WINDOW}\"

# page_size = {DEFAULT_PAGE_SIZE}
# concurrency = {DEFAULT_CONCURRENCY}
# provider_timeout = \"{DEFAULT_PROVIDER_TIMEOUT}\"

# [strategy]
# direction = \"two-way\"        # or \"calendar-to-document\", \"document-to-calendar\"
# authority = \"last-edited\"    # or \"document\", \"calendar\"
# baseline = \"cache\"           # or \"pairwise\"

[calendar]
provider = \"google\"
# calendar_id = \"primary\"

[document]
provider = \"notion\"
# database_id = \"...\"
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CalNoteError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| CalNoteError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{Authority, Direction};

    fn write(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_default_config_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        CalNoteConfig::create_default_config(&path).unwrap();

        let config = CalNoteConfig::load(Some(&path)).unwrap();
        assert_eq!(config.calendar.provider, "google");
        assert_eq!(config.document.provider, "notion");
        assert_eq!(config.page_size, 100);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.window().unwrap(), Duration::from_secs(7 * 24 * 3600));
        assert_eq!(config.slots, Slots::default());
        assert_eq!(config.strategy, Strategy::default());
    }

    #[test]
    fn test_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            r#"
state_dir = "/tmp/calnote-state"
window = "14d"
concurrency = 2
provider_timeout = "5s"

[strategy]
direction = "calendar-to-document"
authority = "calendar"

[slots]
cursor = "token"

[calendar]
provider = "google"
calendar_id = "team@example.com"

[document]
provider = "notion"
database_id = "abc123"
"#,
        );

        let config = CalNoteConfig::load(Some(&path)).unwrap();
        assert_eq!(config.state_path(), PathBuf::from("/tmp/calnote-state"));
        assert_eq!(config.strategy.direction, Direction::CalendarToDocument);
        assert_eq!(config.strategy.authority, Authority::Calendar);
        assert_eq!(config.slots.cursor, "token");
        assert_eq!(config.slots.snapshot, "snapshot");
        assert_eq!(config.provider_timeout().unwrap(), Duration::from_secs(5));
        assert_eq!(
            config.calendar.params_map()["calendar_id"],
            serde_json::json!("team@example.com")
        );
        assert!(!config.document.params.contains_key("provider"));
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = CalNoteConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(CalNoteError::Config(_))));
    }

    #[test]
    fn test_bad_window_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            r#"
window = "next week"
[calendar]
provider = "google"
[document]
provider = "notion"
"#,
        );

        assert!(matches!(
            CalNoteConfig::load(Some(&path)),
            Err(CalNoteError::Config(msg)) if msg.contains("window")
        ));
    }

    #[test]
    fn test_missing_provider_table_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "[calendar]\nprovider = \"google\"\n");
        assert!(CalNoteConfig::load(Some(&path)).is_err());
    }
}
