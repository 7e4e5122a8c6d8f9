//! Settings file parser for ~/.config/headliner/config.toml.
//!
//! The file is optional: a missing or empty file yields `Settings::default()`.
//! Unknown keys are accepted by serde but logged as warnings, since they are
//! usually typos.
use crate::api::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::refresher::RefresherConfig;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the NewsAPI key. Wins over `api.api_key`.
pub const API_KEY_ENV: &str = "NEWSAPI_KEY";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Settings file too large: {0}")]
    TooLarge(String),
}

/// Top-level settings: the NewsAPI connection and the refresher run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub refresher: RefresherConfig,
}

/// `[api]` table.
///
/// Custom Debug impl masks `api_key`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    /// Alternative to the `NEWSAPI_KEY` env var.
    pub api_key: Option<String>,
    /// Per-request timeout. 0 = default (30s).
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: 0,
        }
    }
}

impl std::fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        match self.timeout_secs {
            0 => DEFAULT_TIMEOUT,
            secs => Duration::from_secs(secs),
        }
    }

    /// The API key from `NEWSAPI_KEY`, falling back to the settings file.
    pub fn api_key(&self) -> Option<SecretString> {
        resolve_api_key(std::env::var(API_KEY_ENV).ok(), self.api_key.as_deref())
    }
}

/// Blank values count as unset.
fn resolve_api_key(env: Option<String>, file: Option<&str>) -> Option<SecretString> {
    env.filter(|key| !key.trim().is_empty())
        .or_else(|| {
            file.map(str::to_string)
                .filter(|key| !key.trim().is_empty())
        })
        .map(SecretString::from)
}

const KNOWN_TABLES: [&str; 2] = ["api", "refresher"];
const KNOWN_API_KEYS: [&str; 3] = ["base_url", "api_key", "timeout_secs"];
const KNOWN_REFRESHER_KEYS: [&str; 7] = [
    "remaining_requests",
    "source_ids",
    "batch_size",
    "start_page",
    "page_size",
    "last_moment_minutes",
    "sleep_seconds",
];

impl Settings {
    /// Maximum settings file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load settings from a TOML file.
    ///
    /// - Missing file → `Ok(Settings::default())`
    /// - Empty file → `Ok(Settings::default())`
    /// - Invalid TOML → `Err(SettingsError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    ///
    /// The `[refresher]` table is not validated here; that happens when a run
    /// starts, so every violation is reported on the run's error stream.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(SettingsError::TooLarge(format!(
                    "Settings file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(SettingsError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Settings file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(SettingsError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Settings file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            warn_unknown_keys(&raw);
        }

        let settings: Settings = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            base_url = %settings.api.base_url,
            sources = settings.refresher.source_ids.len(),
            "Loaded settings"
        );
        Ok(settings)
    }
}

fn warn_unknown_keys(raw: &toml::Table) {
    for (key, value) in raw {
        if !KNOWN_TABLES.contains(&key.as_str()) {
            tracing::warn!(key = %key, "Unknown key in settings file, ignoring");
            continue;
        }
        let known: &[&str] = if key == "api" {
            &KNOWN_API_KEYS
        } else {
            &KNOWN_REFRESHER_KEYS
        };
        if let Some(table) = value.as_table() {
            for inner in table.keys() {
                if !known.contains(&inner.as_str()) {
                    tracing::warn!(key = %format!("{key}.{inner}"), "Unknown key in settings file, ignoring");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn write_settings(test: &str, content: &str) -> (std::path::PathBuf, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("headliner_settings_test_{test}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.api.base_url, "https://newsapi.org/v2");
        assert!(settings.api.api_key.is_none());
        assert_eq!(settings.api.timeout(), Duration::from_secs(30));
        assert_eq!(settings.refresher, RefresherConfig::default());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/headliner_test_nonexistent_config.toml");
        let settings = Settings::load(path).unwrap();
        assert_eq!(settings.api.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let (dir, path) = write_settings("whitespace", "   \n  \n  ");

        let settings = Settings::load(&path).unwrap();
        assert!(settings.refresher.source_ids.is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_settings() {
        let content = r#"
[api]
base_url = "http://localhost:8080/v2"
api_key = "test-key-123"
timeout_secs = 5

[refresher]
remaining_requests = 100
source_ids = ["bbc-news", "reuters", "the-verge"]
batch_size = 2
start_page = 3
page_size = 50
last_moment_minutes = 15
sleep_seconds = 120
"#;
        let (dir, path) = write_settings("full", content);

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.api.base_url, "http://localhost:8080/v2");
        assert_eq!(settings.api.api_key.as_deref(), Some("test-key-123"));
        assert_eq!(settings.api.timeout(), Duration::from_secs(5));
        assert_eq!(
            settings.refresher,
            RefresherConfig {
                remaining_requests: 100,
                source_ids: vec![
                    "bbc-news".to_string(),
                    "reuters".to_string(),
                    "the-verge".to_string()
                ],
                batch_size: 2,
                start_page: 3,
                page_size: 50,
                last_moment_minutes: 15,
                sleep_seconds: 120,
            }
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_refresher_table_keeps_zero_defaults() {
        let (dir, path) = write_settings("partial", "[refresher]\nsource_ids = [\"abc-news\"]\n");

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.refresher.batch_size, 0);
        let validated = settings.refresher.validate().unwrap();
        assert_eq!(validated.batch_size(), 20);
        assert_eq!(validated.page_size(), 10);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (dir, path) = write_settings("invalid", "this is not [valid toml");

        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_wrong_type_returns_error() {
        // batch_size should be an integer
        let (dir, path) = write_settings("wrongtype", "[refresher]\nbatch_size = \"ten\"\n");

        assert!(matches!(Settings::load(&path), Err(SettingsError::Parse(_))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let content = r#"
theme = "dark"

[api]
api_kye = "typo"

[refresher]
source_ids = ["bbc-news"]
retries = 3
"#;
        let (dir, path) = write_settings("unknown", content);

        let settings = Settings::load(&path).unwrap();
        assert!(settings.api.api_key.is_none());
        assert_eq!(settings.refresher.source_ids, vec!["bbc-news".to_string()]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let (dir, path) = write_settings("too_large", &"a".repeat(1_048_577));

        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, SettingsError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_debug_masks_api_key() {
        let mut settings = Settings::default();
        settings.api.api_key = Some("super-secret-key-12345".to_string());

        let debug_output = format!("{:?}", settings);
        assert!(!debug_output.contains("super-secret-key-12345"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_env_key_takes_precedence() {
        let key = resolve_api_key(Some("from-env".to_string()), Some("from-file")).unwrap();
        assert_eq!(key.expose_secret(), "from-env");

        let key = resolve_api_key(None, Some("from-file")).unwrap();
        assert_eq!(key.expose_secret(), "from-file");
    }

    #[test]
    fn test_blank_keys_are_unset() {
        let key = resolve_api_key(Some("  ".to_string()), Some("from-file")).unwrap();
        assert_eq!(key.expose_secret(), "from-file");

        assert!(resolve_api_key(Some(String::new()), None).is_none());
        assert!(resolve_api_key(None, Some("")).is_none());
    }
}
