//! Refresher run configuration.
//!
//! [`RefresherConfig`] is the raw, caller-supplied description of a run (it is
//! also the `[refresher]` table of the settings file). Zero means "unset" for
//! every tunable. [`RefresherConfig::validate`] borrows the raw value and
//! returns a separate, filled-in [`ValidatedConfig`]; the raw value is never
//! patched in place, so the caller can keep reusing it.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BATCH_SIZE: usize = 20;
pub const MAX_BATCH_SIZE: usize = 20;
pub const DEFAULT_START_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_LAST_MOMENT_MINUTES: u32 = 30;
pub const DEFAULT_SLEEP_SECONDS: u64 = 60;

/// One rejected field of a [`RefresherConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldViolation {
    #[error("source_ids must contain at least one source id")]
    EmptySourceIds,
    #[error("batch_size must be between 1 and 20 (got {0})")]
    BatchSize(i64),
    #[error("start_page must be a positive integer (got {0})")]
    StartPage(i64),
    #[error("page_size must be between 1 and 100 (got {0})")]
    PageSize(i64),
    #[error("last_moment_minutes must be a positive integer (got {0})")]
    LastMomentMinutes(i64),
    #[error("sleep_seconds must be a positive integer (got {0})")]
    SleepSeconds(i64),
}

/// Every field violation found in one validation pass.
///
/// Never empty: `validate` only builds one when something was wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
pub struct ConfigError {
    violations: Vec<FieldViolation>,
}

impl ConfigError {
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }
}

/// Raw refresher configuration, as written by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefresherConfig {
    /// Fetch calls the run may make. Zero or negative means none.
    pub remaining_requests: i64,
    /// NewsAPI source ids, polled in this order.
    pub source_ids: Vec<String>,
    /// Sources per request, 1..=20 (default 20).
    pub batch_size: i64,
    /// First page requested on the first pass (default 1).
    pub start_page: i64,
    /// Articles per page, 1..=100 (default 10).
    pub page_size: i64,
    /// Stop this many minutes before the next UTC midnight (default 30).
    pub last_moment_minutes: i64,
    /// Pause between passes (default 60).
    pub sleep_seconds: i64,
}

impl RefresherConfig {
    /// Fill in defaults and check bounds, collecting every violation.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let mut violations = Vec::new();

        if self.source_ids.is_empty() {
            violations.push(FieldViolation::EmptySourceIds);
        }

        let batch_size = match self.batch_size {
            0 => DEFAULT_BATCH_SIZE,
            n if (1..=MAX_BATCH_SIZE as i64).contains(&n) => n as usize,
            n => {
                violations.push(FieldViolation::BatchSize(n));
                DEFAULT_BATCH_SIZE
            }
        };

        let start_page = positive_or(self.start_page, DEFAULT_START_PAGE).unwrap_or_else(|n| {
            violations.push(FieldViolation::StartPage(n));
            DEFAULT_START_PAGE
        });

        let page_size = match self.page_size {
            0 => DEFAULT_PAGE_SIZE,
            n if (1..=MAX_PAGE_SIZE as i64).contains(&n) => n as u32,
            n => {
                violations.push(FieldViolation::PageSize(n));
                DEFAULT_PAGE_SIZE
            }
        };

        let last_moment_minutes = positive_or(self.last_moment_minutes, DEFAULT_LAST_MOMENT_MINUTES)
            .unwrap_or_else(|n| {
                violations.push(FieldViolation::LastMomentMinutes(n));
                DEFAULT_LAST_MOMENT_MINUTES
            });

        let sleep_seconds = match self.sleep_seconds {
            0 => DEFAULT_SLEEP_SECONDS,
            n if n > 0 => n as u64,
            n => {
                violations.push(FieldViolation::SleepSeconds(n));
                DEFAULT_SLEEP_SECONDS
            }
        };

        if !violations.is_empty() {
            return Err(ConfigError { violations });
        }

        Ok(ValidatedConfig {
            remaining_requests: self.remaining_requests.max(0) as u64,
            source_ids: self.source_ids.clone(),
            batch_size,
            start_page,
            page_size,
            last_moment_minutes,
            sleep: Duration::from_secs(sleep_seconds),
        })
    }
}

/// Zero becomes `default`; anything outside `1..=u32::MAX` is returned as `Err`.
fn positive_or(value: i64, default: u32) -> Result<u32, i64> {
    match value {
        0 => Ok(default),
        n if n > 0 => u32::try_from(n).map_err(|_| n),
        n => Err(n),
    }
}

/// A configuration that passed validation, with every default applied.
///
/// Only [`RefresherConfig::validate`] builds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    remaining_requests: u64,
    source_ids: Vec<String>,
    batch_size: usize,
    start_page: u32,
    page_size: u32,
    last_moment_minutes: u32,
    sleep: Duration,
}

impl ValidatedConfig {
    pub fn remaining_requests(&self) -> u64 {
        self.remaining_requests
    }

    pub fn source_ids(&self) -> &[String] {
        &self.source_ids
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn start_page(&self) -> u32 {
        self.start_page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn last_moment_minutes(&self) -> u32 {
        self.last_moment_minutes
    }

    /// Pause between two passes over all batches.
    pub fn sleep(&self) -> Duration {
        self.sleep
    }
}

impl From<&ValidatedConfig> for RefresherConfig {
    fn from(config: &ValidatedConfig) -> Self {
        Self {
            remaining_requests: config.remaining_requests as i64,
            source_ids: config.source_ids.clone(),
            batch_size: config.batch_size as i64,
            start_page: i64::from(config.start_page),
            page_size: i64::from(config.page_size),
            last_moment_minutes: i64::from(config.last_moment_minutes),
            sleep_seconds: config.sleep.as_secs() as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn with_sources(ids: &[&str]) -> RefresherConfig {
        RefresherConfig {
            source_ids: ids.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        let raw = with_sources(&["bbc-news"]);
        let config = raw.validate().unwrap();

        assert_eq!(config.batch_size(), 20);
        assert_eq!(config.start_page(), 1);
        assert_eq!(config.page_size(), 10);
        assert_eq!(config.last_moment_minutes(), 30);
        assert_eq!(config.sleep(), Duration::from_secs(60));
        assert_eq!(config.remaining_requests(), 0);
    }

    #[test]
    fn test_raw_config_left_untouched() {
        let raw = with_sources(&["bbc-news"]);
        let before = raw.clone();
        let _ = raw.validate().unwrap();
        assert_eq!(raw, before);
        assert_eq!(raw.batch_size, 0);
    }

    #[test]
    fn test_explicit_values_kept() {
        let raw = RefresherConfig {
            remaining_requests: 250,
            source_ids: vec!["a".into(), "b".into()],
            batch_size: 5,
            start_page: 3,
            page_size: 100,
            last_moment_minutes: 1,
            sleep_seconds: 1,
        };
        let config = raw.validate().unwrap();
        assert_eq!(config.remaining_requests(), 250);
        assert_eq!(config.source_ids(), ["a".to_string(), "b".to_string()]);
        assert_eq!(config.batch_size(), 5);
        assert_eq!(config.start_page(), 3);
        assert_eq!(config.page_size(), 100);
        assert_eq!(config.last_moment_minutes(), 1);
        assert_eq!(config.sleep(), Duration::from_secs(1));
    }

    #[test]
    fn test_empty_source_ids_rejected() {
        let err = RefresherConfig::default().validate().unwrap_err();
        assert_eq!(err.violations(), [FieldViolation::EmptySourceIds]);
    }

    #[test]
    fn test_all_violations_reported_together() {
        let raw = RefresherConfig {
            remaining_requests: 10,
            source_ids: Vec::new(),
            batch_size: 21,
            start_page: -1,
            page_size: 101,
            last_moment_minutes: -5,
            sleep_seconds: -60,
        };
        let err = raw.validate().unwrap_err();
        assert_eq!(
            err.violations(),
            [
                FieldViolation::EmptySourceIds,
                FieldViolation::BatchSize(21),
                FieldViolation::StartPage(-1),
                FieldViolation::PageSize(101),
                FieldViolation::LastMomentMinutes(-5),
                FieldViolation::SleepSeconds(-60),
            ]
        );

        let msg = err.to_string();
        assert_eq!(msg.matches("; ").count(), 5);
        assert!(msg.contains("batch_size must be between 1 and 20 (got 21)"));
        assert!(msg.contains("page_size must be between 1 and 100 (got 101)"));
    }

    #[test]
    fn test_negative_budget_is_exhausted_not_invalid() {
        let raw = RefresherConfig {
            remaining_requests: -3,
            ..with_sources(&["a"])
        };
        assert_eq!(raw.validate().unwrap().remaining_requests(), 0);
    }

    #[test]
    fn test_start_page_beyond_u32_rejected() {
        let raw = RefresherConfig {
            start_page: i64::from(u32::MAX) + 1,
            ..with_sources(&["a"])
        };
        let err = raw.validate().unwrap_err();
        assert!(matches!(err.violations(), [FieldViolation::StartPage(_)]));
    }

    #[test]
    fn test_deserialize_partial_table() {
        let raw: RefresherConfig = toml::from_str(
            r#"
remaining_requests = 900
source_ids = ["bbc-news", "reuters"]
page_size = 50
"#,
        )
        .unwrap();
        assert_eq!(raw.remaining_requests, 900);
        assert_eq!(raw.batch_size, 0);

        let config = raw.validate().unwrap();
        assert_eq!(config.page_size(), 50);
        assert_eq!(config.batch_size(), DEFAULT_BATCH_SIZE);
    }

    proptest! {
        #[test]
        fn prop_validation_is_idempotent(
            remaining in -10i64..10_000,
            ids in proptest::collection::vec("[a-z-]{1,12}", 1..40),
            batch_size in 0i64..=20,
            start_page in 0i64..1_000,
            page_size in 0i64..=100,
            last_moment in 0i64..1_440,
            sleep in 0i64..3_600,
        ) {
            let raw = RefresherConfig {
                remaining_requests: remaining,
                source_ids: ids,
                batch_size,
                start_page,
                page_size,
                last_moment_minutes: last_moment,
                sleep_seconds: sleep,
            };
            let once = raw.validate().unwrap();
            let twice = RefresherConfig::from(&once).validate().unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_out_of_range_batch_size_rejected(batch_size in prop_oneof![i64::MIN..0, 21i64..i64::MAX]) {
            let raw = RefresherConfig { batch_size, ..with_sources(&["a"]) };
            let err = raw.validate().unwrap_err();
            prop_assert_eq!(err.violations(), &[FieldViolation::BatchSize(batch_size)][..]);
        }
    }
}
