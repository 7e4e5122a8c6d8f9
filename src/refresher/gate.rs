//! Request budget and end-of-day cutoff.

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Source of "now" for the cutoff check.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock, in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Why a run stopped fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configuration failed validation; nothing was fetched.
    InvalidConfiguration,
    BudgetExhausted,
    CutoffReached,
    Cancelled,
    /// Every output stream was dropped; further fetches would be thrown away.
    ConsumerGone,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopReason::InvalidConfiguration => "invalid configuration",
            StopReason::BudgetExhausted => "request budget exhausted",
            StopReason::CutoffReached => "daily cutoff reached",
            StopReason::Cancelled => "cancelled",
            StopReason::ConsumerGone => "all output streams dropped",
        })
    }
}

/// Start of the UTC day after `started`, minus `last_moment_minutes`.
///
/// A run that crosses midnight keeps the cutoff of the day it started on.
pub fn cutoff_for(started: DateTime<Utc>, last_moment_minutes: u32) -> DateTime<Utc> {
    let next_midnight = started
        .date_naive()
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    next_midnight - TimeDelta::minutes(i64::from(last_moment_minutes))
}

/// Decides, before every fetch, whether the run may spend another request.
///
/// Once it has denied, it keeps denying: the budget only counts down and the
/// cutoff never moves.
#[derive(Debug, Clone)]
pub struct Gate {
    remaining: u64,
    cutoff: DateTime<Utc>,
    cancel: CancellationToken,
}

impl Gate {
    pub fn new(remaining: u64, cutoff: DateTime<Utc>, cancel: CancellationToken) -> Self {
        Self {
            remaining,
            cutoff,
            cancel,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    /// `Ok` when a fetch may happen at `now`, otherwise the reason it may not.
    pub fn may_proceed(&self, now: DateTime<Utc>) -> Result<(), StopReason> {
        if self.cancel.is_cancelled() {
            return Err(StopReason::Cancelled);
        }
        if self.remaining == 0 {
            return Err(StopReason::BudgetExhausted);
        }
        if now >= self.cutoff {
            return Err(StopReason::CutoffReached);
        }
        Ok(())
    }

    /// Record one request as spent.
    pub fn spend(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }
}
