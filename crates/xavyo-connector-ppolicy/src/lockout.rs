//! Lockout-window evaluation for ppolicy lock timestamps.
//!
//! The OpenLDAP ppolicy overlay records a lockout by writing the lock instant
//! into `pwdAccountLockedTime`. A configured `pwdLockoutDuration` of `0`
//! keeps the account locked until the attribute is cleared; any other value
//! unlocks it once the duration has elapsed. Administrators lock an account
//! for good by writing [`PERMANENT_LOCK_SENTINEL`].
//!
//! Evaluation is pure: callers pass the raw attribute value and the current
//! instant, and get back a [`LockoutRecord`] they can query.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PpolicyResult;
use crate::generalized_time::parse_generalized_time;

/// Lock time attribute maintained by the ppolicy overlay.
pub const PPOLICY_LOCK_TIME_ATTRIBUTE: &str = "pwdAccountLockedTime";

/// Attribute read by the legacy lock-time scheme.
pub const LEGACY_LOCK_TIME_ATTRIBUTE: &str = "pwdLockoutDuration";

/// Reserved lock time marking an administrator lock that never expires.
pub const PERMANENT_LOCK_SENTINEL: &str = "000001010000Z";

/// Lock-time scheme used by the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockoutPolicy {
    /// `pwdAccountLockedTime` holds the lock instant. The lock lasts for the
    /// configured duration after that instant, or forever when it is `0`.
    #[default]
    Ppolicy,
    /// Older scheme reading `pwdLockoutDuration`. The window is measured
    /// backwards from the stored instant.
    Legacy,
}

impl LockoutPolicy {
    /// Attribute holding the lock time under this scheme.
    pub fn lock_attribute(self) -> &'static str {
        match self {
            LockoutPolicy::Ppolicy => PPOLICY_LOCK_TIME_ATTRIBUTE,
            LockoutPolicy::Legacy => LEGACY_LOCK_TIME_ATTRIBUTE,
        }
    }
}

impl std::fmt::Display for LockoutPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockoutPolicy::Ppolicy => write!(f, "ppolicy"),
            LockoutPolicy::Legacy => write!(f, "legacy"),
        }
    }
}

/// Lock state derived from a lock time attribute.
///
/// Computed fresh for every read or write; never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutRecord {
    /// Attribute value as read from the entry.
    pub raw_timestamp: Option<String>,
    /// The value is the administrator sentinel.
    pub is_permanent_sentinel: bool,
    /// Parsed lock instant (absent for the sentinel).
    pub locked_at: Option<DateTime<Utc>>,
    /// Configured lockout duration; `0` means until cleared.
    pub lockout_duration_secs: u64,
    /// Scheme used to interpret the window.
    pub policy: LockoutPolicy,
}

impl LockoutRecord {
    /// Build a record from a raw attribute value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PpolicyError::InvalidTimestamp`] when a present,
    /// non-sentinel value is not valid generalized time. Malformed lock data
    /// is never read as either locked or unlocked.
    pub fn evaluate(
        raw: Option<&str>,
        lockout_duration_secs: u64,
        policy: LockoutPolicy,
    ) -> PpolicyResult<Self> {
        // Disabling writes the sentinel under either scheme.
        let is_permanent_sentinel = raw == Some(PERMANENT_LOCK_SENTINEL);

        let locked_at = match raw {
            Some(value) if !is_permanent_sentinel => {
                Some(parse_generalized_time(value).map_err(|e| {
                    warn!(
                        attribute = policy.lock_attribute(),
                        value = %value,
                        error = %e,
                        "Malformed lock time attribute"
                    );
                    e
                })?)
            }
            _ => None,
        };

        Ok(Self {
            raw_timestamp: raw.map(str::to_string),
            is_permanent_sentinel,
            locked_at,
            lockout_duration_secs,
            policy,
        })
    }

    /// Whether a lock time attribute was present at all.
    pub fn has_lock(&self) -> bool {
        self.raw_timestamp.is_some()
    }

    /// Whether the lock never expires on its own.
    pub fn is_permanent(&self) -> bool {
        self.is_permanent_sentinel || (self.locked_at.is_some() && self.lockout_duration_secs == 0)
    }

    fn duration(&self) -> Option<Duration> {
        i64::try_from(self.lockout_duration_secs)
            .ok()
            .and_then(Duration::try_seconds)
    }

    /// Instant at which a timed lock stops applying.
    ///
    /// `None` when there is no lock, or the lock is permanent.
    pub fn unlock_at(&self) -> Option<DateTime<Utc>> {
        if self.is_permanent() {
            return None;
        }
        let locked_at = self.locked_at?;
        let duration = self.duration()?;
        match self.policy {
            LockoutPolicy::Ppolicy => locked_at.checked_add_signed(duration),
            LockoutPolicy::Legacy => locked_at.checked_sub_signed(duration),
        }
    }

    /// Whether the account is locked at `now`.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        if self.is_permanent_sentinel {
            return true;
        }
        let Some(locked_at) = self.locked_at else {
            return false;
        };

        match self.policy {
            LockoutPolicy::Ppolicy => {
                if locked_at > now {
                    // Lock instant lies in the future (clock skew).
                    return false;
                }
                if self.lockout_duration_secs == 0 {
                    return true;
                }
                // A window too large to represent never ends.
                self.unlock_at().map_or(true, |unlock_at| now < unlock_at)
            }
            LockoutPolicy::Legacy => {
                if self.lockout_duration_secs == 0 {
                    return locked_at <= now;
                }
                self.unlock_at().is_some_and(|unlock_at| unlock_at >= now)
            }
        }
    }
}

/// Evaluates lock time attributes for one configured duration and scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutEvaluator {
    policy: LockoutPolicy,
    lockout_duration_secs: u64,
}

impl LockoutEvaluator {
    /// Create an evaluator.
    pub fn new(policy: LockoutPolicy, lockout_duration_secs: u64) -> Self {
        Self {
            policy,
            lockout_duration_secs,
        }
    }

    /// Scheme in use.
    pub fn policy(&self) -> LockoutPolicy {
        self.policy
    }

    /// Configured lockout duration in seconds.
    pub fn lockout_duration_secs(&self) -> u64 {
        self.lockout_duration_secs
    }

    /// Attribute this evaluator reads.
    pub fn lock_attribute(&self) -> &'static str {
        self.policy.lock_attribute()
    }

    /// Build the lockout record for a raw attribute value.
    ///
    /// # Errors
    ///
    /// Propagates parse failures of the lock time value.
    pub fn record(&self, raw: Option<&str>) -> PpolicyResult<LockoutRecord> {
        LockoutRecord::evaluate(raw, self.lockout_duration_secs, self.policy)
    }

    /// Whether a raw attribute value means the account is locked at `now`.
    ///
    /// # Errors
    ///
    /// Propagates parse failures of the lock time value.
    pub fn is_locked(&self, raw: Option<&str>, now: DateTime<Utc>) -> PpolicyResult<bool> {
        let record = self.record(raw)?;
        let locked = record.is_locked_at(now);
        debug!(
            policy = %self.policy,
            lockout_duration_secs = self.lockout_duration_secs,
            has_lock = record.has_lock(),
            permanent = record.is_permanent(),
            locked,
            "Evaluated lock time"
        );
        Ok(locked)
    }
}

/// Whether a `pwdAccountLockedTime` value means the account is locked at `now`.
///
/// # Errors
///
/// Returns [`crate::PpolicyError::InvalidTimestamp`] for malformed values.
pub fn is_locked(
    raw: Option<&str>,
    lockout_duration_secs: u64,
    now: DateTime<Utc>,
) -> PpolicyResult<bool> {
    LockoutEvaluator::new(LockoutPolicy::Ppolicy, lockout_duration_secs).is_locked(raw, now)
}
