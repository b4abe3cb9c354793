//! Account wrapper reconciling the broker's enabled flag with ppolicy locks.
//!
//! [`AccountStateBridge`] implements [`UserAccount`] itself, so it can stand
//! in wherever the wrapped account is expected. Only the enabled flag is
//! intercepted:
//!
//! - Reads report `delegate enabled && !locked`.
//! - Writes always update the delegate, then write the lock attribute only
//!   when the directory disagrees with the requested state. Enabling clears
//!   the attribute; disabling writes the administrator sentinel, since no
//!   unlock time is known.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::clock::Clock;
use crate::entry::{DirectoryEntry, EditMode, TransactionMarker, UserAccount, ENABLED_ATTRIBUTE};
use crate::error::PpolicyResult;
use crate::lockout::{LockoutEvaluator, LockoutRecord, PERMANENT_LOCK_SENTINEL};

/// Request-scoped wrapper around a broker account and its directory entry.
pub struct AccountStateBridge<A, E, M> {
    delegate: A,
    entry: E,
    marker: M,
    evaluator: LockoutEvaluator,
    edit_mode: EditMode,
    clock: Arc<dyn Clock>,
}

impl<A, E, M> AccountStateBridge<A, E, M>
where
    A: UserAccount,
    E: DirectoryEntry,
    M: TransactionMarker,
{
    /// Wrap an account.
    pub fn new(
        delegate: A,
        entry: E,
        marker: M,
        evaluator: LockoutEvaluator,
        edit_mode: EditMode,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            delegate,
            entry,
            marker,
            evaluator,
            edit_mode,
            clock,
        }
    }

    /// The wrapped account.
    pub fn delegate(&self) -> &A {
        &self.delegate
    }

    /// The directory entry backing the account.
    pub fn entry(&self) -> &E {
        &self.entry
    }

    /// The transaction marker.
    pub fn marker(&self) -> &M {
        &self.marker
    }

    /// Lockout record for the entry's current lock attribute.
    ///
    /// # Errors
    ///
    /// Propagates malformed lock time values.
    pub fn lockout_record(&self) -> PpolicyResult<LockoutRecord> {
        self.evaluator
            .record(self.entry.get_attribute(self.evaluator.lock_attribute()))
    }

    /// Whether the directory currently locks the account.
    ///
    /// # Errors
    ///
    /// Propagates malformed lock time values.
    pub fn is_locked(&self) -> PpolicyResult<bool> {
        let now = self.clock.now();
        self.evaluator
            .is_locked(self.entry.get_attribute(self.evaluator.lock_attribute()), now)
    }

    /// Hand back the wrapped parts so the caller can flush the entry.
    pub fn into_parts(self) -> (A, E, M) {
        (self.delegate, self.entry, self.marker)
    }
}

impl<A, E, M> UserAccount for AccountStateBridge<A, E, M>
where
    A: UserAccount,
    E: DirectoryEntry,
    M: TransactionMarker,
{
    fn username(&self) -> &str {
        self.delegate.username()
    }

    #[instrument(skip(self), fields(dn = %self.entry.dn()))]
    fn is_enabled(&self) -> PpolicyResult<bool> {
        let delegate_enabled = self.delegate.is_enabled()?;
        let locked = self.is_locked()?;
        debug!(delegate_enabled, locked, "Resolved enabled state");
        Ok(delegate_enabled && !locked)
    }

    #[instrument(skip(self), fields(dn = %self.entry.dn()))]
    fn set_enabled(&mut self, enabled: bool) -> PpolicyResult<()> {
        self.delegate.set_enabled(enabled)?;

        if !self.edit_mode.is_writable() {
            debug!(edit_mode = ?self.edit_mode, "Directory not writable, lock attribute untouched");
            return Ok(());
        }

        let currently_locked = self.is_locked()?;
        if !currently_locked == enabled {
            debug!(currently_locked, "Directory already consistent");
            return Ok(());
        }

        let attribute = self.evaluator.lock_attribute();
        if enabled {
            info!(attribute, "Propagating enabled=true, clearing lock time");
            self.entry.remove_attribute(attribute)?;
        } else {
            info!(attribute, "Propagating enabled=false, writing administrator lock");
            self.entry
                .set_attribute(attribute, Some(PERMANENT_LOCK_SENTINEL.to_string()))?;
        }

        self.marker.mark_updated_attribute(ENABLED_ATTRIBUTE)
    }
}
