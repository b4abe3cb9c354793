//! OpenLDAP ppolicy mapper.
//!
//! Hooks the ppolicy lock time into the LDAP provider's user lifecycle:
//! requests the lock attribute on every user query and wraps loaded
//! accounts in an [`AccountStateBridge`].

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::bridge::AccountStateBridge;
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigProperty, PpolicyMapperConfig};
use crate::entry::{DirectoryEntry, EditMode, QueryBuilder, TransactionMarker, UserAccount};
use crate::error::PpolicyResult;
use crate::lockout::{LockoutEvaluator, LockoutPolicy};

/// Provider identifier of the mapper.
pub const PROVIDER_ID: &str = "openldap_ppolicy_mapper";

/// Maps a user's enabled state to the ppolicy lock time attribute.
#[derive(Clone)]
pub struct PpolicyMapper {
    evaluator: LockoutEvaluator,
    edit_mode: EditMode,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for PpolicyMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PpolicyMapper")
            .field("evaluator", &self.evaluator)
            .field("edit_mode", &self.edit_mode)
            .finish_non_exhaustive()
    }
}

impl PpolicyMapper {
    /// Build a mapper from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PpolicyError::InvalidConfiguration`] if the lockout
    /// duration is not a non-negative integer.
    pub fn new(config: &PpolicyMapperConfig, edit_mode: EditMode) -> PpolicyResult<Self> {
        let lockout_duration_secs = config.lockout_duration_secs()?;
        info!(
            policy = %config.policy,
            lockout_duration_secs,
            ?edit_mode,
            "Creating ppolicy mapper"
        );
        Ok(Self {
            evaluator: LockoutEvaluator::new(config.policy, lockout_duration_secs),
            edit_mode,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Lock-time scheme in use.
    pub fn policy(&self) -> LockoutPolicy {
        self.evaluator.policy()
    }

    /// Configured lockout duration in seconds.
    pub fn lockout_duration_secs(&self) -> u64 {
        self.evaluator.lockout_duration_secs()
    }

    /// Edit mode of the LDAP provider.
    pub fn edit_mode(&self) -> EditMode {
        self.edit_mode
    }

    /// Description shown in the admin console.
    pub fn help_text() -> &'static str {
        "Mapper for OpenLDAP entities using the ppolicy to map the users enabled state \
         to a pwdAccountLockedTime timestamp."
    }

    /// Configuration options of the mapper.
    pub fn config_properties() -> Vec<ConfigProperty> {
        PpolicyMapperConfig::config_properties()
    }

    /// Make sure user queries return the lock time attribute.
    ///
    /// The attribute is only writable when the provider writes back to the
    /// directory.
    pub fn before_query<Q: QueryBuilder>(&self, query: &mut Q) {
        let attribute = self.evaluator.lock_attribute();
        query.add_returning_attribute(attribute);
        if !self.edit_mode.is_writable() {
            query.add_returning_read_only_attribute(attribute);
        }
    }

    /// Wrap a loaded account so its enabled flag honours the lock time.
    pub fn proxy<A, E, M>(&self, entry: E, delegate: A, marker: M) -> AccountStateBridge<A, E, M>
    where
        A: UserAccount,
        E: DirectoryEntry,
        M: TransactionMarker,
    {
        AccountStateBridge::new(
            delegate,
            entry,
            marker,
            self.evaluator,
            self.edit_mode,
            Arc::clone(&self.clock),
        )
    }

    /// Called when an LDAP bind for the user failed.
    ///
    /// Returns whether the failure was handled here. Bind failures are
    /// never translated into a disabled account: the lock time attribute is
    /// the only source of lockout state this mapper trusts. Mapping directory
    /// error codes (such as Active Directory's `533`) to a disable would hook
    /// in here; no such mapping is implemented.
    #[instrument(skip(self, entry, account), fields(dn = %entry.dn(), username = %account.username()))]
    pub fn on_authentication_failure<E: DirectoryEntry, A: UserAccount>(
        &self,
        entry: &E,
        account: &A,
        message: &str,
    ) -> bool {
        debug!(
            attribute = self.evaluator.lock_attribute(),
            "LDAP authentication failure not handled by ppolicy mapper"
        );
        false
    }
}
