//! # OpenLDAP ppolicy Mapper
//!
//! Maps the OpenLDAP password-policy (ppolicy) lock time of a directory
//! account onto the enabled flag of the account in xavyo.
//!
//! The ppolicy overlay locks an account after too many failed binds by
//! writing `pwdAccountLockedTime`. This crate decides whether that lock is
//! still in force and keeps the attribute consistent when an administrator
//! enables or disables the account on the xavyo side.
//!
//! ## Features
//!
//! - RFC 4517 generalized time parsing
//! - Timed and permanent lockout windows
//! - Administrator lock sentinel (`000001010000Z`)
//! - Idempotent write-back recorded as `ldap3` modifications
//! - Legacy `pwdLockoutDuration` scheme selectable by configuration
//!
//! ## Example
//!
//! ```ignore
//! use xavyo_connector_ppolicy::prelude::*;
//!
//! let config = PpolicyMapperConfig::new().with_lockout_duration(900);
//! let mapper = PpolicyMapper::new(&config, EditMode::Writable)?;
//!
//! mapper.before_query(&mut query);
//!
//! let mut account = mapper.proxy(LdapEntry::from(search_entry), account, tx);
//! if !account.is_enabled()? {
//!     return Err(LoginError::AccountDisabled);
//! }
//! ```

pub mod bridge;
pub mod clock;
pub mod config;
pub mod entry;
pub mod error;
pub mod generalized_time;
pub mod lockout;
pub mod mapper;

// Re-exports
pub use bridge::AccountStateBridge;
pub use config::PpolicyMapperConfig;
pub use error::{PpolicyError, PpolicyResult};
pub use mapper::{PpolicyMapper, PROVIDER_ID};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bridge::AccountStateBridge;
    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::config::{ConfigProperty, PpolicyMapperConfig};
    pub use crate::entry::{
        DirectoryEntry, EditMode, LdapEntry, QueryBuilder, TransactionMarker, UserAccount,
    };
    pub use crate::error::{PpolicyError, PpolicyResult};
    pub use crate::lockout::{LockoutEvaluator, LockoutPolicy, LockoutRecord};
    pub use crate::mapper::PpolicyMapper;
}
