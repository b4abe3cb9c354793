//! Directory-side capabilities the mapper works against.
//!
//! The mapper never talks to the directory server itself. It reads and
//! mutates an entry that the LDAP provider already fetched, and the provider
//! flushes the recorded modifications in its own transaction.

use std::collections::{HashMap, HashSet};

use ldap3::{LdapResult, Mod, SearchEntry};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PpolicyError, PpolicyResult};

/// Broker-side attribute reported to the transaction marker when the
/// enabled state is written through to the directory.
pub const ENABLED_ATTRIBUTE: &str = "enabled";

/// How the LDAP provider treats local changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EditMode {
    /// The directory is never modified.
    #[default]
    ReadOnly,
    /// Changes are written back to the directory.
    Writable,
    /// Changes are kept locally and not written back.
    Unsynced,
}

impl EditMode {
    /// Whether attribute changes may be written to the directory.
    pub fn is_writable(self) -> bool {
        matches!(self, EditMode::Writable)
    }
}

/// A directory entry already loaded for the current request.
///
/// Writes report directory refusals with [`PpolicyError::AuthorizationFailed`],
/// [`PpolicyError::ConstraintViolation`] or [`PpolicyError::ObjectNotFound`],
/// and an unreachable server with [`PpolicyError::TargetUnavailable`].
pub trait DirectoryEntry {
    /// Distinguished name of the entry.
    fn dn(&self) -> &str;

    /// First value of an attribute, if present.
    fn get_attribute(&self, name: &str) -> Option<&str>;

    /// Replace an attribute with a single value, or remove it for `None`.
    fn set_attribute(&mut self, name: &str, value: Option<String>) -> PpolicyResult<()>;

    /// Remove an attribute entirely.
    fn remove_attribute(&mut self, name: &str) -> PpolicyResult<()>;
}

/// Identity-broker account whose enabled flag the mapper layers onto.
pub trait UserAccount {
    /// Login name of the account.
    fn username(&self) -> &str;

    /// Whether the account is enabled.
    fn is_enabled(&self) -> PpolicyResult<bool>;

    /// Enable or disable the account.
    fn set_enabled(&mut self, enabled: bool) -> PpolicyResult<()>;
}

/// Records attributes changed during the current transaction.
pub trait TransactionMarker {
    /// Note that a broker attribute was written to the directory.
    fn mark_updated_attribute(&mut self, name: &str) -> PpolicyResult<()>;
}

/// Attribute selection for directory queries.
pub trait QueryBuilder {
    /// Request an attribute in query results.
    fn add_returning_attribute(&mut self, name: &str);

    /// Request an attribute and mark it as not writable.
    fn add_returning_read_only_attribute(&mut self, name: &str);
}

/// In-memory LDAP entry that records modifications as [`ldap3::Mod`]s.
///
/// Attribute names are matched case-insensitively (RFC 4512). Attributes
/// marked read-only reject writes the way a server would reject a modify
/// on a `NO-USER-MODIFICATION` attribute.
#[derive(Debug, Default)]
pub struct LdapEntry {
    dn: String,
    attrs: HashMap<String, Vec<String>>,
    read_only: HashSet<String>,
    modifications: Vec<Mod<String>>,
}

impl LdapEntry {
    /// Create an entry with no attributes.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            ..Self::default()
        }
    }

    /// Add a single-valued attribute using builder pattern.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let key = self.stored_name(&name).unwrap_or(name);
        self.attrs.insert(key, vec![value.into()]);
        self
    }

    /// Reject future writes to an attribute.
    pub fn mark_read_only(&mut self, name: &str) {
        self.read_only.insert(name.to_lowercase());
    }

    /// Modifications recorded since the entry was loaded.
    pub fn modifications(&self) -> &[Mod<String>] {
        &self.modifications
    }

    /// Drain recorded modifications for an LDAP modify request.
    pub fn take_modifications(&mut self) -> Vec<Mod<String>> {
        std::mem::take(&mut self.modifications)
    }

    /// Map the result of flushing the recorded modifications.
    ///
    /// # Errors
    ///
    /// Returns the error matching the LDAP result code when it is not
    /// `success`.
    pub fn check_modify_result(&self, result: &LdapResult) -> PpolicyResult<()> {
        match result.rc {
            0 => {
                debug!(dn = %self.dn, "LDAP entry modified");
                Ok(())
            }
            // noSuchObject
            32 => Err(PpolicyError::ObjectNotFound {
                identifier: self.dn.clone(),
            }),
            // insufficientAccessRights
            50 => Err(PpolicyError::AuthorizationFailed {
                operation: format!("modify of {}", self.dn),
            }),
            // constraintViolation, invalidAttributeSyntax, undefinedAttributeType
            17 | 19 | 21 => Err(PpolicyError::ConstraintViolation {
                message: format!("LDAP modify failed with code {}: {}", result.rc, result.text),
            }),
            // busy, unavailable, serverDown
            51 | 52 | 81 => Err(PpolicyError::TargetUnavailable {
                message: format!("LDAP modify failed with code {}: {}", result.rc, result.text),
            }),
            rc => Err(PpolicyError::operation_failed(format!(
                "LDAP modify failed with code {}: {}",
                rc, result.text
            ))),
        }
    }

    fn stored_name(&self, name: &str) -> Option<String> {
        self.attrs
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned()
    }

    fn check_writable(&self, name: &str) -> PpolicyResult<()> {
        if self.read_only.contains(&name.to_lowercase()) {
            return Err(PpolicyError::AuthorizationFailed {
                operation: format!("modify of {name} on {}", self.dn),
            });
        }
        Ok(())
    }
}

impl From<SearchEntry> for LdapEntry {
    fn from(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attrs: entry.attrs,
            ..Self::default()
        }
    }
}

impl DirectoryEntry for LdapEntry {
    fn dn(&self) -> &str {
        &self.dn
    }

    fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    fn set_attribute(&mut self, name: &str, value: Option<String>) -> PpolicyResult<()> {
        let Some(value) = value else {
            return self.remove_attribute(name);
        };
        self.check_writable(name)?;

        let key = self.stored_name(name).unwrap_or_else(|| name.to_string());
        debug!(dn = %self.dn, attribute = %key, "Replacing attribute");
        self.attrs.insert(key.clone(), vec![value.clone()]);
        self.modifications
            .push(Mod::Replace(key, HashSet::from([value])));
        Ok(())
    }

    fn remove_attribute(&mut self, name: &str) -> PpolicyResult<()> {
        self.check_writable(name)?;

        // Deleting an absent attribute would fail with noSuchAttribute.
        let Some(key) = self.stored_name(name) else {
            return Ok(());
        };
        debug!(dn = %self.dn, attribute = %key, "Removing attribute");
        self.attrs.remove(&key);
        self.modifications.push(Mod::Delete(key, HashSet::new()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DN: &str = "uid=jdoe,ou=people,dc=example,dc=com";

    #[test]
    fn test_edit_mode_writable() {
        assert!(EditMode::Writable.is_writable());
        assert!(!EditMode::ReadOnly.is_writable());
        assert!(!EditMode::Unsynced.is_writable());
        assert_eq!(EditMode::default(), EditMode::ReadOnly);
    }

    #[test]
    fn test_edit_mode_serde() {
        let parsed: EditMode = serde_json::from_str("\"WRITABLE\"").unwrap();
        assert_eq!(parsed, EditMode::Writable);
        assert_eq!(
            serde_json::to_string(&EditMode::ReadOnly).unwrap(),
            "\"READ_ONLY\""
        );
    }

    #[test]
    fn test_get_attribute_case_insensitive() {
        let entry = LdapEntry::new(DN).with_attribute("pwdAccountLockedTime", "20240101120000Z");
        assert_eq!(
            entry.get_attribute("pwdaccountlockedtime"),
            Some("20240101120000Z")
        );
        assert_eq!(entry.get_attribute("mail"), None);
        assert_eq!(entry.dn(), DN);
    }

    #[test]
    fn test_with_attribute_replaces_differently_cased_name() {
        let entry = LdapEntry::new(DN)
            .with_attribute("pwdAccountLockedTime", "20240101120000Z")
            .with_attribute("PWDACCOUNTLOCKEDTIME", "000001010000Z");

        assert_eq!(entry.attrs.len(), 1);
        assert!(entry.attrs.contains_key("pwdAccountLockedTime"));
        assert_eq!(
            entry.get_attribute("pwdAccountLockedTime"),
            Some("000001010000Z")
        );
    }

    #[test]
    fn test_check_modify_result() {
        fn result(rc: u32) -> LdapResult {
            LdapResult {
                rc,
                matched: String::new(),
                text: "rejected".to_string(),
                refs: vec![],
                ctrls: vec![],
            }
        }

        let entry = LdapEntry::new(DN);
        assert!(entry.check_modify_result(&result(0)).is_ok());
        assert!(matches!(
            entry.check_modify_result(&result(32)),
            Err(PpolicyError::ObjectNotFound { identifier }) if identifier == DN
        ));
        assert!(matches!(
            entry.check_modify_result(&result(50)),
            Err(PpolicyError::AuthorizationFailed { .. })
        ));
        assert!(matches!(
            entry.check_modify_result(&result(19)),
            Err(PpolicyError::ConstraintViolation { .. })
        ));

        let err = entry.check_modify_result(&result(52)).unwrap_err();
        assert!(matches!(err, PpolicyError::TargetUnavailable { .. }));
        assert!(err.is_transient());

        let err = entry.check_modify_result(&result(80)).unwrap_err();
        assert_eq!(err.error_code(), "OPERATION_FAILED");
        assert_eq!(err.to_string(), "operation failed: LDAP modify failed with code 80: rejected");
    }

    #[test]
    fn test_from_search_entry() {
        let search_entry = SearchEntry {
            dn: DN.to_string(),
            attrs: HashMap::from([
                ("uid".to_string(), vec!["jdoe".to_string()]),
                (
                    "pwdAccountLockedTime".to_string(),
                    vec!["000001010000Z".to_string()],
                ),
            ]),
            bin_attrs: HashMap::new(),
        };

        let entry = LdapEntry::from(search_entry);
        assert_eq!(entry.dn(), DN);
        assert_eq!(entry.get_attribute("uid"), Some("jdoe"));
        assert_eq!(
            entry.get_attribute("pwdAccountLockedTime"),
            Some("000001010000Z")
        );
        assert!(entry.modifications().is_empty());
    }

    #[test]
    fn test_set_attribute_records_replace() {
        let mut entry = LdapEntry::new(DN).with_attribute("PwdAccountLockedTime", "20240101120000Z");
        entry
            .set_attribute("pwdAccountLockedTime", Some("000001010000Z".to_string()))
            .unwrap();

        assert_eq!(
            entry.get_attribute("pwdAccountLockedTime"),
            Some("000001010000Z")
        );
        let mods = entry.take_modifications();
        assert_eq!(mods.len(), 1);
        match &mods[0] {
            Mod::Replace(name, values) => {
                // Existing spelling of the attribute name is kept.
                assert_eq!(name, "PwdAccountLockedTime");
                assert!(values.contains("000001010000Z"));
            }
            other => panic!("Expected Replace, got {other:?}"),
        }
        assert!(entry.modifications().is_empty());
    }

    #[test]
    fn test_set_none_removes() {
        let mut entry = LdapEntry::new(DN).with_attribute("pwdAccountLockedTime", "20240101120000Z");
        entry.set_attribute("pwdAccountLockedTime", None).unwrap();

        assert_eq!(entry.get_attribute("pwdAccountLockedTime"), None);
        assert!(matches!(
            entry.modifications(),
            [Mod::Delete(name, values)] if name == "pwdAccountLockedTime" && values.is_empty()
        ));
    }

    #[test]
    fn test_remove_absent_attribute_is_noop() {
        let mut entry = LdapEntry::new(DN);
        entry.remove_attribute("pwdAccountLockedTime").unwrap();
        assert!(entry.modifications().is_empty());
    }

    #[test]
    fn test_read_only_attribute_rejects_writes() {
        let mut entry = LdapEntry::new(DN).with_attribute("pwdAccountLockedTime", "20240101120000Z");
        entry.mark_read_only("pwdAccountLockedTime");

        let err = entry.remove_attribute("PWDACCOUNTLOCKEDTIME").unwrap_err();
        assert!(matches!(err, PpolicyError::AuthorizationFailed { .. }));
        let err = entry
            .set_attribute("pwdAccountLockedTime", Some("000001010000Z".to_string()))
            .unwrap_err();
        assert_eq!(err.error_code(), "AUTHORIZATION_FAILED");

        assert_eq!(
            entry.get_attribute("pwdAccountLockedTime"),
            Some("20240101120000Z")
        );
        assert!(entry.modifications().is_empty());
    }
}
