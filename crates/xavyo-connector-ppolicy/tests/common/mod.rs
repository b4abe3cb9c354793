//! Shared test doubles for ppolicy mapper integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use xavyo_connector_ppolicy::prelude::*;

pub const USER_DN: &str = "uid=jdoe,ou=people,dc=example,dc=com";

/// Broker-side account with a plain enabled flag.
#[derive(Debug, Clone)]
pub struct BrokerAccount {
    pub username: String,
    pub enabled: bool,
    pub set_enabled_calls: usize,
}

impl BrokerAccount {
    pub fn new(enabled: bool) -> Self {
        Self {
            username: "jdoe".to_string(),
            enabled,
            set_enabled_calls: 0,
        }
    }
}

impl UserAccount for BrokerAccount {
    fn username(&self) -> &str {
        &self.username
    }

    fn is_enabled(&self) -> PpolicyResult<bool> {
        Ok(self.enabled)
    }

    fn set_enabled(&mut self, enabled: bool) -> PpolicyResult<()> {
        self.enabled = enabled;
        self.set_enabled_calls += 1;
        Ok(())
    }
}

/// Transaction marker recording every notification.
#[derive(Debug, Default)]
pub struct RecordingTransaction {
    pub updated: Vec<String>,
}

impl TransactionMarker for RecordingTransaction {
    fn mark_updated_attribute(&mut self, name: &str) -> PpolicyResult<()> {
        self.updated.push(name.to_string());
        Ok(())
    }
}

/// Query builder recording requested attributes.
#[derive(Debug, Default)]
pub struct RecordingQuery {
    pub returning: Vec<String>,
    pub read_only: Vec<String>,
}

impl QueryBuilder for RecordingQuery {
    fn add_returning_attribute(&mut self, name: &str) {
        self.returning.push(name.to_string());
    }

    fn add_returning_read_only_attribute(&mut self, name: &str) {
        self.read_only.push(name.to_string());
    }
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

/// Mapper with a frozen clock.
pub fn mapper_at(
    duration_secs: u64,
    edit_mode: EditMode,
    now: DateTime<Utc>,
) -> PpolicyMapper {
    let config = PpolicyMapperConfig::new().with_lockout_duration(duration_secs);
    PpolicyMapper::new(&config, edit_mode)
        .unwrap()
        .with_clock(Arc::new(FixedClock(now)))
}

/// Mapper with a frozen clock reading the legacy lock attribute.
pub fn legacy_mapper_at(
    duration_secs: u64,
    edit_mode: EditMode,
    now: DateTime<Utc>,
) -> PpolicyMapper {
    let config = PpolicyMapperConfig::new()
        .with_lockout_duration(duration_secs)
        .with_policy(LockoutPolicy::Legacy);
    PpolicyMapper::new(&config, edit_mode)
        .unwrap()
        .with_clock(Arc::new(FixedClock(now)))
}

/// Entry with an optional `pwdAccountLockedTime` value.
pub fn entry_with_lock(lock_time: Option<&str>) -> LdapEntry {
    let entry = LdapEntry::new(USER_DN).with_attribute("uid", "jdoe");
    match lock_time {
        Some(value) => entry.with_attribute("pwdAccountLockedTime", value),
        None => entry,
    }
}
