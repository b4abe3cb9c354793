//! Fuzz target for generalized time parsing and lock evaluation.
//!
//! This fuzzer feeds arbitrary lock time attribute values through the
//! parser and the lockout evaluator to ensure malformed directory data
//! is rejected with an error rather than a panic.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_generalized_time -- -max_total_time=600

#![no_main]

use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use xavyo_connector_ppolicy::generalized_time::parse_generalized_time;
use xavyo_connector_ppolicy::lockout::{LockoutPolicy, LockoutRecord, PERMANENT_LOCK_SENTINEL};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let parsed = parse_generalized_time(raw);

    let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    for policy in [LockoutPolicy::Ppolicy, LockoutPolicy::Legacy] {
        for duration in [0, 300, u64::MAX] {
            match LockoutRecord::evaluate(Some(raw), duration, policy) {
                Ok(record) => {
                    // Evaluation must never panic, whatever the window.
                    let _ = record.is_locked_at(now);
                    let _ = record.unlock_at();
                    if !record.is_permanent_sentinel {
                        assert!(parsed.is_ok());
                    }
                }
                Err(_) => {
                    // Only unparseable, non-sentinel values are rejected.
                    assert!(parsed.is_err());
                    assert_ne!(raw, PERMANENT_LOCK_SENTINEL);
                }
            }
        }
    }
});
