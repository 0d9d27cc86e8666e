//! Fixed-window submission counter.
//!
//! Each client (hashed IP) gets `max_submissions` per window. The window
//! starts with the first submission and the counter resets once more than
//! `window` has elapsed since then. Bursts straddling a window boundary are
//! not smoothed.

use chrono::{DateTime, TimeDelta, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::net::IpAddr;

/// Counter state for one client within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: DateTime<Utc>,
}

/// Limits applied by [`check`]
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub max_submissions: u32,
    pub window: TimeDelta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { count: u32 },
    Limited,
}

/// Session map key for a client address
pub fn client_key(ip: IpAddr) -> String {
    hex::encode(Sha256::digest(ip.to_string().as_bytes()))
}

/// Count one submission attempt for `key` at `now`
pub fn check(
    entries: &mut HashMap<String, RateLimitEntry>,
    key: &str,
    now: DateTime<Utc>,
    policy: &RateLimitPolicy,
) -> RateDecision {
    let Some(entry) = entries.get_mut(key) else {
        entries.insert(key.to_string(), fresh(now));
        return RateDecision::Allowed { count: 1 };
    };

    if now - entry.window_start > policy.window {
        *entry = fresh(now);
        return RateDecision::Allowed { count: 1 };
    }

    if entry.count >= policy.max_submissions {
        return RateDecision::Limited;
    }

    entry.count += 1;
    RateDecision::Allowed { count: entry.count }
}

const fn fresh(now: DateTime<Utc>) -> RateLimitEntry {
    RateLimitEntry {
        count: 1,
        window_start: now,
    }
}
