//! # Day-Bucket Usage Windows
//!
//! A [`UsageWindow`] is the stored half of the scheduler-free daily cap:
//! a `(bucket, used)` pair recomputed lazily from the caller-supplied
//! timestamp. When an operation arrives with a different bucket than the
//! stored one, the counter is logically zero — "daily reset" is just a
//! comparison, never a background job.
//!
//! The same primitive backs the ledger's per-user and global mint caps,
//! the vault's daily minting quota, and the vault's withdrawal-rate rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::params::DAY_MS;

/// Maps a timestamp to its day bucket: `timestamp_ms / DAY_MS`.
///
/// Timestamps before the epoch clamp to bucket 0; the protocol does not
/// operate in 1969.
pub fn day_bucket(now: DateTime<Utc>) -> u64 {
    let ms = now.timestamp_millis().max(0) as u64;
    ms / DAY_MS
}

/// One daily rate-limit counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageWindow {
    /// The day bucket the counter belongs to.
    bucket: u64,
    /// Amount consumed within that bucket.
    used: u64,
}

impl UsageWindow {
    /// Returns the amount consumed in `bucket`, treating a stored
    /// counter from any other bucket as zero.
    pub fn used_in(&self, bucket: u64) -> u64 {
        if self.bucket == bucket {
            self.used
        } else {
            0
        }
    }

    /// Returns `true` if consuming `amount` in `bucket` stays within `cap`.
    pub fn fits(&self, bucket: u64, amount: u64, cap: u64) -> bool {
        match self.used_in(bucket).checked_add(amount) {
            Some(total) => total <= cap,
            None => false,
        }
    }

    /// Records `amount` consumed in `bucket`, resetting first if the
    /// stored counter belongs to an older (or newer) bucket.
    ///
    /// Callers must have verified [`fits`](Self::fits); saturation here
    /// is belt-only, the suspenders live in the precondition checks.
    pub fn record(&mut self, bucket: u64, amount: u64) {
        if self.bucket != bucket {
            self.bucket = bucket;
            self.used = 0;
        }
        self.used = self.used.saturating_add(amount);
    }
}
