//! # Price Oracle
//!
//! Redemption is the only place EMBER touches market prices, and this is
//! the seam it touches them through. [`PriceOracle`] abstracts the feed;
//! the economic core neither knows nor cares whether quotes come from a
//! Pyth aggregator, a TWAP, or a test fixture. Two rules are imposed on
//! every implementation:
//!
//! 1. **Staleness is fatal.** A quote older than
//!    [`MAX_PRICE_AGE_MS`](crate::params::MAX_PRICE_AGE_MS) must report
//!    as not fresh, and redemption treats a non-fresh feed as "not
//!    feasible", never as "use the last price".
//! 2. **Conversions round against the protocol.** Collateral valuation
//!    rounds down, payout sizing rounds down. Nobody extracts dust by
//!    round-tripping through the oracle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::params::{MAX_PRICE_AGE_MS, MICRO_USD_PER_USD};

/// The trading pairs the protocol consumes.
///
/// Today that is exactly one: the collateral stablecoin against USD.
/// The enum exists so the trait does not need rework when a second
/// collateral asset lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PricePair {
    /// USDC/USD, quoted in micro-USD per whole USDC.
    UsdcUsd,
}

/// Read-only price feed consumed at redemption time.
pub trait PriceOracle {
    /// Latest quote for `pair`, in micro-USD per whole unit of the base
    /// asset. `None` when the feed has no quote at all.
    fn price_micro_usd(&self, pair: PricePair) -> Option<u64>;

    /// Returns `true` if the latest quote for `pair` is recent enough to
    /// act on (younger than [`MAX_PRICE_AGE_MS`]).
    fn is_fresh(&self, pair: PricePair, now: DateTime<Utc>) -> bool;

    /// Values `micro_usdc` of collateral in micro-USD at the current
    /// quote, rounding down. `None` when the feed has no quote.
    fn usdc_to_usd_value(&self, micro_usdc: u64) -> Option<u64> {
        let price = self.price_micro_usd(PricePair::UsdcUsd)?;
        let value = micro_usdc as u128 * price as u128 / MICRO_USD_PER_USD as u128;
        u64::try_from(value).ok()
    }

    /// Sizes a payout: how much micro-USDC is worth `micro_usd` at the
    /// current quote, rounding down. `None` when the feed has no quote
    /// or the quote is zero.
    fn usd_value_in_usdc(&self, micro_usd: u64) -> Option<u64> {
        let price = self.price_micro_usd(PricePair::UsdcUsd)?;
        if price == 0 {
            return None;
        }
        let units = micro_usd as u128 * MICRO_USD_PER_USD as u128 / price as u128;
        u64::try_from(units).ok()
    }
}

/// Deterministic oracle: one settable quote with an explicit timestamp.
///
/// This is the implementation the test suite and local tooling run
/// against. Production deployments plug a real aggregator in behind the
/// same trait.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FixedPriceOracle {
    price_micro_usd: u64,
    quoted_at: DateTime<Utc>,
}

impl FixedPriceOracle {
    /// A quote of `price_micro_usd` per USDC, stamped `quoted_at`.
    pub fn new(price_micro_usd: u64, quoted_at: DateTime<Utc>) -> Self {
        Self {
            price_micro_usd,
            quoted_at,
        }
    }

    /// A fresh 1:1 peg quote, the common case for tests.
    pub fn pegged(quoted_at: DateTime<Utc>) -> Self {
        Self::new(MICRO_USD_PER_USD, quoted_at)
    }

    /// Replaces the quote.
    pub fn set_price(&mut self, price_micro_usd: u64, quoted_at: DateTime<Utc>) {
        self.price_micro_usd = price_micro_usd;
        self.quoted_at = quoted_at;
    }
}

impl PriceOracle for FixedPriceOracle {
    fn price_micro_usd(&self, pair: PricePair) -> Option<u64> {
        match pair {
            PricePair::UsdcUsd => Some(self.price_micro_usd),
        }
    }

    fn is_fresh(&self, _pair: PricePair, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.quoted_at);
        age.num_milliseconds() >= 0 && (age.num_milliseconds() as u64) < MAX_PRICE_AGE_MS
    }
}
