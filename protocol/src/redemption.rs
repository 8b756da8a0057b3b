//! # Redemption Gateway
//!
//! The exit door: a user hands points back, the backing vault pays out
//! stablecoin, and both books settle in the same logical step. This is
//! the only module that consumes the price oracle, and it is paranoid
//! about it — a stale or missing quote makes redemption *infeasible*,
//! never "approximately priced".
//!
//! ## Architecture
//!
//! ```text
//! check_feasible ── read-only dry run, never aborts, returns Feasibility
//!       │
//! redeem ─────────── validate (ledger + vault + oracle), then apply both
//!                    sides; no partial settlement is reachable
//! ```
//!
//! Atomicity follows the mint path: every fallible question is asked
//! through read-only `check_*` calls first, and only when all of them
//! pass do the infallible `apply_*` calls touch state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, ProtocolConfig};
use crate::ledger::{Ledger, LedgerError};
use crate::oracle::{PriceOracle, PricePair};
use crate::params::MIN_RESERVE_RATIO_BPS;
use crate::vault::{PartnerRegistry, PartnerVault, VaultError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything that can stop a redemption.
#[derive(Debug, Error)]
pub enum RedemptionError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("vault: {0}")]
    Vault(#[from] VaultError),

    /// The oracle quote is missing, zero, or older than the freshness
    /// window. Redemption does not price against history.
    #[error("oracle quote is stale or unusable")]
    StalePrice,

    #[error("redemption amount must be non-zero")]
    ZeroAmount,
}

// ---------------------------------------------------------------------------
// Feasibility
// ---------------------------------------------------------------------------

/// The answer to "would this redemption go through right now?".
///
/// Produced by [`check_feasible`], which never aborts: wallets and
/// partner dashboards poll it to grey out the redeem button instead of
/// letting users discover failures one aborted transaction at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feasibility {
    /// Whether [`redeem`] with the same arguments would succeed.
    pub feasible: bool,
    /// Backing ratio (bps) the vault would be left with. Meaningful
    /// only when a payout could be priced; zero otherwise.
    pub reserve_ratio_bps: u64,
    /// The payout the user would receive, in micro-USDC. Zero when the
    /// redemption is not priceable.
    pub payout_micro_usdc: u64,
}

impl Feasibility {
    fn no() -> Self {
        Self {
            feasible: false,
            reserve_ratio_bps: 0,
            payout_micro_usdc: 0,
        }
    }
}

/// Read-only dry run of [`redeem`]. Never aborts: every failure mode —
/// paused redemption, stale quote, insufficient balance, payout the
/// vault cannot cover, a post-settlement ratio below the reserve floor —
/// comes back as `feasible: false`.
pub fn check_feasible(
    config: &ProtocolConfig,
    ledger: &Ledger,
    vault: &PartnerVault,
    oracle: &dyn PriceOracle,
    user: &str,
    points: u64,
    now: DateTime<Utc>,
) -> Feasibility {
    let (release, payout) = match price_settlement(config, oracle, points, now) {
        Ok(pair) => pair,
        Err(_) => return Feasibility::no(),
    };

    let ratio = vault.post_settlement_ratio(release, payout);
    let feasible = ledger.check_burn(config, user, points).is_ok()
        && vault
            .check_settlement(release, payout, MIN_RESERVE_RATIO_BPS)
            .is_ok();

    Feasibility {
        feasible,
        reserve_ratio_bps: ratio,
        payout_micro_usdc: payout,
    }
}

// ---------------------------------------------------------------------------
// Redemption
// ---------------------------------------------------------------------------

/// Redeems `points` from `user`'s balance against `vault`, returning
/// the micro-USDC payout.
///
/// Settlement is all-or-nothing: the burn and the vault debit are
/// validated up front through read-only checks, and state on both sides
/// is only touched once every check has passed. An `Err` leaves ledger,
/// vault, and registry exactly as they were.
pub fn redeem(
    config: &ProtocolConfig,
    ledger: &mut Ledger,
    vault: &mut PartnerVault,
    registry: &mut PartnerRegistry,
    oracle: &dyn PriceOracle,
    user: &str,
    points: u64,
    now: DateTime<Utc>,
) -> Result<u64, RedemptionError> {
    config.assert_redemption_not_paused()?;
    let (release, payout) = price_settlement(config, oracle, points, now)?;

    // Validate both sides before either mutates.
    ledger.check_burn(config, user, points)?;
    vault.check_settlement(release, payout, MIN_RESERVE_RATIO_BPS)?;

    ledger.apply_burn(user, points, now);
    vault.apply_settlement(registry, release, payout);

    info!(
        user,
        points,
        payout,
        vault = %vault.id(),
        "redemption settled"
    );
    Ok(payout)
}

/// Prices a redemption: the reservation to release (the nominal backing
/// recorded at mint) and the payout (the same USD obligation valued at
/// the live quote, floor-rounded).
fn price_settlement(
    config: &ProtocolConfig,
    oracle: &dyn PriceOracle,
    points: u64,
    now: DateTime<Utc>,
) -> Result<(u64, u64), RedemptionError> {
    if points == 0 {
        return Err(RedemptionError::ZeroAmount);
    }
    if !oracle.is_fresh(PricePair::UsdcUsd, now) {
        return Err(RedemptionError::StalePrice);
    }
    let release = config.points_to_micro_usd(points)?;
    let payout = oracle
        .usd_value_in_usdc(release)
        .ok_or(RedemptionError::StalePrice)?;
    Ok((release, payout))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
