//! # Partner Vault
//!
//! One [`PartnerVault`] per partner: collateral custody, reservation
//! accounting against minted points, a daily minting quota, and DeFi
//! yield bookkeeping. The vault is created together with its
//! [`PartnerCap`] and accepts mutations only from that capability —
//! the same forgery defense the config store uses for its admin cap.
//!
//! ## Backing Model
//!
//! `reserved` grows when points are minted against this vault and shrinks
//! when they are burned or redeemed. `backing_ratio = balance / reserved`
//! in bps (10_000 when nothing is reserved). The health factor is the
//! same ratio clamped to [0, 10_000]: a vault at exactly 10_000 is fully
//! backed; anything below means trouble that redemption feasibility
//! refuses to make worse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::PartnerCap;
use crate::config::{ConfigError, ProtocolConfig};
use crate::ledger::window::{day_bucket, UsageWindow};
use crate::params::{
    BPS_DENOMINATOR, MAX_DAILY_QUOTA, MAX_DAILY_WITHDRAWAL_BPS, MAX_NAME_LEN,
    MIN_DAILY_QUOTA, MIN_HARVEST_INTERVAL_MS, MIN_VAULT_COLLATERAL,
};

use super::registry::PartnerRegistry;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The capability is not bound to this vault.
    #[error("partner capability {presented} is not bound to vault {vault_id}")]
    Unauthorized {
        /// Id of the rejected capability.
        presented: Uuid,
        /// This vault's id.
        vault_id: Uuid,
    },

    /// The vault has been deactivated; all mutations are rejected.
    #[error("vault {0} is inactive")]
    VaultInactive(Uuid),

    /// A reservation would exceed the vault's balance.
    #[error(
        "insufficient backing: balance {balance}, reserved {reserved}, reservation delta {requested}"
    )]
    InsufficientBacking {
        /// Current collateral balance (micro-USDC).
        balance: u64,
        /// Already reserved (micro-USDC).
        reserved: u64,
        /// The rejected reservation delta (micro-USDC).
        requested: u64,
    },

    /// The vault's daily minting quota would be exceeded.
    #[error("daily quota exceeded: {used_today} points minted today, quota {quota}, requested {requested}")]
    QuotaExceeded {
        /// Points minted against this vault in the current bucket.
        used_today: u64,
        /// The vault's daily quota.
        quota: u64,
        /// The rejected points amount.
        requested: u64,
    },

    /// Withdrawal or DeFi transfer exceeds unreserved collateral.
    #[error("insufficient collateral: available {available}, requested {requested}")]
    InsufficientCollateral {
        /// Unreserved collateral (balance − reserved).
        available: u64,
        /// The rejected amount.
        requested: u64,
    },

    /// The daily withdrawal-rate rule would be exceeded.
    #[error(
        "withdrawal rate limited: {withdrawn_today} withdrawn today, daily max {daily_max}, requested {requested}"
    )]
    WithdrawalRateLimited {
        /// Micro-USDC withdrawn in the current bucket.
        withdrawn_today: u64,
        /// Today's withdrawal ceiling.
        daily_max: u64,
        /// The rejected amount.
        requested: u64,
    },

    /// Harvest called on a vault with no DeFi position.
    #[error("vault {0} has no active DeFi position")]
    DefiNotEnabled(Uuid),

    /// DeFi transfer called while a position is already open.
    #[error("vault {0} already has an open DeFi position")]
    DefiAlreadyEnabled(Uuid),

    /// Harvest called before the minimum interval elapsed.
    #[error("harvest too soon: last at {last}, minimum interval {min_interval_ms} ms")]
    HarvestTooSoon {
        /// Previous harvest (or position opening) time.
        last: DateTime<Utc>,
        /// Required spacing.
        min_interval_ms: u64,
    },

    /// Deactivation attempted with points still backed by this vault.
    #[error("vault {vault_id} still has {reserved} micro-USDC reserved")]
    StillReserved {
        /// The vault id.
        vault_id: Uuid,
        /// Outstanding reservation.
        reserved: u64,
    },

    /// Zero-amount operations are no-ops and likely caller bugs.
    #[error("zero-amount operations are not permitted")]
    ZeroAmount,

    /// Empty/oversized strings, undersized collateral, quota out of band.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Arithmetic overflow on a balance credit.
    #[error("vault balance overflow: current {current}, credit {credit}")]
    Overflow {
        /// Current balance.
        current: u64,
        /// The amount that caused the overflow.
        credit: u64,
    },

    /// Pause flag or conversion failure from the config store.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// DefiPosition
// ---------------------------------------------------------------------------

/// An open DeFi position: collateral whose custody moved to an external
/// protocol while the vault's logical identity and accounting history
/// stayed put.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DefiPosition {
    /// Name of the external protocol (e.g. "scallop", "navi").
    pub protocol_name: String,
    /// Address holding custody.
    pub recipient: String,
    /// Micro-USDC deposited into the position.
    pub deposited: u64,
    /// When the position was opened.
    pub since: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// PartnerVault
// ---------------------------------------------------------------------------

/// Collateral custody for one partner.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PartnerVault {
    /// Unique vault id; the partner capability binds to it.
    id: Uuid,

    /// Partner address that owns this vault.
    owner: String,

    /// Collateral held, in micro-USDC.
    balance: u64,

    /// Collateral committed against minted points, in micro-USDC.
    /// Invariant: `reserved <= balance` whenever no DeFi position is
    /// holding part of the backing externally.
    reserved: u64,

    /// Daily minting quota, in points per day bucket.
    daily_quota: u64,

    /// Points minted against this vault per day bucket.
    quota_window: UsageWindow,

    /// Micro-USDC withdrawn per day bucket.
    withdrawal_window: UsageWindow,

    /// Open DeFi position, if any.
    defi: Option<DefiPosition>,

    /// Cumulative harvested yield, in micro-USDC.
    lifetime_yield: u64,

    /// When yield was last harvested.
    last_harvest: Option<DateTime<Utc>>,

    /// Deactivated vaults reject all mutations.
    active: bool,

    /// When this vault was created (supplied clock).
    created_at: DateTime<Utc>,
}

impl PartnerVault {
    /// Registers a partner: creates the vault with its initial collateral
    /// and mints the one [`PartnerCap`] bound to it.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Config`] if the protocol is emergency-paused.
    /// - [`VaultError::InvalidInput`] for an empty/oversized owner
    ///   address, collateral below [`MIN_VAULT_COLLATERAL`], or a quota
    ///   outside its band.
    pub fn create(
        config: &ProtocolConfig,
        registry: &mut PartnerRegistry,
        owner: &str,
        initial_collateral: u64,
        daily_quota: u64,
        generation_id: u64,
        now: DateTime<Utc>,
    ) -> Result<(PartnerCap, PartnerVault), VaultError> {
        config.assert_not_paused()?;
        if owner.is_empty() || owner.len() > MAX_NAME_LEN {
            return Err(VaultError::InvalidInput("owner address".into()));
        }
        if initial_collateral < MIN_VAULT_COLLATERAL {
            return Err(VaultError::InvalidInput(format!(
                "initial collateral {initial_collateral} below minimum {MIN_VAULT_COLLATERAL}"
            )));
        }
        if !(MIN_DAILY_QUOTA..=MAX_DAILY_QUOTA).contains(&daily_quota) {
            return Err(VaultError::InvalidInput(format!(
                "daily quota {daily_quota} outside [{MIN_DAILY_QUOTA}, {MAX_DAILY_QUOTA}]"
            )));
        }

        let id = Uuid::new_v4();
        let cap = PartnerCap::mint(id, owner, generation_id);
        let vault = PartnerVault {
            id,
            owner: owner.to_string(),
            balance: initial_collateral,
            reserved: 0,
            daily_quota,
            quota_window: UsageWindow::default(),
            withdrawal_window: UsageWindow::default(),
            defi: None,
            lifetime_yield: 0,
            last_harvest: None,
            active: true,
            created_at: now,
        };

        registry.record_created(initial_collateral);
        info!(vault = %id, owner, initial_collateral, "partner vault created");
        Ok((cap, vault))
    }

    // -----------------------------------------------------------------------
    // Getters
    // -----------------------------------------------------------------------

    /// This vault's unique id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The owning partner's address.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Collateral held, in micro-USDC.
    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// Collateral committed against minted points.
    pub fn reserved(&self) -> u64 {
        self.reserved
    }

    /// Daily minting quota, in points.
    pub fn daily_quota(&self) -> u64 {
        self.daily_quota
    }

    /// Unreserved collateral: `balance − reserved`.
    pub fn available_collateral(&self) -> u64 {
        self.balance - self.reserved
    }

    /// The open DeFi position, if any.
    pub fn defi(&self) -> Option<&DefiPosition> {
        self.defi.as_ref()
    }

    /// Cumulative harvested yield.
    pub fn lifetime_yield(&self) -> u64 {
        self.lifetime_yield
    }

    /// `false` once the vault has been deactivated.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// When this vault was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Balance-to-reserved ratio in bps. 10_000 when nothing is
    /// reserved; may exceed 10_000 for over-collateralized vaults.
    pub fn backing_ratio(&self) -> u64 {
        raw_backing_ratio(self.balance, self.reserved)
    }

    /// Backing ratio clamped to [0, 10_000]. 10_000 = fully backed.
    pub fn health_factor(&self) -> u64 {
        self.backing_ratio().min(BPS_DENOMINATOR)
    }

    /// Returns `true` if the vault could back a mint of `points` right
    /// now, ignoring the daily quota. Oracle-independent.
    pub fn can_support_points_minting(&self, config: &ProtocolConfig, points: u64) -> bool {
        if !self.active {
            return false;
        }
        match config.points_to_micro_usd(points) {
            Ok(delta) => match self.reserved.checked_add(delta) {
                Some(total) => total <= self.balance,
                None => false,
            },
            Err(_) => false,
        }
    }

    // -----------------------------------------------------------------------
    // Reservation
    // -----------------------------------------------------------------------

    /// Reserves backing for a mint of `points`. Returns the reservation
    /// delta in micro-USDC.
    ///
    /// Called by the mint-with-backing flow
    /// ([`Ledger::mint_backed`](crate::ledger::Ledger::mint_backed));
    /// not intended as a standalone entry point.
    ///
    /// # Errors
    ///
    /// - [`VaultError::QuotaExceeded`] beyond the vault's daily quota.
    /// - [`VaultError::InsufficientBacking`] if `reserved + delta`
    ///   exceeds `balance`.
    pub fn reserve_for_mint(
        &mut self,
        cap: &PartnerCap,
        config: &ProtocolConfig,
        points: u64,
        now: DateTime<Utc>,
    ) -> Result<u64, VaultError> {
        self.check_cap(cap)?;
        self.check_active()?;
        if points == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let bucket = day_bucket(now);
        if !self.quota_window.fits(bucket, points, self.daily_quota) {
            return Err(VaultError::QuotaExceeded {
                used_today: self.quota_window.used_in(bucket),
                quota: self.daily_quota,
                requested: points,
            });
        }

        let delta = config.points_to_micro_usd(points)?;
        let new_reserved = self
            .reserved
            .checked_add(delta)
            .filter(|&r| r <= self.balance)
            .ok_or(VaultError::InsufficientBacking {
                balance: self.balance,
                reserved: self.reserved,
                requested: delta,
            })?;

        self.reserved = new_reserved;
        self.quota_window.record(bucket, points);
        debug!(vault = %self.id, points, delta, "backing reserved");
        Ok(delta)
    }

    /// Releases backing when `points` are burned. Releases at most what
    /// is reserved; rounding drift over many mints can leave the release
    /// side slightly ahead, never behind.
    pub fn release_on_burn(
        &mut self,
        cap: &PartnerCap,
        config: &ProtocolConfig,
        points: u64,
    ) -> Result<u64, VaultError> {
        self.check_cap(cap)?;
        self.check_active()?;
        if points == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let delta = config.points_to_micro_usd(points)?.min(self.reserved);
        self.reserved -= delta;
        debug!(vault = %self.id, points, delta, "backing released");
        Ok(delta)
    }

    // -----------------------------------------------------------------------
    // Withdrawal / Deposit
    // -----------------------------------------------------------------------

    /// Withdraws unreserved collateral.
    ///
    /// Capped by `balance − reserved` and by the daily withdrawal-rate
    /// rule: at most [`MAX_DAILY_WITHDRAWAL_BPS`] of the pre-withdrawal
    /// balance per day bucket. Returns the withdrawn amount.
    pub fn withdraw(
        &mut self,
        cap: &PartnerCap,
        config: &ProtocolConfig,
        registry: &mut PartnerRegistry,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<u64, VaultError> {
        self.check_cap(cap)?;
        self.check_active()?;
        config.assert_not_paused()?;
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let available = self.available_collateral();
        if amount > available {
            return Err(VaultError::InsufficientCollateral {
                available,
                requested: amount,
            });
        }

        let bucket = day_bucket(now);
        let daily_max =
            (self.balance as u128 * MAX_DAILY_WITHDRAWAL_BPS as u128 / BPS_DENOMINATOR as u128)
                as u64;
        if !self.withdrawal_window.fits(bucket, amount, daily_max) {
            return Err(VaultError::WithdrawalRateLimited {
                withdrawn_today: self.withdrawal_window.used_in(bucket),
                daily_max,
                requested: amount,
            });
        }

        self.balance -= amount;
        self.withdrawal_window.record(bucket, amount);
        registry.record_withdrawn(amount);
        info!(vault = %self.id, amount, "collateral withdrawn");
        Ok(amount)
    }

    /// Tops up the vault's collateral.
    pub fn deposit(
        &mut self,
        cap: &PartnerCap,
        config: &ProtocolConfig,
        registry: &mut PartnerRegistry,
        amount: u64,
    ) -> Result<u64, VaultError> {
        self.check_cap(cap)?;
        self.check_active()?;
        config.assert_not_paused()?;
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }

        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(VaultError::Overflow {
                current: self.balance,
                credit: amount,
            })?;
        registry.record_deposited(amount);
        Ok(self.balance)
    }

    // -----------------------------------------------------------------------
    // DeFi
    // -----------------------------------------------------------------------

    /// Moves custody of `amount` unreserved collateral to an external
    /// DeFi protocol. The vault's identity, reservations, and accounting
    /// history persist unchanged; only custody moves.
    pub fn transfer_to_defi(
        &mut self,
        cap: &PartnerCap,
        config: &ProtocolConfig,
        registry: &mut PartnerRegistry,
        protocol_name: &str,
        recipient: &str,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<(), VaultError> {
        self.check_cap(cap)?;
        self.check_active()?;
        config.assert_not_paused()?;
        if self.defi.is_some() {
            return Err(VaultError::DefiAlreadyEnabled(self.id));
        }
        if protocol_name.is_empty() || protocol_name.len() > MAX_NAME_LEN {
            return Err(VaultError::InvalidInput("protocol name".into()));
        }
        if recipient.is_empty() || recipient.len() > MAX_NAME_LEN {
            return Err(VaultError::InvalidInput("recipient address".into()));
        }
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let available = self.available_collateral();
        if amount > available {
            return Err(VaultError::InsufficientCollateral {
                available,
                requested: amount,
            });
        }

        self.balance -= amount;
        self.defi = Some(DefiPosition {
            protocol_name: protocol_name.to_string(),
            recipient: recipient.to_string(),
            deposited: amount,
            since: now,
        });
        registry.record_defi_transfer(amount);
        info!(vault = %self.id, protocol_name, amount, "custody moved to DeFi");
        Ok(())
    }

    /// Books harvested yield: increases `balance` and `lifetime_yield`,
    /// never `reserved`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::DefiNotEnabled`] without an open position.
    /// - [`VaultError::HarvestTooSoon`] before
    ///   [`MIN_HARVEST_INTERVAL_MS`] has elapsed since the previous
    ///   harvest (or since the position opened, for the first one).
    pub fn harvest_yield(
        &mut self,
        cap: &PartnerCap,
        config: &ProtocolConfig,
        registry: &mut PartnerRegistry,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<u64, VaultError> {
        self.check_cap(cap)?;
        self.check_active()?;
        config.assert_not_paused()?;
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let position = self.defi.as_ref().ok_or(VaultError::DefiNotEnabled(self.id))?;

        let last = self.last_harvest.unwrap_or(position.since);
        let elapsed_ms = (now - last).num_milliseconds().max(0) as u64;
        if elapsed_ms < MIN_HARVEST_INTERVAL_MS {
            return Err(VaultError::HarvestTooSoon {
                last,
                min_interval_ms: MIN_HARVEST_INTERVAL_MS,
            });
        }

        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(VaultError::Overflow {
                current: self.balance,
                credit: amount,
            })?;
        self.lifetime_yield = self.lifetime_yield.saturating_add(amount);
        self.last_harvest = Some(now);
        registry.record_harvest(amount);
        debug!(vault = %self.id, amount, "yield harvested");
        Ok(self.lifetime_yield)
    }

    // -----------------------------------------------------------------------
    // Deactivation
    // -----------------------------------------------------------------------

    /// Retires the vault. Requires every reservation to be released
    /// first; a deactivated vault rejects all further mutations.
    pub fn deactivate(
        &mut self,
        cap: &PartnerCap,
        registry: &mut PartnerRegistry,
    ) -> Result<(), VaultError> {
        self.check_cap(cap)?;
        self.check_active()?;
        if self.reserved > 0 {
            return Err(VaultError::StillReserved {
                vault_id: self.id,
                reserved: self.reserved,
            });
        }

        self.active = false;
        let defi_deposited = self.defi.as_ref().map_or(0, |p| p.deposited);
        registry.record_deactivated(self.balance, defi_deposited, self.lifetime_yield);
        info!(vault = %self.id, "vault deactivated");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Redemption Settlement (crate-internal, gateway only)
    // -----------------------------------------------------------------------

    /// Read-only settlement precondition: the payout must fit the
    /// balance, and the post-settlement backing ratio must not fall
    /// below `min_ratio_bps`.
    pub(crate) fn check_settlement(
        &self,
        release: u64,
        payout: u64,
        min_ratio_bps: u64,
    ) -> Result<(), VaultError> {
        self.check_active()?;
        if payout > self.balance {
            return Err(VaultError::InsufficientCollateral {
                available: self.balance,
                requested: payout,
            });
        }
        let post_balance = self.balance - payout;
        let post_reserved = self.reserved.saturating_sub(release);
        if raw_backing_ratio(post_balance, post_reserved) < min_ratio_bps {
            return Err(VaultError::InsufficientBacking {
                balance: post_balance,
                reserved: post_reserved,
                requested: payout,
            });
        }
        Ok(())
    }

    /// Backing ratio the vault would have after settling `(release,
    /// payout)`. Saturates rather than aborting; pair with
    /// [`check_settlement`](Self::check_settlement) before acting on it.
    pub(crate) fn post_settlement_ratio(&self, release: u64, payout: u64) -> u64 {
        let post_balance = self.balance.saturating_sub(payout);
        let post_reserved = self.reserved.saturating_sub(release);
        raw_backing_ratio(post_balance, post_reserved)
    }

    /// Applies a settlement validated by
    /// [`check_settlement`](Self::check_settlement): releases the
    /// reservation and debits the payout.
    pub(crate) fn apply_settlement(
        &mut self,
        registry: &mut PartnerRegistry,
        release: u64,
        payout: u64,
    ) {
        self.reserved = self.reserved.saturating_sub(release);
        self.balance = self.balance.saturating_sub(payout);
        registry.record_withdrawn(payout);
    }

    // -----------------------------------------------------------------------
    // Internal Checks
    // -----------------------------------------------------------------------

    fn check_cap(&self, cap: &PartnerCap) -> Result<(), VaultError> {
        if cap.vault_id() != self.id {
            return Err(VaultError::Unauthorized {
                presented: cap.id(),
                vault_id: self.id,
            });
        }
        Ok(())
    }

    fn check_active(&self) -> Result<(), VaultError> {
        if !self.active {
            return Err(VaultError::VaultInactive(self.id));
        }
        Ok(())
    }
}

/// Balance-to-reserved ratio in bps; 10_000 when nothing is reserved.
fn raw_backing_ratio(balance: u64, reserved: u64) -> u64 {
    if reserved == 0 {
        return BPS_DENOMINATOR;
    }
    let ratio = (balance as u128) * (BPS_DENOMINATOR as u128) / (reserved as u128);
    u64::try_from(ratio).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
