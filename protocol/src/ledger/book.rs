//! # Points Ledger
//!
//! The [`Ledger`] tracks every user's available and locked points plus
//! the global mint/burn totals and the daily-cap windows. It is a
//! singleton aggregate passed by explicit reference into every operation
//! — never a hidden global — so tests construct isolated instances.
//!
//! ## Precondition Order
//!
//! Mint checks run in a fixed order: emergency pause, mint pause, zero
//! amount, user validity, per-user daily cap, global daily cap, supply
//! ceiling, overflow. Burn: emergency pause, redemption pause, zero
//! amount, available balance. All checks complete before any field
//! changes; a failed operation leaves the ledger byte-identical.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::auth::PartnerCap;
use crate::config::{ConfigError, ProtocolConfig};
use crate::params::{AUDIT_TRAIL_CAP, MAX_NAME_LEN};
use crate::vault::{PartnerVault, VaultError};

use super::window::{day_bucket, UsageWindow};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Which daily cap a mint ran into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapScope {
    /// The per-user daily cap.
    User,
    /// The global daily cap.
    Global,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A pause flag blocked the operation.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Vault-side reservation failed during a backed mint.
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    /// Zero-amount operations are no-ops and likely caller bugs.
    #[error("zero-amount operations are not permitted")]
    ZeroAmount,

    /// Empty or oversized user address.
    #[error("invalid user address: {0}")]
    InvalidUser(String),

    /// A daily mint cap would be exceeded.
    #[error(
        "daily {scope:?} cap exceeded: minted {minted_today} today, cap {cap}, requested {requested}"
    )]
    DailyLimitExceeded {
        /// Which cap fired.
        scope: CapScope,
        /// Points already minted in the current bucket.
        minted_today: u64,
        /// The cap.
        cap: u64,
        /// The rejected amount.
        requested: u64,
    },

    /// The cumulative supply ceiling would be exceeded.
    #[error("supply cap exceeded: total minted {total_minted}, cap {cap}, requested {requested}")]
    SupplyCapExceeded {
        /// Points minted over the protocol's life.
        total_minted: u64,
        /// The hard ceiling.
        cap: u64,
        /// The rejected amount.
        requested: u64,
    },

    /// Burn or lock exceeds the user's available balance.
    #[error("insufficient balance for {user}: available {available}, requested {requested}")]
    InsufficientBalance {
        /// The user.
        user: String,
        /// Available points.
        available: u64,
        /// The rejected amount.
        requested: u64,
    },

    /// Unlock exceeds the user's locked balance.
    #[error("insufficient locked balance for {user}: locked {locked}, requested {requested}")]
    InsufficientLocked {
        /// The user.
        user: String,
        /// Locked points.
        locked: u64,
        /// The rejected amount.
        requested: u64,
    },

    /// Arithmetic overflow. If you're hitting this, someone is minting
    /// more than 18.4 quintillion points. That's an attack, not a bug.
    #[error("balance overflow for {user}: current {current}, credit {credit}")]
    Overflow {
        /// The user.
        user: String,
        /// Current balance.
        current: u64,
        /// The amount that caused the overflow.
        credit: u64,
    },
}

// ---------------------------------------------------------------------------
// MintReason
// ---------------------------------------------------------------------------

/// Provenance tag recorded with every mint. Audit-only — never affects
/// arithmetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MintReason {
    /// Yield on staked positions.
    StakingReward,
    /// Participation in governance.
    GovernanceReward,
    /// Referral program payout.
    ReferralBonus,
    /// Liquidity mining incentive.
    LiquidityMining,
    /// Points minted against loan collateral.
    LoanCollateral,
    /// Emergency issuance under governance direction.
    EmergencyMint,
    /// Partner-funded reward, backed by a partner vault.
    PartnerReward,
}

impl MintReason {
    /// Short tag for logging and audit dumps.
    pub fn as_str(&self) -> &'static str {
        match self {
            MintReason::StakingReward => "staking_reward",
            MintReason::GovernanceReward => "governance_reward",
            MintReason::ReferralBonus => "referral_bonus",
            MintReason::LiquidityMining => "liquidity_mining",
            MintReason::LoanCollateral => "loan_collateral",
            MintReason::EmergencyMint => "emergency_mint",
            MintReason::PartnerReward => "partner_reward",
        }
    }
}

// ---------------------------------------------------------------------------
// Account & Audit Records
// ---------------------------------------------------------------------------

/// One user's point balances.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Account {
    /// Points spendable by burn/redeem.
    pub available: u64,
    /// Points committed as loan collateral; not burnable until unlocked.
    pub locked: u64,
}

impl Account {
    /// Total points held (available + locked). Cannot overflow: both
    /// halves came out of `total_minted`, which is capped.
    pub fn total(&self) -> u64 {
        self.available + self.locked
    }
}

/// What a ledger record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerOp {
    /// Points created.
    Mint(MintReason),
    /// Points destroyed.
    Burn,
    /// Available moved to locked.
    Lock,
    /// Locked moved back to available.
    Unlock,
}

/// One entry in the in-core audit ring.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// The affected user.
    pub user: String,
    /// Points moved.
    pub amount: u64,
    /// The operation.
    pub op: LedgerOp,
    /// Supplied clock at the time of the operation.
    pub at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Global points accounting: balances, totals, and daily-cap windows.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ledger {
    /// Cumulative points ever minted.
    total_minted: u64,

    /// Cumulative points ever burned.
    total_burned: u64,

    /// Per-user balances, created implicitly on first mint.
    accounts: HashMap<String, Account>,

    /// Per-user daily mint counters.
    user_windows: HashMap<String, UsageWindow>,

    /// Global daily mint counter.
    global_window: UsageWindow,

    /// Last [`AUDIT_TRAIL_CAP`] operations, newest at the back.
    audit_trail: VecDeque<LedgerRecord>,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Getters
    // -----------------------------------------------------------------------

    /// Cumulative points ever minted.
    pub fn total_minted(&self) -> u64 {
        self.total_minted
    }

    /// Cumulative points ever burned.
    pub fn total_burned(&self) -> u64 {
        self.total_burned
    }

    /// Points currently in circulation.
    pub fn circulating(&self) -> u64 {
        self.total_minted - self.total_burned
    }

    /// A user's available balance. Zero for unknown users.
    pub fn balance_of(&self, user: &str) -> u64 {
        self.accounts.get(user).map_or(0, |a| a.available)
    }

    /// A user's locked balance. Zero for unknown users.
    pub fn locked_of(&self, user: &str) -> u64 {
        self.accounts.get(user).map_or(0, |a| a.locked)
    }

    /// Number of accounts ever touched by a mint.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Points the user has minted in the current day bucket.
    pub fn minted_today(&self, user: &str, now: DateTime<Utc>) -> u64 {
        let bucket = day_bucket(now);
        self.user_windows
            .get(user)
            .map_or(0, |w| w.used_in(bucket))
    }

    /// Points minted protocol-wide in the current day bucket.
    pub fn global_minted_today(&self, now: DateTime<Utc>) -> u64 {
        self.global_window.used_in(day_bucket(now))
    }

    /// How many more points the user may mint today.
    pub fn remaining_user_allowance(
        &self,
        config: &ProtocolConfig,
        user: &str,
        now: DateTime<Utc>,
    ) -> u64 {
        config
            .daily_cap_per_user()
            .saturating_sub(self.minted_today(user, now))
    }

    /// The in-core audit ring, oldest first.
    pub fn recent_activity(&self) -> impl Iterator<Item = &LedgerRecord> {
        self.audit_trail.iter()
    }

    /// Verifies the conservation invariant:
    /// `total_minted − total_burned == Σ (available + locked)`.
    pub fn audit(&self) -> bool {
        let held: u128 = self
            .accounts
            .values()
            .map(|a| a.total() as u128)
            .sum();
        held == (self.total_minted as u128) - (self.total_burned as u128)
    }

    // -----------------------------------------------------------------------
    // Mint / Burn
    // -----------------------------------------------------------------------

    /// Mints `amount` points to `user`.
    ///
    /// # Errors
    ///
    /// In precondition order: [`LedgerError::Config`] (emergency or mint
    /// pause), [`LedgerError::ZeroAmount`], [`LedgerError::InvalidUser`],
    /// [`LedgerError::DailyLimitExceeded`] (user, then global),
    /// [`LedgerError::SupplyCapExceeded`], [`LedgerError::Overflow`].
    pub fn mint(
        &mut self,
        config: &ProtocolConfig,
        user: &str,
        amount: u64,
        reason: MintReason,
        now: DateTime<Utc>,
    ) -> Result<u64, LedgerError> {
        self.check_mint(config, user, amount, now)?;
        Ok(self.apply_mint(user, amount, reason, now))
    }

    /// Mints `amount` points to `user` backed by a partner vault.
    ///
    /// Reserves `ceil(points → micro-USD)` of the vault's collateral via
    /// the config's points rate, then mints. Both legs are pre-validated:
    /// a failure in either leaves ledger and vault unchanged.
    pub fn mint_backed(
        &mut self,
        config: &ProtocolConfig,
        vault: &mut PartnerVault,
        cap: &PartnerCap,
        user: &str,
        amount: u64,
        reason: MintReason,
        now: DateTime<Utc>,
    ) -> Result<u64, LedgerError> {
        self.check_mint(config, user, amount, now)?;
        vault.reserve_for_mint(cap, config, amount, now)?;
        Ok(self.apply_mint(user, amount, reason, now))
    }

    /// Burns `amount` points from `user`'s available balance.
    ///
    /// # Errors
    ///
    /// In precondition order: [`LedgerError::Config`] (emergency or
    /// redemption pause), [`LedgerError::ZeroAmount`],
    /// [`LedgerError::InsufficientBalance`].
    pub fn burn(
        &mut self,
        config: &ProtocolConfig,
        user: &str,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<u64, LedgerError> {
        self.check_burn(config, user, amount)?;
        Ok(self.apply_burn(user, amount, now))
    }

    // -----------------------------------------------------------------------
    // Lock / Unlock
    // -----------------------------------------------------------------------

    /// Moves `amount` of `user`'s available points into the locked
    /// bucket (loan collateral). Gated only by the emergency pause.
    pub fn lock(
        &mut self,
        config: &ProtocolConfig,
        user: &str,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        config.assert_not_paused()?;
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let available = self.balance_of(user);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                user: user.to_string(),
                available,
                requested: amount,
            });
        }

        let account = self.accounts.entry(user.to_string()).or_default();
        account.available -= amount;
        account.locked += amount;
        self.push_record(user, amount, LedgerOp::Lock, now);
        Ok(())
    }

    /// Moves `amount` of `user`'s locked points back to available.
    pub fn unlock(
        &mut self,
        config: &ProtocolConfig,
        user: &str,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        config.assert_not_paused()?;
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let locked = self.locked_of(user);
        if locked < amount {
            return Err(LedgerError::InsufficientLocked {
                user: user.to_string(),
                locked,
                requested: amount,
            });
        }

        let account = self.accounts.entry(user.to_string()).or_default();
        account.locked -= amount;
        account.available += amount;
        self.push_record(user, amount, LedgerOp::Unlock, now);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Precondition Checks (read-only, shared by plain and backed mints)
    // -----------------------------------------------------------------------

    /// Runs every mint precondition without mutating anything. Public
    /// within the crate so the redemption gateway can pre-validate
    /// compound operations.
    pub(crate) fn check_mint(
        &self,
        config: &ProtocolConfig,
        user: &str,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        config.assert_mint_not_paused()?;
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if user.is_empty() || user.len() > MAX_NAME_LEN {
            return Err(LedgerError::InvalidUser(user.to_string()));
        }

        let bucket = day_bucket(now);
        let user_window = self.user_windows.get(user).copied().unwrap_or_default();
        if !user_window.fits(bucket, amount, config.daily_cap_per_user()) {
            return Err(LedgerError::DailyLimitExceeded {
                scope: CapScope::User,
                minted_today: user_window.used_in(bucket),
                cap: config.daily_cap_per_user(),
                requested: amount,
            });
        }
        if !self.global_window.fits(bucket, amount, config.daily_cap_global()) {
            return Err(LedgerError::DailyLimitExceeded {
                scope: CapScope::Global,
                minted_today: self.global_window.used_in(bucket),
                cap: config.daily_cap_global(),
                requested: amount,
            });
        }

        let new_total = self
            .total_minted
            .checked_add(amount)
            .ok_or(LedgerError::Overflow {
                user: user.to_string(),
                current: self.total_minted,
                credit: amount,
            })?;
        if new_total > config.max_total_supply() {
            return Err(LedgerError::SupplyCapExceeded {
                total_minted: self.total_minted,
                cap: config.max_total_supply(),
                requested: amount,
            });
        }

        let account = self.accounts.get(user).copied().unwrap_or_default();
        if account.available.checked_add(amount).is_none() {
            return Err(LedgerError::Overflow {
                user: user.to_string(),
                current: account.available,
                credit: amount,
            });
        }
        Ok(())
    }

    /// Runs every burn precondition without mutating anything.
    pub(crate) fn check_burn(
        &self,
        config: &ProtocolConfig,
        user: &str,
        amount: u64,
    ) -> Result<(), LedgerError> {
        config.assert_redemption_not_paused()?;
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let available = self.balance_of(user);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                user: user.to_string(),
                available,
                requested: amount,
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Appliers (infallible once the matching check passed)
    // -----------------------------------------------------------------------

    pub(crate) fn apply_mint(
        &mut self,
        user: &str,
        amount: u64,
        reason: MintReason,
        now: DateTime<Utc>,
    ) -> u64 {
        let bucket = day_bucket(now);
        self.user_windows
            .entry(user.to_string())
            .or_default()
            .record(bucket, amount);
        self.global_window.record(bucket, amount);

        let account = self.accounts.entry(user.to_string()).or_default();
        account.available += amount;
        self.total_minted += amount;

        debug!(user, amount, reason = reason.as_str(), "minted");
        self.push_record(user, amount, LedgerOp::Mint(reason), now);
        self.accounts[user].available
    }

    pub(crate) fn apply_burn(&mut self, user: &str, amount: u64, now: DateTime<Utc>) -> u64 {
        let account = self.accounts.entry(user.to_string()).or_default();
        account.available -= amount;
        self.total_burned += amount;

        debug!(user, amount, "burned");
        self.push_record(user, amount, LedgerOp::Burn, now);
        self.accounts[user].available
    }

    fn push_record(&mut self, user: &str, amount: u64, op: LedgerOp, at: DateTime<Utc>) {
        if self.audit_trail.len() == AUDIT_TRAIL_CAP {
            self.audit_trail.pop_front();
        }
        self.audit_trail.push_back(LedgerRecord {
            user: user.to_string(),
            amount,
            op,
            at,
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
