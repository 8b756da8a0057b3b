//! # Protocol Config Store
//!
//! A [`ProtocolConfig`] is the singleton aggregate holding the economic
//! parameters of the protocol and the four pause flags. It is created
//! once at genesis together with the one [`AdminCap`] and one
//! [`GovernanceCap`] bound to it, and passed by explicit reference into
//! every operation that needs it — never a process-wide global, so tests
//! can construct isolated instances per case.
//!
//! ## Bounds Model
//!
//! Each mutable parameter has a static band (where it can ever be) and a
//! per-call delta (how far one update may move it). The bands and deltas
//! live in [`crate::params`]. An APY jump from 5% to 20% therefore takes
//! eight separate calls, each one auditable on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{AdminCap, AuthError, GovernanceCap};
use crate::params;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The supplied capability is not the one bound to this config.
    #[error("capability {presented} is not bound to this config")]
    Unauthorized {
        /// Id of the rejected capability.
        presented: Uuid,
    },

    /// A parameter value fell outside its static band.
    #[error("{field} = {value} outside allowed band [{min}, {max}]")]
    OutOfBounds {
        /// Name of the offending parameter.
        field: &'static str,
        /// The rejected value.
        value: u64,
        /// Lower band edge (inclusive).
        min: u64,
        /// Upper band edge (inclusive).
        max: u64,
    },

    /// A single update tried to move a parameter further than its
    /// per-call delta allows.
    #[error("{field} change {current} -> {requested} exceeds max delta {max_delta} per call")]
    DeltaTooLarge {
        /// Name of the offending parameter.
        field: &'static str,
        /// Current value.
        current: u64,
        /// Requested value.
        requested: u64,
        /// Maximum allowed movement per call.
        max_delta: u64,
    },

    /// The daily caps and supply ceiling would no longer nest.
    #[error(
        "incoherent limits: per-user {daily_user} must be <= global {daily_global} <= supply {max_supply}"
    )]
    IncoherentLimits {
        /// Requested per-user daily cap.
        daily_user: u64,
        /// Requested global daily cap.
        daily_global: u64,
        /// Requested max total supply.
        max_supply: u64,
    },

    /// The relevant pause flag is set.
    #[error("protocol paused ({kind:?}): {reason}")]
    Paused {
        /// Which pause flag blocked the operation.
        kind: PauseKind,
        /// The reason recorded when the flag was set.
        reason: String,
    },

    /// Empty or oversized string input, zero address, and the like.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Arithmetic overflow in a conversion.
    #[error("arithmetic overflow converting {0} points")]
    Overflow(u64),

    /// Capability construction failed at genesis.
    #[error("capability error: {0}")]
    Auth(#[from] AuthError),
}

// ---------------------------------------------------------------------------
// PauseKind & PauseBoard
// ---------------------------------------------------------------------------

/// The four independent pause switches.
///
/// `Emergency` is a superset: the mint/redemption/governance assertions
/// consult it in addition to their own flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PauseKind {
    /// Halts everything. The break-glass switch.
    Emergency,
    /// Halts ledger mints only.
    Mint,
    /// Halts burns and redemption settlement only.
    Redemption,
    /// Halts creation of new governance proposals only.
    Governance,
}

/// One pause switch with its audit fields.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct PauseFlag {
    engaged: bool,
    reason: String,
    since: Option<DateTime<Utc>>,
}

/// All four pause switches.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct PauseBoard {
    emergency: PauseFlag,
    mint: PauseFlag,
    redemption: PauseFlag,
    governance: PauseFlag,
}

impl PauseBoard {
    fn flag(&self, kind: PauseKind) -> &PauseFlag {
        match kind {
            PauseKind::Emergency => &self.emergency,
            PauseKind::Mint => &self.mint,
            PauseKind::Redemption => &self.redemption,
            PauseKind::Governance => &self.governance,
        }
    }

    fn flag_mut(&mut self, kind: PauseKind) -> &mut PauseFlag {
        match kind {
            PauseKind::Emergency => &mut self.emergency,
            PauseKind::Mint => &mut self.mint,
            PauseKind::Redemption => &mut self.redemption,
            PauseKind::Governance => &mut self.governance,
        }
    }
}

// ---------------------------------------------------------------------------
// ProtocolConfig
// ---------------------------------------------------------------------------

/// Global economic parameters, the pause board, and the bound capability
/// ids. The root of authorization for the whole protocol.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Protocol staking APY in basis points.
    apy_bps: u64,

    /// Points minted per whole USD of backing.
    points_per_usd: u64,

    /// Hard ceiling on cumulative minted points.
    max_total_supply: u64,

    /// Global daily mint cap, in points per day bucket.
    daily_cap_global: u64,

    /// Per-user daily mint cap, in points per day bucket.
    daily_cap_per_user: u64,

    /// Grace period for loan/collateral flows, in milliseconds.
    grace_period_ms: u64,

    /// The four pause switches.
    pauses: PauseBoard,

    /// Id of the one admin capability minted at genesis.
    bound_admin_cap_id: Uuid,

    /// Id of the one governance capability minted at genesis.
    bound_governance_cap_id: Uuid,

    /// Address that deployed the protocol.
    deployer: String,

    /// Address that receives protocol fees.
    treasury: String,

    /// When this config was created (supplied clock, not wall time).
    created_at: DateTime<Utc>,
}

impl ProtocolConfig {
    /// Creates the protocol config at genesis, minting the one admin
    /// capability and the one governance capability bound to it.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidInput`] for empty or oversized addresses.
    /// - [`ConfigError::Auth`] if the governance signer set is invalid.
    pub fn new(
        deployer: &str,
        treasury: &str,
        governance_signers: Vec<String>,
        governance_threshold: usize,
        now: DateTime<Utc>,
    ) -> Result<(Self, AdminCap, GovernanceCap), ConfigError> {
        check_address("deployer", deployer)?;
        check_address("treasury", treasury)?;

        let admin_cap = AdminCap::mint();
        let governance_cap = GovernanceCap::mint(governance_signers, governance_threshold)?;

        let config = Self {
            apy_bps: params::DEFAULT_APY_BPS,
            points_per_usd: params::DEFAULT_POINTS_PER_USD,
            max_total_supply: params::DEFAULT_MAX_TOTAL_SUPPLY,
            daily_cap_global: params::DEFAULT_DAILY_CAP_GLOBAL,
            daily_cap_per_user: params::DEFAULT_DAILY_CAP_PER_USER,
            grace_period_ms: params::DEFAULT_GRACE_PERIOD_MS,
            pauses: PauseBoard::default(),
            bound_admin_cap_id: admin_cap.id(),
            bound_governance_cap_id: governance_cap.id(),
            deployer: deployer.to_string(),
            treasury: treasury.to_string(),
            created_at: now,
        };

        info!(deployer, treasury, "protocol config created");
        Ok((config, admin_cap, governance_cap))
    }

    // -----------------------------------------------------------------------
    // Getters
    // -----------------------------------------------------------------------

    /// Current APY in basis points.
    pub fn apy_bps(&self) -> u64 {
        self.apy_bps
    }

    /// Points minted per whole USD of backing.
    pub fn points_per_usd(&self) -> u64 {
        self.points_per_usd
    }

    /// Hard ceiling on cumulative minted points.
    pub fn max_total_supply(&self) -> u64 {
        self.max_total_supply
    }

    /// Global daily mint cap.
    pub fn daily_cap_global(&self) -> u64 {
        self.daily_cap_global
    }

    /// Per-user daily mint cap.
    pub fn daily_cap_per_user(&self) -> u64 {
        self.daily_cap_per_user
    }

    /// Grace period in milliseconds.
    pub fn grace_period_ms(&self) -> u64 {
        self.grace_period_ms
    }

    /// Id of the admin capability bound at genesis.
    pub fn bound_admin_cap_id(&self) -> Uuid {
        self.bound_admin_cap_id
    }

    /// Id of the governance capability bound at genesis.
    pub fn bound_governance_cap_id(&self) -> Uuid {
        self.bound_governance_cap_id
    }

    /// Deployer address.
    pub fn deployer(&self) -> &str {
        &self.deployer
    }

    /// Treasury address.
    pub fn treasury(&self) -> &str {
        &self.treasury
    }

    /// When this config was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns `true` if the given pause switch is engaged.
    pub fn is_paused(&self, kind: PauseKind) -> bool {
        self.pauses.flag(kind).engaged
    }

    // -----------------------------------------------------------------------
    // Capability Checks
    // -----------------------------------------------------------------------

    /// Verifies the admin capability is the one bound to this config.
    pub fn check_admin(&self, cap: &AdminCap) -> Result<(), ConfigError> {
        if cap.id() != self.bound_admin_cap_id {
            return Err(ConfigError::Unauthorized {
                presented: cap.id(),
            });
        }
        Ok(())
    }

    /// Verifies the governance capability is the one bound to this config.
    pub fn check_governance(&self, cap: &GovernanceCap) -> Result<(), ConfigError> {
        if cap.id() != self.bound_governance_cap_id {
            return Err(ConfigError::Unauthorized {
                presented: cap.id(),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Pause Assertions
    // -----------------------------------------------------------------------

    /// Aborts if the emergency switch is engaged.
    pub fn assert_not_paused(&self) -> Result<(), ConfigError> {
        self.assert_flag_clear(PauseKind::Emergency)
    }

    /// Aborts if either the emergency or the mint switch is engaged.
    pub fn assert_mint_not_paused(&self) -> Result<(), ConfigError> {
        self.assert_not_paused()?;
        self.assert_flag_clear(PauseKind::Mint)
    }

    /// Aborts if either the emergency or the redemption switch is engaged.
    pub fn assert_redemption_not_paused(&self) -> Result<(), ConfigError> {
        self.assert_not_paused()?;
        self.assert_flag_clear(PauseKind::Redemption)
    }

    /// Aborts if either the emergency or the governance switch is engaged.
    pub fn assert_governance_not_paused(&self) -> Result<(), ConfigError> {
        self.assert_not_paused()?;
        self.assert_flag_clear(PauseKind::Governance)
    }

    fn assert_flag_clear(&self, kind: PauseKind) -> Result<(), ConfigError> {
        let flag = self.pauses.flag(kind);
        if flag.engaged {
            return Err(ConfigError::Paused {
                kind,
                reason: flag.reason.clone(),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bounded Setters (admin-gated)
    // -----------------------------------------------------------------------

    /// Updates the protocol APY.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Unauthorized`] for a forged capability.
    /// - [`ConfigError::OutOfBounds`] outside [100, 2000] bps.
    /// - [`ConfigError::DeltaTooLarge`] if the move exceeds 200 bps.
    pub fn update_apy(&mut self, cap: &AdminCap, new_bps: u64) -> Result<(), ConfigError> {
        self.check_admin(cap)?;
        self.set_apy(new_bps)
    }

    /// Updates the grace period.
    ///
    /// Band [1 day, 90 days], at most 7 days of movement per call.
    pub fn update_grace_period(&mut self, cap: &AdminCap, new_ms: u64) -> Result<(), ConfigError> {
        self.check_admin(cap)?;
        self.set_grace_period(new_ms)
    }

    /// Updates the points-per-USD rate.
    ///
    /// Band [1, 1_000_000], at most 10% of the current rate per call so
    /// partners are never repriced by an order of magnitude overnight.
    pub fn update_points_rate(&mut self, cap: &AdminCap, new_rate: u64) -> Result<(), ConfigError> {
        self.check_admin(cap)?;
        check_band(
            "points_per_usd",
            new_rate,
            params::MIN_POINTS_PER_USD,
            params::MAX_POINTS_PER_USD,
        )?;
        // Delta rule is relative: 10% of the current rate, minimum 1 so a
        // rate of 1 can still move.
        let max_delta = (self.points_per_usd * params::MAX_POINTS_RATE_DELTA_BPS
            / params::BPS_DENOMINATOR)
            .max(1);
        check_delta("points_per_usd", self.points_per_usd, new_rate, max_delta)?;

        self.points_per_usd = new_rate;
        Ok(())
    }

    /// Updates any subset of the economic limits. Omitted fields keep
    /// their current value; the coherence rule `per_user <= global <=
    /// max_supply` is checked over the resulting triple.
    pub fn update_economic_limits(
        &mut self,
        cap: &AdminCap,
        max_supply: Option<u64>,
        daily_global: Option<u64>,
        daily_user: Option<u64>,
    ) -> Result<(), ConfigError> {
        self.check_admin(cap)?;

        let new_supply = max_supply.unwrap_or(self.max_total_supply);
        let new_global = daily_global.unwrap_or(self.daily_cap_global);
        let new_user = daily_user.unwrap_or(self.daily_cap_per_user);

        if let Some(v) = max_supply {
            check_band(
                "max_total_supply",
                v,
                params::MIN_MAX_TOTAL_SUPPLY,
                params::MAX_MAX_TOTAL_SUPPLY,
            )?;
        }
        if let Some(v) = daily_global {
            check_band(
                "daily_cap_global",
                v,
                params::MIN_DAILY_CAP_GLOBAL,
                params::MAX_DAILY_CAP_GLOBAL,
            )?;
        }
        if let Some(v) = daily_user {
            check_band(
                "daily_cap_per_user",
                v,
                params::MIN_DAILY_CAP_PER_USER,
                params::MAX_DAILY_CAP_PER_USER,
            )?;
        }
        if new_user > new_global || new_global > new_supply {
            return Err(ConfigError::IncoherentLimits {
                daily_user: new_user,
                daily_global: new_global,
                max_supply: new_supply,
            });
        }

        self.max_total_supply = new_supply;
        self.daily_cap_global = new_global;
        self.daily_cap_per_user = new_user;
        Ok(())
    }

    /// Engages or clears one pause switch.
    ///
    /// Pausing requires a non-empty reason (<= 256 chars), recorded on
    /// the flag for audit. Unpausing clears the reason.
    pub fn set_pause(
        &mut self,
        cap: &AdminCap,
        kind: PauseKind,
        on: bool,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ConfigError> {
        self.check_admin(cap)?;
        self.apply_pause(kind, on, reason, now)
    }

    // -----------------------------------------------------------------------
    // Governance Application (crate-internal, proposal machine only)
    // -----------------------------------------------------------------------

    /// Applies an APY change on behalf of an executed proposal. Same
    /// bounds and delta rules as the admin path.
    pub(crate) fn governance_apply_apy(
        &mut self,
        cap: &GovernanceCap,
        new_bps: u64,
    ) -> Result<(), ConfigError> {
        self.check_governance(cap)?;
        self.set_apy(new_bps)
    }

    /// Applies a grace-period change on behalf of an executed proposal.
    pub(crate) fn governance_apply_grace_period(
        &mut self,
        cap: &GovernanceCap,
        new_ms: u64,
    ) -> Result<(), ConfigError> {
        self.check_governance(cap)?;
        self.set_grace_period(new_ms)
    }

    /// Applies a pause toggle on behalf of an executed proposal.
    pub(crate) fn governance_apply_pause(
        &mut self,
        cap: &GovernanceCap,
        kind: PauseKind,
        on: bool,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ConfigError> {
        self.check_governance(cap)?;
        self.apply_pause(kind, on, reason, now)
    }

    // -----------------------------------------------------------------------
    // Conversions
    // -----------------------------------------------------------------------

    /// Converts a points amount to its micro-USD backing requirement.
    ///
    /// Rounds **up**: backing always errs against the protocol, never in
    /// its favor. `u128` intermediate keeps the multiply from overflowing.
    pub fn points_to_micro_usd(&self, points: u64) -> Result<u64, ConfigError> {
        let numer = (points as u128) * (params::MICRO_USD_PER_USD as u128);
        let rate = self.points_per_usd as u128;
        let micro = numer.div_ceil(rate);
        u64::try_from(micro).map_err(|_| ConfigError::Overflow(points))
    }

    /// Converts a micro-USD value to the points it can back. Rounds down.
    pub fn micro_usd_to_points(&self, micro_usd: u64) -> Result<u64, ConfigError> {
        let numer = (micro_usd as u128) * (self.points_per_usd as u128);
        let points = numer / (params::MICRO_USD_PER_USD as u128);
        u64::try_from(points).map_err(|_| ConfigError::Overflow(micro_usd))
    }

    // -----------------------------------------------------------------------
    // Internal Setters (shared by admin and governance paths)
    // -----------------------------------------------------------------------

    fn set_apy(&mut self, new_bps: u64) -> Result<(), ConfigError> {
        check_band("apy_bps", new_bps, params::MIN_APY_BPS, params::MAX_APY_BPS)?;
        check_delta("apy_bps", self.apy_bps, new_bps, params::MAX_APY_DELTA_BPS)?;
        self.apy_bps = new_bps;
        Ok(())
    }

    fn set_grace_period(&mut self, new_ms: u64) -> Result<(), ConfigError> {
        check_band(
            "grace_period_ms",
            new_ms,
            params::MIN_GRACE_PERIOD_MS,
            params::MAX_GRACE_PERIOD_MS,
        )?;
        check_delta(
            "grace_period_ms",
            self.grace_period_ms,
            new_ms,
            params::MAX_GRACE_PERIOD_DELTA_MS,
        )?;
        self.grace_period_ms = new_ms;
        Ok(())
    }

    fn apply_pause(
        &mut self,
        kind: PauseKind,
        on: bool,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ConfigError> {
        if on {
            if reason.is_empty() {
                return Err(ConfigError::InvalidInput(
                    "pause requires a non-empty reason".into(),
                ));
            }
            if reason.len() > params::MAX_REASON_LEN {
                return Err(ConfigError::InvalidInput(format!(
                    "pause reason exceeds {} chars",
                    params::MAX_REASON_LEN
                )));
            }
            warn!(?kind, reason, "pause engaged");
        } else {
            info!(?kind, "pause cleared");
        }

        let flag = self.pauses.flag_mut(kind);
        flag.engaged = on;
        flag.reason = if on { reason.to_string() } else { String::new() };
        flag.since = if on { Some(now) } else { None };
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Validation Helpers
// ---------------------------------------------------------------------------

fn check_address(field: &str, address: &str) -> Result<(), ConfigError> {
    if address.is_empty() {
        return Err(ConfigError::InvalidInput(format!("{field} address is empty")));
    }
    if address.len() > params::MAX_NAME_LEN {
        return Err(ConfigError::InvalidInput(format!(
            "{field} address exceeds {} chars",
            params::MAX_NAME_LEN
        )));
    }
    Ok(())
}

fn check_band(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfBounds {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn check_delta(
    field: &'static str,
    current: u64,
    requested: u64,
    max_delta: u64,
) -> Result<(), ConfigError> {
    let delta = current.abs_diff(requested);
    if delta > max_delta {
        return Err(ConfigError::DeltaTooLarge {
            field,
            current,
            requested,
            max_delta,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
