//! # Capability Tokens
//!
//! EMBER does not use ambient identity or ACL lookups. Every privileged
//! entry point takes an explicit capability argument: an unforgeable token
//! whose id must match the id the target entity recorded at creation.
//! A capability minted against a different config (or vault) is a forgery
//! and is rejected with an authorization error — there is no global
//! registry of valid holders to consult or corrupt.
//!
//! Three capability kinds exist:
//!
//! - [`AdminCap`] — one per protocol config; gates the bounded setters
//!   and pause toggles.
//! - [`GovernanceCap`] — one per protocol config; carries the fixed
//!   signer set and signature threshold for the proposal machine.
//! - [`PartnerCap`] — one per partner vault; gates reservation, withdrawal,
//!   DeFi custody transfer, and harvest on that vault.
//!
//! Capabilities are plain data. Unforgeability comes from the host
//! platform's object model: the only code path that produces a capability
//! with a given id is the constructor that also records that id on the
//! target entity.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::params::MAX_GOVERNANCE_SIGNERS;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while constructing capability objects.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The signer set was empty, oversized, or contained duplicates.
    #[error("invalid signer set: {0}")]
    InvalidSignerSet(String),

    /// The signature threshold was zero or exceeded the signer count.
    #[error("invalid threshold {threshold} for {signers} signers")]
    InvalidThreshold {
        /// The rejected threshold.
        threshold: usize,
        /// Number of signers in the set.
        signers: usize,
    },
}

// ---------------------------------------------------------------------------
// AdminCap
// ---------------------------------------------------------------------------

/// Admin capability: holder-proof of administrative rights over exactly
/// one [`ProtocolConfig`](crate::config::ProtocolConfig).
///
/// Valid only if `id == config.bound_admin_cap_id()`. Constructing a
/// second `AdminCap` does not grant anything — its fresh id will never
/// match the id the live config recorded at genesis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdminCap {
    id: Uuid,
}

impl AdminCap {
    /// Mints a new admin capability with a fresh id.
    ///
    /// Called exactly once, by [`ProtocolConfig::new`](crate::config::ProtocolConfig::new),
    /// which records the id as the bound admin cap.
    pub(crate) fn mint() -> Self {
        Self { id: Uuid::new_v4() }
    }

    /// Returns this capability's unique id.
    pub fn id(&self) -> Uuid {
        self.id
    }
}

// ---------------------------------------------------------------------------
// GovernanceCap
// ---------------------------------------------------------------------------

/// Governance capability: carries the authorized signer set and the
/// signature threshold for the proposal machine.
///
/// The signer set is fixed at creation. Rotating signers means minting a
/// new capability and re-binding the config through governance itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernanceCap {
    id: Uuid,
    signers: Vec<String>,
    threshold: usize,
}

impl GovernanceCap {
    /// Mints a new governance capability over the given signer set.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidSignerSet`] if the set is empty, larger than
    ///   [`MAX_GOVERNANCE_SIGNERS`], contains an empty address, or contains
    ///   duplicates.
    /// - [`AuthError::InvalidThreshold`] if `threshold` is 0 or exceeds
    ///   the signer count.
    pub(crate) fn mint(signers: Vec<String>, threshold: usize) -> Result<Self, AuthError> {
        if signers.is_empty() {
            return Err(AuthError::InvalidSignerSet("empty signer set".into()));
        }
        if signers.len() > MAX_GOVERNANCE_SIGNERS {
            return Err(AuthError::InvalidSignerSet(format!(
                "{} signers exceeds maximum {}",
                signers.len(),
                MAX_GOVERNANCE_SIGNERS
            )));
        }
        if signers.iter().any(|s| s.is_empty()) {
            return Err(AuthError::InvalidSignerSet("empty signer address".into()));
        }
        let mut deduped = signers.clone();
        deduped.sort();
        deduped.dedup();
        if deduped.len() != signers.len() {
            return Err(AuthError::InvalidSignerSet("duplicate signer".into()));
        }
        if threshold == 0 || threshold > signers.len() {
            return Err(AuthError::InvalidThreshold {
                threshold,
                signers: signers.len(),
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            signers,
            threshold,
        })
    }

    /// Returns this capability's unique id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the authorized signer addresses.
    pub fn signers(&self) -> &[String] {
        &self.signers
    }

    /// Returns the signature threshold.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Returns `true` if `address` is a member of the signer set.
    pub fn is_signer(&self, address: &str) -> bool {
        self.signers.iter().any(|s| s == address)
    }
}

// ---------------------------------------------------------------------------
// PartnerCap
// ---------------------------------------------------------------------------

/// Partner capability: authenticated reference to exactly one
/// [`PartnerVault`](crate::vault::PartnerVault).
///
/// Carries the partner's address and the generation id the partner was
/// onboarded under (consumed by the earn-action layer, opaque here).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PartnerCap {
    id: Uuid,
    vault_id: Uuid,
    partner_address: String,
    generation_id: u64,
}

impl PartnerCap {
    /// Mints the capability for a freshly created vault.
    pub(crate) fn mint(vault_id: Uuid, partner_address: &str, generation_id: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            vault_id,
            partner_address: partner_address.to_string(),
            generation_id,
        }
    }

    /// Returns this capability's unique id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the id of the vault this capability controls.
    pub fn vault_id(&self) -> Uuid {
        self.vault_id
    }

    /// Returns the partner's address.
    pub fn partner_address(&self) -> &str {
        &self.partner_address
    }

    /// Returns the generation id the partner registered under.
    pub fn generation_id(&self) -> u64 {
        self.generation_id
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
