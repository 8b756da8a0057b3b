//! # Governance Proposals
//!
//! A [`Proposal`] is one pending protocol change: what to change, who has
//! signed so far, and when the timelock opens. Proposals are mutated only
//! by [`GovernanceEngine`](super::engine::GovernanceEngine) — the struct
//! itself just keeps the books straight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PauseKind;

// ---------------------------------------------------------------------------
// ProposalKind
// ---------------------------------------------------------------------------

/// The change a proposal carries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalKind {
    /// Move the protocol APY to a new value (bps). Subject to the same
    /// band and per-call delta rules as the admin setter.
    ApyChange(u64),

    /// Move the grace period to a new value (ms).
    GracePeriodChange(u64),

    /// Engage or clear one pause switch.
    PauseToggle {
        /// Which switch.
        kind: PauseKind,
        /// Engage (`true`) or clear (`false`).
        on: bool,
        /// Reason recorded on the flag when engaging.
        reason: String,
    },

    /// An off-protocol action the signers want on the record. Executes
    /// as an acknowledgement; changes nothing in the config store.
    Custom {
        /// What the signers agreed to.
        description: String,
    },
}

impl ProposalKind {
    /// Short tag for logging.
    pub fn tag(&self) -> &'static str {
        match self {
            ProposalKind::ApyChange(_) => "apy_change",
            ProposalKind::GracePeriodChange(_) => "grace_period_change",
            ProposalKind::PauseToggle { .. } => "pause_toggle",
            ProposalKind::Custom { .. } => "custom",
        }
    }
}

// ---------------------------------------------------------------------------
// Proposal
// ---------------------------------------------------------------------------

/// One pending (or executed) protocol change.
///
/// Ids are sequential per engine, strictly increasing, never reused.
/// The signature set accumulates; it never shrinks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Proposal {
    /// Sequential id assigned by the engine.
    pub id: u64,

    /// The change being proposed.
    pub kind: ProposalKind,

    /// Address that created the proposal (auto-signed).
    pub proposer: String,

    /// Signers who have signed so far, in signing order.
    pub signatures: Vec<String>,

    /// When the proposal was created (supplied clock).
    pub created_at: DateTime<Utc>,

    /// Earliest instant the proposal may execute.
    pub timelock_expiry: DateTime<Utc>,

    /// Set exactly once, by the first successful execution.
    pub executed: bool,

    /// When the proposal executed, if it has.
    pub executed_at: Option<DateTime<Utc>>,
}

impl Proposal {
    /// Returns `true` if `signer` has already signed.
    pub fn has_signed(&self, signer: &str) -> bool {
        self.signatures.iter().any(|s| s == signer)
    }

    /// Number of signatures accumulated so far.
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    /// Returns `true` if the timelock has elapsed at `now`.
    pub fn timelock_elapsed(&self, now: DateTime<Utc>) -> bool {
        now >= self.timelock_expiry
    }
}
