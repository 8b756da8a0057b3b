//! # Governance Engine
//!
//! The engine owns the proposal map and drives the create → sign →
//! execute lifecycle. It is bound at creation to one [`GovernanceCap`]
//! id, mirroring the config store's admin-cap binding: a capability
//! minted against a different engine (or a different config) is rejected
//! before anything else is looked at.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::auth::GovernanceCap;
use crate::config::{ConfigError, ProtocolConfig};
use crate::params::{GOVERNANCE_TIMELOCK_MS, MAX_REASON_LEN};

use super::proposal::{Proposal, ProposalKind};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur in the proposal lifecycle.
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// The capability is not the one this engine (or the config) is
    /// bound to, or a pause flag blocked the operation.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The capability id does not match the engine's binding.
    #[error("governance capability {presented} is not bound to this engine")]
    Unauthorized {
        /// Id of the rejected capability.
        presented: Uuid,
    },

    /// No proposal with the given id exists.
    #[error("proposal {0} not found")]
    ProposalNotFound(u64),

    /// The signer has already signed this proposal.
    #[error("signer {signer} already signed proposal {id}")]
    AlreadySigned {
        /// The proposal id.
        id: u64,
        /// The repeat signer.
        signer: String,
    },

    /// The address is not a member of the authorized signer set.
    #[error("{signer} is not an authorized governance signer")]
    SignerNotAuthorized {
        /// The rejected address.
        signer: String,
    },

    /// Execution attempted below the signature threshold.
    #[error("proposal {id} has {have} signatures, needs {need}")]
    ThresholdNotMet {
        /// The proposal id.
        id: u64,
        /// Signatures accumulated.
        have: usize,
        /// Threshold required.
        need: usize,
    },

    /// Execution attempted before the timelock opened.
    #[error("proposal {id} timelocked until {until}")]
    TimelockActive {
        /// The proposal id.
        id: u64,
        /// When the timelock opens.
        until: DateTime<Utc>,
    },

    /// The proposal already executed; proposals terminalize on first
    /// successful execution.
    #[error("proposal {0} already executed")]
    AlreadyExecuted(u64),

    /// Malformed proposal payload (empty description, oversized reason).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

// ---------------------------------------------------------------------------
// GovernanceEngine
// ---------------------------------------------------------------------------

/// Proposal store and lifecycle driver, bound to one governance
/// capability.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernanceEngine {
    /// Id of the governance capability this engine accepts.
    bound_cap_id: Uuid,

    /// All proposals ever created, keyed by sequential id.
    proposals: BTreeMap<u64, Proposal>,

    /// Next proposal id. Starts at 1, strictly increasing, never reused.
    next_id: u64,
}

impl GovernanceEngine {
    /// Creates an engine bound to the given governance capability.
    pub fn new(cap: &GovernanceCap) -> Self {
        Self {
            bound_cap_id: cap.id(),
            proposals: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Number of proposals ever created.
    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }

    /// Returns a proposal by id, if it exists.
    pub fn proposal(&self, id: u64) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    /// Creates a proposal. The proposer auto-signs.
    ///
    /// Blocked while the governance pause flag is set. The capability
    /// must be bound both to this engine and to `config`.
    ///
    /// # Errors
    ///
    /// - [`GovernanceError::Config`] for pause or a config-side forgery.
    /// - [`GovernanceError::Unauthorized`] for an engine-side forgery.
    /// - [`GovernanceError::SignerNotAuthorized`] if the proposer is not
    ///   in the signer set.
    /// - [`GovernanceError::InvalidInput`] for malformed payloads.
    pub fn create(
        &mut self,
        cap: &GovernanceCap,
        config: &ProtocolConfig,
        proposer: &str,
        kind: ProposalKind,
        now: DateTime<Utc>,
    ) -> Result<u64, GovernanceError> {
        config.assert_governance_not_paused()?;
        config.check_governance(cap)?;
        self.check_binding(cap)?;
        self.check_member(cap, proposer)?;
        check_payload(&kind)?;

        let id = self.next_id;
        self.next_id += 1;

        let proposal = Proposal {
            id,
            kind,
            proposer: proposer.to_string(),
            signatures: vec![proposer.to_string()],
            created_at: now,
            timelock_expiry: now + Duration::milliseconds(GOVERNANCE_TIMELOCK_MS as i64),
            executed: false,
            executed_at: None,
        };

        info!(id, proposer, kind = proposal.kind.tag(), "proposal created");
        self.proposals.insert(id, proposal);
        Ok(id)
    }

    /// Adds a signature to a pending proposal. Each authorized signer
    /// may sign exactly once; the proposer's creation signature counts.
    pub fn sign(
        &mut self,
        cap: &GovernanceCap,
        id: u64,
        signer: &str,
    ) -> Result<usize, GovernanceError> {
        self.check_binding(cap)?;
        self.check_member(cap, signer)?;

        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;

        if proposal.executed {
            return Err(GovernanceError::AlreadyExecuted(id));
        }
        if proposal.has_signed(signer) {
            return Err(GovernanceError::AlreadySigned {
                id,
                signer: signer.to_string(),
            });
        }

        proposal.signatures.push(signer.to_string());
        Ok(proposal.signature_count())
    }

    /// Returns `true` if the proposal exists, is unexecuted, and has both
    /// threshold signatures and an elapsed timelock at `now`.
    ///
    /// Read-only so callers can poll without spending a failed attempt.
    pub fn is_executable(&self, cap: &GovernanceCap, id: u64, now: DateTime<Utc>) -> bool {
        if cap.id() != self.bound_cap_id {
            return false;
        }
        match self.proposals.get(&id) {
            Some(p) => {
                !p.executed
                    && p.signature_count() >= cap.threshold()
                    && p.timelock_elapsed(now)
            }
            None => false,
        }
    }

    /// Executes a proposal, applying its change to the config store.
    ///
    /// Requires threshold signatures AND an elapsed timelock. The
    /// proposal terminalizes on first success; a second execution aborts
    /// [`GovernanceError::AlreadyExecuted`].
    pub fn execute(
        &mut self,
        cap: &GovernanceCap,
        config: &mut ProtocolConfig,
        id: u64,
        now: DateTime<Utc>,
    ) -> Result<(), GovernanceError> {
        self.check_binding(cap)?;

        // Validate everything before touching the config so a failed
        // execution leaves both the proposal and the config unchanged.
        let proposal = self
            .proposals
            .get(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;

        if proposal.executed {
            return Err(GovernanceError::AlreadyExecuted(id));
        }
        if proposal.signature_count() < cap.threshold() {
            return Err(GovernanceError::ThresholdNotMet {
                id,
                have: proposal.signature_count(),
                need: cap.threshold(),
            });
        }
        if !proposal.timelock_elapsed(now) {
            return Err(GovernanceError::TimelockActive {
                id,
                until: proposal.timelock_expiry,
            });
        }

        match &proposal.kind {
            ProposalKind::ApyChange(new_bps) => {
                config.governance_apply_apy(cap, *new_bps)?;
            }
            ProposalKind::GracePeriodChange(new_ms) => {
                config.governance_apply_grace_period(cap, *new_ms)?;
            }
            ProposalKind::PauseToggle { kind, on, reason } => {
                config.governance_apply_pause(cap, *kind, *on, reason, now)?;
            }
            ProposalKind::Custom { description } => {
                // Acknowledged on the record; nothing to apply.
                info!(id, %description, "custom proposal acknowledged");
            }
        }

        // The lookup cannot fail here; the same id was read above and
        // nothing removes proposals.
        if let Some(p) = self.proposals.get_mut(&id) {
            p.executed = true;
            p.executed_at = Some(now);
            info!(id, kind = p.kind.tag(), "proposal executed");
        }
        Ok(())
    }

    fn check_binding(&self, cap: &GovernanceCap) -> Result<(), GovernanceError> {
        if cap.id() != self.bound_cap_id {
            return Err(GovernanceError::Unauthorized {
                presented: cap.id(),
            });
        }
        Ok(())
    }

    fn check_member(&self, cap: &GovernanceCap, address: &str) -> Result<(), GovernanceError> {
        if !cap.is_signer(address) {
            return Err(GovernanceError::SignerNotAuthorized {
                signer: address.to_string(),
            });
        }
        Ok(())
    }
}

fn check_payload(kind: &ProposalKind) -> Result<(), GovernanceError> {
    match kind {
        ProposalKind::PauseToggle { on, reason, .. } => {
            if *on && reason.is_empty() {
                return Err(GovernanceError::InvalidInput(
                    "pause toggle requires a reason".into(),
                ));
            }
            if reason.len() > MAX_REASON_LEN {
                return Err(GovernanceError::InvalidInput(format!(
                    "reason exceeds {MAX_REASON_LEN} chars"
                )));
            }
        }
        ProposalKind::Custom { description } => {
            if description.is_empty() {
                return Err(GovernanceError::InvalidInput(
                    "custom proposal requires a description".into(),
                ));
            }
            if description.len() > MAX_REASON_LEN {
                return Err(GovernanceError::InvalidInput(format!(
                    "description exceeds {MAX_REASON_LEN} chars"
                )));
            }
        }
        ProposalKind::ApyChange(_) | ProposalKind::GracePeriodChange(_) => {}
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PauseKind;
    use crate::params::GOVERNANCE_TIMELOCK_MS;

    const S1: &str = "ember:signer1";
    const S2: &str = "ember:signer2";
    const S3: &str = "ember:signer3";

    fn setup() -> (ProtocolConfig, GovernanceCap, GovernanceEngine, DateTime<Utc>) {
        let now = Utc::now();
        let (config, _admin, gov) = ProtocolConfig::new(
            "ember:deployer",
            "ember:treasury",
            vec![S1.into(), S2.into(), S3.into()],
            2,
            now,
        )
        .unwrap();
        let engine = GovernanceEngine::new(&gov);
        (config, gov, engine, now)
    }

    fn after_timelock(now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::milliseconds(GOVERNANCE_TIMELOCK_MS as i64)
    }

    #[test]
    fn create_auto_signs_proposer() {
        let (config, gov, mut engine, now) = setup();
        let id = engine
            .create(&gov, &config, S1, ProposalKind::ApyChange(600), now)
            .unwrap();

        let p = engine.proposal(id).unwrap();
        assert_eq!(p.signature_count(), 1);
        assert!(p.has_signed(S1));
        assert_eq!(engine.proposal_count(), 1);
    }

    #[test]
    fn ids_are_sequential() {
        let (config, gov, mut engine, now) = setup();
        let a = engine
            .create(&gov, &config, S1, ProposalKind::ApyChange(600), now)
            .unwrap();
        let b = engine
            .create(&gov, &config, S2, ProposalKind::ApyChange(650), now)
            .unwrap();
        assert_eq!(b, a + 1);
    }

    #[test]
    fn create_by_non_member_rejected() {
        let (config, gov, mut engine, now) = setup();
        let result = engine.create(&gov, &config, "ember:outsider", ProposalKind::ApyChange(600), now);
        assert!(matches!(
            result,
            Err(GovernanceError::SignerNotAuthorized { .. })
        ));
    }

    #[test]
    fn create_with_foreign_cap_rejected() {
        let (config, _gov, mut engine, now) = setup();
        let forged = GovernanceCap::mint(vec![S1.into()], 1).unwrap();
        let result = engine.create(&forged, &config, S1, ProposalKind::ApyChange(600), now);
        // The config-side binding check fires first.
        assert!(matches!(
            result,
            Err(GovernanceError::Config(ConfigError::Unauthorized { .. }))
        ));
    }

    #[test]
    fn create_blocked_by_governance_pause() {
        let now = Utc::now();
        let (mut config, admin, gov) = ProtocolConfig::new(
            "ember:deployer",
            "ember:treasury",
            vec![S1.into(), S2.into(), S3.into()],
            2,
            now,
        )
        .unwrap();
        let mut engine = GovernanceEngine::new(&gov);
        config
            .set_pause(&admin, PauseKind::Governance, true, "audit", now)
            .unwrap();

        let result = engine.create(&gov, &config, S1, ProposalKind::ApyChange(600), now);
        assert!(matches!(
            result,
            Err(GovernanceError::Config(ConfigError::Paused { .. }))
        ));
    }

    #[test]
    fn double_sign_rejected() {
        let (config, gov, mut engine, now) = setup();
        let id = engine
            .create(&gov, &config, S1, ProposalKind::ApyChange(600), now)
            .unwrap();

        let result = engine.sign(&gov, id, S1);
        assert!(matches!(result, Err(GovernanceError::AlreadySigned { .. })));
    }

    #[test]
    fn non_member_sign_rejected() {
        let (config, gov, mut engine, now) = setup();
        let id = engine
            .create(&gov, &config, S1, ProposalKind::ApyChange(600), now)
            .unwrap();

        let result = engine.sign(&gov, id, "ember:outsider");
        assert!(matches!(
            result,
            Err(GovernanceError::SignerNotAuthorized { .. })
        ));
    }

    #[test]
    fn sign_missing_proposal_rejected() {
        let (_config, gov, mut engine, _now) = setup();
        let result = engine.sign(&gov, 42, S1);
        assert!(matches!(result, Err(GovernanceError::ProposalNotFound(42))));
    }

    #[test]
    fn execute_below_threshold_rejected() {
        let (mut config, gov, mut engine, now) = setup();
        let id = engine
            .create(&gov, &config, S1, ProposalKind::ApyChange(600), now)
            .unwrap();

        let result = engine.execute(&gov, &mut config, id, after_timelock(now));
        assert!(matches!(
            result,
            Err(GovernanceError::ThresholdNotMet { have: 1, need: 2, .. })
        ));
    }

    #[test]
    fn execute_before_timelock_rejected() {
        let (mut config, gov, mut engine, now) = setup();
        let id = engine
            .create(&gov, &config, S1, ProposalKind::ApyChange(600), now)
            .unwrap();
        engine.sign(&gov, id, S2).unwrap();

        let result = engine.execute(&gov, &mut config, id, now + Duration::hours(1));
        assert!(matches!(result, Err(GovernanceError::TimelockActive { .. })));
        assert_eq!(config.apy_bps(), crate::params::DEFAULT_APY_BPS);
    }

    #[test]
    fn execute_applies_change_once() {
        let (mut config, gov, mut engine, now) = setup();
        let id = engine
            .create(&gov, &config, S1, ProposalKind::ApyChange(600), now)
            .unwrap();
        engine.sign(&gov, id, S2).unwrap();

        assert!(!engine.is_executable(&gov, id, now));
        let at = after_timelock(now);
        assert!(engine.is_executable(&gov, id, at));

        engine.execute(&gov, &mut config, id, at).unwrap();
        assert_eq!(config.apy_bps(), 600);
        assert!(engine.proposal(id).unwrap().executed);

        // Second execution must not double-apply.
        let result = engine.execute(&gov, &mut config, id, at);
        assert!(matches!(result, Err(GovernanceError::AlreadyExecuted(_))));
        assert_eq!(config.apy_bps(), 600);
    }

    #[test]
    fn execute_out_of_band_change_leaves_proposal_pending() {
        let (mut config, gov, mut engine, now) = setup();
        // 5000 bps is outside the APY band; the proposal can be created
        // but its execution fails bounds validation and does not
        // terminalize the proposal.
        let id = engine
            .create(&gov, &config, S1, ProposalKind::ApyChange(5_000), now)
            .unwrap();
        engine.sign(&gov, id, S2).unwrap();

        let result = engine.execute(&gov, &mut config, id, after_timelock(now));
        assert!(matches!(
            result,
            Err(GovernanceError::Config(ConfigError::OutOfBounds { .. }))
        ));
        assert!(!engine.proposal(id).unwrap().executed);
    }

    #[test]
    fn pause_toggle_proposal_round_trip() {
        let (mut config, gov, mut engine, now) = setup();
        let id = engine
            .create(
                &gov,
                &config,
                S1,
                ProposalKind::PauseToggle {
                    kind: PauseKind::Mint,
                    on: true,
                    reason: "migration window".into(),
                },
                now,
            )
            .unwrap();
        engine.sign(&gov, id, S3).unwrap();
        engine.execute(&gov, &mut config, id, after_timelock(now)).unwrap();

        assert!(config.is_paused(PauseKind::Mint));
    }

    #[test]
    fn custom_proposal_executes_as_noop() {
        let (mut config, gov, mut engine, now) = setup();
        let before = serde_json::to_string(&config).unwrap();

        let id = engine
            .create(
                &gov,
                &config,
                S2,
                ProposalKind::Custom {
                    description: "approve Q3 partner cohort".into(),
                },
                now,
            )
            .unwrap();
        engine.sign(&gov, id, S3).unwrap();
        engine.execute(&gov, &mut config, id, after_timelock(now)).unwrap();

        assert!(engine.proposal(id).unwrap().executed);
        assert_eq!(serde_json::to_string(&config).unwrap(), before);
    }

    #[test]
    fn empty_custom_description_rejected() {
        let (config, gov, mut engine, now) = setup();
        let result = engine.create(
            &gov,
            &config,
            S1,
            ProposalKind::Custom {
                description: String::new(),
            },
            now,
        );
        assert!(matches!(result, Err(GovernanceError::InvalidInput(_))));
    }

    #[test]
    fn engine_serialization_roundtrip() {
        let (config, gov, mut engine, now) = setup();
        engine
            .create(&gov, &config, S1, ProposalKind::ApyChange(600), now)
            .unwrap();

        let json = serde_json::to_string(&engine).expect("serialize");
        let recovered: GovernanceEngine = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(recovered.proposal_count(), 1);
        assert!(recovered.proposal(1).is_some());
    }
}
