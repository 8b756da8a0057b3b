//! # Governance Module — Timelocked Multi-Sig Proposals
//!
//! Parameter changes that are too consequential for a lone admin key go
//! through here: a proposal is created by an authorized signer, gathers
//! signatures (each signer exactly once), and becomes executable only
//! after both the signature threshold and the timelock are satisfied.
//! Execution applies the change to the config store through the same
//! bounds validation the admin path uses — governance can move faster
//! than one key, never further than the bands allow.
//!
//! ## Architecture
//!
//! ```text
//! proposal.rs — Proposal: kind, signature set, timelock bookkeeping
//! engine.rs   — GovernanceEngine: create / sign / execute lifecycle
//! ```
//!
//! ## State Machine
//!
//! ```text
//!    create (proposer auto-signs)
//!         │
//!    ┌────▼─────┐   sign (each authorized signer, once)
//!    │ Pending   │◄───────────────────────────────┐
//!    └────┬─────┘                                  │
//!         │ signatures >= threshold                │
//!         │ AND now >= timelock_expiry             │
//!    ┌────▼─────┐                                  │
//!    │Executable │──────────────────────────────────┘
//!    └────┬─────┘
//!         │ execute (applies change, exactly once)
//!    ┌────▼─────┐
//!    │ Executed  │ ← terminal; re-execution aborts
//!    └──────────┘
//! ```
//!
//! A proposal that never reaches execution simply stays pending — there
//! is no expiry cleanup beyond the timelock gate.

pub mod engine;
pub mod proposal;

pub use engine::{GovernanceEngine, GovernanceError};
pub use proposal::{Proposal, ProposalKind};
