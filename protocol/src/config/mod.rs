//! # Config Module — Protocol Parameters & Pause Gate
//!
//! The config store is the root of authorization in EMBER. Every other
//! component validates against it: the ledger reads its caps and pause
//! flags, the vaults read its points rate and withdrawal rule, and the
//! governance engine is the only path allowed to change it besides the
//! admin capability.
//!
//! ## Architecture
//!
//! ```text
//! store.rs — ProtocolConfig: bounded setters, pause board, conversions
//! ```
//!
//! ## Design Principles
//!
//! 1. **Every setter is bounded twice.** A static band limits where a
//!    parameter can ever be, and a per-call delta limits how fast it can
//!    get there. Large changes happen in visible increments.
//!
//! 2. **Pause is four independent flags, not one.** Emergency is a
//!    superset the specific assertions also consult; mint, redemption,
//!    and governance can each be halted without freezing the rest.
//!
//! 3. **Capabilities, not callers.** Setters authenticate the capability
//!    object by id equality against the id recorded at genesis. A forged
//!    capability fails closed.

pub mod store;

pub use store::{ConfigError, PauseKind, ProtocolConfig};
