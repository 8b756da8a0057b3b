//! # Ledger Module — Points Accounting
//!
//! The ledger is where points live. Every mint, burn, lock, and unlock
//! passes through here, and the books must balance after each one:
//! `total_minted − total_burned == Σ (available + locked)` for all
//! reachable states, no exceptions, no "eventually".
//!
//! ## Architecture
//!
//! ```text
//! window.rs — Day-bucket usage windows for scheduler-free daily caps
//! book.rs   — Ledger: balances, mint/burn, provenance audit ring
//! ```
//!
//! ## Design Principles
//!
//! 1. **All amounts are `u64` points.** No floating point, no decimals
//!    in arithmetic.
//!
//! 2. **Daily caps without a scheduler.** Each rate-limit counter is a
//!    `(bucket, used)` pair; a mint whose bucket differs from the stored
//!    one sees a fresh counter. No background jobs, no cron.
//!
//! 3. **Abort-before-commit.** Every precondition is checked before any
//!    field changes. A failed mint leaves the ledger byte-identical.

pub mod book;
pub mod window;

pub use book::{Account, CapScope, Ledger, LedgerError, LedgerOp, LedgerRecord, MintReason};
pub use window::{day_bucket, UsageWindow};
