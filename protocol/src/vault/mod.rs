//! # Vault Module — Partner Collateral Custody
//!
//! Partners back the points they hand out with real stablecoin. A
//! [`PartnerVault`] holds that collateral and keeps two numbers honest:
//! `balance` (what the vault holds, in micro-USDC) and `reserved` (the
//! slice already committed against minted points). The invariant
//! `reserved <= balance` is what "never double-commit collateral" means
//! in code, and every operation in this module defends it.
//!
//! ## Architecture
//!
//! ```text
//! partner.rs  — PartnerVault: reservation, withdrawal, DeFi, harvest
//! registry.rs — PartnerRegistry: protocol-wide aggregate directory
//! ```
//!
//! ## Design Principles
//!
//! 1. **Reservation is oracle-independent.** Minting `n` points reserves
//!    `ceil(n → micro-USD)` at the config's points rate, deterministic
//!    and reproducible. Prices only enter at redemption.
//!
//! 2. **Withdrawals are rate-limited twice.** By headroom
//!    (`balance − reserved`) and by the daily withdrawal-rate rule, so a
//!    compromised partner key cannot drain backing in one transaction.
//!
//! 3. **The registry is derived state.** Its sums must always be
//!    re-derivable from the live vault set; `audit` does exactly that
//!    and the tests hammer it with random operation sequences.

pub mod partner;
pub mod registry;

pub use partner::{DefiPosition, PartnerVault, VaultError};
pub use registry::PartnerRegistry;
