// Copyright (c) 2026 Ember Labs. MIT License.
// See LICENSE for details.

//! # EMBER Protocol — Economic Core
//!
//! This is the money half of EMBER: a points-issuance protocol where
//! every point a partner hands out is backed by real stablecoin sitting
//! in a vault, not by a promise and a pitch deck.
//!
//! EMBER takes a conservative stance: points are liabilities, collateral
//! is reserved the moment points are minted (rounding against the
//! protocol, always), and the only place market prices enter the system
//! is the redemption gateway — behind a freshness-checked oracle trait.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual concerns of a
//! collateralized points system:
//!
//! - **params** — Every economic constant in one place, with its band.
//! - **auth** — Capability objects. Possession is authorization.
//! - **config** — Global parameters, bounded setters, the pause board.
//! - **governance** — Timelocked multi-sig proposals over the config.
//! - **ledger** — The points book: mints, burns, daily caps, audit trail.
//! - **vault** — Partner collateral custody and the registry over it.
//! - **oracle** — The price feed seam. Stale quotes are dead quotes.
//! - **redemption** — Points out, stablecoin back, both books settled
//!   atomically.
//!
//! ## Design Philosophy
//!
//! 1. Checks are read-only, appliers are infallible. No partial state.
//! 2. Time is an argument, never an ambient read. Every daily cap is a
//!    bucket comparison, not a cron job.
//! 3. Rounding always favors the protocol. Nobody farms dust here.
//! 4. If it moves value, it has tests. Plural.

pub mod auth;
pub mod config;
pub mod governance;
pub mod ledger;
pub mod oracle;
pub mod params;
pub mod redemption;
pub mod vault;
