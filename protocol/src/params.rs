//! # Protocol Parameters & Constants
//!
//! Every magic number in EMBER lives here. If you're hardcoding a bound
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! These values define the economic envelope of the protocol: how fast
//! governance can move a parameter, how much a partner can withdraw per
//! day, how long a proposal sits in its timelock. Changing them after
//! launch means a coordinated upgrade, so choose wisely during devnet.

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Basis-point denominator. 10_000 bps = 100%. All ratios in the protocol
/// are integers over this denominator — no floating point near money.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Milliseconds in one day. Daily-cap windows and withdrawal windows are
/// keyed by `timestamp_ms / DAY_MS` (the "day bucket").
pub const DAY_MS: u64 = 86_400_000;

/// Smallest collateral unit per whole USD. USDC carries 6 decimals, so
/// all collateral amounts in the core are micro-USDC.
pub const MICRO_USD_PER_USD: u64 = 1_000_000;

// ---------------------------------------------------------------------------
// APY Bounds
// ---------------------------------------------------------------------------

/// Minimum protocol APY: 1.00%. Below this the staking side of the
/// economy stops making sense.
pub const MIN_APY_BPS: u64 = 100;

/// Maximum protocol APY: 20.00%. Above this we're a Ponzi, not a protocol.
pub const MAX_APY_BPS: u64 = 2_000;

/// Maximum APY movement per update call: 2.00%. Large changes must be
/// made incrementally, each step visible on-chain and auditable.
pub const MAX_APY_DELTA_BPS: u64 = 200;

/// APY at genesis: 5.00%.
pub const DEFAULT_APY_BPS: u64 = 500;

// ---------------------------------------------------------------------------
// Grace Period Bounds
// ---------------------------------------------------------------------------

/// Minimum grace period: 1 day. Users always get at least a day.
pub const MIN_GRACE_PERIOD_MS: u64 = DAY_MS;

/// Maximum grace period: 90 days. Beyond this, "grace" becomes "limbo".
pub const MAX_GRACE_PERIOD_MS: u64 = 90 * DAY_MS;

/// Maximum grace-period movement per update call: 7 days.
pub const MAX_GRACE_PERIOD_DELTA_MS: u64 = 7 * DAY_MS;

/// Grace period at genesis: 14 days.
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 14 * DAY_MS;

// ---------------------------------------------------------------------------
// Points Rate Bounds
// ---------------------------------------------------------------------------

/// Minimum points-per-USD rate. 1:1 is the floor.
pub const MIN_POINTS_PER_USD: u64 = 1;

/// Maximum points-per-USD rate. A million points per dollar is already
/// deep into loyalty-program-inflation territory.
pub const MAX_POINTS_PER_USD: u64 = 1_000_000;

/// Maximum points-rate movement per update call, as a fraction of the
/// current rate: 10%. Keeps repricing gradual for partners.
pub const MAX_POINTS_RATE_DELTA_BPS: u64 = 1_000;

/// Points-per-USD at genesis: 1000 points buy one dollar of backing.
pub const DEFAULT_POINTS_PER_USD: u64 = 1_000;

// ---------------------------------------------------------------------------
// Supply & Daily Caps
// ---------------------------------------------------------------------------

/// Hard ceiling on cumulative minted points at genesis: 1 trillion.
pub const DEFAULT_MAX_TOTAL_SUPPLY: u64 = 1_000_000_000_000;

/// Lowest max-supply governance may set. A protocol that can only ever
/// mint a million points isn't worth running.
pub const MIN_MAX_TOTAL_SUPPLY: u64 = 1_000_000;

/// Highest max-supply governance may set: 100 trillion.
pub const MAX_MAX_TOTAL_SUPPLY: u64 = 100_000_000_000_000;

/// Global daily mint cap at genesis: 10 billion points/day.
pub const DEFAULT_DAILY_CAP_GLOBAL: u64 = 10_000_000_000;

/// Band for the global daily cap.
pub const MIN_DAILY_CAP_GLOBAL: u64 = 1_000_000;
pub const MAX_DAILY_CAP_GLOBAL: u64 = 1_000_000_000_000;

/// Per-user daily mint cap at genesis: 10 million points/day.
pub const DEFAULT_DAILY_CAP_PER_USER: u64 = 10_000_000;

/// Band for the per-user daily cap.
pub const MIN_DAILY_CAP_PER_USER: u64 = 1_000;
pub const MAX_DAILY_CAP_PER_USER: u64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// Governance
// ---------------------------------------------------------------------------

/// Timelock between proposal creation and earliest execution: 48 hours.
/// Enough time for signers to notice a hostile proposal and for users
/// to exit if they disagree with a legitimate one.
pub const GOVERNANCE_TIMELOCK_MS: u64 = 48 * 60 * 60 * 1_000;

/// Maximum size of a governance signer set. Past 16 signers you want a
/// DAO framework, not a multisig.
pub const MAX_GOVERNANCE_SIGNERS: usize = 16;

/// Maximum length of a `Custom` proposal description or a pause reason.
pub const MAX_REASON_LEN: usize = 256;

// ---------------------------------------------------------------------------
// Partner Vaults
// ---------------------------------------------------------------------------

/// Minimum collateral to open a partner vault: 10 USDC. Filters out dust
/// vaults that cost more to track than they back.
pub const MIN_VAULT_COLLATERAL: u64 = 10 * MICRO_USD_PER_USD;

/// Band for a vault's daily minting quota, in points per day.
pub const MIN_DAILY_QUOTA: u64 = 100;
pub const MAX_DAILY_QUOTA: u64 = 1_000_000_000;

/// Maximum fraction of a vault's balance withdrawable per day bucket:
/// 20.00%. Slows down a compromised partner key from draining backing.
pub const MAX_DAILY_WITHDRAWAL_BPS: u64 = 2_000;

/// Minimum interval between DeFi yield harvests: 6 hours. Harvest math
/// on most venues is not meaningful at higher frequency.
pub const MIN_HARVEST_INTERVAL_MS: u64 = 6 * 60 * 60 * 1_000;

/// Maximum length of a DeFi protocol name or partner address string.
pub const MAX_NAME_LEN: usize = 128;

// ---------------------------------------------------------------------------
// Redemption
// ---------------------------------------------------------------------------

/// Minimum backing ratio a vault must retain after a redemption payout,
/// in bps. 10_000 = every reserved point stays fully collateralized.
pub const MIN_RESERVE_RATIO_BPS: u64 = 10_000;

/// Oracle prices older than this are treated as stale, and stale means
/// infeasible — never zero.
pub const MAX_PRICE_AGE_MS: u64 = 5 * 60 * 1_000;

// ---------------------------------------------------------------------------
// Audit Trail
// ---------------------------------------------------------------------------

/// Number of mint/burn records the ledger retains in its in-core ring.
/// Older provenance lives in the host platform's event history.
pub const AUDIT_TRAIL_CAP: usize = 1_024;
