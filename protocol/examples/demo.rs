//! Interactive CLI demo of the full EMBER protocol lifecycle.
//!
//! Walks through protocol genesis, partner vault funding, backed points
//! issuance, a governance proposal through the 48-hour timelock, an
//! emergency pause drill, and redemption settlement against a live
//! oracle quote. The output uses ANSI escape codes for colored,
//! storytelling-style terminal rendering.
//!
//! Run with:
//!   cargo run --example demo --release

use std::time::Instant;

use chrono::{Duration, Utc};

use ember_protocol::config::{PauseKind, ProtocolConfig};
use ember_protocol::governance::{GovernanceEngine, ProposalKind};
use ember_protocol::ledger::{Ledger, MintReason};
use ember_protocol::oracle::FixedPriceOracle;
use ember_protocol::params::{GOVERNANCE_TIMELOCK_MS, MICRO_USD_PER_USD};
use ember_protocol::redemption::{check_feasible, redeem};
use ember_protocol::vault::{PartnerRegistry, PartnerVault};

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const ITALIC: &str = "\x1b[3m";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const BG_RED: &str = "\x1b[41m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn banner() {
    println!();
    println!(
        "{BG_RED}{BOLD}{WHITE}                                                                    {RESET}"
    );
    println!(
        "{BG_RED}{BOLD}{WHITE}    EMBER PROTOCOL  --  Interactive Lifecycle Demo                  {RESET}"
    );
    println!(
        "{BG_RED}{BOLD}{WHITE}    Version 0.1.0  |  Collateral-Backed Points Issuance            {RESET}"
    );
    println!(
        "{BG_RED}{BOLD}{WHITE}                                                                    {RESET}"
    );
    println!();
}

fn section(num: u32, title: &str) {
    println!();
    println!(
        "{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]=============================================================={RESET}"
    );
    println!("{BOLD}{WHITE}  {title}{RESET}");
    println!(
        "{CYAN}------------------------------------------------------------------------{RESET}"
    );
}

fn subsection(text: &str) {
    println!("{DIM}{CYAN}  >> {text}{RESET}");
}

fn success(text: &str) {
    println!("{GREEN}  [OK] {text}{RESET}");
}

fn info(label: &str, value: &str) {
    println!("{WHITE}  {BOLD}{label}:{RESET} {YELLOW}{value}{RESET}");
}

fn timing(label: &str, elapsed: std::time::Duration) {
    let ms = elapsed.as_secs_f64() * 1000.0;
    println!("{DIM}{MAGENTA}  [{label}: {ms:.2} ms]{RESET}");
}

fn points_row(name: &str, balance: u64, color: &str) {
    println!("  {color}{BOLD}{name:<12}{RESET}  {WHITE}{balance:>12}{RESET} {DIM}points{RESET}");
}

fn usdc(micro: u64) -> String {
    format!("{}.{:06} USDC", micro / MICRO_USD_PER_USD, micro % MICRO_USD_PER_USD)
}

fn separator() {
    println!(
        "{DIM}{CYAN}  . . . . . . . . . . . . . . . . . . . . . . . . . . . . . . . . . {RESET}"
    );
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let demo_start = Instant::now();
    banner();

    // -----------------------------------------------------------------------
    // Step 1: Protocol Genesis
    // -----------------------------------------------------------------------

    section(1, "Protocol Genesis & Capability Binding");
    subsection("Creating the config with a 2-of-3 governance multi-sig...");

    let now = Utc::now();
    let signers: Vec<String> = ["ember:sig-a", "ember:sig-b", "ember:sig-c"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let t = Instant::now();
    let (mut config, admin, gov) = ProtocolConfig::new(
        "ember:deployer",
        "ember:treasury",
        signers.clone(),
        2,
        now,
    )
    .expect("genesis");
    timing("genesis", t.elapsed());

    info("Admin capability", &admin.id().to_string());
    info("Governance capability", &gov.id().to_string());
    info("APY", &format!("{} bps", config.apy_bps()));
    info("Points rate", &format!("{} points/USD", config.points_per_usd()));
    success("Config deployed; capabilities bound by id, unforgeable by construction");

    // -----------------------------------------------------------------------
    // Step 2: Partner Vault Funding
    // -----------------------------------------------------------------------

    section(2, "Partner Vault Funding (Cafe Aurora)");
    subsection("Partner deposits 1,000 USDC of collateral with a 500k points/day quota...");

    let mut registry = PartnerRegistry::new();
    let t = Instant::now();
    let (partner_cap, mut vault) = PartnerVault::create(
        &config,
        &mut registry,
        "ember:cafe-aurora",
        1_000 * MICRO_USD_PER_USD,
        500_000,
        1,
        now,
    )
    .expect("vault create");
    timing("vault create", t.elapsed());

    info("Vault id", &vault.id().to_string());
    info("Collateral", &usdc(vault.balance()));
    info("Backing ratio", &format!("{} bps", vault.backing_ratio()));
    success("Vault live and fully backed");

    // -----------------------------------------------------------------------
    // Step 3: Backed Points Issuance
    // -----------------------------------------------------------------------

    section(3, "Backed Issuance: 100,000 Points to Alice");
    subsection("Reserving collateral and crediting the ledger in one atomic step...");

    let mut ledger = Ledger::new();
    let t = Instant::now();
    ledger
        .mint_backed(
            &config,
            &mut vault,
            &partner_cap,
            "ember:alice",
            100_000,
            MintReason::PartnerReward,
            now,
        )
        .expect("backed mint");
    timing("mint_backed", t.elapsed());

    println!();
    points_row("Alice", ledger.balance_of("ember:alice"), BLUE);
    println!();
    info("Collateral reserved", &usdc(vault.reserved()));
    info("Circulating supply", &ledger.circulating().to_string());
    assert!(ledger.audit());
    success("Ledger conservation invariant holds after mint");

    // -----------------------------------------------------------------------
    // Step 4: Governance Raises the APY
    // -----------------------------------------------------------------------

    section(4, "Governance: APY 500 -> 650 bps Through the Timelock");

    let mut engine = GovernanceEngine::new(&gov);

    subsection("Signer A proposes (auto-signs); signer B co-signs...");
    let proposal_id = engine
        .create(&gov, &config, &signers[0], ProposalKind::ApyChange(650), now)
        .expect("create proposal");
    engine.sign(&gov, proposal_id, &signers[1]).expect("co-sign");

    info("Proposal id", &proposal_id.to_string());
    info(
        "Executable now?",
        &engine.is_executable(&gov, proposal_id, now).to_string(),
    );

    subsection("Fast-forwarding 48 hours past the timelock...");
    let after_timelock = now + Duration::milliseconds(GOVERNANCE_TIMELOCK_MS as i64);
    let t = Instant::now();
    engine
        .execute(&gov, &mut config, proposal_id, after_timelock)
        .expect("execute");
    timing("execute", t.elapsed());

    info("APY", &format!("{} bps", config.apy_bps()));
    success("Proposal executed exactly once; re-execution would be rejected");

    // -----------------------------------------------------------------------
    // Step 5: Emergency Pause Drill
    // -----------------------------------------------------------------------

    section(5, "Emergency Pause Drill");
    subsection("Admin engages the break-glass switch...");

    config
        .set_pause(
            &admin,
            PauseKind::Emergency,
            true,
            "quarterly drill",
            after_timelock,
        )
        .expect("engage");

    let blocked = ledger.mint(
        &config,
        "ember:bob",
        1,
        MintReason::ReferralBonus,
        after_timelock,
    );
    info("Mint while paused", &format!("{:?}", blocked.is_err()));
    assert!(blocked.is_err());

    config
        .set_pause(
            &admin,
            PauseKind::Emergency,
            false,
            "drill complete",
            after_timelock,
        )
        .expect("lift");
    success("All surfaces halted under emergency pause, restored after lift");

    // -----------------------------------------------------------------------
    // Step 6: Redemption Settlement
    // -----------------------------------------------------------------------

    section(6, "Redemption: Alice Cashes Out 60,000 Points");
    subsection("Checking feasibility against a fresh oracle quote...");

    let oracle = FixedPriceOracle::pegged(after_timelock);
    let feasibility = check_feasible(
        &config,
        &ledger,
        &vault,
        &oracle,
        "ember:alice",
        60_000,
        after_timelock,
    );
    info("Feasible", &feasibility.feasible.to_string());
    info("Projected payout", &usdc(feasibility.payout_micro_usdc));
    info(
        "Post-settlement ratio",
        &format!("{} bps", feasibility.reserve_ratio_bps),
    );

    subsection("Settling: burn on the ledger, debit the vault, atomically...");
    let t = Instant::now();
    let payout = redeem(
        &config,
        &mut ledger,
        &mut vault,
        &mut registry,
        &oracle,
        "ember:alice",
        60_000,
        after_timelock,
    )
    .expect("redeem");
    timing("redeem", t.elapsed());

    info("Payout", &usdc(payout));

    separator();
    println!();
    points_row("Alice", ledger.balance_of("ember:alice"), BLUE);
    println!();
    info("Collateral reserved", &usdc(vault.reserved()));
    info("Vault balance", &usdc(vault.balance()));
    success("Both books settled; no partial state possible");

    // -----------------------------------------------------------------------
    // Final Summary
    // -----------------------------------------------------------------------

    let total_elapsed = demo_start.elapsed();

    println!();
    println!(
        "{BG_RED}{BOLD}{WHITE}                                                                    {RESET}"
    );
    println!(
        "{BG_RED}{BOLD}{WHITE}    DEMO COMPLETE -- Final Summary                                  {RESET}"
    );
    println!(
        "{BG_RED}{BOLD}{WHITE}                                                                    {RESET}"
    );
    println!();

    println!("  {BOLD}{WHITE}Protocol Statistics:{RESET}");
    println!("  {DIM}----------------------------------------------{RESET}");
    info("Partners onboarded", "1 (Cafe Aurora)");
    info("Points minted", &ledger.total_minted().to_string());
    info("Points burned", &ledger.total_burned().to_string());
    info("Circulating", &ledger.circulating().to_string());
    info("Collateral locked", &usdc(registry.total_locked()));
    info("Governance proposals", "1 executed (APY 500 -> 650 bps)");
    info("Oracle", "FixedPriceOracle at peg, 5-minute freshness window");
    println!();

    assert!(ledger.audit());
    assert!(registry.audit(&[vault.clone()]));
    println!(
        "  {ITALIC}{DIM}Conservation check: ledger and registry both reconcile{RESET}"
    );

    println!();
    println!(
        "  {BOLD}{GREEN}Total demo time: {:.2}s{RESET}",
        total_elapsed.as_secs_f64()
    );
    println!();
}
