// Ledger & redemption benchmarks for the EMBER protocol.
//
// Covers unbacked mints, backed mints through a partner vault, balance
// lookups against ledgers of various sizes, feasibility checks, and full
// redemption settlement.

use chrono::{DateTime, Duration, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use ember_protocol::auth::{AdminCap, GovernanceCap, PartnerCap};
use ember_protocol::config::ProtocolConfig;
use ember_protocol::ledger::{Ledger, MintReason};
use ember_protocol::oracle::FixedPriceOracle;
use ember_protocol::params::MICRO_USD_PER_USD;
use ember_protocol::redemption::{check_feasible, redeem};
use ember_protocol::vault::{PartnerRegistry, PartnerVault};

fn genesis() -> (ProtocolConfig, AdminCap, GovernanceCap, DateTime<Utc>) {
    let now = Utc::now();
    let (config, admin, gov) = ProtocolConfig::new(
        "ember:deployer",
        "ember:treasury",
        vec!["ember:sig-a".to_string()],
        1,
        now,
    )
    .expect("genesis");
    (config, admin, gov, now)
}

fn funded_vault(
    config: &ProtocolConfig,
    registry: &mut PartnerRegistry,
    now: DateTime<Utc>,
) -> (PartnerCap, PartnerVault) {
    PartnerVault::create(
        config,
        registry,
        "ember:bench-partner",
        1_000_000 * MICRO_USD_PER_USD,
        1_000_000_000,
        1,
        now,
    )
    .expect("vault")
}

fn bench_unbacked_mint(c: &mut Criterion) {
    let (config, _admin, _gov, now) = genesis();

    c.bench_function("ledger/mint", |b| {
        let mut ledger = Ledger::new();
        let mut day = 0i64;
        b.iter(|| {
            // Walk forward a day per iteration so the caps never bind.
            day += 1;
            let at = now + Duration::days(day);
            ledger
                .mint(&config, "ember:alice", 1_000, MintReason::StakingReward, at)
                .unwrap()
        });
    });
}

fn bench_backed_mint(c: &mut Criterion) {
    let (config, _admin, _gov, now) = genesis();

    c.bench_function("ledger/mint_backed", |b| {
        let mut registry = PartnerRegistry::new();
        let (cap, mut vault) = funded_vault(&config, &mut registry, now);
        let mut ledger = Ledger::new();
        let mut day = 0i64;
        b.iter(|| {
            day += 1;
            let at = now + Duration::days(day);
            ledger
                .mint_backed(
                    &config,
                    &mut vault,
                    &cap,
                    "ember:alice",
                    1_000,
                    MintReason::PartnerReward,
                    at,
                )
                .unwrap()
        });
    });
}

fn bench_balance_lookup(c: &mut Criterion) {
    let (config, _admin, _gov, now) = genesis();
    let mut group = c.benchmark_group("ledger/balance_of");

    for accounts in [100u64, 1_000, 10_000] {
        let mut ledger = Ledger::new();
        for i in 0..accounts {
            // Spread across days so the global cap never binds.
            let at = now + Duration::days(i as i64 / 1_000);
            ledger
                .mint(
                    &config,
                    &format!("ember:user-{i:06}"),
                    100,
                    MintReason::ReferralBonus,
                    at,
                )
                .unwrap();
        }
        let probe = format!("ember:user-{:06}", accounts / 2);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(accounts), &ledger, |b, l| {
            b.iter(|| l.balance_of(&probe));
        });
    }

    group.finish();
}

fn bench_feasibility(c: &mut Criterion) {
    let (config, _admin, _gov, now) = genesis();
    let mut registry = PartnerRegistry::new();
    let (cap, mut vault) = funded_vault(&config, &mut registry, now);
    let mut ledger = Ledger::new();
    let oracle = FixedPriceOracle::pegged(now);
    ledger
        .mint_backed(
            &config,
            &mut vault,
            &cap,
            "ember:alice",
            1_000_000,
            MintReason::PartnerReward,
            now,
        )
        .unwrap();

    c.bench_function("redemption/check_feasible", |b| {
        b.iter(|| check_feasible(&config, &ledger, &vault, &oracle, "ember:alice", 10_000, now));
    });
}

fn bench_redeem(c: &mut Criterion) {
    let (config, _admin, _gov, now) = genesis();

    c.bench_function("redemption/redeem", |b| {
        let mut registry = PartnerRegistry::new();
        let (cap, mut vault) = funded_vault(&config, &mut registry, now);
        let mut ledger = Ledger::new();
        let oracle = FixedPriceOracle::pegged(now);
        let mut day = 0i64;
        b.iter(|| {
            // Re-issue each iteration so there is always something to redeem.
            day += 1;
            let at = now + Duration::days(day);
            let oracle = {
                let mut o = oracle.clone();
                o.set_price(MICRO_USD_PER_USD, at);
                o
            };
            ledger
                .mint_backed(
                    &config,
                    &mut vault,
                    &cap,
                    "ember:alice",
                    1_000,
                    MintReason::PartnerReward,
                    at,
                )
                .unwrap();
            redeem(
                &config,
                &mut ledger,
                &mut vault,
                &mut registry,
                &oracle,
                "ember:alice",
                1_000,
                at,
            )
            .unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_unbacked_mint,
    bench_backed_mint,
    bench_balance_lookup,
    bench_feasibility,
    bench_redeem,
);
criterion_main!(benches);
