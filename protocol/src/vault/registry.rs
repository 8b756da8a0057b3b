//! # Partner Registry
//!
//! Protocol-wide aggregate directory over all partner vaults: how many
//! are live, how much collateral they hold, how much sits in DeFi, and
//! how much yield has been harvested. The registry is derived state —
//! every number in it must be re-derivable by summing the live vault
//! set, and [`audit`](PartnerRegistry::audit) does exactly that.

use serde::{Deserialize, Serialize};

use super::partner::PartnerVault;

/// Aggregate totals over all live partner vaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PartnerRegistry {
    /// Number of active vaults.
    count: usize,

    /// Σ `balance` over active vaults, in micro-USDC.
    total_locked: u64,

    /// Σ DeFi `deposited` over active vaults, in micro-USDC.
    total_in_defi: u64,

    /// Σ `lifetime_yield` over active vaults, in micro-USDC.
    total_yield: u64,
}

impl PartnerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active vaults.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Total collateral held by active vaults.
    pub fn total_locked(&self) -> u64 {
        self.total_locked
    }

    /// Total collateral active vaults have in DeFi custody.
    pub fn total_in_defi(&self) -> u64 {
        self.total_in_defi
    }

    /// Total yield harvested by active vaults.
    pub fn total_yield(&self) -> u64 {
        self.total_yield
    }

    // -----------------------------------------------------------------------
    // Bookkeeping hooks (called by PartnerVault mutations)
    // -----------------------------------------------------------------------

    // Credits saturate like the debits below: each vault bounds its own
    // balance, but the sum over vaults can still exceed u64.
    pub(crate) fn record_created(&mut self, initial_collateral: u64) {
        self.count += 1;
        self.total_locked = self.total_locked.saturating_add(initial_collateral);
    }

    pub(crate) fn record_deposited(&mut self, amount: u64) {
        self.total_locked = self.total_locked.saturating_add(amount);
    }

    pub(crate) fn record_withdrawn(&mut self, amount: u64) {
        self.total_locked = self.total_locked.saturating_sub(amount);
    }

    pub(crate) fn record_defi_transfer(&mut self, amount: u64) {
        self.total_locked = self.total_locked.saturating_sub(amount);
        self.total_in_defi = self.total_in_defi.saturating_add(amount);
    }

    pub(crate) fn record_harvest(&mut self, amount: u64) {
        self.total_locked = self.total_locked.saturating_add(amount);
        self.total_yield = self.total_yield.saturating_add(amount);
    }

    pub(crate) fn record_deactivated(
        &mut self,
        balance: u64,
        defi_deposited: u64,
        lifetime_yield: u64,
    ) {
        self.count = self.count.saturating_sub(1);
        self.total_locked = self.total_locked.saturating_sub(balance);
        self.total_in_defi = self.total_in_defi.saturating_sub(defi_deposited);
        self.total_yield = self.total_yield.saturating_sub(lifetime_yield);
    }

    // -----------------------------------------------------------------------
    // Audit
    // -----------------------------------------------------------------------

    /// Re-derives the aggregates from the live vault set and compares.
    /// The registry invariant: this returns `true` after any sequence
    /// of vault operations.
    pub fn audit(&self, vaults: &[PartnerVault]) -> bool {
        let live: Vec<&PartnerVault> = vaults.iter().filter(|v| v.is_active()).collect();

        let count = live.len();
        let locked: u64 = live.iter().map(|v| v.balance()).sum();
        let in_defi: u64 = live
            .iter()
            .map(|v| v.defi().map_or(0, |p| p.deposited))
            .sum();
        let yielded: u64 = live.iter().map(|v| v.lifetime_yield()).sum();

        count == self.count
            && locked == self.total_locked
            && in_defi == self.total_in_defi
            && yielded == self.total_yield
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtocolConfig;
    use crate::params::{MICRO_USD_PER_USD, MIN_HARVEST_INTERVAL_MS};
    use chrono::{DateTime, Duration, Utc};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn setup() -> (ProtocolConfig, DateTime<Utc>) {
        let now = Utc::now();
        let (config, _admin, _gov) = ProtocolConfig::new(
            "ember:deployer",
            "ember:treasury",
            vec!["ember:s1".into()],
            1,
            now,
        )
        .unwrap();
        (config, now)
    }

    #[test]
    fn empty_registry_audits_clean() {
        let registry = PartnerRegistry::new();
        assert!(registry.audit(&[]));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn aggregates_follow_vault_lifecycle() {
        let (config, now) = setup();
        let mut registry = PartnerRegistry::new();

        let (cap_a, mut a) = PartnerVault::create(
            &config,
            &mut registry,
            "ember:partner-a",
            1_000 * MICRO_USD_PER_USD,
            100_000,
            1,
            now,
        )
        .unwrap();
        let (_cap_b, b) = PartnerVault::create(
            &config,
            &mut registry,
            "ember:partner-b",
            500 * MICRO_USD_PER_USD,
            100_000,
            2,
            now,
        )
        .unwrap();

        assert_eq!(registry.count(), 2);
        assert_eq!(registry.total_locked(), 1_500 * MICRO_USD_PER_USD);
        assert!(registry.audit(&[a.clone(), b.clone()]));

        a.withdraw(&cap_a, &config, &mut registry, 100 * MICRO_USD_PER_USD, now)
            .unwrap();
        assert!(registry.audit(&[a.clone(), b.clone()]));

        a.deactivate(&cap_a, &mut registry).unwrap();
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.total_locked(), 500 * MICRO_USD_PER_USD);
        assert!(registry.audit(&[a, b]));
    }

    #[test]
    fn aggregate_totals_saturate_instead_of_wrapping() {
        let (config, now) = setup();
        let mut registry = PartnerRegistry::new();

        // Two whale vaults, each topped up to the u64 ceiling. Their own
        // balances are bounded per vault; the sum across vaults is not.
        for i in 0..2u64 {
            let (cap, mut vault) = PartnerVault::create(
                &config,
                &mut registry,
                &format!("ember:whale-{i}"),
                1_000 * MICRO_USD_PER_USD,
                100_000,
                i,
                now,
            )
            .unwrap();
            let top_up = u64::MAX - vault.balance();
            vault.deposit(&cap, &config, &mut registry, top_up).unwrap();
        }

        assert_eq!(registry.count(), 2);
        assert_eq!(registry.total_locked(), u64::MAX);
    }

    /// Property test: the registry sums stay re-derivable from the live
    /// vault set under arbitrary interleavings of vault operations.
    #[test]
    fn random_operation_sequences_keep_registry_consistent() {
        let (config, start) = setup();
        let mut rng = StdRng::seed_from_u64(0xE4B3);

        for _case in 0..20 {
            let mut registry = PartnerRegistry::new();
            let mut vaults = Vec::new();
            let mut now = start;

            for i in 0..4 {
                let (cap, vault) = PartnerVault::create(
                    &config,
                    &mut registry,
                    &format!("ember:partner-{i}"),
                    (100 + rng.gen_range(0..900)) * MICRO_USD_PER_USD,
                    100_000,
                    i,
                    now,
                )
                .unwrap();
                vaults.push((cap, vault));
            }

            for _step in 0..60 {
                let idx = rng.gen_range(0..vaults.len());
                let (cap, vault) = &mut vaults[idx];
                now += Duration::hours(rng.gen_range(1..30));

                // Outcomes are irrelevant here; the invariant must hold
                // whether each operation succeeds or aborts.
                match rng.gen_range(0..6u8) {
                    0 => {
                        let _ = vault.reserve_for_mint(&*cap, &config, rng.gen_range(1..50_000), now);
                    }
                    1 => {
                        let _ = vault.release_on_burn(&*cap, &config, rng.gen_range(1..50_000));
                    }
                    2 => {
                        let amount = rng.gen_range(1..200) * MICRO_USD_PER_USD;
                        let _ = vault.withdraw(&*cap, &config, &mut registry, amount, now);
                    }
                    3 => {
                        let amount = rng.gen_range(1..200) * MICRO_USD_PER_USD;
                        let _ = vault.deposit(&*cap, &config, &mut registry, amount);
                    }
                    4 => {
                        let amount = rng.gen_range(1..100) * MICRO_USD_PER_USD;
                        let _ = vault.transfer_to_defi(
                            &*cap,
                            &config,
                            &mut registry,
                            "scallop",
                            "ember:defi-custody",
                            amount,
                            now,
                        );
                    }
                    _ => {
                        now += Duration::milliseconds(MIN_HARVEST_INTERVAL_MS as i64);
                        let _ = vault.harvest_yield(
                            &*cap,
                            &config,
                            &mut registry,
                            rng.gen_range(1..1_000),
                            now,
                        );
                    }
                }

                let snapshot: Vec<PartnerVault> =
                    vaults.iter().map(|(_, v)| v.clone()).collect();
                assert!(
                    registry.audit(&snapshot),
                    "registry diverged from vault set"
                );
            }
        }
    }

    #[test]
    fn registry_serialization_roundtrip() {
        let (config, now) = setup();
        let mut registry = PartnerRegistry::new();
        let (_cap, _vault) = PartnerVault::create(
            &config,
            &mut registry,
            "ember:partner",
            100 * MICRO_USD_PER_USD,
            100_000,
            1,
            now,
        )
        .unwrap();

        let json = serde_json::to_string(&registry).expect("serialize");
        let recovered: PartnerRegistry = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(recovered.count(), 1);
        assert_eq!(recovered.total_locked(), 100 * MICRO_USD_PER_USD);
    }
}
