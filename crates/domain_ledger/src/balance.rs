//! Balance calculator
//!
//! The single fold implementation over the ledger. Every other component
//! (distribution, period closing, verification) obtains balances through
//! this type instead of re-deriving folds, so there is exactly one place
//! where the fold rules live:
//!
//! - charges add, payments subtract
//! - adjustments replace the running total with their stored `balance_after`
//! - entries sharing an effective date fold in append order, never re-sorted
//!   by amount or kind

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, error};

use core_kernel::{Money, UnitId, YearMonth};
use domain_property::PropertyRegistry;

use crate::entry::{EntryKind, LedgerEntry};
use crate::error::LedgerError;
use crate::store::{LedgerStore, UnitLockGuard};

/// Computes unit balances from the ledger and maintains the cached
/// projection on the unit record
pub struct BalanceCalculator {
    ledger: Arc<dyn LedgerStore>,
    registry: Arc<dyn PropertyRegistry>,
}

impl BalanceCalculator {
    pub fn new(ledger: Arc<dyn LedgerStore>, registry: Arc<dyn PropertyRegistry>) -> Self {
        Self { ledger, registry }
    }

    /// Folds a unit's entire ledger into its current signed balance
    ///
    /// A unit with no entries has a balance of zero.
    pub fn current_balance(&self, unit_id: UnitId) -> Money {
        let mut entries = self.ledger.entries_for_unit(unit_id);
        sort_for_fold(&mut entries);
        fold(&entries)
    }

    /// Balance as of a historical date
    ///
    /// Charge-kind entries dated strictly before the first day of the month
    /// containing `as_of` count; payment-kind entries dated strictly before
    /// `as_of` itself count. Management-fee and reserve-fund charges are
    /// excluded from the generic fold and added back separately when the
    /// caller requests them, so they are counted exactly once. Adjustment
    /// entries do not participate in the historical fold.
    pub fn historical_balance(
        &self,
        unit_id: UnitId,
        as_of: NaiveDate,
        include_management_fee: bool,
        include_reserve_fund: bool,
    ) -> Money {
        let charge_cutoff = YearMonth::from_date(as_of).first_day();
        let entries = self.ledger.entries_for_unit(unit_id);

        let mut balance = Money::zero();
        let mut management_fees = Money::zero();
        let mut reserve_fund = Money::zero();

        for entry in &entries {
            match entry.kind {
                EntryKind::Charge => {
                    if entry.effective_date >= charge_cutoff {
                        continue;
                    }
                    match &entry.category {
                        Some(c) if c.is_management_fee() => management_fees += entry.amount,
                        Some(c) if c.is_reserve_fund() => reserve_fund += entry.amount,
                        _ => balance += entry.amount,
                    }
                }
                EntryKind::Payment => {
                    if entry.effective_date < as_of {
                        balance -= entry.amount;
                    }
                }
                EntryKind::Adjustment => {}
            }
        }

        if include_management_fee {
            balance += management_fees;
        }
        if include_reserve_fund {
            balance += reserve_fund;
        }
        balance
    }

    /// Recomputes and persists the unit's cached balance, returning it
    ///
    /// The guard parameter is proof that the caller holds the unit's
    /// append+refresh lock; the refreshed unit is the locked one.
    /// Idempotent: re-running without new entries yields the same value.
    pub fn refresh_cached_balance(&self, guard: &UnitLockGuard) -> Result<Money, LedgerError> {
        let unit_id = guard.unit_id();
        let balance = self.current_balance(unit_id);
        self.registry.update_cached_balance(unit_id, balance)?;
        debug!(%unit_id, %balance, "refreshed cached balance");
        Ok(balance)
    }

    /// Compares the cached balance against the recomputed fold
    ///
    /// A discrepancy beyond `tolerance` is an invariant violation: it is
    /// logged and surfaced, never auto-corrected here. Silent correction of
    /// money is itself a risk.
    pub fn check_cached_balance(
        &self,
        unit_id: UnitId,
        tolerance: Decimal,
    ) -> Result<(), LedgerError> {
        let unit = self.registry.unit(unit_id)?;
        let recomputed = self.current_balance(unit_id);
        let drift = (unit.current_balance - recomputed).abs();

        if drift.amount() > tolerance {
            error!(
                %unit_id,
                cached = %unit.current_balance,
                %recomputed,
                "cached balance diverged from ledger fold"
            );
            return Err(LedgerError::InvariantViolation {
                unit_id,
                cached: unit.current_balance,
                recomputed,
            });
        }
        Ok(())
    }
}

/// Orders entries for folding: effective date, then append order
fn sort_for_fold(entries: &mut [LedgerEntry]) {
    entries.sort_by_key(|e| (e.effective_date, e.sequence));
}

/// Folds ordered entries into a signed balance
fn fold(entries: &[LedgerEntry]) -> Money {
    let mut balance = Money::zero();
    for entry in entries {
        match entry.kind {
            EntryKind::Charge => balance += entry.amount,
            EntryKind::Payment => balance -= entry.amount,
            EntryKind::Adjustment => {
                balance = entry.balance_after.unwrap_or(balance);
            }
        }
    }
    balance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::NewLedgerEntry;
    use crate::expense::{ChargeCategory, DistributionRule};
    use crate::store::InMemoryLedgerStore;
    use chrono::Utc;
    use core_kernel::{BuildingId, Mills};
    use domain_property::{InMemoryPropertyRegistry, Unit};
    use rust_decimal_macros::dec;

    struct Fixture {
        calc: BalanceCalculator,
        ledger: Arc<InMemoryLedgerStore>,
        unit_id: UnitId,
        building_id: BuildingId,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let registry = Arc::new(InMemoryPropertyRegistry::new());
        let unit = Unit::new(BuildingId::new(), "1", Mills::new(300));
        let unit_id = unit.id;
        let building_id = unit.building_id;
        registry.insert_unit(unit);

        Fixture {
            calc: BalanceCalculator::new(ledger.clone(), registry),
            ledger,
            unit_id,
            building_id,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn generic() -> ChargeCategory {
        ChargeCategory::Generic(DistributionRule::ByShare)
    }

    #[test]
    fn test_empty_ledger_balance_is_zero() {
        let f = fixture();
        assert_eq!(f.calc.current_balance(f.unit_id), Money::zero());
    }

    #[test]
    fn test_current_balance_folds_charges_and_payments() {
        let f = fixture();
        let now = Utc::now();
        f.ledger
            .append(
                NewLedgerEntry::charge(
                    f.unit_id,
                    f.building_id,
                    Money::new(dec!(100)),
                    generic(),
                    date(2024, 1, 10),
                    now,
                )
                .unwrap(),
            )
            .unwrap();
        f.ledger
            .append(
                NewLedgerEntry::payment(
                    f.unit_id,
                    f.building_id,
                    Money::new(dec!(40)),
                    date(2024, 1, 20),
                    now,
                )
                .unwrap(),
            )
            .unwrap();

        assert_eq!(f.calc.current_balance(f.unit_id), Money::new(dec!(60)));
    }

    #[test]
    fn test_adjustment_replaces_running_total() {
        let f = fixture();
        let now = Utc::now();
        f.ledger
            .append(
                NewLedgerEntry::charge(
                    f.unit_id,
                    f.building_id,
                    Money::new(dec!(100)),
                    generic(),
                    date(2024, 1, 10),
                    now,
                )
                .unwrap(),
            )
            .unwrap();
        f.ledger
            .append(NewLedgerEntry::adjustment(
                f.unit_id,
                f.building_id,
                Money::new(dec!(25)),
                date(2024, 1, 15),
                now,
            ))
            .unwrap();
        f.ledger
            .append(
                NewLedgerEntry::charge(
                    f.unit_id,
                    f.building_id,
                    Money::new(dec!(10)),
                    generic(),
                    date(2024, 1, 20),
                    now,
                )
                .unwrap(),
            )
            .unwrap();

        assert_eq!(f.calc.current_balance(f.unit_id), Money::new(dec!(35)));
    }

    #[test]
    fn test_same_day_ties_fold_in_append_order() {
        let f = fixture();
        let now = Utc::now();
        // Charge then adjustment on the same day: adjustment wins because it
        // was appended later, not because of its amount.
        f.ledger
            .append(
                NewLedgerEntry::charge(
                    f.unit_id,
                    f.building_id,
                    Money::new(dec!(100)),
                    generic(),
                    date(2024, 1, 10),
                    now,
                )
                .unwrap(),
            )
            .unwrap();
        f.ledger
            .append(NewLedgerEntry::adjustment(
                f.unit_id,
                f.building_id,
                Money::new(dec!(7)),
                date(2024, 1, 10),
                now,
            ))
            .unwrap();

        assert_eq!(f.calc.current_balance(f.unit_id), Money::new(dec!(7)));
    }

    #[test]
    fn test_historical_balance_cutoffs() {
        let f = fixture();
        let now = Utc::now();
        // Charge in February, payment mid-March.
        f.ledger
            .append(
                NewLedgerEntry::charge(
                    f.unit_id,
                    f.building_id,
                    Money::new(dec!(100)),
                    generic(),
                    date(2024, 2, 10),
                    now,
                )
                .unwrap(),
            )
            .unwrap();
        f.ledger
            .append(
                NewLedgerEntry::payment(
                    f.unit_id,
                    f.building_id,
                    Money::new(dec!(30)),
                    date(2024, 3, 10),
                    now,
                )
                .unwrap(),
            )
            .unwrap();
        // Charge inside March: excluded from a mid-March historical query
        // because charges count only before the month start.
        f.ledger
            .append(
                NewLedgerEntry::charge(
                    f.unit_id,
                    f.building_id,
                    Money::new(dec!(500)),
                    generic(),
                    date(2024, 3, 5),
                    now,
                )
                .unwrap(),
            )
            .unwrap();

        let balance = f
            .calc
            .historical_balance(f.unit_id, date(2024, 3, 15), false, false);
        assert_eq!(balance, Money::new(dec!(70)));

        // A payment on the as_of date itself does not count.
        let balance = f
            .calc
            .historical_balance(f.unit_id, date(2024, 3, 10), false, false);
        assert_eq!(balance, Money::new(dec!(100)));
    }

    #[test]
    fn test_historical_balance_fee_flags() {
        let f = fixture();
        let now = Utc::now();
        f.ledger
            .append(
                NewLedgerEntry::charge(
                    f.unit_id,
                    f.building_id,
                    Money::new(dec!(100)),
                    generic(),
                    date(2024, 2, 10),
                    now,
                )
                .unwrap(),
            )
            .unwrap();
        f.ledger
            .append(
                NewLedgerEntry::charge(
                    f.unit_id,
                    f.building_id,
                    Money::new(dec!(25)),
                    ChargeCategory::ManagementFee,
                    date(2024, 2, 1),
                    now,
                )
                .unwrap(),
            )
            .unwrap();
        f.ledger
            .append(
                NewLedgerEntry::charge(
                    f.unit_id,
                    f.building_id,
                    Money::new(dec!(50)),
                    ChargeCategory::ReserveFund,
                    date(2024, 2, 1),
                    now,
                )
                .unwrap(),
            )
            .unwrap();

        let as_of = date(2024, 3, 15);
        assert_eq!(
            f.calc.historical_balance(f.unit_id, as_of, false, false),
            Money::new(dec!(100))
        );
        assert_eq!(
            f.calc.historical_balance(f.unit_id, as_of, true, false),
            Money::new(dec!(125))
        );
        assert_eq!(
            f.calc.historical_balance(f.unit_id, as_of, true, true),
            Money::new(dec!(175))
        );
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let f = fixture();
        let now = Utc::now();
        f.ledger
            .append(
                NewLedgerEntry::charge(
                    f.unit_id,
                    f.building_id,
                    Money::new(dec!(80)),
                    generic(),
                    date(2024, 1, 10),
                    now,
                )
                .unwrap(),
            )
            .unwrap();

        let guard = f.ledger.lock_unit(f.unit_id).unwrap();
        let first = f.calc.refresh_cached_balance(&guard).unwrap();
        let second = f.calc.refresh_cached_balance(&guard).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, Money::new(dec!(80)));
    }

    #[test]
    fn test_check_cached_balance_detects_drift() {
        let f = fixture();
        let now = Utc::now();
        f.ledger
            .append(
                NewLedgerEntry::charge(
                    f.unit_id,
                    f.building_id,
                    Money::new(dec!(80)),
                    generic(),
                    date(2024, 1, 10),
                    now,
                )
                .unwrap(),
            )
            .unwrap();

        // Cache was never refreshed: still zero, drift of 80.
        let result = f.calc.check_cached_balance(f.unit_id, dec!(0.01));
        assert!(matches!(
            result,
            Err(LedgerError::InvariantViolation { .. })
        ));

        let guard = f.ledger.lock_unit(f.unit_id).unwrap();
        f.calc.refresh_cached_balance(&guard).unwrap();
        drop(guard);
        assert!(f.calc.check_cached_balance(f.unit_id, dec!(0.01)).is_ok());
    }
}
