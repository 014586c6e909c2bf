//! Ledger store port and in-memory adapter
//!
//! The store offers ordered append of ledger entries and the per-unit lock
//! that makes an append+refresh pair atomic with respect to other writers of
//! the same unit. Cross-unit operations take no global lock; each unit's
//! append+refresh is independently atomic and partial distribution failures
//! are retried through the originating reference id.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use core_kernel::{BuildingId, ExpenseId, LedgerEntryId, UnitId, YearMonth};

use crate::entry::{EntryReference, LedgerEntry, NewLedgerEntry};
use crate::error::LedgerError;
use crate::expense::{ExpenseRecord, PaymentRecord};

/// Exclusive hold on a unit's ledger-and-balance pair
///
/// Acquiring the guard is the mutual-exclusion boundary for append+refresh;
/// the balance calculator takes a guard reference as proof that the caller
/// holds the lock. Dropping the guard releases the unit.
pub struct UnitLockGuard {
    unit_id: UnitId,
    held: Arc<Mutex<HashSet<UnitId>>>,
}

impl UnitLockGuard {
    fn acquire(
        held: Arc<Mutex<HashSet<UnitId>>>,
        unit_id: UnitId,
    ) -> Result<Self, LedgerError> {
        {
            let mut set = held.lock().expect("unit lock table poisoned");
            if !set.insert(unit_id) {
                return Err(LedgerError::ConcurrentUpdateConflict(unit_id));
            }
        }
        Ok(Self { unit_id, held })
    }

    pub fn unit_id(&self) -> UnitId {
        self.unit_id
    }
}

impl Drop for UnitLockGuard {
    fn drop(&mut self) {
        self.held
            .lock()
            .expect("unit lock table poisoned")
            .remove(&self.unit_id);
    }
}

/// Ordered, append-only persistence for the transaction ledger
///
/// `append` assigns the sequence number; entries are immutable afterwards.
/// All read methods return entries in append order.
pub trait LedgerStore: Send + Sync {
    /// Appends an entry, assigning its id and sequence number
    fn append(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, LedgerError>;

    /// All entries for a unit, in append order
    fn entries_for_unit(&self, unit_id: UnitId) -> Vec<LedgerEntry>;

    /// All entries for a building with an effective date in the given month
    fn entries_for_building_in_month(
        &self,
        building_id: BuildingId,
        month: YearMonth,
    ) -> Vec<LedgerEntry>;

    /// Entries created from a given originating record
    fn entries_for_reference(&self, reference: EntryReference) -> Vec<LedgerEntry>;

    /// Acquires the exclusive append+refresh lock for a unit
    ///
    /// Contention yields `ConcurrentUpdateConflict`; the caller retries the
    /// whole operation.
    fn lock_unit(&self, unit_id: UnitId) -> Result<UnitLockGuard, LedgerError>;

    /// Records an originating expense for reference and idempotency lookups
    fn record_expense(&self, expense: ExpenseRecord);

    /// Expenses for a building effective in the given month
    fn expenses_for_building_in_month(
        &self,
        building_id: BuildingId,
        month: YearMonth,
    ) -> Vec<ExpenseRecord>;

    /// Records an originating payment
    fn record_payment(&self, payment: PaymentRecord);
}

/// In-memory ledger store
///
/// Reference adapter used by tests and single-process deployments. A
/// database-backed adapter maps `append` to an insert with a sequence
/// column and `lock_unit` to a row lock.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    entries: RwLock<Vec<LedgerEntry>>,
    expenses: RwLock<Vec<ExpenseRecord>>,
    payments: RwLock<Vec<PaymentRecord>>,
    next_sequence: AtomicU64,
    held_units: Arc<Mutex<HashSet<UnitId>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of appended entries, for test assertions
    pub fn entry_count(&self) -> usize {
        self.entries.read().expect("ledger lock poisoned").len()
    }

    /// Number of recorded payment records, for test assertions
    pub fn payment_count(&self) -> usize {
        self.payments.read().expect("ledger lock poisoned").len()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn append(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, LedgerError> {
        if entry.amount.is_negative() {
            return Err(LedgerError::InvalidEntry(
                "entry magnitude must be non-negative".to_string(),
            ));
        }

        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let stored = LedgerEntry {
            id: LedgerEntryId::new_v7(),
            sequence,
            unit_id: entry.unit_id,
            building_id: entry.building_id,
            kind: entry.kind,
            amount: entry.amount,
            category: entry.category,
            balance_after: entry.balance_after,
            effective_date: entry.effective_date,
            recorded_at: entry.recorded_at,
            reference: entry.reference,
        };
        self.entries
            .write()
            .expect("ledger lock poisoned")
            .push(stored.clone());
        Ok(stored)
    }

    fn entries_for_unit(&self, unit_id: UnitId) -> Vec<LedgerEntry> {
        self.entries
            .read()
            .expect("ledger lock poisoned")
            .iter()
            .filter(|e| e.unit_id == unit_id)
            .cloned()
            .collect()
    }

    fn entries_for_building_in_month(
        &self,
        building_id: BuildingId,
        month: YearMonth,
    ) -> Vec<LedgerEntry> {
        self.entries
            .read()
            .expect("ledger lock poisoned")
            .iter()
            .filter(|e| e.building_id == building_id && month.contains(e.effective_date))
            .cloned()
            .collect()
    }

    fn entries_for_reference(&self, reference: EntryReference) -> Vec<LedgerEntry> {
        self.entries
            .read()
            .expect("ledger lock poisoned")
            .iter()
            .filter(|e| e.reference == Some(reference))
            .cloned()
            .collect()
    }

    fn lock_unit(&self, unit_id: UnitId) -> Result<UnitLockGuard, LedgerError> {
        UnitLockGuard::acquire(Arc::clone(&self.held_units), unit_id)
    }

    fn record_expense(&self, expense: ExpenseRecord) {
        self.expenses
            .write()
            .expect("ledger lock poisoned")
            .push(expense);
    }

    fn expenses_for_building_in_month(
        &self,
        building_id: BuildingId,
        month: YearMonth,
    ) -> Vec<ExpenseRecord> {
        self.expenses
            .read()
            .expect("ledger lock poisoned")
            .iter()
            .filter(|x| x.building_id == building_id && month.contains(x.effective_date))
            .cloned()
            .collect()
    }

    fn record_payment(&self, payment: PaymentRecord) {
        self.payments
            .write()
            .expect("ledger lock poisoned")
            .push(payment);
    }
}

/// Convenience for idempotency checks on recurring charges
///
/// Returns the id of an existing expense in the month matching the
/// predicate, if any.
pub fn find_expense_in_month(
    store: &dyn LedgerStore,
    building_id: BuildingId,
    month: YearMonth,
    predicate: impl Fn(&ExpenseRecord) -> bool,
) -> Option<ExpenseId> {
    store
        .expenses_for_building_in_month(building_id, month)
        .into_iter()
        .find(|x| predicate(x))
        .map(|x| x.id)
}
