//! Ledger entries
//!
//! One immutable, timestamped charge/payment/adjustment record against a
//! unit. Entries are never mutated or reordered after creation; corrections
//! append a new entry. The store assigns a monotonically increasing sequence
//! number at append time, which is the tie-breaker for entries sharing an
//! effective date.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BuildingId, ExpenseId, LedgerEntryId, Money, PaymentId, UnitId};

use crate::error::LedgerError;
use crate::expense::ChargeCategory;

/// Kind of ledger entry; the balance sign is derived from it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Increases the unit's debt
    Charge,
    /// Decreases the unit's debt
    Payment,
    /// Sets the balance directly to `balance_after`; manual-correction
    /// escape hatch, the exception rather than the rule
    Adjustment,
}

/// Link from a ledger entry back to its originating record
///
/// Distribution retries use this reference to recognize units that were
/// already billed for an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryReference {
    Expense(ExpenseId),
    Payment(PaymentId),
}

/// An immutable ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier (time-ordered)
    pub id: LedgerEntryId,
    /// Store-assigned append order; deterministic tie-breaker for identical
    /// effective dates
    pub sequence: u64,
    /// Unit the entry is against
    pub unit_id: UnitId,
    /// Building of the unit
    pub building_id: BuildingId,
    /// Entry kind
    pub kind: EntryKind,
    /// Magnitude; always non-negative, sign derives from `kind`
    pub amount: Money,
    /// Charge category; present on charges only
    pub category: Option<ChargeCategory>,
    /// Target balance; present on adjustments only
    pub balance_after: Option<Money>,
    /// Business-effective date
    pub effective_date: NaiveDate,
    /// When the entry was appended
    pub recorded_at: DateTime<Utc>,
    /// Originating expense/payment, when any
    pub reference: Option<EntryReference>,
}

impl LedgerEntry {
    /// The entry's contribution to a running balance fold
    ///
    /// Charges add, payments subtract. Adjustments do not have a signed
    /// contribution; the fold replaces the running total with
    /// `balance_after` instead.
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            EntryKind::Charge => self.amount,
            EntryKind::Payment => -self.amount,
            EntryKind::Adjustment => Money::zero(),
        }
    }
}

/// A ledger entry awaiting append
///
/// Constructed through the kind-specific constructors so that the
/// kind/field invariants (category on charges, `balance_after` on
/// adjustments) hold by construction.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub unit_id: UnitId,
    pub building_id: BuildingId,
    pub kind: EntryKind,
    pub amount: Money,
    pub category: Option<ChargeCategory>,
    pub balance_after: Option<Money>,
    pub effective_date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
    pub reference: Option<EntryReference>,
}

impl NewLedgerEntry {
    /// A charge against a unit
    pub fn charge(
        unit_id: UnitId,
        building_id: BuildingId,
        amount: Money,
        category: ChargeCategory,
        effective_date: NaiveDate,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        if amount.is_negative() {
            return Err(LedgerError::InvalidEntry(
                "charge amount must be non-negative".to_string(),
            ));
        }
        Ok(Self {
            unit_id,
            building_id,
            kind: EntryKind::Charge,
            amount,
            category: Some(category),
            balance_after: None,
            effective_date,
            recorded_at,
            reference: None,
        })
    }

    /// A payment from a unit
    pub fn payment(
        unit_id: UnitId,
        building_id: BuildingId,
        amount: Money,
        effective_date: NaiveDate,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidEntry(
                "payment amount must be positive".to_string(),
            ));
        }
        Ok(Self {
            unit_id,
            building_id,
            kind: EntryKind::Payment,
            amount,
            category: None,
            balance_after: None,
            effective_date,
            recorded_at,
            reference: None,
        })
    }

    /// A manual balance adjustment
    pub fn adjustment(
        unit_id: UnitId,
        building_id: BuildingId,
        balance_after: Money,
        effective_date: NaiveDate,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            unit_id,
            building_id,
            kind: EntryKind::Adjustment,
            amount: Money::zero(),
            category: None,
            balance_after: Some(balance_after),
            effective_date,
            recorded_at,
            reference: None,
        }
    }

    /// Links the entry to its originating record
    pub fn with_reference(mut self, reference: EntryReference) -> Self {
        self.reference = Some(reference);
        self
    }
}
