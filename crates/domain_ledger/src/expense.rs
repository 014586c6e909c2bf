//! Expense records and charge categories
//!
//! The charge category is a tagged union so the type system separates
//! generically-distributed expenses from the two reserved recurring
//! categories. A generic month total computed over `Generic` charges can
//! never accidentally include management-fee or reserve-fund money, and the
//! recurring calculators never see a distribution rule; the historical
//! double-count bug class is unrepresentable.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{BuildingId, CoreError, ExpenseId, Money, UnitId};
use domain_property::MeterKind;

/// How a generic expense is split across units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionRule {
    /// Proportional to participation share (mills); falls back to equal
    /// split when the total share is zero
    ByShare,
    /// Equal split over all units
    EqualSplit,
    /// Equal split over an explicit subset of units
    ///
    /// The engine deliberately does not implement a distinct allocation for
    /// named subsets; splitting evenly over the subset is the documented
    /// behavior, not an oversight.
    SpecificUnits(Vec<UnitId>),
    /// Proportional to metered consumption of the given meter; falls back
    /// to equal split when total consumption is zero
    ByMeter(MeterKind),
}

/// Category of a charge
///
/// `ManagementFee` and `ReserveFund` are reserved: they are produced only by
/// the recurring charge generator with their dedicated split rules (flat
/// per-unit and by-share respectively) and are excluded from every generic
/// aggregate by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeCategory {
    Generic(DistributionRule),
    ManagementFee,
    ReserveFund,
}

impl ChargeCategory {
    pub fn is_generic(&self) -> bool {
        matches!(self, ChargeCategory::Generic(_))
    }

    pub fn is_management_fee(&self) -> bool {
        matches!(self, ChargeCategory::ManagementFee)
    }

    pub fn is_reserve_fund(&self) -> bool {
        matches!(self, ChargeCategory::ReserveFund)
    }
}

/// Which party an expense falls on, for reporting splits
///
/// Never affects balance sign or distribution; units are billed the full
/// share either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayerResponsibility {
    Owner,
    Occupant,
    Shared { owner_ratio: Decimal },
}

impl PayerResponsibility {
    /// Validates the owner ratio of a shared responsibility
    pub fn validate(&self) -> Result<(), CoreError> {
        if let PayerResponsibility::Shared { owner_ratio } = self {
            if *owner_ratio < Decimal::ZERO || *owner_ratio > Decimal::ONE {
                return Err(CoreError::validation(format!(
                    "owner ratio must be within 0-1, got {owner_ratio}"
                )));
            }
        }
        Ok(())
    }
}

/// A shared expense to be billed to a building's units
///
/// Immutable input created by collaborators (expense entry UI, CSV import);
/// the engine distributes it into per-unit ledger entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseRecord {
    /// Unique identifier; also the idempotency reference for distribution retries
    pub id: ExpenseId,
    /// Building the expense belongs to
    pub building_id: BuildingId,
    /// Total amount to distribute
    pub amount: Money,
    /// Charge category (generic rule or reserved recurring category)
    pub category: ChargeCategory,
    /// Business-effective date
    pub effective_date: NaiveDate,
    /// Human-readable description
    pub description: String,
    /// Optional owner/occupant reporting split
    pub responsibility: Option<PayerResponsibility>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl ExpenseRecord {
    pub fn new(
        building_id: BuildingId,
        amount: Money,
        category: ChargeCategory,
        effective_date: NaiveDate,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: ExpenseId::new_v7(),
            building_id,
            amount,
            category,
            effective_date,
            description: description.into(),
            responsibility: None,
            created_at: Utc::now(),
        }
    }

    /// Sets the reporting responsibility split
    pub fn with_responsibility(mut self, responsibility: PayerResponsibility) -> Self {
        self.responsibility = Some(responsibility);
        self
    }
}

/// How a payment was made, for reporting only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    BankTransfer,
    Cash,
    Check,
    Card,
}

/// A payment received from a unit
///
/// Immutable input; recording it appends a payment-kind ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: core_kernel::PaymentId,
    pub unit_id: UnitId,
    pub building_id: BuildingId,
    pub amount: Money,
    pub paid_at: NaiveDate,
    pub method: PaymentMethod,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn new(
        unit_id: UnitId,
        building_id: BuildingId,
        amount: Money,
        paid_at: NaiveDate,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: core_kernel::PaymentId::new_v7(),
            unit_id,
            building_id,
            amount,
            paid_at,
            method: PaymentMethod::default(),
            description: description.into(),
            created_at: Utc::now(),
        }
    }

    /// Sets the payment method tag
    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }
}
