//! Distribution engine
//!
//! Splits one expense amount into per-unit monetary shares. Whatever the
//! rule, the shares sum exactly to the (cent-rounded) expense amount:
//! residual cents are assigned deterministically to the first units of the
//! sorted order, never dropped.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use core_kernel::{Money, UnitId};
use domain_ledger::DistributionRule;
use domain_property::{consumption_delta, MeterKind, PropertyRegistry, ReserveFundPlan, Unit};

use crate::error::DistributionError;

/// One unit's computed share of an expense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitShare {
    pub unit_id: UnitId,
    pub amount: Money,
}

/// Which per-unit weight a share-proportional split uses
///
/// Heating and elevator splits fall back to the participation share for
/// units without a dedicated weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareBasis {
    Participation,
    Heating,
    Elevator,
}

/// Splits expenses across units according to a distribution rule
///
/// The reserved recurring categories never pass through `distribute`: the
/// management fee is computed by `management_fee_shares` (flat per unit)
/// and the reserve fund by `reserve_fund_shares` (always by participation
/// share). `distribute` takes a `DistributionRule`, which the reserved
/// categories do not carry.
pub struct DistributionEngine {
    registry: Arc<dyn PropertyRegistry>,
    /// Meter readings older than this many days before the expense date are
    /// outside the consumption window
    meter_lookback_days: u64,
}

impl DistributionEngine {
    pub const DEFAULT_METER_LOOKBACK_DAYS: u64 = 365;

    pub fn new(registry: Arc<dyn PropertyRegistry>, meter_lookback_days: u64) -> Self {
        Self {
            registry,
            meter_lookback_days,
        }
    }

    /// Computes each unit's share of `amount` under the given rule
    ///
    /// `units` must already be in deterministic order (the registry returns
    /// them sorted); the output preserves that order. For `SpecificUnits`
    /// only the named subset receives shares.
    pub fn distribute(
        &self,
        amount: Money,
        rule: &DistributionRule,
        units: &[Unit],
        effective_date: NaiveDate,
    ) -> Result<Vec<UnitShare>, DistributionError> {
        if units.is_empty() {
            return Err(DistributionError::EmptyUnitSet);
        }

        match rule {
            DistributionRule::ByShare => self.share_split(amount, units, ShareBasis::Participation),
            DistributionRule::EqualSplit => equal_split(amount, units),
            DistributionRule::SpecificUnits(subset) => {
                let targets = resolve_subset(units, subset)?;
                // Deliberately an equal split over the named subset; see the
                // rule's documentation.
                equal_split(amount, &targets)
            }
            DistributionRule::ByMeter(kind) => {
                self.meter_split(amount, units, *kind, effective_date)
            }
        }
    }

    /// Share-proportional split on the requested basis
    ///
    /// Falls back to an equal split when the total weight is zero, which
    /// happens for buildings whose shares were never entered.
    pub fn share_split(
        &self,
        amount: Money,
        units: &[Unit],
        basis: ShareBasis,
    ) -> Result<Vec<UnitShare>, DistributionError> {
        if units.is_empty() {
            return Err(DistributionError::EmptyUnitSet);
        }

        let weights: Vec<Decimal> = units
            .iter()
            .map(|u| match basis {
                ShareBasis::Participation => u.participation_share.as_decimal(),
                ShareBasis::Heating => u.effective_heating_share().as_decimal(),
                ShareBasis::Elevator => u.effective_elevator_share().as_decimal(),
            })
            .collect();

        if weights.iter().all(|w| w.is_zero()) {
            warn!(
                building = %units[0].building_id,
                "total participation share is zero; falling back to equal split"
            );
            return equal_split(amount, units);
        }

        let parts = amount.allocate_by_weights(&weights)?;
        Ok(zip_shares(units, parts))
    }

    /// The flat monthly management fee: every unit pays the same amount
    pub fn management_fee_shares(&self, units: &[Unit], fee_per_unit: Money) -> Vec<UnitShare> {
        units
            .iter()
            .map(|u| UnitShare {
                unit_id: u.id,
                amount: fee_per_unit.round_to_cents(),
            })
            .collect()
    }

    /// The monthly reserve fund installment, always split by participation share
    pub fn reserve_fund_shares(
        &self,
        plan: &ReserveFundPlan,
        units: &[Unit],
    ) -> Result<Vec<UnitShare>, DistributionError> {
        self.share_split(plan.monthly_amount(), units, ShareBasis::Participation)
    }

    fn meter_split(
        &self,
        amount: Money,
        units: &[Unit],
        kind: MeterKind,
        effective_date: NaiveDate,
    ) -> Result<Vec<UnitShare>, DistributionError> {
        let window_start = effective_date
            .checked_sub_days(Days::new(self.meter_lookback_days))
            .unwrap_or(NaiveDate::MIN);

        let mut weights = Vec::with_capacity(units.len());
        for unit in units {
            let readings =
                self.registry
                    .meter_readings(unit.id, kind, window_start, effective_date)?;
            weights.push(consumption_delta(&readings));
        }

        if weights.iter().all(|w| w.is_zero()) {
            warn!(
                building = %units[0].building_id,
                ?kind,
                "no metered consumption in window; falling back to equal split"
            );
            return equal_split(amount, units);
        }

        let parts = amount.allocate_by_weights(&weights)?;
        Ok(zip_shares(units, parts))
    }
}

fn equal_split(amount: Money, units: &[Unit]) -> Result<Vec<UnitShare>, DistributionError> {
    if units.is_empty() {
        return Err(DistributionError::EmptyUnitSet);
    }
    let parts = amount.allocate_evenly(units.len())?;
    Ok(zip_shares(units, parts))
}

/// Filters `units` down to the named subset, preserving unit order
fn resolve_subset(units: &[Unit], subset: &[UnitId]) -> Result<Vec<Unit>, DistributionError> {
    for id in subset {
        if !units.iter().any(|u| u.id == *id) {
            return Err(DistributionError::UnknownUnit(*id));
        }
    }
    let targets: Vec<Unit> = units
        .iter()
        .filter(|u| subset.contains(&u.id))
        .cloned()
        .collect();
    if targets.is_empty() {
        return Err(DistributionError::EmptyUnitSet);
    }
    Ok(targets)
}

fn zip_shares(units: &[Unit], parts: Vec<Money>) -> Vec<UnitShare> {
    units
        .iter()
        .zip(parts)
        .map(|(u, amount)| UnitShare {
            unit_id: u.id,
            amount,
        })
        .collect()
}
