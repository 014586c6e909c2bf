//! Metered consumption readings

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{MeterReadingId, UnitId};

/// Kind of utility meter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterKind {
    Water,
    Heating,
    Electricity,
}

/// A single cumulative meter reading for a unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterReading {
    pub id: MeterReadingId,
    pub unit_id: UnitId,
    pub kind: MeterKind,
    /// Cumulative meter value at the time of reading
    pub value: Decimal,
    pub read_at: NaiveDate,
}

impl MeterReading {
    pub fn new(unit_id: UnitId, kind: MeterKind, value: Decimal, read_at: NaiveDate) -> Self {
        Self {
            id: MeterReadingId::new_v7(),
            unit_id,
            kind,
            value,
            read_at,
        }
    }
}

/// Consumption delta within a lookback window
///
/// A unit with fewer than two readings in the window has zero consumption:
/// a single reading carries no delta.
pub fn consumption_delta(readings: &[MeterReading]) -> Decimal {
    if readings.len() < 2 {
        return Decimal::ZERO;
    }

    let earliest = readings
        .iter()
        .min_by_key(|r| (r.read_at, *r.id.as_uuid()))
        .expect("non-empty readings");
    let latest = readings
        .iter()
        .max_by_key(|r| (r.read_at, *r.id.as_uuid()))
        .expect("non-empty readings");

    (latest.value - earliest.value).max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn reading(value: Decimal, day: u32) -> MeterReading {
        MeterReading::new(
            UnitId::new(),
            MeterKind::Water,
            value,
            NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
        )
    }

    #[test]
    fn test_delta_latest_minus_earliest() {
        let readings = vec![reading(dec!(120), 1), reading(dec!(135), 15), reading(dec!(150), 28)];
        assert_eq!(consumption_delta(&readings), dec!(30));
    }

    #[test]
    fn test_single_reading_is_zero() {
        let readings = vec![reading(dec!(120), 1)];
        assert_eq!(consumption_delta(&readings), Decimal::ZERO);
    }

    #[test]
    fn test_meter_rollover_clamps_to_zero() {
        let readings = vec![reading(dec!(990), 1), reading(dec!(10), 28)];
        assert_eq!(consumption_delta(&readings), Decimal::ZERO);
    }
}
