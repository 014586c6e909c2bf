//! Engine configuration

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Tunables for one engine instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum tolerated drift between a cached balance and its ledger fold
    pub balance_tolerance: Decimal,
    /// How far back meter readings count toward a consumption delta
    pub meter_lookback_days: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            balance_tolerance: dec!(0.01),
            meter_lookback_days: 365,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.balance_tolerance, dec!(0.01));
        assert_eq!(config.meter_lookback_days, 365);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"meter_lookback_days": 90}"#).unwrap();
        assert_eq!(config.meter_lookback_days, 90);
        assert_eq!(config.balance_tolerance, dec!(0.01));
    }
}
