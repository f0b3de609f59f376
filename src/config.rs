// 11.0 config.rs: engine settings in one place. fee rates, fee cap, event log
// bounds. fee rates are ppm of the amount they apply to.

use crate::types::{AccountId, Ppm};
use serde::{Deserialize, Serialize};

// 11.1: trading-side fees. the borrow fee lives on the router, not here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeeConfig {
    pub treasury: AccountId,
    // charged on the borrowed amount at open and on the held asset at close
    pub trading_fee: Ppm,
    // charged on the held asset when a position is force-closed
    pub liquidation_fee: Ppm,
}

impl FeeConfig {
    pub fn new(treasury: AccountId, trading_fee: Ppm, liquidation_fee: Ppm) -> Self {
        Self {
            treasury,
            trading_fee,
            liquidation_fee,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    // ceiling on configurable fee rates, engine-side and router-side
    pub fee_cap: Ppm,
    pub max_events: usize,
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fee_cap: Ppm::new(200_000), // 20%
            max_events: 10_000,
            verbose: false,
        }
    }
}

impl EngineConfig {
    // tighter cap, smaller log. starting point for production deployments.
    pub fn conservative() -> Self {
        Self {
            fee_cap: Ppm::new(50_000), // 5%
            max_events: 1_000,
            verbose: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fee_cap.saturated() {
            return Err(ConfigError::InvalidFees {
                reason: "fee cap must be below 100%".to_string(),
            });
        }
        if self.max_events == 0 {
            return Err(ConfigError::InvalidLimits {
                reason: "event log must hold at least one event".to_string(),
            });
        }
        Ok(())
    }

    pub fn validate_fees(&self, fees: &FeeConfig) -> Result<(), ConfigError> {
        if fees.trading_fee > self.fee_cap || fees.liquidation_fee > self.fee_cap {
            return Err(ConfigError::InvalidFees {
                reason: format!("fee rates must not exceed cap {}", self.fee_cap),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid fees: {reason}")]
    InvalidFees { reason: String },

    #[error("Invalid limits: {reason}")]
    InvalidLimits { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_valid() {
        assert!(EngineConfig::default().validate().is_ok());
        assert!(EngineConfig::conservative().validate().is_ok());
    }

    #[test]
    fn saturated_fee_cap_rejected() {
        let config = EngineConfig {
            fee_cap: Ppm::new(1_000_000),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFees { .. })
        ));
    }

    #[test]
    fn fees_above_cap_rejected() {
        let config = EngineConfig::default();
        let fees = FeeConfig::new(AccountId(1), Ppm::new(200_001), Ppm::new(10_000));
        assert!(config.validate_fees(&fees).is_err());

        let ok = FeeConfig::new(AccountId(1), Ppm::new(1000), Ppm::new(10_000));
        assert!(config.validate_fees(&ok).is_ok());
    }

    #[test]
    fn config_serialization_round_trip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.fee_cap, config.fee_cap);
        assert_eq!(back.max_events, config.max_events);
    }
}
