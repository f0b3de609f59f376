// 3.0 rate_model.rs: utilization -> borrow rate. the curve is pluggable; the
// router registers one model per kind and pools look it up on every accrual.

use crate::types::seconds_per_year;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

// Capability interface for rate curves. Implementations must be pure: the same
// utilization always yields the same per-second rate.
pub trait InterestRateModel: fmt::Debug + Send + Sync {
    fn rate_per_second(&self, utilization: Decimal) -> Decimal;
}

// 3.1: two-slope kink model. gentle slope up to the optimal utilization, steep
// slope past it, annual rate capped at max_rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableInterestRateModel {
    pub base_rate: Decimal,
    pub optimal_utilization: Decimal,
    pub slope_below: Decimal,
    pub slope_above: Decimal,
    pub max_rate: Decimal,
}

impl Default for VariableInterestRateModel {
    fn default() -> Self {
        Self {
            base_rate: dec!(0.02),           // 2% floor
            optimal_utilization: dec!(0.8),  // kink at 80%
            slope_below: dec!(0.08),         // +8% across the first region
            slope_above: dec!(1.0),          // +100% across the second region
            max_rate: dec!(2.0),             // 200% annual ceiling
        }
    }
}

impl InterestRateModel for VariableInterestRateModel {
    fn rate_per_second(&self, utilization: Decimal) -> Decimal {
        let u = utilization.clamp(Decimal::ZERO, Decimal::ONE);

        let annual = if u <= self.optimal_utilization {
            self.base_rate + u / self.optimal_utilization * self.slope_below
        } else {
            let excess = (u - self.optimal_utilization)
                / (Decimal::ONE - self.optimal_utilization);
            self.base_rate + self.slope_below + excess * self.slope_above
        };

        annual.min(self.max_rate) / seconds_per_year()
    }
}

// 3.2: flat annual rate, independent of utilization. sim and test fixtures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedRateModel {
    pub annual_rate: Decimal,
}

impl FixedRateModel {
    pub fn new(annual_rate: Decimal) -> Self {
        Self { annual_rate }
    }
}

impl InterestRateModel for FixedRateModel {
    fn rate_per_second(&self, _utilization: Decimal) -> Decimal {
        self.annual_rate / seconds_per_year()
    }
}
