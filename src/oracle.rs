// 6.0 oracle.rs: price feeds. the engine is agnostic to where prices come from;
// anything that can answer "price of asset X in reference units" can drive
// liquidation and PnL math. stale reads are the oracle's problem to reject.

use crate::types::{AssetId, Price, Timestamp};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

pub trait PriceOracle: fmt::Debug {
    // fixed-point precision the feed is quoted at, for consumers that need it
    fn decimals(&self) -> u32;

    // price of one unit of `asset` in the oracle's reference asset
    fn price_of(&self, asset: AssetId, now: Timestamp) -> Result<Price, OracleError>;
}

// price of `target` quoted in `quote_asset` units
pub fn relative_price(
    oracle: &dyn PriceOracle,
    target: AssetId,
    quote_asset: AssetId,
    now: Timestamp,
) -> Result<Price, OracleError> {
    let target_price = oracle.price_of(target, now)?;
    let quote_price = oracle.price_of(quote_asset, now)?;
    // both legs are positive so the ratio is too
    Ok(Price::new_unchecked(
        target_price.value() / quote_price.value(),
    ))
}

#[derive(Debug, Clone, Copy)]
struct PricePoint {
    price: Price,
    updated_at: Timestamp,
}

// 6.1: settable spot feed with a staleness bound. the handle is cheap to clone
// and shares one table, so the engine and a swap venue can read the same feed.
#[derive(Debug, Clone)]
pub struct SpotOracle {
    prices: Arc<RwLock<HashMap<AssetId, PricePoint>>>,
    max_age_secs: i64,
    decimals: u32,
}

impl SpotOracle {
    pub fn new(decimals: u32, max_age_secs: i64) -> Self {
        Self {
            prices: Arc::new(RwLock::new(HashMap::new())),
            max_age_secs,
            decimals,
        }
    }

    pub fn set_price(&self, asset: AssetId, price: Price, now: Timestamp) {
        self.prices.write().unwrap().insert(
            asset,
            PricePoint {
                price,
                updated_at: now,
            },
        );
    }
}

impl PriceOracle for SpotOracle {
    fn decimals(&self) -> u32 {
        self.decimals
    }

    fn price_of(&self, asset: AssetId, now: Timestamp) -> Result<Price, OracleError> {
        let table = self.prices.read().unwrap();
        let point = table.get(&asset).ok_or(OracleError::NoPrice(asset))?;

        let age_ms = now.as_millis() - point.updated_at.as_millis();
        if age_ms > self.max_age_secs * 1000 {
            return Err(OracleError::StalePrice {
                asset,
                age_secs: age_ms / 1000,
            });
        }
        Ok(point.price)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    #[error("No price for asset {0:?}")]
    NoPrice(AssetId),

    #[error("Price for asset {asset:?} is stale ({age_secs}s old)")]
    StalePrice { asset: AssetId, age_secs: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn missing_price_rejected() {
        let oracle = SpotOracle::new(36, 3600);
        let result = oracle.price_of(AssetId(1), Timestamp::from_millis(0));
        assert!(matches!(result, Err(OracleError::NoPrice(_))));
    }

    #[test]
    fn fresh_price_returned() {
        let oracle = SpotOracle::new(36, 3600);
        let asset = AssetId(1);
        oracle.set_price(asset, Price::new_unchecked(dec!(3000)), Timestamp::from_millis(0));

        let price = oracle.price_of(asset, Timestamp::from_millis(1000)).unwrap();
        assert_eq!(price.value(), dec!(3000));
    }

    #[test]
    fn stale_price_rejected() {
        let oracle = SpotOracle::new(36, 3600);
        let asset = AssetId(1);
        oracle.set_price(asset, Price::new_unchecked(dec!(3000)), Timestamp::from_millis(0));

        let result = oracle.price_of(asset, Timestamp::from_millis(3_601_000));
        assert!(matches!(result, Err(OracleError::StalePrice { .. })));
    }

    #[test]
    fn relative_price_is_ratio() {
        let oracle = SpotOracle::new(36, 3600);
        let base = AssetId(1);
        let target = AssetId(2);
        let now = Timestamp::from_millis(0);
        oracle.set_price(base, Price::new_unchecked(dec!(1)), now);
        oracle.set_price(target, Price::new_unchecked(dec!(2500)), now);

        let price = relative_price(&oracle, target, base, now).unwrap();
        assert_eq!(price.value(), dec!(2500));
    }

    #[test]
    fn shared_handles_see_updates() {
        let oracle = SpotOracle::new(36, 3600);
        let clone = oracle.clone();
        let asset = AssetId(1);
        let now = Timestamp::from_millis(0);

        oracle.set_price(asset, Price::new_unchecked(dec!(100)), now);
        assert_eq!(clone.price_of(asset, now).unwrap().value(), dec!(100));

        clone.set_price(asset, Price::new_unchecked(dec!(101)), now);
        assert_eq!(oracle.price_of(asset, now).unwrap().value(), dec!(101));
    }
}
