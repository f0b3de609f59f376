// 8.0 position.rs: leveraged spot positions and the pure math that governs them.
// a long borrows the margin asset and holds the target; a short borrows the
// target and holds the margin asset. loss is always measured in margin units
// against the posted margin.

use crate::types::{
    AccountId, AssetId, BorrowId, MarketId, ModelKind, PositionId, Ppm, Price, Side, Timestamp,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// 8.1: state machine. Open is the only live state; every terminal transition
// settles debt through the pool and pays out through the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    Open,
    Closed,
    Liquidated,
    TakenProfit,
    StoppedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    Close,
    TakeProfit,
    StopLoss,
    Liquidate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub market_id: MarketId,
    pub owner: AccountId,
    pub side: Side,
    pub margin_asset: AssetId,
    pub target_asset: AssetId,
    // the asset the debt is denominated in: margin asset for longs, target for shorts
    pub borrow_asset: AssetId,
    pub margin_amount: Decimal,
    // long: target units held. short: margin units held from selling the borrow.
    pub asset_amount: Decimal,
    pub borrow_id: BorrowId,
    pub model: ModelKind,
    pub entry_price: Price,
    pub take_profit: Option<Price>,
    pub stop_loss: Option<Price>,
    pub opened_at: Timestamp,
    pub updated_at: Timestamp,
    pub state: PositionState,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.state == PositionState::Open
    }

    pub fn unrealized_pnl(&self, price: Price, debt: Decimal) -> Decimal {
        -loss_at(self.side, price, debt, self.asset_amount)
    }

    pub fn take_profit_met(&self, price: Price) -> bool {
        match (self.side, self.take_profit) {
            (Side::Long, Some(tp)) => price >= tp,
            (Side::Short, Some(tp)) => price <= tp,
            (_, None) => false,
        }
    }

    pub fn stop_loss_met(&self, price: Price) -> bool {
        match (self.side, self.stop_loss) {
            (Side::Long, Some(sl)) => price <= sl,
            (Side::Short, Some(sl)) => price >= sl,
            (_, None) => false,
        }
    }
}

// 8.2: unrealized loss in margin units at a given price. positive = underwater.
// long: owes `debt` margin, holds `asset_amount` target worth asset*price.
// short: owes `debt` target worth debt*price, holds `asset_amount` margin.
pub fn loss_at(side: Side, price: Price, debt: Decimal, asset_amount: Decimal) -> Decimal {
    match side {
        Side::Long => debt - asset_amount * price.value(),
        Side::Short => debt * price.value() - asset_amount,
    }
}

// 8.3: the price at which the loss consumes `threshold` of the margin.
// long liquidates as price falls toward (debt - t*margin) / asset, so adding
// margin strictly lowers it. short liquidates as price rises toward
// (asset + t*margin) / debt, so adding margin strictly raises it.
pub fn liquidation_price(
    side: Side,
    margin_amount: Decimal,
    debt: Decimal,
    asset_amount: Decimal,
    threshold: Ppm,
) -> Option<Price> {
    let tolerated = threshold.apply(margin_amount);
    match side {
        Side::Long => {
            if asset_amount <= Decimal::ZERO {
                return None;
            }
            Price::new((debt - tolerated) / asset_amount)
        }
        Side::Short => {
            if debt <= Decimal::ZERO {
                return None;
            }
            Price::new((asset_amount + tolerated) / debt)
        }
    }
}

// price has crossed (or touched) the liquidation price
pub fn is_liquidatable(side: Side, price: Price, liq_price: Price) -> bool {
    match side {
        Side::Long => price <= liq_price,
        Side::Short => price >= liq_price,
    }
}

// 8.4: how much of the held asset may be swapped on close, after the fee for
// the given close reason. liquidations pay a different rate than closes.
pub fn swappable_after_fee(asset_amount: Decimal, fee_rate: Ppm) -> (Decimal, Decimal) {
    let fee = fee_rate.apply(asset_amount);
    (asset_amount - fee, fee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn long_loss_grows_as_price_falls() {
        // borrowed 6000 margin, holds 2.4 target
        let at_entry = loss_at(Side::Long, Price::new_unchecked(dec!(2500)), dec!(6000), dec!(2.4));
        assert_eq!(at_entry, dec!(0));

        let below = loss_at(Side::Long, Price::new_unchecked(dec!(2400)), dec!(6000), dec!(2.4));
        assert_eq!(below, dec!(240));

        let above = loss_at(Side::Long, Price::new_unchecked(dec!(2600)), dec!(6000), dec!(2.4));
        assert_eq!(above, dec!(-240)); // profit
    }

    #[test]
    fn short_loss_grows_as_price_rises() {
        // borrowed 2 target, holds 5000 margin
        let at_entry = loss_at(Side::Short, Price::new_unchecked(dec!(2500)), dec!(2), dec!(5000));
        assert_eq!(at_entry, dec!(0));

        let above = loss_at(Side::Short, Price::new_unchecked(dec!(2600)), dec!(2), dec!(5000));
        assert_eq!(above, dec!(200));
    }

    #[test]
    fn long_liquidation_price_formula() {
        // margin 1000, debt 6000, 2.4 target, 50% loss threshold
        let liq = liquidation_price(Side::Long, dec!(1000), dec!(6000), dec!(2.4), Ppm::new(500_000))
            .unwrap();
        // (6000 - 500) / 2.4
        assert_eq!(liq.value(), dec!(5500) / dec!(2.4));

        // at that price the loss is exactly half the margin
        let loss = loss_at(Side::Long, liq, dec!(6000), dec!(2.4));
        assert_eq!(loss, dec!(500));
    }

    #[test]
    fn adding_margin_lowers_long_liquidation_price() {
        let threshold = Ppm::new(500_000);
        let before =
            liquidation_price(Side::Long, dec!(1000), dec!(6000), dec!(2.4), threshold).unwrap();
        let after =
            liquidation_price(Side::Long, dec!(1500), dec!(6000), dec!(2.4), threshold).unwrap();
        assert!(after < before);
    }

    #[test]
    fn adding_margin_raises_short_liquidation_price() {
        let threshold = Ppm::new(500_000);
        let before =
            liquidation_price(Side::Short, dec!(1000), dec!(2), dec!(5000), threshold).unwrap();
        let after =
            liquidation_price(Side::Short, dec!(1500), dec!(2), dec!(5000), threshold).unwrap();
        assert!(after > before);
    }

    #[test]
    fn liquidation_trigger_direction() {
        let liq = Price::new_unchecked(dec!(2290));
        assert!(is_liquidatable(Side::Long, Price::new_unchecked(dec!(2290)), liq));
        assert!(is_liquidatable(Side::Long, Price::new_unchecked(dec!(2200)), liq));
        assert!(!is_liquidatable(Side::Long, Price::new_unchecked(dec!(2300)), liq));

        let liq_short = Price::new_unchecked(dec!(3000));
        assert!(is_liquidatable(Side::Short, Price::new_unchecked(dec!(3000)), liq_short));
        assert!(!is_liquidatable(Side::Short, Price::new_unchecked(dec!(2900)), liq_short));
    }

    #[test]
    fn fully_covered_long_has_no_liquidation_price() {
        // margin tolerance exceeds the debt: no positive price can liquidate
        let liq = liquidation_price(Side::Long, dec!(20000), dec!(6000), dec!(2.4), Ppm::new(500_000));
        assert!(liq.is_none());
    }

    #[test]
    fn swappable_after_fee_split() {
        let (swappable, fee) = swappable_after_fee(dec!(2.4), Ppm::new(10_000)); // 1%
        assert_eq!(fee, dec!(0.024));
        assert_eq!(swappable, dec!(2.376));
        assert_eq!(swappable + fee, dec!(2.4));
    }

    #[test]
    fn tp_sl_conditions_by_side() {
        let position = Position {
            id: PositionId(1),
            market_id: MarketId(1),
            owner: AccountId(1),
            side: Side::Long,
            margin_asset: AssetId(1),
            target_asset: AssetId(2),
            borrow_asset: AssetId(1),
            margin_amount: dec!(1000),
            asset_amount: dec!(2.4),
            borrow_id: BorrowId(1),
            model: ModelKind(2),
            entry_price: Price::new_unchecked(dec!(2500)),
            take_profit: Some(Price::new_unchecked(dec!(3250))),
            stop_loss: Some(Price::new_unchecked(dec!(2850))),
            opened_at: Timestamp::from_millis(0),
            updated_at: Timestamp::from_millis(0),
            state: PositionState::Open,
        };

        assert!(!position.take_profit_met(Price::new_unchecked(dec!(3200))));
        assert!(position.take_profit_met(Price::new_unchecked(dec!(3250))));
        assert!(position.take_profit_met(Price::new_unchecked(dec!(3300))));

        assert!(!position.stop_loss_met(Price::new_unchecked(dec!(2860))));
        assert!(position.stop_loss_met(Price::new_unchecked(dec!(2850))));

        let short = Position {
            side: Side::Short,
            take_profit: Some(Price::new_unchecked(dec!(2000))),
            stop_loss: Some(Price::new_unchecked(dec!(2800))),
            ..position
        };
        assert!(short.take_profit_met(Price::new_unchecked(dec!(1990))));
        assert!(!short.take_profit_met(Price::new_unchecked(dec!(2100))));
        assert!(short.stop_loss_met(Price::new_unchecked(dec!(2900))));
    }
}
