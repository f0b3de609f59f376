// 12.11 trading/liquidations.rs: operator-triggered closes. take-profit and
// stop-loss are condition-gated settlements; liquidation runs a trial estimate
// first, commits against guaranteed floors, and falls back through the fee and
// then the pool when collateral cannot cover the debt.

use super::core::TradingCore;
use super::results::{
    CloseReceipt, LiquidationEstimate, LiquidationPlan, LiquidationReceipt, TradingError,
};
use crate::events::{BadDebtEvent, EventPayload, FeeCollectedEvent, FeeKind, LiquidatedEvent};
use crate::market::MarketError;
use crate::oracle::{relative_price, PriceOracle};
use crate::position::{is_liquidatable, liquidation_price, swappable_after_fee, CloseReason};
use crate::swap::SwapVenue;
use crate::types::{AccountId, MarketId, PositionId, Side};
use rust_decimal::Decimal;

impl TradingCore {
    // 12.12: close a winner once its take-profit threshold is crossed. operator
    // only; proceeds still go to the position owner.
    pub fn take_profit(
        &mut self,
        caller: AccountId,
        market_id: MarketId,
        position_id: PositionId,
        oracle: &dyn PriceOracle,
        venue: &mut dyn SwapVenue,
    ) -> Result<CloseReceipt, TradingError> {
        self.require_operator(caller)?;
        let position = self.open_position_snapshot(market_id, position_id)?;
        let price = relative_price(
            oracle,
            position.target_asset,
            position.margin_asset,
            self.current_time,
        )?;
        if !position.take_profit_met(price) {
            return Err(TradingError::ConditionNotMet);
        }
        self.settle_position(&position, CloseReason::TakeProfit, Decimal::ZERO, venue)
    }

    // 12.13: close a loser once its stop-loss threshold is crossed.
    pub fn stop_loss(
        &mut self,
        caller: AccountId,
        market_id: MarketId,
        position_id: PositionId,
        oracle: &dyn PriceOracle,
        venue: &mut dyn SwapVenue,
    ) -> Result<CloseReceipt, TradingError> {
        self.require_operator(caller)?;
        let position = self.open_position_snapshot(market_id, position_id)?;
        let price = relative_price(
            oracle,
            position.target_asset,
            position.margin_asset,
            self.current_time,
        )?;
        if !position.stop_loss_met(price) {
            return Err(TradingError::ConditionNotMet);
        }
        self.settle_position(&position, CloseReason::StopLoss, Decimal::ZERO, venue)
    }

    // 12.14: trial execution. prices the unwind against the venue with the
    // market's liquidation discount as a slippage floor and decides which way
    // the settlement waterfall goes. pure: call it before liquidate, or let
    // liquidate call it for you.
    pub fn estimate_liquidation(
        &self,
        market_id: MarketId,
        position_id: PositionId,
        oracle: &dyn PriceOracle,
        venue: &dyn SwapVenue,
    ) -> Result<LiquidationEstimate, TradingError> {
        let now = self.current_time;
        let market = self
            .markets
            .get(&market_id)
            .ok_or(MarketError::MarketNotFound(market_id))?;
        let position = market.get_position(position_id)?;
        if !position.is_open() {
            return Err(MarketError::PositionNotOpen(position_id).into());
        }
        let params = &market.params;

        let price = relative_price(oracle, position.target_asset, position.margin_asset, now)?;
        let debt = self.router.debt_of_underlying(
            position.borrow_asset,
            position.model,
            position.borrow_id,
            now,
        )?;
        let liq_price = liquidation_price(
            position.side,
            position.margin_amount,
            debt,
            position.asset_amount,
            params.liquidate_loss_threshold,
        )
        .ok_or(TradingError::ConditionNotMet)?;
        if !is_liquidatable(position.side, price, liq_price) {
            return Err(TradingError::ConditionNotMet);
        }

        let fee_rate = self.fees.liquidation_fee;
        let discount = Decimal::ONE - params.liquidation_discount.as_fraction();
        let margin = position.margin_amount;

        let estimate = match position.side {
            Side::Long => {
                let (swappable, fee) = swappable_after_fee(position.asset_amount, fee_rate);
                // floor: quote minus the discount granted to the liquidation swap
                let floor = venue.quote_exact_input(
                    position.target_asset,
                    position.margin_asset,
                    swappable,
                    now,
                )? * discount;
                if floor + margin >= debt {
                    LiquidationEstimate {
                        plan: LiquidationPlan::Covered,
                        debt,
                        price,
                        fee_to_treasury: fee,
                        fee_asset: position.target_asset,
                        margin_returned: floor + margin - debt,
                        bad_debt: Decimal::ZERO,
                    }
                } else {
                    let floor_all = venue.quote_exact_input(
                        position.target_asset,
                        position.margin_asset,
                        position.asset_amount,
                        now,
                    )? * discount;
                    if floor_all + margin >= debt {
                        LiquidationEstimate {
                            plan: LiquidationPlan::CoveredByFee,
                            debt,
                            price,
                            fee_to_treasury: floor_all + margin - debt,
                            fee_asset: position.margin_asset,
                            margin_returned: Decimal::ZERO,
                            bad_debt: Decimal::ZERO,
                        }
                    } else {
                        LiquidationEstimate {
                            plan: LiquidationPlan::BadDebt,
                            debt,
                            price,
                            fee_to_treasury: Decimal::ZERO,
                            fee_asset: position.margin_asset,
                            margin_returned: Decimal::ZERO,
                            bad_debt: debt - floor_all - margin,
                        }
                    }
                }
            }
            Side::Short => {
                let (held_after_fee, fee) = swappable_after_fee(position.asset_amount, fee_rate);
                let budget = held_after_fee + margin;
                let in_needed = venue.quote_exact_output(
                    position.margin_asset,
                    position.target_asset,
                    debt,
                    now,
                )?;
                if in_needed <= budget {
                    LiquidationEstimate {
                        plan: LiquidationPlan::Covered,
                        debt,
                        price,
                        fee_to_treasury: fee,
                        fee_asset: position.margin_asset,
                        margin_returned: budget - in_needed,
                        bad_debt: Decimal::ZERO,
                    }
                } else if in_needed <= budget + fee {
                    LiquidationEstimate {
                        plan: LiquidationPlan::CoveredByFee,
                        debt,
                        price,
                        fee_to_treasury: budget + fee - in_needed,
                        fee_asset: position.margin_asset,
                        margin_returned: Decimal::ZERO,
                        bad_debt: Decimal::ZERO,
                    }
                } else {
                    // spend everything buying the borrow asset back
                    let floor_bought = venue.quote_exact_input(
                        position.margin_asset,
                        position.target_asset,
                        position.asset_amount + margin,
                        now,
                    )? * discount;
                    LiquidationEstimate {
                        plan: LiquidationPlan::BadDebt,
                        debt,
                        price,
                        fee_to_treasury: Decimal::ZERO,
                        fee_asset: position.target_asset,
                        margin_returned: Decimal::ZERO,
                        bad_debt: (debt - floor_bought).max(Decimal::ZERO),
                    }
                }
            }
        };
        Ok(estimate)
    }

    // 12.15: forced close. the committed swap is bounded by the estimate's
    // floor, so every branch settles without going negative; surplus over the
    // floor flows to the owner, the treasury, or extra debt repayment in that
    // order of the waterfall.
    pub fn liquidate(
        &mut self,
        caller: AccountId,
        market_id: MarketId,
        position_id: PositionId,
        oracle: &dyn PriceOracle,
        venue: &mut dyn SwapVenue,
    ) -> Result<LiquidationReceipt, TradingError> {
        self.require_operator(caller)?;
        let position = self.open_position_snapshot(market_id, position_id)?;
        let now = self.current_time;

        // realize accrual so the estimate and the commit see the same debt
        self.router.poke(position.borrow_asset, position.model, now)?;
        let estimate = self.estimate_liquidation(market_id, position_id, oracle, &*venue)?;
        let debt = estimate.debt;

        let discount = {
            let market = self.markets.get(&market_id).expect("market exists");
            Decimal::ONE - market.params.liquidation_discount.as_fraction()
        };
        let fee_rate = self.fees.liquidation_fee;
        let treasury = self.fees.treasury;
        let margin = position.margin_amount;

        let (debt_repaid, fee_to_treasury, margin_returned, bad_debt) =
            match (position.side, estimate.plan) {
                (Side::Long, LiquidationPlan::Covered) => {
                    let (swappable, fee) = swappable_after_fee(position.asset_amount, fee_rate);
                    let expected = venue.quote_exact_input(
                        position.target_asset,
                        position.margin_asset,
                        swappable,
                        now,
                    )?;
                    let out = venue.swap_exact_input(
                        &mut self.ledger,
                        position.target_asset,
                        position.margin_asset,
                        swappable,
                        self.authority,
                        self.authority,
                        expected * discount,
                        now,
                    )?;
                    self.ledger
                        .transfer(self.authority, treasury, position.target_asset, fee)?;
                    let settlement = self.router.repay(
                        &mut self.ledger,
                        self.authority,
                        position.borrow_asset,
                        position.model,
                        position.borrow_id,
                        debt,
                        now,
                    )?;
                    let returned = margin + out - settlement.repaid;
                    self.ledger.transfer(
                        self.authority,
                        position.owner,
                        position.margin_asset,
                        returned,
                    )?;
                    (settlement.repaid, fee, returned, Decimal::ZERO)
                }
                (Side::Long, LiquidationPlan::CoveredByFee) => {
                    let expected = venue.quote_exact_input(
                        position.target_asset,
                        position.margin_asset,
                        position.asset_amount,
                        now,
                    )?;
                    let out = venue.swap_exact_input(
                        &mut self.ledger,
                        position.target_asset,
                        position.margin_asset,
                        position.asset_amount,
                        self.authority,
                        self.authority,
                        expected * discount,
                        now,
                    )?;
                    let settlement = self.router.repay(
                        &mut self.ledger,
                        self.authority,
                        position.borrow_asset,
                        position.model,
                        position.borrow_id,
                        debt,
                        now,
                    )?;
                    let leftover = margin + out - settlement.repaid;
                    self.ledger.transfer(
                        self.authority,
                        treasury,
                        position.margin_asset,
                        leftover,
                    )?;
                    (settlement.repaid, leftover, Decimal::ZERO, Decimal::ZERO)
                }
                (Side::Long, LiquidationPlan::BadDebt) => {
                    let expected = venue.quote_exact_input(
                        position.target_asset,
                        position.margin_asset,
                        position.asset_amount,
                        now,
                    )?;
                    let out = venue.swap_exact_input(
                        &mut self.ledger,
                        position.target_asset,
                        position.margin_asset,
                        position.asset_amount,
                        self.authority,
                        self.authority,
                        expected * discount,
                        now,
                    )?;
                    let available = margin + out;
                    let settlement = self.router.repay(
                        &mut self.ledger,
                        self.authority,
                        position.borrow_asset,
                        position.model,
                        position.borrow_id,
                        available,
                        now,
                    )?;
                    let written = if settlement.remaining_debt > Decimal::ZERO {
                        self.router.write_off(
                            self.authority,
                            position.borrow_asset,
                            position.model,
                            position.borrow_id,
                            settlement.remaining_debt,
                            now,
                        )?
                    } else {
                        Decimal::ZERO
                    };
                    // surplus over the floor, if the swap beat the estimate
                    let leftover = available - settlement.repaid;
                    self.ledger.transfer(
                        self.authority,
                        treasury,
                        position.margin_asset,
                        leftover,
                    )?;
                    (settlement.repaid, leftover, Decimal::ZERO, written)
                }
                (Side::Short, LiquidationPlan::Covered) => {
                    let (held_after_fee, fee) = swappable_after_fee(position.asset_amount, fee_rate);
                    let budget = held_after_fee + margin;
                    let spent = venue.swap_exact_output(
                        &mut self.ledger,
                        position.margin_asset,
                        position.target_asset,
                        debt,
                        self.authority,
                        self.authority,
                        budget,
                        now,
                    )?;
                    self.ledger
                        .transfer(self.authority, treasury, position.margin_asset, fee)?;
                    let settlement = self.router.repay(
                        &mut self.ledger,
                        self.authority,
                        position.borrow_asset,
                        position.model,
                        position.borrow_id,
                        debt,
                        now,
                    )?;
                    let returned = budget - spent;
                    self.ledger.transfer(
                        self.authority,
                        position.owner,
                        position.margin_asset,
                        returned,
                    )?;
                    (settlement.repaid, fee, returned, Decimal::ZERO)
                }
                (Side::Short, LiquidationPlan::CoveredByFee) => {
                    let total_budget = position.asset_amount + margin;
                    let spent = venue.swap_exact_output(
                        &mut self.ledger,
                        position.margin_asset,
                        position.target_asset,
                        debt,
                        self.authority,
                        self.authority,
                        total_budget,
                        now,
                    )?;
                    let settlement = self.router.repay(
                        &mut self.ledger,
                        self.authority,
                        position.borrow_asset,
                        position.model,
                        position.borrow_id,
                        debt,
                        now,
                    )?;
                    let leftover = total_budget - spent;
                    self.ledger.transfer(
                        self.authority,
                        treasury,
                        position.margin_asset,
                        leftover,
                    )?;
                    (settlement.repaid, leftover, Decimal::ZERO, Decimal::ZERO)
                }
                (Side::Short, LiquidationPlan::BadDebt) => {
                    let total = position.asset_amount + margin;
                    let expected = venue.quote_exact_input(
                        position.margin_asset,
                        position.target_asset,
                        total,
                        now,
                    )?;
                    let bought = venue.swap_exact_input(
                        &mut self.ledger,
                        position.margin_asset,
                        position.target_asset,
                        total,
                        self.authority,
                        self.authority,
                        expected * discount,
                        now,
                    )?;
                    let settlement = self.router.repay(
                        &mut self.ledger,
                        self.authority,
                        position.borrow_asset,
                        position.model,
                        position.borrow_id,
                        bought,
                        now,
                    )?;
                    let written = if settlement.remaining_debt > Decimal::ZERO {
                        self.router.write_off(
                            self.authority,
                            position.borrow_asset,
                            position.model,
                            position.borrow_id,
                            settlement.remaining_debt,
                            now,
                        )?
                    } else {
                        Decimal::ZERO
                    };
                    let leftover = bought - settlement.repaid;
                    if leftover > Decimal::ZERO {
                        self.ledger.transfer(
                            self.authority,
                            treasury,
                            position.target_asset,
                            leftover,
                        )?;
                    }
                    (settlement.repaid, leftover, Decimal::ZERO, written)
                }
            };

        self.retire_position(&position, CloseReason::Liquidate, now);

        if fee_to_treasury > Decimal::ZERO {
            self.emit_event(EventPayload::FeeCollected(FeeCollectedEvent {
                asset: estimate.fee_asset,
                amount: fee_to_treasury,
                kind: FeeKind::Liquidation,
            }));
        }
        if bad_debt > Decimal::ZERO {
            self.emit_event(EventPayload::BadDebt(BadDebtEvent {
                market_id,
                position_id,
                asset: position.borrow_asset,
                written_off: bad_debt,
            }));
        }
        self.emit_event(EventPayload::Liquidated(LiquidatedEvent {
            market_id,
            position_id,
            operator: caller,
            price: estimate.price,
            debt_repaid,
            fee_to_treasury,
            bad_debt,
        }));

        Ok(LiquidationReceipt {
            position_id,
            price: estimate.price,
            debt_repaid,
            fee_to_treasury,
            bad_debt,
            margin_returned,
        })
    }
}
