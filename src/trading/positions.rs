// 12.5 trading/positions.rs: open, close, add margin. every operation validates
// against a quote first and only then mutates, so a failed call leaves no trace.

use super::core::TradingCore;
use super::results::{CloseReceipt, OpenPositionReceipt, TradingError};
use crate::events::{
    BorrowedEvent, EventPayload, FeeCollectedEvent, FeeKind, MarginAddedEvent,
    PositionClosedEvent, PositionOpenedEvent, RepaidEvent,
};
use crate::ledger::LedgerError;
use crate::market::MarketError;
use crate::oracle::{relative_price, PriceOracle};
use crate::position::{
    liquidation_price, swappable_after_fee, CloseReason, Position, PositionState,
};
use crate::swap::SwapVenue;
use crate::types::{AccountId, AssetId, MarketId, ModelKind, PositionId, Ppm, Price, Side};
use rust_decimal::Decimal;

impl TradingCore {
    pub(super) fn fee_rate_for(&self, reason: CloseReason) -> Ppm {
        match reason {
            CloseReason::Liquidate => self.fees.liquidation_fee,
            _ => self.fees.trading_fee,
        }
    }

    pub fn calculate_trading_fee(&self, amount: Decimal) -> Decimal {
        self.fees.trading_fee.apply(amount)
    }

    // 12.6: open a leveraged position. `long_target` names the asset the caller
    // wants exposure to: the target asset opens a long (borrow margin, buy
    // target), the margin asset opens a short (borrow target, sell for margin).
    #[allow(clippy::too_many_arguments)]
    pub fn open_position(
        &mut self,
        caller: AccountId,
        market_id: MarketId,
        model: ModelKind,
        long_target: AssetId,
        margin_amount: Decimal,
        borrow_amount: Decimal,
        min_asset_out: Decimal,
        take_profit: Option<Price>,
        stop_loss: Option<Price>,
        oracle: &dyn PriceOracle,
        venue: &mut dyn SwapVenue,
    ) -> Result<OpenPositionReceipt, TradingError> {
        let now = self.current_time;
        let market = self
            .markets
            .get(&market_id)
            .ok_or(MarketError::MarketNotFound(market_id))?;
        if !market.is_active() {
            return Err(MarketError::MarketPaused(market_id).into());
        }
        let params = market.params.clone();

        let margin_asset = params.margin_asset();
        let target_asset = params.target_asset();
        let side = if long_target == target_asset {
            Side::Long
        } else if long_target == margin_asset {
            Side::Short
        } else {
            return Err(TradingError::InvalidAsset(long_target));
        };
        if margin_amount <= Decimal::ZERO || borrow_amount <= Decimal::ZERO {
            return Err(TradingError::ZeroAmount);
        }

        let (borrow_asset, hold_asset) = match side {
            Side::Long => (margin_asset, target_asset),
            Side::Short => (target_asset, margin_asset),
        };

        let price = relative_price(oracle, target_asset, margin_asset, now)?;
        let borrow_value = match side {
            Side::Long => borrow_amount,
            Side::Short => borrow_amount * price.value(),
        };
        let leverage = borrow_value / margin_amount;
        if leverage > params.max_leverage.value() {
            return Err(TradingError::LeverageExceeded {
                requested: leverage,
                max: params.max_leverage.value(),
            });
        }

        // plan: fee off the borrow, quote the swap, bound the entry loss
        let trading_fee = self.fees.trading_fee.apply(borrow_amount);
        let swap_in = borrow_amount - trading_fee;
        let expected_out = venue.quote_exact_input(borrow_asset, hold_asset, swap_in, now)?;
        if expected_out < min_asset_out {
            return Err(crate::swap::SwapError::TooLittleReceived {
                minimum: min_asset_out,
                actual: expected_out,
            }
            .into());
        }

        let entry_value = match side {
            Side::Long => expected_out * price.value(),
            Side::Short => expected_out,
        };
        let entry_loss = borrow_value - entry_value;
        let loss_limit = params.open_loss_threshold.apply(margin_amount);
        if entry_loss > loss_limit {
            return Err(TradingError::OpenLossTooHigh {
                loss: entry_loss,
                limit: loss_limit,
            });
        }

        market.check_cap(margin_asset, margin_amount)?;
        market.check_cap(hold_asset, expected_out)?;

        let caller_funds = self.ledger.balance_of(caller, margin_asset);
        if margin_amount > caller_funds {
            return Err(LedgerError::InsufficientBalance {
                account: caller,
                asset: margin_asset,
                requested: margin_amount,
                available: caller_funds,
            }
            .into());
        }
        let venue_reserves = self.ledger.balance_of(venue.account(), hold_asset);
        if expected_out > venue_reserves {
            return Err(LedgerError::InsufficientBalance {
                account: venue.account(),
                asset: hold_asset,
                requested: expected_out,
                available: venue_reserves,
            }
            .into());
        }

        // accrual is idempotent bookkeeping, safe before the capacity check
        self.router.poke(borrow_asset, model, now)?;
        self.router.can_borrow(borrow_asset, model, borrow_amount)?;

        // commit: everything below is pre-validated
        let borrow_id = self.router.commit_borrow(
            &mut self.ledger,
            self.authority,
            borrow_asset,
            model,
            borrow_amount,
            now,
        )?;
        self.ledger
            .transfer(caller, self.authority, margin_asset, margin_amount)?;
        self.ledger
            .transfer(self.authority, self.fees.treasury, borrow_asset, trading_fee)?;
        let asset_amount = venue.swap_exact_input(
            &mut self.ledger,
            borrow_asset,
            hold_asset,
            swap_in,
            self.authority,
            self.authority,
            min_asset_out.max(expected_out),
            now,
        )?;

        let market = self.markets.get_mut(&market_id).expect("market exists");
        market.add_exposure(margin_asset, margin_amount);
        market.add_exposure(hold_asset, asset_amount);
        let position_id = market.mint_position(Position {
            id: PositionId(0),
            market_id,
            owner: caller,
            side,
            margin_asset,
            target_asset,
            borrow_asset,
            margin_amount,
            asset_amount,
            borrow_id,
            model,
            entry_price: price,
            take_profit,
            stop_loss,
            opened_at: now,
            updated_at: now,
            state: PositionState::Open,
        });

        self.emit_event(EventPayload::Borrowed(BorrowedEvent {
            asset: borrow_asset,
            model,
            borrow_id,
            amount: borrow_amount,
        }));
        self.emit_event(EventPayload::FeeCollected(FeeCollectedEvent {
            asset: borrow_asset,
            amount: trading_fee,
            kind: FeeKind::Trading,
        }));
        self.emit_event(EventPayload::PositionOpened(PositionOpenedEvent {
            market_id,
            position_id,
            owner: caller,
            side,
            margin_amount,
            borrowed_amount: borrow_amount,
            asset_amount,
            entry_price: price,
        }));

        Ok(OpenPositionReceipt {
            market_id,
            position_id,
            borrow_id,
            asset_amount,
            trading_fee,
            entry_price: price,
        })
    }

    // 12.7: owner-initiated full close. `min_margin_out` is the caller's floor on
    // what comes back; anything below it aborts untouched.
    pub fn close_position(
        &mut self,
        caller: AccountId,
        market_id: MarketId,
        position_id: PositionId,
        min_margin_out: Decimal,
        venue: &mut dyn SwapVenue,
    ) -> Result<CloseReceipt, TradingError> {
        let position = self.open_position_snapshot(market_id, position_id)?;
        if position.owner != caller {
            return Err(MarketError::NotPositionOwner {
                caller,
                owner: position.owner,
            }
            .into());
        }
        self.settle_position(&position, CloseReason::Close, min_margin_out, venue)
    }

    // 12.8: top up margin on a live position. strictly improves the liquidation
    // price; zero amounts and unknown ids are rejected.
    pub fn add_margin(
        &mut self,
        caller: AccountId,
        market_id: MarketId,
        position_id: PositionId,
        amount: Decimal,
    ) -> Result<(), TradingError> {
        let position = self.open_position_snapshot(market_id, position_id)?;
        if amount <= Decimal::ZERO {
            return Err(TradingError::ZeroAmount);
        }
        self.markets
            .get(&market_id)
            .expect("market exists")
            .check_cap(position.margin_asset, amount)?;

        self.ledger
            .transfer(caller, self.authority, position.margin_asset, amount)?;

        let market = self.markets.get_mut(&market_id).expect("market exists");
        market.add_exposure(position.margin_asset, amount);
        let stored = market
            .get_position_mut(position_id)
            .expect("position exists");
        stored.margin_amount += amount;
        stored.updated_at = self.current_time;
        let new_margin_amount = stored.margin_amount;

        self.emit_event(EventPayload::MarginAdded(MarginAddedEvent {
            market_id,
            position_id,
            amount,
            new_margin_amount,
        }));
        Ok(())
    }

    // snapshot of a live position, or the error a caller should see
    pub(super) fn open_position_snapshot(
        &self,
        market_id: MarketId,
        position_id: PositionId,
    ) -> Result<Position, TradingError> {
        let market = self
            .markets
            .get(&market_id)
            .ok_or(MarketError::MarketNotFound(market_id))?;
        let position = market.get_position(position_id)?;
        if !position.is_open() {
            return Err(MarketError::PositionNotOpen(position_id).into());
        }
        Ok(position.clone())
    }

    // 12.9: shared settlement for close, take-profit and stop-loss. longs sell
    // the held target after fees; shorts buy back the exact debt out of held
    // margin plus posted margin. debt is always cleared in full or the call
    // fails before touching anything.
    pub(super) fn settle_position(
        &mut self,
        position: &Position,
        reason: CloseReason,
        min_margin_out: Decimal,
        venue: &mut dyn SwapVenue,
    ) -> Result<CloseReceipt, TradingError> {
        let now = self.current_time;
        let fee_rate = self.fee_rate_for(reason);
        let treasury = self.fees.treasury;

        self.router.poke(position.borrow_asset, position.model, now)?;
        let debt = self.router.debt_of_underlying(
            position.borrow_asset,
            position.model,
            position.borrow_id,
            now,
        )?;

        let (receipt, fee_asset) = match position.side {
            Side::Long => {
                let (swappable, fee) = swappable_after_fee(position.asset_amount, fee_rate);
                let proceeds = venue.quote_exact_input(
                    position.target_asset,
                    position.margin_asset,
                    swappable,
                    now,
                )?;
                let margin_returned = position.margin_amount + proceeds - debt;
                if margin_returned < Decimal::ZERO {
                    return Err(TradingError::InsufficientMargin {
                        shortfall: -margin_returned,
                    });
                }
                if margin_returned < min_margin_out {
                    return Err(TradingError::BelowMinimumReturn {
                        minimum: min_margin_out,
                        actual: margin_returned,
                    });
                }
                let reserves = self
                    .ledger
                    .balance_of(venue.account(), position.margin_asset);
                if proceeds > reserves {
                    return Err(LedgerError::InsufficientBalance {
                        account: venue.account(),
                        asset: position.margin_asset,
                        requested: proceeds,
                        available: reserves,
                    }
                    .into());
                }

                // commit
                let out = venue.swap_exact_input(
                    &mut self.ledger,
                    position.target_asset,
                    position.margin_asset,
                    swappable,
                    self.authority,
                    self.authority,
                    proceeds,
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
                let returned = position.margin_amount + out - settlement.repaid;
                self.ledger
                    .transfer(self.authority, position.owner, position.margin_asset, returned)?;

                (
                    CloseReceipt {
                        position_id: position.id,
                        reason,
                        proceeds: out,
                        fee,
                        debt_repaid: settlement.repaid,
                        margin_returned: returned,
                    },
                    position.target_asset,
                )
            }
            Side::Short => {
                let (held_after_fee, fee) = swappable_after_fee(position.asset_amount, fee_rate);
                let budget = held_after_fee + position.margin_amount;
                let in_needed = venue.quote_exact_output(
                    position.margin_asset,
                    position.target_asset,
                    debt,
                    now,
                )?;
                if in_needed > budget {
                    return Err(TradingError::InsufficientMargin {
                        shortfall: in_needed - budget,
                    });
                }
                let margin_returned = budget - in_needed;
                if margin_returned < min_margin_out {
                    return Err(TradingError::BelowMinimumReturn {
                        minimum: min_margin_out,
                        actual: margin_returned,
                    });
                }
                let reserves = self
                    .ledger
                    .balance_of(venue.account(), position.target_asset);
                if debt > reserves {
                    return Err(LedgerError::InsufficientBalance {
                        account: venue.account(),
                        asset: position.target_asset,
                        requested: debt,
                        available: reserves,
                    }
                    .into());
                }

                // commit
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
                self.ledger
                    .transfer(self.authority, position.owner, position.margin_asset, returned)?;

                (
                    CloseReceipt {
                        position_id: position.id,
                        reason,
                        proceeds: spent,
                        fee,
                        debt_repaid: settlement.repaid,
                        margin_returned: returned,
                    },
                    position.margin_asset,
                )
            }
        };

        self.retire_position(position, reason, now);

        self.emit_event(EventPayload::Repaid(RepaidEvent {
            asset: position.borrow_asset,
            model: position.model,
            borrow_id: position.borrow_id,
            repaid: receipt.debt_repaid,
            remaining_debt: Decimal::ZERO,
        }));
        if receipt.fee > Decimal::ZERO {
            self.emit_event(EventPayload::FeeCollected(FeeCollectedEvent {
                asset: fee_asset,
                amount: receipt.fee,
                kind: match reason {
                    CloseReason::Liquidate => FeeKind::Liquidation,
                    _ => FeeKind::Trading,
                },
            }));
        }
        self.emit_event(EventPayload::PositionClosed(PositionClosedEvent {
            market_id: position.market_id,
            position_id: position.id,
            owner: position.owner,
            reason,
            proceeds: receipt.proceeds,
            debt_repaid: receipt.debt_repaid,
            margin_returned: receipt.margin_returned,
        }));

        Ok(receipt)
    }

    // release exposure and move the stored position to its terminal state
    pub(super) fn retire_position(
        &mut self,
        position: &Position,
        reason: CloseReason,
        now: crate::types::Timestamp,
    ) {
        let market = self
            .markets
            .get_mut(&position.market_id)
            .expect("market exists");
        market.remove_exposure(position.margin_asset, position.margin_amount);
        let hold_asset = match position.side {
            Side::Long => position.target_asset,
            Side::Short => position.margin_asset,
        };
        market.remove_exposure(hold_asset, position.asset_amount);

        let stored = market
            .get_position_mut(position.id)
            .expect("position exists");
        stored.state = match reason {
            CloseReason::Close => PositionState::Closed,
            CloseReason::TakeProfit => PositionState::TakenProfit,
            CloseReason::StopLoss => PositionState::StoppedOut,
            CloseReason::Liquidate => PositionState::Liquidated,
        };
        stored.updated_at = now;
    }

    // 12.10: views

    pub fn debt_of_position(
        &self,
        market_id: MarketId,
        position_id: PositionId,
    ) -> Result<Decimal, TradingError> {
        let market = self
            .markets
            .get(&market_id)
            .ok_or(MarketError::MarketNotFound(market_id))?;
        let position = market.get_position(position_id)?;
        Ok(self.router.debt_of_underlying(
            position.borrow_asset,
            position.model,
            position.borrow_id,
            self.current_time,
        )?)
    }

    pub fn get_liquidation_price(
        &self,
        market_id: MarketId,
        position_id: PositionId,
    ) -> Result<Option<Price>, TradingError> {
        let market = self
            .markets
            .get(&market_id)
            .ok_or(MarketError::MarketNotFound(market_id))?;
        let position = market.get_position(position_id)?;
        if !position.is_open() {
            return Ok(None);
        }
        let debt = self.router.debt_of_underlying(
            position.borrow_asset,
            position.model,
            position.borrow_id,
            self.current_time,
        )?;
        Ok(liquidation_price(
            position.side,
            position.margin_amount,
            debt,
            position.asset_amount,
            market.params.liquidate_loss_threshold,
        ))
    }

    pub fn get_close_position_swappable_after_fee(
        &self,
        market_id: MarketId,
        position_id: PositionId,
        reason: CloseReason,
    ) -> Result<Decimal, TradingError> {
        let market = self
            .markets
            .get(&market_id)
            .ok_or(MarketError::MarketNotFound(market_id))?;
        let position = market.get_position(position_id)?;
        let (swappable, _) = swappable_after_fee(position.asset_amount, self.fee_rate_for(reason));
        Ok(swappable)
    }
}
