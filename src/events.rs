// 10.0: every state change produces an event. used for audit trails, state
// reconstruction, and notifying external systems. the EventPayload enum lists
// all event types.

use crate::position::CloseReason;
use crate::types::{
    AccountId, AssetId, BorrowId, MarketId, ModelKind, PositionId, Price, Side, Timestamp,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // lending events
    LendingPoolCreated(LendingPoolCreatedEvent),
    Supplied(SuppliedEvent),
    Withdrawn(WithdrawnEvent),
    Borrowed(BorrowedEvent),
    Repaid(RepaidEvent),
    BadDebt(BadDebtEvent),

    // market events
    MarketCreated(MarketCreatedEvent),
    MarketPaused(MarketId),
    MarketResumed(MarketId),

    // position events
    PositionOpened(PositionOpenedEvent),
    PositionClosed(PositionClosedEvent),
    MarginAdded(MarginAddedEvent),
    Liquidated(LiquidatedEvent),

    // fee events
    FeeCollected(FeeCollectedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LendingPoolCreatedEvent {
    pub asset: AssetId,
    pub model: ModelKind,
    pub supply_cap: Decimal,
    pub borrow_cap: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppliedEvent {
    pub supplier: AccountId,
    pub receiver: AccountId,
    pub asset: AssetId,
    pub model: ModelKind,
    pub amount: Decimal,
    pub shares_minted: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawnEvent {
    pub supplier: AccountId,
    pub receiver: AccountId,
    pub asset: AssetId,
    pub model: ModelKind,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowedEvent {
    pub asset: AssetId,
    pub model: ModelKind,
    pub borrow_id: BorrowId,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepaidEvent {
    pub asset: AssetId,
    pub model: ModelKind,
    pub borrow_id: BorrowId,
    pub repaid: Decimal,
    pub remaining_debt: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadDebtEvent {
    pub market_id: MarketId,
    pub position_id: PositionId,
    pub asset: AssetId,
    pub written_off: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketCreatedEvent {
    pub market_id: MarketId,
    pub token0: AssetId,
    pub token1: AssetId,
    pub token0_is_margin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionOpenedEvent {
    pub market_id: MarketId,
    pub position_id: PositionId,
    pub owner: AccountId,
    pub side: Side,
    pub margin_amount: Decimal,
    pub borrowed_amount: Decimal,
    pub asset_amount: Decimal,
    pub entry_price: Price,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionClosedEvent {
    pub market_id: MarketId,
    pub position_id: PositionId,
    pub owner: AccountId,
    pub reason: CloseReason,
    pub proceeds: Decimal,
    pub debt_repaid: Decimal,
    pub margin_returned: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginAddedEvent {
    pub market_id: MarketId,
    pub position_id: PositionId,
    pub amount: Decimal,
    pub new_margin_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidatedEvent {
    pub market_id: MarketId,
    pub position_id: PositionId,
    pub operator: AccountId,
    pub price: Price,
    pub debt_repaid: Decimal,
    pub fee_to_treasury: Decimal,
    pub bad_debt: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeKind {
    Trading,
    Liquidation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeCollectedEvent {
    pub asset: AssetId,
    pub amount: Decimal,
    pub kind: FeeKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn event_construction() {
        let event = Event::new(
            EventId(1),
            Timestamp::from_millis(1000),
            EventPayload::Supplied(SuppliedEvent {
                supplier: AccountId(1),
                receiver: AccountId(1),
                asset: AssetId(1),
                model: ModelKind(2),
                amount: dec!(1000),
                shares_minted: dec!(1000) * crate::types::share_scale(),
            }),
        );

        assert_eq!(event.id, EventId(1));
        assert!(matches!(event.payload, EventPayload::Supplied(_)));
    }

    #[test]
    fn events_serialize() {
        let event = Event::new(
            EventId(2),
            Timestamp::from_millis(0),
            EventPayload::Liquidated(LiquidatedEvent {
                market_id: MarketId(1),
                position_id: PositionId(9),
                operator: AccountId(3),
                price: Price::new_unchecked(dec!(2290)),
                debt_repaid: dec!(6000),
                fee_to_treasury: dec!(0.024),
                bad_debt: dec!(0),
            }),
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("Liquidated"));
    }
}
