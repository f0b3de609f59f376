// 12.1: result types and errors for engine operations.

use crate::config::ConfigError;
use crate::ledger::LedgerError;
use crate::market::MarketError;
use crate::oracle::OracleError;
use crate::position::CloseReason;
use crate::router::RouterError;
use crate::swap::SwapError;
use crate::types::{AccountId, AssetId, BorrowId, MarketId, PositionId, Price};
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct OpenPositionReceipt {
    pub market_id: MarketId,
    pub position_id: PositionId,
    pub borrow_id: BorrowId,
    pub asset_amount: Decimal,
    pub trading_fee: Decimal,
    pub entry_price: Price,
}

#[derive(Debug, Clone)]
pub struct CloseReceipt {
    pub position_id: PositionId,
    pub reason: CloseReason,
    // margin-asset value realized from unwinding the held asset
    pub proceeds: Decimal,
    pub fee: Decimal,
    pub debt_repaid: Decimal,
    pub margin_returned: Decimal,
}

// how a liquidation settles, decided by the trial estimate and re-validated on
// commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiquidationPlan {
    // proceeds net of fee plus margin repay the debt in full
    Covered,
    // only by consuming the liquidation fee does the debt clear
    CoveredByFee,
    // even everything is not enough; the pool absorbs the shortfall
    BadDebt,
}

#[derive(Debug, Clone)]
pub struct LiquidationEstimate {
    pub plan: LiquidationPlan,
    pub debt: Decimal,
    pub price: Price,
    pub fee_to_treasury: Decimal,
    // asset the treasury fee is denominated in
    pub fee_asset: AssetId,
    pub margin_returned: Decimal,
    pub bad_debt: Decimal,
}

#[derive(Debug, Clone)]
pub struct LiquidationReceipt {
    pub position_id: PositionId,
    pub price: Price,
    pub debt_repaid: Decimal,
    pub fee_to_treasury: Decimal,
    pub bad_debt: Decimal,
    pub margin_returned: Decimal,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TradingError {
    #[error("Caller {0:?} is not the owner")]
    NotOwner(AccountId),

    #[error("Caller {0:?} is not a whitelisted operator")]
    NotOperator(AccountId),

    #[error("Asset {0:?} is not part of the market pair")]
    InvalidAsset(AssetId),

    #[error("Zero amount not allowed")]
    ZeroAmount,

    #[error("Leverage {requested} exceeds market maximum {max}")]
    LeverageExceeded { requested: Decimal, max: Decimal },

    #[error("Entry loss {loss} exceeds allowed {limit}")]
    OpenLossTooHigh { loss: Decimal, limit: Decimal },

    #[error("Proceeds leave margin short by {shortfall}")]
    InsufficientMargin { shortfall: Decimal },

    #[error("Return {actual} below caller minimum {minimum}")]
    BelowMinimumReturn { minimum: Decimal, actual: Decimal },

    #[error("Close condition not met")]
    ConditionNotMet,

    #[error("Market error: {0}")]
    Market(#[from] MarketError),

    #[error("Router error: {0}")]
    Router(#[from] RouterError),

    #[error("Swap error: {0}")]
    Swap(#[from] SwapError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
