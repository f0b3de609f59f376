// 9.0 market.rs: one market per token pair. the market is both the parameter set
// (leverage limit, loss thresholds, exposure caps) and the position registry:
// positions are uniquely owned, transferable tokens minted and retired here.

use crate::position::{Position, PositionState};
use crate::types::{AccountId, AssetId, Leverage, MarketId, PositionId, Ppm, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MarketStatus {
    #[default]
    Active,
    Paused,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketParams {
    pub token0: AssetId,
    pub token1: AssetId,
    // which side of the pair margin is posted in
    pub token0_is_margin: bool,
    pub max_leverage: Leverage,
    // max entry loss (fees + slippage) relative to margin when opening
    pub open_loss_threshold: Ppm,
    // loss ratio at which a position becomes liquidatable
    pub liquidate_loss_threshold: Ppm,
    // slippage allowance granted to liquidation swaps
    pub liquidation_discount: Ppm,
    pub token0_cap: Decimal,
    pub token1_cap: Decimal,
}

impl MarketParams {
    pub fn margin_asset(&self) -> AssetId {
        if self.token0_is_margin {
            self.token0
        } else {
            self.token1
        }
    }

    pub fn target_asset(&self) -> AssetId {
        if self.token0_is_margin {
            self.token1
        } else {
            self.token0
        }
    }

    pub fn validate(&self) -> Result<(), MarketError> {
        if self.token0 == self.token1 {
            return Err(MarketError::InvalidParams {
                reason: "market tokens must differ".to_string(),
            });
        }
        if self.open_loss_threshold.saturated() || self.liquidate_loss_threshold.saturated() {
            return Err(MarketError::InvalidParams {
                reason: "loss thresholds must be below 100%".to_string(),
            });
        }
        if self.open_loss_threshold >= self.liquidate_loss_threshold {
            return Err(MarketError::InvalidParams {
                reason: "open loss threshold must be below liquidation threshold".to_string(),
            });
        }
        if self.liquidation_discount.saturated() {
            return Err(MarketError::InvalidParams {
                reason: "liquidation discount must be below 100%".to_string(),
            });
        }
        if self.token0_cap <= Decimal::ZERO || self.token1_cap <= Decimal::ZERO {
            return Err(MarketError::InvalidParams {
                reason: "exposure caps must be positive".to_string(),
            });
        }
        Ok(())
    }

    fn cap_for(&self, asset: AssetId) -> Decimal {
        if asset == self.token0 {
            self.token0_cap
        } else {
            self.token1_cap
        }
    }
}

#[derive(Debug)]
pub struct Market {
    pub id: MarketId,
    pub params: MarketParams,
    pub status: MarketStatus,
    positions: HashMap<PositionId, Position>,
    next_position_id: u64,
    // engine-held exposure per pair side, checked against the caps
    held_token0: Decimal,
    held_token1: Decimal,
    pub created_at: Timestamp,
}

impl Market {
    pub fn new(id: MarketId, params: MarketParams, now: Timestamp) -> Self {
        Self {
            id,
            params,
            status: MarketStatus::Active,
            positions: HashMap::new(),
            next_position_id: 0,
            held_token0: Decimal::ZERO,
            held_token1: Decimal::ZERO,
            created_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == MarketStatus::Active
    }

    pub fn pause(&mut self) {
        self.status = MarketStatus::Paused;
    }

    pub fn resume(&mut self) {
        self.status = MarketStatus::Active;
    }

    pub fn held(&self, asset: AssetId) -> Decimal {
        if asset == self.params.token0 {
            self.held_token0
        } else {
            self.held_token1
        }
    }

    // cap check for exposure the engine is about to take on
    pub fn check_cap(&self, asset: AssetId, additional: Decimal) -> Result<(), MarketError> {
        let cap = self.params.cap_for(asset);
        if self.held(asset) + additional > cap {
            return Err(MarketError::ExceedsMarketCap {
                asset,
                requested: additional,
                cap,
            });
        }
        Ok(())
    }

    pub fn add_exposure(&mut self, asset: AssetId, amount: Decimal) {
        if asset == self.params.token0 {
            self.held_token0 += amount;
        } else {
            self.held_token1 += amount;
        }
    }

    pub fn remove_exposure(&mut self, asset: AssetId, amount: Decimal) {
        if asset == self.params.token0 {
            self.held_token0 = (self.held_token0 - amount).max(Decimal::ZERO);
        } else {
            self.held_token1 = (self.held_token1 - amount).max(Decimal::ZERO);
        }
    }

    // 9.1: position registry. mint assigns the next id and records ownership.
    pub fn mint_position(&mut self, mut position: Position) -> PositionId {
        self.next_position_id += 1;
        let id = PositionId(self.next_position_id);
        position.id = id;
        self.positions.insert(id, position);
        id
    }

    pub fn get_position(&self, id: PositionId) -> Result<&Position, MarketError> {
        self.positions
            .get(&id)
            .ok_or(MarketError::PositionNotFound(id))
    }

    pub fn get_position_mut(&mut self, id: PositionId) -> Result<&mut Position, MarketError> {
        self.positions
            .get_mut(&id)
            .ok_or(MarketError::PositionNotFound(id))
    }

    pub fn owner_of(&self, id: PositionId) -> Result<AccountId, MarketError> {
        Ok(self.get_position(id)?.owner)
    }

    pub fn positions_of(&self, owner: AccountId) -> impl Iterator<Item = &Position> {
        self.positions.values().filter(move |p| p.owner == owner)
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values().filter(|p| p.is_open())
    }

    // transfer of the position token; only the current owner may move it and
    // only while the position is live
    pub fn transfer_position(
        &mut self,
        caller: AccountId,
        id: PositionId,
        to: AccountId,
    ) -> Result<(), MarketError> {
        let position = self
            .positions
            .get_mut(&id)
            .ok_or(MarketError::PositionNotFound(id))?;
        if position.owner != caller {
            return Err(MarketError::NotPositionOwner {
                caller,
                owner: position.owner,
            });
        }
        if position.state != PositionState::Open {
            return Err(MarketError::PositionNotOpen(id));
        }
        position.owner = to;
        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MarketError {
    #[error("Market {0:?} is paused")]
    MarketPaused(MarketId),

    #[error("Market {0:?} not found")]
    MarketNotFound(MarketId),

    #[error("Position {0:?} not found")]
    PositionNotFound(PositionId),

    #[error("Position {0:?} is not open")]
    PositionNotOpen(PositionId),

    #[error("Caller {caller:?} does not own the position (owner {owner:?})")]
    NotPositionOwner { caller: AccountId, owner: AccountId },

    #[error("Exposure of {requested} in asset {asset:?} exceeds market cap {cap}")]
    ExceedsMarketCap {
        asset: AssetId,
        requested: Decimal,
        cap: Decimal,
    },

    #[error("Invalid market params: {reason}")]
    InvalidParams { reason: String },
}
