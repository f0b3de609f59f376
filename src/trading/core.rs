// 12.2 trading/core.rs: main engine. owns the ledger, the router, every market
// and the event log. all mutation enters through here so operations stay
// serially ordered and all-or-nothing.

use super::results::TradingError;
use crate::config::{EngineConfig, FeeConfig};
use crate::events::{
    Event, EventId, EventPayload, LendingPoolCreatedEvent, SuppliedEvent, WithdrawnEvent,
};
use crate::ledger::TokenLedger;
use crate::market::{Market, MarketError, MarketParams};
use crate::pool::SupplyReceipt;
use crate::router::Router;
use crate::types::{AccountId, AssetId, MarketId, ModelKind, PositionId, Ppm, Timestamp};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

#[derive(Debug)]
pub struct TradingCore {
    pub(super) config: EngineConfig,
    pub(super) fees: FeeConfig,
    pub(super) ledger: TokenLedger,
    pub(super) router: Router,
    pub(super) markets: HashMap<MarketId, Market>,
    pub(super) owner: AccountId,
    // the engine's own ledger identity: holds margin and position assets, and is
    // the account the router recognizes as its trading core
    pub(super) authority: AccountId,
    pub(super) operators: HashSet<AccountId>,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) next_market_id: u32,
    pub(super) current_time: Timestamp,
}

impl TradingCore {
    pub fn new(config: EngineConfig) -> Self {
        let mut ledger = TokenLedger::new();
        let owner = ledger.create_account();
        let authority = ledger.create_account();

        let mut router = Router::new(owner, config.fee_cap);
        router
            .set_trading_core(owner, authority)
            .expect("fresh router accepts its owner");

        Self {
            fees: FeeConfig::new(owner, Ppm::new(0), Ppm::new(0)),
            config,
            ledger,
            router,
            markets: HashMap::new(),
            owner,
            authority,
            operators: HashSet::new(),
            events: Vec::new(),
            next_event_id: 1,
            next_market_id: 0,
            current_time: Timestamp::from_millis(0),
        }
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn authority(&self) -> AccountId {
        self.authority
    }

    pub fn fees(&self) -> FeeConfig {
        self.fees
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis() + millis);
    }

    pub fn advance_secs(&mut self, secs: i64) {
        self.advance_time(secs * 1000);
    }

    // account/asset plumbing

    pub fn create_account(&mut self) -> AccountId {
        self.ledger.create_account()
    }

    pub fn register_asset(&mut self, symbol: &str, decimals: u32) -> AssetId {
        self.ledger.register_asset(symbol, decimals)
    }

    // genesis/test funding
    pub fn fund(&mut self, account: AccountId, asset: AssetId, amount: Decimal) {
        self.ledger.mint(account, asset, amount);
    }

    pub fn balance_of(&self, account: AccountId, asset: AssetId) -> Decimal {
        self.ledger.balance_of(account, asset)
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    // router admin that does not touch the ledger goes straight through here
    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    // 12.3: engine administration, owner-only

    pub(super) fn require_owner(&self, caller: AccountId) -> Result<(), TradingError> {
        if caller != self.owner {
            return Err(TradingError::NotOwner(caller));
        }
        Ok(())
    }

    pub(super) fn require_operator(&self, caller: AccountId) -> Result<(), TradingError> {
        if !self.operators.contains(&caller) {
            return Err(TradingError::NotOperator(caller));
        }
        Ok(())
    }

    pub fn set_fee_config(&mut self, caller: AccountId, fees: FeeConfig) -> Result<(), TradingError> {
        self.require_owner(caller)?;
        self.config.validate_fees(&fees)?;
        self.fees = fees;
        Ok(())
    }

    pub fn set_whitelisted_operator(
        &mut self,
        caller: AccountId,
        accounts: &[AccountId],
        enabled: &[bool],
    ) -> Result<(), TradingError> {
        self.require_owner(caller)?;
        for (account, on) in accounts.iter().zip(enabled) {
            if *on {
                self.operators.insert(*account);
            } else {
                self.operators.remove(account);
            }
        }
        Ok(())
    }

    pub fn whitelisted_operator(&self, account: AccountId) -> bool {
        self.operators.contains(&account)
    }

    pub fn create_market(
        &mut self,
        caller: AccountId,
        params: MarketParams,
    ) -> Result<MarketId, TradingError> {
        self.require_owner(caller)?;
        params.validate()?;

        self.next_market_id += 1;
        let id = MarketId(self.next_market_id);
        self.markets
            .insert(id, Market::new(id, params.clone(), self.current_time));

        self.emit_event(EventPayload::MarketCreated(crate::events::MarketCreatedEvent {
            market_id: id,
            token0: params.token0,
            token1: params.token1,
            token0_is_margin: params.token0_is_margin,
        }));
        Ok(id)
    }

    pub fn get_market(&self, market_id: MarketId) -> Option<&Market> {
        self.markets.get(&market_id)
    }

    pub fn pause_market(&mut self, caller: AccountId, market_id: MarketId) -> Result<(), TradingError> {
        self.require_owner(caller)?;
        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(MarketError::MarketNotFound(market_id))?;
        market.pause();
        self.emit_event(EventPayload::MarketPaused(market_id));
        Ok(())
    }

    pub fn resume_market(&mut self, caller: AccountId, market_id: MarketId) -> Result<(), TradingError> {
        self.require_owner(caller)?;
        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(MarketError::MarketNotFound(market_id))?;
        market.resume();
        self.emit_event(EventPayload::MarketResumed(market_id));
        Ok(())
    }

    pub fn transfer_position(
        &mut self,
        caller: AccountId,
        market_id: MarketId,
        position_id: PositionId,
        to: AccountId,
    ) -> Result<(), TradingError> {
        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(MarketError::MarketNotFound(market_id))?;
        market.transfer_position(caller, position_id, to)?;
        Ok(())
    }

    // 12.4: lending passthroughs. the engine is the single mutation entry point,
    // so supply/withdraw route through it and land in the event log.

    pub fn create_lending_pool(
        &mut self,
        caller: AccountId,
        asset: AssetId,
        kind: ModelKind,
        supply_cap: Decimal,
        borrow_cap: Decimal,
        reserve_ratio: Ppm,
    ) -> Result<(), TradingError> {
        let now = self.current_time;
        self.router.create_lending_pool(
            caller,
            &mut self.ledger,
            asset,
            kind,
            supply_cap,
            borrow_cap,
            reserve_ratio,
            now,
        )?;
        self.emit_event(EventPayload::LendingPoolCreated(LendingPoolCreatedEvent {
            asset,
            model: kind,
            supply_cap,
            borrow_cap,
        }));
        Ok(())
    }

    pub fn supply(
        &mut self,
        caller: AccountId,
        asset: AssetId,
        kind: ModelKind,
        receiver: AccountId,
        amount: Decimal,
    ) -> Result<SupplyReceipt, TradingError> {
        let now = self.current_time;
        let receipt = self
            .router
            .supply(&mut self.ledger, caller, asset, kind, receiver, amount, now)?;
        self.emit_event(EventPayload::Supplied(SuppliedEvent {
            supplier: caller,
            receiver,
            asset,
            model: kind,
            amount: receipt.accepted,
            shares_minted: receipt.shares_minted,
        }));
        Ok(receipt)
    }

    pub fn withdraw(
        &mut self,
        caller: AccountId,
        asset: AssetId,
        kind: ModelKind,
        receiver: AccountId,
        shares: Decimal,
    ) -> Result<Decimal, TradingError> {
        let now = self.current_time;
        let amount = self
            .router
            .withdraw(&mut self.ledger, caller, asset, kind, receiver, shares, now)?;
        self.emit_event(EventPayload::Withdrawn(WithdrawnEvent {
            supplier: caller,
            receiver,
            asset,
            model: kind,
            amount,
        }));
        Ok(amount)
    }

    // event log

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        if self.config.verbose {
            println!("[Event {}] {:?}", event.id.0, event.payload);
        }

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
