// 5.0 router.rs: owns one lending pool per (asset, model kind) and brokers every
// pool call. admin surface is owner-only; borrow paths are restricted to the
// registered trading core; supply can be gated by an operator whitelist.

use crate::ledger::{LedgerError, TokenLedger};
use crate::pool::{LendingPool, PoolError, PoolParams, RepaySettlement, SupplyReceipt};
use crate::rate_model::InterestRateModel;
use crate::types::{AccountId, AssetId, BorrowId, ModelKind, Ppm, Timestamp};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy)]
pub struct RouterFeeConfig {
    pub treasury: AccountId,
    // cut of accrued interest forwarded to the treasury
    pub borrow_fee: Ppm,
}

#[derive(Debug)]
pub struct Router {
    owner: AccountId,
    // hard ceiling on the configurable borrow fee, fixed at construction
    fee_cap: Ppm,
    fee_config: RouterFeeConfig,
    trading_core: Option<AccountId>,
    models: HashMap<ModelKind, Box<dyn InterestRateModel>>,
    whitelist: HashSet<AccountId>,
    whitelist_enabled: bool,
    paused: bool,
    pools: HashMap<(AssetId, ModelKind), LendingPool>,
}

impl Router {
    pub fn new(owner: AccountId, fee_cap: Ppm) -> Self {
        Self {
            owner,
            fee_cap,
            fee_config: RouterFeeConfig {
                treasury: owner,
                borrow_fee: Ppm::new(0),
            },
            trading_core: None,
            models: HashMap::new(),
            whitelist: HashSet::new(),
            whitelist_enabled: false,
            paused: false,
            pools: HashMap::new(),
        }
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn fee_cap(&self) -> Ppm {
        self.fee_cap
    }

    pub fn fee_config(&self) -> RouterFeeConfig {
        self.fee_config
    }

    pub fn trading_core(&self) -> Option<AccountId> {
        self.trading_core
    }

    pub fn is_all_pools_paused(&self) -> bool {
        self.paused
    }

    pub fn whitelisted_operator(&self, account: AccountId) -> bool {
        self.whitelist.contains(&account)
    }

    fn require_owner(&self, caller: AccountId) -> Result<(), RouterError> {
        if caller != self.owner {
            return Err(RouterError::NotOwner(caller));
        }
        Ok(())
    }

    fn require_trading_core(&self, caller: AccountId) -> Result<(), RouterError> {
        if self.trading_core != Some(caller) {
            return Err(RouterError::CallerIsNotTradingCore(caller));
        }
        Ok(())
    }

    fn require_not_paused(&self) -> Result<(), RouterError> {
        if self.paused {
            return Err(RouterError::Paused);
        }
        Ok(())
    }

    // 5.1: owner-only administration

    pub fn pause(&mut self, caller: AccountId) -> Result<(), RouterError> {
        self.require_owner(caller)?;
        self.paused = true;
        Ok(())
    }

    pub fn unpause(&mut self, caller: AccountId) -> Result<(), RouterError> {
        self.require_owner(caller)?;
        self.paused = false;
        Ok(())
    }

    pub fn set_fee_config(
        &mut self,
        caller: AccountId,
        treasury: AccountId,
        borrow_fee: Ppm,
    ) -> Result<(), RouterError> {
        self.require_owner(caller)?;
        if borrow_fee > self.fee_cap {
            return Err(RouterError::ExceedsFeeCap {
                requested: borrow_fee,
                cap: self.fee_cap,
            });
        }
        self.fee_config = RouterFeeConfig {
            treasury,
            borrow_fee,
        };
        Ok(())
    }

    pub fn set_interest_rate_model(
        &mut self,
        caller: AccountId,
        kind: ModelKind,
        model: Box<dyn InterestRateModel>,
    ) -> Result<(), RouterError> {
        self.require_owner(caller)?;
        self.models.insert(kind, model);
        Ok(())
    }

    pub fn set_trading_core(
        &mut self,
        caller: AccountId,
        trading_core: AccountId,
    ) -> Result<(), RouterError> {
        self.require_owner(caller)?;
        self.trading_core = Some(trading_core);
        Ok(())
    }

    pub fn set_whitelisted_operator(
        &mut self,
        caller: AccountId,
        accounts: &[AccountId],
        enabled: &[bool],
    ) -> Result<(), RouterError> {
        self.require_owner(caller)?;
        if accounts.len() != enabled.len() {
            return Err(RouterError::LengthMismatch);
        }
        for (account, on) in accounts.iter().zip(enabled) {
            if *on {
                self.whitelist.insert(*account);
            } else {
                self.whitelist.remove(account);
            }
        }
        Ok(())
    }

    pub fn set_enable_whitelist(
        &mut self,
        caller: AccountId,
        enabled: bool,
    ) -> Result<(), RouterError> {
        self.require_owner(caller)?;
        self.whitelist_enabled = enabled;
        Ok(())
    }

    // 5.2: pool creation, once per (asset, model kind)
    pub fn create_lending_pool(
        &mut self,
        caller: AccountId,
        ledger: &mut TokenLedger,
        asset: AssetId,
        kind: ModelKind,
        supply_cap: Decimal,
        borrow_cap: Decimal,
        reserve_ratio: Ppm,
        now: Timestamp,
    ) -> Result<(), RouterError> {
        self.require_owner(caller)?;
        if !self.models.contains_key(&kind) {
            return Err(RouterError::UnknownModel(kind));
        }
        if self.pools.contains_key(&(asset, kind)) {
            return Err(RouterError::PoolAlreadyExists { asset, kind });
        }
        let params = PoolParams {
            supply_cap,
            borrow_cap,
            reserve_ratio,
        };
        params.validate()?;

        let vault = ledger.create_account();
        self.pools
            .insert((asset, kind), LendingPool::new(asset, vault, params, now));
        Ok(())
    }

    pub fn get_lending_pool(&self, asset: AssetId, kind: ModelKind) -> Option<&LendingPool> {
        self.pools.get(&(asset, kind))
    }

    fn pool_mut(
        &mut self,
        asset: AssetId,
        kind: ModelKind,
    ) -> Result<&mut LendingPool, RouterError> {
        self.pools
            .get_mut(&(asset, kind))
            .ok_or(RouterError::PoolNotFound { asset, kind })
    }

    fn pool(&self, asset: AssetId, kind: ModelKind) -> Result<&LendingPool, RouterError> {
        self.pools
            .get(&(asset, kind))
            .ok_or(RouterError::PoolNotFound { asset, kind })
    }

    // accrue a pool up to `now`. harmless to call before validation: accrual only
    // realizes elapsed time, it is not part of any operation's atomicity.
    pub fn poke(
        &mut self,
        asset: AssetId,
        kind: ModelKind,
        now: Timestamp,
    ) -> Result<(), RouterError> {
        let borrow_fee = self.fee_config.borrow_fee;
        let model = self
            .models
            .get(&kind)
            .ok_or(RouterError::UnknownModel(kind))?;
        // split borrows: look up the model, then the pool
        let pool = self
            .pools
            .get_mut(&(asset, kind))
            .ok_or(RouterError::PoolNotFound { asset, kind })?;
        pool.accrue(model.as_ref(), borrow_fee, now);
        Ok(())
    }

    // 5.3: user flows

    pub fn supply(
        &mut self,
        ledger: &mut TokenLedger,
        caller: AccountId,
        asset: AssetId,
        kind: ModelKind,
        receiver: AccountId,
        amount: Decimal,
        now: Timestamp,
    ) -> Result<SupplyReceipt, RouterError> {
        self.require_not_paused()?;
        if self.whitelist_enabled && !self.whitelist.contains(&caller) {
            return Err(RouterError::NotInWhitelist(caller));
        }
        self.poke(asset, kind, now)?;
        let pool = self.pool_mut(asset, kind)?;
        Ok(pool.supply(ledger, caller, receiver, amount)?)
    }

    pub fn withdraw(
        &mut self,
        ledger: &mut TokenLedger,
        caller: AccountId,
        asset: AssetId,
        kind: ModelKind,
        receiver: AccountId,
        shares: Decimal,
        now: Timestamp,
    ) -> Result<Decimal, RouterError> {
        self.require_not_paused()?;
        self.poke(asset, kind, now)?;
        let pool = self.pool_mut(asset, kind)?;
        Ok(pool.withdraw(ledger, caller, receiver, shares)?)
    }

    // 5.4: trading-core flows

    // pure capacity check after accrual; lets the engine validate a borrow before
    // committing any state
    pub fn can_borrow(
        &self,
        asset: AssetId,
        kind: ModelKind,
        amount: Decimal,
    ) -> Result<(), RouterError> {
        Ok(self.pool(asset, kind)?.can_borrow(amount)?)
    }

    pub fn commit_borrow(
        &mut self,
        ledger: &mut TokenLedger,
        caller: AccountId,
        asset: AssetId,
        kind: ModelKind,
        amount: Decimal,
        now: Timestamp,
    ) -> Result<BorrowId, RouterError> {
        self.require_not_paused()?;
        self.require_trading_core(caller)?;
        self.poke(asset, kind, now)?;
        let pool = self.pool_mut(asset, kind)?;
        Ok(pool.commit_borrow(ledger, caller, amount)?)
    }

    // commit-and-transfer in one step; identical restrictions
    pub fn borrow(
        &mut self,
        ledger: &mut TokenLedger,
        caller: AccountId,
        asset: AssetId,
        kind: ModelKind,
        amount: Decimal,
        now: Timestamp,
    ) -> Result<BorrowId, RouterError> {
        self.commit_borrow(ledger, caller, asset, kind, amount, now)
    }

    pub fn repay(
        &mut self,
        ledger: &mut TokenLedger,
        caller: AccountId,
        asset: AssetId,
        kind: ModelKind,
        borrow_id: BorrowId,
        amount: Decimal,
        now: Timestamp,
    ) -> Result<RepaySettlement, RouterError> {
        self.require_trading_core(caller)?;
        self.poke(asset, kind, now)?;
        let treasury = self.fee_config.treasury;
        let pool = self.pool_mut(asset, kind)?;
        Ok(pool.repay(ledger, caller, treasury, borrow_id, amount)?)
    }

    pub fn write_off(
        &mut self,
        caller: AccountId,
        asset: AssetId,
        kind: ModelKind,
        borrow_id: BorrowId,
        amount: Decimal,
        now: Timestamp,
    ) -> Result<Decimal, RouterError> {
        self.require_trading_core(caller)?;
        self.poke(asset, kind, now)?;
        let pool = self.pool_mut(asset, kind)?;
        Ok(pool.write_off(borrow_id, amount)?)
    }

    // 5.5: views

    pub fn balance_of(
        &self,
        asset: AssetId,
        kind: ModelKind,
        account: AccountId,
    ) -> Result<Decimal, RouterError> {
        Ok(self.pool(asset, kind)?.balance_of(account))
    }

    pub fn balance_of_underlying(
        &self,
        asset: AssetId,
        kind: ModelKind,
        account: AccountId,
    ) -> Result<Decimal, RouterError> {
        Ok(self.pool(asset, kind)?.balance_of_underlying(account))
    }

    pub fn debt_of(
        &self,
        asset: AssetId,
        kind: ModelKind,
        borrow_id: BorrowId,
    ) -> Result<Decimal, RouterError> {
        Ok(self.pool(asset, kind)?.debt_of(borrow_id))
    }

    // debt projected to `now` without mutating pool state
    pub fn debt_of_underlying(
        &self,
        asset: AssetId,
        kind: ModelKind,
        borrow_id: BorrowId,
        now: Timestamp,
    ) -> Result<Decimal, RouterError> {
        let model = self
            .models
            .get(&kind)
            .ok_or(RouterError::UnknownModel(kind))?;
        Ok(self
            .pool(asset, kind)?
            .debt_of_underlying_at(model.as_ref(), borrow_id, now))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RouterError {
    #[error("Caller {0:?} is not the owner")]
    NotOwner(AccountId),

    #[error("Caller {0:?} is not the trading core")]
    CallerIsNotTradingCore(AccountId),

    #[error("Caller {0:?} is not in the whitelist")]
    NotInWhitelist(AccountId),

    #[error("Borrow fee {requested} exceeds cap {cap}")]
    ExceedsFeeCap { requested: Ppm, cap: Ppm },

    #[error("No pool for asset {asset:?} with model {kind:?}")]
    PoolNotFound { asset: AssetId, kind: ModelKind },

    #[error("Pool for asset {asset:?} with model {kind:?} already exists")]
    PoolAlreadyExists { asset: AssetId, kind: ModelKind },

    #[error("No interest rate model registered for {0:?}")]
    UnknownModel(ModelKind),

    #[error("All pools are paused")]
    Paused,

    #[error("Account and flag arrays differ in length")]
    LengthMismatch,

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
