// 4.0 pool.rs: per-asset lending pool. suppliers hold shares, borrowers hold debt
// shares, interest accrues lazily through a borrow index. a pool never talks to
// callers directly; the router owns it and brokers every call.
//
// invariant on every mutation:
//   total_borrowed <= min(borrow_cap, supplied * (1 - reserve_ratio))

use crate::ledger::{LedgerError, TokenLedger};
use crate::rate_model::InterestRateModel;
use crate::types::{share_scale, AccountId, AssetId, BorrowId, Ppm, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolParams {
    pub supply_cap: Decimal,
    pub borrow_cap: Decimal,
    // minimum fraction of supplied liquidity that must stay unborrowed
    pub reserve_ratio: Ppm,
}

impl PoolParams {
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.supply_cap <= Decimal::ZERO || self.borrow_cap <= Decimal::ZERO {
            return Err(PoolError::InvalidParams {
                reason: "caps must be positive".to_string(),
            });
        }
        if self.borrow_cap > self.supply_cap {
            return Err(PoolError::InvalidParams {
                reason: "borrow cap above supply cap".to_string(),
            });
        }
        if self.reserve_ratio.saturated() {
            return Err(PoolError::InvalidParams {
                reason: "reserve ratio must be below 100%".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SupplyReceipt {
    // the amount actually taken; requests beyond the supply cap are clamped
    pub accepted: Decimal,
    pub shares_minted: Decimal,
}

#[derive(Debug, Clone, Copy)]
pub struct RepaySettlement {
    pub repaid: Decimal,
    pub remaining_debt: Decimal,
    // borrow-fee cut forwarded to the treasury with this repayment
    pub fees_released: Decimal,
}

#[derive(Debug)]
pub struct LendingPool {
    pub asset: AssetId,
    // ledger account holding the pool's cash
    pub vault: AccountId,
    pub params: PoolParams,
    total_shares: Decimal,
    shares: HashMap<AccountId, Decimal>,
    cash: Decimal,
    // outstanding principal plus accrued interest across all borrows
    total_borrowed: Decimal,
    // accrued interest cut owed to the fee treasury, paid out on repayment
    reserved_fees: Decimal,
    borrow_index: Decimal,
    last_accrual: Timestamp,
    borrows: HashMap<BorrowId, Decimal>,
    next_borrow_id: u64,
}

impl LendingPool {
    pub fn new(asset: AssetId, vault: AccountId, params: PoolParams, now: Timestamp) -> Self {
        Self {
            asset,
            vault,
            params,
            total_shares: Decimal::ZERO,
            shares: HashMap::new(),
            cash: Decimal::ZERO,
            total_borrowed: Decimal::ZERO,
            reserved_fees: Decimal::ZERO,
            borrow_index: Decimal::ONE,
            last_accrual: now,
            borrows: HashMap::new(),
            next_borrow_id: 0,
        }
    }

    // underlying value belonging to suppliers
    pub fn supplied(&self) -> Decimal {
        self.cash + self.total_borrowed - self.reserved_fees
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn total_borrowed(&self) -> Decimal {
        self.total_borrowed
    }

    pub fn reserved_fees(&self) -> Decimal {
        self.reserved_fees
    }

    pub fn borrow_index(&self) -> Decimal {
        self.borrow_index
    }

    pub fn utilization(&self) -> Decimal {
        let supplied = self.supplied();
        if supplied <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.total_borrowed / supplied
    }

    // 4.1: lazy linear accrual. interest grows debt and the borrow index; the
    // borrow-fee cut is reserved for the treasury, the rest goes to suppliers
    // through the share exchange rate.
    pub fn accrue(&mut self, model: &dyn InterestRateModel, borrow_fee: Ppm, now: Timestamp) {
        if now <= self.last_accrual {
            return;
        }
        let elapsed = self.last_accrual.elapsed_secs(&now);
        self.last_accrual = now;

        if self.total_borrowed.is_zero() {
            return;
        }

        let rate = model.rate_per_second(self.utilization());
        let growth = rate * elapsed;
        let interest = self.total_borrowed * growth;

        self.total_borrowed += interest;
        self.reserved_fees += borrow_fee.apply(interest);
        self.borrow_index *= Decimal::ONE + growth;
    }

    // index the pool would have after accruing at `now`, without mutating. views
    // use this so reads reflect elapsed time.
    pub fn projected_borrow_index(
        &self,
        model: &dyn InterestRateModel,
        now: Timestamp,
    ) -> Decimal {
        if now <= self.last_accrual || self.total_borrowed.is_zero() {
            return self.borrow_index;
        }
        let elapsed = self.last_accrual.elapsed_secs(&now);
        let rate = model.rate_per_second(self.utilization());
        self.borrow_index * (Decimal::ONE + rate * elapsed)
    }

    // 4.2: supply. an amount beyond the remaining cap headroom is clamped, not
    // rejected. first supply mints amount * 1e18 raw shares.
    pub fn supply(
        &mut self,
        ledger: &mut TokenLedger,
        supplier: AccountId,
        receiver: AccountId,
        amount: Decimal,
    ) -> Result<SupplyReceipt, PoolError> {
        if amount < Decimal::ZERO {
            return Err(PoolError::ZeroAmount);
        }
        let headroom = (self.params.supply_cap - self.supplied()).max(Decimal::ZERO);
        let accepted = amount.min(headroom);
        if accepted.is_zero() {
            return Ok(SupplyReceipt {
                accepted: Decimal::ZERO,
                shares_minted: Decimal::ZERO,
            });
        }

        let supplied = self.supplied();
        let minted = if self.total_shares.is_zero() || supplied <= Decimal::ZERO {
            accepted * share_scale()
        } else {
            // divide before multiplying: share counts are ~1e18 per unit and the
            // product form overflows Decimal for large pools
            accepted / supplied * self.total_shares
        };

        ledger.transfer(supplier, self.vault, self.asset, accepted)?;
        self.cash += accepted;
        self.total_shares += minted;
        *self.shares.entry(receiver).or_insert(Decimal::ZERO) += minted;

        Ok(SupplyReceipt {
            accepted,
            shares_minted: minted,
        })
    }

    // 4.3: withdraw by share count, clamped to the holder's balance. fails if the
    // pool's cash cannot cover the underlying or outstanding borrows would breach
    // the reserve.
    pub fn withdraw(
        &mut self,
        ledger: &mut TokenLedger,
        supplier: AccountId,
        receiver: AccountId,
        shares_requested: Decimal,
    ) -> Result<Decimal, PoolError> {
        if shares_requested <= Decimal::ZERO {
            return Err(PoolError::ZeroAmount);
        }
        let held = self.shares.get(&supplier).copied().unwrap_or(Decimal::ZERO);
        if held.is_zero() {
            return Err(PoolError::ZeroAmount);
        }
        let burned = shares_requested.min(held);
        let amount = burned / self.total_shares * self.supplied();

        if amount > self.cash {
            return Err(PoolError::InsufficientLiquidity {
                requested: amount,
                available: self.cash,
            });
        }
        let remaining_supplied = self.supplied() - amount;
        let max_borrowable =
            remaining_supplied * (Decimal::ONE - self.params.reserve_ratio.as_fraction());
        if self.total_borrowed > max_borrowable {
            return Err(PoolError::ReserveBreached {
                borrowed: self.total_borrowed,
                limit: max_borrowable,
            });
        }

        ledger.transfer(self.vault, receiver, self.asset, amount)?;
        self.cash -= amount;
        self.total_shares -= burned;
        let entry = self.shares.get_mut(&supplier).unwrap();
        *entry -= burned;
        if entry.is_zero() {
            self.shares.remove(&supplier);
        }

        Ok(amount)
    }

    // pure capacity check; commit_borrow re-validates the same conditions
    pub fn can_borrow(&self, amount: Decimal) -> Result<(), PoolError> {
        if amount <= Decimal::ZERO {
            return Err(PoolError::ZeroAmount);
        }
        if self.total_borrowed + amount > self.params.borrow_cap {
            return Err(PoolError::ExceedsCap {
                requested: amount,
                cap: self.params.borrow_cap,
            });
        }
        let max_borrowable =
            self.supplied() * (Decimal::ONE - self.params.reserve_ratio.as_fraction());
        if self.total_borrowed + amount > max_borrowable {
            return Err(PoolError::ReserveBreached {
                borrowed: self.total_borrowed + amount,
                limit: max_borrowable,
            });
        }
        if amount > self.cash {
            return Err(PoolError::InsufficientLiquidity {
                requested: amount,
                available: self.cash,
            });
        }
        Ok(())
    }

    // 4.4: record a borrow and move the funds to the borrower. exceeding the
    // borrow cap or the reserve is a hard failure, unlike the supply-side clamp.
    pub fn commit_borrow(
        &mut self,
        ledger: &mut TokenLedger,
        borrower: AccountId,
        amount: Decimal,
    ) -> Result<BorrowId, PoolError> {
        self.can_borrow(amount)?;

        self.next_borrow_id += 1;
        let id = BorrowId(self.next_borrow_id);
        let debt_shares = amount / self.borrow_index * share_scale();

        ledger.transfer(self.vault, borrower, self.asset, amount)?;
        self.cash -= amount;
        self.total_borrowed += amount;
        self.borrows.insert(id, debt_shares);

        Ok(id)
    }

    // 4.5: repay, clamped to the outstanding debt. the record dies exactly on
    // full repayment. any collectable fee reserve rides along to the treasury.
    pub fn repay(
        &mut self,
        ledger: &mut TokenLedger,
        payer: AccountId,
        treasury: AccountId,
        borrow_id: BorrowId,
        amount: Decimal,
    ) -> Result<RepaySettlement, PoolError> {
        if amount <= Decimal::ZERO {
            return Err(PoolError::ZeroAmount);
        }
        let debt_shares = *self
            .borrows
            .get(&borrow_id)
            .ok_or(PoolError::UnknownBorrow(borrow_id))?;
        let debt = debt_shares / share_scale() * self.borrow_index;

        let repaid = amount.min(debt);
        ledger.transfer(payer, self.vault, self.asset, repaid)?;
        self.cash += repaid;
        self.total_borrowed = (self.total_borrowed - repaid).max(Decimal::ZERO);

        let remaining_debt = if repaid >= debt {
            self.borrows.remove(&borrow_id);
            Decimal::ZERO
        } else {
            let shares_repaid = repaid / self.borrow_index * share_scale();
            *self.borrows.get_mut(&borrow_id).unwrap() -= shares_repaid;
            debt - repaid
        };

        let fees_released = self.reserved_fees.min(self.cash);
        if fees_released > Decimal::ZERO {
            ledger.transfer(self.vault, treasury, self.asset, fees_released)?;
            self.cash -= fees_released;
            self.reserved_fees -= fees_released;
        }

        Ok(RepaySettlement {
            repaid,
            remaining_debt,
            fees_released,
        })
    }

    // 4.6: bad-debt write-off after an underwater liquidation. debt disappears
    // without cash, so suppliers absorb the loss through the exchange rate.
    pub fn write_off(&mut self, borrow_id: BorrowId, amount: Decimal) -> Result<Decimal, PoolError> {
        let debt_shares = *self
            .borrows
            .get(&borrow_id)
            .ok_or(PoolError::UnknownBorrow(borrow_id))?;
        let debt = debt_shares / share_scale() * self.borrow_index;

        let written_off = amount.min(debt);
        self.total_borrowed = (self.total_borrowed - written_off).max(Decimal::ZERO);
        if written_off >= debt {
            self.borrows.remove(&borrow_id);
        } else {
            let shares_gone = written_off / self.borrow_index * share_scale();
            *self.borrows.get_mut(&borrow_id).unwrap() -= shares_gone;
        }

        Ok(written_off)
    }

    // raw share balance, 1e18-scaled
    pub fn balance_of(&self, account: AccountId) -> Decimal {
        self.shares.get(&account).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn balance_of_underlying(&self, account: AccountId) -> Decimal {
        let held = self.balance_of(account);
        if held.is_zero() || self.total_shares.is_zero() {
            return Decimal::ZERO;
        }
        held / self.total_shares * self.supplied()
    }

    // raw debt shares, 1e18-scaled
    pub fn debt_of(&self, borrow_id: BorrowId) -> Decimal {
        self.borrows.get(&borrow_id).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn debt_of_underlying(&self, borrow_id: BorrowId) -> Decimal {
        self.debt_of(borrow_id) / share_scale() * self.borrow_index
    }

    pub fn debt_of_underlying_at(
        &self,
        model: &dyn InterestRateModel,
        borrow_id: BorrowId,
        now: Timestamp,
    ) -> Decimal {
        self.debt_of(borrow_id) / share_scale() * self.projected_borrow_index(model, now)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PoolError {
    #[error("Borrow of {requested} exceeds cap {cap}")]
    ExceedsCap { requested: Decimal, cap: Decimal },

    #[error("Reserve breached: borrowed {borrowed} above limit {limit}")]
    ReserveBreached { borrowed: Decimal, limit: Decimal },

    #[error("Insufficient pool liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Unknown borrow {0:?}")]
    UnknownBorrow(BorrowId),

    #[error("Zero amount not allowed")]
    ZeroAmount,

    #[error("Invalid pool params: {reason}")]
    InvalidParams { reason: String },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_model::FixedRateModel;
    use rust_decimal_macros::dec;

    // per-second rates divide by seconds-per-year, which is non-terminating in
    // decimal, so accrual results carry ~1e-28 rounding
    fn assert_close(actual: Decimal, expected: Decimal) {
        let tolerance = dec!(0.000000000001);
        assert!(
            (actual - expected).abs() < tolerance,
            "expected {expected}, got {actual}"
        );
    }

    fn setup(supply_cap: Decimal, borrow_cap: Decimal) -> (TokenLedger, LendingPool, AccountId) {
        let mut ledger = TokenLedger::new();
        let asset = ledger.register_asset("USD", 6);
        let vault = ledger.create_account();
        let supplier = ledger.create_account();
        ledger.mint(supplier, asset, dec!(10_000_000));

        let pool = LendingPool::new(
            asset,
            vault,
            PoolParams {
                supply_cap,
                borrow_cap,
                reserve_ratio: Ppm::new(50_000), // 5%
            },
            Timestamp::from_millis(0),
        );
        (ledger, pool, supplier)
    }

    #[test]
    fn params_validation() {
        assert!(PoolParams {
            supply_cap: dec!(5_000_000),
            borrow_cap: dec!(1_000_000),
            reserve_ratio: Ppm::new(50_000),
        }
        .validate()
        .is_ok());

        // borrow cap above supply cap
        assert!(PoolParams {
            supply_cap: dec!(5_000_000),
            borrow_cap: dec!(5_000_001),
            reserve_ratio: Ppm::new(50_000),
        }
        .validate()
        .is_err());

        // 100% reserve
        assert!(PoolParams {
            supply_cap: dec!(5_000_000),
            borrow_cap: dec!(1_000_000),
            reserve_ratio: Ppm::new(1_000_000),
        }
        .validate()
        .is_err());
    }

    #[test]
    fn first_supply_mints_scaled_shares() {
        let (mut ledger, mut pool, supplier) = setup(dec!(5_000_000), dec!(1_000_000));

        let receipt = pool.supply(&mut ledger, supplier, supplier, dec!(1)).unwrap();
        assert_eq!(receipt.accepted, dec!(1));
        assert_eq!(receipt.shares_minted, dec!(1) * share_scale());
        assert_eq!(pool.balance_of(supplier), share_scale());
        assert_eq!(pool.balance_of_underlying(supplier), dec!(1));
        assert_eq!(ledger.balance_of(pool.vault, pool.asset), dec!(1));
    }

    #[test]
    fn supply_beyond_cap_is_clamped() {
        let (mut ledger, mut pool, supplier) = setup(dec!(5_000_000), dec!(1_000_000));

        let receipt = pool
            .supply(&mut ledger, supplier, supplier, dec!(5_000_001))
            .unwrap();
        assert_eq!(receipt.accepted, dec!(5_000_000));
        // only the clamped amount moved
        assert_eq!(ledger.balance_of(pool.vault, pool.asset), dec!(5_000_000));
        assert_eq!(ledger.balance_of(supplier, pool.asset), dec!(5_000_000));
    }

    #[test]
    fn withdraw_more_than_held_clamps_to_balance() {
        let (mut ledger, mut pool, supplier) = setup(dec!(5_000_000), dec!(1_000_000));
        pool.supply(&mut ledger, supplier, supplier, dec!(100)).unwrap();

        let amount = pool
            .withdraw(&mut ledger, supplier, supplier, dec!(100) * share_scale() * dec!(2))
            .unwrap();
        assert_eq!(amount, dec!(100));
        assert_eq!(pool.balance_of(supplier), dec!(0));
    }

    #[test]
    fn supply_withdraw_round_trip_exact() {
        let (mut ledger, mut pool, supplier) = setup(dec!(5_000_000), dec!(1_000_000));
        let before = ledger.balance_of(supplier, pool.asset);

        let receipt = pool.supply(&mut ledger, supplier, supplier, dec!(1234)).unwrap();
        let back = pool
            .withdraw(&mut ledger, supplier, supplier, receipt.shares_minted)
            .unwrap();

        assert_eq!(back, dec!(1234));
        assert_eq!(ledger.balance_of(supplier, pool.asset), before);
    }

    #[test]
    fn borrow_exceeding_cap_fails() {
        let (mut ledger, mut pool, supplier) = setup(dec!(5_000_000), dec!(1_000_000));
        pool.supply(&mut ledger, supplier, supplier, dec!(2_000_000)).unwrap();

        let result = pool.commit_borrow(&mut ledger, supplier, dec!(1_000_001));
        assert!(matches!(result, Err(PoolError::ExceedsCap { .. })));
    }

    #[test]
    fn borrow_breaching_reserve_fails() {
        let (mut ledger, mut pool, supplier) = setup(dec!(5_000_000), dec!(1_000_000));
        pool.supply(&mut ledger, supplier, supplier, dec!(1)).unwrap();

        // reserve is 5%, so at most 0.95 of 1 supplied may be borrowed
        let result = pool.commit_borrow(&mut ledger, supplier, dec!(0.99));
        assert!(matches!(result, Err(PoolError::ReserveBreached { .. })));

        assert!(pool.commit_borrow(&mut ledger, supplier, dec!(0.95)).is_ok());
    }

    #[test]
    fn borrow_records_scaled_debt() {
        let (mut ledger, mut pool, supplier) = setup(dec!(5_000_000), dec!(1_000_000));
        pool.supply(&mut ledger, supplier, supplier, dec!(1_000_000)).unwrap();
        let borrower = ledger.create_account();

        let id = pool.commit_borrow(&mut ledger, borrower, dec!(1000)).unwrap();
        assert_eq!(pool.debt_of(id), dec!(1000) * share_scale());
        assert_eq!(pool.debt_of_underlying(id), dec!(1000));
        assert_eq!(ledger.balance_of(borrower, pool.asset), dec!(1000));
    }

    #[test]
    fn interest_accrues_and_fee_is_reserved() {
        let (mut ledger, mut pool, supplier) = setup(dec!(5_000_000), dec!(1_000_000));
        pool.supply(&mut ledger, supplier, supplier, dec!(1_000_000)).unwrap();
        let borrower = ledger.create_account();
        let id = pool.commit_borrow(&mut ledger, borrower, dec!(1000)).unwrap();

        // 0.365 annual = 0.001 per day
        let model = FixedRateModel::new(dec!(0.365));
        pool.accrue(&model, Ppm::new(20_000), Timestamp::from_millis(86_400_000));

        assert_close(pool.debt_of_underlying(id), dec!(1001));
        assert_close(pool.total_borrowed(), dec!(1001));
        // 2% of the 1 unit of interest is reserved for the treasury
        assert_close(pool.reserved_fees(), dec!(0.02));
        // suppliers got the other 98%
        assert_close(pool.supplied(), dec!(1_000_000.98));
    }

    #[test]
    fn debt_grows_monotonically_between_repayments() {
        let (mut ledger, mut pool, supplier) = setup(dec!(5_000_000), dec!(1_000_000));
        pool.supply(&mut ledger, supplier, supplier, dec!(1_000_000)).unwrap();
        let borrower = ledger.create_account();
        let id = pool.commit_borrow(&mut ledger, borrower, dec!(1000)).unwrap();

        let model = FixedRateModel::new(dec!(0.365));
        let mut last = pool.debt_of_underlying(id);
        for day in 1..=5i64 {
            pool.accrue(&model, Ppm::new(0), Timestamp::from_millis(day * 86_400_000));
            let debt = pool.debt_of_underlying(id);
            assert!(debt > last);
            last = debt;
        }
    }

    #[test]
    fn repay_reduces_debt_exactly_and_releases_fees() {
        let (mut ledger, mut pool, supplier) = setup(dec!(5_000_000), dec!(1_000_000));
        pool.supply(&mut ledger, supplier, supplier, dec!(1_000_000)).unwrap();
        let borrower = ledger.create_account();
        let treasury = ledger.create_account();
        let id = pool.commit_borrow(&mut ledger, borrower, dec!(1000)).unwrap();

        let model = FixedRateModel::new(dec!(0.365));
        pool.accrue(&model, Ppm::new(20_000), Timestamp::from_millis(86_400_000));

        let debt_before = pool.debt_of_underlying(id);
        let settlement = pool
            .repay(&mut ledger, borrower, treasury, id, dec!(500))
            .unwrap();

        assert_eq!(settlement.repaid, dec!(500));
        assert_eq!(settlement.remaining_debt, debt_before - dec!(500));
        assert_close(pool.debt_of_underlying(id), debt_before - dec!(500));
        assert_close(settlement.fees_released, dec!(0.02));
        assert_close(ledger.balance_of(treasury, pool.asset), dec!(0.02));
        assert_eq!(pool.reserved_fees(), dec!(0));
    }

    #[test]
    fn full_repay_destroys_record() {
        let (mut ledger, mut pool, supplier) = setup(dec!(5_000_000), dec!(1_000_000));
        pool.supply(&mut ledger, supplier, supplier, dec!(1_000_000)).unwrap();
        let borrower = ledger.create_account();
        let treasury = ledger.create_account();
        let id = pool.commit_borrow(&mut ledger, borrower, dec!(1000)).unwrap();

        // overpay; repay clamps to debt
        ledger.mint(borrower, pool.asset, dec!(1000));
        let settlement = pool
            .repay(&mut ledger, borrower, treasury, id, dec!(2000))
            .unwrap();

        assert_eq!(settlement.repaid, dec!(1000));
        assert_eq!(settlement.remaining_debt, dec!(0));
        assert_eq!(pool.debt_of(id), dec!(0));
        assert!(matches!(
            pool.repay(&mut ledger, borrower, treasury, id, dec!(1)),
            Err(PoolError::UnknownBorrow(_))
        ));
    }

    #[test]
    fn write_off_socializes_loss() {
        let (mut ledger, mut pool, supplier) = setup(dec!(5_000_000), dec!(1_000_000));
        pool.supply(&mut ledger, supplier, supplier, dec!(1_000_000)).unwrap();
        let borrower = ledger.create_account();
        let id = pool.commit_borrow(&mut ledger, borrower, dec!(1000)).unwrap();

        let supplied_before = pool.supplied();
        let gone = pool.write_off(id, dec!(200)).unwrap();
        assert_eq!(gone, dec!(200));
        assert_eq!(pool.debt_of_underlying(id), dec!(800));
        assert_eq!(pool.supplied(), supplied_before - dec!(200));
    }

    #[test]
    fn withdraw_blocked_by_outstanding_borrows() {
        let (mut ledger, mut pool, supplier) = setup(dec!(5_000_000), dec!(1_000_000));
        pool.supply(&mut ledger, supplier, supplier, dec!(1000)).unwrap();
        let borrower = ledger.create_account();
        pool.commit_borrow(&mut ledger, borrower, dec!(900)).unwrap();

        // only 100 cash left; withdrawing the full balance must fail
        let result = pool.withdraw(&mut ledger, supplier, supplier, pool.balance_of(supplier));
        assert!(matches!(result, Err(PoolError::InsufficientLiquidity { .. })));
    }
}
