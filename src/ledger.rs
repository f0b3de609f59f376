// 2.0 ledger.rs: the balance book. every token the protocol touches lives here,
// keyed by (account, asset). pools, the trading engine, the fee treasury and swap
// venues are all just accounts; moving value is always an explicit transfer.

use crate::types::{AccountId, AssetId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetInfo {
    pub symbol: String,
    pub decimals: u32,
}

#[derive(Debug, Default)]
pub struct TokenLedger {
    assets: HashMap<AssetId, AssetInfo>,
    balances: HashMap<(AccountId, AssetId), Decimal>,
    next_asset_id: u32,
    next_account_id: u64,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_asset(&mut self, symbol: &str, decimals: u32) -> AssetId {
        self.next_asset_id += 1;
        let id = AssetId(self.next_asset_id);
        self.assets.insert(
            id,
            AssetInfo {
                symbol: symbol.to_string(),
                decimals,
            },
        );
        id
    }

    pub fn asset(&self, id: AssetId) -> Option<&AssetInfo> {
        self.assets.get(&id)
    }

    pub fn create_account(&mut self) -> AccountId {
        self.next_account_id += 1;
        AccountId(self.next_account_id)
    }

    pub fn balance_of(&self, account: AccountId, asset: AssetId) -> Decimal {
        self.balances
            .get(&(account, asset))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    // genesis/test supply. production inflows arrive by transfer from funded accounts.
    pub fn mint(&mut self, account: AccountId, asset: AssetId, amount: Decimal) {
        debug_assert!(self.assets.contains_key(&asset), "mint of unregistered asset");
        debug_assert!(amount >= Decimal::ZERO, "mint amount must be non-negative");
        *self.balances.entry((account, asset)).or_insert(Decimal::ZERO) += amount;
    }

    pub fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        asset: AssetId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        if !self.assets.contains_key(&asset) {
            return Err(LedgerError::UnknownAsset(asset));
        }
        if amount < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount(amount));
        }
        if amount.is_zero() || from == to {
            return Ok(());
        }

        let available = self.balance_of(from, asset);
        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                account: from,
                asset,
                requested: amount,
                available,
            });
        }

        *self.balances.get_mut(&(from, asset)).unwrap() -= amount;
        *self.balances.entry((to, asset)).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }

    // sum of one asset across all accounts. conservation checks in tests lean on this.
    pub fn total_issued(&self, asset: AssetId) -> Decimal {
        self.balances
            .iter()
            .filter(|((_, a), _)| *a == asset)
            .map(|(_, amount)| *amount)
            .sum()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient balance for {account:?}/{asset:?}: requested {requested}, available {available}")]
    InsufficientBalance {
        account: AccountId,
        asset: AssetId,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Unknown asset {0:?}")]
    UnknownAsset(AssetId),

    #[error("Negative transfer amount {0}")]
    NegativeAmount(Decimal),
}
