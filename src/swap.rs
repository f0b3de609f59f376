// 7.0 swap.rs: external swap execution. the engine never prices a swap itself;
// it hands the venue an exact-input or exact-output instruction with a bound,
// and the venue either honors the bound or fails. venues are ledger accounts
// holding their own reserves.

use crate::ledger::{LedgerError, TokenLedger};
use crate::oracle::{OracleError, PriceOracle, SpotOracle};
use crate::types::{AccountId, AssetId, Ppm, Timestamp};
use rust_decimal::Decimal;
use std::fmt;

pub trait SwapVenue: fmt::Debug {
    // ledger identity holding the venue's reserves
    fn account(&self) -> AccountId;

    // expected output for an exact-input swap, without executing
    fn quote_exact_input(
        &self,
        token_in: AssetId,
        token_out: AssetId,
        amount_in: Decimal,
        now: Timestamp,
    ) -> Result<Decimal, SwapError>;

    // expected input for an exact-output swap, without executing
    fn quote_exact_output(
        &self,
        token_in: AssetId,
        token_out: AssetId,
        amount_out: Decimal,
        now: Timestamp,
    ) -> Result<Decimal, SwapError>;

    // sell exactly `amount_in`; deliver at least `min_out` to `receiver` or fail
    fn swap_exact_input(
        &mut self,
        ledger: &mut TokenLedger,
        token_in: AssetId,
        token_out: AssetId,
        amount_in: Decimal,
        payer: AccountId,
        receiver: AccountId,
        min_out: Decimal,
        now: Timestamp,
    ) -> Result<Decimal, SwapError>;

    // buy exactly `amount_out`; spend at most `max_in` from `payer` or fail
    fn swap_exact_output(
        &mut self,
        ledger: &mut TokenLedger,
        token_in: AssetId,
        token_out: AssetId,
        amount_out: Decimal,
        payer: AccountId,
        receiver: AccountId,
        max_in: Decimal,
        now: Timestamp,
    ) -> Result<Decimal, SwapError>;
}

// 7.1: venue that fills at the oracle price plus a configurable spread. spread
// is the venue's edge: output shrinks on exact-input, input grows on
// exact-output.
#[derive(Debug)]
pub struct OracleSwap {
    account: AccountId,
    oracle: SpotOracle,
    spread: Ppm,
}

impl OracleSwap {
    pub fn new(account: AccountId, oracle: SpotOracle, spread: Ppm) -> Self {
        debug_assert!(!spread.saturated());
        Self {
            account,
            oracle,
            spread,
        }
    }

    fn price_ratio(
        &self,
        token_in: AssetId,
        token_out: AssetId,
        now: Timestamp,
    ) -> Result<Decimal, SwapError> {
        let p_in = self.oracle.price_of(token_in, now)?;
        let p_out = self.oracle.price_of(token_out, now)?;
        Ok(p_in.value() / p_out.value())
    }
}

impl SwapVenue for OracleSwap {
    fn account(&self) -> AccountId {
        self.account
    }

    fn quote_exact_input(
        &self,
        token_in: AssetId,
        token_out: AssetId,
        amount_in: Decimal,
        now: Timestamp,
    ) -> Result<Decimal, SwapError> {
        if amount_in <= Decimal::ZERO {
            return Err(SwapError::ZeroAmount);
        }
        let ratio = self.price_ratio(token_in, token_out, now)?;
        Ok(amount_in * ratio * (Decimal::ONE - self.spread.as_fraction()))
    }

    fn quote_exact_output(
        &self,
        token_in: AssetId,
        token_out: AssetId,
        amount_out: Decimal,
        now: Timestamp,
    ) -> Result<Decimal, SwapError> {
        if amount_out <= Decimal::ZERO {
            return Err(SwapError::ZeroAmount);
        }
        let ratio = self.price_ratio(token_out, token_in, now)?;
        Ok(amount_out * ratio / (Decimal::ONE - self.spread.as_fraction()))
    }

    fn swap_exact_input(
        &mut self,
        ledger: &mut TokenLedger,
        token_in: AssetId,
        token_out: AssetId,
        amount_in: Decimal,
        payer: AccountId,
        receiver: AccountId,
        min_out: Decimal,
        now: Timestamp,
    ) -> Result<Decimal, SwapError> {
        let amount_out = self.quote_exact_input(token_in, token_out, amount_in, now)?;
        if amount_out < min_out {
            return Err(SwapError::TooLittleReceived {
                minimum: min_out,
                actual: amount_out,
            });
        }

        // check the outgoing leg before moving anything so a failure leaves
        // both balances untouched
        let reserves = ledger.balance_of(self.account, token_out);
        if amount_out > reserves {
            return Err(SwapError::Ledger(LedgerError::InsufficientBalance {
                account: self.account,
                asset: token_out,
                requested: amount_out,
                available: reserves,
            }));
        }

        ledger.transfer(payer, self.account, token_in, amount_in)?;
        ledger.transfer(self.account, receiver, token_out, amount_out)?;
        Ok(amount_out)
    }

    fn swap_exact_output(
        &mut self,
        ledger: &mut TokenLedger,
        token_in: AssetId,
        token_out: AssetId,
        amount_out: Decimal,
        payer: AccountId,
        receiver: AccountId,
        max_in: Decimal,
        now: Timestamp,
    ) -> Result<Decimal, SwapError> {
        let amount_in = self.quote_exact_output(token_in, token_out, amount_out, now)?;
        if amount_in > max_in {
            return Err(SwapError::TooMuchRequested {
                maximum: max_in,
                actual: amount_in,
            });
        }

        let reserves = ledger.balance_of(self.account, token_out);
        if amount_out > reserves {
            return Err(SwapError::Ledger(LedgerError::InsufficientBalance {
                account: self.account,
                asset: token_out,
                requested: amount_out,
                available: reserves,
            }));
        }

        ledger.transfer(payer, self.account, token_in, amount_in)?;
        ledger.transfer(self.account, receiver, token_out, amount_out)?;
        Ok(amount_in)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SwapError {
    #[error("Swap output {actual} below minimum {minimum}")]
    TooLittleReceived { minimum: Decimal, actual: Decimal },

    #[error("Swap input {actual} above maximum {maximum}")]
    TooMuchRequested { maximum: Decimal, actual: Decimal },

    #[error("Zero swap amount")]
    ZeroAmount,

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
