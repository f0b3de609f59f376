//! Solvency invariant tests.
//!
//! These verify the accounting properties that must hold for the protocol to
//! stay solvent: share round-trips, repay arithmetic, liquidation-price
//! monotonicity, the leverage limit, and ledger conservation.

use margin_core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const MODEL: ModelKind = ModelKind(2);

fn pool_fixture() -> (TokenLedger, LendingPool, AccountId) {
    let mut ledger = TokenLedger::new();
    let asset = ledger.register_asset("USD", 6);
    let vault = ledger.create_account();
    let supplier = ledger.create_account();
    ledger.mint(supplier, asset, dec!(10_000_000));

    let pool = LendingPool::new(
        asset,
        vault,
        PoolParams {
            supply_cap: dec!(5_000_000),
            borrow_cap: dec!(1_000_000),
            reserve_ratio: Ppm::new(50_000),
        },
        Timestamp::from_millis(0),
    );
    (ledger, pool, supplier)
}

struct Fixture {
    core: TradingCore,
    oracle: SpotOracle,
    venue: OracleSwap,
    market_id: MarketId,
    user: AccountId,
    usd: AssetId,
    eth: AssetId,
}

fn engine_fixture() -> Fixture {
    let mut core = TradingCore::new(EngineConfig::default());
    let owner = core.owner();
    let treasury = core.create_account();
    let user = core.create_account();

    let usd = core.register_asset("USD", 6);
    let eth = core.register_asset("ETH", 18);

    core.fund(owner, usd, dec!(10_000_000));
    core.fund(owner, eth, dec!(100_000));
    core.fund(user, usd, dec!(100_000));

    core.set_fee_config(owner, FeeConfig::new(treasury, Ppm::new(1000), Ppm::new(10_000)))
        .unwrap();
    core.router_mut()
        .set_interest_rate_model(owner, MODEL, Box::new(VariableInterestRateModel::default()))
        .unwrap();
    core.router_mut()
        .set_fee_config(owner, treasury, Ppm::new(20_000))
        .unwrap();

    core.create_lending_pool(owner, usd, MODEL, dec!(100_000_000), dec!(500_000), Ppm::new(50_000))
        .unwrap();
    core.create_lending_pool(owner, eth, MODEL, dec!(100_000_000), dec!(500_000), Ppm::new(50_000))
        .unwrap();
    core.supply(owner, usd, MODEL, owner, dec!(1_000_000)).unwrap();
    core.supply(owner, eth, MODEL, owner, dec!(100_000)).unwrap();

    let oracle = SpotOracle::new(36, 7 * 86_400);
    oracle.set_price(usd, Price::new_unchecked(dec!(1)), core.time());
    oracle.set_price(eth, Price::new_unchecked(dec!(2500)), core.time());

    let venue_account = core.create_account();
    core.fund(venue_account, usd, dec!(10_000_000));
    core.fund(venue_account, eth, dec!(10_000));
    let venue = OracleSwap::new(venue_account, oracle.clone(), Ppm::new(0));

    let market_id = core
        .create_market(
            owner,
            MarketParams {
                token0: usd,
                token1: eth,
                token0_is_margin: true,
                max_leverage: Leverage::new(dec!(10)).unwrap(),
                open_loss_threshold: Ppm::new(50_000),
                liquidate_loss_threshold: Ppm::new(500_000),
                liquidation_discount: Ppm::new(20_000),
                token0_cap: dec!(1_000_000),
                token1_cap: dec!(100_000),
            },
        )
        .unwrap();

    Fixture {
        core,
        oracle,
        venue,
        market_id,
        user,
        usd,
        eth,
    }
}

proptest! {
    /// Supplying then withdrawing the full share balance returns exactly the
    /// original amount while no interest has accrued.
    #[test]
    fn supply_withdraw_round_trip(amount_raw in 1i64..=5_000_000i64) {
        let (mut ledger, mut pool, supplier) = pool_fixture();
        let amount = Decimal::from(amount_raw);
        let before = ledger.balance_of(supplier, pool.asset);

        let receipt = pool.supply(&mut ledger, supplier, supplier, amount).unwrap();
        prop_assert_eq!(receipt.accepted, amount);

        let back = pool
            .withdraw(&mut ledger, supplier, supplier, receipt.shares_minted)
            .unwrap();
        prop_assert_eq!(back, amount);
        prop_assert_eq!(ledger.balance_of(supplier, pool.asset), before);
        prop_assert_eq!(pool.balance_of(supplier), Decimal::ZERO);
    }

    /// Debt after a repayment equals debt before minus the repaid amount, and
    /// can never go negative no matter how much is thrown at it.
    #[test]
    fn repay_reduces_debt_exactly(
        borrow_raw in 1i64..=900_000i64,
        repay_raw in 1i64..=1_000_000i64,
    ) {
        let (mut ledger, mut pool, supplier) = pool_fixture();
        pool.supply(&mut ledger, supplier, supplier, dec!(2_000_000)).unwrap();
        let borrower = ledger.create_account();
        let treasury = ledger.create_account();
        ledger.mint(borrower, pool.asset, dec!(1_000_000));

        let borrow = Decimal::from(borrow_raw);
        let id = pool.commit_borrow(&mut ledger, borrower, borrow).unwrap();
        let debt_before = pool.debt_of_underlying(id);

        let repay = Decimal::from(repay_raw);
        let settlement = pool
            .repay(&mut ledger, borrower, treasury, id, repay)
            .unwrap();

        prop_assert_eq!(settlement.repaid, repay.min(debt_before));
        prop_assert_eq!(settlement.remaining_debt, debt_before - settlement.repaid);
        prop_assert!(settlement.remaining_debt >= Decimal::ZERO);
        prop_assert_eq!(pool.debt_of_underlying(id), settlement.remaining_debt);
    }

    /// Adding any positive margin strictly lowers a long's liquidation price.
    #[test]
    fn add_margin_strictly_lowers_long_liquidation_price(add_raw in 1i64..=5000i64) {
        let mut f = engine_fixture();
        let receipt = f.core.open_position(
            f.user, f.market_id, MODEL, f.eth,
            dec!(1000), dec!(6000), dec!(0), None, None,
            &f.oracle, &mut f.venue,
        ).unwrap();

        let before = f.core
            .get_liquidation_price(f.market_id, receipt.position_id)
            .unwrap()
            .unwrap();
        f.core
            .add_margin(f.user, f.market_id, receipt.position_id, Decimal::from(add_raw))
            .unwrap();
        let after = f.core
            .get_liquidation_price(f.market_id, receipt.position_id)
            .unwrap()
            .unwrap();

        prop_assert!(after < before);
    }

    /// Adding any positive margin strictly raises a short's liquidation price.
    #[test]
    fn add_margin_strictly_raises_short_liquidation_price(add_raw in 1i64..=5000i64) {
        let mut f = engine_fixture();
        let receipt = f.core.open_position(
            f.user, f.market_id, MODEL, f.usd,
            dec!(1000), dec!(2), dec!(0), None, None,
            &f.oracle, &mut f.venue,
        ).unwrap();

        let before = f.core
            .get_liquidation_price(f.market_id, receipt.position_id)
            .unwrap()
            .unwrap();
        f.core
            .add_margin(f.user, f.market_id, receipt.position_id, Decimal::from(add_raw))
            .unwrap();
        let after = f.core
            .get_liquidation_price(f.market_id, receipt.position_id)
            .unwrap()
            .unwrap();

        prop_assert!(after > before);
    }

    /// Opening above the market's maximum leverage always fails with the
    /// leverage error and leaves every balance untouched.
    #[test]
    fn excess_leverage_never_partially_applies(
        margin_raw in 100i64..=1000i64,
        multiplier in 11i64..=50i64,
    ) {
        let mut f = engine_fixture();
        let margin = Decimal::from(margin_raw);
        let borrow = margin * Decimal::from(multiplier);
        let balance_before = f.core.balance_of(f.user, f.usd);

        let result = f.core.open_position(
            f.user, f.market_id, MODEL, f.eth,
            margin, borrow, dec!(0), None, None,
            &f.oracle, &mut f.venue,
        );

        let is_leverage_exceeded = matches!(result, Err(TradingError::LeverageExceeded { .. }));
        prop_assert!(is_leverage_exceeded);
        prop_assert_eq!(f.core.balance_of(f.user, f.usd), balance_before);
        let market = f.core.get_market(f.market_id).unwrap();
        prop_assert_eq!(market.positions_of(f.user).count(), 0);
        let pool = f.core.router().get_lending_pool(f.usd, MODEL).unwrap();
        prop_assert_eq!(pool.total_borrowed(), Decimal::ZERO);
    }

    /// The margin asset is conserved through a full open/close cycle at any
    /// survivable price, and the debt always ends at exactly zero.
    #[test]
    fn margin_asset_conserved_through_cycles(
        leverage in 2i64..=6i64,
        price_pct in 95i64..=130i64,
    ) {
        let mut f = engine_fixture();
        let total_before = f.core.ledger().total_issued(f.usd);

        let receipt = f.core.open_position(
            f.user, f.market_id, MODEL, f.eth,
            dec!(1000), dec!(1000) * Decimal::from(leverage),
            dec!(0), None, None,
            &f.oracle, &mut f.venue,
        ).unwrap();

        f.core.advance_time(86_400_000);
        let new_price = Decimal::from(price_pct) * dec!(25); // pct of 2500
        f.oracle.set_price(f.eth, Price::new_unchecked(new_price), f.core.time());

        f.core
            .close_position(f.user, f.market_id, receipt.position_id, dec!(0), &mut f.venue)
            .unwrap();

        prop_assert_eq!(f.core.ledger().total_issued(f.usd), total_before);
        prop_assert_eq!(
            f.core.debt_of_position(f.market_id, receipt.position_id).unwrap(),
            Decimal::ZERO
        );
    }
}
