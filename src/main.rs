//! Margin Trading Core Simulation.
//!
//! Walks the full protocol lifecycle: pool supply, leveraged opens, margin
//! top-ups, profitable closes, and the liquidation waterfall down to bad debt.

use margin_core::*;
use rust_decimal_macros::dec;

const MODEL: ModelKind = ModelKind(2);

struct Sim {
    core: TradingCore,
    oracle: SpotOracle,
    venue: OracleSwap,
    market_id: MarketId,
    operator: AccountId,
    trader: AccountId,
    usd: AssetId,
    eth: AssetId,
}

fn setup() -> Sim {
    let mut core = TradingCore::new(EngineConfig::default());
    let owner = core.owner();
    let operator = core.create_account();
    let trader = core.create_account();
    let treasury = core.create_account();

    let usd = core.register_asset("USD", 6);
    let eth = core.register_asset("ETH", 18);

    core.fund(owner, usd, dec!(10_000_000));
    core.fund(owner, eth, dec!(10_000));
    core.fund(trader, usd, dec!(10_000));

    core.set_fee_config(owner, FeeConfig::new(treasury, Ppm::new(1000), Ppm::new(10_000)))
        .unwrap();
    core.set_whitelisted_operator(owner, &[operator], &[true])
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
    core.supply(owner, eth, MODEL, owner, dec!(1_000)).unwrap();

    let oracle = SpotOracle::new(36, 90 * 86_400);
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

    Sim {
        core,
        oracle,
        venue,
        market_id,
        operator,
        trader,
        usd,
        eth,
    }
}

fn main() {
    println!("Margin Trading Core Simulation");
    println!("Pooled Lending, Leveraged Spot, Oracle Pricing\n");

    scenario_1_pool_lifecycle();
    scenario_2_profitable_long();
    scenario_3_margin_top_up();
    scenario_4_liquidation_at_the_edge();
    scenario_5_crash_and_bad_debt();
    scenario_6_short_lifecycle();

    println!("\nAll simulations completed successfully.");
}

/// Supply, interest accrual through a leveraged borrow, withdraw with yield.
fn scenario_1_pool_lifecycle() {
    println!("Scenario 1: Pool Lifecycle\n");

    let mut sim = setup();
    let receipt = sim
        .core
        .supply(sim.trader, sim.usd, MODEL, sim.trader, dec!(5000))
        .unwrap();
    println!("  Trader supplies $5,000, receives {} shares", receipt.shares_minted);

    // a position borrows from the pool, so interest starts accruing
    sim.core
        .open_position(
            sim.trader,
            sim.market_id,
            MODEL,
            sim.eth,
            dec!(1000),
            dec!(5000),
            dec!(0),
            None,
            None,
            &sim.oracle,
            &mut sim.venue,
        )
        .unwrap();
    sim.core.advance_secs(30 * 86_400);

    let pool = sim.core.router().get_lending_pool(sim.usd, MODEL).unwrap();
    println!("  Pool utilization after open: {:.4}%", pool.utilization() * dec!(100));

    let underlying = sim
        .core
        .router()
        .balance_of_underlying(sim.usd, MODEL, sim.trader)
        .unwrap();
    println!("  Trader claim after 30 days: ${underlying}");

    let amount = sim
        .core
        .withdraw(sim.trader, sim.usd, MODEL, sim.trader, receipt.shares_minted)
        .unwrap();
    println!("  Withdrawn: ${amount}\n");
}

/// Open 5x long, ride the price up, close with positive PnL net of fees.
fn scenario_2_profitable_long() {
    println!("Scenario 2: Profitable Long\n");

    let mut sim = setup();
    let balance_before = sim.core.balance_of(sim.trader, sim.usd);

    let receipt = sim
        .core
        .open_position(
            sim.trader,
            sim.market_id,
            MODEL,
            sim.eth,
            dec!(1000),
            dec!(5000),
            dec!(0),
            None,
            None,
            &sim.oracle,
            &mut sim.venue,
        )
        .unwrap();
    println!("  Opened 5x long: {} ETH @ ${}", receipt.asset_amount, receipt.entry_price);

    sim.core.advance_secs(86_400);
    sim.oracle
        .set_price(sim.eth, Price::new_unchecked(dec!(2600)), sim.core.time());
    println!("  One day later ETH is at $2,600");

    let close = sim
        .core
        .close_position(sim.trader, sim.market_id, receipt.position_id, dec!(0), &mut sim.venue)
        .unwrap();
    let balance_after = sim.core.balance_of(sim.trader, sim.usd);

    println!("  Debt repaid: ${}", close.debt_repaid);
    println!("  Margin returned: ${}", close.margin_returned);
    println!("  Net PnL: ${}\n", balance_after - balance_before);
}

/// Adding margin pushes the liquidation price down.
fn scenario_3_margin_top_up() {
    println!("Scenario 3: Margin Top-Up\n");

    let mut sim = setup();
    let receipt = sim
        .core
        .open_position(
            sim.trader,
            sim.market_id,
            MODEL,
            sim.eth,
            dec!(1000),
            dec!(6000),
            dec!(0),
            None,
            None,
            &sim.oracle,
            &mut sim.venue,
        )
        .unwrap();

    let before = sim
        .core
        .get_liquidation_price(sim.market_id, receipt.position_id)
        .unwrap()
        .unwrap();
    println!("  Liquidation price at 6x: ${before}");

    sim.core
        .add_margin(sim.trader, sim.market_id, receipt.position_id, dec!(500))
        .unwrap();
    let after = sim
        .core
        .get_liquidation_price(sim.market_id, receipt.position_id)
        .unwrap()
        .unwrap();
    println!("  After adding $500 margin: ${after}\n");
}

/// Price touches the liquidation price exactly; the operator closes it out.
fn scenario_4_liquidation_at_the_edge() {
    println!("Scenario 4: Liquidation at the Edge\n");

    let mut sim = setup();
    let receipt = sim
        .core
        .open_position(
            sim.trader,
            sim.market_id,
            MODEL,
            sim.eth,
            dec!(1000),
            dec!(6000),
            dec!(0),
            None,
            None,
            &sim.oracle,
            &mut sim.venue,
        )
        .unwrap();

    let liq_price = sim
        .core
        .get_liquidation_price(sim.market_id, receipt.position_id)
        .unwrap()
        .unwrap();
    sim.oracle.set_price(sim.eth, liq_price, sim.core.time());
    println!("  ETH marked exactly at the liquidation price ${liq_price}");

    let result = sim
        .core
        .liquidate(sim.operator, sim.market_id, receipt.position_id, &sim.oracle, &mut sim.venue)
        .unwrap();
    println!("  Debt repaid: ${}", result.debt_repaid);
    println!("  Liquidation fee to treasury: {}", result.fee_to_treasury);
    println!("  Margin returned to owner: ${}", result.margin_returned);
    println!(
        "  Remaining debt: ${}\n",
        sim.core.debt_of_position(sim.market_id, receipt.position_id).unwrap()
    );
}

/// A crash deep below the liquidation price leaves bad debt on the pool.
fn scenario_5_crash_and_bad_debt() {
    println!("Scenario 5: Crash and Bad Debt\n");

    let mut sim = setup();
    let receipt = sim
        .core
        .open_position(
            sim.trader,
            sim.market_id,
            MODEL,
            sim.eth,
            dec!(1000),
            dec!(6000),
            dec!(0),
            None,
            None,
            &sim.oracle,
            &mut sim.venue,
        )
        .unwrap();

    sim.oracle
        .set_price(sim.eth, Price::new_unchecked(dec!(2000)), sim.core.time());
    println!("  ETH crashes to $2,000");

    let estimate = sim
        .core
        .estimate_liquidation(sim.market_id, receipt.position_id, &sim.oracle, &sim.venue)
        .unwrap();
    println!("  Trial estimate: plan {:?}, bad debt ${}", estimate.plan, estimate.bad_debt);

    let result = sim
        .core
        .liquidate(sim.operator, sim.market_id, receipt.position_id, &sim.oracle, &mut sim.venue)
        .unwrap();
    println!("  Debt repaid: ${}", result.debt_repaid);
    println!("  Bad debt written off: ${}\n", result.bad_debt);
}

/// Short the target: borrow ETH, sell it, buy it back cheaper.
fn scenario_6_short_lifecycle() {
    println!("Scenario 6: Short Lifecycle\n");

    let mut sim = setup();
    let balance_before = sim.core.balance_of(sim.trader, sim.usd);

    let receipt = sim
        .core
        .open_position(
            sim.trader,
            sim.market_id,
            MODEL,
            sim.usd,
            dec!(1000),
            dec!(2),
            dec!(0),
            None,
            None,
            &sim.oracle,
            &mut sim.venue,
        )
        .unwrap();
    println!("  Shorted 2 ETH against $1,000 margin, holding ${}", receipt.asset_amount);

    sim.core.advance_secs(86_400);
    sim.oracle
        .set_price(sim.eth, Price::new_unchecked(dec!(2300)), sim.core.time());
    println!("  One day later ETH is at $2,300");

    let close = sim
        .core
        .close_position(sim.trader, sim.market_id, receipt.position_id, dec!(0), &mut sim.venue)
        .unwrap();
    let balance_after = sim.core.balance_of(sim.trader, sim.usd);

    println!("  Buy-back cost: ${}", close.proceeds);
    println!("  Margin returned: ${}", close.margin_returned);
    println!("  Net PnL: ${}\n", balance_after - balance_before);
}
