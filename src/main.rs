//! Capital Engine Simulation.
//!
//! Walks the full allocation lifecycle: tier progression, volatility-adaptive
//! sizing, compliance breaches, multi-rail fund routing, and the end-of-day
//! settlement cycle with rounding-by-subtraction.

use capital_core::*;
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("Capital Allocation & Settlement Engine Simulation");
    println!("Tiered Capital, Volatility Capacity, EOD Settlement\n");

    scenario_1_tier_progression();
    scenario_2_volatility_sizing();
    scenario_3_compliance_breach();
    scenario_4_rail_routing();
    scenario_5_settlement_rounding();
    scenario_6_parallel_cycle();

    println!("\nAll simulations completed successfully.");
}

fn build_engine() -> Engine {
    let rails: Vec<Arc<dyn PaymentRail>> = vec![
        Arc::new(MockRail::new("IMPS", MockRailBehavior::Succeed)),
        Arc::new(MockRail::new("NEFT", MockRailBehavior::Succeed)),
    ];
    Engine::new(
        EngineConfig::standard().unwrap(),
        rails,
        Arc::new(InMemoryAuditSink::new()),
        Arc::new(NullNotifier),
    )
}

fn trading_day(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
}

/// A winning account climbs the tier ladder one step per settlement.
fn scenario_1_tier_progression() {
    println!("Scenario 1: Tier Progression\n");

    let engine = build_engine();
    let id = engine.open_account(OwnerId(1), TierId(1)).unwrap();
    let account = engine.account(id).unwrap();
    println!("  Account opened on tier 1 with {}", account.capital_current());

    engine
        .submit_trade(
            id,
            TradeIntent {
                symbol: Symbol::new("NIFTY-FUT"),
                quantity: dec!(100),
                price: Rupees::new(dec!(1000)),
                lots: Lots(10),
            },
            dec!(10),
        )
        .unwrap();
    engine
        .close_position(id, &Symbol::new("NIFTY-FUT"), Rupees::new(dec!(3000)))
        .unwrap();
    println!("  Traded 100 @ ₹1,000, closed @ ₹3,000");

    let cycle = engine.run_settlement_cycle(trading_day(15));
    let account = engine.account(id).unwrap();
    println!("  Settled: closing balance {}", account.capital_current());
    for (acc, from, to) in &cycle.promotions {
        println!("  Account {} promoted tier {} -> {}", acc.0, from.0, to.0);
    }
    println!();
}

/// The same trade shrinks as the volatility index climbs.
fn scenario_2_volatility_sizing() {
    println!("Scenario 2: Volatility-Adaptive Sizing\n");

    for index in [dec!(10), dec!(18), dec!(22), dec!(45)] {
        let engine = build_engine();
        let id = engine.open_account(OwnerId(1), TierId(1)).unwrap();
        let result = engine
            .submit_trade(
                id,
                TradeIntent {
                    symbol: Symbol::new("NIFTY-FUT"),
                    quantity: dec!(100),
                    price: Rupees::new(dec!(1000)),
                    lots: Lots(10),
                },
                index,
            )
            .unwrap();
        println!(
            "  Index {:>2}: capacity {:>4}%, sized {} of 100, exposure {}",
            index,
            result.capacity_fraction * dec!(100),
            result.sized_quantity,
            result.exposure_after
        );
    }
    println!();
}

/// An oversize trade breaches the account; flatten and clear to recover.
fn scenario_3_compliance_breach() {
    println!("\nScenario 3: Compliance Breach and Recovery\n");

    let engine = build_engine();
    let id = engine.open_account(OwnerId(1), TierId(1)).unwrap();

    let result = engine.submit_trade(
        id,
        TradeIntent {
            symbol: Symbol::new("BANKNIFTY-FUT"),
            quantity: dec!(10_000),
            price: Rupees::new(dec!(1000)),
            lots: Lots(2000),
        },
        dec!(10),
    );
    match result {
        Err(EngineError::ComplianceRejected(breaches)) => {
            println!("  Trade rejected, {} rule(s) violated:", breaches.len());
            for breach in &breaches {
                println!("    - {breach}");
            }
        }
        other => println!("  unexpected: {other:?}"),
    }

    let account = engine.account(id).unwrap();
    println!("  Account status: {}", account.status);

    engine
        .flatten_account(id, |_| Rupees::new(dec!(1000)))
        .unwrap();
    engine.clear_breach(id).unwrap();
    println!("  Flattened and cleared: {}", engine.account(id).unwrap().status);
}

/// A push above the per-rail cap splits across IMPS and NEFT.
fn scenario_4_rail_routing() {
    println!("\nScenario 4: Multi-Rail Fund Routing\n");

    let engine = build_engine();
    let id = engine.open_account(OwnerId(1), TierId(3)).unwrap();

    let result = engine
        .request_transfer(
            id,
            Direction::Push,
            Rupees::new(dec!(150_000)),
            CashAccountRef("HDFC-001".to_string()),
        )
        .unwrap();

    println!("  Push ₹1,50,000 with a ₹1,00,000 per-rail cap");
    let request = engine.transfer(result.request_id).unwrap();
    for attempt in &request.rail_attempts {
        println!(
            "    {} attempted {}, moved {}",
            attempt.rail_name,
            attempt.amount_attempted,
            attempt.outcome.amount_moved()
        );
    }
    println!("  Status: {:?}, capital now {}", result.status, engine.account(id).unwrap().capital_current());
}

/// Closing balances round down by subtraction; the remainder is held back.
fn scenario_5_settlement_rounding() {
    println!("\nScenario 5: Rounding by Subtraction\n");

    let schedule = RoundingSchedule::standard();
    for balance in [dec!(99_999), dec!(105_000), dec!(1_234_567), dec!(12_345_678)] {
        let (rounded, held) = schedule.round_down(Rupees::new(balance));
        println!("  {} -> {} (held back {})", Rupees::new(balance), rounded, held);
    }

    let engine = build_engine();
    let id = engine.open_account(OwnerId(1), TierId(1)).unwrap();
    engine
        .submit_trade(
            id,
            TradeIntent {
                symbol: Symbol::new("NIFTY-FUT"),
                quantity: dec!(100),
                price: Rupees::new(dec!(1000)),
                lots: Lots(10),
            },
            dec!(10),
        )
        .unwrap();
    engine
        .close_position(id, &Symbol::new("NIFTY-FUT"), Rupees::new(dec!(1062.50)))
        .unwrap();
    engine.run_settlement_cycle(trading_day(15));

    let account = engine.account(id).unwrap();
    println!(
        "  Gross ₹6,250, fee ₹1,250, net ₹5,000: closing {}, holding buffer {}",
        account.capital_current(),
        engine.settlement().holding_buffer()
    );
}

/// Many accounts settle concurrently; a re-run replays every record.
fn scenario_6_parallel_cycle() {
    println!("\nScenario 6: Parallel Settlement Cycle\n");

    let engine = build_engine();
    for owner in 1..=50 {
        let id = engine.open_account(OwnerId(owner), TierId(1)).unwrap();
        engine
            .submit_trade(
                id,
                TradeIntent {
                    symbol: Symbol::new("NIFTY-FUT"),
                    quantity: dec!(50),
                    price: Rupees::new(dec!(1000)),
                    lots: Lots(5),
                },
                dec!(12),
            )
            .unwrap();
        engine
            .close_position(id, &Symbol::new("NIFTY-FUT"), Rupees::new(dec!(1020)))
            .unwrap();
    }

    let cycle = engine.run_settlement_cycle(trading_day(16));
    println!(
        "  {} accounts settled, {} promoted, {} failed",
        cycle.settled,
        cycle.promotions.len(),
        cycle.failures.len()
    );

    let rerun = engine.run_settlement_cycle(trading_day(16));
    println!(
        "  Re-run: {} fresh settlements, {} replayed",
        rerun.settled, rerun.replayed
    );
}
