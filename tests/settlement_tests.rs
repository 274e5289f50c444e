//! End-of-day settlement behavior through the public engine surface:
//! fee splits, rounding-by-subtraction, replay idempotence, audit gating.

use capital_core::*;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn build_engine() -> (Engine, Arc<InMemoryAuditSink>) {
    let sink = Arc::new(InMemoryAuditSink::new());
    let engine = Engine::new(
        EngineConfig::standard().unwrap(),
        vec![],
        sink.clone(),
        Arc::new(NullNotifier),
    );
    (engine, sink)
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 15).unwrap()
}

fn trade_and_close(engine: &Engine, id: AccountId, quantity: Decimal, entry: Decimal, exit: Decimal) {
    engine
        .submit_trade(
            id,
            TradeIntent {
                symbol: Symbol::new("NIFTY-FUT"),
                quantity,
                price: Rupees::new(entry),
                lots: Lots(10),
            },
            dec!(10), // calm regime: full capacity, no sizing surprises
        )
        .unwrap();
    engine
        .close_position(id, &Symbol::new("NIFTY-FUT"), Rupees::new(exit))
        .unwrap();
}

#[test]
fn winning_day_splits_fees_and_rounds_down() {
    let (engine, _) = build_engine();
    let id = engine.open_account(OwnerId(1), TierId(1)).unwrap();

    // gross +6,250 on a 20% platform split: fee 1,250, net 5,000
    trade_and_close(&engine, id, dec!(100), dec!(1_000), dec!(1_062.50));
    engine.run_settlement_cycle(day());

    let record = engine.settlement().record_for(id, day()).unwrap();
    assert_eq!(record.gross_pnl.value(), dec!(6_250));
    assert_eq!(record.fees.value(), dec!(1_250));
    assert_eq!(record.net_pnl.value(), dec!(5_000));

    // pre-round 1,05,000 lands on the 10,000 grid
    assert_eq!(record.closing_balance.value(), dec!(100_000));
    assert_eq!(record.rounding_adjustment.value(), dec!(5_000));

    // closing = before + net - adjustment
    assert_eq!(
        record.closing_balance.value(),
        dec!(100_000) + record.net_pnl.value() - record.rounding_adjustment.value()
    );

    assert_eq!(engine.account(id).unwrap().capital_current().value(), dec!(100_000));
    assert_eq!(engine.settlement().holding_buffer().value(), dec!(5_000));
}

#[test]
fn losing_day_pays_no_platform_fee() {
    let (engine, _) = build_engine();
    let id = engine.open_account(OwnerId(1), TierId(1)).unwrap();

    trade_and_close(&engine, id, dec!(100), dec!(1_000), dec!(970));
    engine.run_settlement_cycle(day());

    let record = engine.settlement().record_for(id, day()).unwrap();
    assert_eq!(record.gross_pnl.value(), dec!(-3_000));
    assert_eq!(record.fees.value(), dec!(0));
    assert_eq!(record.closing_balance.value(), dec!(97_000));
    assert_eq!(record.rounding_adjustment.value(), dec!(0));
}

#[test]
fn replayed_record_is_byte_identical() {
    let (engine, _) = build_engine();
    let id = engine.open_account(OwnerId(1), TierId(1)).unwrap();
    trade_and_close(&engine, id, dec!(100), dec!(1_000), dec!(1_062.50));

    engine.run_settlement_cycle(day());
    let first = engine.settlement().record_for(id, day()).unwrap();

    engine.run_settlement_cycle(day());
    let second = engine.settlement().record_for(id, day()).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}

#[test]
fn each_day_gets_its_own_record() {
    let (engine, _) = build_engine();
    let id = engine.open_account(OwnerId(1), TierId(1)).unwrap();

    trade_and_close(&engine, id, dec!(10), dec!(1_000), dec!(1_100));
    engine.run_settlement_cycle(day());

    let next_day = NaiveDate::from_ymd_opt(2024, 4, 16).unwrap();
    trade_and_close(&engine, id, dec!(10), dec!(1_000), dec!(900));
    let cycle = engine.run_settlement_cycle(next_day);
    assert_eq!(cycle.settled, 1);

    let first = engine.settlement().record_for(id, day()).unwrap();
    let second = engine.settlement().record_for(id, next_day).unwrap();
    assert_eq!(first.gross_pnl.value(), dec!(1_000));
    assert_eq!(second.gross_pnl.value(), dec!(-1_000));
}

#[test]
fn audit_outage_leaves_no_partial_settlement() {
    let (engine, sink) = build_engine();
    let id = engine.open_account(OwnerId(1), TierId(1)).unwrap();
    trade_and_close(&engine, id, dec!(100), dec!(1_000), dec!(1_062.50));

    let entries_before = sink.len();
    sink.set_available(false);
    let cycle = engine.run_settlement_cycle(day());
    assert_eq!(cycle.failures.len(), 1);

    // nothing committed anywhere
    assert!(engine.settlement().record_for(id, day()).is_none());
    assert_eq!(engine.account(id).unwrap().capital_current().value(), dec!(100_000));
    assert_eq!(engine.account(id).unwrap().closed_today().len(), 1);
    assert_eq!(engine.settlement().holding_buffer().value(), dec!(0));
    assert_eq!(sink.len(), entries_before);

    // wholesale retry once the sink recovers
    sink.set_available(true);
    let retry = engine.run_settlement_cycle(day());
    assert_eq!(retry.settled, 1);
    assert_eq!(engine.account(id).unwrap().capital_current().value(), dec!(100_000));
}

#[test]
fn holding_buffer_accumulates_across_accounts() {
    let (engine, _) = build_engine();

    let mut expected_total = Rupees::zero();
    let mut capital_before = Rupees::zero();
    let mut net_total = Rupees::zero();

    for owner in 1..=5u64 {
        let id = engine.open_account(OwnerId(owner), TierId(1)).unwrap();
        capital_before = capital_before.add(engine.account(id).unwrap().capital_current());
        // gross +7,500 each: fee 1,500, net +6,000, pre-round 1,06,000
        trade_and_close(&engine, id, dec!(100), dec!(1_000), dec!(1_075));
    }

    engine.run_settlement_cycle(day());

    let mut closing_total = Rupees::zero();
    for owner in 1..=5u64 {
        let id = AccountId(owner);
        let record = engine.settlement().record_for(id, day()).unwrap();
        closing_total = closing_total.add(record.closing_balance);
        net_total = net_total.add(record.net_pnl);
        expected_total = expected_total.add(record.rounding_adjustment);
        assert_eq!(record.rounding_adjustment.value(), dec!(6_000));
    }

    assert_eq!(engine.settlement().holding_buffer(), expected_total);
    // conservation: what entered minus fees equals closing plus held-back
    assert_eq!(
        closing_total.add(engine.settlement().holding_buffer()),
        capital_before.add(net_total)
    );
}

#[test]
fn flat_account_settles_to_unchanged_capital() {
    let (engine, _) = build_engine();
    let id = engine.open_account(OwnerId(1), TierId(1)).unwrap();

    let cycle = engine.run_settlement_cycle(day());
    assert_eq!(cycle.settled, 1);

    let record = engine.settlement().record_for(id, day()).unwrap();
    assert_eq!(record.gross_pnl.value(), dec!(0));
    assert_eq!(record.closing_balance.value(), dec!(100_000));
}
