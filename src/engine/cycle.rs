// 12.4 engine/cycle.rs: end-of-day settlement cycle. accounts settle in
// parallel — each holds only its own lock and the settlement store handles
// its own synchronization. tier progression runs right after each fresh
// settlement, while the closing balance is current. a re-run of the same day
// replays stored records and moves nothing.

use super::core::Engine;
use super::results::{CycleResult, EngineError};
use crate::account::Account;
use crate::audit::AuditEntry;
use crate::events::{EventPayload, SettlementCompletedEvent, TierMovedEvent};
use crate::types::{AccountId, TierId};
use chrono::NaiveDate;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::sync::Arc;

impl Engine {
    /// Settle every account for the given trading day.
    ///
    /// Per-account failures are collected, not fatal: one account with an
    /// audit hiccup must not hold up the rest of the book. The failed
    /// accounts can be re-settled by running the cycle again — settled
    /// accounts replay, failed ones retry wholesale.
    pub fn run_settlement_cycle(&self, day: NaiveDate) -> CycleResult {
        let mut handles: Vec<(AccountId, Arc<Mutex<Account>>)> = self
            .accounts
            .read()
            .iter()
            .map(|(id, handle)| (*id, handle.clone()))
            .collect();
        handles.sort_by_key(|(id, _)| id.0);

        tracing::info!(%day, accounts = handles.len(), "settlement cycle started");

        let outcomes: Vec<(AccountId, Result<AccountCycleOutcome, EngineError>)> = handles
            .par_iter()
            .map(|(id, handle)| (*id, self.settle_one(*id, handle, day)))
            .collect();

        let mut result = CycleResult::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(o) => {
                    if o.replayed {
                        result.replayed += 1;
                    } else {
                        result.settled += 1;
                    }
                    if let Some((from, to)) = o.promotion {
                        result.promotions.push((id, from, to));
                    }
                }
                Err(e) => result.failures.push((id, e.to_string())),
            }
        }

        tracing::info!(
            %day,
            settled = result.settled,
            replayed = result.replayed,
            promoted = result.promotions.len(),
            failed = result.failures.len(),
            "settlement cycle finished"
        );
        result
    }

    fn settle_one(
        &self,
        account_id: AccountId,
        handle: &Arc<Mutex<Account>>,
        day: NaiveDate,
    ) -> Result<AccountCycleOutcome, EngineError> {
        let mut account = handle.lock();
        let tier = self.config.tiers.get(account.tier_id)?;
        let outcome = self.settlement.settle(&mut account, tier, day)?;

        if !outcome.replayed {
            self.emit(EventPayload::SettlementCompleted(SettlementCompletedEvent {
                account_id,
                date: day,
                net_pnl: outcome.record.net_pnl,
                closing_balance: outcome.record.closing_balance,
            }));
        }

        // progression runs on replays too: a promotion whose audit append
        // failed after the settlement committed is picked up on the rerun
        let eval = self.progression.evaluate(&account, &self.config.tiers)?;
        let mut promotion = None;
        if eval.promoted() {
            self.audit.append(AuditEntry::TierChanged {
                account_id,
                from: eval.from,
                to: eval.to,
                operator_ref: String::new(),
            })?;
            account.tier_id = eval.to;
            self.emit(EventPayload::TierPromoted(TierMovedEvent {
                account_id,
                from: eval.from,
                to: eval.to,
            }));
            tracing::info!(
                account_id = account_id.0,
                from = eval.from.0,
                to = eval.to.0,
                "tier promoted"
            );
            promotion = Some((eval.from, eval.to));
        }

        Ok(AccountCycleOutcome {
            replayed: outcome.replayed,
            promotion,
        })
    }
}

struct AccountCycleOutcome {
    replayed: bool,
    promotion: Option<(TierId, TierId)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryAuditSink;
    use crate::config::EngineConfig;
    use crate::engine::TradeIntent;
    use crate::events::EventCollector;
    use crate::types::{Lots, OwnerId, Rupees, Symbol};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn engine() -> (Engine, Arc<InMemoryAuditSink>, Arc<EventCollector>) {
        let sink = Arc::new(InMemoryAuditSink::new());
        let collector = Arc::new(EventCollector::new());
        let engine = Engine::new(
            EngineConfig::standard().unwrap(),
            vec![],
            sink.clone(),
            collector.clone(),
        );
        (engine, sink, collector)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 15).unwrap()
    }

    fn trade_and_close(engine: &Engine, id: AccountId, entry: rust_decimal::Decimal, exit: rust_decimal::Decimal) {
        engine
            .submit_trade(
                id,
                TradeIntent {
                    symbol: Symbol::new("NIFTY-FUT"),
                    quantity: dec!(100),
                    price: Rupees::new(entry),
                    lots: Lots(10),
                },
                dec!(10),
            )
            .unwrap();
        engine
            .close_position(id, &Symbol::new("NIFTY-FUT"), Rupees::new(exit))
            .unwrap();
    }

    #[test]
    fn cycle_settles_every_account() {
        let (engine, _, _) = engine();
        let a = engine.open_account(OwnerId(1), TierId(1)).unwrap();
        let b = engine.open_account(OwnerId(2), TierId(1)).unwrap();
        trade_and_close(&engine, a, dec!(1_000), dec!(1_050));
        trade_and_close(&engine, b, dec!(1_000), dec!(980));

        let result = engine.run_settlement_cycle(day());
        assert_eq!(result.settled, 2);
        assert_eq!(result.replayed, 0);
        assert!(result.failures.is_empty());

        // a: gross 5,000, fee 1,000, net 4,000 -> 1,04,000 rounds to 1,00,000
        assert_eq!(
            engine.account(a).unwrap().capital_current().value(),
            dec!(100_000)
        );
        // b: gross -2,000, no fee -> 98,000, below rounding threshold
        assert_eq!(
            engine.account(b).unwrap().capital_current().value(),
            dec!(98_000)
        );
    }

    #[test]
    fn rerun_replays_without_moving_funds() {
        let (engine, sink, _) = engine();
        let id = engine.open_account(OwnerId(1), TierId(1)).unwrap();
        trade_and_close(&engine, id, dec!(1_000), dec!(1_050));

        engine.run_settlement_cycle(day());
        let entries_after_first = sink.len();
        let capital_after_first = engine.account(id).unwrap().capital_current();

        let rerun = engine.run_settlement_cycle(day());
        assert_eq!(rerun.settled, 0);
        assert_eq!(rerun.replayed, 1);
        assert_eq!(sink.len(), entries_after_first);
        assert_eq!(engine.account(id).unwrap().capital_current(), capital_after_first);
    }

    #[test]
    fn promotion_follows_profitable_settlement() {
        let (engine, sink, collector) = engine();
        let id = engine.open_account(OwnerId(1), TierId(1)).unwrap();

        // big win: gross 2,00,000, fee 40,000, net 1,60,000 -> 2,60,000
        // rounds down to 2,60,000 (nearest 10,000), above tier 1's 2,50,000
        // graduation point
        trade_and_close(&engine, id, dec!(1_000), dec!(3_000));

        let result = engine.run_settlement_cycle(day());
        assert_eq!(result.promotions, vec![(id, TierId(1), TierId(2))]);
        assert_eq!(engine.account(id).unwrap().tier_id, TierId(2));

        assert!(collector
            .events()
            .iter()
            .any(|e| matches!(e.payload, EventPayload::TierPromoted(_))));
        assert!(sink
            .entries()
            .iter()
            .any(|(_, e)| matches!(e, AuditEntry::TierChanged { .. })));
    }

    #[test]
    fn audit_outage_fails_cycle_then_recovers() {
        let (engine, sink, _) = engine();
        let id = engine.open_account(OwnerId(1), TierId(1)).unwrap();
        trade_and_close(&engine, id, dec!(1_000), dec!(1_050));
        sink.set_available(false);

        let result = engine.run_settlement_cycle(day());
        assert_eq!(result.failures.len(), 1);
        assert_eq!(
            engine.account(id).unwrap().capital_current().value(),
            dec!(100_000)
        );
        assert_eq!(engine.account(id).unwrap().closed_today().len(), 1);

        sink.set_available(true);
        let retry = engine.run_settlement_cycle(day());
        assert_eq!(retry.settled, 1);
        assert!(retry.failures.is_empty());
    }

    #[test]
    fn promotion_survives_audit_failure_after_settlement_commits() {
        let (engine, sink, _) = engine();
        let id = engine.open_account(OwnerId(1), TierId(1)).unwrap();
        trade_and_close(&engine, id, dec!(1_000), dec!(3_000));

        // two entries exist (trade, close). the third ack is the settlement;
        // the tier-change append right after it is refused.
        sink.fail_after(Some(3));
        let result = engine.run_settlement_cycle(day());
        assert_eq!(result.failures.len(), 1);
        assert!(result.promotions.is_empty());

        // settlement committed before the outage, the promotion did not
        assert!(engine.settlement().record_for(id, day()).is_some());
        assert_eq!(engine.account(id).unwrap().tier_id, TierId(1));

        sink.fail_after(None);
        let rerun = engine.run_settlement_cycle(day());
        assert_eq!(rerun.replayed, 1);
        assert_eq!(rerun.promotions, vec![(id, TierId(1), TierId(2))]);
        assert_eq!(engine.account(id).unwrap().tier_id, TierId(2));
    }

    #[test]
    fn paused_account_settles_but_does_not_promote() {
        let (engine, _, _) = engine();
        let id = engine.open_account(OwnerId(1), TierId(1)).unwrap();
        trade_and_close(&engine, id, dec!(1_000), dec!(3_000));
        engine.pause_account(id).unwrap();

        let result = engine.run_settlement_cycle(day());
        assert_eq!(result.settled, 1);
        assert!(result.promotions.is_empty());
        assert_eq!(engine.account(id).unwrap().tier_id, TierId(1));
    }
}
