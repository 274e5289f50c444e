//! End-of-day settlement: net P&L, rounding-by-subtraction, ledger record.
//!
//! Settlement computes gross P&L from the day's closed positions, takes the
//! platform fee from the tier split, then rounds the closing balance DOWN to
//! the unit appropriate to its magnitude. The subtracted remainder stays in
//! the settlement holding account — recorded, never transferred out in that
//! cycle, never dropped. One record per (account, day): a replayed call
//! returns the stored record unchanged, which also covers crash recovery
//! (re-check before recompute). A record is only committed after the audit
//! sink acks; an unavailable sink fails the cycle for that account.

use crate::account::Account;
use crate::audit::{AuditEntry, AuditRef, AuditSink, AuditSinkUnavailable};
use crate::tier::Tier;
use crate::types::{AccountId, Rupees};
use chrono::NaiveDate;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Round down to `unit` once the balance reaches `threshold`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundingRule {
    pub threshold: Rupees,
    pub unit: Rupees,
}

/// Magnitude-dependent rounding table, ordered ascending by threshold.
/// Below the lowest threshold the balance is left untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundingSchedule {
    rules: Vec<RoundingRule>,
}

impl RoundingSchedule {
    pub fn new(mut rules: Vec<RoundingRule>) -> Self {
        rules.sort_by_key(|r| r.threshold);
        Self { rules }
    }

    /// Production table: nearest ₹10,000 at ≥₹1,00,000; nearest ₹1,00,000 at
    /// ≥₹10,00,000; nearest ₹10,00,000 at ≥₹1,00,00,000.
    pub fn standard() -> Self {
        Self::new(vec![
            RoundingRule {
                threshold: Rupees::new(dec!(100_000)),
                unit: Rupees::new(dec!(10_000)),
            },
            RoundingRule {
                threshold: Rupees::new(dec!(1_000_000)),
                unit: Rupees::new(dec!(100_000)),
            },
            RoundingRule {
                threshold: Rupees::new(dec!(10_000_000)),
                unit: Rupees::new(dec!(1_000_000)),
            },
        ])
    }

    pub fn rules(&self) -> &[RoundingRule] {
        &self.rules
    }

    /// Rounding-by-subtraction: returns (rounded balance, subtracted
    /// remainder). Never rounds up; adjustment is always in [0, unit).
    pub fn round_down(&self, balance: Rupees) -> (Rupees, Rupees) {
        let rule = self
            .rules
            .iter()
            .rev()
            .find(|r| balance >= r.threshold);

        match rule {
            Some(rule) => {
                let unit = rule.unit.value();
                let rounded = (balance.value() / unit).floor() * unit;
                let rounded = Rupees::new(rounded);
                (rounded, balance.sub(rounded))
            }
            None => (balance, Rupees::zero()),
        }
    }
}

/// The demat-side holding account where rounding remainders and the
/// operational buffer accumulate. Deliberately NOT a rail endpoint: there is
/// no conversion from this type to `transfer::CashAccountRef`, so the
/// orchestrator cannot be asked to move funds directly in or out of it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettlementAccount {
    buffer: Rupees,
}

impl SettlementAccount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retain(&mut self, amount: Rupees) {
        self.buffer = self.buffer.add(amount);
    }

    pub fn buffer(&self) -> Rupees {
        self.buffer
    }
}

/// Ledger-ready settlement record. Immutable once acked by the audit sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub account_id: AccountId,
    pub date: NaiveDate,
    pub gross_pnl: Rupees,
    pub fees: Rupees,
    pub net_pnl: Rupees,
    pub rounding_adjustment: Rupees,
    pub closing_balance: Rupees,
    pub audit_ref: AuditRef,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SettlementError {
    #[error(transparent)]
    Audit(#[from] AuditSinkUnavailable),

    #[error("Account {account_id:?} closing balance would be negative (shortfall {shortfall})")]
    NegativeClosing {
        account_id: AccountId,
        shortfall: Rupees,
    },
}

/// Outcome of a settle call. `replayed` marks an idempotent return of an
/// existing record rather than a fresh computation.
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    pub record: SettlementRecord,
    pub replayed: bool,
}

pub struct SettlementEngine {
    rounding: RoundingSchedule,
    audit: Arc<dyn AuditSink>,
    records: RwLock<HashMap<(AccountId, NaiveDate), SettlementRecord>>,
    holding: Mutex<SettlementAccount>,
}

impl SettlementEngine {
    pub fn new(rounding: RoundingSchedule, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            rounding,
            audit,
            records: RwLock::new(HashMap::new()),
            holding: Mutex::new(SettlementAccount::new()),
        }
    }

    pub fn holding_buffer(&self) -> Rupees {
        self.holding.lock().buffer()
    }

    pub fn record_for(&self, account_id: AccountId, day: NaiveDate) -> Option<SettlementRecord> {
        self.records.read().get(&(account_id, day)).cloned()
    }

    /// Settle one account for one trading day.
    ///
    /// The caller holds the account's lock for the duration, which gives the
    /// single-writer guarantee for the (account, day) record. Nothing is
    /// committed — no capital change, no holding retention, no record —
    /// unless the audit sink acks.
    pub fn settle(
        &self,
        account: &mut Account,
        tier: &Tier,
        day: NaiveDate,
    ) -> Result<SettlementOutcome, SettlementError> {
        // replay / crash-recovery check before any computation
        if let Some(existing) = self.records.read().get(&(account.id, day)) {
            return Ok(SettlementOutcome {
                record: existing.clone(),
                replayed: true,
            });
        }

        let capital_before = account.capital_current();
        let gross_pnl: Rupees = account
            .closed_today()
            .iter()
            .map(|c| c.realized_pnl)
            .sum();

        // platform fee only on positive gross; a losing day carries no fee
        let fees = if gross_pnl.value() > Decimal::ZERO {
            gross_pnl.mul(tier.fee_split_platform.value())
        } else {
            Rupees::zero()
        };
        let net_pnl = gross_pnl.sub(fees);

        let pre_round = capital_before.add(net_pnl);
        if pre_round.is_negative() {
            return Err(SettlementError::NegativeClosing {
                account_id: account.id,
                shortfall: pre_round.abs(),
            });
        }

        let (closing_balance, rounding_adjustment) = self.rounding.round_down(pre_round);

        let audit_ref = self.audit.append(AuditEntry::Settlement {
            account_id: account.id,
            date: day,
            gross_pnl,
            fees,
            net_pnl,
            rounding_adjustment,
            closing_balance,
        })?;

        let record = SettlementRecord {
            account_id: account.id,
            date: day,
            gross_pnl,
            fees,
            net_pnl,
            rounding_adjustment,
            closing_balance,
            audit_ref,
        };

        // ack received: commit in one pass
        account.apply_closing_balance(closing_balance);
        self.holding.lock().retain(rounding_adjustment);
        self.records
            .write()
            .insert((account.id, day), record.clone());

        tracing::info!(
            account_id = account.id.0,
            %day,
            gross = %record.gross_pnl,
            net = %record.net_pnl,
            adjustment = %record.rounding_adjustment,
            closing = %record.closing_balance,
            "settlement committed"
        );

        Ok(SettlementOutcome {
            record,
            replayed: false,
        })
    }
}
