// 9.0 audit.rs: append-only audit sink seam. the engine writes one entry per
// state-changing decision and treats the ack (an AuditRef) as the only proof
// of durability. entries are never updated or deleted once acknowledged.
// the distributed ledger behind the sink is out of scope; only append/ack
// matters here.

use crate::account::AccountStatus;
use crate::compliance::ComplianceBreach;
use crate::transfer::{Direction, TransferStatus};
use crate::types::{AccountId, RequestId, Rupees, Symbol, TierId};
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Acknowledgement handle returned by the sink. Monotonic per sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AuditRef(pub u64);

#[derive(Debug, Clone, thiserror::Error)]
#[error("Audit sink unavailable: {reason}")]
pub struct AuditSinkUnavailable {
    pub reason: String,
}

/// One entry per state-changing decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEntry {
    TradeAccepted {
        account_id: AccountId,
        symbol: Symbol,
        exposure: Rupees,
    },
    TradeRejected {
        account_id: AccountId,
        symbol: Symbol,
        breaches: Vec<ComplianceBreach>,
    },
    PositionClosed {
        account_id: AccountId,
        symbol: Symbol,
        realized_pnl: Rupees,
    },
    StatusChanged {
        account_id: AccountId,
        from: AccountStatus,
        to: AccountStatus,
    },
    TransferRouted {
        request_id: RequestId,
        account_id: AccountId,
        direction: Direction,
        amount: Rupees,
        routed: Rupees,
        status: TransferStatus,
    },
    Settlement {
        account_id: AccountId,
        date: NaiveDate,
        gross_pnl: Rupees,
        fees: Rupees,
        net_pnl: Rupees,
        rounding_adjustment: Rupees,
        closing_balance: Rupees,
    },
    TierChanged {
        account_id: AccountId,
        from: TierId,
        to: TierId,
        /// Operator reference for manual demotions; empty for promotions.
        operator_ref: String,
    },
}

/// Append-only durability collaborator.
pub trait AuditSink: Send + Sync {
    fn append(&self, entry: AuditEntry) -> Result<AuditRef, AuditSinkUnavailable>;
}

/// In-memory sink for tests and simulation. Can be switched unavailable to
/// exercise the audit-failure path, either wholesale or after a set number
/// of acks to fail mid-sequence.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    entries: Mutex<Vec<(AuditRef, AuditEntry)>>,
    unavailable: AtomicBool,
    fail_after: Mutex<Option<usize>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Refuse appends once `acks` entries have been acknowledged. `None`
    /// lifts the limit.
    pub fn fail_after(&self, acks: Option<usize>) {
        *self.fail_after.lock() = acks;
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<(AuditRef, AuditEntry)> {
        self.entries.lock().clone()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn append(&self, entry: AuditEntry) -> Result<AuditRef, AuditSinkUnavailable> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuditSinkUnavailable {
                reason: "sink offline".to_string(),
            });
        }
        let mut entries = self.entries.lock();
        if let Some(limit) = *self.fail_after.lock() {
            if entries.len() >= limit {
                return Err(AuditSinkUnavailable {
                    reason: "sink offline".to_string(),
                });
            }
        }
        let audit_ref = AuditRef(entries.len() as u64 + 1);
        entries.push((audit_ref, entry));
        Ok(audit_ref)
    }
}
