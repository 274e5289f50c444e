// 12.1 engine/core.rs: engine state, account lifecycle, admin operations.

use super::results::EngineError;
use crate::account::{Account, AccountStatus};
use crate::audit::{AuditEntry, AuditSink};
use crate::compliance::ComplianceGate;
use crate::config::EngineConfig;
use crate::events::{
    Event, EventId, EventPayload, Notifier, StatusChangedEvent, TierMovedEvent,
};
use crate::position::ClosedPosition;
use crate::progression::CapitalProgressionTracker;
use crate::settlement::SettlementEngine;
use crate::transfer::{FundTransferOrchestrator, PaymentRail, TransferRequest};
use crate::types::{AccountId, OwnerId, RequestId, Rupees, Symbol, TierId, Timestamp};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

/// Central coordinator. All account state lives behind per-account mutexes so
/// operations on one account serialize while different accounts proceed in
/// parallel.
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) gate: ComplianceGate,
    pub(super) progression: CapitalProgressionTracker,
    pub(super) accounts: RwLock<HashMap<AccountId, Arc<Mutex<Account>>>>,
    pub(super) transfers: Mutex<HashMap<RequestId, TransferRequest>>,
    pub(super) orchestrator: FundTransferOrchestrator,
    pub(super) settlement: SettlementEngine,
    pub(super) audit: Arc<dyn AuditSink>,
    pub(super) notifier: Arc<dyn Notifier>,
    pub(super) next_account_id: AtomicU64,
    pub(super) next_request_id: AtomicU64,
    pub(super) next_event_id: AtomicU64,
    pub(super) clock: AtomicI64,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        rails: Vec<Arc<dyn PaymentRail>>,
        audit: Arc<dyn AuditSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let gate = ComplianceGate::new(config.limits.clone());
        let orchestrator = FundTransferOrchestrator::new(rails, config.rails.clone());
        let settlement = SettlementEngine::new(config.rounding.clone(), audit.clone());

        Self {
            config,
            gate,
            progression: CapitalProgressionTracker::new(),
            accounts: RwLock::new(HashMap::new()),
            transfers: Mutex::new(HashMap::new()),
            orchestrator,
            settlement,
            audit,
            notifier,
            next_account_id: AtomicU64::new(1),
            next_request_id: AtomicU64::new(1),
            next_event_id: AtomicU64::new(1),
            clock: AtomicI64::new(0),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn settlement(&self) -> &SettlementEngine {
        &self.settlement
    }

    pub fn set_time(&self, timestamp: Timestamp) {
        self.clock.store(timestamp.as_millis(), Ordering::SeqCst);
    }

    pub fn time(&self) -> Timestamp {
        Timestamp::from_millis(self.clock.load(Ordering::SeqCst))
    }

    pub fn advance_time(&self, millis: i64) {
        self.clock.fetch_add(millis, Ordering::SeqCst);
    }

    // -- account lifecycle ---------------------------------------------------

    /// Open an account on a tier, seeded with the tier's capital floor.
    /// Refused when the tier's account slots are exhausted.
    pub fn open_account(&self, owner_id: OwnerId, tier_id: TierId) -> Result<AccountId, EngineError> {
        let tier = self.config.tiers.get(tier_id)?;

        let mut accounts = self.accounts.write();
        let on_tier = accounts
            .values()
            .filter(|a| a.lock().tier_id == tier_id)
            .count();
        if on_tier >= tier.max_accounts {
            return Err(EngineError::TierFull {
                tier_id,
                max_accounts: tier.max_accounts,
            });
        }

        let id = AccountId(self.next_account_id.fetch_add(1, Ordering::SeqCst));
        let account = Account::new(id, owner_id, tier_id, tier.initial_capital, self.time());
        accounts.insert(id, Arc::new(Mutex::new(account)));

        tracing::info!(account_id = id.0, tier_id = tier_id.0, "account opened");
        Ok(id)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.read().len()
    }

    /// Read a snapshot of an account's state.
    pub fn account(&self, account_id: AccountId) -> Result<Account, EngineError> {
        let handle = self.account_handle(account_id)?;
        let snapshot = handle.lock().clone();
        Ok(snapshot)
    }

    pub(super) fn account_handle(
        &self,
        account_id: AccountId,
    ) -> Result<Arc<Mutex<Account>>, EngineError> {
        self.accounts
            .read()
            .get(&account_id)
            .cloned()
            .ok_or(EngineError::AccountNotFound(account_id))
    }

    // -- admin ---------------------------------------------------------------

    pub fn pause_account(&self, account_id: AccountId) -> Result<(), EngineError> {
        let handle = self.account_handle(account_id)?;
        let mut account = handle.lock();
        let from = account.status;
        account.pause()?;
        self.commit_status_change(&mut account, from)
    }

    pub fn resume_account(&self, account_id: AccountId) -> Result<(), EngineError> {
        let handle = self.account_handle(account_id)?;
        let mut account = handle.lock();
        let from = account.status;
        account.resume()?;
        self.commit_status_change(&mut account, from)
    }

    /// Clear a breach after the book has been flattened.
    pub fn clear_breach(&self, account_id: AccountId) -> Result<(), EngineError> {
        let handle = self.account_handle(account_id)?;
        let mut account = handle.lock();
        let from = account.status;
        account.clear_breach()?;
        self.commit_status_change(&mut account, from)
    }

    /// Close every open position at the supplied prices. The realized P&L
    /// lands in the day log and flows through the next settlement.
    pub fn flatten_account(
        &self,
        account_id: AccountId,
        exit_price_for: impl Fn(&Symbol) -> Rupees,
    ) -> Result<Vec<ClosedPosition>, EngineError> {
        let handle = self.account_handle(account_id)?;
        let mut account = handle.lock();
        let flattened = account.flatten_all(exit_price_for, self.time());

        for closed in &flattened {
            self.audit.append(AuditEntry::PositionClosed {
                account_id,
                symbol: closed.symbol.clone(),
                realized_pnl: closed.realized_pnl,
            })?;
        }

        tracing::info!(account_id = account_id.0, closed = flattened.len(), "account flattened");
        Ok(flattened)
    }

    /// Operator-driven demotion to the tier directly below. `operator_ref`
    /// names who ordered it and lands in the audit trail.
    pub fn demote_tier(
        &self,
        account_id: AccountId,
        operator_ref: &str,
    ) -> Result<TierId, EngineError> {
        let handle = self.account_handle(account_id)?;
        let mut account = handle.lock();

        let eval = self.progression.demote(&account, &self.config.tiers)?;
        self.audit.append(AuditEntry::TierChanged {
            account_id,
            from: eval.from,
            to: eval.to,
            operator_ref: operator_ref.to_string(),
        })?;
        account.tier_id = eval.to;

        self.emit(EventPayload::TierDemoted(TierMovedEvent {
            account_id,
            from: eval.from,
            to: eval.to,
        }));
        tracing::warn!(
            account_id = account_id.0,
            from = eval.from.0,
            to = eval.to.0,
            operator_ref,
            "tier demoted"
        );
        Ok(eval.to)
    }

    // -- internals -----------------------------------------------------------

    /// Audit-then-notify for a status transition already applied to the
    /// account. Reverts the transition when the sink refuses the entry.
    pub(super) fn commit_status_change(
        &self,
        account: &mut Account,
        from: AccountStatus,
    ) -> Result<(), EngineError> {
        let to = account.status;
        if let Err(e) = self.audit.append(AuditEntry::StatusChanged {
            account_id: account.id,
            from,
            to,
        }) {
            account.status = from;
            return Err(e.into());
        }

        self.emit(EventPayload::StatusChanged(StatusChangedEvent {
            account_id: account.id,
            from,
            to,
        }));
        tracing::info!(account_id = account.id.0, %from, %to, "status changed");
        Ok(())
    }

    pub(super) fn emit(&self, payload: EventPayload) {
        let event = Event::new(
            EventId(self.next_event_id.fetch_add(1, Ordering::SeqCst)),
            self.time(),
            payload,
        );
        self.notifier.notify(event);
    }
}
