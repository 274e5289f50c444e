// 12.3 engine/transfers.rs: fund movement between an account's engine capital
// and its linked cash account. pushes are validated against capital up front
// and debited only for what actually routed; pulls credit what arrived.
// requests live in the engine so a partial route can be retried later within
// the daily budget.

use super::core::Engine;
use super::results::{EngineError, TransferResult};
use crate::account::{AccountError, AccountStatus};
use crate::audit::AuditEntry;
use crate::events::{EventPayload, TransferRoutedEvent};
use crate::transfer::{CashAccountRef, Direction, TransferRequest};
use crate::types::{AccountId, RequestId, Rupees};
use std::sync::atomic::Ordering;

impl Engine {
    /// Create and route a transfer request.
    ///
    /// Push requires an active account with enough capital to cover the full
    /// amount. Pull is allowed for active and paused accounts; a breached
    /// account moves no funds in either direction.
    pub fn request_transfer(
        &self,
        account_id: AccountId,
        direction: Direction,
        amount: Rupees,
        endpoint: CashAccountRef,
    ) -> Result<TransferResult, EngineError> {
        let handle = self.account_handle(account_id)?;
        let mut account = handle.lock();

        match direction {
            Direction::Push => {
                if account.status != AccountStatus::Active {
                    return Err(AccountError::NotActive(account.status).into());
                }
                if amount > account.capital_current() {
                    return Err(AccountError::InsufficientCapital {
                        requested: amount,
                        available: account.capital_current(),
                    }
                    .into());
                }
            }
            Direction::Pull => {
                if account.status == AccountStatus::Breached {
                    return Err(AccountError::NotActive(account.status).into());
                }
            }
        }

        let request_id = RequestId(self.next_request_id.fetch_add(1, Ordering::SeqCst));
        let mut request = TransferRequest::new(request_id, account_id, direction, amount, endpoint);

        let status = self.orchestrator.route(&mut request)?;
        let routed = request.routed_amount();

        match direction {
            Direction::Push => account.debit(routed)?,
            Direction::Pull => account.credit(routed),
        }

        self.audit.append(AuditEntry::TransferRouted {
            request_id,
            account_id,
            direction,
            amount,
            routed,
            status,
        })?;
        self.emit(EventPayload::TransferRouted(TransferRoutedEvent {
            request_id,
            account_id,
            direction,
            amount,
            routed,
            status,
        }));

        let result = TransferResult {
            request_id,
            status,
            routed_amount: routed,
            remainder: request.remainder(),
        };
        self.transfers.lock().insert(request_id, request);

        tracing::info!(
            request_id = request_id.0,
            account_id = account_id.0,
            ?direction,
            amount = %amount,
            routed = %routed,
            ?status,
            "transfer routed"
        );
        Ok(result)
    }

    /// Re-route an unfinished request. Only the delta moved this round is
    /// applied to capital.
    pub fn retry_transfer(&self, request_id: RequestId) -> Result<TransferResult, EngineError> {
        let account_id = self
            .transfers
            .lock()
            .get(&request_id)
            .map(|r| r.account_id)
            .ok_or(EngineError::TransferNotFound(request_id))?;

        let handle = self.account_handle(account_id)?;
        let mut account = handle.lock();

        // the request is read and written back under the account lock, so
        // concurrent retries serialize and each round starts from the prior
        // round's attempt log, never a stale snapshot of the remainder
        let mut request = self
            .transfers
            .lock()
            .get(&request_id)
            .cloned()
            .ok_or(EngineError::TransferNotFound(request_id))?;

        let routed_before = request.routed_amount();
        let status = self.orchestrator.route(&mut request)?;
        let delta = request.routed_amount().sub(routed_before);

        match request.direction {
            Direction::Push => account.debit(delta)?,
            Direction::Pull => account.credit(delta),
        }

        self.audit.append(AuditEntry::TransferRouted {
            request_id,
            account_id: request.account_id,
            direction: request.direction,
            amount: request.amount,
            routed: request.routed_amount(),
            status,
        })?;
        self.emit(EventPayload::TransferRouted(TransferRoutedEvent {
            request_id,
            account_id: request.account_id,
            direction: request.direction,
            amount: request.amount,
            routed: request.routed_amount(),
            status,
        }));

        let result = TransferResult {
            request_id,
            status,
            routed_amount: request.routed_amount(),
            remainder: request.remainder(),
        };
        self.transfers.lock().insert(request_id, request);
        Ok(result)
    }

    pub fn transfer(&self, request_id: RequestId) -> Option<TransferRequest> {
        self.transfers.lock().get(&request_id).cloned()
    }
}
