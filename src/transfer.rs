// 6.0 transfer.rs: multi-rail fund movement. push/pull routing under per-rail
// daily caps, sequential attempts, capped retry rounds.
//
// endpoints are CashAccountRef only. settlement holding (demat) accounts have
// their own type in settlement.rs with no conversion to CashAccountRef, so a
// demat account can never be named as a rail endpoint. the rule is enforced
// by the type system, not a runtime check.

use crate::types::{AccountId, RequestId, Rupees};
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Engine pays out to the user's linked cash account.
    Push,
    /// Engine draws funds in from the user's linked cash account.
    Pull,
}

/// A user's linked cash/bank account. The only endpoint type rails accept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CashAccountRef(pub String);

/// Outcome of a single rail attempt. Timeouts are terminal for the attempt;
/// the orchestrator moves to the next rail rather than waiting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RailOutcome {
    Success { amount_moved: Rupees },
    Failed { reason: String },
    TimedOut,
}

impl RailOutcome {
    pub fn amount_moved(&self) -> Rupees {
        match self {
            RailOutcome::Success { amount_moved } => *amount_moved,
            _ => Rupees::zero(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RailAttempt {
    pub rail_name: String,
    pub amount_attempted: Rupees,
    pub outcome: RailOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Completed,
    PartiallyRouted,
    Failed,
}

/// One fund movement request. Terminal once fully routed or failed; a
/// partially routed request may be re-routed within the daily retry budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub request_id: RequestId,
    pub account_id: AccountId,
    pub direction: Direction,
    pub amount: Rupees,
    pub endpoint: CashAccountRef,
    pub rail_attempts: Vec<RailAttempt>,
    pub status: TransferStatus,
    /// Routing rounds consumed today.
    pub retry_rounds: u32,
}

impl TransferRequest {
    pub fn new(
        request_id: RequestId,
        account_id: AccountId,
        direction: Direction,
        amount: Rupees,
        endpoint: CashAccountRef,
    ) -> Self {
        Self {
            request_id,
            account_id,
            direction,
            amount,
            endpoint,
            rail_attempts: Vec::new(),
            status: TransferStatus::Pending,
            retry_rounds: 0,
        }
    }

    /// Total successfully moved across all attempts.
    pub fn routed_amount(&self) -> Rupees {
        self.rail_attempts
            .iter()
            .map(|a| a.outcome.amount_moved())
            .sum()
    }

    /// Total successfully moved through one named rail across all rounds.
    pub fn routed_via(&self, rail_name: &str) -> Rupees {
        self.rail_attempts
            .iter()
            .filter(|a| a.rail_name == rail_name)
            .map(|a| a.outcome.amount_moved())
            .sum()
    }

    pub fn remainder(&self) -> Rupees {
        self.amount.sub(self.routed_amount())
    }

    /// Fully routed. Failed and partially routed requests may be re-routed
    /// until the daily retry budget is spent.
    pub fn is_terminal(&self) -> bool {
        self.status == TransferStatus::Completed
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransferError {
    #[error("Transfer amount must be positive, got {0}")]
    InvalidAmount(Rupees),

    #[error("Request {0:?} is terminal and cannot be re-routed")]
    AlreadyTerminal(RequestId),

    #[error("Request {request_id:?} exhausted its retry budget ({rounds} rounds today)")]
    RetryBudgetExhausted { request_id: RequestId, rounds: u32 },

    #[error("No payment rails configured")]
    NoRailsConfigured,
}

/// Payment rail collaborator. Implementations must be idempotent per
/// `(request_id, rail_name)` so a retried attempt cannot double-move funds,
/// and must bound their own latency, reporting `TimedOut` instead of hanging.
pub trait PaymentRail: Send + Sync {
    fn name(&self) -> &str;

    fn attempt_transfer(
        &self,
        request_id: RequestId,
        endpoint: &CashAccountRef,
        amount: Rupees,
    ) -> RailOutcome;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RailConfig {
    /// Per-rail daily cap applied to push amounts. Pulls are uncapped.
    pub single_rail_daily_cap: Rupees,
    /// Routing rounds permitted per request per day.
    pub max_retry_rounds: u32,
    /// Upper bound a rail may take before reporting TimedOut.
    pub attempt_timeout_ms: i64,
}

impl Default for RailConfig {
    fn default() -> Self {
        Self {
            single_rail_daily_cap: Rupees::new(dec!(100_000)),
            max_retry_rounds: 3,
            attempt_timeout_ms: 30_000,
        }
    }
}

/// Routes a request across an ordered rail list: primary first, then
/// fallbacks. Attempts are strictly sequential — each outcome decides whether
/// the next rail sees the remainder.
pub struct FundTransferOrchestrator {
    rails: Vec<Arc<dyn PaymentRail>>,
    config: RailConfig,
}

impl FundTransferOrchestrator {
    pub fn new(rails: Vec<Arc<dyn PaymentRail>>, config: RailConfig) -> Self {
        Self { rails, config }
    }

    pub fn config(&self) -> &RailConfig {
        &self.config
    }

    /// Route (or re-route) a request. Mutates the request's attempt log and
    /// status; returns the resulting status.
    pub fn route(&self, request: &mut TransferRequest) -> Result<TransferStatus, TransferError> {
        if self.rails.is_empty() {
            return Err(TransferError::NoRailsConfigured);
        }
        if request.amount.is_zero() || request.amount.is_negative() {
            return Err(TransferError::InvalidAmount(request.amount));
        }
        if request.is_terminal() {
            return Err(TransferError::AlreadyTerminal(request.request_id));
        }
        if request.retry_rounds >= self.config.max_retry_rounds {
            return Err(TransferError::RetryBudgetExhausted {
                request_id: request.request_id,
                rounds: request.retry_rounds,
            });
        }
        request.retry_rounds += 1;

        let mut remainder = request.remainder();

        for rail in &self.rails {
            if remainder.is_zero() {
                break;
            }

            // pulls prefer a single fast rail and carry no daily cap;
            // pushes are chunked to the per-rail cap, which holds across
            // retry rounds: what a rail carried earlier today counts
            // against its remaining headroom
            let chunk = match request.direction {
                Direction::Pull => remainder,
                Direction::Push => {
                    let headroom = self
                        .config
                        .single_rail_daily_cap
                        .sub(request.routed_via(rail.name()))
                        .max(Rupees::zero());
                    remainder.min(headroom)
                }
            };
            if chunk.is_zero() {
                // daily cap spent on this rail
                continue;
            }

            let outcome = rail.attempt_transfer(request.request_id, &request.endpoint, chunk);
            let moved = outcome.amount_moved();

            tracing::debug!(
                request_id = request.request_id.0,
                rail = rail.name(),
                attempted = %chunk,
                moved = %moved,
                "rail attempt"
            );

            request.rail_attempts.push(RailAttempt {
                rail_name: rail.name().to_string(),
                amount_attempted: chunk,
                outcome,
            });

            remainder = remainder.sub(moved);
        }

        request.status = if remainder.is_zero() {
            TransferStatus::Completed
        } else if request.routed_amount().is_zero() {
            TransferStatus::Failed
        } else {
            TransferStatus::PartiallyRouted
        };

        Ok(request.status)
    }
}

/// In-memory rail for tests and simulation. Keeps a per-request ledger so a
/// replayed attempt returns the prior outcome instead of moving funds twice.
pub struct MockRail {
    name: String,
    behavior: MockRailBehavior,
    ledger: Mutex<HashMap<RequestId, Rupees>>,
}

#[derive(Debug, Clone)]
pub enum MockRailBehavior {
    /// Move whatever is asked.
    Succeed,
    /// Move at most this much per request, succeeding partially beyond it.
    SucceedUpTo(Rupees),
    /// Refuse every attempt.
    FailWith(String),
    /// Exceed the attempt timeout every time.
    TimeOut,
}

impl MockRail {
    pub fn new(name: impl Into<String>, behavior: MockRailBehavior) -> Self {
        Self {
            name: name.into(),
            behavior,
            ledger: Mutex::new(HashMap::new()),
        }
    }

    /// Total moved for a request across all attempts on this rail.
    pub fn moved_for(&self, request_id: RequestId) -> Rupees {
        self.ledger
            .lock()
            .get(&request_id)
            .copied()
            .unwrap_or_else(Rupees::zero)
    }
}

impl PaymentRail for MockRail {
    fn name(&self) -> &str {
        &self.name
    }

    fn attempt_transfer(
        &self,
        request_id: RequestId,
        _endpoint: &CashAccountRef,
        amount: Rupees,
    ) -> RailOutcome {
        match &self.behavior {
            MockRailBehavior::Succeed => {
                let mut ledger = self.ledger.lock();
                let entry = ledger.entry(request_id).or_insert_with(Rupees::zero);
                *entry = entry.add(amount);
                RailOutcome::Success { amount_moved: amount }
            }
            MockRailBehavior::SucceedUpTo(cap) => {
                let mut ledger = self.ledger.lock();
                let entry = ledger.entry(request_id).or_insert_with(Rupees::zero);
                let headroom = cap.sub(*entry).max(Rupees::zero());
                let moved = amount.min(headroom);
                if moved.is_zero() {
                    return RailOutcome::Failed {
                        reason: "rail capacity exhausted".to_string(),
                    };
                }
                *entry = entry.add(moved);
                RailOutcome::Success { amount_moved: moved }
            }
            MockRailBehavior::FailWith(reason) => RailOutcome::Failed {
                reason: reason.clone(),
            },
            MockRailBehavior::TimeOut => RailOutcome::TimedOut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(direction: Direction, amount: rust_decimal::Decimal) -> TransferRequest {
        TransferRequest::new(
            RequestId(1),
            AccountId(1),
            direction,
            Rupees::new(amount),
            CashAccountRef("HDFC-001".to_string()),
        )
    }

    fn orchestrator(rails: Vec<Arc<dyn PaymentRail>>) -> FundTransferOrchestrator {
        FundTransferOrchestrator::new(rails, RailConfig::default())
    }

    #[test]
    fn push_above_cap_splits_across_rails() {
        // ₹1,50,000 with a ₹1,00,000 per-rail cap: primary takes 1,00,000,
        // the fallback takes the 50,000 remainder.
        let orch = orchestrator(vec![
            Arc::new(MockRail::new("IMPS", MockRailBehavior::Succeed)),
            Arc::new(MockRail::new("NEFT", MockRailBehavior::Succeed)),
        ]);

        let mut req = request(Direction::Push, dec!(150_000));
        let status = orch.route(&mut req).unwrap();

        assert_eq!(status, TransferStatus::Completed);
        assert_eq!(req.rail_attempts.len(), 2);
        assert_eq!(req.rail_attempts[0].rail_name, "IMPS");
        assert_eq!(req.rail_attempts[0].amount_attempted.value(), dec!(100_000));
        assert_eq!(req.rail_attempts[1].rail_name, "NEFT");
        assert_eq!(req.rail_attempts[1].amount_attempted.value(), dec!(50_000));
        assert_eq!(req.routed_amount().value(), dec!(150_000));
    }

    #[test]
    fn pull_is_uncapped_single_rail() {
        let orch = orchestrator(vec![
            Arc::new(MockRail::new("IMPS", MockRailBehavior::Succeed)),
            Arc::new(MockRail::new("NEFT", MockRailBehavior::Succeed)),
        ]);

        let mut req = request(Direction::Pull, dec!(400_000));
        let status = orch.route(&mut req).unwrap();

        assert_eq!(status, TransferStatus::Completed);
        assert_eq!(req.rail_attempts.len(), 1);
        assert_eq!(req.rail_attempts[0].amount_attempted.value(), dec!(400_000));
    }

    #[test]
    fn failed_rail_advances_to_next() {
        let orch = orchestrator(vec![
            Arc::new(MockRail::new("IMPS", MockRailBehavior::FailWith("maintenance".into()))),
            Arc::new(MockRail::new("NEFT", MockRailBehavior::Succeed)),
        ]);

        let mut req = request(Direction::Push, dec!(80_000));
        let status = orch.route(&mut req).unwrap();

        assert_eq!(status, TransferStatus::Completed);
        assert_eq!(req.rail_attempts.len(), 2);
        assert!(matches!(req.rail_attempts[0].outcome, RailOutcome::Failed { .. }));
        assert_eq!(req.routed_amount().value(), dec!(80_000));
    }

    #[test]
    fn timeout_counts_as_failed_attempt() {
        let orch = orchestrator(vec![
            Arc::new(MockRail::new("IMPS", MockRailBehavior::TimeOut)),
            Arc::new(MockRail::new("NEFT", MockRailBehavior::Succeed)),
        ]);

        let mut req = request(Direction::Push, dec!(50_000));
        let status = orch.route(&mut req).unwrap();

        assert_eq!(status, TransferStatus::Completed);
        assert_eq!(req.rail_attempts[0].outcome, RailOutcome::TimedOut);
    }

    #[test]
    fn exhausted_rails_leave_partial() {
        let orch = orchestrator(vec![
            Arc::new(MockRail::new("IMPS", MockRailBehavior::Succeed)),
            Arc::new(MockRail::new("NEFT", MockRailBehavior::FailWith("down".into()))),
        ]);

        // 2,50,000 push: primary moves 1,00,000 (cap), fallback refuses,
        // 1,50,000 remains.
        let mut req = request(Direction::Push, dec!(250_000));
        let status = orch.route(&mut req).unwrap();

        assert_eq!(status, TransferStatus::PartiallyRouted);
        assert_eq!(req.routed_amount().value(), dec!(100_000));
        assert_eq!(req.remainder().value(), dec!(150_000));
    }

    #[test]
    fn all_rails_down_is_failed() {
        let orch = orchestrator(vec![
            Arc::new(MockRail::new("IMPS", MockRailBehavior::FailWith("down".into()))),
            Arc::new(MockRail::new("NEFT", MockRailBehavior::TimeOut)),
        ]);

        let mut req = request(Direction::Push, dec!(50_000));
        let status = orch.route(&mut req).unwrap();
        assert_eq!(status, TransferStatus::Failed);
        assert_eq!(req.routed_amount().value(), dec!(0));
    }

    #[test]
    fn retry_resumes_from_remainder() {
        let neft = Arc::new(MockRail::new("NEFT", MockRailBehavior::FailWith("down".into())));
        let imps = Arc::new(MockRail::new("IMPS", MockRailBehavior::Succeed));
        let orch = orchestrator(vec![imps.clone(), neft]);

        let mut req = request(Direction::Push, dec!(150_000));
        assert_eq!(orch.route(&mut req).unwrap(), TransferStatus::PartiallyRouted);
        assert_eq!(req.routed_amount().value(), dec!(100_000));

        // second round works only on the remainder; the primary has spent
        // its daily cap, so only the fallback is asked again
        assert_eq!(orch.route(&mut req).unwrap(), TransferStatus::PartiallyRouted);
        assert_eq!(req.routed_amount().value(), dec!(100_000));
        assert_eq!(imps.moved_for(RequestId(1)).value(), dec!(100_000));
    }

    #[test]
    fn rail_daily_cap_holds_across_retry_rounds() {
        let imps = Arc::new(MockRail::new("IMPS", MockRailBehavior::Succeed));
        let orch = orchestrator(vec![
            imps.clone(),
            Arc::new(MockRail::new("NEFT", MockRailBehavior::FailWith("down".into()))),
        ]);

        let mut req = request(Direction::Push, dec!(250_000));
        for _ in 0..RailConfig::default().max_retry_rounds {
            let _ = orch.route(&mut req);
        }

        // every round after the first finds the primary's cap spent
        assert_eq!(req.routed_via("IMPS").value(), dec!(100_000));
        assert_eq!(imps.moved_for(RequestId(1)).value(), dec!(100_000));
        assert_eq!(req.routed_amount().value(), dec!(100_000));
        assert_eq!(req.status, TransferStatus::PartiallyRouted);
    }

    #[test]
    fn retry_budget_is_capped() {
        let orch = orchestrator(vec![Arc::new(MockRail::new(
            "IMPS",
            MockRailBehavior::FailWith("down".into()),
        ))]);

        let mut req = request(Direction::Push, dec!(50_000));
        for _ in 0..RailConfig::default().max_retry_rounds {
            let _ = orch.route(&mut req);
        }
        let result = orch.route(&mut req);
        assert!(matches!(result, Err(TransferError::RetryBudgetExhausted { .. })));
    }

    #[test]
    fn completed_request_cannot_reroute() {
        let orch = orchestrator(vec![Arc::new(MockRail::new("IMPS", MockRailBehavior::Succeed))]);
        let mut req = request(Direction::Push, dec!(10_000));
        orch.route(&mut req).unwrap();
        assert!(matches!(
            orch.route(&mut req),
            Err(TransferError::AlreadyTerminal(_))
        ));
    }

    #[test]
    fn zero_amount_rejected() {
        let orch = orchestrator(vec![Arc::new(MockRail::new("IMPS", MockRailBehavior::Succeed))]);
        let mut req = request(Direction::Push, dec!(0));
        assert!(matches!(
            orch.route(&mut req),
            Err(TransferError::InvalidAmount(_))
        ));
    }

    #[test]
    fn partial_rail_success_is_conserved() {
        let orch = orchestrator(vec![
            Arc::new(MockRail::new(
                "IMPS",
                MockRailBehavior::SucceedUpTo(Rupees::new(dec!(60_000))),
            )),
            Arc::new(MockRail::new("NEFT", MockRailBehavior::Succeed)),
        ]);

        let mut req = request(Direction::Push, dec!(150_000));
        let status = orch.route(&mut req).unwrap();

        assert_eq!(status, TransferStatus::Completed);
        // 60,000 via IMPS (partial), 90,000 remainder via NEFT
        assert_eq!(req.rail_attempts[0].outcome.amount_moved().value(), dec!(60_000));
        assert_eq!(req.rail_attempts[1].outcome.amount_moved().value(), dec!(90_000));
        assert_eq!(req.routed_amount(), req.amount);
    }
}
