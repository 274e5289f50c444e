// 12.0.2: result types and errors for engine operations.

use crate::account::AccountError;
use crate::audit::{AuditRef, AuditSinkUnavailable};
use crate::compliance::ComplianceBreach;
use crate::progression::ProgressionError;
use crate::settlement::SettlementError;
use crate::tier::TierError;
use crate::transfer::{TransferError, TransferStatus};
use crate::types::{AccountId, RequestId, Rupees, Symbol, TierId};
use crate::volatility::VolatilityError;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct TradeResult {
    pub account_id: AccountId,
    pub symbol: Symbol,
    pub requested_quantity: Decimal,
    /// Quantity after volatility capacity scaling.
    pub sized_quantity: Decimal,
    pub capacity_fraction: Decimal,
    pub exposure_after: Rupees,
    pub audit_ref: AuditRef,
}

#[derive(Debug, Clone)]
pub struct TransferResult {
    pub request_id: RequestId,
    pub status: TransferStatus,
    pub routed_amount: Rupees,
    pub remainder: Rupees,
}

/// Aggregate outcome of one settlement cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleResult {
    pub settled: usize,
    pub replayed: usize,
    pub promotions: Vec<(AccountId, TierId, TierId)>,
    pub failures: Vec<(AccountId, String)>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("Account {0:?} not found")]
    AccountNotFound(AccountId),

    #[error("Tier {tier_id:?} is full ({max_accounts} accounts)")]
    TierFull { tier_id: TierId, max_accounts: usize },

    #[error("Trade rejected by compliance gate ({} rule(s) violated)", .0.len())]
    ComplianceRejected(Vec<ComplianceBreach>),

    #[error("Transfer request {0:?} not found")]
    TransferNotFound(RequestId),

    #[error("Trade quantity for {0} must be non-zero")]
    ZeroQuantity(Symbol),

    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    #[error("Tier error: {0}")]
    Tier(#[from] TierError),

    #[error("Volatility error: {0}")]
    Volatility(#[from] VolatilityError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Settlement error: {0}")]
    Settlement(#[from] SettlementError),

    #[error("Progression error: {0}")]
    Progression(#[from] ProgressionError),

    #[error("Audit error: {0}")]
    Audit(#[from] AuditSinkUnavailable),
}
