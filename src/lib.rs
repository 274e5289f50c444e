// capital-core: capital allocation, risk-adjustment and settlement engine.
// risk-first architecture: the compliance gate and capacity model sit in
// front of every position; nothing trades around them. all computation is
// deterministic with no external I/O behind the rail and audit seams.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: AccountId, Rupees, Fraction, Leverage, Lots
//   2.x  tier.rs: tier table, capital floors, increment ladders, fee splits
//   3.x  volatility.rs: volatility bands -> capacity profiles
//   4.x  position.rs: open positions and closed-position day log
//   5.x  account.rs: capital, positions, Active/Paused/Breached machine
//   6.x  transfer.rs: multi-rail push/pull routing with retry budget
//   7.x  config.rs: versioned parameter bundle, presets, validation
//   8.x  progression.rs: graduation thresholds, single-step promotion
//   9.x  audit.rs: append-only audit sink seam (ack-gated)
//   10.x events.rs: fire-and-forget notifications
//   11.x compliance.rs: exposure / lot / leverage ceilings
//   12.x engine/: coordinator: trading, transfers, settlement cycle

pub mod account;
pub mod audit;
pub mod compliance;
pub mod config;
pub mod engine;
pub mod events;
pub mod position;
pub mod progression;
pub mod settlement;
pub mod tier;
pub mod transfer;
pub mod types;
pub mod volatility;

// re exports for convenience
pub use account::*;
pub use compliance::*;
pub use engine::*;
pub use position::*;
pub use progression::*;
pub use tier::*;
pub use types::*;
pub use volatility::*;
pub use audit::{AuditEntry, AuditRef, AuditSink, AuditSinkUnavailable, InMemoryAuditSink};
pub use config::{ConfigError, EngineConfig};
pub use events::{Event, EventCollector, EventPayload, Notifier, NullNotifier};
pub use settlement::{
    RoundingSchedule, SettlementAccount, SettlementEngine, SettlementError, SettlementRecord,
};
pub use transfer::{
    CashAccountRef, Direction, FundTransferOrchestrator, MockRail, MockRailBehavior, PaymentRail,
    RailAttempt, RailConfig, RailOutcome, TransferError, TransferRequest, TransferStatus,
};
