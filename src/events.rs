// 10.0 events.rs: engine notifications for external systems. fire-and-forget:
// a notifier that drops or fails never blocks or rewinds engine state, which
// is why the audit sink (ack-gated) is a separate seam from this one.

use crate::account::AccountStatus;
use crate::compliance::ComplianceBreach;
use crate::transfer::{Direction, TransferStatus};
use crate::types::{AccountId, RequestId, Rupees, Symbol, TierId, Timestamp};
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Risk events
    ComplianceBreached(ComplianceBreachedEvent),
    StatusChanged(StatusChangedEvent),

    // Tier events
    TierPromoted(TierMovedEvent),
    TierDemoted(TierMovedEvent),

    // Money movement events
    TransferRouted(TransferRoutedEvent),
    SettlementCompleted(SettlementCompletedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceBreachedEvent {
    pub account_id: AccountId,
    pub symbol: Symbol,
    pub breaches: Vec<ComplianceBreach>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangedEvent {
    pub account_id: AccountId,
    pub from: AccountStatus,
    pub to: AccountStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierMovedEvent {
    pub account_id: AccountId,
    pub from: TierId,
    pub to: TierId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRoutedEvent {
    pub request_id: RequestId,
    pub account_id: AccountId,
    pub direction: Direction,
    pub amount: Rupees,
    pub routed: Rupees,
    pub status: TransferStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementCompletedEvent {
    pub account_id: AccountId,
    pub date: NaiveDate,
    pub net_pnl: Rupees,
    pub closing_balance: Rupees,
}

/// Best-effort notification seam. Implementations must not block the caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: Event);
}

/// Collects events in memory. Used by tests and the simulation binary.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Mutex<Vec<Event>>,
    next_id: AtomicU64,
}

impl EventCollector {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn next_id(&self) -> EventId {
        EventId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Notifier for EventCollector {
    fn notify(&self, event: Event) {
        self.events.lock().push(event);
    }
}

/// Discards everything. The default when no external system is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: Event) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn collector_gathers_and_clears() {
        let collector = EventCollector::new();

        let event = Event::new(
            collector.next_id(),
            Timestamp::from_millis(1000),
            EventPayload::TierPromoted(TierMovedEvent {
                account_id: AccountId(1),
                from: TierId(1),
                to: TierId(2),
            }),
        );

        collector.notify(event);
        assert_eq!(collector.len(), 1);

        collector.clear();
        assert!(collector.is_empty());
    }

    #[test]
    fn ids_are_monotonic() {
        let collector = EventCollector::new();
        let a = collector.next_id();
        let b = collector.next_id();
        assert!(b > a);
    }

    #[test]
    fn settlement_event_payload() {
        let payload = SettlementCompletedEvent {
            account_id: AccountId(3),
            date: NaiveDate::from_ymd_opt(2024, 4, 15).unwrap(),
            net_pnl: Rupees::new(dec!(5_000)),
            closing_balance: Rupees::new(dec!(100_000)),
        };
        assert_eq!(payload.closing_balance.value(), dec!(100_000));
    }
}
