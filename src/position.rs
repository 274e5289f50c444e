// 4.0 position.rs: open positions and the immutable closed-position record.
// signed quantity: positive = long, negative = short. closed positions are
// replace-on-close: the open entry is removed and a ClosedPosition is written,
// never mutated in place.

use crate::types::{Leverage, Rupees, Symbol, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    pub quantity: Decimal,
    pub entry_price: Rupees,
    pub leverage_used: Leverage,
    pub opened_at: Timestamp,
}

impl Position {
    pub fn new(
        symbol: Symbol,
        quantity: Decimal,
        entry_price: Rupees,
        leverage_used: Leverage,
        opened_at: Timestamp,
    ) -> Self {
        Self {
            symbol,
            quantity,
            entry_price,
            leverage_used,
            opened_at,
        }
    }

    /// Notional exposure in rupees, direction-agnostic.
    pub fn exposure(&self) -> Rupees {
        self.entry_price.mul(self.quantity.abs())
    }

    pub fn is_long(&self) -> bool {
        self.quantity > Decimal::ZERO
    }

    /// Close at the given price, producing the immutable day-log record.
    pub fn close(self, exit_price: Rupees, closed_at: Timestamp) -> ClosedPosition {
        let realized_pnl = Rupees::new(
            (exit_price.value() - self.entry_price.value()) * self.quantity,
        );
        ClosedPosition {
            symbol: self.symbol,
            quantity: self.quantity,
            entry_price: self.entry_price,
            exit_price,
            leverage_used: self.leverage_used,
            realized_pnl,
            closed_at,
        }
    }
}

/// A position after close. Written once, read by settlement, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedPosition {
    pub symbol: Symbol,
    pub quantity: Decimal,
    pub entry_price: Rupees,
    pub exit_price: Rupees,
    pub leverage_used: Leverage,
    pub realized_pnl: Rupees,
    pub closed_at: Timestamp,
}
