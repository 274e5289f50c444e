//! Account state: capital, open positions, status machine.
//!
//! An account is owned by exactly one user and pinned to a tier by id.
//! `capital_current` never goes negative and `capital_peak` only rises;
//! drawdown checks read the peak. Status transitions are the closed set
//! `Active ↔ Paused`, `Active → Breached → Active`, with breach clearance
//! refused while positions remain open.

use crate::position::{ClosedPosition, Position};
use crate::types::{AccountId, OwnerId, Rupees, Symbol, TierId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Paused,
    Breached,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccountStatus::Active => "active",
            AccountStatus::Paused => "paused",
            AccountStatus::Breached => "breached",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AccountError {
    #[error("Insufficient capital: requested {requested}, available {available}")]
    InsufficientCapital { requested: Rupees, available: Rupees },

    #[error("Invalid status transition {from} -> {to}")]
    InvalidTransition { from: AccountStatus, to: AccountStatus },

    #[error("Account is {0}, operation requires active status")]
    NotActive(AccountStatus),

    #[error("Position already open for {0}")]
    PositionExists(Symbol),

    #[error("No open position for {0}")]
    PositionNotFound(Symbol),

    #[error("{0} open positions must be flattened before breach clearance")]
    OpenPositionsRemain(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub owner_id: OwnerId,
    pub tier_id: TierId,
    capital_current: Rupees,
    capital_peak: Rupees,
    positions: HashMap<Symbol, Position>,
    /// Day log of closed positions, drained by settlement.
    closed_today: Vec<ClosedPosition>,
    pub status: AccountStatus,
    pub created_at: Timestamp,
}

impl Account {
    pub fn new(
        id: AccountId,
        owner_id: OwnerId,
        tier_id: TierId,
        initial_capital: Rupees,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id,
            owner_id,
            tier_id,
            capital_current: initial_capital,
            capital_peak: initial_capital,
            positions: HashMap::new(),
            closed_today: Vec::new(),
            status: AccountStatus::Active,
            created_at: timestamp,
        }
    }

    pub fn capital_current(&self) -> Rupees {
        self.capital_current
    }

    pub fn capital_peak(&self) -> Rupees {
        self.capital_peak
    }

    /// Peak-relative drawdown in [0, 1]. Zero when at or above peak.
    pub fn drawdown(&self) -> Decimal {
        if self.capital_peak.is_zero() {
            return Decimal::ZERO;
        }
        let dd = (self.capital_peak.value() - self.capital_current.value())
            / self.capital_peak.value();
        dd.max(Decimal::ZERO)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn open_position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn closed_today(&self) -> &[ClosedPosition] {
        &self.closed_today
    }

    /// Sum of notional exposure across open positions.
    pub fn total_exposure(&self) -> Rupees {
        self.positions.values().map(|p| p.exposure()).sum()
    }

    // -- capital movements ---------------------------------------------------

    pub fn credit(&mut self, amount: Rupees) {
        self.capital_current = self.capital_current.add(amount);
        self.capital_peak = self.capital_peak.max(self.capital_current);
    }

    pub fn debit(&mut self, amount: Rupees) -> Result<(), AccountError> {
        if amount > self.capital_current {
            return Err(AccountError::InsufficientCapital {
                requested: amount,
                available: self.capital_current,
            });
        }
        self.capital_current = self.capital_current.sub(amount);
        Ok(())
    }

    /// Settlement writes the day's closing balance and drains the day log.
    pub fn apply_closing_balance(&mut self, closing: Rupees) -> Vec<ClosedPosition> {
        self.capital_current = closing;
        self.capital_peak = self.capital_peak.max(closing);
        std::mem::take(&mut self.closed_today)
    }

    // -- positions -----------------------------------------------------------

    pub fn open_position(&mut self, position: Position) -> Result<(), AccountError> {
        if self.status != AccountStatus::Active {
            return Err(AccountError::NotActive(self.status));
        }
        if self.positions.contains_key(&position.symbol) {
            return Err(AccountError::PositionExists(position.symbol.clone()));
        }
        self.positions.insert(position.symbol.clone(), position);
        Ok(())
    }

    pub fn close_position(
        &mut self,
        symbol: &Symbol,
        exit_price: Rupees,
        timestamp: Timestamp,
    ) -> Result<Rupees, AccountError> {
        let position = self
            .positions
            .remove(symbol)
            .ok_or_else(|| AccountError::PositionNotFound(symbol.clone()))?;

        let closed = position.close(exit_price, timestamp);
        let pnl = closed.realized_pnl;
        self.closed_today.push(closed);
        Ok(pnl)
    }

    /// Close every open position at the supplied exit prices. Used when a
    /// breached account must be flattened before returning to active.
    pub fn flatten_all(
        &mut self,
        exit_price_for: impl Fn(&Symbol) -> Rupees,
        timestamp: Timestamp,
    ) -> Vec<ClosedPosition> {
        let symbols: Vec<Symbol> = self.positions.keys().cloned().collect();
        let mut flattened = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            if let Some(position) = self.positions.remove(&symbol) {
                let closed = position.close(exit_price_for(&symbol), timestamp);
                self.closed_today.push(closed.clone());
                flattened.push(closed);
            }
        }
        flattened
    }

    // -- status machine ------------------------------------------------------

    pub fn pause(&mut self) -> Result<(), AccountError> {
        self.transition(AccountStatus::Paused, AccountStatus::Active)
    }

    pub fn resume(&mut self) -> Result<(), AccountError> {
        self.transition(AccountStatus::Active, AccountStatus::Paused)
    }

    pub fn mark_breached(&mut self) -> Result<(), AccountError> {
        self.transition(AccountStatus::Breached, AccountStatus::Active)
    }

    /// Manual/compliance clearance. Refused while positions remain open.
    pub fn clear_breach(&mut self) -> Result<(), AccountError> {
        if self.status != AccountStatus::Breached {
            return Err(AccountError::InvalidTransition {
                from: self.status,
                to: AccountStatus::Active,
            });
        }
        if !self.positions.is_empty() {
            return Err(AccountError::OpenPositionsRemain(self.positions.len()));
        }
        self.status = AccountStatus::Active;
        Ok(())
    }

    fn transition(&mut self, to: AccountStatus, required_from: AccountStatus) -> Result<(), AccountError> {
        if self.status != required_from {
            return Err(AccountError::InvalidTransition { from: self.status, to });
        }
        self.status = to;
        Ok(())
    }
}
