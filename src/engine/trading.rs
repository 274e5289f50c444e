// 12.2 engine/trading.rs: trade intake. compliance gate first, then
// volatility capacity sizing, then the position opens. a gate rejection is a
// limit breach: the account is marked breached and must be flattened and
// cleared by an operator before it trades again. every accept and reject is
// audited before the account mutates.

use super::core::Engine;
use super::results::{EngineError, TradeResult};
use crate::account::{AccountError, AccountStatus};
use crate::audit::AuditEntry;
use crate::compliance::GateDecision;
use crate::events::{ComplianceBreachedEvent, EventPayload};
use crate::position::Position;
use crate::types::{AccountId, Lots, Rupees, Symbol};
use rust_decimal::Decimal;

/// A proposed trade before sizing. Quantity is signed: positive long,
/// negative short.
#[derive(Debug, Clone)]
pub struct TradeIntent {
    pub symbol: Symbol,
    pub quantity: Decimal,
    pub price: Rupees,
    pub lots: Lots,
}

impl Engine {
    /// Submit a trade under the current volatility regime.
    ///
    /// The gate rules on the full proposed exposure; only an approved
    /// quantity is then scaled by the regime's capacity fraction and opened.
    /// On rejection the account is breached and nothing else changes.
    pub fn submit_trade(
        &self,
        account_id: AccountId,
        intent: TradeIntent,
        volatility_index: Decimal,
    ) -> Result<TradeResult, EngineError> {
        if intent.quantity.is_zero() {
            return Err(EngineError::ZeroQuantity(intent.symbol));
        }

        let handle = self.account_handle(account_id)?;
        let mut account = handle.lock();

        if account.status != AccountStatus::Active {
            return Err(AccountError::NotActive(account.status).into());
        }
        if account.positions().any(|p| p.symbol == intent.symbol) {
            return Err(AccountError::PositionExists(intent.symbol).into());
        }

        let tier = self.config.tiers.get(account.tier_id)?;
        let profile = self.config.bands.capacity_for(volatility_index)?;
        let proposed_exposure = account
            .total_exposure()
            .add(intent.price.mul(intent.quantity.abs()));

        match self.gate.check(&account, tier, proposed_exposure, intent.lots) {
            GateDecision::Allow => {
                // sizing shrinks what was approved, never rescues a
                // rejection, so the exposure ceilings still hold
                let sized_quantity = intent.quantity * profile.capacity_fraction.value();
                let exposure_after = account
                    .total_exposure()
                    .add(intent.price.mul(sized_quantity.abs()));

                let audit_ref = self.audit.append(AuditEntry::TradeAccepted {
                    account_id,
                    symbol: intent.symbol.clone(),
                    exposure: exposure_after,
                })?;

                account.open_position(Position::new(
                    intent.symbol.clone(),
                    sized_quantity,
                    intent.price,
                    tier.leverage_multiplier,
                    self.time(),
                ))?;

                tracing::info!(
                    account_id = account_id.0,
                    symbol = intent.symbol.as_str(),
                    requested = %intent.quantity,
                    sized = %sized_quantity,
                    exposure = %exposure_after,
                    "trade accepted"
                );

                Ok(TradeResult {
                    account_id,
                    symbol: intent.symbol,
                    requested_quantity: intent.quantity,
                    sized_quantity,
                    capacity_fraction: profile.capacity_fraction.value(),
                    exposure_after,
                    audit_ref,
                })
            }
            GateDecision::Reject(breaches) => {
                self.audit.append(AuditEntry::TradeRejected {
                    account_id,
                    symbol: intent.symbol.clone(),
                    breaches: breaches.clone(),
                })?;

                let from = account.status;
                account.mark_breached()?;
                self.commit_status_change(&mut account, from)?;

                self.emit(EventPayload::ComplianceBreached(ComplianceBreachedEvent {
                    account_id,
                    symbol: intent.symbol.clone(),
                    breaches: breaches.clone(),
                }));
                tracing::warn!(
                    account_id = account_id.0,
                    symbol = intent.symbol.as_str(),
                    rules = breaches.len(),
                    "trade rejected, account breached"
                );

                Err(EngineError::ComplianceRejected(breaches))
            }
        }
    }

    /// Close an open position at the given price. Realized P&L goes to the
    /// day log; capital moves only at settlement.
    pub fn close_position(
        &self,
        account_id: AccountId,
        symbol: &Symbol,
        exit_price: Rupees,
    ) -> Result<Rupees, EngineError> {
        let handle = self.account_handle(account_id)?;
        let mut account = handle.lock();

        let position = account
            .positions()
            .find(|p| p.symbol == *symbol)
            .ok_or_else(|| AccountError::PositionNotFound(symbol.clone()))?;
        let realized_pnl = Rupees::new(
            (exit_price.value() - position.entry_price.value()) * position.quantity,
        );

        self.audit.append(AuditEntry::PositionClosed {
            account_id,
            symbol: symbol.clone(),
            realized_pnl,
        })?;
        let pnl = account.close_position(symbol, exit_price, self.time())?;

        tracing::info!(
            account_id = account_id.0,
            symbol = symbol.as_str(),
            pnl = %pnl,
            "position closed"
        );
        Ok(pnl)
    }
}
