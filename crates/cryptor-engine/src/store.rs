//! Authoritative per-symbol position state.
//!
//! Each symbol has its own exclusive lock. A cycle holds the owned guard for
//! its whole duration, so cycles for one symbol are serialized while
//! different symbols never contend beyond the brief map lookup.

use std::collections::HashMap;
use std::sync::Arc;

use cryptor_core::error::StoreError;
use cryptor_core::types::{ExitReason, Market, Position, SentimentScore, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

/// An order accepted by the exchange but not yet filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub order_id: Uuid,
    pub side: Side,
    pub market: Market,
    pub quantity: Decimal,
    pub limit_price: Decimal,
    pub leverage: u32,
    /// Set for exits, forced or signalled
    pub exit_reason: Option<ExitReason>,
    /// Cycles this order has been reconciled without filling
    pub age: u32,
}

/// Everything the engine remembers about one symbol between cycles.
#[derive(Debug, Default)]
pub struct SymbolState {
    symbol: String,
    position: Option<Position>,
    pending: Option<PendingOrder>,
    /// Leverage last applied on the exchange
    pub leverage: Option<u32>,
    /// Fallbacks for failed model calls
    pub last_sentiment: Option<SentimentScore>,
    pub last_forecast: Option<f64>,
}

impl SymbolState {
    fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            ..Default::default()
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn in_position(&self) -> bool {
        self.position.is_some()
    }

    /// Record a new position. Fails if one is already open.
    pub fn open(&mut self, position: Position) -> Result<&Position, StoreError> {
        if position.symbol != self.symbol {
            return Err(StoreError::InvalidPosition(format!(
                "position for {} stored under {}",
                position.symbol, self.symbol
            )));
        }
        if self.position.is_some() {
            return Err(StoreError::AlreadyOpen(self.symbol.clone()));
        }
        Ok(self.position.insert(position))
    }

    /// Remove and return the open position.
    pub fn clear(&mut self) -> Result<Position, StoreError> {
        self.position
            .take()
            .ok_or_else(|| StoreError::NotOpen(self.symbol.clone()))
    }

    /// Shrink the open position after a partial exit. The remainder must stay
    /// positive; a complete exit goes through [`SymbolState::clear`].
    pub fn reduce(&mut self, quantity: Decimal) -> Result<&Position, StoreError> {
        let position = self
            .position
            .as_mut()
            .ok_or_else(|| StoreError::NotOpen(self.symbol.clone()))?;
        if quantity <= Decimal::ZERO || quantity >= position.quantity {
            return Err(StoreError::InvalidPosition(format!(
                "cannot reduce {} of {} by {}",
                position.quantity, position.symbol, quantity
            )));
        }
        position.quantity -= quantity;
        Ok(position)
    }

    pub fn pending(&self) -> Option<&PendingOrder> {
        self.pending.as_ref()
    }

    pub fn pending_mut(&mut self) -> Option<&mut PendingOrder> {
        self.pending.as_mut()
    }

    pub fn set_pending(&mut self, order: PendingOrder) {
        self.pending = Some(order);
    }

    pub fn take_pending(&mut self) -> Option<PendingOrder> {
        self.pending.take()
    }
}

/// Keyed store of [`SymbolState`], owned by an engine instance.
#[derive(Debug, Default)]
pub struct PositionStore {
    symbols: RwLock<HashMap<String, Arc<Mutex<SymbolState>>>>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, symbol: &str) -> Arc<Mutex<SymbolState>> {
        if let Some(slot) = self.symbols.read().await.get(symbol) {
            return slot.clone();
        }
        self.symbols
            .write()
            .await
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SymbolState::new(symbol))))
            .clone()
    }

    /// Exclusive access to a symbol's state, waiting for any running cycle.
    pub async fn lock(&self, symbol: &str) -> OwnedMutexGuard<SymbolState> {
        self.slot(symbol).await.lock_owned().await
    }

    /// Snapshot of the symbol's open position.
    pub async fn position(&self, symbol: &str) -> Option<Position> {
        let slot = self.symbols.read().await.get(symbol).cloned()?;
        let state = slot.lock().await;
        state.position.clone()
    }

    /// Snapshot of every open position.
    pub async fn open_positions(&self) -> Vec<Position> {
        let slots: Vec<_> = self.symbols.read().await.values().cloned().collect();
        let mut positions = Vec::new();
        for slot in slots {
            if let Some(position) = slot.lock().await.position.clone() {
                positions.push(position);
            }
        }
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        positions
    }
}
