//! Paper exchange for backtesting, simulation and engine tests.

use async_trait::async_trait;
use chrono::Utc;
use cryptor_core::error::PortError;
use cryptor_core::traits::Exchange;
use cryptor_core::types::{
    Balances, Fill, Market, Order, OrderRequest, OrderStatus, Side, SymbolPair,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

/// When accepted orders fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    /// Fill at the limit price on placement
    #[default]
    Immediate,
    /// Stay accepted until [`PaperExchange::fill_order`] is called
    Manual,
}

/// Failures the paper exchange can be told to produce.
#[derive(Debug, Clone, Default)]
pub struct FailureScript {
    pub reject_orders: bool,
    pub fail_transfers: bool,
    pub fail_leverage: bool,
    pub balances_unavailable: bool,
    pub margin_ratio_unavailable: bool,
    /// Margin ratio reported for every futures symbol
    pub margin_ratio: Option<f64>,
}

/// Call counters for assertions.
#[derive(Debug, Default)]
pub struct CallCounts {
    pub orders: AtomicUsize,
    pub cancels: AtomicUsize,
    pub transfers: AtomicUsize,
    pub leverage: AtomicUsize,
    pub balances: AtomicUsize,
}

impl CallCounts {
    pub fn orders(&self) -> usize {
        self.orders.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub fn transfers(&self) -> usize {
        self.transfers.load(Ordering::SeqCst)
    }

    pub fn leverage(&self) -> usize {
        self.leverage.load(Ordering::SeqCst)
    }

    pub fn balances(&self) -> usize {
        self.balances.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
struct FuturesHolding {
    quantity: Decimal,
    entry_price: Decimal,
    leverage: u32,
}

#[derive(Debug, Default)]
struct PaperState {
    accounts: HashMap<Market, Balances>,
    orders: HashMap<Uuid, Order>,
    leverage: HashMap<String, u32>,
    holdings: HashMap<String, FuturesHolding>,
    script: FailureScript,
    fill_mode: FillMode,
}

/// Simulated spot/futures exchange.
///
/// Spot fills move base and quote balances. Futures buys lock
/// `notional / leverage` of quote as margin and credit the base asset as
/// contract exposure; sells release the margin plus P&L.
pub struct PaperExchange {
    state: Mutex<PaperState>,
    fee_rate: Decimal,
    calls: CallCounts,
}

fn lock(state: &Mutex<PaperState>) -> Result<MutexGuard<'_, PaperState>, PortError> {
    state
        .lock()
        .map_err(|_| PortError::Unavailable("paper exchange state poisoned".to_string()))
}

impl PaperExchange {
    /// Create an exchange with the given quote balance in both accounts.
    pub fn new(quote_asset: &str, initial_quote: Decimal) -> Self {
        let mut accounts = HashMap::new();
        accounts.insert(Market::Spot, Balances::new().with(quote_asset, initial_quote));
        accounts.insert(Market::Futures, Balances::new().with(quote_asset, initial_quote));
        Self {
            state: Mutex::new(PaperState {
                accounts,
                ..Default::default()
            }),
            fee_rate: Decimal::ZERO,
            calls: CallCounts::default(),
        }
    }

    /// Fee charged on each fill, as a fraction of notional.
    pub fn with_fee_rate(mut self, fee_rate: Decimal) -> Self {
        self.fee_rate = fee_rate;
        self
    }

    pub fn with_fill_mode(self, mode: FillMode) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.fill_mode = mode;
        }
        self
    }

    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    /// Replace the failure script.
    pub fn script(&self, script: FailureScript) {
        if let Ok(mut state) = self.state.lock() {
            state.script = script;
        }
    }

    /// Edit the failure script in place.
    pub fn update_script(&self, edit: impl FnOnce(&mut FailureScript)) {
        if let Ok(mut state) = self.state.lock() {
            edit(&mut state.script);
        }
    }

    /// Snapshot of an account's free balances.
    pub fn balances(&self, market: Market) -> Balances {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.accounts.get(&market).cloned())
            .unwrap_or_default()
    }

    /// Leverage last applied to `symbol`.
    pub fn leverage_for(&self, symbol: &str) -> Option<u32> {
        self.state.lock().ok()?.leverage.get(symbol).copied()
    }

    /// Orders that are still open.
    pub fn open_orders(&self) -> Vec<Order> {
        self.state
            .lock()
            .map(|state| {
                state
                    .orders
                    .values()
                    .filter(|o| o.status.is_active())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Fill an open order at `price`.
    pub fn fill_order(&self, order_id: Uuid, price: Decimal) -> Result<Order, PortError> {
        let mut state = lock(&self.state)?;
        Self::execute(&mut state, order_id, None, price, self.fee_rate)
    }

    /// Fill up to `quantity` of an open order at `price`, leaving the rest
    /// working.
    pub fn fill_partially(&self, order_id: Uuid, quantity: Decimal, price: Decimal) -> Result<Order, PortError> {
        if quantity <= Decimal::ZERO {
            return Err(PortError::Rejected("fill quantity must be positive".to_string()));
        }
        let mut state = lock(&self.state)?;
        Self::execute(&mut state, order_id, Some(quantity), price, self.fee_rate)
    }

    fn execute(
        state: &mut PaperState,
        order_id: Uuid,
        quantity: Option<Decimal>,
        price: Decimal,
        fee_rate: Decimal,
    ) -> Result<Order, PortError> {
        let order = state
            .orders
            .get(&order_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(order_id.to_string()))?;
        if order.status.is_terminal() {
            return Ok(order);
        }

        let pair = SymbolPair::parse(&order.symbol).map_err(PortError::Rejected)?;
        let remaining = order.remaining_quantity();
        let quantity = quantity.map_or(remaining, |q| q.min(remaining));
        let notional = quantity * price;
        let fee = notional * fee_rate;
        let leverage = state.leverage.get(&order.symbol).copied().unwrap_or(1).max(1);

        let account = state.accounts.entry(order.market).or_default();
        match (order.market, order.side) {
            (Market::Spot, Side::Buy) => {
                let required = notional + fee;
                let available = account.free(&pair.quote);
                if available < required {
                    return Err(PortError::InsufficientFunds { required, available });
                }
                account.adjust(&pair.quote, -required);
                account.adjust(&pair.base, quantity);
            }
            (Market::Spot, Side::Sell) => {
                let available = account.free(&pair.base);
                if available < quantity {
                    return Err(PortError::InsufficientFunds {
                        required: quantity,
                        available,
                    });
                }
                account.adjust(&pair.base, -quantity);
                account.adjust(&pair.quote, notional - fee);
            }
            (Market::Futures, Side::Buy) => {
                let margin = notional / Decimal::from(leverage);
                let required = margin + fee;
                let available = account.free(&pair.quote);
                if available < required {
                    return Err(PortError::InsufficientFunds { required, available });
                }
                account.adjust(&pair.quote, -required);
                account.adjust(&pair.base, quantity);
                let holding = state.holdings.entry(order.symbol.clone()).or_insert(FuturesHolding {
                    quantity: Decimal::ZERO,
                    entry_price: price,
                    leverage,
                });
                let total = holding.quantity + quantity;
                holding.entry_price = (holding.entry_price * holding.quantity + price * quantity) / total;
                holding.quantity = total;
                holding.leverage = leverage;
            }
            (Market::Futures, Side::Sell) => {
                let available = account.free(&pair.base);
                if available < quantity {
                    return Err(PortError::InsufficientFunds {
                        required: quantity,
                        available,
                    });
                }
                let released = match state.holdings.get_mut(&order.symbol) {
                    Some(h) => {
                        let closed = quantity.min(h.quantity);
                        let released = closed * h.entry_price / Decimal::from(h.leverage)
                            + (price - h.entry_price) * quantity;
                        h.quantity -= closed;
                        if h.quantity <= Decimal::ZERO {
                            state.holdings.remove(&order.symbol);
                        }
                        released
                    }
                    None => notional / Decimal::from(leverage),
                };
                account.adjust(&pair.base, -quantity);
                account.adjust(&pair.quote, released - fee);
            }
            (Market::Option, _) => {
                return Err(PortError::Rejected("options are not order-routed".to_string()));
            }
        }

        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| PortError::NotFound(order_id.to_string()))?;
        order.add_fill(Fill {
            order_id,
            quantity,
            price,
            timestamp: Utc::now(),
        });
        info!(
            symbol = %order.symbol,
            market = %order.market,
            side = %order.side,
            %quantity,
            %price,
            "Paper fill"
        );
        Ok(order.clone())
    }
}

#[async_trait]
impl Exchange for PaperExchange {
    async fn fetch_balances(&self, market: Market) -> Result<Balances, PortError> {
        self.calls.balances.fetch_add(1, Ordering::SeqCst);
        let state = lock(&self.state)?;
        if state.script.balances_unavailable {
            return Err(PortError::Unavailable("balances unavailable".to_string()));
        }
        Ok(state.accounts.get(&market).cloned().unwrap_or_default())
    }

    async fn place_limit_order(&self, request: OrderRequest) -> Result<Order, PortError> {
        self.calls.orders.fetch_add(1, Ordering::SeqCst);
        let mut state = lock(&self.state)?;
        if state.script.reject_orders {
            return Err(PortError::Rejected("order rejected by exchange".to_string()));
        }
        if !request.market.is_order_routed() {
            return Err(PortError::Rejected(format!("{} orders are not supported", request.market)));
        }
        if request.quantity <= Decimal::ZERO || request.limit_price <= Decimal::ZERO {
            return Err(PortError::Rejected("quantity and price must be positive".to_string()));
        }

        let order = Order::from_request(&request);
        let id = order.id;
        state.orders.insert(id, order.clone());
        debug!(symbol = %request.symbol, side = %request.side, order_id = %id, "Paper order accepted");

        match state.fill_mode {
            FillMode::Immediate => match Self::execute(&mut state, id, None, request.limit_price, self.fee_rate) {
                Ok(filled) => Ok(filled),
                Err(e) => {
                    if let Some(order) = state.orders.get_mut(&id) {
                        order.status = OrderStatus::Rejected;
                    }
                    Err(e)
                }
            },
            FillMode::Manual => Ok(order),
        }
    }

    async fn order_status(&self, order_id: Uuid) -> Result<Order, PortError> {
        let state = lock(&self.state)?;
        state
            .orders
            .get(&order_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(order_id.to_string()))
    }

    async fn cancel_order(&self, order_id: Uuid) -> Result<(), PortError> {
        self.calls.cancels.fetch_add(1, Ordering::SeqCst);
        let mut state = lock(&self.state)?;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| PortError::NotFound(order_id.to_string()))?;
        if order.status.is_terminal() {
            return Err(PortError::Rejected(format!("order {} already {:?}", order_id, order.status)));
        }
        order.status = OrderStatus::Canceled;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), PortError> {
        self.calls.leverage.fetch_add(1, Ordering::SeqCst);
        let mut state = lock(&self.state)?;
        if state.script.fail_leverage {
            return Err(PortError::Api("leverage change refused".to_string()));
        }
        state.leverage.insert(symbol.to_string(), leverage);
        Ok(())
    }

    async fn transfer_margin(&self, symbol: &str, amount: Decimal) -> Result<(), PortError> {
        self.calls.transfers.fetch_add(1, Ordering::SeqCst);
        let mut state = lock(&self.state)?;
        if state.script.fail_transfers {
            return Err(PortError::Rejected("margin transfer refused".to_string()));
        }
        let pair = SymbolPair::parse(symbol).map_err(PortError::Rejected)?;
        let spot = state.accounts.entry(Market::Spot).or_default();
        let available = spot.free(&pair.quote);
        if available < amount {
            return Err(PortError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        spot.adjust(&pair.quote, -amount);
        state
            .accounts
            .entry(Market::Futures)
            .or_default()
            .adjust(&pair.quote, amount);
        Ok(())
    }

    async fn margin_ratio(&self, symbol: &str) -> Result<Option<f64>, PortError> {
        let state = lock(&self.state)?;
        if state.script.margin_ratio_unavailable {
            return Err(PortError::Unavailable(format!("no margin data for {}", symbol)));
        }
        Ok(state.script.margin_ratio)
    }

    fn name(&self) -> &str {
        "Paper Exchange"
    }
}
