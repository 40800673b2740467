//! One evaluation cycle for one symbol.
//!
//! The order inside a cycle is fixed:
//! fetch data → indicators → reconcile pending order → sentiment/forecast →
//! (futures) leverage → fuse → risk → dispatch at most one order → store
//! update → (futures) margin ratio → result.

use std::sync::Arc;

use chrono::Utc;
use cryptor_core::error::{CycleError, EngineError, PortError};
use cryptor_core::traits::{with_timeout, Exchange, Forecaster, MarketData, SentimentModel, TextFeed};
use cryptor_core::types::{
    CycleAction, CycleRequest, CycleResult, ExitReason, IndicatorSet, Market, MarketSnapshot, Order, OrderStatus,
    Position, SentimentScore, Side, SymbolPair, VolatilityProfile,
};
use cryptor_indicators::IndicatorParams;
use cryptor_risk::{LeverageController, RiskDirective, RiskSupervisor, VolatilityEstimator};
use cryptor_strategy::{Candidate, DecisionEngine, FusedSignal, SignalFusion};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::dispatcher::{Dispatch, ExecutionDispatcher};
use crate::store::{PendingOrder, PositionStore, SymbolState};

/// The collaborators a cycle talks to.
#[derive(Clone)]
pub struct EnginePorts {
    pub market_data: Arc<dyn MarketData>,
    pub exchange: Arc<dyn Exchange>,
    pub texts: Arc<dyn TextFeed>,
    pub sentiment: Arc<dyn SentimentModel>,
    pub forecaster: Arc<dyn Forecaster>,
}

/// Engine context: configuration, ports and the position store.
pub struct Engine {
    config: EngineConfig,
    ports: EnginePorts,
    store: PositionStore,
    indicators: IndicatorParams,
    volatility: VolatilityEstimator,
    leverage: LeverageController,
    fusion: SignalFusion,
    decision: DecisionEngine,
    supervisor: RiskSupervisor,
    dispatcher: ExecutionDispatcher,
}

/// What a cycle accumulates besides its signals.
#[derive(Debug, Default)]
struct Outcome {
    action: CycleAction,
    margin_ratio: Option<f64>,
    degraded: bool,
    faults: Vec<CycleError>,
}

impl Outcome {
    fn fault(&mut self, error: CycleError) {
        self.faults.push(error);
    }

    fn acted(&self) -> bool {
        !matches!(self.action, CycleAction::None)
    }
}

impl Engine {
    pub fn new(config: EngineConfig, ports: EnginePorts) -> Result<Self, EngineError> {
        config.validate()?;
        let port_timeout = config.port_timeout();
        Ok(Self {
            indicators: config.indicators.clone(),
            volatility: config.volatility.estimator(),
            leverage: LeverageController::new(&config.leverage),
            fusion: SignalFusion::new(config.fusion.clone()),
            decision: DecisionEngine::new(config.trade_amount),
            supervisor: RiskSupervisor::new(config.protection.clone(), config.margin.clone(), port_timeout),
            dispatcher: ExecutionDispatcher::new(
                config.fill_policy,
                config.confirm_attempts,
                config.confirm_interval(),
                port_timeout,
            ),
            store: PositionStore::new(),
            ports,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &PositionStore {
        &self.store
    }

    /// Run one cycle for the request's symbol.
    ///
    /// Returns an error only when the cycle aborts before any decision
    /// (bad request, missing data, too little history); such a cycle leaves
    /// the symbol's state untouched. Every other failure is recorded in
    /// [`CycleResult::faults`].
    pub async fn run_cycle(&self, request: &CycleRequest) -> Result<CycleResult, CycleError> {
        let pair = request.validate()?;
        let symbol = request.symbol.as_str();
        let market = request.market;

        let mut state = self.store.lock(symbol).await;

        let snapshot = self.fetch_snapshot(symbol).await?;
        let closes = snapshot.closes();
        let indicators = self.indicators.compute(&closes)?;
        let volatility = self.volatility.estimate(&closes);
        let average_volatility = volatility.average.ok_or(CycleError::InsufficientHistory {
            required: self.volatility.required_closes(),
            available: closes.len(),
        })?;

        let price = snapshot.price();
        let price_dec = Decimal::from_f64(price)
            .ok_or_else(|| CycleError::DataUnavailable(format!("price {} for {} is not representable", price, symbol)))?;
        debug!(symbol, %market, price, bars = snapshot.len(), rsi = indicators.current.rsi, "Market snapshot");

        let mut outcome = Outcome::default();

        self.reconcile_pending(&mut state, &mut outcome).await;

        let asset = request.asset_name(&pair);
        let sentiment = self.read_sentiment(&asset, &mut state, &mut outcome).await;
        let forecast = self.read_forecast(&snapshot, &mut state, &mut outcome).await;

        let leverage = match market {
            Market::Futures => {
                self.apply_leverage(symbol, request.leverage, average_volatility, sentiment.value, &mut state, &mut outcome)
                    .await
            }
            Market::Spot | Market::Option => 1,
        };

        let fused = self.fusion.fuse(&indicators, price, forecast, sentiment.value);

        let preempted = self.supervise(&mut state, price_dec, &mut outcome).await;

        if !preempted && !outcome.acted() {
            self.decide(request, &pair, &fused, price_dec, leverage, &mut state, &mut outcome)
                .await;
        }

        if market == Market::Futures && outcome.margin_ratio.is_none() {
            self.read_margin_ratio(symbol, &mut outcome).await;
        }

        let result = self.build_result(
            request,
            &state,
            &snapshot,
            &indicators,
            &fused,
            &sentiment,
            forecast,
            leverage,
            volatility,
            outcome,
        );
        info!(
            symbol,
            %market,
            price,
            predicted = forecast,
            sentiment = sentiment.value,
            buy_confidence = result.buy_confidence,
            sell_confidence = result.sell_confidence,
            leverage,
            volatility = average_volatility,
            in_position = result.in_position,
            action = ?result.action,
            "Cycle complete"
        );
        Ok(result)
    }

    async fn fetch_snapshot(&self, symbol: &str) -> Result<MarketSnapshot, CycleError> {
        let timeout = self.config.port_timeout();
        let data = &self.ports.market_data;

        let bars = with_timeout(timeout, data.fetch_bars(symbol, self.config.timeframe, self.config.history_limit))
            .await
            .map_err(|e| CycleError::DataUnavailable(format!("bars for {}: {}", symbol, e)))?;
        let price = with_timeout(timeout, data.fetch_price(symbol))
            .await
            .map_err(|e| CycleError::DataUnavailable(format!("price for {}: {}", symbol, e)))?;

        if !price.is_finite() || price <= 0.0 {
            return Err(CycleError::DataUnavailable(format!("invalid price {} for {}", price, symbol)));
        }
        let required = self.config.required_bars();
        if bars.len() < required {
            return Err(CycleError::InsufficientHistory {
                required,
                available: bars.len(),
            });
        }
        Ok(MarketSnapshot::new(symbol, self.config.timeframe, bars, price))
    }

    /// Settle an order left working by an earlier cycle.
    async fn reconcile_pending(&self, state: &mut SymbolState, outcome: &mut Outcome) {
        let Some(pending) = state.pending().cloned() else {
            return;
        };
        let exchange = self.ports.exchange.as_ref();
        let timeout = self.config.port_timeout();
        let symbol = state.symbol().to_string();

        let order = match with_timeout(timeout, exchange.order_status(pending.order_id)).await {
            Ok(order) => order,
            Err(e) => {
                warn!(symbol = %symbol, order_id = %pending.order_id, error = %e, "Pending order status unavailable");
                outcome.fault(CycleError::Execution(e.to_string()));
                return;
            }
        };

        match order.status {
            OrderStatus::Filled => {
                state.take_pending();
                let action = self.apply_fill(state, &pending, order.execution_price(), Some(order.id), outcome);
                outcome.action = action;
            }
            OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired => {
                state.take_pending();
                if order.filled_quantity > Decimal::ZERO {
                    outcome.action = self.apply_partial_fill(state, &pending, &order, outcome);
                } else {
                    warn!(symbol = %symbol, order_id = %order.id, status = ?order.status, "Pending order ended unfilled");
                }
            }
            OrderStatus::Accepted | OrderStatus::PartiallyFilled => {
                let age = match state.pending_mut() {
                    Some(p) => {
                        p.age += 1;
                        p.age
                    }
                    None => return,
                };
                if age < self.config.pending_ttl_cycles {
                    debug!(symbol = %symbol, order_id = %order.id, age, "Order still pending");
                    return;
                }
                match with_timeout(timeout, exchange.cancel_order(order.id)).await {
                    Ok(()) => {
                        info!(symbol = %symbol, order_id = %order.id, age, "Cancelled stale order");
                        state.take_pending();
                        // fills can land between the status read and the cancel
                        let settled = match with_timeout(timeout, exchange.order_status(order.id)).await {
                            Ok(settled) => settled,
                            Err(e) => {
                                warn!(symbol = %symbol, order_id = %order.id, error = %e, "Status after cancel unavailable");
                                order
                            }
                        };
                        outcome.action = if settled.filled_quantity > Decimal::ZERO {
                            self.apply_partial_fill(state, &pending, &settled, outcome)
                        } else {
                            CycleAction::Cancelled { order_id: settled.id }
                        };
                    }
                    Err(e) => {
                        warn!(symbol = %symbol, order_id = %order.id, error = %e, "Cancelling stale order failed");
                        outcome.fault(CycleError::Execution(e.to_string()));
                    }
                }
            }
        }
    }

    /// Apply the filled part of an order that will not fill any further.
    fn apply_partial_fill(
        &self,
        state: &mut SymbolState,
        pending: &PendingOrder,
        order: &Order,
        outcome: &mut Outcome,
    ) -> CycleAction {
        let price = order.execution_price();
        let filled = order.filled_quantity.min(pending.quantity);
        if filled >= pending.quantity {
            return self.apply_fill(state, pending, price, Some(order.id), outcome);
        }

        let symbol = state.symbol().to_string();
        info!(
            symbol = %symbol,
            order_id = %order.id,
            side = %pending.side,
            %filled,
            ordered = %pending.quantity,
            "Applying partial fill"
        );
        match pending.side {
            Side::Buy => {
                let partial = PendingOrder {
                    quantity: filled,
                    ..pending.clone()
                };
                self.apply_fill(state, &partial, price, Some(order.id), outcome)
            }
            Side::Sell => match state.reduce(filled) {
                Ok(position) => {
                    info!(symbol = %symbol, remaining = %position.quantity, "Position partially closed");
                    CycleAction::Cancelled { order_id: order.id }
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Partial exit could not be applied");
                    outcome.fault(CycleError::Execution(e.to_string()));
                    CycleAction::Cancelled { order_id: order.id }
                }
            },
        }
    }

    async fn read_sentiment(&self, asset: &str, state: &mut SymbolState, outcome: &mut Outcome) -> SentimentScore {
        let timeout = self.config.port_timeout();
        let fresh = match with_timeout(timeout, self.ports.texts.fetch_texts(asset)).await {
            Ok(texts) => with_timeout(timeout, self.ports.sentiment.sentiment(asset, &texts)).await,
            Err(e) => Err(e),
        };

        match fresh {
            Ok(score) => {
                state.last_sentiment = Some(score);
                score
            }
            Err(e) => {
                let fallback = state.last_sentiment.unwrap_or_default();
                warn!(
                    symbol = %state.symbol(),
                    asset,
                    error = %e,
                    fallback = fallback.value,
                    "Sentiment unavailable, using last known score"
                );
                outcome.degraded = true;
                outcome.fault(CycleError::Model(format!("sentiment: {}", e)));
                fallback
            }
        }
    }

    async fn read_forecast(&self, snapshot: &MarketSnapshot, state: &mut SymbolState, outcome: &mut Outcome) -> f64 {
        let timeout = self.config.port_timeout();
        let forecast = with_timeout(timeout, self.ports.forecaster.forecast_next(snapshot))
            .await
            .and_then(|value| {
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(PortError::Api(format!("non-finite forecast {}", value)))
                }
            });

        match forecast {
            Ok(value) => {
                state.last_forecast = Some(value);
                value
            }
            Err(e) => {
                let fallback = state.last_forecast.unwrap_or(snapshot.price());
                warn!(
                    symbol = %snapshot.symbol,
                    error = %e,
                    fallback,
                    "Forecast unavailable, using last known value"
                );
                outcome.degraded = true;
                outcome.fault(CycleError::Model(format!("forecast: {}", e)));
                fallback
            }
        }
    }

    /// Resolve and apply the futures leverage for this cycle. The last applied
    /// value is the baseline the next dynamic leverage scales from.
    async fn apply_leverage(
        &self,
        symbol: &str,
        explicit: Option<u32>,
        average_volatility: f64,
        sentiment: f64,
        state: &mut SymbolState,
        outcome: &mut Outcome,
    ) -> u32 {
        let current = state.leverage.unwrap_or_else(|| self.leverage.base());
        let target = self.leverage.resolve(explicit, current, average_volatility, sentiment);

        match with_timeout(self.config.port_timeout(), self.ports.exchange.set_leverage(symbol, target)).await {
            Ok(()) => {
                info!(symbol, leverage = target, previous = current, explicit = explicit.is_some(), "Leverage applied");
                state.leverage = Some(target);
                target
            }
            Err(e) => {
                warn!(symbol, target, current, error = %e, "Setting leverage failed");
                outcome.fault(CycleError::Execution(format!("set leverage: {}", e)));
                current
            }
        }
    }

    /// Report the futures margin ratio when supervision did not already read it.
    async fn read_margin_ratio(&self, symbol: &str, outcome: &mut Outcome) {
        match with_timeout(self.config.port_timeout(), self.ports.exchange.margin_ratio(symbol)).await {
            Ok(ratio) => {
                debug!(symbol, margin_ratio = ?ratio, "Margin ratio read");
                outcome.margin_ratio = ratio;
            }
            Err(e) => {
                warn!(symbol, error = %e, "Margin ratio unavailable");
                outcome.fault(CycleError::Execution(format!("margin ratio: {}", e)));
            }
        }
    }

    /// Apply risk rules to an open position. Returns whether they preempted
    /// the fresh decision.
    async fn supervise(&self, state: &mut SymbolState, price: Decimal, outcome: &mut Outcome) -> bool {
        let Some(position) = state.position().cloned() else {
            return false;
        };
        let verdict = self
            .supervisor
            .evaluate(self.ports.exchange.as_ref(), &position, price, Utc::now())
            .await;
        outcome.margin_ratio = verdict.margin_ratio;
        outcome.faults.extend(verdict.faults);

        match verdict.directive {
            RiskDirective::Hold => false,
            RiskDirective::Expire => {
                if state.clear().is_ok() {
                    outcome.action = CycleAction::Exited {
                        reason: ExitReason::OptionExpired,
                        order_id: None,
                        price,
                    };
                }
                true
            }
            RiskDirective::ForceExit(reason) => {
                if state.pending().is_some() {
                    warn!(symbol = %position.symbol, %reason, "Forced exit deferred behind a pending order");
                    return true;
                }
                self.exit(state, &position, reason, price, outcome).await;
                true
            }
        }
    }

    async fn exit(
        &self,
        state: &mut SymbolState,
        position: &Position,
        reason: ExitReason,
        price: Decimal,
        outcome: &mut Outcome,
    ) {
        let intent = PendingOrder {
            order_id: Uuid::nil(),
            side: Side::Sell,
            market: position.market,
            quantity: position.quantity,
            limit_price: price,
            leverage: position.leverage,
            exit_reason: Some(reason),
            age: 0,
        };
        self.dispatch(state, intent, outcome).await;
    }

    /// Pick and gate the fresh action for a symbol no risk rule preempted.
    #[allow(clippy::too_many_arguments)]
    async fn decide(
        &self,
        request: &CycleRequest,
        pair: &SymbolPair,
        fused: &FusedSignal,
        price: Decimal,
        leverage: u32,
        state: &mut SymbolState,
        outcome: &mut Outcome,
    ) {
        let symbol = request.symbol.as_str();
        let market = request.market;
        let candidate = self
            .decision
            .candidate(market, state.in_position(), fused, request.option.is_some());

        match candidate {
            Candidate::None => {}
            Candidate::OptionEntry => {
                let Some(params) = request.option.clone() else {
                    return;
                };
                let opened = Position::option(symbol, price, self.decision.trade_amount(), params)
                    .and_then(|position| state.open(position).map(|_| ()));
                match opened {
                    Ok(()) => {
                        info!(symbol, %market, %price, "Option position opened");
                        outcome.action = CycleAction::Entered {
                            order_id: None,
                            price,
                            quantity: self.decision.trade_amount(),
                        };
                    }
                    Err(e) => {
                        warn!(symbol, error = %e, "Option entry refused");
                        outcome.fault(CycleError::InvalidRequest(e.to_string()));
                    }
                }
            }
            Candidate::Buy | Candidate::Sell => {
                if state.pending().is_some() {
                    debug!(symbol, ?candidate, "Order pending, no new order this cycle");
                    return;
                }
                let balances = match with_timeout(
                    self.config.port_timeout(),
                    self.ports.exchange.fetch_balances(market),
                )
                .await
                {
                    Ok(balances) => balances,
                    Err(e) => {
                        warn!(symbol, %market, error = %e, "Balances unavailable, no trade this cycle");
                        outcome.fault(CycleError::BalanceUnavailable(e.to_string()));
                        return;
                    }
                };

                let gate = self.decision.gate(candidate, pair, &balances, price, market, leverage);
                if !gate.is_accepted() {
                    info!(symbol, %market, ?candidate, reason = %gate, "Decision not accepted");
                    return;
                }

                let intent = match (candidate, state.position()) {
                    (Candidate::Sell, Some(position)) => PendingOrder {
                        order_id: Uuid::nil(),
                        side: Side::Sell,
                        market: position.market,
                        quantity: position.quantity,
                        limit_price: price,
                        leverage: position.leverage,
                        exit_reason: Some(ExitReason::Signal),
                        age: 0,
                    },
                    _ => PendingOrder {
                        order_id: Uuid::nil(),
                        side: Side::Buy,
                        market,
                        quantity: self.decision.trade_amount(),
                        limit_price: price,
                        leverage,
                        exit_reason: None,
                        age: 0,
                    },
                };
                self.dispatch(state, intent, outcome).await;
            }
        }
    }

    /// Place the order described by `intent` and apply whatever the exchange
    /// confirmed.
    async fn dispatch(&self, state: &mut SymbolState, mut intent: PendingOrder, outcome: &mut Outcome) {
        let symbol = state.symbol().to_string();
        let result = self
            .dispatcher
            .execute(
                self.ports.exchange.as_ref(),
                &symbol,
                intent.side,
                intent.limit_price,
                intent.market,
                intent.quantity,
            )
            .await;

        match result {
            Ok(Dispatch::Filled { order, price }) => {
                let action = self.apply_fill(state, &intent, price, Some(order.id), outcome);
                outcome.action = action;
            }
            Ok(Dispatch::Pending(order)) => {
                info!(symbol = %symbol, side = %intent.side, order_id = %order.id, "Order pending fill");
                intent.order_id = order.id;
                outcome.action = CycleAction::Submitted {
                    side: intent.side,
                    order_id: order.id,
                };
                state.set_pending(intent);
            }
            Err(e) => {
                warn!(symbol = %symbol, side = %intent.side, error = %e, "Execution failed, position unchanged");
                outcome.fault(e);
            }
        }
    }

    /// Move the position state to match a filled order.
    fn apply_fill(
        &self,
        state: &mut SymbolState,
        intent: &PendingOrder,
        price: Decimal,
        order_id: Option<Uuid>,
        outcome: &mut Outcome,
    ) -> CycleAction {
        let symbol = state.symbol().to_string();
        match intent.side {
            Side::Buy => {
                let levels = self.supervisor.protection().levels_for(price);
                let opened = Position::long(&symbol, intent.market, price, intent.quantity, intent.leverage, levels)
                    .and_then(|position| state.open(position).map(|_| ()));
                match opened {
                    Ok(()) => {
                        info!(
                            symbol = %symbol,
                            market = %intent.market,
                            %price,
                            quantity = %intent.quantity,
                            stop_loss = %levels.stop_loss,
                            take_profit = %levels.take_profit,
                            "Position opened"
                        );
                        CycleAction::Entered {
                            order_id,
                            price,
                            quantity: intent.quantity,
                        }
                    }
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "Fill could not open a position");
                        outcome.fault(CycleError::Execution(e.to_string()));
                        CycleAction::None
                    }
                }
            }
            Side::Sell => {
                let reason = intent.exit_reason.unwrap_or(ExitReason::Signal);
                match state.clear() {
                    Ok(position) => {
                        info!(
                            symbol = %symbol,
                            market = %position.market,
                            %reason,
                            entry = %position.entry_price,
                            exit = %price,
                            pnl = %position.unrealized_pnl(price),
                            "Position closed"
                        );
                        CycleAction::Exited { reason, order_id, price }
                    }
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "Exit fill without an open position");
                        CycleAction::None
                    }
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_result(
        &self,
        request: &CycleRequest,
        state: &SymbolState,
        snapshot: &MarketSnapshot,
        indicators: &IndicatorSet,
        fused: &FusedSignal,
        sentiment: &SentimentScore,
        forecast: f64,
        leverage: u32,
        volatility: VolatilityProfile,
        outcome: Outcome,
    ) -> CycleResult {
        let position = state.position();
        let current = &indicators.current;
        CycleResult {
            symbol: request.symbol.clone(),
            market: request.market,
            timestamp: Utc::now(),
            current_price: snapshot.price(),
            predicted_price: forecast,
            sentiment_score: sentiment.value,
            buy_confidence: fused.buy_confidence,
            sell_confidence: fused.sell_confidence,
            buy_signal: fused.buy_signal,
            sell_signal: fused.sell_signal,
            in_position: position.is_some(),
            oscillator_value: current.rsi,
            trend_difference: current.macd,
            band_upper: current.band_upper,
            band_lower: current.band_lower,
            stop_loss: position.and_then(Position::stop_loss),
            take_profit: position.and_then(Position::take_profit),
            leverage,
            margin_ratio: outcome.margin_ratio,
            volatility,
            action: outcome.action,
            degraded: outcome.degraded,
            faults: outcome.faults,
        }
    }
}
