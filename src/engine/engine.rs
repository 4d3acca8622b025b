//! Order execution engine
//!
//! Binds the pure decision step to the gateway: fetches and caches lot-size
//! constraints, normalizes quantities, places limit orders through the retry
//! layer, and emits one trade event per attempted action. Owns the
//! [`EngineState`] for a single strategy run; no other code mutates it.

use std::sync::Arc;

use log::{debug, info};

use crate::config::StrategyConfig;

use super::events::{EventKind, EventSink, TradeEvent};
use super::executor::MarketGateway;
use super::qty::normalize;
use super::retry::{call_with_retry, DEFAULT_MAX_ATTEMPTS};
use super::strategy::{decide, EngineState, PendingTrade};
use super::types::{OrderSide, SymbolConstraints};

/// Limit prices are quoted to one decimal place, matching the instrument's
/// tick size on the reference deployment.
const PRICE_DECIMALS: i32 = 1;

/// How the engine handled one order intent
#[derive(Debug, Clone, PartialEq, Eq)]
enum ExecOutcome {
    /// Order reached the exchange and was accepted
    Placed,
    /// Order was attempted but refused (policy or gateway rejection)
    Rejected,
    /// Constraints were unavailable; nothing was attempted
    SkippedNoConstraints,
}

/// Single-symbol execution engine
pub struct Engine {
    config: StrategyConfig,
    state: EngineState,
    constraints: Option<SymbolConstraints>,
    sink: Arc<dyn EventSink>,
}

impl Engine {
    pub fn new(config: StrategyConfig, sink: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            state: EngineState::new(),
            constraints: None,
            sink,
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Evaluate one price sample and execute the resulting order, if any.
    ///
    /// The proposed state transition is committed unless execution was
    /// skipped because constraints were unavailable; in that case the next
    /// poll retries from identical state.
    pub async fn on_price<G: MarketGateway>(&mut self, gateway: &G, price: f64) {
        let Some(pending) = decide(&self.state, &self.config, price) else {
            debug!("price {} within band, no action", price);
            return;
        };

        match self.execute(gateway, &pending, price).await {
            ExecOutcome::SkippedNoConstraints => {
                debug!("keeping state, constraints unavailable at price {}", price);
            }
            ExecOutcome::Placed | ExecOutcome::Rejected => {
                self.state = pending.next;
            }
        }
    }

    async fn execute<G: MarketGateway>(
        &mut self,
        gateway: &G,
        pending: &PendingTrade,
        price: f64,
    ) -> ExecOutcome {
        let kind = event_kind(pending.side);

        let constraints = match self.ensure_constraints(gateway).await {
            Some(c) => c,
            None => {
                self.sink.emit(TradeEvent::failed(
                    kind,
                    0.0,
                    price,
                    "symbol info unavailable",
                ));
                return ExecOutcome::SkippedNoConstraints;
            }
        };

        let qty = normalize(pending.notional / price, &constraints);
        if qty < constraints.min_order_qty {
            self.sink.emit(TradeEvent::failed(
                kind,
                qty,
                price,
                format!("quantity below minimum: {}", constraints.min_order_qty),
            ));
            return ExecOutcome::Rejected;
        }

        let limit_price = round_price(price);
        let symbol = self.config.symbol.clone();
        let ack = call_with_retry("place order", DEFAULT_MAX_ATTEMPTS, || {
            gateway.place_order(&symbol, pending.side, qty, limit_price)
        })
        .await;

        match ack {
            Some(ack) if ack.is_ok() => {
                info!(
                    "{} {} {} @ {} accepted",
                    self.config.symbol,
                    pending.side.as_str(),
                    qty,
                    limit_price
                );
                self.sink.emit(TradeEvent::success(kind, qty, limit_price));
                ExecOutcome::Placed
            }
            Some(ack) => {
                // Business rejection; a stale lot-size filter may be the
                // cause, so re-fetch constraints on the next attempt.
                self.constraints = None;
                self.sink
                    .emit(TradeEvent::failed(kind, qty, limit_price, ack.ret_msg));
                ExecOutcome::Rejected
            }
            None => {
                self.sink.emit(TradeEvent::failed(
                    kind,
                    qty,
                    limit_price,
                    "order placement failed",
                ));
                ExecOutcome::Rejected
            }
        }
    }

    /// Cached constraints, fetched through the retry layer on first use
    async fn ensure_constraints<G: MarketGateway>(
        &mut self,
        gateway: &G,
    ) -> Option<SymbolConstraints> {
        if let Some(c) = self.constraints {
            return Some(c);
        }

        let symbol = self.config.symbol.clone();
        let fetched = call_with_retry("fetch symbol constraints", DEFAULT_MAX_ATTEMPTS, || {
            gateway.fetch_symbol_constraints(&symbol)
        })
        .await?;

        debug!(
            "constraints for {}: min {}, step {}",
            self.config.symbol, fetched.min_order_qty, fetched.qty_step
        );
        self.constraints = Some(fetched);
        Some(fetched)
    }
}

fn event_kind(side: OrderSide) -> EventKind {
    match side {
        OrderSide::Buy => EventKind::Buy,
        OrderSide::Sell => EventKind::Sell,
    }
}

fn round_price(price: f64) -> f64 {
    let scale = 10f64.powi(PRICE_DECIMALS);
    (price * scale).round() / scale
}
