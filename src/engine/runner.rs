//! Trading loop - drives the engine at a fixed polling cadence

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::sync::watch;

use crate::config::StrategyConfig;

use super::engine::Engine;
use super::events::{EventSink, TradeEvent};
use super::executor::MarketGateway;
use super::retry::{call_with_retry, DEFAULT_MAX_ATTEMPTS};

/// Remaining-request budget below which the loop takes an extra cool-down
const RATE_LIMIT_LOW_WATER: u32 = 10;
/// Fixed cool-down applied when the budget runs low
const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(10);

/// Cooperative stop signal, polled at each iteration boundary.
///
/// Cancellation does not reach into in-flight network calls; it stops the
/// loop before the next iteration begins and interrupts the poll-interval
/// and cool-down sleeps.
#[derive(Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request the loop to stop
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // wait_for checks the current value first, so a token cancelled
        // before the subscription resolves immediately
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls the price and feeds the engine until cancelled
pub struct TradingLoop<G: MarketGateway> {
    gateway: Arc<G>,
    engine: Engine,
    sink: Arc<dyn EventSink>,
}

impl<G: MarketGateway> TradingLoop<G> {
    pub fn new(gateway: Arc<G>, engine: Engine, sink: Arc<dyn EventSink>) -> Self {
        Self {
            gateway,
            engine,
            sink,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Run until the token is cancelled.
    ///
    /// Each iteration samples the price (falling back to the configured base
    /// price when the gateway is unreachable), emits a PRICE_CHECK event,
    /// runs one engine transition, honours the exchange's rate-limit budget,
    /// then sleeps for the poll interval. Gateway failures never terminate
    /// the loop.
    pub async fn run(&mut self, cancel: &CancelToken) {
        let config = self.engine.config().clone();
        info!(
            "trading loop started: {} {:?}, base price {}, threshold {}%",
            config.symbol,
            config.mode,
            config.base_price,
            config.threshold_pct * 100.0
        );

        let poll_interval = Duration::from_secs(config.poll_interval_secs);

        while !cancel.is_cancelled() {
            let rate_limited = self.tick(&config).await;

            if rate_limited {
                warn!(
                    "rate-limit budget below {}, cooling down for {:?}",
                    RATE_LIMIT_LOW_WATER, RATE_LIMIT_COOLDOWN
                );
                if idle(RATE_LIMIT_COOLDOWN, cancel).await {
                    break;
                }
            }

            if idle(poll_interval, cancel).await {
                break;
            }
        }

        info!("trading loop stopped: {}", config.symbol);
    }

    /// One poll cycle; returns whether the rate-limit budget ran low
    async fn tick(&mut self, config: &StrategyConfig) -> bool {
        let quote = call_with_retry("fetch last price", DEFAULT_MAX_ATTEMPTS, || {
            self.gateway.fetch_last_price(&config.symbol)
        })
        .await;

        let (price, remaining) = match quote {
            Some(q) => (q.last_price, q.rate_limit_remaining),
            None => {
                warn!(
                    "price unavailable for {}, falling back to base price {}",
                    config.symbol, config.base_price
                );
                (config.base_price, None)
            }
        };

        self.sink.emit(TradeEvent::price_check(price));
        self.engine.on_price(self.gateway.as_ref(), price).await;

        remaining.is_some_and(|r| r < RATE_LIMIT_LOW_WATER)
    }
}

/// Sleep that a cancellation interrupts; returns true when cancelled
async fn idle(duration: Duration, cancel: &CancelToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = cancel.cancelled() => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::errors::BotError;
    use crate::engine::events::{EventKind, MemorySink, Outcome};
    use crate::engine::executor::mock::MockGateway;
    use crate::engine::types::{PriceQuote, SymbolConstraints, TradeMode};

    fn config() -> StrategyConfig {
        StrategyConfig {
            symbol: "ETHUSDT".into(),
            mode: TradeMode::Long,
            base_price: 1500.0,
            threshold_pct: 0.02,
            poll_interval_secs: 5,
            test_mode: true,
        }
    }

    fn build_loop(gateway: Arc<MockGateway>) -> (TradingLoop<MockGateway>, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let engine = Engine::new(config(), sink.clone());
        (TradingLoop::new(gateway, engine, sink.clone()), sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_start_runs_no_iteration() {
        let gateway = Arc::new(MockGateway::new(SymbolConstraints::new(0.001, 0.001)));
        let (mut trading_loop, sink) = build_loop(gateway.clone());

        let cancel = CancelToken::new();
        cancel.cancel();
        trading_loop.run(&cancel).await;

        assert!(sink.events().is_empty());
        assert!(gateway.placed_orders().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_sleep_stops_loop() {
        let gateway = Arc::new(MockGateway::new(SymbolConstraints::new(0.001, 0.001)));
        gateway.push_price(Ok(PriceQuote::new(1500.0)));
        let (mut trading_loop, sink) = build_loop(gateway.clone());

        let cancel = CancelToken::new();
        let canceller = cancel.clone();
        let handle = tokio::spawn(async move {
            // Fires inside the first poll-interval sleep
            tokio::time::sleep(Duration::from_secs(2)).await;
            canceller.cancel();
        });

        trading_loop.run(&cancel).await;
        handle.await.unwrap();

        // Exactly one iteration: one PRICE_CHECK plus the opening buy
        let events = sink.events();
        assert_eq!(
            events
                .iter()
                .filter(|e| e.kind == EventKind::PriceCheck)
                .count(),
            1
        );
        assert_eq!(gateway.placed_orders().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_price_failure_falls_back_to_base_price() {
        // Scenario D: all 3 price attempts fail, loop does not crash and
        // still emits a PRICE_CHECK at the base price.
        let gateway = Arc::new(MockGateway::new(SymbolConstraints::new(0.001, 0.001)));
        for _ in 0..3 {
            gateway.push_price(Err(BotError::Gateway("ticker down".into())));
        }
        let (mut trading_loop, sink) = build_loop(gateway.clone());

        let cancel = CancelToken::new();
        let canceller = cancel.clone();
        let handle = tokio::spawn(async move {
            // Past the 1s + 2s retry backoffs, inside the poll sleep
            tokio::time::sleep(Duration::from_secs(4)).await;
            canceller.cancel();
        });

        trading_loop.run(&cancel).await;
        handle.await.unwrap();

        let events = sink.events();
        let price_check = events
            .iter()
            .find(|e| e.kind == EventKind::PriceCheck)
            .expect("PRICE_CHECK emitted despite gateway failure");
        assert_eq!(price_check.price, 1500.0);
        assert_eq!(price_check.outcome, Outcome::Success);

        // The engine still ran a transition at the fallback price
        assert_eq!(gateway.placed_orders().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_rate_limit_triggers_cooldown() {
        let gateway = Arc::new(MockGateway::new(SymbolConstraints::new(0.001, 0.001)));
        gateway.push_price(Ok(PriceQuote {
            last_price: 1500.0,
            rate_limit_remaining: Some(3),
        }));
        gateway.push_price(Ok(PriceQuote::new(1500.0)));
        let (mut trading_loop, sink) = build_loop(gateway.clone());

        let cancel = CancelToken::new();
        let canceller = cancel.clone();
        let handle = tokio::spawn(async move {
            // First iteration ends at 10s (cool-down) + 5s (poll interval);
            // cancel midway through the second iteration's sleep.
            tokio::time::sleep(Duration::from_secs(17)).await;
            canceller.cancel();
        });

        trading_loop.run(&cancel).await;
        handle.await.unwrap();

        // Cool-down delayed the second tick: at 17s only two PRICE_CHECKs
        // have happened (t=0 and t=15).
        let checks = sink
            .events()
            .iter()
            .filter(|e| e.kind == EventKind::PriceCheck)
            .count();
        assert_eq!(checks, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multiple_iterations_advance_state() {
        let gateway = Arc::new(MockGateway::new(SymbolConstraints::new(0.001, 0.001)));
        gateway.push_price(Ok(PriceQuote::new(1500.0)));
        gateway.push_price(Ok(PriceQuote::new(1469.0)));
        gateway.push_price(Ok(PriceQuote::new(1530.0)));
        let (mut trading_loop, _sink) = build_loop(gateway.clone());

        let cancel = CancelToken::new();
        let canceller = cancel.clone();
        let handle = tokio::spawn(async move {
            // Three iterations at 0s, 5s, 10s; cancel during the third sleep
            tokio::time::sleep(Duration::from_secs(12)).await;
            canceller.cancel();
        });

        trading_loop.run(&cancel).await;
        handle.await.unwrap();

        // open + add + close
        assert_eq!(gateway.placed_orders().len(), 3);
        assert_eq!(*trading_loop.engine().state(), crate::engine::strategy::EngineState::new());
    }
}
