//! Order Execution Engine
//!
//! Converts a stream of price observations into buy/sell decisions and order
//! placements for one trading pair, following a step-martingale policy:
//! every adverse move of a fixed percentage adds to the position with an
//! escalating notional, and a favourable move of the same magnitude closes
//! it entirely.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (OrderSide, SymbolConstraints, etc.)
//! - [`errors`] - Error types
//! - [`events`] - Structured trade events and the log-sink boundary
//! - [`qty`] - Quantity normalization against lot-size constraints
//! - [`retry`] - Retry-with-backoff wrapper for remote calls
//! - [`strategy`] - Step table, engine state, and the pure decision step
//! - [`executor`] - Market gateway trait (mockable for testing)
//! - [`engine`] - Order execution: constraints cache, normalization, placement
//! - [`runner`] - Polling loop and cancellation
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use step_martingale_bot::config::StrategyConfig;
//! use step_martingale_bot::engine::{CancelToken, Engine, JsonLogSink, TradingLoop};
//! use step_martingale_bot::market::BybitGateway;
//!
//! let sink = Arc::new(JsonLogSink);
//! let engine = Engine::new(strategy_config, sink.clone());
//! let mut bot = TradingLoop::new(Arc::new(gateway), engine, sink);
//!
//! let cancel = CancelToken::new();
//! bot.run(&cancel).await;
//! ```

pub mod engine;
pub mod errors;
pub mod events;
pub mod executor;
pub mod qty;
pub mod retry;
pub mod runner;
pub mod strategy;
pub mod types;

// Re-export commonly used types
pub use engine::Engine;
pub use errors::{BotError, BotResult};
pub use events::{EventKind, EventSink, JsonLogSink, MemorySink, Outcome, TradeEvent};
pub use executor::MarketGateway;
pub use qty::normalize;
pub use retry::{call_with_retry, DEFAULT_MAX_ATTEMPTS};
pub use runner::{CancelToken, TradingLoop};
pub use strategy::{decide, trade_notional, EngineState, PendingTrade, STEP_MULTIPLIERS};
pub use types::{OrderAck, OrderSide, PriceQuote, SymbolConstraints, TradeMode};
