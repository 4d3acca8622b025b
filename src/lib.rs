#![deny(unreachable_pub)]
pub mod config;
pub mod engine;
pub mod market;

pub use config::{ApiConfig, LogConfig, Settings, StrategyConfig};
pub use engine::{
    BotError, BotResult, CancelToken, Engine, EngineState, EventSink, JsonLogSink, MarketGateway,
    OrderSide, SymbolConstraints, TradeEvent, TradeMode, TradingLoop,
};
pub use market::BybitGateway;
