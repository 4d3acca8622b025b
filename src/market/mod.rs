//! Exchange gateway implementations
//!
//! The engine only sees the [`MarketGateway`](crate::engine::MarketGateway)
//! trait; this module provides the real Bybit v5 REST implementation.

pub mod bybit;

pub use bybit::{BybitGateway, MAINNET_API_URL, TESTNET_API_URL};
