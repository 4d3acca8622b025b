//! Market gateway abstraction - enables mocking for tests

use async_trait::async_trait;

use super::errors::BotResult;
use super::types::{OrderAck, OrderSide, PriceQuote, SymbolConstraints};

/// Exchange operations the engine consumes - can be mocked for testing.
///
/// Transport failures surface as `Err`; exchange business rejections on
/// order placement come back as an `Ok` ack with a non-zero result code, so
/// the retry layer only retries what is actually transient.
#[async_trait]
pub trait MarketGateway: Send + Sync {
    /// Fetch lot-size constraints for a symbol
    async fn fetch_symbol_constraints(&self, symbol: &str) -> BotResult<SymbolConstraints>;

    /// Fetch the last traded price, with the remaining rate-limit budget
    /// when the exchange reports one
    async fn fetch_last_price(&self, symbol: &str) -> BotResult<PriceQuote>;

    /// Place a limit order
    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        qty: f64,
        limit_price: f64,
    ) -> BotResult<OrderAck>;
}

// ============================================================================
// Mock implementation for testing
// ============================================================================

/// Mock gateway for exercising the engine and loop without an exchange.
pub mod mock {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::engine::errors::BotError;

    /// A recorded order placement
    #[derive(Debug, Clone, PartialEq)]
    pub struct PlacedOrder {
        pub symbol: String,
        pub side: OrderSide,
        pub qty: f64,
        pub limit_price: f64,
    }

    /// Mock gateway with scripted prices and failure injection
    pub struct MockGateway {
        pub constraints: Mutex<BotResult<SymbolConstraints>>,
        pub prices: Mutex<VecDeque<BotResult<PriceQuote>>>,
        pub orders: Mutex<Vec<PlacedOrder>>,
        pub order_ack: Mutex<BotResult<OrderAck>>,
        pub constraints_fetches: Mutex<u32>,
    }

    impl MockGateway {
        pub fn new(constraints: SymbolConstraints) -> Self {
            Self {
                constraints: Mutex::new(Ok(constraints)),
                prices: Mutex::new(VecDeque::new()),
                orders: Mutex::new(Vec::new()),
                order_ack: Mutex::new(Ok(OrderAck {
                    ret_code: 0,
                    ret_msg: "OK".into(),
                })),
                constraints_fetches: Mutex::new(0),
            }
        }

        /// Queue the next price quote (or failure)
        pub fn push_price(&self, quote: BotResult<PriceQuote>) {
            self.prices.lock().unwrap().push_back(quote);
        }

        /// Make constraint fetches fail from now on
        pub fn fail_constraints(&self, msg: &str) {
            *self.constraints.lock().unwrap() = Err(BotError::Gateway(msg.into()));
        }

        /// Set the ack returned for every subsequent placement
        pub fn set_order_ack(&self, ack: BotResult<OrderAck>) {
            *self.order_ack.lock().unwrap() = ack;
        }

        pub fn placed_orders(&self) -> Vec<PlacedOrder> {
            self.orders.lock().unwrap().clone()
        }

        pub fn constraints_fetch_count(&self) -> u32 {
            *self.constraints_fetches.lock().unwrap()
        }
    }

    #[async_trait]
    impl MarketGateway for MockGateway {
        async fn fetch_symbol_constraints(&self, _symbol: &str) -> BotResult<SymbolConstraints> {
            *self.constraints_fetches.lock().unwrap() += 1;
            self.constraints.lock().unwrap().clone()
        }

        async fn fetch_last_price(&self, _symbol: &str) -> BotResult<PriceQuote> {
            self.prices
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(BotError::Gateway("no scripted price".into())))
        }

        async fn place_order(
            &self,
            symbol: &str,
            side: OrderSide,
            qty: f64,
            limit_price: f64,
        ) -> BotResult<OrderAck> {
            let ack = self.order_ack.lock().unwrap().clone();
            if ack.is_ok() {
                self.orders.lock().unwrap().push(PlacedOrder {
                    symbol: symbol.to_string(),
                    side,
                    qty,
                    limit_price,
                });
            }
            ack
        }
    }
}
