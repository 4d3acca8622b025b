//! Core data types for the step-martingale engine

use serde::{Deserialize, Serialize};

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    /// Convert to the exchange side string
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "Buy",
            OrderSide::Sell => "Sell",
        }
    }
}

/// Strategy direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeMode {
    /// Accumulate on dips, exit on a rally
    Long,
    /// Accumulate on rallies, exit on a dip
    Short,
}

impl TradeMode {
    /// Side used when adding to the position
    pub fn entry_side(&self) -> OrderSide {
        match self {
            TradeMode::Long => OrderSide::Buy,
            TradeMode::Short => OrderSide::Sell,
        }
    }

    /// Side used when closing the position
    pub fn exit_side(&self) -> OrderSide {
        self.entry_side().opposite()
    }
}

/// Lot-size constraints fetched from the exchange instrument meta
///
/// `qty_precision` is the number of decimal places implied by `qty_step`,
/// derived as `round(-log10(qty_step))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymbolConstraints {
    /// Minimum order quantity in base-asset units
    pub min_order_qty: f64,
    /// Quantity granularity; orders must be exact multiples
    pub qty_step: f64,
    /// Decimal places implied by `qty_step`
    pub qty_precision: u32,
}

impl SymbolConstraints {
    /// Build constraints from the exchange lot-size filter, deriving precision
    pub fn new(min_order_qty: f64, qty_step: f64) -> Self {
        let qty_precision = (-qty_step.log10()).round().max(0.0) as u32;
        Self {
            min_order_qty,
            qty_step,
            qty_precision,
        }
    }
}

/// Last-price sample, with the exchange's remaining rate-limit budget when
/// the gateway surfaces one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub last_price: f64,
    pub rate_limit_remaining: Option<u32>,
}

impl PriceQuote {
    pub fn new(last_price: f64) -> Self {
        Self {
            last_price,
            rate_limit_remaining: None,
        }
    }
}

/// Gateway acknowledgement for an order placement
///
/// A non-zero `ret_code` is a business rejection (rate limit, invalid order),
/// not a transport failure, and is never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAck {
    pub ret_code: i64,
    pub ret_msg: String,
}

impl OrderAck {
    pub fn is_ok(&self) -> bool {
        self.ret_code == 0
    }
}
