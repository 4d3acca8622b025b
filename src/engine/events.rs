//! Structured trade events and the log-sink boundary

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

/// What a trade event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PriceCheck,
    Buy,
    Sell,
}

/// Outcome of the attempted action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Success,
    Failed,
}

/// Immutable record of one price sample or order attempt
///
/// Created at the moment an action is attempted, never mutated, and handed
/// off to the sink in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub quantity: f64,
    pub price: f64,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TradeEvent {
    pub fn price_check(price: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            kind: EventKind::PriceCheck,
            quantity: 0.0,
            price,
            outcome: Outcome::Success,
            error: None,
        }
    }

    pub fn success(kind: EventKind, quantity: f64, price: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            quantity,
            price,
            outcome: Outcome::Success,
            error: None,
        }
    }

    pub fn failed(kind: EventKind, quantity: f64, price: f64, error: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            quantity,
            price,
            outcome: Outcome::Failed,
            error: Some(error.into()),
        }
    }
}

/// Receives trade events in emission order; fire-and-forget
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TradeEvent);
}

/// Sink that writes each event as one JSON line through the logger
#[derive(Debug, Default)]
pub struct JsonLogSink;

impl EventSink for JsonLogSink {
    fn emit(&self, event: TradeEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => info!("{}", line),
            Err(e) => info!("unserializable event {:?}: {}", event, e),
        }
    }
}

/// Sink that collects events in memory, for tests
#[derive(Debug, Default)]
pub struct MemorySink {
    events: std::sync::Mutex<Vec<TradeEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TradeEvent> {
        self.events.lock().expect("sink lock poisoned").clone()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: TradeEvent) {
        self.events.lock().expect("sink lock poisoned").push(event);
    }
}
