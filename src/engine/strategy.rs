//! Step-martingale strategy - the pure decision step
//!
//! Each price sample maps the current [`EngineState`] to zero or one
//! [`PendingTrade`]. The caller (the execution engine) decides whether the
//! proposed next state is committed, so the transition itself stays pure and
//! fully unit-testable.

use serde::{Deserialize, Serialize};

use crate::config::StrategyConfig;

use super::types::{OrderSide, TradeMode};

/// Escalating order-size multipliers, one per adverse move.
///
/// Four blocks of four equal values, strictly non-decreasing. The step index
/// is clamped to the last entry, so arbitrarily long losing streaks never run
/// off the table.
pub const STEP_MULTIPLIERS: [f64; 16] = [
    1.0, 1.0, 1.0, 1.0, //
    1.3333, 1.3333, 1.3333, 1.3333, //
    1.6666, 1.6666, 1.6666, 1.6666, //
    2.0, 2.0, 2.0, 2.0,
];

/// Notional value for a given step: `base_price * multiplier`
pub fn trade_notional(base_price: f64, step_index: usize) -> f64 {
    let clamped = step_index.min(STEP_MULTIPLIERS.len() - 1);
    base_price * STEP_MULTIPLIERS[clamped]
}

/// Mutable strategy state, owned exclusively by one engine instance.
///
/// `last_trade_price == None` means UNINITIALIZED: the next tick opens a
/// fresh position. Closing a position returns to this state rather than
/// reopening in the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub step_index: usize,
    pub last_trade_price: Option<f64>,
    pub total_holdings: f64,
}

impl EngineState {
    pub fn new() -> Self {
        Self {
            step_index: 0,
            last_trade_price: None,
            total_holdings: 0.0,
        }
    }

    /// True when a position is open
    pub fn is_holding(&self) -> bool {
        self.last_trade_price.is_some() && self.total_holdings > 0.0
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}

/// A proposed order plus the state the engine moves to once it is handled
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingTrade {
    pub side: OrderSide,
    /// Monetary value of the order; quantity is `notional / price`
    pub notional: f64,
    pub next: EngineState,
}

/// Evaluate one price sample against the current state.
///
/// Returns `None` when neither threshold is crossed. For a degenerate
/// `threshold_pct` of zero both conditions meet at equality; close is
/// evaluated first, so the position is exited deterministically.
pub fn decide(state: &EngineState, config: &StrategyConfig, price: f64) -> Option<PendingTrade> {
    let last = match state.last_trade_price {
        Some(last) => last,
        None => return Some(open_position(config, price)),
    };

    let close_hit = match config.mode {
        TradeMode::Long => price >= last * (1.0 + config.threshold_pct),
        TradeMode::Short => price <= last * (1.0 - config.threshold_pct),
    };
    if close_hit {
        return Some(PendingTrade {
            side: config.mode.exit_side(),
            notional: state.total_holdings * price,
            // Back to UNINITIALIZED; the next tick reopens at its own price.
            next: EngineState::new(),
        });
    }

    let add_hit = match config.mode {
        TradeMode::Long => price <= last * (1.0 - config.threshold_pct),
        TradeMode::Short => price >= last * (1.0 + config.threshold_pct),
    };
    if add_hit {
        let step_index = (state.step_index + 1).min(STEP_MULTIPLIERS.len() - 1);
        let notional = trade_notional(config.base_price, step_index);
        return Some(PendingTrade {
            side: config.mode.entry_side(),
            notional,
            next: EngineState {
                step_index,
                last_trade_price: Some(price),
                total_holdings: state.total_holdings + notional / price,
            },
        });
    }

    None
}

fn open_position(config: &StrategyConfig, price: f64) -> PendingTrade {
    let notional = trade_notional(config.base_price, 0);
    PendingTrade {
        side: config.mode.entry_side(),
        notional,
        next: EngineState {
            step_index: 0,
            last_trade_price: Some(price),
            total_holdings: notional / price,
        },
    }
}
