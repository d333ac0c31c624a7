//! Risk manager — turns composite signals into sized trade decisions.
//!
//! Sizing is volatility-scaled: quantity = equity * risk_per_trade /
//! (stop_atr_mult * ATR), capped so position notional never exceeds
//! max_position_fraction of equity. Stop and take levels are computed at
//! decision time and frozen into the position at entry.
//!
//! A drawdown circuit breaker blocks new entries (existing positions still
//! exit normally) once drawdown from peak reaches the configured limit.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{CompositeSignal, Direction, Portfolio, Position};
use crate::error::ConfigError;

/// Position sizing and protective exit parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Fraction of equity risked per trade (distance to stop).
    pub risk_per_trade: f64,
    /// Stop-loss distance in ATR multiples.
    pub stop_atr_mult: f64,
    /// Take-profit distance in ATR multiples.
    pub take_atr_mult: f64,
    /// Position notional cap as a fraction of equity.
    pub max_position_fraction: f64,
    /// ATR lookback period.
    pub atr_period: usize,
    /// Drawdown fraction at which new entries are blocked.
    pub max_drawdown: f64,
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("risk.risk_per_trade", self.risk_per_trade),
            ("risk.max_position_fraction", self.max_position_fraction),
            ("risk.max_drawdown", self.max_drawdown),
        ] {
            if !value.is_finite() || value <= 0.0 || value > 1.0 {
                return Err(ConfigError::FractionOutOfRange { name, value });
            }
        }
        for (name, value) in [
            ("risk.stop_atr_mult", self.stop_atr_mult),
            ("risk.take_atr_mult", self.take_atr_mult),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if self.atr_period == 0 {
            return Err(ConfigError::ZeroPeriod {
                name: "risk.atr_period",
                value: self.atr_period,
            });
        }
        Ok(())
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_per_trade: 0.01,
            stop_atr_mult: 2.0,
            take_atr_mult: 4.0,
            max_position_fraction: 0.25,
            atr_period: 14,
            max_drawdown: 0.25,
        }
    }
}

/// What the simulator should do about a symbol this bar.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskDecision {
    /// Enter at the next bar's open with frozen protective levels.
    Open {
        direction: Direction,
        quantity: f64,
        stop_loss: f64,
        take_profit: f64,
    },
    /// Exit the open position at the next bar's open.
    Close,
    Hold,
}

/// Stateless decision layer between fusion output and order placement.
#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn atr_period(&self) -> usize {
        self.config.atr_period
    }

    /// Volatility-scaled quantity for an entry at `price` with ATR `atr`.
    ///
    /// Returns `None` when the inputs cannot produce a positive size —
    /// a zero quantity is not an order.
    pub fn size_position(&self, equity: f64, price: f64, atr: f64) -> Option<f64> {
        if !equity.is_finite() || equity <= 0.0 || price <= 0.0 || atr <= 0.0 {
            return None;
        }
        let risk_quantity = equity * self.config.risk_per_trade / (self.config.stop_atr_mult * atr);
        let cap_quantity = equity * self.config.max_position_fraction / price;
        let quantity = risk_quantity.min(cap_quantity);
        if quantity > 0.0 {
            Some(quantity)
        } else {
            None
        }
    }

    /// Frozen protective levels for an entry at `price`.
    pub fn protective_levels(&self, direction: Direction, price: f64, atr: f64) -> (f64, f64) {
        let stop_dist = self.config.stop_atr_mult * atr;
        let take_dist = self.config.take_atr_mult * atr;
        match direction {
            Direction::Short => (price + stop_dist, price - take_dist),
            _ => (price - stop_dist, price + take_dist),
        }
    }

    /// Decide for one symbol given the fused signal and portfolio state.
    ///
    /// `composite` is `None` when every source abstained; `atr` is `None`
    /// when volatility cannot be estimated (insufficient or bad history).
    /// Both mean no new entry. `reference_price` is the decision bar's
    /// close, used only for sizing and level math; fills happen later at
    /// the next open.
    pub fn decide(
        &self,
        composite: Option<&CompositeSignal>,
        position: Option<&Position>,
        portfolio: &Portfolio,
        drawdown: f64,
        reference_price: f64,
        atr: Option<f64>,
        equity: f64,
    ) -> RiskDecision {
        let direction = composite.map_or(Direction::Flat, |c| c.direction);

        if let Some(pos) = position {
            // Exit when the composite flips against the position. Flat or
            // abstention holds: exits then come from stops/takes.
            if direction != Direction::Flat && direction == pos.direction().opposite() {
                return RiskDecision::Close;
            }
            return RiskDecision::Hold;
        }

        if direction == Direction::Flat {
            return RiskDecision::Hold;
        }

        if drawdown >= self.config.max_drawdown {
            warn!(
                drawdown,
                limit = self.config.max_drawdown,
                "drawdown circuit breaker active; blocking new entry"
            );
            return RiskDecision::Hold;
        }

        let Some(atr) = atr else {
            return RiskDecision::Hold;
        };
        let Some(quantity) = self.size_position(equity, reference_price, atr) else {
            return RiskDecision::Hold;
        };
        // One open position per symbol; the portfolio invariant is upheld
        // here rather than trusted downstream.
        debug_assert!(composite.is_some());
        debug_assert!(!portfolio.has_open_position(
            composite.map(|c| c.symbol.as_str()).unwrap_or_default()
        ));

        let (stop_loss, take_profit) = self.protective_levels(direction, reference_price, atr);
        debug!(
            ?direction,
            quantity, stop_loss, take_profit, "sized new entry"
        );
        RiskDecision::Open {
            direction,
            quantity,
            stop_loss,
            take_profit,
        }
    }
}
