//! Cost model — slippage and commission at fill time.
//!
//! Slippage is adverse and directional: buyers pay up, sellers receive
//! less. A seeded jitter term perturbs the slippage fraction so fills are
//! not perfectly uniform while runs stay byte-for-byte reproducible for a
//! given seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::OrderSide;
use crate::error::ConfigError;

/// Friction parameters, all in basis points of notional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostConfig {
    /// Base slippage in basis points, applied adversely.
    pub slippage_bps: f64,
    /// Uniform jitter half-width in basis points added to the slippage.
    pub slippage_jitter_bps: f64,
    /// Commission in basis points per side.
    pub commission_bps: f64,
}

impl CostConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("costs.slippage_bps", self.slippage_bps),
            ("costs.slippage_jitter_bps", self.slippage_jitter_bps),
            ("costs.commission_bps", self.commission_bps),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        Ok(())
    }
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            slippage_bps: 2.0,
            slippage_jitter_bps: 1.0,
            commission_bps: 1.0,
        }
    }
}

/// Deterministic cost model: same seed, same fills.
#[derive(Debug)]
pub struct CostModel {
    config: CostConfig,
    rng: StdRng,
}

impl CostModel {
    pub fn new(config: CostConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn frictionless(seed: u64) -> Self {
        Self {
            config: CostConfig {
                slippage_bps: 0.0,
                slippage_jitter_bps: 0.0,
                commission_bps: 0.0,
            },
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Apply adverse slippage to a raw fill price.
    ///
    /// Returns `(slipped_price, slippage_dollars)`.
    pub fn apply_slippage(&mut self, raw_price: f64, side: OrderSide, quantity: f64) -> (f64, f64) {
        let jitter = if self.config.slippage_jitter_bps > 0.0 {
            self.rng
                .gen_range(-self.config.slippage_jitter_bps..=self.config.slippage_jitter_bps)
        } else {
            0.0
        };
        // Jitter never flips slippage favorable.
        let bps = (self.config.slippage_bps + jitter).max(0.0);
        if bps == 0.0 {
            return (raw_price, 0.0);
        }
        let fraction = bps / 10_000.0;
        match side {
            OrderSide::Buy => {
                let slipped = raw_price * (1.0 + fraction);
                (slipped, (slipped - raw_price) * quantity.abs())
            }
            OrderSide::Sell => {
                let slipped = raw_price * (1.0 - fraction);
                (slipped, (raw_price - slipped) * quantity.abs())
            }
        }
    }

    /// Commission in dollars for a fill of `quantity` at `price`.
    pub fn commission(&self, price: f64, quantity: f64) -> f64 {
        price * quantity.abs() * self.config.commission_bps / 10_000.0
    }
}
