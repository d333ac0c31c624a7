//! Backtest engine: cost model and the bar-by-bar simulator.

pub mod cost_model;
pub mod simulator;

pub use cost_model::{CostConfig, CostModel};
pub use simulator::{
    RunPhase, RunStatus, SimulationResult, Simulator, SimulatorConfig,
};
