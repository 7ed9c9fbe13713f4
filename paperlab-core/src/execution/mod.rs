//! Execution simulation: cost profiles, deterministic fills, the simulator.

pub mod cost_model;
pub mod fill;
pub mod simulator;

pub use cost_model::{CostModelConfig, CostProfile};
pub use fill::{evaluate_fill, FillDraw};
pub use simulator::{ExecutionSimulator, SendOutcome, SimulatorConfig};
