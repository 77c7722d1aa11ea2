//! Schelling-style residential segregation model.
//!
//! A [`World`] is a fixed grid of cells holding at most one agent each. Agents
//! belong to a group and move when too few of their neighbours share it. The
//! [`SchellingSimulation`] controller seeds the grid and advances it one agent
//! move per step; segregation and unhappiness are queried from the world.

pub mod agent;
pub mod error;
pub mod metrics;
pub mod output;
pub mod simulation;
pub mod world;

pub use agent::{Agent, AgentId, MoveOutcome};
pub use error::{GridError, SimulationError};
pub use simulation::SchellingSimulation;
pub use world::{CellId, CellRef, World};
