use thiserror::Error;

use crate::agent::AgentId;
use crate::world::CellId;

/// Failures of grid lookups and of the relocation primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("invalid coordinates ({x}, {y}) for a {width}x{height} world")]
    InvalidCoordinate { x: i32, y: i32, width: u32, height: u32 },

    #[error("cell ({x}, {y}) is already occupied by agent {occupant}")]
    CellOccupied { x: i32, y: i32, occupant: AgentId },

    #[error("cell index {} is outside this world", .0.index())]
    UnknownCell(CellId),

    #[error("agent {0} does not exist in this world")]
    UnknownAgent(AgentId),
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("cannot step a world without agents")]
    NoAgents,

    #[error("invalid simulation parameters: {0}")]
    InvalidParameters(String),
}
