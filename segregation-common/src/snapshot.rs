use serde::{Serialize, Deserialize};

/// Aggregate metrics of the world at a specific step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Number of `step()` calls performed when the snapshot was taken.
    pub step: u64,
    /// Number of agents living in the world.
    pub agent_count: u32,
    /// Average same-group neighbour share over all occupied cells.
    /// `None` when the ratio is undefined (no agents).
    pub segregation: Option<f64>,
    /// Fraction of agents below their satisfaction threshold.
    /// `None` when the ratio is undefined (no agents).
    pub unhappiness: Option<f64>,
    /// `group_counts[g]` is the number of agents belonging to group `g`.
    pub group_counts: Vec<u32>,
}

impl MetricsSnapshot {
    /// Maps an indeterminate ratio (NaN) to `None`.
    pub fn defined(value: f64) -> Option<f64> {
        if value.is_nan() { None } else { Some(value) }
    }
}
