use crate::agent::{AgentId, MoveOutcome};
use crate::error::SimulationError;
use crate::world::World;
use log::{debug, info, trace};
use rand::prelude::*;
use rand::seq::SliceRandom;
use segregation_common::{MetricsSnapshot, SimulationConfig};

/// Seeds a world with agents and advances it one agent move at a time.
pub struct SchellingSimulation {
    /// The grid and every agent living on it.
    world: World,
    /// Single RNG for placement, group draws and step shuffling.
    rng: StdRng,
    /// Threshold handed to newly created agents.
    satisfaction_threshold: f64,
    num_groups: u32,
    num_agents: u32,
    /// Index into the freshly shuffled agent list used by the next `step()`.
    step_cursor: usize,
    steps_taken: u64,
    /// Metric samples collected by `record_snapshot()`.
    recorded_snapshots: Vec<MetricsSnapshot>,
}

impl SchellingSimulation {
    /// Creates a controller for `world`. Without a seed the RNG is drawn from
    /// OS entropy and runs are not reproducible.
    pub fn new(
        world: World,
        seed: Option<u64>,
        satisfaction_threshold: f64,
        num_groups: u32,
        num_agents: u32,
    ) -> Result<Self, SimulationError> {
        if world.width() == 0 || world.height() == 0 {
            return Err(SimulationError::InvalidParameters("world must have at least one cell".into()));
        }
        if num_groups == 0 {
            return Err(SimulationError::InvalidParameters("num_groups must be greater than 0".into()));
        }
        validate_threshold(satisfaction_threshold)?;

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            world,
            rng,
            satisfaction_threshold,
            num_groups,
            num_agents,
            step_cursor: 0,
            steps_taken: 0,
            recorded_snapshots: Vec::new(),
        })
    }

    /// Builds an empty world and its controller from a loaded configuration.
    /// Agents are not created until [`Self::create_random_neighbourhood`].
    pub fn from_config(config: &SimulationConfig) -> Result<Self, SimulationError> {
        let world = World::new(config.world.width, config.world.height);
        let population = &config.population;
        Self::new(
            world,
            population.seed,
            population.satisfaction_threshold,
            population.num_groups,
            population.num_agents,
        )
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn satisfaction_threshold(&self) -> f64 {
        self.satisfaction_threshold
    }

    /// Changes the threshold given to agents created from now on. Existing
    /// agents keep theirs until [`Self::apply_threshold_to_agents`] is called.
    pub fn set_satisfaction_threshold(&mut self, satisfaction_threshold: f64) -> Result<(), SimulationError> {
        validate_threshold(satisfaction_threshold)?;
        self.satisfaction_threshold = satisfaction_threshold;
        Ok(())
    }

    /// Pushes the controller's threshold to every existing agent.
    /// Returns the number of agents updated.
    pub fn apply_threshold_to_agents(&mut self) -> usize {
        let updated = self.world.set_all_thresholds(self.satisfaction_threshold);
        debug!("Applied satisfaction threshold {:.2} to {} agents.", self.satisfaction_threshold, updated);
        updated
    }

    pub fn num_groups(&self) -> u32 {
        self.num_groups
    }

    pub fn num_agents(&self) -> u32 {
        self.num_agents
    }

    pub fn step_cursor(&self) -> usize {
        self.step_cursor
    }

    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    /// Places one agent with a random group into a random empty cell.
    ///
    /// # Termination
    ///
    /// Coordinates are redrawn until an empty cell turns up, with no bound on
    /// the number of attempts. On a grid without empty cells this never
    /// returns. [`SimulationConfig::validate`] refuses populations larger than
    /// the grid for that reason.
    pub fn create_random_agent(&mut self) -> Result<AgentId, SimulationError> {
        let width = self.world.width() as i32;
        let height = self.world.height() as i32;

        let mut cell = self.world.cell_id(self.rng.random_range(0..width), self.rng.random_range(0..height))?;
        let mut attempts = 1u64;
        while self.world.cell_by_id(cell).is_some_and(|c| !c.is_empty()) {
            cell = self.world.cell_id(self.rng.random_range(0..width), self.rng.random_range(0..height))?;
            attempts += 1;
        }

        let group = self.draw_group();
        let id = self.world.place_agent(group, self.satisfaction_threshold, cell)?;
        trace!("Placed agent {} (group {}) after {} draw(s).", id, group, attempts);
        Ok(id)
    }

    /// Group `i` is accepted when a fresh uniform draw falls below
    /// `(i + 1) / num_groups`; the first accepted index wins. Each check uses
    /// its own draw, so the result is not uniform across groups. The last
    /// check always succeeds.
    fn draw_group(&mut self) -> u32 {
        let n = self.num_groups;
        (0..n)
            .find(|&i| self.rng.random::<f64>() < (i + 1) as f64 / n as f64)
            .unwrap_or(n - 1)
    }

    /// Creates `num_agents` agents via [`Self::create_random_agent`].
    pub fn create_random_neighbourhood(&mut self) -> Result<(), SimulationError> {
        info!(
            "Placing {} agents in {} groups on a {}x{} grid...",
            self.num_agents,
            self.num_groups,
            self.world.width(),
            self.world.height()
        );
        for _ in 0..self.num_agents {
            self.create_random_agent()?;
        }
        debug!("World now holds {} agents.", self.world.agent_count());
        Ok(())
    }

    /// Performs one simulation step: exactly one agent gets to move.
    ///
    /// The agent list is rebuilt and reshuffled on every call and the agent at
    /// the cursor moves. The cursor then advances and is reset to 0 once it
    /// equals `agents.len() - 1`, so it bounds how many calls pass between
    /// resets but never tracks a particular agent.
    pub fn step(&mut self) -> Result<MoveOutcome, SimulationError> {
        let mut agents = self.world.agents();
        if agents.is_empty() {
            return Err(SimulationError::NoAgents);
        }
        agents.shuffle(&mut self.rng);

        // A single-agent world never hits the reset condition.
        if self.step_cursor >= agents.len() {
            self.step_cursor = 0;
        }

        let outcome = self.world.move_agent(agents[self.step_cursor])?;
        self.step_cursor += 1;
        if self.step_cursor == agents.len() - 1 {
            self.step_cursor = 0;
        }
        self.steps_taken += 1;

        Ok(outcome)
    }

    /// Samples the aggregate metrics and stores them.
    pub fn record_snapshot(&mut self) -> &MetricsSnapshot {
        let snapshot = MetricsSnapshot {
            step: self.steps_taken,
            agent_count: self.world.agent_count() as u32,
            segregation: MetricsSnapshot::defined(self.world.segregation()),
            unhappiness: MetricsSnapshot::defined(self.world.unhappiness()),
            group_counts: self.world.group_counts(self.num_groups),
        };
        debug!(
            "Snapshot at step {}: segregation={:?} unhappiness={:?}",
            snapshot.step, snapshot.segregation, snapshot.unhappiness
        );

        self.recorded_snapshots.push(snapshot);
        &self.recorded_snapshots[self.recorded_snapshots.len() - 1]
    }

    pub fn recorded_snapshots(&self) -> &[MetricsSnapshot] {
        &self.recorded_snapshots
    }
}

fn validate_threshold(threshold: f64) -> Result<(), SimulationError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(SimulationError::InvalidParameters(format!(
            "satisfaction threshold must lie in [0, 1], got {}",
            threshold
        )));
    }
    Ok(())
}
