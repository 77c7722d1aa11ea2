use std::fmt;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::GridError;
use crate::world::{CellId, World};

/// Index of an agent inside its world. Agents are never removed, so an id
/// stays valid for the lifetime of the world that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub(crate) usize);

impl AgentId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A resident of the grid.
#[derive(Debug, Clone)]
pub struct Agent {
    group: u32,
    satisfaction_threshold: f64,
    cell: CellId,
}

impl Agent {
    pub(crate) fn new(group: u32, satisfaction_threshold: f64, cell: CellId) -> Self {
        Agent { group, satisfaction_threshold, cell }
    }

    pub fn group(&self) -> u32 {
        self.group
    }

    pub fn satisfaction_threshold(&self) -> f64 {
        self.satisfaction_threshold
    }

    pub fn set_satisfaction_threshold(&mut self, satisfaction_threshold: f64) {
        self.satisfaction_threshold = satisfaction_threshold;
    }

    /// The cell currently holding this agent.
    pub fn cell(&self) -> CellId {
        self.cell
    }

    pub(crate) fn set_cell(&mut self, cell: CellId) {
        self.cell = cell;
    }
}

/// What a single call to [`World::move_agent`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub agent: AgentId,
    pub from: CellId,
    pub to: CellId,
    pub was_unhappy: bool,
    /// Number of cells the agent passed through during the call.
    pub relocations: usize,
}

impl MoveOutcome {
    pub fn moved(&self) -> bool {
        self.from != self.to
    }
}

impl World {
    /// Same-group share of the agent's own neighbourhood, itself excluded.
    pub fn same_group_share(&self, id: AgentId) -> Result<f64, GridError> {
        let agent = self.agent(id).ok_or(GridError::UnknownAgent(id))?;
        Ok(self.handle(agent.cell()).percentage(agent.group(), false))
    }

    /// Whether the agent's same-group share is strictly below its threshold.
    pub fn is_unhappy(&self, id: AgentId) -> Result<bool, GridError> {
        let threshold = self.agent(id).ok_or(GridError::UnknownAgent(id))?.satisfaction_threshold();
        Ok(self.same_group_share(id)? < threshold)
    }

    /// Lets an agent decide whether to move, and moves it.
    ///
    /// An unhappy agent walks the candidate list produced by
    /// [`CellRef::nearest_cells`](crate::world::CellRef::nearest_cells) for its
    /// starting cell (farthest first) and relocates to *every* empty cell whose
    /// same-group share is at least its threshold. The walk does not stop at
    /// the first match: each candidate is evaluated against the grid as it is
    /// at that moment, including the agent's own intermediate positions, and
    /// the agent ends up in the last qualifying cell.
    pub fn move_agent(&mut self, id: AgentId) -> Result<MoveOutcome, GridError> {
        let agent = self.agent(id).ok_or(GridError::UnknownAgent(id))?;
        let group = agent.group();
        let threshold = agent.satisfaction_threshold();
        let from = agent.cell();

        let start = self.handle(from);
        let was_unhappy = start.percentage(group, false) < threshold;
        let mut relocations = 0;

        if was_unhappy {
            let candidates: Vec<CellId> = start.nearest_cells().iter().map(|cell| cell.id()).collect();

            for candidate in candidates {
                let qualifies = {
                    let cell = self.handle(candidate);
                    cell.percentage(group, false) >= threshold && cell.is_empty()
                };
                if qualifies {
                    self.relocate(id, candidate);
                    relocations += 1;
                }
            }
        }

        let to = self.agent(id).map_or(from, |agent| agent.cell());
        trace!("agent {} unhappy={} relocations={} {:?} -> {:?}", id, was_unhappy, relocations, from, to);

        Ok(MoveOutcome { agent: id, from, to, was_unhappy, relocations })
    }

    /// Moves an agent into `dest` in one step: its old cell is vacated, `dest`
    /// is occupied and the agent's cell is updated before control returns.
    ///
    /// Moving onto the agent's own cell is a no-op; moving onto a cell held by
    /// another agent is rejected.
    pub fn move_agent_to(&mut self, id: AgentId, dest: CellId) -> Result<(), GridError> {
        if self.agent(id).is_none() {
            return Err(GridError::UnknownAgent(id));
        }
        let cell = self.cell_by_id(dest).ok_or(GridError::UnknownCell(dest))?;
        match cell.occupant() {
            Some(occupant) if occupant != id => {
                return Err(GridError::CellOccupied { x: cell.x(), y: cell.y(), occupant });
            }
            Some(_) => return Ok(()),
            None => {}
        }

        self.relocate(id, dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(world: &mut World, x: i32, y: i32, group: u32, threshold: f64) -> AgentId {
        let cell = world.cell_id(x, y).unwrap();
        world.place_agent(group, threshold, cell).unwrap()
    }

    fn position(world: &World, id: AgentId) -> (i32, i32) {
        let cell = world.agent(id).unwrap().cell();
        world.cell_by_id(cell).unwrap().coordinates()
    }

    fn assert_consistent(world: &World) {
        let occupants = world.agents();
        assert_eq!(occupants.len(), world.agent_count());
        for id in occupants {
            let cell = world.cell_by_id(world.agent(id).unwrap().cell()).unwrap();
            assert_eq!(cell.occupant(), Some(id));
        }
    }

    #[test]
    fn lone_agent_at_threshold_zero_stays() {
        let mut world = World::new(3, 3);
        let a = place(&mut world, 1, 1, 0, 0.0);

        assert_eq!(world.same_group_share(a).unwrap(), 0.0);
        assert!(!world.is_unhappy(a).unwrap());
        let outcome = world.move_agent(a).unwrap();
        assert!(!outcome.was_unhappy);
        assert!(!outcome.moved());
        assert_eq!(position(&world, a), (1, 1));
    }

    #[test]
    fn lone_unhappy_agent_wanders_through_its_own_neighbourhood() {
        // Candidate cells next to the agent's current position see the agent
        // itself as a same-group neighbour, so they keep qualifying.
        let mut world = World::new(3, 3);
        let a = place(&mut world, 1, 1, 0, 0.5);

        assert!(world.is_unhappy(a).unwrap());
        let outcome = world.move_agent(a).unwrap();

        assert!(outcome.was_unhappy);
        assert_eq!(outcome.relocations, 6);
        assert_eq!(position(&world, a), (2, 0));
        assert_eq!(world.occupied_count(), 1);
        assert_consistent(&world);
    }

    #[test]
    fn adjacent_same_group_agents_are_happy() {
        let mut world = World::new(4, 4);
        let a = place(&mut world, 1, 1, 0, 1.0);
        let b = place(&mut world, 2, 2, 0, 1.0);

        assert_eq!(world.same_group_share(a).unwrap(), 1.0);
        assert_eq!(world.same_group_share(b).unwrap(), 1.0);
        for id in [a, b] {
            let outcome = world.move_agent(id).unwrap();
            assert!(!outcome.was_unhappy);
            assert_eq!(outcome.relocations, 0);
        }
        assert_eq!(position(&world, a), (1, 1));
        assert_eq!(position(&world, b), (2, 2));
    }

    #[test]
    fn movement_does_not_stop_at_first_qualifying_cell() {
        // 7x1 strip: A(g0) at 0, B(g1) at 1, C(g0) at 4.
        // Candidates from x=0 run 6,5,4,3,2,1,0. A stops at 5, then 3, and
        // finally 2, which qualifies once A itself sits at 3.
        let mut world = World::new(7, 1);
        let a = place(&mut world, 0, 0, 0, 0.5);
        let b = place(&mut world, 1, 0, 1, 0.5);
        let c = place(&mut world, 4, 0, 0, 0.5);

        let outcome = world.move_agent(a).unwrap();
        assert!(outcome.was_unhappy);
        assert_eq!(outcome.relocations, 3);
        assert_eq!(position(&world, a), (2, 0));
        assert_eq!(position(&world, b), (1, 0));
        assert_eq!(position(&world, c), (4, 0));
        assert!(world.cell(0, 0).unwrap().is_empty());
        assert_consistent(&world);
    }

    #[test]
    fn unhappy_agent_without_targets_stays() {
        // Every empty cell borders only the other group.
        let mut world = World::new(3, 1);
        let a = place(&mut world, 0, 0, 0, 0.5);
        place(&mut world, 1, 0, 1, 0.5);

        let outcome = world.move_agent(a).unwrap();
        assert!(outcome.was_unhappy);
        assert_eq!(outcome.relocations, 0);
        assert_eq!(position(&world, a), (0, 0));
    }

    #[test]
    fn move_to_round_trip_restores_occupancy() {
        let mut world = World::new(3, 3);
        let a = place(&mut world, 0, 0, 0, 0.5);
        let b = place(&mut world, 2, 2, 1, 0.5);
        let before: Vec<Option<AgentId>> = world.cells().map(|c| c.occupant()).collect();

        let cell_a = world.cell_id(0, 0).unwrap();
        let cell_b = world.cell_id(1, 2).unwrap();

        world.move_agent_to(a, cell_b).unwrap();
        assert!(world.cell(0, 0).unwrap().is_empty());
        assert_eq!(world.cell(1, 2).unwrap().occupant(), Some(a));
        assert_eq!(world.occupied_count(), 2);
        assert_consistent(&world);

        world.move_agent_to(a, cell_a).unwrap();
        let after: Vec<Option<AgentId>> = world.cells().map(|c| c.occupant()).collect();
        assert_eq!(before, after);
        assert_eq!(position(&world, b), (2, 2));
        assert_consistent(&world);
    }

    #[test]
    fn move_to_occupied_cell_is_rejected() {
        let mut world = World::new(2, 2);
        let a = place(&mut world, 0, 0, 0, 0.5);
        let b = place(&mut world, 1, 1, 1, 0.5);
        let cell_b = world.cell_id(1, 1).unwrap();

        assert_eq!(
            world.move_agent_to(a, cell_b).unwrap_err(),
            GridError::CellOccupied { x: 1, y: 1, occupant: b }
        );
        assert_eq!(position(&world, a), (0, 0));

        // own cell
        let cell_a = world.cell_id(0, 0).unwrap();
        world.move_agent_to(a, cell_a).unwrap();
        assert_eq!(position(&world, a), (0, 0));
        assert_consistent(&world);
    }

    #[test]
    fn unknown_agents_are_reported() {
        let mut world = World::new(2, 2);
        let ghost = AgentId(3);
        assert_eq!(world.move_agent(ghost).unwrap_err(), GridError::UnknownAgent(ghost));
        assert_eq!(world.is_unhappy(ghost).unwrap_err(), GridError::UnknownAgent(ghost));
        let cell = world.cell_id(0, 0).unwrap();
        assert_eq!(world.move_agent_to(ghost, cell).unwrap_err(), GridError::UnknownAgent(ghost));

        let a = place(&mut world, 0, 0, 0, 0.5);
        let outside = CellId(4);
        assert_eq!(world.move_agent_to(a, outside).unwrap_err(), GridError::UnknownCell(outside));
    }

    #[test]
    fn threshold_is_mutable_per_agent() {
        let mut world = World::new(3, 1);
        let a = place(&mut world, 0, 0, 0, 0.5);
        place(&mut world, 1, 0, 1, 0.5);
        assert!(world.is_unhappy(a).unwrap());

        world.agent_mut(a).unwrap().set_satisfaction_threshold(0.0);
        assert!(!world.is_unhappy(a).unwrap());
    }
}
