use std::cmp::Ordering;
use std::fmt;

use crate::agent::{Agent, AgentId};
use crate::error::GridError;

/// Index of a cell inside its world, in construction order (x-major).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub(crate) usize);

impl CellId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One slot of the grid. Coordinates never change after construction.
#[derive(Debug, Clone)]
pub(crate) struct Cell {
    x: i32,
    y: i32,
    occupant: Option<AgentId>,
}

/// A rectangular grid of cells, each holding at most one agent.
///
/// The world owns both arenas: the cell records, created once and never
/// reordered, and the agent records, which are only ever appended. Cells refer
/// to agents and agents refer back to cells by index.
#[derive(Debug, Clone)]
pub struct World {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
    agents: Vec<Agent>,
}

impl World {
    /// Creates an empty world of `width` x `height` cells.
    pub fn new(width: u32, height: u32) -> Self {
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for x in 0..width as i32 {
            for y in 0..height as i32 {
                cells.push(Cell { x, y, occupant: None });
            }
        }

        World { width, height, cells, agents: Vec::new() }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Returns the cell at `(x, y)`.
    pub fn cell(&self, x: i32, y: i32) -> Result<CellRef<'_>, GridError> {
        self.cell_id(x, y).map(|id| self.handle(id))
    }

    /// Resolves coordinates to the arena index of their cell.
    pub fn cell_id(&self, x: i32, y: i32) -> Result<CellId, GridError> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return Err(GridError::InvalidCoordinate { x, y, width: self.width, height: self.height });
        }
        Ok(CellId(x as usize * self.height as usize + y as usize))
    }

    /// Returns the cell with arena index `id`, if it belongs to this world.
    pub fn cell_by_id(&self, id: CellId) -> Option<CellRef<'_>> {
        (id.0 < self.cells.len()).then(|| self.handle(id))
    }

    /// Iterates over every cell in construction order.
    pub fn cells(&self) -> impl Iterator<Item = CellRef<'_>> + '_ {
        (0..self.cells.len()).map(move |i| self.handle(CellId(i)))
    }

    /// Snapshot of all agents, collected by scanning the cells in construction order.
    pub fn agents(&self) -> Vec<AgentId> {
        self.cells.iter().filter_map(|cell| cell.occupant).collect()
    }

    /// Number of agents ever placed into this world.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.occupant.is_some()).count()
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.0)
    }

    /// Mutable access for threshold updates. The agent's cell can only change
    /// through [`World::move_agent_to`].
    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(id.0)
    }

    /// Sets the satisfaction threshold of every existing agent.
    pub fn set_all_thresholds(&mut self, threshold: f64) -> usize {
        for agent in &mut self.agents {
            agent.set_satisfaction_threshold(threshold);
        }
        self.agents.len()
    }

    /// Creates an agent inside the empty cell `cell`.
    pub(crate) fn place_agent(&mut self, group: u32, threshold: f64, cell: CellId) -> Result<AgentId, GridError> {
        let slot = &self.cells[cell.0];
        if let Some(occupant) = slot.occupant {
            return Err(GridError::CellOccupied { x: slot.x, y: slot.y, occupant });
        }

        let id = AgentId(self.agents.len());
        self.agents.push(Agent::new(group, threshold, cell));
        self.cells[cell.0].occupant = Some(id);
        Ok(id)
    }

    /// Vacates the agent's cell and occupies `dest`. Callers check that `dest`
    /// is empty or already the agent's own cell.
    pub(crate) fn relocate(&mut self, agent: AgentId, dest: CellId) {
        let from = self.agents[agent.0].cell();
        self.cells[from.0].occupant = None;
        self.cells[dest.0].occupant = Some(agent);
        self.agents[agent.0].set_cell(dest);
    }

    pub(crate) fn handle(&self, id: CellId) -> CellRef<'_> {
        CellRef { world: self, id }
    }
}

/// Borrowed view of one cell that can answer neighbourhood queries against
/// the world it belongs to.
#[derive(Clone, Copy)]
pub struct CellRef<'w> {
    world: &'w World,
    id: CellId,
}

impl<'w> CellRef<'w> {
    fn record(&self) -> &'w Cell {
        &self.world.cells[self.id.0]
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn world(&self) -> &'w World {
        self.world
    }

    pub fn x(&self) -> i32 {
        self.record().x
    }

    pub fn y(&self) -> i32 {
        self.record().y
    }

    pub fn coordinates(&self) -> (i32, i32) {
        (self.x(), self.y())
    }

    pub fn occupant(&self) -> Option<AgentId> {
        self.record().occupant
    }

    pub fn agent(&self) -> Option<&'w Agent> {
        self.occupant().and_then(|id| self.world.agent(id))
    }

    pub fn is_empty(&self) -> bool {
        self.record().occupant.is_none()
    }

    /// Cells within Chebyshev distance 1, found by scanning the whole grid.
    /// The grid does not wrap, so edge and corner cells have fewer neighbours.
    pub fn neighbouring_cells(&self, include_middle: bool) -> Vec<CellRef<'w>> {
        let (x, y) = self.coordinates();
        self.world
            .cells()
            .filter(|cell| {
                let chebyshev = (x - cell.x()).abs().max((y - cell.y()).abs());
                chebyshev <= 1 && (include_middle || cell.id != self.id)
            })
            .collect()
    }

    /// Share of the occupied neighbourhood belonging to `group`.
    /// Returns exactly 0 when no cell in the neighbourhood is occupied.
    pub fn percentage(&self, group: u32, include_middle: bool) -> f64 {
        let mut occupied = 0u32;
        let mut same = 0u32;

        for agent in self.neighbouring_cells(include_middle).iter().filter_map(|cell| cell.agent()) {
            occupied += 1;
            if agent.group() == group {
                same += 1;
            }
        }

        if occupied == 0 {
            return 0.0;
        }
        same as f64 / occupied as f64
    }

    /// `|(x1 - x2) + (y1 - y2)|`. Offsets of opposite sign cancel, so this is
    /// not a metric; [`CellRef::manhattan_distance_to`] is the true distance.
    /// The movement rule orders candidates by this value.
    pub fn distance_to(&self, other: &CellRef<'_>) -> i32 {
        ((self.x() - other.x()) + (self.y() - other.y())).abs()
    }

    pub fn manhattan_distance_to(&self, other: &CellRef<'_>) -> i32 {
        (self.x() - other.x()).abs() + (self.y() - other.y()).abs()
    }

    /// All cells of the world ordered by [`CellRef::distance_to`] from this
    /// cell, *largest distance first*. Ties keep construction order.
    pub fn nearest_cells(&self) -> Vec<CellRef<'w>> {
        let mut cells: Vec<CellRef<'w>> = self.world.cells().collect();
        cells.sort_by(|a, b| b.distance_to(self).cmp(&a.distance_to(self)));
        cells
    }

    /// All cells of the world ordered by true Manhattan distance, nearest first.
    pub fn cells_by_manhattan_distance(&self) -> Vec<CellRef<'w>> {
        let mut cells: Vec<CellRef<'w>> = self.world.cells().collect();
        cells.sort_by_key(|cell| cell.manhattan_distance_to(self));
        cells
    }

    /// Natural ordering of cells: ascending group-0 share of the neighbourhood.
    pub fn natural_cmp(&self, other: &CellRef<'_>) -> Ordering {
        self.percentage(0, false).total_cmp(&other.percentage(0, false))
    }
}

impl PartialEq for CellRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.world, other.world) && self.id == other.id
    }
}

impl Eq for CellRef<'_> {}

impl fmt::Debug for CellRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellRef")
            .field("x", &self.x())
            .field("y", &self.y())
            .field("occupant", &self.occupant())
            .finish()
    }
}
