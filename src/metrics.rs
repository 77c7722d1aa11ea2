use rayon::prelude::*;

use crate::world::{CellId, World};

impl World {
    /// Same-group share of every occupied cell, in construction order.
    /// Evaluated in parallel; the order of the result is deterministic.
    fn occupied_shares(&self) -> Vec<(f64, f64)> {
        (0..self.cell_count())
            .into_par_iter()
            .filter_map(|i| {
                let cell = self.handle(CellId(i));
                cell.agent().map(|agent| {
                    (cell.percentage(agent.group(), false), agent.satisfaction_threshold())
                })
            })
            .collect()
    }

    /// Average same-group neighbour share over all occupied cells.
    ///
    /// An empty world yields `0.0 / 0.0`, i.e. NaN. Callers must treat that
    /// value as "undefined" rather than as a number.
    pub fn segregation(&self) -> f64 {
        let shares = self.occupied_shares();
        let sum: f64 = shares.iter().map(|(share, _)| share).sum();
        sum / shares.len() as f64
    }

    /// Fraction of agents whose same-group share is strictly below their own
    /// satisfaction threshold. NaN for an empty world.
    pub fn unhappiness(&self) -> f64 {
        let shares = self.occupied_shares();
        let unhappy = shares.iter().filter(|(share, threshold)| share < threshold).count();
        unhappy as f64 / shares.len() as f64
    }

    /// `counts[g]` is the number of agents of group `g`. Groups at or above
    /// `num_groups` are folded into the last bucket.
    pub fn group_counts(&self, num_groups: u32) -> Vec<u32> {
        let mut counts = vec![0u32; num_groups as usize];
        if counts.is_empty() {
            return counts;
        }
        let last = counts.len() - 1;
        for id in self.agents() {
            if let Some(agent) = self.agent(id) {
                counts[(agent.group() as usize).min(last)] += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(world: &mut World, x: i32, y: i32, group: u32, threshold: f64) {
        let cell = world.cell_id(x, y).unwrap();
        world.place_agent(group, threshold, cell).unwrap();
    }

    #[test]
    fn empty_world_metrics_are_undefined() {
        let world = World::new(4, 4);
        assert!(world.segregation().is_nan());
        assert!(world.unhappiness().is_nan());
        assert_eq!(world.group_counts(2), vec![0, 0]);
    }

    #[test]
    fn fully_segregated_pairs() {
        let mut world = World::new(6, 1);
        place(&mut world, 0, 0, 0, 0.5);
        place(&mut world, 1, 0, 0, 0.5);
        place(&mut world, 4, 0, 1, 0.5);
        place(&mut world, 5, 0, 1, 0.5);

        assert_eq!(world.segregation(), 1.0);
        assert_eq!(world.unhappiness(), 0.0);
        assert_eq!(world.group_counts(2), vec![2, 2]);
    }

    #[test]
    fn mixed_strip() {
        // g0 g1 g0 : shares 0, 0, 0
        let mut world = World::new(3, 1);
        place(&mut world, 0, 0, 0, 0.5);
        place(&mut world, 1, 0, 1, 0.0);
        place(&mut world, 2, 0, 0, 0.5);

        assert_eq!(world.segregation(), 0.0);
        // the g1 agent with threshold 0 is content
        assert!((world.unhappiness() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn isolated_agent_counts_as_zero_share() {
        let mut world = World::new(5, 1);
        place(&mut world, 0, 0, 0, 0.3);
        place(&mut world, 1, 0, 0, 0.3);
        place(&mut world, 4, 0, 1, 0.3);

        assert!((world.segregation() - 2.0 / 3.0).abs() < 1e-12);
        assert!((world.unhappiness() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_groups_fold_into_last_bucket() {
        let mut world = World::new(3, 1);
        place(&mut world, 0, 0, 0, 0.5);
        place(&mut world, 1, 0, 4, 0.5);
        assert_eq!(world.group_counts(2), vec![1, 1]);
        assert!(world.group_counts(0).is_empty());
    }
}
