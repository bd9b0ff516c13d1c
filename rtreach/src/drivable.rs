//! Drivable-area reachability: propagate a set of boxes step by step, split
//! them on a position grid and throw away every cell the safety check rejects.

use std::collections::BTreeMap;

use super::face_lift::lift_rect;
use super::geometry::{HyperRectangle, Interval};
use super::system_model::SystemModel;

/// Decides whether a reach-set cell is free of obstacles at an absolute time step.
pub trait SafetyCheck<const NUM_DIMS: usize> {
    fn is_safe(&self, rect: &HyperRectangle<NUM_DIMS>, time_step: usize) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct DrivableSettings {
    pub step_size: f64,
    pub start_step: usize,
    pub steps: usize,
    pub cell_size: f64,
    pub max_cells: usize,
    // which state dimensions hold the planar position
    pub position_dims: [usize; 2],
}

#[derive(Debug, Clone)]
pub struct ReachResult<const NUM_DIMS: usize> {
    /// Cells surviving at each step; index 0 is the initial set. Only filled when
    /// storage was requested, otherwise just the final set is kept.
    pub sets: Vec<Vec<HyperRectangle<NUM_DIMS>>>,
    pub terminal_nonempty: bool,
    // the step at which the set became empty, if it did
    pub emptied_at: Option<usize>,
}

fn cell_key<const NUM_DIMS: usize>(
    rect: &HyperRectangle<NUM_DIMS>,
    position_dims: [usize; 2],
    cell_size: f64,
) -> (i64, i64) {
    let kx = (rect.dims[position_dims[0]].midpoint() / cell_size).floor() as i64;
    let ky = (rect.dims[position_dims[1]].midpoint() / cell_size).floor() as i64;
    (kx, ky)
}

fn merge_cells<const NUM_DIMS: usize>(
    cells: impl IntoIterator<Item = HyperRectangle<NUM_DIMS>>,
    position_dims: [usize; 2],
    cell_size: f64,
) -> Vec<HyperRectangle<NUM_DIMS>> {
    let mut grid: BTreeMap<(i64, i64), HyperRectangle<NUM_DIMS>> = BTreeMap::new();
    for cell in cells {
        grid.entry(cell_key(&cell, position_dims, cell_size))
            .and_modify(|hull| hull.grow_to_convex_hull(&cell))
            .or_insert(cell);
    }
    grid.into_values().collect()
}

fn split_on_grid<const NUM_DIMS: usize>(
    rect: &HyperRectangle<NUM_DIMS>,
    position_dims: [usize; 2],
    cell_size: f64,
) -> Vec<HyperRectangle<NUM_DIMS>> {
    let mut pieces = vec![*rect];
    if !(cell_size > 0.0) {
        return pieces;
    }
    for &dim in &position_dims {
        let parts = (rect.dims[dim].width() / cell_size).ceil().max(1.0) as usize;
        pieces = pieces.iter().flat_map(|p| p.split(dim, parts)).collect();
    }
    pieces
}

/// Propagates `init` for `settings.steps` steps under the control box `ctrl_input`.
/// The result reports whether any cell survives to the final step.
pub fn compute_drivable_area<const NUM_DIMS: usize, M, S>(
    system_model: &M,
    init: HyperRectangle<NUM_DIMS>,
    ctrl_input: &[Interval],
    settings: &DrivableSettings,
    safety: &S,
    store_sets: bool,
) -> ReachResult<NUM_DIMS>
where
    M: SystemModel<NUM_DIMS>,
    S: SafetyCheck<NUM_DIMS>,
{
    let mut cell_size = settings.cell_size;
    let mut current = vec![init];
    let mut sets = vec![current.clone()];

    for k in 1..=settings.steps {
        let time_step = settings.start_step + k;
        let mut survivors = Vec::new();
        for rect in &current {
            let lifted = lift_rect(system_model, rect, ctrl_input, settings.step_size);
            for piece in split_on_grid(&lifted, settings.position_dims, cell_size) {
                if safety.is_safe(&piece, time_step) {
                    survivors.push(piece);
                }
            }
        }

        current = merge_cells(survivors, settings.position_dims, cell_size);
        while current.len() > settings.max_cells {
            cell_size *= 2.0;
            tracing::debug!(step = time_step, cells = current.len(), cell_size, "coarsening reach grid");
            current = merge_cells(current, settings.position_dims, cell_size);
        }

        if store_sets {
            sets.push(current.clone());
        }

        if current.is_empty() {
            tracing::debug!(step = time_step, "reachable set emptied");
            if !store_sets {
                sets = vec![Vec::new()];
            }
            return ReachResult {
                sets,
                terminal_nonempty: false,
                emptied_at: Some(time_step),
            };
        }
    }

    if !store_sets {
        sets = vec![current];
    }

    ReachResult {
        sets,
        terminal_nonempty: true,
        emptied_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point_mass::{PointMassModel, POINT_MASS_NUM_DIMS};

    struct Wall {
        x: f64,
    }

    impl SafetyCheck<POINT_MASS_NUM_DIMS> for Wall {
        fn is_safe(&self, rect: &HyperRectangle<POINT_MASS_NUM_DIMS>, _: usize) -> bool {
            rect.dims[0].max < self.x
        }
    }

    struct Free;

    impl SafetyCheck<POINT_MASS_NUM_DIMS> for Free {
        fn is_safe(&self, _: &HyperRectangle<POINT_MASS_NUM_DIMS>, _: usize) -> bool {
            true
        }
    }

    fn settings(steps: usize) -> DrivableSettings {
        DrivableSettings {
            step_size: 0.1,
            start_step: 0,
            steps,
            cell_size: 1.0,
            max_cells: 64,
            position_dims: [0, 2],
        }
    }

    #[test]
    fn test_zero_cell_size_does_not_split() {
        let rect = HyperRectangle {
            dims: [Interval::new(0.0, 4.0), Interval::new(9.0, 10.0), Interval::new(0.0, 2.0), Interval::new(0.0, 0.0)],
        };
        assert_eq!(split_on_grid(&rect, [0, 2], 1.0).len(), 8);
        assert_eq!(split_on_grid(&rect, [0, 2], 0.0), vec![rect]);
    }

    #[test]
    fn test_free_space_stays_nonempty() {
        let model = PointMassModel::new(50.0);
        let init = HyperRectangle::from_point([0.0, 10.0, 0.0, 0.0]);
        let ctrl = [Interval::new(-8.0, 8.0), Interval::new(-4.0, 4.0)];
        let result = compute_drivable_area(&model, init, &ctrl, &settings(20), &Free, true);
        assert!(result.terminal_nonempty);
        assert_eq!(result.sets.len(), 21);
        assert!(result.sets.iter().all(|s| s.len() <= 64));
    }

    #[test]
    fn test_unavoidable_wall_empties_set() {
        // 10 m/s with 8 m/s^2 braking needs 6.25 m, the wall is 3 m away
        let model = PointMassModel::new(50.0);
        let init = HyperRectangle::from_point([0.0, 10.0, 0.0, 0.0]);
        let ctrl = [Interval::new(-8.0, 8.0), Interval::new(-4.0, 4.0)];
        let result = compute_drivable_area(&model, init, &ctrl, &settings(20), &Wall { x: 3.0 }, false);
        assert!(!result.terminal_nonempty);
        assert!(result.emptied_at.is_some());
    }

    #[test]
    fn test_distant_wall_keeps_braking_cells() {
        let model = PointMassModel::new(50.0);
        let init = HyperRectangle::from_point([0.0, 10.0, 0.0, 0.0]);
        let ctrl = [Interval::new(-8.0, 8.0), Interval::new(-4.0, 4.0)];
        let result = compute_drivable_area(&model, init, &ctrl, &settings(10), &Wall { x: 30.0 }, false);
        assert!(result.terminal_nonempty);
        assert!(result.sets[0].iter().all(|c| c.dims[0].max < 30.0));
    }
}
