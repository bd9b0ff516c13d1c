//! Reachable-set feasibility for the worst-case time-to-react.

use rtreach::drivable::{compute_drivable_area, DrivableSettings, ReachResult, SafetyCheck};
use rtreach::geometry::{HyperRectangle, Interval};
use rtreach::point_mass::{PointMassModel, POINT_MASS_NUM_DIMS};

use crate::collision::CollisionOracle;
use crate::config::{ReachConfig, SimulationContext};
use crate::error::Result;
use crate::state::VehicleState;

/// Answers whether any state at `horizon` is still reachable from `initial`
/// without colliding.
pub trait ReachabilityOracle: Sync {
    fn terminal_reachable(&self, initial: &VehicleState, horizon: usize) -> Result<bool>;
}

// state vector x, vx, y, vy
const POSITION_DIMS: [usize; 2] = [0, 2];

/// Rejects reach-set cells whose centre, occupied by the ego shape heading
/// along the cell's mean velocity, collides at that step.
struct CellCollisionCheck<'a> {
    oracle: &'a CollisionOracle,
}

impl SafetyCheck<POINT_MASS_NUM_DIMS> for CellCollisionCheck<'_> {
    fn is_safe(&self, rect: &HyperRectangle<POINT_MASS_NUM_DIMS>, time_step: usize) -> bool {
        let vx = rect.dims[1].midpoint();
        let vy = rect.dims[3].midpoint();
        let state = VehicleState {
            time_step,
            position: [rect.dims[0].midpoint(), rect.dims[2].midpoint()],
            velocity: [vx, vy],
            orientation: vy.atan2(vx),
            acceleration: [0.0; 2],
            jerk: [0.0; 2],
        };
        !self.oracle.collides_at(&state)
    }
}

/// Drivable-area reachability of a point mass whose world-frame acceleration
/// box bounds the vehicle-frame limits at the initial heading.
#[derive(Debug, Clone)]
pub struct DrivableAreaOracle {
    ctx: SimulationContext,
    collision: CollisionOracle,
    config: ReachConfig,
}

impl DrivableAreaOracle {
    pub fn new(ctx: SimulationContext, collision: CollisionOracle, config: ReachConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { ctx, collision, config })
    }

    fn acceleration_box(&self, orientation: f64) -> [Interval; 2] {
        let p = &self.ctx.params;
        let (sin, cos) = orientation.sin_cos();
        let mut ax = Interval::new(f64::INFINITY, f64::NEG_INFINITY);
        let mut ay = ax;
        for a_long in [p.a_long_min, p.a_long_max] {
            for a_lat in [p.a_lat_min, p.a_lat_max] {
                let x = a_long * cos - a_lat * sin;
                let y = a_long * sin + a_lat * cos;
                ax = Interval::new(ax.min.min(x), ax.max.max(x));
                ay = Interval::new(ay.min.min(y), ay.max.max(y));
            }
        }
        [ax, ay]
    }

    /// Reachable cells from `initial` up to `horizon`, every step kept when
    /// `store_sets` is set.
    pub fn reach_sets(
        &self,
        initial: &VehicleState,
        horizon: usize,
        store_sets: bool,
    ) -> ReachResult<POINT_MASS_NUM_DIMS> {
        let model = PointMassModel::new(self.ctx.params.v_max);
        let init = HyperRectangle::from_point([
            initial.position[0],
            initial.velocity[0],
            initial.position[1],
            initial.velocity[1],
        ]);
        let settings = DrivableSettings {
            step_size: self.ctx.dt,
            start_step: initial.time_step,
            steps: horizon.saturating_sub(initial.time_step),
            cell_size: self.config.cell_size,
            max_cells: self.config.max_cells,
            position_dims: POSITION_DIMS,
        };
        let safety = CellCollisionCheck { oracle: &self.collision };
        let ctrl = self.acceleration_box(initial.orientation);
        compute_drivable_area(&model, init, &ctrl, &settings, &safety, store_sets)
    }
}

impl ReachabilityOracle for DrivableAreaOracle {
    fn terminal_reachable(&self, initial: &VehicleState, horizon: usize) -> Result<bool> {
        let result = self.reach_sets(initial, horizon, false);
        tracing::trace!(
            start_step = initial.time_step,
            horizon,
            reachable = result.terminal_nonempty,
            emptied_at = ?result.emptied_at,
            "drivable area computed"
        );
        Ok(result.terminal_nonempty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{Motion, Obstacle, Pose, RectShape, Scenario, Segment};
    use crate::config::VehicleParameters;

    fn oracle(wall_x: f64) -> DrivableAreaOracle {
        let ctx = SimulationContext::new(VehicleParameters::default(), 0.1, 30).unwrap();
        let scenario = Scenario {
            obstacles: vec![Obstacle {
                id: 1,
                shape: RectShape { length: 4.0, width: 6.0 },
                motion: Motion::Static(Pose {
                    position: [wall_x + 2.0, 0.0],
                    orientation: 0.0,
                }),
            }],
            road_boundary: vec![
                Segment::new([-10.0, -2.0], [200.0, -2.0]),
                Segment::new([-10.0, 2.0], [200.0, 2.0]),
            ],
        };
        let collision = CollisionOracle::build(&scenario, None, RectShape { length: 4.5, width: 1.8 });
        DrivableAreaOracle::new(ctx, collision, ReachConfig::default()).unwrap()
    }

    #[test]
    fn test_acceleration_box_follows_heading() {
        let o = oracle(100.0);
        let [ax, ay] = o.acceleration_box(0.0);
        assert!((ax.min + 8.0).abs() < 1e-12 && (ax.max - 8.0).abs() < 1e-12);
        assert!((ay.min + 4.0).abs() < 1e-12 && (ay.max - 4.0).abs() < 1e-12);
        let [ax, ay] = o.acceleration_box(std::f64::consts::FRAC_PI_2);
        assert!((ax.max - 4.0).abs() < 1e-9);
        assert!((ay.max - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_grid_is_rejected() {
        let o = oracle(100.0);
        let flat = ReachConfig {
            cell_size: 0.0,
            max_cells: 256,
        };
        assert!(DrivableAreaOracle::new(o.ctx, o.collision.clone(), flat).is_err());
        let empty = ReachConfig {
            cell_size: 1.0,
            max_cells: 0,
        };
        assert!(DrivableAreaOracle::new(o.ctx, o.collision, empty).is_err());
    }

    #[test]
    fn test_open_road_is_reachable() {
        let o = oracle(150.0);
        let start = VehicleState::new(0, [0.0, 0.0], 20.0, 0.0);
        assert!(o.terminal_reachable(&start, 30).unwrap());
    }

    #[test]
    fn test_wall_too_close_to_stop() {
        // 20 m/s needs 25 m to stop, the wall is 10 m ahead
        let o = oracle(10.0);
        let start = VehicleState::new(0, [0.0, 0.0], 20.0, 0.0);
        assert!(!o.terminal_reachable(&start, 30).unwrap());
    }

    #[test]
    fn test_stored_sets_cover_every_step() {
        let o = oracle(150.0);
        let start = VehicleState::new(5, [0.0, 0.0], 20.0, 0.0);
        let result = o.reach_sets(&start, 15, true);
        assert_eq!(result.sets.len(), 11);
        assert!(result.sets.iter().all(|cells| !cells.is_empty()));
    }

    #[test]
    fn test_start_at_horizon_is_trivially_reachable() {
        let o = oracle(10.0);
        let start = VehicleState::new(30, [0.0, 0.0], 20.0, 0.0);
        assert!(o.terminal_reachable(&start, 30).unwrap());
    }
}
