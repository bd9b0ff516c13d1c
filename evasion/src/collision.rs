//! Collision oracle over an immutable scenario snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::state::{Trajectory, VehicleState};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: [f64; 2],
    pub orientation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectShape {
    pub length: f64,
    pub width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: [f64; 2],
    pub end: [f64; 2],
}

impl Segment {
    pub fn new(start: [f64; 2], end: [f64; 2]) -> Self {
        Self { start, end }
    }
}

fn dot(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

fn project(points: &[[f64; 2]], axis: [f64; 2]) -> (f64, f64) {
    points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        let d = dot(*p, axis);
        (lo.min(d), hi.max(d))
    })
}

// separating-axis test over the given candidate axes
fn overlap_on_axes(a: &[[f64; 2]], b: &[[f64; 2]], axes: &[[f64; 2]]) -> bool {
    axes.iter().all(|&axis| {
        let (a_lo, a_hi) = project(a, axis);
        let (b_lo, b_hi) = project(b, axis);
        a_hi >= b_lo && b_hi >= a_lo
    })
}

/// Rectangle placed in the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    pub center: [f64; 2],
    pub orientation: f64,
    pub half_length: f64,
    pub half_width: f64,
}

impl OrientedBox {
    pub fn new(pose: Pose, shape: RectShape) -> Self {
        Self {
            center: pose.position,
            orientation: pose.orientation,
            half_length: 0.5 * shape.length,
            half_width: 0.5 * shape.width,
        }
    }

    fn axes(&self) -> [[f64; 2]; 2] {
        let (sin, cos) = self.orientation.sin_cos();
        [[cos, sin], [-sin, cos]]
    }

    pub fn corners(&self) -> [[f64; 2]; 4] {
        let [u, v] = self.axes();
        let c = self.center;
        let (l, w) = (self.half_length, self.half_width);
        let at = |sl: f64, sw: f64| [c[0] + sl * l * u[0] + sw * w * v[0], c[1] + sl * l * u[1] + sw * w * v[1]];
        [at(1.0, 1.0), at(-1.0, 1.0), at(-1.0, -1.0), at(1.0, -1.0)]
    }

    pub fn bounding_radius(&self) -> f64 {
        self.half_length.hypot(self.half_width)
    }

    pub fn intersects(&self, other: &OrientedBox) -> bool {
        let reach = self.bounding_radius() + other.bounding_radius();
        let dx = self.center[0] - other.center[0];
        let dy = self.center[1] - other.center[1];
        if dx * dx + dy * dy > reach * reach {
            return false;
        }
        let [a0, a1] = self.axes();
        let [b0, b1] = other.axes();
        overlap_on_axes(&self.corners(), &other.corners(), &[a0, a1, b0, b1])
    }

    pub fn intersects_segment(&self, segment: &Segment) -> bool {
        let d = [segment.end[0] - segment.start[0], segment.end[1] - segment.start[1]];
        let normal = [-d[1], d[0]];
        let [a0, a1] = self.axes();
        overlap_on_axes(&self.corners(), &[segment.start, segment.end], &[a0, a1, normal])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Motion {
    Static(Pose),
    /// Predicted poses, `poses[i]` at time step `initial_step + i`.
    Dynamic { initial_step: usize, poses: Vec<Pose> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: usize,
    pub shape: RectShape,
    pub motion: Motion,
}

impl Obstacle {
    pub fn pose_at(&self, time_step: usize) -> Option<Pose> {
        match &self.motion {
            Motion::Static(pose) => Some(*pose),
            Motion::Dynamic { initial_step, poses } => time_step
                .checked_sub(*initial_step)
                .and_then(|i| poses.get(i))
                .copied(),
        }
    }

    /// A moving obstacle following `trajectory`.
    pub fn from_trajectory(id: usize, shape: RectShape, trajectory: &Trajectory) -> Self {
        let poses = trajectory
            .states()
            .iter()
            .map(|s| Pose {
                position: s.position,
                orientation: s.orientation,
            })
            .collect();
        Self {
            id,
            shape,
            motion: Motion::Dynamic {
                initial_step: trajectory.first_step().unwrap_or(0),
                poses,
            },
        }
    }
}

/// Everything the oracle indexes: obstacles (possibly including the ego
/// vehicle itself) and the road boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub obstacles: Vec<Obstacle>,
    pub road_boundary: Vec<Segment>,
}

/// Immutable index answering whether the swept ego shape hits anything.
#[derive(Debug, Clone)]
pub struct CollisionOracle {
    ego_shape: RectShape,
    static_boxes: Vec<OrientedBox>,
    dynamic_boxes: BTreeMap<usize, Vec<OrientedBox>>,
    boundary: Vec<Segment>,
}

impl CollisionOracle {
    /// Indexes every obstacle of `scenario` except `ego_id`. The scenario is
    /// only read.
    pub fn build(scenario: &Scenario, ego_id: Option<usize>, ego_shape: RectShape) -> Self {
        let mut oracle = Self {
            ego_shape,
            static_boxes: Vec::new(),
            dynamic_boxes: BTreeMap::new(),
            boundary: scenario.road_boundary.clone(),
        };
        for obstacle in scenario.obstacles.iter().filter(|o| Some(o.id) != ego_id) {
            oracle.insert(obstacle);
        }
        tracing::debug!(
            static_obstacles = oracle.static_boxes.len(),
            indexed_steps = oracle.dynamic_boxes.len(),
            boundary_segments = oracle.boundary.len(),
            "built collision oracle"
        );
        oracle
    }

    fn insert(&mut self, obstacle: &Obstacle) {
        match &obstacle.motion {
            Motion::Static(pose) => self.static_boxes.push(OrientedBox::new(*pose, obstacle.shape)),
            Motion::Dynamic { initial_step, poses } => {
                for (i, pose) in poses.iter().enumerate() {
                    self.dynamic_boxes
                        .entry(initial_step + i)
                        .or_default()
                        .push(OrientedBox::new(*pose, obstacle.shape));
                }
            }
        }
    }

    /// A copy of this oracle that also treats `participant` as a moving obstacle.
    pub fn with_participant(&self, participant: &Obstacle) -> Self {
        let mut oracle = self.clone();
        oracle.insert(participant);
        oracle
    }

    /// Obstacle boxes present at `time_step`.
    pub fn boxes_at(&self, time_step: usize) -> impl Iterator<Item = &OrientedBox> {
        self.static_boxes
            .iter()
            .chain(self.dynamic_boxes.get(&time_step).into_iter().flatten())
    }

    pub fn ego_box(&self, state: &VehicleState) -> OrientedBox {
        OrientedBox::new(
            Pose {
                position: state.position,
                orientation: state.orientation,
            },
            self.ego_shape,
        )
    }

    pub fn collides_at(&self, state: &VehicleState) -> bool {
        let ego = self.ego_box(state);
        self.boxes_at(state.time_step).any(|b| ego.intersects(b))
            || self.boundary.iter().any(|s| ego.intersects_segment(s))
    }

    pub fn first_collision(&self, trajectory: &Trajectory) -> Option<usize> {
        trajectory
            .states()
            .iter()
            .find(|s| self.collides_at(s))
            .map(|s| s.time_step)
    }

    pub fn collide(&self, trajectory: &Trajectory) -> bool {
        self.first_collision(trajectory).is_some()
    }
}

/// Time until the unmodified reference first collides, counted from
/// `start_step`. Infinite if it never does.
pub fn time_to_collision(oracle: &CollisionOracle, reference: &Trajectory, start_step: usize, dt: f64) -> f64 {
    let horizon = reference.final_step().map_or(start_step, |s| s + 1);
    match oracle.first_collision(&reference.slice(start_step, horizon)) {
        Some(step) => (step - start_step) as f64 * dt,
        None => f64::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    const CAR: RectShape = RectShape { length: 4.0, width: 2.0 };

    fn pose(x: f64, y: f64, orientation: f64) -> Pose {
        Pose {
            position: [x, y],
            orientation,
        }
    }

    #[test]
    fn test_box_overlap() {
        let a = OrientedBox::new(pose(0.0, 0.0, 0.0), CAR);
        assert!(a.intersects(&OrientedBox::new(pose(3.9, 0.0, 0.0), CAR)));
        assert!(!a.intersects(&OrientedBox::new(pose(4.1, 0.0, 0.0), CAR)));
        assert!(a.intersects(&OrientedBox::new(pose(0.0, 1.9, 0.0), CAR)));
        assert!(!a.intersects(&OrientedBox::new(pose(0.0, 2.1, 0.0), CAR)));
    }

    #[test]
    fn test_rotated_box_separates_diagonally() {
        let a = OrientedBox::new(pose(0.0, 0.0, 0.0), CAR);
        // the aabbs overlap but the rotated box clears the corner
        let b = OrientedBox::new(pose(2.25, 1.25, -FRAC_PI_4), RectShape { length: 2.0, width: 0.2 });
        assert!(b.corners().iter().any(|p| p[0] < 2.0) && b.corners().iter().any(|p| p[1] < 1.0));
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_segment_overlap() {
        let a = OrientedBox::new(pose(0.0, 0.0, 0.0), CAR);
        assert!(a.intersects_segment(&Segment::new([-10.0, 0.9], [10.0, 0.9])));
        assert!(!a.intersects_segment(&Segment::new([-10.0, 1.1], [10.0, 1.1])));
        assert!(!a.intersects_segment(&Segment::new([3.0, -5.0], [3.0, 5.0])));
    }

    #[test]
    fn test_ego_excluded_and_dynamic_indexing() {
        let ego = Obstacle {
            id: 0,
            shape: CAR,
            motion: Motion::Static(pose(0.0, 0.0, 0.0)),
        };
        let mover = Obstacle {
            id: 1,
            shape: CAR,
            motion: Motion::Dynamic {
                initial_step: 2,
                poses: vec![pose(20.0, 0.0, 0.0), pose(10.0, 0.0, 0.0)],
            },
        };
        let scenario = Scenario {
            obstacles: vec![ego, mover],
            road_boundary: vec![],
        };
        let oracle = CollisionOracle::build(&scenario, Some(0), CAR);

        let at = |step: usize, x: f64| VehicleState::new(step, [x, 0.0], 0.0, 0.0);
        assert!(!oracle.collides_at(&at(0, 0.0)));
        assert!(oracle.collides_at(&at(2, 19.0)));
        assert!(!oracle.collides_at(&at(3, 19.0)));
        assert!(oracle.collides_at(&at(3, 10.0)));
        assert!(!oracle.collides_at(&at(4, 10.0)));
    }

    #[test]
    fn test_time_to_collision() {
        let obstacle = Obstacle {
            id: 7,
            shape: CAR,
            motion: Motion::Static(pose(30.5, 0.0, 0.0)),
        };
        let scenario = Scenario {
            obstacles: vec![obstacle],
            road_boundary: vec![],
        };
        let oracle = CollisionOracle::build(&scenario, None, CAR);
        let reference = Trajectory::constant_velocity(VehicleState::new(0, [0.0, 0.0], 10.0, 0.0), 40, 0.1);

        // contact once the front passes 28.5 m, first at the 27 m sample
        let ttc = time_to_collision(&oracle, &reference, 0, 0.1);
        assert!((ttc - 2.7).abs() < 1e-9);
        let later = time_to_collision(&oracle, &reference, 10, 0.1);
        assert!((later - 1.7).abs() < 1e-9);

        let short = Trajectory::constant_velocity(VehicleState::new(0, [0.0, 0.0], 10.0, 0.0), 20, 0.1);
        assert_eq!(time_to_collision(&oracle, &short, 0, 0.1), f64::INFINITY);
    }
}
