//! Lane geometry consumed by the lateral maneuvers.

use serde::{Deserialize, Serialize};

use crate::collision::Segment;
use crate::error::{EvasionError, Result};
use crate::utils::heading_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// +1 for left, -1 for right, matching the sign of lateral acceleration.
    pub fn sign(self) -> f64 {
        match self {
            Side::Left => 1.0,
            Side::Right => -1.0,
        }
    }
}

/// Local lane description at a queried position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneInfo {
    pub width: f64,
    pub orientation: f64,
    pub curvature: f64,
    /// Signed offset of the position from the lane centerline, positive to the left.
    pub lateral_offset: f64,
    pub has_left: bool,
    pub has_right: bool,
}

impl LaneInfo {
    /// Distance from the position to the lane boundary on `side`.
    pub fn distance_to_boundary(&self, side: Side) -> f64 {
        (0.5 * self.width - side.sign() * self.lateral_offset).max(0.0)
    }

    pub fn has_neighbour(&self, side: Side) -> bool {
        match side {
            Side::Left => self.has_left,
            Side::Right => self.has_right,
        }
    }
}

/// A turning lanelet through an intersection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnGeometry {
    /// Start of the turning lanelet, where it leaves the incoming lane.
    pub entry: [f64; 2],
    pub exit: [f64; 2],
    pub entry_orientation: f64,
    pub exit_orientation: f64,
}

impl TurnGeometry {
    /// Curvature of the circular arc through the lanelet's start and end points.
    pub fn curvature(&self) -> f64 {
        let chord = (self.exit[0] - self.entry[0]).hypot(self.exit[1] - self.entry[1]);
        let sweep = heading_error(self.entry_orientation, self.exit_orientation).abs();
        if chord <= f64::EPSILON {
            return 0.0;
        }
        2.0 * (0.5 * sweep).sin() / chord
    }

    /// True once `position` has passed the lanelet's entry along the incoming heading.
    pub fn has_entered(&self, position: &[f64; 2]) -> bool {
        let (sin, cos) = self.entry_orientation.sin_cos();
        (position[0] - self.entry[0]) * cos + (position[1] - self.entry[1]) * sin >= 0.0
    }
}

/// Lane-geometry accessor. Implementations must be shareable across the
/// parallel searches.
pub trait LaneGeometry: Sync {
    fn lane_at(&self, position: &[f64; 2]) -> Option<LaneInfo>;

    /// The turning lanelet ahead of `position` towards `side`, if the map has one.
    fn turn_at(&self, _position: &[f64; 2], _side: Side) -> Option<TurnGeometry> {
        None
    }
}

/// A straight multi-lane road starting at `origin` and running along `heading`.
/// Lane 0 is the rightmost lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StraightRoad {
    pub origin: [f64; 2],
    pub heading: f64,
    pub lane_width: f64,
    pub lane_count: usize,
    pub length: f64,
    #[serde(default)]
    pub turns: Vec<(Side, TurnGeometry)>,
}

impl StraightRoad {
    /// A road needs at least one lane of positive width.
    pub fn new(origin: [f64; 2], heading: f64, lane_width: f64, lane_count: usize, length: f64) -> Result<Self> {
        if lane_count == 0 || !(lane_width > 0.0) {
            return Err(EvasionError::InvalidConfig(format!(
                "road needs lanes of positive width, got {lane_count} lanes of {lane_width} m"
            )));
        }
        Ok(Self {
            origin,
            heading,
            lane_width,
            lane_count,
            length,
            turns: Vec::new(),
        })
    }

    pub fn with_turn(mut self, side: Side, turn: TurnGeometry) -> Self {
        self.turns.push((side, turn));
        self
    }

    // (along, across-from-right-edge) coordinates
    fn local(&self, position: &[f64; 2]) -> (f64, f64) {
        let (sin, cos) = self.heading.sin_cos();
        let dx = position[0] - self.origin[0];
        let dy = position[1] - self.origin[1];
        (dx * cos + dy * sin, -dx * sin + dy * cos)
    }

    fn global(&self, s: f64, t: f64) -> [f64; 2] {
        let (sin, cos) = self.heading.sin_cos();
        [self.origin[0] + s * cos - t * sin, self.origin[1] + s * sin + t * cos]
    }

    /// Right and left road edges.
    pub fn boundary_segments(&self) -> Vec<Segment> {
        let total = self.lane_count as f64 * self.lane_width;
        vec![
            Segment::new(self.global(0.0, 0.0), self.global(self.length, 0.0)),
            Segment::new(self.global(0.0, total), self.global(self.length, total)),
        ]
    }
}

impl LaneGeometry for StraightRoad {
    fn lane_at(&self, position: &[f64; 2]) -> Option<LaneInfo> {
        if self.lane_count == 0 {
            return None;
        }
        let (s, t) = self.local(position);
        let total = self.lane_count as f64 * self.lane_width;
        if !(0.0..=self.length).contains(&s) || !(0.0..=total).contains(&t) {
            return None;
        }
        let lane = ((t / self.lane_width).floor() as usize).min(self.lane_count - 1);
        Some(LaneInfo {
            width: self.lane_width,
            orientation: self.heading,
            curvature: 0.0,
            lateral_offset: t - (lane as f64 + 0.5) * self.lane_width,
            has_left: lane + 1 < self.lane_count,
            has_right: lane > 0,
        })
    }

    fn turn_at(&self, _position: &[f64; 2], side: Side) -> Option<TurnGeometry> {
        self.turns.iter().find(|(s, _)| *s == side).map(|(_, t)| *t)
    }
}
