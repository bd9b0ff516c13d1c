//! Evasive-maneuver simulation and time-to-react search for a point-mass vehicle.

pub mod collision;
pub mod config;
pub mod error;
pub mod integrator;
pub mod lane;
pub mod maneuver;
pub mod monte_carlo;
pub mod policy;
pub mod reach;
pub mod react;
pub mod search;
pub mod state;
pub mod utils;

pub use collision::{time_to_collision, CollisionOracle, Motion, Obstacle, Pose, RectShape, Scenario, Segment};
pub use config::{MonteCarloConfig, MonteCarloWeights, ReachConfig, SimulationContext, VehicleParameters};
pub use error::{EvasionError, Result};
pub use lane::{LaneGeometry, LaneInfo, Side, StraightRoad, TurnGeometry};
pub use maneuver::{ManeuverPlan, ManeuverSpec};
pub use monte_carlo::{estimate_collision_probability, CollisionEstimate, Sample};
pub use policy::{simulate_maneuver, Simulation};
pub use reach::{DrivableAreaOracle, ReachabilityOracle};
pub use react::{
    search_worst_case, time_to_brake, time_to_kickdown, time_to_react, time_to_react_over, time_to_steer,
    ReactInputs,
};
pub use search::{search_time_to_maneuver, Probe, SearchResult, SearchState};
pub use state::{Trajectory, VehicleState};
