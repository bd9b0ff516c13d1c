use crate::maneuver::ManeuverSpec;

/// Errors raised by the maneuver engine.
///
/// Only `UnsupportedManeuver` and the configuration/IO variants reach callers
/// as `Err`. The dynamic outcomes (`InfeasibleDynamics`, `NoLaneGeometry`,
/// `ZeroTimeSpan`) are folded into simulation and search results.
#[derive(Debug, thiserror::Error)]
pub enum EvasionError {
    #[error("maneuver {maneuver:?} is not supported by the {simulator} simulator")]
    UnsupportedManeuver {
        maneuver: ManeuverSpec,
        simulator: &'static str,
    },

    #[error("infeasible dynamics at time step {time_step}: speed {speed:.3} m/s outside [{min:.3}, {max:.3}]")]
    InfeasibleDynamics {
        time_step: usize,
        speed: f64,
        min: f64,
        max: f64,
    },

    #[error("no lane geometry at position ({x:.2}, {y:.2})")]
    NoLaneGeometry { x: f64, y: f64 },

    #[error("search started at step {start_step} with no time left before the horizon")]
    ZeroTimeSpan { start_step: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("sampling error: {0}")]
    Sampling(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, EvasionError>;
