//! Point-mass integration under jerk-bounded accelerations.

use crate::config::{SimulationContext, VehicleParameters};
use crate::error::EvasionError;
use crate::state::VehicleState;

// tolerance used when re-checking the bands on produced states
const BAND_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedViolation {
    BelowThreshold,
    AboveMax,
}

/// A step whose result left the velocity band. The candidate is the state the
/// integration produced, so callers can decide how to recover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Infeasible {
    pub candidate: VehicleState,
    pub violation: SpeedViolation,
}

impl Infeasible {
    pub fn to_error(&self, params: &VehicleParameters) -> EvasionError {
        EvasionError::InfeasibleDynamics {
            time_step: self.candidate.time_step,
            speed: self.candidate.speed(),
            min: params.braking_threshold,
            max: params.v_max,
        }
    }
}

fn band(prev: f64, jerk_min: f64, jerk_max: f64, a_min: f64, a_max: f64, dt: f64) -> (f64, f64) {
    let hi = (prev + jerk_max * dt).min(a_max);
    let lo = (prev + jerk_min * dt).max(a_min).min(hi);
    (lo, hi)
}

/// Clips a `[longitudinal, lateral]` request to the jerk band around the
/// previous acceleration and to the hard acceleration limits.
pub fn clip_acceleration(params: &VehicleParameters, dt: f64, previous: [f64; 2], request: [f64; 2]) -> [f64; 2] {
    let (lo_long, hi_long) = band(previous[0], params.j_long_min, params.j_long_max, params.a_long_min, params.a_long_max, dt);
    let (lo_lat, hi_lat) = band(previous[1], params.j_lat_min, params.j_lat_max, params.a_lat_min, params.a_lat_max, dt);
    [request[0].clamp(lo_long, hi_long), request[1].clamp(lo_lat, hi_lat)]
}

/// Advances `state` by one step of `ctx.dt` under the requested vehicle-frame
/// acceleration.
pub fn step(ctx: &SimulationContext, state: &VehicleState, request: [f64; 2]) -> Result<VehicleState, Infeasible> {
    let accel = clip_acceleration(&ctx.params, ctx.dt, state.acceleration, request);
    integrate(ctx, state, accel)
}

/// Advances `state` under `accel` as given, without the jerk band. Only the
/// velocity band is checked.
pub fn integrate(ctx: &SimulationContext, state: &VehicleState, accel: [f64; 2]) -> Result<VehicleState, Infeasible> {
    let params = &ctx.params;
    let dt = ctx.dt;

    let (sin, cos) = state.orientation.sin_cos();
    let ax = accel[0] * cos - accel[1] * sin;
    let ay = accel[0] * sin + accel[1] * cos;

    let velocity = [state.velocity[0] + ax * dt, state.velocity[1] + ay * dt];
    let position = [
        state.position[0] + state.velocity[0] * dt + 0.5 * ax * dt * dt,
        state.position[1] + state.velocity[1] * dt + 0.5 * ay * dt * dt,
    ];
    let speed = velocity[0].hypot(velocity[1]);
    let orientation = if speed > BAND_EPS {
        velocity[1].atan2(velocity[0])
    } else {
        state.orientation
    };

    let candidate = VehicleState {
        time_step: state.time_step + 1,
        position,
        velocity,
        orientation,
        acceleration: accel,
        jerk: [(accel[0] - state.acceleration[0]) / dt, (accel[1] - state.acceleration[1]) / dt],
    };

    // a velocity that flipped against the old heading counts as stopped
    let forward = velocity[0] * cos + velocity[1] * sin;
    if forward < params.braking_threshold {
        return Err(Infeasible {
            candidate,
            violation: SpeedViolation::BelowThreshold,
        });
    }
    if speed > params.v_max {
        return Err(Infeasible {
            candidate,
            violation: SpeedViolation::AboveMax,
        });
    }
    Ok(candidate)
}

/// Checks the jerk band, the hard acceleration bounds and the velocity band
/// of a transition produced by [`step`].
pub fn is_feasible_transition(ctx: &SimulationContext, prev: &VehicleState, next: &VehicleState) -> bool {
    let p = &ctx.params;
    let dt = ctx.dt;
    let within = |v: f64, lo: f64, hi: f64| v >= lo - BAND_EPS && v <= hi + BAND_EPS;

    let d_long = next.acceleration[0] - prev.acceleration[0];
    let d_lat = next.acceleration[1] - prev.acceleration[1];
    next.time_step == prev.time_step + 1
        && within(d_long, p.j_long_min * dt, p.j_long_max * dt)
        && within(d_lat, p.j_lat_min * dt, p.j_lat_max * dt)
        && within(next.acceleration[0], p.a_long_min, p.a_long_max)
        && within(next.acceleration[1], p.a_lat_min, p.a_lat_max)
        && within(next.speed(), p.braking_threshold, p.v_max)
}
