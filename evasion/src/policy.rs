//! Maneuver simulators: per-family controllers driving the integrator from a
//! start state to the horizon.
//!
//! Longitudinal maneuvers recover from a stop by snapping to standstill and
//! padding the rest of the horizon. Lateral and random maneuvers drop the
//! failing acceleration component and retry the step, aborting the
//! simulation if that still fails.

use std::f64::consts::FRAC_PI_2;

use crate::config::SimulationContext;
use crate::error::{EvasionError, Result};
use crate::integrator::{clip_acceleration, integrate, step, SpeedViolation};
use crate::lane::{LaneGeometry, TurnGeometry};
use crate::maneuver::{Family, LateralKind, ManeuverPlan, ManeuverSpec, StagePlan, DEFAULT_LATERAL_OFFSET};
use crate::state::{Trajectory, VehicleState};
use crate::utils::heading_error;

/// Gain of the heading alignment controller (1/s).
pub const K_ALIGN: f64 = 2.0;
/// Gain of the speed shaping ahead of an intersection (1/s).
pub const K_SPEED: f64 = 1.5;

/// A simulated maneuver. The trajectory starts with the start state and ends
/// at the horizon unless the simulation aborted.
#[derive(Debug)]
pub struct Simulation {
    pub trajectory: Trajectory,
    /// First stationary step appended after a snap to standstill.
    pub padded_from: Option<usize>,
    /// Why the simulation stopped early, if it did.
    pub aborted: Option<EvasionError>,
}

impl Simulation {
    fn start(start: &VehicleState) -> Self {
        let mut trajectory = Trajectory::default();
        trajectory.push(*start);
        Self {
            trajectory,
            padded_from: None,
            aborted: None,
        }
    }

    fn abort(&mut self, err: EvasionError) {
        tracing::debug!(error = %err, "maneuver simulation aborted");
        self.aborted = Some(err);
    }

    pub fn reaches(&self, horizon: usize) -> bool {
        self.trajectory.reaches(horizon)
    }
}

/// Simulates `plan` from `start` up to `horizon`, dispatching on the maneuver family.
pub fn simulate_maneuver(
    ctx: &SimulationContext,
    lanes: &dyn LaneGeometry,
    plan: &ManeuverPlan,
    start: &VehicleState,
    horizon: usize,
) -> Result<Simulation> {
    if let Some(family) = plan.spec.family() {
        tracing::trace!(
            maneuver = ?plan.spec,
            recovery = ?family.recovery_policy(),
            start_step = start.time_step,
            "simulating maneuver"
        );
    }
    match plan.spec.family() {
        Some(Family::Longitudinal) => simulate_longitudinal(ctx, plan, start, horizon),
        Some(Family::Lateral) => simulate_lateral(ctx, lanes, plan, start, horizon),
        Some(Family::Random) => simulate_random(ctx, plan, start, horizon),
        None => Err(EvasionError::UnsupportedManeuver {
            maneuver: plan.spec,
            simulator: "maneuver",
        }),
    }
}

fn require_family(plan: &ManeuverPlan, family: Family) -> Result<()> {
    if plan.spec.family() == Some(family) {
        Ok(())
    } else {
        Err(EvasionError::UnsupportedManeuver {
            maneuver: plan.spec,
            simulator: family.name(),
        })
    }
}

fn longitudinal_target(ctx: &SimulationContext, plan: &ManeuverPlan, state: &VehicleState) -> f64 {
    let p = &ctx.params;
    let v = state.speed();
    // engine power roll-off above the switching speed
    let roll_off = if v > p.v_switch { p.v_switch / v } else { 1.0 };
    let target = match plan.spec {
        ManeuverSpec::Brake => -plan.a_long,
        ManeuverSpec::Kickdown => plan.a_long * roll_off,
        ManeuverSpec::StopMc => -plan.a_long.abs() * roll_off,
        _ => 0.0,
    };
    target.min((p.v_max - v) / ctx.dt)
}

pub fn simulate_longitudinal(
    ctx: &SimulationContext,
    plan: &ManeuverPlan,
    start: &VehicleState,
    horizon: usize,
) -> Result<Simulation> {
    require_family(plan, Family::Longitudinal)?;

    let mut sim = Simulation::start(start);
    let mut state = *start;
    while state.time_step < horizon {
        let request = [longitudinal_target(ctx, plan, &state), 0.0];
        match step(ctx, &state, request) {
            Ok(next) => {
                sim.trajectory.push(next);
                state = next;
            }
            Err(inf) if inf.violation == SpeedViolation::BelowThreshold => {
                tracing::trace!(time_step = inf.candidate.time_step, "snapping to standstill");
                sim.padded_from = Some(state.time_step + 1);
                while state.time_step < horizon {
                    state = state.stationary_successor();
                    sim.trajectory.push(state);
                }
            }
            Err(inf) => {
                sim.abort(inf.to_error(&ctx.params));
                break;
            }
        }
    }
    Ok(sim)
}

// drop the longitudinal component first, then both. Dropped components are
// applied as exact zeros, outside the jerk band.
fn step_with_retry(ctx: &SimulationContext, state: &VehicleState, request: [f64; 2]) -> Result<VehicleState> {
    let accel = clip_acceleration(&ctx.params, ctx.dt, state.acceleration, request);
    let mut last = match integrate(ctx, state, accel) {
        Ok(next) => return Ok(next),
        Err(inf) => inf,
    };
    for (i, zeroed) in [[0.0, accel[1]], [0.0, 0.0]].into_iter().enumerate() {
        match integrate(ctx, state, zeroed) {
            Ok(next) => {
                tracing::trace!(time_step = next.time_step, retry = i + 1, "recovered by zeroing acceleration");
                return Ok(next);
            }
            Err(inf) => last = inf,
        }
    }
    Err(last.to_error(&ctx.params))
}

fn align_lateral(state: &VehicleState, target_heading: f64, a_lat: f64) -> f64 {
    let command = K_ALIGN * state.speed() * heading_error(state.orientation, target_heading);
    command.clamp(-a_lat, a_lat)
}

// speed at which the arc can be driven with lateral acceleration `a_lat`
fn curvature_limited_speed(a_lat: f64, curvature: f64) -> Option<f64> {
    if curvature <= f64::EPSILON {
        None
    } else {
        Some((a_lat / curvature).sqrt())
    }
}

#[derive(Debug, Clone, Copy)]
enum LateralPhase {
    Approach { turn: TurnGeometry, target_speed: Option<f64> },
    Staged { k: usize },
    Align,
}

pub fn simulate_lateral(
    ctx: &SimulationContext,
    lanes: &dyn LaneGeometry,
    plan: &ManeuverPlan,
    start: &VehicleState,
    horizon: usize,
) -> Result<Simulation> {
    require_family(plan, Family::Lateral)?;
    let profile = plan.spec.profile();
    let kind = profile.lateral.unwrap_or(LateralKind::Steer);
    let side = plan.side();
    let a_mag = plan.a_lat.abs();

    let mut sim = Simulation::start(start);
    let lane = match lanes.lane_at(&start.position) {
        Some(lane) => lane,
        None => {
            sim.abort(EvasionError::NoLaneGeometry {
                x: start.position[0],
                y: start.position[1],
            });
            return Ok(sim);
        }
    };

    let offset = match kind {
        LateralKind::LaneChange if !lane.has_neighbour(side) => {
            tracing::debug!(?side, "no adjacent lane to change into");
            sim.abort(EvasionError::NoLaneGeometry {
                x: start.position[0],
                y: start.position[1],
            });
            return Ok(sim);
        }
        LateralKind::LaneChange => lane.distance_to_boundary(side) + 0.5 * ctx.params.width,
        _ => DEFAULT_LATERAL_OFFSET,
    };
    let stages = StagePlan::new(offset, a_mag, ctx.dt, profile.signs);

    let (mut phase, fixed_heading) = match kind {
        LateralKind::Turn => match lanes.turn_at(&start.position, side) {
            Some(turn) => {
                // a straight chord says nothing, fall back to the lane's own curvature
                let target_speed = curvature_limited_speed(a_mag, turn.curvature())
                    .or_else(|| curvature_limited_speed(a_mag, lane.curvature))
                    .map(|v| v.min(ctx.params.v_max));
                (LateralPhase::Approach { turn, target_speed }, Some(turn.exit_orientation))
            }
            None => (LateralPhase::Align, Some(lane.orientation + side.sign() * FRAC_PI_2)),
        },
        _ => (LateralPhase::Staged { k: 0 }, None),
    };

    let mut state = *start;
    while state.time_step < horizon {
        let request = match phase {
            LateralPhase::Approach { turn, target_speed } => {
                if turn.has_entered(&state.position) {
                    tracing::trace!(time_step = state.time_step, speed = state.speed(), "entered turning lanelet");
                    phase = LateralPhase::Align;
                    continue;
                }
                let a_long = target_speed.map_or(0.0, |v| K_SPEED * (v - state.speed()));
                [a_long, 0.0]
            }
            LateralPhase::Staged { k } => match stages.sign_at(k) {
                Some(sign) => {
                    phase = LateralPhase::Staged { k: k + 1 };
                    [0.0, sign * side.sign() * a_mag]
                }
                None => {
                    phase = LateralPhase::Align;
                    continue;
                }
            },
            LateralPhase::Align => {
                let heading = match fixed_heading {
                    Some(heading) => heading,
                    None => match lanes.lane_at(&state.position) {
                        Some(lane) => lane.orientation,
                        None => {
                            sim.abort(EvasionError::NoLaneGeometry {
                                x: state.position[0],
                                y: state.position[1],
                            });
                            break;
                        }
                    },
                };
                [0.0, align_lateral(&state, heading, a_mag)]
            }
        };

        match step_with_retry(ctx, &state, request) {
            Ok(next) => {
                sim.trajectory.push(next);
                state = next;
            }
            Err(err) => {
                sim.abort(err);
                break;
            }
        }
    }
    Ok(sim)
}

pub fn simulate_random(
    ctx: &SimulationContext,
    plan: &ManeuverPlan,
    start: &VehicleState,
    horizon: usize,
) -> Result<Simulation> {
    require_family(plan, Family::Random)?;

    let mut sim = Simulation::start(start);
    let mut state = *start;
    while state.time_step < horizon {
        match step_with_retry(ctx, &state, [plan.a_long, plan.a_lat]) {
            Ok(next) => {
                sim.trajectory.push(next);
                state = next;
            }
            Err(err) => {
                sim.abort(err);
                break;
            }
        }
    }
    Ok(sim)
}
