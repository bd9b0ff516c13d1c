//! Time-to-maneuver: the latest cutoff step at which a maneuver, started from
//! the reference trajectory, still reaches the horizon without a collision.

use crate::collision::CollisionOracle;
use crate::config::SimulationContext;
use crate::error::{EvasionError, Result};
use crate::lane::LaneGeometry;
use crate::maneuver::{ManeuverPlan, ManeuverSpec};
use crate::policy::simulate_maneuver;
use crate::state::Trajectory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Init,
    /// Feasible cutoffs lie below `low`, infeasible ones at or above `high`.
    Probing { low: usize, high: usize },
    Converged { low: usize },
}

/// One evaluated cutoff.
#[derive(Debug, Clone, PartialEq)]
pub struct Probe {
    pub cutoff: usize,
    pub feasible: bool,
    /// Reference prefix followed by the simulated maneuver, when one was simulated.
    pub trajectory: Option<Trajectory>,
}

impl Probe {
    fn rejected(cutoff: usize) -> Self {
        Self {
            cutoff,
            feasible: false,
            trajectory: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Seconds from the start step; `-inf` when already too late, `+inf` when
    /// no reaction is ever needed.
    pub value: f64,
    pub maneuver: Option<ManeuverSpec>,
    /// Trajectory of the latest feasible probe.
    pub trajectory: Option<Trajectory>,
    pub ttc: f64,
    pub probes: Vec<Probe>,
}

impl SearchResult {
    pub(crate) fn terminal(value: f64, maneuver: Option<ManeuverSpec>, ttc: f64) -> Self {
        Self {
            value,
            maneuver,
            trajectory: None,
            ttc,
            probes: Vec::new(),
        }
    }
}

/// How the converged lower bound is turned into seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValueOffset {
    /// `(low - t0 - 1) * dt`: the last feasible cutoff.
    LastFeasible,
    /// `(low - t0) * dt`: the first infeasible cutoff, as the worst-case search reports it.
    FirstInfeasible,
}

/// Binary search over the cutoffs `[start_step, start_step + round(ttc / dt))`,
/// assuming `probe` turns infeasible at most once as the cutoff grows.
pub(crate) fn bisect<F>(
    ctx: &SimulationContext,
    start_step: usize,
    ttc: f64,
    offset: ValueOffset,
    maneuver: Option<ManeuverSpec>,
    mut probe: F,
) -> Result<SearchResult>
where
    F: FnMut(usize) -> Result<Probe>,
{
    let mut probes: Vec<Probe> = Vec::new();
    let mut state = SearchState::Init;
    loop {
        state = match state {
            SearchState::Init => {
                if ttc <= 0.0 {
                    return Ok(SearchResult::terminal(f64::NEG_INFINITY, maneuver, ttc));
                }
                if ttc == f64::INFINITY {
                    return Ok(SearchResult::terminal(f64::INFINITY, maneuver, ttc));
                }
                if start_step >= ctx.horizon {
                    let err = EvasionError::ZeroTimeSpan { start_step };
                    tracing::debug!(error = %err, "search skipped");
                    return Ok(SearchResult::terminal(f64::NEG_INFINITY, maneuver, ttc));
                }
                let span = (ttc / ctx.dt).round().max(0.0) as usize;
                SearchState::Probing {
                    low: start_step,
                    high: start_step + span,
                }
            }
            SearchState::Probing { low, high } if low >= high => SearchState::Converged { low },
            SearchState::Probing { low, high } => {
                let cutoff = low + (high - low) / 2;
                let result = probe(cutoff)?;
                tracing::trace!(?maneuver, cutoff, low, high, feasible = result.feasible, "probe");
                let next = if result.feasible {
                    SearchState::Probing { low: cutoff + 1, high }
                } else {
                    SearchState::Probing { low, high: cutoff }
                };
                probes.push(result);
                next
            }
            SearchState::Converged { low } => {
                let value = if low == start_step {
                    f64::NEG_INFINITY
                } else {
                    let steps = match offset {
                        ValueOffset::LastFeasible => low - start_step - 1,
                        ValueOffset::FirstInfeasible => low - start_step,
                    };
                    steps as f64 * ctx.dt
                };
                let trajectory = probes
                    .iter()
                    .filter(|p| p.feasible)
                    .max_by_key(|p| p.cutoff)
                    .and_then(|p| p.trajectory.clone());
                tracing::debug!(?maneuver, value, probes = probes.len(), "search converged");
                return Ok(SearchResult {
                    value,
                    maneuver,
                    trajectory,
                    ttc,
                    probes,
                });
            }
        };
    }
}

fn probe_maneuver(
    ctx: &SimulationContext,
    oracle: &CollisionOracle,
    lanes: &dyn LaneGeometry,
    reference: &Trajectory,
    plan: &ManeuverPlan,
    start_step: usize,
    cutoff: usize,
) -> Result<Probe> {
    let Some(state) = reference.state_at(cutoff) else {
        return Ok(Probe::rejected(cutoff));
    };
    let sim = simulate_maneuver(ctx, lanes, plan, state, ctx.horizon)?;
    let trajectory = reference.slice(start_step, cutoff).concat(&sim.trajectory)?;
    let feasible = sim.reaches(ctx.horizon) && !oracle.collide(&trajectory);
    Ok(Probe {
        cutoff,
        feasible,
        trajectory: Some(trajectory),
    })
}

/// Latest time after `start_step` at which `maneuver` can still be initiated
/// from the reference trajectory and avoid every obstacle up to the horizon.
pub fn search_time_to_maneuver(
    ctx: &SimulationContext,
    oracle: &CollisionOracle,
    lanes: &dyn LaneGeometry,
    reference: &Trajectory,
    maneuver: ManeuverSpec,
    start_step: usize,
    ttc: f64,
) -> Result<SearchResult> {
    if maneuver.family().is_none() {
        return Err(EvasionError::UnsupportedManeuver {
            maneuver,
            simulator: "time-to-maneuver",
        });
    }
    let plan = ManeuverPlan::deterministic(maneuver, &ctx.params);
    bisect(ctx, start_step, ttc, ValueOffset::LastFeasible, Some(maneuver), |cutoff| {
        probe_maneuver(ctx, oracle, lanes, reference, &plan, start_step, cutoff)
    })
}
