//! Time-to-react: the best time-to-maneuver over a set of maneuvers, and its
//! worst-case counterpart driven by a reachable-set oracle.

use rayon::prelude::*;

use crate::collision::CollisionOracle;
use crate::config::SimulationContext;
use crate::error::{EvasionError, Result};
use crate::lane::LaneGeometry;
use crate::maneuver::ManeuverSpec;
use crate::reach::ReachabilityOracle;
use crate::search::{bisect, search_time_to_maneuver, Probe, SearchResult, ValueOffset};
use crate::state::Trajectory;

/// Maneuvers evaluated by [`time_to_react`], in tie-break order.
pub const REACT_MANEUVERS: [ManeuverSpec; 4] = [
    ManeuverSpec::Brake,
    ManeuverSpec::Kickdown,
    ManeuverSpec::SteerLeft,
    ManeuverSpec::SteerRight,
];

/// Shared inputs of the per-maneuver searches.
#[derive(Clone, Copy)]
pub struct ReactInputs<'a> {
    pub ctx: &'a SimulationContext,
    pub oracle: &'a CollisionOracle,
    pub lanes: &'a dyn LaneGeometry,
    pub reference: &'a Trajectory,
    pub start_step: usize,
    pub ttc: f64,
}

impl ReactInputs<'_> {
    pub fn search(&self, maneuver: ManeuverSpec) -> Result<SearchResult> {
        search_time_to_maneuver(
            self.ctx,
            self.oracle,
            self.lanes,
            self.reference,
            maneuver,
            self.start_step,
            self.ttc,
        )
    }
}

// first maximum wins
fn select_best(results: Vec<SearchResult>) -> Option<SearchResult> {
    let mut best: Option<SearchResult> = None;
    for result in results {
        match &best {
            Some(b) if result.value <= b.value => {}
            _ => best = Some(result),
        }
    }
    best
}

/// Runs the search for every maneuver in parallel and keeps the largest value.
/// Ties go to the maneuver listed first.
pub fn time_to_react_over(inputs: &ReactInputs<'_>, maneuvers: &[ManeuverSpec]) -> Result<SearchResult> {
    let results = maneuvers
        .par_iter()
        .map(|m| inputs.search(*m))
        .collect::<Result<Vec<_>>>()?;
    for r in &results {
        tracing::debug!(maneuver = ?r.maneuver, value = r.value, "time to maneuver");
    }
    let best = select_best(results)
        .ok_or_else(|| EvasionError::InvalidConfig("time-to-react needs at least one maneuver".to_string()))?;
    tracing::info!(maneuver = ?best.maneuver, value = best.value, ttc = inputs.ttc, "time to react");
    Ok(best)
}

/// TTR over brake, kickdown and the better of the two steering directions.
pub fn time_to_react(inputs: &ReactInputs<'_>) -> Result<SearchResult> {
    time_to_react_over(inputs, &REACT_MANEUVERS)
}

pub fn time_to_brake(inputs: &ReactInputs<'_>) -> Result<SearchResult> {
    inputs.search(ManeuverSpec::Brake)
}

pub fn time_to_kickdown(inputs: &ReactInputs<'_>) -> Result<SearchResult> {
    inputs.search(ManeuverSpec::Kickdown)
}

/// The better of steering left and right, left winning ties.
pub fn time_to_steer(inputs: &ReactInputs<'_>) -> Result<SearchResult> {
    let (left, right) = rayon::join(
        || inputs.search(ManeuverSpec::SteerLeft),
        || inputs.search(ManeuverSpec::SteerRight),
    );
    let (left, right) = (left?, right?);
    Ok(if right.value > left.value { right } else { left })
}

/// Worst-case time-to-react: the same search, with each cutoff accepted when
/// the reachable set from the reference state at that cutoff is still
/// non-empty at the horizon. The value counts up to the first rejected cutoff,
/// one step more than [`search_time_to_maneuver`] reports for the same boundary.
pub fn search_worst_case(
    ctx: &SimulationContext,
    reach_oracle: &dyn ReachabilityOracle,
    reference: &Trajectory,
    start_step: usize,
    ttc: f64,
) -> Result<SearchResult> {
    let result = bisect(ctx, start_step, ttc, ValueOffset::FirstInfeasible, None, |cutoff| {
        let feasible = match reference.state_at(cutoff) {
            Some(state) => reach_oracle.terminal_reachable(state, ctx.horizon)?,
            None => false,
        };
        Ok(Probe {
            cutoff,
            feasible,
            trajectory: None,
        })
    })?;
    tracing::info!(value = result.value, ttc, "worst-case time to react");
    Ok(result)
}
