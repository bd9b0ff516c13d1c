use std::env;
use std::fs;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use evasion::{
    search_worst_case, time_to_collision, time_to_react, CollisionOracle, DrivableAreaOracle, ManeuverSpec, Motion,
    Obstacle, Pose, ReachConfig, ReactInputs, RectShape, Scenario, SimulationContext, StraightRoad, Trajectory,
    VehicleParameters, VehicleState,
};
use rtreach::util::save_reachtubes_to_csv;

const TTR_TRAJ_FILE_PATH: &str = "data/ttr_exp/ttr_trajectory.csv";
const REFERENCE_FILE_PATH: &str = "data/ttr_exp/reference.csv";
const REACH_FILE_PATH: &str = "data/ttr_exp/wttr_reach_sets.csv";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let save_data = true;
    let current_dir = env::current_dir().context("failed to get current directory")?;
    let ttr_path = current_dir.join(TTR_TRAJ_FILE_PATH);
    let reference_path = current_dir.join(REFERENCE_FILE_PATH);
    let reach_path = current_dir.join(REACH_FILE_PATH);
    if save_data {
        if let Some(parent) = ttr_path.parent() {
            info!(dir = %parent.display(), "saving data");
            fs::create_dir_all(parent)?;
        }
    }

    let dt = 0.1;
    // optional vehicle limits as JSON, defaults otherwise
    let params = match env::args().nth(1) {
        Some(path) => VehicleParameters::from_json_file(&path).with_context(|| format!("loading {path}"))?,
        None => VehicleParameters::default(),
    };
    let ego_shape = RectShape {
        length: params.length,
        width: params.width,
    };

    // ego at 20 m/s in the middle of three lanes, a car parked ahead half in its lane
    let road = StraightRoad::new([-10.0, -5.25], 0.0, 3.5, 3, 300.0)?;
    let reference = Trajectory::constant_velocity(VehicleState::new(0, [0.0, 0.0], 20.0, 0.0), 60, dt);
    let scenario = Scenario {
        obstacles: vec![Obstacle {
            id: 1,
            shape: ego_shape,
            motion: Motion::Static(Pose {
                position: [65.0, 1.0],
                orientation: 0.0,
            }),
        }],
        road_boundary: road.boundary_segments(),
    };

    let ctx = SimulationContext::from_reference(params, dt, &reference)?;
    let oracle = CollisionOracle::build(&scenario, None, ego_shape);
    let start_step = 0;
    let ttc = time_to_collision(&oracle, &reference, start_step, dt);
    info!(ttc, "baseline time to collision");

    let inputs = ReactInputs {
        ctx: &ctx,
        oracle: &oracle,
        lanes: &road,
        reference: &reference,
        start_step,
        ttc,
    };
    for maneuver in [
        ManeuverSpec::Brake,
        ManeuverSpec::Kickdown,
        ManeuverSpec::SteerLeft,
        ManeuverSpec::SteerRight,
        ManeuverSpec::LaneChangeRight,
        ManeuverSpec::OvertakeRight,
    ] {
        let result = inputs.search(maneuver)?;
        info!(?maneuver, value = result.value, probes = result.probes.len(), "time to maneuver");
    }

    let ttr = time_to_react(&inputs)?;
    info!(maneuver = ?ttr.maneuver, value = ttr.value, "selected reaction");

    let reach = DrivableAreaOracle::new(ctx, oracle, ReachConfig::default())?;
    let wttr = search_worst_case(&ctx, &reach, &reference, start_step, ttc)?;
    info!(value = wttr.value, "worst-case time to react");

    if save_data {
        reference.save_to_csv(&reference_path)?;
        if let Some(trajectory) = &ttr.trajectory {
            trajectory.save_to_csv(&ttr_path)?;
        }
        // reach sets from the last cutoff the worst-case search accepted
        if wttr.value.is_finite() {
            let cutoff = (start_step + ctx.steps_for(wttr.value)).saturating_sub(1);
            if let Some(state) = reference.state_at(cutoff) {
                let result = reach.reach_sets(state, ctx.horizon, true);
                save_reachtubes_to_csv(&reach_path, cutoff, &result.sets)?;
                info!(cutoff, steps = result.sets.len(), path = %reach_path.display(), "saved reach sets");
            }
        }
    }

    Ok(())
}
