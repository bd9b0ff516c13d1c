use std::env;
use std::fs;
use std::path::Path;

use anyhow::Context;
use csv::Writer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use evasion::{
    estimate_collision_probability, CollisionEstimate, CollisionOracle, MonteCarloConfig, Obstacle, RectShape,
    Scenario, SimulationContext, StraightRoad, Trajectory, VehicleParameters, VehicleState,
};

const SAMPLES_FILE_PATH: &str = "data/collision_prob_exp/samples.csv";
const COLLIDING_TRAJ_FILE_PATH: &str = "data/collision_prob_exp/first_colliding_sample.csv";

fn save_samples_to_csv(path: &Path, estimate: &CollisionEstimate) -> anyhow::Result<()> {
    let mut wtr = Writer::from_path(path)?;
    wtr.write_record(["sample", "maneuver", "a_long", "a_lat", "density", "collided", "complete"])?;
    for (i, s) in estimate.samples.iter().enumerate() {
        wtr.write_record(&[
            i.to_string(),
            format!("{:?}", s.plan.spec),
            s.plan.a_long.to_string(),
            s.plan.a_lat.to_string(),
            s.density.to_string(),
            s.collided.to_string(),
            s.complete.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let save_data = true;
    let current_dir = env::current_dir().context("failed to get current directory")?;
    let samples_path = current_dir.join(SAMPLES_FILE_PATH);
    let colliding_path = current_dir.join(COLLIDING_TRAJ_FILE_PATH);
    if save_data {
        if let Some(parent) = samples_path.parent() {
            info!(dir = %parent.display(), "saving data");
            fs::create_dir_all(parent)?;
        }
    }

    // optional sampling config as JSON, defaults otherwise
    let config = match env::args().nth(1) {
        Some(path) => MonteCarloConfig::from_json_file(&path).with_context(|| format!("loading {path}"))?,
        None => MonteCarloConfig::default(),
    };

    let dt = 0.1;
    let horizon = 40;
    let params = VehicleParameters::default();
    let shape = RectShape {
        length: params.length,
        width: params.width,
    };
    let ctx = SimulationContext::new(params, dt, horizon)?;

    // the ego closes in on a slower car in the same lane of a three-lane road
    let road = StraightRoad::new([-10.0, -5.25], 0.0, 3.5, 3, 400.0)?;
    let ego = VehicleState::new(0, [0.0, 0.0], 20.0, 0.0);
    let lead = Trajectory::constant_velocity(VehicleState::new(0, [20.0, 0.0], 12.0, 0.0), horizon, dt);

    let scenario = Scenario {
        obstacles: Vec::new(),
        road_boundary: road.boundary_segments(),
    };
    let oracle = CollisionOracle::build(&scenario, None, shape).with_participant(&Obstacle::from_trajectory(2, shape, &lead));

    let estimate = estimate_collision_probability(&ctx, &road, &oracle, &ego, &config)?;
    info!(
        probability = estimate.probability,
        frequency = estimate.collision_frequency(),
        collisions = estimate.collisions(),
        samples = estimate.samples.len(),
        "monte-carlo estimate"
    );

    if save_data {
        save_samples_to_csv(&samples_path, &estimate)?;
        if let Some(sample) = estimate.samples.iter().find(|s| s.collided) {
            sample.trajectory.save_to_csv(&colliding_path)?;
        }
        info!(path = %samples_path.display(), "saved samples");
    }

    Ok(())
}
