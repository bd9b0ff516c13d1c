//! Monte-Carlo collision probability over sampled evasive maneuvers.
//!
//! Each family draws its accelerations from zero-mean normals scaled by the
//! deterministic limits. The estimate is the mean sample density over the
//! colliding samples, not the fraction of samples that collide.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::collision::CollisionOracle;
use crate::config::{MonteCarloConfig, MonteCarloWeights, SimulationContext};
use crate::error::Result;
use crate::lane::LaneGeometry;
use crate::maneuver::{sample_plan, ManeuverPlan, ManeuverSpec};
use crate::policy::simulate_maneuver;
use crate::state::{Trajectory, VehicleState};

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub plan: ManeuverPlan,
    pub density: f64,
    pub collided: bool,
    /// False if the simulation aborted before the horizon.
    pub complete: bool,
    pub trajectory: Trajectory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEstimate {
    pub probability: f64,
    pub samples: Vec<Sample>,
}

impl CollisionEstimate {
    pub fn collisions(&self) -> usize {
        self.samples.iter().filter(|s| s.collided).count()
    }

    /// Raw share of colliding samples, for comparison with the estimate.
    pub fn collision_frequency(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.collisions() as f64 / self.samples.len() as f64
        }
    }
}

/// `round(n_samples * weight)` samples for each family.
pub fn samples_per_family(weights: &MonteCarloWeights, n_samples: usize) -> [(ManeuverSpec, usize); 5] {
    weights
        .entries()
        .map(|(spec, w)| (spec, (n_samples as f64 * w).round().max(0.0) as usize))
}

fn sample_family(
    ctx: &SimulationContext,
    lanes: &dyn LaneGeometry,
    oracle: &CollisionOracle,
    start: &VehicleState,
    spec: ManeuverSpec,
    count: usize,
    seed: u64,
) -> Result<Vec<Sample>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut samples = Vec::with_capacity(count);
    for _ in 0..count {
        let (plan, density) = sample_plan(spec, &ctx.params, &mut rng)?;
        let sim = simulate_maneuver(ctx, lanes, &plan, start, ctx.horizon)?;
        let collided = oracle.collide(&sim.trajectory);
        samples.push(Sample {
            plan,
            density,
            collided,
            complete: sim.reaches(ctx.horizon),
            trajectory: sim.trajectory,
        });
    }
    tracing::debug!(
        maneuver = ?spec,
        samples = count,
        collisions = samples.iter().filter(|s| s.collided).count(),
        "sampled maneuver family"
    );
    Ok(samples)
}

/// Samples every maneuver family from `start` and estimates the collision
/// probability as the mean density of the colliding samples, clamped to `[0, 1]`.
/// Family `i` draws from a generator seeded with `config.seed + i`, so results
/// do not depend on scheduling.
pub fn estimate_collision_probability(
    ctx: &SimulationContext,
    lanes: &dyn LaneGeometry,
    oracle: &CollisionOracle,
    start: &VehicleState,
    config: &MonteCarloConfig,
) -> Result<CollisionEstimate> {
    config.weights.validate()?;
    let counts = samples_per_family(&config.weights, config.n_samples);

    let families = counts[..]
        .par_iter()
        .enumerate()
        .map(|(i, (spec, count))| {
            sample_family(ctx, lanes, oracle, start, *spec, *count, config.seed.wrapping_add(i as u64))
        })
        .collect::<Result<Vec<_>>>()?;
    let samples: Vec<Sample> = families.into_iter().flatten().collect();

    let (sum, hits) = samples
        .iter()
        .filter(|s| s.collided)
        .fold((0.0, 0usize), |(sum, n), s| (sum + s.density, n + 1));
    let probability = if hits == 0 { 0.0 } else { (sum / hits as f64).clamp(0.0, 1.0) };

    tracing::info!(
        samples = samples.len(),
        collisions = hits,
        probability,
        "collision probability estimated"
    );
    Ok(CollisionEstimate { probability, samples })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_per_family_rounds() {
        let counts = samples_per_family(&MonteCarloWeights::default(), 500);
        assert!(counts.iter().all(|(_, n)| *n == 100));

        let weights = MonteCarloWeights {
            stop: 0.25,
            turn: 0.25,
            lane_change: 0.25,
            overtake: 0.25,
            random: 0.0,
        };
        let counts = samples_per_family(&weights, 10);
        assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), 12);
        assert_eq!(counts[4], (ManeuverSpec::RandomMc, 0));
    }

    #[test]
    fn test_frequency_of_empty_estimate() {
        let estimate = CollisionEstimate {
            probability: 0.0,
            samples: Vec::new(),
        };
        assert_eq!(estimate.collision_frequency(), 0.0);
        assert_eq!(estimate.collisions(), 0);
    }
}
