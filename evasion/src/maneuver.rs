//! Maneuver variants and the stage/sign table that drives their controllers.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::config::VehicleParameters;
use crate::error::{EvasionError, Result};
use crate::lane::Side;
use crate::utils::normal_pdf;

/// Lateral offset targeted by steer, turn and overtake stages (m).
pub const DEFAULT_LATERAL_OFFSET: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManeuverSpec {
    Brake,
    Kickdown,
    ConstantVelocity,
    SteerLeft,
    SteerRight,
    TurnLeft,
    TurnRight,
    LaneChangeLeft,
    LaneChangeRight,
    OvertakeLeft,
    OvertakeRight,
    StopMc,
    TurnMc,
    LaneChangeMc,
    OvertakeMc,
    RandomMc,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
    Longitudinal,
    Lateral,
    Random,
}

/// How a simulator reacts when the integrator leaves the velocity band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPolicy {
    /// Snap to standstill and pad the rest of the horizon with that state.
    SnapAndPad,
    /// Drop the offending acceleration component and redo the step.
    ZeroAndRetry,
}

impl Family {
    pub fn recovery_policy(self) -> RecoveryPolicy {
        match self {
            Family::Longitudinal => RecoveryPolicy::SnapAndPad,
            Family::Lateral | Family::Random => RecoveryPolicy::ZeroAndRetry,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Family::Longitudinal => "longitudinal",
            Family::Lateral => "lateral",
            Family::Random => "random",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LateralKind {
    Steer,
    Turn,
    LaneChange,
    Overtake,
}

const ONE_STAGE: &[f64] = &[1.0];
const TWO_STAGE: &[f64] = &[1.0, -1.0];
// out, counter-steer, back, counter-steer: the sign flips at stages 1 and 3,
// so the last stage is + and not a repeated -
const FOUR_STAGE: &[f64] = &[1.0, -1.0, -1.0, 1.0];

/// Row of the maneuver table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManeuverProfile {
    pub family: Option<Family>,
    pub lateral: Option<LateralKind>,
    /// Fixed side for deterministic lateral maneuvers; sampled ones pick it from the draw.
    pub side: Option<Side>,
    pub signs: &'static [f64],
}

impl ManeuverProfile {
    pub fn nr_stage(&self) -> usize {
        self.signs.len()
    }
}

impl ManeuverSpec {
    pub fn profile(self) -> ManeuverProfile {
        use LateralKind::*;
        use ManeuverSpec as M;

        let longitudinal = ManeuverProfile {
            family: Some(Family::Longitudinal),
            lateral: None,
            side: None,
            signs: ONE_STAGE,
        };
        let lateral = |kind, side, signs| ManeuverProfile {
            family: Some(Family::Lateral),
            lateral: Some(kind),
            side,
            signs,
        };

        match self {
            M::Brake | M::Kickdown | M::ConstantVelocity | M::StopMc => longitudinal,
            M::SteerLeft => lateral(Steer, Some(Side::Left), TWO_STAGE),
            M::SteerRight => lateral(Steer, Some(Side::Right), TWO_STAGE),
            M::TurnLeft => lateral(Turn, Some(Side::Left), ONE_STAGE),
            M::TurnRight => lateral(Turn, Some(Side::Right), ONE_STAGE),
            M::LaneChangeLeft => lateral(LaneChange, Some(Side::Left), TWO_STAGE),
            M::LaneChangeRight => lateral(LaneChange, Some(Side::Right), TWO_STAGE),
            M::OvertakeLeft => lateral(Overtake, Some(Side::Left), FOUR_STAGE),
            M::OvertakeRight => lateral(Overtake, Some(Side::Right), FOUR_STAGE),
            M::TurnMc => lateral(Turn, None, ONE_STAGE),
            M::LaneChangeMc => lateral(LaneChange, None, TWO_STAGE),
            M::OvertakeMc => lateral(Overtake, None, FOUR_STAGE),
            M::RandomMc => ManeuverProfile {
                family: Some(Family::Random),
                lateral: None,
                side: None,
                signs: ONE_STAGE,
            },
            M::None => ManeuverProfile {
                family: None,
                lateral: None,
                side: None,
                signs: &[],
            },
        }
    }

    pub fn family(self) -> Option<Family> {
        self.profile().family
    }

    pub fn nr_stage(self) -> usize {
        self.profile().nr_stage()
    }
}

/// A maneuver with concrete acceleration magnitudes, ready to simulate.
///
/// `a_long` is the longitudinal magnitude, `a_lat` the signed lateral
/// magnitude (positive to the left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManeuverPlan {
    pub spec: ManeuverSpec,
    pub a_long: f64,
    pub a_lat: f64,
}

impl ManeuverPlan {
    /// The bang-bang magnitudes of a deterministic maneuver.
    pub fn deterministic(spec: ManeuverSpec, params: &VehicleParameters) -> Self {
        let a_lat = match spec.profile().side {
            Some(Side::Left) => params.a_lat_max,
            Some(Side::Right) => params.a_lat_min,
            None => 0.0,
        };
        Self {
            spec,
            a_long: params.a_long_max,
            a_lat,
        }
    }

    pub fn side(&self) -> Side {
        match self.spec.profile().side {
            Some(side) => side,
            None if self.a_lat >= 0.0 => Side::Left,
            None => Side::Right,
        }
    }
}

fn gaussian(sigma: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, sigma).map_err(|e| EvasionError::Sampling(e.to_string()))
}

/// Draws a plan for a Monte-Carlo maneuver. Each sampled acceleration comes
/// from a zero-mean normal whose standard deviation is the deterministic
/// bang-bang magnitude; the returned density is the product of the per-axis
/// densities.
pub fn sample_plan<R: Rng + ?Sized>(spec: ManeuverSpec, params: &VehicleParameters, rng: &mut R) -> Result<(ManeuverPlan, f64)> {
    let long_sigma = params.a_long_max;
    let lat_sigma = params.a_lat_max;

    match spec {
        ManeuverSpec::StopMc => {
            let a_long = gaussian(long_sigma)?.sample(rng);
            let plan = ManeuverPlan { spec, a_long, a_lat: 0.0 };
            Ok((plan, normal_pdf(a_long, long_sigma)))
        }
        ManeuverSpec::TurnMc | ManeuverSpec::LaneChangeMc | ManeuverSpec::OvertakeMc => {
            let a_lat = gaussian(lat_sigma)?.sample(rng);
            let plan = ManeuverPlan { spec, a_long: 0.0, a_lat };
            Ok((plan, normal_pdf(a_lat, lat_sigma)))
        }
        ManeuverSpec::RandomMc => {
            let a_long = gaussian(long_sigma)?.sample(rng);
            let a_lat = gaussian(lat_sigma)?.sample(rng);
            let plan = ManeuverPlan { spec, a_long, a_lat };
            Ok((plan, normal_pdf(a_long, long_sigma) * normal_pdf(a_lat, lat_sigma)))
        }
        _ => Err(EvasionError::UnsupportedManeuver {
            maneuver: spec,
            simulator: "monte-carlo",
        }),
    }
}

/// Bang-bang stage timing for a lateral offset `offset` at lateral
/// acceleration `a_lat`: `total_time = sqrt(4 * offset / |a_lat|)`, each stage
/// lasting half of it, rounded to whole steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StagePlan {
    pub half_steps: usize,
    pub signs: &'static [f64],
}

impl StagePlan {
    pub fn new(offset: f64, a_lat: f64, dt: f64, signs: &'static [f64]) -> Self {
        let total_time = (4.0 * offset.abs() / a_lat.abs()).sqrt();
        let half_steps = if total_time.is_finite() {
            ((0.5 * total_time / dt).round() as usize).max(1)
        } else {
            0
        };
        Self { half_steps, signs }
    }

    pub fn total_steps(&self) -> usize {
        self.half_steps * self.signs.len()
    }

    /// Sign of the lateral command `k` steps into the staged portion, `None` once it is over.
    pub fn sign_at(&self, k: usize) -> Option<f64> {
        if self.half_steps == 0 {
            return None;
        }
        self.signs.get(k / self.half_steps).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_stage_counts() {
        assert_eq!(ManeuverSpec::Brake.nr_stage(), 1);
        assert_eq!(ManeuverSpec::TurnLeft.nr_stage(), 1);
        assert_eq!(ManeuverSpec::SteerRight.nr_stage(), 2);
        assert_eq!(ManeuverSpec::LaneChangeMc.nr_stage(), 2);
        assert_eq!(ManeuverSpec::OvertakeLeft.nr_stage(), 4);
        assert_eq!(ManeuverSpec::None.nr_stage(), 0);
    }

    #[test]
    fn test_families_and_recovery() {
        assert_eq!(ManeuverSpec::StopMc.family(), Some(Family::Longitudinal));
        assert_eq!(ManeuverSpec::OvertakeMc.family(), Some(Family::Lateral));
        assert_eq!(ManeuverSpec::RandomMc.family(), Some(Family::Random));
        assert_eq!(ManeuverSpec::None.family(), None);
        assert_eq!(Family::Longitudinal.recovery_policy(), RecoveryPolicy::SnapAndPad);
        assert_eq!(Family::Lateral.recovery_policy(), RecoveryPolicy::ZeroAndRetry);
        assert_eq!(Family::Random.recovery_policy(), RecoveryPolicy::ZeroAndRetry);
    }

    #[test]
    fn test_overtake_sign_pattern() {
        let stage = StagePlan::new(0.8, 4.0, 0.1, ManeuverSpec::OvertakeLeft.profile().signs);
        // sqrt(4 * 0.8 / 4) = 0.894 s, half of it rounds to 4 steps
        assert_eq!(stage.half_steps, 4);
        assert_eq!(stage.total_steps(), 16);
        let signs: Vec<f64> = (0..16).map(|k| stage.sign_at(k).unwrap()).collect();
        assert_eq!(&signs[0..4], &[1.0; 4]);
        assert_eq!(&signs[4..12], &[-1.0; 8]);
        assert_eq!(&signs[12..16], &[1.0; 4]);
        assert_eq!(stage.sign_at(16), None);
    }

    #[test]
    fn test_zero_acceleration_has_no_stages() {
        let stage = StagePlan::new(0.8, 0.0, 0.1, TWO_STAGE);
        assert_eq!(stage.total_steps(), 0);
        assert_eq!(stage.sign_at(0), None);
    }

    #[test]
    fn test_deterministic_plan_sides() {
        let params = VehicleParameters::default();
        let left = ManeuverPlan::deterministic(ManeuverSpec::SteerLeft, &params);
        let right = ManeuverPlan::deterministic(ManeuverSpec::SteerRight, &params);
        assert_eq!(left.a_lat, 4.0);
        assert_eq!(right.a_lat, -4.0);
        assert_eq!(right.side(), Side::Right);
    }

    #[test]
    fn test_sampled_density_matches_draw() {
        let params = VehicleParameters::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (plan, density) = sample_plan(ManeuverSpec::RandomMc, &params, &mut rng).unwrap();
        let expected = normal_pdf(plan.a_long, 8.0) * normal_pdf(plan.a_lat, 4.0);
        assert!((density - expected).abs() < 1e-15);
        assert!(sample_plan(ManeuverSpec::Brake, &params, &mut rng).is_err());
    }
}
