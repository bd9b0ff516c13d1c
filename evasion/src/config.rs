//! Vehicle limits and evaluation settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EvasionError, Result};
use crate::maneuver::ManeuverSpec;
use crate::state::Trajectory;

/// Capability limits of the simulated vehicle.
///
/// Defaults describe a mid-size passenger car.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleParameters {
    pub a_long_max: f64,
    pub a_long_min: f64,
    pub a_lat_max: f64,
    pub a_lat_min: f64,
    pub j_long_max: f64,
    pub j_long_min: f64,
    pub j_lat_max: f64,
    pub j_lat_min: f64,
    pub v_max: f64,
    /// Speed above which the engine can no longer deliver `a_long_max`.
    pub v_switch: f64,
    /// Lowest speed the integrator still treats as moving.
    pub braking_threshold: f64,
    pub length: f64,
    pub width: f64,
}

impl Default for VehicleParameters {
    fn default() -> Self {
        Self {
            a_long_max: 8.0,
            a_long_min: -8.0,
            a_lat_max: 4.0,
            a_lat_min: -4.0,
            j_long_max: 10.0,
            j_long_min: -10.0,
            j_lat_max: 10.0,
            j_lat_min: -10.0,
            v_max: 50.0,
            v_switch: 7.3,
            braking_threshold: 0.1,
            length: 4.5,
            width: 1.8,
        }
    }
}

impl VehicleParameters {
    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.a_long_min < 0.0 && self.a_long_max > 0.0, "longitudinal acceleration bounds must straddle zero"),
            (self.a_lat_min < 0.0 && self.a_lat_max > 0.0, "lateral acceleration bounds must straddle zero"),
            (self.j_long_min < 0.0 && self.j_long_max > 0.0, "longitudinal jerk bounds must straddle zero"),
            (self.j_lat_min < 0.0 && self.j_lat_max > 0.0, "lateral jerk bounds must straddle zero"),
            (self.v_max > 0.0, "v_max must be positive"),
            (self.v_switch > 0.0, "v_switch must be positive"),
            (
                self.braking_threshold >= 0.0 && self.braking_threshold < self.v_max,
                "braking_threshold must lie in [0, v_max)",
            ),
            (self.length > 0.0 && self.width > 0.0, "vehicle dimensions must be positive"),
        ];
        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, msg)) => Err(EvasionError::InvalidConfig((*msg).to_string())),
            None => Ok(()),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Read-only inputs shared by every probe of one measure evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationContext {
    pub params: VehicleParameters,
    pub dt: f64,
    /// Final time step of the reference trajectory.
    pub horizon: usize,
}

impl SimulationContext {
    pub fn new(params: VehicleParameters, dt: f64, horizon: usize) -> Result<Self> {
        params.validate()?;
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(EvasionError::InvalidConfig(format!("dt must be positive, got {dt}")));
        }
        Ok(Self { params, dt, horizon })
    }

    pub fn from_reference(params: VehicleParameters, dt: f64, reference: &Trajectory) -> Result<Self> {
        let horizon = reference
            .final_step()
            .ok_or_else(|| EvasionError::InvalidConfig("reference trajectory is empty".to_string()))?;
        Self::new(params, dt, horizon)
    }

    pub fn steps_for(&self, seconds: f64) -> usize {
        (seconds / self.dt).round().max(0.0) as usize
    }
}

/// Share of the sample budget given to each Monte-Carlo maneuver family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloWeights {
    pub stop: f64,
    pub turn: f64,
    pub lane_change: f64,
    pub overtake: f64,
    pub random: f64,
}

impl Default for MonteCarloWeights {
    fn default() -> Self {
        Self {
            stop: 0.2,
            turn: 0.2,
            lane_change: 0.2,
            overtake: 0.2,
            random: 0.2,
        }
    }
}

impl MonteCarloWeights {
    pub fn entries(&self) -> [(ManeuverSpec, f64); 5] {
        [
            (ManeuverSpec::StopMc, self.stop),
            (ManeuverSpec::TurnMc, self.turn),
            (ManeuverSpec::LaneChangeMc, self.lane_change),
            (ManeuverSpec::OvertakeMc, self.overtake),
            (ManeuverSpec::RandomMc, self.random),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        let entries = self.entries();
        if entries.iter().any(|(_, w)| *w < 0.0 || !w.is_finite()) {
            return Err(EvasionError::InvalidConfig("maneuver weights must be non-negative".to_string()));
        }
        let sum: f64 = entries.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(EvasionError::InvalidConfig(format!("maneuver weights sum to {sum}, expected 1")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub weights: MonteCarloWeights,
    pub n_samples: usize,
    pub seed: u64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            weights: MonteCarloWeights::default(),
            n_samples: 500,
            seed: 42,
        }
    }
}

impl MonteCarloConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.weights.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Resolution of the drivable-area reachability used for the worst-case search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReachConfig {
    pub cell_size: f64,
    pub max_cells: usize,
}

impl ReachConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.cell_size > 0.0) || self.max_cells == 0 {
            return Err(EvasionError::InvalidConfig(format!(
                "reach grid needs a positive cell size and cell budget, got {} and {}",
                self.cell_size, self.max_cells
            )));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

impl Default for ReachConfig {
    fn default() -> Self {
        Self {
            cell_size: 1.0,
            max_cells: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters_validate() {
        assert!(VehicleParameters::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let params = VehicleParameters::from_json_str(r#"{ "a_long_max": 6.0, "v_max": 30.0 }"#).unwrap();
        assert_eq!(params.a_long_max, 6.0);
        assert_eq!(params.v_max, 30.0);
        assert_eq!(params.a_lat_max, 4.0);
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let err = VehicleParameters::from_json_str(r#"{ "a_lat_min": 1.0 }"#).unwrap_err();
        assert!(matches!(err, EvasionError::InvalidConfig(_)));
    }

    #[test]
    fn test_non_positive_dt_rejected() {
        assert!(SimulationContext::new(VehicleParameters::default(), 0.0, 10).is_err());
        assert!(SimulationContext::new(VehicleParameters::default(), 0.1, 10).is_ok());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let weights = MonteCarloWeights {
            stop: 0.5,
            ..MonteCarloWeights::default()
        };
        assert!(weights.validate().is_err());
        assert!(MonteCarloWeights::default().validate().is_ok());
    }

    #[test]
    fn test_monte_carlo_config_json() {
        let config = MonteCarloConfig::from_json_str(
            r#"{ "n_samples": 100, "seed": 7,
                 "weights": { "stop": 1.0, "turn": 0.0, "lane_change": 0.0, "overtake": 0.0, "random": 0.0 } }"#,
        )
        .unwrap();
        assert_eq!(config.n_samples, 100);
        assert_eq!(config.weights.stop, 1.0);
    }

    #[test]
    fn test_reach_config_json() {
        let config = ReachConfig::from_json_str(r#"{ "cell_size": 0.5 }"#).unwrap();
        assert_eq!(config.cell_size, 0.5);
        assert_eq!(config.max_cells, 256);
        assert!(ReachConfig::from_json_str(r#"{ "max_cells": 0 }"#).is_err());
    }
}
