use super::geometry::{HyperRectangle, Interval};
use super::system_model::SystemModel;

pub const POINT_MASS_NUM_DIMS: usize = 4;

// A planar double integrator, the reach-set counterpart of a point-mass vehicle.
// state vector x, vx, y, vy
// x' = vx
// vx' = ax
// y' = vy
// vy' = ay
// Inputs are the acceleration ranges [ax] and [ay].
#[derive(Debug, Clone, Copy)]
pub struct PointMassModel {
    pub v_max: f64,
}

impl PointMassModel {
    pub fn new(v_max: f64) -> Self {
        PointMassModel { v_max }
    }
}

impl SystemModel<POINT_MASS_NUM_DIMS> for PointMassModel {
    fn get_derivative_bounds(
        &self,
        rect: &HyperRectangle<POINT_MASS_NUM_DIMS>,
        face_index: usize,
        ctrl_inputs: &[Interval],
    ) -> f64 {
        let dim: usize = face_index / 2;
        let is_min: bool = (face_index % 2) == 0;

        let rv: Interval = match dim {
            0 => rect.dims[1],
            1 => ctrl_inputs[0],
            2 => rect.dims[3],
            _ => ctrl_inputs[1],
        };

        if is_min {
            rv.min
        } else {
            rv.max
        }
    }

    fn state_bounds(&self) -> Option<HyperRectangle<POINT_MASS_NUM_DIMS>> {
        let v = Interval::new(-self.v_max, self.v_max);
        let free = Interval::new(f64::NEG_INFINITY, f64::INFINITY);
        Some(HyperRectangle {
            dims: [free, v, free, v],
        })
    }
}
