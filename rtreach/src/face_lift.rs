use super::geometry::{HyperRectangle, Interval};
use super::system_model::SystemModel;

// Constants necessary to guarantee loop termination.
// These bound the values of the derivatives
pub const MAX_DER_B: f64 = 99999.0;
pub const MIN_DER_B: f64 = -99999.0;

fn clamp_derivative(der: f64) -> f64 {
    der.clamp(MIN_DER_B, MAX_DER_B)
}

// derivative bounds on every face of the rectangle
fn face_derivatives<const NUM_DIMS: usize, T: SystemModel<NUM_DIMS>>(
    system_model: &T,
    rect: &HyperRectangle<NUM_DIMS>,
    ctrl_input: &[Interval],
) -> Vec<f64> {
    (0..system_model.num_faces())
        .map(|f| clamp_derivative(system_model.get_derivative_bounds(rect, f, ctrl_input)))
        .collect()
}

// move every face outward (or inward) by its derivative times the step
fn advance_faces<const NUM_DIMS: usize>(
    rect: &HyperRectangle<NUM_DIMS>,
    ders: &[f64],
    step_size: f64,
) -> HyperRectangle<NUM_DIMS> {
    let mut out = *rect;
    for d in 0..NUM_DIMS {
        out.dims[d].min += ders[2 * d] * step_size;
        out.dims[d].max += ders[2 * d + 1] * step_size;
        if out.dims[d].min > out.dims[d].max {
            let mid = out.dims[d].midpoint();
            out.dims[d] = Interval::point(mid);
        }
    }
    out
}

/// Lifts every face of `rect` by one step using a two-stage (Heun) estimate of
/// the face derivatives. For models whose derivatives are affine in the state,
/// such as the double integrator, the result is exact on each face.
pub fn lift_rect<const NUM_DIMS: usize, T: SystemModel<NUM_DIMS>>(
    system_model: &T,
    rect: &HyperRectangle<NUM_DIMS>,
    ctrl_input: &[Interval],
    step_size: f64,
) -> HyperRectangle<NUM_DIMS> {
    let k1 = face_derivatives(system_model, rect, ctrl_input);
    let rect_k2 = advance_faces(rect, &k1, step_size);
    let k2 = face_derivatives(system_model, &rect_k2, ctrl_input);

    let averaged: Vec<f64> = k1.iter().zip(&k2).map(|(a, b)| 0.5 * (a + b)).collect();
    let mut lifted = advance_faces(rect, &averaged, step_size);

    if let Some(bounds) = system_model.state_bounds() {
        for d in 0..NUM_DIMS {
            // a box entirely outside the limits collapses onto the nearest limit
            lifted.dims[d] = match lifted.dims[d].clamp_to(&bounds.dims[d]) {
                Some(clipped) => clipped,
                None if lifted.dims[d].min > bounds.dims[d].max => Interval::point(bounds.dims[d].max),
                None => Interval::point(bounds.dims[d].min),
            };
        }
    }

    lifted
}
