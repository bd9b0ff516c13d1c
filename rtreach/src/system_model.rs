use super::geometry::{HyperRectangle, Interval};

// A model whose derivative can be bounded over a box of states.
// Faces are numbered 2*dim (lower face) and 2*dim+1 (upper face).
pub trait SystemModel<const NUM_DIMS: usize> {
    fn get_derivative_bounds(
        &self,
        rect: &HyperRectangle<NUM_DIMS>,
        face_index: usize,
        ctrl_inputs: &[Interval],
    ) -> f64;

    // hard limits on the state, reach sets are clipped against these
    fn state_bounds(&self) -> Option<HyperRectangle<NUM_DIMS>> {
        None
    }

    fn num_dims(&self) -> usize {
        NUM_DIMS
    }

    fn num_faces(&self) -> usize {
        2 * NUM_DIMS
    }
}
