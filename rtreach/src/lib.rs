pub mod geometry;
pub mod system_model;
pub mod face_lift;
pub mod point_mass;
pub mod drivable;
pub mod util;
