pub mod fitness;
pub mod geometry;
