pub mod individual;
pub mod types;
