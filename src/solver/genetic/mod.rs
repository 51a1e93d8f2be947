pub mod engine;
pub mod operators;
