pub mod dispatcher;
pub mod genetic;
