pub mod cumulative;
pub mod engine;

pub use engine::{realized_return, ReturnsEngine, RunSummary};
