pub mod rate_limit;
pub mod turn;

pub use turn::{Orchestrator, RankedScreenView, TurnRequest, TurnResult};
