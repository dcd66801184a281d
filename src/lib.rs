pub mod config;
pub mod discovery;
pub mod domain;
pub mod error;
pub mod http;
pub mod llm;
pub mod orchestrator;
pub mod profiler;
pub mod store;
pub mod telemetry;

pub use error::CoreError;
