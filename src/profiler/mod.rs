pub mod authority_detector;
pub mod classification;
pub mod llm_router;
pub mod maps_client;
pub mod place_normalizer;
pub mod ring_engine;
pub mod tables;

pub use llm_router::{LlmProfilerRouter, ProfilerMode};
pub use maps_client::{GoogleMapsClient, MapsProvider, NullMapsProvider};
pub use ring_engine::RingEngine;
pub use tables::ProfilerTables;
