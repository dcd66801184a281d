use std::sync::Arc;

use crate::llm::provider::LlmProvider;
use crate::orchestrator::Orchestrator;
use crate::profiler::{LlmProfilerRouter, MapsProvider, ProfilerTables, RingEngine};
use crate::store::{Cache, ScreenInventoryStore, SessionStore};

/// Process-wide collaborators, constructed once in `main` and cloned (cheap: every
/// field is an `Arc`) into each request (spec's "Global singletons" design note).
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub ring_engine: Arc<RingEngine>,
    pub profiler_router: Arc<LlmProfilerRouter>,
    pub profiler_mode: crate::profiler::ProfilerMode,
    pub inventory: Arc<dyn ScreenInventoryStore>,
    pub llm: Arc<dyn LlmProvider>,
    pub llm_model: String,
    pub maps: Arc<dyn MapsProvider>,
    pub cache: Arc<dyn Cache>,
    pub sessions: Arc<dyn SessionStore>,
    pub tables: Arc<ProfilerTables>,
}
