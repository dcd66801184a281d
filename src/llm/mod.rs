pub mod call1_understanding;
pub mod call2_ranking;
pub mod call3_response;
pub mod creative;
pub mod gateway_collection;
pub mod live_help;
pub mod provider;

pub use provider::{HttpLlmProvider, JsonCompletionRequest, LlmMessage, LlmProvider, NullLlmProvider};
