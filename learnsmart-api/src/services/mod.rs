//! Business services layered over the persistence queries

pub mod openai_client;
pub mod progress;
pub mod recommender;
pub mod rewards;
pub mod roadmap;

pub use openai_client::{ChatMessage, ChatModel, ChatRequest, LlmError, OpenAiClient};
