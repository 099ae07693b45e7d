// External model providers
// Embedding and chat completion clients for OpenAI-compatible APIs

pub mod openai;

pub use openai::{ChatMessage, OpenAiClient};
