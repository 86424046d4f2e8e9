//! LLM agents that implement the analysis tasks.

pub mod agents;
pub mod client;

pub use agents::default_agents;
pub use client::{ClientConfig, OllamaClient};
