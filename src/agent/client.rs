//! Minimal Ollama chat client shared by the analysis agents.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Configuration for the Ollama client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.1,
            timeout_seconds: 300,
        }
    }
}

/// Message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Shared HTTP client for `/api/chat`.
pub struct OllamaClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Send a system + user prompt and return the assistant's reply.
    pub async fn chat(&self, system: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.config.ollama_url);
        let messages = [ChatMessage::system(system), ChatMessage::user(prompt)];

        let request = OllamaChatRequest {
            model: &self.config.model_name,
            messages: &messages,
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        debug!("Sending chat request to {} ({} chars)", url, prompt.len());

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("Request timed out after {}s", self.config.timeout_seconds)
                } else if e.is_connect() {
                    anyhow::anyhow!(
                        "Cannot connect to Ollama at {}. Is Ollama running?",
                        self.config.ollama_url
                    )
                } else {
                    anyhow::anyhow!("Failed to send request: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Ollama API error {}: {}", status, body));
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(chat_response.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.model_name, "llama3.2:latest");
        assert_eq!(config.ollama_url, "http://localhost:11434");
    }

    #[test]
    fn test_request_serialization() {
        let messages = [ChatMessage::system("sys"), ChatMessage::user("hi")];
        let request = OllamaChatRequest {
            model: "m",
            messages: &messages,
            stream: false,
            options: OllamaOptions { temperature: 0.5 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["stream"], false);
    }

    #[tokio::test]
    async fn test_connection_refused_is_reported() {
        let client = OllamaClient::new(ClientConfig {
            ollama_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 2,
            ..ClientConfig::default()
        })
        .unwrap();

        let err = client.chat("sys", "hi").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Cannot connect") || msg.contains("Failed to send") || msg.contains("timed out"));
    }
}
