// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ollama `/api/generate` client.

use std::time::Duration;

use async_trait::async_trait;
use docverify_core::error::{DocVerifyError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::LanguageModel;

/// HTTP client for a (usually local) Ollama server.
pub struct OllamaClient {
    base_url: String,
    model: String,
    name: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// `timeout` becomes the transport-level ceiling for every request.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DocVerifyError::Config(format!("failed to build HTTP client: {}", err)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            name: format!("ollama:{model}"),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl LanguageModel for OllamaClient {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, prompt, system), fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn complete(&self, prompt: &str, system: &str, timeout: Duration) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_connect() {
                    DocVerifyError::Fallback(format!("cannot reach Ollama at {}", self.base_url))
                } else if err.is_timeout() {
                    DocVerifyError::Fallback(format!(
                        "Ollama request timed out after {}s",
                        timeout.as_secs()
                    ))
                } else {
                    DocVerifyError::Fallback(format!("Ollama request failed: {}", err))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocVerifyError::Fallback(format!(
                "Ollama returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|err| {
            DocVerifyError::Fallback(format!("unexpected Ollama response: {}", err))
        })?;
        debug!(reply_chars = parsed.response.len(), "Ollama completion received");
        Ok(parsed.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client =
            OllamaClient::new("http://localhost:11434/", "llama3.1:8b", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.name(), "ollama:llama3.1:8b");
    }

    #[test]
    fn request_body_disables_streaming() {
        let body = GenerateRequest {
            model: "m",
            prompt: "p",
            system: "s",
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["system"], "s");
        assert_eq!(json["options"]["temperature"], 0.0);
    }

    #[tokio::test]
    async fn unreachable_server_is_a_fallback_error() {
        // Port 9 (discard) is closed on any sane test host.
        let client =
            OllamaClient::new("http://127.0.0.1:9", "m", Duration::from_secs(2)).unwrap();
        let err = client
            .complete("p", "s", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, DocVerifyError::Fallback(_)));
    }
}
