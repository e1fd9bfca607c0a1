// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Google Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use docverify_core::error::{DocVerifyError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::LanguageModel;

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiClient {
    endpoint: String,
    model: String,
    api_key: String,
    name: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DocVerifyError::Config(format!("failed to build HTTP client: {}", err)))?;

        Ok(Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            name: format!("gemini:{model}"),
            client,
        })
    }

    /// Point at a different API host (proxies, test servers).
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

fn request_body<'a>(prompt: &'a str, system: &'a str) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        system_instruction: Content {
            parts: [Part { text: system }],
        },
        contents: [Content {
            parts: [Part { text: prompt }],
        }],
        generation_config: GenerationConfig { temperature: 0.0 },
    }
}

/// First candidate's text parts, concatenated.
fn first_candidate_text(response: GenerateContentResponse) -> Option<String> {
    let candidate = response.candidates.into_iter().next()?;
    let text: String = candidate
        .content
        .parts
        .into_iter()
        .map(|part| part.text)
        .collect();
    Some(text)
}

#[async_trait]
impl LanguageModel for GeminiClient {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, prompt, system), fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn complete(&self, prompt: &str, system: &str, timeout: Duration) -> Result<String> {
        let response = self
            .client
            .post(self.url())
            .timeout(timeout)
            .json(&request_body(prompt, system))
            .send()
            .await
            .map_err(|err| {
                // reqwest errors embed the URL, which carries the key.
                let err = err.without_url();
                if err.is_timeout() {
                    DocVerifyError::Fallback(format!(
                        "Gemini request timed out after {}s",
                        timeout.as_secs()
                    ))
                } else {
                    DocVerifyError::Fallback(format!("Gemini request failed: {}", err))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocVerifyError::Fallback(format!(
                "Gemini returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            DocVerifyError::Fallback(format!("unexpected Gemini response: {}", err.without_url()))
        })?;
        let text = first_candidate_text(parsed)
            .ok_or_else(|| DocVerifyError::Fallback("Gemini returned no candidates".into()))?;
        debug!(reply_chars = text.len(), "Gemini completion received");
        Ok(text)
    }
}
