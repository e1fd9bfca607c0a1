// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Language-model clients used as a fallback by the classifier and extractor.
//
// Two HTTP backends are provided: a local Ollama server and the Gemini API.
// Both are plain `reqwest` clients with a transport timeout; callers also
// wrap each request in `tokio::time::timeout` via [`complete_within`], so a
// stalled connection can never hold a pipeline request past its budget.

pub mod gemini;
pub mod mock;
pub mod ollama;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docverify_core::config::{LlmConfig, LlmProvider};
use docverify_core::error::{DocVerifyError, Result};
use tracing::{debug, info};

pub use gemini::GeminiClient;
pub use mock::MockLanguageModel;
pub use ollama::OllamaClient;

/// A text-completion backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Short identifier for logs (e.g. `ollama:llama3.1:8b`).
    fn name(&self) -> &str;

    /// Complete `prompt` under the `system` instruction.
    ///
    /// `timeout` bounds this single request.
    async fn complete(&self, prompt: &str, system: &str, timeout: Duration) -> Result<String>;
}

/// Run one completion, failing with [`DocVerifyError::Fallback`] once
/// `timeout` elapses regardless of what the transport is doing.
pub async fn complete_within(
    model: &dyn LanguageModel,
    prompt: &str,
    system: &str,
    timeout: Duration,
) -> Result<String> {
    match tokio::time::timeout(timeout, model.complete(prompt, system, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(DocVerifyError::Fallback(format!(
            "{} timed out after {}ms",
            model.name(),
            timeout.as_millis()
        ))),
    }
}

/// Build the configured backend, or `None` when the fallback is disabled.
pub fn from_config(config: &LlmConfig) -> Result<Option<Arc<dyn LanguageModel>>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let model: Arc<dyn LanguageModel> = match config.provider {
        LlmProvider::Disabled => {
            debug!("Language-model fallback disabled");
            return Ok(None);
        }
        LlmProvider::Ollama => Arc::new(OllamaClient::new(
            &config.ollama_base_url,
            &config.ollama_model,
            timeout,
        )?),
        LlmProvider::Gemini => {
            let api_key = config.api_key.as_deref().ok_or_else(|| {
                DocVerifyError::Config("gemini provider selected without an API key".into())
            })?;
            Arc::new(GeminiClient::new(api_key, &config.gemini_model, timeout)?)
        }
    };
    info!(model = %model.name(), "Language-model fallback enabled");
    Ok(Some(model))
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Remove markdown code-fence markers (```` ```json ```` and ```` ``` ````)
/// that models add despite being told not to.
pub fn strip_code_fences(reply: &str) -> String {
    reply.replace("```json", "").replace("```", "").trim().to_string()
}
