// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DocVerifyError, Result};

/// Settings for every pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preprocess: PreprocessConfig,
    pub recognition: RecognitionConfig,
    pub classification: ClassificationConfig,
    pub llm: LlmConfig,
}

/// Image normalization toggles and parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub deskew: bool,
    pub denoise: bool,
    pub enhance: bool,
    /// Non-local-means filter strength.
    pub denoise_strength: f32,
    pub clahe_clip_limit: f32,
    /// Tiles per axis.
    pub clahe_tile_grid: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            deskew: true,
            denoise: true,
            enhance: true,
            denoise_strength: 10.0,
            clahe_clip_limit: 2.0,
            clahe_tile_grid: 8,
        }
    }
}

/// OCR ensemble settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Primary results at or above this confidence skip the fallback engine.
    pub confidence_threshold: f64,
    pub use_fallback: bool,
    /// Directory holding the detection/recognition models. `None` uses the
    /// engine's default cache directory.
    pub model_dir: Option<PathBuf>,
    /// Tesseract language string, e.g. `eng+hin`.
    pub languages: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            use_fallback: true,
            model_dir: None,
            languages: "eng".to_string(),
        }
    }
}

/// Document classification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Rule confidence must exceed this for the language model to be skipped.
    pub rule_confidence_threshold: f64,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            rule_confidence_threshold: 0.6,
        }
    }
}

/// Which language-model backend (if any) serves classification and
/// extraction fallbacks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[default]
    Disabled,
    Ollama,
    Gemini,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub gemini_model: String,
    /// Required when `provider` is `gemini`. Never serialized back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Disabled,
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.1:8b".to_string(),
            gemini_model: "gemini-2.0-flash-exp".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        info!(path = %path.display(), "pipeline config loaded");
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables on top of the loaded values.
    pub fn apply_env(mut self) -> Self {
        self.apply_vars(|key| std::env::var(key).ok());
        self
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = lookup("DOCVERIFY_LLM_PROVIDER") {
            self.llm.provider = match provider.to_ascii_lowercase().as_str() {
                "ollama" => LlmProvider::Ollama,
                "gemini" => LlmProvider::Gemini,
                _ => LlmProvider::Disabled,
            };
        }
        if let Some(key) = lookup("GOOGLE_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            self.llm.gemini_model = model;
        }
        if let Some(url) = lookup("OLLAMA_BASE_URL") {
            self.llm.ollama_base_url = url;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.llm.ollama_model = model;
        }
        if let Some(dir) = lookup("DOCVERIFY_OCR_MODEL_DIR") {
            self.recognition.model_dir = Some(PathBuf::from(dir));
        }
        debug!(provider = ?self.llm.provider, "environment overlay applied");
    }

    /// Reject values no stage can work with.
    pub fn validate(&self) -> Result<()> {
        let threshold = self.recognition.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(DocVerifyError::Config(format!(
                "recognition.confidence_threshold must be within [0, 1], got {threshold}"
            )));
        }
        if self.preprocess.clahe_tile_grid == 0 {
            return Err(DocVerifyError::Config(
                "preprocess.clahe_tile_grid must be at least 1".into(),
            ));
        }
        if self.preprocess.clahe_clip_limit <= 0.0 {
            return Err(DocVerifyError::Config(
                "preprocess.clahe_clip_limit must be positive".into(),
            ));
        }
        if self.llm.provider == LlmProvider::Gemini && self.llm.api_key.is_none() {
            return Err(DocVerifyError::Config(
                "llm.provider is gemini but no API key is set (GOOGLE_API_KEY)".into(),
            ));
        }
        Ok(())
    }
}
