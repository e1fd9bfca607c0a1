// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Field extraction: regex first, language model for missing critical fields.
//
// Model output is untrusted. Only keys that were asked for, with string or
// number values, are merged into the result.

pub mod patterns;

use std::sync::Arc;
use std::time::Duration;

use docverify_core::types::{DocumentType, FieldMap};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::llm::{self, LanguageModel};
use patterns::{critical_fields, patterns_for};

const PROMPT_CHARS: usize = 3000;
const SYSTEM_PROMPT: &str = "You are a data extraction assistant. Output valid JSON only.";

pub struct Extractor {
    llm: Option<Arc<dyn LanguageModel>>,
    llm_timeout: Duration,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    /// Patterns only.
    pub fn new() -> Self {
        Self {
            llm: None,
            llm_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_language_model(mut self, model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        self.llm = Some(model);
        self.llm_timeout = timeout;
        self
    }

    pub async fn extract(&self, text: &str, document_type: DocumentType) -> FieldMap {
        self.extract_within(text, document_type, self.llm_timeout).await
    }

    /// Extract fields, giving the language model at most `budget`.
    #[instrument(skip(self, text), fields(document_type = %document_type, text_chars = text.len()))]
    pub async fn extract_within(
        &self,
        text: &str,
        document_type: DocumentType,
        budget: Duration,
    ) -> FieldMap {
        let mut fields = extract_by_patterns(text, document_type);
        let missing = missing_critical(&fields, document_type);
        if missing.is_empty() {
            debug!(found = fields.len(), "All critical fields found by patterns");
            return fields;
        }

        let Some(model) = &self.llm else {
            debug!(?missing, "Critical fields missing and no language model configured");
            return fields;
        };
        let timeout = self.llm_timeout.min(budget);
        if timeout.is_zero() {
            warn!(?missing, "No time left for language-model extraction");
            return fields;
        }

        info!(?missing, "Critical fields missing, attempting language-model extraction");
        let recovered = extract_by_llm(model.as_ref(), text, document_type, &missing, timeout).await;
        info!(recovered = recovered.len(), "Language-model extraction finished");
        fields.extend(recovered);
        fields
    }
}

/// Run every pattern for `document_type` and keep the first match of each.
pub fn extract_by_patterns(text: &str, document_type: DocumentType) -> FieldMap {
    let mut fields = FieldMap::new();
    for pattern in patterns_for(document_type) {
        let Some(captures) = pattern.regex.captures(text) else {
            continue;
        };
        let matched = captures.get(1).or_else(|| captures.get(0));
        if let Some(value) = matched.map(|m| m.as_str().trim()) {
            if !value.is_empty() {
                fields.insert(pattern.field.to_string(), value.to_string());
            }
        }
    }
    fields
}

/// Critical fields for `document_type` that `fields` does not contain.
pub fn missing_critical(fields: &FieldMap, document_type: DocumentType) -> Vec<&'static str> {
    critical_fields(document_type)
        .iter()
        .copied()
        .filter(|field| !fields.contains_key(*field))
        .collect()
}

async fn extract_by_llm(
    model: &dyn LanguageModel,
    text: &str,
    document_type: DocumentType,
    missing: &[&str],
    timeout: Duration,
) -> FieldMap {
    let prompt = format!(
        "Extract the following missing fields from the {} text below.\n\
         Missing Fields: {}\n\n\
         Return the result as a plain JSON object with keys exactly matching the missing fields.\n\
         Do NOT include markdown formatting.\n\n\
         Text:\n{}",
        document_type.label(),
        missing.join(", "),
        llm::truncate_chars(text, PROMPT_CHARS)
    );

    match llm::complete_within(model, &prompt, SYSTEM_PROMPT, timeout).await {
        Ok(reply) => parse_fields(&reply, missing),
        Err(err) => {
            warn!(model = %model.name(), error = %err, "Language-model extraction failed");
            FieldMap::new()
        }
    }
}

/// Parse a model reply, keeping only requested keys with scalar values.
pub fn parse_fields(reply: &str, requested: &[&str]) -> FieldMap {
    let cleaned = llm::strip_code_fences(reply);
    let object = match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            warn!(kind = json_kind(&other), "Language-model reply is not a JSON object");
            return FieldMap::new();
        }
        Err(err) => {
            warn!(error = %err, "Language-model reply is not valid JSON");
            return FieldMap::new();
        }
    };

    let mut fields = FieldMap::new();
    for (key, value) in object {
        if !requested.contains(&key.as_str()) {
            debug!(key = %key, "Ignoring unrequested field from language model");
            continue;
        }
        let value = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        if !value.is_empty() {
            fields.insert(key, value);
        }
    }
    fields
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
