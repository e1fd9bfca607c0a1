// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hybrid document classifier.
//
// Keyword/regex templates decide most documents without any network traffic.
// Only when the best rule score is at or below the threshold, and a language
// model is configured, is the model asked to choose from the closed set of
// labels. Anything it says outside that set is treated as a failure.

pub mod templates;

use std::sync::Arc;
use std::time::Duration;

use docverify_core::types::{ClassificationMethod, ClassificationResult, DocumentType};
use tracing::{debug, info, instrument, warn};

use crate::llm::{self, LanguageModel};
use templates::{DocumentTemplate, TEMPLATES};

/// Default rule confidence the language model must beat to be skipped.
pub const DEFAULT_RULE_THRESHOLD: f64 = 0.6;
/// Confidence assigned to a label chosen by the language model.
pub const LLM_CONFIDENCE: f64 = 0.9;

const KEYWORD_WEIGHT: f64 = 0.2;
const PATTERN_WEIGHT: f64 = 0.5;
const PROMPT_CHARS: usize = 2000;
const SYSTEM_PROMPT: &str = "You are a document classifier bot.";

pub struct Classifier {
    llm: Option<Arc<dyn LanguageModel>>,
    llm_timeout: Duration,
    threshold: f64,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    /// Rules only.
    pub fn new() -> Self {
        Self {
            llm: None,
            llm_timeout: Duration::from_secs(30),
            threshold: DEFAULT_RULE_THRESHOLD,
        }
    }

    /// Consult `model` when the rules are not confident enough.
    pub fn with_language_model(mut self, model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        self.llm = Some(model);
        self.llm_timeout = timeout;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn has_language_model(&self) -> bool {
        self.llm.is_some()
    }

    /// Classify `text`, using the configured language-model timeout.
    pub async fn classify(&self, text: &str) -> ClassificationResult {
        self.classify_within(text, self.llm_timeout).await
    }

    /// Classify `text`, giving the language model at most `budget`.
    ///
    /// A zero budget skips the model and returns the rule result.
    #[instrument(skip(self, text), fields(text_chars = text.len()))]
    pub async fn classify_within(&self, text: &str, budget: Duration) -> ClassificationResult {
        let rules = self.classify_by_rules(text);
        if rules.confidence > self.threshold {
            info!(
                document_type = %rules.document_type,
                confidence = rules.confidence,
                "Rule-based classification successful"
            );
            return rules;
        }

        let Some(model) = &self.llm else {
            debug!(confidence = rules.confidence, "Rule confidence low and no language model configured");
            return rules;
        };

        let timeout = self.llm_timeout.min(budget);
        if timeout.is_zero() {
            warn!("No time left for language-model classification; keeping rule result");
            return rules;
        }

        info!(confidence = rules.confidence, "Rule-based confidence low, asking language model");
        self.classify_by_llm(model.as_ref(), text, timeout).await
    }

    /// Score every template and keep the strictly best one.
    pub fn classify_by_rules(&self, text: &str) -> ClassificationResult {
        let lower = text.to_lowercase();
        let mut best: Option<(DocumentType, f64)> = None;

        for template in TEMPLATES.iter() {
            let score = score_template(template, text, &lower);
            debug!(document_type = %template.document_type, score, "Template scored");
            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((template.document_type, score));
            }
        }

        match best {
            Some((document_type, score)) => ClassificationResult {
                document_type,
                confidence: score.min(1.0),
                method: ClassificationMethod::RuleBased,
            },
            None => ClassificationResult::unknown(ClassificationMethod::RuleBased),
        }
    }

    async fn classify_by_llm(
        &self,
        model: &dyn LanguageModel,
        text: &str,
        timeout: Duration,
    ) -> ClassificationResult {
        let prompt = classification_prompt(text);
        match llm::complete_within(model, &prompt, SYSTEM_PROMPT, timeout).await {
            Ok(reply) => {
                let result = parse_label(&reply);
                info!(
                    model = %model.name(),
                    document_type = %result.document_type,
                    method = ?result.method,
                    "Language-model classification finished"
                );
                result
            }
            Err(err) => {
                warn!(model = %model.name(), error = %err, "Language-model classification failed");
                ClassificationResult::unknown(ClassificationMethod::LlmFailed)
            }
        }
    }
}

fn score_template(template: &DocumentTemplate, text: &str, lower: &str) -> f64 {
    let mut score = 0.0;

    let hits = template.keywords.iter().filter(|k| lower.contains(*k)).count();
    if hits >= template.min_keywords {
        score += hits as f64 * KEYWORD_WEIGHT;
    }

    for pattern in &template.patterns {
        if pattern.is_match(text) {
            score += PATTERN_WEIGHT;
        }
    }
    score
}

fn classification_prompt(text: &str) -> String {
    let names: Vec<&str> = DocumentType::KNOWN.iter().map(|t| t.display_name()).collect();
    let labels: Vec<String> = DocumentType::KNOWN
        .iter()
        .map(|t| format!("'{}'", t.label()))
        .collect();
    format!(
        "Identify the type of Indian official document from the extracted text below.\n\
         Possible types: {}.\n\
         If unsure, return 'unknown'.\n\n\
         Return ONLY the internal code: {}, or 'unknown'.\n\n\
         Text:\n{}",
        names.join(", "),
        labels.join(", "),
        llm::truncate_chars(text, PROMPT_CHARS)
    )
}

/// Map a free-text reply onto the closed label set.
fn parse_label(reply: &str) -> ClassificationResult {
    let reply = reply.trim().to_lowercase();

    // Exact label first, then a label embedded in a chattier reply.
    let document_type = DocumentType::from_label(&reply)
        .or_else(|| DocumentType::KNOWN.into_iter().find(|t| reply.contains(t.label())))
        .or_else(|| {
            reply
                .contains(DocumentType::Unknown.label())
                .then_some(DocumentType::Unknown)
        });

    match document_type {
        Some(DocumentType::Unknown) => ClassificationResult::unknown(ClassificationMethod::LlmFallback),
        Some(document_type) => ClassificationResult {
            document_type,
            confidence: LLM_CONFIDENCE,
            method: ClassificationMethod::LlmFallback,
        },
        None => ClassificationResult::unknown(ClassificationMethod::LlmFailed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLanguageModel;

    const PAN_TEXT: &str = "INCOME TAX DEPARTMENT\nPermanent Account Number\nABCDE1234F";

    fn with_model(model: MockLanguageModel) -> (Classifier, Arc<MockLanguageModel>) {
        let model = Arc::new(model);
        let classifier = Classifier::new()
            .with_language_model(Arc::clone(&model) as Arc<dyn LanguageModel>, Duration::from_secs(5));
        (classifier, model)
    }

    #[tokio::test]
    async fn pan_keywords_and_number_score_point_nine_without_llm() {
        let (classifier, model) = with_model(MockLanguageModel::new("voter_id"));
        let result = classifier.classify(PAN_TEXT).await;

        assert_eq!(result.document_type, DocumentType::Pan);
        assert!((result.confidence - 0.9).abs() < 1e-9);
        assert_eq!(result.method, ClassificationMethod::RuleBased);
        assert_eq!(model.call_count(), 0);
    }

    #[test]
    fn empty_text_is_unknown() {
        let result = Classifier::new().classify_by_rules("");
        assert_eq!(result, ClassificationResult::unknown(ClassificationMethod::RuleBased));
    }

    #[test]
    fn single_keyword_contributes_nothing() {
        let result = Classifier::new().classify_by_rules("permanent account number");
        assert_eq!(result.document_type, DocumentType::Unknown);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn confidence_is_capped_at_one() {
        let text = "GOVERNMENT OF INDIA Mera Aadhaar Unique Identification DOB Male \
                    Father 1234 5678 9012";
        let result = Classifier::new().classify_by_rules(text);
        assert_eq!(result.document_type, DocumentType::Aadhaar);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn extra_keyword_never_lowers_score() {
        let classifier = Classifier::new();
        let keywords = ["election commission of india", "identity card", "elector's name", "sex"];
        let mut previous = 0.0;
        for n in 1..=keywords.len() {
            let text = format!("{} ABC1234567", keywords[..n].join(" "));
            let result = classifier.classify_by_rules(&text);
            assert_eq!(result.document_type, DocumentType::VoterId);
            assert!(result.confidence >= previous, "{n} keywords scored {}", result.confidence);
            previous = result.confidence;
        }
    }

    #[test]
    fn ties_keep_the_earlier_template() {
        // Aadhaar and PAN both score 0.4 from keywords alone.
        let text = "government of india yob income tax department signature";
        let result = Classifier::new().classify_by_rules(text);
        assert_eq!(result.document_type, DocumentType::Aadhaar);
    }

    #[tokio::test]
    async fn low_confidence_without_model_returns_rule_result() {
        let result = Classifier::new().classify("Driving Licence Union of India").await;
        assert_eq!(result.document_type, DocumentType::DrivingLicense);
        assert!((result.confidence - 0.4).abs() < 1e-9);
        assert_eq!(result.method, ClassificationMethod::RuleBased);
    }

    #[tokio::test]
    async fn model_label_is_accepted() {
        let (classifier, model) = with_model(MockLanguageModel::new("  Driving_License\n"));
        let result = classifier.classify("some blurry licence").await;

        assert_eq!(result.document_type, DocumentType::DrivingLicense);
        assert_eq!(result.confidence, LLM_CONFIDENCE);
        assert_eq!(result.method, ClassificationMethod::LlmFallback);
        assert_eq!(model.call_count(), 1);
        assert!(model.last_prompt().unwrap().contains("'voter_id'"));
    }

    #[tokio::test]
    async fn model_unknown_is_a_successful_fallback() {
        let (classifier, _) = with_model(MockLanguageModel::new("unknown"));
        let result = classifier.classify("???").await;
        assert_eq!(result, ClassificationResult::unknown(ClassificationMethod::LlmFallback));
    }

    #[tokio::test]
    async fn off_list_reply_is_a_failure() {
        let (classifier, _) = with_model(MockLanguageModel::new("ration card"));
        let result = classifier.classify("???").await;
        assert_eq!(result, ClassificationResult::unknown(ClassificationMethod::LlmFailed));
    }

    #[tokio::test]
    async fn transport_error_is_a_failure() {
        let (classifier, _) = with_model(MockLanguageModel::failing("connection refused"));
        let result = classifier.classify("???").await;
        assert_eq!(result, ClassificationResult::unknown(ClassificationMethod::LlmFailed));
    }

    #[tokio::test]
    async fn timeout_is_a_failure() {
        let model = Arc::new(MockLanguageModel::new("pan_card").with_delay(Duration::from_millis(500)));
        let classifier = Classifier::new()
            .with_language_model(Arc::clone(&model) as Arc<dyn LanguageModel>, Duration::from_millis(20));
        let result = classifier.classify("???").await;
        assert_eq!(result.method, ClassificationMethod::LlmFailed);
    }

    #[tokio::test]
    async fn zero_budget_skips_the_model() {
        let (classifier, model) = with_model(MockLanguageModel::new("pan_card"));
        let result = classifier.classify_within("???", Duration::ZERO).await;
        assert_eq!(result.method, ClassificationMethod::RuleBased);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn prompt_is_truncated() {
        let (classifier, model) = with_model(MockLanguageModel::new("unknown"));
        let text = "z".repeat(5000);
        classifier.classify(&text).await;
        let prompt = model.last_prompt().unwrap();
        assert_eq!(prompt.matches('z').count(), PROMPT_CHARS);
    }
}
