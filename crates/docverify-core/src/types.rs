// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the DocVerify pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one processing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity documents the pipeline knows how to classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    #[serde(rename = "aadhaar_card")]
    Aadhaar,
    #[serde(rename = "pan_card")]
    Pan,
    VoterId,
    DrivingLicense,
    Passport,
    BirthCertificate,
    Unknown,
}

impl DocumentType {
    /// Every classifiable type, in rule-scoring order. `Unknown` is excluded.
    pub const KNOWN: [DocumentType; 6] = [
        Self::Aadhaar,
        Self::Pan,
        Self::VoterId,
        Self::DrivingLicense,
        Self::Passport,
        Self::BirthCertificate,
    ];

    /// Stable machine label, also used in language-model prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Aadhaar => "aadhaar_card",
            Self::Pan => "pan_card",
            Self::VoterId => "voter_id",
            Self::DrivingLicense => "driving_license",
            Self::Passport => "passport",
            Self::BirthCertificate => "birth_certificate",
            Self::Unknown => "unknown",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Aadhaar => "Aadhaar Card",
            Self::Pan => "PAN Card",
            Self::VoterId => "Voter ID",
            Self::DrivingLicense => "Driving License",
            Self::Passport => "Passport",
            Self::BirthCertificate => "Birth Certificate",
            Self::Unknown => "Unknown",
        }
    }

    /// Parse a machine label back into a type.
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim().to_ascii_lowercase();
        Self::KNOWN
            .into_iter()
            .chain(std::iter::once(Self::Unknown))
            .find(|t| t.label() == wanted)
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Axis-aligned box around a recognised text fragment, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One text fragment reported by an engine that exposes per-fragment scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub text: String,
    pub confidence: f64,
    pub bounding_box: BoundingBox,
}

/// Which engine (or combination) produced a recognition result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecognitionSource {
    Primary { engine: String },
    Fallback { engine: String },
    /// Both engines contributed; `lead` supplied the text.
    Merged { lead: String, other: String },
}

impl std::fmt::Display for RecognitionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary { engine } | Self::Fallback { engine } => f.write_str(engine),
            Self::Merged { lead, other } => write!(f, "ensemble({lead}+{other})"),
        }
    }
}

/// Output of the recognition ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub text: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    pub source: RecognitionSource,
    /// Empty for engines that only report plain text.
    pub detections: Vec<Detection>,
}

impl RecognitionResult {
    /// Zero-confidence result used when an engine is unavailable or failed.
    pub fn empty(source: RecognitionSource) -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            source,
            detections: Vec::new(),
        }
    }
}

/// How a classification decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    RuleBased,
    LlmFallback,
    LlmFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub document_type: DocumentType,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    pub method: ClassificationMethod,
}

impl ClassificationResult {
    pub fn unknown(method: ClassificationMethod) -> Self {
        Self {
            document_type: DocumentType::Unknown,
            confidence: 0.0,
            method,
        }
    }
}

/// Extracted fields, keyed by field name.
pub type FieldMap = BTreeMap<String, String>;

/// Outcome of field validation. Validation failures are data, never errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: BTreeMap<String, String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Record a field error. Any error makes the result invalid.
    pub fn add_error(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.errors.insert(field.into(), reason.into());
        self.is_valid = false;
    }

    /// Record a warning. Warnings never affect `is_valid`.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// Terminal status of a processing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Success,
    Failed,
}

/// Recognition metadata carried into the final report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionSummary {
    pub engine: String,
    pub confidence: f64,
    pub detection_count: usize,
}

impl From<&RecognitionResult> for RecognitionSummary {
    fn from(result: &RecognitionResult) -> Self {
        Self {
            engine: result.source.to_string(),
            confidence: result.confidence,
            detection_count: result.detections.len(),
        }
    }
}

/// Final result handed to the API / persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingReport {
    pub id: DocumentId,
    pub status: ProcessingStatus,
    pub document_type: DocumentType,
    pub confidence: f64,
    pub classification_method: Option<ClassificationMethod>,
    pub extracted_fields: FieldMap,
    pub validation: Option<ValidationResult>,
    pub raw_text: String,
    pub recognition: Option<RecognitionSummary>,
    pub error: Option<String>,
}

impl ProcessingReport {
    /// Report for a request that failed before any partial result existed.
    pub fn failed(id: DocumentId, error: impl Into<String>) -> Self {
        Self {
            id,
            status: ProcessingStatus::Failed,
            document_type: DocumentType::Unknown,
            confidence: 0.0,
            classification_method: None,
            extracted_fields: FieldMap::new(),
            validation: None,
            raw_text: String::new(),
            recognition: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip() {
        for ty in DocumentType::KNOWN {
            assert_eq!(DocumentType::from_label(ty.label()), Some(ty));
        }
        assert_eq!(DocumentType::from_label(" Unknown "), Some(DocumentType::Unknown));
        assert_eq!(DocumentType::from_label("ration_card"), None);
    }

    #[test]
    fn serde_uses_machine_labels() {
        let json = serde_json::to_string(&DocumentType::Pan).unwrap();
        assert_eq!(json, "\"pan_card\"");
        let back: DocumentType = serde_json::from_str("\"driving_license\"").unwrap();
        assert_eq!(back, DocumentType::DrivingLicense);
    }

    #[test]
    fn merged_source_display() {
        let source = RecognitionSource::Merged {
            lead: "tesseract".into(),
            other: "ocrs".into(),
        };
        assert_eq!(source.to_string(), "ensemble(tesseract+ocrs)");
    }

    #[test]
    fn errors_invalidate_but_warnings_do_not() {
        let mut result = ValidationResult::new();
        result.add_warning("odd date");
        assert!(result.is_valid);
        result.add_error("pan_number", "Invalid Format");
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
    }
}
