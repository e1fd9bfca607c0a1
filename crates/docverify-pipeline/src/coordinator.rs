// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline coordinator: owns one instance of every stage and runs a
// document through them in order.
//
// Stages within one request run sequentially; independent requests may run
// concurrently on the same `DocumentPipeline` (it is `Clone` and every field
// is shared via `Arc`). CPU-heavy stages (image normalization and OCR) run on
// Tokio's blocking pool. Only a decode failure produces a `Failed` report;
// every later problem degrades the result instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use docverify_analysis::llm::{self, LanguageModel};
use docverify_analysis::{Classifier, Extractor, Validator};
use docverify_core::config::PipelineConfig;
use docverify_core::error::{DocVerifyError, Result};
use docverify_core::types::{
    ClassificationResult, DocumentId, DocumentType, FieldMap, ProcessingReport, ProcessingStatus,
    RecognitionResult, RecognitionSource, RecognitionSummary, ValidationResult,
};
use docverify_imaging::{ImageSource, Preprocessor};
use docverify_recognition::RecognitionEnsemble;
use image::DynamicImage;
use tokio::time::Instant;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

/// The assembled document pipeline.
#[derive(Clone)]
pub struct DocumentPipeline {
    config: Arc<PipelineConfig>,
    preprocessor: Arc<Preprocessor>,
    ensemble: Arc<RecognitionEnsemble>,
    classifier: Arc<Classifier>,
    extractor: Arc<Extractor>,
    validator: Validator,
    llm_timeout: Duration,
}

/// Builder for [`DocumentPipeline`].
pub struct PipelineBuilder {
    config: PipelineConfig,
    ensemble: RecognitionEnsemble,
    language_model: Option<Arc<dyn LanguageModel>>,
}

impl PipelineBuilder {
    /// Use `model` for classification and extraction fallbacks, overriding
    /// whatever the configuration selects.
    pub fn language_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.language_model = Some(model);
        self
    }

    /// Build the language-model client named by the configuration (if any).
    pub fn language_model_from_config(mut self) -> Result<Self> {
        self.language_model = llm::from_config(&self.config.llm)?;
        Ok(self)
    }

    pub fn build(self) -> Result<DocumentPipeline> {
        self.config.validate()?;

        let llm_timeout = Duration::from_secs(self.config.llm.timeout_secs);
        let mut classifier =
            Classifier::new().with_threshold(self.config.classification.rule_confidence_threshold);
        let mut extractor = Extractor::new();
        if let Some(model) = self.language_model {
            classifier = classifier.with_language_model(Arc::clone(&model), llm_timeout);
            extractor = extractor.with_language_model(model, llm_timeout);
        }

        info!(
            primary = %self.ensemble.primary().name(),
            fallback = ?self.ensemble.fallback().map(|h| h.name().to_string()),
            language_model = classifier.has_language_model(),
            "Document pipeline ready"
        );

        Ok(DocumentPipeline {
            preprocessor: Arc::new(Preprocessor::new(self.config.preprocess.clone())),
            config: Arc::new(self.config),
            ensemble: Arc::new(self.ensemble),
            classifier: Arc::new(classifier),
            extractor: Arc::new(extractor),
            validator: Validator::new(),
            llm_timeout,
        })
    }
}

impl DocumentPipeline {
    // -- Construction ---------------------------------------------------------

    pub fn builder(config: PipelineConfig, ensemble: RecognitionEnsemble) -> PipelineBuilder {
        PipelineBuilder {
            config,
            ensemble,
            language_model: None,
        }
    }

    /// Build with the language model named by `config`.
    pub fn new(config: PipelineConfig, ensemble: RecognitionEnsemble) -> Result<Self> {
        Self::builder(config, ensemble)
            .language_model_from_config()?
            .build()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // -- Whole-document processing ---------------------------------------------

    /// Run every stage on an already-decoded image.
    pub async fn process(&self, image: DynamicImage) -> ProcessingReport {
        self.run(DocumentId::new(), image, None).await
    }

    /// Like [`process`](Self::process), but language-model fallbacks only get
    /// the time left before `deadline` (and are skipped once it has passed).
    pub async fn process_with_deadline(&self, image: DynamicImage, deadline: Instant) -> ProcessingReport {
        self.run(DocumentId::new(), image, Some(deadline)).await
    }

    /// Decode a file and process it. Unreadable files yield a `Failed` report.
    pub async fn process_path(&self, path: impl AsRef<Path>) -> ProcessingReport {
        let path: PathBuf = path.as_ref().to_path_buf();
        let id = DocumentId::new();
        let span = info_span!("document", id = %id, path = %path.display());

        async {
            let decoded = tokio::task::spawn_blocking(move || ImageSource::open(&path))
                .await
                .unwrap_or_else(|err| {
                    Err(DocVerifyError::Decode(format!("decoder task failed: {}", err)))
                });
            match decoded {
                Ok(source) => self.stages(id, source.into_dynamic(), None).await,
                Err(err) => failed(id, err),
            }
        }
        .instrument(span)
        .await
    }

    /// Decode an in-memory image and process it.
    pub async fn process_bytes(&self, bytes: Vec<u8>) -> ProcessingReport {
        let id = DocumentId::new();
        let span = info_span!("document", id = %id, bytes = bytes.len());

        async {
            let decoded = tokio::task::spawn_blocking(move || ImageSource::from_bytes(&bytes))
                .await
                .unwrap_or_else(|err| {
                    Err(DocVerifyError::Decode(format!("decoder task failed: {}", err)))
                });
            match decoded {
                Ok(source) => self.stages(id, source.into_dynamic(), None).await,
                Err(err) => failed(id, err),
            }
        }
        .instrument(span)
        .await
    }

    // -- Individual stages ----------------------------------------------------

    /// Normalize an image. A panicking stage returns the input unchanged.
    pub async fn preprocess(&self, image: DynamicImage) -> DynamicImage {
        let preprocessor = Arc::clone(&self.preprocessor);
        let original = image.clone();
        match tokio::task::spawn_blocking(move || preprocessor.process(image)).await {
            Ok(prepared) => prepared,
            Err(err) => {
                warn!(error = %err, "Preprocessing task failed; using original image");
                original
            }
        }
    }

    /// Recognise text. A panicking engine yields an empty result.
    pub async fn recognize(&self, image: DynamicImage) -> RecognitionResult {
        let ensemble = Arc::clone(&self.ensemble);
        match tokio::task::spawn_blocking(move || ensemble.extract(&image)).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "Recognition task failed; continuing without text");
                RecognitionResult::empty(RecognitionSource::Primary {
                    engine: self.ensemble.primary().name().to_string(),
                })
            }
        }
    }

    pub async fn classify(&self, text: &str) -> ClassificationResult {
        self.classifier.classify(text).await
    }

    pub async fn extract(&self, text: &str, document_type: DocumentType) -> FieldMap {
        self.extractor.extract(text, document_type).await
    }

    pub fn validate(&self, fields: &FieldMap, document_type: DocumentType) -> ValidationResult {
        self.validator.validate(fields, document_type)
    }

    // -- Internals ------------------------------------------------------------

    async fn run(&self, id: DocumentId, image: DynamicImage, deadline: Option<Instant>) -> ProcessingReport {
        let span = info_span!("document", id = %id);
        self.stages(id, image, deadline).instrument(span).await
    }

    #[instrument(skip(self, image, deadline), fields(width = image.width(), height = image.height()))]
    async fn stages(
        &self,
        id: DocumentId,
        image: DynamicImage,
        deadline: Option<Instant>,
    ) -> ProcessingReport {
        info!("Processing document");

        let prepared = self.preprocess(image).await;
        let recognition = self.recognize(prepared).await;
        debug!(
            chars = recognition.text.chars().count(),
            confidence = recognition.confidence,
            source = %recognition.source,
            "Recognition finished"
        );

        let classification = self
            .classifier
            .classify_within(&recognition.text, self.budget(deadline))
            .await;

        let fields = if classification.document_type == DocumentType::Unknown {
            debug!("Document type unknown; skipping extraction");
            FieldMap::new()
        } else {
            self.extractor
                .extract_within(&recognition.text, classification.document_type, self.budget(deadline))
                .await
        };

        let validation = if fields.is_empty() {
            None
        } else {
            Some(self.validator.validate(&fields, classification.document_type))
        };

        info!(
            document_type = %classification.document_type,
            confidence = classification.confidence,
            fields = fields.len(),
            valid = validation.as_ref().map(|v| v.is_valid),
            "Document processed"
        );

        ProcessingReport {
            id,
            status: ProcessingStatus::Success,
            document_type: classification.document_type,
            confidence: classification.confidence,
            classification_method: Some(classification.method),
            extracted_fields: fields,
            validation,
            recognition: Some(RecognitionSummary::from(&recognition)),
            raw_text: recognition.text,
            error: None,
        }
    }

    /// Time a language-model fallback may use right now.
    fn budget(&self, deadline: Option<Instant>) -> Duration {
        match deadline {
            Some(deadline) => self
                .llm_timeout
                .min(deadline.saturating_duration_since(Instant::now())),
            None => self.llm_timeout,
        }
    }
}

fn failed(id: DocumentId, err: DocVerifyError) -> ProcessingReport {
    warn!(error = %err, "Document could not be decoded");
    ProcessingReport::failed(id, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docverify_analysis::llm::MockLanguageModel;
    use docverify_core::lifecycle::HandleState;
    use docverify_core::types::ClassificationMethod;
    use docverify_recognition::{EngineHandle, RecognitionEngine};
    use image::GrayImage;

    const PAN_TEXT: &str = "INCOME TAX DEPARTMENT\nPermanent Account Number\nName\nRAHUL SHARMA\n\
                            01/02/1985\nABCDE1234F";

    struct ScriptedEngine {
        text: &'static str,
        panic: bool,
    }

    impl RecognitionEngine for ScriptedEngine {
        fn name(&self) -> &str {
            "scripted"
        }

        fn extract(&mut self, _image: &DynamicImage) -> Result<String> {
            if self.panic {
                panic!("engine crashed");
            }
            Ok(self.text.to_string())
        }
    }

    fn quiet_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.preprocess.deskew = false;
        config.preprocess.denoise = false;
        config.preprocess.enhance = false;
        config
    }

    fn ensemble(text: &'static str, panic: bool) -> RecognitionEnsemble {
        let handle = EngineHandle::ready(ScriptedEngine { text, panic });
        RecognitionEnsemble::new(Arc::new(handle), 0.7)
    }

    fn pipeline(text: &'static str) -> DocumentPipeline {
        DocumentPipeline::builder(quiet_config(), ensemble(text, false))
            .build()
            .unwrap()
    }

    fn page() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 24, image::Luma([240])))
    }

    #[tokio::test]
    async fn pan_card_end_to_end() {
        let report = pipeline(PAN_TEXT).process(page()).await;

        assert_eq!(report.status, ProcessingStatus::Success);
        assert_eq!(report.document_type, DocumentType::Pan);
        assert_eq!(report.classification_method, Some(ClassificationMethod::RuleBased));
        assert_eq!(report.extracted_fields["pan_number"], "ABCDE1234F");
        assert_eq!(report.extracted_fields["dob"], "01/02/1985");
        let validation = report.validation.unwrap();
        assert!(validation.is_valid, "{:?}", validation.errors);
        assert_eq!(report.raw_text, PAN_TEXT);
        assert_eq!(report.recognition.unwrap().engine, "scripted");
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn unknown_document_skips_extraction_and_validation() {
        let report = pipeline("hello world").process(page()).await;
        assert_eq!(report.status, ProcessingStatus::Success);
        assert_eq!(report.document_type, DocumentType::Unknown);
        assert!(report.extracted_fields.is_empty());
        assert!(report.validation.is_none());
    }

    #[tokio::test]
    async fn engine_panic_degrades_to_empty_text() {
        let pipeline = DocumentPipeline::builder(quiet_config(), ensemble("", true))
            .build()
            .unwrap();
        let report = pipeline.process(page()).await;
        assert_eq!(report.status, ProcessingStatus::Success);
        assert_eq!(report.raw_text, "");
        assert_eq!(report.document_type, DocumentType::Unknown);
        assert_eq!(report.recognition.unwrap().confidence, 0.0);
    }

    /// Crashes on its first document only.
    struct CrashesOnce {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl RecognitionEngine for CrashesOnce {
        fn name(&self) -> &str {
            "crashes-once"
        }

        fn extract(&mut self, _image: &DynamicImage) -> Result<String> {
            if self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                panic!("engine crashed");
            }
            Ok(PAN_TEXT.to_string())
        }
    }

    #[tokio::test]
    async fn engine_recovers_after_a_panic() {
        let handle = Arc::new(EngineHandle::ready(CrashesOnce {
            calls: std::sync::atomic::AtomicUsize::new(0),
        }));
        let ensemble = RecognitionEnsemble::new(Arc::clone(&handle), 0.7);
        let pipeline = DocumentPipeline::builder(quiet_config(), ensemble)
            .build()
            .unwrap();

        let first = pipeline.process(page()).await;
        assert_eq!(first.status, ProcessingStatus::Success);
        assert_eq!(first.document_type, DocumentType::Unknown);
        assert_eq!(handle.state(), HandleState::Idle);

        for _ in 0..3 {
            let report = pipeline.process(page()).await;
            assert_eq!(report.raw_text, PAN_TEXT);
            assert_eq!(report.document_type, DocumentType::Pan);
            assert_eq!(handle.state(), HandleState::Idle);
        }
    }

    #[tokio::test]
    async fn undecodable_bytes_fail_the_request() {
        let report = pipeline(PAN_TEXT).process_bytes(b"not an image".to_vec()).await;
        assert_eq!(report.status, ProcessingStatus::Failed);
        assert!(report.error.unwrap().contains("decode"));
        assert!(report.raw_text.is_empty());
    }

    #[tokio::test]
    async fn missing_file_fails_the_request() {
        let report = pipeline(PAN_TEXT).process_path("/nonexistent/card.png").await;
        assert_eq!(report.status, ProcessingStatus::Failed);
        assert!(report.error.is_some());
    }

    #[tokio::test]
    async fn image_file_is_decoded_and_processed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.png");
        page().save(&path).unwrap();

        let report = pipeline(PAN_TEXT).process_path(&path).await;
        assert_eq!(report.status, ProcessingStatus::Success);
        assert_eq!(report.document_type, DocumentType::Pan);
    }

    #[tokio::test]
    async fn language_model_resolves_ambiguous_text() {
        let model = Arc::new(MockLanguageModel::new("voter_id"));
        let pipeline = DocumentPipeline::builder(quiet_config(), ensemble("blurry card", false))
            .language_model(Arc::clone(&model) as Arc<dyn LanguageModel>)
            .build()
            .unwrap();

        let report = pipeline.process(page()).await;
        assert_eq!(report.document_type, DocumentType::VoterId);
        assert_eq!(report.classification_method, Some(ClassificationMethod::LlmFallback));
        // Classification plus one extraction attempt for the missing EPIC number.
        assert_eq!(model.call_count(), 2);
        assert!(report.extracted_fields.is_empty());
        assert!(report.validation.is_none());
    }

    #[tokio::test]
    async fn expired_deadline_skips_language_model() {
        let model = Arc::new(MockLanguageModel::new("voter_id"));
        let pipeline = DocumentPipeline::builder(quiet_config(), ensemble("blurry card", false))
            .language_model(Arc::clone(&model) as Arc<dyn LanguageModel>)
            .build()
            .unwrap();

        let report = pipeline.process_with_deadline(page(), Instant::now()).await;
        assert_eq!(report.status, ProcessingStatus::Success);
        assert_eq!(report.classification_method, Some(ClassificationMethod::RuleBased));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_pipeline() {
        let pipeline = pipeline(PAN_TEXT);
        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let pipeline = pipeline.clone();
                tokio::spawn(async move { pipeline.process(page()).await })
            })
            .collect();

        let mut ids = Vec::new();
        for task in tasks {
            let report = task.await.unwrap();
            assert_eq!(report.document_type, DocumentType::Pan);
            ids.push(report.id);
        }
        ids.sort_by_key(|id| id.0);
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = quiet_config();
        config.recognition.confidence_threshold = 1.5;
        assert!(matches!(
            DocumentPipeline::builder(config, ensemble("", false)).build(),
            Err(DocVerifyError::Config(_))
        ));
    }
}
