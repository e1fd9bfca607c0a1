// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// libtesseract OCR backend.
//
// Only available with the `tesseract` feature, which links the system
// libtesseract/leptonica. Unlike `ocrs`, Tesseract reports per-word
// confidences and boxes (parsed from its TSV output), so results carry
// native scores and detections.

use docverify_core::error::{DocVerifyError, Result};
use docverify_core::types::{BoundingBox, Detection};
use image::DynamicImage;
use tesseract::{PageSegMode, Tesseract};
use tracing::{debug, info, instrument};

use crate::engine::{EngineOutput, RecognitionEngine};

/// TSV row level for individual words.
const WORD_LEVEL: &str = "5";

/// Tesseract API consumed and rebuilt around each page.
///
/// The `tesseract` crate's builder methods take `self`, so the instance is
/// taken out for a page and put back afterwards. If a step fails the instance
/// is lost and a fresh one is created on the next call.
pub struct TesseractEngine {
    api: Option<Tesseract>,
    languages: String,
    datapath: Option<String>,
}

impl TesseractEngine {
    /// Initialise with a `+`-joined language list such as `eng+hin`.
    #[instrument(skip_all, fields(languages = %languages))]
    pub fn new(languages: &str, datapath: Option<String>) -> Result<Self> {
        let api = init_api(datapath.as_deref(), languages)?;
        info!("Tesseract engine ready");
        Ok(Self {
            api: Some(api),
            languages: languages.to_string(),
            datapath,
        })
    }

    fn recognize_page(&mut self, image: &DynamicImage) -> Result<Tesseract> {
        let api = match self.api.take() {
            Some(api) => api,
            None => init_api(self.datapath.as_deref(), &self.languages)?,
        };

        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let width = i32::try_from(width)
            .map_err(|_| DocVerifyError::Recognition("image too wide for tesseract".into()))?;
        let height = i32::try_from(height)
            .map_err(|_| DocVerifyError::Recognition("image too tall for tesseract".into()))?;

        api.set_frame(rgb.as_raw(), width, height, 3, width * 3)
            .map_err(|err| DocVerifyError::Recognition(format!("tesseract set_frame failed: {}", err)))?
            .recognize()
            .map_err(|err| DocVerifyError::Recognition(format!("tesseract recognition failed: {}", err)))
    }
}

impl RecognitionEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn extract(&mut self, image: &DynamicImage) -> Result<String> {
        let mut api = self.recognize_page(image)?;
        let text = api
            .get_text()
            .map_err(|err| DocVerifyError::Recognition(format!("tesseract get_text failed: {}", err)));
        self.api = Some(api);
        text
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn extract_with_confidence(&mut self, image: &DynamicImage) -> Result<Option<EngineOutput>> {
        let mut api = self.recognize_page(image)?;

        let text = api
            .get_text()
            .map_err(|err| DocVerifyError::Recognition(format!("tesseract get_text failed: {}", err)));
        let tsv = api
            .get_tsv_text(0)
            .map_err(|err| DocVerifyError::Recognition(format!("tesseract TSV output failed: {}", err)));
        let mean_conf = api.mean_text_conf();
        self.api = Some(api);
        let (text, tsv) = (text?, tsv?);

        let detections = parse_tsv_words(&tsv);
        let confidence = if detections.is_empty() {
            f64::from(mean_conf.max(0)) / 100.0
        } else {
            detections.iter().map(|d| d.confidence).sum::<f64>() / detections.len() as f64
        };
        debug!(words = detections.len(), confidence, "Tesseract recognition complete");

        Ok(Some(EngineOutput {
            text,
            confidence: confidence.clamp(0.0, 1.0),
            detections,
        }))
    }
}

fn init_api(datapath: Option<&str>, languages: &str) -> Result<Tesseract> {
    let mut api = Tesseract::new(datapath, Some(languages)).map_err(|err| {
        DocVerifyError::EngineUnavailable(format!(
            "failed to initialise tesseract ({languages}): {err}"
        ))
    })?;
    api.set_page_seg_mode(PageSegMode::PsmAuto);
    Ok(api)
}

/// Parse word rows out of Tesseract TSV output.
///
/// Columns: level, page, block, paragraph, line, word, left, top, width,
/// height, conf, text. Rows with negative confidence or blank text are
/// skipped.
pub fn parse_tsv_words(tsv: &str) -> Vec<Detection> {
    tsv.lines()
        .filter_map(|line| {
            let cols: Vec<&str> = line.split('\t').collect();
            if cols.len() < 12 || cols[0] != WORD_LEVEL {
                return None;
            }
            let text = cols[11].trim();
            let conf: f64 = cols[10].trim().parse().ok()?;
            if text.is_empty() || conf < 0.0 {
                return None;
            }
            let num = |i: usize| cols[i].trim().parse::<f32>().ok();
            Some(Detection {
                text: text.to_string(),
                confidence: (conf / 100.0).clamp(0.0, 1.0),
                bounding_box: BoundingBox {
                    x: num(6)?,
                    y: num(7)?,
                    width: num(8)?,
                    height: num(9)?,
                },
            })
        })
        .collect()
}
