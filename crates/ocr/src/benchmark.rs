use std::time::{Duration, Instant};

use idis_core::QualityScore;
use image::GrayImage;
use serde::Serialize;

use crate::extract::MultiScaleTextExtractor;
use crate::recognizer::{OcrBackend, TextDetector};

/// Accuracy and latency of one engine against a ground-truth transcript.
#[derive(Debug, Clone, Serialize)]
pub struct EngineBenchmark {
    pub engine: String,
    pub wer: f64,
    pub cer: f64,
    pub elapsed: Duration,
}

impl EngineBenchmark {
    fn measure(engine: &str, ground_truth: &str, started: Instant, hypothesis: &str) -> Self {
        let elapsed = started.elapsed();
        let score = QualityScore::score(ground_truth, hypothesis);
        tracing::info!(engine, wer = score.wer, cer = score.cer, ?elapsed, "Engine benchmark");
        Self { engine: engine.to_string(), wer: score.wer, cer: score.cer, elapsed }
    }
}

/// Time and score the multi-scale extractor on the primary engine alone,
/// then the secondary engine alone when one is given.
pub fn benchmark(
    image: &GrayImage,
    ground_truth: &str,
    extractor: &MultiScaleTextExtractor,
    primary: (&str, &dyn TextDetector),
    secondary: Option<(&str, &dyn OcrBackend)>,
) -> Vec<EngineBenchmark> {
    let mut rows = Vec::with_capacity(2);

    let (name, engine) = primary;
    let started = Instant::now();
    let text = extractor.extract(image, engine, None);
    rows.push(EngineBenchmark::measure(name, ground_truth, started, &text));

    if let Some((name, engine)) = secondary {
        let started = Instant::now();
        let text = match engine.recognize(image, extractor.config().secondary_page_seg_mode) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("{name} failed during benchmark: {e}");
                String::new()
            }
        };
        rows.push(EngineBenchmark::measure(name, ground_truth, started, text.trim()));
    }

    rows
}
