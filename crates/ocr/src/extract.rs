use idis_core::ExtractorConfig;
use image::GrayImage;
use serde::Serialize;

use crate::preprocess::{invert, scale_image};
use crate::recognizer::{summarize, OcrBackend, TextDetector};
use crate::types::{Polarity, RecognitionCandidate};

/// Everything one extraction run decided, for callers that want more than
/// the final text.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutcome {
    pub text: String,
    /// The selection after the polarity recheck.
    pub selected: RecognitionCandidate,
    /// One candidate per configured scale, in scale order.
    pub candidates: Vec<RecognitionCandidate>,
    /// The inverted run, when the recheck happened.
    pub inverted: Option<RecognitionCandidate>,
    pub inverted_replaced: bool,
    pub inverted_appended: bool,
    pub secondary_merged: bool,
}

/// Multi-scale, polarity-aware text extraction over a primary engine, with
/// an optional secondary engine merged in for recall.
///
/// Never fails: engine errors degrade to empty candidates.
#[derive(Debug, Clone, Default)]
pub struct MultiScaleTextExtractor {
    config: ExtractorConfig,
}

impl MultiScaleTextExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn extract(
        &self,
        image: &GrayImage,
        primary: &dyn TextDetector,
        secondary: Option<&dyn OcrBackend>,
    ) -> String {
        self.extract_detailed(image, primary, secondary).text
    }

    pub fn extract_detailed(
        &self,
        image: &GrayImage,
        primary: &dyn TextDetector,
        secondary: Option<&dyn OcrBackend>,
    ) -> ExtractionOutcome {
        // 1. Run the primary engine at every scale.
        let candidates: Vec<RecognitionCandidate> = self
            .config
            .scales
            .iter()
            .map(|&scale| self.run_primary(primary, &scale_image(image, scale), scale, Polarity::Normal))
            .collect();

        // 2. Select by (confidence, length).
        let first_scale = self.config.scales.first().copied().unwrap_or(1.0);
        let mut selected = select_best(&candidates)
            .cloned()
            .unwrap_or_else(|| RecognitionCandidate::empty(first_scale, Polarity::Normal));
        let mut working = scale_image(image, selected.scale);
        let mut text = selected.text.clone();

        // 3. Low-confidence recheck on the inverted image.
        let mut inverted = None;
        let mut inverted_replaced = false;
        let mut inverted_appended = false;
        if selected.confidence < self.config.recheck_threshold {
            let inverted_image = invert(&working);
            let run = self.run_primary(primary, &inverted_image, selected.scale, Polarity::Inverted);
            tracing::info!(
                text_len = run.char_len(),
                confidence = run.confidence,
                "Inverted recheck"
            );
            if !run.is_empty() {
                if run.confidence > selected.confidence {
                    text = run.text.clone();
                    selected = run.clone();
                    working = inverted_image;
                    inverted_replaced = true;
                } else if run.confidence > self.config.append_confidence_floor
                    && run.char_len() > text.chars().count()
                {
                    text = format!("{text} {}", run.text).trim().to_string();
                    inverted_appended = true;
                }
            }
            inverted = Some(run);
        }

        // 4. Secondary engine, appended after the primary result.
        let mut secondary_merged = false;
        if self.config.combine_engines {
            if let Some(engine) = secondary.filter(|e| e.is_available()) {
                match engine.recognize(&working, self.config.secondary_page_seg_mode) {
                    Ok(extra) if !extra.trim().is_empty() => {
                        tracing::info!("Secondary engine extraction successful; merging results");
                        text = if text.is_empty() {
                            extra.trim().to_string()
                        } else {
                            format!("{text} {}", extra.trim())
                        };
                        secondary_merged = true;
                    }
                    Ok(_) => tracing::warn!("Secondary engine returned no text"),
                    Err(e) => tracing::warn!("Secondary engine failed: {e}"),
                }
            }
        }

        ExtractionOutcome {
            text: text.trim().to_string(),
            selected,
            candidates,
            inverted,
            inverted_replaced,
            inverted_appended,
            secondary_merged,
        }
    }

    fn run_primary(
        &self,
        engine: &dyn TextDetector,
        image: &GrayImage,
        scale: f32,
        polarity: Polarity,
    ) -> RecognitionCandidate {
        let detections = match engine.detect(image) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("Primary engine failed at scale {scale} ({polarity}): {e}");
                return RecognitionCandidate::empty(scale, polarity);
            }
        };
        let (text, confidence) = summarize(detections);
        let candidate = RecognitionCandidate::new(text, confidence, scale, polarity);
        if polarity == Polarity::Normal {
            if candidate.is_empty() {
                tracing::warn!("Primary engine returned no text at scale {scale}");
            } else {
                tracing::info!(
                    scale,
                    text_len = candidate.char_len(),
                    confidence = candidate.confidence,
                    "Primary engine candidate"
                );
            }
        }
        candidate
    }
}

/// Highest confidence among non-empty candidates, longer text on equal
/// confidence; the earliest candidate wins exact ties.
pub fn select_best(candidates: &[RecognitionCandidate]) -> Option<&RecognitionCandidate> {
    let mut best: Option<&RecognitionCandidate> = None;
    for c in candidates.iter().filter(|c| !c.is_empty()) {
        let better = match best {
            None => true,
            Some(b) => {
                c.confidence > b.confidence
                    || (c.confidence == b.confidence && c.char_len() > b.char_len())
            }
        };
        if better {
            best = Some(c);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::{MockDetector, MockRecognizer, OcrError, RawDetection};
    use idis_core::PageSegMode;
    use image::{ImageBuffer, Luma};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const BASE_WIDTH: u32 = 20;

    /// Light page: the normal image is bright, the inverted one dark.
    fn page() -> GrayImage {
        ImageBuffer::from_fn(BASE_WIDTH, 10, |_, _| Luma([230u8]))
    }

    fn is_inverted(img: &GrayImage) -> bool {
        let sum: u64 = img.pixels().map(|p| p[0] as u64).sum();
        sum / (img.width() as u64 * img.height() as u64) < 128
    }

    fn scale_of(img: &GrayImage) -> f32 {
        img.width() as f32 / BASE_WIDTH as f32
    }

    fn hit(text: &str, conf: f64) -> Result<Vec<RawDetection>, OcrError> {
        Ok(vec![RawDetection::Triple(Vec::new(), text.to_string(), conf)])
    }

    /// Detector answering per (scale, polarity).
    fn scripted<F>(f: F) -> MockDetector
    where
        F: Fn(f32, bool) -> Result<Vec<RawDetection>, OcrError> + Send + Sync + 'static,
    {
        MockDetector::from_fn(move |img| f(scale_of(img), is_inverted(img)))
    }

    /// Records whether it was handed an inverted image.
    struct PolarityReporter;

    impl OcrBackend for PolarityReporter {
        fn recognize(&self, image: &GrayImage, _mode: PageSegMode) -> Result<String, OcrError> {
            Ok(if is_inverted(image) { "dark".into() } else { "light".into() })
        }
    }

    fn extractor() -> MultiScaleTextExtractor {
        MultiScaleTextExtractor::default()
    }

    // ── Selection ────────────────────────────────────────────────────────────

    #[test]
    fn highest_confidence_wins() {
        let d = scripted(|s, _| match s {
            s if s < 1.2 => hit("aaa", 0.6),
            s if s < 1.7 => hit("bb", 0.8),
            _ => hit("cccc", 0.7),
        });
        let out = extractor().extract_detailed(&page(), &d, None);
        assert_eq!(out.text, "bb");
        assert_eq!(out.selected.scale, 1.5);
        assert_eq!(out.candidates.len(), 3);
        assert!(out.inverted.is_none());
    }

    #[test]
    fn equal_confidence_prefers_longer_text() {
        let d = scripted(|s, _| match s {
            s if s < 1.2 => hit("short", 0.7),
            s if s < 1.7 => hit("much longer text", 0.7),
            _ => hit("mid text", 0.7),
        });
        assert_eq!(extractor().extract(&page(), &d, None), "much longer text");
    }

    #[test]
    fn exact_tie_keeps_first_scale() {
        let d = scripted(|s, _| if s < 1.2 { hit("abc", 0.9) } else { hit("xyz", 0.9) });
        let out = extractor().extract_detailed(&page(), &d, None);
        assert_eq!(out.text, "abc");
        assert_eq!(out.selected.scale, 1.0);
    }

    #[test]
    fn select_best_ignores_empty_candidates() {
        let candidates = vec![
            RecognitionCandidate::new("", 0.99, 1.0, Polarity::Normal),
            RecognitionCandidate::new("x", 0.5, 1.5, Polarity::Normal),
        ];
        assert_eq!(select_best(&candidates).unwrap().text, "x");
        assert!(select_best(&candidates[..1]).is_none());
        assert!(select_best(&[]).is_none());
    }

    // ── Low-confidence recheck ───────────────────────────────────────────────

    #[test]
    fn stronger_inverted_run_replaces_selection() {
        let d = scripted(|_, inv| if inv { hit("inverted text", 0.5) } else { hit("orig", 0.3) });
        let out = extractor().extract_detailed(&page(), &d, None);
        assert_eq!(out.text, "inverted text");
        assert_eq!(out.selected.confidence, 0.5);
        assert_eq!(out.selected.polarity, Polarity::Inverted);
        assert!(out.inverted_replaced && !out.inverted_appended);
    }

    #[test]
    fn weaker_but_longer_inverted_run_is_appended() {
        let d = scripted(|_, inv| if inv { hit("much longer inverted", 0.25) } else { hit("orig", 0.3) });
        let out = extractor().extract_detailed(&page(), &d, None);
        assert_eq!(out.text, "orig much longer inverted");
        assert_eq!(out.selected.confidence, 0.3);
        assert_eq!(out.selected.polarity, Polarity::Normal);
        assert!(out.inverted_appended && !out.inverted_replaced);
    }

    #[test]
    fn inverted_run_below_floor_is_ignored() {
        let d = scripted(|_, inv| if inv { hit("much longer inverted", 0.15) } else { hit("orig", 0.3) });
        assert_eq!(extractor().extract(&page(), &d, None), "orig");
    }

    #[test]
    fn shorter_inverted_run_is_ignored() {
        let d = scripted(|_, inv| if inv { hit("ab", 0.25) } else { hit("orig", 0.3) });
        assert_eq!(extractor().extract(&page(), &d, None), "orig");
    }

    #[test]
    fn confident_selection_skips_recheck() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let d = MockDetector::from_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            hit("fine", 0.45)
        });
        extractor().extract(&page(), &d, None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn all_empty_still_rechecks_at_first_scale() {
        let d = scripted(|s, inv| if inv && s == 1.0 { hit("white on black", 0.3) } else { Ok(Vec::new()) });
        let out = extractor().extract_detailed(&page(), &d, None);
        assert_eq!(out.text, "white on black");
        assert_eq!(out.selected.scale, 1.0);
        assert!(out.inverted_replaced);
    }

    // ── Engine failures ──────────────────────────────────────────────────────

    #[test]
    fn failing_primary_gives_empty_text() {
        let out = extractor().extract_detailed(&page(), &MockDetector::failing("gpu lost"), None);
        assert_eq!(out.text, "");
        assert!(out.candidates.iter().all(|c| c.is_empty() && c.confidence == 0.0));
    }

    #[test]
    fn malformed_detections_do_not_break_extraction() {
        let d = MockDetector::from_fn(|_| {
            Ok(vec![
                RawDetection::Pair(Vec::new(), "Total".into()),
                RawDetection::Bare("10.00".into()),
                RawDetection::Mapping(serde_json::Map::new()),
            ])
        });
        let out = extractor().extract_detailed(&page(), &d, None);
        assert_eq!(out.text, "Total 10.00");
        assert_eq!(out.selected.confidence, 0.0);
    }

    // ── Secondary merge ──────────────────────────────────────────────────────

    #[test]
    fn secondary_text_is_appended() {
        let secondary = MockRecognizer::new("secondary\n");
        let out = extractor().extract_detailed(&page(), &MockDetector::fixed("primary", 0.9), Some(&secondary));
        assert_eq!(out.text, "primary secondary");
        assert!(out.secondary_merged);
    }

    #[test]
    fn secondary_alone_when_primary_fails() {
        let secondary = MockRecognizer::new("rescued");
        let text = extractor().extract(&page(), &MockDetector::failing("x"), Some(&secondary));
        assert_eq!(text, "rescued");
    }

    #[test]
    fn unusable_secondary_keeps_primary() {
        let primary = MockDetector::fixed("primary", 0.9);
        for secondary in [MockRecognizer::failing(), MockRecognizer::unavailable(), MockRecognizer::new("  ")] {
            assert_eq!(extractor().extract(&page(), &primary, Some(&secondary)), "primary");
        }
    }

    #[test]
    fn secondary_disabled_by_config() {
        let ex = MultiScaleTextExtractor::new(ExtractorConfig { combine_engines: false, ..Default::default() });
        let secondary = MockRecognizer::new("extra");
        assert_eq!(ex.extract(&page(), &MockDetector::fixed("primary", 0.9), Some(&secondary)), "primary");
    }

    #[test]
    fn secondary_sees_the_working_image() {
        let replaced = scripted(|_, inv| if inv { hit("inv", 0.5) } else { hit("orig", 0.3) });
        assert_eq!(extractor().extract(&page(), &replaced, Some(&PolarityReporter)), "inv dark");

        let kept = MockDetector::fixed("orig", 0.9);
        assert_eq!(extractor().extract(&page(), &kept, Some(&PolarityReporter)), "orig light");
    }
}
