use std::path::{Path, PathBuf};

use idis_core::{ExtractedFieldSet, PageSegMode, PipelineConfig, ValidatedFieldSet};
use idis_nlp::{clean_text, EntityRecognizer, FieldExtractor, FieldValidator, SpellingCorrector};
use image::{DynamicImage, GrayImage};
use serde::Serialize;
use thiserror::Error;

use crate::extract::MultiScaleTextExtractor;
use crate::handwriting::HandwritingClassifier;
use crate::preprocess::{self, ContrastStretch, InputError, Preprocess};
use crate::recognizer::{OcrBackend, TextDetector};
use crate::types::{DocumentKind, ExtractionStrategy};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid input image: {0}")]
    Input(#[from] InputError),
}

/// The result of processing one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResult {
    pub source: String,
    pub kind: DocumentKind,
    pub strategy: ExtractionStrategy,
    /// Text as returned by the recognition engines.
    pub raw_text: String,
    pub cleaned_text: String,
    pub fields: ExtractedFieldSet,
    pub validated: ValidatedFieldSet,
}

/// Orchestrates: strategy selection → preprocess → OCR → clean → fields → validate.
///
/// Engines are constructed once by the caller and reused for every document.
pub struct DocumentPipeline<E: EntityRecognizer, C: SpellingCorrector> {
    primary: Box<dyn TextDetector>,
    secondary: Option<Box<dyn OcrBackend>>,
    handwriting: Option<Box<dyn OcrBackend>>,
    preprocess: Box<dyn Preprocess>,
    classifier: HandwritingClassifier,
    extractor: MultiScaleTextExtractor,
    fields: FieldExtractor<E>,
    validator: FieldValidator<C>,
}

impl<E: EntityRecognizer, C: SpellingCorrector> DocumentPipeline<E, C> {
    pub fn new(
        primary: impl TextDetector + 'static,
        recognizer: E,
        corrector: C,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            primary: Box::new(primary),
            secondary: None,
            handwriting: None,
            preprocess: Box::new(ContrastStretch::default()),
            classifier: HandwritingClassifier::new(config.handwriting.clone()),
            extractor: MultiScaleTextExtractor::new(config.extractor.clone()),
            fields: FieldExtractor::new(recognizer),
            validator: FieldValidator::new(corrector, &config.validation),
        }
    }

    pub fn with_secondary(mut self, engine: impl OcrBackend + 'static) -> Self {
        self.secondary = Some(Box::new(engine));
        self
    }

    pub fn with_handwriting_engine(mut self, engine: impl OcrBackend + 'static) -> Self {
        self.handwriting = Some(Box::new(engine));
        self
    }

    pub fn with_preprocess(mut self, preprocess: impl Preprocess + 'static) -> Self {
        self.preprocess = Box::new(preprocess);
        self
    }

    /// Handwriting only when a handwriting engine is configured and the
    /// classifier agrees.
    pub fn choose_strategy(&self, image: &DynamicImage) -> ExtractionStrategy {
        let strategy = match &self.handwriting {
            Some(_) if self.classifier.is_handwritten(image) => ExtractionStrategy::Handwriting,
            _ => ExtractionStrategy::General,
        };
        tracing::info!("Extraction strategy: {strategy}");
        strategy
    }

    /// Process a file on disk.
    pub async fn process_file(&self, path: &Path) -> Result<DocumentResult, PipelineError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.process_bytes(&bytes, &name)
    }

    /// Process encoded image bytes (from camera capture or file read).
    pub fn process_bytes(&self, data: &[u8], name: &str) -> Result<DocumentResult, PipelineError> {
        let image = preprocess::load_image_from_bytes(data, name)?;
        self.process_image(&image, name)
    }

    pub fn process_image(&self, image: &DynamicImage, name: &str) -> Result<DocumentResult, PipelineError> {
        preprocess::check_dimensions(image, name)?;

        let mut strategy = self.choose_strategy(image);
        let gray = self.preprocess.apply(image);

        let mut raw_text = String::new();
        if strategy == ExtractionStrategy::Handwriting {
            match self.recognize_handwriting(&gray) {
                Some(text) => raw_text = text,
                None => {
                    tracing::warn!("Handwriting engine produced no text for {name}; using general extraction");
                    strategy = ExtractionStrategy::General;
                }
            }
        }
        if strategy == ExtractionStrategy::General {
            raw_text = self.extractor.extract(&gray, self.primary.as_ref(), self.secondary.as_deref());
        }

        let cleaned_text = clean_text(&raw_text);
        let fields = self.fields.extract(&cleaned_text);
        let validated = self.validator.validate(&fields);
        tracing::info!(
            source = name,
            text_len = cleaned_text.len(),
            fields = fields.len(),
            "Document processed"
        );

        Ok(DocumentResult {
            source: name.to_string(),
            kind: DocumentKind::infer(strategy, name),
            strategy,
            raw_text,
            cleaned_text,
            fields,
            validated,
        })
    }

    fn recognize_handwriting(&self, gray: &GrayImage) -> Option<String> {
        let engine = self.handwriting.as_ref()?;
        match engine.recognize(gray, PageSegMode::Auto) {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Handwriting engine failed: {e}");
                None
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::{MockDetector, MockRecognizer};
    use idis_core::FieldKey;
    use idis_nlp::{IdentityCorrector, MockEntityRecognizer, RuleBasedRecognizer, VocabularyCorrector};
    use image::{ImageBuffer, Luma};
    use std::io::Cursor;

    const CARD_TEXT: &str = "Greenfield Engineering College\nName: Jane Doe\nID No: GEC20931\nTotal: $123.45 on 12/05/2024";

    fn plain_page() -> DynamicImage {
        DynamicImage::ImageLuma8(ImageBuffer::from_fn(32, 32, |_, _| Luma([220u8])))
    }

    /// Dense 6 px stripes with moderate contrast: classified as handwriting.
    fn scribbles() -> DynamicImage {
        DynamicImage::ImageLuma8(ImageBuffer::from_fn(96, 48, |x, _| {
            Luma([if (x / 6) % 2 == 0 { 60 } else { 200 }])
        }))
    }

    fn png(img: &DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png).unwrap();
        buf
    }

    fn card_pipeline() -> DocumentPipeline<RuleBasedRecognizer, VocabularyCorrector> {
        DocumentPipeline::new(
            MockDetector::fixed(CARD_TEXT, 0.9),
            RuleBasedRecognizer,
            VocabularyCorrector::from_words(["jane", "doe"]),
            &PipelineConfig::default(),
        )
    }

    fn simple_pipeline(text: &str) -> DocumentPipeline<MockEntityRecognizer, IdentityCorrector> {
        DocumentPipeline::new(
            MockDetector::fixed(text, 0.9),
            MockEntityRecognizer::empty(),
            IdentityCorrector,
            &PipelineConfig::default(),
        )
    }

    #[test]
    fn full_chain_extracts_and_validates() {
        let r = card_pipeline().process_image(&plain_page(), "student_id_01.png").unwrap();
        assert_eq!(r.strategy, ExtractionStrategy::General);
        assert_eq!(r.kind, DocumentKind::IdCard);
        assert!(!r.cleaned_text.contains('\n'));
        assert_eq!(r.fields.field(FieldKey::Name), Some("Jane Doe"));
        assert_eq!(r.fields.field(FieldKey::IdNumber), Some("GEC20931"));
        assert_eq!(r.validated.value("total_amount"), Some("123.45"));
        assert_eq!(r.validated.confidence("date"), Some(1.0));
        assert!(r.validated.get("organization").is_some());
        assert!(r.validated.total_amount().is_some());
        assert!(r.validated.date().is_some());
    }

    #[test]
    fn nothing_recognized_gives_empty_fields() {
        let p = DocumentPipeline::new(
            MockDetector::failing("engine down"),
            MockEntityRecognizer::empty(),
            IdentityCorrector,
            &PipelineConfig::default(),
        );
        let r = p.process_image(&plain_page(), "scan.png").unwrap();
        assert_eq!(r.raw_text, "");
        assert!(r.fields.is_empty());
        assert!(r.validated.is_empty());
        assert_eq!(r.kind, DocumentKind::Document);
    }

    #[test]
    fn handwriting_engine_used_for_handwritten_pages() {
        let p = simple_pipeline("printed").with_handwriting_engine(MockRecognizer::new("Total 42 dear diary"));
        let r = p.process_image(&scribbles(), "receipt.png").unwrap();
        assert_eq!(r.strategy, ExtractionStrategy::Handwriting);
        assert_eq!(r.kind, DocumentKind::Handwritten);
        assert_eq!(r.fields.field(FieldKey::TotalAmount), Some("42"));
    }

    #[test]
    fn handwriting_failure_falls_back_to_general() {
        let p = simple_pipeline("printed text").with_handwriting_engine(MockRecognizer::failing());
        let r = p.process_image(&scribbles(), "receipt.png").unwrap();
        assert_eq!(r.strategy, ExtractionStrategy::General);
        assert_eq!(r.raw_text, "printed text");
        assert_eq!(r.kind, DocumentKind::Receipt);
    }

    #[test]
    fn printed_pages_skip_handwriting_engine() {
        let p = simple_pipeline("printed").with_handwriting_engine(MockRecognizer::new("never"));
        assert_eq!(p.choose_strategy(&plain_page()), ExtractionStrategy::General);
    }

    #[test]
    fn no_handwriting_engine_means_general() {
        assert_eq!(simple_pipeline("x").choose_strategy(&scribbles()), ExtractionStrategy::General);
    }

    #[test]
    fn secondary_engine_output_is_merged() {
        let p = simple_pipeline("primary").with_secondary(MockRecognizer::new("Total: 9.99"));
        let r = p.process_image(&plain_page(), "doc.png").unwrap();
        assert_eq!(r.raw_text, "primary Total: 9.99");
        assert_eq!(r.fields.field(FieldKey::TotalAmount), Some("9.99"));
    }

    /// Grayscale then invert, for light-on-dark scans.
    struct InvertPreprocess;

    impl Preprocess for InvertPreprocess {
        fn apply(&self, img: &DynamicImage) -> GrayImage {
            preprocess::invert(&img.to_luma8())
        }
    }

    #[test]
    fn custom_preprocess_feeds_the_engines() {
        let detector = MockDetector::from_fn(|img| {
            let shade = if img.get_pixel(0, 0)[0] < 128 { "dark" } else { "light" };
            Ok(vec![crate::recognizer::RawDetection::Triple(Vec::new(), shade.to_string(), 0.9)])
        });
        let p = DocumentPipeline::new(detector, MockEntityRecognizer::empty(), IdentityCorrector, &PipelineConfig::default())
            .with_preprocess(InvertPreprocess);
        let r = p.process_image(&plain_page(), "scan.png").unwrap();
        assert!(r.raw_text.contains("dark"), "raw text was {:?}", r.raw_text);
        assert!(!r.raw_text.contains("light"));
    }

    #[test]
    fn too_small_image_is_an_input_error() {
        let tiny = DynamicImage::ImageLuma8(ImageBuffer::from_fn(2, 2, |_, _| Luma([0u8])));
        let err = simple_pipeline("x").process_image(&tiny, "tiny.png").unwrap_err();
        assert!(matches!(err, PipelineError::Input(InputError::TooSmall { .. })));
    }

    #[tokio::test]
    async fn process_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt_0042.png");
        std::fs::write(&path, png(&plain_page())).unwrap();

        let r = simple_pipeline("Total $5.50").process_file(&path).await.unwrap();
        assert_eq!(r.source, "receipt_0042.png");
        assert_eq!(r.kind, DocumentKind::Receipt);
        assert_eq!(r.validated.value("total_amount"), Some("5.50"));
    }

    #[tokio::test]
    async fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.png");
        let err = simple_pipeline("x").process_file(&path).await.unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
        assert!(err.to_string().contains("absent.png"));
    }

    #[tokio::test]
    async fn undecodable_file_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let err = simple_pipeline("x").process_file(&path).await.unwrap_err();
        assert!(matches!(err, PipelineError::Input(InputError::Load { .. })));
    }
}
