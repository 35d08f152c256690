use idis_core::PageSegMode;
use image::GrayImage;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Tesseract not available, build with the `tesseract` feature")]
    NotAvailable,
}

/// Polygon around a detection, as (x, y) corner points.
pub type Region = Vec<[f32; 2]>;

/// A detection in whichever shape the engine emits it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawDetection {
    Triple(Region, String, f64),
    /// No confidence reported.
    Pair(Region, String),
    /// Key/value record with `text` and `confidence` keys.
    Mapping(Map<String, Value>),
    Bare(String),
}

/// A detection normalized to text plus a confidence in 0.0–1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub text: String,
    pub confidence: f32,
}

impl From<RawDetection> for Detection {
    fn from(raw: RawDetection) -> Self {
        let (text, confidence) = match raw {
            RawDetection::Triple(_, text, conf) => (text, conf),
            RawDetection::Pair(_, text) => (text, 0.0),
            RawDetection::Mapping(map) => {
                let text = match map.get("text") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                };
                let conf = match map.get("confidence") {
                    Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
                    Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
                    _ => 0.0,
                };
                (text, conf)
            }
            RawDetection::Bare(text) => (text, 0.0),
        };
        let confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) as f32 };
        Detection { text: text.trim().to_string(), confidence }
    }
}

/// Space-joined text of the non-empty detections and their mean confidence,
/// rounded to 3 decimals (0.0 when nothing was detected).
pub fn summarize(detections: impl IntoIterator<Item = RawDetection>) -> (String, f32) {
    let kept: Vec<Detection> = detections
        .into_iter()
        .map(Detection::from)
        .filter(|d| !d.text.is_empty())
        .collect();
    if kept.is_empty() {
        return (String::new(), 0.0);
    }
    let mean = kept.iter().map(|d| d.confidence as f64).sum::<f64>() / kept.len() as f64;
    let text = kept.iter().map(|d| d.text.as_str()).collect::<Vec<_>>().join(" ");
    (text, ((mean * 1000.0).round() / 1000.0) as f32)
}

/// Primary engine: reports per-detection confidence.
pub trait TextDetector: Send + Sync {
    fn detect(&self, image: &GrayImage) -> Result<Vec<RawDetection>, OcrError>;
}

/// Secondary / handwriting engine: raw text only, no confidence signal.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image: &GrayImage, mode: PageSegMode) -> Result<String, OcrError>;

    /// Whether the engine can be used at all in this process.
    fn is_available(&self) -> bool {
        true
    }
}

// ── Mock engines (always available, used for tests) ──────────────────────────

type DetectFn = dyn Fn(&GrayImage) -> Result<Vec<RawDetection>, OcrError> + Send + Sync;

/// Detector driven by a closure over the input image.
pub struct MockDetector {
    detect: Box<DetectFn>,
}

impl MockDetector {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&GrayImage) -> Result<Vec<RawDetection>, OcrError> + Send + Sync + 'static,
    {
        Self { detect: Box::new(f) }
    }

    /// A single detection with the same text and confidence for every image.
    pub fn fixed(text: impl Into<String>, confidence: f64) -> Self {
        let text = text.into();
        Self::from_fn(move |_| Ok(vec![RawDetection::Triple(Vec::new(), text.clone(), confidence)]))
    }

    pub fn empty() -> Self {
        Self::from_fn(|_| Ok(Vec::new()))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::from_fn(move |_| Err(OcrError::Engine(message.clone())))
    }
}

impl TextDetector for MockDetector {
    fn detect(&self, image: &GrayImage) -> Result<Vec<RawDetection>, OcrError> {
        (self.detect)(image)
    }
}

/// Returns a pre-set string, or fails, regardless of the image.
pub struct MockRecognizer {
    pub text: String,
    fail: bool,
    available: bool,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), fail: false, available: true }
    }

    pub fn failing() -> Self {
        Self { text: String::new(), fail: true, available: true }
    }

    pub fn unavailable() -> Self {
        Self { text: String::new(), fail: false, available: false }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image: &GrayImage, _mode: PageSegMode) -> Result<String, OcrError> {
        if !self.available {
            return Err(OcrError::NotAvailable);
        }
        if self.fail {
            return Err(OcrError::Engine("mock recognizer failure".into()));
        }
        Ok(self.text.clone())
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

// ── Tesseract backends (optional, gated behind `tesseract` feature) ──────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError, RawDetection, TextDetector};
    use crate::preprocess::encode_png;
    use idis_core::PageSegMode;
    use image::GrayImage;
    use leptess::{LepTess, Variable};

    fn run(
        data_path: Option<&str>,
        lang: &str,
        image: &GrayImage,
        mode: PageSegMode,
    ) -> Result<LepTess, OcrError> {
        let mut lt = LepTess::new(data_path, lang).map_err(|e| OcrError::Engine(e.to_string()))?;
        lt.set_variable(Variable::TesseditPagesegMode, &mode.tesseract_value().to_string())
            .map_err(|e| OcrError::Engine(e.to_string()))?;
        let png = encode_png(image).map_err(|e| OcrError::ImageDecode(e.to_string()))?;
        lt.set_image_from_mem(&png)
            .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
        Ok(lt)
    }

    /// Tesseract as a raw-text engine.
    pub struct TesseractRecognizer {
        data_path: Option<String>,
        lang: String,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>, lang: &str) -> Self {
            Self { data_path, lang: lang.to_string() }
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image: &GrayImage, mode: PageSegMode) -> Result<String, OcrError> {
            let mut lt = run(self.data_path.as_deref(), &self.lang, image, mode)?;
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }
    }

    /// Tesseract as a primary engine: the page text as one detection with
    /// the mean word confidence.
    pub struct TesseractDetector {
        data_path: Option<String>,
        lang: String,
        mode: PageSegMode,
    }

    impl TesseractDetector {
        pub fn new(data_path: Option<String>, lang: &str, mode: PageSegMode) -> Self {
            Self { data_path, lang: lang.to_string(), mode }
        }
    }

    impl TextDetector for TesseractDetector {
        fn detect(&self, image: &GrayImage) -> Result<Vec<RawDetection>, OcrError> {
            let mut lt = run(self.data_path.as_deref(), &self.lang, image, self.mode)?;
            let text = lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))?;
            let confidence = lt.mean_text_conf() as f64 / 100.0;
            Ok(vec![RawDetection::Triple(Vec::new(), text, confidence)])
        }
    }
}
