pub mod benchmark;
pub mod extract;
pub mod handwriting;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod types;

pub use benchmark::{benchmark, EngineBenchmark};
pub use extract::{select_best, ExtractionOutcome, MultiScaleTextExtractor};
pub use handwriting::{HandwritingClassifier, HandwritingFeatures};
pub use pipeline::{DocumentPipeline, DocumentResult, PipelineError};
pub use preprocess::{load_image, load_image_from_bytes, ContrastStretch, InputError, Preprocess};
pub use recognizer::{Detection, MockDetector, MockRecognizer, OcrBackend, OcrError, RawDetection, TextDetector};
pub use types::{DocumentKind, ExtractionStrategy, Polarity, RecognitionCandidate};
