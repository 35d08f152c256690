use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use idis_core::{ExtractedFieldSet, PipelineConfig, QualityScore, ValidatedFieldSet};
use idis_nlp::{clean_text, FieldExtractor, FieldValidator, RuleBasedRecognizer, VocabularyCorrector};
use serde::Serialize;
use tracing::info;

use idis_ocr::{ContrastStretch, EngineBenchmark, MultiScaleTextExtractor, OcrBackend, Preprocess, TextDetector};

use crate::cli::{BenchmarkArgs, EvaluateArgs, ExtractArgs, FieldsArgs};

pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(p) => {
            let config = PipelineConfig::load(p).with_context(|| format!("failed to load config {}", p.display()))?;
            info!(path = %p.display(), "configuration loaded");
            Ok(config)
        }
        None => Ok(PipelineConfig::default()),
    }
}

/// Treat the argument as a file when it names one, otherwise as the text itself.
fn text_or_file(arg: &str) -> Result<String> {
    let path = Path::new(arg);
    if path.is_file() {
        return fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()));
    }
    Ok(arg.to_string())
}

fn load_corrector(vocab: Option<&Path>) -> Result<VocabularyCorrector> {
    let Some(path) = vocab else {
        // An empty vocabulary leaves every word untouched.
        return Ok(VocabularyCorrector::from_words(Vec::<String>::new()));
    };
    let corpus = fs::read_to_string(path).with_context(|| format!("failed to read vocabulary {}", path.display()))?;
    let corrector = VocabularyCorrector::from_corpus(&corpus);
    info!(path = %path.display(), words = corrector.len(), "vocabulary loaded");
    Ok(corrector)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("failed to serialize output")?);
    Ok(())
}

// ── evaluate ─────────────────────────────────────────────────────────────────

pub fn evaluate(args: EvaluateArgs) -> Result<()> {
    let reference = text_or_file(&args.reference)?;
    let hypothesis = text_or_file(&args.hypothesis)?;
    let score = QualityScore::score(reference.as_str(), hypothesis.as_str());

    if args.json {
        return print_json(&score);
    }
    println!("{:<8}{:>8}", "metric", "value");
    println!("{:<8}{:>8.3}", "WER", score.wer);
    println!("{:<8}{:>8.3}", "CER", score.cer);
    Ok(())
}

// ── fields ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct FieldsReport {
    cleaned_text: String,
    fields: ExtractedFieldSet,
    validated: ValidatedFieldSet,
}

fn fields_report(text: &str, corrector: VocabularyCorrector, config: &PipelineConfig) -> FieldsReport {
    let cleaned_text = clean_text(text);
    let fields = FieldExtractor::new(RuleBasedRecognizer).extract(&cleaned_text);
    let validated = FieldValidator::new(corrector, &config.validation).validate(&fields);
    FieldsReport { cleaned_text, fields, validated }
}

pub fn fields(args: FieldsArgs, config: &PipelineConfig) -> Result<()> {
    let text = fs::read_to_string(&args.input).with_context(|| format!("failed to read {}", args.input.display()))?;
    let corrector = load_corrector(args.vocab.as_deref())?;
    let report = fields_report(&text, corrector, config);
    info!(input = %args.input.display(), fields = report.fields.len(), "fields extracted");
    print_json(&report)
}

// ── extract ──────────────────────────────────────────────────────────────────

#[cfg(feature = "tesseract")]
pub async fn extract(args: ExtractArgs, config: &PipelineConfig) -> Result<()> {
    use idis_core::PageSegMode;
    use idis_ocr::recognizer::tesseract_backend::{TesseractDetector, TesseractRecognizer};
    use idis_ocr::DocumentPipeline;

    let tessdata = args.tessdata.as_ref().map(|p| p.display().to_string());
    let corrector = load_corrector(args.vocab.as_deref())?;

    let mut pipeline = DocumentPipeline::new(
        TesseractDetector::new(tessdata.clone(), &args.lang, PageSegMode::Auto),
        RuleBasedRecognizer,
        corrector,
        config,
    );
    if !args.no_secondary {
        pipeline = pipeline.with_secondary(TesseractRecognizer::new(tessdata.clone(), &args.lang));
    }
    if let Some(lang) = &args.handwriting_lang {
        info!(lang = %lang, "handwriting engine enabled");
        pipeline = pipeline.with_handwriting_engine(TesseractRecognizer::new(tessdata, lang));
    }

    let result = pipeline
        .process_file(&args.image)
        .await
        .with_context(|| format!("failed to process {}", args.image.display()))?;
    print_json(&result)
}

#[cfg(not(feature = "tesseract"))]
pub async fn extract(args: ExtractArgs, _config: &PipelineConfig) -> Result<()> {
    anyhow::bail!(
        "cannot extract {}: no OCR engine compiled in, rebuild with `--features tesseract`",
        args.image.display()
    )
}

// ── benchmark ────────────────────────────────────────────────────────────────

#[cfg_attr(not(feature = "tesseract"), allow(dead_code))]
fn run_benchmark(
    image: &Path,
    ground_truth: &str,
    config: &PipelineConfig,
    primary: (&str, &dyn TextDetector),
    secondary: Option<(&str, &dyn OcrBackend)>,
) -> Result<Vec<EngineBenchmark>> {
    let img = idis_ocr::load_image(image).with_context(|| format!("failed to load {}", image.display()))?;
    let gray = ContrastStretch::default().apply(&img);
    let extractor = MultiScaleTextExtractor::new(config.extractor.clone());
    Ok(idis_ocr::benchmark(&gray, ground_truth, &extractor, primary, secondary))
}

#[cfg_attr(not(feature = "tesseract"), allow(dead_code))]
fn benchmark_table(rows: &[EngineBenchmark]) -> String {
    let mut out = format!("{:<24}{:>8}{:>8}{:>12}\n", "engine", "WER", "CER", "seconds");
    for row in rows {
        out.push_str(&format!(
            "{:<24}{:>8.3}{:>8.3}{:>12.3}\n",
            row.engine,
            row.wer,
            row.cer,
            row.elapsed.as_secs_f64()
        ));
    }
    out
}

#[cfg(feature = "tesseract")]
pub fn benchmark(args: BenchmarkArgs, config: &PipelineConfig) -> Result<()> {
    use idis_core::PageSegMode;
    use idis_ocr::recognizer::tesseract_backend::{TesseractDetector, TesseractRecognizer};

    let ground_truth = text_or_file(&args.ground_truth)?;
    let tessdata = args.tessdata.as_ref().map(|p| p.display().to_string());
    let detector = TesseractDetector::new(tessdata.clone(), &args.lang, PageSegMode::Auto);
    let recognizer = TesseractRecognizer::new(tessdata, &args.lang);

    let rows = run_benchmark(
        &args.image,
        &ground_truth,
        config,
        ("tesseract-multiscale", &detector),
        Some(("tesseract", &recognizer)),
    )?;
    if args.json {
        return print_json(&rows);
    }
    print!("{}", benchmark_table(&rows));
    Ok(())
}

#[cfg(not(feature = "tesseract"))]
pub fn benchmark(args: BenchmarkArgs, _config: &PipelineConfig) -> Result<()> {
    anyhow::bail!(
        "cannot benchmark {}: no OCR engine compiled in, rebuild with `--features tesseract`",
        args.image.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_text_is_not_a_file() {
        assert_eq!(text_or_file("hello world").unwrap(), "hello world");
    }

    #[test]
    fn file_arguments_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.txt");
        fs::write(&path, "ground truth").unwrap();
        assert_eq!(text_or_file(path.to_str().unwrap()).unwrap(), "ground truth");
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).is_err());
        assert_eq!(load_config(None).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idis.toml");
        fs::write(&path, "[extractor]\nrecheck_threshold = 0.6\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.extractor.recheck_threshold, 0.6);
        assert_eq!(config.extractor.scales, vec![1.0, 1.5, 2.0]);
    }

    #[test]
    fn fields_report_uses_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = dir.path().join("names.txt");
        fs::write(&vocab, "Jane Doe").unwrap();
        let corrector = load_corrector(Some(&vocab)).unwrap();

        let report = fields_report("Name: Jnae Doe\nTotal: $12.00", corrector, &PipelineConfig::default());
        assert_eq!(report.fields.get("name"), Some("Jnae Doe"));
        assert_eq!(report.validated.value("name"), Some("Jane Doe"));
        assert_eq!(report.validated.value("total_amount"), Some("12.00"));
    }

    #[test]
    fn missing_vocabulary_keeps_words() {
        let report = fields_report("Name: Jnae Doe", load_corrector(None).unwrap(), &PipelineConfig::default());
        assert_eq!(report.validated.value("name"), Some("Jnae Doe"));
        assert_eq!(report.validated.confidence("name"), Some(1.0));
    }

    fn write_page(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("page.png");
        image::GrayImage::from_pixel(32, 32, image::Luma([230u8])).save(&path).unwrap();
        path
    }

    #[test]
    fn benchmark_scores_each_engine() {
        let dir = tempfile::tempdir().unwrap();
        let page = write_page(dir.path());
        let primary = idis_ocr::MockDetector::fixed("Total 12.00", 0.95);
        let secondary = idis_ocr::MockRecognizer::new("Totl 12.00");

        let rows = run_benchmark(
            &page,
            "Total 12.00",
            &PipelineConfig::default(),
            ("primary", &primary),
            Some(("secondary", &secondary)),
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].wer, 0.0);
        assert_eq!(rows[1].wer, 0.5);

        let table = benchmark_table(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("engine"));
        assert!(lines[1].starts_with("primary") && lines[1].contains("0.000"));
        assert!(lines[2].starts_with("secondary") && lines[2].contains("0.500"));
    }

    #[test]
    fn benchmark_reports_unreadable_images() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.png");
        let primary = idis_ocr::MockDetector::empty();
        let err = run_benchmark(&missing, "x", &PipelineConfig::default(), ("primary", &primary), None).unwrap_err();
        assert!(err.to_string().contains("missing.png"));
    }

    #[cfg(not(feature = "tesseract"))]
    #[test]
    fn benchmark_without_engine_explains_the_feature() {
        let args = BenchmarkArgs {
            image: "scan.png".into(),
            ground_truth: "x".into(),
            json: false,
            tessdata: None,
            lang: "eng".into(),
        };
        let err = benchmark(args, &PipelineConfig::default()).unwrap_err();
        assert!(err.to_string().contains("--features tesseract"));
    }
}
