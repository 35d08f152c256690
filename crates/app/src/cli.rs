use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "idis",
    version,
    about = "Document field extraction and OCR quality tooling"
)]
pub struct Cli {
    /// Pipeline configuration (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Word and character error rate of a hypothesis against a reference.
    Evaluate(EvaluateArgs),
    /// Extract and validate fields from a text file.
    Fields(FieldsArgs),
    /// Run one image through the full OCR pipeline.
    Extract(ExtractArgs),
    /// Score each OCR engine on one image against a known transcript.
    Benchmark(BenchmarkArgs),
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// Reference transcript, as literal text or a file path.
    pub reference: String,

    /// Recognized text, as literal text or a file path.
    pub hypothesis: String,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FieldsArgs {
    pub input: PathBuf,

    /// Word list or corpus used for spelling correction.
    #[arg(long)]
    pub vocab: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    pub image: PathBuf,

    #[arg(long)]
    pub vocab: Option<PathBuf>,

    /// Directory holding Tesseract language data.
    #[arg(long)]
    pub tessdata: Option<PathBuf>,

    #[arg(long, default_value = "eng")]
    pub lang: String,

    /// Skip merging the secondary engine's output.
    #[arg(long, default_value_t = false)]
    pub no_secondary: bool,

    /// Tesseract model trained on handwriting (for example a custom
    /// `traineddata` under --tessdata). Pages the classifier flags as
    /// handwritten are read with it first; without it every page takes
    /// the general multi-scale path.
    #[arg(long, value_name = "LANG")]
    pub handwriting_lang: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct BenchmarkArgs {
    pub image: PathBuf,

    /// Ground-truth transcript, as literal text or a file path.
    pub ground_truth: String,

    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Directory holding Tesseract language data.
    #[arg(long)]
    pub tessdata: Option<PathBuf>,

    #[arg(long, default_value = "eng")]
    pub lang: String,
}
