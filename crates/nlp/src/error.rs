use thiserror::Error;

/// Failure inside an NLP collaborator (entity recognizer, spelling corrector).
/// Always recovered by the caller; never surfaces from extraction or validation.
#[derive(Debug, Error)]
pub enum NlpError {
    #[error("NLP engine error: {0}")]
    Engine(String),
}
