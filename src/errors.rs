use thiserror::Error;

use crate::settings::validate::FieldErrors;

/// Failures inside the settings store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("settings store lock poisoned")]
    Poisoned,
}

/// Failures loading or saving the settings record through a persistence backend.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("HTTP error: {0}")]
    Http(Box<reqwest::Error>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings rejected: {message}")]
    Rejected {
        message: String,
        errors: FieldErrors,
    },

    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },
}

impl From<reqwest::Error> for PersistenceError {
    fn from(error: reqwest::Error) -> Self {
        PersistenceError::Http(Box::new(error))
    }
}

/// Failures surfaced by the speech narrator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    #[error("Speech synthesis failed: {code}")]
    Utterance { code: String },
}

impl SpeechError {
    pub fn code(&self) -> &str {
        match self {
            SpeechError::Utterance { code } => code,
        }
    }
}
