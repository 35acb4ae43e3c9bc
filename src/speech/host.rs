//! The host speech-synthesis capability the narrator drives.

use tokio::sync::{oneshot, watch};

/// Utterance error codes reported by hosts.
pub const ERROR_INTERRUPTED: &str = "interrupted";
pub const ERROR_CANCELED: &str = "canceled";
pub const ERROR_SYNTHESIS_FAILED: &str = "synthesis-failed";
pub const ERROR_SYNTHESIS_UNAVAILABLE: &str = "synthesis-unavailable";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    /// BCP 47-ish language tag, e.g. `en-us`.
    pub lang: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: Option<Voice>,
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

/// Resolves once the utterance ends (`Ok`) or errors (`Err(code)`).
pub type UtteranceDone = oneshot::Receiver<Result<(), String>>;

pub trait SpeechHost: Send + Sync {
    fn is_supported(&self) -> bool;

    /// Current voice catalog. May be empty while the host is still initializing.
    fn voices(&self) -> Vec<Voice>;

    /// True while an utterance is speaking or queued.
    fn is_busy(&self) -> bool;

    fn speak(&self, utterance: Utterance) -> UtteranceDone;

    /// Stop whatever is speaking or queued. The stopped utterance resolves
    /// with [`ERROR_INTERRUPTED`].
    fn cancel(&self);

    /// Catalog-changed notifications, if the host emits them.
    fn voices_changed(&self) -> Option<watch::Receiver<usize>>;
}

/// Host without any speech capability.
pub struct UnsupportedHost;

impl SpeechHost for UnsupportedHost {
    fn is_supported(&self) -> bool {
        false
    }

    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    fn is_busy(&self) -> bool {
        false
    }

    fn speak(&self, _utterance: Utterance) -> UtteranceDone {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(ERROR_SYNTHESIS_UNAVAILABLE.to_string()));
        rx
    }

    fn cancel(&self) {}

    fn voices_changed(&self) -> Option<watch::Receiver<usize>> {
        None
    }
}
