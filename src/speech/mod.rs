//! Speech: reading words aloud through the host synthesizer.
//!
//! - `host`: the capability trait and an always-unsupported host
//! - `espeak`: espeak-ng process host with cancellation
//! - `narrator`: one-utterance-at-a-time coordinator over a host

pub mod espeak;
pub mod host;
pub mod narrator;

use std::sync::Arc;

use crate::config::SpeechConfig;
use host::{SpeechHost, UnsupportedHost};

/// Pick the host for this run: espeak-ng when present and wanted, otherwise none.
pub async fn build_host(config: &SpeechConfig, disabled: bool) -> Arc<dyn SpeechHost> {
    if disabled {
        return Arc::new(UnsupportedHost);
    }
    let host = espeak::EspeakHost::detect(&config.program).await;
    if host.is_supported() {
        Arc::new(host)
    } else {
        Arc::new(UnsupportedHost)
    }
}
