//! Speech narrator: one utterance at a time over an unreliable host.
//!
//! A new `speak` preempts whatever is speaking instead of queueing behind it.
//! The host's voice catalog may appear late, so it is refreshed on the host's
//! change notifications or on a fixed delay schedule, and `speak` waits a
//! bounded time for it before falling back to the host default.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::host::{SpeechHost, Utterance, Voice, ERROR_CANCELED};
use crate::config::SpeechConfig;
use crate::errors::SpeechError;

const FALLBACK_LANG: &str = "en-US";

#[derive(Debug, Clone, PartialEq)]
pub struct NarratorSettings {
    pub enabled: bool,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voice: Option<String>,
}

impl Default for NarratorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: 0.8,
            pitch: 1.0,
            volume: 0.8,
            voice: None,
        }
    }
}

/// Partial settings update. `None` leaves a field alone; `voice: Some(None)`
/// clears the configured voice.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub enabled: Option<bool>,
    pub rate: Option<f32>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
    pub voice: Option<Option<String>>,
}

/// Bounded waits for the voice catalog.
#[derive(Debug, Clone)]
pub struct VoicePolling {
    pub interval: Duration,
    pub attempts: u32,
    pub refresh_delays: Vec<Duration>,
    pub trust_voices_changed: bool,
}

impl From<&SpeechConfig> for VoicePolling {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.voice_poll_interval_ms),
            attempts: config.voice_poll_attempts,
            refresh_delays: config
                .voice_refresh_delays_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            trust_voices_changed: config.voices_changed_reliable,
        }
    }
}

pub struct Narrator {
    host: Arc<dyn SpeechHost>,
    settings: Mutex<NarratorSettings>,
    voices: Arc<Mutex<Vec<Voice>>>,
    polling: VoicePolling,
    in_flight: Mutex<Option<u64>>,
    next_id: AtomicU64,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

/// Configured name if present in the catalog, else the first English voice,
/// else the first voice. `None` leaves the choice to the host.
pub fn select_voice<'a>(voices: &'a [Voice], configured: Option<&str>) -> Option<&'a Voice> {
    configured
        .and_then(|name| voices.iter().find(|v| v.name == name))
        .or_else(|| {
            voices
                .iter()
                .find(|v| v.lang.to_lowercase().starts_with("en"))
        })
        .or_else(|| voices.first())
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Narrator {
    pub fn new(host: Arc<dyn SpeechHost>, settings: NarratorSettings, polling: VoicePolling) -> Self {
        Self {
            host,
            settings: Mutex::new(settings),
            voices: Arc::new(Mutex::new(Vec::new())),
            polling,
            in_flight: Mutex::new(None),
            next_id: AtomicU64::new(1),
            refresh_task: Mutex::new(None),
        }
    }

    /// Begin tracking the host's voice catalog. Must run inside a tokio runtime.
    pub fn start(&self) {
        if !self.host.is_supported() {
            info!("Speech synthesis not supported, narrator disabled");
            return;
        }

        let host = self.host.clone();
        let voices = self.voices.clone();
        let polling = self.polling.clone();
        let refresh = move |host: &Arc<dyn SpeechHost>| {
            let available = host.voices();
            debug!("Voice catalog: {} voices", available.len());
            *lock(&voices) = available;
        };

        let handle = tokio::spawn(async move {
            let changes = if polling.trust_voices_changed {
                host.voices_changed()
            } else {
                None
            };
            refresh(&host);

            if let Some(mut changes) = changes {
                while changes.changed().await.is_ok() {
                    refresh(&host);
                }
                return;
            }

            let started = Instant::now();
            for delay in &polling.refresh_delays {
                tokio::time::sleep_until(started + *delay).await;
                refresh(&host);
            }
            if host.voices().is_empty() {
                warn!("No speech voices available after initialization; the host default will be used");
            }
        });

        if let Some(previous) = lock(&self.refresh_task).replace(handle) {
            previous.abort();
        }
    }

    pub fn is_supported(&self) -> bool {
        self.host.is_supported()
    }

    #[cfg(test)]
    pub fn is_speaking(&self) -> bool {
        lock(&self.in_flight).is_some()
    }

    pub fn voices(&self) -> Vec<Voice> {
        lock(&self.voices).clone()
    }

    pub fn settings(&self) -> NarratorSettings {
        lock(&self.settings).clone()
    }

    /// Merge into the current settings. An utterance in flight keeps going.
    pub fn update_settings(&self, patch: SettingsPatch) {
        let mut settings = lock(&self.settings);
        if let Some(enabled) = patch.enabled {
            settings.enabled = enabled;
        }
        if let Some(rate) = patch.rate {
            settings.rate = rate;
        }
        if let Some(pitch) = patch.pitch {
            settings.pitch = pitch;
        }
        if let Some(volume) = patch.volume {
            settings.volume = volume;
        }
        if let Some(voice) = patch.voice {
            settings.voice = voice;
        }
    }

    /// The known catalog, or the host's once it appears. Waits up to
    /// `attempts * interval` when neither has any voices yet.
    pub async fn wait_for_voices(&self) -> Vec<Voice> {
        let known = self.voices();
        if !known.is_empty() {
            return known;
        }

        let mut available = self.host.voices();
        if available.is_empty() {
            debug!("Waiting for voices to load...");
            for _ in 0..self.polling.attempts {
                tokio::time::sleep(self.polling.interval).await;
                available = self.host.voices();
                if !available.is_empty() {
                    break;
                }
            }
        }
        if !available.is_empty() {
            *lock(&self.voices) = available.clone();
        }
        available
    }

    /// Speak `text`, resolving when the host finishes it.
    ///
    /// No-op when unsupported, disabled, or `text` is blank.
    pub async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        if !self.host.is_supported() {
            return Ok(());
        }
        let settings = self.settings();
        if !settings.enabled || text.trim().is_empty() {
            return Ok(());
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *lock(&self.in_flight) = Some(id);
        if self.host.is_busy() {
            debug!("Preempting in-flight utterance");
            self.host.cancel();
        }

        let voices = self.wait_for_voices().await;
        if *lock(&self.in_flight) != Some(id) {
            debug!("Dropping superseded request for \"{text}\"");
            return Err(SpeechError::Utterance {
                code: ERROR_CANCELED.to_string(),
            });
        }

        let voice = select_voice(&voices, settings.voice.as_deref()).cloned();
        let lang = voice
            .as_ref()
            .map(|v| v.lang.clone())
            .unwrap_or_else(|| FALLBACK_LANG.to_string());
        debug!(
            "Speaking \"{text}\" with voice {} ({lang})",
            voice.as_ref().map(|v| v.name.as_str()).unwrap_or("default")
        );

        // Another request may have started on the host while this one waited.
        if self.host.is_busy() {
            self.host.cancel();
        }
        let done = self.host.speak(Utterance {
            text: text.to_string(),
            voice,
            lang,
            rate: settings.rate,
            pitch: settings.pitch,
            volume: settings.volume,
        });
        let outcome = done.await;

        {
            let mut in_flight = lock(&self.in_flight);
            if *in_flight == Some(id) {
                *in_flight = None;
            }
        }

        match outcome {
            Ok(Ok(())) => {
                debug!("Speech ended for \"{text}\"");
                Ok(())
            }
            Ok(Err(code)) => Err(SpeechError::Utterance { code }),
            Err(_) => Err(SpeechError::Utterance {
                code: ERROR_CANCELED.to_string(),
            }),
        }
    }

    /// Cancel anything in flight. Safe to call repeatedly.
    pub fn stop(&self) {
        if !self.host.is_supported() {
            return;
        }
        self.host.cancel();
        *lock(&self.in_flight) = None;
    }
}

impl Drop for Narrator {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.refresh_task).take() {
            task.abort();
        }
    }
}
