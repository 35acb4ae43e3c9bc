//! On-device speech through the `espeak-ng` command-line synthesizer.
//!
//! One child process per utterance. Cancelling kills the child. The voice
//! catalog is read asynchronously from `--voices` after detection and
//! announced on a watch channel.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::process::Command;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use super::host::{
    SpeechHost, Utterance, UtteranceDone, Voice, ERROR_INTERRUPTED, ERROR_SYNTHESIS_FAILED,
    ERROR_SYNTHESIS_UNAVAILABLE,
};

/// espeak-ng's default speaking speed, in words per minute.
const BASE_WPM: f32 = 175.0;
const BASE_PITCH: f32 = 50.0;
const BASE_AMPLITUDE: f32 = 100.0;

struct ActiveUtterance {
    id: u64,
    kill: oneshot::Sender<()>,
}

pub struct EspeakHost {
    program: String,
    supported: bool,
    voices: Arc<Mutex<Vec<Voice>>>,
    voices_tx: watch::Sender<usize>,
    active: Arc<Mutex<Option<ActiveUtterance>>>,
    next_id: AtomicU64,
}

impl EspeakHost {
    /// Probe for the synthesizer and start loading its voice catalog.
    pub async fn detect(program: &str) -> Self {
        let supported = Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false);

        let (voices_tx, _) = watch::channel(0);
        let host = Self {
            program: program.to_string(),
            supported,
            voices: Arc::new(Mutex::new(Vec::new())),
            voices_tx,
            active: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
        };

        if supported {
            info!("Speech host: {program}");
            host.spawn_catalog_load();
        } else {
            warn!("{program} not found, speech is unavailable");
        }
        host
    }

    fn spawn_catalog_load(&self) {
        let program = self.program.clone();
        let voices = self.voices.clone();
        let voices_tx = self.voices_tx.clone();

        tokio::spawn(async move {
            let output = match Command::new(&program).arg("--voices").output().await {
                Ok(o) if o.status.success() => o,
                Ok(o) => {
                    warn!("{program} --voices exited with {}", o.status);
                    return;
                }
                Err(e) => {
                    warn!("Failed to list voices: {e}");
                    return;
                }
            };
            let catalog = parse_voices(&String::from_utf8_lossy(&output.stdout));
            debug!("Loaded {} voices from {program}", catalog.len());
            let count = catalog.len();
            *voices.lock().unwrap_or_else(PoisonError::into_inner) = catalog;
            voices_tx.send_replace(count);
        });
    }

    fn args(utterance: &Utterance) -> Vec<String> {
        let voice = utterance
            .voice
            .as_ref()
            .map(|v| v.lang.clone())
            .unwrap_or_else(|| utterance.lang.to_lowercase());
        vec![
            "-v".into(),
            voice,
            "-s".into(),
            ((BASE_WPM * utterance.rate).round() as u32).to_string(),
            "-p".into(),
            ((BASE_PITCH * utterance.pitch).round().clamp(0.0, 99.0) as u32).to_string(),
            "-a".into(),
            ((BASE_AMPLITUDE * utterance.volume).round().clamp(0.0, 200.0) as u32).to_string(),
            "--".into(),
            utterance.text.clone(),
        ]
    }
}

impl SpeechHost for EspeakHost {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_busy(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn speak(&self, utterance: Utterance) -> UtteranceDone {
        let (done_tx, done_rx) = oneshot::channel();
        if !self.supported {
            let _ = done_tx.send(Err(ERROR_SYNTHESIS_UNAVAILABLE.to_string()));
            return done_rx;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (kill_tx, kill_rx) = oneshot::channel();
        // A previous utterance whose kill sender is dropped here stops too.
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(ActiveUtterance { id, kill: kill_tx });

        let program = self.program.clone();
        let args = Self::args(&utterance);
        let active = self.active.clone();

        tokio::spawn(async move {
            let outcome = match Command::new(&program)
                .args(&args)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()
            {
                Err(e) => {
                    warn!("Failed to start {program}: {e}");
                    Err(ERROR_SYNTHESIS_UNAVAILABLE.to_string())
                }
                Ok(mut child) => {
                    tokio::select! {
                        status = child.wait() => match status {
                            Ok(s) if s.success() => Ok(()),
                            Ok(s) => {
                                warn!("{program} exited with {s}");
                                Err(ERROR_SYNTHESIS_FAILED.to_string())
                            }
                            Err(e) => {
                                warn!("Failed waiting on {program}: {e}");
                                Err(ERROR_SYNTHESIS_FAILED.to_string())
                            }
                        },
                        _ = kill_rx => {
                            let _ = child.kill().await;
                            Err(ERROR_INTERRUPTED.to_string())
                        }
                    }
                }
            };

            {
                let mut slot = active.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.as_ref().is_some_and(|a| a.id == id) {
                    *slot = None;
                }
            }
            let _ = done_tx.send(outcome);
        });

        done_rx
    }

    fn cancel(&self) {
        let taken = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(active) = taken {
            debug!("Cancelling utterance {}", active.id);
            let _ = active.kill.send(());
        }
    }

    fn voices_changed(&self) -> Option<watch::Receiver<usize>> {
        Some(self.voices_tx.subscribe())
    }
}

/// Parse `espeak-ng --voices` output.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  af              --/M      Afrikaans          gmw/af
///  2  en-us           --/M      English_(America)  gmw/en-US            (en 3)
/// ```
fn parse_voices(output: &str) -> Vec<Voice> {
    output
        .lines()
        .filter(|line| !line.trim_start().starts_with("Pty"))
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let _priority = cols.next()?;
            let lang = cols.next()?;
            let _age_gender = cols.next()?;
            let name = cols.next()?;
            Some(Voice {
                name: name.replace('_', " "),
                lang: lang.to_string(),
            })
        })
        .collect()
}
