//! sight-words: sight-word flashcard trainer with spoken words.

mod api;
mod config;
mod display;
mod errors;
mod notifier;
mod settings;
mod speech;
mod trainer;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use settings::editor::SettingsForm;
use settings::persistence::{Backend, SettingsPersistence};
use settings::store::MemStorage;
use speech::narrator::{Narrator, NarratorSettings, VoicePolling};

#[derive(Parser, Debug)]
#[command(name = "sight-words", about = "Sight-word flashcard trainer")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the settings HTTP service
    ///
    /// The store starts with a built-in word list so the trainer has something
    /// to show. Pass --no-seed (or set server.seed_defaults: false) to start
    /// empty; GET then answers 404 until the first POST.
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Start with an empty store instead of the built-in word list
        #[arg(long)]
        no_seed: bool,
    },
    /// Show flashcards in the terminal
    Practice {
        /// Use the local settings file instead of the service
        #[arg(long)]
        offline: bool,

        /// Never read words aloud
        #[arg(long)]
        no_speech: bool,
    },
    /// Edit and save the settings
    Configure {
        /// Replace the word list with the lines of this file
        #[arg(long, conflicts_with = "reset_words")]
        words_file: Option<PathBuf>,

        /// Replace the word list with the built-in default list
        #[arg(long)]
        reset_words: bool,

        #[arg(long)]
        random_order: Option<bool>,

        #[arg(long)]
        auto_advance: Option<bool>,

        /// Enable or disable speech
        #[arg(long)]
        speech: Option<bool>,

        /// Speech rate (0.5 to 2.0)
        #[arg(long)]
        rate: Option<f32>,

        /// Speech pitch (0.5 to 2.0)
        #[arg(long)]
        pitch: Option<f32>,

        /// Voice name
        #[arg(long, conflicts_with = "default_voice")]
        voice: Option<String>,

        /// Use the system default voice
        #[arg(long)]
        default_voice: bool,

        /// Use the local settings file instead of the service
        #[arg(long)]
        offline: bool,
    },
    /// List the voices the speech host offers
    Voices,
}

fn log_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug,hyper=info,reqwest=info")
        } else {
            EnvFilter::new("info,hyper=warn,reqwest=warn")
        }
    })
}

/// The practice screen owns the terminal, so its logs go to a file.
fn init_file_logging(verbose: bool) -> Result<PathBuf, std::io::Error> {
    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sight-words");
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("practice.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(path)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if matches!(args.command, Command::Practice { .. }) {
        init_file_logging(args.verbose)?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(log_filter(args.verbose))
            .with_writer(std::io::stderr)
            .init();
    }

    info!("sight-words starting");
    let config = config::Config::load(args.config.as_deref());

    match args.command {
        Command::Serve { port, no_seed } => {
            let store = if config.server.seeds(no_seed) {
                MemStorage::seeded()?
            } else {
                MemStorage::new()
            };
            let addr = format!(
                "{}:{}",
                config.server.host,
                port.unwrap_or(config.server.port)
            );
            api::serve(
                api::ApiState {
                    store: Arc::new(store),
                },
                &addr,
            )
            .await?;
        }

        Command::Practice { offline, no_speech } => {
            let persistence = Backend::from_config(&config.storage, offline)?;
            let host = speech::build_host(&config.speech, no_speech).await;
            let narrator = Arc::new(Narrator::new(
                host,
                NarratorSettings {
                    volume: config.speech.volume,
                    ..NarratorSettings::default()
                },
                VoicePolling::from(&config.speech),
            ));
            narrator.start();

            let trainer = trainer::Trainer::new(
                persistence,
                narrator,
                notifier::Notifier::new(config.feedback.notifications),
                config.trainer.dwell(),
            );
            trainer.load().await;
            display::run(&trainer).await?;
            info!("Practice finished");
        }

        Command::Configure {
            words_file,
            reset_words,
            random_order,
            auto_advance,
            speech,
            rate,
            pitch,
            voice,
            default_voice,
            offline,
        } => {
            let persistence = Backend::from_config(&config.storage, offline)?;
            let current = persistence.load().await?;
            let mut form = SettingsForm::open(current.as_ref());

            if let Some(path) = words_file {
                form.words_text = std::fs::read_to_string(&path)?;
            }
            if reset_words {
                form.reset_to_default();
            }
            if let Some(v) = random_order {
                form.random_order = v;
            }
            if let Some(v) = auto_advance {
                form.auto_advance = v;
            }
            if let Some(v) = speech {
                form.speech_enabled = v;
            }
            if let Some(v) = rate {
                form.set_rate(v);
            }
            if let Some(v) = pitch {
                form.set_pitch(v);
            }
            if voice.is_some() {
                form.set_voice(voice);
            } else if default_voice {
                form.set_voice(None);
            }

            let saved = persistence.save(&form.to_update()).await?;
            println!("Saved {} words", saved.words.len());
            println!("  random order: {}", saved.random_order);
            println!("  auto advance: {}", saved.auto_advance);
            println!(
                "  speech: {} (rate {}, pitch {}, voice {})",
                saved.speech_enabled,
                saved.speech_rate,
                saved.speech_pitch,
                saved.speech_voice.as_deref().unwrap_or("system default")
            );
        }

        Command::Voices => {
            let host = speech::build_host(&config.speech, false).await;
            let narrator = Narrator::new(
                host,
                NarratorSettings::default(),
                VoicePolling::from(&config.speech),
            );
            narrator.start();
            if !narrator.is_supported() {
                println!("Speech synthesis is not available ({} not found)", config.speech.program);
                return Ok(());
            }
            let voices = narrator.wait_for_voices().await;
            if voices.is_empty() {
                println!("No voices reported");
            }
            for v in voices {
                println!("{:<24} {}", v.name, v.lang);
            }
        }
    }

    Ok(())
}
