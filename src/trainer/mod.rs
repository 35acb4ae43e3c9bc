//! Flashcard trainer: which word is on screen and what happens on advance.
//!
//! `Trainer` merges the persisted settings with transient state (current
//! index, whether the user has interacted yet), publishes a `View` for the
//! display, keeps the auto-advance timer in step with the index and reads
//! each newly shown word aloud once the user has interacted.

pub mod auto_advance;
pub mod navigator;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::PersistenceError;
use crate::notifier::Notifier;
use crate::settings::persistence::SettingsPersistence;
use crate::settings::editor::SettingsForm;
use crate::settings::{SettingsUpdate, SightWords};
use crate::speech::host::{ERROR_CANCELED, ERROR_INTERRUPTED};
use crate::speech::narrator::{Narrator, SettingsPatch};
use auto_advance::AutoAdvanceTimer;
use navigator::WordNavigator;

/// What the display should show.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct View {
    pub word: Option<String>,
    pub index: usize,
    pub total: usize,
    pub loading: bool,
    /// Speech is enabled and available but waits for the first interaction.
    pub awaiting_interaction: bool,
}

struct TrainerState {
    navigator: WordNavigator,
    record: Option<SightWords>,
    auto_advance: bool,
    speech_enabled: bool,
    user_interacted: bool,
    loading: bool,
}

struct Shared {
    state: Mutex<TrainerState>,
    timer: AutoAdvanceTimer,
    narrator: Arc<Narrator>,
    view_tx: watch::Sender<View>,
}

impl Shared {
    fn state(&self) -> std::sync::MutexGuard<'_, TrainerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn advance(self: &Arc<Self>, interacted: bool) {
        {
            let mut state = self.state();
            if interacted {
                state.user_interacted = true;
            }
            if state.navigator.advance(&mut rand::rng()).is_none() {
                return;
            }
        }
        self.index_set();
    }

    /// Publish the view, re-arm or drop the timer and narrate the shown word.
    fn index_set(self: &Arc<Self>) {
        let (view, schedule, speak) = {
            let state = self.state();
            let word = state.navigator.current_word().map(str::to_string);
            let view = View {
                word: word.clone(),
                index: state.navigator.current_index(),
                total: state.navigator.len(),
                loading: state.loading,
                awaiting_interaction: !state.user_interacted
                    && state.speech_enabled
                    && self.narrator.is_supported(),
            };
            let schedule = state.auto_advance && !state.navigator.is_empty();
            let speak = word.filter(|_| state.user_interacted && state.speech_enabled);
            (view, schedule, speak)
        };

        debug!("Showing word {} of {}", view.index + 1, view.total);
        self.view_tx.send_replace(view);

        if schedule {
            let shared = Arc::downgrade(self);
            self.timer.schedule(move || {
                if let Some(shared) = shared.upgrade() {
                    shared.advance(false);
                }
            });
        } else {
            self.timer.cancel();
        }

        if let Some(word) = speak {
            let narrator = self.narrator.clone();
            tokio::spawn(async move {
                match narrator.speak(&word).await {
                    Ok(()) => {}
                    Err(e) if matches!(e.code(), ERROR_INTERRUPTED | ERROR_CANCELED) => {
                        debug!("Speech for \"{word}\" superseded");
                    }
                    Err(e) => warn!("Failed to speak word \"{word}\": {e}"),
                }
            });
        }
    }
}

pub struct Trainer<P> {
    persistence: P,
    notifier: Notifier,
    shared: Arc<Shared>,
}

impl<P: SettingsPersistence> Trainer<P> {
    pub fn new(persistence: P, narrator: Arc<Narrator>, notifier: Notifier, dwell: Duration) -> Self {
        let (view_tx, _) = watch::channel(View {
            loading: true,
            ..View::default()
        });
        Self {
            persistence,
            notifier,
            shared: Arc::new(Shared {
                state: Mutex::new(TrainerState {
                    navigator: WordNavigator::new(Vec::new(), false),
                    record: None,
                    auto_advance: false,
                    speech_enabled: true,
                    user_interacted: false,
                    loading: true,
                }),
                timer: AutoAdvanceTimer::new(dwell),
                narrator,
                view_tx,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.shared.view_tx.subscribe()
    }

    pub fn view(&self) -> View {
        self.shared.view_tx.borrow().clone()
    }

    #[cfg(test)]
    pub fn current_index(&self) -> usize {
        self.shared.state().navigator.current_index()
    }

    #[cfg(test)]
    pub fn narrator(&self) -> &Arc<Narrator> {
        &self.shared.narrator
    }

    /// A settings form filled from the last loaded record.
    pub fn edit(&self) -> SettingsForm {
        SettingsForm::open(self.shared.state().record.as_ref())
    }

    /// Fetch settings from persistence. On failure the previous settings stay in effect.
    pub async fn load(&self) {
        match self.persistence.load().await {
            Ok(record) => self.apply(record.as_ref()),
            Err(e) => {
                self.notifier
                    .notify_error("Failed to load settings", &e.to_string());
                self.shared.state().loading = false;
                self.shared.index_set();
            }
        }
    }

    fn apply(&self, record: Option<&SightWords>) {
        {
            let mut state = self.shared.state();
            state.loading = false;
            state.record = record.cloned();
            match record {
                Some(r) => {
                    state.navigator.set_words(r.words.clone(), r.random_order);
                    state.auto_advance = r.auto_advance;
                    state.speech_enabled = r.speech_enabled;
                }
                None => {
                    state.navigator.set_words(Vec::new(), false);
                    state.auto_advance = false;
                    state.speech_enabled = true;
                }
            }
            info!(
                "Settings applied: {} words, random={}, auto_advance={} ({:?})",
                state.navigator.len(),
                record.is_some_and(|r| r.random_order),
                state.auto_advance,
                self.shared.timer.dwell()
            );
        }

        if let Some(r) = record {
            self.shared.narrator.update_settings(SettingsPatch {
                enabled: Some(r.speech_enabled),
                rate: Some(r.rate()),
                pitch: Some(r.pitch()),
                volume: None,
                voice: Some(r.speech_voice.clone().filter(|v| !v.is_empty())),
            });
        }
        self.shared.index_set();
    }

    /// User-driven advance (click, space). Counts as interaction, which unlocks speech.
    pub fn next_word(&self) {
        self.shared.advance(true);
    }

    /// Submit a full replacement and reload. The index returns to the first
    /// word whether or not the save succeeds.
    pub async fn save(&self, update: &SettingsUpdate) -> Result<SightWords, PersistenceError> {
        let result = self.persistence.save(update).await;
        self.shared.state().navigator.reset();

        match &result {
            Ok(_) => {
                self.notifier
                    .notify("Settings saved", "Your sight words have been updated successfully.");
                self.load().await;
            }
            Err(e) => {
                warn!("Failed to save settings: {e}");
                self.notifier
                    .notify_error("Failed to save settings", "Please try again later.");
                self.shared.index_set();
            }
        }
        result
    }

    /// Stop the timer and any speech.
    pub fn shutdown(&self) {
        self.shared.timer.cancel();
        self.shared.narrator.stop();
    }
}

impl<P> Drop for Trainer<P> {
    fn drop(&mut self) {
        self.shared.timer.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::persistence::tests::update;
    use crate::settings::NewSightWords;
    use crate::speech::host::UnsupportedHost;
    use crate::speech::narrator::tests::{polling, voice, FakeHost};
    use crate::speech::narrator::NarratorSettings;

    const DWELL: Duration = Duration::from_millis(3000);

    #[derive(Default)]
    struct MemoryPersistence {
        record: Mutex<Option<SightWords>>,
        fail_saves: bool,
    }

    impl MemoryPersistence {
        fn with(update: SettingsUpdate) -> Self {
            Self {
                record: Mutex::new(Some(
                    NewSightWords::for_user("default", update).into_record(1),
                )),
                fail_saves: false,
            }
        }
    }

    impl SettingsPersistence for MemoryPersistence {
        async fn load(&self) -> Result<Option<SightWords>, PersistenceError> {
            Ok(self.record.lock().unwrap().clone())
        }

        async fn save(&self, update: &SettingsUpdate) -> Result<SightWords, PersistenceError> {
            if self.fail_saves {
                return Err(PersistenceError::Status {
                    status: 500,
                    message: "Failed to update sight words".into(),
                });
            }
            let record = NewSightWords::for_user("default", update.clone()).into_record(1);
            *self.record.lock().unwrap() = Some(record.clone());
            Ok(record)
        }
    }

    fn silent_narrator() -> Arc<Narrator> {
        Arc::new(Narrator::new(
            Arc::new(UnsupportedHost),
            NarratorSettings::default(),
            polling(),
        ))
    }

    fn trainer(persistence: MemoryPersistence) -> Trainer<MemoryPersistence> {
        Trainer::new(persistence, silent_narrator(), Notifier::new(false), DWELL)
    }

    #[tokio::test]
    async fn starts_loading_then_shows_first_word() {
        let trainer = trainer(MemoryPersistence::with(update(&["cat", "dog"])));
        assert!(trainer.view().loading);

        trainer.load().await;
        let view = trainer.view();
        assert!(!view.loading);
        assert_eq!(view.word.as_deref(), Some("cat"));
        assert_eq!((view.index, view.total), (0, 2));
    }

    #[tokio::test]
    async fn no_record_means_empty_list() {
        let trainer = trainer(MemoryPersistence::default());
        trainer.load().await;
        trainer.next_word();
        assert_eq!(trainer.current_index(), 0);
        assert_eq!(trainer.view().word, None);
    }

    #[tokio::test]
    async fn sequential_advance_wraps() {
        let trainer = trainer(MemoryPersistence::with(update(&["a", "b", "c"])));
        trainer.load().await;
        let seen: Vec<usize> = (0..4)
            .map(|_| {
                trainer.next_word();
                trainer.current_index()
            })
            .collect();
        assert_eq!(seen, vec![1, 2, 0, 1]);
    }

    #[tokio::test]
    async fn save_resets_index_and_reloads() {
        let trainer = trainer(MemoryPersistence::with(update(&["a", "b", "c"])));
        trainer.load().await;
        trainer.next_word();
        trainer.next_word();
        assert_eq!(trainer.current_index(), 2);

        let saved = trainer.save(&update(&["x", "y", "z", "w"])).await.unwrap();
        assert_eq!(saved.words.len(), 4);
        assert_eq!(trainer.current_index(), 0);
        assert_eq!(trainer.view().word.as_deref(), Some("x"));
        assert_eq!(trainer.view().total, 4);
    }

    #[tokio::test]
    async fn failed_save_still_resets_and_keeps_prior_words() {
        let mut persistence = MemoryPersistence::with(update(&["a", "b", "c"]));
        persistence.fail_saves = true;
        let trainer = trainer(persistence);
        trainer.load().await;
        trainer.next_word();

        assert!(trainer.save(&update(&["x"])).await.is_err());
        assert_eq!(trainer.current_index(), 0);
        assert_eq!(trainer.view().word.as_deref(), Some("a"));
        assert_eq!(trainer.view().total, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_advance_flips_back_and_forth() {
        let mut settings = update(&["cat", "dog"]);
        settings.auto_advance = true;
        let trainer = trainer(MemoryPersistence::with(settings));
        trainer.load().await;
        assert_eq!(trainer.current_index(), 0);

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert_eq!(trainer.current_index(), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(trainer.current_index(), 1);

        tokio::time::sleep(Duration::from_millis(2998)).await;
        assert_eq!(trainer.current_index(), 1);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(trainer.current_index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_advance_restarts_the_dwell() {
        let mut settings = update(&["a", "b", "c"]);
        settings.auto_advance = true;
        let trainer = trainer(MemoryPersistence::with(settings));
        trainer.load().await;

        tokio::time::sleep(Duration::from_millis(2000)).await;
        trainer.next_word();
        assert_eq!(trainer.current_index(), 1);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(trainer.current_index(), 1);
        tokio::time::sleep(Duration::from_millis(501)).await;
        assert_eq!(trainer.current_index(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn disabling_auto_advance_cancels_the_timer() {
        let mut settings = update(&["a", "b"]);
        settings.auto_advance = true;
        let trainer = trainer(MemoryPersistence::with(settings));
        trainer.load().await;

        trainer.save(&update(&["a", "b"])).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(trainer.current_index(), 0);
    }

    fn speaking_trainer(settings: SettingsUpdate) -> (Trainer<MemoryPersistence>, Arc<FakeHost>) {
        let host = FakeHost::new(vec![voice("English", "en")]);
        let narrator = Arc::new(Narrator::new(
            host.clone(),
            NarratorSettings::default(),
            polling(),
        ));
        let trainer = Trainer::new(
            MemoryPersistence::with(settings),
            narrator,
            Notifier::new(false),
            DWELL,
        );
        (trainer, host)
    }

    #[tokio::test]
    async fn speech_waits_for_first_interaction() {
        let (trainer, host) = speaking_trainer(update(&["cat", "dog"]));
        trainer.load().await;
        tokio::task::yield_now().await;
        assert!(trainer.view().awaiting_interaction);
        assert_eq!(host.speak_count(), 0);

        trainer.next_word();
        tokio::task::yield_now().await;
        assert!(!trainer.view().awaiting_interaction);
        assert_eq!(host.calls(), vec!["speak:dog"]);
    }

    #[tokio::test]
    async fn empty_list_advance_never_speaks() {
        let (trainer, host) = speaking_trainer(update(&[]));
        trainer.load().await;
        trainer.next_word();
        trainer.next_word();
        tokio::task::yield_now().await;
        assert_eq!(trainer.current_index(), 0);
        assert_eq!(host.speak_count(), 0);
    }

    #[tokio::test]
    async fn speech_settings_flow_into_narrator() {
        let (trainer, _host) = speaking_trainer(update(&["cat"]));
        let mut settings = update(&["cat"]);
        settings.speech_rate = "1.5".into();
        settings.speech_voice = Some("English".into());
        trainer.save(&settings).await.unwrap();

        let narrator = trainer.narrator().settings();
        assert_eq!(narrator.rate, 1.5);
        assert_eq!(narrator.voice.as_deref(), Some("English"));
        assert_eq!(narrator.volume, 0.8);
    }

    #[tokio::test(start_paused = true)]
    async fn single_word_auto_advance_repeats_the_word() {
        let mut settings = update(&["cat"]);
        settings.auto_advance = true;
        let (trainer, host) = speaking_trainer(settings);
        trainer.load().await;

        tokio::time::sleep(Duration::from_millis(3001)).await;
        assert_eq!(host.speak_count(), 0);

        trainer.next_word();
        tokio::task::yield_now().await;
        assert_eq!(host.calls(), vec!["speak:cat"]);
        host.finish(Ok(()));

        tokio::time::sleep(Duration::from_millis(3001)).await;
        assert_eq!(trainer.current_index(), 0);
        assert_eq!(host.calls(), vec!["speak:cat", "speak:cat"]);
        host.finish(Ok(()));

        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(host.speak_count(), 3);
    }

    #[tokio::test]
    async fn edit_starts_from_loaded_settings_and_saves_through() {
        let trainer = trainer(MemoryPersistence::with(update(&["a", "b", "c"])));
        assert_eq!(trainer.edit(), SettingsForm::default());

        trainer.load().await;
        trainer.next_word();
        let mut form = trainer.edit();
        assert_eq!(form.parse_words(), vec!["a", "b", "c"]);
        assert!(!form.random_order);

        form.random_order = true;
        form.words_text.push_str("\nd");
        let saved = trainer.save(&form.to_update()).await.unwrap();
        assert!(saved.random_order);
        assert_eq!(trainer.current_index(), 0);
        assert_eq!(trainer.view().total, 4);
        assert!(trainer.edit().random_order);
    }
}
