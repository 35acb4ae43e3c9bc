//! Terminal word display.
//!
//! Raw-mode full-screen view of the current word. Space or Enter advances,
//! q / Esc / Ctrl-C quits. The letter keys toggle a setting and save it, or
//! re-read the settings. Key events are read on a blocking thread and
//! forwarded over a tokio channel.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, execute, queue};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::settings::editor::SettingsForm;
use crate::settings::persistence::SettingsPersistence;
use crate::trainer::{Trainer, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayAction {
    Advance,
    Reload,
    ToggleRandomOrder,
    ToggleAutoAdvance,
    ToggleSpeech,
    Quit,
}

const KEY_HINTS: &str = "[space] next  [o] order  [a] auto  [s] speech  [r] reload  [q] quit";

/// Map a key press to a display action.
pub fn key_action(key: &KeyEvent) -> Option<DisplayAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char(' ') | KeyCode::Enter => Some(DisplayAction::Advance),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(DisplayAction::Quit)
        }
        KeyCode::Char('q') | KeyCode::Esc => Some(DisplayAction::Quit),
        KeyCode::Char('r') => Some(DisplayAction::Reload),
        KeyCode::Char('o') => Some(DisplayAction::ToggleRandomOrder),
        KeyCode::Char('a') => Some(DisplayAction::ToggleAutoAdvance),
        KeyCode::Char('s') => Some(DisplayAction::ToggleSpeech),
        _ => None,
    }
}

/// Flip the setting a toggle action names. Other actions leave the form alone.
pub fn apply_toggle(action: DisplayAction, form: &mut SettingsForm) -> bool {
    match action {
        DisplayAction::ToggleRandomOrder => form.random_order = !form.random_order,
        DisplayAction::ToggleAutoAdvance => form.auto_advance = !form.auto_advance,
        DisplayAction::ToggleSpeech => form.speech_enabled = !form.speech_enabled,
        _ => return false,
    }
    true
}

/// Text lines for a view: word, instruction, position, key hints.
pub fn render_lines(view: &View) -> Vec<String> {
    if view.loading {
        return vec!["Loading...".into()];
    }
    let Some(word) = &view.word else {
        return vec![
            "No words added yet. Run `sight-words configure` to add some words!".into(),
            String::new(),
            KEY_HINTS.into(),
        ];
    };

    let instruction = if view.awaiting_interaction {
        "Press space to start (with speech)"
    } else {
        "Press space to continue"
    };
    vec![
        word.clone(),
        String::new(),
        instruction.into(),
        format!("Word {} of {}", view.index + 1, view.total),
        String::new(),
        KEY_HINTS.into(),
    ]
}

/// Restores the terminal when dropped.
struct RawScreen;

impl RawScreen {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;
        Ok(Self)
    }
}

impl Drop for RawScreen {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

fn draw(view: &View) -> io::Result<()> {
    let (cols, rows) = terminal::size().unwrap_or((80, 24));
    let lines = render_lines(view);
    let top = (rows as usize).saturating_sub(lines.len()) / 2;

    let mut out = io::stdout();
    queue!(out, terminal::Clear(ClearType::All))?;
    for (i, line) in lines.iter().enumerate() {
        let width = line.chars().count();
        let left = (cols as usize).saturating_sub(width) / 2;
        queue!(out, cursor::MoveTo(left as u16, (top + i) as u16))?;
        if i == 0 && view.word.is_some() {
            queue!(
                out,
                SetAttribute(Attribute::Bold),
                Print(line),
                SetAttribute(Attribute::Reset)
            )?;
        } else {
            queue!(out, Print(line))?;
        }
    }
    out.flush()
}

/// Forward key actions until the receiver goes away or `stop` is set.
fn spawn_key_reader(tx: mpsc::Sender<DisplayAction>, stop: Arc<AtomicBool>) {
    tokio::task::spawn_blocking(move || {
        while !stop.load(Ordering::Relaxed) {
            match event::poll(Duration::from_millis(100)) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    warn!("Terminal input error: {e}");
                    let _ = tx.blocking_send(DisplayAction::Quit);
                    return;
                }
            }
            let Ok(Event::Key(key)) = event::read() else {
                continue;
            };
            if let Some(action) = key_action(&key) {
                debug!("Key action: {action:?}");
                if tx.blocking_send(action).is_err() {
                    return;
                }
            }
        }
    });
}

/// Run the display until the user quits.
pub async fn run<P: SettingsPersistence>(trainer: &Trainer<P>) -> io::Result<()> {
    let _screen = RawScreen::enter()?;
    let mut views = trainer.subscribe();

    let (tx, mut rx) = mpsc::channel(16);
    let stop = Arc::new(AtomicBool::new(false));
    spawn_key_reader(tx, stop.clone());

    views.mark_unchanged();
    draw(&trainer.view())?;

    loop {
        tokio::select! {
            action = rx.recv() => match action {
                Some(DisplayAction::Advance) => trainer.next_word(),
                Some(DisplayAction::Reload) => trainer.load().await,
                Some(DisplayAction::Quit) | None => break,
                Some(toggle) => {
                    let mut form = trainer.edit();
                    if apply_toggle(toggle, &mut form) {
                        // Failures are already reported by the trainer.
                        let _ = trainer.save(&form.to_update()).await;
                    }
                }
            },
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                draw(&view)?;
            }
        }
    }

    stop.store(true, Ordering::Relaxed);
    trainer.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn space_and_enter_advance() {
        assert_eq!(key_action(&press(KeyCode::Char(' '))), Some(DisplayAction::Advance));
        assert_eq!(key_action(&press(KeyCode::Enter)), Some(DisplayAction::Advance));
    }

    #[test]
    fn quit_keys() {
        assert_eq!(key_action(&press(KeyCode::Char('q'))), Some(DisplayAction::Quit));
        assert_eq!(key_action(&press(KeyCode::Esc)), Some(DisplayAction::Quit));
        assert_eq!(
            key_action(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(DisplayAction::Quit)
        );
        assert_eq!(key_action(&press(KeyCode::Char('c'))), None);
    }

    #[test]
    fn setting_keys() {
        assert_eq!(key_action(&press(KeyCode::Char('r'))), Some(DisplayAction::Reload));
        assert_eq!(
            key_action(&press(KeyCode::Char('o'))),
            Some(DisplayAction::ToggleRandomOrder)
        );
        assert_eq!(
            key_action(&press(KeyCode::Char('a'))),
            Some(DisplayAction::ToggleAutoAdvance)
        );
        assert_eq!(key_action(&press(KeyCode::Char('s'))), Some(DisplayAction::ToggleSpeech));
    }

    #[test]
    fn toggles_flip_one_field() {
        let mut form = SettingsForm::default();
        assert!(apply_toggle(DisplayAction::ToggleAutoAdvance, &mut form));
        assert!(form.auto_advance);
        assert!(!form.random_order);

        assert!(apply_toggle(DisplayAction::ToggleSpeech, &mut form));
        assert!(!form.speech_enabled);
        assert!(apply_toggle(DisplayAction::ToggleRandomOrder, &mut form));
        assert!(form.random_order);

        let before = form.clone();
        assert!(!apply_toggle(DisplayAction::Reload, &mut form));
        assert_eq!(form, before);
    }

    #[test]
    fn releases_are_ignored() {
        let mut key = press(KeyCode::Char(' '));
        key.kind = KeyEventKind::Release;
        assert_eq!(key_action(&key), None);
    }

    #[test]
    fn renders_word_prompt_and_position() {
        let view = View {
            word: Some("cat".into()),
            index: 1,
            total: 4,
            loading: false,
            awaiting_interaction: true,
        };
        assert_eq!(
            render_lines(&view),
            vec![
                "cat",
                "",
                "Press space to start (with speech)",
                "Word 2 of 4",
                "",
                KEY_HINTS
            ]
        );

        let later = View {
            awaiting_interaction: false,
            ..view
        };
        assert_eq!(render_lines(&later)[2], "Press space to continue");
    }

    #[test]
    fn renders_empty_and_loading_states() {
        let loading = View {
            loading: true,
            ..View::default()
        };
        assert_eq!(render_lines(&loading), vec!["Loading..."]);
        assert!(render_lines(&View::default())[0].starts_with("No words added yet"));
    }
}
