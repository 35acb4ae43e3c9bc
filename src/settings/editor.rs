//! Settings form state.
//!
//! Holds editable copies of the record's fields. Nothing here touches
//! persistence: the caller submits `to_update()` as a full replacement.

use super::{SightWords, DEFAULT_SPEECH_PITCH, DEFAULT_SPEECH_RATE, SPEECH_PARAM_MAX, SPEECH_PARAM_MIN};

/// Word list restored by "reset to default".
pub const DEFAULT_WORDS: &[&str] = &[
    "the", "and", "to", "a", "is", "you", "that", "it", "he", "was", "for", "on", "are", "as",
    "with", "his", "they", "at", "be", "this", "have", "from", "one", "had", "by", "word",
];

#[derive(Debug, Clone, PartialEq)]
pub struct SettingsForm {
    /// One word per line.
    pub words_text: String,
    pub random_order: bool,
    pub auto_advance: bool,
    pub speech_enabled: bool,
    pub speech_rate: f32,
    pub speech_pitch: f32,
    pub speech_voice: Option<String>,
}

impl Default for SettingsForm {
    fn default() -> Self {
        Self {
            words_text: String::new(),
            random_order: false,
            auto_advance: false,
            speech_enabled: true,
            speech_rate: DEFAULT_SPEECH_RATE.parse().unwrap_or(0.8),
            speech_pitch: DEFAULT_SPEECH_PITCH.parse().unwrap_or(1.0),
            speech_voice: None,
        }
    }
}

impl SettingsForm {
    /// Populate the form from the current record, or defaults when none exists yet.
    pub fn open(current: Option<&SightWords>) -> Self {
        let Some(record) = current else {
            return Self::default();
        };
        Self {
            words_text: record.words.join("\n"),
            random_order: record.random_order,
            auto_advance: record.auto_advance,
            speech_enabled: record.speech_enabled,
            speech_rate: record.rate(),
            speech_pitch: record.pitch(),
            speech_voice: record.speech_voice.clone().filter(|v| !v.is_empty()),
        }
    }

    /// Trimmed, non-empty lines of the word field, in order.
    pub fn parse_words(&self) -> Vec<String> {
        self.words_text
            .lines()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Restore the built-in word list into the editable field only.
    pub fn reset_to_default(&mut self) {
        self.words_text = DEFAULT_WORDS.join("\n");
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.speech_rate = snap(rate);
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.speech_pitch = snap(pitch);
    }

    pub fn set_voice(&mut self, voice: Option<String>) {
        self.speech_voice = voice.filter(|v| !v.trim().is_empty());
    }

    pub fn to_update(&self) -> super::SettingsUpdate {
        super::SettingsUpdate {
            words: self.parse_words(),
            random_order: self.random_order,
            auto_advance: self.auto_advance,
            speech_enabled: self.speech_enabled,
            speech_rate: format_param(self.speech_rate),
            speech_pitch: format_param(self.speech_pitch),
            speech_voice: self.speech_voice.clone(),
        }
    }
}

/// Clamp to the slider range and round to its 0.1 step.
fn snap(value: f32) -> f32 {
    let clamped = value.clamp(SPEECH_PARAM_MIN, SPEECH_PARAM_MAX);
    (clamped * 10.0).round() / 10.0
}

/// Shortest decimal form: 1.0 -> "1", 0.8 -> "0.8".
fn format_param(value: f32) -> String {
    format!("{}", snap(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::NewSightWords;

    #[test]
    fn words_are_trimmed_and_blank_lines_dropped() {
        let form = SettingsForm {
            words_text: "  cat \n\n dog\r\n   \nbird".into(),
            ..SettingsForm::default()
        };
        assert_eq!(form.parse_words(), vec!["cat", "dog", "bird"]);
    }

    #[test]
    fn open_copies_record_fields() {
        let record = NewSightWords {
            words: vec!["cat".into(), "dog".into()],
            random_order: Some(true),
            speech_rate: Some("1.5".into()),
            speech_voice: Some("en-gb".into()),
            ..NewSightWords::default()
        }
        .into_record(1);

        let form = SettingsForm::open(Some(&record));
        assert_eq!(form.words_text, "cat\ndog");
        assert!(form.random_order);
        assert_eq!(form.speech_rate, 1.5);
        assert_eq!(form.speech_pitch, 1.0);
        assert_eq!(form.speech_voice.as_deref(), Some("en-gb"));
    }

    #[test]
    fn reset_touches_only_the_word_field() {
        let mut form = SettingsForm {
            words_text: "zebra".into(),
            auto_advance: true,
            ..SettingsForm::default()
        };
        form.reset_to_default();
        assert_eq!(form.parse_words().len(), DEFAULT_WORDS.len());
        assert_eq!(form.parse_words()[0], "the");
        assert!(form.auto_advance);
    }

    #[test]
    fn update_carries_every_field() {
        let mut form = SettingsForm::open(None);
        form.words_text = "sun\nmoon".into();
        form.set_rate(1.0);
        form.set_pitch(0.83);
        form.set_voice(Some("  ".into()));

        let update = form.to_update();
        assert_eq!(update.words, vec!["sun", "moon"]);
        assert_eq!(update.speech_rate, "1");
        assert_eq!(update.speech_pitch, "0.8");
        assert_eq!(update.speech_voice, None);
        assert!(update.speech_enabled);
    }

    #[test]
    fn rate_is_clamped_to_range() {
        let mut form = SettingsForm::default();
        form.set_rate(5.0);
        assert_eq!(form.to_update().speech_rate, "2");
        form.set_rate(0.1);
        assert_eq!(form.to_update().speech_rate, "0.5");
    }
}
