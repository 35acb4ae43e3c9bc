//! Sight-word settings: the single persisted record and everything that
//! reads or writes it.
//!
//! - `store`: in-memory record store owned by the HTTP API
//! - `validate`: field-level validation of incoming replacement payloads
//! - `persistence`: load/save of the record over HTTP or a local file
//! - `editor`: form state for editing the record

pub mod editor;
pub mod persistence;
pub mod store;
pub mod validate;

use serde::{Deserialize, Serialize};

/// The fixed user key. Every record lives under this id until real identities exist.
pub const DEFAULT_USER_ID: &str = "default";

pub const DEFAULT_SPEECH_RATE: &str = "0.8";
pub const DEFAULT_SPEECH_PITCH: &str = "1.0";

/// Inclusive bounds for speech rate and pitch.
pub const SPEECH_PARAM_MIN: f32 = 0.5;
pub const SPEECH_PARAM_MAX: f32 = 2.0;

/// Word list seeded for the default user when the server starts.
pub const SEED_WORDS: &[&str] = &[
    "I", "the", "am", "like", "to", "a", "have", "he", "is", "we", "my", "make", "for", "me",
    "with", "are", "that", "of", "they", "you", "do", "one", "two", "three", "four", "five",
    "here", "go", "from", "yellow", "what", "when", "why", "who", "come", "play", "any", "down",
    "her", "how", "away", "give", "little", "funny", "were", "some", "find", "again", "over",
    "all", "now", "pretty", "brown", "black", "white", "good", "open", "could", "please", "want",
    "every", "be", "saw", "our", "eat", "soon", "walk", "into", "there",
];

/// Stored settings record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SightWords {
    pub id: i64,
    pub words: Vec<String>,
    pub random_order: bool,
    pub auto_advance: bool,
    pub speech_enabled: bool,
    pub speech_rate: String,
    pub speech_pitch: String,
    pub speech_voice: Option<String>,
    pub user_id: String,
}

impl SightWords {
    /// Replace every mutable field, keeping `id` and `user_id`.
    pub fn replace_with(&mut self, update: &SettingsUpdate) {
        self.words = update.words.clone();
        self.random_order = update.random_order;
        self.auto_advance = update.auto_advance;
        self.speech_enabled = update.speech_enabled;
        self.speech_rate = update.speech_rate.clone();
        self.speech_pitch = update.speech_pitch.clone();
        self.speech_voice = update.speech_voice.clone();
    }

    pub fn rate(&self) -> f32 {
        parse_speech_param(&self.speech_rate).unwrap_or(0.8)
    }

    pub fn pitch(&self) -> f32 {
        parse_speech_param(&self.speech_pitch).unwrap_or(1.0)
    }
}

/// Full replacement of the mutable fields, as accepted by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub words: Vec<String>,
    pub random_order: bool,
    pub auto_advance: bool,
    pub speech_enabled: bool,
    pub speech_rate: String,
    pub speech_pitch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_voice: Option<String>,
}

impl From<&SightWords> for SettingsUpdate {
    fn from(record: &SightWords) -> Self {
        Self {
            words: record.words.clone(),
            random_order: record.random_order,
            auto_advance: record.auto_advance,
            speech_enabled: record.speech_enabled,
            speech_rate: record.speech_rate.clone(),
            speech_pitch: record.speech_pitch.clone(),
            speech_voice: record.speech_voice.clone(),
        }
    }
}

/// Insert payload. Omitted optional fields take the record defaults.
#[derive(Debug, Clone, Default)]
pub struct NewSightWords {
    pub user_id: Option<String>,
    pub words: Vec<String>,
    pub random_order: Option<bool>,
    pub auto_advance: Option<bool>,
    pub speech_enabled: Option<bool>,
    pub speech_rate: Option<String>,
    pub speech_pitch: Option<String>,
    pub speech_voice: Option<String>,
}

impl NewSightWords {
    pub fn for_user(user_id: &str, update: SettingsUpdate) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            words: update.words,
            random_order: Some(update.random_order),
            auto_advance: Some(update.auto_advance),
            speech_enabled: Some(update.speech_enabled),
            speech_rate: Some(update.speech_rate),
            speech_pitch: Some(update.speech_pitch),
            speech_voice: update.speech_voice,
        }
    }

    /// Materialize a record with the given id, applying field defaults.
    pub fn into_record(self, id: i64) -> SightWords {
        SightWords {
            id,
            words: self.words,
            random_order: self.random_order.unwrap_or(false),
            auto_advance: self.auto_advance.unwrap_or(false),
            speech_enabled: self.speech_enabled.unwrap_or(true),
            speech_rate: self
                .speech_rate
                .unwrap_or_else(|| DEFAULT_SPEECH_RATE.to_string()),
            speech_pitch: self
                .speech_pitch
                .unwrap_or_else(|| DEFAULT_SPEECH_PITCH.to_string()),
            speech_voice: self.speech_voice,
            user_id: self
                .user_id
                .unwrap_or_else(|| DEFAULT_USER_ID.to_string()),
        }
    }

    pub fn seed() -> Self {
        Self {
            user_id: Some(DEFAULT_USER_ID.to_string()),
            words: SEED_WORDS.iter().map(|w| w.to_string()).collect(),
            ..Self::default()
        }
    }
}

/// Parse a decimal-as-string speech parameter, rejecting values outside the valid range.
pub fn parse_speech_param(value: &str) -> Option<f32> {
    let parsed: f32 = value.trim().parse().ok()?;
    if parsed.is_finite() && (SPEECH_PARAM_MIN..=SPEECH_PARAM_MAX).contains(&parsed) {
        Some(parsed)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_fields_take_defaults() {
        let record = NewSightWords {
            words: vec!["cat".into()],
            ..NewSightWords::default()
        }
        .into_record(7);

        assert_eq!(record.id, 7);
        assert_eq!(record.user_id, DEFAULT_USER_ID);
        assert!(!record.random_order);
        assert!(!record.auto_advance);
        assert!(record.speech_enabled);
        assert_eq!(record.speech_rate, "0.8");
        assert_eq!(record.speech_pitch, "1.0");
        assert_eq!(record.speech_voice, None);
    }

    #[test]
    fn record_serializes_with_camel_case_and_null_voice() {
        let record = NewSightWords::seed().into_record(1);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["userId"], "default");
        assert_eq!(json["speechRate"], "0.8");
        assert!(json["speechVoice"].is_null());
        assert_eq!(json["words"].as_array().unwrap().len(), SEED_WORDS.len());
    }

    #[test]
    fn replace_clears_voice_when_update_omits_it() {
        let mut record = NewSightWords {
            speech_voice: Some("en-us".into()),
            ..NewSightWords::default()
        }
        .into_record(1);
        let mut update = SettingsUpdate::from(&record);
        update.speech_voice = None;
        update.words = vec!["dog".into()];

        record.replace_with(&update);
        assert_eq!(record.words, vec!["dog".to_string()]);
        assert_eq!(record.speech_voice, None);
        assert_eq!(record.id, 1);
    }

    #[test]
    fn speech_params_are_range_checked() {
        assert_eq!(parse_speech_param("0.5"), Some(0.5));
        assert_eq!(parse_speech_param(" 2 "), Some(2.0));
        assert_eq!(parse_speech_param("2.1"), None);
        assert_eq!(parse_speech_param("0.4"), None);
        assert_eq!(parse_speech_param("fast"), None);
        assert_eq!(parse_speech_param("NaN"), None);
    }
}
