//! Validation of settings replacement payloads.
//!
//! Works on raw JSON so missing fields, wrong types and out-of-range speech
//! parameters are all reported per field instead of as one parse error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{parse_speech_param, SettingsUpdate, SPEECH_PARAM_MAX, SPEECH_PARAM_MIN};

/// Messages attached to one field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldIssue {
    #[serde(rename = "_errors", default)]
    pub errors: Vec<String>,
}

/// Error tree: `{"_errors": [...], "<field>": {"_errors": [...]}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldErrors {
    #[serde(rename = "_errors", default)]
    pub form: Vec<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldIssue>,
}

impl FieldErrors {
    pub fn form(message: impl Into<String>) -> Self {
        Self {
            form: vec![message.into()],
            fields: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .errors
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.form.is_empty() && self.fields.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn require_bool(body: &Map<String, Value>, field: &str, errors: &mut FieldErrors) -> bool {
    match body.get(field) {
        None => {
            errors.push(field, "Required");
            false
        }
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            errors.push(field, format!("Expected boolean, received {}", type_name(other)));
            false
        }
    }
}

fn require_speech_param(
    body: &Map<String, Value>,
    field: &str,
    errors: &mut FieldErrors,
) -> String {
    match body.get(field) {
        None => {
            errors.push(field, "Required");
            String::new()
        }
        Some(Value::String(s)) => {
            if parse_speech_param(s).is_none() {
                errors.push(
                    field,
                    format!("Expected a decimal between {SPEECH_PARAM_MIN} and {SPEECH_PARAM_MAX}"),
                );
            }
            s.clone()
        }
        Some(other) => {
            errors.push(field, format!("Expected string, received {}", type_name(other)));
            String::new()
        }
    }
}

fn require_words(body: &Map<String, Value>, errors: &mut FieldErrors) -> Vec<String> {
    let items = match body.get("words") {
        None => {
            errors.push("words", "Required");
            return Vec::new();
        }
        Some(Value::Array(items)) => items,
        Some(other) => {
            errors.push("words", format!("Expected array, received {}", type_name(other)));
            return Vec::new();
        }
    };

    let mut words = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::String(s) => words.push(s.clone()),
            other => errors.push(
                "words",
                format!("Expected string at index {i}, received {}", type_name(other)),
            ),
        }
    }
    words
}

/// Validate a full replacement payload. Unknown keys are ignored; `speechVoice`
/// may be omitted or null.
pub fn validate_update(body: &Value) -> Result<SettingsUpdate, FieldErrors> {
    let Value::Object(body) = body else {
        return Err(FieldErrors::form(format!(
            "Expected object, received {}",
            type_name(body)
        )));
    };

    let mut errors = FieldErrors::default();

    let words = require_words(body, &mut errors);
    let random_order = require_bool(body, "randomOrder", &mut errors);
    let auto_advance = require_bool(body, "autoAdvance", &mut errors);
    let speech_enabled = require_bool(body, "speechEnabled", &mut errors);
    let speech_rate = require_speech_param(body, "speechRate", &mut errors);
    let speech_pitch = require_speech_param(body, "speechPitch", &mut errors);

    let speech_voice = match body.get("speechVoice") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            errors.push(
                "speechVoice",
                format!("Expected string, received {}", type_name(other)),
            );
            None
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(SettingsUpdate {
        words,
        random_order,
        auto_advance,
        speech_enabled,
        speech_rate,
        speech_pitch,
        speech_voice,
    })
}
