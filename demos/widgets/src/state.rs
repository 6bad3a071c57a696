//! Application state - single source of truth
//!
//! Every widget reads its slice of `AppState` through its render function;
//! handlers change it with partial patches keyed by these field names.

use serde::{Deserialize, Serialize};

/// Shown in the note widget when nothing has been saved yet
pub const NOTE_PLACEHOLDER: &str = "Type your persistent note here...";

/// GitHub user profile, as returned by `GET /users/{login}`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GithubUser {
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
    #[serde(default)]
    pub followers: u64,
}

/// Four-function calculator registers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Calculator {
    pub display: String,
    #[serde(default, with = "operand")]
    pub first_operand: Option<f64>,
    pub operator: Option<char>,
    pub waiting_for_second_operand: bool,
}

impl Default for Calculator {
    fn default() -> Self {
        Self {
            display: "0".to_string(),
            first_operand: None,
            operator: None,
            waiting_for_second_operand: false,
        }
    }
}

/// Non-finite operands are stored as their display text
mod operand {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::calculator::format_number;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stored {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(n) if !n.is_finite() => format_number(*n).serialize(serializer),
            _ => value.serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        match Option::<Stored>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Stored::Number(n)) => Ok(Some(n)),
            Some(Stored::Text(text)) => text.parse().map(Some).map_err(serde::de::Error::custom),
        }
    }
}

/// Countdown timer, in whole seconds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    pub total_seconds: u32,
    pub remaining: u32,
    pub is_active: bool,
}

impl Default for Countdown {
    fn default() -> Self {
        Self {
            total_seconds: 60,
            remaining: 60,
            is_active: false,
        }
    }
}

impl Countdown {
    /// `MM:SS` for the remaining time
    pub fn clock(&self) -> String {
        format!("{:02}:{:02}", self.remaining / 60, self.remaining % 60)
    }
}

/// Celsius/Fahrenheit text fields, kept as typed
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitConverter {
    pub celsius: String,
    pub fahrenheit: String,
}

/// Application state - everything the widgets render
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub counter: i64,
    pub mirror_text: String,
    pub items: Vec<String>,

    /// Login of the user being (or last) requested
    pub github_query: String,
    pub github_user: Option<GithubUser>,
    pub github_user_loading: bool,
    pub github_user_error: Option<String>,

    pub calculator: Calculator,
    pub color_picker_value: String,
    pub countdown: Countdown,
    pub char_count_text: String,
    pub note: String,
    pub unit_converter: UnitConverter,
    pub dice_result: String,
    pub generated_password: String,
    pub accordion_open: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            counter: 0,
            mirror_text: "Hello dom-dispatch!".to_string(),
            items: vec!["Initial Item 1".to_string(), "Initial Item 2".to_string()],
            github_query: String::new(),
            github_user: None,
            github_user_loading: false,
            github_user_error: None,
            calculator: Calculator::default(),
            color_picker_value: "#aabbcc".to_string(),
            countdown: Countdown::default(),
            char_count_text: String::new(),
            note: String::new(),
            unit_converter: UnitConverter::default(),
            dice_result: "Roll the dice!".to_string(),
            generated_password: "***".to_string(),
            accordion_open: false,
        }
    }
}
