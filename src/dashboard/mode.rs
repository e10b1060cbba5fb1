use crate::preferences::PreferencesStore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Preferences key holding the selected display mode.
pub const MODE_KEY: &str = "ui_mode";

/// Display mode. Each mode has its own, independent dashboard configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Standard,
    Advanced,
}

impl Default for Mode {
    fn default() -> Self {
        Self::Standard
    }
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Standard => "standard",
            Mode::Advanced => "advanced",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(Mode::Standard),
            "advanced" => Some(Mode::Advanced),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mode stored in the preferences aggregate, `standard` when missing or unknown.
pub fn selected_mode(prefs: &Value) -> Mode {
    match prefs.get(MODE_KEY).and_then(Value::as_str) {
        Some(raw) => Mode::parse(raw).unwrap_or_else(|| {
            tracing::warn!(mode = raw, "unknown ui mode; using standard");
            Mode::Standard
        }),
        None => Mode::default(),
    }
}

pub fn select_mode(store: &mut PreferencesStore, mode: Mode) -> anyhow::Result<()> {
    store.save_partial(json!({ MODE_KEY: mode.as_str() }))?;
    tracing::info!(%mode, "ui mode changed");
    Ok(())
}
