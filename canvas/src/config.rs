//! Engine settings supplied by the host page.
//!
//! Everything here has a default; a host may pass a partial JSON object to
//! override individual keys. Match parameters ([`crate::protocol::GameConfig`])
//! are not settings: they come from the server.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::consts::{
    DEFAULT_CLICK_THRESHOLD_PX, DEFAULT_MAX_TICK_DT_S, DEFAULT_RESIZE_DELAY_MS, DEFAULT_UI_BAR_HEIGHT_PX,
};
use crate::error::SessionError;

/// A game control, triggered by a key or a UI button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    BuildFactory,
    BuildTurret,
    SelectAll,
    Explode,
    Attack,
    Cancel,
}

/// Browser key name → control.
///
/// A JSON table is merged over the defaults, so a host rebinding one key
/// keeps every other binding (including `Escape` for cancel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeyBindings(HashMap<String, Control>);

impl<'de> Deserialize<'de> for KeyBindings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let overrides = HashMap::<String, Control>::deserialize(deserializer)?;
        let mut bindings = Self::default();
        for (key, control) in overrides {
            bindings.bind(&key, control);
        }
        Ok(bindings)
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        let pairs = [
            ("f", Control::BuildFactory),
            ("t", Control::BuildTurret),
            ("a", Control::SelectAll),
            ("e", Control::Explode),
            ("x", Control::Attack),
            ("Escape", Control::Cancel),
        ];
        Self(pairs.into_iter().map(|(k, c)| (k.to_owned(), c)).collect())
    }
}

impl KeyBindings {
    /// The control bound to `key`. Single characters match case-insensitively.
    #[must_use]
    pub fn control(&self, key: &str) -> Option<Control> {
        if let Some(control) = self.0.get(key) {
            return Some(*control);
        }
        if key.chars().count() == 1 {
            return self.0.get(&key.to_lowercase()).copied();
        }
        None
    }

    /// Bind `key` to `control`, replacing any previous binding of that key.
    pub fn bind(&mut self, key: &str, control: Control) {
        self.0.insert(key.to_owned(), control);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub click_threshold_px: f64,
    pub resize_delay_ms: f64,
    pub ui_bar_height_px: f64,
    pub max_tick_dt_s: f64,
    pub key_bindings: KeyBindings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            click_threshold_px: DEFAULT_CLICK_THRESHOLD_PX,
            resize_delay_ms: DEFAULT_RESIZE_DELAY_MS,
            ui_bar_height_px: DEFAULT_UI_BAR_HEIGHT_PX,
            max_tick_dt_s: DEFAULT_MAX_TICK_DT_S,
            key_bindings: KeyBindings::default(),
        }
    }
}

impl EngineSettings {
    /// Parse host overrides. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// [`SessionError::Settings`] if `raw` is not a valid settings object.
    pub fn from_json(raw: &str) -> Result<Self, SessionError> {
        serde_json::from_str(raw).map_err(SessionError::Settings)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
