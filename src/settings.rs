//! Game settings and preferences
//!
//! Persisted separately from high scores through a `Store`. Values read back
//! from storage are loose JSON and pass through `Settings::normalize`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::{self, StorageError, Store};

/// Touch buttons or keyboard bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ControlScheme {
    #[default]
    Touch,
    Keyboard,
}

impl ControlScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlScheme::Touch => "touch",
            ControlScheme::Keyboard => "keyboard",
        }
    }

    /// Case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "touch" => Some(ControlScheme::Touch),
            "keyboard" => Some(ControlScheme::Keyboard),
            _ => None,
        }
    }
}

/// Player preferences
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub sound_enabled: bool,
    pub music_enabled: bool,
    /// 0.0 - 1.0
    pub music_volume: f32,
    /// 0.0 - 1.0
    pub sfx_volume: f32,
    pub control_scheme: ControlScheme,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            music_enabled: true,
            music_volume: 0.7,
            sfx_volume: 0.8,
            control_scheme: ControlScheme::Touch,
        }
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_volume(value: &Value) -> Option<f32> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !v.is_finite() {
        return None;
    }
    Some(v.clamp(0.0, 1.0) as f32)
}

impl Settings {
    /// Storage key (prefixed by the store helpers)
    pub const STORAGE_KEY: &'static str = "settings";

    /// Merge a loose JSON object over `base`.
    ///
    /// Unknown keys are dropped; a value that cannot be coerced keeps the base
    /// value. Anything other than an object returns `base` unchanged.
    pub fn normalize(value: &Value, base: Settings) -> Settings {
        let mut out = base;
        let Some(map) = value.as_object() else {
            return out;
        };

        if let Some(b) = map.get("soundEnabled").and_then(coerce_bool) {
            out.sound_enabled = b;
        }
        if let Some(b) = map.get("musicEnabled").and_then(coerce_bool) {
            out.music_enabled = b;
        }
        if let Some(v) = map.get("musicVolume").and_then(coerce_volume) {
            out.music_volume = v;
        }
        if let Some(v) = map.get("sfxVolume").and_then(coerce_volume) {
            out.sfx_volume = v;
        }
        if let Some(scheme) = map
            .get("controlScheme")
            .and_then(Value::as_str)
            .and_then(ControlScheme::parse)
        {
            out.control_scheme = scheme;
        }
        out
    }

    /// Load and normalize; defaults when nothing valid is stored
    pub fn load(store: &dyn Store) -> Self {
        match storage::load_json::<Value>(store, Self::STORAGE_KEY) {
            Some(raw) => {
                log::info!("Loaded settings");
                Self::normalize(&raw, Self::default())
            }
            None => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    /// Apply a partial update, then persist the merged result.
    ///
    /// `self` is updated even when the write fails.
    pub fn save(&mut self, store: &mut dyn Store, partial: &Value) -> Result<Settings, StorageError> {
        *self = Self::normalize(partial, *self);
        self.persist(store)?;
        Ok(*self)
    }

    pub fn persist(&self, store: &mut dyn Store) -> Result<(), StorageError> {
        storage::save_json(store, Self::STORAGE_KEY, self)?;
        log::info!("Settings saved");
        Ok(())
    }

    /// Back to defaults, persisted
    pub fn reset(&mut self, store: &mut dyn Store) -> Result<Settings, StorageError> {
        *self = Self::default();
        self.persist(store)?;
        Ok(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, storage_key};
    use serde_json::json;

    fn stored(store: &MemoryStore) -> Value {
        let raw = store.get(&storage_key(Settings::STORAGE_KEY)).unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn test_load_normalizes_stored_values() {
        let mut store = MemoryStore::new();
        storage::save_json(
            &mut store,
            Settings::STORAGE_KEY,
            &json!({
                "soundEnabled": "false",
                "musicEnabled": 1,
                "musicVolume": "1.5",
                "sfxVolume": -3,
                "controlScheme": "KEYBOARD",
                "ignored": "value"
            }),
        )
        .unwrap();

        let settings = Settings::load(&store);
        assert!(!settings.sound_enabled);
        assert!(settings.music_enabled);
        assert_eq!(settings.music_volume, 1.0);
        assert_eq!(settings.sfx_volume, 0.0);
        assert_eq!(settings.control_scheme, ControlScheme::Keyboard);
    }

    #[test]
    fn test_partial_save_keeps_valid_values() {
        let mut store = MemoryStore::new();
        let mut settings = Settings::load(&store);
        let saved = settings
            .save(
                &mut store,
                &json!({
                    "soundEnabled": "0",
                    "musicVolume": "not-a-number",
                    "controlScheme": "unknown"
                }),
            )
            .unwrap();

        assert!(!saved.sound_enabled);
        assert!(saved.music_enabled);
        assert_eq!(saved.music_volume, 0.7);
        assert_eq!(saved.sfx_volume, 0.8);
        assert_eq!(saved.control_scheme, ControlScheme::Touch);
        assert_eq!(settings, saved);

        let persisted: Settings = serde_json::from_value(stored(&store)).unwrap();
        assert_eq!(persisted, saved);
        assert!(stored(&store).get("ignored").is_none());
    }

    #[test]
    fn test_missing_or_corrupt_storage_yields_defaults() {
        let mut store = MemoryStore::new();
        assert_eq!(Settings::load(&store), Settings::default());

        store.set(&storage_key(Settings::STORAGE_KEY), "{not json").unwrap();
        assert_eq!(Settings::load(&store), Settings::default());

        store.set(&storage_key(Settings::STORAGE_KEY), "[1, 2]").unwrap();
        assert_eq!(Settings::load(&store), Settings::default());
    }

    #[test]
    fn test_reset_persists_defaults() {
        let mut store = MemoryStore::new();
        let mut settings = Settings::default();
        settings
            .save(&mut store, &json!({ "sfxVolume": 0.25, "controlScheme": "Keyboard" }))
            .unwrap();
        assert_eq!(settings.sfx_volume, 0.25);

        let reset = settings.reset(&mut store).unwrap();
        assert_eq!(reset, Settings::default());
        assert_eq!(Settings::load(&store), Settings::default());
    }

    #[test]
    fn test_bool_coercion() {
        for (raw, expected) in [
            (json!(true), Some(true)),
            (json!(0), Some(false)),
            (json!(2.5), Some(true)),
            (json!(" Yes "), Some(true)),
            (json!("off"), Some(false)),
            (json!("maybe"), None),
            (json!(null), None),
        ] {
            assert_eq!(coerce_bool(&raw), expected, "{raw}");
        }
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(value["soundEnabled"], json!(true));
        assert_eq!(value["controlScheme"], json!("touch"));
    }
}
