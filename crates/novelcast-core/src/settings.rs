//! Listener settings: preferred voice and speaking rate.
//!
//! The record is persisted as JSON under [`SETTINGS_KEY`]. Loading never
//! fails; a missing or corrupt record falls back to defaults so playback can
//! always start.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Voice, VoiceOptions};

/// Storage key of the persisted settings record.
pub const SETTINGS_KEY: &str = "ttsSettings";

/// Speaking rate bounds when given as a plain multiplier.
const MIN_RATE: f32 = 0.5;
const MAX_RATE: f32 = 2.0;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TtsSettings {
    pub voice_short_name: Option<String>,
    pub rate: Option<String>,
}

impl TtsSettings {
    /// Voice options to send with a conversion request.
    pub fn voice_options(&self) -> VoiceOptions {
        VoiceOptions {
            voice_short_name: self.voice_short_name.clone(),
            rate: self.rate.clone(),
            pitch: None,
        }
    }

    /// Drop the stored voice if it is no longer offered.
    #[must_use]
    pub fn resolve_against(mut self, available: &[Voice]) -> Self {
        if let Some(name) = &self.voice_short_name {
            if !available.iter().any(|v| &v.short_name == name) {
                tracing::debug!(voice = %name, "Stored voice no longer available, using default");
                self.voice_short_name = None;
            }
        }
        self
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid speaking rate '{0}': expected a percentage like +10% or a multiplier in 0.5..=2.0")]
    InvalidRate(String),

    #[error("Failed to serialize settings: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Check a settings record before it is stored.
pub fn validate_settings(settings: &TtsSettings) -> Result<(), SettingsError> {
    if let Some(rate) = settings.rate.as_deref() {
        if !is_valid_rate(rate) {
            return Err(SettingsError::InvalidRate(rate.to_string()));
        }
    }
    Ok(())
}

fn is_valid_rate(rate: &str) -> bool {
    let rate = rate.trim();
    if let Some(pct) = rate.strip_suffix('%') {
        let digits = pct.strip_prefix(['+', '-']).unwrap_or(pct);
        return !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit());
    }
    rate.parse::<f32>()
        .is_ok_and(|r| (MIN_RATE..=MAX_RATE).contains(&r))
}

/// Parse a persisted record, falling back to defaults.
pub fn load_settings(raw: Option<&str>) -> TtsSettings {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return TtsSettings::default();
    };
    match serde_json::from_str::<TtsSettings>(raw) {
        Ok(settings) if validate_settings(&settings).is_ok() => settings,
        Ok(settings) => {
            tracing::warn!(rate = ?settings.rate, "Stored speaking rate is invalid, dropping it");
            TtsSettings {
                rate: None,
                ..settings
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Stored settings are corrupt, using defaults");
            TtsSettings::default()
        }
    }
}

/// Validate and serialize a record for persistence.
pub fn save_settings(settings: &TtsSettings) -> Result<String, SettingsError> {
    validate_settings(settings)?;
    Ok(serde_json::to_string(settings)?)
}

/// Shared in-memory settings used by a running player.
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    inner: Arc<RwLock<TtsSettings>>,
}

impl SettingsStore {
    pub fn new(initial: TtsSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn get(&self) -> TtsSettings {
        self.inner
            .read()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Replace the settings; new values apply to the next conversion request.
    pub fn update(&self, settings: TtsSettings) -> Result<(), SettingsError> {
        validate_settings(&settings)?;
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = settings;
        Ok(())
    }

    pub fn voice_options(&self) -> VoiceOptions {
        self.get().voice_options()
    }
}
