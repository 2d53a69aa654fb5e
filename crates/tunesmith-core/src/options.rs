use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const MIN_COMPLEXITY: f64 = 0.0;
pub const MAX_COMPLEXITY: f64 = 100.0;
pub const MAX_PITCH_OFFSET: i8 = 24;
pub const MIX_LEVEL_MAX: f32 = 100.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentFocus {
    #[default]
    Balanced,
    #[serde(alias = "vocals")]
    VocalsOnly,
    #[serde(alias = "instrumental")]
    InstrumentalOnly,
}

impl InstrumentFocus {
    #[must_use]
    pub const fn has_backing(self) -> bool {
        !matches!(self, Self::VocalsOnly)
    }
}

/// Relative instrument levels on a 0..=100 scale, keyed by instrument name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentMix(BTreeMap<String, f32>);

impl InstrumentMix {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, instrument: impl Into<String>, level: f32) -> Self {
        self.set(instrument, level);
        self
    }

    pub fn set(&mut self, instrument: impl Into<String>, level: f32) {
        self.0.insert(instrument.into(), level);
    }

    #[must_use]
    pub fn level(&self, instrument: &str) -> Option<f32> {
        self.0
            .get(instrument)
            .copied()
            .filter(|level| level.is_finite())
            .map(|level| level.clamp(0.0, MIX_LEVEL_MAX))
    }

    /// First level present among `slots`, else `fallback`.
    #[must_use]
    pub fn first_level(&self, slots: &[&str], fallback: f32) -> f32 {
        slots
            .iter()
            .find_map(|slot| self.level(slot))
            .unwrap_or(fallback)
    }

    #[must_use]
    pub fn lead_level(&self) -> f32 {
        self.first_level(&["synth", "lead"], 70.0)
    }

    #[must_use]
    pub fn accompaniment_level(&self) -> f32 {
        self.first_level(&["pad", "strings", "piano"], 60.0)
    }

    #[must_use]
    pub fn bass_level(&self) -> f32 {
        self.first_level(&["bass"], 50.0)
    }

    #[must_use]
    pub fn drums_level(&self) -> f32 {
        self.first_level(&["drums"], 70.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(name, level)| (name.as_str(), *level))
    }
}

impl<S: Into<String>> FromIterator<(S, f32)> for InstrumentMix {
    fn from_iter<T: IntoIterator<Item = (S, f32)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, level)| (name.into(), level))
                .collect(),
        )
    }
}

/// Everything a caller supplies for one generation. Genre and mood stay as free-form
/// names so unknown values can fall back to the default profiles instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub genre: String,
    pub mood: String,
    /// Explicit BPM; `None` or zero picks a tempo from the mood's range.
    pub tempo: Option<u32>,
    pub duration_seconds: f64,
    pub instrument_focus: InstrumentFocus,
    /// Semitones applied uniformly to every generated pitch.
    pub pitch_offset: i8,
    pub complexity: f64,
    pub instrument_mix: InstrumentMix,
    pub seed: Option<u64>,
    /// Whether lyric text from an outside writer should be attached to the track.
    pub lyrics: bool,
    pub theme: Option<String>,
    pub keywords: Vec<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            genre: "pop".to_string(),
            mood: "energetic".to_string(),
            tempo: Some(120),
            duration_seconds: 120.0,
            instrument_focus: InstrumentFocus::Balanced,
            pitch_offset: 0,
            complexity: 50.0,
            instrument_mix: [
                ("drums", 70.0),
                ("bass", 60.0),
                ("guitar", 75.0),
                ("piano", 65.0),
                ("strings", 50.0),
                ("synth", 80.0),
                ("vocals", 85.0),
            ]
            .into_iter()
            .collect(),
            seed: None,
            lyrics: true,
            theme: None,
            keywords: Vec::new(),
        }
    }
}

impl GenerationOptions {
    #[must_use]
    pub fn explicit_tempo(&self) -> Option<u32> {
        self.tempo.filter(|tempo| *tempo > 0)
    }

    #[must_use]
    pub fn clamped_complexity(&self) -> f64 {
        clamp_complexity(self.complexity)
    }

    #[must_use]
    pub fn clamped_pitch_offset(&self) -> i8 {
        self.pitch_offset.clamp(-MAX_PITCH_OFFSET, MAX_PITCH_OFFSET)
    }

    /// Lyrics are only written against a theme.
    #[must_use]
    pub fn wants_lyrics(&self) -> bool {
        self.lyrics
            && self
                .theme
                .as_deref()
                .is_some_and(|theme| !theme.trim().is_empty())
    }
}

#[must_use]
pub fn clamp_complexity(complexity: f64) -> f64 {
    if complexity.is_nan() {
        return MIN_COMPLEXITY;
    }
    complexity.clamp(MIN_COMPLEXITY, MAX_COMPLEXITY)
}
