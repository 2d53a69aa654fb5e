use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    options::{InstrumentFocus, InstrumentMix},
    profiles::{Genre, Mood},
};

pub const MIN_ATTACK_SECONDS: f32 = 0.01;
pub const MIN_RELEASE_SECONDS: f32 = 0.1;
pub const MAX_ATTACK_SECONDS: f32 = 0.5;
pub const MAX_RELEASE_SECONDS: f32 = 3.0;

const LEAD_BASE_GAIN_DB: f32 = -12.0;
const LEAD_GAIN_SLOPE: f32 = 0.25;
const BACKING_BASE_GAIN_DB: f32 = -15.0;
const BACKING_GAIN_SLOPE: f32 = 0.3;
const MIX_CENTER: f32 = 50.0;

/// Drum scheduling is an extension point that does not generate events yet.
pub const PERCUSSION_IMPLEMENTED: bool = false;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceRole {
    Lead,
    Accompaniment,
    Bass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OscillatorShape {
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Envelope {
    #[must_use]
    pub const fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectSpec {
    Reverb { decay_seconds: f32, wet: f32 },
    Distortion { amount: f32, wet: f32 },
    FeedbackDelay { delay_seconds: f32, feedback: f32, wet: f32 },
}

impl EffectSpec {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Reverb { .. } => "reverb",
            Self::Distortion { .. } => "distortion",
            Self::FeedbackDelay { .. } => "feedback_delay",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub role: VoiceRole,
    pub oscillator: OscillatorShape,
    pub envelope: Envelope,
    pub effects: Vec<EffectSpec>,
    pub gain_db: f32,
}

impl VoiceConfig {
    #[must_use]
    pub fn gain_linear(&self) -> f32 {
        10_f32.powf(self.gain_db / 20.0)
    }
}

/// Drum part requested by the arrangement. Rendering it is not implemented; see
/// [`PERCUSSION_IMPLEMENTED`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercussionPlan {
    pub genre: Genre,
    pub mood: Mood,
    pub level: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSet {
    pub lead: VoiceConfig,
    pub accompaniment: Option<VoiceConfig>,
    pub bass: Option<VoiceConfig>,
    pub percussion: Option<PercussionPlan>,
}

impl VoiceSet {
    pub fn iter(&self) -> impl Iterator<Item = &VoiceConfig> {
        std::iter::once(&self.lead)
            .chain(self.accompaniment.as_ref())
            .chain(self.bass.as_ref())
    }

    #[must_use]
    pub fn get(&self, role: VoiceRole) -> Option<&VoiceConfig> {
        match role {
            VoiceRole::Lead => Some(&self.lead),
            VoiceRole::Accompaniment => self.accompaniment.as_ref(),
            VoiceRole::Bass => self.bass.as_ref(),
        }
    }
}

#[instrument(skip(mix), fields(genre = %genre, mood = %mood))]
#[must_use]
pub fn build_lead_voice(genre: Genre, mood: Mood, mix: &InstrumentMix) -> VoiceConfig {
    let mut oscillator = OscillatorShape::Triangle;
    let mut envelope = Envelope::new(0.1, 0.2, 0.5, 1.0);

    match genre {
        Genre::Electronic => {
            oscillator = OscillatorShape::Sawtooth;
            envelope.attack = 0.01;
            envelope.release = 0.5;
        }
        Genre::Ambient => {
            oscillator = OscillatorShape::Sine;
            envelope.attack = 0.4;
            envelope.release = 3.0;
        }
        Genre::Rock | Genre::Metal => {
            oscillator = OscillatorShape::Square;
            envelope.attack = 0.05;
            envelope.sustain = 0.3;
        }
        Genre::Jazz => {
            envelope.attack = 0.08;
            envelope.release = 0.8;
        }
        Genre::Classical => {
            oscillator = OscillatorShape::Sine;
            envelope.attack = 0.1;
            envelope.release = 1.5;
        }
        Genre::Pop
        | Genre::HipHop
        | Genre::Rnb
        | Genre::Country
        | Genre::Folk
        | Genre::Indie => {}
    }

    match mood {
        Mood::Energetic | Mood::Angry => {
            envelope.attack = (envelope.attack / 2.0).max(MIN_ATTACK_SECONDS);
            envelope.release = (envelope.release / 2.0).max(MIN_RELEASE_SECONDS);
        }
        Mood::Relaxed | Mood::Peaceful | Mood::Dreamy => {
            envelope.attack = (envelope.attack * 2.0).min(MAX_ATTACK_SECONDS);
            envelope.release = (envelope.release * 2.0).min(MAX_RELEASE_SECONDS);
        }
        Mood::Melancholic | Mood::Uplifting | Mood::Dark | Mood::Nostalgic | Mood::Dramatic => {}
    }

    let mut effects = Vec::new();
    if matches!(genre, Genre::Electronic | Genre::Ambient)
        || matches!(mood, Mood::Dreamy | Mood::Melancholic)
    {
        effects.push(EffectSpec::Reverb {
            decay_seconds: 3.0,
            wet: 0.3,
        });
    }
    if matches!(genre, Genre::Rock | Genre::Metal | Genre::HipHop)
        || matches!(mood, Mood::Energetic | Mood::Angry)
    {
        effects.push(EffectSpec::Distortion {
            amount: 0.2,
            wet: 0.5,
        });
    }
    if matches!(genre, Genre::Electronic | Genre::Pop | Genre::Rnb) {
        effects.push(EffectSpec::FeedbackDelay {
            delay_seconds: 0.25,
            feedback: 0.3,
            wet: 0.3,
        });
    }

    let voice = VoiceConfig {
        role: VoiceRole::Lead,
        oscillator,
        envelope,
        effects,
        gain_db: mix_gain_db(LEAD_BASE_GAIN_DB, LEAD_GAIN_SLOPE, mix.lead_level()),
    };
    debug!(?voice, "lead voice built");
    voice
}

#[instrument(skip(mix), fields(genre = %genre, mood = %mood))]
#[must_use]
pub fn build_accompaniment_voice(genre: Genre, mood: Mood, mix: &InstrumentMix) -> VoiceConfig {
    let mut oscillator = OscillatorShape::Sine;
    let mut envelope = Envelope::new(0.2, 0.3, 0.4, 1.2);

    match genre {
        Genre::Classical | Genre::Jazz => oscillator = OscillatorShape::Triangle,
        Genre::Rock | Genre::Metal | Genre::Electronic => {
            oscillator = OscillatorShape::Sawtooth;
            envelope.attack = 0.3;
            envelope.release = 2.0;
        }
        _ => {}
    }

    let voice = VoiceConfig {
        role: VoiceRole::Accompaniment,
        oscillator,
        envelope,
        effects: vec![EffectSpec::Reverb {
            decay_seconds: 2.0,
            wet: 0.25,
        }],
        gain_db: mix_gain_db(
            BACKING_BASE_GAIN_DB,
            BACKING_GAIN_SLOPE,
            mix.accompaniment_level(),
        ),
    };
    debug!(?voice, "accompaniment voice built");
    voice
}

#[instrument(skip(mix))]
#[must_use]
pub fn build_bass_voice(mix: &InstrumentMix) -> VoiceConfig {
    let voice = VoiceConfig {
        role: VoiceRole::Bass,
        oscillator: OscillatorShape::Triangle,
        envelope: Envelope::new(0.05, 0.2, 0.8, 0.5),
        effects: Vec::new(),
        gain_db: mix_gain_db(BACKING_BASE_GAIN_DB, BACKING_GAIN_SLOPE, mix.bass_level()),
    };
    debug!(?voice, "bass voice built");
    voice
}

/// Builds every voice the arrangement needs. Accompaniment and bass are skipped
/// entirely for vocals-only focus.
#[instrument(skip(mix), fields(genre = %genre, mood = %mood, focus = ?focus))]
#[must_use]
pub fn build_voice_set(
    genre: Genre,
    mood: Mood,
    focus: InstrumentFocus,
    mix: &InstrumentMix,
) -> VoiceSet {
    let lead = build_lead_voice(genre, mood, mix);
    let (accompaniment, bass) = if focus.has_backing() {
        (
            Some(build_accompaniment_voice(genre, mood, mix)),
            Some(build_bass_voice(mix)),
        )
    } else {
        info!("vocals-only focus, skipping accompaniment and bass");
        (None, None)
    };

    let percussion = genre.wants_percussion().then(|| PercussionPlan {
        genre,
        mood,
        level: mix.drums_level(),
    });

    VoiceSet {
        lead,
        accompaniment,
        bass,
        percussion,
    }
}

fn mix_gain_db(base_db: f32, slope: f32, level: f32) -> f32 {
    base_db + (level - MIX_CENTER) * slope
}
