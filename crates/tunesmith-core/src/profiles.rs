use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::theory::ChordSymbol::{
    self, FlatSeven as FLAT_VII, FlatSix as FLAT_VI, FlatThree as FLAT_III, MajorFive as V,
    MajorFour as IV, MajorOne as I, MinorFour as MIN_IV, MinorOne as MIN_I, MinorSix as MIN_VI,
    MinorThree as MIN_III, MinorTwo as MIN_II,
};

pub type Progression = &'static [ChordSymbol];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {name}")]
pub struct UnknownProfile {
    pub kind: &'static str,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    Pop,
    Rock,
    HipHop,
    Jazz,
    Electronic,
    Classical,
    Rnb,
    Country,
    Ambient,
    Folk,
    Metal,
    Indie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Energetic,
    Relaxed,
    Melancholic,
    Uplifting,
    Dark,
    Dreamy,
    Angry,
    Peaceful,
    Nostalgic,
    Dramatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleName {
    Major,
    MajorPentatonic,
    Minor,
    MinorPentatonic,
    Blues,
    Dorian,
    Mixolydian,
    Lydian,
    Phrygian,
    Locrian,
    HarmonicMinor,
    MelodicMinor,
    WholeTone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dynamics {
    Soft,
    Medium,
    Loud,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Articulation {
    Staccato,
    Legato,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmonyComplexity {
    Simple,
    Moderate,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenreProfile {
    pub scales: &'static [ScaleName],
    pub progressions: &'static [Progression],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoodProfile {
    /// Inclusive BPM bounds.
    pub tempo_range: (u32, u32),
    pub dynamics: Dynamics,
    pub articulation: Articulation,
    pub harmony_complexity: HarmonyComplexity,
}

impl Genre {
    pub const ALL: [Self; 12] = [
        Self::Pop,
        Self::Rock,
        Self::HipHop,
        Self::Jazz,
        Self::Electronic,
        Self::Classical,
        Self::Rnb,
        Self::Country,
        Self::Ambient,
        Self::Folk,
        Self::Metal,
        Self::Indie,
    ];

    pub const DEFAULT: Self = Self::Pop;

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pop => "pop",
            Self::Rock => "rock",
            Self::HipHop => "hiphop",
            Self::Jazz => "jazz",
            Self::Electronic => "electronic",
            Self::Classical => "classical",
            Self::Rnb => "rnb",
            Self::Country => "country",
            Self::Ambient => "ambient",
            Self::Folk => "folk",
            Self::Metal => "metal",
            Self::Indie => "indie",
        }
    }

    /// Looks up a genre by name, using the default profile for unknown names.
    #[must_use]
    pub fn resolve(name: &str) -> Self {
        name.parse().unwrap_or_else(|error: UnknownProfile| {
            warn!(%error, fallback = Self::DEFAULT.name(), "using default genre profile");
            Self::DEFAULT
        })
    }

    #[must_use]
    pub const fn profile(self) -> GenreProfile {
        use ScaleName::{
            Blues, Dorian, HarmonicMinor, Locrian, Lydian, Major, MajorPentatonic, MelodicMinor,
            Minor, MinorPentatonic, Mixolydian, Phrygian, WholeTone,
        };

        match self {
            Self::Pop => GenreProfile {
                scales: &[Major, MajorPentatonic],
                progressions: &[&[I, V, MIN_VI, IV], &[I, IV, V], &[MIN_VI, IV, I, V]],
            },
            Self::Rock => GenreProfile {
                scales: &[Minor, MinorPentatonic, Blues],
                progressions: &[
                    &[I, IV, V],
                    &[MIN_I, FLAT_VII, FLAT_VI, V],
                    &[MIN_I, FLAT_VI, FLAT_III, FLAT_VII],
                ],
            },
            Self::HipHop => GenreProfile {
                scales: &[Minor, MinorPentatonic, Dorian],
                progressions: &[
                    &[MIN_II, V, I],
                    &[MIN_VI, IV, I, V],
                    &[MIN_I, FLAT_VI, FLAT_III, FLAT_VII],
                ],
            },
            Self::Jazz => GenreProfile {
                scales: &[Major, Minor, Dorian, Mixolydian, Lydian],
                progressions: &[
                    &[MIN_II, V, I],
                    &[I, MIN_VI, MIN_II, V],
                    &[MIN_III, FLAT_VI, MIN_II, V],
                ],
            },
            Self::Electronic => GenreProfile {
                scales: &[Minor, Phrygian, Locrian],
                progressions: &[
                    &[MIN_I, FLAT_VI, FLAT_VII],
                    &[MIN_I, FLAT_VII, FLAT_VI, FLAT_VII],
                    &[IV, I, V, MIN_VI],
                ],
            },
            Self::Classical => GenreProfile {
                scales: &[Major, Minor, HarmonicMinor, MelodicMinor],
                progressions: &[
                    &[I, IV, V],
                    &[I, MIN_VI, IV, V],
                    &[I, V, MIN_VI, MIN_III, IV, I, IV, V],
                ],
            },
            Self::Rnb => GenreProfile {
                scales: &[Minor, MinorPentatonic, Dorian],
                progressions: &[
                    &[MIN_II, V, I],
                    &[I, MIN_VI, IV, V],
                    &[MIN_I, MIN_IV, FLAT_VII, FLAT_III],
                ],
            },
            Self::Country => GenreProfile {
                scales: &[Major, MajorPentatonic, Mixolydian],
                progressions: &[&[I, IV, V], &[I, V, MIN_VI, IV], &[MIN_VI, MIN_III, IV, V]],
            },
            Self::Ambient => GenreProfile {
                scales: &[Major, Minor, WholeTone, Lydian],
                progressions: &[&[I, MIN_VI], &[I, MIN_III, MIN_VI], &[I, V, MIN_VI]],
            },
            Self::Folk => GenreProfile {
                scales: &[Major, Dorian, Mixolydian],
                progressions: &[&[I, V, I], &[I, IV, I, V], &[MIN_I, FLAT_VII, FLAT_VI, V]],
            },
            Self::Metal => GenreProfile {
                scales: &[Minor, Phrygian, Locrian],
                progressions: &[
                    &[MIN_I, FLAT_VII, FLAT_VI],
                    &[MIN_I, V, FLAT_VI, FLAT_VII],
                    &[MIN_I, MIN_IV, FLAT_VII, FLAT_III],
                ],
            },
            Self::Indie => GenreProfile {
                scales: &[Major, Minor, Lydian, Mixolydian],
                progressions: &[
                    &[I, V, MIN_VI, IV],
                    &[MIN_VI, IV, I, V],
                    &[I, MIN_III, MIN_VI, IV],
                ],
            },
        }
    }

    /// Genres whose arrangement calls for a drum part.
    #[must_use]
    pub const fn wants_percussion(self) -> bool {
        matches!(
            self,
            Self::Pop | Self::Rock | Self::HipHop | Self::Electronic | Self::Metal | Self::Rnb
        )
    }
}

impl Mood {
    pub const ALL: [Self; 10] = [
        Self::Energetic,
        Self::Relaxed,
        Self::Melancholic,
        Self::Uplifting,
        Self::Dark,
        Self::Dreamy,
        Self::Angry,
        Self::Peaceful,
        Self::Nostalgic,
        Self::Dramatic,
    ];

    pub const DEFAULT: Self = Self::Energetic;

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Energetic => "energetic",
            Self::Relaxed => "relaxed",
            Self::Melancholic => "melancholic",
            Self::Uplifting => "uplifting",
            Self::Dark => "dark",
            Self::Dreamy => "dreamy",
            Self::Angry => "angry",
            Self::Peaceful => "peaceful",
            Self::Nostalgic => "nostalgic",
            Self::Dramatic => "dramatic",
        }
    }

    #[must_use]
    pub fn resolve(name: &str) -> Self {
        name.parse().unwrap_or_else(|error: UnknownProfile| {
            warn!(%error, fallback = Self::DEFAULT.name(), "using default mood profile");
            Self::DEFAULT
        })
    }

    #[must_use]
    pub const fn profile(self) -> MoodProfile {
        use Articulation::{Legato, Normal, Staccato};
        use Dynamics::{Loud, Medium, Soft};
        use HarmonyComplexity::{Complex, Moderate, Simple};

        let (tempo_range, dynamics, articulation, harmony_complexity) = match self {
            Self::Energetic => ((120, 160), Loud, Staccato, Moderate),
            Self::Relaxed => ((60, 90), Soft, Legato, Simple),
            Self::Melancholic => ((65, 85), Soft, Legato, Moderate),
            Self::Uplifting => ((100, 130), Medium, Normal, Simple),
            Self::Dark => ((70, 100), Medium, Normal, Complex),
            Self::Dreamy => ((60, 80), Soft, Legato, Moderate),
            Self::Angry => ((140, 180), Loud, Staccato, Complex),
            Self::Peaceful => ((50, 75), Soft, Legato, Simple),
            Self::Nostalgic => ((65, 95), Medium, Legato, Moderate),
            Self::Dramatic => ((75, 110), Loud, Normal, Complex),
        };

        MoodProfile {
            tempo_range,
            dynamics,
            articulation,
            harmony_complexity,
        }
    }
}

impl ScaleName {
    /// Semitone offsets from the tonic.
    #[must_use]
    pub const fn intervals(self) -> &'static [u8] {
        match self {
            Self::Major => &[0, 2, 4, 5, 7, 9, 11],
            Self::MajorPentatonic => &[0, 2, 4, 7, 9],
            Self::Minor => &[0, 2, 3, 5, 7, 8, 10],
            Self::MinorPentatonic => &[0, 3, 5, 7, 10],
            Self::Blues => &[0, 3, 5, 6, 7, 10],
            Self::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            Self::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            Self::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            Self::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            Self::Locrian => &[0, 1, 3, 5, 6, 8, 10],
            Self::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            Self::MelodicMinor => &[0, 2, 3, 5, 7, 9, 11],
            Self::WholeTone => &[0, 2, 4, 6, 8, 10],
        }
    }
}

impl FromStr for Genre {
    type Err = UnknownProfile;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_name(value);
        Self::ALL
            .into_iter()
            .find(|genre| genre.name() == normalized)
            .ok_or_else(|| UnknownProfile {
                kind: "genre",
                name: value.to_string(),
            })
    }
}

impl FromStr for Mood {
    type Err = UnknownProfile;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_name(value);
        Self::ALL
            .into_iter()
            .find(|mood| mood.name() == normalized)
            .ok_or_else(|| UnknownProfile {
                kind: "mood",
                name: value.to_string(),
            })
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Accepts "Hip-Hop", "R&B" and friends alongside the canonical names.
fn normalize_name(value: &str) -> String {
    value
        .trim()
        .to_ascii_lowercase()
        .replace("r&b", "rnb")
        .chars()
        .filter(|character| !matches!(character, '-' | '_' | ' '))
        .collect()
}
