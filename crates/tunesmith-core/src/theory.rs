use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub type Triad = [u8; 3];

pub const MIDI_PITCH_MAX: u8 = 127;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized chord symbol: {0}")]
pub struct UnknownChordSymbol(pub String);

/// Roman-numeral harmonic function relative to a C tonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChordSymbol {
    #[serde(rename = "I")]
    MajorOne,
    #[serde(rename = "ii")]
    MinorTwo,
    #[serde(rename = "iii")]
    MinorThree,
    #[serde(rename = "IV")]
    MajorFour,
    #[serde(rename = "V")]
    MajorFive,
    #[serde(rename = "vi")]
    MinorSix,
    #[serde(rename = "vii°")]
    DiminishedSeven,
    #[serde(rename = "i")]
    MinorOne,
    #[serde(rename = "III")]
    FlatThree,
    #[serde(rename = "iv")]
    MinorFour,
    #[serde(rename = "v")]
    MinorFive,
    #[serde(rename = "VI")]
    FlatSix,
    #[serde(rename = "VII")]
    FlatSeven,
}

impl ChordSymbol {
    pub const ALL: [Self; 13] = [
        Self::MajorOne,
        Self::MinorTwo,
        Self::MinorThree,
        Self::MajorFour,
        Self::MajorFive,
        Self::MinorSix,
        Self::DiminishedSeven,
        Self::MinorOne,
        Self::FlatThree,
        Self::MinorFour,
        Self::MinorFive,
        Self::FlatSix,
        Self::FlatSeven,
    ];

    pub const TONIC: Self = Self::MajorOne;

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::MajorOne => "I",
            Self::MinorTwo => "ii",
            Self::MinorThree => "iii",
            Self::MajorFour => "IV",
            Self::MajorFive => "V",
            Self::MinorSix => "vi",
            Self::DiminishedSeven => "vii°",
            Self::MinorOne => "i",
            Self::FlatThree => "III",
            Self::MinorFour => "iv",
            Self::MinorFive => "v",
            Self::FlatSix => "VI",
            Self::FlatSeven => "VII",
        }
    }

    /// Close-voiced triad around middle C, as MIDI note numbers.
    #[must_use]
    pub const fn triad(self) -> Triad {
        match self {
            Self::MajorOne => [60, 64, 67],
            Self::MinorTwo => [62, 65, 69],
            Self::MinorThree => [64, 67, 71],
            Self::MajorFour => [65, 69, 72],
            Self::MajorFive => [67, 71, 74],
            Self::MinorSix => [69, 72, 76],
            Self::DiminishedSeven => [71, 74, 77],
            Self::MinorOne => [60, 63, 67],
            Self::FlatThree => [63, 67, 70],
            Self::MinorFour => [65, 68, 72],
            Self::MinorFive => [67, 70, 74],
            Self::FlatSix => [68, 72, 75],
            Self::FlatSeven => [70, 74, 77],
        }
    }

    /// Root two octaves below the triad.
    #[must_use]
    pub const fn bass(self) -> u8 {
        match self {
            Self::MajorOne | Self::MinorOne => 36,
            Self::MinorTwo => 38,
            Self::FlatThree => 39,
            Self::MinorThree => 40,
            Self::MajorFour | Self::MinorFour => 41,
            Self::MajorFive | Self::MinorFive => 43,
            Self::FlatSix => 44,
            Self::MinorSix => 45,
            Self::FlatSeven => 46,
            Self::DiminishedSeven => 47,
        }
    }

    /// Resolves a symbol, falling back to the tonic for anything unrecognized.
    #[must_use]
    pub fn resolve(symbol: &str) -> Self {
        symbol.parse().unwrap_or_else(|error: UnknownChordSymbol| {
            warn!(%error, "falling back to tonic chord");
            Self::TONIC
        })
    }
}

impl FromStr for ChordSymbol {
    type Err = UnknownChordSymbol;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        // "viio" is the common ASCII spelling of the diminished seventh.
        if trimmed == "viio" {
            return Ok(Self::DiminishedSeven);
        }
        Self::ALL
            .into_iter()
            .find(|chord| chord.symbol() == trimmed)
            .ok_or_else(|| UnknownChordSymbol(value.to_string()))
    }
}

impl fmt::Display for ChordSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[must_use]
pub fn parse_progression<S: AsRef<str>>(symbols: &[S]) -> Vec<ChordSymbol> {
    symbols
        .iter()
        .map(|symbol| ChordSymbol::resolve(symbol.as_ref()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteLength {
    Sixteenth,
    Eighth,
    Quarter,
    Half,
}

impl NoteLength {
    #[must_use]
    pub const fn beats(self) -> f64 {
        match self {
            Self::Sixteenth => 0.25,
            Self::Eighth => 0.5,
            Self::Quarter => 1.0,
            Self::Half => 2.0,
        }
    }
}

#[must_use]
pub fn midi_to_frequency(pitch: u8) -> f64 {
    let semitone_offset = f64::from(i16::from(pitch) - 69);
    440.0 * 2_f64.powf(semitone_offset / 12.0)
}

#[must_use]
pub fn transpose(pitch: u8, semitones: i8) -> u8 {
    let shifted = i16::from(pitch) + i16::from(semitones);
    shifted.clamp(0, i16::from(MIDI_PITCH_MAX)) as u8
}
