use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    options::clamp_complexity,
    theory::{ChordSymbol, NoteLength, Triad, transpose},
    time::{BEATS_PER_BAR, PPQ, beats_to_ticks},
};

pub const MIN_BARS: u32 = 4;
pub const SECONDS_PER_BAR_HEURISTIC: f64 = 15.0;
pub const ORNAMENT_COMPLEXITY_THRESHOLD: f64 = 50.0;
pub const ORNAMENT_VELOCITY_SCALE: f32 = 0.8;
const MAX_PREALLOCATED_EVENTS: usize = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Offset from the start of the piece in ticks at [`PPQ`] per beat.
    pub start_tick: u64,
    pub pitch: u8,
    pub length: NoteLength,
    pub velocity: f32,
    pub chord: ChordSymbol,
    /// Full triad sounding under this note, for the accompaniment voice.
    pub harmony: Triad,
    pub bass: u8,
    pub ornament: bool,
}

impl NoteEvent {
    #[must_use]
    pub fn start_beats(&self) -> f64 {
        self.start_tick as f64 / f64::from(PPQ)
    }

    #[must_use]
    pub fn transposed(self, semitones: i8) -> Self {
        Self {
            pitch: transpose(self.pitch, semitones),
            harmony: self.harmony.map(|pitch| transpose(pitch, semitones)),
            bass: transpose(self.bass, semitones),
            ..self
        }
    }
}

#[must_use]
pub fn bar_count(duration_seconds: f64) -> u32 {
    let duration = if duration_seconds.is_finite() {
        duration_seconds.max(0.0)
    } else {
        0.0
    };
    let bars = (duration / SECONDS_PER_BAR_HEURISTIC).ceil();
    (bars.min(f64::from(u32::MAX)) as u32).max(MIN_BARS)
}

/// Probability of a note on any beat; the same curve drives ornament density.
#[must_use]
pub fn variety(complexity: f64) -> f64 {
    0.2 + 0.8 * (clamp_complexity(complexity) / 100.0)
}

#[must_use]
pub fn chords_per_bar(complexity: f64) -> u32 {
    let complexity = clamp_complexity(complexity);
    if complexity < 30.0 {
        1
    } else if complexity < 60.0 {
        2
    } else {
        4
    }
}

#[must_use]
pub fn pick_note_length(draw: f64, rhythmic_variety: f64) -> NoteLength {
    if draw < 0.4 - 0.2 * rhythmic_variety {
        NoteLength::Quarter
    } else if draw < 0.7 - 0.1 * rhythmic_variety {
        NoteLength::Eighth
    } else if draw < 0.85 {
        NoteLength::Half
    } else {
        NoteLength::Sixteenth
    }
}

/// Expands a progression into a beat-resolved stream of note events.
///
/// The piece spans `max(4, ceil(duration / 15))` bars of 4/4. Harmonic rhythm is one,
/// two or four chords per bar depending on complexity, cycling through the progression.
/// Each beat sounds with probability equal to the rhythmic variety; above complexity 50
/// a sounding beat may gain a sixteenth-note ornament on the chord tone two steps up.
#[instrument(skip(progression, rng), fields(progression_len = progression.len(), bars, events))]
pub fn generate_notes(
    progression: &[ChordSymbol],
    complexity: f64,
    duration_seconds: f64,
    rng: &mut impl Rng,
) -> Vec<NoteEvent> {
    let progression = if progression.is_empty() {
        warn!("empty progression, using tonic");
        &[ChordSymbol::TONIC][..]
    } else {
        progression
    };

    let complexity = clamp_complexity(complexity);
    let bars = bar_count(duration_seconds);
    let rhythmic_variety = variety(complexity);
    let note_variety = variety(complexity);
    let chords_per_bar = chords_per_bar(complexity);
    let beats_per_chord = u64::from(BEATS_PER_BAR / chords_per_bar);

    let total_beats = u64::from(bars) * u64::from(BEATS_PER_BAR);
    let capacity = usize::try_from(total_beats.saturating_mul(2))
        .unwrap_or(usize::MAX)
        .min(MAX_PREALLOCATED_EVENTS);
    let mut notes = Vec::with_capacity(capacity);
    for beat in 0..total_beats {
        let slot = usize::try_from(beat / beats_per_chord).unwrap_or(usize::MAX);
        let chord = progression[slot % progression.len()];
        let harmony = chord.triad();
        let bass = chord.bass();

        if rng.random::<f64>() >= rhythmic_variety {
            continue;
        }

        let tone_index = rng.random_range(0..harmony.len());
        let length = pick_note_length(rng.random::<f64>(), rhythmic_variety);
        let velocity = 0.5 + rng.random::<f32>() * 0.5;
        let start_tick = beat * u64::from(PPQ);

        notes.push(NoteEvent {
            start_tick,
            pitch: harmony[tone_index],
            length,
            velocity,
            chord,
            harmony,
            bass,
            ornament: false,
        });

        if complexity > ORNAMENT_COMPLEXITY_THRESHOLD && rng.random::<f64>() < note_variety * 0.4 {
            notes.push(NoteEvent {
                start_tick: start_tick + beats_to_ticks(NoteLength::Sixteenth.beats()),
                pitch: harmony[(tone_index + 2) % harmony.len()],
                length: NoteLength::Sixteenth,
                velocity: velocity * ORNAMENT_VELOCITY_SCALE,
                chord,
                harmony,
                bass,
                ornament: true,
            });
        }
    }

    tracing::Span::current().record("bars", bars);
    tracing::Span::current().record("events", notes.len());
    debug!(
        complexity,
        chords_per_bar,
        total_beats,
        events = notes.len(),
        "note sequence generated"
    );
    notes
}

pub fn transpose_notes(notes: &mut [NoteEvent], semitones: i8) {
    if semitones == 0 {
        return;
    }
    for note in notes {
        *note = note.transposed(semitones);
    }
}
