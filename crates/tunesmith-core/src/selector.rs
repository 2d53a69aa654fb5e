use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    profiles::{Genre, Mood},
    theory::ChordSymbol,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempoAndProgression {
    pub tempo: u32,
    pub progression: Vec<ChordSymbol>,
}

/// Resolves the piece's tempo and harmonic backbone.
///
/// An explicit tempo greater than zero is used verbatim. Otherwise the tempo is drawn
/// uniformly from the mood's inclusive range. The progression is drawn uniformly from
/// the genre's pool. Unknown names never fail; they resolve to the default profiles.
#[instrument(skip(rng), fields(tempo, progression_len))]
pub fn select_tempo_and_progression(
    genre: &str,
    mood: &str,
    explicit_tempo: Option<u32>,
    rng: &mut impl Rng,
) -> TempoAndProgression {
    let mood = Mood::resolve(mood);
    let genre = Genre::resolve(genre);
    select_for_profiles(genre, mood, explicit_tempo, rng)
}

pub fn select_for_profiles(
    genre: Genre,
    mood: Mood,
    explicit_tempo: Option<u32>,
    rng: &mut impl Rng,
) -> TempoAndProgression {
    let tempo = match explicit_tempo.filter(|tempo| *tempo > 0) {
        Some(tempo) => tempo,
        None => {
            let (min, max) = mood.profile().tempo_range;
            rng.random_range(min..=max)
        }
    };

    let pool = genre.profile().progressions;
    let progression = pool[rng.random_range(0..pool.len())].to_vec();

    tracing::Span::current().record("tempo", tempo);
    tracing::Span::current().record("progression_len", progression.len());
    debug!(
        genre = %genre,
        mood = %mood,
        tempo,
        progression = ?progression,
        "tempo and progression selected"
    );

    TempoAndProgression { tempo, progression }
}
