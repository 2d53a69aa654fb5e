use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{engine::RenderResult, options::GenerationOptions, theory::ChordSymbol};

/// Metadata stored alongside a finished render. Audio itself is exported separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedTrack {
    pub id: Uuid,
    pub title: String,
    pub genre: String,
    pub mood: String,
    pub tempo: u32,
    pub duration_seconds: f64,
    pub progression: Vec<ChordSymbol>,
    pub note_count: usize,
    pub waveform: Vec<f32>,
    #[serde(default)]
    pub lyrics: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub params: GenerationOptions,
    pub created_at: DateTime<Utc>,
}

impl GeneratedTrack {
    /// Builds the record for `result`. Theme and keywords are copied from `options` for
    /// later lyric or title work and never influence the music.
    #[must_use]
    pub fn new(options: &GenerationOptions, result: &RenderResult, title: Option<String>) -> Self {
        let title = title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| default_title(&options.genre, &options.mood));
        Self {
            id: Uuid::new_v4(),
            title,
            genre: result.genre.name().to_string(),
            mood: result.mood.name().to_string(),
            tempo: result.tempo,
            duration_seconds: result.buffer.duration_seconds(),
            progression: result.progression.clone(),
            note_count: result.notes.len(),
            waveform: result.waveform.clone(),
            lyrics: None,
            theme: options.theme.clone(),
            keywords: options.keywords.clone(),
            params: options.clone(),
            created_at: Utc::now(),
        }
    }

    /// Attaches lyric text when the request asked for lyrics on a theme; otherwise the
    /// track is returned unchanged.
    #[must_use]
    pub fn with_lyrics(mut self, lyrics: impl Into<String>) -> Self {
        if !self.params.wants_lyrics() {
            debug!(track_id = %self.id, "lyrics not requested, ignoring text");
            return self;
        }
        let lyrics = lyrics.into();
        if !lyrics.trim().is_empty() {
            self.lyrics = Some(lyrics);
        }
        self
    }

    #[must_use]
    pub fn progression_symbols(&self) -> Vec<&'static str> {
        self.progression.iter().map(|chord| chord.symbol()).collect()
    }
}

#[must_use]
pub fn default_title(genre: &str, mood: &str) -> String {
    format!("{genre} {mood} track")
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use super::*;
    use crate::{
        engine::Engine,
        fixtures::{demo_config, demo_options},
    };

    fn demo_result() -> &'static RenderResult {
        static RESULT: OnceLock<RenderResult> = OnceLock::new();
        RESULT.get_or_init(|| {
            Engine::new(demo_config())
                .generate(&demo_options(), &mut |_: u8| {})
                .expect("demo generation should succeed")
                .into_result()
                .expect("demo generation should complete")
        })
    }

    #[test]
    fn default_title_names_genre_and_mood() {
        assert_eq!(default_title("jazz", "relaxed"), "jazz relaxed track");
    }

    #[test]
    fn blank_title_falls_back_and_progression_reads_as_symbols() {
        let result = demo_result();
        let track = GeneratedTrack::new(&demo_options(), result, Some("   ".to_string()));
        assert_eq!(track.title, "electronic dreamy track");
        assert_eq!(track.note_count, result.notes.len());
        assert_eq!(
            track.progression_symbols(),
            result
                .progression
                .iter()
                .map(|chord| chord.symbol())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn lyrics_attach_only_when_requested_on_a_theme() {
        let result = demo_result();
        let themed = GenerationOptions {
            lyrics: true,
            ..demo_options()
        };
        let track = GeneratedTrack::new(&themed, result, None).with_lyrics("neon on wet glass");
        assert_eq!(track.lyrics.as_deref(), Some("neon on wet glass"));

        let declined = GenerationOptions {
            lyrics: false,
            ..demo_options()
        };
        let track = GeneratedTrack::new(&declined, result, None).with_lyrics("unused");
        assert!(track.lyrics.is_none());

        let no_theme = GenerationOptions {
            lyrics: true,
            theme: None,
            ..demo_options()
        };
        let track = GeneratedTrack::new(&no_theme, result, None).with_lyrics("unused");
        assert!(track.lyrics.is_none());
    }
}
