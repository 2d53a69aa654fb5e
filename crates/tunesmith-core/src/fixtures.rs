use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    config::EngineConfig,
    engine::RenderResult,
    options::{GenerationOptions, InstrumentFocus, InstrumentMix},
    render::RenderSettings,
    track::GeneratedTrack,
};

pub const DEMO_SEED: u64 = 0x7E57_5EED;

/// Short seeded request used by the CLI demo and the reproduction checks.
#[must_use]
pub fn demo_options() -> GenerationOptions {
    GenerationOptions {
        genre: "electronic".to_string(),
        mood: "dreamy".to_string(),
        tempo: Some(124),
        duration_seconds: 6.0,
        instrument_focus: InstrumentFocus::Balanced,
        pitch_offset: 0,
        complexity: 72.0,
        instrument_mix: InstrumentMix::new()
            .with("synth", 80.0)
            .with("pad", 55.0)
            .with("bass", 65.0)
            .with("drums", 70.0),
        seed: Some(DEMO_SEED),
        lyrics: false,
        theme: Some("night drive".to_string()),
        keywords: vec!["neon".to_string(), "rain".to_string()],
    }
}

#[must_use]
pub fn demo_config() -> EngineConfig {
    EngineConfig {
        render: RenderSettings {
            sample_rate: 22_050,
            channels: 2,
            chunk_frames: 2_048,
            max_duration_seconds: 60.0,
        },
        ..EngineConfig::default()
    }
}

/// Track record for `result` with a fixed id and timestamp.
#[must_use]
pub fn demo_track(result: &RenderResult) -> GeneratedTrack {
    let mut track = GeneratedTrack::new(&demo_options(), result, Some("Night Drive".to_string()));
    track.id = Uuid::parse_str("3f1c9a52-7d04-4c1b-9e2a-5b8d6f0e4a17")
        .expect("fixture track id should be valid");
    track.created_at = DateTime::parse_from_rfc3339("2026-03-01T00:00:00Z")
        .expect("fixture timestamp should be valid")
        .with_timezone(&Utc);
    track
}
