pub mod config;
pub mod diagnostics;
pub mod dsp;
pub mod engine;
pub mod export;
pub mod fingerprint;
pub mod fixtures;
pub mod options;
pub mod persistence;
pub mod profiles;
pub mod render;
pub mod selector;
pub mod sequencer;
pub mod theory;
pub mod time;
pub mod track;
pub mod voices;
pub mod waveform;

pub use config::EngineConfig;
pub use diagnostics::{
    TelemetryGuard, init_tracing, init_tracing_from_config, init_tracing_with_options,
};
pub use engine::{Engine, EngineError, ExportKind, GenerationOutcome, RenderResult};
pub use fingerprint::{FingerprintReport, generate_fingerprint};
pub use options::{GenerationOptions, InstrumentFocus, InstrumentMix};
pub use profiles::{Genre, GenreProfile, Mood, MoodProfile};
pub use render::{
    ProgressSink, RenderBuffer, RenderError, RenderOutcome, RenderSettings, RenderToken, Renderer,
    StopHandle,
};
pub use selector::{TempoAndProgression, select_tempo_and_progression};
pub use sequencer::{NoteEvent, generate_notes};
pub use theory::{ChordSymbol, NoteLength};
pub use track::GeneratedTrack;
pub use voices::{
    VoiceConfig, VoiceRole, VoiceSet, build_accompaniment_voice, build_bass_voice,
    build_lead_voice, build_voice_set,
};
pub use waveform::reduce;
