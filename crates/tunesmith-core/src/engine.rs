use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::{
    config::EngineConfig,
    export,
    options::GenerationOptions,
    profiles::{Genre, Mood},
    render::{ProgressSink, RenderBuffer, RenderError, RenderOutcome, Renderer, StopHandle},
    selector::select_for_profiles,
    sequencer::{NoteEvent, generate_notes, transpose_notes},
    theory::ChordSymbol,
    voices::{VoiceSet, build_voice_set},
    waveform::reduce,
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("render failed: {0}")]
    RenderFailed(#[from] RenderError),
    #[error("io error: {0}")]
    Io(String),
}

impl From<anyhow::Error> for EngineError {
    fn from(value: anyhow::Error) -> Self {
        Self::Io(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    Wav,
    Midi,
}

/// Everything one generation produced. The engine keeps no reference to it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderResult {
    pub buffer: RenderBuffer,
    pub waveform: Vec<f32>,
    pub genre: Genre,
    pub mood: Mood,
    pub tempo: u32,
    pub progression: Vec<ChordSymbol>,
    pub notes: Vec<NoteEvent>,
    pub voices: VoiceSet,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Completed(RenderResult),
    Cancelled,
}

impl GenerationOutcome {
    #[must_use]
    pub fn into_result(self) -> Option<RenderResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::Cancelled => None,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Owns one renderer and runs at most one generation at a time.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    renderer: Renderer,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let renderer = Renderer::new(config.render);
        Self { config, renderer }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle that cancels whichever generation this engine is running.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.renderer.stop_handle()
    }

    pub fn stop(&self) {
        self.renderer.stop();
    }

    #[must_use]
    pub fn pending_event_count(&self) -> usize {
        self.renderer.pending_event_count()
    }

    #[must_use]
    pub fn active_voice_count(&self) -> usize {
        self.renderer.active_voice_count()
    }

    /// Runs the full pipeline with a generator seeded from `options.seed`, or from the
    /// thread RNG when no seed is given.
    pub fn generate<P: ProgressSink + ?Sized>(
        &mut self,
        options: &GenerationOptions,
        progress: &mut P,
    ) -> Result<GenerationOutcome, EngineError> {
        let mut rng = match options.seed {
            Some(seed) => Pcg64::seed_from_u64(seed),
            None => Pcg64::from_rng(&mut rand::rng()),
        };
        self.generate_with_rng(options, &mut rng, progress)
    }

    #[instrument(
        skip(self, options, rng, progress),
        fields(genre = %options.genre, mood = %options.mood, seed = ?options.seed)
    )]
    pub fn generate_with_rng<P: ProgressSink + ?Sized>(
        &mut self,
        options: &GenerationOptions,
        rng: &mut impl Rng,
        progress: &mut P,
    ) -> Result<GenerationOutcome, EngineError> {
        // anything left from an earlier run is released before new notes are scheduled;
        // a stop from here on cancels this run
        let token = self.renderer.begin();
        let duration_seconds = self.renderer.check_duration(options.duration_seconds)?;

        let genre = Genre::resolve(&options.genre);
        let mood = Mood::resolve(&options.mood);
        let selection = select_for_profiles(genre, mood, options.explicit_tempo(), rng);

        let mut notes = generate_notes(
            &selection.progression,
            options.clamped_complexity(),
            duration_seconds,
            rng,
        );
        transpose_notes(&mut notes, options.clamped_pitch_offset());

        let voices = build_voice_set(
            genre,
            mood,
            options.instrument_focus,
            &options.instrument_mix,
        );
        debug!(
            tempo = selection.tempo,
            notes = notes.len(),
            voices = voices.iter().count(),
            "composition ready for render"
        );

        let outcome = self.renderer.render_for(
            token,
            &notes,
            &voices,
            selection.tempo,
            duration_seconds,
            progress,
        )?;

        let buffer = match outcome {
            RenderOutcome::Completed(buffer) => buffer,
            RenderOutcome::Cancelled => {
                info!("generation cancelled");
                return Ok(GenerationOutcome::Cancelled);
            }
        };

        let waveform = reduce(&buffer);
        info!(
            tempo = selection.tempo,
            notes = notes.len(),
            frames = buffer.frames(),
            "generation complete"
        );
        Ok(GenerationOutcome::Completed(RenderResult {
            buffer,
            waveform,
            genre,
            mood,
            tempo: selection.tempo,
            progression: selection.progression,
            notes,
            voices,
        }))
    }

    #[instrument(skip(self, result), fields(kind = ?kind, path = %output_path.display()))]
    pub fn export(
        &self,
        kind: ExportKind,
        result: &RenderResult,
        output_path: &Path,
    ) -> Result<(), EngineError> {
        match kind {
            ExportKind::Wav => export::export_wav(&result.buffer, output_path)?,
            ExportKind::Midi => {
                export::export_midi(&result.notes, result.tempo, &result.voices, output_path)?;
            }
        }
        Ok(())
    }
}
