use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    dsp::{EffectChain, envelope_level, oscillator_sample},
    sequencer::NoteEvent,
    theory::midi_to_frequency,
    time::{seconds_to_samples, ticks_to_seconds},
    voices::{
        Envelope, OscillatorShape, PERCUSSION_IMPLEMENTED, PercussionPlan, VoiceConfig, VoiceRole,
        VoiceSet,
    },
};

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_CHANNELS: u16 = 2;
pub const DEFAULT_CHUNK_FRAMES: usize = 4_096;
pub const DEFAULT_MAX_DURATION_SECONDS: f64 = 900.0;
pub const FALLBACK_DURATION_SECONDS: f64 = 1.0;
pub const PROGRESS_CEILING: u8 = 98;
pub const PROGRESS_COMPLETE: u8 = 100;

const ACCOMPANIMENT_VELOCITY_SCALE: f32 = 0.7;
const BASS_VELOCITY_SCALE: f32 = 0.9;
const BASS_DURATION_SCALE: f64 = 1.5;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    #[error("invalid output format: sample_rate={sample_rate}, channels={channels}")]
    InvalidFormat { sample_rate: u32, channels: u16 },
    #[error("requested {requested_seconds}s of audio exceeds the {max_seconds}s limit")]
    BufferTooLarge {
        requested_seconds: f64,
        max_seconds: f64,
    },
    #[error("{role:?} voice produced a non-finite sample at frame {frame}")]
    NonFiniteOutput { role: VoiceRole, frame: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub sample_rate: u32,
    pub channels: u16,
    /// Frames synthesized between cancellation and progress checkpoints.
    pub chunk_frames: usize,
    pub max_duration_seconds: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            chunk_frames: DEFAULT_CHUNK_FRAMES,
            max_duration_seconds: DEFAULT_MAX_DURATION_SECONDS,
        }
    }
}

impl RenderSettings {
    fn validate(&self) -> Result<(), RenderError> {
        if self.sample_rate == 0 || self.channels == 0 {
            return Err(RenderError::InvalidFormat {
                sample_rate: self.sample_rate,
                channels: self.channels,
            });
        }
        Ok(())
    }
}

/// Planar float samples, one `Vec` per output channel.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl RenderBuffer {
    #[must_use]
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    #[must_use]
    pub fn first_channel(&self) -> &[f32] {
        self.channel(0).unwrap_or(&[])
    }

    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    #[must_use]
    pub fn interleaved(&self) -> Vec<f32> {
        let mut samples = Vec::with_capacity(self.frames() * self.channel_count());
        for frame in 0..self.frames() {
            for channel in &self.channels {
                samples.push(channel[frame]);
            }
        }
        samples
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Completed(RenderBuffer),
    Cancelled,
}

/// Receives render progress as whole percentages.
pub trait ProgressSink {
    fn report(&mut self, percent: u8);
}

impl<F: FnMut(u8)> ProgressSink for F {
    fn report(&mut self, percent: u8) {
        self(percent);
    }
}

struct ProgressReporter<'a, P: ProgressSink + ?Sized> {
    sink: &'a mut P,
    last: Option<u8>,
}

impl<'a, P: ProgressSink + ?Sized> ProgressReporter<'a, P> {
    fn new(sink: &'a mut P) -> Self {
        Self { sink, last: None }
    }

    fn checkpoint(&mut self, rendered_frames: u64, total_frames: u64) {
        let fraction = rendered_frames as f64 / total_frames.max(1) as f64;
        let percent = (fraction * 100.0).floor().min(f64::from(PROGRESS_CEILING));
        self.emit(percent as u8);
    }

    fn finish(&mut self) {
        self.emit(PROGRESS_COMPLETE);
    }

    fn emit(&mut self, percent: u8) {
        if self.last.is_some_and(|last| percent <= last) {
            return;
        }
        self.last = Some(percent);
        self.sink.report(percent);
    }
}

#[derive(Debug, Clone, Copy)]
struct ScheduledNote {
    role: VoiceRole,
    start_frame: u64,
    gate_frames: u64,
    end_frame: u64,
    frequency: f64,
    velocity: f32,
}

impl ScheduledNote {
    fn render_into(
        &self,
        shape: OscillatorShape,
        envelope: &Envelope,
        chunk_start: u64,
        block: &mut [f32],
        sample_rate: u32,
    ) {
        let rate = f64::from(sample_rate);
        let gate_seconds = self.gate_frames as f64 / rate;
        let first = self.start_frame.max(chunk_start);
        let last = self.end_frame.min(chunk_start + block.len() as u64);

        for frame in first..last {
            let offset = (frame - self.start_frame) as f64;
            let level = envelope_level(envelope, offset / rate, gate_seconds);
            if level <= 0.0 {
                continue;
            }
            let phase = offset * self.frequency / rate;
            block[(frame - chunk_start) as usize] +=
                oscillator_sample(shape, phase) * level * self.velocity;
        }
    }
}

#[derive(Debug)]
struct Bus {
    role: VoiceRole,
    oscillator: OscillatorShape,
    envelope: Envelope,
    gain: f32,
    chain: EffectChain,
    scratch: Vec<f32>,
}

impl Bus {
    fn new(voice: &VoiceConfig, sample_rate: u32) -> Self {
        Self {
            role: voice.role,
            oscillator: voice.oscillator,
            envelope: voice.envelope,
            gain: voice.gain_linear(),
            chain: EffectChain::new(&voice.effects, sample_rate),
            scratch: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct Schedule {
    pending: VecDeque<ScheduledNote>,
    active: Vec<ScheduledNote>,
    buses: Vec<Bus>,
}

impl Schedule {
    fn reset(&mut self) {
        self.pending.clear();
        self.active.clear();
        for bus in &mut self.buses {
            bus.chain.clear();
            bus.scratch.clear();
        }
    }

    fn render_chunk(
        &mut self,
        chunk_start: u64,
        out: &mut [f32],
        sample_rate: u32,
    ) -> Result<(), RenderError> {
        let chunk_end = chunk_start + out.len() as u64;
        while self
            .pending
            .front()
            .is_some_and(|note| note.start_frame < chunk_end)
        {
            if let Some(note) = self.pending.pop_front() {
                self.active.push(note);
            }
        }

        for bus in &mut self.buses {
            bus.scratch.clear();
            bus.scratch.resize(out.len(), 0.0);
            for note in self.active.iter().filter(|note| note.role == bus.role) {
                note.render_into(
                    bus.oscillator,
                    &bus.envelope,
                    chunk_start,
                    &mut bus.scratch,
                    sample_rate,
                );
            }
            bus.chain.process_block(&mut bus.scratch);

            for (index, (sample, voiced)) in out.iter_mut().zip(&bus.scratch).enumerate() {
                let voiced = voiced * bus.gain;
                if !voiced.is_finite() {
                    return Err(RenderError::NonFiniteOutput {
                        role: bus.role,
                        frame: chunk_start + index as u64,
                    });
                }
                *sample += voiced;
            }
        }

        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
        self.active.retain(|note| note.end_frame > chunk_end);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SharedSchedule {
    generation: AtomicU64,
    schedule: Mutex<Schedule>,
}

/// Cancels the owning renderer from any thread.
///
/// `stop` returns only after every pending and sounding note has been dropped and the
/// effect tails are cleared. Calling it while idle is a no-op apart from invalidating the
/// current run, so it is safe to call repeatedly.
#[derive(Debug, Clone)]
pub struct StopHandle {
    shared: Arc<SharedSchedule>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.invalidate();
    }

    /// Bumps the run counter, clears the schedule and returns the new counter value.
    fn invalidate(&self) -> u64 {
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let mut schedule = self.shared.schedule.lock();
        let released = schedule.active.len();
        let dropped = schedule.pending.len();
        schedule.reset();
        debug!(released, dropped, generation, "renderer stopped");
        generation
    }
}

/// Identifies one run of a [`Renderer`]. Any stop issued after the token was taken
/// cancels the render it is passed to, even if that render has not started yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderToken(u64);

#[derive(Debug)]
pub struct Renderer {
    settings: RenderSettings,
    shared: Arc<SharedSchedule>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RenderSettings::default())
    }
}

impl Renderer {
    #[must_use]
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            shared: Arc::new(SharedSchedule::default()),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    #[must_use]
    pub fn pending_event_count(&self) -> usize {
        self.shared.schedule.lock().pending.len()
    }

    #[must_use]
    pub fn active_voice_count(&self) -> usize {
        self.shared.schedule.lock().active.len()
    }

    /// Stops whatever is running and opens a new run.
    pub fn begin(&self) -> RenderToken {
        RenderToken(self.stop_handle().invalidate())
    }

    /// Validates the output format and returns the duration that would be rendered for
    /// `duration_seconds`, rejecting anything over `max_duration_seconds`.
    pub fn check_duration(&self, duration_seconds: f64) -> Result<f64, RenderError> {
        self.settings.validate()?;
        let duration_seconds = effective_duration(duration_seconds);
        if duration_seconds > self.settings.max_duration_seconds {
            return Err(RenderError::BufferTooLarge {
                requested_seconds: duration_seconds,
                max_seconds: self.settings.max_duration_seconds,
            });
        }
        Ok(duration_seconds)
    }

    /// Synthesizes `duration_seconds` of audio for `notes` on the configured voices,
    /// as part of the run that is current when the call starts.
    pub fn render<P: ProgressSink + ?Sized>(
        &mut self,
        notes: &[NoteEvent],
        voices: &VoiceSet,
        tempo: u32,
        duration_seconds: f64,
        progress: &mut P,
    ) -> Result<RenderOutcome, RenderError> {
        let token = RenderToken(self.shared.generation.load(Ordering::Acquire));
        self.render_for(token, notes, voices, tempo, duration_seconds, progress)
    }

    /// Renders as part of the run identified by `token`.
    ///
    /// Progress is reported after each chunk, capped at 98 until the buffer is complete
    /// and then exactly 100. A stop request observed at a chunk boundary ends the run
    /// with [`RenderOutcome::Cancelled`] and no further progress.
    #[instrument(
        skip(self, notes, voices, progress),
        fields(notes = notes.len(), frames)
    )]
    pub fn render_for<P: ProgressSink + ?Sized>(
        &mut self,
        token: RenderToken,
        notes: &[NoteEvent],
        voices: &VoiceSet,
        tempo: u32,
        duration_seconds: f64,
        progress: &mut P,
    ) -> Result<RenderOutcome, RenderError> {
        let duration_seconds = self.check_duration(duration_seconds)?;
        let RenderToken(generation) = token;
        if self.is_stale(generation) {
            info!("render cancelled before scheduling");
            return Ok(RenderOutcome::Cancelled);
        }

        let sample_rate = self.settings.sample_rate;
        let total_frames = seconds_to_samples(duration_seconds, sample_rate).max(1);
        let frame_count =
            usize::try_from(total_frames).map_err(|_| RenderError::BufferTooLarge {
                requested_seconds: duration_seconds,
                max_seconds: self.settings.max_duration_seconds,
            })?;
        tracing::Span::current().record("frames", total_frames);

        {
            let mut schedule = self.shared.schedule.lock();
            schedule.reset();
            schedule.buses = voices
                .iter()
                .map(|voice| Bus::new(voice, sample_rate))
                .collect();
            schedule.pending = build_schedule(notes, voices, tempo, sample_rate, total_frames);
            if self.is_stale(generation) {
                schedule.reset();
                info!("render cancelled before start");
                return Ok(RenderOutcome::Cancelled);
            }
            debug!(
                scheduled = schedule.pending.len(),
                buses = schedule.buses.len(),
                "schedule prepared"
            );
        }

        if let Some(plan) = &voices.percussion {
            schedule_percussion(plan, tempo, duration_seconds);
        }

        let mut reporter = ProgressReporter::new(progress);
        reporter.checkpoint(0, total_frames);

        let started = Instant::now();
        let chunk_frames = self.settings.chunk_frames.max(1);
        let mut mix = vec![0.0_f32; frame_count];
        let mut cursor = 0_usize;
        while cursor < frame_count {
            let end = (cursor + chunk_frames).min(frame_count);
            {
                let mut schedule = self.shared.schedule.lock();
                if self.is_stale(generation) {
                    schedule.reset();
                    info!(rendered_frames = cursor, "render cancelled");
                    return Ok(RenderOutcome::Cancelled);
                }
                if let Err(error) =
                    schedule.render_chunk(cursor as u64, &mut mix[cursor..end], sample_rate)
                {
                    schedule.reset();
                    warn!(%error, "render failed");
                    return Err(error);
                }
            }
            cursor = end;
            if !self.is_stale(generation) {
                reporter.checkpoint(cursor as u64, total_frames);
            }
        }

        {
            let mut schedule = self.shared.schedule.lock();
            schedule.reset();
            if self.is_stale(generation) {
                info!("render cancelled after final chunk");
                return Ok(RenderOutcome::Cancelled);
            }
        }

        let elapsed = started.elapsed().as_secs_f64();
        let channels = usize::from(self.settings.channels);
        let mut planar = Vec::with_capacity(channels);
        planar.resize(channels.saturating_sub(1), mix.clone());
        planar.push(mix);

        reporter.finish();
        info!(
            frames = total_frames,
            channels,
            realtime_factor = elapsed / duration_seconds,
            "render complete"
        );
        Ok(RenderOutcome::Completed(RenderBuffer {
            sample_rate,
            channels: planar,
        }))
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.shared.generation.load(Ordering::Acquire) != generation
    }
}

fn effective_duration(duration_seconds: f64) -> f64 {
    if duration_seconds.is_finite() && duration_seconds > 0.0 {
        duration_seconds
    } else {
        warn!(
            duration_seconds,
            fallback = FALLBACK_DURATION_SECONDS,
            "render duration clamped"
        );
        FALLBACK_DURATION_SECONDS
    }
}

fn build_schedule(
    notes: &[NoteEvent],
    voices: &VoiceSet,
    tempo: u32,
    sample_rate: u32,
    total_frames: u64,
) -> VecDeque<ScheduledNote> {
    let bpm = f64::from(tempo.max(1));
    let mut scheduled = Vec::with_capacity(notes.len() * 5);

    for note in notes {
        let start_frame = seconds_to_samples(ticks_to_seconds(note.start_tick, bpm), sample_rate);
        if start_frame >= total_frames {
            continue;
        }
        let gate_seconds = note.length.beats() * 60.0 / bpm;

        push_note(
            &mut scheduled,
            &voices.lead,
            start_frame,
            note.pitch,
            gate_seconds,
            note.velocity,
            sample_rate,
        );
        if let Some(voice) = &voices.accompaniment {
            for pitch in note.harmony {
                push_note(
                    &mut scheduled,
                    voice,
                    start_frame,
                    pitch,
                    gate_seconds,
                    note.velocity * ACCOMPANIMENT_VELOCITY_SCALE,
                    sample_rate,
                );
            }
        }
        if let Some(voice) = &voices.bass {
            push_note(
                &mut scheduled,
                voice,
                start_frame,
                note.bass,
                gate_seconds * BASS_DURATION_SCALE,
                note.velocity * BASS_VELOCITY_SCALE,
                sample_rate,
            );
        }
    }

    scheduled.sort_by_key(|note| note.start_frame);
    scheduled.into()
}

fn push_note(
    scheduled: &mut Vec<ScheduledNote>,
    voice: &VoiceConfig,
    start_frame: u64,
    pitch: u8,
    gate_seconds: f64,
    velocity: f32,
    sample_rate: u32,
) {
    let gate_frames = seconds_to_samples(gate_seconds, sample_rate);
    let release_frames =
        seconds_to_samples(f64::from(voice.envelope.release.max(0.0)), sample_rate);
    scheduled.push(ScheduledNote {
        role: voice.role,
        start_frame,
        gate_frames,
        end_frame: start_frame + gate_frames + release_frames,
        frequency: midi_to_frequency(pitch),
        velocity: velocity.clamp(0.0, 1.0),
    });
}

/// Drum scheduling extension point. Records what would be played and schedules nothing
/// until [`PERCUSSION_IMPLEMENTED`] flips.
fn schedule_percussion(plan: &PercussionPlan, tempo: u32, duration_seconds: f64) {
    info!(
        genre = %plan.genre,
        mood = %plan.mood,
        level = plan.level,
        tempo,
        duration_seconds,
        implemented = PERCUSSION_IMPLEMENTED,
        "percussion requested; drum pattern scheduling is not implemented"
    );
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    use super::*;
    use crate::{
        options::{InstrumentFocus, InstrumentMix},
        profiles::{Genre, Mood},
        sequencer::generate_notes,
        theory::ChordSymbol,
        voices::build_voice_set,
    };

    fn test_settings() -> RenderSettings {
        RenderSettings {
            sample_rate: 8_000,
            channels: 2,
            chunk_frames: 512,
            max_duration_seconds: 60.0,
        }
    }

    fn test_voices(genre: Genre, mood: Mood) -> VoiceSet {
        build_voice_set(genre, mood, InstrumentFocus::Balanced, &InstrumentMix::new())
    }

    fn test_notes(seed: u64) -> Vec<NoteEvent> {
        let progression = [
            ChordSymbol::MajorOne,
            ChordSymbol::MajorFour,
            ChordSymbol::MajorFive,
        ];
        generate_notes(
            &progression,
            80.0,
            10.0,
            &mut Pcg64::seed_from_u64(seed),
        )
    }

    fn completed(outcome: RenderOutcome) -> RenderBuffer {
        match outcome {
            RenderOutcome::Completed(buffer) => buffer,
            RenderOutcome::Cancelled => panic!("render was cancelled"),
        }
    }

    #[test]
    fn empty_schedule_renders_silence_with_requested_shape() {
        let mut renderer = Renderer::new(test_settings());
        let voices = test_voices(Genre::Pop, Mood::Relaxed);
        let mut reports = Vec::new();
        let buffer = completed(
            renderer
                .render(&[], &voices, 120, 2.0, &mut |percent: u8| reports.push(percent))
                .expect("render should succeed"),
        );

        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frames(), 16_000);
        assert!(buffer.first_channel().iter().all(|sample| *sample == 0.0));
        assert_eq!(reports.first(), Some(&0));
        assert_eq!(reports.last(), Some(&100));
        assert!(reports.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(
            reports[..reports.len() - 1]
                .iter()
                .all(|percent| *percent <= PROGRESS_CEILING)
        );
    }

    #[test]
    fn notes_produce_bounded_audio_on_every_channel() {
        let mut renderer = Renderer::new(test_settings());
        let voices = test_voices(Genre::Rock, Mood::Angry);
        let buffer = completed(
            renderer
                .render(&test_notes(5), &voices, 120, 4.0, &mut |_: u8| {})
                .expect("render should succeed"),
        );

        let left = buffer.channel(0).expect("left channel");
        let right = buffer.channel(1).expect("right channel");
        assert_eq!(left, right);
        assert!(left.iter().any(|sample| sample.abs() > 1e-4));
        assert!(left.iter().all(|sample| (-1.0..=1.0).contains(sample)));
        assert_eq!(buffer.interleaved().len(), buffer.frames() * 2);
        assert_eq!(renderer.pending_event_count(), 0);
        assert_eq!(renderer.active_voice_count(), 0);
    }

    #[test]
    fn non_positive_duration_falls_back_to_one_second() {
        let mut renderer = Renderer::new(test_settings());
        let voices = test_voices(Genre::Jazz, Mood::Relaxed);
        for duration in [0.0, -5.0, f64::NAN] {
            let buffer = completed(
                renderer
                    .render(&[], &voices, 100, duration, &mut |_: u8| {})
                    .expect("render should succeed"),
            );
            assert!((buffer.duration_seconds() - FALLBACK_DURATION_SECONDS).abs() < 1e-9);
        }
    }

    #[test]
    fn stop_before_render_starts_cancels_the_open_run() {
        let mut renderer = Renderer::new(test_settings());
        let voices = test_voices(Genre::Pop, Mood::Uplifting);
        let token = renderer.begin();
        renderer.stop_handle().stop();

        let mut reports = Vec::new();
        let outcome = renderer
            .render_for(token, &test_notes(3), &voices, 120, 2.0, &mut |percent: u8| {
                reports.push(percent);
            })
            .expect("a cancelled run is not an error");
        assert_eq!(outcome, RenderOutcome::Cancelled);
        assert!(reports.is_empty());
        assert_eq!(renderer.pending_event_count(), 0);

        let fresh = renderer.begin();
        let buffer = completed(
            renderer
                .render_for(fresh, &test_notes(3), &voices, 120, 2.0, &mut |_: u8| {})
                .expect("a fresh run should render"),
        );
        assert_eq!(buffer.frames(), 16_000);
    }

    #[test]
    fn duration_check_matches_render_limits() {
        let renderer = Renderer::new(RenderSettings {
            max_duration_seconds: 10.0,
            ..test_settings()
        });
        assert_eq!(renderer.check_duration(4.0), Ok(4.0));
        assert_eq!(renderer.check_duration(-1.0), Ok(FALLBACK_DURATION_SECONDS));
        assert!(matches!(
            renderer.check_duration(1.0e11),
            Err(RenderError::BufferTooLarge { .. })
        ));

        let silent = Renderer::new(RenderSettings {
            channels: 0,
            ..test_settings()
        });
        assert!(matches!(
            silent.check_duration(1.0),
            Err(RenderError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn oversized_request_fails_without_poisoning_the_renderer() {
        let mut renderer = Renderer::new(RenderSettings {
            max_duration_seconds: 2.0,
            ..test_settings()
        });
        let voices = test_voices(Genre::Pop, Mood::Energetic);
        let error = renderer
            .render(&test_notes(1), &voices, 120, 30.0, &mut |_: u8| {})
            .expect_err("oversized render should fail");
        assert!(matches!(error, RenderError::BufferTooLarge { .. }));

        let buffer = completed(
            renderer
                .render(&test_notes(1), &voices, 120, 1.5, &mut |_: u8| {})
                .expect("follow-up render should succeed"),
        );
        assert_eq!(buffer.frames(), 12_000);
    }

    #[test]
    fn zero_sample_rate_is_rejected() {
        let mut renderer = Renderer::new(RenderSettings {
            sample_rate: 0,
            ..test_settings()
        });
        let voices = test_voices(Genre::Pop, Mood::Energetic);
        let error = renderer
            .render(&[], &voices, 120, 1.0, &mut |_: u8| {})
            .expect_err("zero sample rate should fail");
        assert!(matches!(error, RenderError::InvalidFormat { .. }));
    }

    #[test]
    fn stop_while_idle_is_idempotent() {
        let mut renderer = Renderer::new(test_settings());
        renderer.stop();
        renderer.stop();
        let voices = test_voices(Genre::Folk, Mood::Peaceful);
        let outcome = renderer
            .render(&test_notes(2), &voices, 90, 1.0, &mut |_: u8| {})
            .expect("render after idle stop should succeed");
        assert!(matches!(outcome, RenderOutcome::Completed(_)));
    }

    #[test]
    fn stop_mid_render_cancels_and_releases_everything() {
        let mut renderer = Renderer::new(test_settings());
        let handle = renderer.stop_handle();
        let voices = test_voices(Genre::Ambient, Mood::Dreamy);
        let mut reports = Vec::new();

        let outcome = renderer
            .render(&test_notes(9), &voices, 120, 8.0, &mut |percent: u8| {
                reports.push(percent);
                if percent >= 30 {
                    handle.stop();
                }
            })
            .expect("cancellation is not an error");

        assert_eq!(outcome, RenderOutcome::Cancelled);
        assert!(!reports.contains(&PROGRESS_COMPLETE));
        assert_eq!(renderer.pending_event_count(), 0);
        assert_eq!(renderer.active_voice_count(), 0);

        let buffer = completed(
            renderer
                .render(&[], &voices, 120, 1.0, &mut |_: u8| {})
                .expect("render after cancellation should succeed"),
        );
        assert!(buffer.first_channel().iter().all(|sample| *sample == 0.0));
    }

    #[test]
    fn notes_beyond_the_buffer_are_not_scheduled() {
        let voices = test_voices(Genre::Pop, Mood::Energetic);
        let notes = test_notes(4);
        let scheduled = build_schedule(&notes, &voices, 120, 8_000, 8_000);
        assert!(scheduled.iter().all(|note| note.start_frame < 8_000));
        assert!(
            scheduled
                .iter()
                .zip(scheduled.iter().skip(1))
                .all(|(left, right)| left.start_frame <= right.start_frame)
        );
    }

    #[test]
    fn bass_notes_ring_longer_and_softer_than_the_lead() {
        let voices = test_voices(Genre::Pop, Mood::Melancholic);
        let note = test_notes(3)[0];
        let scheduled = build_schedule(&[note], &voices, 120, 8_000, 1_000_000);

        let lead = scheduled
            .iter()
            .find(|entry| entry.role == VoiceRole::Lead)
            .expect("lead note");
        let bass = scheduled
            .iter()
            .find(|entry| entry.role == VoiceRole::Bass)
            .expect("bass note");
        let chord_tones = scheduled
            .iter()
            .filter(|entry| entry.role == VoiceRole::Accompaniment)
            .count();

        assert_eq!(chord_tones, 3);
        assert_eq!(bass.gate_frames, (lead.gate_frames as f64 * 1.5).round() as u64);
        assert!((bass.velocity - lead.velocity * 0.9).abs() < 1e-6);
    }
}
