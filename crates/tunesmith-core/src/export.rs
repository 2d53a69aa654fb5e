use std::{fs, path::Path};

use anyhow::{Context, Result};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use tracing::{debug, info, instrument};

use crate::{
    render::RenderBuffer,
    sequencer::NoteEvent,
    time::{PPQ, beats_to_ticks},
    voices::{VoiceRole, VoiceSet},
};

const BASS_LENGTH_SCALE: f64 = 1.5;
const ACCOMPANIMENT_VELOCITY_SCALE: f32 = 0.7;
const BASS_VELOCITY_SCALE: f32 = 0.9;

#[derive(Debug, Clone)]
struct AbsoluteMidiEvent {
    tick: u64,
    order: u8,
    kind: TrackEventKind<'static>,
}

#[derive(Debug, Clone, Copy)]
struct MidiPart {
    role: VoiceRole,
    name: &'static [u8],
    channel: u8,
    program: u8,
}

const LEAD_PART: MidiPart = MidiPart {
    role: VoiceRole::Lead,
    name: b"Lead",
    channel: 0,
    program: 80,
};
const ACCOMPANIMENT_PART: MidiPart = MidiPart {
    role: VoiceRole::Accompaniment,
    name: b"Accompaniment",
    channel: 1,
    program: 88,
};
const BASS_PART: MidiPart = MidiPart {
    role: VoiceRole::Bass,
    name: b"Bass",
    channel: 2,
    program: 33,
};

#[instrument(skip(buffer), fields(frames = buffer.frames(), path = %path.display()))]
pub fn export_wav(buffer: &RenderBuffer, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create wav output directory: {}",
                parent.display()
            )
        })?;
    }

    let channels = u16::try_from(buffer.channel_count())
        .context("too many channels for a wav file")?
        .max(1);
    let spec = hound::WavSpec {
        channels,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("failed to create wav file: {}", path.display()))?;

    if buffer.channel_count() == 0 {
        debug!("buffer has no channels, writing an empty wav");
    }
    for sample in buffer.interleaved() {
        writer
            .write_sample(quantize(sample))
            .context("failed to write wav sample")?;
    }

    writer.finalize().context("failed to finalize wav file")?;
    info!("wav export completed");
    Ok(())
}

#[instrument(skip(notes, voices), fields(notes = notes.len(), path = %path.display()))]
pub fn export_midi(
    notes: &[NoteEvent],
    tempo: u32,
    voices: &VoiceSet,
    path: &Path,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create midi output directory: {}",
                parent.display()
            )
        })?;
    }

    let bytes = midi_bytes(notes, tempo, voices)?;
    fs::write(path, bytes)
        .with_context(|| format!("failed to write midi file: {}", path.display()))?;
    info!("midi export completed");
    Ok(())
}

/// Encodes a format-1 file: a tempo track followed by one track per voice in `voices`.
#[instrument(skip(notes, voices), fields(notes = notes.len()))]
pub fn midi_bytes(notes: &[NoteEvent], tempo: u32, voices: &VoiceSet) -> Result<Vec<u8>> {
    let mut tracks = vec![build_tempo_track(tempo)];

    for part in [LEAD_PART, ACCOMPANIMENT_PART, BASS_PART] {
        if voices.get(part.role).is_none() {
            continue;
        }

        let mut absolute_events: Vec<AbsoluteMidiEvent> = notes
            .iter()
            .flat_map(|note| part_events(part, note))
            .collect();
        absolute_events.sort_by_key(|event| (event.tick, event.order));
        tracks.push(build_part_track(part, absolute_events));
    }

    let header = Header {
        format: Format::Parallel,
        timing: Timing::Metrical(u15::from(PPQ)),
    };

    let mut bytes = Vec::new();
    Smf { header, tracks }
        .write_std(&mut bytes)
        .context("failed to encode midi bytes")?;
    debug!(bytes = bytes.len(), "midi encoded");
    Ok(bytes)
}

fn quantize(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16
}

fn build_tempo_track(tempo: u32) -> Vec<TrackEvent<'static>> {
    let bpm = f64::from(tempo.max(1));
    let micros_per_quarter = (60_000_000.0 / bpm).round().min(f64::from(0x00FF_FFFF)) as u32;

    vec![
        TrackEvent {
            delta: u28::from(0_u32),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::from(micros_per_quarter))),
        },
        TrackEvent {
            delta: u28::from(0_u32),
            kind: TrackEventKind::Meta(MetaMessage::TimeSignature(4, 2, 24, 8)),
        },
        TrackEvent {
            delta: u28::from(0_u32),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ]
}

fn build_part_track(
    part: MidiPart,
    absolute_events: Vec<AbsoluteMidiEvent>,
) -> Vec<TrackEvent<'static>> {
    let mut track_events = Vec::with_capacity(absolute_events.len() + 3);
    track_events.push(TrackEvent {
        delta: u28::from(0_u32),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(part.name)),
    });
    track_events.push(TrackEvent {
        delta: u28::from(0_u32),
        kind: TrackEventKind::Midi {
            channel: u4::from(part.channel),
            message: MidiMessage::ProgramChange {
                program: u7::from(part.program),
            },
        },
    });

    let mut previous_tick = 0_u64;
    for event in absolute_events {
        let delta = event
            .tick
            .saturating_sub(previous_tick)
            .min(u64::from(u32::MAX)) as u32;
        track_events.push(TrackEvent {
            delta: u28::from(delta),
            kind: event.kind,
        });
        previous_tick = event.tick;
    }

    track_events.push(TrackEvent {
        delta: u28::from(0_u32),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    track_events
}

/// Ornaments only ring on the lead; on the harmony parts they would retrigger keys the
/// primary note still holds and end them early.
fn part_events(part: MidiPart, note: &NoteEvent) -> Vec<AbsoluteMidiEvent> {
    if note.ornament && part.role != VoiceRole::Lead {
        return Vec::new();
    }
    let length_ticks = beats_to_ticks(note.length.beats()).max(1);
    match part.role {
        VoiceRole::Lead => note_pair(
            part.channel,
            note.pitch,
            note.velocity,
            note.start_tick,
            length_ticks,
        )
        .to_vec(),
        VoiceRole::Accompaniment => note
            .harmony
            .iter()
            .flat_map(|pitch| {
                note_pair(
                    part.channel,
                    *pitch,
                    note.velocity * ACCOMPANIMENT_VELOCITY_SCALE,
                    note.start_tick,
                    length_ticks,
                )
            })
            .collect(),
        VoiceRole::Bass => {
            let stretched = (length_ticks as f64 * BASS_LENGTH_SCALE).round() as u64;
            note_pair(
                part.channel,
                note.bass,
                note.velocity * BASS_VELOCITY_SCALE,
                note.start_tick,
                stretched,
            )
            .to_vec()
        }
    }
}

fn note_pair(
    channel: u8,
    pitch: u8,
    velocity: f32,
    start_tick: u64,
    length_ticks: u64,
) -> [AbsoluteMidiEvent; 2] {
    let channel = channel.min(15);
    let pitch = pitch.min(127);
    let velocity = (velocity.clamp(0.0, 1.0) * 127.0).round().max(1.0) as u8;
    let end_tick = start_tick.saturating_add(length_ticks);

    [
        AbsoluteMidiEvent {
            tick: start_tick,
            order: 1,
            kind: TrackEventKind::Midi {
                channel: u4::from(channel),
                message: MidiMessage::NoteOn {
                    key: u7::from(pitch),
                    vel: u7::from(velocity),
                },
            },
        },
        AbsoluteMidiEvent {
            tick: end_tick,
            order: 0,
            kind: TrackEventKind::Midi {
                channel: u4::from(channel),
                message: MidiMessage::NoteOff {
                    key: u7::from(pitch),
                    vel: u7::from(0),
                },
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::{ChordSymbol, NoteLength};

    fn note(start_tick: u64) -> NoteEvent {
        let chord = ChordSymbol::MajorOne;
        NoteEvent {
            start_tick,
            pitch: 64,
            length: NoteLength::Quarter,
            velocity: 1.0,
            chord,
            harmony: chord.triad(),
            bass: chord.bass(),
            ornament: false,
        }
    }

    #[test]
    fn quantize_saturates_out_of_range_samples() {
        assert_eq!(quantize(2.0), i16::MAX);
        assert_eq!(quantize(-2.0), -i16::MAX);
        assert_eq!(quantize(0.0), 0);
    }

    #[test]
    fn bass_part_is_stretched() {
        let events = part_events(BASS_PART, &note(0));
        assert_eq!(events[0].tick, 0);
        assert_eq!(events[1].tick, 720);
    }

    #[test]
    fn accompaniment_part_sounds_the_whole_triad() {
        let events = part_events(ACCOMPANIMENT_PART, &note(480));
        assert_eq!(events.len(), 6);
        assert!(events.iter().all(|event| event.tick == 480 || event.tick == 960));
    }

    #[test]
    fn ornaments_stay_on_the_lead_part() {
        let primary = note(0);
        let ornament = NoteEvent {
            start_tick: 120,
            pitch: 67,
            length: NoteLength::Sixteenth,
            ornament: true,
            ..primary
        };
        assert_eq!(part_events(LEAD_PART, &ornament).len(), 2);
        assert!(part_events(ACCOMPANIMENT_PART, &ornament).is_empty());
        assert!(part_events(BASS_PART, &ornament).is_empty());

        let mut events: Vec<AbsoluteMidiEvent> = [primary, ornament]
            .iter()
            .flat_map(|note| part_events(ACCOMPANIMENT_PART, note))
            .collect();
        events.sort_by_key(|event| event.tick);
        assert_eq!(events.last().map(|event| event.tick), Some(480));
        assert!(events.iter().all(|event| event.tick == 0 || event.tick == 480));
    }
}
