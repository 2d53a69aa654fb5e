use std::f64::consts::TAU;

use crate::voices::{EffectSpec, Envelope, OscillatorShape};

// Freeverb comb/allpass lengths in samples at 44.1 kHz.
const COMB_TUNINGS: [usize; 4] = [1116, 1188, 1277, 1356];
const ALLPASS_TUNINGS: [usize; 2] = [556, 441];
const REVERB_DAMPING: f32 = 0.2;
const ALLPASS_FEEDBACK: f32 = 0.5;

#[must_use]
pub fn oscillator_sample(shape: OscillatorShape, phase: f64) -> f32 {
    let phase = phase.fract();
    match shape {
        OscillatorShape::Sine => (phase * TAU).sin() as f32,
        OscillatorShape::Triangle => {
            if phase < 0.5 {
                (phase * 4.0 - 1.0) as f32
            } else {
                (3.0 - phase * 4.0) as f32
            }
        }
        OscillatorShape::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        OscillatorShape::Sawtooth => (phase * 2.0 - 1.0) as f32,
    }
}

/// Envelope amplitude `elapsed` seconds after note-on for a gate held `gate` seconds.
#[must_use]
pub fn envelope_level(envelope: &Envelope, elapsed: f64, gate: f64) -> f32 {
    if elapsed < 0.0 {
        return 0.0;
    }
    if elapsed < gate {
        return held_level(envelope, elapsed);
    }

    let release = f64::from(envelope.release.max(0.0));
    let released_for = elapsed - gate;
    if release <= 0.0 || released_for >= release {
        return 0.0;
    }
    held_level(envelope, gate) * (1.0 - (released_for / release) as f32)
}

fn held_level(envelope: &Envelope, elapsed: f64) -> f32 {
    let attack = f64::from(envelope.attack.max(0.0));
    let decay = f64::from(envelope.decay.max(0.0));
    let sustain = envelope.sustain.clamp(0.0, 1.0);

    if elapsed < attack {
        return (elapsed / attack) as f32;
    }
    let decayed_for = elapsed - attack;
    if decayed_for < decay {
        return 1.0 - (1.0 - sustain) * (decayed_for / decay) as f32;
    }
    sustain
}

#[derive(Debug, Clone)]
struct DelayLine {
    buffer: Vec<f32>,
    position: usize,
}

impl DelayLine {
    fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length.max(1)],
            position: 0,
        }
    }

    fn read(&self) -> f32 {
        self.buffer[self.position]
    }

    fn write_and_advance(&mut self, sample: f32) {
        self.buffer[self.position] = sample;
        self.position = (self.position + 1) % self.buffer.len();
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.position = 0;
    }
}

#[derive(Debug, Clone)]
struct CombFilter {
    line: DelayLine,
    feedback: f32,
    filter_store: f32,
}

impl CombFilter {
    fn process(&mut self, input: f32) -> f32 {
        let output = self.line.read();
        self.filter_store = output * (1.0 - REVERB_DAMPING) + self.filter_store * REVERB_DAMPING;
        self.line.write_and_advance(input + self.filter_store * self.feedback);
        output
    }
}

#[derive(Debug, Clone)]
pub struct Reverb {
    combs: Vec<CombFilter>,
    allpasses: Vec<DelayLine>,
    wet: f32,
}

impl Reverb {
    #[must_use]
    pub fn new(decay_seconds: f32, wet: f32, sample_rate: u32) -> Self {
        let scale = f64::from(sample_rate) / 44_100.0;
        let decay_samples = f64::from(decay_seconds.max(0.05)) * f64::from(sample_rate);
        let combs = COMB_TUNINGS
            .iter()
            .map(|tuning| {
                let length = ((*tuning as f64) * scale) as usize;
                // -60 dB after `decay_seconds` of recirculation
                let feedback = 10_f64.powf(-3.0 * length as f64 / decay_samples) as f32;
                CombFilter {
                    line: DelayLine::new(length),
                    feedback: feedback.min(0.98),
                    filter_store: 0.0,
                }
            })
            .collect();
        let allpasses = ALLPASS_TUNINGS
            .iter()
            .map(|tuning| DelayLine::new(((*tuning as f64) * scale) as usize))
            .collect();

        Self {
            combs,
            allpasses,
            wet: wet.clamp(0.0, 1.0),
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let comb_count = self.combs.len() as f32;
        let mut tail = self
            .combs
            .iter_mut()
            .map(|comb| comb.process(input))
            .sum::<f32>()
            / comb_count;

        for allpass in &mut self.allpasses {
            let buffered = allpass.read();
            allpass.write_and_advance(tail + buffered * ALLPASS_FEEDBACK);
            tail = buffered - tail;
        }

        input * (1.0 - self.wet) + tail * self.wet
    }

    fn clear(&mut self) {
        for comb in &mut self.combs {
            comb.line.clear();
            comb.filter_store = 0.0;
        }
        for allpass in &mut self.allpasses {
            allpass.clear();
        }
    }
}

#[derive(Debug, Clone)]
pub struct Distortion {
    drive: f32,
    normalizer: f32,
    wet: f32,
}

impl Distortion {
    #[must_use]
    pub fn new(amount: f32, wet: f32) -> Self {
        let drive = 1.0 + amount.clamp(0.0, 1.0) * 20.0;
        Self {
            drive,
            normalizer: drive.tanh(),
            wet: wet.clamp(0.0, 1.0),
        }
    }

    #[must_use]
    pub fn process(&self, input: f32) -> f32 {
        let shaped = (input * self.drive).tanh() / self.normalizer;
        input * (1.0 - self.wet) + shaped * self.wet
    }
}

#[derive(Debug, Clone)]
pub struct FeedbackDelay {
    line: DelayLine,
    feedback: f32,
    wet: f32,
}

impl FeedbackDelay {
    #[must_use]
    pub fn new(delay_seconds: f32, feedback: f32, wet: f32, sample_rate: u32) -> Self {
        let seconds = f64::from(delay_seconds.max(0.0));
        Self {
            line: DelayLine::new((seconds * f64::from(sample_rate)).round() as usize),
            feedback: feedback.clamp(0.0, 0.95),
            wet: wet.clamp(0.0, 1.0),
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let echoed = self.line.read();
        self.line.write_and_advance(input + echoed * self.feedback);
        input * (1.0 - self.wet) + echoed * self.wet
    }
}

#[derive(Debug, Clone)]
pub enum EffectProcessor {
    Reverb(Reverb),
    Distortion(Distortion),
    FeedbackDelay(FeedbackDelay),
}

impl EffectProcessor {
    #[must_use]
    pub fn from_spec(spec: &EffectSpec, sample_rate: u32) -> Self {
        match *spec {
            EffectSpec::Reverb { decay_seconds, wet } => {
                Self::Reverb(Reverb::new(decay_seconds, wet, sample_rate))
            }
            EffectSpec::Distortion { amount, wet } => {
                Self::Distortion(Distortion::new(amount, wet))
            }
            EffectSpec::FeedbackDelay {
                delay_seconds,
                feedback,
                wet,
            } => Self::FeedbackDelay(FeedbackDelay::new(delay_seconds, feedback, wet, sample_rate)),
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        match self {
            Self::Reverb(reverb) => reverb.process(input),
            Self::Distortion(distortion) => distortion.process(input),
            Self::FeedbackDelay(delay) => delay.process(input),
        }
    }

    pub fn clear(&mut self) {
        match self {
            Self::Reverb(reverb) => reverb.clear(),
            Self::Distortion(_) => {}
            Self::FeedbackDelay(delay) => delay.line.clear(),
        }
    }
}

/// Serial chain of stateful effect processors for one voice bus.
#[derive(Debug, Clone, Default)]
pub struct EffectChain {
    processors: Vec<EffectProcessor>,
}

impl EffectChain {
    #[must_use]
    pub fn new(specs: &[EffectSpec], sample_rate: u32) -> Self {
        Self {
            processors: specs
                .iter()
                .map(|spec| EffectProcessor::from_spec(spec, sample_rate))
                .collect(),
        }
    }

    pub fn process_block(&mut self, block: &mut [f32]) {
        if self.processors.is_empty() {
            return;
        }
        for sample in block {
            *sample = self
                .processors
                .iter_mut()
                .fold(*sample, |signal, processor| processor.process(signal));
        }
    }

    pub fn clear(&mut self) {
        for processor in &mut self.processors {
            processor.clear();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oscillators_stay_in_unit_range() {
        for shape in [
            OscillatorShape::Sine,
            OscillatorShape::Triangle,
            OscillatorShape::Square,
            OscillatorShape::Sawtooth,
        ] {
            for step in 0..1_000 {
                let sample = oscillator_sample(shape, f64::from(step) / 1_000.0);
                assert!((-1.0..=1.0).contains(&sample), "{shape:?} produced {sample}");
            }
        }
        assert!((oscillator_sample(OscillatorShape::Sine, 0.25) - 1.0).abs() < 1e-6);
        assert!((oscillator_sample(OscillatorShape::Triangle, 0.5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn envelope_walks_attack_decay_sustain_release() {
        let envelope = Envelope::new(0.1, 0.1, 0.5, 0.2);
        assert!((envelope_level(&envelope, 0.05, 1.0) - 0.5).abs() < 1e-6);
        assert!((envelope_level(&envelope, 0.15, 1.0) - 0.75).abs() < 1e-6);
        assert!((envelope_level(&envelope, 0.5, 1.0) - 0.5).abs() < 1e-6);
        assert!((envelope_level(&envelope, 1.1, 1.0) - 0.25).abs() < 1e-6);
        assert_eq!(envelope_level(&envelope, 1.25, 1.0), 0.0);
        assert_eq!(envelope_level(&envelope, -0.1, 1.0), 0.0);
    }

    #[test]
    fn release_starts_from_level_at_gate_off() {
        let envelope = Envelope::new(0.4, 0.0, 1.0, 0.2);
        // gate closes mid-attack at 0.25 of full level
        assert!((envelope_level(&envelope, 0.1, 0.1) - 0.25).abs() < 1e-6);
        assert!((envelope_level(&envelope, 0.2, 0.1) - 0.125).abs() < 1e-6);
    }

    #[test]
    fn zero_attack_starts_at_full_level() {
        let envelope = Envelope::new(0.0, 0.0, 0.8, 0.0);
        assert!((envelope_level(&envelope, 0.0, 1.0) - 0.8).abs() < 1e-6);
        assert_eq!(envelope_level(&envelope, 1.0, 1.0), 0.0);
    }

    #[test]
    fn feedback_delay_echoes_an_impulse() {
        let mut delay = FeedbackDelay::new(0.01, 0.5, 1.0, 1_000);
        let mut output = Vec::new();
        for index in 0..30 {
            output.push(delay.process(if index == 0 { 1.0 } else { 0.0 }));
        }
        assert_eq!(output[0], 0.0);
        assert!((output[10] - 1.0).abs() < 1e-6);
        assert!((output[20] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn reverb_produces_a_decaying_tail() {
        let mut reverb = Reverb::new(1.0, 1.0, 44_100);
        let mut tail_energy = 0.0_f32;
        for index in 0..44_100 {
            let sample = reverb.process(if index == 0 { 1.0 } else { 0.0 });
            assert!(sample.is_finite());
            if index > 2_000 {
                tail_energy += sample.abs();
            }
        }
        assert!(tail_energy > 0.0);

        reverb.clear();
        assert_eq!(reverb.process(0.0), 0.0);
    }

    #[test]
    fn distortion_is_bounded_and_odd() {
        let distortion = Distortion::new(0.2, 1.0);
        for step in -10..=10 {
            let input = step as f32 / 10.0;
            let output = distortion.process(input);
            assert!(output.abs() <= 1.0 + 1e-6);
            assert!((output + distortion.process(-input)).abs() < 1e-6);
        }
    }

    #[test]
    fn empty_chain_is_transparent() {
        let mut chain = EffectChain::new(&[], 44_100);
        let mut block = [0.25, -0.5, 0.75];
        chain.process_block(&mut block);
        assert_eq!(block, [0.25, -0.5, 0.75]);
        assert!(chain.is_empty());
    }
}
