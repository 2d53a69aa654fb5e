pub const PPQ: u16 = 480;
pub const BEATS_PER_BAR: u32 = 4;

#[must_use]
pub fn beats_to_ticks(beats: f64) -> u64 {
    if beats <= 0.0 {
        return 0;
    }

    (beats * f64::from(PPQ)).round() as u64
}

#[must_use]
pub fn ticks_to_seconds(ticks: u64, bpm: f64) -> f64 {
    if bpm <= 0.0 {
        return 0.0;
    }

    let beats = ticks as f64 / f64::from(PPQ);
    beats * (60.0 / bpm)
}

#[must_use]
pub fn seconds_to_samples(seconds: f64, sample_rate: u32) -> u64 {
    if seconds <= 0.0 || !seconds.is_finite() {
        return 0;
    }

    (seconds * f64::from(sample_rate)).round() as u64
}

#[must_use]
pub fn ticks_to_samples(ticks: u64, bpm: f64, sample_rate: u32) -> u64 {
    seconds_to_samples(ticks_to_seconds(ticks, bpm), sample_rate)
}
