use tracing::{debug, instrument};

use crate::render::RenderBuffer;

pub const WAVEFORM_POINTS: usize = 100;
const PEAK_SCALE: f32 = 100.0;

/// Peak magnitudes of the first channel, scaled to `0..=100`.
#[instrument(skip(buffer), fields(frames = buffer.frames()))]
#[must_use]
pub fn reduce(buffer: &RenderBuffer) -> Vec<f32> {
    reduce_samples(buffer.first_channel())
}

/// Splits `samples` into [`WAVEFORM_POINTS`] blocks of `max(1, len / 100)` samples and
/// keeps each block's peak. Any remainder tail is discarded; blocks starting past the end
/// of a short buffer read as zero.
#[must_use]
pub fn reduce_samples(samples: &[f32]) -> Vec<f32> {
    let block_size = (samples.len() / WAVEFORM_POINTS).max(1);
    let mut peaks: Vec<f32> = samples
        .chunks(block_size)
        .take(WAVEFORM_POINTS)
        .map(|block| {
            block
                .iter()
                .copied()
                .filter(|sample| sample.is_finite())
                .map(f32::abs)
                .fold(0.0_f32, f32::max)
        })
        .map(|peak| (peak * PEAK_SCALE).clamp(0.0, PEAK_SCALE))
        .collect();
    peaks.resize(WAVEFORM_POINTS, 0.0);

    debug!(samples = samples.len(), block_size, "waveform reduced");
    peaks
}
