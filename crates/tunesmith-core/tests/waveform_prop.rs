use proptest::prelude::*;
use tunesmith_core::{
    RenderBuffer,
    waveform::{WAVEFORM_POINTS, reduce, reduce_samples},
};

#[test]
fn boundary_lengths_keep_one_hundred_points() {
    for length in [0, 1, 99, 100, 101, 199, 200, 10_007] {
        let samples = vec![0.5_f32; length];
        let waveform = reduce_samples(&samples);
        assert_eq!(waveform.len(), WAVEFORM_POINTS, "length {length}");

        let filled = length.min(WAVEFORM_POINTS);
        assert!(waveform[..filled].iter().all(|point| (*point - 50.0).abs() < 1e-4));
        assert!(waveform[filled..].iter().all(|point| *point == 0.0));
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn normalized_buffers_reduce_into_range(
        samples in prop::collection::vec(-1.0f32..=1.0, 0..6_000),
    ) {
        let waveform = reduce_samples(&samples);
        prop_assert_eq!(waveform.len(), WAVEFORM_POINTS);
        prop_assert!(waveform.iter().all(|point| (0.0..=100.0).contains(point)));
        prop_assert_eq!(reduce_samples(&samples), waveform);
    }

    #[test]
    fn arbitrary_floats_never_escape_the_range(
        samples in prop::collection::vec(any::<f32>(), 0..600),
    ) {
        let buffer = RenderBuffer {
            sample_rate: 8_000,
            channels: vec![samples],
        };
        let waveform = reduce(&buffer);
        prop_assert_eq!(waveform.len(), WAVEFORM_POINTS);
        prop_assert!(waveform.iter().all(|point| (0.0..=100.0).contains(point)));
    }
}
