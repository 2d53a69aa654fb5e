use std::time::Instant;

use tunesmith_core::{Engine, EngineConfig, GenerationOptions, RenderSettings, export::midi_bytes};

fn budget_ms_from_env(key: &str, fallback: u128) -> u128 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u128>().ok())
        .unwrap_or(fallback)
}

fn perf_options() -> GenerationOptions {
    GenerationOptions {
        genre: "electronic".to_string(),
        mood: "dreamy".to_string(),
        tempo: Some(140),
        duration_seconds: 20.0,
        complexity: 100.0,
        seed: Some(2_024),
        ..GenerationOptions::default()
    }
}

#[test]
fn generation_and_midi_encoding_stay_within_budget() {
    let mut engine = Engine::new(EngineConfig {
        render: RenderSettings {
            sample_rate: 22_050,
            ..RenderSettings::default()
        },
        ..EngineConfig::default()
    });
    let max_render_ms = budget_ms_from_env("TUNESMITH_PERF_MAX_RENDER_MS", 20_000);
    let max_midi_ms = budget_ms_from_env("TUNESMITH_PERF_MAX_MIDI_MS", 1_500);

    let render_start = Instant::now();
    let result = engine
        .generate(&perf_options(), &mut |_: u8| {})
        .expect("generation should succeed")
        .into_result()
        .expect("generation should complete");
    let render_elapsed_ms = render_start.elapsed().as_millis();
    assert_eq!(result.buffer.frames(), 441_000);
    assert!(
        render_elapsed_ms <= max_render_ms,
        "render regression: {render_elapsed_ms}ms exceeded budget {max_render_ms}ms"
    );

    let midi_start = Instant::now();
    let midi = midi_bytes(&result.notes, result.tempo, &result.voices)
        .expect("midi encoding should succeed");
    let midi_elapsed_ms = midi_start.elapsed().as_millis();
    assert!(!midi.is_empty(), "midi bytes should not be empty");
    assert!(
        midi_elapsed_ms <= max_midi_ms,
        "midi encode regression: {midi_elapsed_ms}ms exceeded budget {max_midi_ms}ms"
    );
}
