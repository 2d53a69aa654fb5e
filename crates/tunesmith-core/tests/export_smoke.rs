use tunesmith_core::{
    Engine, EngineConfig, ExportKind, GenerationOptions, InstrumentFocus, RenderSettings,
    export::midi_bytes,
};

fn smoke_engine() -> Engine {
    Engine::new(EngineConfig {
        render: RenderSettings {
            sample_rate: 16_000,
            ..RenderSettings::default()
        },
        ..EngineConfig::default()
    })
}

fn smoke_options(focus: InstrumentFocus) -> GenerationOptions {
    GenerationOptions {
        genre: "rnb".to_string(),
        mood: "uplifting".to_string(),
        duration_seconds: 3.0,
        instrument_focus: focus,
        seed: Some(42),
        ..GenerationOptions::default()
    }
}

#[test]
fn midi_and_wav_exports_generate_output() {
    let mut engine = smoke_engine();
    let result = engine
        .generate(&smoke_options(InstrumentFocus::Balanced), &mut |_: u8| {})
        .expect("generation should succeed")
        .into_result()
        .expect("generation should complete");

    let temp_dir = tempfile::tempdir().expect("tempdir should work");
    let midi_path = temp_dir.path().join("smoke.mid");
    let wav_path = temp_dir.path().join("out").join("smoke.wav");

    engine
        .export(ExportKind::Midi, &result, &midi_path)
        .expect("midi export should succeed");
    engine
        .export(ExportKind::Wav, &result, &wav_path)
        .expect("wav export should succeed");

    let midi = std::fs::read(&midi_path).expect("midi file must exist");
    let smf = midly::Smf::parse(&midi).expect("exported midi should parse");
    assert_eq!(smf.tracks.len(), 4, "tempo track plus three voices");

    let reader = hound::WavReader::open(&wav_path).expect("exported wav should open");
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 16_000);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.duration(), 48_000);
}

#[test]
fn vocals_only_midi_has_a_single_voice_track() {
    let mut engine = smoke_engine();
    let result = engine
        .generate(&smoke_options(InstrumentFocus::VocalsOnly), &mut |_: u8| {})
        .expect("generation should succeed")
        .into_result()
        .expect("generation should complete");

    let bytes = midi_bytes(&result.notes, result.tempo, &result.voices)
        .expect("midi encoding should succeed");
    let smf = midly::Smf::parse(&bytes).expect("encoded midi should parse");
    assert_eq!(smf.tracks.len(), 2);
}
