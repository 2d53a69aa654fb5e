use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, instrument};

use crate::{
    engine::{Engine, GenerationOutcome, RenderResult},
    export,
    options::GenerationOptions,
    persistence::write_json_atomically,
};

const FINGERPRINT_SCHEMA_VERSION: u32 = 1;
const AUDIO_FINGERPRINT_FRAMES: usize = 96_000;

/// Digests of one seeded generation, for checking that it reproduces exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FingerprintReport {
    pub schema_version: u32,
    pub seed: u64,
    pub genre: String,
    pub mood: String,
    pub tempo: u32,
    pub progression: Vec<String>,
    pub note_count: usize,
    pub notes_hash: String,
    pub midi_hash: String,
    pub audio_hash: String,
}

#[instrument(skip(engine, options), fields(genre = %options.genre, mood = %options.mood))]
pub fn generate_fingerprint(
    engine: &mut Engine,
    options: &GenerationOptions,
) -> Result<FingerprintReport> {
    let seed = options
        .seed
        .ok_or_else(|| anyhow::anyhow!("fingerprinting requires a fixed seed"))?;

    let outcome = engine
        .generate(options, &mut |_: u8| {})
        .context("generation failed while fingerprinting")?;
    let GenerationOutcome::Completed(result) = outcome else {
        return Err(anyhow::anyhow!("generation was cancelled while fingerprinting"));
    };

    let report = fingerprint_result(seed, &result)?;
    info!(notes_hash = %report.notes_hash, "fingerprint generated");
    Ok(report)
}

pub fn fingerprint_result(seed: u64, result: &RenderResult) -> Result<FingerprintReport> {
    let notes_bytes = serde_json::to_vec(&result.notes).context("failed to serialize notes")?;
    let midi_bytes = export::midi_bytes(&result.notes, result.tempo, &result.voices)?;

    let mut audio_bytes = Vec::with_capacity(AUDIO_FINGERPRINT_FRAMES * 2);
    for sample in result
        .buffer
        .first_channel()
        .iter()
        .take(AUDIO_FINGERPRINT_FRAMES)
    {
        let quantized = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16;
        audio_bytes.extend_from_slice(&quantized.to_le_bytes());
    }

    Ok(FingerprintReport {
        schema_version: FINGERPRINT_SCHEMA_VERSION,
        seed,
        genre: result.genre.name().to_string(),
        mood: result.mood.name().to_string(),
        tempo: result.tempo,
        progression: result
            .progression
            .iter()
            .map(|chord| chord.symbol().to_string())
            .collect(),
        note_count: result.notes.len(),
        notes_hash: hash_hex(&notes_bytes),
        midi_hash: hash_hex(&midi_bytes),
        audio_hash: hash_hex(&audio_bytes),
    })
}

pub fn read_fingerprint_report(path: &Path) -> Result<FingerprintReport> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read fingerprint report: {}", path.display()))?;
    let report: FingerprintReport =
        serde_json::from_slice(&bytes).context("failed to parse fingerprint report json")?;
    Ok(report)
}

pub fn write_fingerprint_report(path: &Path, report: &FingerprintReport) -> Result<()> {
    write_json_atomically(path, report, "fingerprint report")?;
    info!(path = %path.display(), "fingerprint report written");
    Ok(())
}

fn hash_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{digest:x}")
}
