use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{track::GeneratedTrack, waveform::WAVEFORM_POINTS};

pub const TRACK_FILE_SUFFIX: &str = "tunesmith.json";

/// Writes `value` as pretty JSON next to `path` and renames it into place, so readers
/// never observe a half-written file.
pub(crate) fn write_json_atomically<T: Serialize>(
    path: &Path,
    value: &T,
    what: &str,
) -> Result<()> {
    use std::io::Write as _;

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&directory)
        .with_context(|| format!("failed to create {what} directory: {}", directory.display()))?;

    let json =
        serde_json::to_vec_pretty(value).with_context(|| format!("failed to encode {what}"))?;
    let mut staged = tempfile::NamedTempFile::new_in(&directory)
        .with_context(|| format!("failed to stage {what} in {}", directory.display()))?;
    staged
        .write_all(&json)
        .with_context(|| format!("failed to write staged {what}"))?;
    staged
        .persist(path)
        .map_err(|error| anyhow::anyhow!(error.error))
        .with_context(|| format!("failed to move {what} into place: {}", path.display()))?;

    debug!(path = %path.display(), bytes = json.len(), what, "json written");
    Ok(())
}

#[instrument(skip(track), fields(track_id = %track.id, path = %path.display()))]
pub fn save_track(path: &Path, track: &GeneratedTrack) -> Result<()> {
    write_json_atomically(path, track, "track")?;
    info!(title = %track.title, notes = track.note_count, "track saved");
    Ok(())
}

/// Reads a track record and rejects ones whose waveform or timing could not have come
/// out of a render.
#[instrument(fields(path = %path.display()))]
pub fn load_track(path: &Path) -> Result<GeneratedTrack> {
    let content =
        fs::read(path).with_context(|| format!("failed to read track: {}", path.display()))?;
    let track: GeneratedTrack = serde_json::from_slice(&content)
        .with_context(|| format!("invalid track json: {}", path.display()))?;
    if let Err(error) = check_track(&track) {
        warn!(track_id = %track.id, %error, "track rejected");
        return Err(error.context(format!("invalid track: {}", path.display())));
    }
    info!(track_id = %track.id, title = %track.title, "track loaded");
    Ok(track)
}

fn check_track(track: &GeneratedTrack) -> Result<()> {
    if track.waveform.len() != WAVEFORM_POINTS {
        bail!(
            "waveform has {} points, expected {WAVEFORM_POINTS}",
            track.waveform.len()
        );
    }
    if let Some(point) = track
        .waveform
        .iter()
        .find(|point| !(0.0..=100.0).contains(*point))
    {
        bail!("waveform point {point} is outside 0..=100");
    }
    if track.tempo == 0 {
        bail!("tempo must be positive");
    }
    if !track.duration_seconds.is_finite() || track.duration_seconds < 0.0 {
        bail!("duration {} is not a valid length", track.duration_seconds);
    }
    Ok(())
}

/// Saves `track` as `<id>.tunesmith.json` inside `output_dir`.
#[instrument(skip(track), fields(track_id = %track.id, output_dir = %output_dir.display()))]
pub fn store_track(track: &GeneratedTrack, output_dir: &Path) -> Result<PathBuf> {
    let track_path = output_dir.join(format!("{}.{TRACK_FILE_SUFFIX}", track.id));
    save_track(&track_path, track)?;
    Ok(track_path)
}
