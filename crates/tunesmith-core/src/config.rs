use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{options::GenerationOptions, render::RenderSettings};

pub const CONFIG_FILE_NAME: &str = "tunesmith.config.toml";
pub const CONFIG_PATH_ENV: &str = "TUNESMITH_CONFIG_PATH";
pub const DEFAULT_LOG_FILTER: &str = "info,tunesmith_core=trace";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub render: RenderSettings,
    pub generation: GenerationConfig,
    pub diagnostics: DiagnosticsConfig,
    pub paths: PathsConfig,
}

/// Fallback generation parameters for callers that do not supply their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub genre: String,
    pub mood: String,
    pub duration_seconds: f64,
    pub complexity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub rust_log_filter: String,
    pub trace_file_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub logs_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let defaults = GenerationOptions::default();
        Self {
            genre: defaults.genre,
            mood: defaults.mood,
            duration_seconds: defaults.duration_seconds,
            complexity: defaults.complexity,
        }
    }
}

impl GenerationConfig {
    #[must_use]
    pub fn to_options(&self) -> GenerationOptions {
        GenerationOptions {
            genre: self.genre.clone(),
            mood: self.mood.clone(),
            duration_seconds: self.duration_seconds,
            complexity: self.complexity,
            ..GenerationOptions::default()
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            rust_log_filter: DEFAULT_LOG_FILTER.to_string(),
            trace_file_prefix: "tunesmith".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            logs_dir: PathBuf::from("logs"),
            output_dir: PathBuf::from("data/tracks"),
        }
    }
}

impl EngineConfig {
    pub fn load() -> Result<Self> {
        let config_path = discover_config_path().with_context(|| {
            format!("failed to locate {CONFIG_FILE_NAME}; looked in cwd and parent directory")
        })?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config TOML from {}", path.display()))?;
        debug!(path = %path.display(), "engine config loaded");
        Ok(config)
    }

    /// Like [`EngineConfig::load`], but a missing file yields the defaults. A file that
    /// exists but fails to parse is still an error.
    pub fn load_or_default() -> Result<Self> {
        match discover_config_path() {
            Ok(path) => Self::load_from(&path),
            Err(error) => {
                warn!(%error, "no engine config found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

fn discover_config_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Ok(path);
        }
    }

    let cwd = env::current_dir().context("failed to resolve current directory")?;
    let candidates = [
        cwd.join(CONFIG_FILE_NAME),
        cwd.join("..").join(CONFIG_FILE_NAME),
    ];

    candidates
        .into_iter()
        .find(|path| path.is_file())
        .ok_or_else(|| anyhow::anyhow!("{CONFIG_FILE_NAME} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_section_defaults() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            "[render]\nsample_rate = 22050\n\n[generation]\ngenre = \"jazz\"\n",
        )
        .expect("config should be written");

        let config = EngineConfig::load_from(&path).expect("config should parse");
        assert_eq!(config.render.sample_rate, 22_050);
        assert_eq!(config.render.channels, 2);
        assert_eq!(config.render.chunk_frames, 4_096);
        assert_eq!(config.generation.genre, "jazz");
        assert_eq!(config.generation.mood, "energetic");
        assert_eq!(config.diagnostics.rust_log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[render\nsample_rate = ").expect("config should be written");
        assert!(EngineConfig::load_from(&path).is_err());
    }

    #[test]
    fn generation_section_seeds_options() {
        let config = GenerationConfig {
            genre: "ambient".to_string(),
            mood: "dreamy".to_string(),
            duration_seconds: 45.0,
            complexity: 20.0,
        };
        let options = config.to_options();
        assert_eq!(options.genre, "ambient");
        assert_eq!(options.duration_seconds, 45.0);
        assert_eq!(options.tempo, Some(120));
    }
}
