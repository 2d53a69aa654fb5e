use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tunesmith_core::{
    Engine, EngineConfig, ExportKind, GeneratedTrack, GenerationOutcome, InstrumentFocus,
    diagnostics::init_tracing_from_config,
    fingerprint::{generate_fingerprint, read_fingerprint_report, write_fingerprint_report},
    fixtures::{demo_config, demo_options},
    persistence::store_track,
};

#[derive(Debug, Parser)]
#[command(name = "tunesmith-cli")]
#[command(about = "Headless tools for procedural track generation and export")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Overrides `paths.logs_dir` from the config file.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Generate(GenerateArgs),
    Fingerprint {
        #[arg(long, default_value = "data/fingerprint/report.json")]
        output: PathBuf,

        /// Compare against an existing report instead of overwriting it.
        #[arg(long)]
        check: bool,
    },
}

#[derive(Debug, clap::Args)]
struct GenerateArgs {
    #[arg(long)]
    genre: Option<String>,

    #[arg(long)]
    mood: Option<String>,

    /// BPM; omit to draw one from the mood's range.
    #[arg(long)]
    tempo: Option<u32>,

    #[arg(long)]
    duration: Option<f64>,

    #[arg(long)]
    complexity: Option<f64>,

    #[arg(long, value_enum, default_value = "balanced")]
    focus: FocusArg,

    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pitch_offset: i8,

    #[arg(long)]
    seed: Option<u64>,

    /// Instrument level as `name=level`, repeatable.
    #[arg(long = "mix", value_parser = parse_mix_entry)]
    mix: Vec<(String, f32)>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    theme: Option<String>,

    #[arg(long = "keyword")]
    keywords: Vec<String>,

    /// Lyric text to store with the track; needs `--theme`.
    #[arg(long)]
    lyrics_file: Option<PathBuf>,

    #[arg(long)]
    no_lyrics: bool,

    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, ValueEnum)]
enum FocusArg {
    Balanced,
    Vocals,
    Instrumental,
}

impl From<FocusArg> for InstrumentFocus {
    fn from(value: FocusArg) -> Self {
        match value {
            FocusArg::Balanced => Self::Balanced,
            FocusArg::Vocals => Self::VocalsOnly,
            FocusArg::Instrumental => Self::InstrumentalOnly,
        }
    }
}

fn parse_mix_entry(raw: &str) -> Result<(String, f32), String> {
    let (name, level) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=level, got `{raw}`"))?;
    let level = level
        .trim()
        .parse::<f32>()
        .map_err(|error| format!("invalid level for `{name}`: {error}"))?;
    Ok((name.trim().to_ascii_lowercase(), level))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load_or_default()?;
    let log_dir = cli
        .log_dir
        .clone()
        .unwrap_or_else(|| config.paths.logs_dir.clone());
    let _telemetry = init_tracing_from_config(&log_dir, &config.diagnostics)?;

    match cli.command {
        Commands::Generate(args) => run_generate(config, args)?,
        Commands::Fingerprint { output, check } => {
            let mut engine = Engine::new(demo_config());
            let report = generate_fingerprint(&mut engine, &demo_options())?;
            if check {
                let expected = read_fingerprint_report(&output)?;
                if expected != report {
                    return Err(anyhow::anyhow!(
                        "fingerprint mismatch against {}",
                        output.display()
                    ));
                }
                tracing::info!(path = %output.display(), "fingerprint matches");
            } else {
                write_fingerprint_report(&output, &report)?;
                tracing::info!(path = %output.display(), "fingerprint report written");
            }
        }
    }

    Ok(())
}

fn run_generate(config: EngineConfig, args: GenerateArgs) -> anyhow::Result<()> {
    let mut options = config.generation.to_options();
    if let Some(genre) = args.genre {
        options.genre = genre;
    }
    if let Some(mood) = args.mood {
        options.mood = mood;
    }
    if let Some(duration) = args.duration {
        options.duration_seconds = duration;
    }
    if let Some(complexity) = args.complexity {
        options.complexity = complexity;
    }
    options.tempo = args.tempo;
    options.instrument_focus = args.focus.into();
    options.pitch_offset = args.pitch_offset;
    options.seed = args.seed;
    options.theme = args.theme;
    options.keywords = args.keywords;
    options.lyrics = !args.no_lyrics;
    for (name, level) in args.mix {
        options.instrument_mix.set(name, level);
    }

    let output_dir = args
        .output_dir
        .unwrap_or_else(|| config.paths.output_dir.clone());
    let mut engine = Engine::new(config);

    let mut last_logged = None;
    let outcome = engine.generate(&options, &mut |percent: u8| {
        let decile = percent / 10;
        if last_logged != Some(decile) {
            last_logged = Some(decile);
            tracing::info!(percent, "rendering");
        }
    })?;
    let GenerationOutcome::Completed(result) = outcome else {
        tracing::warn!("generation cancelled");
        return Ok(());
    };

    let mut track = GeneratedTrack::new(&options, &result, args.title);
    if let Some(path) = &args.lyrics_file {
        let lyrics = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read lyrics: {}", path.display()))?;
        track = track.with_lyrics(lyrics);
    }
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create output directory: {}", output_dir.display()))?;
    let stem = output_dir.join(track.id.to_string());
    engine.export(ExportKind::Wav, &result, &stem.with_extension("wav"))?;
    engine.export(ExportKind::Midi, &result, &stem.with_extension("mid"))?;
    let track_path = store_track(&track, &output_dir)?;

    tracing::info!(
        title = %track.title,
        tempo = track.tempo,
        progression = ?track.progression_symbols(),
        lyrics = track.lyrics.is_some(),
        track = %track_path.display(),
        "track generated"
    );
    Ok(())
}
