use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use phase_engine::fixtures::{load_frame_stream, save_frame_stream, SyntheticPattern, SyntheticTrack, DEFAULT_SEED};
use phase_engine::{EngineConfig, FrameStream, PhaseAnalyzer, TrackDescriptors};

#[derive(Parser, Debug)]
#[command(
    name = "phase_cli",
    about = "Phase segmentation and descriptor diagnostics"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a feature stream stored as JSON
    Analyze {
        #[arg(long)]
        input: PathBuf,
        /// Calibration profile (defaults apply to omitted fields)
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Generate a synthetic feature stream and analyze it
    Synthetic {
        #[arg(long, value_enum)]
        pattern: SyntheticPatternArg,
        #[arg(long)]
        duration_secs: Option<f64>,
        #[arg(long, default_value_t = 0.5)]
        hop_secs: f64,
        #[arg(long, default_value_t = 0.0)]
        jitter: f32,
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Also write the generated frames to this path
        #[arg(long)]
        frames_output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Print the default calibration profile
    DumpConfig,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum SyntheticPatternArg {
    Silence,
    Groove,
    Ramp,
    Arc,
}

impl From<SyntheticPatternArg> for SyntheticPattern {
    fn from(arg: SyntheticPatternArg) -> Self {
        match arg {
            SyntheticPatternArg::Silence => SyntheticPattern::Silence,
            SyntheticPatternArg::Groove => SyntheticPattern::SustainedGroove,
            SyntheticPatternArg::Ramp => SyntheticPattern::EnergyRamp,
            SyntheticPatternArg::Arc => SyntheticPattern::Arc,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::WARN)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("phase_cli error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            input,
            config,
            output,
            format,
        } => {
            let analyzer = build_analyzer(config.as_deref())?;
            let stream = load_frame_stream(&input)?;
            let track = analyze(&analyzer, &stream)
                .with_context(|| format!("analyzing {}", input.display()))?;
            emit_report(&track, format, output)
        }
        Commands::Synthetic {
            pattern,
            duration_secs,
            hop_secs,
            jitter,
            seed,
            config,
            frames_output,
            format,
        } => {
            let analyzer = build_analyzer(config.as_deref())?;
            let pattern = SyntheticPattern::from(pattern);
            let mut track = SyntheticTrack::new(pattern)
                .with_hop(hop_secs)
                .with_jitter(jitter, seed);
            if let Some(duration) = duration_secs {
                track = track.with_duration(duration);
            }
            let stream = track.generate();
            if let Some(path) = frames_output {
                save_frame_stream(&stream, &path)?;
            }
            let descriptors = analyze(&analyzer, &stream)
                .with_context(|| format!("analyzing synthetic {:?} track", pattern))?;
            emit_report(&descriptors, format, None)
        }
        Commands::DumpConfig => {
            println!("{}", serde_json::to_string_pretty(&EngineConfig::default())?);
            Ok(())
        }
    }
}

fn build_analyzer(config_path: Option<&Path>) -> Result<PhaseAnalyzer> {
    let config = match config_path {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    PhaseAnalyzer::new(config).context("validating configuration")
}

fn analyze(analyzer: &PhaseAnalyzer, stream: &FrameStream) -> Result<TrackDescriptors> {
    Ok(analyzer.analyze_stream(stream)?)
}

fn emit_report(track: &TrackDescriptors, format: OutputFormat, output_path: Option<PathBuf>) -> Result<()> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(track)?,
        OutputFormat::Table => render_table(track),
    };

    if let Some(path) = output_path {
        fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{text}");
    }
    Ok(())
}

fn render_table(track: &TrackDescriptors) -> String {
    let mut lines = Vec::with_capacity(track.phase_count() + 3);
    for phase in &track.phases {
        let moods: Vec<&str> = phase.moods.iter().map(|m| m.name()).collect();
        lines.push(format!(
            "{:>2}  {}  {:<20} {}",
            phase.index,
            phase.display_range(),
            phase.structural_type.label(),
            moods.join(", ")
        ));
    }
    let dominant = track.dominant_mood.map_or("-", |m| m.name());
    let character = track.primary_character.map_or("-", |c| c.name());
    lines.push(format!("dominant mood: {dominant}"));
    lines.push(format!("primary character: {character}"));
    lines.join("\n")
}
