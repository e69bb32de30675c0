use cellsim::core::transcript::Transcript;
use cellsim::{
    AgentRole, CellError, ClockMode, ProductionOrchestrator, QualityPolicy, ScenarioCatalog,
    SimulationConfig, StdoutTranscript,
};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "cellsim", version, about = "Multi-agent manufacturing cell simulation")]
struct Cli {
    /// Scenario document to run
    #[arg(long, default_value = "scenarios/manufacturing_scenario.json")]
    scenario: PathBuf,
    /// JSON file with simulation config overrides
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed for sensor, jitter and inspection sampling
    #[arg(long)]
    seed: Option<u64>,
    /// Sleep during safety holds, scaled by this factor (1.0 = real time)
    #[arg(long)]
    time_scale: Option<f64>,
    /// Sample inspection deviation up to this multiple of the tolerance
    #[arg(long)]
    quality_factor: Option<f64>,
    /// Write the summary and final state as JSON
    #[arg(long)]
    report: Option<PathBuf>,
    /// Suppress the agent transcript
    #[arg(long)]
    quiet: bool,
}

/// Drops every line; used with `--quiet`
struct SilentTranscript;

impl Transcript for SilentTranscript {
    fn on_line(&mut self, _role: AgentRole, _line: &str) {}
    fn on_banner(&mut self, _text: &str) {}
}

fn build_config(cli: &Cli) -> cellsim::Result<SimulationConfig> {
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::from_path(path)?,
        None => SimulationConfig::default(),
    };
    if cli.seed.is_some() {
        config = config.with_random_seed(cli.seed);
    }
    if let Some(time_scale) = cli.time_scale {
        config = config.with_clock_mode(ClockMode::WallClock { time_scale });
    }
    if let Some(factor) = cli.quality_factor {
        config = config.with_quality_policy(QualityPolicy::Widened { factor });
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli) -> cellsim::Result<()> {
    let config = build_config(cli)?;
    let catalog = ScenarioCatalog::from_path(&cli.scenario)?;
    let mut orchestrator = ProductionOrchestrator::new(catalog, config)?;

    let mut stdout = StdoutTranscript;
    let mut silent = SilentTranscript;
    let transcript: &mut dyn Transcript = if cli.quiet { &mut silent } else { &mut stdout };

    transcript.on_banner("MULTI-AGENT MANUFACTURING SYSTEM");
    let report = orchestrator.run(transcript)?;

    println!("{}", report);
    if let Some(path) = &cli.report {
        report.write_json(path, &orchestrator.state().snapshot())?;
        println!("Report saved: {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("[Main] {}", e);
            eprintln!("error: {}", e);
            match e {
                CellError::Configuration(_) => ExitCode::from(2),
                CellError::Cancelled { .. } => ExitCode::from(130),
                _ => ExitCode::FAILURE,
            }
        }
    }
}
