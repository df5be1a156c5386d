use clap::{Args, Parser, Subcommand, ValueEnum};
use csl_app::{
    AppResult, OutputFormat, Study, analyze, feedback, load_study, nonlinear, observer, pid,
    render, run_all, save_study, study_to_yaml, tune,
};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "csl-cli")]
#[command(about = "ControlSysLab CLI - control system analysis and design", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poles, stability and controllability/observability of the system
    Analyze(StudyArgs),
    /// State-feedback pole placement with open/closed-loop simulation
    Feedback(StudyArgs),
    /// Observer design with output-feedback simulation
    Observer(StudyArgs),
    /// Nonlinear simulation, linearization and Lyapunov derivative
    Nonlinear(StudyArgs),
    /// PID step and frequency responses
    Pid(StudyArgs),
    /// Every section defined in the study
    All(StudyArgs),
    /// Validate study file syntax and structure
    Validate {
        /// Path to the study YAML file
        study_path: PathBuf,
    },
    /// Print the built-in example study
    Example {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Ziegler-Nichols PID gains from the ultimate gain and period
    Tune {
        /// Ultimate (critical) gain
        #[arg(long)]
        ku: f64,
        /// Oscillation period at the ultimate gain, in seconds
        #[arg(long)]
        tu: f64,
        #[arg(short, long, value_enum, default_value = "json")]
        format: Format,
    },
}

#[derive(Args)]
struct StudyArgs {
    /// Path to the study YAML file (built-in example when omitted)
    #[arg(short, long)]
    study: Option<PathBuf>,
    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: Format,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => OutputFormat::Json,
            Format::Yaml => OutputFormat::Yaml,
        }
    }
}

fn main() -> AppResult<()> {
    // Logs go to stderr so records on stdout stay machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => emit(&analyze(&load(&args)?)?, args.format),
        Commands::Feedback(args) => emit(&feedback(&load(&args)?)?, args.format),
        Commands::Observer(args) => emit(&observer(&load(&args)?)?, args.format),
        Commands::Nonlinear(args) => emit(&nonlinear(&load(&args)?)?, args.format),
        Commands::Pid(args) => emit(&pid(&load(&args)?)?, args.format),
        Commands::All(args) => emit(&run_all(&load(&args)?)?, args.format),
        Commands::Validate { study_path } => cmd_validate(&study_path),
        Commands::Example { output } => cmd_example(output.as_deref()),
        Commands::Tune { ku, tu, format } => emit(&tune(ku, tu)?, format),
    }
}

fn load(args: &StudyArgs) -> AppResult<Study> {
    match &args.study {
        Some(path) => load_study(path),
        None => Ok(Study::default_example()),
    }
}

fn emit<T: Serialize>(value: &T, format: Format) -> AppResult<()> {
    let text = render(value, format.into())?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", text.trim_end())?;
    Ok(())
}

fn cmd_validate(study_path: &Path) -> AppResult<()> {
    println!("Validating study: {}", study_path.display());
    let study = load_study(study_path)?;
    let sections = [
        ("system", study.system.is_some()),
        ("state_feedback", study.state_feedback.is_some()),
        ("observer", study.observer.is_some()),
        ("nonlinear", study.nonlinear.is_some()),
        ("pid", study.pid.is_some()),
    ];
    let present: Vec<&str> = sections
        .iter()
        .filter(|(_, present)| *present)
        .map(|(name, _)| *name)
        .collect();
    println!("✓ Study '{}' is valid ({})", study.name, present.join(", "));
    Ok(())
}

fn cmd_example(output: Option<&Path>) -> AppResult<()> {
    let study = Study::default_example();
    match output {
        Some(path) => {
            save_study(path, &study)?;
            println!("✓ Example study written to {}", path.display());
        }
        None => print!("{}", study_to_yaml(&study)?),
    }
    Ok(())
}
