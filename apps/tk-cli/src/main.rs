use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tk_app::{AppError, AppResult, CycleRecord, LoopConfig, Session};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tk-cli")]
#[command(about = "tickflow CLI - headless host for periodic control loops", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default loop configuration
    Init {
        /// Where to write the YAML file
        config_path: PathBuf,
    },
    /// Validate a loop configuration
    Validate {
        /// Path to the loop YAML file
        config_path: PathBuf,
    },
    /// Drive the demo loop through the configured phase timeline
    Run {
        /// Path to the loop YAML file (defaults are used when omitted)
        config_path: Option<PathBuf>,
        /// Override the number of periodic calls
        #[arg(long)]
        cycles: Option<u64>,
        /// Print every n-th cycle
        #[arg(long, default_value_t = 1)]
        every: u64,
        /// Trace format
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { config_path } => cmd_init(&config_path),
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Run {
            config_path,
            cycles,
            every,
            format,
        } => cmd_run(config_path.as_deref(), cycles, every, format),
    }
}

fn cmd_init(config_path: &Path) -> AppResult<()> {
    tk_app::save_yaml(config_path, &LoopConfig::default())?;
    println!("✓ Wrote default config to {}", config_path.display());
    Ok(())
}

fn cmd_validate(config_path: &Path) -> AppResult<()> {
    println!("Validating config: {}", config_path.display());
    let config = tk_app::load_yaml(config_path)?;
    println!("✓ Config is valid");
    println!("  Scheduler: {:?}", config.scheduler);
    println!("  Cycles: {} @ {:.3} s", config.cycles, config.period_s);
    for step in &config.phases {
        println!("  from cycle {:>5}: {}", step.at_cycle, step.phase);
    }
    Ok(())
}

fn cmd_run(
    config_path: Option<&Path>,
    cycles: Option<u64>,
    every: u64,
    format: Format,
) -> AppResult<()> {
    let mut config = match config_path {
        Some(path) => tk_app::load_yaml(path)?,
        None => {
            info!("no config given; using defaults");
            LoopConfig::default()
        }
    };
    if let Some(cycles) = cycles {
        config.cycles = cycles;
    }
    let every = every.max(1);

    let session = Session::new(config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut failure: Option<AppError> = None;

    if format == Format::Table {
        write_header(&mut out).map_err(output_error)?;
    }
    let summary = session.run(|record| {
        if failure.is_some() || record.cycle % every != 0 {
            return;
        }
        let written = match format {
            Format::Table => write_row(&mut out, record).map_err(output_error),
            Format::Json => write_json(&mut out, record),
        };
        if let Err(err) = written {
            failure = Some(err);
        }
    });
    drop(out);
    if let Some(err) = failure {
        return Err(err);
    }

    if format == Format::Table {
        if let Some(last) = summary.last() {
            println!();
            println!("✓ {} cycles in {:.3} s", last.cycle, summary.elapsed_wall_s);
            println!(
                "  Final position: {:.4} (setpoint {:.4})",
                last.position, last.setpoint
            );
            println!("  Cycles on target since enable: {}", last.settled_cycles);
        }
    }
    Ok(())
}

fn write_header(out: &mut impl Write) -> io::Result<()> {
    writeln!(
        out,
        "{:>6} {:>8} {:<10} {:>9} {:>9} {:>8} {:>8} {:>8} {:>6} {:>7}",
        "cycle", "t_s", "phase", "setpoint", "position", "speed", "avg", "rate", "on", "settled"
    )
}

fn write_row(out: &mut impl Write, r: &CycleRecord) -> io::Result<()> {
    writeln!(
        out,
        "{:>6} {:>8.3} {:<10} {:>9.4} {:>9.4} {:>8.4} {:>8.4} {:>8.4} {:>6} {:>7}",
        r.cycle,
        r.t_s,
        r.phase,
        r.setpoint,
        r.position,
        r.speed,
        r.smoothed_speed,
        r.measured_rate,
        if r.at_target { "yes" } else { "no" },
        r.settled_cycles
    )
}

fn write_json(out: &mut impl Write, record: &CycleRecord) -> AppResult<()> {
    let line = serde_json::to_string(record).map_err(|e| AppError::Output(e.to_string()))?;
    writeln!(out, "{}", line).map_err(output_error)
}

fn output_error(err: io::Error) -> AppError {
    AppError::Output(err.to_string())
}
