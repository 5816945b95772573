//! Lead-by-date plot - command line entry point
//!
//! Reads a JSON run configuration, renders the lead-by-date chart and exits
//! nonzero on any failure.

use anyhow::Context;
use clap::Parser;
use lead_by_date_plot::config::RunConfig;
use lead_by_date_plot::logging::{self, LogTarget};
use lead_by_date_plot::pipeline;
use lead_by_date_plot::PlotError;
use std::path::PathBuf;
use std::process::ExitCode;

#[cfg(feature = "jemalloc")]
use tikv_jemallocator::Jemalloc;

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Debug, Parser)]
#[command(name = "lead_by_date_plot", version, about = "Render a lead-by-date verification chart")]
struct Args {
    /// Run configuration (JSON)
    #[arg(short, long, default_value = "lead_by_date.json")]
    config: PathBuf,

    /// Directory holding the .stat files
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Directory receiving images/ and logs/
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Directory holding noaa.png and nws.png
    #[arg(long)]
    logo_dir: Option<PathBuf>,

    /// Log to stderr instead of a file
    #[arg(long)]
    log_stderr: bool,
}

fn run(args: Args) -> anyhow::Result<PathBuf> {
    let mut config = RunConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(dir) = args.input_dir {
        config.input_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(dir) = args.logo_dir {
        config.logo_dir = dir;
    }

    match logging::init(&config.log_dir(), args.log_stderr).context("setting up logging")? {
        LogTarget::File(path) => println!("Log file: {}", path.display()),
        LogTarget::Stderr => {}
    }
    log::info!("lead_by_date_plot v{}", env!("CARGO_PKG_VERSION"));

    let image = pipeline::make_lead_by_date(&config)?;
    Ok(image)
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(image) => {
            log::info!("Done");
            println!("✓ Wrote {}", image.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            let fatal = e
                .downcast_ref::<PlotError>()
                .map(PlotError::is_fatal_misconfiguration)
                .unwrap_or(false);
            if fatal {
                log::error!("Fatal misconfiguration: {:#}", e);
            } else {
                log::error!("{:#}", e);
            }
            eprintln!("✗ {:#}", e);
            ExitCode::FAILURE
        }
    }
}
