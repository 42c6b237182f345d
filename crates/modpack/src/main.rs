use std::{io::Write, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug};
use modpack::{config::Config, orchestrator::BundleOrchestrator};

#[derive(Parser, Debug)]
#[command(name = "modpack", version, about = "Bundle JavaScript modules into a single script")]
struct Cli {
    /// Entry module, relative to the working directory
    entry: PathBuf,

    /// Write the bundle here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write a JSON manifest of the bundled modules
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Config file layered over user and project config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Module loading threads (0 = one per core, 1 = serial)
    #[arg(long)]
    threads: Option<usize>,

    /// Keep module payloads unminified
    #[arg(long)]
    no_minify: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::print_stderr)]
fn report_error(error: &anyhow::Error) {
    eprintln!("error: {error:#}");
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(threads) = cli.threads {
        config.load_threads = threads;
    }
    if cli.no_minify {
        config.minify = false;
    }
    debug!("Configuration: {config:?}");

    let orchestrator = BundleOrchestrator::new(config);
    let bundle = match &cli.output {
        Some(output) => orchestrator.bundle_to_file(&cli.entry, output)?,
        None => {
            let bundle = orchestrator.bundle(&cli.entry)?;
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(bundle.script.as_bytes())
                .and_then(|()| stdout.flush())
                .context("Failed to write bundle to stdout")?;
            bundle
        }
    };

    if let Some(manifest) = &cli.manifest {
        bundle.write_manifest(manifest)?;
    }
    Ok(())
}
