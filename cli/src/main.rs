mod config;
mod io;
mod preclean;

use clap::{Parser, Subcommand};
use io::{PolygonSink, RasterSource};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "topology-cli", version, about = "Raster-to-vector shared-boundary topology engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Runs the full pipeline over a raster and writes a GeoJSON layer.
    Run {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        raster: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Parses and validates a config file without running anything.
    ValidateConfig {
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => {
            log::error!("exiting with code {code}");
            ExitCode::from(code)
        }
    }
}

fn run(command: Command) -> Result<(), u8> {
    match command {
        Command::ValidateConfig { config: path } => match config::load_config(&path) {
            Ok(_) => {
                log::info!("config at {} is valid", path.display());
                Ok(())
            }
            Err(report) => {
                log::error!("{report:?}");
                Err(1)
            }
        },
        Command::Run { config: config_path, raster, out } => {
            let config = config::load_config(&config_path).map_err(|report| {
                log::error!("{report:?}");
                1u8
            })?;

            let source = io::text_source(&raster);
            let mut grid = source.read().map_err(|report| {
                log::error!("{report:?}");
                2u8
            })?;

            preclean::preclean(&mut grid, config.min_blob_size);

            // No signal-handling crate appears anywhere in the corpus, so
            // SIGINT isn't wired up here; the cancellation flag itself is
            // still plumbed through for an embedder that wants to flip it.
            let cancel = Arc::new(AtomicBool::new(false));

            let result = topology_core::run(grid, config, cancel).map_err(|err| {
                log::error!("pipeline failed: {err}");
                err.exit_code() as u8
            })?;

            for warning in &result.warnings {
                log::warn!("{warning}");
            }
            log::info!("produced {} labeled polygon set(s)", result.polygons.len());

            let sink = io::geojson_sink(&out);
            sink.write(&result).map_err(|report| {
                log::error!("{report:?}");
                2u8
            })?;
            Ok(())
        }
    }
}
