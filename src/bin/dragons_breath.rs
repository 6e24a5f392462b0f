use std::{process::ExitCode, sync::Arc};

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use flexi_logger::{
    Cleanup, Criterion, Duplicate, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming,
};
use log::{error, info, warn};

use dragons_breath::{
    analysis::{
        anomalies::{read_anomaly_flags, AnomalyStats, ProposalIds, ProposalSet},
        heatmap::{write_grid_csv, HeatMap, DEFAULT_BIN_SIZE},
        histogram::MagnitudeHistogram,
        read_table,
    },
    batch::{
        photometry::{run_photometry_batch, ExternalPhotometry},
        staging::stage_exposures,
    },
    build_master_table,
    constants::FLT_SUFFIX,
    discovery::discover_fits,
    log_merger::merge_log_dir,
    records::metadata::{CsvMetadata, ExposureSelection},
    MatchPolicy, PipelineConfig, PipelineError,
};

#[derive(Parser, Debug)]
#[command(
    name = "dragons_breath",
    version,
    about = "Match hand-recorded Dragon's Breath clicks to candidate stars and build the master table"
)]
struct Cli {
    /// Log level filter (flexi_logger syntax, e.g. `info` or `debug,dragons_breath=trace`)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also write rotated log files to this directory
    #[arg(long)]
    log_dir: Option<Utf8PathBuf>,

    /// Directory of the annotated `_bey.fits` frames and `_2PH.uvrd` candidate files
    #[arg(long, default_value = "completed")]
    completed_dir: Utf8PathBuf,

    /// Directory the raw `_flt.fits` exposures are staged into
    #[arg(long, default_value = "data")]
    data_dir: Utf8PathBuf,

    /// Directory of the click logs, the master log and the master table
    #[arg(long, default_value = "code")]
    code_dir: Utf8PathBuf,

    /// Search radius around a click, in physical pixels
    #[arg(long, default_value_t = 100.0)]
    match_radius: f64,

    /// first-wins, last-wins or reject-ambiguous
    #[arg(long, default_value_t = MatchPolicy::FirstWins)]
    match_policy: MatchPolicy,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge every `bey_viewer*.log` of the code directory into the master log
    MergeLogs,

    /// Build the master table from the master log, the candidates and the metadata
    BuildTable {
        /// CSV export of the exposure database (`rootname,filter,exptime[,dir]`)
        #[arg(long)]
        metadata: Utf8PathBuf,
    },

    /// Copy the selected raw exposures into the data directory
    Stage {
        #[arg(long)]
        metadata: Utf8PathBuf,
        #[arg(long, default_value_t = 4)]
        workers: usize,
    },

    /// Run the photometry program on every staged exposure
    Photometry {
        #[arg(long, default_value = "./flt2mass.e")]
        executable: Utf8PathBuf,
        #[arg(long, default_value_t = 20)]
        workers: usize,
    },

    /// Print the magnitude histogram, export a heat map and report anomaly prevalence
    Summarize {
        /// Table to read, defaults to the master table of the code directory
        #[arg(long)]
        table: Option<Utf8PathBuf>,
        /// Restrict the heat map to causing stars of this integer magnitude
        #[arg(long)]
        magnitude: Option<i32>,
        #[arg(long, default_value_t = DEFAULT_BIN_SIZE)]
        bin_size: usize,
        /// Write the normalized heat map as CSV
        #[arg(long)]
        heatmap_out: Option<Utf8PathBuf>,
        /// Anomaly flag export (`rootname,proposal,<flags>`) to summarize as well
        #[arg(long)]
        anomalies: Option<Utf8PathBuf>,
        /// go, cal or all; the proposal lists are read from the code directory
        #[arg(long, default_value_t = ProposalSet::All)]
        proposals: ProposalSet,
    },
}

fn setup_logging(
    level: &str,
    dir: Option<&Utf8PathBuf>,
) -> Result<LoggerHandle, FlexiLoggerError> {
    let logger = Logger::try_with_str(level)?;
    let logger = match dir {
        Some(dir) => logger
            .log_to_file(FileSpec::default().directory(dir.as_std_path()))
            .duplicate_to_stderr(Duplicate::All)
            .rotate(
                Criterion::Size(1024 * 1024), //1MB
                Naming::Timestamps,
                Cleanup::KeepLogFiles(5),
            ),
        None => logger.log_to_stderr(),
    };
    logger.start()
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    let (photometry_workers, staging_workers) = match &cli.command {
        Command::Photometry { workers, .. } => (*workers, 4),
        Command::Stage { workers, .. } => (20, *workers),
        _ => (20, 4),
    };
    let mut builder = PipelineConfig::builder()
        .completed_dir(&cli.completed_dir)
        .data_dir(&cli.data_dir)
        .code_dir(&cli.code_dir)
        .match_radius(cli.match_radius)
        .match_policy(cli.match_policy)
        .photometry_workers(photometry_workers)
        .staging_workers(staging_workers);
    if let Command::Photometry { executable, .. } = &cli.command {
        builder = builder.photometry_executable(executable);
    }
    let config = builder.build()?;
    info!("{config}");

    match cli.command {
        Command::MergeLogs => {
            merge_log_dir(&config.code_dir, &config.master_log_path())?;
        }

        Command::BuildTable { metadata } => {
            let metadata = CsvMetadata::from_path(&metadata)?;
            let build = build_master_table(&config, &metadata)?;
            for (rootname, err) in &build.failures {
                warn!("{rootname}: {err}");
            }
            println!("{:#}", build.stats);
        }

        Command::Stage { metadata, .. } => {
            let metadata = CsvMetadata::from_path(&metadata)?;
            let sources = metadata.select(&ExposureSelection::default());
            info!("{} exposures selected", sources.len());

            let runtime = tokio::runtime::Runtime::new()?;
            let report = runtime.block_on(stage_exposures(
                sources,
                &config.data_dir,
                config.staging_workers,
            ))?;
            println!("{report:#}");
        }

        Command::Photometry { .. } => {
            let images = discover_fits(&config.data_dir, FLT_SUFFIX)?;
            let runner = Arc::new(ExternalPhotometry::from_config(&config));
            info!(
                "Running {} on {} exposures",
                runner.executable(),
                images.len()
            );

            let runtime = tokio::runtime::Runtime::new()?;
            let report = runtime.block_on(run_photometry_batch(
                runner,
                images,
                config.photometry_workers,
            ))?;
            println!("{report:#}");
        }

        Command::Summarize {
            table,
            magnitude,
            bin_size,
            heatmap_out,
            anomalies,
            proposals,
        } => {
            let table = table.unwrap_or_else(|| config.master_table_path());
            let rows = read_table(&table)?;
            println!("{}", MagnitudeHistogram::from_rows(&rows));

            let heatmap = match magnitude {
                Some(m) => HeatMap::one_magnitude(&rows, m),
                None => HeatMap::full(&rows),
            };
            info!("{} stars placed on the heat map", heatmap.total_stars());

            if let Some(out) = heatmap_out {
                let ratio = heatmap.binned(bin_size)?.normalized();
                write_grid_csv(&out, &ratio)?;
                info!("Wrote {}x{} heat map to {out}", ratio.ncols(), ratio.nrows());
            }

            if let Some(flags) = anomalies {
                let ids = ProposalIds::load(&config.code_dir, proposals)?;
                let images = read_anomaly_flags(&flags)?;
                info!("{} flagged rows, {} finished proposals", images.len(), ids.len());
                println!("{:#}", AnomalyStats::from_images(&images, &ids));
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _logger = match setup_logging(&cli.log_level, cli.log_dir.as_ref()) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Logger initialization failed with {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
