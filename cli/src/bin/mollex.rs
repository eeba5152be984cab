use clap::{Parser, Subcommand};
use cli::{draw_overlay, load_config, save_config};
use color_eyre::eyre::{Result, WrapErr};
use mollex::{
    batch::BatchDriver,
    io::{read_jobs, CatalogWriter},
    Pipeline, PipelineConfig,
};
use std::{
    path::{Path, PathBuf},
    thread,
    time::Duration,
};
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract specimens for every photograph listed in a catalog
    Run {
        /// Semicolon-separated input catalog
        #[arg(short, long)]
        catalog: PathBuf,
        /// Output catalog, one row per extracted segment
        #[arg(long)]
        output_catalog: PathBuf,
        /// Directory holding the photographs (`<stem>.jpg`)
        #[arg(short, long)]
        input_dir: PathBuf,
        /// Directory receiving the segment PNGs
        #[arg(short, long)]
        output_dir: PathBuf,
        /// Pipeline configuration (.toml or .json)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Number of photographs processed concurrently
        #[arg(short, long)]
        workers: Option<usize>,
        /// Progress report interval in milliseconds
        #[arg(long, default_value = "500")]
        progress_ms: u64,
    },
    /// Run detection on one photograph and draw the accepted contours
    Detect {
        /// Photograph to analyse
        #[arg(short, long)]
        image: PathBuf,
        /// Overlay PNG with accepted contours in red
        #[arg(short, long)]
        output: PathBuf,
        /// Also write the cleaned binary mask
        #[arg(long)]
        mask: Option<PathBuf>,
        /// Pipeline configuration (.toml or .json)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the JSON schema of the configuration file
    Schema,
    /// Write the default configuration to a file
    InitConfig {
        /// Destination (.toml or .json)
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Run {
            catalog,
            output_catalog,
            input_dir,
            output_dir,
            config,
            workers,
            progress_ms,
        } => {
            let workers = workers.unwrap_or_else(default_workers);
            run_batch(
                catalog,
                output_catalog,
                input_dir,
                output_dir,
                config.as_deref(),
                workers,
                Duration::from_millis(*progress_ms),
            )
            .await?;
        }
        Commands::Detect {
            image,
            output,
            mask,
            config,
        } => {
            detect(image, output, mask.as_deref(), config.as_deref())?;
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&PipelineConfig::schema())?);
        }
        Commands::InitConfig { output } => {
            save_config(&PipelineConfig::default(), output)?;
            info!("Wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}

fn default_workers() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

fn pipeline_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => load_config(path)
            .wrap_err_with(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

async fn run_batch(
    catalog: &Path,
    output_catalog: &Path,
    input_dir: &Path,
    output_dir: &Path,
    config: Option<&Path>,
    workers: usize,
    progress_interval: Duration,
) -> Result<()> {
    let pipeline = Pipeline::from_config(&pipeline_config(config)?)?;
    let jobs = read_jobs(catalog)
        .wrap_err_with(|| format!("Failed to read catalog {}", catalog.display()))?;
    info!("Loaded {} jobs from {}", jobs.len(), catalog.display());

    // Create output directory if it doesn't exist
    std::fs::create_dir_all(output_dir)?;
    let writer = CatalogWriter::create(output_catalog)?;

    let driver = BatchDriver::new(pipeline, input_dir, output_dir)
        .with_workers(workers)
        .with_progress_interval(progress_interval);
    let (summary, _) = driver.run(jobs, writer).await?;

    info!(
        "Processed {} photographs: {} segments written, {} skipped, {} overwritten, {} without segments, {} unreadable",
        summary.jobs,
        summary.segments,
        summary.skipped_segments,
        summary.overwritten,
        summary.empty,
        summary.unreadable
    );
    Ok(())
}

fn detect(image: &Path, output: &Path, mask: Option<&Path>, config: Option<&Path>) -> Result<()> {
    let pipeline = Pipeline::from_config(&pipeline_config(config)?)?;
    let photo = image::open(image)
        .wrap_err_with(|| format!("Failed to open {}", image.display()))?
        .to_rgb8();

    let detection = pipeline.detect(&photo);
    info!("Accepted {} contours in {}", detection.contours.len(), image.display());

    draw_overlay(&photo, &detection.contours).save(output)?;
    if let Some(mask_path) = mask {
        detection.mask.save(mask_path)?;
    }
    Ok(())
}
