use anyhow::{Context, Result};
use clap::Parser;
use reader_network::config::{Config, ProjectionMethod};
use reader_network::data::{self, metadata::MetadataStore};
use reader_network::pipeline;
use reader_network::storage::ArtifactStore;

#[derive(Parser, Debug)]
#[clap(
    name = "reader-network-analyzer",
    about = "Community structure of a reader/book network"
)]
struct Cli {
    /// Path to reader records (JSON Lines, or .parquet)
    #[clap(long)]
    input: String,

    /// Book metadata JSON keyed by book id
    #[clap(long)]
    metadata: Option<String>,

    /// Output directory for artifacts; use a distinct one per input shard
    #[clap(long, default_value = "network_results")]
    output_dir: String,

    /// JSON configuration file; replaces the tuning flags below
    #[clap(long)]
    config: Option<String>,

    /// Projection weighting: Count, Collaboration or Overlap
    #[clap(long, default_value = "Count")]
    method: String,

    /// Remove nodes with degree at or below this (1 = isolates only, negative = keep all)
    #[clap(long, default_value = "1", allow_hyphen_values = true)]
    degree_threshold: i64,

    /// Dendrogram level to label with (default: coarsest)
    #[clap(long)]
    level: Option<usize>,

    /// Drop labeled edges lighter than this
    #[clap(long, default_value = "2.0")]
    edge_threshold: f64,

    /// First record to process
    #[clap(long, default_value = "0")]
    start: usize,

    /// One past the last record to process (0 = all)
    #[clap(long, default_value = "0")]
    end: usize,

    /// Seed for the community detection visiting order
    #[clap(long)]
    seed: Option<u64>,

    /// Reuse projection and dendrogram checkpoints from the output directory
    #[clap(long)]
    resume: bool,

    /// Replace existing artifacts even if the new ones are smaller
    #[clap(long)]
    overwrite: bool,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long, default_value = "0")]
    threads: usize,

    /// Verbose logging
    #[clap(long, short)]
    verbose: bool,
}

impl Cli {
    fn to_config(&self) -> Result<Config> {
        if let Some(path) = &self.config {
            return Config::from_file(path).with_context(|| format!("loading config {}", path));
        }

        let projection: ProjectionMethod = self.method.parse()?;
        let config = Config {
            projection,
            degree_threshold: self.degree_threshold,
            partition_level: self.level,
            edge_weight_threshold: self.edge_threshold,
            record_start: self.start,
            record_end: self.end,
            shuffle_seed: self.seed,
            resume: self.resume,
            overwrite: self.overwrite,
            ..Config::default()
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();

    // Configure logging
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    // Configuration errors surface before any data is read
    let config = args.to_config()?;

    let num_threads = if args.threads > 0 {
        args.threads
    } else {
        num_cpus::get()
    };

    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    log::info!("Starting reader network analysis");
    log::info!("Input: {}", args.input);
    log::info!("Output: {}", args.output_dir);
    log::info!("Projection method: {}", config.projection);

    let store = ArtifactStore::open(&args.output_dir)?.with_overwrite(config.overwrite);

    let lookup = match &args.metadata {
        Some(path) => MetadataStore::from_file(path)?,
        None => {
            log::warn!("No metadata file given; every book will be marked as unknown");
            MetadataStore::new()
        }
    };

    let records = data::load_records(&args.input)?;
    let output = pipeline::run_pipeline(&records, &lookup, &config, &store)?;

    log::info!(
        "Analysis complete: {} communities at level {}. Results saved to {}",
        output.profiles.len(),
        output.level,
        store.root().display()
    );

    Ok(())
}
