//! CLI command definitions for route-forge.
//!
//! `generate` runs the batch driver, `serve` runs the caching sample service
//! and `export` turns a generated dataset into Parquet training splits.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use crate::batch::{run_batch, BatchConfig, HttpSampleClient, LocalSampleClient, SampleClient};
use crate::cache::open_store;
use crate::export::{export_splits, SplitConfig};
use crate::metrics::init_metrics;
use crate::service::{serve, GenerateService};

/// Default sample service endpoint for `generate`.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8787/generate";

/// Default bind address for `serve`.
const DEFAULT_BIND: &str = "0.0.0.0:8787";

const DEFAULT_CACHE_URL: &str = "memory://";

/// PCB trace-routing image dataset generator.
#[derive(Parser)]
#[command(name = "route-forge")]
#[command(about = "Generate PCB trace-routing image datasets")]
#[command(version)]
#[command(
    long_about = "route-forge solves synthetic two-layer PCB routing problems, renders each one before and after routing, and assembles the images into a dataset.\n\nExample usage:\n  route-forge serve --cache-url sqlite://cache.db\n  route-forge generate --sample-count 1000 --output-dir ./dataset --concurrency 8\n  route-forge export --dataset-dir ./dataset"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Generate a dataset by requesting samples from the sample service.
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// Run the caching sample service over HTTP.
    Serve(ServeArgs),

    /// Split a generated dataset into train/test Parquet files.
    Export(ExportArgs),
}

/// Arguments for `route-forge generate`.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Number of samples to request.
    #[arg(long)]
    pub sample_count: usize,

    /// Directory for images, dataset.jsonl and metadata.
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Number of concurrent workers.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub concurrency: u32,

    /// Sample service endpoint.
    #[arg(long, env = "ROUTE_FORGE_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Added to each sample index to form its seed.
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub seed_offset: i64,

    /// PNG width in pixels.
    #[arg(long, default_value = "1024", value_parser = clap::value_parser!(u32).range(1..=16384))]
    pub image_width: u32,

    /// Per-request timeout in seconds.
    #[arg(long, default_value = "120")]
    pub request_timeout_secs: u64,

    /// Solve in this process instead of calling the endpoint.
    #[arg(long)]
    pub in_process: bool,

    /// Cache store used with --in-process (memory://, sqlite://<path>, redis://...).
    #[arg(long, env = "ROUTE_FORGE_CACHE_URL", default_value = DEFAULT_CACHE_URL)]
    pub cache_url: String,
}

/// Arguments for `route-forge serve`.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "ROUTE_FORGE_BIND", default_value = DEFAULT_BIND)]
    pub bind: String,

    /// Cache store URL (memory://, sqlite://<path>, redis://...).
    #[arg(long, env = "ROUTE_FORGE_CACHE_URL", default_value = DEFAULT_CACHE_URL)]
    pub cache_url: String,
}

/// Arguments for `route-forge export`.
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Directory produced by `generate`.
    #[arg(long)]
    pub dataset_dir: PathBuf,

    /// Fraction of samples placed in the test split.
    #[arg(long, default_value = "0.2")]
    pub test_ratio: f64,

    /// Shuffle seed for the split.
    #[arg(long, default_value = "42")]
    pub split_seed: u64,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => {
            run_generate_command(args).await?;
        }
        Commands::Serve(args) => {
            run_serve_command(args).await?;
        }
        Commands::Export(args) => {
            run_export_command(args)?;
        }
    }
    Ok(())
}

async fn run_generate_command(args: GenerateArgs) -> anyhow::Result<()> {
    let client: Arc<dyn SampleClient> = if args.in_process {
        let store = open_store(&args.cache_url)
            .await
            .with_context(|| format!("Failed to open cache store {}", args.cache_url))?;
        info!(cache = store.backend(), "Solving samples in-process");
        Arc::new(LocalSampleClient::new(GenerateService::with_defaults(store)))
    } else {
        Arc::new(HttpSampleClient::new(
            args.endpoint.clone(),
            Duration::from_secs(args.request_timeout_secs),
        )?)
    };

    let config = BatchConfig {
        sample_count: args.sample_count,
        output_dir: args.output_dir.clone(),
        concurrency: args.concurrency as usize,
        seed_offset: args.seed_offset,
        image_width: args.image_width,
    };

    let summary = run_batch(config, client).await?;
    let meta = &summary.metadata;

    println!(
        "Generated {}/{} samples in {:.1}s ({:.2} samples/s), cache hit ratio {:.3}",
        meta.generated_samples,
        meta.sample_count,
        meta.elapsed_seconds,
        meta.samples_per_second,
        meta.cache_hit_ratio
    );
    println!("Dataset: {}", summary.dataset_path.display());
    if let Some(path) = &summary.failures_path {
        println!(
            "Warning: {} samples failed, see {}",
            meta.failed_samples,
            path.display()
        );
    }
    Ok(())
}

async fn run_serve_command(args: ServeArgs) -> anyhow::Result<()> {
    init_metrics()?;
    let store = open_store(&args.cache_url)
        .await
        .with_context(|| format!("Failed to open cache store {}", args.cache_url))?;
    serve(&args.bind, GenerateService::with_defaults(store)).await
}

fn run_export_command(args: ExportArgs) -> anyhow::Result<()> {
    let config = SplitConfig {
        dataset_dir: args.dataset_dir,
        test_ratio: args.test_ratio,
        seed: args.split_seed,
    };
    let summary = export_splits(&config)?;

    println!(
        "Exported {} train / {} test samples ({} skipped)",
        summary.train_ids.len(),
        summary.test_ids.len(),
        summary.skipped
    );
    for path in [&summary.train_path, &summary.test_path].into_iter().flatten() {
        println!("  {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_requires_core_flags() {
        assert!(Cli::try_parse_from(["route-forge", "generate"]).is_err());
        assert!(Cli::try_parse_from([
            "route-forge",
            "generate",
            "--sample-count",
            "5",
            "--output-dir",
            "./out"
        ])
        .is_err());
    }

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::try_parse_from([
            "route-forge",
            "gen",
            "--sample-count",
            "5",
            "--output-dir",
            "./out",
            "--concurrency",
            "2",
        ])
        .expect("should parse");

        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.sample_count, 5);
                assert_eq!(args.concurrency, 2);
                assert_eq!(args.seed_offset, 0);
                assert_eq!(args.image_width, 1024);
                assert_eq!(args.request_timeout_secs, 120);
                assert!(!args.in_process);
            }
            _ => panic!("Expected Generate command"),
        }
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let result = Cli::try_parse_from([
            "route-forge",
            "generate",
            "--sample-count",
            "5",
            "--output-dir",
            "./out",
            "--concurrency",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_export_defaults() {
        let cli = Cli::try_parse_from(["route-forge", "export", "--dataset-dir", "./out"])
            .expect("should parse");
        match cli.command {
            Commands::Export(args) => {
                assert_eq!(args.test_ratio, 0.2);
                assert_eq!(args.split_seed, 42);
            }
            _ => panic!("Expected Export command"),
        }
    }
}
