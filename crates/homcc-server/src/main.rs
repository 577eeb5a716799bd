//! `homccd`: the HOMCC compile server.
//!
//! ```bash
//! homccd --port 3633 --limit 8
//! ```

use std::path::PathBuf;

use clap::Parser;
use homcc_core::{config, env::SystemEnv};
use homcc_server::{Cache, Listener};

const DEFAULT_PORT: u16 = 3633;
const DEFAULT_LIMIT: u32 = 8;
const DEFAULT_ADDRESS: &str = "0.0.0.0";
/// 10 GiB, following §6's example cache root with room for a modest fleet
/// of dependency trees.
const DEFAULT_CACHE_BUDGET_BYTES: u64 = 10 * 1024 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "homccd")]
struct Cli {
    /// Maximum concurrent compile jobs.
    #[arg(long)]
    limit: Option<u32>,

    /// Listen port.
    #[arg(long)]
    port: Option<u16>,

    /// Listen address.
    #[arg(long)]
    address: Option<String>,

    /// Root of the on-disk dependency cache.
    #[arg(long, default_value = "/tmp/homcc-cache")]
    cache_dir: PathBuf,

    /// Total byte budget for the dependency cache.
    #[arg(long, default_value_t = DEFAULT_CACHE_BUDGET_BYTES)]
    cache_budget_bytes: u64,

    /// Parent directory for per-job scratch trees.
    #[arg(long, default_value = "/tmp")]
    job_roots_dir: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = config::discover_config().unwrap_or(None).unwrap_or_default();
    init_logging(&config.homccd.log_level, config.homccd.verbose);

    if let Err(error) = run(cli, config).await {
        tracing::error!(%error, "homccd exited with an error");
        std::process::exit(1);
    }
}

fn init_logging(log_level: &Option<String>, verbose: bool) {
    let filter = if verbose {
        "debug".to_string()
    } else {
        log_level.clone().unwrap_or_else(|| "info".to_string())
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(cli: Cli, config: config::Config) -> std::io::Result<()> {
    let address = cli.address.or(config.homccd.address).unwrap_or_else(|| DEFAULT_ADDRESS.to_string());
    let port = cli.port.or(config.homccd.port).unwrap_or(DEFAULT_PORT);
    let limit = cli.limit.or(config.homccd.limit).unwrap_or(DEFAULT_LIMIT) as usize;

    tracing::info!(%address, port, limit, cache_dir = %cli.cache_dir.display(), "homccd starting");

    let cache = Cache::new(&cli.cache_dir, cli.cache_budget_bytes, SystemEnv::new());
    cache.recover().await.map_err(|e| std::io::Error::other(e.to_string()))?;

    let listener = Listener::bind(&address, port, cache, cli.job_roots_dir, limit).await?;
    tracing::info!(addr = %listener.local_addr()?, "homccd listening");

    listener.run().await
}
