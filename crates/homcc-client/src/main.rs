//! `homcc`: a drop-in compiler wrapper that tries a remote build host
//! before falling back to the local compiler.
//!
//! Invoked as `homcc <compiler> <compiler-args...>`, e.g.
//! `homcc gcc -c main.c -o main.o`, the same shape `CCACHE_PREFIX=homcc`
//! produces when ccache chains to it.
//!
//! This binary's whole job is to mirror a compiler's stdout/stderr and
//! exit code back to the caller, so it writes to them directly rather
//! than through `tracing`.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::{path::PathBuf, process::Stdio, time::Duration};

use clap::Parser;
use homcc_client::{scanner, selector, session, transport::FrameTransport, JobRequest};
use homcc_core::{config, env::SystemEnv, host::parse_hosts_file, HomccError, HostSpec, SlotPool};
use homcc_proto::CompressionKind;
use tokio::process::Command;

/// Default per-message/per-job timeout when neither config nor `--timeout`
/// set one.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Parser, Debug)]
#[command(name = "homcc")]
struct Cli {
    /// Remote build host, overriding the hosts file entirely
    /// (`HOST[:PORT][/LIMIT][,COMPRESSION]`).
    #[arg(long)]
    host: Option<String>,

    /// Per-job timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Compression codec for outbound messages (`none`, `lzo`, `lzma`).
    #[arg(long)]
    compression: Option<CompressionKind>,

    /// Chroot profile to request on the server.
    #[arg(long)]
    profile: Option<String>,

    /// Docker container to request on the server.
    #[arg(long = "docker-container")]
    docker_container: Option<String>,

    /// Compiler binary followed by its own arguments, e.g. `gcc -c main.c -o main.o`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    compiler_argv: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = config::discover_config().unwrap_or(None).unwrap_or_default();
    init_logging(&config.homcc.log_level, config.homcc.verbose);

    let exit_code = run(cli, config).await;
    std::process::exit(exit_code);
}

fn init_logging(log_level: &Option<String>, verbose: bool) {
    let filter = if verbose {
        "debug".to_string()
    } else {
        log_level.clone().unwrap_or_else(|| "warn".to_string())
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(cli: Cli, config: config::Config) -> i32 {
    if cli.compiler_argv.is_empty() {
        eprintln!("homcc: no compiler argv given, e.g. `homcc gcc -c main.c -o main.o`");
        return 1;
    }

    let compiler = cli.compiler_argv[0].clone();
    let compiler_flags = cli.compiler_argv[1..].to_vec();
    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(error) => {
            eprintln!("homcc: could not determine working directory: {error}");
            return 1;
        },
    };

    let hosts = match resolve_hosts(&cli) {
        Ok(hosts) => hosts,
        Err(error) => {
            eprintln!("homcc: {error}");
            return 1;
        },
    };

    if hosts.is_empty() {
        tracing::debug!("no hosts configured, compiling locally");
        return local_fallback(&compiler, &compiler_flags, &cwd).await;
    }

    let timeout = Duration::from_secs(cli.timeout.or(config.homcc.timeout).unwrap_or(DEFAULT_TIMEOUT_SECS));
    let compression = cli.compression.or(config.homcc.compression).unwrap_or_default();
    let profile = cli.profile.or(config.homcc.profile);
    let docker_container = cli.docker_container.or(config.homcc.docker_container);

    match run_remote(&compiler, &compiler_flags, &cwd, &hosts, timeout, compression, profile, docker_container).await
    {
        Ok(exit_code) => exit_code,
        Err(error) => {
            tracing::warn!(%error, "remote compilation failed, falling back to local compiler");
            local_fallback(&compiler, &compiler_flags, &cwd).await
        },
    }
}

fn resolve_hosts(cli: &Cli) -> Result<Vec<HostSpec>, HomccError> {
    if let Some(host) = &cli.host {
        return Ok(vec![HostSpec::parse(host).map_err(|e| HomccError::Config(e.to_string()))?]);
    }

    match config::discover_hosts()? {
        Some(contents) => parse_hosts_file(&contents).map_err(|e| HomccError::Config(e.to_string())),
        None => Ok(Vec::new()),
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_remote(
    compiler: &str,
    compiler_flags: &[String],
    cwd: &std::path::Path,
    hosts: &[HostSpec],
    timeout: Duration,
    compression: CompressionKind,
    profile: Option<String>,
    docker_container: Option<String>,
) -> Result<i32, HomccError> {
    let dependencies = scanner::scan(compiler, compiler_flags, cwd).await?;

    let env = SystemEnv::new();
    let pool = SlotPool::new(slot_pool_dir());
    let Some(selected) = selector::select_host(&env, &pool, hosts, timeout).await? else {
        return Err(HomccError::Refused("every configured host stayed saturated".to_string()));
    };

    let mut full_argv = vec![compiler.to_string()];
    full_argv.extend(compiler_flags.iter().cloned());

    let request = JobRequest {
        args: full_argv,
        cwd: cwd.display().to_string(),
        target_profile: profile,
        docker_container,
        dependencies,
    };

    // A host's own `,COMPRESSION` entry wins; otherwise fall back to the
    // client-wide default from `--compression`/config.
    let effective_compression =
        if selected.host.compression == CompressionKind::None { compression } else { selected.host.compression };

    let mut transport =
        FrameTransport::connect((selected.host.name_or_address.as_str(), selected.host.port), 1 << 31).await?;
    let result = session::run_session(&mut transport, effective_compression, request).await?;
    drop(selected.guard);

    for object_file in &result.object_files {
        if let Some(parent) = std::path::Path::new(&object_file.path).parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        tokio::fs::write(&object_file.path, &object_file.content).await?;
    }

    if !result.stdout.is_empty() {
        print!("{}", result.stdout);
    }
    if !result.stderr.is_empty() {
        eprint!("{}", result.stderr);
    }

    Ok(result.exit_code as i32)
}

fn slot_pool_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HOMCC_DIR") {
        return PathBuf::from(dir).join("slots");
    }
    std::env::temp_dir().join("homcc-slots")
}

async fn local_fallback(compiler: &str, args: &[String], cwd: &std::path::Path) -> i32 {
    let status = Command::new(compiler)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await;

    match status {
        Ok(status) => status.code().unwrap_or(1),
        Err(error) => {
            eprintln!("homcc: failed to run local compiler {compiler:?}: {error}");
            1
        },
    }
}
