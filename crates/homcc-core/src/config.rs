//! Config-file parsing and the config/hosts-file discovery order.
//!
//! Parsing is a pure function over `&str` so it is unit-testable without
//! touching the filesystem; [`discover_config`] and [`discover_hosts`] do
//! the actual path search and `fs::read`.

use std::path::PathBuf;

use homcc_proto::CompressionKind;

use crate::error::{HomccError, Result};

/// `[homcc]` section: client-side defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HomccConfig {
    /// Default compiler name, overridable by argv[0] or `--compiler`.
    pub compiler: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout: Option<u64>,
    /// Default compression for hosts that don't specify their own.
    pub compression: Option<CompressionKind>,
    /// Default chroot profile name.
    pub profile: Option<String>,
    /// Default container name.
    pub docker_container: Option<String>,
    /// Logger verbosity (passed to `tracing_subscriber::EnvFilter`).
    pub log_level: Option<String>,
    /// Implies debug-level logging when true.
    pub verbose: bool,
}

/// `[homccd]` section: server-side defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HomccdConfig {
    /// Maximum concurrent compile jobs.
    pub limit: Option<u32>,
    /// Listen port.
    pub port: Option<u16>,
    /// Listen address.
    pub address: Option<String>,
    /// Logger verbosity.
    pub log_level: Option<String>,
    /// Implies debug-level logging when true.
    pub verbose: bool,
}

/// Both sections of the INI-like config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// `[homcc]` section.
    pub homcc: HomccConfig,
    /// `[homccd]` section.
    pub homccd: HomccdConfig,
}

/// Parse config file contents. Unknown sections/keys are ignored; malformed
/// values for a recognized key are an error so a typo in `limit = ten`
/// fails loudly instead of silently falling back to a default.
pub fn parse_config(contents: &str) -> Result<Config> {
    let ini = ini::Ini::load_from_str(contents)
        .map_err(|e| HomccError::Config(format!("invalid config syntax: {e}")))?;

    let mut config = Config::default();

    if let Some(section) = ini.section(Some("homcc")) {
        config.homcc.compiler = section.get("compiler").map(str::to_string);
        config.homcc.timeout = parse_opt(section.get("timeout"), "homcc.timeout")?;
        config.homcc.compression = match section.get("compression") {
            Some(value) => Some(
                value.parse::<CompressionKind>().map_err(|e| HomccError::Config(format!("homcc.compression: {e}")))?,
            ),
            None => None,
        };
        config.homcc.profile = section.get("profile").map(str::to_string);
        config.homcc.docker_container = section.get("docker_container").map(str::to_string);
        config.homcc.log_level = section.get("log_level").map(str::to_string);
        config.homcc.verbose = parse_bool(section.get("verbose"));
    }

    if let Some(section) = ini.section(Some("homccd")) {
        config.homccd.limit = parse_opt(section.get("limit"), "homccd.limit")?;
        config.homccd.port = parse_opt(section.get("port"), "homccd.port")?;
        config.homccd.address = section.get("address").map(str::to_string);
        config.homccd.log_level = section.get("log_level").map(str::to_string);
        config.homccd.verbose = parse_bool(section.get("verbose"));
    }

    Ok(config)
}

fn parse_opt<T: std::str::FromStr>(raw: Option<&str>, field: &str) -> Result<Option<T>> {
    match raw {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| HomccError::Config(format!("{field}: invalid value {value:?}"))),
        None => Ok(None),
    }
}

fn parse_bool(raw: Option<&str>) -> bool {
    matches!(raw.map(str::to_ascii_lowercase).as_deref(), Some("1" | "true" | "yes" | "on"))
}

/// Locate and read the config file, trying `$HOMCC_DIR/homcc.conf`, then
/// `~/.homcc/homcc.conf`, then `~/.config/homcc/homcc.conf`, then
/// `/etc/homcc/homcc.conf`, returning the first that exists. Returns
/// `Ok(None)` if none exist — an absent config file is not an error, it
/// just means every key falls back to its hardcoded default.
pub fn discover_config() -> Result<Option<Config>> {
    for candidate in config_search_paths() {
        if candidate.is_file() {
            let contents = std::fs::read_to_string(&candidate)?;
            return Ok(Some(parse_config(&contents)?));
        }
    }
    Ok(None)
}

fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(homcc_dir) = std::env::var("HOMCC_DIR") {
        paths.push(PathBuf::from(homcc_dir).join("homcc.conf"));
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".homcc").join("homcc.conf"));
    }
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("homcc").join("homcc.conf"));
    }
    paths.push(PathBuf::from("/etc/homcc/homcc.conf"));

    paths
}

/// Locate the hosts file content, honoring `$HOMCC_HOSTS` as an inline
/// whitespace-separated override before falling back to the same
/// `$HOMCC_DIR`, `~/.homcc`, `~/.config/homcc`, `/etc/homcc` search order
/// used for the config file.
pub fn discover_hosts() -> Result<Option<String>> {
    if let Ok(inline) = std::env::var("HOMCC_HOSTS") {
        return Ok(Some(inline.split_whitespace().collect::<Vec<_>>().join("\n")));
    }

    for candidate in hosts_search_paths() {
        if candidate.is_file() {
            return Ok(Some(std::fs::read_to_string(&candidate)?));
        }
    }
    Ok(None)
}

fn hosts_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(homcc_dir) = std::env::var("HOMCC_DIR") {
        paths.push(PathBuf::from(homcc_dir).join("hosts"));
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".homcc").join("hosts"));
    }
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("homcc").join("hosts"));
    }
    paths.push(PathBuf::from("/etc/homcc/hosts"));

    paths
}
