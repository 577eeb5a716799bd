//! Host specification and the hosts-file grammar.
//!
//! Grammar: `HOST[:PORT][/LIMIT][,COMPRESSION]`, one per line, `#` comments,
//! blank lines ignored. `HOST` is a DNS name, an IPv4 literal, or an IPv6
//! literal in `[...]` bracket form.

use std::fmt;

use homcc_proto::CompressionKind;
use thiserror::Error;

/// Default compile-server port.
pub const DEFAULT_PORT: u16 = 3633;

/// Default per-host slot count when `/LIMIT` is omitted.
pub const DEFAULT_MAX_SLOTS: u32 = 2;

/// Whether a host is reached over the network or is the local machine
/// talking to itself (used by callers that special-case loopback hosts,
/// e.g. to skip a redundant dependency upload).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    /// A genuine remote TCP peer.
    Tcp,
    /// Loopback / same-machine TCP.
    LocalTcp,
}

/// One parsed hosts-file entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSpec {
    /// DNS name, IPv4 literal, or bracketed IPv6 literal, exactly as written.
    pub name_or_address: String,
    /// TCP port; defaults to [`DEFAULT_PORT`].
    pub port: u16,
    /// Concurrent compile slots this host grants; defaults to
    /// [`DEFAULT_MAX_SLOTS`].
    pub max_slots: u32,
    /// Compression to use for outbound messages to this host.
    pub compression: CompressionKind,
    /// Whether this host is the local machine.
    pub connection_kind: ConnectionKind,
}

/// Failure parsing one hosts-file line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostParseError {
    /// The line had no host component at all.
    #[error("empty host entry")]
    Empty,
    /// The `:PORT` segment was not a valid port number.
    #[error("invalid port {0:?}")]
    InvalidPort(String),
    /// The `/LIMIT` segment was not a positive integer.
    #[error("invalid slot limit {0:?}")]
    InvalidLimit(String),
    /// The `,COMPRESSION` segment named an unknown codec.
    #[error("invalid compression {0:?}")]
    InvalidCompression(String),
    /// An IPv6 literal's `[` was never closed.
    #[error("unterminated IPv6 literal in {0:?}")]
    UnterminatedIpv6(String),
}

impl HostSpec {
    /// Parse one hosts-file line of the form `HOST[:PORT][/LIMIT][,COMPRESSION]`.
    /// The caller is expected to have already stripped comments and
    /// whitespace-only lines (see [`parse_hosts_file`]).
    pub fn parse(line: &str) -> Result<Self, HostParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(HostParseError::Empty);
        }

        // Split off `,COMPRESSION` first: it can't appear inside the host/port/limit.
        let (before_compression, compression) = match line.split_once(',') {
            Some((head, tail)) => {
                let kind = tail
                    .trim()
                    .parse::<CompressionKind>()
                    .map_err(|_| HostParseError::InvalidCompression(tail.trim().to_string()))?;
                (head, kind)
            },
            None => (line, CompressionKind::None),
        };

        // Host + optional `:PORT`, with IPv6 literals in `[addr]:port` form.
        let (host_and_port, max_slots) = match before_compression.split_once('/') {
            Some((head, tail)) => {
                let limit = tail
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|&n| n > 0)
                    .ok_or_else(|| HostParseError::InvalidLimit(tail.trim().to_string()))?;
                (head, limit)
            },
            None => (before_compression, DEFAULT_MAX_SLOTS),
        };

        let (name_or_address, port) = split_host_port(host_and_port.trim())?;

        if name_or_address.is_empty() {
            return Err(HostParseError::Empty);
        }

        let connection_kind = if is_loopback(&name_or_address) {
            ConnectionKind::LocalTcp
        } else {
            ConnectionKind::Tcp
        };

        Ok(Self { name_or_address, port, max_slots, compression, connection_kind })
    }

    /// The deterministic name used to key the cross-process named slot
    /// pool, so independent client invocations on the same machine share
    /// the same counter for this `(host, port)` pair.
    #[must_use]
    pub fn slot_key(&self) -> String {
        format!("{}:{}", self.name_or_address, self.port)
    }
}

impl fmt::Display for HostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{},{}", self.name_or_address, self.port, self.max_slots, self.compression)
    }
}

fn split_host_port(input: &str) -> Result<(String, u16), HostParseError> {
    if let Some(rest) = input.strip_prefix('[') {
        let (addr, after) =
            rest.split_once(']').ok_or_else(|| HostParseError::UnterminatedIpv6(input.to_string()))?;
        let port = match after.strip_prefix(':') {
            Some(port_str) => {
                port_str.parse().map_err(|_| HostParseError::InvalidPort(port_str.to_string()))?
            },
            None => DEFAULT_PORT,
        };
        return Ok((addr.to_string(), port));
    }

    match input.rsplit_once(':') {
        Some((host, port_str)) => {
            let port =
                port_str.parse().map_err(|_| HostParseError::InvalidPort(port_str.to_string()))?;
            Ok((host.to_string(), port))
        },
        None => Ok((input.to_string(), DEFAULT_PORT)),
    }
}

fn is_loopback(name_or_address: &str) -> bool {
    matches!(name_or_address, "localhost" | "127.0.0.1" | "::1")
}

/// Parse a whole hosts file, stripping `#` comments and blank lines, and
/// yielding [`HostSpec`] records in file order.
pub fn parse_hosts_file(contents: &str) -> Result<Vec<HostSpec>, HostParseError> {
    contents
        .lines()
        .map(strip_comment)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(HostSpec::parse)
        .collect()
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}
