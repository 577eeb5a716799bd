//! Shared HOMCC domain types: host specs, the cross-process slot pool, the
//! `Environment` abstraction, config/hosts discovery, and the error
//! taxonomy. No networking and no compiler invocation lives here — see
//! `homcc-client` and `homcc-server` for those.

pub mod config;
pub mod env;
pub mod error;
pub mod host;
pub mod janitor;
pub mod slots;

pub use config::{Config, HomccConfig, HomccdConfig};
pub use env::{Environment, SystemEnv};
pub use error::{HomccError, Result};
pub use host::{ConnectionKind, HostParseError, HostSpec};
pub use janitor::{Janitor, PidRegistry, RegistryEntry};
pub use slots::{SlotGuard, SlotPool};
