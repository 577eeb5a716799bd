//! HOMCC server: caches dependencies, rewrites and runs compile jobs, and
//! answers one connection per job. See `homcc-client` for the other end.

pub mod cache;
pub mod job;
pub mod listener;
pub mod rewriter;
pub mod transport;

pub use cache::Cache;
pub use job::{run_job, MessageChannel};
pub use listener::Listener;
pub use rewriter::{rewrite, Rewritten, UnsupportedArgv};
pub use transport::FrameTransport;
