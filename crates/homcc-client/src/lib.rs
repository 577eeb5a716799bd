//! HOMCC client: scans dependencies, picks a host, and drives one compile
//! session per remote job. See `homcc-server` for the other end.

pub mod scanner;
pub mod selector;
pub mod session;
pub mod transport;

pub use scanner::{scan, DependencyMap};
pub use selector::{select_host, SelectedHost};
pub use session::{run_session, JobRequest, MessageChannel};
pub use transport::FrameTransport;
