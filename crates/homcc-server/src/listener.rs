//! TCP listener and per-connection dispatch (§4.6).
//!
//! Grounded in `lockframe-server/src/transport.rs`'s `QuinnTransport::bind`/
//! `accept` pair, adapted from a QUIC endpoint to a plain `TcpListener` since
//! HOMCC carries no transport encryption of its own. The admission check
//! (reply `ConnectionRefused` and close once `limit` in-flight jobs are
//! running) happens before a task is ever spawned, matching §5's "admission
//! decisions happen before task spawn."

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use homcc_core::Environment;
use homcc_proto::{CompressionKind, ConnectionRefused, Message};
use tokio::net::{TcpListener, TcpStream};

use crate::{cache::Cache, job, transport::FrameTransport};

/// The decoder's payload cap, matching the default in §4.1.
const MAX_PAYLOAD_BYTES: u64 = 1 << 31;

/// A running listener: binds once, then accepts connections until the
/// process is told to stop.
pub struct Listener<E: Environment> {
    tcp: TcpListener,
    cache: Cache<E>,
    job_roots_dir: PathBuf,
    limit: usize,
    in_flight: Arc<AtomicUsize>,
}

impl<E: Environment> Listener<E> {
    /// Bind `(address, port)`.
    ///
    /// # Errors
    ///
    /// Propagates the underlying `TcpListener::bind` I/O error.
    pub async fn bind(
        address: &str,
        port: u16,
        cache: Cache<E>,
        job_roots_dir: PathBuf,
        limit: usize,
    ) -> std::io::Result<Self> {
        let tcp = TcpListener::bind((address, port)).await?;
        Ok(Self { tcp, cache, job_roots_dir, limit, in_flight: Arc::new(AtomicUsize::new(0)) })
    }

    /// The address actually bound, useful when `port` was 0.
    ///
    /// # Errors
    ///
    /// Propagates the underlying socket's `local_addr` I/O error.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.tcp.local_addr()
    }

    /// Accept and dispatch connections forever.
    ///
    /// # Errors
    ///
    /// Returns only if `accept` itself fails (the listening socket is
    /// broken); a single connection's failure never propagates here.
    pub async fn run(self) -> std::io::Result<()>
    where
        E: 'static,
    {
        loop {
            let (stream, peer) = self.tcp.accept().await?;
            tracing::debug!(%peer, "accepted connection");

            if self.in_flight.load(Ordering::SeqCst) >= self.limit {
                tracing::warn!(%peer, limit = self.limit, "refusing connection: at concurrency limit");
                tokio::spawn(refuse(stream));
                continue;
            }

            self.in_flight.fetch_add(1, Ordering::SeqCst);
            let cache = self.cache.clone();
            let job_roots_dir = self.job_roots_dir.clone();
            let in_flight = Arc::clone(&self.in_flight);

            tokio::spawn(async move {
                let mut transport = FrameTransport::new(stream, MAX_PAYLOAD_BYTES);
                if let Err(err) = job::run_job(&mut transport, &cache, &job_roots_dir).await {
                    tracing::warn!(%peer, %err, "job ended in error");
                }
                in_flight.fetch_sub(1, Ordering::SeqCst);
            });
        }
    }
}

async fn refuse(stream: TcpStream) {
    let mut transport = FrameTransport::new(stream, MAX_PAYLOAD_BYTES);
    let refusal = Message::ConnectionRefused(ConnectionRefused::limit_reached());
    let _ = transport.send(&refusal, CompressionKind::None).await;
    let _ = transport.shutdown().await;
}

#[cfg(test)]
mod tests {
    use homcc_core::env::SystemEnv;
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn refuses_connections_past_the_limit() {
        let cache_dir = tempdir().expect("tempdir");
        let roots_dir = tempdir().expect("tempdir");
        let cache = Cache::new(cache_dir.path(), 1 << 20, SystemEnv::new());

        let listener = Listener::bind("127.0.0.1", 0, cache, roots_dir.path().to_path_buf(), 0)
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");

        tokio::spawn(listener.run());

        let stream = TcpStream::connect(addr).await.expect("connect");
        let mut client = FrameTransport::new(stream, 1 << 20);
        let message = client.recv().await.expect("recv");
        assert!(matches!(message, Message::ConnectionRefused(_)));
    }
}
