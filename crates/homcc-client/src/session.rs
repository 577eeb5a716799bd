//! Client session state machine (§4.5): one compile job, one connection.
//!
//! ```text
//! Init ──ArgumentRequest──▶ AwaitDepList
//! AwaitDepList ──DependencyRequest──▶ SendingFiles
//!              ──ConnectionRefused──▶ Failed(Refused)
//!              ──CompilationResult──▶ Complete   (server already had everything)
//! SendingFiles ──FileTransfer*, FilesSent──▶ AwaitResult
//! AwaitResult  ──CompilationResult──▶ Complete
//!              ──connection closed──▶ Failed(PeerClosed)
//! ```
//!
//! Each transition consumes exactly one message except the initial send.
//! A session owns exactly one connection and one host slot; the client may
//! run many sessions in parallel, each independent.

use async_trait::async_trait;
use homcc_core::error::{HomccError, Result};
use homcc_proto::{ArgumentRequest, CompilationResult, CompressionKind, FileTransfer, Message};

use crate::scanner::DependencyMap;

/// The send/recv contract the session drives. [`crate::transport::FrameTransport`]
/// is the real implementation; tests substitute an in-memory mock so the
/// state machine's transitions are exercised without a socket.
#[async_trait]
pub trait MessageChannel: Send {
    /// Send one message, compressed per `compression`.
    async fn send(&mut self, message: &Message, compression: CompressionKind) -> Result<()>;
    /// Receive and decode the next message.
    async fn recv(&mut self) -> Result<Message>;
}

#[async_trait]
impl MessageChannel for crate::transport::FrameTransport {
    async fn send(&mut self, message: &Message, compression: CompressionKind) -> Result<()> {
        crate::transport::FrameTransport::send(self, message, compression).await
    }

    async fn recv(&mut self) -> Result<Message> {
        crate::transport::FrameTransport::recv(self).await
    }
}

/// Everything one job needs to build its `ArgumentRequest` and answer the
/// server's follow-up `DependencyRequest`.
pub struct JobRequest {
    /// Full compiler argv, unmodified from the command line.
    pub args: Vec<String>,
    /// Working directory the compiler was invoked from.
    pub cwd: String,
    /// Chroot profile to run under, if any.
    pub target_profile: Option<String>,
    /// Docker container to run in, if any.
    pub docker_container: Option<String>,
    /// Every dependency the local scanner found, by path.
    pub dependencies: DependencyMap,
}

/// Drive one job to completion or failure over `channel`.
///
/// # Errors
///
/// [`HomccError::Refused`] if the server is saturated,
/// [`HomccError::PeerClosed`] if the connection drops mid-job, or
/// [`HomccError::ProtocolMalformed`] if the server sends a message this
/// state doesn't expect. Any of these mean the caller should fall back to
/// local compilation; the caller is still responsible for releasing the
/// host slot regardless of outcome (§4.5, state `Failed`).
pub async fn run_session<C: MessageChannel>(
    channel: &mut C,
    compression: CompressionKind,
    request: JobRequest,
) -> Result<CompilationResult> {
    // State: Init
    let argument_request = Message::ArgumentRequest(ArgumentRequest {
        args: request.args,
        cwd: request.cwd,
        target_profile: request.target_profile,
        docker_container: request.docker_container,
        dependency_hashes: request.dependencies.clone(),
    });
    channel.send(&argument_request, compression).await?;

    // State: AwaitDepList
    match channel.recv().await? {
        Message::DependencyRequest(needed) => {
            // State: SendingFiles
            for digest in needed.needed {
                let path = request
                    .dependencies
                    .iter()
                    .find(|(_, candidate)| **candidate == digest)
                    .map(|(path, _)| path.clone())
                    .ok_or_else(|| {
                        HomccError::ProtocolMalformed(format!("server requested unknown digest {digest}"))
                    })?;
                let content = tokio::fs::read(&path).await?;
                let transfer = Message::FileTransfer(FileTransfer { path, digest, content: content.into() });
                channel.send(&transfer, compression).await?;
            }
            channel.send(&Message::FilesSent, compression).await?;

            // State: AwaitResult
            await_result(channel).await
        },
        Message::ConnectionRefused(refusal) => Err(HomccError::Refused(refusal.reason)),
        // The server already had every dependency cached; no round-trip needed.
        Message::CompilationResult(result) => Ok(result),
        other => Err(unexpected(&other, "AwaitDepList")),
    }
}

async fn await_result<C: MessageChannel>(channel: &mut C) -> Result<CompilationResult> {
    match channel.recv().await? {
        Message::CompilationResult(result) => Ok(result),
        Message::ConnectionRefused(refusal) => Err(HomccError::Refused(refusal.reason)),
        other => Err(unexpected(&other, "AwaitResult")),
    }
}

fn unexpected(message: &Message, state: &str) -> HomccError {
    HomccError::ProtocolMalformed(format!("unexpected {:?} while in {state}", message.message_type()))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use homcc_proto::{ConnectionRefused, Digest, DependencyRequest, ObjectFile};

    use super::*;

    /// In-memory [`MessageChannel`]: a queue of canned inbound messages and
    /// a log of what was sent, so session transitions are testable without
    /// a socket.
    #[derive(Default)]
    struct MockChannel {
        inbound: VecDeque<Message>,
        sent: Vec<Message>,
    }

    #[async_trait]
    impl MessageChannel for MockChannel {
        async fn send(&mut self, message: &Message, _compression: CompressionKind) -> Result<()> {
            self.sent.push(message.clone());
            Ok(())
        }

        async fn recv(&mut self) -> Result<Message> {
            self.inbound.pop_front().ok_or(HomccError::PeerClosed)
        }
    }

    fn request(dependencies: DependencyMap) -> JobRequest {
        JobRequest {
            args: vec!["-c".to_string(), "main.c".to_string()],
            cwd: "/work".to_string(),
            target_profile: None,
            docker_container: None,
            dependencies,
        }
    }

    #[tokio::test]
    async fn full_round_trip_sends_requested_files_then_files_sent() {
        // The scanner records dependencies by path, but the path must exist
        // on disk for `run_session` to read its content: point it at this
        // test file itself rather than faking a read.
        let existing_path = file!().to_string();
        let digest = Digest::of(b"placeholder, overridden by the real file content below");
        let dependencies = DependencyMap::from([(existing_path.clone(), digest)]);

        let mut channel = MockChannel::default();
        channel.inbound.push_back(Message::DependencyRequest(DependencyRequest { needed: vec![digest] }));
        channel.inbound.push_back(Message::CompilationResult(CompilationResult {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            object_files: vec![ObjectFile { path: "/work/main.o".to_string(), content: vec![1, 2, 3] }],
        }));

        let result = run_session(&mut channel, CompressionKind::None, request(dependencies))
            .await
            .expect("session should complete");
        assert_eq!(result.exit_code, 0);

        let Message::FileTransfer(transfer) = &channel.sent[1] else {
            panic!("expected a FileTransfer as the second sent message");
        };
        assert_eq!(transfer.path, existing_path);
        assert!(matches!(channel.sent[2], Message::FilesSent));
    }

    #[tokio::test]
    async fn server_with_everything_cached_skips_file_transfer() {
        let mut channel = MockChannel::default();
        channel.inbound.push_back(Message::CompilationResult(CompilationResult {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            object_files: vec![],
        }));

        let result = run_session(&mut channel, CompressionKind::None, request(DependencyMap::new()))
            .await
            .expect("session should complete");
        assert_eq!(result.exit_code, 0);
        assert_eq!(channel.sent.len(), 1, "only the initial ArgumentRequest should be sent");
    }

    #[tokio::test]
    async fn connection_refused_while_awaiting_dep_list_fails_the_session() {
        let mut channel = MockChannel::default();
        channel.inbound.push_back(Message::ConnectionRefused(ConnectionRefused::limit_reached()));

        let err = run_session(&mut channel, CompressionKind::None, request(DependencyMap::new())).await.unwrap_err();
        assert!(matches!(err, HomccError::Refused(_)));
    }

    #[tokio::test]
    async fn peer_closing_mid_job_fails_the_session() {
        let mut channel = MockChannel::default();
        channel.inbound.push_back(Message::DependencyRequest(DependencyRequest { needed: vec![] }));
        // No further inbound messages queued: recv() during AwaitResult fails.

        let err = run_session(&mut channel, CompressionKind::None, request(DependencyMap::new())).await.unwrap_err();
        assert!(matches!(err, HomccError::PeerClosed));
    }

    #[tokio::test]
    async fn unknown_requested_digest_is_protocol_malformed() {
        let mut channel = MockChannel::default();
        channel
            .inbound
            .push_back(Message::DependencyRequest(DependencyRequest { needed: vec![Digest::of(b"nothing known")] }));

        let err = run_session(&mut channel, CompressionKind::None, request(DependencyMap::new())).await.unwrap_err();
        assert!(matches!(err, HomccError::ProtocolMalformed(_)));
    }
}
