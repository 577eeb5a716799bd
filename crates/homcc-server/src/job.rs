//! Server job runner (§4.8): one compile job, one connection.
//!
//! ```text
//! ArgumentRequest → rewrite argv → DependencyRequest{needed}
//!   → FileTransfer* → FilesSent → pin deps, build root_dir, link blobs
//!   → run compiler in sandbox → CompilationResult → unpin deps, rm root_dir
//! ```
//!
//! Any failure from rewriting, sandboxing, or running the compiler becomes a
//! `CompilationResult` with a nonzero exit code and the error text in
//! `stderr` (§4.8's error-handling clause): the connection still closes
//! cleanly and cleanup still runs. A dependency whose content doesn't match
//! its declared digest is the one exception — that is treated as a protocol
//! violation and the connection is simply dropped, matching §4.8 step 4
//! ("fail `IntegrityError` and close").

use std::{collections::BTreeMap, path::PathBuf};

use async_trait::async_trait;
use homcc_core::{error::Result as HomccResult, Environment, HomccError};
use homcc_proto::{
    ArgumentRequest, CompilationResult, CompressionKind, Digest, FileTransfer, Message, ObjectFile,
};
use thiserror::Error;

use crate::{
    cache::{Cache, CacheError},
    rewriter::{self, UnsupportedArgv},
};

/// The send/recv contract the job runner drives. [`crate::transport::FrameTransport`]
/// is the real implementation; tests substitute an in-memory mock.
#[async_trait]
pub trait MessageChannel: Send {
    /// Send one message, compressed per `compression`.
    async fn send(&mut self, message: &Message, compression: CompressionKind) -> HomccResult<()>;
    /// Receive and decode the next message.
    async fn recv(&mut self) -> HomccResult<Message>;
}

#[async_trait]
impl MessageChannel for crate::transport::FrameTransport {
    async fn send(&mut self, message: &Message, compression: CompressionKind) -> HomccResult<()> {
        crate::transport::FrameTransport::send(self, message, compression).await
    }

    async fn recv(&mut self) -> HomccResult<Message> {
        crate::transport::FrameTransport::recv(self).await
    }
}

/// A job-level failure that closes the connection without a reply, as
/// opposed to one reported back to the client as a `CompilationResult`.
#[derive(Error, Debug)]
pub enum JobError {
    /// A transferred file's content didn't hash to its declared digest.
    #[error("dependency content did not match its declared digest")]
    Integrity,
    /// The first message on the connection wasn't an `ArgumentRequest`.
    #[error("expected ArgumentRequest, got something else")]
    UnexpectedFirstMessage,
    /// Transport-level failure (peer closed, malformed frame, ...).
    #[error(transparent)]
    Transport(#[from] HomccError),
}

/// Run one job to completion over `channel`, using `cache` for dependency
/// storage and `job_roots_dir` as the parent of this job's scratch
/// `root_dir`.
///
/// # Errors
///
/// Only for connection-level failures (§4.8 step 4's integrity check, or a
/// transport error); anything else is reported to the client as a
/// `CompilationResult` and this returns `Ok(())`.
pub async fn run_job<C: MessageChannel, E: Environment>(
    channel: &mut C,
    cache: &Cache<E>,
    job_roots_dir: &std::path::Path,
) -> Result<(), JobError> {
    let request = match channel.recv().await? {
        Message::ArgumentRequest(request) => request,
        _ => return Err(JobError::UnexpectedFirstMessage),
    };

    let root_dir = job_roots_dir.join(root_dir_name(cache.env()));

    let rewritten = match rewriter::rewrite(&request.args, &root_dir) {
        Ok(rewritten) => rewritten,
        Err(err) => {
            let result = CompilationResult::failure(HomccError::UnsupportedArgv(err.to_string()).exit_code() as u32, unsupported_argv_message(&err));
            channel.send(&Message::CompilationResult(result), CompressionKind::None).await?;
            return Ok(());
        },
    };

    let needed: Vec<Digest> =
        request.dependency_hashes.values().copied().filter(|d| !cache.contains(*d)).collect();
    channel.send(&Message::DependencyRequest(homcc_proto::DependencyRequest { needed }), CompressionKind::None).await?;

    receive_dependencies(channel, cache).await?;

    let result = run_compile(&request, &rewritten, &root_dir, cache).await;
    channel.send(&Message::CompilationResult(result), CompressionKind::None).await?;

    for digest in request.dependency_hashes.values() {
        cache.unpin(*digest);
    }
    tokio::fs::remove_dir_all(&root_dir).await.ok();

    Ok(())
}

/// Drain `FileTransfer` messages until `FilesSent`, inserting each into the
/// cache after verifying its digest.
async fn receive_dependencies<C: MessageChannel, E: Environment>(
    channel: &mut C,
    cache: &Cache<E>,
) -> Result<(), JobError> {
    loop {
        match channel.recv().await? {
            Message::FileTransfer(FileTransfer { digest, content, .. }) => {
                if Digest::of(&content) != digest {
                    return Err(JobError::Integrity);
                }
                cache.insert(digest, &content).await.map_err(cache_error_to_transport)?;
            },
            Message::FilesSent => return Ok(()),
            _ => return Err(JobError::UnexpectedFirstMessage),
        }
    }
}

fn cache_error_to_transport(err: CacheError) -> JobError {
    match err {
        CacheError::TooLarge { size, budget } => JobError::Transport(HomccError::CacheTooLarge { size, budget }),
        CacheError::NotFound(_) | CacheError::Io(_) => JobError::Transport(HomccError::Io(std::io::Error::other(err.to_string()))),
    }
}

/// Pin dependencies, materialize `root_dir`, run the sandboxed compiler, and
/// collect object files. Every failure path here becomes a `CompilationResult`
/// rather than propagating, per §4.8's error-handling clause.
async fn run_compile<E: Environment>(
    request: &ArgumentRequest,
    rewritten: &rewriter::Rewritten,
    root_dir: &std::path::Path,
    cache: &Cache<E>,
) -> CompilationResult {
    if let Err(err) = link_dependencies(request, root_dir, cache).await {
        return CompilationResult::failure(err.exit_code() as u32, err.to_string());
    }

    let driver = match homcc_sandbox::select(request.target_profile.as_deref(), request.docker_container.as_deref()).await {
        Ok(driver) => driver,
        Err(err) => {
            let err = HomccError::SandboxUnavailable(err.to_string());
            return CompilationResult::failure(err.exit_code() as u32, err.to_string());
        },
    };

    let rewritten_cwd = rewriter::rewrite_cwd(&request.cwd, root_dir);
    let run_output = match driver.run(&rewritten.remote_argv, &rewritten_cwd, &BTreeMap::new()).await {
        Ok(output) => output,
        Err(err) => {
            let err = HomccError::SandboxUnavailable(err.to_string());
            return CompilationResult::failure(err.exit_code() as u32, err.to_string());
        },
    };

    if run_output.exit_code != 0 {
        return CompilationResult {
            exit_code: run_output.exit_code,
            stdout: run_output.stdout,
            stderr: run_output.stderr,
            object_files: Vec::new(),
        };
    }

    match collect_object_files(rewritten, root_dir).await {
        Ok(object_files) => {
            CompilationResult { exit_code: 0, stdout: run_output.stdout, stderr: run_output.stderr, object_files }
        },
        Err(err) => CompilationResult::failure(err.exit_code() as u32, err.to_string()),
    }
}

async fn link_dependencies<E: Environment>(
    request: &ArgumentRequest,
    root_dir: &std::path::Path,
    cache: &Cache<E>,
) -> Result<(), HomccError> {
    tokio::fs::create_dir_all(root_dir).await?;

    for (path, digest) in &request.dependency_hashes {
        let blob_path = cache.pin(*digest).map_err(|e| HomccError::IntegrityError(e.to_string()))?;
        let link_path = rewriter::reparent_path(path, root_dir);
        if let Some(parent) = link_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        link_or_copy(&blob_path, &link_path).await?;
    }

    Ok(())
}

async fn link_or_copy(blob_path: &std::path::Path, link_path: &std::path::Path) -> std::io::Result<()> {
    match tokio::fs::hard_link(blob_path, link_path).await {
        Ok(()) => Ok(()),
        Err(err) if err.raw_os_error() == Some(libc_exdev()) => {
            tokio::fs::copy(blob_path, link_path).await.map(|_| ())
        },
        Err(err) => Err(err),
    }
}

/// `EXDEV`, hardcoded rather than pulled in via `libc` for one constant.
/// Linux, macOS, and the BSDs all agree on 18.
const fn libc_exdev() -> i32 {
    18
}

async fn collect_object_files(
    rewritten: &rewriter::Rewritten,
    root_dir: &std::path::Path,
) -> Result<Vec<ObjectFile>, HomccError> {
    let mut object_files = Vec::with_capacity(rewritten.outputs.len());
    for output in &rewritten.outputs {
        let rewritten_path = rewriter::reparent_path(output, root_dir);
        let content = tokio::fs::read(&rewritten_path).await?;
        object_files.push(ObjectFile { path: output.clone(), content });
    }
    Ok(object_files)
}

fn root_dir_name<E: Environment>(env: &E) -> String {
    let mut bytes = [0u8; 16];
    env.random_bytes(&mut bytes);
    hex::encode(bytes)
}

fn unsupported_argv_message(err: &UnsupportedArgv) -> String {
    format!("unsupported argv: {err}")
}
