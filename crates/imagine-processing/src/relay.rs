//! Response relay
//!
//! One relay handles one upstream response: it passes the stream through
//! untouched when no operations were requested, otherwise it buffers the body,
//! applies the operation string on a blocking worker and emits the encoded
//! result or an error signal. Aborting (via the cancellation token) from
//! buffering or processing closes the relay without emitting anything.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use imagine_core::{
    AppError, BackendError, EncodedImage, ImageBackend, ImageHandle, OperationDispatcher,
    OperationError, OperationPath, PathError,
};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MAX_BUFFER_BYTES: usize = 25 * 1024 * 1024;

/// Client-facing message for backend failures.
const BACKEND_FAILURE_MESSAGE: &str = "error performing image operations";

/// Lifecycle of a relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Buffering,
    Processing,
    Emitting(Emission),
    Closed,
}

/// What a relay emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    Success,
    Error,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Operation(OperationError),

    #[error(transparent)]
    Backend(BackendError),

    #[error("Upstream read failed: {0}")]
    Upstream(String),

    #[error("Image exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    #[error("Relay has already handled a response")]
    AlreadyUsed,

    #[error("Image worker failed: {0}")]
    Worker(String),
}

impl From<OperationError> for RelayError {
    fn from(err: OperationError) -> Self {
        match err {
            OperationError::Backend(backend) => RelayError::Backend(backend),
            other => RelayError::Operation(other),
        }
    }
}

impl From<BackendError> for RelayError {
    fn from(err: BackendError) -> Self {
        RelayError::Backend(err)
    }
}

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Operation(e) => AppError::from(e),
            RelayError::Backend(e) => AppError::from(e),
            RelayError::Upstream(msg) => AppError::Upstream(msg),
            RelayError::PayloadTooLarge { limit } => {
                AppError::PayloadTooLarge(format!("image exceeds {} bytes", limit))
            }
            err @ (RelayError::AlreadyUsed | RelayError::Worker(_)) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

/// The single error a failed relay emits.
#[derive(Debug)]
pub struct ErrorSignal {
    /// Message safe to show to clients
    pub message: String,
    pub error: RelayError,
}

impl From<RelayError> for ErrorSignal {
    fn from(error: RelayError) -> Self {
        let message = match &error {
            RelayError::Backend(_) => BACKEND_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        };
        Self { message, error }
    }
}

impl fmt::Display for ErrorSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// What a relay hands back to its listener.
#[derive(Debug)]
pub enum RelayOutput<S> {
    /// No operations requested: the upstream stream, untouched
    Original(S),
    Transformed(EncodedImage),
    Error(ErrorSignal),
}

/// Releases the wrapped handle when dropped, on every path out of a worker.
struct ReleaseGuard<H: ImageHandle>(H);

impl<H: ImageHandle> Deref for ReleaseGuard<H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.0
    }
}

impl<H: ImageHandle> DerefMut for ReleaseGuard<H> {
    fn deref_mut(&mut self) -> &mut H {
        &mut self.0
    }
}

impl<H: ImageHandle> Drop for ReleaseGuard<H> {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// Per-request relay between an upstream image response and its listener.
pub struct ResponseRelay<B: ImageBackend> {
    backend: Arc<B>,
    path: OperationPath,
    dispatcher: OperationDispatcher,
    max_buffer_bytes: usize,
    cancel: CancellationToken,
    state: RelayState,
}

impl<B: ImageBackend> ResponseRelay<B> {
    pub fn new(backend: Arc<B>, path: OperationPath) -> Self {
        Self {
            backend,
            path,
            dispatcher: OperationDispatcher::new(),
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
            cancel: CancellationToken::new(),
            state: RelayState::Idle,
        }
    }

    /// Build a relay from a request path (`/{key}/{operations...}`).
    pub fn for_path(backend: Arc<B>, pathname: &str) -> Result<Self, PathError> {
        Ok(Self::new(backend, OperationPath::parse(pathname)?))
    }

    pub fn with_max_buffer_bytes(mut self, limit: usize) -> Self {
        self.max_buffer_bytes = limit;
        self
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that aborts this relay when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Abort: stop reading upstream and emit nothing.
    pub fn handle_abort(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn path(&self) -> &OperationPath {
        &self.path
    }

    fn transition(&mut self, next: RelayState) {
        tracing::trace!(
            key = %self.path.key(),
            from = ?self.state,
            to = ?next,
            "Relay state change"
        );
        self.state = next;
    }

    /// Relay one upstream response.
    ///
    /// Returns `None` when the relay was aborted; the upstream stream has been
    /// dropped by then.
    pub async fn handle_response<S, E>(&mut self, upstream: S) -> Option<RelayOutput<S>>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: fmt::Display,
    {
        if self.state != RelayState::Idle {
            tracing::warn!(key = %self.path.key(), state = ?self.state, "Relay reused");
            return Some(RelayOutput::Error(RelayError::AlreadyUsed.into()));
        }

        if self.cancel.is_cancelled() {
            self.transition(RelayState::Closed);
            return None;
        }

        if !self.path.has_operations() {
            tracing::debug!(key = %self.path.key(), "No operations requested, passing through");
            self.transition(RelayState::Emitting(Emission::Success));
            self.transition(RelayState::Closed);
            return Some(RelayOutput::Original(upstream));
        }

        self.transition(RelayState::Buffering);
        let data = match self.buffer(upstream).await {
            Ok(Some(data)) => data,
            Ok(None) => return self.aborted(),
            Err(e) => return Some(self.fail(e)),
        };

        self.transition(RelayState::Processing);
        match self.process(data).await {
            Some(Ok(image)) => {
                self.transition(RelayState::Emitting(Emission::Success));
                self.transition(RelayState::Closed);
                Some(RelayOutput::Transformed(image))
            }
            Some(Err(e)) => Some(self.fail(e)),
            None => self.aborted(),
        }
    }

    fn aborted<S>(&mut self) -> Option<RelayOutput<S>> {
        tracing::debug!(key = %self.path.key(), state = ?self.state, "Relay aborted");
        self.transition(RelayState::Closed);
        None
    }

    fn fail<S>(&mut self, error: RelayError) -> RelayOutput<S> {
        match &error {
            RelayError::Operation(_) | RelayError::PayloadTooLarge { .. } => {
                tracing::info!(key = %self.path.key(), error = %error, "Image request rejected")
            }
            _ => tracing::error!(key = %self.path.key(), error = %error, "Image relay failed"),
        }
        self.transition(RelayState::Emitting(Emission::Error));
        self.transition(RelayState::Closed);
        RelayOutput::Error(error.into())
    }

    /// Collect the upstream body. `Ok(None)` means aborted.
    async fn buffer<S, E>(&self, upstream: S) -> Result<Option<Bytes>, RelayError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: fmt::Display,
    {
        let mut upstream = std::pin::pin!(upstream);
        let mut buffer = BytesMut::new();

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(None),
                chunk = upstream.next() => match chunk {
                    Some(Ok(chunk)) => {
                        if buffer.len() + chunk.len() > self.max_buffer_bytes {
                            return Err(RelayError::PayloadTooLarge {
                                limit: self.max_buffer_bytes,
                            });
                        }
                        buffer.extend_from_slice(&chunk);
                    }
                    Some(Err(e)) => return Err(RelayError::Upstream(e.to_string())),
                    None => {
                        tracing::debug!(
                            key = %self.path.key(),
                            bytes = buffer.len(),
                            "Upstream body buffered"
                        );
                        return Ok(Some(buffer.freeze()));
                    }
                },
            }
        }
    }

    /// Transform on the blocking pool. `None` means aborted; a worker that
    /// is still running keeps its handle until it finishes.
    async fn process(&self, data: Bytes) -> Option<Result<EncodedImage, RelayError>> {
        let backend = Arc::clone(&self.backend);
        let dispatcher = self.dispatcher;
        let operations = self.path.operations().to_string();
        let key = self.path.key().to_string();

        let worker = tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let result = transform(backend.as_ref(), dispatcher, &operations, data);
            tracing::debug!(
                key = %key,
                success = result.is_ok(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Image operations finished"
            );
            result
        });

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            joined = worker => Some(
                joined
                    .map_err(|e| RelayError::Worker(e.to_string()))
                    .and_then(|result| result),
            ),
        }
    }
}

fn transform<B: ImageBackend>(
    backend: &B,
    dispatcher: OperationDispatcher,
    operations: &str,
    data: Bytes,
) -> Result<EncodedImage, RelayError> {
    let mut handle = ReleaseGuard(backend.open(data)?);
    let applied = dispatcher.apply(operations, &mut *handle)?;
    tracing::debug!(operations = %operations, applied = applied, "Applied image operations");
    Ok(handle.to_bytes()?)
}
