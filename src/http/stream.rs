//! Response stream handed to raw responses.
//!
//! The head (status + headers) is committed on the first body write, on an
//! explicit [`ResponseStream::commit`], or once the callback returns. The body
//! ends when every handle to the stream has been dropped.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

const BODY_CHANNEL_CAPACITY: usize = 16;

type Chunk = Result<Bytes, io::Error>;

/// Errors surfaced to raw response callbacks.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Status and headers can no longer change.
    #[error("response head has already been sent")]
    HeadAlreadySent,

    /// The client went away.
    #[error("response stream is closed")]
    Closed,

    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

/// Committed status, headers and the body receiver.
pub(crate) struct Head {
    status: StatusCode,
    headers: HeaderMap,
    body: mpsc::Receiver<Chunk>,
}

impl Head {
    pub(crate) fn into_response(self) -> Response {
        let stream = futures_util::stream::unfold(self.body, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        });
        let mut response = Response::new(Body::from_stream(stream));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

pub(crate) type HeadReceiver = oneshot::Receiver<anyhow::Result<Head>>;

struct State {
    status: StatusCode,
    headers: HeaderMap,
    head_tx: Option<oneshot::Sender<anyhow::Result<Head>>>,
    body_rx: Option<mpsc::Receiver<Chunk>>,
}

/// Handle over the live response.
#[derive(Clone)]
pub struct ResponseStream {
    state: Arc<Mutex<State>>,
    body_tx: mpsc::Sender<Chunk>,
}

impl ResponseStream {
    pub(crate) fn channel() -> (Self, HeadReceiver) {
        let (head_tx, head_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::channel(BODY_CHANNEL_CAPACITY);
        let state = State {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            head_tx: Some(head_tx),
            body_rx: Some(body_rx),
        };
        (Self { state: Arc::new(Mutex::new(state)), body_tx }, head_rx)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_status(&self, status: StatusCode) -> Result<(), StreamError> {
        let mut state = self.lock();
        if state.head_tx.is_none() {
            return Err(StreamError::HeadAlreadySent);
        }
        state.status = status;
        Ok(())
    }

    pub fn insert_header(&self, name: HeaderName, value: HeaderValue) -> Result<(), StreamError> {
        let mut state = self.lock();
        if state.head_tx.is_none() {
            return Err(StreamError::HeadAlreadySent);
        }
        state.headers.insert(name, value);
        Ok(())
    }

    /// Parse and set a header.
    pub fn set_header(&self, name: &str, value: &str) -> Result<(), StreamError> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| StreamError::InvalidHeader(e.to_string()))?;
        let value = HeaderValue::from_str(value).map_err(|e| StreamError::InvalidHeader(e.to_string()))?;
        self.insert_header(name, value)
    }

    pub fn is_committed(&self) -> bool {
        self.lock().head_tx.is_none()
    }

    /// Send status and headers now. Returns `false` if already sent.
    pub fn commit(&self) -> bool {
        let mut state = self.lock();
        let (Some(head_tx), Some(body)) = (state.head_tx.take(), state.body_rx.take()) else {
            return false;
        };
        let head = Head {
            status: state.status,
            headers: std::mem::take(&mut state.headers),
            body,
        };
        // The dispatcher only stops listening when the request itself is gone.
        let _ = head_tx.send(Ok(head));
        true
    }

    /// Append a chunk to the body, committing the head first if needed.
    pub async fn write(&self, chunk: impl Into<Bytes>) -> Result<(), StreamError> {
        self.commit();
        self.body_tx
            .send(Ok(chunk.into()))
            .await
            .map_err(|_| StreamError::Closed)
    }

    pub(crate) fn finish(&self) {
        self.commit();
    }

    /// Report a callback failure: before the head is sent it replaces the
    /// response, afterwards it aborts the body.
    ///
    /// Waits for room in the body channel so the abort is never dropped.
    pub(crate) async fn fail(&self, error: anyhow::Error) {
        let head_tx = self.lock().head_tx.take();
        match head_tx {
            Some(head_tx) => {
                let _ = head_tx.send(Err(error));
            }
            None => {
                let abort = Err(io::Error::other(format!("{:#}", error)));
                if self.body_tx.send(abort).await.is_err() {
                    tracing::debug!("Response body dropped before the abort was delivered");
                }
            }
        }
    }
}

impl std::fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ResponseStream")
            .field("status", &state.status)
            .field("committed", &state.head_tx.is_none())
            .finish()
    }
}
