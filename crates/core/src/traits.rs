use std::io;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced by a bridge transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("receive timed out")]
    TimedOut,
    #[error("frame of {0} bytes exceeds the frame limit")]
    FrameTooLarge(usize),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Errors surfaced to callers of the bridge client.
///
/// Every failure outcome of a logical call maps to exactly one variant;
/// nothing is swallowed or downgraded to a default value, and the client
/// never retries on its own.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The transport could not be established or broke mid-call.
    #[error("connection failed: {0}")]
    Connection(String),
    /// A call was attempted without an active connection. No transport I/O
    /// was performed.
    #[error("not connected")]
    NotConnected,
    /// No reply arrived within the configured window. The connection is
    /// unusable until re-established.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// Bytes arrived but did not conform to the wire shape.
    #[error("malformed reply: {0}")]
    MalformedReply(String),
    /// A caller-supplied argument was rejected before dispatch.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A named lookup had no match on the bridge.
    #[error("not found: {0}")]
    NotFound(String),
    /// The bridge executed the command and reported a failure; code and
    /// message are carried verbatim.
    #[error("bridge error [{code}]: {message}")]
    Remote { code: String, message: String },
}

// ---------------------------------------------------------------------------
// Transport Seam
// ---------------------------------------------------------------------------

/// A byte-oriented request/reply channel to the bridge.
///
/// The channel is assumed ordered with exactly one reply per request. The
/// dispatcher drives it strictly one call at a time: `send`, then one
/// `receive` bounded by the caller's timeout.
pub trait Transport: Send {
    /// Establish the connection. Must complete before any send/receive.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Deliver one request payload.
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Block until one reply payload arrives or `timeout` elapses.
    fn receive(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// Release the connection. Safe to call more than once.
    fn close(&mut self);
}
