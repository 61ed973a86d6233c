//! Call dispatcher: one request, one reply, no retries.

use std::time::Duration;

use serde_json::Value;
use termbridge_core::{ClientError, Transport, TransportError};
use tracing::{debug, trace, warn};

use crate::protocol::{self, ArgValue};

/// Drives the transport through the `Disconnected -> Connected ->
/// Disconnected` lifecycle and performs the strict request/reply exchange
/// for each logical call.
///
/// Retrying is deliberately absent: a remote command may not be idempotent,
/// so retry policy belongs to the caller.
pub struct Dispatcher {
    transport: Box<dyn Transport>,
    response_timeout: Duration,
    verbose: bool,
    connected: bool,
}

impl Dispatcher {
    pub fn new(transport: Box<dyn Transport>, response_timeout: Duration, verbose: bool) -> Self {
        Self {
            transport,
            response_timeout,
            verbose,
            connected: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn connect(&mut self) -> Result<(), ClientError> {
        self.transport
            .connect()
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        self.connected = true;
        Ok(())
    }

    pub fn close(&mut self) {
        self.transport.close();
        self.connected = false;
    }

    /// Send one encoded request and block until its reply or the timeout.
    pub fn call(&mut self, command: &str, args: &[ArgValue]) -> Result<Value, ClientError> {
        if !self.connected {
            return Err(ClientError::NotConnected);
        }

        let payload = protocol::encode_request(command, args)?;
        debug!(command, "dispatching request");
        if self.verbose {
            trace!(command, payload = %String::from_utf8_lossy(&payload), "request payload");
        }

        if let Err(e) = self.transport.send(&payload) {
            self.drop_connection();
            return Err(ClientError::Connection(e.to_string()));
        }

        let raw = match self.transport.receive(self.response_timeout) {
            Ok(raw) => raw,
            Err(TransportError::TimedOut) => {
                // A reply past the deadline can no longer be paired with its
                // request; the channel cannot resynchronize mid-stream.
                warn!(command, timeout = ?self.response_timeout, "reply timed out, dropping connection");
                self.drop_connection();
                return Err(ClientError::Timeout(self.response_timeout));
            }
            Err(TransportError::FrameTooLarge(len)) => {
                self.drop_connection();
                return Err(ClientError::MalformedReply(format!(
                    "frame of {len} bytes exceeds the frame limit"
                )));
            }
            Err(e) => {
                self.drop_connection();
                return Err(ClientError::Connection(e.to_string()));
            }
        };

        if self.verbose {
            trace!(command, payload = %String::from_utf8_lossy(&raw), "reply payload");
        }
        // The frame was fully consumed, so a body that fails to decode does
        // not desynchronize the stream; the connection stays up.
        protocol::decode_reply(&raw)
    }

    fn drop_connection(&mut self) {
        self.transport.close();
        self.connected = false;
    }
}
