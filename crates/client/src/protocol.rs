//! Wire codec for the bridge protocol.
//!
//! Requests are JSON objects of the form `{"command": ..., "args": [...]}`
//! with strictly positional arguments; the remote side dispatches by
//! position, never by name. Replies are `{"ok": true, "result": ...}` or
//! `{"ok": false, "error": {"code": ..., "message": ...}}`. Frames carry a
//! 4-byte big-endian length prefix.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use termbridge_core::{ClientError, Timeframe};

/// Maximum accepted frame body, in bytes. A conforming bridge never comes
/// close; a longer prefix means the peer is not speaking this protocol.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Error code the bridge uses for failed named lookups.
const CODE_NOT_FOUND: &str = "NOT_FOUND";

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A positional request argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::Str(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        ArgValue::Str(v)
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        ArgValue::Int(v)
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        ArgValue::Int(v.into())
    }
}

impl From<u32> for ArgValue {
    fn from(v: u32) -> Self {
        ArgValue::Int(v.into())
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        ArgValue::Float(v)
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Bool(v)
    }
}

impl From<Timeframe> for ArgValue {
    fn from(tf: Timeframe) -> Self {
        ArgValue::Int(tf.minutes())
    }
}

#[derive(Serialize)]
struct Request<'a> {
    command: &'a str,
    args: &'a [ArgValue],
}

/// Encode one request payload. Arguments are serialized in the order given.
/// Non-finite floats have no representation in the wire format and are
/// rejected here, before any transport I/O.
pub fn encode_request(command: &str, args: &[ArgValue]) -> Result<Vec<u8>, ClientError> {
    for arg in args {
        if let ArgValue::Float(v) = arg {
            if !v.is_finite() {
                return Err(ClientError::InvalidArgument(format!(
                    "non-finite argument for {command}: {v}"
                )));
            }
        }
    }
    serde_json::to_vec(&Request { command, args })
        .map_err(|e| ClientError::InvalidArgument(e.to_string()))
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// Structured error payload from the bridge.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Reply {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<WireError>,
}

/// Decode one reply frame into the successful result value or an error.
///
/// Decoding is total: every byte sequence yields a success value, a
/// structured bridge error, or `MalformedReply`. A reply that mixes the
/// success and error shapes is malformed, never partially decoded.
pub fn decode_reply(bytes: &[u8]) -> Result<Value, ClientError> {
    let reply: Reply =
        serde_json::from_slice(bytes).map_err(|e| ClientError::MalformedReply(e.to_string()))?;
    match (reply.ok, reply.result, reply.error) {
        (true, Some(result), None) => Ok(result),
        (false, None, Some(err)) => {
            if err.code == CODE_NOT_FOUND {
                Err(ClientError::NotFound(err.message))
            } else {
                Err(ClientError::Remote {
                    code: err.code,
                    message: err.message,
                })
            }
        }
        (true, None, _) => Err(ClientError::MalformedReply(
            "ok reply without a result".to_string(),
        )),
        (true, Some(_), Some(_)) => Err(ClientError::MalformedReply(
            "ok reply carrying an error".to_string(),
        )),
        (false, _, None) => Err(ClientError::MalformedReply(
            "error reply without an error payload".to_string(),
        )),
        (false, Some(_), Some(_)) => Err(ClientError::MalformedReply(
            "error reply carrying a result".to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Framing
// ---------------------------------------------------------------------------

/// Frame a payload with a 4-byte length prefix (big-endian).
pub fn frame_message(payload: &[u8]) -> Vec<u8> {
    let len = payload.len() as u32;
    let mut framed = Vec::with_capacity(4 + payload.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(payload);
    framed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_is_positional_and_deterministic() {
        let args = [
            ArgValue::from("EURUSD"),
            ArgValue::from(60i64),
            ArgValue::from(1i64),
        ];
        let payload = encode_request("RUN_INDICATOR", &args).unwrap();
        assert_eq!(
            String::from_utf8(payload).unwrap(),
            r#"{"command":"RUN_INDICATOR","args":["EURUSD",60,1]}"#
        );
    }

    #[test]
    fn test_encode_rejects_non_finite_floats() {
        let args = [ArgValue::from(f64::NAN)];
        match encode_request("RUN_INDICATOR", &args) {
            Err(ClientError::InvalidArgument(_)) => {}
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_single_result() {
        let bytes = serde_json::to_vec(&json!({"ok": true, "result": {"x": 1}})).unwrap();
        let value = decode_reply(&bytes).unwrap();
        assert_eq!(value, json!({"x": 1}));
    }

    #[test]
    fn test_decode_list_result() {
        let bytes = serde_json::to_vec(&json!({"ok": true, "result": ["EURUSD", "GBPUSD"]})).unwrap();
        let value = decode_reply(&bytes).unwrap();
        assert_eq!(value, json!(["EURUSD", "GBPUSD"]));
    }

    #[test]
    fn test_decode_not_found_error() {
        let bytes = serde_json::to_vec(&json!({
            "ok": false,
            "error": {"code": "NOT_FOUND", "message": "unknown symbol: XYZZY"}
        }))
        .unwrap();
        match decode_reply(&bytes) {
            Err(ClientError::NotFound(msg)) => assert!(msg.contains("XYZZY")),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_remote_error_verbatim() {
        let bytes = serde_json::to_vec(&json!({
            "ok": false,
            "error": {"code": "ERR_HISTORY_WILL_UPDATE", "message": "chart data is loading"}
        }))
        .unwrap();
        match decode_reply(&bytes) {
            Err(ClientError::Remote { code, message }) => {
                assert_eq!(code, "ERR_HISTORY_WILL_UPDATE");
                assert_eq!(message, "chart data is loading");
            }
            other => panic!("expected Remote, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_unknown_envelope_fields() {
        let bytes =
            serde_json::to_vec(&json!({"ok": true, "result": 1, "warning": "stale"})).unwrap();
        match decode_reply(&bytes) {
            Err(ClientError::MalformedReply(_)) => {}
            other => panic!("expected MalformedReply, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_truncated_frames() {
        let bytes = br#"{"ok": true, "res"#;
        match decode_reply(bytes) {
            Err(ClientError::MalformedReply(_)) => {}
            other => panic!("expected MalformedReply, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_mixed_shapes() {
        for raw in [
            json!({"ok": true}),
            json!({"ok": true, "result": 1, "error": {"code": "X", "message": "y"}}),
            json!({"ok": false}),
            json!({"ok": false, "result": 1, "error": {"code": "X", "message": "y"}}),
        ] {
            let bytes = serde_json::to_vec(&raw).unwrap();
            match decode_reply(&bytes) {
                Err(ClientError::MalformedReply(_)) => {}
                other => panic!("expected MalformedReply for {raw}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_frame_message_prefixes_length() {
        let framed = frame_message(b"abc");
        assert_eq!(framed, vec![0, 0, 0, 3, b'a', b'b', b'c']);
    }
}
