//! Transport test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::io::{Error, ErrorKind};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use termbridge_core::{Transport, TransportError};

/// What the mock should do on the next `receive` call.
pub enum ScriptedReply {
    Reply(Vec<u8>),
    TimeOut,
    Hangup,
}

#[derive(Default)]
pub struct MockState {
    pub sent: Vec<Vec<u8>>,
    pub replies: VecDeque<ScriptedReply>,
    pub connect_calls: usize,
    pub receive_calls: usize,
    pub closed: bool,
}

/// In-memory transport that records sends and plays back scripted replies.
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> (Self, Arc<Mutex<MockState>>) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: state.clone(),
            },
            state,
        )
    }
}

/// Queue a JSON reply frame onto a mock's script.
pub fn push_json_reply(state: &Arc<Mutex<MockState>>, value: serde_json::Value) {
    let bytes = serde_json::to_vec(&value).expect("serialize scripted reply");
    state
        .lock()
        .unwrap()
        .replies
        .push_back(ScriptedReply::Reply(bytes));
}

impl Transport for MockTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        self.state.lock().unwrap().connect_calls += 1;
        Ok(())
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        self.state.lock().unwrap().sent.push(payload.to_vec());
        Ok(())
    }

    fn receive(&mut self, _timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.receive_calls += 1;
        match state.replies.pop_front() {
            Some(ScriptedReply::Reply(bytes)) => Ok(bytes),
            Some(ScriptedReply::TimeOut) | None => Err(TransportError::TimedOut),
            Some(ScriptedReply::Hangup) => Err(TransportError::Io(Error::new(
                ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))),
        }
    }

    fn close(&mut self) {
        self.state.lock().unwrap().closed = true;
    }
}
