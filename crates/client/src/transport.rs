//! Blocking TCP transport speaking 4-byte length-prefixed frames.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use termbridge_core::{Transport, TransportError};
use tracing::info;

use crate::protocol::{frame_message, MAX_FRAME_LEN};

/// TCP implementation of the bridge transport.
///
/// One stream, one outstanding request. The read timeout applies per read;
/// the dispatcher tears the connection down on expiry, so a partially read
/// frame never leaks into the next call.
pub struct TcpTransport {
    addr: String,
    connect_timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(host: &str, port: u16, connect_timeout: Duration) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            connect_timeout,
            stream: None,
        }
    }

    fn stream(&mut self) -> Result<&mut TcpStream, TransportError> {
        self.stream
            .as_mut()
            .ok_or_else(|| TransportError::Connect("transport is closed".to_string()))
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        let addrs: Vec<SocketAddr> = self
            .addr
            .to_socket_addrs()
            .map_err(|e| TransportError::Connect(format!("resolve {}: {e}", self.addr)))?
            .collect();

        let mut last_err = None;
        for addr in &addrs {
            match TcpStream::connect_timeout(addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    info!("connected to bridge at {addr}");
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(TransportError::Connect(match last_err {
            Some(e) => format!("{}: {e}", self.addr),
            None => format!("{}: no addresses resolved", self.addr),
        }))
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let framed = frame_message(payload);
        self.stream()?.write_all(&framed)?;
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let stream = self.stream()?;
        stream.set_read_timeout(Some(timeout))?;

        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).map_err(map_read_err)?;
        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_FRAME_LEN {
            return Err(TransportError::FrameTooLarge(len));
        }

        let mut body = vec![0u8; len];
        stream.read_exact(&mut body).map_err(map_read_err)?;
        Ok(body)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            info!("disconnected from bridge at {}", self.addr);
        }
    }
}

fn map_read_err(e: std::io::Error) -> TransportError {
    match e.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => TransportError::TimedOut,
        _ => TransportError::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    /// Bind a listener and run `server` against the first accepted stream.
    fn serve_once(
        server: impl FnOnce(TcpStream) + Send + 'static,
    ) -> (u16, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fixture listener");
        let port = listener.local_addr().expect("local addr").port();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            server(stream);
        });
        (port, handle)
    }

    #[test]
    fn test_send_and_receive_round_trip() {
        let (port, handle) = serve_once(|mut stream| {
            let mut len_buf = [0u8; 4];
            stream.read_exact(&mut len_buf).unwrap();
            let mut body = vec![0u8; u32::from_be_bytes(len_buf) as usize];
            stream.read_exact(&mut body).unwrap();
            assert_eq!(body, b"ping");
            stream.write_all(&frame_message(b"pong")).unwrap();
        });

        let mut transport = TcpTransport::new("127.0.0.1", port, Duration::from_secs(1));
        transport.connect().unwrap();
        transport.send(b"ping").unwrap();
        let reply = transport.receive(Duration::from_secs(1)).unwrap();
        assert_eq!(reply, b"pong");
        transport.close();
        handle.join().unwrap();
    }

    #[test]
    fn test_receive_times_out_without_reply() {
        let (port, handle) = serve_once(|stream| {
            // Hold the connection open without replying.
            thread::sleep(Duration::from_millis(300));
            drop(stream);
        });

        let mut transport = TcpTransport::new("127.0.0.1", port, Duration::from_secs(1));
        transport.connect().unwrap();
        match transport.receive(Duration::from_millis(50)) {
            Err(TransportError::TimedOut) => {}
            other => panic!("expected TimedOut, got {other:?}"),
        }
        transport.close();
        handle.join().unwrap();
    }

    #[test]
    fn test_receive_rejects_oversized_frames() {
        let (port, handle) = serve_once(|mut stream| {
            let len = (MAX_FRAME_LEN as u32) + 1;
            stream.write_all(&len.to_be_bytes()).unwrap();
        });

        let mut transport = TcpTransport::new("127.0.0.1", port, Duration::from_secs(1));
        transport.connect().unwrap();
        match transport.receive(Duration::from_secs(1)) {
            Err(TransportError::FrameTooLarge(len)) => assert_eq!(len, MAX_FRAME_LEN + 1),
            other => panic!("expected FrameTooLarge, got {other:?}"),
        }
        transport.close();
        handle.join().unwrap();
    }

    #[test]
    fn test_send_before_connect_fails() {
        let mut transport = TcpTransport::new("127.0.0.1", 1, Duration::from_millis(50));
        match transport.send(b"ping") {
            Err(TransportError::Connect(_)) => {}
            other => panic!("expected Connect error, got {other:?}"),
        }
    }
}
