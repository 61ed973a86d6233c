//! Client library for querying a running trading terminal through a
//! message-passing bridge.
//!
//! A [`BridgeClient`] speaks a strict request/reply protocol: each logical
//! query is encoded into one positional-argument command, correlated with
//! exactly one reply, and decoded into a typed domain record. The caller
//! never sees the wire format.
//!
//! ```no_run
//! use termbridge_client::{BridgeClient, BridgeConfig, Timeframe};
//!
//! fn main() -> Result<(), termbridge_client::ClientError> {
//!     let client = BridgeClient::new(BridgeConfig::default());
//!     client.connect()?;
//!
//!     let account = client.account()?;
//!     println!("balance: {} {}", account.balance, account.currency);
//!
//!     let symbol = client.symbol("EURUSD")?;
//!     let bars = symbol.ohlcv(Timeframe::H1, Some(100))?;
//!     println!("{} bars, last close {}", bars.len(), bars[bars.len() - 1].close);
//!
//!     client.close();
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod dispatcher;
pub mod protocol;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::{BridgeClient, BridgeConfig, Symbol, DEFAULT_OHLCV_COUNT};
pub use protocol::ArgValue;
pub use transport::TcpTransport;

// Re-export the domain surface so callers need only this crate.
pub use termbridge_core::{
    Account, AccountTradeMode, ClientError, IndicatorResult, Ohlcv, Signal, StopoutMode,
    SymbolInfo, SymbolTick, Timeframe, Transport, TransportError,
};
