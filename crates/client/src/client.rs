//! `BridgeClient`, the typed query surface over the bridge.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use termbridge_core::{
    Account, ClientError, IndicatorResult, Ohlcv, Signal, SymbolInfo, SymbolTick, Timeframe,
    Transport,
};

use crate::dispatcher::Dispatcher;
use crate::protocol::ArgValue;
use crate::transport::TcpTransport;

/// Bars returned by `ohlcv` when no count is given.
pub const DEFAULT_OHLCV_COUNT: usize = 100;

/// Connection parameters for a bridge client.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Host running the terminal bridge.
    pub host: String,
    /// Port the bridge listens on.
    pub port: u16,
    /// How long a call waits for its reply before failing with `Timeout`.
    pub response_timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Log request/reply payloads at trace level. Diagnostic only, no
    /// protocol effect.
    pub verbose: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 28282,
            response_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            verbose: false,
        }
    }
}

/// Client interface for a trading-terminal bridge.
///
/// Each method builds one command, dispatches it, and decodes the reply into
/// a domain record. Calls are synchronous: the calling thread blocks until
/// the reply arrives or the response timeout elapses, and at most one
/// request is outstanding per connection. Concurrent callers serialize on an
/// internal lock; use one client per caller for parallel querying.
pub struct BridgeClient {
    inner: Mutex<Dispatcher>,
}

impl BridgeClient {
    /// Create a client over the default TCP transport. No connection is
    /// made until [`connect`](Self::connect).
    pub fn new(config: BridgeConfig) -> Self {
        let transport = TcpTransport::new(&config.host, config.port, config.connect_timeout);
        Self::with_transport(config, Box::new(transport))
    }

    /// Create a client over a caller-supplied transport.
    pub fn with_transport(config: BridgeConfig, transport: Box<dyn Transport>) -> Self {
        Self {
            inner: Mutex::new(Dispatcher::new(
                transport,
                config.response_timeout,
                config.verbose,
            )),
        }
    }

    /// Establish the bridge connection. Must succeed before any query.
    pub fn connect(&self) -> Result<(), ClientError> {
        self.dispatcher().connect()
    }

    /// Release the connection. Every `Symbol` handle obtained from this
    /// client fails with `NotConnected` afterwards.
    pub fn close(&self) {
        self.dispatcher().close()
    }

    pub fn is_connected(&self) -> bool {
        self.dispatcher().is_connected()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Fetch the terminal's account record.
    pub fn account(&self) -> Result<Account, ClientError> {
        into_record(self.call("GET_ACCOUNT", &[])?)
    }

    /// List the market symbols the broker supports.
    pub fn symbol_names(&self) -> Result<Vec<String>, ClientError> {
        into_record(self.call("GET_SYMBOL_NAMES", &[])?)
    }

    /// Look up one symbol by name. An unknown name is `NotFound`, never a
    /// defaulted record.
    pub fn symbol(&self, name: &str) -> Result<Symbol<'_>, ClientError> {
        let info: SymbolInfo = into_record(self.call("GET_SYMBOL", &[name.into()])?)?;
        info.validate().map_err(ClientError::MalformedReply)?;
        Ok(Symbol { client: self, info })
    }

    /// Fetch the full symbol record set, keyed by name. Derived from
    /// `symbol_names` plus one lookup per name; iteration order is not
    /// significant.
    pub fn symbols(&self) -> Result<HashMap<String, Symbol<'_>>, ClientError> {
        let names = self.symbol_names()?;
        let mut out = HashMap::with_capacity(names.len());
        for name in names {
            let symbol = self.symbol(&name)?;
            out.insert(name, symbol);
        }
        Ok(out)
    }

    /// List the published trading-signal names.
    pub fn signal_names(&self) -> Result<Vec<String>, ClientError> {
        into_record(self.call("GET_SIGNAL_NAMES", &[])?)
    }

    /// Look up one trading signal by name.
    pub fn signal(&self, name: &str) -> Result<Signal, ClientError> {
        into_record(self.call("GET_SIGNAL", &[name.into()])?)
    }

    /// Fetch all trading signals, keyed by name. Derived from
    /// `signal_names` plus one lookup per name.
    pub fn signals(&self) -> Result<HashMap<String, Signal>, ClientError> {
        let names = self.signal_names()?;
        let mut out = HashMap::with_capacity(names.len());
        for name in names {
            let signal = self.signal(&name)?;
            out.insert(name, signal);
        }
        Ok(out)
    }

    /// Fetch the latest quote for a symbol.
    pub fn tick(&self, symbol: &str) -> Result<SymbolTick, ClientError> {
        let tick: SymbolTick = into_record(self.call("GET_TICK", &[symbol.into()])?)?;
        tick.validate().map_err(ClientError::MalformedReply)?;
        Ok(tick)
    }

    /// Fetch price history for a symbol, oldest bar first.
    ///
    /// `count` defaults to [`DEFAULT_OHLCV_COUNT`]; zero is rejected before
    /// dispatch. Bars are checked for shape and chronological order, so a
    /// malformed series surfaces as `MalformedReply` rather than a partial
    /// result.
    pub fn ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: Option<usize>,
    ) -> Result<Vec<Ohlcv>, ClientError> {
        let count = count.unwrap_or(DEFAULT_OHLCV_COUNT);
        if count == 0 {
            return Err(ClientError::InvalidArgument(
                "ohlcv count must be positive".to_string(),
            ));
        }
        let bars: Vec<Ohlcv> = into_record(self.call(
            "GET_OHLCV",
            &[symbol.into(), timeframe.into(), ArgValue::Int(count as i64)],
        )?)?;

        let mut prev_time = i64::MIN;
        for bar in &bars {
            bar.validate().map_err(ClientError::MalformedReply)?;
            if bar.time < prev_time {
                return Err(ClientError::MalformedReply(format!(
                    "bars out of chronological order at t={}",
                    bar.time
                )));
            }
            prev_time = bar.time;
        }
        Ok(bars)
    }

    /// Fetch one of the terminal's market-info values for a symbol, e.g.
    /// `"MODE_SPREAD"`.
    pub fn market_info(&self, symbol: &str, mode: &str) -> Result<f64, ClientError> {
        into_record(self.call("GET_MARKET_INFO", &[symbol.into(), mode.into()])?)
    }

    /// Run a terminal indicator function by name, e.g.
    /// `indicator("iAC", &["EURUSD".into(), 60.into(), 1.into()])`.
    ///
    /// Argument arity and types are indicator-specific and validated only by
    /// the bridge; a bridge-side computation failure surfaces as `Remote`
    /// with the bridge's code and message.
    pub fn indicator(&self, func: &str, args: &[ArgValue]) -> Result<IndicatorResult, ClientError> {
        if func.is_empty() {
            return Err(ClientError::InvalidArgument(
                "indicator name is empty".to_string(),
            ));
        }
        let mut call_args = Vec::with_capacity(args.len() + 1);
        call_args.push(func.into());
        call_args.extend(args.iter().cloned());
        into_record(self.call("RUN_INDICATOR", &call_args)?)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn call(&self, command: &str, args: &[ArgValue]) -> Result<Value, ClientError> {
        self.dispatcher().call(command, args)
    }

    fn dispatcher(&self) -> MutexGuard<'_, Dispatcher> {
        // A poisoned lock only means another caller panicked mid-call; the
        // dispatcher state itself stays coherent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeClient")
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// A tradable instrument plus a capability handle to its owning client.
///
/// Scoped queries go through that client, so a `Symbol` cannot outlive it
/// and fails with `NotConnected` once the client is closed.
pub struct Symbol<'c> {
    client: &'c BridgeClient,
    info: SymbolInfo,
}

impl Symbol<'_> {
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// The full symbol record.
    pub fn info(&self) -> &SymbolInfo {
        &self.info
    }

    /// Detach the record from the client handle.
    pub fn into_info(self) -> SymbolInfo {
        self.info
    }

    /// Latest quote for this symbol.
    pub fn tick(&self) -> Result<SymbolTick, ClientError> {
        self.client.tick(&self.info.name)
    }

    /// Price history for this symbol, oldest bar first.
    pub fn ohlcv(&self, timeframe: Timeframe, count: Option<usize>) -> Result<Vec<Ohlcv>, ClientError> {
        self.client.ohlcv(&self.info.name, timeframe, count)
    }

    /// Market-info value for this symbol, e.g. `"MODE_SPREAD"`.
    pub fn market_info(&self, mode: &str) -> Result<f64, ClientError> {
        self.client.market_info(&self.info.name, mode)
    }
}

impl fmt::Debug for Symbol<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Symbol").field("info", &self.info).finish()
    }
}

fn into_record<T: DeserializeOwned>(value: Value) -> Result<T, ClientError> {
    serde_json::from_value(value).map_err(|e| ClientError::MalformedReply(e.to_string()))
}
