use crate::traits::ClientError;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// The kind of terminal account a record belongs to.
///
/// Carried on the wire as a bounded integer code; an unknown code is a
/// decode error, never a guessed variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum AccountTradeMode {
    Demo,
    Contest,
    Real,
}

impl TryFrom<i64> for AccountTradeMode {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(AccountTradeMode::Demo),
            1 => Ok(AccountTradeMode::Contest),
            2 => Ok(AccountTradeMode::Real),
            other => Err(format!("unknown account trade mode code: {other}")),
        }
    }
}

impl From<AccountTradeMode> for i64 {
    fn from(mode: AccountTradeMode) -> Self {
        match mode {
            AccountTradeMode::Demo => 0,
            AccountTradeMode::Contest => 1,
            AccountTradeMode::Real => 2,
        }
    }
}

/// How the terminal expresses the minimal allowed margin level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum StopoutMode {
    Percent,
    Money,
}

impl TryFrom<i64> for StopoutMode {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(StopoutMode::Percent),
            1 => Ok(StopoutMode::Money),
            other => Err(format!("unknown stopout mode code: {other}")),
        }
    }
}

impl From<StopoutMode> for i64 {
    fn from(mode: StopoutMode) -> Self {
        match mode {
            StopoutMode::Percent => 0,
            StopoutMode::Money => 1,
        }
    }
}

/// A terminal account snapshot.
///
/// Constructed fresh on every `account()` call; the bridge is the sole
/// source of truth and nothing here is cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Account {
    /// The account number.
    pub login: i64,
    pub trade_mode: AccountTradeMode,
    /// Client name.
    pub name: String,
    /// Trade server name.
    pub server: String,
    /// Deposit currency.
    pub currency: String,
    /// Name of the company that serves the account.
    pub company: String,
    pub leverage: i64,
    /// Maximum open positions and pending orders in total, 0 = unlimited.
    pub limit_orders: i64,
    pub margin_so_mode: StopoutMode,
    pub trade_allowed: bool,
    /// Whether automated trading is allowed for this account.
    pub trade_expert: bool,
    pub balance: f64,
    pub credit: f64,
    /// Current floating profit in the deposit currency.
    pub profit: f64,
    pub equity: f64,
    /// Margin currently in use, in the deposit currency.
    pub margin: f64,
    pub margin_free: f64,
    /// Margin level in percent.
    pub margin_level: f64,
    /// Margin call level, in percent or deposit currency per `margin_so_mode`.
    pub margin_so_call: f64,
    /// Stop out level, in percent or deposit currency per `margin_so_mode`.
    pub margin_so_so: f64,
}

// ---------------------------------------------------------------------------
// Symbols & Market Data
// ---------------------------------------------------------------------------

/// Market and trading parameters of one tradable instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SymbolInfo {
    /// Unique symbol name within the terminal.
    pub name: String,
    /// Smallest quote increment (e.g. 1e-05 for a 5-digit pair).
    pub point_size: f64,
    /// Quote precision in decimal digits.
    pub digits: u32,
    /// Contract size in base units per lot.
    pub lot_size: f64,
    /// Value of one tick per lot, in the deposit currency.
    pub tick_value: f64,
    /// Smallest quote movement used for tick valuation.
    pub tick_size: f64,
    pub min_lot: f64,
    /// Smallest allowed lot increment.
    pub lot_step: f64,
    pub max_lot: f64,
    /// Initial margin requirement per lot.
    pub margin_init: f64,
    /// Margin charged on open positions per lot.
    pub margin_maintenance: f64,
    /// Margin charged on hedged positions per lot.
    pub margin_hedged: f64,
    /// Free-margin requirement to open one lot.
    pub margin_required: f64,
    /// Distance from the market price, in points, inside which pending
    /// orders cannot be modified.
    pub freeze_level: f64,
}

impl SymbolInfo {
    /// Check the record's shape invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.point_size <= 0.0 {
            return Err(format!(
                "{}: point_size must be positive, got {}",
                self.name, self.point_size
            ));
        }
        if self.min_lot > self.max_lot {
            return Err(format!(
                "{}: min_lot {} exceeds max_lot {}",
                self.name, self.min_lot, self.max_lot
            ));
        }
        Ok(())
    }
}

/// The latest quote for a symbol at the moment of the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SymbolTick {
    /// Time of the last price update, epoch seconds.
    pub time: i64,
    pub bid: f64,
    pub ask: f64,
    /// Price of the last deal.
    pub last: f64,
    /// Volume for the current last price.
    pub volume: u64,
}

impl SymbolTick {
    /// Check the record's shape invariants. Zero bid or ask means the side
    /// has no quote, which is not a crossed market.
    pub fn validate(&self) -> Result<(), String> {
        if self.bid > 0.0 && self.ask > 0.0 && self.bid > self.ask {
            return Err(format!("crossed quote: bid {} > ask {}", self.bid, self.ask));
        }
        Ok(())
    }

    /// Quote time as UTC, if the epoch value is representable.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.time, 0).single()
    }
}

/// One OHLCV bar of a symbol's price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ohlcv {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub tick_volume: u64,
    /// Bar open time, epoch seconds.
    pub time: i64,
}

impl Ohlcv {
    /// Check the record's shape invariants.
    pub fn validate(&self) -> Result<(), String> {
        let body_low = self.open.min(self.close);
        let body_high = self.open.max(self.close);
        if self.low > body_low || body_high > self.high {
            return Err(format!(
                "bar at t={} violates low <= open,close <= high ({} {} {} {})",
                self.time, self.open, self.high, self.low, self.close
            ));
        }
        Ok(())
    }

    /// Bar open time as UTC, if the epoch value is representable.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.time, 0).single()
    }
}

// ---------------------------------------------------------------------------
// Timeframes
// ---------------------------------------------------------------------------

/// Chart bucket sizes the bridge accepts for price-history queries.
///
/// The M1..MN1 subset matches the terminal's online charts; the remaining
/// periods are the offline-chart buckets. The wire code is the period
/// length in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Timeframe {
    M1,
    M2,
    M3,
    M4,
    M5,
    M6,
    M10,
    M12,
    M15,
    M20,
    M30,
    H1,
    H2,
    H3,
    H4,
    H6,
    H8,
    H12,
    D1,
    W1,
    MN1,
}

impl Timeframe {
    /// Period length in minutes, the value sent on the wire.
    pub fn minutes(self) -> i64 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M2 => 2,
            Timeframe::M3 => 3,
            Timeframe::M4 => 4,
            Timeframe::M5 => 5,
            Timeframe::M6 => 6,
            Timeframe::M10 => 10,
            Timeframe::M12 => 12,
            Timeframe::M15 => 15,
            Timeframe::M20 => 20,
            Timeframe::M30 => 30,
            Timeframe::H1 => 60,
            Timeframe::H2 => 120,
            Timeframe::H3 => 180,
            Timeframe::H4 => 240,
            Timeframe::H6 => 360,
            Timeframe::H8 => 480,
            Timeframe::H12 => 720,
            Timeframe::D1 => 1440,
            Timeframe::W1 => 10080,
            Timeframe::MN1 => 43200,
        }
    }

    /// The timeframe for a period length in minutes, if one exists.
    pub fn from_minutes(minutes: i64) -> Option<Self> {
        let tf = match minutes {
            1 => Timeframe::M1,
            2 => Timeframe::M2,
            3 => Timeframe::M3,
            4 => Timeframe::M4,
            5 => Timeframe::M5,
            6 => Timeframe::M6,
            10 => Timeframe::M10,
            12 => Timeframe::M12,
            15 => Timeframe::M15,
            20 => Timeframe::M20,
            30 => Timeframe::M30,
            60 => Timeframe::H1,
            120 => Timeframe::H2,
            180 => Timeframe::H3,
            240 => Timeframe::H4,
            360 => Timeframe::H6,
            480 => Timeframe::H8,
            720 => Timeframe::H12,
            1440 => Timeframe::D1,
            10080 => Timeframe::W1,
            43200 => Timeframe::MN1,
            _ => return None,
        };
        Some(tf)
    }

    /// Whether this is one of the terminal's online-chart periods.
    pub fn is_standard(self) -> bool {
        matches!(
            self,
            Timeframe::M1
                | Timeframe::M5
                | Timeframe::M15
                | Timeframe::M30
                | Timeframe::H1
                | Timeframe::H4
                | Timeframe::D1
                | Timeframe::W1
                | Timeframe::MN1
        )
    }
}

impl TryFrom<i64> for Timeframe {
    type Error = String;

    fn try_from(minutes: i64) -> Result<Self, Self::Error> {
        Timeframe::from_minutes(minutes).ok_or_else(|| format!("unknown timeframe code: {minutes}"))
    }
}

impl From<Timeframe> for i64 {
    fn from(tf: Timeframe) -> Self {
        tf.minutes()
    }
}

impl FromStr for Timeframe {
    type Err = ClientError;

    /// Parse a timeframe string such as `"15m"`, `"4h"`, `"1d"`, `"1w"` or
    /// `"1mn"` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ClientError::InvalidArgument(format!("invalid timeframe: {s:?}"));
        let trimmed = s.trim();
        let digits_end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (count, unit) = trimmed.split_at(digits_end);
        let n: i64 = count.parse().map_err(|_| invalid())?;
        let minutes = match unit.to_ascii_lowercase().as_str() {
            "m" => n,
            "h" => n * 60,
            "d" => n * 1440,
            "w" => n * 10080,
            "mn" => n * 43200,
            _ => return Err(invalid()),
        };
        Timeframe::from_minutes(minutes).ok_or_else(invalid)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Timeframe::M1 => "1m",
            Timeframe::M2 => "2m",
            Timeframe::M3 => "3m",
            Timeframe::M4 => "4m",
            Timeframe::M5 => "5m",
            Timeframe::M6 => "6m",
            Timeframe::M10 => "10m",
            Timeframe::M12 => "12m",
            Timeframe::M15 => "15m",
            Timeframe::M20 => "20m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H2 => "2h",
            Timeframe::H3 => "3h",
            Timeframe::H4 => "4h",
            Timeframe::H6 => "6h",
            Timeframe::H8 => "8h",
            Timeframe::H12 => "12h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
            Timeframe::MN1 => "1mn",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Published metadata of a third-party trading signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Signal {
    pub author_login: String,
    /// Broker name (company).
    pub broker: String,
    pub broker_server: String,
    pub name: String,
    /// Signal base currency.
    pub currency: String,
    /// Date the signal became available for subscription, epoch seconds.
    pub date_published: i64,
    /// Monitoring start date, epoch seconds.
    pub date_started: i64,
    pub id: i64,
    pub leverage: i64,
    /// Profit in pips.
    pub pips: i64,
    /// Position in the signal rating.
    pub rating: i64,
    pub subscribers: i64,
    pub trades: i64,
    pub trade_mode: AccountTradeMode,
    pub balance: f64,
    pub equity: f64,
    pub gain: f64,
    pub max_drawdown: f64,
    /// Subscription price.
    pub price: f64,
    /// Return on investment, percent.
    pub roi: f64,
}

impl Signal {
    /// Publication date as UTC, if the epoch value is representable.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.date_published, 0).single()
    }

    /// Monitoring start date as UTC, if the epoch value is representable.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.date_started, 0).single()
    }
}

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

/// Result of a bridge-computed indicator call: a scalar for most indicator
/// functions, a short ordered series for multi-buffer indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndicatorResult {
    Scalar(f64),
    Series(Vec<f64>),
}

impl IndicatorResult {
    /// The scalar value, if the result is a single number.
    pub fn scalar(&self) -> Option<f64> {
        match self {
            IndicatorResult::Scalar(v) => Some(*v),
            IndicatorResult::Series(_) => None,
        }
    }

    /// All values in order; a scalar yields a one-element slice.
    pub fn values(&self) -> &[f64] {
        match self {
            IndicatorResult::Scalar(v) => std::slice::from_ref(v),
            IndicatorResult::Series(vs) => vs,
        }
    }
}
