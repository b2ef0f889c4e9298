//! Price history loading for the replay environment.
//!
//! Two sources:
//! 1. A long-format CSV (`timestamp,symbol,open,high,low,close,volume`),
//!    aligned to the timestamps every symbol shares
//! 2. A synthetic generator with a planted per-asset linear drift in log
//!    price plus stationary noise
//!
//! Every history carries a BLAKE3 dataset hash for run fingerprinting.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use rebalab_core::domain::Bar;
use rebalab_core::rng::RngHierarchy;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("unparseable timestamp '{0}'")]
    BadTimestamp(String),

    #[error("invalid open price for '{symbol}' at {timestamp}")]
    InvalidPrice {
        symbol: String,
        timestamp: NaiveDateTime,
    },

    #[error("history has no rows shared by every symbol")]
    NoRows,

    #[error("history has no non-fiat symbols")]
    NoAssets,

    #[error("series for '{symbol}' has {actual} rows, expected {expected}")]
    Ragged {
        symbol: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid synthetic spec: {0}")]
    InvalidSynthetic(String),
}

// ─── MarketHistory ───────────────────────────────────────────────────

/// Aligned OHLCV history for a set of assets quoted in one fiat symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketHistory {
    fiat: String,
    symbols: Vec<String>,
    timestamps: Vec<NaiveDateTime>,
    /// `bars[asset][row]`
    bars: Vec<Vec<Bar>>,
    dataset_hash: String,
}

impl MarketHistory {
    pub fn new(
        fiat: &str,
        symbols: Vec<String>,
        timestamps: Vec<NaiveDateTime>,
        bars: Vec<Vec<Bar>>,
    ) -> Result<Self, LoadError> {
        if symbols.is_empty() {
            return Err(LoadError::NoAssets);
        }
        if timestamps.is_empty() {
            return Err(LoadError::NoRows);
        }
        if bars.len() != symbols.len() {
            return Err(LoadError::Ragged {
                symbol: fiat.to_string(),
                expected: symbols.len(),
                actual: bars.len(),
            });
        }
        for (symbol, series) in symbols.iter().zip(&bars) {
            if series.len() != timestamps.len() {
                return Err(LoadError::Ragged {
                    symbol: symbol.clone(),
                    expected: timestamps.len(),
                    actual: series.len(),
                });
            }
            for (bar, ts) in series.iter().zip(&timestamps) {
                if !bar.open.is_finite() || bar.open <= 0.0 {
                    return Err(LoadError::InvalidPrice {
                        symbol: symbol.clone(),
                        timestamp: *ts,
                    });
                }
            }
        }

        let dataset_hash = compute_dataset_hash(&symbols, &timestamps, &bars);
        Ok(Self {
            fiat: fiat.to_string(),
            symbols,
            timestamps,
            bars,
            dataset_hash,
        })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn n_assets(&self) -> usize {
        self.symbols.len()
    }

    pub fn fiat(&self) -> &str {
        &self.fiat
    }

    /// Non-fiat symbols in column order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn bars(&self, asset: usize) -> &[Bar] {
        &self.bars[asset]
    }

    pub fn open(&self, asset: usize, row: usize) -> f64 {
        self.bars[asset][row].open
    }

    /// Open prices of every asset at `row`.
    pub fn opens_at(&self, row: usize) -> Vec<f64> {
        self.bars.iter().map(|series| series[row].open).collect()
    }

    pub fn dataset_hash(&self) -> &str {
        &self.dataset_hash
    }
}

/// BLAKE3 over symbols, timestamps and every OHLCV value, in column order.
fn compute_dataset_hash(
    symbols: &[String],
    timestamps: &[NaiveDateTime],
    bars: &[Vec<Bar>],
) -> String {
    let mut hasher = blake3::Hasher::new();
    for ts in timestamps {
        hasher.update(&ts.and_utc().timestamp().to_le_bytes());
    }
    for (symbol, series) in symbols.iter().zip(bars) {
        hasher.update(symbol.as_bytes());
        for bar in series {
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

// ─── CSV ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    timestamp: String,
    symbol: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD` or unix seconds.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, LoadError> {
    let s = raw.trim();
    for fmt in [TIMESTAMP_FORMAT, "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts);
        }
    }
    if let Some(ts) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(ts);
    }
    s.parse::<i64>()
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| LoadError::BadTimestamp(raw.to_string()))
}

/// Load a long-format CSV.
///
/// Symbols keep their order of first appearance. Rows quoted in `fiat`
/// are ignored. Timestamps missing for any symbol are dropped.
pub fn load_csv(path: &Path, fiat: &str) -> Result<MarketHistory, LoadError> {
    let mut reader = csv::Reader::from_path(path)?;

    let mut symbols: Vec<String> = Vec::new();
    let mut rows: BTreeMap<NaiveDateTime, HashMap<String, Bar>> = BTreeMap::new();

    for record in reader.deserialize() {
        let row: CsvRow = record?;
        if row.symbol == fiat {
            continue;
        }
        let ts = parse_timestamp(&row.timestamp)?;
        if !symbols.contains(&row.symbol) {
            symbols.push(row.symbol.clone());
        }
        rows.entry(ts).or_default().insert(
            row.symbol,
            Bar {
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            },
        );
    }

    if symbols.is_empty() {
        return Err(LoadError::NoAssets);
    }

    let total = rows.len();
    let mut timestamps = Vec::with_capacity(total);
    let mut bars: Vec<Vec<Bar>> = vec![Vec::with_capacity(total); symbols.len()];
    for (ts, by_symbol) in rows {
        if by_symbol.len() < symbols.len() {
            continue;
        }
        timestamps.push(ts);
        for (series, symbol) in bars.iter_mut().zip(&symbols) {
            if let Some(bar) = by_symbol.get(symbol) {
                series.push(*bar);
            }
        }
    }

    let dropped = total - timestamps.len();
    if dropped > 0 {
        warn!(dropped, total, "dropped timestamps missing from some symbols");
    }
    debug!(
        path = %path.display(),
        symbols = symbols.len(),
        rows = timestamps.len(),
        "loaded price history"
    );

    MarketHistory::new(fiat, symbols, timestamps, bars)
}

/// Write a history back out in the long CSV format `load_csv` reads.
pub fn write_csv(history: &MarketHistory, path: &Path) -> Result<(), LoadError> {
    let mut writer = csv::Writer::from_path(path)?;
    for (row, ts) in history.timestamps().iter().enumerate() {
        for (asset, symbol) in history.symbols().iter().enumerate() {
            let bar = history.bars(asset)[row];
            writer.serialize(CsvRow {
                timestamp: ts.format(TIMESTAMP_FORMAT).to_string(),
                symbol: symbol.clone(),
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

// ─── Synthetic ───────────────────────────────────────────────────────

fn default_volatility() -> f64 {
    0.02
}

fn default_start_price() -> f64 {
    100.0
}

/// Synthetic history: `ln p_t = ln p_0 + drift · t + volatility · u_t`,
/// `u_t` uniform on `[-1, 1]` and independent across rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSpec {
    pub assets: Vec<String>,
    pub rows: usize,
    #[serde(default)]
    pub seed: u64,
    /// Per-asset log drift per row. Empty means no drift.
    #[serde(default)]
    pub drift: Vec<f64>,
    #[serde(default = "default_volatility")]
    pub volatility: f64,
    #[serde(default = "default_start_price")]
    pub start_price: f64,
}

impl SyntheticSpec {
    pub fn new(assets: &[&str], rows: usize, seed: u64) -> Self {
        Self {
            assets: assets.iter().map(|s| s.to_string()).collect(),
            rows,
            seed,
            drift: Vec::new(),
            volatility: default_volatility(),
            start_price: default_start_price(),
        }
    }

    pub fn with_drift(mut self, drift: &[f64]) -> Self {
        self.drift = drift.to_vec();
        self
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }
}

pub fn generate_synthetic(spec: &SyntheticSpec, fiat: &str) -> Result<MarketHistory, LoadError> {
    if spec.rows < 2 {
        return Err(LoadError::InvalidSynthetic(format!(
            "need at least 2 rows, got {}",
            spec.rows
        )));
    }
    if !spec.drift.is_empty() && spec.drift.len() != spec.assets.len() {
        return Err(LoadError::InvalidSynthetic(format!(
            "{} drift values for {} assets",
            spec.drift.len(),
            spec.assets.len()
        )));
    }
    if spec.volatility.is_nan()
        || spec.volatility < 0.0
        || spec.start_price.is_nan()
        || spec.start_price <= 0.0
    {
        return Err(LoadError::InvalidSynthetic(
            "volatility must be >= 0 and start_price > 0".into(),
        ));
    }

    let base = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    let timestamps: Vec<NaiveDateTime> = (0..spec.rows)
        .map(|i| base + chrono::Duration::hours(i as i64))
        .collect();

    let rng_hierarchy = RngHierarchy::new(spec.seed);
    let log_start = spec.start_price.ln();
    let bars: Vec<Vec<Bar>> = spec
        .assets
        .iter()
        .enumerate()
        .map(|(i, symbol)| {
            let drift = spec.drift.get(i).copied().unwrap_or(0.0);
            let mut rng = rng_hierarchy.rng_for("synthetic", symbol, 0);
            let opens: Vec<f64> = (0..spec.rows)
                .map(|t| {
                    let noise: f64 = rng.gen_range(-1.0..=1.0);
                    (log_start + drift * t as f64 + spec.volatility * noise).exp()
                })
                .collect();
            opens
                .iter()
                .enumerate()
                .map(|(t, &open)| {
                    let close = opens.get(t + 1).copied().unwrap_or(open);
                    Bar {
                        open,
                        high: open.max(close) * 1.002,
                        low: open.min(close) * 0.998,
                        close,
                        volume: rng.gen_range(1_000.0..10_000.0),
                    }
                })
                .collect::<Vec<Bar>>()
        })
        .collect();

    MarketHistory::new(fiat, spec.assets.clone(), timestamps, bars)
}
