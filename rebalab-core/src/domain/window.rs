//! Observation window: the time-indexed table a strategy sees each step.
//!
//! Rows are ordered oldest → newest. Every non-fiat asset carries a bar and a
//! held quantity per row; the fiat (quote) asset carries only a balance.
//! Symbol order is fixed: assets in insertion order, fiat last.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::bar::Bar;
use crate::error::{DegenerateInputError, WindowError};

/// Price history and held quantity of one non-fiat asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSeries {
    pub symbol: String,
    pub bars: Vec<Bar>,
    /// Quantity of the asset held at each row.
    pub holdings: Vec<f64>,
}

/// Balance history of the fiat (quote) asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiatSeries {
    pub symbol: String,
    pub balance: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationWindow {
    timestamps: Vec<NaiveDateTime>,
    assets: Vec<AssetSeries>,
    fiat: FiatSeries,
}

impl ObservationWindow {
    pub fn new(
        timestamps: Vec<NaiveDateTime>,
        assets: Vec<AssetSeries>,
        fiat: FiatSeries,
    ) -> Result<Self, WindowError> {
        let rows = timestamps.len();
        if rows == 0 {
            return Err(WindowError::NoRows);
        }
        if assets.is_empty() {
            return Err(WindowError::NoAssets);
        }

        let mut seen = HashSet::new();
        for asset in &assets {
            if !seen.insert(asset.symbol.as_str()) || asset.symbol == fiat.symbol {
                return Err(WindowError::DuplicateSymbol(asset.symbol.clone()));
            }
            for len in [asset.bars.len(), asset.holdings.len()] {
                if len != rows {
                    return Err(WindowError::RaggedSeries {
                        symbol: asset.symbol.clone(),
                        expected: rows,
                        actual: len,
                    });
                }
            }
        }
        if fiat.balance.len() != rows {
            return Err(WindowError::RaggedSeries {
                symbol: fiat.symbol.clone(),
                expected: rows,
                actual: fiat.balance.len(),
            });
        }

        Ok(Self {
            timestamps,
            assets,
            fiat,
        })
    }

    /// Build a window from open prices only, holding `holdings` units of each
    /// asset and `fiat_balance` of fiat on every row.
    ///
    /// Timestamps are hourly from 2024-01-01. Bars are flat at the open price.
    pub fn from_opens(
        symbols: &[&str],
        fiat: &str,
        opens: &[Vec<f64>],
        holdings: &[f64],
        fiat_balance: f64,
    ) -> Result<Self, WindowError> {
        let rows = opens.first().map(|o| o.len()).unwrap_or(0);
        let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        let timestamps = (0..rows)
            .map(|i| base + chrono::Duration::hours(i as i64))
            .collect();

        let assets = symbols
            .iter()
            .zip(opens)
            .enumerate()
            .map(|(i, (symbol, series))| AssetSeries {
                symbol: symbol.to_string(),
                bars: series.iter().map(|&p| Bar::flat(p)).collect(),
                holdings: vec![holdings.get(i).copied().unwrap_or(0.0); series.len()],
            })
            .collect();

        Self::new(
            timestamps,
            assets,
            FiatSeries {
                symbol: fiat.to_string(),
                balance: vec![fiat_balance; rows],
            },
        )
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Number of non-fiat assets.
    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    /// Number of symbols including fiat.
    pub fn n_symbols(&self) -> usize {
        self.assets.len() + 1
    }

    pub fn assets(&self) -> &[AssetSeries] {
        &self.assets
    }

    pub fn fiat(&self) -> &FiatSeries {
        &self.fiat
    }

    pub fn fiat_symbol(&self) -> &str {
        &self.fiat.symbol
    }

    /// All symbols, assets first and fiat last.
    pub fn symbols(&self) -> Vec<&str> {
        self.assets
            .iter()
            .map(|a| a.symbol.as_str())
            .chain(std::iter::once(self.fiat.symbol.as_str()))
            .collect()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamps.last().copied()
    }

    /// Row index `back` rows before the last one (`back = 0` is the last row).
    pub fn row(&self, back: usize) -> Option<usize> {
        self.len().checked_sub(back + 1)
    }

    /// Open prices of asset `asset` across the whole window.
    pub fn opens(&self, asset: usize) -> Vec<f64> {
        self.assets[asset].bars.iter().map(|b| b.open).collect()
    }

    /// Open price of `asset` at `back` rows before the last one.
    pub fn open_at(&self, asset: usize, back: usize) -> Option<f64> {
        let row = self.row(back)?;
        self.assets.get(asset).map(|a| a.bars[row].open)
    }

    /// Fail unless the window has at least `required` rows.
    pub fn require_rows(&self, required: usize) -> Result<(), DegenerateInputError> {
        if self.is_empty() {
            return Err(DegenerateInputError::EmptyWindow);
        }
        if self.len() < required {
            return Err(DegenerateInputError::InsufficientHistory {
                required,
                available: self.len(),
            });
        }
        Ok(())
    }

    /// The last `rows` rows (or the whole window if shorter).
    pub fn tail(&self, rows: usize) -> Self {
        let start = self.len().saturating_sub(rows);
        Self {
            timestamps: self.timestamps[start..].to_vec(),
            assets: self
                .assets
                .iter()
                .map(|a| AssetSeries {
                    symbol: a.symbol.clone(),
                    bars: a.bars[start..].to_vec(),
                    holdings: a.holdings[start..].to_vec(),
                })
                .collect(),
            fiat: FiatSeries {
                symbol: self.fiat.symbol.clone(),
                balance: self.fiat.balance[start..].to_vec(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ObservationWindow {
        ObservationWindow::from_opens(
            &["BTC", "ETH"],
            "USDT",
            &[vec![10.0, 11.0, 12.0], vec![5.0, 4.0, 3.0]],
            &[1.0, 2.0],
            4.0,
        )
        .unwrap()
    }

    #[test]
    fn symbols_put_fiat_last() {
        let w = sample();
        assert_eq!(w.symbols(), vec!["BTC", "ETH", "USDT"]);
        assert_eq!(w.n_assets(), 2);
        assert_eq!(w.n_symbols(), 3);
    }

    #[test]
    fn open_at_counts_back_from_last_row() {
        let w = sample();
        assert_eq!(w.open_at(0, 0), Some(12.0));
        assert_eq!(w.open_at(1, 2), Some(5.0));
        assert_eq!(w.open_at(1, 3), None);
    }

    #[test]
    fn ragged_series_rejected() {
        let w = sample();
        let mut assets = w.assets().to_vec();
        assets[1].bars.pop();
        let err = ObservationWindow::new(w.timestamps().to_vec(), assets, w.fiat().clone())
            .unwrap_err();
        assert!(matches!(err, WindowError::RaggedSeries { .. }));
    }

    #[test]
    fn fiat_symbol_cannot_double_as_asset() {
        let err = ObservationWindow::from_opens(&["USDT"], "USDT", &[vec![1.0]], &[0.0], 1.0)
            .unwrap_err();
        assert_eq!(err, WindowError::DuplicateSymbol("USDT".into()));
    }

    #[test]
    fn empty_window_rejected() {
        let err =
            ObservationWindow::from_opens(&["BTC"], "USDT", &[vec![]], &[0.0], 1.0).unwrap_err();
        assert_eq!(err, WindowError::NoRows);
    }

    #[test]
    fn require_rows_reports_shortfall() {
        let w = sample();
        assert!(w.require_rows(3).is_ok());
        assert_eq!(
            w.require_rows(5),
            Err(DegenerateInputError::InsufficientHistory {
                required: 5,
                available: 3
            })
        );
    }

    #[test]
    fn tail_keeps_last_rows() {
        let w = sample().tail(2);
        assert_eq!(w.len(), 2);
        assert_eq!(w.opens(0), vec![11.0, 12.0]);
        assert_eq!(w.fiat().balance.len(), 2);
    }
}
