//! Core data model: per-ticker price series and the wide-format price table
//!
//! A `PriceTable` holds one row per calendar date and one nullable column per
//! ticker. Dates are unique and ascending by construction (`BTreeMap` keys);
//! gaps in a ticker's trading history are absent cells, never zeros.

use chrono::NaiveDate;
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};

/// A single observed closing price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Ticker -> weight in percent (0-100). Need not sum to 100 at the API
/// boundary; consumers renormalize over whichever tickers are usable.
pub type AllocationMap = HashMap<String, f64>;

/// Date-ordered simple daily returns (`p[t]/p[t-1] - 1`)
pub type DailyReturnSeries = Vec<(NaiveDate, f64)>;

/// Derive simple daily returns from a price series. The first date has no
/// defined return and is excluded, not zero-filled.
pub fn daily_returns(prices: &[PricePoint]) -> DailyReturnSeries {
    prices
        .iter()
        .tuple_windows()
        .map(|(prev, cur)| (cur.date, cur.close / prev.close - 1.0))
        .collect()
}

/// Wide-format price table: rows keyed by date, one `Option<f64>` cell per
/// ticker column, aligned to `tickers` order.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    tickers: Vec<String>,
    rows: BTreeMap<NaiveDate, Vec<Option<f64>>>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table by outer-joining per-ticker series on date. Column order
    /// follows the order of `columns`.
    pub fn from_series(columns: Vec<(String, Vec<PricePoint>)>) -> Self {
        let mut table = Self::new();
        for (ticker, series) in columns {
            let idx = table.ensure_column(&ticker);
            for point in series {
                let width = table.tickers.len();
                let row = table
                    .rows
                    .entry(point.date)
                    .or_insert_with(|| vec![None; width]);
                row[idx] = Some(point.close);
            }
        }
        table
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of date rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Rows in ascending date order
    pub fn rows(&self) -> impl Iterator<Item = (NaiveDate, &[Option<f64>])> + '_ {
        self.rows.iter().map(|(date, cells)| (*date, cells.as_slice()))
    }

    fn column_index(&self, ticker: &str) -> Option<usize> {
        self.tickers.iter().position(|t| t == ticker)
    }

    /// Add a column if absent, padding existing rows with missing cells.
    /// Returns the column index.
    pub fn ensure_column(&mut self, ticker: &str) -> usize {
        if let Some(idx) = self.column_index(ticker) {
            return idx;
        }
        self.tickers.push(ticker.to_string());
        for cells in self.rows.values_mut() {
            cells.push(None);
        }
        self.tickers.len() - 1
    }

    pub fn get(&self, date: NaiveDate, ticker: &str) -> Option<f64> {
        let idx = self.column_index(ticker)?;
        self.rows.get(&date).and_then(|cells| cells[idx])
    }

    /// Set a cell unconditionally, growing the column set as needed
    pub fn set(&mut self, date: NaiveDate, ticker: &str, value: f64) {
        let idx = self.ensure_column(ticker);
        let width = self.tickers.len();
        let row = self.rows.entry(date).or_insert_with(|| vec![None; width]);
        row[idx] = Some(value);
    }

    /// Fill-only-missing merge: cells already present in `self` are never
    /// overwritten; incoming data only populates previously-absent cells.
    /// Guards recorded history against a narrower re-fetch.
    pub fn merge_fill_missing(&mut self, incoming: &PriceTable) {
        for (date, cells) in incoming.rows() {
            for (idx, cell) in cells.iter().enumerate() {
                if let Some(value) = cell {
                    let ticker = incoming.tickers[idx].clone();
                    let own_idx = self.ensure_column(&ticker);
                    let width = self.tickers.len();
                    let row = self.rows.entry(date).or_insert_with(|| vec![None; width]);
                    if row[own_idx].is_none() {
                        row[own_idx] = Some(*value);
                    }
                }
            }
        }
    }

    /// Rebuild the column set to exactly `order`: columns not listed are
    /// dropped, listed columns with no data become all-missing. Keeps column
    /// order stable across updates where some tickers had nothing new.
    pub fn reindex_columns(&mut self, order: &[&str]) {
        let mapping: Vec<Option<usize>> =
            order.iter().map(|t| self.column_index(t)).collect();
        for cells in self.rows.values_mut() {
            let old = std::mem::take(cells);
            *cells = mapping
                .iter()
                .map(|m| m.and_then(|idx| old[idx]))
                .collect();
        }
        self.tickers = order.iter().map(|t| t.to_string()).collect();
    }

    /// Restrict to the given columns, dropping any row with a missing cell in
    /// one of them. Rows emerge sorted ascending by date.
    pub fn select(&self, tickers: &[&str]) -> PriceTable {
        let mut out = PriceTable::new();
        for ticker in tickers {
            out.ensure_column(ticker);
        }
        let indices: Vec<Option<usize>> =
            tickers.iter().map(|t| self.column_index(t)).collect();
        for (date, cells) in self.rows() {
            let values: Option<Vec<f64>> = indices
                .iter()
                .map(|m| m.and_then(|idx| cells[idx]))
                .collect();
            if let Some(values) = values {
                out.rows
                    .insert(date, values.into_iter().map(Some).collect());
            }
        }
        out
    }

    /// Latest date with a non-missing value for `ticker`, or the latest date
    /// overall when no ticker is given. `None` for an empty table or an
    /// unknown/entirely-missing column.
    pub fn last_date(&self, ticker: Option<&str>) -> Option<NaiveDate> {
        match ticker {
            None => self.rows.keys().next_back().copied(),
            Some(t) => {
                let idx = self.column_index(t)?;
                self.rows
                    .iter()
                    .rev()
                    .find(|(_, cells)| cells[idx].is_some())
                    .map(|(date, _)| *date)
            }
        }
    }

    /// Earliest date with a non-missing value for `ticker` (first trade on
    /// record), used for "since" annotations in fund tables.
    pub fn first_date(&self, ticker: &str) -> Option<NaiveDate> {
        let idx = self.column_index(ticker)?;
        self.rows
            .iter()
            .find(|(_, cells)| cells[idx].is_some())
            .map(|(date, _)| *date)
    }

    /// A single ticker's series with missing cells dropped
    pub fn column_series(&self, ticker: &str) -> Vec<PricePoint> {
        let Some(idx) = self.column_index(ticker) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|(date, cells)| {
                cells[idx].map(|close| PricePoint {
                    date: *date,
                    close,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn point(y: i32, m: u32, d: u32, close: f64) -> PricePoint {
        PricePoint {
            date: date(y, m, d),
            close,
        }
    }

    #[test]
    fn test_daily_returns_drop_first_date() {
        let prices = vec![
            point(2024, 1, 2, 100.0),
            point(2024, 1, 3, 101.0),
            point(2024, 1, 4, 99.99),
        ];
        let returns = daily_returns(&prices);
        assert_eq!(returns.len(), 2);
        assert_eq!(returns[0].0, date(2024, 1, 3));
        assert!((returns[0].1 - 0.01).abs() < 1e-12);
        assert!((returns[1].1 - (99.99 / 101.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_from_series_outer_joins_on_date() {
        let table = PriceTable::from_series(vec![
            (
                "VTI".to_string(),
                vec![point(2024, 1, 2, 100.0), point(2024, 1, 3, 101.0)],
            ),
            (
                "BND".to_string(),
                vec![point(2024, 1, 3, 70.0), point(2024, 1, 4, 70.5)],
            ),
        ]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.tickers(), &["VTI".to_string(), "BND".to_string()]);
        assert_eq!(table.get(date(2024, 1, 2), "VTI"), Some(100.0));
        assert_eq!(table.get(date(2024, 1, 2), "BND"), None);
        assert_eq!(table.get(date(2024, 1, 4), "BND"), Some(70.5));
    }

    #[test]
    fn test_merge_never_overwrites_existing_cells() {
        let mut table = PriceTable::new();
        table.set(date(2024, 1, 2), "VTI", 100.0);

        let mut incoming = PriceTable::new();
        incoming.set(date(2024, 1, 2), "VTI", 999.0); // overlapping cell
        incoming.set(date(2024, 1, 3), "VTI", 101.0); // new row
        incoming.set(date(2024, 1, 2), "BND", 70.0); // new column

        table.merge_fill_missing(&incoming);
        assert_eq!(table.get(date(2024, 1, 2), "VTI"), Some(100.0));
        assert_eq!(table.get(date(2024, 1, 3), "VTI"), Some(101.0));
        assert_eq!(table.get(date(2024, 1, 2), "BND"), Some(70.0));
    }

    #[test]
    fn test_reindex_columns_is_stable_and_drops_extras() {
        let mut table = PriceTable::new();
        table.set(date(2024, 1, 2), "BND", 70.0);
        table.set(date(2024, 1, 2), "VTI", 100.0);
        table.reindex_columns(&["VTI", "BND", "BNDX"]);

        assert_eq!(
            table.tickers(),
            &["VTI".to_string(), "BND".to_string(), "BNDX".to_string()]
        );
        assert_eq!(table.get(date(2024, 1, 2), "VTI"), Some(100.0));
        assert_eq!(table.get(date(2024, 1, 2), "BNDX"), None);

        table.reindex_columns(&["VTI"]);
        assert_eq!(table.get(date(2024, 1, 2), "BND"), None);
    }

    #[test]
    fn test_select_drops_incomplete_rows() {
        let mut table = PriceTable::new();
        table.set(date(2024, 1, 2), "VTI", 100.0);
        table.set(date(2024, 1, 2), "BND", 70.0);
        table.set(date(2024, 1, 3), "VTI", 101.0); // BND missing this day

        let both = table.select(&["VTI", "BND"]);
        assert_eq!(both.len(), 1);

        let vti_only = table.select(&["VTI"]);
        assert_eq!(vti_only.len(), 2);
    }

    #[test]
    fn test_last_date_per_ticker_and_overall() {
        let mut table = PriceTable::new();
        table.set(date(2024, 1, 2), "VTI", 100.0);
        table.set(date(2024, 1, 3), "VTI", 101.0);
        table.set(date(2024, 1, 2), "BND", 70.0);
        table.ensure_column("BNDX"); // column exists, all missing

        assert_eq!(table.last_date(None), Some(date(2024, 1, 3)));
        assert_eq!(table.last_date(Some("BND")), Some(date(2024, 1, 2)));
        assert_eq!(table.last_date(Some("BNDX")), None);
        assert_eq!(table.last_date(Some("VEA")), None);
        assert_eq!(PriceTable::new().last_date(None), None);
    }

    #[test]
    fn test_first_date_is_the_first_trade_on_record() {
        let mut table = PriceTable::new();
        table.set(date(2024, 1, 3), "VTI", 101.0);
        table.set(date(2024, 1, 2), "VTI", 100.0);
        table.set(date(2024, 1, 5), "BND", 70.0);

        assert_eq!(table.first_date("VTI"), Some(date(2024, 1, 2)));
        assert_eq!(table.first_date("BND"), Some(date(2024, 1, 5)));
        assert_eq!(table.first_date("VEA"), None);
    }

    #[test]
    fn test_column_series_skips_gaps() {
        let mut table = PriceTable::new();
        table.set(date(2024, 1, 2), "VTI", 100.0);
        table.set(date(2024, 1, 4), "VTI", 102.0);
        table.set(date(2024, 1, 3), "BND", 70.0);

        let series = table.column_series("VTI");
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, date(2024, 1, 2));
        assert_eq!(series[1].date, date(2024, 1, 4));
    }
}
