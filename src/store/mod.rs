//! Persistent wide-format price history store
//!
//! One CSV file, rows keyed by ISO-8601 date, one nullable close column per
//! ticker. Reads tolerate damage: an absent or unparseable file behaves as
//! an empty store so the next access can fall back to a bulk fetch.
//! Updates merge with fill-only-missing semantics, so a value once recorded
//! for a (date, ticker) cell is never overwritten by later fetches.
//!
//! Access follows a read-then-overwrite discipline with no locking;
//! concurrent writers are an unresolved limitation, not a guarantee.

use anyhow::Context;
use chrono::{Days, NaiveDate};
use csv::{ReaderBuilder, WriterBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::calc::Period;
use crate::error::{PlannerError, Result};
use crate::provider::{HistoryRequest, MarketDataProvider};
use crate::series::PriceTable;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// On-disk multi-ticker price history
pub struct HistoricalStore {
    path: PathBuf,
}

impl HistoricalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fetch maximum-available history for every ticker and persist the
    /// outer-joined table by full overwrite. A failed ticker is logged and
    /// omitted, never fatal for its siblings.
    pub async fn bulk_fetch<P: MarketDataProvider>(
        &self,
        provider: &P,
        tickers: &[&str],
    ) -> Result<()> {
        info!("Bulk-fetching max history for {:?}", tickers);
        let mut columns = Vec::new();
        for &ticker in tickers {
            match provider
                .fetch_price_history(ticker, HistoryRequest::Period(Period::Max))
                .await
            {
                Ok(series) if !series.is_empty() => {
                    columns.push((ticker.to_string(), series));
                }
                Ok(_) => warn!("Provider returned no history for {}", ticker),
                Err(e) => warn!("Failed to fetch max history for {}: {:#}", ticker, e),
            }
        }
        if columns.is_empty() {
            warn!("No data fetched for any ticker, skipping save");
            return Ok(());
        }
        self.write_table(&PriceTable::from_series(columns))
    }

    /// Incrementally update the persisted table.
    ///
    /// Tickers with recorded data are fetched strictly after their latest
    /// non-missing date; tickers with none get a full-history fetch. New
    /// values only fill previously-absent cells. Columns are reindexed to
    /// the caller's order so the layout stays stable even when some tickers
    /// had nothing new.
    pub async fn update<P: MarketDataProvider>(
        &self,
        provider: &P,
        tickers: &[&str],
    ) -> Result<()> {
        info!("Updating history for {:?}", tickers);
        let mut existing = self.read_table();
        let mut fetched = Vec::new();

        for &ticker in tickers {
            let request = match existing.last_date(Some(ticker)) {
                Some(last) => match last.checked_add_days(Days::new(1)) {
                    Some(start) => HistoryRequest::Since(start),
                    None => continue,
                },
                None => {
                    debug!("No existing data for {}, fetching full history", ticker);
                    HistoryRequest::Period(Period::Max)
                }
            };
            match provider.fetch_price_history(ticker, request).await {
                Ok(series) if !series.is_empty() => {
                    fetched.push((ticker.to_string(), series));
                }
                Ok(_) => debug!("No new data available for {}", ticker),
                Err(e) => warn!("Failed to fetch update for {}: {:#}", ticker, e),
            }
        }

        if fetched.is_empty() {
            info!("No new data fetched for any ticker, skipping update");
            return Ok(());
        }

        existing.merge_fill_missing(&PriceTable::from_series(fetched));
        existing.reindex_columns(tickers);
        self.write_table(&existing)
    }

    /// Latest date with a non-missing value for `ticker`, or the latest
    /// date overall. `None` when the store is absent, empty, or the column
    /// is unknown or entirely missing.
    pub fn last_recorded_date(&self, ticker: Option<&str>) -> Option<NaiveDate> {
        self.read_table().last_date(ticker)
    }

    /// Days elapsed since the last recorded date, for callers deciding
    /// between an incremental update and a full re-download
    pub fn staleness_days(&self, today: NaiveDate) -> Option<i64> {
        self.last_recorded_date(None)
            .map(|last| (today - last).num_days())
    }

    /// The persisted table, optionally restricted to the given columns.
    /// Rows missing a value in any requested column are dropped; rows
    /// always emerge sorted ascending by date.
    pub fn load(&self, tickers: Option<&[&str]>) -> PriceTable {
        let table = self.read_table();
        match tickers {
            Some(requested) => table.select(requested),
            None => {
                let all: Vec<&str> = table.tickers().iter().map(|t| t.as_str()).collect();
                table.select(&all)
            }
        }
    }

    /// Read the persisted table; damage downgrades to an empty table so the
    /// caller can take the bulk-load path.
    fn read_table(&self) -> PriceTable {
        match self.try_read_table() {
            Ok(table) => table,
            Err(e) => {
                warn!("Treating store at {:?} as empty: {:#}", self.path, e);
                PriceTable::new()
            }
        }
    }

    fn try_read_table(&self) -> Result<PriceTable> {
        if !self.path.exists() {
            debug!("No store file at {:?}", self.path);
            return Ok(PriceTable::new());
        }
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .context("Failed to open store file")?;
        let headers = reader
            .headers()
            .context("Failed to read store headers")?
            .clone();
        if headers.get(0) != Some("Date") {
            return Err(PlannerError::MalformedStore(
                "first column must be Date".to_string(),
            )
            .into());
        }

        let tickers: Vec<String> = headers.iter().skip(1).map(|h| h.to_string()).collect();
        let mut table = PriceTable::new();
        for ticker in &tickers {
            table.ensure_column(ticker);
        }

        for (row, result) in reader.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping unreadable store row {}: {}", row + 2, e);
                    continue;
                }
            };
            let date = match record
                .get(0)
                .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
            {
                Some(date) => date,
                None => {
                    warn!("Skipping store row {} with bad date", row + 2);
                    continue;
                }
            };
            for (idx, ticker) in tickers.iter().enumerate() {
                // Absent or unparseable cells are missing, never zero
                let value = record
                    .get(idx + 1)
                    .filter(|s| !s.is_empty())
                    .and_then(|s| s.parse::<f64>().ok());
                if let Some(value) = value {
                    table.set(date, ticker, value);
                }
            }
        }
        Ok(table)
    }

    /// Persist by full overwrite, creating parent directories as needed
    fn write_table(&self, table: &PriceTable) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("Failed to create store directory")?;
            }
        }
        let mut writer = WriterBuilder::new()
            .from_path(&self.path)
            .context("Failed to open store file for writing")?;

        let mut header = vec!["Date".to_string()];
        header.extend(table.tickers().iter().cloned());
        writer.write_record(&header)?;

        for (date, cells) in table.rows() {
            let mut record = vec![date.format(DATE_FORMAT).to_string()];
            record.extend(
                cells
                    .iter()
                    .map(|cell| cell.map(|v| v.to_string()).unwrap_or_default()),
            );
            writer.write_record(&record)?;
        }
        writer.flush().context("Failed to flush store file")?;
        info!(
            "Stored {} rows x {} tickers to {:?}",
            table.len(),
            table.tickers().len(),
            self.path
        );
        Ok(())
    }
}
