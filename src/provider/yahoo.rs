//! Yahoo Finance provider
//!
//! Implements [`MarketDataProvider`] over the public chart and quoteSummary
//! endpoints. Close prices only; the store keeps one close per date.

use anyhow::{anyhow, Context};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use super::{HistoryRequest, MarketDataProvider};
use crate::calc::{FundFacts, Period};
use crate::error::Result;
use crate::series::PricePoint;

/// Yahoo Finance chart response
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

/// Yahoo Finance quoteSummary response
#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryData,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryData {
    result: Option<Vec<QuoteSummaryResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    price: Option<PriceModule>,
    #[serde(rename = "summaryDetail")]
    summary_detail: Option<SummaryDetail>,
    #[serde(rename = "defaultKeyStatistics")]
    key_statistics: Option<KeyStatistics>,
}

#[derive(Debug, Deserialize)]
struct PriceModule {
    #[serde(rename = "shortName")]
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryDetail {
    #[serde(rename = "yield")]
    yield_pct: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct KeyStatistics {
    category: Option<String>,
    #[serde(rename = "annualReportExpenseRatio")]
    expense_ratio: Option<RawValue>,
    #[serde(rename = "beta3Year")]
    beta: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

impl RawValue {
    fn value(this: Option<Self>) -> Option<f64> {
        this.and_then(|v| v.raw)
    }
}

/// Market-data provider backed by Yahoo Finance
pub struct YahooProvider {
    client: Client,
    base_url: String,
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooProvider {
    pub fn new() -> Self {
        Self::with_base_url("https://query1.finance.yahoo.com")
    }

    /// Point the provider at a different host, used to stub the API in tests
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; FourfundBot/1.0)")
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn epoch(date: NaiveDate) -> i64 {
        date.and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0)
    }

    /// Epoch start of the requested slice; 0 means full history
    fn range_start(request: HistoryRequest, today: NaiveDate) -> i64 {
        match request {
            HistoryRequest::Since(date) => Self::epoch(date),
            HistoryRequest::Period(Period::Max) => 0,
            HistoryRequest::Period(Period::Ytd) => NaiveDate::from_ymd_opt(today.year(), 1, 1)
                .map(Self::epoch)
                .unwrap_or(0),
            HistoryRequest::Period(period) => {
                period.window_start(today).map(Self::epoch).unwrap_or(0)
            }
        }
    }
}

impl MarketDataProvider for YahooProvider {
    async fn fetch_price_history(
        &self,
        ticker: &str,
        request: HistoryRequest,
    ) -> Result<Vec<PricePoint>> {
        let now = Utc::now();
        let period1 = Self::range_start(request, now.date_naive());
        let period2 = now.timestamp();
        info!(
            "Fetching {} history for {:?} from Yahoo Finance",
            ticker, request
        );

        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&period1={}&period2={}",
            self.base_url, ticker, period1, period2
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request to Yahoo Finance")?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "Yahoo Finance returned error status: {}",
                response.status()
            ));
        }

        let data: ChartResponse = response
            .json()
            .await
            .context("Failed to parse Yahoo Finance chart response")?;
        if let Some(error) = data.chart.error {
            return Err(anyhow!(
                "Yahoo Finance API error: {} - {}",
                error.code,
                error.description
            ));
        }

        let result = data
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| anyhow!("No chart data returned for {}", ticker))?;
        let timestamps = result.timestamp.unwrap_or_default();
        let closes = result
            .indicators
            .quote
            .into_iter()
            .next()
            .and_then(|q| q.close)
            .unwrap_or_default();

        let mut points = Vec::with_capacity(timestamps.len());
        let mut last_date = None;
        for (ts, close) in timestamps.into_iter().zip(closes) {
            let Some(close) = close else { continue };
            let Some(date) = DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()) else {
                warn!("Skipping out-of-range timestamp {} for {}", ts, ticker);
                continue;
            };
            // Intraday duplicates collapse to the first close of the day
            if last_date == Some(date) {
                continue;
            }
            last_date = Some(date);
            points.push(PricePoint { date, close });
        }
        points.sort_by_key(|p| p.date);

        info!("Fetched {} price points for {}", points.len(), ticker);
        Ok(points)
    }

    async fn fetch_fund_facts(&self, ticker: &str) -> Result<FundFacts> {
        info!("Fetching fund facts for {} from Yahoo Finance", ticker);
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules=price,summaryDetail,defaultKeyStatistics",
            self.base_url, ticker
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request to Yahoo Finance")?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "Yahoo Finance returned error status: {}",
                response.status()
            ));
        }

        let data: QuoteSummaryResponse = response
            .json()
            .await
            .context("Failed to parse Yahoo Finance quoteSummary response")?;
        if let Some(error) = data.quote_summary.error {
            return Err(anyhow!(
                "Yahoo Finance API error: {} - {}",
                error.code,
                error.description
            ));
        }

        let result = data
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| anyhow!("No fund facts returned for {}", ticker))?;

        let (category, expense_ratio, beta) = match result.key_statistics {
            Some(stats) => (stats.category, stats.expense_ratio, stats.beta),
            None => (None, None, None),
        };
        Ok(FundFacts {
            symbol: ticker.to_string(),
            name: result.price.and_then(|p| p.short_name),
            category,
            yield_pct: RawValue::value(result.summary_detail.and_then(|s| s.yield_pct)),
            expense_ratio: RawValue::value(expense_ratio),
            beta: RawValue::value(beta),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_start_maps_requests_to_epochs() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(
            YahooProvider::range_start(HistoryRequest::Period(Period::Max), today),
            0
        );

        let since = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(
            YahooProvider::range_start(HistoryRequest::Since(since), today),
            YahooProvider::epoch(since)
        );

        let ytd = YahooProvider::range_start(HistoryRequest::Period(Period::Ytd), today);
        assert_eq!(
            ytd,
            YahooProvider::epoch(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );

        let one_month =
            YahooProvider::range_start(HistoryRequest::Period(Period::OneMonth), today);
        assert_eq!(
            one_month,
            YahooProvider::epoch(NaiveDate::from_ymd_opt(2024, 5, 15).unwrap())
        );
    }

    #[test]
    fn test_chart_response_parses_and_skips_null_closes() {
        let body = r#"{
            "chart": {
                "result": [{
                    "meta": {"symbol": "VTI"},
                    "timestamp": [1704189600, 1704276000, 1704362400],
                    "indicators": {"quote": [{"close": [236.5, null, 238.1]}]}
                }],
                "error": null
            }
        }"#;
        let parsed: ChartResponse = serde_json::from_str(body).unwrap();
        let result = parsed.chart.result.unwrap().into_iter().next().unwrap();
        assert_eq!(result.timestamp.unwrap().len(), 3);
        let closes = result.indicators.quote[0].close.as_ref().unwrap();
        assert_eq!(closes[1], None);
    }

    #[test]
    fn test_quote_summary_parses_optional_fields() {
        let body = r#"{
            "quoteSummary": {
                "result": [{
                    "price": {"shortName": "Vanguard Total Stock Market ETF"},
                    "summaryDetail": {"yield": {"raw": 0.0131, "fmt": "1.31%"}},
                    "defaultKeyStatistics": {"beta3Year": {"raw": 1.0}}
                }],
                "error": null
            }
        }"#;
        let parsed: QuoteSummaryResponse = serde_json::from_str(body).unwrap();
        let result = parsed.quote_summary.result.unwrap().into_iter().next().unwrap();
        assert_eq!(
            RawValue::value(result.summary_detail.and_then(|s| s.yield_pct)),
            Some(0.0131)
        );
        let stats = result.key_statistics.unwrap();
        assert_eq!(RawValue::value(stats.beta), Some(1.0));
        assert_eq!(RawValue::value(stats.expense_ratio), None);
    }
}
