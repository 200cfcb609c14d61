//! Period-anchored return calculation
//!
//! Computes the return over a named lookback window from either a price
//! series or a daily-return series, and synthesizes one portfolio-level
//! daily-return series from a wide price table plus allocation weights.
//!
//! The two bases are intentionally asymmetric and must stay that way:
//! price-based fixed windows anchor on the point immediately preceding the
//! cutoff date, while return-based windows compound from the cutoff
//! inclusive. The YTD fallback for a series that starts mid-year also
//! differs between the two bases. Both quirks are part of the reference
//! behavior this crate reproduces.

use chrono::{Datelike, Days, Months, NaiveDate};
use itertools::Itertools;
use std::fmt;
use std::str::FromStr;

use crate::error::PlannerError;
use crate::series::{AllocationMap, DailyReturnSeries, PricePoint, PriceTable};

/// Named lookback window selecting a return-calculation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    OneWeek,
    OneMonth,
    ThreeMonths,
    SixMonths,
    Ytd,
    OneYear,
    TwoYears,
    ThreeYears,
    FiveYears,
    TenYears,
    Max,
}

impl Period {
    pub const ALL: [Period; 11] = [
        Period::OneWeek,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::Ytd,
        Period::OneYear,
        Period::TwoYears,
        Period::ThreeYears,
        Period::FiveYears,
        Period::TenYears,
        Period::Max,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Period::OneWeek => "1w",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::Ytd => "ytd",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::ThreeYears => "3y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::Max => "max",
        }
    }

    /// Target start of a fixed window ending at `end`. Calendar offsets, not
    /// trading-day counts: `1mo` subtracts one calendar month, so the window
    /// spans 28-31 days. `ytd`/`max` have no fixed offset.
    pub(crate) fn window_start(&self, end: NaiveDate) -> Option<NaiveDate> {
        let months = match self {
            Period::OneWeek => return end.checked_sub_days(Days::new(7)),
            Period::OneMonth => 1,
            Period::ThreeMonths => 3,
            Period::SixMonths => 6,
            Period::OneYear => 12,
            Period::TwoYears => 24,
            Period::ThreeYears => 36,
            Period::FiveYears => 60,
            Period::TenYears => 120,
            Period::Ytd | Period::Max => return None,
        };
        end.checked_sub_months(Months::new(months))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .into_iter()
            .find(|p| p.label() == s)
            .ok_or_else(|| PlannerError::Validation(format!("unknown period label: {s}")))
    }
}

/// What the input series represents: observed prices, or daily simple returns
#[derive(Debug, Clone, Copy)]
pub enum ReturnBasis<'a> {
    Price(&'a [PricePoint]),
    DailyReturn(&'a [(NaiveDate, f64)]),
}

#[derive(Clone, Copy, PartialEq)]
enum Kind {
    Price,
    DailyReturn,
}

fn compound(returns: &[(NaiveDate, f64)]) -> f64 {
    returns.iter().map(|(_, r)| 1.0 + r).product::<f64>() - 1.0
}

/// Percentage return (as a fraction) over `period`, or `None` when the
/// series has no anchor date far enough back (insufficient history).
pub fn period_return(basis: ReturnBasis<'_>, period: Period) -> Option<f64> {
    let (mut points, kind): (Vec<(NaiveDate, f64)>, Kind) = match basis {
        ReturnBasis::Price(prices) => (
            prices.iter().map(|p| (p.date, p.close)).collect(),
            Kind::Price,
        ),
        ReturnBasis::DailyReturn(returns) => (returns.to_vec(), Kind::DailyReturn),
    };
    if points.is_empty() {
        return None;
    }
    // Anchoring below requires ascending dates; sort if the caller did not.
    if !points.iter().tuple_windows().all(|(a, b)| a.0 <= b.0) {
        points.sort_by_key(|(date, _)| *date);
    }

    let (end_date, end_value) = *points.last().unwrap();

    match period {
        Period::Max => match kind {
            Kind::Price => Some(end_value / points[0].1 - 1.0),
            Kind::DailyReturn => Some(compound(&points)),
        },
        Period::Ytd => {
            let jan1 = NaiveDate::from_ymd_opt(end_date.year(), 1, 1)?;
            let anchor = points.iter().rposition(|(date, _)| *date < jan1);
            match (kind, anchor) {
                (Kind::Price, Some(idx)) => Some(end_value / points[idx].1 - 1.0),
                // Series starts mid-year: baseline is the first price within
                // the current year.
                (Kind::Price, None) => {
                    let (_, first_in_year) = points.iter().find(|(date, _)| *date >= jan1)?;
                    Some(end_value / first_in_year - 1.0)
                }
                (Kind::DailyReturn, Some(_)) => {
                    let from = points.partition_point(|(date, _)| *date < jan1);
                    Some(compound(&points[from..]))
                }
                // Series starts mid-year: compound everything from the start.
                // Diverges from the price basis on purpose.
                (Kind::DailyReturn, None) => Some(compound(&points)),
            }
        }
        _ => {
            let target_start = period.window_start(end_date)?;
            let cutoff = points.iter().rposition(|(date, _)| *date <= target_start)?;
            match kind {
                Kind::Price => {
                    // Baseline is one point before the cutoff, unless the
                    // cutoff is the very first point on record.
                    let base = if cutoff == 0 { 0 } else { cutoff - 1 };
                    Some(end_value / points[base].1 - 1.0)
                }
                Kind::DailyReturn => Some(compound(&points[cutoff..])),
            }
        }
    }
}

/// Period return for a single fund's price series
pub fn fund_period_return(prices: &[PricePoint], period: Period) -> Option<f64> {
    period_return(ReturnBasis::Price(prices), period)
}

/// Period return for a portfolio's daily-return series
pub fn portfolio_period_return(returns: &[(NaiveDate, f64)], period: Period) -> Option<f64> {
    period_return(ReturnBasis::DailyReturn(returns), period)
}

/// Running compounded return: `cumulative[i] = prod(1 + r_k, k <= i) - 1`
pub fn cumulative_returns(returns: &[(NaiveDate, f64)]) -> DailyReturnSeries {
    let mut growth = 1.0;
    returns
        .iter()
        .map(|(date, r)| {
            growth *= 1.0 + r;
            (*date, growth - 1.0)
        })
        .collect()
}

/// Collapse a wide price table into one daily portfolio-return series.
///
/// Per-ticker simple returns are taken between consecutive rows (the first
/// row has no defined return), restricted to the tickers present in both the
/// table and the allocation map, with weights renormalized to sum to 1 over
/// that intersection. A zero-total intersection yields all-zero weights. The
/// result holds one weighted return per date where every intersected ticker
/// has a defined return.
pub fn portfolio_daily_returns(
    table: &PriceTable,
    allocations: &AllocationMap,
) -> DailyReturnSeries {
    if table.is_empty() || allocations.is_empty() {
        return Vec::new();
    }
    let valid: Vec<&str> = table
        .tickers()
        .iter()
        .filter(|t| allocations.contains_key(t.as_str()))
        .map(|t| t.as_str())
        .collect();
    if valid.is_empty() {
        return Vec::new();
    }

    let total: f64 = valid.iter().map(|t| allocations[*t]).sum();
    let weights: Vec<f64> = valid
        .iter()
        .map(|t| {
            if total == 0.0 {
                0.0
            } else {
                allocations[*t] / total
            }
        })
        .collect();

    let rows: Vec<(NaiveDate, Vec<Option<f64>>)> = table
        .rows()
        .map(|(date, _)| {
            let cells = valid.iter().map(|t| table.get(date, t)).collect();
            (date, cells)
        })
        .collect();

    let mut out = Vec::with_capacity(rows.len().saturating_sub(1));
    for pair in rows.windows(2) {
        let (date, cur) = (&pair[1].0, &pair[1].1);
        let prev = &pair[0].1;
        let mut weighted = 0.0;
        let mut complete = true;
        for (idx, weight) in weights.iter().enumerate() {
            match (prev[idx], cur[idx]) {
                (Some(p), Some(c)) => weighted += weight * (c / p - 1.0),
                _ => {
                    complete = false;
                    break;
                }
            }
        }
        if complete {
            out.push((*date, weighted));
        }
    }
    out
}
