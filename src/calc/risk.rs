//! Risk metrics and growth projection from a daily-return series
//!
//! Annualization uses the 252-trading-day convention. The annualized return
//! is the linear scaling `mean * 252`, not a geometric compounding of the
//! history; the projection builds on the same figure. That approximation is
//! part of the reference behavior and is kept as-is.

use chrono::NaiveDate;

/// Trading days per year used for annualization
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

fn mean(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let count = values.clone().count();
    if count == 0 {
        return 0.0;
    }
    values.sum::<f64>() / count as f64
}

/// Annualized volatility: sample standard deviation of daily returns scaled
/// by sqrt(252). Fewer than two observations yield `0.0`.
pub fn volatility(returns: &[(NaiveDate, f64)]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let avg = mean(returns.iter().map(|(_, r)| *r));
    let variance = returns
        .iter()
        .map(|(_, r)| (r - avg).powi(2))
        .sum::<f64>()
        / (returns.len() - 1) as f64;
    variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Linearly annualized return: `mean(daily) * 252`
pub fn annualized_return(returns: &[(NaiveDate, f64)]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    mean(returns.iter().map(|(_, r)| *r)) * TRADING_DAYS_PER_YEAR
}

/// Annualized Sharpe ratio against `risk_free_rate` (annualized). Empty
/// input or zero volatility yields `0.0`.
pub fn sharpe_ratio(returns: &[(NaiveDate, f64)], risk_free_rate: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let vol = volatility(returns);
    if vol == 0.0 {
        return 0.0;
    }
    (annualized_return(returns) - risk_free_rate) / vol
}

/// Project a principal forward by compounding the linearly annualized
/// return. Empty history or a non-positive horizon returns the principal
/// unchanged.
pub fn projected_value(returns: &[(NaiveDate, f64)], principal: f64, years: i32) -> f64 {
    if returns.is_empty() || years <= 0 {
        return principal;
    }
    principal * (1.0 + annualized_return(returns)).powi(years)
}
