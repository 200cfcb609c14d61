//! Four-fund allocation model
//!
//! Splits a portfolio across US/international stock and bond funds from
//! three slider-style inputs, and interpolates historical annual-return
//! envelopes for a given stock percentage.

use crate::series::AllocationMap;

/// Ticker symbols backing each of the four allocation slots
#[derive(Debug, Clone)]
pub struct FundTickers {
    pub us_stocks: String,
    pub intl_stocks: String,
    pub us_bonds: String,
    pub intl_bonds: String,
}

impl Default for FundTickers {
    fn default() -> Self {
        Self {
            us_stocks: "VTI".to_string(),
            intl_stocks: "VEA".to_string(),
            us_bonds: "BND".to_string(),
            intl_bonds: "BNDX".to_string(),
        }
    }
}

impl FundTickers {
    pub fn all(&self) -> [&str; 4] {
        [
            &self.us_stocks,
            &self.intl_stocks,
            &self.us_bonds,
            &self.intl_bonds,
        ]
    }
}

/// Allocation percentages (0-100) for the four fund slots
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FundAllocations {
    pub us_stocks: f64,
    pub intl_stocks: f64,
    pub us_bonds: f64,
    pub intl_bonds: f64,
}

impl FundAllocations {
    pub fn total(&self) -> f64 {
        self.us_stocks + self.intl_stocks + self.us_bonds + self.intl_bonds
    }

    pub fn as_allocation_map(&self, tickers: &FundTickers) -> AllocationMap {
        AllocationMap::from([
            (tickers.us_stocks.clone(), self.us_stocks),
            (tickers.intl_stocks.clone(), self.intl_stocks),
            (tickers.us_bonds.clone(), self.us_bonds),
            (tickers.intl_bonds.clone(), self.intl_bonds),
        ])
    }
}

/// Derive the four fund percentages from the three user inputs, all 0-100:
/// overall stock share, international share within stocks, international
/// share within bonds. The four outputs always sum to 100.
pub fn fund_allocations(
    total_stocks: f64,
    intl_within_stocks: f64,
    intl_within_bonds: f64,
) -> FundAllocations {
    let total_bonds = 100.0 - total_stocks;
    FundAllocations {
        us_stocks: total_stocks * (100.0 - intl_within_stocks) / 100.0,
        intl_stocks: total_stocks * intl_within_stocks / 100.0,
        us_bonds: total_bonds * (100.0 - intl_within_bonds) / 100.0,
        intl_bonds: total_bonds * intl_within_bonds / 100.0,
    }
}

/// Historical max/avg/min annual returns (%) for a stock/bond mix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnEnvelope {
    pub max: f64,
    pub avg: f64,
    pub min: f64,
}

// Historical stock vs bond annual-return envelope at 10% stock increments
const STOCK_PCT: [f64; 11] = [
    0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0,
];
const MAX_RETURN: [f64; 11] = [
    32.6, 31.2, 29.8, 28.4, 27.9, 32.3, 36.7, 41.1, 45.4, 49.8, 54.2,
];
const AVG_RETURN: [f64; 11] = [
    5.3, 5.9, 6.5, 7.1, 7.7, 8.2, 8.8, 9.3, 9.7, 10.1, 10.4,
];
const MIN_RETURN: [f64; 11] = [
    -8.1, -8.2, -10.1, -14.2, -18.4, -22.5, -26.6, -30.7, -34.9, -39.0, -43.1,
];

fn interp(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[xs.len() - 1] {
        return ys[ys.len() - 1];
    }
    let hi = xs.partition_point(|&p| p < x);
    if xs[hi] == x {
        return ys[hi];
    }
    let lo = hi - 1;
    let t = (x - xs[lo]) / (xs[hi] - xs[lo]);
    ys[lo] + t * (ys[hi] - ys[lo])
}

/// Linearly interpolate the return envelope for a stock allocation in
/// percent. Out-of-range inputs clamp to the nearest table endpoint.
pub fn interpolate_returns(stock_pct: f64) -> ReturnEnvelope {
    ReturnEnvelope {
        max: interp(stock_pct, &STOCK_PCT, &MAX_RETURN),
        avg: interp(stock_pct, &STOCK_PCT, &AVG_RETURN),
        min: interp(stock_pct, &STOCK_PCT, &MIN_RETURN),
    }
}
