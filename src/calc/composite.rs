//! Portfolio-level weighted averages of per-fund facts
//!
//! Each metric is averaged independently over the funds that actually
//! report it, with the weights renormalized over that reporting subset. One
//! call can therefore compute different metrics over different fund subsets.

use serde::{Deserialize, Serialize};

use crate::series::AllocationMap;

/// Key facts for a single fund. Any numeric field may be absent; providers
/// routinely omit them and absence must never fail a whole view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundFacts {
    pub symbol: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub yield_pct: Option<f64>,
    pub expense_ratio: Option<f64>,
    pub beta: Option<f64>,
}

/// Weighted portfolio-level metrics. `None` means no fund in the basket
/// reported that metric; `Some(0.0)` is the defined zero-allocation output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeMetrics {
    pub yield_pct: Option<f64>,
    pub expense_ratio: Option<f64>,
    pub beta: Option<f64>,
}

fn reported(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

fn weighted_metric(
    facts: &[FundFacts],
    allocations: &AllocationMap,
    metric: impl Fn(&FundFacts) -> Option<f64>,
) -> Option<f64> {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for fact in facts {
        let Some(value) = reported(metric(fact)) else {
            continue;
        };
        let weight = allocations.get(&fact.symbol).copied().unwrap_or(0.0) / 100.0;
        weighted_sum += weight * value;
        weight_total += weight;
    }
    if weight_total == 0.0 {
        return None;
    }
    Some(weighted_sum / weight_total)
}

/// Weighted-average yield, expense ratio and beta for the basket.
///
/// A zero total allocation is not an error: it deliberately produces `0.0`
/// for all three metrics, distinct from the `None` a metric gets when no
/// fund reports it.
pub fn composite_metrics(facts: &[FundFacts], allocations: &AllocationMap) -> CompositeMetrics {
    let total: f64 = facts
        .iter()
        .map(|f| allocations.get(&f.symbol).copied().unwrap_or(0.0))
        .sum();
    if total == 0.0 {
        return CompositeMetrics {
            yield_pct: Some(0.0),
            expense_ratio: Some(0.0),
            beta: Some(0.0),
        };
    }
    CompositeMetrics {
        yield_pct: weighted_metric(facts, allocations, |f| f.yield_pct),
        expense_ratio: weighted_metric(facts, allocations, |f| f.expense_ratio),
        beta: weighted_metric(facts, allocations, |f| f.beta),
    }
}
