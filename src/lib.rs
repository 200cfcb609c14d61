//! Fourfund - four-fund portfolio planner core
//!
//! This library provides the numeric core of a four-fund portfolio planner:
//! period-anchored returns, risk and composite metrics for a weighted fund
//! basket, and a persistent, incrementally-updated multi-ticker price store.
//! Presentation (dashboards, charts, CLI) lives elsewhere and consumes the
//! pure functions exposed here.

pub mod allocation;
pub mod calc;
pub mod error;
pub mod provider;
pub mod series;
pub mod store;

pub use error::Result;
pub use series::{AllocationMap, DailyReturnSeries, PricePoint, PriceTable};
