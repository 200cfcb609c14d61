// Calculation layer - pure functions over in-memory series

pub mod composite;
pub mod returns;
pub mod risk;

pub use composite::{composite_metrics, CompositeMetrics, FundFacts};
pub use returns::{
    cumulative_returns, fund_period_return, period_return, portfolio_daily_returns,
    portfolio_period_return, Period, ReturnBasis,
};
pub use risk::{annualized_return, projected_value, sharpe_ratio, volatility};
