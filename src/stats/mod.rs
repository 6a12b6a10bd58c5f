//! Stats module - summary statistics

mod calculator;

pub use calculator::{
    CorrelationSummary, CovidSummary, SeasonalityTable, StatsCalculator, TrendLine,
};
