//! Stats module - Descriptive statistics for figures

mod calculator;

pub use calculator::{Bin, BoxSummary, StatsCalculator};
