//! Named lookback windows for history and recommendation queries.

use chrono::{Months, NaiveDate};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::StockdeskError;

/// How many stored rows a query should cover, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowBound {
    /// The `n` most recent rows.
    Latest(usize),
    /// Every row dated on or after the given date.
    Since(NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    Week,
    Month,
    SixMonths,
    Year,
}

impl HistoryWindow {
    /// Resolve against `today`; calendar windows become a date cutoff.
    pub fn bound(self, today: NaiveDate) -> RowBound {
        match self {
            HistoryWindow::Week => RowBound::Latest(7),
            HistoryWindow::Month => RowBound::Latest(30),
            HistoryWindow::SixMonths => RowBound::Since(months_back(today, 6)),
            HistoryWindow::Year => RowBound::Since(months_back(today, 12)),
        }
    }
}

fn months_back(today: NaiveDate, months: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

impl FromStr for HistoryWindow {
    type Err = StockdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(StockdeskError::validation("Range parameter is required")),
            "week" => Ok(HistoryWindow::Week),
            "month" => Ok(HistoryWindow::Month),
            "6month" => Ok(HistoryWindow::SixMonths),
            "year" => Ok(HistoryWindow::Year),
            other => Err(StockdeskError::validation(format!(
                "Invalid time range specified: {other}"
            ))),
        }
    }
}

impl fmt::Display for HistoryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HistoryWindow::Week => "week",
            HistoryWindow::Month => "month",
            HistoryWindow::SixMonths => "6month",
            HistoryWindow::Year => "year",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationWindow {
    Short,
    Medium,
    Long,
}

impl RecommendationWindow {
    /// Number of most recent closes fed to the indicators.
    pub fn closes(self) -> usize {
        match self {
            RecommendationWindow::Short => 7,
            RecommendationWindow::Medium => 20,
            RecommendationWindow::Long => 60,
        }
    }
}

impl FromStr for RecommendationWindow {
    type Err = StockdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(StockdeskError::validation("Range parameter is required")),
            "short" => Ok(RecommendationWindow::Short),
            "medium" => Ok(RecommendationWindow::Medium),
            "long" => Ok(RecommendationWindow::Long),
            other => Err(StockdeskError::validation(format!(
                "Invalid time range specified: {other}"
            ))),
        }
    }
}

impl fmt::Display for RecommendationWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecommendationWindow::Short => "short",
            RecommendationWindow::Medium => "medium",
            RecommendationWindow::Long => "long",
        };
        f.write_str(name)
    }
}
