//! Window indicators over closing prices.
//!
//! Every function here takes closes ordered most-recent-first: index 0 is the
//! newest close, the last index the oldest. Results depend only on the window
//! passed in; nothing is smoothed across calls.

pub mod momentum;
pub mod rsi;

pub use momentum::momentum;
pub use rsi::relative_strength;

/// Both readings for one close-price window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorReading {
    pub momentum: f64,
    pub rsi: f64,
}

pub fn evaluate(closes: &[f64]) -> IndicatorReading {
    IndicatorReading {
        momentum: momentum(closes),
        rsi: relative_strength(closes),
    }
}
