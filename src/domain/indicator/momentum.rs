//! Momentum: percentage change from the oldest to the newest close.
//!
//! momentum = ((C[0] / C[last]) - 1) * 100
//! If fewer than 2 closes or C[last] == 0: momentum = 0

pub fn momentum(closes: &[f64]) -> f64 {
    if closes.len() < 2 {
        return 0.0;
    }

    let newest = closes[0];
    let oldest = closes[closes.len() - 1];
    if oldest == 0.0 {
        return 0.0;
    }

    ((newest / oldest) - 1.0) * 100.0
}
