//! Simplified relative strength reading over a fixed window.
//!
//! For each adjacent pair (newer = C[i-1], older = C[i]), a positive change
//! adds to gains, anything else adds `older - newer` to losses. Both sums are
//! averaged over the n-1 pairs.
//!
//! gains + losses == 0: RSI = 50 (flat window)
//! avg_loss == 0: RSI = 100
//! otherwise: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//!
//! Unlike Wilder's RSI there is no smoothing state; the window alone
//! determines the reading. Fewer than 2 closes yields 0.

pub fn relative_strength(closes: &[f64]) -> f64 {
    if closes.len() < 2 {
        return 0.0;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for pair in closes.windows(2) {
        let change = pair[0] - pair[1];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }

    if gains + losses == 0.0 {
        return 50.0;
    }

    let pairs = (closes.len() - 1) as f64;
    let avg_gain = gains / pairs;
    let avg_loss = losses / pairs;

    if avg_loss == 0.0 {
        return 100.0;
    }

    100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
}
