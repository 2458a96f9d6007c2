//! Numeric helpers for order sizing

use rust_decimal::{Decimal, MathematicalOps};

/// Mean of squared differences over `(target, actual)` pairs.
///
/// Returns `None` for an empty slice or when the squares overflow.
pub fn mean_squared_error(pairs: &[(Decimal, Decimal)]) -> Option<Decimal> {
    if pairs.is_empty() {
        return None;
    }

    let squares = pairs
        .iter()
        .try_fold(Decimal::ZERO, |acc, (target, actual)| {
            acc.checked_add(squared_difference(*target, *actual)?)
        })?;

    Some(squares / Decimal::from(pairs.len()))
}

/// `(target - actual)^2`, `None` on overflow
pub fn squared_difference(target: Decimal, actual: Decimal) -> Option<Decimal> {
    let diff = target.checked_sub(actual)?;
    diff.checked_mul(diff)
}

/// Root mean squared error over `(target, actual)` pairs.
///
/// Returns `None` for an empty slice or when the squares overflow.
pub fn rmse(pairs: &[(Decimal, Decimal)]) -> Option<Decimal> {
    mean_squared_error(pairs)?.sqrt()
}

/// Apply the share rounding policy to a target quantity.
///
/// With `round_down` the quantity is truncated toward zero, so both long
/// and short targets shrink to whole shares and never over-order.
pub fn apply_rounding(quantity: Decimal, round_down: bool) -> Decimal {
    if round_down {
        quantity.trunc()
    } else {
        quantity
    }
}
