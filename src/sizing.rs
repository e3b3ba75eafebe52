//! Order sizing from a fixed quote-currency budget.
//!
//! All sizing functions return a quantity in base asset units.

use crate::error::{Result, TradeError};

/// Exchange constraints on order quantity for one pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderLimits {
    /// Smallest quantity the exchange accepts.
    pub minimum: f64,
    /// Decimal places the exchange accepts on the quantity.
    pub precision: u32,
}

/// Round to `places` decimals, ties to even.
pub fn round_to_places(value: f64, places: u32) -> f64 {
    let shift = 10f64.powi(places as i32);
    (value * shift).round_ties_even() / shift
}

/// Quantity to buy with `budget` at `price`: `max(round(budget / price), minimum)`.
///
/// Non-positive or non-finite inputs are rejected instead of falling back to
/// the minimum size, and so is a quotient that overflows to infinity.
pub fn calc_amount(price: f64, budget: f64, limits: OrderLimits) -> Result<f64> {
    if !price.is_finite() || price <= 0.0 {
        return Err(TradeError::InvalidPrice(price));
    }
    if !budget.is_finite() || budget <= 0.0 {
        return Err(TradeError::InvalidBudget(budget));
    }

    let amount = round_to_places(budget / price, limits.precision);
    if !amount.is_finite() {
        return Err(TradeError::InvalidAmount(amount));
    }
    if amount < limits.minimum {
        Ok(limits.minimum)
    } else {
        Ok(amount)
    }
}

/// Fixed-point rendering used on the wire, e.g. `0.0333`.
pub fn format_amount(amount: f64, places: u32) -> String {
    format!("{:.*}", places as usize, amount)
}
