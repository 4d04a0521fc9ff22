//! Pricing and the threshold discount rule.
//!
//! All amounts are integer minor units (paise). The same function prices a
//! simulated checkout and an externally paid one, so identical carts always
//! produce identical totals.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Subtotal at or above which the discount applies (₹1000).
pub const DISCOUNT_THRESHOLD_CENTS: i64 = 100_000;
/// Discount divisor: one tenth of the subtotal, rounded down.
const DISCOUNT_DIVISOR: i64 = 10;

/// Price and quantity of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmount {
    /// Unit price in minor units.
    pub unit_price_cents: i64,
    /// Quantity, at least one.
    pub qty: u32,
}

impl LineAmount {
    /// Pair a unit price with a quantity.
    #[must_use]
    pub const fn new(unit_price_cents: i64, qty: u32) -> Self {
        Self {
            unit_price_cents,
            qty,
        }
    }
}

/// Errors raised while pricing a set of lines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    /// A line carried a negative unit price.
    #[error("unit price must not be negative (got {unit_price_cents})")]
    NegativePrice {
        /// Offending unit price.
        unit_price_cents: i64,
    },
    /// The subtotal does not fit in 64 bits.
    #[error("order amount overflows")]
    Overflow,
}

/// Computed order totals.
///
/// ## Invariants
/// - `total_cents == subtotal_cents - discount_cents`
/// - `discount_cents` is zero or `floor(subtotal_cents / 10)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Sum of unit price times quantity.
    pub subtotal_cents: i64,
    /// Threshold discount.
    pub discount_cents: i64,
    /// Amount charged.
    pub total_cents: i64,
}

impl Totals {
    /// Totals for a known subtotal with an externally supplied discount.
    ///
    /// Used when a payment provider reports the discount it actually charged.
    /// Returns `None` when the discount is negative or exceeds the subtotal.
    #[must_use]
    pub fn with_discount(subtotal_cents: i64, discount_cents: i64) -> Option<Self> {
        if discount_cents < 0 || discount_cents > subtotal_cents {
            return None;
        }
        Some(Self {
            subtotal_cents,
            discount_cents,
            total_cents: subtotal_cents - discount_cents,
        })
    }
}

/// Discount owed on a subtotal.
#[must_use]
pub fn discount_for(subtotal_cents: i64) -> i64 {
    if subtotal_cents >= DISCOUNT_THRESHOLD_CENTS {
        subtotal_cents.checked_div(DISCOUNT_DIVISOR).unwrap_or(0)
    } else {
        0
    }
}

/// Price a set of lines.
///
/// # Errors
/// Returns [`PricingError`] for negative prices or arithmetic overflow.
///
/// # Examples
/// ```
/// use fluxcart::domain::pricing::{LineAmount, compute_totals};
///
/// let totals = compute_totals([LineAmount::new(60_000, 1), LineAmount::new(50_000, 1)]).unwrap();
/// assert_eq!(totals.subtotal_cents, 110_000);
/// assert_eq!(totals.discount_cents, 11_000);
/// assert_eq!(totals.total_cents, 99_000);
/// ```
pub fn compute_totals<I>(lines: I) -> Result<Totals, PricingError>
where
    I: IntoIterator<Item = LineAmount>,
{
    let mut subtotal_cents: i64 = 0;
    for line in lines {
        if line.unit_price_cents < 0 {
            return Err(PricingError::NegativePrice {
                unit_price_cents: line.unit_price_cents,
            });
        }
        let amount = line
            .unit_price_cents
            .checked_mul(i64::from(line.qty))
            .ok_or(PricingError::Overflow)?;
        subtotal_cents = subtotal_cents
            .checked_add(amount)
            .ok_or(PricingError::Overflow)?;
    }
    let discount_cents = discount_for(subtotal_cents);
    Ok(Totals {
        subtotal_cents,
        discount_cents,
        total_cents: subtotal_cents - discount_cents,
    })
}
