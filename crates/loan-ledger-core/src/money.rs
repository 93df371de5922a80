//! Rounding primitives shared by every schedule and ledger computation.
//!
//! Amounts are presented in whole currency units. Portions are rounded
//! individually as they are computed; running balances stay unrounded until
//! they are presented.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::types::Money;

/// Balances below one cent are presented as zero.
pub const CENT: Money = dec!(0.01);

/// Round to the nearest whole currency unit, halves toward positive infinity.
///
/// `2.5 -> 3`, `-2.5 -> -2`. Never overflows, even at `Decimal::MAX`.
pub fn round_half_up(amount: Money) -> Money {
    let strategy = if amount.is_sign_negative() {
        RoundingStrategy::MidpointTowardZero
    } else {
        RoundingStrategy::MidpointAwayFromZero
    };
    amount.round_dp_with_strategy(0, strategy)
}

/// Present a running balance: zero when under one cent (including any
/// negative residue), otherwise rounded to whole units.
pub fn settle_dust(balance: Money) -> Money {
    if balance < CENT {
        Decimal::ZERO
    } else {
        round_half_up(balance)
    }
}

/// `value * percent / 100`, unrounded; `None` when the product overflows.
pub fn percent_of(value: Money, percent: Money) -> Option<Money> {
    value.checked_mul(percent)?.checked_div(dec!(100))
}

/// Clamp to zero from below.
pub fn non_negative(amount: Money) -> Money {
    amount.max(Decimal::ZERO)
}
