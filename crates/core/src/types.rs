use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Business dates (transaction, approval, activation...) carry no time of day.
pub type BusinessDate = chrono::NaiveDate;

/// Currency settings captured on the product and copied onto each account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    pub code: String,
    /// Decimal places kept after rounding.
    pub digits: u32,
    /// When set, transaction amounts must be a multiple of this value.
    pub in_multiples_of: Option<i32>,
}

impl Currency {
    pub fn new(code: impl Into<String>, digits: u32) -> Self {
        Self {
            code: code.into(),
            digits,
            in_multiples_of: None,
        }
    }

    /// Round half-even to the currency's digits.
    pub fn round(&self, amount: Decimal) -> Decimal {
        round_half_even(amount, self.digits)
    }

    /// `true` when `amount` satisfies the `in_multiples_of` constraint.
    pub fn is_multiple(&self, amount: Decimal) -> bool {
        match self.in_multiples_of {
            Some(m) if m > 0 => (amount % Decimal::from(m)).is_zero(),
            _ => true,
        }
    }
}

pub fn round_half_even(amount: Decimal, digits: u32) -> Decimal {
    amount.round_dp_with_strategy(digits, RoundingStrategy::MidpointNearestEven)
}
