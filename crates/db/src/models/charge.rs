//! Charge definitions (`charges` table).

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::FromRow;
use savings_core::charges::ChargeDefinition;
use savings_core::enums::{ChargeCalculationType, ChargeTimeType};
use savings_core::error::CoreResult;
use savings_core::types::{DbId, Timestamp};

use super::{stored_enum, to_u32};

/// A row from the `charges` table.
#[derive(Debug, Clone, FromRow)]
pub struct Charge {
    pub id: DbId,
    pub name: String,
    pub currency_code: String,
    pub amount: Decimal,
    pub charge_time_type: i32,
    pub charge_calculation_type: i32,
    pub active: bool,
    pub penalty: bool,
    pub fee_on_month: Option<i32>,
    pub fee_on_day: Option<i32>,
    pub fee_interval: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Charge {
    pub fn to_definition(&self) -> CoreResult<ChargeDefinition> {
        Ok(ChargeDefinition {
            id: Some(self.id),
            name: self.name.clone(),
            currency_code: self.currency_code.clone(),
            amount: self.amount,
            charge_time_type: stored_enum(
                "chargeTimeType",
                self.charge_time_type,
                ChargeTimeType::try_from_id,
            )?,
            charge_calculation_type: stored_enum(
                "chargeCalculationType",
                self.charge_calculation_type,
                ChargeCalculationType::try_from_id,
            )?,
            active: self.active,
            penalty: self.penalty,
            fee_on_month: to_u32(self.fee_on_month),
            fee_on_day: to_u32(self.fee_on_day),
            fee_interval: self.fee_interval,
        })
    }
}

/// DTO for updating a charge definition. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCharge {
    pub name: Option<String>,
    pub amount: Option<Decimal>,
    pub active: Option<bool>,
    pub penalty: Option<bool>,
    pub fee_on_month: Option<u32>,
    pub fee_on_day: Option<u32>,
    pub fee_interval: Option<i32>,
}

impl UpdateCharge {
    /// Apply the present fields to `def`.
    pub fn apply_to(&self, def: &mut ChargeDefinition) {
        if let Some(name) = &self.name {
            def.name = name.clone();
        }
        if let Some(amount) = self.amount {
            def.amount = amount;
        }
        if let Some(active) = self.active {
            def.active = active;
        }
        if let Some(penalty) = self.penalty {
            def.penalty = penalty;
        }
        if self.fee_on_month.is_some() {
            def.fee_on_month = self.fee_on_month;
        }
        if self.fee_on_day.is_some() {
            def.fee_on_day = self.fee_on_day;
        }
        if self.fee_interval.is_some() {
            def.fee_interval = self.fee_interval;
        }
    }
}
