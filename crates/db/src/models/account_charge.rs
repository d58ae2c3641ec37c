//! Charges attached to accounts (`savings_account_charges` table).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::FromRow;
use savings_core::charges::AccountCharge;
use savings_core::enums::{ChargeCalculationType, ChargeTimeType};
use savings_core::error::CoreResult;
use savings_core::types::{DbId, Timestamp};

use super::{stored_enum, to_u32};

#[derive(Debug, Clone, FromRow)]
pub struct AccountChargeRow {
    pub id: DbId,
    pub account_id: DbId,
    pub charge_id: DbId,
    pub name: String,
    pub charge_time_type: i32,
    pub charge_calculation_type: i32,
    pub percentage: Option<Decimal>,
    pub amount: Decimal,
    pub amount_paid: Decimal,
    pub amount_waived: Decimal,
    pub amount_outstanding: Decimal,
    pub due_date: Option<NaiveDate>,
    pub fee_on_month: Option<i32>,
    pub fee_on_day: Option<i32>,
    pub fee_interval: Option<i32>,
    pub penalty: bool,
    pub active: bool,
    pub paid: bool,
    pub waived: bool,
    pub inactivated_on: Option<NaiveDate>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AccountChargeRow {
    pub fn into_charge(self) -> CoreResult<AccountCharge> {
        Ok(AccountCharge {
            id: Some(self.id),
            charge_id: self.charge_id,
            name: self.name,
            time_type: stored_enum("chargeTimeType", self.charge_time_type, ChargeTimeType::try_from_id)?,
            calculation_type: stored_enum(
                "chargeCalculationType",
                self.charge_calculation_type,
                ChargeCalculationType::try_from_id,
            )?,
            percentage: self.percentage,
            amount: self.amount,
            amount_paid: self.amount_paid,
            amount_waived: self.amount_waived,
            amount_outstanding: self.amount_outstanding,
            due_date: self.due_date,
            fee_on_month: to_u32(self.fee_on_month),
            fee_on_day: to_u32(self.fee_on_day),
            fee_interval: self.fee_interval,
            penalty: self.penalty,
            active: self.active,
            paid: self.paid,
            waived: self.waived,
            inactivated_on: self.inactivated_on,
        })
    }
}
