//! Numeric-coded enumerations shared by products, accounts and transactions.
//!
//! Ids are stable: they are stored in the database and accepted in request
//! bodies. Responses render every value as an [`EnumOption`]
//! (`{ "id", "code", "value" }`).

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Wire representation of an enumeration value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumOption {
    pub id: i32,
    pub code: &'static str,
    pub value: &'static str,
}

/// Accepted input forms: a bare id, or an [`EnumOption`]-shaped object
/// (so values echoed back from responses and stored snapshots parse).
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEnumValue {
    Id(i32),
    Option { id: i32 },
}

impl RawEnumValue {
    fn id(self) -> i32 {
        match self {
            RawEnumValue::Id(id) | RawEnumValue::Option { id } => id,
        }
    }
}

macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $prefix:literal {
            $( $variant:ident = $id:literal, $code:literal, $value:literal; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant, )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            pub fn id(self) -> i32 {
                match self { $( $name::$variant => $id, )+ }
            }

            pub fn code(self) -> &'static str {
                match self { $( $name::$variant => concat!($prefix, ".", $code), )+ }
            }

            pub fn value(self) -> &'static str {
                match self { $( $name::$variant => $value, )+ }
            }

            pub fn from_id(id: i32) -> Option<Self> {
                match id {
                    $( $id => Some($name::$variant), )+
                    _ => None,
                }
            }

            /// Like [`Self::from_id`] but fails with a validation error naming `field`.
            pub fn try_from_id(field: &str, id: i32) -> Result<Self, CoreError> {
                Self::from_id(id).ok_or_else(|| {
                    CoreError::Validation(format!("{field}: unsupported value {id}"))
                })
            }

            pub fn option(self) -> EnumOption {
                EnumOption { id: self.id(), code: self.code(), value: self.value() }
            }

            /// Every value as an [`EnumOption`], for template responses.
            pub fn options() -> Vec<EnumOption> {
                Self::ALL.iter().map(|v| v.option()).collect()
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.option().serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let id = RawEnumValue::deserialize(deserializer)?.id();
                $name::from_id(id).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        concat!("unsupported ", stringify!($name), " id {}"),
                        id
                    ))
                })
            }
        }
    };
}

coded_enum! {
    /// Lifecycle state of a savings or deposit account.
    AccountStatus, "savingsAccountStatusType" {
        SubmittedAndPendingApproval = 100, "submitted.and.pending.approval", "Submitted and pending approval";
        Approved = 200, "approved", "Approved";
        Active = 300, "active", "Active";
        WithdrawnByApplicant = 400, "withdrawn.by.applicant", "Withdrawn by applicant";
        Rejected = 500, "rejected", "Rejected";
        Closed = 600, "closed", "Closed";
        PrematureClosed = 700, "pre.mature.closure", "Premature Closed";
        Matured = 800, "matured", "Matured";
    }
}

impl AccountStatus {
    pub fn is_closed(self) -> bool {
        matches!(
            self,
            AccountStatus::Closed
                | AccountStatus::PrematureClosed
                | AccountStatus::Rejected
                | AccountStatus::WithdrawnByApplicant
        )
    }
}

coded_enum! {
    /// Restrictions layered on top of an active account.
    AccountSubStatus, "SavingsAccountSubStatusEnum" {
        None = 0, "none", "None";
        Inactive = 100, "inactive", "Inactive";
        Dormant = 200, "dormant", "Dormant";
        Block = 400, "block", "Block";
        BlockCredit = 500, "blockCredit", "Block Credit";
        BlockDebit = 600, "blockDebit", "Block Debit";
    }
}

impl AccountSubStatus {
    pub fn blocks_credit(self) -> bool {
        matches!(self, AccountSubStatus::Block | AccountSubStatus::BlockCredit)
    }

    pub fn blocks_debit(self) -> bool {
        matches!(self, AccountSubStatus::Block | AccountSubStatus::BlockDebit)
    }
}

coded_enum! {
    DepositAccountType, "depositAccountType" {
        Savings = 100, "savingsDeposit", "Savings";
        FixedDeposit = 200, "fixedDeposit", "Fixed Deposit";
        RecurringDeposit = 300, "recurringDeposit", "Recurring Deposit";
    }
}

coded_enum! {
    TransactionType, "savingsAccountTransactionType" {
        Deposit = 1, "deposit", "Deposit";
        Withdrawal = 2, "withdrawal", "Withdrawal";
        InterestPosting = 3, "interestPosting", "Interest Posting";
        WithdrawalFee = 4, "withdrawalFee", "Withdrawal Fee";
        AnnualFee = 5, "annualFee", "Annual Fee";
        WaiveCharges = 6, "waiveCharge", "Waive Charge";
        PayCharge = 7, "payCharge", "Pay Charge";
        WithholdTax = 18, "withholdTax", "Withhold Tax";
        AmountHold = 20, "onHold", "Amount on hold";
        AmountRelease = 21, "release", "Release Amount";
    }
}

impl TransactionType {
    pub fn is_credit(self) -> bool {
        matches!(self, TransactionType::Deposit | TransactionType::InterestPosting)
    }

    pub fn is_debit(self) -> bool {
        matches!(
            self,
            TransactionType::Withdrawal
                | TransactionType::WithdrawalFee
                | TransactionType::AnnualFee
                | TransactionType::PayCharge
                | TransactionType::WithholdTax
        )
    }

    /// Charge-related debits.
    pub fn is_fee(self) -> bool {
        matches!(
            self,
            TransactionType::WithdrawalFee | TransactionType::AnnualFee | TransactionType::PayCharge
        )
    }
}

coded_enum! {
    InterestCompoundingPeriod, "savings.interest.period" {
        Daily = 1, "savingsCompoundingInterestPeriodType.daily", "Daily";
        Monthly = 4, "savingsCompoundingInterestPeriodType.monthly", "Monthly";
        Quarterly = 5, "savingsCompoundingInterestPeriodType.quarterly", "Quarterly";
        BiAnnual = 6, "savingsCompoundingInterestPeriodType.biannual", "Semi-Annual";
        Annual = 7, "savingsCompoundingInterestPeriodType.annual", "Annually";
    }
}

impl InterestCompoundingPeriod {
    /// Months per compounding period; `None` for daily compounding.
    pub fn months(self) -> Option<u32> {
        match self {
            InterestCompoundingPeriod::Daily => None,
            InterestCompoundingPeriod::Monthly => Some(1),
            InterestCompoundingPeriod::Quarterly => Some(3),
            InterestCompoundingPeriod::BiAnnual => Some(6),
            InterestCompoundingPeriod::Annual => Some(12),
        }
    }
}

coded_enum! {
    InterestPostingPeriod, "savings.interest.posting.period" {
        Monthly = 4, "monthly", "Monthly";
        Quarterly = 5, "quarterly", "Quarterly";
        BiAnnual = 6, "biannual", "BiAnnual";
        Annual = 7, "annual", "Annually";
    }
}

impl InterestPostingPeriod {
    pub fn months(self) -> u32 {
        match self {
            InterestPostingPeriod::Monthly => 1,
            InterestPostingPeriod::Quarterly => 3,
            InterestPostingPeriod::BiAnnual => 6,
            InterestPostingPeriod::Annual => 12,
        }
    }
}

coded_enum! {
    InterestCalculationType, "savingsInterestCalculationMethod" {
        DailyBalance = 1, "dailybalance", "Daily Balance";
        AverageDailyBalance = 2, "averagedailybalance", "Average Daily Balance";
    }
}

coded_enum! {
    DaysInYear, "savingsInterestCalculationDaysInYearType" {
        Days360 = 360, "days360", "360 Days";
        Days365 = 365, "days365", "365 Days";
    }
}

coded_enum! {
    PeriodFrequency, "savings.period.frequency" {
        Days = 0, "days", "Days";
        Weeks = 1, "weeks", "Weeks";
        Months = 2, "months", "Months";
        Years = 3, "years", "Years";
    }
}

impl PeriodFrequency {
    /// `date` moved forward by `count` units of this frequency.
    pub fn add_to(self, date: NaiveDate, count: i32) -> NaiveDate {
        let count = count.max(0) as u32;
        let moved = match self {
            PeriodFrequency::Days => date.checked_add_days(Days::new(count.into())),
            PeriodFrequency::Weeks => date.checked_add_days(Days::new(u64::from(count) * 7)),
            PeriodFrequency::Months => date.checked_add_months(Months::new(count)),
            PeriodFrequency::Years => date.checked_add_months(Months::new(count * 12)),
        };
        moved.unwrap_or(date)
    }

    /// Whole units of this frequency from `from` to `to` (0 when `to` precedes `from`).
    pub fn units_between(self, from: NaiveDate, to: NaiveDate) -> i32 {
        if to <= from {
            return 0;
        }
        match self {
            PeriodFrequency::Days => (to - from).num_days() as i32,
            PeriodFrequency::Weeks => ((to - from).num_days() / 7) as i32,
            PeriodFrequency::Months | PeriodFrequency::Years => {
                let mut months =
                    (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
                if to.day() < from.day() && to != crate::interest::last_day_of_month(to) {
                    months -= 1;
                }
                if self == PeriodFrequency::Years {
                    months / 12
                } else {
                    months
                }
            }
        }
    }
}

coded_enum! {
    ChargeTimeType, "chargeTimeType" {
        SpecifiedDueDate = 2, "specifiedDueDate", "Specified due date";
        SavingsActivation = 3, "savingsActivation", "Savings Activation";
        WithdrawalFee = 5, "withdrawalFee", "Withdrawal Fee";
        AnnualFee = 6, "annualFee", "Annual Fee";
        MonthlyFee = 7, "monthlyFee", "Monthly Fee";
    }
}

coded_enum! {
    ChargeCalculationType, "chargeCalculationType" {
        Flat = 1, "flat", "Flat";
        PercentOfAmount = 2, "percent.of.amount", "% Amount";
    }
}

coded_enum! {
    OnAccountClosure, "depositAccountOnClosureType" {
        WithdrawDeposit = 100, "withdrawDeposit", "Withdraw Deposit";
        TransferToSavings = 200, "transferToSavings", "Transfer to Savings";
        Reinvest = 300, "reinvest", "Re-Invest";
    }
}

coded_enum! {
    PreClosurePenalInterestOn, "depositAccountPreClosureInterestOnType" {
        WholeTerm = 1, "wholeTerm", "Whole term";
        TillPrematureWithdrawal = 2, "tillPrematureWithdrawal", "Till Premature Withdrawal";
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_from_id() {
        for status in AccountStatus::ALL {
            assert_eq!(AccountStatus::from_id(status.id()), Some(*status));
        }
        assert_eq!(AccountStatus::from_id(999), None);
    }

    #[test]
    fn serializes_as_enum_option() {
        let json = serde_json::to_value(AccountStatus::Active).unwrap();
        assert_eq!(json["id"], 300);
        assert_eq!(json["code"], "savingsAccountStatusType.active");
        assert_eq!(json["value"], "Active");
    }

    #[test]
    fn deserializes_from_numeric_id() {
        let period: InterestCompoundingPeriod = serde_json::from_str("4").unwrap();
        assert_eq!(period, InterestCompoundingPeriod::Monthly);
        assert!(serde_json::from_str::<InterestCompoundingPeriod>("2").is_err());
    }

    #[test]
    fn deserializes_from_rendered_option() {
        let json = serde_json::to_string(&PeriodFrequency::Months).unwrap();
        let parsed: PeriodFrequency = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, PeriodFrequency::Months);
    }

    #[test]
    fn try_from_id_names_the_field() {
        let err = DaysInYear::try_from_id("interestCalculationDaysInYearType", 364).unwrap_err();
        assert!(err.to_string().contains("interestCalculationDaysInYearType"));
    }

    #[test]
    fn block_sub_status_blocks_both_directions() {
        assert!(AccountSubStatus::Block.blocks_credit());
        assert!(AccountSubStatus::Block.blocks_debit());
        assert!(!AccountSubStatus::BlockCredit.blocks_debit());
        assert!(!AccountSubStatus::None.blocks_credit());
    }

    #[test]
    fn transaction_direction() {
        assert!(TransactionType::Deposit.is_credit());
        assert!(TransactionType::WithholdTax.is_debit());
        assert!(!TransactionType::AmountHold.is_credit());
        assert!(!TransactionType::AmountHold.is_debit());
    }

    #[test]
    fn period_frequency_arithmetic() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(
            PeriodFrequency::Months.add_to(start, 1),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            PeriodFrequency::Weeks.add_to(start, 2),
            NaiveDate::from_ymd_opt(2024, 2, 14).unwrap()
        );
        let from = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(PeriodFrequency::Months.units_between(from, to), 12);
        assert_eq!(PeriodFrequency::Years.units_between(from, to), 1);
        assert_eq!(PeriodFrequency::Days.units_between(from, to), 366);
        assert_eq!(
            PeriodFrequency::Months.units_between(from, NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()),
            1
        );
    }
}
