//! Interest engine for savings and deposit accounts.
//!
//! Splits the calculation window into posting periods aligned to the
//! financial year, walks the end-of-day balance of every day and accrues
//! interest per compounding sub-period. Interest accrued in a completed
//! compounding period earns interest itself from the next day on.

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;

use crate::enums::{
    DaysInYear, InterestCalculationType, InterestCompoundingPeriod, InterestPostingPeriod,
};
use crate::types::Currency;

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct InterestSettings {
    /// Annual rate in percent (e.g. `5.5` for 5.5%).
    pub nominal_annual_rate: Decimal,
    pub compounding: InterestCompoundingPeriod,
    pub posting: InterestPostingPeriod,
    pub calculation: InterestCalculationType,
    pub days_in_year: DaysInYear,
    /// Balances below this earn nothing.
    pub min_balance_for_interest: Option<Decimal>,
    /// Month (1..=12) the financial year starts in.
    pub financial_year_beginning_month: u32,
    /// Post on the last day of the period instead of the day after.
    pub post_at_period_end: bool,
    /// Percent withheld from each posting; the tax leaves the balance
    /// together with the posting.
    pub withhold_tax_rate: Option<Decimal>,
    /// Dates of manual (`postInterestAsOn`) postings. Each one closes a
    /// posting period early and compounds what was accrued so far.
    pub manual_posting_dates: Vec<NaiveDate>,
}

/// A signed change to the principal balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceMovement {
    pub date: NaiveDate,
    pub amount: Decimal,
}

/// Interest earned in one posting period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingPeriodInterest {
    pub from: NaiveDate,
    /// Inclusive.
    pub to: NaiveDate,
    pub opening_balance: Decimal,
    pub closing_balance: Decimal,
    pub interest_unrounded: Decimal,
    pub interest: Decimal,
    /// Withheld from `interest` when it is posted.
    pub tax: Decimal,
    pub posting_date: NaiveDate,
    /// `to` is the natural end of the posting period (not a truncated window).
    pub is_complete: bool,
}

// ---------------------------------------------------------------------------
// Calendar helpers
// ---------------------------------------------------------------------------

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())
        .unwrap_or(date)
}

/// Last day of the `months`-long period containing `date`, with periods
/// aligned so that one starts in `fy_month`.
pub fn period_end(date: NaiveDate, months: u32, fy_month: u32) -> NaiveDate {
    let months = months.max(1);
    let fy_month0 = fy_month.clamp(1, 12) as i32 - 1;
    let offset = (date.month0() as i32 - fy_month0).rem_euclid(12) as u32;
    let to_end = months - 1 - (offset % months);
    let end_month = first_of_month(date)
        .checked_add_months(Months::new(to_end))
        .unwrap_or(date);
    last_day_of_month(end_month)
}

/// Consecutive `(from, to, is_complete)` posting intervals covering
/// `start..=up_to`. A date in `splits` ends the interval it falls in.
pub fn posting_intervals(
    start: NaiveDate,
    up_to: NaiveDate,
    posting: InterestPostingPeriod,
    fy_month: u32,
    splits: &[NaiveDate],
) -> Vec<(NaiveDate, NaiveDate, bool)> {
    let mut intervals = Vec::new();
    let mut cursor = start;
    while cursor <= up_to {
        let natural_end = period_end(cursor, posting.months(), fy_month);
        let split = splits
            .iter()
            .copied()
            .filter(|d| *d >= cursor && *d < natural_end)
            .min();
        let end = split.unwrap_or(natural_end).min(up_to);
        intervals.push((cursor, end, end == natural_end));
        match end.succ_opt() {
            Some(next) => cursor = next,
            None => break,
        }
    }
    intervals
}

fn compounding_end(date: NaiveDate, compounding: InterestCompoundingPeriod, fy: u32) -> NaiveDate {
    match compounding.months() {
        None => date,
        Some(months) => period_end(date, months, fy),
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Compute interest for every posting period in `start..=up_to`.
///
/// `movements` are the principal-affecting transactions (interest postings
/// and withheld tax excluded, both are derived here); their order does not
/// matter.
pub fn calculate(
    settings: &InterestSettings,
    movements: &[BalanceMovement],
    start: NaiveDate,
    up_to: NaiveDate,
    currency: &Currency,
) -> Vec<PostingPeriodInterest> {
    let mut sorted = movements.to_vec();
    sorted.sort_by_key(|m| m.date);

    let fy = settings.financial_year_beginning_month;
    let daily_rate = settings.nominal_annual_rate
        / Decimal::from(100)
        / Decimal::from(settings.days_in_year.id());

    let mut next = 0;
    let mut principal = Decimal::ZERO;
    while next < sorted.len() && sorted[next].date < start {
        principal += sorted[next].amount;
        next += 1;
    }

    let mut compounded = Decimal::ZERO;
    let mut uncompounded = Decimal::ZERO;
    let mut posted = Decimal::ZERO;
    let mut periods = Vec::new();

    let splits = &settings.manual_posting_dates;
    for (from, to, is_complete) in posting_intervals(start, up_to, settings.posting, fy, splits) {
        let opening_balance = principal + posted;
        let mut period_interest = Decimal::ZERO;

        let mut sub_start = from;
        while sub_start <= to {
            let natural_end = compounding_end(sub_start, settings.compounding, fy);
            let sub_end = natural_end.min(to);

            let mut balances = Vec::new();
            let mut day = sub_start;
            while day <= sub_end {
                while next < sorted.len() && sorted[next].date <= day {
                    principal += sorted[next].amount;
                    next += 1;
                }
                balances.push(principal + compounded);
                match day.succ_opt() {
                    Some(d) => day = d,
                    None => break,
                }
            }

            let earned = accrue(settings, &balances, daily_rate);
            period_interest += earned;
            uncompounded += earned;

            if sub_end == natural_end {
                compounded += uncompounded;
                uncompounded = Decimal::ZERO;
            }
            match sub_end.succ_opt() {
                Some(d) => sub_start = d,
                None => break,
            }
        }

        if splits.contains(&to) {
            compounded += uncompounded;
            uncompounded = Decimal::ZERO;
        }

        let interest = currency.round(period_interest);
        let tax = settings
            .withhold_tax_rate
            .map(|rate| currency.round(interest * rate / Decimal::ONE_HUNDRED))
            .filter(|tax| *tax > Decimal::ZERO)
            .unwrap_or(Decimal::ZERO);
        posted += interest;
        principal -= tax;
        let posting_date = if settings.post_at_period_end {
            to
        } else {
            to.succ_opt().unwrap_or(to)
        };

        periods.push(PostingPeriodInterest {
            from,
            to,
            opening_balance,
            closing_balance: principal + posted,
            interest_unrounded: period_interest,
            interest,
            tax,
            posting_date,
            is_complete,
        });
    }

    periods
}

/// Interest for one compounding sub-period given each day's balance.
fn accrue(settings: &InterestSettings, balances: &[Decimal], daily_rate: Decimal) -> Decimal {
    let eligible = |balance: Decimal| {
        balance > Decimal::ZERO
            && settings
                .min_balance_for_interest
                .map_or(true, |min| balance >= min)
    };

    match settings.calculation {
        InterestCalculationType::DailyBalance => balances
            .iter()
            .filter(|b| eligible(**b))
            .map(|b| *b * daily_rate)
            .sum(),
        InterestCalculationType::AverageDailyBalance => {
            if balances.is_empty() {
                return Decimal::ZERO;
            }
            let total: Decimal = balances.iter().copied().sum();
            let average = total / Decimal::from(balances.len());
            if eligible(average) {
                total * daily_rate
            } else {
                Decimal::ZERO
            }
        }
    }
}

/// Total rounded interest across `periods`.
pub fn total_interest(periods: &[PostingPeriodInterest]) -> Decimal {
    periods.iter().map(|p| p.interest).sum()
}
