//! Installments of an active loan and the flat-rate schedule generator.

use chrono::{DateTime, Months, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{EngineError, FlatRate, ResultEngine, money};

/// One row of a freshly generated schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduledInstallment {
    pub sequence_number: u32,
    pub due_date: NaiveDate,
    pub amount_due_minor: i64,
}

/// Builds the full repayment schedule of a flat-rate loan.
///
/// The interest is computed once on the principal. Every installment gets
/// `total / term`, the last one also takes the remainder. Installment `n` is
/// due `n` months after `disbursed_on`, clamped to the end of shorter months.
pub fn build_schedule(
    principal_minor: i64,
    term_months: u32,
    rate: FlatRate,
    disbursed_on: NaiveDate,
) -> ResultEngine<Vec<ScheduledInstallment>> {
    if principal_minor <= 0 {
        return Err(EngineError::InvalidInput(
            "principal must be > 0".to_string(),
        ));
    }
    let total = money::flat_total(principal_minor, rate)?;
    let amounts = money::split_evenly(total, term_months)?;

    amounts
        .into_iter()
        .zip(1..=term_months)
        .map(|(amount_due_minor, sequence_number)| {
            let due_date = disbursed_on
                .checked_add_months(Months::new(sequence_number))
                .ok_or_else(|| EngineError::InvalidInput("due date out of range".to_string()))?;
            Ok(ScheduledInstallment {
                sequence_number,
                due_date,
                amount_due_minor,
            })
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    pub id: i64,
    pub loan_id: i64,
    pub sequence_number: u32,
    pub due_date: NaiveDate,
    pub amount_due_minor: i64,
    pub payment_date: Option<DateTime<Utc>>,
    pub paid_amount_minor: Option<i64>,
    pub late_fee_minor: i64,
}

impl Installment {
    pub fn is_paid(&self) -> bool {
        self.payment_date.is_some()
    }

    /// Late when the payment's calendar day (UTC) is after the due date.
    pub fn is_late_on(&self, payment_date: DateTime<Utc>) -> bool {
        payment_date.date_naive() > self.due_date
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "installments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub loan_id: i64,
    pub sequence_number: i32,
    pub due_date: Date,
    pub amount_due_minor: i64,
    pub payment_date: Option<DateTimeUtc>,
    pub paid_amount_minor: Option<i64>,
    pub late_fee_minor: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::loans::Entity",
        from = "Column::LoanId",
        to = "super::loans::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Loans,
}

impl Related<super::loans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Installment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let sequence_number = u32::try_from(model.sequence_number).map_err(|_| {
            EngineError::InvalidInput("sequence_number out of range".to_string())
        })?;
        Ok(Self {
            id: model.id,
            loan_id: model.loan_id,
            sequence_number,
            due_date: model.due_date,
            amount_due_minor: model.amount_due_minor,
            payment_date: model.payment_date,
            paid_amount_minor: model.paid_amount_minor,
            late_fee_minor: model.late_fee_minor,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn ten_month_schedule_at_twelve_percent() {
        let rate = FlatRate::from_bps(1200).unwrap();
        let schedule = build_schedule(1_000_000, 10, rate, date(2026, 1, 15)).unwrap();

        assert_eq!(schedule.len(), 10);
        assert!(schedule.iter().all(|i| i.amount_due_minor == 112_000));
        assert_eq!(
            schedule.iter().map(|i| i.amount_due_minor).sum::<i64>(),
            1_120_000
        );
        assert_eq!(schedule[0].sequence_number, 1);
        assert_eq!(schedule[0].due_date, date(2026, 2, 15));
        assert_eq!(schedule[9].sequence_number, 10);
        assert_eq!(schedule[9].due_date, date(2026, 11, 15));
    }

    #[test]
    fn uneven_total_goes_to_last_installment() {
        let schedule = build_schedule(1_000, 3, FlatRate::ZERO, date(2026, 3, 1)).unwrap();
        let amounts: Vec<i64> = schedule.iter().map(|i| i.amount_due_minor).collect();
        assert_eq!(amounts, vec![333, 333, 334]);
    }

    #[test]
    fn due_dates_clamp_to_month_end() {
        let schedule = build_schedule(300, 3, FlatRate::ZERO, date(2026, 1, 31)).unwrap();
        let due: Vec<NaiveDate> = schedule.iter().map(|i| i.due_date).collect();
        assert_eq!(
            due,
            vec![date(2026, 2, 28), date(2026, 3, 31), date(2026, 4, 30)]
        );
    }

    #[test]
    fn rejects_empty_loans() {
        assert!(matches!(
            build_schedule(0, 10, FlatRate::ZERO, date(2026, 1, 1)),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            build_schedule(1_000, 0, FlatRate::ZERO, date(2026, 1, 1)),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn lateness_compares_calendar_days() {
        let installment = Installment {
            id: 1,
            loan_id: 1,
            sequence_number: 1,
            due_date: date(2026, 2, 15),
            amount_due_minor: 112_000,
            payment_date: None,
            paid_amount_minor: None,
            late_fee_minor: 0,
        };
        let end_of_due_day = Utc.with_ymd_and_hms(2026, 2, 15, 23, 59, 59).unwrap();
        let next_day = Utc.with_ymd_and_hms(2026, 2, 16, 0, 0, 0).unwrap();

        assert!(!installment.is_late_on(end_of_due_day));
        assert!(installment.is_late_on(next_day));
    }
}
