use chrono::{DateTime, Datelike, Utc};
use sea_orm::{
    ActiveValue, Condition, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::{
    EngineError, FlatRate, Loan, LoanApplicationCmd, LoanStatus, MAX_TERM_MONTHS, ResultEngine,
    installments,
    installments::build_schedule, loans, loans::format_loan_number,
};

use super::{
    Engine,
    access::{advance_loan, rejected_loan_transition, require_loan},
    cursor::{PageCursor, clamp_limit, finish_page},
    require_positive_amount, with_tx,
};

/// Filters for listing loans.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoanListFilter {
    pub member_id: Option<i64>,
    pub status: Option<LoanStatus>,
}

impl Engine {
    /// Opens a loan application for an existing member.
    ///
    /// The loan number is derived from the generated id and written in the
    /// same transaction as the insert.
    pub async fn apply(&self, cmd: LoanApplicationCmd) -> ResultEngine<Loan> {
        require_positive_amount(cmd.principal_minor, "principal_minor")?;
        if cmd.term_months == 0 || cmd.term_months > MAX_TERM_MONTHS {
            return Err(EngineError::InvalidInput(format!(
                "term_months must be between 1 and {MAX_TERM_MONTHS}"
            )));
        }
        let term_months = i32::try_from(cmd.term_months)
            .map_err(|_| EngineError::InvalidInput("term_months out of range".to_string()))?;
        let rate = FlatRate::from_bps(cmd.flat_rate_bps)?;
        self.require_member_exists(cmd.member_id).await?;

        let now = Utc::now();
        let model = with_tx!(self, |db_tx| {
            let inserted = loans::ActiveModel {
                id: ActiveValue::NotSet,
                member_id: ActiveValue::Set(cmd.member_id),
                loan_number: ActiveValue::Set(None),
                application_date: ActiveValue::Set(cmd.application_date.unwrap_or(now)),
                approval_date: ActiveValue::Set(None),
                disbursement_date: ActiveValue::Set(None),
                principal_minor: ActiveValue::Set(cmd.principal_minor),
                term_months: ActiveValue::Set(term_months),
                flat_rate_bps: ActiveValue::Set(rate.bps()),
                status: ActiveValue::Set(LoanStatus::Application.as_str().to_string()),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
            }
            .insert(&db_tx)
            .await?;

            let loan_number = format_loan_number(inserted.created_at.year(), inserted.id);
            loans::Entity::update_many()
                .col_expr(loans::Column::LoanNumber, Expr::value(loan_number))
                .filter(loans::Column::Id.eq(inserted.id))
                .exec(&db_tx)
                .await?;

            require_loan(&db_tx, inserted.id).await
        })?;

        tracing::info!(
            loan_id = model.id,
            member_id = model.member_id,
            principal_minor = model.principal_minor,
            "loan application created"
        );
        Loan::try_from(model)
    }

    /// `application -> approved`.
    pub async fn approve(&self, loan_id: i64, approved_at: DateTime<Utc>) -> ResultEngine<Loan> {
        let model = with_tx!(self, |db_tx| {
            let updated = advance_loan(loan_id, LoanStatus::Application, Utc::now())?
                .col_expr(loans::Column::ApprovalDate, Expr::value(approved_at))
                .exec(&db_tx)
                .await?;
            if updated.rows_affected == 0 {
                return Err(
                    rejected_loan_transition(&db_tx, loan_id, LoanStatus::Application).await,
                );
            }

            require_loan(&db_tx, loan_id).await
        })?;

        tracing::info!(loan_id, "loan approved");
        Loan::try_from(model)
    }

    /// `approved -> active`, generating the whole installment schedule.
    ///
    /// A loan that is not `approved` is rejected with `InvalidTransition`, so a
    /// repeated call never creates a second schedule.
    pub async fn disburse(&self, loan_id: i64, disbursed_at: DateTime<Utc>) -> ResultEngine<Loan> {
        let now = Utc::now();
        let model = with_tx!(self, |db_tx| {
            let updated = advance_loan(loan_id, LoanStatus::Approved, now)?
                .col_expr(loans::Column::DisbursementDate, Expr::value(disbursed_at))
                .exec(&db_tx)
                .await?;
            if updated.rows_affected == 0 {
                return Err(rejected_loan_transition(&db_tx, loan_id, LoanStatus::Approved).await);
            }

            let model = require_loan(&db_tx, loan_id).await?;
            let loan = Loan::try_from(model.clone())?;
            let schedule = build_schedule(
                loan.principal_minor,
                loan.term_months,
                loan.flat_rate,
                disbursed_at.date_naive(),
            )?;

            let mut rows = Vec::with_capacity(schedule.len());
            for item in &schedule {
                let sequence_number = i32::try_from(item.sequence_number).map_err(|_| {
                    EngineError::InvalidInput("sequence_number out of range".to_string())
                })?;
                rows.push(installments::ActiveModel {
                    id: ActiveValue::NotSet,
                    loan_id: ActiveValue::Set(loan_id),
                    sequence_number: ActiveValue::Set(sequence_number),
                    due_date: ActiveValue::Set(item.due_date),
                    amount_due_minor: ActiveValue::Set(item.amount_due_minor),
                    payment_date: ActiveValue::Set(None),
                    paid_amount_minor: ActiveValue::Set(None),
                    late_fee_minor: ActiveValue::Set(0),
                    created_at: ActiveValue::Set(now),
                });
            }
            installments::Entity::insert_many(rows)
                .exec_without_returning(&db_tx)
                .await?;

            Ok::<_, EngineError>(model)
        })?;

        tracing::info!(
            loan_id,
            term_months = model.term_months,
            "loan disbursed, schedule generated"
        );
        Loan::try_from(model)
    }

    pub async fn loan(&self, loan_id: i64) -> ResultEngine<Loan> {
        Loan::try_from(require_loan(&self.database, loan_id).await?)
    }

    /// Lists loans newest first by `(application_date DESC, id DESC)`.
    pub async fn list_loans_page(
        &self,
        filter: LoanListFilter,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<Loan>, Option<String>)> {
        let limit = clamp_limit(limit);
        let mut query = loans::Entity::find()
            .order_by_desc(loans::Column::ApplicationDate)
            .order_by_desc(loans::Column::Id)
            .limit(limit.saturating_add(1));

        if let Some(member_id) = filter.member_id {
            query = query.filter(loans::Column::MemberId.eq(member_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(loans::Column::Status.eq(status.as_str()));
        }
        if let Some(cursor) = cursor {
            let cursor = PageCursor::decode(cursor)?;
            query = query.filter(
                Condition::any()
                    .add(loans::Column::ApplicationDate.lt(cursor.at))
                    .add(
                        Condition::all()
                            .add(loans::Column::ApplicationDate.eq(cursor.at))
                            .add(loans::Column::Id.lt(cursor.id)),
                    ),
            );
        }

        let rows = query
            .all(&self.database)
            .await?
            .into_iter()
            .map(Loan::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        finish_page(rows, limit, |loan| PageCursor {
            at: loan.application_date,
            id: loan.id,
        })
    }
}
