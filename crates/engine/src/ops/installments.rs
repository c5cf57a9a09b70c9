use chrono::Utc;
use sea_orm::{
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, Installment, LoanStatus, PaymentCmd, ResultEngine, installments, loans, money,
};

use super::{
    Engine,
    access::{advance_loan, require_installment, require_loan},
    require_positive_amount, with_tx,
};

/// Result of paying one installment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub installment: Installment,
    /// `true` when this payment settled the last open installment of the loan.
    pub loan_settled: bool,
}

impl Engine {
    /// Pays one installment in full.
    ///
    /// Checks, in order: the installment exists, it is not paid yet, the amount
    /// covers `amount_due`. A payment dated after the due day carries a 1% late
    /// fee. Paying the last open installment moves the loan to `settled`.
    pub async fn pay(&self, cmd: PaymentCmd) -> ResultEngine<PaymentOutcome> {
        require_positive_amount(cmd.amount_minor, "amount_minor")?;
        let payment_date = cmd.payment_date.unwrap_or_else(Utc::now);
        let installment_id = cmd.installment_id;

        let outcome = with_tx!(self, |db_tx| {
            let claimed = installments::Entity::update_many()
                .col_expr(installments::Column::PaymentDate, Expr::value(payment_date))
                .filter(installments::Column::Id.eq(installment_id))
                .filter(installments::Column::PaymentDate.is_null())
                .exec(&db_tx)
                .await?;
            if claimed.rows_affected == 0 {
                require_installment(&db_tx, installment_id).await?;
                return Err(EngineError::AlreadyPaid(format!(
                    "installment {installment_id}"
                )));
            }

            let mut installment =
                Installment::try_from(require_installment(&db_tx, installment_id).await?)?;
            if cmd.amount_minor < installment.amount_due_minor {
                return Err(EngineError::InsufficientPayment(format!(
                    "installment {installment_id} is due {}, paid {}",
                    installment.amount_due_minor, cmd.amount_minor
                )));
            }

            let late_fee_minor = if installment.is_late_on(payment_date) {
                money::late_fee(installment.amount_due_minor)?
            } else {
                0
            };
            installments::Entity::update_many()
                .col_expr(
                    installments::Column::PaidAmountMinor,
                    Expr::value(cmd.amount_minor),
                )
                .col_expr(installments::Column::LateFeeMinor, Expr::value(late_fee_minor))
                .filter(installments::Column::Id.eq(installment_id))
                .exec(&db_tx)
                .await?;
            installment.payment_date = Some(payment_date);
            installment.paid_amount_minor = Some(cmd.amount_minor);
            installment.late_fee_minor = late_fee_minor;

            // Serializes concurrent payments of the same loan before counting.
            let now = Utc::now();
            loans::Entity::update_many()
                .col_expr(loans::Column::UpdatedAt, Expr::value(now))
                .filter(loans::Column::Id.eq(installment.loan_id))
                .exec(&db_tx)
                .await?;

            let open = installments::Entity::find()
                .filter(installments::Column::LoanId.eq(installment.loan_id))
                .filter(installments::Column::PaymentDate.is_null())
                .count(&db_tx)
                .await?;

            let mut loan_settled = false;
            if open == 0 {
                let settled = advance_loan(installment.loan_id, LoanStatus::Active, now)?
                    .exec(&db_tx)
                    .await?;
                loan_settled = settled.rows_affected == 1;
            }

            Ok::<_, EngineError>(PaymentOutcome {
                installment,
                loan_settled,
            })
        })?;

        tracing::info!(
            installment_id,
            loan_id = outcome.installment.loan_id,
            late_fee_minor = outcome.installment.late_fee_minor,
            loan_settled = outcome.loan_settled,
            "installment paid"
        );
        Ok(outcome)
    }

    /// All installments of a loan ordered by sequence number.
    pub async fn installments(&self, loan_id: i64) -> ResultEngine<Vec<Installment>> {
        require_loan(&self.database, loan_id).await?;
        installments::Entity::find()
            .filter(installments::Column::LoanId.eq(loan_id))
            .order_by_asc(installments::Column::SequenceNumber)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Installment::try_from)
            .collect()
    }

    pub async fn installment(&self, installment_id: i64) -> ResultEngine<Installment> {
        Installment::try_from(require_installment(&self.database, installment_id).await?)
    }
}
