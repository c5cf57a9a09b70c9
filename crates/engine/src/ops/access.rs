use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, UpdateMany, prelude::*, sea_query::Expr};

use crate::{
    EngineError, LoanStatus, ResultEngine, installments, loans, members,
};

use super::Engine;

impl Engine {
    /// Returns whether a member with `member_id` is registered.
    pub async fn member_exists(&self, member_id: i64) -> ResultEngine<bool> {
        member_exists_in(&self.database, member_id).await
    }

    /// Fails with `KeyNotFound` unless the member exists.
    ///
    /// Members are never deleted, so the check may run outside the transaction
    /// that depends on it.
    pub(super) async fn require_member_exists(&self, member_id: i64) -> ResultEngine<()> {
        if !self.member_exists(member_id).await? {
            return Err(member_not_found(member_id));
        }
        Ok(())
    }
}

async fn member_exists_in<C: ConnectionTrait>(db: &C, member_id: i64) -> ResultEngine<bool> {
    members::Entity::find_by_id(member_id)
        .one(db)
        .await
        .map(|model| model.is_some())
        .map_err(Into::into)
}

pub(super) fn member_not_found(member_id: i64) -> EngineError {
    EngineError::KeyNotFound(format!("member {member_id}"))
}

pub(super) fn loan_not_found(loan_id: i64) -> EngineError {
    EngineError::KeyNotFound(format!("loan {loan_id}"))
}

pub(super) async fn require_member<C: ConnectionTrait>(
    db: &C,
    member_id: i64,
) -> ResultEngine<members::Model> {
    members::Entity::find_by_id(member_id)
        .one(db)
        .await?
        .ok_or_else(|| member_not_found(member_id))
}

pub(super) async fn require_loan<C: ConnectionTrait>(
    db: &C,
    loan_id: i64,
) -> ResultEngine<loans::Model> {
    loans::Entity::find_by_id(loan_id)
        .one(db)
        .await?
        .ok_or_else(|| loan_not_found(loan_id))
}

pub(super) async fn require_installment<C: ConnectionTrait>(
    db: &C,
    installment_id: i64,
) -> ResultEngine<installments::Model> {
    installments::Entity::find_by_id(installment_id)
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("installment {installment_id}")))
}

/// Explains why a guarded `status = expected` update matched no row.
pub(super) async fn rejected_loan_transition<C: ConnectionTrait>(
    db: &C,
    loan_id: i64,
    expected: LoanStatus,
) -> EngineError {
    match require_loan(db, loan_id).await {
        Ok(model) => EngineError::InvalidTransition(format!(
            "loan {loan_id} is {}, expected {}",
            model.status,
            expected.as_str()
        )),
        Err(err) => err,
    }
}

/// Guarded update moving a loan from `from` to the status that follows it.
///
/// Matches no row unless the loan is still `from`; callers add their own date
/// columns before executing.
pub(super) fn advance_loan(
    loan_id: i64,
    from: LoanStatus,
    now: DateTime<Utc>,
) -> ResultEngine<UpdateMany<loans::Entity>> {
    let to = from.next().ok_or_else(|| {
        EngineError::InvalidTransition(format!("loan status {} is final", from.as_str()))
    })?;
    Ok(loans::Entity::update_many()
        .col_expr(loans::Column::Status, Expr::value(to.as_str()))
        .col_expr(loans::Column::UpdatedAt, Expr::value(now))
        .filter(loans::Column::Id.eq(loan_id))
        .filter(loans::Column::Status.eq(from.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settled_loans_cannot_advance() {
        let now = Utc::now();
        assert!(advance_loan(1, LoanStatus::Application, now).is_ok());
        assert!(advance_loan(1, LoanStatus::Active, now).is_ok());
        assert!(matches!(
            advance_loan(1, LoanStatus::Settled, now),
            Err(EngineError::InvalidTransition(_))
        ));
    }
}
