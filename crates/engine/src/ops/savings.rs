use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
    prelude::*,
    sea_query::{Expr, OnConflict},
};

use crate::{
    EngineError, MovementCmd, MovementKind, ResultEngine, SavingsBalances, SavingsCategory,
    SavingsMovement, savings, savings_balances,
};

use super::{
    Engine,
    cursor::{PageCursor, clamp_limit, finish_page},
    require_positive_amount, with_tx,
};

/// Filters for listing savings movements.
#[derive(Clone, Copy, Debug, Default)]
pub struct MovementListFilter {
    pub member_id: Option<i64>,
    pub category: Option<SavingsCategory>,
}

impl Engine {
    /// Appends one deposit or withdrawal to a `(member, category)` account and
    /// updates its running balance in the same transaction.
    ///
    /// The balance row is written before anything is read, so concurrent
    /// movements on the same account are applied one after the other.
    /// Withdrawals that would make the balance negative fail with
    /// `InsufficientBalance` and write nothing.
    pub async fn record_movement(&self, cmd: MovementCmd) -> ResultEngine<SavingsMovement> {
        require_positive_amount(cmd.amount_minor, "amount_minor")?;
        self.require_member_exists(cmd.member_id).await?;

        let now = Utc::now();
        let occurred_at = cmd.occurred_at.unwrap_or(now);
        let category = cmd.category;

        let model = with_tx!(self, |db_tx| {
            match cmd.kind {
                MovementKind::Deposit => {
                    credit_balance(&db_tx, cmd.member_id, category, cmd.amount_minor, now)
                        .await?;
                }
                MovementKind::Withdrawal => {
                    debit_balance(&db_tx, cmd.member_id, category, cmd.amount_minor, now)
                        .await?;
                }
            }

            let balance_after = current_balance(&db_tx, cmd.member_id, category).await?;
            let latest = latest_movement(&db_tx, cmd.member_id, category).await?;
            if let Some(latest) = &latest {
                if occurred_at < latest.occurred_at {
                    return Err(EngineError::InvalidInput(format!(
                        "occurred_at {occurred_at} is before the latest {} movement at {}",
                        category.as_str(),
                        latest.occurred_at
                    )));
                }
            }

            let previous = latest.map_or(0, |m| m.balance_after_minor);
            let expected = cmd.kind.apply(previous, cmd.amount_minor)?;
            if expected != balance_after {
                return Err(EngineError::InvalidInput(format!(
                    "{} balance of member {} is out of sync with its movements",
                    category.as_str(),
                    cmd.member_id
                )));
            }

            savings::new_movement(
                cmd.member_id,
                category,
                cmd.kind,
                occurred_at,
                cmd.amount_minor,
                balance_after,
            )
            .insert(&db_tx)
            .await
            .map_err(EngineError::from)
        })?;

        tracing::info!(
            member_id = model.member_id,
            category = %model.category,
            kind = %model.kind,
            amount_minor = model.amount_minor,
            balance_after_minor = model.balance_after_minor,
            "savings movement recorded"
        );
        SavingsMovement::try_from(model)
    }

    pub async fn deposit(
        &self,
        member_id: i64,
        category: SavingsCategory,
        amount_minor: i64,
        occurred_at: Option<DateTime<Utc>>,
    ) -> ResultEngine<SavingsMovement> {
        let mut cmd = MovementCmd::deposit(member_id, category, amount_minor);
        cmd.occurred_at = occurred_at;
        self.record_movement(cmd).await
    }

    pub async fn withdraw(
        &self,
        member_id: i64,
        category: SavingsCategory,
        amount_minor: i64,
        occurred_at: Option<DateTime<Utc>>,
    ) -> ResultEngine<SavingsMovement> {
        let mut cmd = MovementCmd::withdrawal(member_id, category, amount_minor);
        cmd.occurred_at = occurred_at;
        self.record_movement(cmd).await
    }

    /// Current balance of every category for a member; 0 where nothing was
    /// ever recorded.
    pub async fn savings_balances(&self, member_id: i64) -> ResultEngine<SavingsBalances> {
        self.require_member_exists(member_id).await?;

        let rows = savings_balances::Entity::find()
            .filter(savings_balances::Column::MemberId.eq(member_id))
            .all(&self.database)
            .await?;

        let mut balances = SavingsBalances::new(member_id);
        for row in rows {
            let category = SavingsCategory::try_from(row.category.as_str())?;
            balances.set(category, row.balance_minor);
        }
        Ok(balances)
    }

    /// Lists movements newest first by `(occurred_at DESC, id DESC)`.
    pub async fn list_movements_page(
        &self,
        filter: MovementListFilter,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<SavingsMovement>, Option<String>)> {
        let limit = clamp_limit(limit);
        let mut query = savings::Entity::find()
            .order_by_desc(savings::Column::OccurredAt)
            .order_by_desc(savings::Column::Id)
            .limit(limit.saturating_add(1));

        if let Some(member_id) = filter.member_id {
            query = query.filter(savings::Column::MemberId.eq(member_id));
        }
        if let Some(category) = filter.category {
            query = query.filter(savings::Column::Category.eq(category.as_str()));
        }
        if let Some(cursor) = cursor {
            let cursor = PageCursor::decode(cursor)?;
            query = query.filter(
                Condition::any()
                    .add(savings::Column::OccurredAt.lt(cursor.at))
                    .add(
                        Condition::all()
                            .add(savings::Column::OccurredAt.eq(cursor.at))
                            .add(savings::Column::Id.lt(cursor.id)),
                    ),
            );
        }

        let rows = query
            .all(&self.database)
            .await?
            .into_iter()
            .map(SavingsMovement::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        finish_page(rows, limit, |m| PageCursor {
            at: m.occurred_at,
            id: m.id,
        })
    }

    /// Replays the movement log of one account and rewrites its running
    /// balance from it.
    ///
    /// - Movements are replayed in `(occurred_at, id)` order.
    /// - Every `balance_after` must match the replay and never go negative,
    ///   otherwise nothing is written and `InvalidInput` is returned.
    pub async fn recompute_savings_balance(
        &self,
        member_id: i64,
        category: SavingsCategory,
    ) -> ResultEngine<i64> {
        self.require_member_exists(member_id).await?;
        let now = Utc::now();

        let balance = with_tx!(self, |db_tx| {
            // Takes the account lock before reading the log.
            credit_balance(&db_tx, member_id, category, 0, now).await?;

            let movements = savings::Entity::find()
                .filter(savings::Column::MemberId.eq(member_id))
                .filter(savings::Column::Category.eq(category.as_str()))
                .order_by_asc(savings::Column::OccurredAt)
                .order_by_asc(savings::Column::Id)
                .all(&db_tx)
                .await?;

            let mut balance = 0_i64;
            for model in movements {
                let movement = SavingsMovement::try_from(model)?;
                balance = movement
                    .kind
                    .apply(balance, movement.amount_minor)
                    .map_err(|_| {
                        EngineError::InvalidInput(format!(
                            "movement {} overdraws the account",
                            movement.id
                        ))
                    })?;
                if balance != movement.balance_after_minor {
                    return Err(EngineError::InvalidInput(format!(
                        "movement {} records balance {} but replay gives {balance}",
                        movement.id, movement.balance_after_minor
                    )));
                }
            }

            savings_balances::Entity::update_many()
                .col_expr(savings_balances::Column::BalanceMinor, Expr::value(balance))
                .col_expr(savings_balances::Column::UpdatedAt, Expr::value(now))
                .filter(savings_balances::Column::MemberId.eq(member_id))
                .filter(savings_balances::Column::Category.eq(category.as_str()))
                .exec(&db_tx)
                .await?;

            Ok::<_, EngineError>(balance)
        })?;

        tracing::info!(
            member_id,
            category = category.as_str(),
            balance_minor = balance,
            "savings balance recomputed"
        );
        Ok(balance)
    }
}

/// Adds `amount_minor` to the account, creating its row on first use.
async fn credit_balance(
    db: &DatabaseTransaction,
    member_id: i64,
    category: SavingsCategory,
    amount_minor: i64,
    now: DateTime<Utc>,
) -> ResultEngine<()> {
    let row = savings_balances::ActiveModel {
        member_id: ActiveValue::Set(member_id),
        category: ActiveValue::Set(category.as_str().to_string()),
        balance_minor: ActiveValue::Set(amount_minor),
        updated_at: ActiveValue::Set(now),
    };
    savings_balances::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([
                savings_balances::Column::MemberId,
                savings_balances::Column::Category,
            ])
            .value(
                savings_balances::Column::BalanceMinor,
                Expr::col((
                    savings_balances::Entity,
                    savings_balances::Column::BalanceMinor,
                ))
                .add(amount_minor),
            )
            .value(savings_balances::Column::UpdatedAt, now)
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Subtracts `amount_minor` only if the balance covers it.
async fn debit_balance(
    db: &DatabaseTransaction,
    member_id: i64,
    category: SavingsCategory,
    amount_minor: i64,
    now: DateTime<Utc>,
) -> ResultEngine<()> {
    let updated = savings_balances::Entity::update_many()
        .col_expr(
            savings_balances::Column::BalanceMinor,
            Expr::col(savings_balances::Column::BalanceMinor).sub(amount_minor),
        )
        .col_expr(savings_balances::Column::UpdatedAt, Expr::value(now))
        .filter(savings_balances::Column::MemberId.eq(member_id))
        .filter(savings_balances::Column::Category.eq(category.as_str()))
        .filter(savings_balances::Column::BalanceMinor.gte(amount_minor))
        .exec(db)
        .await?;

    if updated.rows_affected == 0 {
        let balance = current_balance(db, member_id, category).await?;
        return Err(EngineError::InsufficientBalance(format!(
            "{} balance is {balance}, requested {amount_minor}",
            category.as_str()
        )));
    }
    Ok(())
}

async fn current_balance(
    db: &DatabaseTransaction,
    member_id: i64,
    category: SavingsCategory,
) -> ResultEngine<i64> {
    let row = savings_balances::Entity::find_by_id((member_id, category.as_str().to_string()))
        .one(db)
        .await?;
    Ok(row.map_or(0, |r| r.balance_minor))
}

async fn latest_movement(
    db: &DatabaseTransaction,
    member_id: i64,
    category: SavingsCategory,
) -> ResultEngine<Option<savings::Model>> {
    savings::Entity::find()
        .filter(savings::Column::MemberId.eq(member_id))
        .filter(savings::Column::Category.eq(category.as_str()))
        .order_by_desc(savings::Column::OccurredAt)
        .order_by_desc(savings::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}
