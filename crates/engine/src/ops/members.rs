use chrono::Utc;
use sea_orm::{
    ActiveValue, Condition, QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait,
    prelude::*, sea_query::Expr,
};

use crate::{
    EngineError, Member, MemberActivity, MemberActivityKind, MemberStatus, RegisterMemberCmd,
    ResultEngine, member_activities, member_activities::new_activity, members,
};

use super::{
    Engine,
    access::{member_not_found, require_member},
    cursor::{PageCursor, clamp_limit, finish_page},
    normalize_optional_text, normalize_required_text, with_tx,
};

/// Filters for listing members.
#[derive(Clone, Debug, Default)]
pub struct MemberListFilter {
    pub status: Option<MemberStatus>,
    /// Case-insensitive substring over name, NIK and member number.
    pub query: Option<String>,
}

impl Engine {
    /// Registers a new member in `pending` status.
    pub async fn register_member(&self, cmd: RegisterMemberCmd) -> ResultEngine<Member> {
        let member_number = normalize_required_text(&cmd.member_number, "member_number")?;
        let name = normalize_required_text(&cmd.name, "name")?;
        let nik = normalize_required_text(&cmd.nik, "nik")?;
        let now = Utc::now();

        let existing = members::Entity::find()
            .filter(members::Column::MemberNumber.eq(member_number.as_str()))
            .one(&self.database)
            .await?;
        if existing.is_some() {
            return Err(EngineError::ExistingKey(member_number));
        }

        let active = members::ActiveModel {
            id: ActiveValue::NotSet,
            member_number: ActiveValue::Set(member_number.clone()),
            name: ActiveValue::Set(name),
            nik: ActiveValue::Set(nik),
            address: ActiveValue::Set(normalize_optional_text(cmd.address.as_deref())),
            phone: ActiveValue::Set(normalize_optional_text(cmd.phone.as_deref())),
            status: ActiveValue::Set(MemberStatus::Pending.as_str().to_string()),
            joined_at: ActiveValue::Set(cmd.joined_at.unwrap_or(now)),
            created_at: ActiveValue::Set(now),
        };
        let model = with_tx!(self, |db_tx| {
            // A concurrent registration can still win the unique index.
            let model = active
                .insert(&db_tx)
                .await
                .map_err(|err| match err.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => {
                        EngineError::ExistingKey(member_number.clone())
                    }
                    _ => err.into(),
                })?;
            new_activity(model.id, MemberActivityKind::Registered, now)
                .insert(&db_tx)
                .await?;
            Ok::<_, EngineError>(model)
        })?;

        tracing::info!(member_id = model.id, member_number = %model.member_number, "member registered");
        Member::try_from(model)
    }

    pub async fn member(&self, member_id: i64) -> ResultEngine<Member> {
        Member::try_from(require_member(&self.database, member_id).await?)
    }

    /// Lists members newest first by `(created_at DESC, id DESC)`.
    pub async fn list_members_page(
        &self,
        filter: &MemberListFilter,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<Member>, Option<String>)> {
        let limit = clamp_limit(limit);
        let mut query = members::Entity::find()
            .order_by_desc(members::Column::CreatedAt)
            .order_by_desc(members::Column::Id)
            .limit(limit.saturating_add(1));

        if let Some(status) = filter.status {
            query = query.filter(members::Column::Status.eq(status.as_str()));
        }
        if let Some(q) = normalize_optional_text(filter.query.as_deref()) {
            query = query.filter(
                Condition::any()
                    .add(members::Column::Name.contains(q.as_str()))
                    .add(members::Column::Nik.contains(q.as_str()))
                    .add(members::Column::MemberNumber.contains(q.as_str())),
            );
        }
        if let Some(cursor) = cursor {
            let cursor = PageCursor::decode(cursor)?;
            query = query.filter(
                Condition::any()
                    .add(members::Column::CreatedAt.lt(cursor.at))
                    .add(
                        Condition::all()
                            .add(members::Column::CreatedAt.eq(cursor.at))
                            .add(members::Column::Id.lt(cursor.id)),
                    ),
            );
        }

        let rows = query
            .all(&self.database)
            .await?
            .into_iter()
            .map(Member::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        finish_page(rows, limit, |m| PageCursor {
            at: m.created_at,
            id: m.id,
        })
    }

    /// `pending -> verified`.
    pub async fn verify_member(&self, member_id: i64) -> ResultEngine<Member> {
        self.move_member(member_id, MemberStatus::Verified).await
    }

    /// `verified -> active`, or straight from `pending`.
    pub async fn activate_member(&self, member_id: i64) -> ResultEngine<Member> {
        self.move_member(member_id, MemberStatus::Active).await
    }

    async fn move_member(&self, member_id: i64, next: MemberStatus) -> ResultEngine<Member> {
        let allowed_from: Vec<&str> = [MemberStatus::Pending, MemberStatus::Verified]
            .into_iter()
            .filter(|from| from.can_move_to(next))
            .map(MemberStatus::as_str)
            .collect();

        let model = with_tx!(self, |db_tx| {
            let updated = members::Entity::update_many()
                .col_expr(members::Column::Status, Expr::value(next.as_str()))
                .filter(members::Column::Id.eq(member_id))
                .filter(members::Column::Status.is_in(allowed_from))
                .exec(&db_tx)
                .await?;

            if updated.rows_affected == 0 {
                let current = members::Entity::find_by_id(member_id)
                    .one(&db_tx)
                    .await?
                    .ok_or_else(|| member_not_found(member_id))?;
                return Err(EngineError::InvalidTransition(format!(
                    "member {member_id} is {}, cannot become {}",
                    current.status,
                    next.as_str()
                )));
            }

            new_activity(member_id, MemberActivityKind::entering(next), Utc::now())
                .insert(&db_tx)
                .await?;

            require_member(&db_tx, member_id).await
        })?;

        tracing::info!(member_id, status = next.as_str(), "member status changed");
        Member::try_from(model)
    }

    /// Registration and status history of a member, oldest first.
    pub async fn member_activities(&self, member_id: i64) -> ResultEngine<Vec<MemberActivity>> {
        self.require_member_exists(member_id).await?;
        member_activities::Entity::find()
            .filter(member_activities::Column::MemberId.eq(member_id))
            .order_by_asc(member_activities::Column::OccurredAt)
            .order_by_asc(member_activities::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(MemberActivity::try_from)
            .collect()
    }
}
