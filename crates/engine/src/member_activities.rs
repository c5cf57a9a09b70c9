//! Append-only history of a member's registration and status changes.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, MemberStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberActivityKind {
    Registered,
    Verified,
    Activated,
}

impl MemberActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Verified => "verified",
            Self::Activated => "activated",
        }
    }

    /// The activity recorded when a member enters `status`.
    pub fn entering(status: MemberStatus) -> Self {
        match status {
            MemberStatus::Pending => Self::Registered,
            MemberStatus::Verified => Self::Verified,
            MemberStatus::Active => Self::Activated,
        }
    }
}

impl TryFrom<&str> for MemberActivityKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "registered" => Ok(Self::Registered),
            "verified" => Ok(Self::Verified),
            "activated" => Ok(Self::Activated),
            other => Err(EngineError::InvalidInput(format!(
                "invalid member activity: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberActivity {
    pub id: i64,
    pub member_id: i64,
    pub kind: MemberActivityKind,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "member_activities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub member_id: i64,
    pub activity: String,
    pub occurred_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::members::Entity",
        from = "Column::MemberId",
        to = "super::members::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Members,
}

impl Related<super::members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn new_activity(
    member_id: i64,
    kind: MemberActivityKind,
    occurred_at: DateTime<Utc>,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        member_id: ActiveValue::Set(member_id),
        activity: ActiveValue::Set(kind.as_str().to_string()),
        occurred_at: ActiveValue::Set(occurred_at),
    }
}

impl TryFrom<Model> for MemberActivity {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            member_id: model.member_id,
            kind: MemberActivityKind::try_from(model.activity.as_str())?,
            occurred_at: model.occurred_at,
        })
    }
}
