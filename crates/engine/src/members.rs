//! Cooperative members.
//!
//! The registry only owns identity and status. Ledger operations read it
//! through an existence check and never mutate it.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Pending,
    Verified,
    Active,
}

impl MemberStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Active => "active",
        }
    }

    /// Whether the registry may move a member from `self` to `next`.
    ///
    /// Activation straight from `pending` is accepted: the back office can
    /// verify and activate in one step.
    pub fn can_move_to(self, next: MemberStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Verified)
                | (Self::Pending, Self::Active)
                | (Self::Verified, Self::Active)
        )
    }
}

impl TryFrom<&str> for MemberStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "active" => Ok(Self::Active),
            other => Err(EngineError::InvalidInput(format!(
                "invalid member status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub member_number: String,
    pub name: String,
    pub nik: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub status: MemberStatus,
    pub joined_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "members")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub member_number: String,
    pub name: String,
    pub nik: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub status: String,
    pub joined_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::savings::Entity")]
    SavingsMovements,
    #[sea_orm(has_many = "super::loans::Entity")]
    Loans,
}

impl Related<super::savings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SavingsMovements.def()
    }
}

impl Related<super::loans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Member {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            member_number: model.member_number,
            name: model.name,
            nik: model.nik,
            address: model.address,
            phone: model.phone,
            status: MemberStatus::try_from(model.status.as_str())?,
            joined_at: model.joined_at,
            created_at: model.created_at,
        })
    }
}
