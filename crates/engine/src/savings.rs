//! Savings movements.
//!
//! A `SavingsMovement` is an append-only deposit or withdrawal on one
//! `(member, category)` account, carrying the balance right after it.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Savings class. Each member has an independent balance per category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavingsCategory {
    Mandatory,
    Voluntary,
    Special,
}

impl SavingsCategory {
    pub const ALL: [SavingsCategory; 3] = [Self::Mandatory, Self::Voluntary, Self::Special];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mandatory => "mandatory",
            Self::Voluntary => "voluntary",
            Self::Special => "special",
        }
    }
}

impl TryFrom<&str> for SavingsCategory {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mandatory" => Ok(Self::Mandatory),
            "voluntary" => Ok(Self::Voluntary),
            "special" => Ok(Self::Special),
            other => Err(EngineError::InvalidInput(format!(
                "invalid savings category: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Deposit,
    Withdrawal,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
        }
    }

    /// Applies a movement of `amount_minor` to `previous_minor`.
    ///
    /// Withdrawals never take the balance below zero.
    pub fn apply(self, previous_minor: i64, amount_minor: i64) -> ResultEngine<i64> {
        let overflow = || EngineError::InvalidInput("balance overflow".to_string());
        match self {
            Self::Deposit => previous_minor.checked_add(amount_minor).ok_or_else(overflow),
            Self::Withdrawal if amount_minor > previous_minor => {
                Err(EngineError::InsufficientBalance(format!(
                    "balance is {previous_minor}, requested {amount_minor}"
                )))
            }
            Self::Withdrawal => Ok(previous_minor - amount_minor),
        }
    }
}

impl TryFrom<&str> for MovementKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            other => Err(EngineError::InvalidInput(format!(
                "invalid movement kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsMovement {
    pub id: i64,
    pub member_id: i64,
    pub category: SavingsCategory,
    pub kind: MovementKind,
    pub occurred_at: DateTime<Utc>,
    pub amount_minor: i64,
    pub balance_after_minor: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "savings_movements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub member_id: i64,
    pub category: String,
    pub kind: String,
    pub occurred_at: DateTimeUtc,
    pub amount_minor: i64,
    pub balance_after_minor: i64,
    pub created_at: DateTimeUtc,
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

/// Builds the insert model for a new movement; `id` is assigned by the store.
pub(crate) fn new_movement(
    member_id: i64,
    category: SavingsCategory,
    kind: MovementKind,
    occurred_at: DateTime<Utc>,
    amount_minor: i64,
    balance_after_minor: i64,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        member_id: ActiveValue::Set(member_id),
        category: ActiveValue::Set(category.as_str().to_string()),
        kind: ActiveValue::Set(kind.as_str().to_string()),
        occurred_at: ActiveValue::Set(occurred_at),
        amount_minor: ActiveValue::Set(amount_minor),
        balance_after_minor: ActiveValue::Set(balance_after_minor),
        created_at: ActiveValue::Set(Utc::now()),
    }
}

impl TryFrom<Model> for SavingsMovement {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            member_id: model.member_id,
            category: SavingsCategory::try_from(model.category.as_str())?,
            kind: MovementKind::try_from(model.kind.as_str())?,
            occurred_at: model.occurred_at,
            amount_minor: model.amount_minor,
            balance_after_minor: model.balance_after_minor,
        })
    }
}
