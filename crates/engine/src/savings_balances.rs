//! Denormalized running balance per `(member, category)`.
//!
//! The row is written first in every movement transaction, so its lock
//! serializes all movements of the same account.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::SavingsCategory;

/// Current balances of one member, one field per category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsBalances {
    pub member_id: i64,
    pub mandatory_minor: i64,
    pub voluntary_minor: i64,
    pub special_minor: i64,
}

impl SavingsBalances {
    pub fn new(member_id: i64) -> Self {
        Self {
            member_id,
            ..Default::default()
        }
    }

    pub fn get(&self, category: SavingsCategory) -> i64 {
        match category {
            SavingsCategory::Mandatory => self.mandatory_minor,
            SavingsCategory::Voluntary => self.voluntary_minor,
            SavingsCategory::Special => self.special_minor,
        }
    }

    pub(crate) fn set(&mut self, category: SavingsCategory, balance_minor: i64) {
        match category {
            SavingsCategory::Mandatory => self.mandatory_minor = balance_minor,
            SavingsCategory::Voluntary => self.voluntary_minor = balance_minor,
            SavingsCategory::Special => self.special_minor = balance_minor,
        }
    }

    pub fn total_minor(&self) -> i64 {
        self.mandatory_minor + self.voluntary_minor + self.special_minor
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "savings_balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub member_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub category: String,
    pub balance_minor: i64,
    pub updated_at: DateTimeUtc,
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
