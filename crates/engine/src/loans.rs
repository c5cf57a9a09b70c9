//! Loans and their lifecycle status.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{EngineError, FlatRate};

/// Loan lifecycle. Moves only forward, one step at a time:
/// `application -> approved -> active -> settled`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Application,
    Approved,
    Active,
    Settled,
}

impl LoanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Approved => "approved",
            Self::Active => "active",
            Self::Settled => "settled",
        }
    }

    /// The only status a loan may move to from `self`, if any.
    pub fn next(self) -> Option<LoanStatus> {
        match self {
            Self::Application => Some(Self::Approved),
            Self::Approved => Some(Self::Active),
            Self::Active => Some(Self::Settled),
            Self::Settled => None,
        }
    }
}

impl TryFrom<&str> for LoanStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "application" => Ok(Self::Application),
            "approved" => Ok(Self::Approved),
            "active" => Ok(Self::Active),
            "settled" => Ok(Self::Settled),
            other => Err(EngineError::InvalidInput(format!(
                "invalid loan status: {other}"
            ))),
        }
    }
}

/// Longest accepted term. Bounds the schedule written at disbursement.
pub const MAX_TERM_MONTHS: u32 = 600;

/// `PJ-<year>-<id padded to 6 digits>`.
pub fn format_loan_number(year: i32, id: i64) -> String {
    format!("PJ-{year}-{id:06}")
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: i64,
    pub member_id: i64,
    pub loan_number: String,
    pub application_date: DateTime<Utc>,
    pub approval_date: Option<DateTime<Utc>>,
    pub disbursement_date: Option<DateTime<Utc>>,
    pub principal_minor: i64,
    pub term_months: u32,
    pub flat_rate: FlatRate,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub member_id: i64,
    #[sea_orm(unique)]
    pub loan_number: Option<String>,
    pub application_date: DateTimeUtc,
    pub approval_date: Option<DateTimeUtc>,
    pub disbursement_date: Option<DateTimeUtc>,
    pub principal_minor: i64,
    pub term_months: i32,
    pub flat_rate_bps: i64,
    pub status: String,
    pub created_at: DateTimeUtc,
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
    #[sea_orm(has_many = "super::installments::Entity")]
    Installments,
}

impl Related<super::members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::installments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Installments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Loan {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let loan_number = model.loan_number.ok_or_else(|| {
            EngineError::InvalidInput(format!("loan {} has no loan number", model.id))
        })?;
        let term_months = u32::try_from(model.term_months)
            .map_err(|_| EngineError::InvalidInput("term_months out of range".to_string()))?;

        Ok(Self {
            id: model.id,
            member_id: model.member_id,
            loan_number,
            application_date: model.application_date,
            approval_date: model.approval_date,
            disbursement_date: model.disbursement_date,
            principal_minor: model.principal_minor,
            term_months,
            flat_rate: FlatRate::from_bps(model.flat_rate_bps)?,
            status: LoanStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
