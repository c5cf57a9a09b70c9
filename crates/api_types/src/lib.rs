use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    /// Stable machine-readable kind, e.g. `insufficient_balance`.
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

pub mod member {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MemberStatus {
        Pending,
        Verified,
        Active,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberNew {
        pub member_number: String,
        pub name: String,
        /// National identity number.
        pub nik: String,
        pub address: Option<String>,
        pub phone: Option<String>,
        /// RFC3339 timestamp. If absent, server uses now().
        pub joined_at: Option<DateTime<FixedOffset>>,
    }

    /// Query string of `GET /api/members`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct MemberList {
        pub status: Option<MemberStatus>,
        /// Free-text search over name, NIK and member number.
        pub q: Option<String>,
        pub limit: Option<u64>,
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
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

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberListResponse {
        pub members: Vec<MemberView>,
        pub next_cursor: Option<String>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MemberActivityKind {
        Registered,
        Verified,
        Activated,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberActivityView {
        pub id: i64,
        pub kind: MemberActivityKind,
        pub occurred_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberActivityListResponse {
        pub member_id: i64,
        pub activities: Vec<MemberActivityView>,
    }
}

pub mod savings {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SavingsCategory {
        Mandatory,
        Voluntary,
        Special,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MovementKind {
        Deposit,
        Withdrawal,
    }

    /// Body of `POST /api/savings/deposit` and `POST /api/savings/withdrawal`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MovementNew {
        pub member_id: i64,
        pub category: SavingsCategory,
        /// Must be > 0.
        pub amount_minor: i64,
        /// RFC3339 timestamp. If absent, server uses now().
        pub occurred_at: Option<DateTime<FixedOffset>>,
    }

    /// Query string of `GET /api/savings`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct MovementList {
        pub member_id: Option<i64>,
        pub category: Option<SavingsCategory>,
        pub limit: Option<u64>,
        /// Opaque pagination cursor, from `next_cursor`.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MovementView {
        pub id: i64,
        pub member_id: i64,
        pub category: SavingsCategory,
        pub kind: MovementKind,
        pub occurred_at: DateTime<Utc>,
        pub amount_minor: i64,
        pub balance_after_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Balances {
        pub member_id: i64,
        pub mandatory_minor: i64,
        pub voluntary_minor: i64,
        pub special_minor: i64,
        pub total_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MovementListResponse {
        pub movements: Vec<MovementView>,
        /// Present when the list is filtered by member.
        pub balances: Option<Balances>,
        pub next_cursor: Option<String>,
    }
}

pub mod loan {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum LoanStatus {
        Application,
        Approved,
        Active,
        Settled,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoanNew {
        pub member_id: i64,
        pub principal_minor: i64,
        pub term_months: u32,
        /// Flat yearly rate in basis points (12% = 1200).
        pub flat_rate_bps: i64,
        /// RFC3339 timestamp. If absent, server uses now().
        pub application_date: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct LoanApprove {
        /// If absent, server uses now().
        pub approved_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct LoanDisburse {
        /// If absent, server uses now(). Due dates follow its calendar day.
        pub disbursed_at: Option<DateTime<FixedOffset>>,
    }

    /// Query string of `GET /api/loans`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct LoanList {
        pub member_id: Option<i64>,
        pub status: Option<LoanStatus>,
        pub limit: Option<u64>,
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoanView {
        pub id: i64,
        pub member_id: i64,
        pub loan_number: String,
        pub application_date: DateTime<Utc>,
        pub approval_date: Option<DateTime<Utc>>,
        pub disbursement_date: Option<DateTime<Utc>>,
        pub principal_minor: i64,
        pub term_months: u32,
        pub flat_rate_bps: i64,
        pub status: LoanStatus,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoanListResponse {
        pub loans: Vec<LoanView>,
        pub next_cursor: Option<String>,
    }
}

pub mod installment {
    use super::*;

    /// Query string of `GET /api/installments`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct InstallmentList {
        pub loan_id: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InstallmentView {
        pub id: i64,
        pub loan_id: i64,
        pub sequence_number: u32,
        pub due_date: NaiveDate,
        pub amount_due_minor: i64,
        pub payment_date: Option<DateTime<Utc>>,
        pub paid_amount_minor: Option<i64>,
        pub late_fee_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InstallmentListResponse {
        pub installments: Vec<InstallmentView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentNew {
        /// Must cover the amount due.
        pub amount_minor: i64,
        /// RFC3339 timestamp. If absent, server uses now().
        pub payment_date: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentResponse {
        pub installment: InstallmentView,
        /// `true` when this payment closed the loan.
        pub loan_settled: bool,
    }
}
