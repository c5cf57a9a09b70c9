//! Ledger and loan lifecycle engine of the cooperative.
//!
//! The [`Engine`] owns a `sea_orm` connection and exposes every write and
//! read operation of the member registry, the savings ledger, the loan
//! lifecycle and installment settlement. Each write runs in one database
//! transaction and either applies completely or not at all.

pub use commands::{LoanApplicationCmd, MovementCmd, PaymentCmd, RegisterMemberCmd};
pub use error::EngineError;
pub use installments::{Installment, ScheduledInstallment, build_schedule};
pub use loans::{Loan, LoanStatus, MAX_TERM_MONTHS, format_loan_number};
pub use member_activities::{MemberActivity, MemberActivityKind};
pub use members::{Member, MemberStatus};
pub use money::{BPS_SCALE, FlatRate, LATE_FEE_BPS};
pub use ops::{
    Engine, EngineBuilder, LoanListFilter, MAX_PAGE_LIMIT, MemberListFilter, MovementListFilter,
    PaymentOutcome,
};
pub use savings::{MovementKind, SavingsCategory, SavingsMovement};
pub use savings_balances::SavingsBalances;

mod commands;
mod error;
mod installments;
mod loans;
mod member_activities;
mod members;
pub mod money;
mod ops;
mod savings;
mod savings_balances;

pub type ResultEngine<T> = Result<T, EngineError>;
