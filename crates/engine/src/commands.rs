//! Command structs for engine operations.
//!
//! These types group parameters for write operations (register, savings
//! movement, loan application, installment payment), keeping call sites
//! readable and avoiding long argument lists.

use chrono::{DateTime, Utc};

use crate::{MovementKind, SavingsCategory};

/// Register a new member in `pending` status.
#[derive(Clone, Debug)]
pub struct RegisterMemberCmd {
    pub member_number: String,
    pub name: String,
    pub nik: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub joined_at: Option<DateTime<Utc>>,
}

impl RegisterMemberCmd {
    #[must_use]
    pub fn new(
        member_number: impl Into<String>,
        name: impl Into<String>,
        nik: impl Into<String>,
    ) -> Self {
        Self {
            member_number: member_number.into(),
            name: name.into(),
            nik: nik.into(),
            address: None,
            phone: None,
            joined_at: None,
        }
    }

    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    #[must_use]
    pub fn joined_at(mut self, joined_at: DateTime<Utc>) -> Self {
        self.joined_at = Some(joined_at);
        self
    }
}

/// Record a deposit or a withdrawal on one savings account.
///
/// `occurred_at` defaults to now.
#[derive(Clone, Debug)]
pub struct MovementCmd {
    pub member_id: i64,
    pub category: SavingsCategory,
    pub kind: MovementKind,
    pub amount_minor: i64,
    pub occurred_at: Option<DateTime<Utc>>,
}

impl MovementCmd {
    #[must_use]
    pub fn new(
        member_id: i64,
        category: SavingsCategory,
        kind: MovementKind,
        amount_minor: i64,
    ) -> Self {
        Self {
            member_id,
            category,
            kind,
            amount_minor,
            occurred_at: None,
        }
    }

    #[must_use]
    pub fn deposit(member_id: i64, category: SavingsCategory, amount_minor: i64) -> Self {
        Self::new(member_id, category, MovementKind::Deposit, amount_minor)
    }

    #[must_use]
    pub fn withdrawal(member_id: i64, category: SavingsCategory, amount_minor: i64) -> Self {
        Self::new(member_id, category, MovementKind::Withdrawal, amount_minor)
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }
}

/// Open a loan application.
#[derive(Clone, Debug)]
pub struct LoanApplicationCmd {
    pub member_id: i64,
    pub principal_minor: i64,
    pub term_months: u32,
    pub flat_rate_bps: i64,
    pub application_date: Option<DateTime<Utc>>,
}

impl LoanApplicationCmd {
    #[must_use]
    pub fn new(member_id: i64, principal_minor: i64, term_months: u32, flat_rate_bps: i64) -> Self {
        Self {
            member_id,
            principal_minor,
            term_months,
            flat_rate_bps,
            application_date: None,
        }
    }

    #[must_use]
    pub fn application_date(mut self, application_date: DateTime<Utc>) -> Self {
        self.application_date = Some(application_date);
        self
    }
}

/// Pay one installment in full.
#[derive(Clone, Debug)]
pub struct PaymentCmd {
    pub installment_id: i64,
    pub amount_minor: i64,
    pub payment_date: Option<DateTime<Utc>>,
}

impl PaymentCmd {
    #[must_use]
    pub fn new(installment_id: i64, amount_minor: i64) -> Self {
        Self {
            installment_id,
            amount_minor,
            payment_date: None,
        }
    }

    #[must_use]
    pub fn payment_date(mut self, payment_date: DateTime<Utc>) -> Self {
        self.payment_date = Some(payment_date);
        self
    }
}
