//! Initial schema migration - creates all tables from scratch.
//!
//! - `members`: cooperative members (registry)
//! - `savings_movements`: append-only deposits/withdrawals with running balance
//! - `savings_balances`: current balance per member and category
//! - `loans`: loan records and their lifecycle status
//! - `installments`: repayment schedule generated at disbursement

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Members {
    Table,
    Id,
    MemberNumber,
    Name,
    Nik,
    Address,
    Phone,
    Status,
    JoinedAt,
    CreatedAt,
}

#[derive(Iden)]
enum SavingsMovements {
    Table,
    Id,
    MemberId,
    Category,
    Kind,
    OccurredAt,
    AmountMinor,
    BalanceAfterMinor,
    CreatedAt,
}

#[derive(Iden)]
enum SavingsBalances {
    Table,
    MemberId,
    Category,
    BalanceMinor,
    UpdatedAt,
}

#[derive(Iden)]
enum Loans {
    Table,
    Id,
    MemberId,
    LoanNumber,
    ApplicationDate,
    ApprovalDate,
    DisbursementDate,
    PrincipalMinor,
    TermMonths,
    FlatRateBps,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Installments {
    Table,
    Id,
    LoanId,
    SequenceNumber,
    DueDate,
    AmountDueMinor,
    PaymentDate,
    PaidAmountMinor,
    LateFeeMinor,
    CreatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Members
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Members::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Members::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Members::MemberNumber).string().not_null())
                    .col(ColumnDef::new(Members::Name).string().not_null())
                    .col(ColumnDef::new(Members::Nik).string().not_null())
                    .col(ColumnDef::new(Members::Address).string())
                    .col(ColumnDef::new(Members::Phone).string())
                    .col(
                        ColumnDef::new(Members::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Members::JoinedAt).timestamp().not_null())
                    .col(ColumnDef::new(Members::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-members-member_number-unique")
                    .table(Members::Table)
                    .col(Members::MemberNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Savings movements
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SavingsMovements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SavingsMovements::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SavingsMovements::MemberId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SavingsMovements::Category).string().not_null())
                    .col(ColumnDef::new(SavingsMovements::Kind).string().not_null())
                    .col(
                        ColumnDef::new(SavingsMovements::OccurredAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SavingsMovements::AmountMinor)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(SavingsMovements::AmountMinor).gt(0)),
                    )
                    .col(
                        ColumnDef::new(SavingsMovements::BalanceAfterMinor)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(SavingsMovements::BalanceAfterMinor).gte(0)),
                    )
                    .col(
                        ColumnDef::new(SavingsMovements::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-savings_movements-member_id")
                            .from(SavingsMovements::Table, SavingsMovements::MemberId)
                            .to(Members::Table, Members::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-savings_movements-member_id-category-occurred_at")
                    .table(SavingsMovements::Table)
                    .col(SavingsMovements::MemberId)
                    .col(SavingsMovements::Category)
                    .col(SavingsMovements::OccurredAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Savings balances
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SavingsBalances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SavingsBalances::MemberId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SavingsBalances::Category).string().not_null())
                    .col(
                        ColumnDef::new(SavingsBalances::BalanceMinor)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(SavingsBalances::BalanceMinor).gte(0)),
                    )
                    .col(
                        ColumnDef::new(SavingsBalances::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(SavingsBalances::MemberId)
                            .col(SavingsBalances::Category),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-savings_balances-member_id")
                            .from(SavingsBalances::Table, SavingsBalances::MemberId)
                            .to(Members::Table, Members::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Loans
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Loans::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Loans::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Loans::MemberId).big_integer().not_null())
                    .col(ColumnDef::new(Loans::LoanNumber).string())
                    .col(ColumnDef::new(Loans::ApplicationDate).timestamp().not_null())
                    .col(ColumnDef::new(Loans::ApprovalDate).timestamp())
                    .col(ColumnDef::new(Loans::DisbursementDate).timestamp())
                    .col(
                        ColumnDef::new(Loans::PrincipalMinor)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(Loans::PrincipalMinor).gt(0)),
                    )
                    .col(
                        ColumnDef::new(Loans::TermMonths)
                            .integer()
                            .not_null()
                            .check(Expr::col(Loans::TermMonths).gt(0)),
                    )
                    .col(
                        ColumnDef::new(Loans::FlatRateBps)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(Loans::FlatRateBps).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Loans::Status)
                            .string()
                            .not_null()
                            .default("application"),
                    )
                    .col(ColumnDef::new(Loans::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Loans::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-loans-member_id")
                            .from(Loans::Table, Loans::MemberId)
                            .to(Members::Table, Members::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-loans-loan_number-unique")
                    .table(Loans::Table)
                    .col(Loans::LoanNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-loans-member_id-status")
                    .table(Loans::Table)
                    .col(Loans::MemberId)
                    .col(Loans::Status)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Installments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Installments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Installments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Installments::LoanId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Installments::SequenceNumber)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Installments::DueDate).date().not_null())
                    .col(
                        ColumnDef::new(Installments::AmountDueMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Installments::PaymentDate).timestamp())
                    .col(ColumnDef::new(Installments::PaidAmountMinor).big_integer())
                    .col(
                        ColumnDef::new(Installments::LateFeeMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Installments::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-installments-loan_id")
                            .from(Installments::Table, Installments::LoanId)
                            .to(Loans::Table, Loans::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Guards against generating a schedule twice for the same loan.
        manager
            .create_index(
                Index::create()
                    .name("idx-installments-loan_id-sequence_number-unique")
                    .table(Installments::Table)
                    .col(Installments::LoanId)
                    .col(Installments::SequenceNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Installments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Loans::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SavingsBalances::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SavingsMovements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Members::Table).to_owned())
            .await?;
        Ok(())
    }
}
