//! Registry history: one row per registration and status change of a member.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum MemberActivities {
    Table,
    Id,
    MemberId,
    Activity,
    OccurredAt,
}

#[derive(Iden)]
enum Members {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MemberActivities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MemberActivities::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MemberActivities::MemberId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MemberActivities::Activity)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MemberActivities::OccurredAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-member_activities-member_id")
                            .from(MemberActivities::Table, MemberActivities::MemberId)
                            .to(Members::Table, Members::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-member_activities-member_id")
                    .table(MemberActivities::Table)
                    .col(MemberActivities::MemberId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MemberActivities::Table).to_owned())
            .await?;
        Ok(())
    }
}
