use sea_orm_migration::prelude::*;

/// Credit accounts (用户余额, 每用户一行)
#[derive(DeriveIden)]
enum CreditAccounts {
    Table,
    Id,
    UserId,
    BalanceCents,
    NextSequence,
    CreatedAt,
    UpdatedAt,
}

/// Credit transactions (只追加的余额流水)
#[derive(DeriveIden)]
enum CreditTransactions {
    Table,
    Id,
    UserId,
    Sequence,
    TransactionType,
    AmountCents,
    BalanceAfterCents,
    ReferenceType,
    ReferenceId,
    Description,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CreditAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CreditAccounts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CreditAccounts::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CreditAccounts::BalanceCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CreditAccounts::NextSequence)
                            .big_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(CreditAccounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CreditAccounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_credit_accounts_user_unique")
                    .table(CreditAccounts::Table)
                    .col(CreditAccounts::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CreditTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CreditTransactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CreditTransactions::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CreditTransactions::Sequence)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CreditTransactions::TransactionType)
                            .string_len(24)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CreditTransactions::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CreditTransactions::BalanceAfterCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CreditTransactions::ReferenceType)
                            .string_len(32)
                            .null(),
                    )
                    .col(ColumnDef::new(CreditTransactions::ReferenceId).uuid().null())
                    .col(
                        ColumnDef::new(CreditTransactions::Description)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CreditTransactions::CreatedBy)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CreditTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 流水序号按用户递增, 前缀和可重建余额
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_credit_transactions_user_sequence_unique")
                    .table(CreditTransactions::Table)
                    .col(CreditTransactions::UserId)
                    .col(CreditTransactions::Sequence)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 一个业务引用(预留单 / 兑奖记录)最多产生一条流水; NULL 引用不受约束
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_credit_transactions_reference_unique")
                    .table(CreditTransactions::Table)
                    .col(CreditTransactions::ReferenceType)
                    .col(CreditTransactions::ReferenceId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(CreditTransactions::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(CreditAccounts::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
