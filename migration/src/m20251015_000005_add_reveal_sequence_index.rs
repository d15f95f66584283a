use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Tickets {
    Table,
    RaffleId,
    RevealSequence,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 未揭晓票 reveal_sequence 为 NULL, 唯一索引不约束 NULL
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tickets_raffle_reveal_sequence_unique")
                    .table(Tickets::Table)
                    .col(Tickets::RaffleId)
                    .col(Tickets::RevealSequence)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_tickets_raffle_reveal_sequence_unique")
                    .table(Tickets::Table)
                    .to_owned(),
            )
            .await
    }
}
