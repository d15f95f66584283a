use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Raffles {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Tickets {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Prizes {
    Table,
    Id,
}

/// Claim allocations (中奖 -> 兑奖状态机)
#[derive(DeriveIden)]
enum ClaimAllocations {
    Table,
    Id,
    RaffleId,
    PrizeId,
    TicketId,
    WinnerId,
    Source,
    Status,
    OriginalValueCents,
    ClaimedValueCents,
    ClaimMethod,
    ClaimDeadline,
    WonAt,
    ApprovedAt,
    ClaimedAt,
    CreatedAt,
    UpdatedAt,
}

/// Instant wins (即开奖, 活动草稿期预先绑定到票)
#[derive(DeriveIden)]
enum InstantWins {
    Table,
    Id,
    RaffleId,
    TicketId,
    PrizeId,
    ClaimAllocationId,
    Status,
    DiscoveredAt,
    ClaimDeadline,
    CreatedAt,
    UpdatedAt,
}

/// Raffle draws (结束后的开奖结果)
#[derive(DeriveIden)]
enum RaffleDraws {
    Table,
    Id,
    RaffleId,
    TicketId,
    WinnerId,
    Position,
    PrizeId,
    ClaimAllocationId,
    DrawnBy,
    DrawnAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ClaimAllocations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClaimAllocations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ClaimAllocations::RaffleId).uuid().not_null())
                    .col(ColumnDef::new(ClaimAllocations::PrizeId).uuid().not_null())
                    .col(ColumnDef::new(ClaimAllocations::TicketId).uuid().not_null())
                    .col(
                        ColumnDef::new(ClaimAllocations::WinnerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ClaimAllocations::Source).string_len(24).not_null())
                    .col(
                        ColumnDef::new(ClaimAllocations::Status)
                            .string_len(24)
                            .not_null()
                            .default("pending"),
                    )
                    // 中奖时的奖品价值快照, 之后奖品配置变化不影响已中奖记录
                    .col(
                        ColumnDef::new(ClaimAllocations::OriginalValueCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClaimAllocations::ClaimedValueCents)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ClaimAllocations::ClaimMethod)
                            .string_len(24)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ClaimAllocations::ClaimDeadline)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClaimAllocations::WonAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClaimAllocations::ApprovedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ClaimAllocations::ClaimedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ClaimAllocations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ClaimAllocations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_claim_allocations_raffle")
                            .from(ClaimAllocations::Table, ClaimAllocations::RaffleId)
                            .to(Raffles::Table, Raffles::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_claim_allocations_prize")
                            .from(ClaimAllocations::Table, ClaimAllocations::PrizeId)
                            .to(Prizes::Table, Prizes::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_claim_allocations_ticket")
                            .from(ClaimAllocations::Table, ClaimAllocations::TicketId)
                            .to(Tickets::Table, Tickets::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一张票在同一来源(即开/开奖)只能有一条兑奖记录
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_claim_allocations_ticket_source_unique")
                    .table(ClaimAllocations::Table)
                    .col(ClaimAllocations::RaffleId)
                    .col(ClaimAllocations::TicketId)
                    .col(ClaimAllocations::Source)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_claim_allocations_status_deadline")
                    .table(ClaimAllocations::Table)
                    .col(ClaimAllocations::Status)
                    .col(ClaimAllocations::ClaimDeadline)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_claim_allocations_winner")
                    .table(ClaimAllocations::Table)
                    .col(ClaimAllocations::WinnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InstantWins::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(InstantWins::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(InstantWins::RaffleId).uuid().not_null())
                    .col(ColumnDef::new(InstantWins::TicketId).uuid().not_null())
                    .col(ColumnDef::new(InstantWins::PrizeId).uuid().not_null())
                    .col(ColumnDef::new(InstantWins::ClaimAllocationId).uuid().null())
                    .col(
                        ColumnDef::new(InstantWins::Status)
                            .string_len(24)
                            .not_null()
                            .default("allocated"),
                    )
                    .col(
                        ColumnDef::new(InstantWins::DiscoveredAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InstantWins::ClaimDeadline)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InstantWins::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(InstantWins::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_instant_wins_raffle")
                            .from(InstantWins::Table, InstantWins::RaffleId)
                            .to(Raffles::Table, Raffles::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_instant_wins_ticket")
                            .from(InstantWins::Table, InstantWins::TicketId)
                            .to(Tickets::Table, Tickets::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_instant_wins_prize")
                            .from(InstantWins::Table, InstantWins::PrizeId)
                            .to(Prizes::Table, Prizes::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_instant_wins_claim_allocation")
                            .from(InstantWins::Table, InstantWins::ClaimAllocationId)
                            .to(ClaimAllocations::Table, ClaimAllocations::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 每张票最多一条即开奖
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_instant_wins_ticket_unique")
                    .table(InstantWins::Table)
                    .col(InstantWins::TicketId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_instant_wins_raffle_status")
                    .table(InstantWins::Table)
                    .col(InstantWins::RaffleId)
                    .col(InstantWins::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RaffleDraws::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(RaffleDraws::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(RaffleDraws::RaffleId).uuid().not_null())
                    .col(ColumnDef::new(RaffleDraws::TicketId).uuid().not_null())
                    .col(ColumnDef::new(RaffleDraws::WinnerId).big_integer().not_null())
                    .col(ColumnDef::new(RaffleDraws::Position).integer().not_null())
                    .col(ColumnDef::new(RaffleDraws::PrizeId).uuid().null())
                    .col(ColumnDef::new(RaffleDraws::ClaimAllocationId).uuid().null())
                    .col(ColumnDef::new(RaffleDraws::DrawnBy).big_integer().not_null())
                    .col(
                        ColumnDef::new(RaffleDraws::DrawnAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_raffle_draws_raffle")
                            .from(RaffleDraws::Table, RaffleDraws::RaffleId)
                            .to(Raffles::Table, Raffles::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_raffle_draws_ticket")
                            .from(RaffleDraws::Table, RaffleDraws::TicketId)
                            .to(Tickets::Table, Tickets::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 不放回抽取: 同一活动一张票只能中一次, 名次唯一
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_raffle_draws_ticket_unique")
                    .table(RaffleDraws::Table)
                    .col(RaffleDraws::RaffleId)
                    .col(RaffleDraws::TicketId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_raffle_draws_position_unique")
                    .table(RaffleDraws::Table)
                    .col(RaffleDraws::RaffleId)
                    .col(RaffleDraws::Position)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(RaffleDraws::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(InstantWins::Table).to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(ClaimAllocations::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
