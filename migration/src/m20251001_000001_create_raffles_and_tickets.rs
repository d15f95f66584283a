use sea_orm_migration::prelude::*;

/// Raffles (抽奖活动主表)
#[derive(DeriveIden)]
enum Raffles {
    Table,
    Id,
    Title,
    Description,
    TicketPriceCents,
    TotalTickets,
    MaxTicketsPerUser,
    StartTime,
    EndTime,
    Status,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

/// Tickets (每个抽奖活动的票号库存)
#[derive(DeriveIden)]
enum Tickets {
    Table,
    Id,
    RaffleId,
    TicketNumber,
    OwnerId,
    Status,
    PurchasedAt,
    ReservationId,
    InstantWinEligible,
    InstantWin,
    RevealedAt,
    RevealSequence,
    CreatedAt,
    UpdatedAt,
}

/// Raffle status changes (状态变更审计)
#[derive(DeriveIden)]
enum RaffleStatusChanges {
    Table,
    Id,
    RaffleId,
    PreviousStatus,
    NewStatus,
    ChangedBy,
    Reason,
    CreatedAt,
}

/// Prizes (奖品配置, 每个抽奖活动一组)
#[derive(DeriveIden)]
enum Prizes {
    Table,
    Id,
    RaffleId,
    Name,
    Kind,
    CreditValueCents,
    Quantity,
    ClaimWindowHours,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 状态列统一使用字符串存储（而非 Postgres 枚举类型），
/// 以便同一套迁移既能在生产 Postgres 上运行，也能在测试用 SQLite 上运行。
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Raffles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Raffles::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Raffles::Title).string_len(100).not_null())
                    .col(ColumnDef::new(Raffles::Description).text().null())
                    .col(
                        ColumnDef::new(Raffles::TicketPriceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Raffles::TotalTickets).integer().not_null())
                    .col(
                        ColumnDef::new(Raffles::MaxTicketsPerUser)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Raffles::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Raffles::EndTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Raffles::Status)
                            .string_len(24)
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(Raffles::CreatedBy).big_integer().not_null())
                    .col(
                        ColumnDef::new(Raffles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Raffles::UpdatedAt)
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
                    .name("idx_raffles_status")
                    .table(Raffles::Table)
                    .col(Raffles::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Tickets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tickets::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Tickets::RaffleId).uuid().not_null())
                    .col(ColumnDef::new(Tickets::TicketNumber).string_len(16).not_null())
                    .col(ColumnDef::new(Tickets::OwnerId).big_integer().null())
                    .col(
                        ColumnDef::new(Tickets::Status)
                            .string_len(24)
                            .not_null()
                            .default("available"),
                    )
                    .col(
                        ColumnDef::new(Tickets::PurchasedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Tickets::ReservationId).uuid().null())
                    .col(
                        ColumnDef::new(Tickets::InstantWinEligible)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Tickets::InstantWin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Tickets::RevealedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Tickets::RevealSequence).big_integer().null())
                    .col(
                        ColumnDef::new(Tickets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Tickets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // 不加 ON DELETE CASCADE: 票据需要在活动之后继续保留用于审计
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tickets_raffle")
                            .from(Tickets::Table, Tickets::RaffleId)
                            .to(Raffles::Table, Raffles::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一活动内票号唯一
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tickets_raffle_number_unique")
                    .table(Tickets::Table)
                    .col(Tickets::RaffleId)
                    .col(Tickets::TicketNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tickets_raffle_status")
                    .table(Tickets::Table)
                    .col(Tickets::RaffleId)
                    .col(Tickets::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tickets_owner")
                    .table(Tickets::Table)
                    .col(Tickets::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RaffleStatusChanges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RaffleStatusChanges::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RaffleStatusChanges::RaffleId).uuid().not_null())
                    .col(
                        ColumnDef::new(RaffleStatusChanges::PreviousStatus)
                            .string_len(24)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RaffleStatusChanges::NewStatus)
                            .string_len(24)
                            .not_null(),
                    )
                    // NULL = 系统任务触发
                    .col(
                        ColumnDef::new(RaffleStatusChanges::ChangedBy)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(RaffleStatusChanges::Reason)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(RaffleStatusChanges::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_raffle_status_changes_raffle")
                            .from(RaffleStatusChanges::Table, RaffleStatusChanges::RaffleId)
                            .to(Raffles::Table, Raffles::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_raffle_status_changes_raffle")
                    .table(RaffleStatusChanges::Table)
                    .col(RaffleStatusChanges::RaffleId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Prizes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Prizes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Prizes::RaffleId).uuid().not_null())
                    .col(ColumnDef::new(Prizes::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Prizes::Kind).string_len(24).not_null())
                    .col(
                        ColumnDef::new(Prizes::CreditValueCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Prizes::Quantity).integer().not_null())
                    .col(ColumnDef::new(Prizes::ClaimWindowHours).integer().null())
                    .col(
                        ColumnDef::new(Prizes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Prizes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_prizes_raffle")
                            .from(Prizes::Table, Prizes::RaffleId)
                            .to(Raffles::Table, Raffles::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_prizes_raffle")
                    .table(Prizes::Table)
                    .col(Prizes::RaffleId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 删除顺序：奖品 -> 状态变更 -> 票 -> 活动
        manager
            .drop_table(Table::drop().if_exists().table(Prizes::Table).to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(RaffleStatusChanges::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Tickets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Raffles::Table).to_owned())
            .await?;
        Ok(())
    }
}
