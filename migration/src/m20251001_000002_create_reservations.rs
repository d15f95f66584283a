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

/// Ticket reservations (购票前的限时锁定)
#[derive(DeriveIden)]
enum TicketReservations {
    Table,
    Id,
    RaffleId,
    UserId,
    Quantity,
    TotalPriceCents,
    Status,
    ExpiresAt,
    PaymentReference,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

/// Reserved tickets (预留单与票的关联表)
#[derive(DeriveIden)]
enum ReservedTickets {
    Table,
    Id,
    ReservationId,
    TicketId,
    CreatedAt,
}

/// User raffle stats (用户在某活动的已确认购票数, 反范式计数器)
#[derive(DeriveIden)]
enum UserRaffleStats {
    Table,
    Id,
    UserId,
    RaffleId,
    TicketsPurchased,
    LastPurchaseAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TicketReservations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TicketReservations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TicketReservations::RaffleId).uuid().not_null())
                    .col(
                        ColumnDef::new(TicketReservations::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TicketReservations::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TicketReservations::TotalPriceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TicketReservations::Status)
                            .string_len(24)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TicketReservations::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TicketReservations::PaymentReference)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TicketReservations::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TicketReservations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(TicketReservations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ticket_reservations_raffle")
                            .from(TicketReservations::Table, TicketReservations::RaffleId)
                            .to(Raffles::Table, Raffles::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 过期清理按 (status, expires_at) 扫描
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_ticket_reservations_status_expires")
                    .table(TicketReservations::Table)
                    .col(TicketReservations::Status)
                    .col(TicketReservations::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReservedTickets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReservedTickets::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReservedTickets::ReservationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReservedTickets::TicketId).uuid().not_null())
                    .col(
                        ColumnDef::new(ReservedTickets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reserved_tickets_reservation")
                            .from(ReservedTickets::Table, ReservedTickets::ReservationId)
                            .to(TicketReservations::Table, TicketReservations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reserved_tickets_ticket")
                            .from(ReservedTickets::Table, ReservedTickets::TicketId)
                            .to(Tickets::Table, Tickets::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 一张票同一时间只能被一个预留单持有（释放时删除关联行）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reserved_tickets_ticket_unique")
                    .table(ReservedTickets::Table)
                    .col(ReservedTickets::TicketId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reserved_tickets_reservation")
                    .table(ReservedTickets::Table)
                    .col(ReservedTickets::ReservationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserRaffleStats::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserRaffleStats::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserRaffleStats::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UserRaffleStats::RaffleId).uuid().not_null())
                    .col(
                        ColumnDef::new(UserRaffleStats::TicketsPurchased)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserRaffleStats::LastPurchaseAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(UserRaffleStats::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(UserRaffleStats::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_raffle_stats_raffle")
                            .from(UserRaffleStats::Table, UserRaffleStats::RaffleId)
                            .to(Raffles::Table, Raffles::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 一个用户在一个活动只有一条统计
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_user_raffle_stats_user_raffle_unique")
                    .table(UserRaffleStats::Table)
                    .col(UserRaffleStats::UserId)
                    .col(UserRaffleStats::RaffleId)
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
                    .table(UserRaffleStats::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(ReservedTickets::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(TicketReservations::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
