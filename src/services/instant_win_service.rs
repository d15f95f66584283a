use crate::config::RaffleConfig;
use crate::entities::{
    ClaimSource, InstantWinStatus, PrizeKind, RaffleStatus, TicketStatus,
    instant_win_entity as instant_wins, prize_entity as prizes, ticket_entity as tickets,
};
use crate::error::{AppError, AppResult};
use crate::middlewares::Caller;
use crate::models::{InstantWinResponse, InstantWinStatsResponse};
use crate::services::claim_service::{NewAllocation, insert_allocation};
use crate::services::raffle_service::lock_raffle;
use crate::utils::sample_without_replacement;
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

/// 即开奖: 活动上线前把奖品绑定到随机票上, 揭晓时发现
#[derive(Clone)]
pub struct InstantWinService {
    pool: DatabaseConnection,
    config: RaffleConfig,
}

impl InstantWinService {
    pub fn new(pool: DatabaseConnection, config: RaffleConfig) -> Self {
        Self { pool, config }
    }

    /// 分配即开奖
    ///
    /// 仅 DRAFT 且尚未分配过; 从全部票中均匀随机选 count 张, 按奖品价值从高到低依次绑定奖品名额
    pub async fn allocate_instant_wins(
        &self,
        caller: &Caller,
        raffle_id: Uuid,
        count: i32,
    ) -> AppResult<Vec<InstantWinResponse>> {
        caller.require_admin()?;
        if count <= 0 {
            return Err(AppError::ValidationError(
                "Instant win count must be positive".into(),
            ));
        }

        let now = Utc::now();
        let txn = self.pool.begin().await?;
        let raffle = lock_raffle(&txn, raffle_id).await?;
        if raffle.status != RaffleStatus::Draft {
            return Err(AppError::InvalidTransition(format!(
                "Instant wins can only be allocated while the raffle is draft (status {})",
                raffle.status
            )));
        }

        let existing = instant_wins::Entity::find()
            .filter(instant_wins::Column::RaffleId.eq(raffle_id))
            .count(&txn)
            .await?;
        if existing > 0 {
            return Err(AppError::Conflict(
                "Instant wins already allocated for this raffle".into(),
            ));
        }

        let prize_list = prizes::Entity::find()
            .filter(prizes::Column::RaffleId.eq(raffle_id))
            .filter(prizes::Column::Kind.eq(PrizeKind::InstantWin))
            .order_by_desc(prizes::Column::CreditValueCents)
            .all(&txn)
            .await?;
        let slots: Vec<Uuid> = prize_list
            .iter()
            .flat_map(|p| std::iter::repeat_n(p.id, p.quantity.max(0) as usize))
            .collect();
        if slots.len() < count as usize {
            return Err(AppError::Exhausted(format!(
                "Only {} instant-win prize slots are configured",
                slots.len()
            )));
        }

        let candidates: Vec<Uuid> = tickets::Entity::find()
            .select_only()
            .column(tickets::Column::Id)
            .filter(tickets::Column::RaffleId.eq(raffle_id))
            .filter(tickets::Column::Status.eq(TicketStatus::Available))
            .lock_exclusive()
            .into_tuple()
            .all(&txn)
            .await?;
        let picked = sample_without_replacement(&candidates, count as usize);
        if picked.len() < count as usize {
            return Err(AppError::Exhausted(format!(
                "Only {} tickets are available for instant wins",
                picked.len()
            )));
        }

        tickets::Entity::update_many()
            .col_expr(tickets::Column::InstantWinEligible, Expr::value(true))
            .col_expr(tickets::Column::UpdatedAt, Expr::value(now))
            .filter(tickets::Column::Id.is_in(picked.clone()))
            .exec(&txn)
            .await?;

        let rows: Vec<instant_wins::ActiveModel> = picked
            .iter()
            .zip(slots.iter())
            .map(|(ticket_id, prize_id)| instant_wins::ActiveModel {
                id: Set(Uuid::new_v4()),
                raffle_id: Set(raffle_id),
                ticket_id: Set(*ticket_id),
                prize_id: Set(*prize_id),
                claim_allocation_id: Set(None),
                status: Set(InstantWinStatus::Allocated),
                discovered_at: Set(None),
                claim_deadline: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            })
            .collect();
        instant_wins::Entity::insert_many(rows)
            .exec_without_returning(&txn)
            .await?;

        let created = instant_wins::Entity::find()
            .filter(instant_wins::Column::RaffleId.eq(raffle_id))
            .all(&txn)
            .await?;
        txn.commit().await?;

        log::info!(
            "Raffle {raffle_id}: allocated {count} instant wins (admin {})",
            caller.user_id
        );
        Ok(created.into_iter().map(Into::into).collect())
    }

    /// 手动发现 (通常由揭晓触发); 非中奖票返回 None
    pub async fn discover(
        &self,
        caller: &Caller,
        ticket_id: Uuid,
    ) -> AppResult<Option<InstantWinResponse>> {
        let txn = self.pool.begin().await?;
        let ticket = tickets::Entity::find_by_id(ticket_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket {ticket_id} not found")))?;
        match ticket.owner_id {
            Some(owner) => caller.require_owner_or_admin(owner)?,
            None => {
                return Err(AppError::InvalidTransition(
                    "Ticket has not been sold".into(),
                ));
            }
        }
        let found = discover_in(&txn, &ticket, Utc::now(), &self.config).await?;
        txn.commit().await?;
        Ok(found.map(Into::into))
    }

    pub async fn instant_win_stats(&self, raffle_id: Uuid) -> AppResult<InstantWinStatsResponse> {
        let count_with = |status: InstantWinStatus| {
            instant_wins::Entity::find()
                .filter(instant_wins::Column::RaffleId.eq(raffle_id))
                .filter(instant_wins::Column::Status.eq(status))
                .count(&self.pool)
        };
        let allocated = count_with(InstantWinStatus::Allocated).await? as i64;
        let discovered = count_with(InstantWinStatus::Discovered).await? as i64;
        let pending_claim = count_with(InstantWinStatus::PendingClaim).await? as i64;
        let claimed = count_with(InstantWinStatus::Claimed).await? as i64;
        let expired = count_with(InstantWinStatus::Expired).await? as i64;

        Ok(InstantWinStatsResponse {
            raffle_id,
            total: allocated + discovered + pending_claim + claimed + expired,
            allocated,
            discovered,
            pending_claim,
            claimed,
            expired,
        })
    }

    pub async fn list_instant_wins(
        &self,
        caller: &Caller,
        raffle_id: Uuid,
    ) -> AppResult<Vec<InstantWinResponse>> {
        caller.require_admin()?;
        let rows = instant_wins::Entity::find()
            .filter(instant_wins::Column::RaffleId.eq(raffle_id))
            .order_by_asc(instant_wins::Column::CreatedAt)
            .all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// 发现即开奖 (调用方事务内, 已锁定票行)
///
/// ALLOCATED -> 先创建 PENDING 兑奖单, 再回写到即开奖记录 (DISCOVERED)。
/// 已发现过的直接返回现有记录。
pub(crate) async fn discover_in<C: ConnectionTrait>(
    conn: &C,
    ticket: &tickets::Model,
    now: DateTime<Utc>,
    config: &RaffleConfig,
) -> AppResult<Option<instant_wins::Model>> {
    if ticket.status != TicketStatus::Sold {
        return Err(AppError::InvalidTransition(format!(
            "Ticket {} is {} and cannot win",
            ticket.ticket_number, ticket.status
        )));
    }
    let Some(win) = instant_wins::Entity::find()
        .filter(instant_wins::Column::TicketId.eq(ticket.id))
        .lock_exclusive()
        .one(conn)
        .await?
    else {
        return Ok(None);
    };
    if win.status != InstantWinStatus::Allocated {
        return Ok(Some(win));
    }

    let winner_id = ticket
        .owner_id
        .ok_or_else(|| AppError::InvalidTransition("Ticket has not been sold".into()))?;
    let prize = prizes::Entity::find_by_id(win.prize_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Prize {} not found", win.prize_id)))?;
    let hours = prize
        .claim_window_hours
        .map(i64::from)
        .unwrap_or(config.instant_win_claim_window_hours);
    let deadline = now + Duration::hours(hours);

    let allocation = insert_allocation(
        conn,
        NewAllocation {
            raffle_id: win.raffle_id,
            prize_id: prize.id,
            ticket_id: ticket.id,
            winner_id,
            source: ClaimSource::InstantWin,
            value_cents: prize.credit_value_cents,
            deadline,
            won_at: now,
        },
    )
    .await?;

    let win_id = win.id;
    let mut am = win.into_active_model();
    am.status = Set(InstantWinStatus::Discovered);
    am.discovered_at = Set(Some(now));
    am.claim_deadline = Set(Some(deadline));
    am.claim_allocation_id = Set(Some(allocation.id));
    am.updated_at = Set(now);
    let discovered = am.update(conn).await?;

    tickets::Entity::update_many()
        .col_expr(tickets::Column::InstantWin, Expr::value(true))
        .col_expr(tickets::Column::UpdatedAt, Expr::value(now))
        .filter(tickets::Column::Id.eq(ticket.id))
        .exec(conn)
        .await?;

    log::info!(
        "Instant win {win_id} discovered on ticket {} by user {winner_id}, claim {} due {deadline}",
        ticket.ticket_number,
        allocation.id
    );
    Ok(Some(discovered))
}

/// 票作废时未发现的即开奖直接失效 (已发现的随兑奖单一起处理)
pub(crate) async fn expire_undiscovered<C: ConnectionTrait>(
    conn: &C,
    ticket_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<u64> {
    let res = instant_wins::Entity::update_many()
        .col_expr(instant_wins::Column::Status, Expr::value(InstantWinStatus::Expired))
        .col_expr(instant_wins::Column::UpdatedAt, Expr::value(now))
        .filter(instant_wins::Column::TicketId.eq(ticket_id))
        .filter(instant_wins::Column::Status.eq(InstantWinStatus::Allocated))
        .exec(conn)
        .await?;
    Ok(res.rows_affected)
}

/// 兑奖单状态变化同步到即开奖记录; 不合法的迁移忽略 (抽奖来源的兑奖单没有即开奖记录)
pub(crate) async fn follow_claim<C: ConnectionTrait>(
    conn: &C,
    allocation_id: Uuid,
    next: InstantWinStatus,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let Some(win) = instant_wins::Entity::find()
        .filter(instant_wins::Column::ClaimAllocationId.eq(allocation_id))
        .one(conn)
        .await?
    else {
        return Ok(());
    };
    if !win.status.can_transition_to(next) {
        return Ok(());
    }
    let mut am = win.into_active_model();
    am.status = Set(next);
    am.updated_at = Set(now);
    am.update(conn).await?;
    Ok(())
}
