use crate::config::RaffleConfig;
use crate::entities::{
    RaffleStatus, ReservationStatus, TicketStatus, reserved_ticket_entity as reserved,
    ticket_entity as tickets, ticket_reservation_entity as reservations,
};
use crate::error::{AppError, AppResult};
use crate::middlewares::Caller;
use crate::models::{
    RaffleStatisticsResponse, RevealTicketsRequest, RevealedTicketResponse, TicketResponse,
    UserTicketsQuery,
};
use crate::services::claim_service::cancel_ticket_claims;
use crate::services::instant_win_service::{discover_in, expire_undiscovered};
use crate::services::purchase_limit_service::lock_stats;
use crate::services::raffle_service::{apply_transition, find_raffle, lock_raffle};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set,
    TransactionTrait,
};
use std::collections::HashMap;
use uuid::Uuid;

const MAX_REVEAL_BATCH: usize = 100;

#[derive(Clone)]
pub struct TicketService {
    pool: DatabaseConnection,
    config: RaffleConfig,
}

impl TicketService {
    pub fn new(pool: DatabaseConnection, config: RaffleConfig) -> Self {
        Self { pool, config }
    }

    /// 揭晓已购票
    ///
    /// 每张票在活动内获得递增的揭晓序号; 即开奖资格票在同一事务内完成发现。
    pub async fn reveal_tickets(
        &self,
        caller: &Caller,
        req: RevealTicketsRequest,
    ) -> AppResult<Vec<RevealedTicketResponse>> {
        let mut ids = req.ticket_ids;
        ids.sort();
        ids.dedup();
        if ids.is_empty() || ids.len() > MAX_REVEAL_BATCH {
            return Err(AppError::ValidationError(format!(
                "Reveal between 1 and {MAX_REVEAL_BATCH} tickets at a time"
            )));
        }

        let now = Utc::now();
        let txn = self.pool.begin().await?;
        // 揭晓序号按活动分配: 先锁活动行 (与确认购买同样的 活动 -> 票 加锁顺序), 再读 MAX
        let mut raffle_ids: Vec<Uuid> = tickets::Entity::find()
            .select_only()
            .column(tickets::Column::RaffleId)
            .filter(tickets::Column::Id.is_in(ids.clone()))
            .into_tuple()
            .all(&txn)
            .await?;
        raffle_ids.sort();
        raffle_ids.dedup();
        for raffle_id in &raffle_ids {
            lock_raffle(&txn, *raffle_id).await?;
        }

        let mut locked = tickets::Entity::find()
            .filter(tickets::Column::Id.is_in(ids.clone()))
            .lock_exclusive()
            .all(&txn)
            .await?;
        if locked.len() != ids.len() {
            return Err(AppError::NotFound("One or more tickets not found".into()));
        }
        for t in &locked {
            if t.owner_id != Some(caller.user_id) {
                return Err(AppError::Unauthorized(format!(
                    "Ticket {} does not belong to you",
                    t.ticket_number
                )));
            }
            if t.status != TicketStatus::Sold {
                return Err(AppError::InvalidTransition(format!(
                    "Ticket {} is {} and cannot be revealed",
                    t.ticket_number, t.status
                )));
            }
            if t.is_revealed() {
                return Err(AppError::InvalidTransition(format!(
                    "Ticket {} is already revealed",
                    t.ticket_number
                )));
            }
        }
        locked.sort_by(|a, b| {
            (a.raffle_id, &a.ticket_number).cmp(&(b.raffle_id, &b.ticket_number))
        });

        let mut next_sequence: HashMap<Uuid, i64> = HashMap::new();
        let mut revealed = Vec::with_capacity(locked.len());
        for ticket in locked {
            let seq = match next_sequence.get(&ticket.raffle_id) {
                Some(s) => *s,
                None => max_reveal_sequence(&txn, ticket.raffle_id).await? + 1,
            };
            next_sequence.insert(ticket.raffle_id, seq + 1);

            let eligible = ticket.instant_win_eligible;
            let mut am = ticket.into_active_model();
            am.revealed_at = Set(Some(now));
            am.reveal_sequence = Set(Some(seq));
            am.updated_at = Set(now);
            let updated = am.update(&txn).await?;

            let instant_win = if eligible {
                discover_in(&txn, &updated, now, &self.config).await?
            } else {
                None
            };
            revealed.push((updated.id, instant_win));
        }

        // 重新读取以带上发现时写入的 instant_win 标记
        let fresh: HashMap<Uuid, tickets::Model> = tickets::Entity::find()
            .filter(tickets::Column::Id.is_in(ids))
            .all(&txn)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();
        txn.commit().await?;

        let wins = revealed.iter().filter(|(_, w)| w.is_some()).count();
        log::info!(
            "User {} revealed {} tickets ({wins} instant wins)",
            caller.user_id,
            revealed.len()
        );

        let mut out = Vec::with_capacity(revealed.len());
        for (id, win) in revealed {
            if let Some(t) = fresh.get(&id) {
                out.push(RevealedTicketResponse {
                    ticket: t.clone().into(),
                    instant_win: win.map(Into::into),
                });
            }
        }
        Ok(out)
    }

    pub async fn user_tickets(
        &self,
        caller: &Caller,
        query: &UserTicketsQuery,
    ) -> AppResult<Vec<TicketResponse>> {
        let mut q = tickets::Entity::find().filter(tickets::Column::OwnerId.eq(caller.user_id));
        if let Some(raffle_id) = query.raffle_id {
            q = q.filter(tickets::Column::RaffleId.eq(raffle_id));
        }
        let rows = q
            .order_by_desc(tickets::Column::PurchasedAt)
            .order_by_asc(tickets::Column::TicketNumber)
            .all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn ticket_by_number(
        &self,
        raffle_id: Uuid,
        ticket_number: &str,
    ) -> AppResult<TicketResponse> {
        tickets::Entity::find()
            .filter(tickets::Column::RaffleId.eq(raffle_id))
            .filter(tickets::Column::TicketNumber.eq(ticket_number))
            .one(&self.pool)
            .await?
            .map(Into::into)
            .ok_or_else(|| AppError::NotFound(format!("Ticket {ticket_number} not found")))
    }

    /// 作废票 (管理员)
    ///
    /// 活动未结束/未取消; 被未完成预留持有的票不可作废; 已售票同时回退购票计数。
    pub async fn void_ticket(
        &self,
        caller: &Caller,
        ticket_id: Uuid,
        reason: &str,
    ) -> AppResult<TicketResponse> {
        caller.require_admin()?;
        if reason.trim().is_empty() {
            return Err(AppError::ValidationError("Reason is required".into()));
        }

        let now = Utc::now();
        let txn = self.pool.begin().await?;
        let raffle_id: Uuid = tickets::Entity::find_by_id(ticket_id)
            .select_only()
            .column(tickets::Column::RaffleId)
            .into_tuple()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket {ticket_id} not found")))?;
        let raffle = lock_raffle(&txn, raffle_id).await?;
        let ticket = tickets::Entity::find_by_id(ticket_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket {ticket_id} not found")))?;
        if matches!(raffle.status, RaffleStatus::Ended | RaffleStatus::Cancelled) {
            return Err(AppError::InvalidTransition(format!(
                "Tickets of a {} raffle cannot be voided",
                raffle.status
            )));
        }
        if !ticket.status.can_transition_to(TicketStatus::Void) {
            return Err(AppError::InvalidTransition(format!(
                "Ticket {} is {} and cannot be voided",
                ticket.ticket_number, ticket.status
            )));
        }
        if is_held(&txn, ticket.id).await? {
            return Err(AppError::Conflict(format!(
                "Ticket {} is held by an open reservation",
                ticket.ticket_number
            )));
        }

        if ticket.status == TicketStatus::Sold
            && let Some(owner) = ticket.owner_id
        {
            let counter = lock_stats(&txn, owner, raffle.id, now).await?;
            let purchased = (counter.tickets_purchased - 1).max(0);
            let mut am = counter.into_active_model();
            am.tickets_purchased = Set(purchased);
            am.updated_at = Set(now);
            am.update(&txn).await?;
        }

        let was_available = ticket.status == TicketStatus::Available;
        let mut am = ticket.into_active_model();
        am.status = Set(TicketStatus::Void);
        am.updated_at = Set(now);
        let voided = am.update(&txn).await?;

        // 作废票不再中奖: 未发现的即开奖失效, 未结兑奖单撤销
        let expired_wins = expire_undiscovered(&txn, voided.id, now).await?;
        let cancelled_claims = cancel_ticket_claims(&txn, voided.id, now).await?;

        if was_available && raffle.status == RaffleStatus::Active {
            let remaining = tickets::Entity::find()
                .filter(tickets::Column::RaffleId.eq(raffle.id))
                .filter(tickets::Column::Status.eq(TicketStatus::Available))
                .count(&txn)
                .await?;
            if remaining == 0 {
                apply_transition(
                    &txn,
                    raffle,
                    RaffleStatus::SoldOut,
                    None,
                    Some("All tickets sold".into()),
                    now,
                )
                .await?;
            }
        }

        txn.commit().await?;
        log::info!(
            "Ticket {} voided by admin {}: {} ({expired_wins} instant wins expired, {cancelled_claims} claims cancelled)",
            voided.ticket_number,
            caller.user_id,
            reason.trim()
        );
        Ok(voided.into())
    }

    /// 活动票务统计
    pub async fn raffle_statistics(&self, raffle_id: Uuid) -> AppResult<RaffleStatisticsResponse> {
        let raffle = find_raffle(&self.pool, raffle_id).await?;
        let base = || tickets::Entity::find().filter(tickets::Column::RaffleId.eq(raffle_id));

        let total_tickets = base().count(&self.pool).await? as i64;
        let count_status = |status: TicketStatus| {
            base()
                .filter(tickets::Column::Status.eq(status))
                .count(&self.pool)
        };
        let available = count_status(TicketStatus::Available).await? as i64;
        let sold = count_status(TicketStatus::Sold).await? as i64;
        let void = count_status(TicketStatus::Void).await? as i64;
        let cancelled = count_status(TicketStatus::Cancelled).await? as i64;

        let held = base()
            .filter(tickets::Column::Id.in_subquery(open_holds().into_query()))
            .count(&self.pool)
            .await? as i64;
        let revealed = base()
            .filter(tickets::Column::RevealedAt.is_not_null())
            .count(&self.pool)
            .await? as i64;
        let instant_win_eligible = base()
            .filter(tickets::Column::InstantWinEligible.eq(true))
            .count(&self.pool)
            .await? as i64;
        let instant_wins_found = base()
            .filter(tickets::Column::InstantWin.eq(true))
            .count(&self.pool)
            .await? as i64;

        let unique_participants: i64 = base()
            .select_only()
            .column_as(Expr::cust("COUNT(DISTINCT owner_id)"), "participants")
            .filter(tickets::Column::Status.eq(TicketStatus::Sold))
            .into_tuple()
            .one(&self.pool)
            .await?
            .unwrap_or(0);

        Ok(RaffleStatisticsResponse {
            raffle_id,
            total_tickets,
            available,
            sold,
            void,
            cancelled,
            held,
            revealed,
            instant_win_eligible,
            instant_wins_found,
            unique_participants,
            gross_sales_cents: sold * raffle.ticket_price_cents,
        })
    }
}

/// 未完成预留单当前持有的票
fn open_holds() -> sea_orm::Select<reserved::Entity> {
    let open = reservations::Entity::find()
        .select_only()
        .column(reservations::Column::Id)
        .filter(reservations::Column::Status.is_in(ReservationStatus::open_statuses()))
        .into_query();
    reserved::Entity::find()
        .select_only()
        .column(reserved::Column::TicketId)
        .filter(reserved::Column::ReservationId.in_subquery(open))
}

async fn is_held<C: ConnectionTrait>(conn: &C, ticket_id: Uuid) -> AppResult<bool> {
    let n = open_holds()
        .filter(reserved::Column::TicketId.eq(ticket_id))
        .count(conn)
        .await?;
    Ok(n > 0)
}

/// 调用方需已持有活动行锁
async fn max_reveal_sequence<C: ConnectionTrait>(conn: &C, raffle_id: Uuid) -> AppResult<i64> {
    let max: Option<Option<i64>> = tickets::Entity::find()
        .select_only()
        .column_as(Expr::col(tickets::Column::RevealSequence).max(), "max_sequence")
        .filter(tickets::Column::RaffleId.eq(raffle_id))
        .into_tuple()
        .one(conn)
        .await?;
    Ok(max.flatten().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        ClaimMethod, ClaimStatus, InstantWinStatus, PrizeKind, instant_win_entity as instant_wins,
    };
    use crate::models::{CompleteClaimRequest, ConfigurePrizesRequest, PrizeInput};
    use crate::services::purchase_limit_service::confirmed_count;
    use crate::test_support::{TestEngine, draw_prize, raffle_request};

    fn reveal(ids: Vec<Uuid>) -> RevealTicketsRequest {
        RevealTicketsRequest { ticket_ids: ids }
    }

    #[tokio::test]
    async fn reveal_assigns_increasing_sequence_per_raffle() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(10, 10).await;
        let a = engine.buy(1, raffle.id, 3).await;
        let b = engine.buy(2, raffle.id, 2).await;

        let first = engine
            .tickets
            .reveal_tickets(&Caller::user(1), reveal(a.clone()))
            .await
            .unwrap();
        let second = engine
            .tickets
            .reveal_tickets(&Caller::user(2), reveal(b))
            .await
            .unwrap();

        let seqs: Vec<i64> = first
            .iter()
            .chain(second.iter())
            .map(|r| r.ticket.reveal_sequence.unwrap())
            .collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
        assert!(first.iter().all(|r| r.instant_win.is_none()));

        assert!(matches!(
            engine.tickets.reveal_tickets(&Caller::user(1), reveal(a)).await,
            Err(AppError::InvalidTransition(_))
        ));
    }

    /// 并发揭晓后序号连续且不重复。测试库单连接, 事务被串行化, 校验的是最终状态而非交错执行。
    #[tokio::test]
    async fn concurrent_reveals_get_distinct_sequences() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(12, 3).await;
        let mut owned = Vec::new();
        for user in 1..=4 {
            owned.push((user, engine.buy(user, raffle.id, 3).await));
        }

        let mut handles = Vec::new();
        for (user, ids) in owned {
            let svc = engine.tickets.clone();
            handles.push(tokio::spawn(async move {
                svc.reveal_tickets(&Caller::user(user), reveal(ids)).await
            }));
        }
        let mut seqs = Vec::new();
        for h in handles {
            for r in h.await.unwrap().unwrap() {
                seqs.push(r.ticket.reveal_sequence.unwrap());
            }
        }
        seqs.sort();
        assert_eq!(seqs, (1..=12).collect::<Vec<i64>>());

        // 同一活动内序号唯一由索引兜底
        let tickets_of_raffle = tickets::Entity::find()
            .filter(tickets::Column::RaffleId.eq(raffle.id))
            .order_by_asc(tickets::Column::RevealSequence)
            .all(&engine.db)
            .await
            .unwrap();
        let mut am = tickets_of_raffle[1].clone().into_active_model();
        am.reveal_sequence = Set(tickets_of_raffle[0].reveal_sequence);
        assert!(am.update(&engine.db).await.is_err());
    }

    #[tokio::test]
    async fn reveal_rejects_foreign_and_unsold_tickets() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(10, 10).await;
        let mine = engine.buy(1, raffle.id, 1).await;

        assert!(matches!(
            engine.tickets.reveal_tickets(&Caller::user(2), reveal(mine)).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            engine.tickets.reveal_tickets(&Caller::user(2), reveal(vec![])).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            engine
                .tickets
                .reveal_tickets(&Caller::user(2), reveal(vec![Uuid::new_v4()]))
                .await,
            Err(AppError::NotFound(_))
        ));
    }

    /// 3 张票全部绑定即开奖 (750, 2 小时兑奖窗口) 的进行中活动
    async fn all_instant_win_raffle(engine: &TestEngine) -> Uuid {
        let raffle = engine
            .raffles
            .create_raffle(&engine.admin, raffle_request(3, 3))
            .await
            .unwrap();
        engine
            .raffles
            .configure_prizes(
                &engine.admin,
                raffle.id,
                ConfigurePrizesRequest {
                    prizes: vec![
                        PrizeInput {
                            name: "Gift card".into(),
                            kind: PrizeKind::InstantWin,
                            credit_value_cents: 750,
                            quantity: 3,
                            claim_window_hours: Some(2),
                        },
                        draw_prize(5_000, 1),
                    ],
                },
            )
            .await
            .unwrap();
        engine
            .instant_wins
            .allocate_instant_wins(&engine.admin, raffle.id, 3)
            .await
            .unwrap();
        engine.activate(raffle.id).await;
        raffle.id
    }

    #[tokio::test]
    async fn reveal_discovers_instant_wins() {
        let engine = TestEngine::new().await;
        let raffle_id = all_instant_win_raffle(&engine).await;
        let bought = engine.buy(4, raffle_id, 2).await;

        let revealed = engine
            .tickets
            .reveal_tickets(&Caller::user(4), reveal(bought))
            .await
            .unwrap();
        assert_eq!(revealed.len(), 2);
        for r in &revealed {
            assert!(r.ticket.instant_win);
            let win = r.instant_win.as_ref().unwrap();
            assert_eq!(win.status, InstantWinStatus::Discovered);
            let window = win.claim_deadline.unwrap() - win.discovered_at.unwrap();
            assert_eq!(window.num_hours(), 2);
        }

        let stats = engine.tickets.raffle_statistics(raffle_id).await.unwrap();
        assert_eq!(stats.instant_win_eligible, 3);
        assert_eq!(stats.instant_wins_found, 2);
        assert_eq!(stats.revealed, 2);
        assert_eq!(stats.unique_participants, 1);
    }

    #[tokio::test]
    async fn voided_ticket_loses_its_instant_win() {
        let engine = TestEngine::new().await;
        let raffle_id = all_instant_win_raffle(&engine).await;
        let bought = engine.buy(4, raffle_id, 2).await;
        let owner = Caller::user(4);

        // 一张已揭晓并产生兑奖单, 一张尚未揭晓
        let revealed = engine
            .tickets
            .reveal_tickets(&owner, reveal(vec![bought[0]]))
            .await
            .unwrap();
        let allocation_id = revealed[0]
            .instant_win
            .as_ref()
            .and_then(|w| w.claim_allocation_id)
            .unwrap();
        engine
            .claims
            .initiate_claim(&owner, allocation_id)
            .await
            .unwrap();

        for id in &bought {
            engine
                .tickets
                .void_ticket(&engine.admin, *id, "fraud")
                .await
                .unwrap();
        }

        let claim = engine
            .claims
            .get_allocation(&owner, allocation_id)
            .await
            .unwrap();
        assert_eq!(claim.status, ClaimStatus::Cancelled);
        assert!(
            engine
                .claims
                .complete_claim(
                    &owner,
                    allocation_id,
                    CompleteClaimRequest {
                        value_cents: None,
                        method: ClaimMethod::Credit,
                    },
                )
                .await
                .is_err()
        );
        assert!(matches!(
            engine.instant_wins.discover(&owner, bought[1]).await,
            Err(AppError::InvalidTransition(_))
        ));

        let wins = instant_wins::Entity::find()
            .filter(instant_wins::Column::TicketId.is_in(bought.clone()))
            .all(&engine.db)
            .await
            .unwrap();
        assert_eq!(wins.len(), 2);
        assert!(wins.iter().all(|w| w.status == InstantWinStatus::Expired));
        assert_eq!(engine.ledger.balance(4).await.unwrap().balance_cents, 0);
    }

    #[tokio::test]
    async fn void_sold_ticket_rolls_back_purchase_count() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(10, 3).await;
        let bought = engine.buy(1, raffle.id, 3).await;

        let voided = engine
            .tickets
            .void_ticket(&engine.admin, bought[0], "chargeback")
            .await
            .unwrap();
        assert_eq!(voided.status, TicketStatus::Void);
        assert_eq!(confirmed_count(&engine.db, 1, raffle.id).await.unwrap(), 2);

        // 名额回退后可再买一张
        engine.buy(1, raffle.id, 1).await;

        assert!(matches!(
            engine.tickets.void_ticket(&engine.admin, bought[0], "again").await,
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            engine.tickets.void_ticket(&Caller::user(1), bought[1], "x").await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn held_ticket_cannot_be_voided() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(1, 1).await;
        let r = engine.reserve(1, raffle.id, 1).await.unwrap();
        let ticket = engine
            .tickets
            .ticket_by_number(raffle.id, &r.ticket_numbers[0])
            .await
            .unwrap();

        assert!(matches!(
            engine.tickets.void_ticket(&engine.admin, ticket.id, "damaged").await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn statistics_report_gross_sales_and_holds() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(10, 10).await;
        engine.buy(1, raffle.id, 2).await;
        engine.buy(2, raffle.id, 3).await;
        engine.reserve(3, raffle.id, 1).await.unwrap();

        let stats = engine.tickets.raffle_statistics(raffle.id).await.unwrap();
        assert_eq!(stats.total_tickets, 10);
        assert_eq!(stats.sold, 5);
        assert_eq!(stats.held, 1);
        assert_eq!(stats.available, 5);
        assert_eq!(stats.unique_participants, 2);
        assert_eq!(stats.gross_sales_cents, 5 * raffle.ticket_price_cents);

        let mine = engine
            .tickets
            .user_tickets(
                &Caller::user(2),
                &UserTicketsQuery {
                    raffle_id: Some(raffle.id),
                },
            )
            .await
            .unwrap();
        assert_eq!(mine.len(), 3);
    }
}
