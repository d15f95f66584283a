use crate::config::RaffleConfig;
use crate::entities::{
    CreditReferenceType, RaffleStatus, ReservationStatus, TicketStatus,
    raffle_entity as raffles, reserved_ticket_entity as reserved, ticket_entity as tickets,
    ticket_reservation_entity as reservations,
};
use crate::error::{AppError, AppResult};
use crate::middlewares::Caller;
use crate::models::{PaymentSource, PurchaseConfirmation, ReservationResponse};
use crate::services::LedgerService;
use crate::services::purchase_limit_service::{confirmed_count, lock_stats};
use crate::services::raffle_service::{apply_transition, lock_raffle};
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::{Expr, LockBehavior, LockType, Order};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set,
    TransactionTrait,
};
use uuid::Uuid;

/// 预留单: 付款前对一组票的限时独占
#[derive(Clone)]
pub struct ReservationService {
    pool: DatabaseConnection,
    ledger: LedgerService,
    config: RaffleConfig,
}

impl ReservationService {
    pub fn new(pool: DatabaseConnection, ledger: LedgerService, config: RaffleConfig) -> Self {
        Self {
            pool,
            ledger,
            config,
        }
    }

    /// 预留 quantity 张票
    ///
    /// 1. 校验数量与活动可购买状态
    /// 2. 回收本活动已过期的预留
    /// 3. 校验每用户上限 (已确认数 + 本次 <= 上限)
    /// 4. 在可售且未被持有的票中随机选取并加行锁
    /// 5. 写预留单与关联行, 不足 quantity 时整体失败
    pub async fn reserve(
        &self,
        caller: &Caller,
        raffle_id: Uuid,
        quantity: i32,
    ) -> AppResult<ReservationResponse> {
        if quantity < self.config.min_tickets_per_transaction
            || quantity > self.config.max_tickets_per_transaction
        {
            return Err(AppError::ValidationError(format!(
                "Quantity must be between {} and {}",
                self.config.min_tickets_per_transaction, self.config.max_tickets_per_transaction
            )));
        }

        let now = Utc::now();
        let txn = self.pool.begin().await?;

        // 共享锁: 允许并发预留, 阻止同时发生的状态变更
        let raffle = find_raffle_shared(&txn, raffle_id).await?;
        if !raffle.is_purchasable(now) {
            return Err(AppError::InvalidTransition(format!(
                "Raffle is not open for purchases (status {})",
                raffle.status
            )));
        }
        let expires_at = compute_expiry(now, raffle.end_time, &self.config)?;

        let reclaimed = release_expired(&txn, Some(raffle_id), now).await?;
        if reclaimed > 0 {
            log::info!("Raffle {raffle_id}: reclaimed {reclaimed} expired reservations");
        }

        let purchased = confirmed_count(&txn, caller.user_id, raffle_id).await?;
        if purchased + quantity > raffle.max_tickets_per_user {
            return Err(AppError::Exhausted(format!(
                "Purchase limit reached: {purchased} of {} tickets already bought",
                raffle.max_tickets_per_user
            )));
        }

        let held = reserved::Entity::find()
            .select_only()
            .column(reserved::Column::TicketId)
            .into_query();
        let picked: Vec<(Uuid, String)> = tickets::Entity::find()
            .select_only()
            .column(tickets::Column::Id)
            .column(tickets::Column::TicketNumber)
            .filter(tickets::Column::RaffleId.eq(raffle_id))
            .filter(tickets::Column::Status.eq(TicketStatus::Available))
            .filter(tickets::Column::Id.not_in_subquery(held))
            .order_by(Expr::cust("RANDOM()"), Order::Asc)
            .limit(quantity as u64)
            // 跳过其他预留事务正在锁定的票, 随机顺序加锁也不会互相等待
            .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
            .into_tuple()
            .all(&txn)
            .await?;

        if picked.len() < quantity as usize {
            log::warn!(
                "Raffle {raffle_id}: requested {quantity} tickets, only {} eligible",
                picked.len()
            );
            return Err(AppError::Exhausted(format!(
                "Only {} tickets are available",
                picked.len()
            )));
        }

        let reservation_id = Uuid::new_v4();
        let reservation = reservations::ActiveModel {
            id: Set(reservation_id),
            raffle_id: Set(raffle_id),
            user_id: Set(caller.user_id),
            quantity: Set(quantity),
            total_price_cents: Set(raffle.ticket_price_cents * i64::from(quantity)),
            status: Set(ReservationStatus::Active),
            expires_at: Set(expires_at),
            payment_reference: Set(None),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        // ticket_id 唯一约束兜底: 并发抢到同一张票时这里返回 Conflict, 整体回滚
        reserved::Entity::insert_many(picked.iter().map(|(ticket_id, _)| reserved::ActiveModel {
            id: Set(Uuid::new_v4()),
            reservation_id: Set(reservation_id),
            ticket_id: Set(*ticket_id),
            created_at: Set(now),
        }))
        .exec_without_returning(&txn)
        .await?;

        txn.commit().await?;
        log::info!(
            "Reservation {reservation_id}: user {} holds {quantity} tickets in raffle {raffle_id} until {expires_at}",
            caller.user_id
        );

        let mut numbers: Vec<String> = picked.into_iter().map(|(_, n)| n).collect();
        numbers.sort();
        Ok(ReservationResponse::new(reservation, numbers))
    }

    /// 确认购票: 票 -> SOLD, 计数器 +quantity, 预留单 -> COMPLETED, 同一事务
    pub async fn confirm(
        &self,
        caller: &Caller,
        reservation_id: Uuid,
        payment: PaymentSource,
    ) -> AppResult<PurchaseConfirmation> {
        if let PaymentSource::External { reference } = &payment
            && reference.trim().is_empty()
        {
            return Err(AppError::ValidationError(
                "External payment reference is required".into(),
            ));
        }

        let now = Utc::now();
        let txn = self.pool.begin().await?;
        let reservation = lock_reservation(&txn, reservation_id).await?;
        if reservation.user_id != caller.user_id {
            return Err(AppError::Unauthorized(
                "Reservation belongs to another user".into(),
            ));
        }
        match reservation.status {
            ReservationStatus::Completed | ReservationStatus::Confirmed => {
                return Err(AppError::Conflict("Reservation already confirmed".into()));
            }
            s if !s.is_open() => {
                return Err(AppError::InvalidTransition(format!(
                    "Reservation is {s} and cannot be confirmed"
                )));
            }
            _ => {}
        }
        if reservation.is_expired_at(now) {
            release_reservations(&txn, &[reservation.id], ReservationStatus::Expired, now).await?;
            txn.commit().await?;
            return Err(AppError::Expired("Reservation has expired".into()));
        }

        let raffle = lock_raffle(&txn, reservation.raffle_id).await?;
        if !raffle.is_purchasable(now) {
            return Err(AppError::InvalidTransition(format!(
                "Raffle is not open for purchases (status {})",
                raffle.status
            )));
        }

        let ticket_ids: Vec<Uuid> = reserved::Entity::find()
            .select_only()
            .column(reserved::Column::TicketId)
            .filter(reserved::Column::ReservationId.eq(reservation.id))
            .into_tuple()
            .all(&txn)
            .await?;
        let held = tickets::Entity::find()
            .filter(tickets::Column::Id.is_in(ticket_ids.clone()))
            .lock_exclusive()
            .all(&txn)
            .await?;
        if held.len() != reservation.quantity as usize
            || held.iter().any(|t| t.status != TicketStatus::Available)
        {
            log::warn!(
                "Reservation {}: held tickets changed before confirmation",
                reservation.id
            );
            return Err(AppError::Conflict(
                "Reserved tickets are no longer available".into(),
            ));
        }

        // 计数器行锁下复核上限
        let counter = lock_stats(&txn, reservation.user_id, raffle.id, now).await?;
        if counter.tickets_purchased + reservation.quantity > raffle.max_tickets_per_user {
            return Err(AppError::Exhausted(format!(
                "Purchase limit reached: {} of {} tickets already bought",
                counter.tickets_purchased, raffle.max_tickets_per_user
            )));
        }

        // 扣款失败时直接返回, 事务回滚, 预留保持不变
        let (payment_reference, balance_after_cents) = match &payment {
            PaymentSource::Credits => {
                let tx = self
                    .ledger
                    .debit(
                        &txn,
                        reservation.user_id,
                        reservation.total_price_cents,
                        CreditReferenceType::TicketPurchase,
                        reservation.id,
                        "Raffle ticket purchase",
                    )
                    .await?;
                (None, Some(tx.balance_after_cents))
            }
            PaymentSource::External { reference } => (Some(reference.trim().to_string()), None),
        };

        let sold = tickets::Entity::update_many()
            .col_expr(tickets::Column::Status, Expr::value(TicketStatus::Sold))
            .col_expr(tickets::Column::OwnerId, Expr::value(reservation.user_id))
            .col_expr(tickets::Column::PurchasedAt, Expr::value(now))
            .col_expr(tickets::Column::ReservationId, Expr::value(reservation.id))
            .col_expr(tickets::Column::UpdatedAt, Expr::value(now))
            .filter(tickets::Column::Id.is_in(ticket_ids.clone()))
            .filter(tickets::Column::Status.eq(TicketStatus::Available))
            .exec(&txn)
            .await?;
        if sold.rows_affected != ticket_ids.len() as u64 {
            return Err(AppError::Conflict(
                "Reserved tickets are no longer available".into(),
            ));
        }

        let purchased = counter.tickets_purchased + reservation.quantity;
        let mut counter_am = counter.into_active_model();
        counter_am.tickets_purchased = Set(purchased);
        counter_am.last_purchase_at = Set(Some(now));
        counter_am.updated_at = Set(now);
        counter_am.update(&txn).await?;

        let quantity = reservation.quantity;
        let mut am = reservation.into_active_model();
        am.status = Set(ReservationStatus::Completed);
        am.payment_reference = Set(payment_reference);
        am.completed_at = Set(Some(now));
        am.updated_at = Set(now);
        let completed = am.update(&txn).await?;

        // 售罄
        let remaining = tickets::Entity::find()
            .filter(tickets::Column::RaffleId.eq(raffle.id))
            .filter(tickets::Column::Status.eq(TicketStatus::Available))
            .count(&txn)
            .await?;
        let raffle = if remaining == 0 && raffle.status == RaffleStatus::Active {
            apply_transition(
                &txn,
                raffle,
                RaffleStatus::SoldOut,
                None,
                Some("All tickets sold".into()),
                now,
            )
            .await?
        } else {
            raffle
        };

        let sold_tickets = tickets::Entity::find()
            .filter(tickets::Column::Id.is_in(ticket_ids))
            .order_by_asc(tickets::Column::TicketNumber)
            .all(&txn)
            .await?;

        txn.commit().await?;
        log::info!(
            "Reservation {}: user {} bought {quantity} tickets in raffle {}",
            completed.id,
            completed.user_id,
            raffle.id
        );

        let numbers = sold_tickets.iter().map(|t| t.ticket_number.clone()).collect();
        Ok(PurchaseConfirmation {
            reservation: ReservationResponse::new(completed, numbers),
            tickets: sold_tickets.into_iter().map(Into::into).collect(),
            raffle_status: raffle.status,
            balance_after_cents,
        })
    }

    /// 用户主动取消, 释放持有的票
    pub async fn cancel_reservation(
        &self,
        caller: &Caller,
        reservation_id: Uuid,
    ) -> AppResult<ReservationResponse> {
        let txn = self.pool.begin().await?;
        let reservation = lock_reservation(&txn, reservation_id).await?;
        caller.require_owner_or_admin(reservation.user_id)?;
        if !reservation.status.is_open() {
            return Err(AppError::InvalidTransition(format!(
                "Reservation is {} and cannot be cancelled",
                reservation.status
            )));
        }
        release_reservations(&txn, &[reservation.id], ReservationStatus::Cancelled, Utc::now())
            .await?;
        let updated = lock_reservation(&txn, reservation_id).await?;
        txn.commit().await?;
        log::info!("Reservation {reservation_id} cancelled by {}", caller.user_id);
        Ok(ReservationResponse::new(updated, Vec::new()))
    }

    /// 读取时顺带检查过期 (过期则释放)
    pub async fn get_reservation(
        &self,
        caller: &Caller,
        reservation_id: Uuid,
    ) -> AppResult<ReservationResponse> {
        let now = Utc::now();
        let txn = self.pool.begin().await?;
        let mut reservation = lock_reservation(&txn, reservation_id).await?;
        caller.require_owner_or_admin(reservation.user_id)?;
        if reservation.status.is_open() && reservation.is_expired_at(now) {
            release_reservations(&txn, &[reservation.id], ReservationStatus::Expired, now).await?;
            reservation = lock_reservation(&txn, reservation_id).await?;
        }
        let numbers = ticket_numbers_for(&txn, reservation.id).await?;
        txn.commit().await?;
        Ok(ReservationResponse::new(reservation, numbers))
    }

    /// 定时任务: 释放所有已过期的预留
    pub async fn expire_stale_reservations(&self) -> AppResult<u64> {
        let txn = self.pool.begin().await?;
        let released = release_expired(&txn, None, Utc::now()).await?;
        txn.commit().await?;
        Ok(released)
    }
}

/// 预留过期时间: now + 窗口, 不晚于 (结束 - 余量); 距结束不足最小缓冲时拒绝
pub(crate) fn compute_expiry(
    now: DateTime<Utc>,
    end_time: DateTime<Utc>,
    config: &RaffleConfig,
) -> AppResult<DateTime<Utc>> {
    let too_close = Duration::seconds(config.reservation_min_buffer_secs);
    let latest = end_time - Duration::seconds(config.reservation_end_margin_secs);
    if end_time - now <= too_close || latest <= now {
        return Err(AppError::Expired(
            "Raffle ends too soon to hold tickets".into(),
        ));
    }
    let full = now + Duration::seconds(config.reservation_window_secs);
    Ok(full.min(latest))
}

async fn find_raffle_shared<C: ConnectionTrait>(
    conn: &C,
    raffle_id: Uuid,
) -> AppResult<raffles::Model> {
    raffles::Entity::find_by_id(raffle_id)
        .lock_shared()
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Raffle {raffle_id} not found")))
}

async fn lock_reservation<C: ConnectionTrait>(
    conn: &C,
    reservation_id: Uuid,
) -> AppResult<reservations::Model> {
    reservations::Entity::find_by_id(reservation_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reservation {reservation_id} not found")))
}

async fn ticket_numbers_for<C: ConnectionTrait>(
    conn: &C,
    reservation_id: Uuid,
) -> AppResult<Vec<String>> {
    let held = reserved::Entity::find()
        .select_only()
        .column(reserved::Column::TicketId)
        .filter(reserved::Column::ReservationId.eq(reservation_id))
        .into_query();
    Ok(tickets::Entity::find()
        .select_only()
        .column(tickets::Column::TicketNumber)
        .filter(tickets::Column::Id.in_subquery(held))
        .order_by_asc(tickets::Column::TicketNumber)
        .into_tuple()
        .all(conn)
        .await?)
}

/// 过期回收: 锁定过期的未完成预留, 删除关联行, 状态置为 EXPIRED
pub(crate) async fn release_expired<C: ConnectionTrait>(
    conn: &C,
    raffle_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> AppResult<u64> {
    let mut query = reservations::Entity::find()
        .select_only()
        .column(reservations::Column::Id)
        .filter(reservations::Column::Status.is_in(ReservationStatus::open_statuses()))
        .filter(reservations::Column::ExpiresAt.lte(now));
    if let Some(id) = raffle_id {
        query = query.filter(reservations::Column::RaffleId.eq(id));
    }
    let ids: Vec<Uuid> = query.lock_exclusive().into_tuple().all(conn).await?;
    if ids.is_empty() {
        return Ok(0);
    }
    release_reservations(conn, &ids, ReservationStatus::Expired, now).await
}

/// 删除持有关系并把仍未完成的预留置为终态
async fn release_reservations<C: ConnectionTrait>(
    conn: &C,
    ids: &[Uuid],
    status: ReservationStatus,
    now: DateTime<Utc>,
) -> AppResult<u64> {
    reserved::Entity::delete_many()
        .filter(reserved::Column::ReservationId.is_in(ids.to_vec()))
        .exec(conn)
        .await?;
    let res = reservations::Entity::update_many()
        .col_expr(reservations::Column::Status, Expr::value(status))
        .col_expr(reservations::Column::UpdatedAt, Expr::value(now))
        .filter(reservations::Column::Id.is_in(ids.to_vec()))
        .filter(reservations::Column::Status.is_in(ReservationStatus::open_statuses()))
        .exec(conn)
        .await?;
    Ok(res.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestEngine;
    use std::collections::HashSet;

    fn cfg() -> RaffleConfig {
        RaffleConfig::default()
    }

    #[test]
    fn expiry_uses_full_window_when_far_from_end() {
        let now = Utc::now();
        let expiry = compute_expiry(now, now + Duration::hours(2), &cfg()).unwrap();
        assert_eq!(expiry, now + Duration::seconds(300));
    }

    #[test]
    fn expiry_is_truncated_before_end() {
        let now = Utc::now();
        let end = now + Duration::seconds(200);
        let expiry = compute_expiry(now, end, &cfg()).unwrap();
        assert_eq!(expiry, end - Duration::seconds(60));
        assert!(expiry < end);
    }

    #[test]
    fn reservation_one_minute_before_end_is_rejected() {
        let now = Utc::now();
        let err = compute_expiry(now, now + Duration::seconds(60), &cfg()).unwrap_err();
        assert!(matches!(err, AppError::Expired(_)));
    }

    #[tokio::test]
    async fn cap_scenario_ten_tickets_cap_three() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(10, 3).await;

        let first = engine.reserve(1, raffle.id, 3).await.unwrap();
        engine
            .reservations
            .confirm(
                &Caller::user(1),
                first.id,
                PaymentSource::External {
                    reference: "pi_1".into(),
                },
            )
            .await
            .unwrap();

        let err = engine.reserve(1, raffle.id, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Exhausted(_)));

        let other = engine.reserve(2, raffle.id, 3).await.unwrap();
        assert_eq!(other.ticket_numbers.len(), 3);
        let stats = engine.tickets.raffle_statistics(raffle.id).await.unwrap();
        assert_eq!(stats.sold, 3);
        assert_eq!(stats.held, 3);
        assert_eq!(stats.available, 7);
    }

    #[tokio::test]
    async fn reservation_fails_whole_when_not_enough_tickets() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(5, 5).await;
        engine.reserve(1, raffle.id, 4).await.unwrap();

        let err = engine.reserve(2, raffle.id, 2).await.unwrap_err();
        assert!(matches!(err, AppError::Exhausted(_)));

        let stats = engine.tickets.raffle_statistics(raffle.id).await.unwrap();
        assert_eq!(stats.held, 4);
    }

    /// 并发预留后既不超卖也不共享票。测试库单连接, 事务被串行化, 校验的是最终状态而非交错执行。
    #[tokio::test]
    async fn concurrent_reservations_never_oversell_or_share_tickets() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(20, 20).await;

        let mut handles = Vec::new();
        for user in 1..=8i64 {
            let svc = engine.reservations.clone();
            let raffle_id = raffle.id;
            handles.push(tokio::spawn(async move {
                svc.reserve(&Caller::user(user), raffle_id, 3).await
            }));
        }

        let mut granted = Vec::new();
        for h in handles {
            if let Ok(r) = h.await.unwrap() {
                granted.push(r);
            }
        }
        assert_eq!(granted.len(), 6);

        let all: Vec<String> = granted.iter().flat_map(|r| r.ticket_numbers.clone()).collect();
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(all.len(), unique.len());

        let stats = engine.tickets.raffle_statistics(raffle.id).await.unwrap();
        assert!(stats.sold + stats.held <= stats.total_tickets);
        assert_eq!(stats.held, 18);
    }

    #[tokio::test]
    async fn expired_reservation_releases_tickets_and_cannot_confirm() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(4, 4).await;
        let r = engine.reserve(1, raffle.id, 4).await.unwrap();

        engine.expire_reservation_now(r.id).await;

        let err = engine
            .reservations
            .confirm(&Caller::user(1), r.id, PaymentSource::Credits)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Expired(_)));

        let got = engine
            .reservations
            .get_reservation(&Caller::user(1), r.id)
            .await
            .unwrap();
        assert_eq!(got.status, ReservationStatus::Expired);
        assert!(got.ticket_numbers.is_empty());

        // 票已释放, 其它用户可以预留
        engine.reserve(2, raffle.id, 4).await.unwrap();
    }

    #[tokio::test]
    async fn sweep_expires_only_past_due_reservations() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(10, 10).await;
        let stale = engine.reserve(1, raffle.id, 2).await.unwrap();
        let fresh = engine.reserve(2, raffle.id, 2).await.unwrap();
        engine.expire_reservation_now(stale.id).await;

        assert_eq!(engine.reservations.expire_stale_reservations().await.unwrap(), 1);
        assert_eq!(engine.reservations.expire_stale_reservations().await.unwrap(), 0);

        let fresh = engine
            .reservations
            .get_reservation(&Caller::user(2), fresh.id)
            .await
            .unwrap();
        assert_eq!(fresh.status, ReservationStatus::Active);
        assert_eq!(fresh.ticket_numbers.len(), 2);
    }

    #[tokio::test]
    async fn credits_payment_debits_ledger_atomically() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(10, 5).await; // 单价 500
        engine.fund(1, 1_200).await;

        let r = engine.reserve(1, raffle.id, 3).await.unwrap();
        let err = engine
            .reservations
            .confirm(&Caller::user(1), r.id, PaymentSource::Credits)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LedgerFailure(_)));

        // 失败后预留与计数均未变化
        let still = engine
            .reservations
            .get_reservation(&Caller::user(1), r.id)
            .await
            .unwrap();
        assert_eq!(still.status, ReservationStatus::Active);
        assert_eq!(confirmed_count(&engine.db, 1, raffle.id).await.unwrap(), 0);

        engine.fund(1, 300).await;
        let done = engine
            .reservations
            .confirm(&Caller::user(1), r.id, PaymentSource::Credits)
            .await
            .unwrap();
        assert_eq!(done.balance_after_cents, Some(0));
        assert_eq!(done.tickets.len(), 3);
        assert!(done.tickets.iter().all(|t| t.owner_id == Some(1)));
        assert_eq!(confirmed_count(&engine.db, 1, raffle.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn only_owner_confirms_and_double_confirm_conflicts() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(10, 5).await;
        let r = engine.reserve(1, raffle.id, 1).await.unwrap();
        let payment = PaymentSource::External {
            reference: "pi_9".into(),
        };

        assert!(matches!(
            engine
                .reservations
                .confirm(&Caller::user(2), r.id, payment.clone())
                .await,
            Err(AppError::Unauthorized(_))
        ));
        engine
            .reservations
            .confirm(&Caller::user(1), r.id, payment.clone())
            .await
            .unwrap();
        assert!(matches!(
            engine.reservations.confirm(&Caller::user(1), r.id, payment).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn last_confirmation_marks_raffle_sold_out() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(3, 3).await;
        let tickets = engine.buy(1, raffle.id, 3).await;
        assert_eq!(tickets.len(), 3);

        let r = raffles::Entity::find_by_id(raffle.id)
            .one(&engine.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(r.status, RaffleStatus::SoldOut);
    }

    #[tokio::test]
    async fn cancel_releases_holds() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(2, 2).await;
        let r = engine.reserve(1, raffle.id, 2).await.unwrap();

        let cancelled = engine
            .reservations
            .cancel_reservation(&Caller::user(1), r.id)
            .await
            .unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        engine.reserve(2, raffle.id, 2).await.unwrap();

        assert!(matches!(
            engine
                .reservations
                .cancel_reservation(&Caller::user(1), r.id)
                .await,
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn quantity_bounds_are_enforced() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(10, 10).await;
        assert!(matches!(
            engine.reserve(1, raffle.id, 0).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            engine.reserve(1, raffle.id, 101).await,
            Err(AppError::ValidationError(_))
        ));
    }
}
