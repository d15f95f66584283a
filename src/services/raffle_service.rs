use crate::entities::{
    PrizeKind, RaffleStatus, ReservationStatus, TicketStatus, instant_win_entity as instant_wins,
    prize_entity as prizes, raffle_entity as raffles, raffle_status_change_entity as changes,
    reserved_ticket_entity as reserved, ticket_entity as tickets,
    ticket_reservation_entity as reservations,
};
use crate::error::{AppError, AppResult};
use crate::middlewares::Caller;
use crate::models::{
    ConfigurePrizesRequest, CreateRaffleRequest, PaginatedResponse, PaginationParams, PrizeInput,
    PrizeResponse, PrizeValidationResponse, RaffleListQuery, RaffleResponse,
    RaffleStatusChangeResponse, UpdateRaffleRequest,
};
use crate::utils::format_ticket_number;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

const MAX_TOTAL_TICKETS: i32 = 100_000;
const TICKET_INSERT_CHUNK: usize = 500;

#[derive(Clone)]
pub struct RaffleService {
    pool: DatabaseConnection,
}

impl RaffleService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 创建活动 (DRAFT) 并一次性生成全部票 (AVAILABLE)
    pub async fn create_raffle(
        &self,
        caller: &Caller,
        req: CreateRaffleRequest,
    ) -> AppResult<RaffleResponse> {
        caller.require_admin()?;
        validate_raffle_fields(
            &req.title,
            req.ticket_price_cents,
            req.max_tickets_per_user,
            req.start_time,
            req.end_time,
        )?;
        if req.total_tickets < 1 || req.total_tickets > MAX_TOTAL_TICKETS {
            return Err(AppError::ValidationError(format!(
                "Total tickets must be between 1 and {MAX_TOTAL_TICKETS}"
            )));
        }
        if req.max_tickets_per_user > req.total_tickets {
            return Err(AppError::ValidationError(
                "Per-user cap cannot exceed total tickets".into(),
            ));
        }

        let now = Utc::now();
        let raffle_id = Uuid::new_v4();
        let txn = self.pool.begin().await?;

        let raffle = raffles::ActiveModel {
            id: Set(raffle_id),
            title: Set(req.title.trim().to_string()),
            description: Set(req.description),
            ticket_price_cents: Set(req.ticket_price_cents),
            total_tickets: Set(req.total_tickets),
            max_tickets_per_user: Set(req.max_tickets_per_user),
            start_time: Set(req.start_time),
            end_time: Set(req.end_time),
            status: Set(RaffleStatus::Draft),
            created_by: Set(caller.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let numbers: Vec<i32> = (1..=req.total_tickets).collect();
        for chunk in numbers.chunks(TICKET_INSERT_CHUNK) {
            let rows = chunk.iter().map(|&n| tickets::ActiveModel {
                id: Set(Uuid::new_v4()),
                raffle_id: Set(raffle_id),
                ticket_number: Set(format_ticket_number(n, req.total_tickets)),
                owner_id: Set(None),
                status: Set(TicketStatus::Available),
                purchased_at: Set(None),
                reservation_id: Set(None),
                instant_win_eligible: Set(false),
                instant_win: Set(false),
                revealed_at: Set(None),
                reveal_sequence: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            });
            tickets::Entity::insert_many(rows)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        log::info!(
            "Raffle {raffle_id} created with {} tickets by {}",
            req.total_tickets,
            caller.user_id
        );
        Ok(raffle.into())
    }

    pub async fn get_raffle(&self, raffle_id: Uuid) -> AppResult<RaffleResponse> {
        Ok(find_raffle(&self.pool, raffle_id).await?.into())
    }

    pub async fn list_raffles(
        &self,
        query: &RaffleListQuery,
    ) -> AppResult<PaginatedResponse<RaffleResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);
        let mut base = raffles::Entity::find();
        if let Some(status) = query.status {
            base = base.filter(raffles::Column::Status.eq(status));
        }

        let total = base.clone().count(&self.pool).await?;
        let items = base
            .order_by_desc(raffles::Column::CreatedAt)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;

        Ok(PaginatedResponse::new(
            items.into_iter().map(Into::into).collect(),
            params,
            total,
        ))
    }

    /// 仅 DRAFT / COMING_SOON 可编辑; total_tickets 不可修改
    pub async fn update_raffle(
        &self,
        caller: &Caller,
        raffle_id: Uuid,
        req: UpdateRaffleRequest,
    ) -> AppResult<RaffleResponse> {
        caller.require_admin()?;
        let txn = self.pool.begin().await?;
        let raffle = lock_raffle(&txn, raffle_id).await?;
        if !matches!(raffle.status, RaffleStatus::Draft | RaffleStatus::ComingSoon) {
            return Err(AppError::InvalidTransition(format!(
                "Raffle in {} status cannot be edited",
                raffle.status
            )));
        }

        let title = req.title.unwrap_or_else(|| raffle.title.clone());
        let price = req.ticket_price_cents.unwrap_or(raffle.ticket_price_cents);
        let cap = req.max_tickets_per_user.unwrap_or(raffle.max_tickets_per_user);
        let start = req.start_time.unwrap_or(raffle.start_time);
        let end = req.end_time.unwrap_or(raffle.end_time);
        validate_raffle_fields(&title, price, cap, start, end)?;
        if cap > raffle.total_tickets {
            return Err(AppError::ValidationError(
                "Per-user cap cannot exceed total tickets".into(),
            ));
        }
        if raffle.status == RaffleStatus::ComingSoon && start <= Utc::now() {
            return Err(AppError::ValidationError(
                "Coming-soon raffle must start in the future".into(),
            ));
        }

        let description = req.description.or_else(|| raffle.description.clone());
        let mut am = raffle.into_active_model();
        am.title = Set(title.trim().to_string());
        am.description = Set(description);
        am.ticket_price_cents = Set(price);
        am.max_tickets_per_user = Set(cap);
        am.start_time = Set(start);
        am.end_time = Set(end);
        am.updated_at = Set(Utc::now());
        let updated = am.update(&txn).await?;
        txn.commit().await?;
        Ok(updated.into())
    }

    /// 手动状态变更
    pub async fn change_status(
        &self,
        caller: &Caller,
        raffle_id: Uuid,
        next: RaffleStatus,
        reason: Option<String>,
    ) -> AppResult<RaffleResponse> {
        caller.require_admin()?;
        let txn = self.pool.begin().await?;
        let raffle = lock_raffle(&txn, raffle_id).await?;
        let updated =
            apply_transition(&txn, raffle, next, Some(caller.user_id), reason, Utc::now()).await?;
        txn.commit().await?;
        Ok(updated.into())
    }

    pub async fn status_history(
        &self,
        raffle_id: Uuid,
    ) -> AppResult<Vec<RaffleStatusChangeResponse>> {
        find_raffle(&self.pool, raffle_id).await?;
        let list = changes::Entity::find()
            .filter(changes::Column::RaffleId.eq(raffle_id))
            .order_by_asc(changes::Column::CreatedAt)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    /// 替换奖品配置 (仅 DRAFT 且尚未分配即开奖)
    pub async fn configure_prizes(
        &self,
        caller: &Caller,
        raffle_id: Uuid,
        req: ConfigurePrizesRequest,
    ) -> AppResult<Vec<PrizeResponse>> {
        caller.require_admin()?;
        for p in &req.prizes {
            validate_prize_input(p)?;
        }

        let txn = self.pool.begin().await?;
        let raffle = lock_raffle(&txn, raffle_id).await?;
        if raffle.status != RaffleStatus::Draft {
            return Err(AppError::InvalidTransition(
                "Prizes can only be configured while the raffle is a draft".into(),
            ));
        }
        let allocated = instant_wins::Entity::find()
            .filter(instant_wins::Column::RaffleId.eq(raffle_id))
            .count(&txn)
            .await?;
        if allocated > 0 {
            return Err(AppError::Conflict(
                "Instant wins are already bound to the current prizes".into(),
            ));
        }

        prizes::Entity::delete_many()
            .filter(prizes::Column::RaffleId.eq(raffle_id))
            .exec(&txn)
            .await?;

        let now = Utc::now();
        let mut created = Vec::with_capacity(req.prizes.len());
        for p in req.prizes {
            let model = prizes::ActiveModel {
                id: Set(Uuid::new_v4()),
                raffle_id: Set(raffle_id),
                name: Set(p.name.trim().to_string()),
                kind: Set(p.kind),
                credit_value_cents: Set(p.credit_value_cents),
                quantity: Set(p.quantity),
                claim_window_hours: Set(p.claim_window_hours),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
            created.push(model.into());
        }

        txn.commit().await?;
        log::info!("Raffle {raffle_id}: {} prizes configured", created.len());
        Ok(created)
    }

    pub async fn list_prizes(&self, raffle_id: Uuid) -> AppResult<Vec<PrizeResponse>> {
        find_raffle(&self.pool, raffle_id).await?;
        let list = prizes::Entity::find()
            .filter(prizes::Column::RaffleId.eq(raffle_id))
            .order_by_desc(prizes::Column::CreditValueCents)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    pub async fn validate_prize_configuration(
        &self,
        raffle_id: Uuid,
    ) -> AppResult<PrizeValidationResponse> {
        let raffle = find_raffle(&self.pool, raffle_id).await?;
        let list = prizes::Entity::find()
            .filter(prizes::Column::RaffleId.eq(raffle_id))
            .all(&self.pool)
            .await?;
        Ok(validate_prizes(&list, raffle.total_tickets))
    }

    /// 定时任务: 结束时间已到的 ACTIVE / SOLD_OUT 活动转为 ENDED
    pub async fn close_ended_raffles(&self) -> AppResult<u64> {
        let now = Utc::now();
        let due: Vec<Uuid> = raffles::Entity::find()
            .select_only()
            .column(raffles::Column::Id)
            .filter(raffles::Column::Status.is_in([RaffleStatus::Active, RaffleStatus::SoldOut]))
            .filter(raffles::Column::EndTime.lte(now))
            .into_tuple()
            .all(&self.pool)
            .await?;

        let mut closed = 0;
        for raffle_id in due {
            let txn = self.pool.begin().await?;
            let raffle = lock_raffle(&txn, raffle_id).await?;
            // 加锁后重新确认, 期间可能已被人工处理
            if !matches!(raffle.status, RaffleStatus::Active | RaffleStatus::SoldOut)
                || raffle.end_time > now
            {
                continue;
            }
            apply_transition(
                &txn,
                raffle,
                RaffleStatus::Ended,
                None,
                Some("End time reached".into()),
                now,
            )
            .await?;
            txn.commit().await?;
            closed += 1;
        }
        Ok(closed)
    }
}

pub(crate) async fn find_raffle<C: ConnectionTrait>(
    conn: &C,
    raffle_id: Uuid,
) -> AppResult<raffles::Model> {
    raffles::Entity::find_by_id(raffle_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Raffle {raffle_id} not found")))
}

/// SELECT ... FOR UPDATE
pub(crate) async fn lock_raffle<C: ConnectionTrait>(
    conn: &C,
    raffle_id: Uuid,
) -> AppResult<raffles::Model> {
    raffles::Entity::find_by_id(raffle_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Raffle {raffle_id} not found")))
}

/// 状态机唯一的写入口: 校验迁移表与时间前置条件, 写审计记录, 执行取消的副作用。
/// 调用方需已持有活动行锁。
pub(crate) async fn apply_transition<C: ConnectionTrait>(
    conn: &C,
    raffle: raffles::Model,
    next: RaffleStatus,
    actor: Option<i64>,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> AppResult<raffles::Model> {
    let previous = raffle.status;
    if !previous.can_transition_to(next) {
        return Err(AppError::InvalidTransition(format!(
            "Raffle cannot move from {previous} to {next}"
        )));
    }

    match next {
        RaffleStatus::ComingSoon if now >= raffle.start_time => {
            return Err(AppError::InvalidTransition(
                "Coming-soon requires a start time in the future".into(),
            ));
        }
        RaffleStatus::Active => {
            if !raffle.is_within_window(now) {
                return Err(AppError::InvalidTransition(
                    "Raffle can only be activated within its sales window".into(),
                ));
            }
            let configured = prizes::Entity::find()
                .filter(prizes::Column::RaffleId.eq(raffle.id))
                .all(conn)
                .await?;
            let validation = validate_prizes(&configured, raffle.total_tickets);
            if !validation.valid {
                return Err(AppError::InvalidTransition(format!(
                    "Prize configuration is invalid: {}",
                    validation.errors.join("; ")
                )));
            }
        }
        _ => {}
    }

    let raffle_id = raffle.id;
    let mut am = raffle.into_active_model();
    am.status = Set(next);
    am.updated_at = Set(now);
    let updated = am.update(conn).await?;

    changes::ActiveModel {
        id: Set(Uuid::new_v4()),
        raffle_id: Set(raffle_id),
        previous_status: Set(previous),
        new_status: Set(next),
        changed_by: Set(actor),
        reason: Set(reason),
        created_at: Set(now),
    }
    .insert(conn)
    .await?;

    if next == RaffleStatus::Cancelled {
        cancel_open_inventory(conn, raffle_id, now).await?;
    }

    log::info!("Raffle {raffle_id}: {previous} -> {next} (actor={actor:?})");
    Ok(updated)
}

/// 取消活动: 未售票作废, 未完成的预留单取消并释放
async fn cancel_open_inventory<C: ConnectionTrait>(
    conn: &C,
    raffle_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let open: Vec<Uuid> = reservations::Entity::find()
        .select_only()
        .column(reservations::Column::Id)
        .filter(reservations::Column::RaffleId.eq(raffle_id))
        .filter(reservations::Column::Status.is_in(ReservationStatus::open_statuses()))
        .lock_exclusive()
        .into_tuple()
        .all(conn)
        .await?;

    if !open.is_empty() {
        reserved::Entity::delete_many()
            .filter(reserved::Column::ReservationId.is_in(open.clone()))
            .exec(conn)
            .await?;
        reservations::Entity::update_many()
            .col_expr(
                reservations::Column::Status,
                Expr::value(ReservationStatus::Cancelled),
            )
            .col_expr(reservations::Column::UpdatedAt, Expr::value(now))
            .filter(reservations::Column::Id.is_in(open.clone()))
            .exec(conn)
            .await?;
    }

    let voided = tickets::Entity::update_many()
        .col_expr(tickets::Column::Status, Expr::value(TicketStatus::Cancelled))
        .col_expr(tickets::Column::UpdatedAt, Expr::value(now))
        .filter(tickets::Column::RaffleId.eq(raffle_id))
        .filter(tickets::Column::Status.eq(TicketStatus::Available))
        .exec(conn)
        .await?;

    log::info!(
        "Raffle {raffle_id} cancelled: {} tickets cancelled, {} reservations released",
        voided.rows_affected,
        open.len()
    );
    Ok(())
}

fn validate_raffle_fields(
    title: &str,
    price_cents: i64,
    cap: i32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<()> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > 100 {
        return Err(AppError::ValidationError(
            "Title must be 1-100 characters".into(),
        ));
    }
    if price_cents <= 0 {
        return Err(AppError::ValidationError(
            "Ticket price must be positive".into(),
        ));
    }
    if cap < 1 {
        return Err(AppError::ValidationError(
            "Per-user cap must be at least 1".into(),
        ));
    }
    if start >= end {
        return Err(AppError::ValidationError(
            "Start time must be before end time".into(),
        ));
    }
    Ok(())
}

fn validate_prize_input(p: &PrizeInput) -> AppResult<()> {
    if p.name.trim().is_empty() {
        return Err(AppError::ValidationError("Prize name is required".into()));
    }
    if p.quantity < 1 {
        return Err(AppError::ValidationError(
            "Prize quantity must be positive".into(),
        ));
    }
    if p.credit_value_cents < 0 {
        return Err(AppError::ValidationError(
            "Prize value must not be negative".into(),
        ));
    }
    if matches!(p.claim_window_hours, Some(h) if h < 1) {
        return Err(AppError::ValidationError(
            "Claim window must be at least one hour".into(),
        ));
    }
    Ok(())
}

/// 激活前的奖品配置校验
pub(crate) fn validate_prizes(list: &[prizes::Model], total_tickets: i32) -> PrizeValidationResponse {
    let mut errors = Vec::new();
    if list.is_empty() {
        errors.push("At least one prize must be configured".to_string());
    }

    let mut instant_win_slots = 0i64;
    let mut draw_slots = 0i64;
    for p in list {
        if p.quantity < 1 {
            errors.push(format!("Prize '{}' has no quantity", p.name));
        }
        if p.credit_value_cents < 0 {
            errors.push(format!("Prize '{}' has a negative value", p.name));
        }
        match p.kind {
            PrizeKind::InstantWin => instant_win_slots += i64::from(p.quantity.max(0)),
            PrizeKind::Draw => draw_slots += i64::from(p.quantity.max(0)),
        }
    }
    if instant_win_slots > i64::from(total_tickets) {
        errors.push(format!(
            "Instant-win prizes ({instant_win_slots}) exceed total tickets ({total_tickets})"
        ));
    }

    PrizeValidationResponse {
        valid: errors.is_empty(),
        errors,
        instant_win_slots,
        draw_slots,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ticket_entity;
    use crate::test_support::{TestEngine, draw_prize, raffle_request};
    use chrono::Duration;

    fn prize(kind: PrizeKind, quantity: i32, value: i64) -> prizes::Model {
        prizes::Model {
            id: Uuid::new_v4(),
            raffle_id: Uuid::new_v4(),
            name: "p".into(),
            kind,
            credit_value_cents: value,
            quantity,
            claim_window_hours: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn prize_validation_rules() {
        assert!(!validate_prizes(&[], 10).valid);
        let ok = validate_prizes(
            &[prize(PrizeKind::Draw, 1, 1000), prize(PrizeKind::InstantWin, 3, 100)],
            10,
        );
        assert!(ok.valid);
        assert_eq!(ok.instant_win_slots, 3);
        assert_eq!(ok.draw_slots, 1);

        let too_many = validate_prizes(&[prize(PrizeKind::InstantWin, 11, 100)], 10);
        assert!(!too_many.valid);
    }

    #[tokio::test]
    async fn create_generates_padded_ticket_numbers() {
        let engine = TestEngine::new().await;
        let raffle = engine
            .raffles
            .create_raffle(&engine.admin, raffle_request(12, 3))
            .await
            .unwrap();
        assert_eq!(raffle.status, RaffleStatus::Draft);

        let mut numbers: Vec<String> = ticket_entity::Entity::find()
            .filter(ticket_entity::Column::RaffleId.eq(raffle.id))
            .all(&engine.db)
            .await
            .unwrap()
            .into_iter()
            .map(|t| {
                assert_eq!(t.status, TicketStatus::Available);
                t.ticket_number
            })
            .collect();
        numbers.sort();
        assert_eq!(numbers.len(), 12);
        assert_eq!(numbers.first().map(String::as_str), Some("001"));
        assert_eq!(numbers.last().map(String::as_str), Some("012"));
    }

    #[tokio::test]
    async fn activation_requires_valid_prizes_and_records_history() {
        let engine = TestEngine::new().await;
        let raffle = engine
            .raffles
            .create_raffle(&engine.admin, raffle_request(10, 3))
            .await
            .unwrap();

        let err = engine
            .raffles
            .change_status(&engine.admin, raffle.id, RaffleStatus::Active, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        engine
            .raffles
            .configure_prizes(
                &engine.admin,
                raffle.id,
                ConfigurePrizesRequest {
                    prizes: vec![draw_prize(5_000, 1)],
                },
            )
            .await
            .unwrap();
        engine
            .raffles
            .change_status(&engine.admin, raffle.id, RaffleStatus::Active, Some("go".into()))
            .await
            .unwrap();

        let history = engine.raffles.status_history(raffle.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].previous_status, RaffleStatus::Draft);
        assert_eq!(history[0].new_status, RaffleStatus::Active);
        assert_eq!(history[0].changed_by, Some(engine.admin.user_id));
    }

    #[tokio::test]
    async fn illegal_and_time_gated_transitions_are_rejected() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(10, 3).await;

        // active 之后不能回到 coming_soon
        assert!(matches!(
            engine
                .raffles
                .change_status(&engine.admin, raffle.id, RaffleStatus::ComingSoon, None)
                .await,
            Err(AppError::InvalidTransition(_))
        ));

        // 已开始的活动不能设置为 coming_soon
        engine
            .raffles
            .change_status(&engine.admin, raffle.id, RaffleStatus::Inactive, None)
            .await
            .unwrap();
        assert!(matches!(
            engine
                .raffles
                .change_status(&engine.admin, raffle.id, RaffleStatus::ComingSoon, None)
                .await,
            Err(AppError::InvalidTransition(_))
        ));

        assert!(matches!(
            engine
                .raffles
                .change_status(&Caller::user(5), raffle.id, RaffleStatus::Active, None)
                .await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn cancel_releases_holds_and_cancels_unsold_tickets() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(10, 5).await;
        let held = engine.reserve(1, raffle.id, 2).await.unwrap();
        engine.buy(2, raffle.id, 3).await;

        engine
            .raffles
            .change_status(
                &engine.admin,
                raffle.id,
                RaffleStatus::Cancelled,
                Some("venue closed".into()),
            )
            .await
            .unwrap();

        let reservation = engine
            .reservations
            .get_reservation(&Caller::user(1), held.id)
            .await
            .unwrap();
        assert_eq!(reservation.status, ReservationStatus::Cancelled);
        assert!(reservation.ticket_numbers.is_empty());

        let stats = engine.tickets.raffle_statistics(raffle.id).await.unwrap();
        assert_eq!(stats.sold, 3);
        assert_eq!(stats.cancelled, 7);
        assert_eq!(stats.available, 0);
        assert_eq!(stats.held, 0);

        // 终态
        assert!(matches!(
            engine
                .raffles
                .change_status(&engine.admin, raffle.id, RaffleStatus::Active, None)
                .await,
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn close_sweep_ends_raffles_past_end_time() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(10, 3).await;

        let mut am = raffles::Entity::find_by_id(raffle.id)
            .one(&engine.db)
            .await
            .unwrap()
            .unwrap()
            .into_active_model();
        am.end_time = Set(Utc::now() - Duration::seconds(1));
        am.update(&engine.db).await.unwrap();

        assert_eq!(engine.raffles.close_ended_raffles().await.unwrap(), 1);
        assert_eq!(engine.raffles.close_ended_raffles().await.unwrap(), 0);

        let ended = engine.raffles.get_raffle(raffle.id).await.unwrap();
        assert_eq!(ended.status, RaffleStatus::Ended);
        let history = engine.raffles.status_history(raffle.id).await.unwrap();
        assert_eq!(history.last().unwrap().changed_by, None);
    }

    #[tokio::test]
    async fn prizes_are_frozen_outside_draft() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(10, 3).await;
        assert!(matches!(
            engine
                .raffles
                .configure_prizes(
                    &engine.admin,
                    raffle.id,
                    ConfigurePrizesRequest {
                        prizes: vec![draw_prize(100, 1)],
                    },
                )
                .await,
            Err(AppError::InvalidTransition(_))
        ));

        let edit = engine
            .raffles
            .update_raffle(
                &engine.admin,
                raffle.id,
                UpdateRaffleRequest {
                    title: Some("new".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(edit, Err(AppError::InvalidTransition(_))));
    }
}
