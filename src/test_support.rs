//! 测试夹具: 内存 SQLite + 真实迁移, 以及常用的活动/购票流程

use crate::config::RaffleConfig;
use crate::entities::{
    PrizeKind, RaffleStatus, claim_allocation_entity as claims,
    ticket_reservation_entity as reservations,
};
use crate::error::AppResult;
use crate::middlewares::Caller;
use crate::models::{
    ClaimAllocationResponse, ConfigurePrizesRequest, CreateRaffleRequest, PaymentSource,
    PrizeInput, RaffleResponse, ReservationResponse,
};
use crate::services::{
    ClaimService, DrawService, InstantWinService, LedgerService, PurchaseLimitService,
    RaffleService, ReservationService, TicketService,
};
use chrono::{DateTime, Duration, Utc};
use migration::MigratorTrait;
use sea_orm::{
    ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, IntoActiveModel,
    Set,
};
use uuid::Uuid;

/// 单连接内存库: 每个连接各自一份 `:memory:`, 并发任务因此在同一连接上串行执行
pub(crate) async fn setup_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(opt).await.expect("connect sqlite");
    migration::Migrator::up(&db, None)
        .await
        .expect("run migrations");
    db
}

pub(crate) fn raffle_request(total: i32, cap: i32) -> CreateRaffleRequest {
    let now = Utc::now();
    CreateRaffleRequest {
        title: "Spring raffle".into(),
        description: None,
        ticket_price_cents: 500,
        total_tickets: total,
        max_tickets_per_user: cap,
        start_time: now - Duration::hours(1),
        end_time: now + Duration::days(1),
    }
}

pub(crate) fn draw_prize(value_cents: i64, quantity: i32) -> PrizeInput {
    PrizeInput {
        name: format!("Grand prize {value_cents}"),
        kind: PrizeKind::Draw,
        credit_value_cents: value_cents,
        quantity,
        claim_window_hours: None,
    }
}

pub(crate) struct TestEngine {
    pub db: DatabaseConnection,
    pub admin: Caller,
    pub ledger: LedgerService,
    pub raffles: RaffleService,
    pub tickets: TicketService,
    pub reservations: ReservationService,
    pub limits: PurchaseLimitService,
    pub instant_wins: InstantWinService,
    pub draws: DrawService,
    pub claims: ClaimService,
}

impl TestEngine {
    pub async fn new() -> Self {
        let db = setup_db().await;
        let config = RaffleConfig::default();
        let ledger = LedgerService::new(db.clone());
        Self {
            admin: Caller::admin(1000),
            raffles: RaffleService::new(db.clone()),
            tickets: TicketService::new(db.clone(), config.clone()),
            reservations: ReservationService::new(db.clone(), ledger.clone(), config.clone()),
            limits: PurchaseLimitService::new(db.clone()),
            instant_wins: InstantWinService::new(db.clone(), config.clone()),
            draws: DrawService::new(db.clone(), config),
            claims: ClaimService::new(db.clone(), ledger.clone()),
            ledger,
            db,
        }
    }

    /// 已上线的活动: 单价 500, 一个抽奖奖品
    pub async fn active_raffle(&self, total: i32, cap: i32) -> RaffleResponse {
        let raffle = self
            .raffles
            .create_raffle(&self.admin, raffle_request(total, cap))
            .await
            .unwrap();
        self.raffles
            .configure_prizes(
                &self.admin,
                raffle.id,
                ConfigurePrizesRequest {
                    prizes: vec![draw_prize(5_000, 1)],
                },
            )
            .await
            .unwrap();
        self.activate(raffle.id).await
    }

    pub async fn activate(&self, raffle_id: Uuid) -> RaffleResponse {
        self.raffles
            .change_status(&self.admin, raffle_id, RaffleStatus::Active, None)
            .await
            .unwrap()
    }

    pub async fn end(&self, raffle_id: Uuid) -> RaffleResponse {
        self.raffles
            .change_status(&self.admin, raffle_id, RaffleStatus::Ended, None)
            .await
            .unwrap()
    }

    pub async fn reserve(
        &self,
        user: i64,
        raffle_id: Uuid,
        quantity: i32,
    ) -> AppResult<ReservationResponse> {
        self.reservations
            .reserve(&Caller::user(user), raffle_id, quantity)
            .await
    }

    /// 预留并以外部支付确认, 返回购得的票 id
    pub async fn buy(&self, user: i64, raffle_id: Uuid, quantity: i32) -> Vec<Uuid> {
        let reservation = self.reserve(user, raffle_id, quantity).await.unwrap();
        let confirmation = self
            .reservations
            .confirm(
                &Caller::user(user),
                reservation.id,
                PaymentSource::External {
                    reference: format!("pi_{}", reservation.id.simple()),
                },
            )
            .await
            .unwrap();
        confirmation.tickets.into_iter().map(|t| t.id).collect()
    }

    pub async fn fund(&self, user: i64, amount_cents: i64) {
        self.ledger
            .adjust_balance(&self.admin, user, amount_cents, "test top-up")
            .await
            .unwrap();
    }

    pub async fn expire_reservation_now(&self, reservation_id: Uuid) {
        let mut am = reservations::Entity::find_by_id(reservation_id)
            .one(&self.db)
            .await
            .unwrap()
            .unwrap()
            .into_active_model();
        am.expires_at = Set(Utc::now() - Duration::seconds(1));
        am.update(&self.db).await.unwrap();
    }

    /// 新活动上已发现的即开奖, 返回其 PENDING 兑奖单
    pub async fn pending_claim(&self, winner: i64, value_cents: i64) -> ClaimAllocationResponse {
        let raffle = self
            .raffles
            .create_raffle(&self.admin, raffle_request(2, 2))
            .await
            .unwrap();
        self.raffles
            .configure_prizes(
                &self.admin,
                raffle.id,
                ConfigurePrizesRequest {
                    prizes: vec![PrizeInput {
                        name: "Instant credit".into(),
                        kind: PrizeKind::InstantWin,
                        credit_value_cents: value_cents,
                        quantity: 2,
                        claim_window_hours: None,
                    }],
                },
            )
            .await
            .unwrap();
        self.instant_wins
            .allocate_instant_wins(&self.admin, raffle.id, 2)
            .await
            .unwrap();
        self.activate(raffle.id).await;
        let ticket = self.buy(winner, raffle.id, 1).await[0];
        let win = self
            .instant_wins
            .discover(&Caller::user(winner), ticket)
            .await
            .unwrap()
            .unwrap();
        self.claims
            .get_allocation(&Caller::user(winner), win.claim_allocation_id.unwrap())
            .await
            .unwrap()
    }

    pub async fn set_claim_deadline(&self, allocation_id: Uuid, deadline: DateTime<Utc>) {
        let mut am = claims::Entity::find_by_id(allocation_id)
            .one(&self.db)
            .await
            .unwrap()
            .unwrap()
            .into_active_model();
        am.claim_deadline = Set(deadline);
        am.update(&self.db).await.unwrap();
    }
}
