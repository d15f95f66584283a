use crate::entities::{
    ClaimMethod, ClaimSource, ClaimStatus, CreditReferenceType, InstantWinStatus,
    claim_allocation_entity as claims,
};
use crate::error::{AppError, AppResult};
use crate::middlewares::Caller;
use crate::models::{
    ClaimAllocationResponse, ClaimReceipt, ClaimStatisticsResponse, CompleteClaimRequest,
    PageQuery, PaginatedResponse, PaginationParams,
};
use crate::services::LedgerService;
use crate::services::instant_win_service::follow_claim;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

/// 新兑奖单 (即开奖发现 / 抽奖开奖时创建)
#[derive(Debug, Clone)]
pub(crate) struct NewAllocation {
    pub raffle_id: Uuid,
    pub prize_id: Uuid,
    pub ticket_id: Uuid,
    pub winner_id: i64,
    pub source: ClaimSource,
    /// 中奖时的奖品价值快照, 后续配置变化不影响
    pub value_cents: i64,
    pub deadline: DateTime<Utc>,
    pub won_at: DateTime<Utc>,
}

pub(crate) async fn insert_allocation<C: ConnectionTrait>(
    conn: &C,
    new: NewAllocation,
) -> AppResult<claims::Model> {
    let model = claims::ActiveModel {
        id: Set(Uuid::new_v4()),
        raffle_id: Set(new.raffle_id),
        prize_id: Set(new.prize_id),
        ticket_id: Set(new.ticket_id),
        winner_id: Set(new.winner_id),
        source: Set(new.source),
        status: Set(ClaimStatus::Pending),
        original_value_cents: Set(new.value_cents),
        claimed_value_cents: Set(None),
        claim_method: Set(None),
        claim_deadline: Set(new.deadline),
        won_at: Set(new.won_at),
        approved_at: Set(None),
        claimed_at: Set(None),
        created_at: Set(new.won_at),
        updated_at: Set(new.won_at),
    }
    .insert(conn)
    .await?;
    Ok(model)
}

/// 票作废时撤销其未结兑奖单 (PENDING / APPROVED -> CANCELLED), 关联即开奖同步为 EXPIRED
pub(crate) async fn cancel_ticket_claims<C: ConnectionTrait>(
    conn: &C,
    ticket_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<u64> {
    let ids: Vec<Uuid> = claims::Entity::find()
        .select_only()
        .column(claims::Column::Id)
        .filter(claims::Column::TicketId.eq(ticket_id))
        .filter(claims::Column::Status.is_in([ClaimStatus::Pending, ClaimStatus::Approved]))
        .lock_exclusive()
        .into_tuple()
        .all(conn)
        .await?;
    if ids.is_empty() {
        return Ok(0);
    }

    let res = claims::Entity::update_many()
        .col_expr(claims::Column::Status, Expr::value(ClaimStatus::Cancelled))
        .col_expr(claims::Column::UpdatedAt, Expr::value(now))
        .filter(claims::Column::Id.is_in(ids.clone()))
        .exec(conn)
        .await?;
    for id in &ids {
        follow_claim(conn, *id, InstantWinStatus::Expired, now).await?;
    }
    Ok(res.rows_affected)
}

/// 兑奖结算
///
/// PENDING -> APPROVED -> CLAIMED; 截止时间过后 PENDING/APPROVED -> EXPIRED。
/// 每一步都在兑奖单行锁下完成, 入账与状态翻转同一事务。
#[derive(Clone)]
pub struct ClaimService {
    pool: DatabaseConnection,
    ledger: LedgerService,
}

impl ClaimService {
    pub fn new(pool: DatabaseConnection, ledger: LedgerService) -> Self {
        Self { pool, ledger }
    }

    /// 发起兑奖 (仅中奖用户, 仅 PENDING)
    pub async fn initiate_claim(
        &self,
        caller: &Caller,
        allocation_id: Uuid,
    ) -> AppResult<ClaimAllocationResponse> {
        let now = Utc::now();
        let txn = self.pool.begin().await?;
        let allocation = lock_allocation(&txn, allocation_id).await?;
        if allocation.winner_id != caller.user_id {
            return Err(AppError::Unauthorized(
                "Only the winner can claim this prize".into(),
            ));
        }
        match allocation.status {
            ClaimStatus::Pending => {}
            ClaimStatus::Approved | ClaimStatus::Claimed => {
                return Err(AppError::Conflict(format!(
                    "Claim is already {}",
                    allocation.status
                )));
            }
            ClaimStatus::Expired => {
                return Err(AppError::Expired("Claim deadline has passed".into()));
            }
            ClaimStatus::Cancelled => {
                return Err(AppError::InvalidTransition("Claim was cancelled".into()));
            }
        }

        if allocation.is_past_deadline(now) {
            expire_in(&txn, allocation, now).await?;
            txn.commit().await?;
            return Err(AppError::Expired("Claim deadline has passed".into()));
        }

        let mut am = allocation.into_active_model();
        am.status = Set(ClaimStatus::Approved);
        am.approved_at = Set(Some(now));
        am.updated_at = Set(now);
        let approved = am.update(&txn).await?;
        follow_claim(&txn, approved.id, InstantWinStatus::PendingClaim, now).await?;

        txn.commit().await?;
        log::info!(
            "Claim {allocation_id} approved for user {}",
            approved.winner_id
        );
        Ok(approved.into())
    }

    /// 完成兑奖: 入账 + CLAIMED, 入账失败时保持 APPROVED
    pub async fn complete_claim(
        &self,
        caller: &Caller,
        allocation_id: Uuid,
        req: CompleteClaimRequest,
    ) -> AppResult<ClaimReceipt> {
        let now = Utc::now();
        let txn = self.pool.begin().await?;
        let allocation = lock_allocation(&txn, allocation_id).await?;
        if allocation.winner_id != caller.user_id {
            return Err(AppError::Unauthorized(
                "Only the winner can claim this prize".into(),
            ));
        }
        match allocation.status {
            ClaimStatus::Approved => {}
            ClaimStatus::Claimed => {
                return Err(AppError::Conflict("Prize already claimed".into()));
            }
            ClaimStatus::Expired => {
                return Err(AppError::Expired("Claim deadline has passed".into()));
            }
            ClaimStatus::Pending | ClaimStatus::Cancelled => {
                return Err(AppError::InvalidTransition(format!(
                    "Claim is {} and cannot be completed",
                    allocation.status
                )));
            }
        }

        if allocation.is_past_deadline(now) {
            expire_in(&txn, allocation, now).await?;
            txn.commit().await?;
            return Err(AppError::Expired("Claim deadline has passed".into()));
        }

        // 价值以中奖时快照为准
        if let Some(value) = req.value_cents
            && value != allocation.original_value_cents
        {
            return Err(AppError::ValidationError(format!(
                "Claim value must equal the won value of {} cents",
                allocation.original_value_cents
            )));
        }

        let tx = match req.method {
            ClaimMethod::Credit => {
                self.ledger
                    .credit(
                        &txn,
                        allocation.winner_id,
                        allocation.original_value_cents,
                        CreditReferenceType::PrizeClaim,
                        allocation.id,
                        "Prize claim",
                    )
                    .await?
            }
        };

        let value = allocation.original_value_cents;
        let mut am = allocation.into_active_model();
        am.status = Set(ClaimStatus::Claimed);
        am.claimed_value_cents = Set(Some(value));
        am.claim_method = Set(Some(req.method));
        am.claimed_at = Set(Some(now));
        am.updated_at = Set(now);
        let claimed = am.update(&txn).await?;
        follow_claim(&txn, claimed.id, InstantWinStatus::Claimed, now).await?;

        txn.commit().await?;
        log::info!(
            "Claim {allocation_id} completed: {value} cents credited to user {}",
            claimed.winner_id
        );
        Ok(ClaimReceipt {
            allocation: claimed.into(),
            transaction_id: tx.id,
            balance_after_cents: tx.balance_after_cents,
        })
    }

    /// 批量过期: 只处理超过截止时间的 PENDING, 不触碰 APPROVED / CLAIMED
    pub async fn expire_stale_claims(&self) -> AppResult<u64> {
        let now = Utc::now();
        let txn = self.pool.begin().await?;
        let ids: Vec<Uuid> = claims::Entity::find()
            .select_only()
            .column(claims::Column::Id)
            .filter(claims::Column::Status.eq(ClaimStatus::Pending))
            .filter(claims::Column::ClaimDeadline.lte(now))
            .lock_exclusive()
            .into_tuple()
            .all(&txn)
            .await?;
        if ids.is_empty() {
            return Ok(0);
        }

        let res = claims::Entity::update_many()
            .col_expr(claims::Column::Status, Expr::value(ClaimStatus::Expired))
            .col_expr(claims::Column::UpdatedAt, Expr::value(now))
            .filter(claims::Column::Id.is_in(ids.clone()))
            .filter(claims::Column::Status.eq(ClaimStatus::Pending))
            .exec(&txn)
            .await?;
        for id in &ids {
            follow_claim(&txn, *id, InstantWinStatus::Expired, now).await?;
        }
        txn.commit().await?;
        Ok(res.rows_affected)
    }

    /// 管理员作废兑奖单 (PENDING / APPROVED)
    pub async fn cancel_allocation(
        &self,
        caller: &Caller,
        allocation_id: Uuid,
        reason: &str,
    ) -> AppResult<ClaimAllocationResponse> {
        caller.require_admin()?;
        if reason.trim().is_empty() {
            return Err(AppError::ValidationError("Reason is required".into()));
        }
        let now = Utc::now();
        let txn = self.pool.begin().await?;
        let allocation = lock_allocation(&txn, allocation_id).await?;
        if !allocation.status.can_transition_to(ClaimStatus::Cancelled) {
            return Err(AppError::InvalidTransition(format!(
                "Claim is {} and cannot be cancelled",
                allocation.status
            )));
        }
        let mut am = allocation.into_active_model();
        am.status = Set(ClaimStatus::Cancelled);
        am.updated_at = Set(now);
        let cancelled = am.update(&txn).await?;
        follow_claim(&txn, cancelled.id, InstantWinStatus::Expired, now).await?;
        txn.commit().await?;

        log::info!(
            "Claim {allocation_id} cancelled by admin {}: {}",
            caller.user_id,
            reason.trim()
        );
        Ok(cancelled.into())
    }

    pub async fn get_allocation(
        &self,
        caller: &Caller,
        allocation_id: Uuid,
    ) -> AppResult<ClaimAllocationResponse> {
        let allocation = claims::Entity::find_by_id(allocation_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Claim {allocation_id} not found")))?;
        caller.require_owner_or_admin(allocation.winner_id)?;
        Ok(allocation.into())
    }

    pub async fn user_allocations(
        &self,
        caller: &Caller,
        query: &PageQuery,
    ) -> AppResult<PaginatedResponse<ClaimAllocationResponse>> {
        let params = PaginationParams::from(query);
        let base = claims::Entity::find().filter(claims::Column::WinnerId.eq(caller.user_id));
        let total = base.clone().count(&self.pool).await?;
        let rows = base
            .order_by_desc(claims::Column::WonAt)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;
        Ok(PaginatedResponse::new(
            rows.into_iter().map(Into::into).collect(),
            params,
            total,
        ))
    }

    pub async fn claim_statistics(&self, raffle_id: Uuid) -> AppResult<ClaimStatisticsResponse> {
        let rows = claims::Entity::find()
            .filter(claims::Column::RaffleId.eq(raffle_id))
            .all(&self.pool)
            .await?;

        let mut stats = ClaimStatisticsResponse {
            raffle_id,
            ..Default::default()
        };
        for c in &rows {
            stats.total += 1;
            match c.status {
                ClaimStatus::Pending => stats.pending += 1,
                ClaimStatus::Approved => stats.approved += 1,
                ClaimStatus::Claimed => stats.claimed += 1,
                ClaimStatus::Expired => stats.expired += 1,
                ClaimStatus::Cancelled => stats.cancelled += 1,
            }
            match c.status {
                ClaimStatus::Claimed => {
                    stats.claimed_value_cents += c.claimed_value_cents.unwrap_or(0)
                }
                ClaimStatus::Pending | ClaimStatus::Approved => {
                    stats.outstanding_value_cents += c.original_value_cents
                }
                _ => {}
            }
        }
        Ok(stats)
    }
}

async fn lock_allocation<C: ConnectionTrait>(
    conn: &C,
    allocation_id: Uuid,
) -> AppResult<claims::Model> {
    claims::Entity::find_by_id(allocation_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Claim {allocation_id} not found")))
}

async fn expire_in<C: ConnectionTrait>(
    conn: &C,
    allocation: claims::Model,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let id = allocation.id;
    let mut am = allocation.into_active_model();
    am.status = Set(ClaimStatus::Expired);
    am.updated_at = Set(now);
    am.update(conn).await?;
    follow_claim(conn, id, InstantWinStatus::Expired, now).await?;
    log::info!("Claim {id} expired at deadline");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{credit_transaction_entity as transactions, instant_win_entity};
    use crate::test_support::TestEngine;
    use chrono::Duration;

    fn credit(value_cents: Option<i64>) -> CompleteClaimRequest {
        CompleteClaimRequest {
            value_cents,
            method: ClaimMethod::Credit,
        }
    }

    async fn claim_credits(engine: &TestEngine, allocation_id: Uuid) -> u64 {
        transactions::Entity::find()
            .filter(transactions::Column::ReferenceType.eq(CreditReferenceType::PrizeClaim))
            .filter(transactions::Column::ReferenceId.eq(allocation_id))
            .count(&engine.db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn full_claim_credits_won_value_once() {
        let engine = TestEngine::new().await;
        let allocation = engine.pending_claim(5, 2_500).await;

        engine
            .claims
            .initiate_claim(&Caller::user(5), allocation.id)
            .await
            .unwrap();
        assert!(matches!(
            engine
                .claims
                .complete_claim(&Caller::user(5), allocation.id, credit(Some(9_999)))
                .await,
            Err(AppError::ValidationError(_))
        ));

        let receipt = engine
            .claims
            .complete_claim(&Caller::user(5), allocation.id, credit(Some(2_500)))
            .await
            .unwrap();
        assert_eq!(receipt.allocation.status, ClaimStatus::Claimed);
        assert_eq!(receipt.allocation.claimed_value_cents, Some(2_500));
        assert_eq!(receipt.balance_after_cents, 2_500);
        assert_eq!(claim_credits(&engine, allocation.id).await, 1);

        assert!(matches!(
            engine
                .claims
                .complete_claim(&Caller::user(5), allocation.id, credit(None))
                .await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(engine.ledger.balance(5).await.unwrap().balance_cents, 2_500);
    }

    /// 并发发起/完成兑奖后只有一次到账。测试库单连接, 事务被串行化, 校验的是最终状态而非交错执行。
    #[tokio::test]
    async fn concurrent_claims_settle_exactly_once() {
        let engine = TestEngine::new().await;
        let allocation = engine.pending_claim(5, 1_000).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let svc = engine.claims.clone();
            let id = allocation.id;
            handles.push(tokio::spawn(async move {
                let caller = Caller::user(5);
                svc.initiate_claim(&caller, id).await?;
                svc.complete_claim(&caller, id, credit(None)).await
            }));
        }

        let mut ok = 0;
        let mut rejected = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(AppError::Conflict(_)) => rejected += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(rejected, 7);
        assert_eq!(claim_credits(&engine, allocation.id).await, 1);
        assert_eq!(engine.ledger.balance(5).await.unwrap().balance_cents, 1_000);
    }

    #[tokio::test]
    async fn completion_after_deadline_expires_instead_of_claiming() {
        let engine = TestEngine::new().await;
        let allocation = engine.pending_claim(5, 1_000).await;
        engine
            .claims
            .initiate_claim(&Caller::user(5), allocation.id)
            .await
            .unwrap();

        engine
            .set_claim_deadline(allocation.id, Utc::now() - Duration::minutes(1))
            .await;

        let err = engine
            .claims
            .complete_claim(&Caller::user(5), allocation.id, credit(None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Expired(_)));

        let after = engine
            .claims
            .get_allocation(&Caller::user(5), allocation.id)
            .await
            .unwrap();
        assert_eq!(after.status, ClaimStatus::Expired);
        assert_eq!(claim_credits(&engine, allocation.id).await, 0);

        let win = instant_win_entity::Entity::find()
            .filter(instant_win_entity::Column::ClaimAllocationId.eq(allocation.id))
            .one(&engine.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(win.status, InstantWinStatus::Expired);
    }

    #[tokio::test]
    async fn sweep_expires_pending_only() {
        let engine = TestEngine::new().await;
        let pending = engine.pending_claim(5, 100).await;
        let approved = engine.pending_claim(6, 100).await;
        engine
            .claims
            .initiate_claim(&Caller::user(6), approved.id)
            .await
            .unwrap();

        let past = Utc::now() - Duration::hours(1);
        engine.set_claim_deadline(pending.id, past).await;
        engine.set_claim_deadline(approved.id, past).await;

        assert_eq!(engine.claims.expire_stale_claims().await.unwrap(), 1);
        assert_eq!(engine.claims.expire_stale_claims().await.unwrap(), 0);

        let p = engine.claims.get_allocation(&engine.admin, pending.id).await.unwrap();
        let a = engine.claims.get_allocation(&engine.admin, approved.id).await.unwrap();
        assert_eq!(p.status, ClaimStatus::Expired);
        assert_eq!(a.status, ClaimStatus::Approved);
    }

    #[tokio::test]
    async fn only_winner_claims_and_admin_can_cancel() {
        let engine = TestEngine::new().await;
        let allocation = engine.pending_claim(5, 100).await;

        assert!(matches!(
            engine.claims.initiate_claim(&Caller::user(6), allocation.id).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            engine
                .claims
                .complete_claim(&Caller::user(5), allocation.id, credit(None))
                .await,
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            engine
                .claims
                .cancel_allocation(&Caller::user(5), allocation.id, "fraud")
                .await,
            Err(AppError::Unauthorized(_))
        ));

        let cancelled = engine
            .claims
            .cancel_allocation(&engine.admin, allocation.id, "fraud")
            .await
            .unwrap();
        assert_eq!(cancelled.status, ClaimStatus::Cancelled);
        assert!(matches!(
            engine.claims.initiate_claim(&Caller::user(5), allocation.id).await,
            Err(AppError::InvalidTransition(_))
        ));

        let stats = engine
            .claims
            .claim_statistics(allocation.raffle_id)
            .await
            .unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.outstanding_value_cents, 0);
    }
}
