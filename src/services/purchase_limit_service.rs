use crate::entities::{
    TicketStatus, ticket_entity as tickets, user_raffle_stat_entity as stats,
};
use crate::error::{AppError, AppResult};
use crate::middlewares::Caller;
use crate::models::{PurchaseLimitResponse, RepairReport, UserRaffleStatsResponse};
use crate::services::raffle_service::find_raffle;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;
use uuid::Uuid;

/// 每用户购票上限
///
/// 计数器 (user_raffle_stats) 只由确认购票在行锁下更新; 票状态与计数器是两次写入,
/// 异常中断后可能漂移, 由 `repair_purchase_counts` 按 SOLD 票重算。
#[derive(Clone)]
pub struct PurchaseLimitService {
    pool: DatabaseConnection,
}

impl PurchaseLimitService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn check_purchase_limit(
        &self,
        caller: &Caller,
        raffle_id: Uuid,
        quantity: i32,
    ) -> AppResult<PurchaseLimitResponse> {
        let raffle = find_raffle(&self.pool, raffle_id).await?;
        let purchased = confirmed_count(&self.pool, caller.user_id, raffle_id).await?;
        let remaining = (raffle.max_tickets_per_user - purchased).max(0);
        Ok(PurchaseLimitResponse {
            raffle_id,
            user_id: caller.user_id,
            max_tickets_per_user: raffle.max_tickets_per_user,
            tickets_purchased: purchased,
            remaining,
            requested: quantity,
            allowed: quantity > 0 && quantity <= remaining,
        })
    }

    pub async fn user_stats(
        &self,
        caller: &Caller,
        raffle_id: Uuid,
    ) -> AppResult<UserRaffleStatsResponse> {
        find_raffle(&self.pool, raffle_id).await?;
        let row = stats::Entity::find()
            .filter(stats::Column::UserId.eq(caller.user_id))
            .filter(stats::Column::RaffleId.eq(raffle_id))
            .one(&self.pool)
            .await?;
        Ok(match row {
            Some(m) => m.into(),
            None => UserRaffleStatsResponse {
                user_id: caller.user_id,
                raffle_id,
                tickets_purchased: 0,
                last_purchase_at: None,
            },
        })
    }

    /// 按 SOLD 票重算计数器; 幂等, 可重复执行
    ///
    /// 先锁计数行再统计 SOLD 票: 确认购票在改票状态前已持有同一计数行锁,
    /// 因此统计结果不会落后于被锁计数行。
    pub async fn repair_purchase_counts(&self, raffle_id: Option<Uuid>) -> AppResult<RepairReport> {
        let txn = self.pool.begin().await?;
        let now = Utc::now();

        let mut stats_query = stats::Entity::find().lock_exclusive();
        if let Some(id) = raffle_id {
            stats_query = stats_query.filter(stats::Column::RaffleId.eq(id));
        }
        let rows = stats_query.all(&txn).await?;

        let mut sold_query = tickets::Entity::find()
            .select_only()
            .column(tickets::Column::OwnerId)
            .column(tickets::Column::RaffleId)
            .column_as(Expr::col(tickets::Column::Id).count(), "sold")
            .filter(tickets::Column::Status.eq(TicketStatus::Sold))
            .filter(tickets::Column::OwnerId.is_not_null())
            .group_by(tickets::Column::OwnerId)
            .group_by(tickets::Column::RaffleId);
        if let Some(id) = raffle_id {
            sold_query = sold_query.filter(tickets::Column::RaffleId.eq(id));
        }
        let actual: HashMap<(i64, Uuid), i64> = sold_query
            .into_tuple::<(i64, Uuid, i64)>()
            .all(&txn)
            .await?
            .into_iter()
            .map(|(user_id, raffle_id, sold)| ((user_id, raffle_id), sold))
            .collect();

        let mut report = RepairReport::default();
        let mut seen = Vec::with_capacity(rows.len());
        for row in rows {
            report.checked += 1;
            seen.push((row.user_id, row.raffle_id));
            let expected = actual
                .get(&(row.user_id, row.raffle_id))
                .copied()
                .unwrap_or(0) as i32;
            if correct_counter(&txn, row, expected, now).await? {
                report.corrected += 1;
            }
        }

        // 有 SOLD 票却没有计数行: 计数行可能刚被并发确认创建, 锁住后按该行重新统计
        for &(user_id, raffle_id) in actual.keys() {
            if seen.contains(&(user_id, raffle_id)) {
                continue;
            }
            report.checked += 1;
            let row = lock_stats(&txn, user_id, raffle_id, now).await?;
            let expected = sold_count(&txn, user_id, raffle_id).await?;
            if correct_counter(&txn, row, expected, now).await? {
                report.corrected += 1;
            }
        }

        txn.commit().await?;
        Ok(report)
    }
}

/// 计数行与实际 SOLD 数不一致时改写, 返回是否改动 (调用方已持有行锁)
async fn correct_counter<C: ConnectionTrait>(
    conn: &C,
    row: stats::Model,
    expected: i32,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    if row.tickets_purchased == expected {
        return Ok(false);
    }
    log::warn!(
        "Purchase count drift: user={} raffle={} counter={} sold={expected}",
        row.user_id,
        row.raffle_id,
        row.tickets_purchased
    );
    let mut am = row.into_active_model();
    am.tickets_purchased = Set(expected);
    am.updated_at = Set(now);
    am.update(conn).await?;
    Ok(true)
}

async fn sold_count<C: ConnectionTrait>(conn: &C, user_id: i64, raffle_id: Uuid) -> AppResult<i32> {
    let n = tickets::Entity::find()
        .filter(tickets::Column::OwnerId.eq(user_id))
        .filter(tickets::Column::RaffleId.eq(raffle_id))
        .filter(tickets::Column::Status.eq(TicketStatus::Sold))
        .count(conn)
        .await?;
    Ok(n as i32)
}

/// 已确认购票数 (无计数行视为 0)
pub(crate) async fn confirmed_count<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    raffle_id: Uuid,
) -> AppResult<i32> {
    Ok(stats::Entity::find()
        .filter(stats::Column::UserId.eq(user_id))
        .filter(stats::Column::RaffleId.eq(raffle_id))
        .one(conn)
        .await?
        .map(|s| s.tickets_purchased)
        .unwrap_or(0))
}

/// 计数行不存在时插入 (DO NOTHING), 然后加行锁读取
pub(crate) async fn lock_stats<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    raffle_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<stats::Model> {
    let insert = Query::insert()
        .into_table(stats::Entity)
        .columns([
            stats::Column::Id,
            stats::Column::UserId,
            stats::Column::RaffleId,
            stats::Column::TicketsPurchased,
            stats::Column::CreatedAt,
            stats::Column::UpdatedAt,
        ])
        .values_panic([
            Uuid::new_v4().into(),
            user_id.into(),
            raffle_id.into(),
            0i32.into(),
            now.into(),
            now.into(),
        ])
        .on_conflict(
            OnConflict::columns([stats::Column::UserId, stats::Column::RaffleId])
                .do_nothing()
                .to_owned(),
        )
        .to_owned();
    let stmt = conn.get_database_backend().build(&insert);
    conn.execute(stmt).await?;

    stats::Entity::find()
        .filter(stats::Column::UserId.eq(user_id))
        .filter(stats::Column::RaffleId.eq(raffle_id))
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| AppError::InternalError("Purchase counter missing after upsert".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentSource;
    use crate::test_support::TestEngine;

    #[tokio::test]
    async fn check_reports_remaining_allowance() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(10, 3).await;
        engine.buy(1, raffle.id, 2).await;

        let check = engine
            .limits
            .check_purchase_limit(&Caller::user(1), raffle.id, 2)
            .await
            .unwrap();
        assert_eq!(check.tickets_purchased, 2);
        assert_eq!(check.remaining, 1);
        assert!(!check.allowed);

        let stats = engine.limits.user_stats(&Caller::user(1), raffle.id).await.unwrap();
        assert_eq!(stats.tickets_purchased, 2);
        assert!(stats.last_purchase_at.is_some());
    }

    #[tokio::test]
    async fn repair_fixes_drift_and_is_idempotent() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(10, 5).await;
        engine.buy(1, raffle.id, 3).await;
        engine.buy(2, raffle.id, 1).await;

        // 模拟中断: 计数器与票状态不一致
        let row = stats::Entity::find()
            .filter(stats::Column::UserId.eq(1))
            .one(&engine.db)
            .await
            .unwrap()
            .unwrap();
        let mut am = row.into_active_model();
        am.tickets_purchased = Set(1);
        am.update(&engine.db).await.unwrap();
        stats::Entity::delete_many()
            .filter(stats::Column::UserId.eq(2))
            .exec(&engine.db)
            .await
            .unwrap();

        let report = engine.limits.repair_purchase_counts(Some(raffle.id)).await.unwrap();
        assert_eq!(report.corrected, 2);
        assert_eq!(report.checked, 2);

        let again = engine.limits.repair_purchase_counts(None).await.unwrap();
        assert_eq!(again.corrected, 0);

        assert_eq!(confirmed_count(&engine.db, 1, raffle.id).await.unwrap(), 3);
        assert_eq!(confirmed_count(&engine.db, 2, raffle.id).await.unwrap(), 1);
    }

    /// 修复与购票交替提交后计数器仍等于实际 SOLD 数, 不会被回写成旧值。
    /// 测试库单连接, 各事务串行执行; 这里校验的是最终状态。
    #[tokio::test]
    async fn repair_running_alongside_purchases_keeps_live_counts() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(30, 6).await;

        let mut handles = Vec::new();
        for user in 1..=4i64 {
            let reservations = engine.reservations.clone();
            let limits = engine.limits.clone();
            let raffle_id = raffle.id;
            handles.push(tokio::spawn(async move {
                for _ in 0..3 {
                    let held = reservations
                        .reserve(&Caller::user(user), raffle_id, 2)
                        .await
                        .unwrap();
                    reservations
                        .confirm(
                            &Caller::user(user),
                            held.id,
                            PaymentSource::External {
                                reference: format!("pi_{}", held.id.simple()),
                            },
                        )
                        .await
                        .unwrap();
                    limits.repair_purchase_counts(Some(raffle_id)).await.unwrap();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let report = engine.limits.repair_purchase_counts(None).await.unwrap();
        assert_eq!(report.corrected, 0);
        for user in 1..=4 {
            assert_eq!(confirmed_count(&engine.db, user, raffle.id).await.unwrap(), 6);
        }
        assert!(matches!(
            engine.reserve(1, raffle.id, 1).await,
            Err(AppError::Exhausted(_))
        ));
    }
}
