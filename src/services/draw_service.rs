use crate::config::RaffleConfig;
use crate::entities::{
    ClaimSource, PrizeKind, TicketStatus, prize_entity as prizes, raffle_draw_entity as draws,
    ticket_entity as tickets,
};
use crate::error::{AppError, AppResult};
use crate::middlewares::Caller;
use crate::models::DrawResultResponse;
use crate::services::claim_service::{NewAllocation, insert_allocation};
use crate::services::raffle_service::{find_raffle, lock_raffle};
use crate::utils::sample_without_replacement;
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, QueryTrait, Set, TransactionTrait,
};
use std::collections::HashMap;
use uuid::Uuid;

/// 开奖: 活动结束/售罄后从已售票中无放回随机抽取
#[derive(Clone)]
pub struct DrawService {
    pool: DatabaseConnection,
    config: RaffleConfig,
}

impl DrawService {
    pub fn new(pool: DatabaseConnection, config: RaffleConfig) -> Self {
        Self { pool, config }
    }

    /// 执行开奖
    ///
    /// 候选池 = 已售且未中过奖的票; 候选不足 draw_count 时返回全部候选, 不报错。
    /// 名次接续已有开奖结果, 抽奖奖品按价值从高到低分配给名次, 有奖名次同时生成 PENDING 兑奖单。
    pub async fn execute_draw(
        &self,
        caller: &Caller,
        raffle_id: Uuid,
        draw_count: i32,
    ) -> AppResult<Vec<DrawResultResponse>> {
        caller.require_admin()?;
        if draw_count < 1 {
            return Err(AppError::ValidationError(
                "Draw count must be at least 1".into(),
            ));
        }

        let now = Utc::now();
        let txn = self.pool.begin().await?;
        let raffle = lock_raffle(&txn, raffle_id).await?;
        if !raffle.status.is_drawable() {
            return Err(AppError::InvalidTransition(format!(
                "Draw requires an ended or sold-out raffle (status {})",
                raffle.status
            )));
        }

        let already_drawn = draws::Entity::find()
            .select_only()
            .column(draws::Column::TicketId)
            .filter(draws::Column::RaffleId.eq(raffle_id))
            .into_query();
        let pool: Vec<(Uuid, String, Option<i64>)> = tickets::Entity::find()
            .select_only()
            .column(tickets::Column::Id)
            .column(tickets::Column::TicketNumber)
            .column(tickets::Column::OwnerId)
            .filter(tickets::Column::RaffleId.eq(raffle_id))
            .filter(tickets::Column::Status.eq(TicketStatus::Sold))
            .filter(tickets::Column::Id.not_in_subquery(already_drawn))
            .lock_exclusive()
            .into_tuple()
            .all(&txn)
            .await?;

        let picked = sample_without_replacement(&pool, draw_count as usize);
        if picked.len() < draw_count as usize {
            log::warn!(
                "Raffle {raffle_id}: requested {draw_count} winners, only {} eligible tickets",
                picked.len()
            );
        }

        let existing = draws::Entity::find()
            .filter(draws::Column::RaffleId.eq(raffle_id))
            .count(&txn)
            .await?;
        let prized_so_far = draws::Entity::find()
            .filter(draws::Column::RaffleId.eq(raffle_id))
            .filter(draws::Column::PrizeId.is_not_null())
            .count(&txn)
            .await? as usize;

        let prize_list = prizes::Entity::find()
            .filter(prizes::Column::RaffleId.eq(raffle_id))
            .filter(prizes::Column::Kind.eq(PrizeKind::Draw))
            .order_by_desc(prizes::Column::CreditValueCents)
            .all(&txn)
            .await?;
        let slots: Vec<&prizes::Model> = prize_list
            .iter()
            .flat_map(|p| std::iter::repeat_n(p, p.quantity.max(0) as usize))
            .skip(prized_so_far)
            .collect();

        let mut results = Vec::with_capacity(picked.len());
        for (i, (ticket_id, ticket_number, owner)) in picked.into_iter().enumerate() {
            let winner_id = owner.ok_or_else(|| {
                AppError::InternalError(format!("Sold ticket {ticket_id} has no owner"))
            })?;
            let position = existing as i32 + i as i32 + 1;
            let prize = slots.get(i).copied();

            // 先建兑奖单, 再写开奖记录并引用它
            let allocation = match prize {
                Some(p) => {
                    let hours = p
                        .claim_window_hours
                        .map(i64::from)
                        .unwrap_or(self.config.draw_claim_window_hours);
                    Some(
                        insert_allocation(
                            &txn,
                            NewAllocation {
                                raffle_id,
                                prize_id: p.id,
                                ticket_id,
                                winner_id,
                                source: ClaimSource::Draw,
                                value_cents: p.credit_value_cents,
                                deadline: now + Duration::hours(hours),
                                won_at: now,
                            },
                        )
                        .await?,
                    )
                }
                None => None,
            };

            draws::ActiveModel {
                id: Set(Uuid::new_v4()),
                raffle_id: Set(raffle_id),
                ticket_id: Set(ticket_id),
                winner_id: Set(winner_id),
                position: Set(position),
                prize_id: Set(prize.map(|p| p.id)),
                claim_allocation_id: Set(allocation.as_ref().map(|a| a.id)),
                drawn_by: Set(caller.user_id),
                drawn_at: Set(now),
            }
            .insert(&txn)
            .await?;

            results.push(DrawResultResponse {
                position,
                ticket_id,
                ticket_number,
                winner_id,
                prize_id: prize.map(|p| p.id),
                prize_name: prize.map(|p| p.name.clone()),
                claim_allocation_id: allocation.map(|a| a.id),
                drawn_at: now,
            });
        }

        txn.commit().await?;
        log::info!(
            "Raffle {raffle_id}: drew {} winners (admin {})",
            results.len(),
            caller.user_id
        );
        Ok(results)
    }

    /// 开奖结果 (按名次)
    pub async fn draw_results(&self, raffle_id: Uuid) -> AppResult<Vec<DrawResultResponse>> {
        find_raffle(&self.pool, raffle_id).await?;
        let rows = draws::Entity::find()
            .filter(draws::Column::RaffleId.eq(raffle_id))
            .order_by_asc(draws::Column::Position)
            .all(&self.pool)
            .await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let numbers: HashMap<Uuid, String> = tickets::Entity::find()
            .select_only()
            .column(tickets::Column::Id)
            .column(tickets::Column::TicketNumber)
            .filter(tickets::Column::Id.is_in(rows.iter().map(|r| r.ticket_id)))
            .into_tuple::<(Uuid, String)>()
            .all(&self.pool)
            .await?
            .into_iter()
            .collect();
        let prize_names: HashMap<Uuid, String> = prizes::Entity::find()
            .filter(prizes::Column::RaffleId.eq(raffle_id))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        Ok(rows
            .into_iter()
            .map(|r| DrawResultResponse {
                position: r.position,
                ticket_id: r.ticket_id,
                ticket_number: numbers.get(&r.ticket_id).cloned().unwrap_or_default(),
                winner_id: r.winner_id,
                prize_id: r.prize_id,
                prize_name: r.prize_id.and_then(|id| prize_names.get(&id).cloned()),
                claim_allocation_id: r.claim_allocation_id,
                drawn_at: r.drawn_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ClaimStatus, RaffleStatus};
    use crate::test_support::TestEngine;
    use std::collections::HashSet;

    #[tokio::test]
    async fn draw_picks_distinct_sold_tickets() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(10, 10).await;
        let sold: HashSet<Uuid> = engine.buy(1, raffle.id, 6).await.into_iter().collect();
        engine.end(raffle.id).await;

        let results = engine
            .draws
            .execute_draw(&engine.admin, raffle.id, 4)
            .await
            .unwrap();
        assert_eq!(results.len(), 4);
        let ids: HashSet<_> = results.iter().map(|r| r.ticket_id).collect();
        assert_eq!(ids.len(), 4);
        assert!(ids.is_subset(&sold));
        assert_eq!(
            results.iter().map(|r| r.position).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );

        // 仅第一名有奖 (测试活动配置一个抽奖奖品)
        let first = &results[0];
        let claim = engine
            .claims
            .get_allocation(&Caller::user(1), first.claim_allocation_id.unwrap())
            .await
            .unwrap();
        assert_eq!(claim.status, ClaimStatus::Pending);
        assert_eq!(claim.source, ClaimSource::Draw);
        assert!(results[1..].iter().all(|r| r.prize_id.is_none()));
    }

    #[tokio::test]
    async fn draw_is_lenient_when_pool_is_small() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(10, 10).await;
        engine.buy(1, raffle.id, 2).await;
        engine.end(raffle.id).await;

        let results = engine
            .draws
            .execute_draw(&engine.admin, raffle.id, 5)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);

        // 已中奖的票不会再次被抽中
        let again = engine
            .draws
            .execute_draw(&engine.admin, raffle.id, 1)
            .await
            .unwrap();
        assert!(again.is_empty());
        assert_eq!(engine.draws.draw_results(raffle.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn repeated_draws_continue_positions() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(5, 5).await;
        engine.buy(1, raffle.id, 5).await; // 售罄

        let first = engine
            .draws
            .execute_draw(&engine.admin, raffle.id, 2)
            .await
            .unwrap();
        let second = engine
            .draws
            .execute_draw(&engine.admin, raffle.id, 2)
            .await
            .unwrap();
        assert_eq!(second[0].position, 3);
        let all: HashSet<_> = first.iter().chain(second.iter()).map(|r| r.ticket_id).collect();
        assert_eq!(all.len(), 4);
        assert!(second.iter().all(|r| r.prize_id.is_none()));
    }

    #[tokio::test]
    async fn draw_requires_closed_raffle_and_admin() {
        let engine = TestEngine::new().await;
        let raffle = engine.active_raffle(10, 10).await;
        engine.buy(1, raffle.id, 2).await;
        assert!(matches!(
            engine.draws.execute_draw(&engine.admin, raffle.id, 1).await,
            Err(AppError::InvalidTransition(_))
        ));
        engine.end(raffle.id).await;
        assert!(matches!(
            engine.draws.execute_draw(&Caller::user(1), raffle.id, 1).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            engine.draws.execute_draw(&engine.admin, raffle.id, 0).await,
            Err(AppError::ValidationError(_))
        ));
        let r = engine.raffles.get_raffle(raffle.id).await.unwrap();
        assert_eq!(r.status, RaffleStatus::Ended);
    }
}
