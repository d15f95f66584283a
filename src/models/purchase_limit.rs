use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::user_raffle_stat_entity;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PurchaseLimitQuery {
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseLimitResponse {
    pub raffle_id: Uuid,
    pub user_id: i64,
    pub max_tickets_per_user: i32,
    pub tickets_purchased: i32,
    pub remaining: i32,
    pub requested: i32,
    pub allowed: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserRaffleStatsResponse {
    pub user_id: i64,
    pub raffle_id: Uuid,
    pub tickets_purchased: i32,
    pub last_purchase_at: Option<DateTime<Utc>>,
}

impl From<user_raffle_stat_entity::Model> for UserRaffleStatsResponse {
    fn from(m: user_raffle_stat_entity::Model) -> Self {
        UserRaffleStatsResponse {
            user_id: m.user_id,
            raffle_id: m.raffle_id,
            tickets_purchased: m.tickets_purchased,
            last_purchase_at: m.last_purchase_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct RepairPurchaseCountsRequest {
    /// 为空时修复所有活动
    pub raffle_id: Option<Uuid>,
}

/// 计数修复结果
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct RepairReport {
    /// 检查的 (用户, 活动) 组合数
    pub checked: u64,
    /// 被修正的计数行数
    pub corrected: u64,
}
