use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{
    PrizeKind, RaffleStatus, prize_entity, raffle_entity, raffle_status_change_entity,
};

/// 创建活动
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateRaffleRequest {
    pub title: String,
    pub description: Option<String>,
    /// 单价 (美分)
    pub ticket_price_cents: i64,
    /// 总票数, 创建后不可修改
    pub total_tickets: i32,
    /// 每个用户最多可购票数
    pub max_tickets_per_user: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// 更新活动 (仅 draft / coming_soon)
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateRaffleRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ticket_price_cents: Option<i64>,
    pub max_tickets_per_user: Option<i32>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ChangeRaffleStatusRequest {
    pub status: RaffleStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct RaffleListQuery {
    pub status: Option<RaffleStatus>,
    /// 页码 (默认 1)
    pub page: Option<u32>,
    /// 每页数量 (默认 20)
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RaffleResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub ticket_price_cents: i64,
    pub total_tickets: i32,
    pub max_tickets_per_user: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: RaffleStatus,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<raffle_entity::Model> for RaffleResponse {
    fn from(m: raffle_entity::Model) -> Self {
        RaffleResponse {
            id: m.id,
            title: m.title,
            description: m.description,
            ticket_price_cents: m.ticket_price_cents,
            total_tickets: m.total_tickets,
            max_tickets_per_user: m.max_tickets_per_user,
            start_time: m.start_time,
            end_time: m.end_time,
            status: m.status,
            created_by: m.created_by,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// 状态变更审计记录
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RaffleStatusChangeResponse {
    pub id: Uuid,
    pub raffle_id: Uuid,
    pub previous_status: RaffleStatus,
    pub new_status: RaffleStatus,
    /// 为空表示系统任务
    pub changed_by: Option<i64>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<raffle_status_change_entity::Model> for RaffleStatusChangeResponse {
    fn from(m: raffle_status_change_entity::Model) -> Self {
        RaffleStatusChangeResponse {
            id: m.id,
            raffle_id: m.raffle_id,
            previous_status: m.previous_status,
            new_status: m.new_status,
            changed_by: m.changed_by,
            reason: m.reason,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PrizeInput {
    pub name: String,
    pub kind: PrizeKind,
    pub credit_value_cents: i64,
    pub quantity: i32,
    pub claim_window_hours: Option<i32>,
}

/// 替换活动的全部奖品配置
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ConfigurePrizesRequest {
    pub prizes: Vec<PrizeInput>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PrizeResponse {
    pub id: Uuid,
    pub raffle_id: Uuid,
    pub name: String,
    pub kind: PrizeKind,
    pub credit_value_cents: i64,
    pub quantity: i32,
    pub claim_window_hours: Option<i32>,
}

impl From<prize_entity::Model> for PrizeResponse {
    fn from(m: prize_entity::Model) -> Self {
        PrizeResponse {
            id: m.id,
            raffle_id: m.raffle_id,
            name: m.name,
            kind: m.kind,
            credit_value_cents: m.credit_value_cents,
            quantity: m.quantity,
            claim_window_hours: m.claim_window_hours,
        }
    }
}

/// 奖品配置校验结果
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PrizeValidationResponse {
    pub valid: bool,
    pub errors: Vec<String>,
    /// 即开奖名额合计
    pub instant_win_slots: i64,
    /// 开奖名额合计
    pub draw_slots: i64,
}
