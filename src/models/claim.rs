use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{ClaimMethod, ClaimSource, ClaimStatus, claim_allocation_entity};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClaimAllocationResponse {
    pub id: Uuid,
    pub raffle_id: Uuid,
    pub prize_id: Uuid,
    pub ticket_id: Uuid,
    pub winner_id: i64,
    pub source: ClaimSource,
    pub status: ClaimStatus,
    pub original_value_cents: i64,
    pub claimed_value_cents: Option<i64>,
    pub claim_method: Option<ClaimMethod>,
    pub claim_deadline: DateTime<Utc>,
    pub won_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub claimed_at: Option<DateTime<Utc>>,
}

impl From<claim_allocation_entity::Model> for ClaimAllocationResponse {
    fn from(m: claim_allocation_entity::Model) -> Self {
        ClaimAllocationResponse {
            id: m.id,
            raffle_id: m.raffle_id,
            prize_id: m.prize_id,
            ticket_id: m.ticket_id,
            winner_id: m.winner_id,
            source: m.source,
            status: m.status,
            original_value_cents: m.original_value_cents,
            claimed_value_cents: m.claimed_value_cents,
            claim_method: m.claim_method,
            claim_deadline: m.claim_deadline,
            won_at: m.won_at,
            approved_at: m.approved_at,
            claimed_at: m.claimed_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CompleteClaimRequest {
    /// 可选; 提供时必须等于中奖时的价值
    pub value_cents: Option<i64>,
    pub method: ClaimMethod,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CancelAllocationRequest {
    pub reason: String,
}

/// 兑奖完成结果
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClaimReceipt {
    pub allocation: ClaimAllocationResponse,
    pub transaction_id: Uuid,
    pub balance_after_cents: i64,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ClaimStatisticsResponse {
    pub raffle_id: Uuid,
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub claimed: i64,
    pub expired: i64,
    pub cancelled: i64,
    pub claimed_value_cents: i64,
    pub outstanding_value_cents: i64,
}
