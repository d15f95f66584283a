use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{InstantWinStatus, instant_win_entity};

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AllocateInstantWinsRequest {
    pub count: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InstantWinResponse {
    pub id: Uuid,
    pub raffle_id: Uuid,
    pub ticket_id: Uuid,
    pub prize_id: Uuid,
    pub claim_allocation_id: Option<Uuid>,
    pub status: InstantWinStatus,
    pub discovered_at: Option<DateTime<Utc>>,
    pub claim_deadline: Option<DateTime<Utc>>,
}

impl From<instant_win_entity::Model> for InstantWinResponse {
    fn from(m: instant_win_entity::Model) -> Self {
        InstantWinResponse {
            id: m.id,
            raffle_id: m.raffle_id,
            ticket_id: m.ticket_id,
            prize_id: m.prize_id,
            claim_allocation_id: m.claim_allocation_id,
            status: m.status,
            discovered_at: m.discovered_at,
            claim_deadline: m.claim_deadline,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct InstantWinStatsResponse {
    pub raffle_id: Uuid,
    pub total: i64,
    pub allocated: i64,
    pub discovered: i64,
    pub pending_claim: i64,
    pub claimed: i64,
    pub expired: i64,
}
