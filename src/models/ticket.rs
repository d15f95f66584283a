use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{TicketStatus, ticket_entity};

use super::InstantWinResponse;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TicketResponse {
    pub id: Uuid,
    pub raffle_id: Uuid,
    pub ticket_number: String,
    pub owner_id: Option<i64>,
    pub status: TicketStatus,
    pub purchased_at: Option<DateTime<Utc>>,
    pub instant_win: bool,
    pub revealed_at: Option<DateTime<Utc>>,
    pub reveal_sequence: Option<i64>,
}

impl From<ticket_entity::Model> for TicketResponse {
    fn from(m: ticket_entity::Model) -> Self {
        // instant_win_eligible 揭晓前不对外暴露
        TicketResponse {
            id: m.id,
            raffle_id: m.raffle_id,
            ticket_number: m.ticket_number,
            owner_id: m.owner_id,
            status: m.status,
            purchased_at: m.purchased_at,
            instant_win: m.instant_win,
            revealed_at: m.revealed_at,
            reveal_sequence: m.reveal_sequence,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RevealTicketsRequest {
    pub ticket_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RevealedTicketResponse {
    pub ticket: TicketResponse,
    /// 命中即开奖时返回
    pub instant_win: Option<InstantWinResponse>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UserTicketsQuery {
    pub raffle_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct VoidTicketRequest {
    pub reason: String,
}

/// 活动票务统计
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RaffleStatisticsResponse {
    pub raffle_id: Uuid,
    pub total_tickets: i64,
    pub available: i64,
    pub sold: i64,
    pub void: i64,
    pub cancelled: i64,
    /// 当前被预留单持有的票数
    pub held: i64,
    pub revealed: i64,
    pub instant_win_eligible: i64,
    pub instant_wins_found: i64,
    pub unique_participants: i64,
    pub gross_sales_cents: i64,
}
