use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ExecuteDrawRequest {
    pub draw_count: i32,
}

/// 单个开奖名次
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawResultResponse {
    pub position: i32,
    pub ticket_id: Uuid,
    pub ticket_number: String,
    pub winner_id: i64,
    pub prize_id: Option<Uuid>,
    pub prize_name: Option<String>,
    pub claim_allocation_id: Option<Uuid>,
    pub drawn_at: DateTime<Utc>,
}
