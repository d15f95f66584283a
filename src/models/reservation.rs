use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{RaffleStatus, ReservationStatus, ticket_reservation_entity};

use super::TicketResponse;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateReservationRequest {
    pub raffle_id: Uuid,
    pub quantity: i32,
}

/// 付款来源
/// - credits: 在确认事务内扣减余额
/// - external: 网关已在锁外完成扣款, reference 为外部单号
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentSource {
    Credits,
    External { reference: String },
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ConfirmReservationRequest {
    pub payment: PaymentSource,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReservationResponse {
    pub id: Uuid,
    pub raffle_id: Uuid,
    pub user_id: i64,
    pub quantity: i32,
    pub total_price_cents: i64,
    pub status: ReservationStatus,
    pub expires_at: DateTime<Utc>,
    pub payment_reference: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// 当前持有的票 (释放后为空)
    pub ticket_numbers: Vec<String>,
}

impl ReservationResponse {
    pub fn new(m: ticket_reservation_entity::Model, ticket_numbers: Vec<String>) -> Self {
        ReservationResponse {
            id: m.id,
            raffle_id: m.raffle_id,
            user_id: m.user_id,
            quantity: m.quantity,
            total_price_cents: m.total_price_cents,
            status: m.status,
            expires_at: m.expires_at,
            payment_reference: m.payment_reference,
            completed_at: m.completed_at,
            created_at: m.created_at,
            ticket_numbers,
        }
    }
}

/// 确认购票结果
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseConfirmation {
    pub reservation: ReservationResponse,
    pub tickets: Vec<TicketResponse>,
    pub raffle_status: RaffleStatus,
    /// 余额支付后的余额
    pub balance_after_cents: Option<i64>,
}
