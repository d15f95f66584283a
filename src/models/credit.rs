use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{CreditReferenceType, CreditTransactionType, credit_transaction_entity};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreditBalanceResponse {
    pub user_id: i64,
    pub balance_cents: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreditTransactionResponse {
    pub id: Uuid,
    pub sequence: i64,
    pub transaction_type: CreditTransactionType,
    pub amount_cents: i64,
    pub balance_after_cents: i64,
    pub reference_type: Option<CreditReferenceType>,
    pub reference_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<credit_transaction_entity::Model> for CreditTransactionResponse {
    fn from(m: credit_transaction_entity::Model) -> Self {
        CreditTransactionResponse {
            id: m.id,
            sequence: m.sequence,
            transaction_type: m.transaction_type,
            amount_cents: m.amount_cents,
            balance_after_cents: m.balance_after_cents,
            reference_type: m.reference_type,
            reference_id: m.reference_id,
            description: m.description,
            created_at: m.created_at,
        }
    }
}

/// 管理员调整余额 (正数加款, 负数扣款)
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AdjustBalanceRequest {
    pub user_id: i64,
    pub amount_cents: i64,
    pub note: String,
}

/// 前缀和对账结果
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccountVerificationResponse {
    pub user_id: i64,
    pub balance_cents: i64,
    pub reconstructed_cents: i64,
    pub transaction_count: u64,
    pub consistent: bool,
    /// 第一条不一致流水的序号
    pub first_mismatch_sequence: Option<i64>,
}
