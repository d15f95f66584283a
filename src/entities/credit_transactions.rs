use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(24))")]
#[serde(rename_all = "snake_case")]
pub enum CreditTransactionType {
    #[sea_orm(string_value = "credit")]
    Credit,
    #[sea_orm(string_value = "debit")]
    Debit,
}

impl std::fmt::Display for CreditTransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreditTransactionType::Credit => write!(f, "credit"),
            CreditTransactionType::Debit => write!(f, "debit"),
        }
    }
}

/// 流水引用的业务对象类型
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
#[serde(rename_all = "snake_case")]
pub enum CreditReferenceType {
    #[sea_orm(string_value = "ticket_purchase")]
    TicketPurchase,
    #[sea_orm(string_value = "prize_claim")]
    PrizeClaim,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
}

impl std::fmt::Display for CreditReferenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreditReferenceType::TicketPurchase => write!(f, "ticket_purchase"),
            CreditReferenceType::PrizeClaim => write!(f, "prize_claim"),
            CreditReferenceType::Adjustment => write!(f, "adjustment"),
        }
    }
}

/// 余额流水 (只追加)
/// 概念说明:
/// - amount_cents: 带符号金额, 扣款为负
/// - balance_after_cents: 本条流水后的余额
/// - sequence: 用户内递增序号, 按序号前缀和可重建余额
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "credit_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: i64,
    pub sequence: i64,
    pub transaction_type: CreditTransactionType,
    pub amount_cents: i64,
    pub balance_after_cents: i64,
    pub reference_type: Option<CreditReferenceType>,
    pub reference_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
