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
pub enum PrizeKind {
    #[sea_orm(string_value = "instant_win")]
    InstantWin,
    #[sea_orm(string_value = "draw")]
    Draw,
}

impl std::fmt::Display for PrizeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrizeKind::InstantWin => write!(f, "instant_win"),
            PrizeKind::Draw => write!(f, "draw"),
        }
    }
}

/// 奖品配置
/// 概念说明:
/// - quantity: 该奖品的名额数 (一行配置 = quantity 个中奖位)
/// - credit_value_cents: 兑奖入账金额, 中奖时快照到 claim_allocations
/// - claim_window_hours: 开奖奖品的兑奖期限 (NULL 用全局配置)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "prizes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub raffle_id: Uuid,
    pub name: String,
    pub kind: PrizeKind,
    pub credit_value_cents: i64,
    pub quantity: i32,
    pub claim_window_hours: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
