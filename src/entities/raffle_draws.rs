use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 开奖结果
/// - (raffle_id, ticket_id) 唯一: 不放回
/// - position 从 1 开始, 多次开奖顺延
/// - 有奖品的名次会生成 claim_allocation
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "raffle_draws")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub raffle_id: Uuid,
    pub ticket_id: Uuid,
    pub winner_id: i64,
    pub position: i32,
    pub prize_id: Option<Uuid>,
    pub claim_allocation_id: Option<Uuid>,
    pub drawn_by: i64,
    pub drawn_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
