use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 活动状态
/// 迁移表是显式数据 (见 `can_transition_to`), 不靠约定推断
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(24))")]
#[serde(rename_all = "snake_case")]
pub enum RaffleStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "coming_soon")]
    ComingSoon,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "sold_out")]
    SoldOut,
    #[sea_orm(string_value = "ended")]
    Ended,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl RaffleStatus {
    pub fn can_transition_to(&self, next: RaffleStatus) -> bool {
        use RaffleStatus::*;
        matches!(
            (self, next),
            (Draft, ComingSoon | Active | Cancelled)
                | (ComingSoon, Active | Inactive | Cancelled)
                | (Active, Inactive | SoldOut | Ended | Cancelled)
                | (Inactive, Active | ComingSoon | Cancelled)
                | (SoldOut, Ended)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RaffleStatus::Ended | RaffleStatus::Cancelled)
    }

    /// 开奖只允许在结束或售罄之后
    pub fn is_drawable(&self) -> bool {
        matches!(self, RaffleStatus::Ended | RaffleStatus::SoldOut)
    }
}

impl std::fmt::Display for RaffleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RaffleStatus::Draft => write!(f, "draft"),
            RaffleStatus::ComingSoon => write!(f, "coming_soon"),
            RaffleStatus::Active => write!(f, "active"),
            RaffleStatus::Inactive => write!(f, "inactive"),
            RaffleStatus::SoldOut => write!(f, "sold_out"),
            RaffleStatus::Ended => write!(f, "ended"),
            RaffleStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// 抽奖活动
/// - total_tickets 创建后不可修改
/// - 只有 status = active 且 now ∈ [start_time, end_time) 时可购买
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "raffles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
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

impl Model {
    /// 当前时间是否落在售卖窗口内
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_time && now < self.end_time
    }

    pub fn is_purchasable(&self, now: DateTime<Utc>) -> bool {
        self.status == RaffleStatus::Active && self.is_within_window(now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
