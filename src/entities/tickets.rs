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
pub enum TicketStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "sold")]
    Sold,
    #[sea_orm(string_value = "void")]
    Void,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl TicketStatus {
    /// VOID / CANCELLED 为终态
    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        use TicketStatus::*;
        matches!(
            (self, next),
            (Available, Sold | Void | Cancelled) | (Sold, Void)
        )
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Available => write!(f, "available"),
            TicketStatus::Sold => write!(f, "sold"),
            TicketStatus::Void => write!(f, "void"),
            TicketStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// 票实体
/// 说明:
/// - ticket_number 在同一活动内唯一 (零填充, 如 001)
/// - instant_win_eligible 在草稿期分配即开奖时确定, instant_win 在揭晓后置位
/// - reservation_id 记录最终成交的预留单
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub raffle_id: Uuid,
    pub ticket_number: String,
    pub owner_id: Option<i64>,
    pub status: TicketStatus,
    pub purchased_at: Option<DateTime<Utc>>,
    pub reservation_id: Option<Uuid>,
    pub instant_win_eligible: bool,
    pub instant_win: bool,
    pub revealed_at: Option<DateTime<Utc>>,
    pub reveal_sequence: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_revealed(&self) -> bool {
        self.revealed_at.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sold_can_only_be_voided() {
        assert!(TicketStatus::Sold.can_transition_to(TicketStatus::Void));
        assert!(!TicketStatus::Sold.can_transition_to(TicketStatus::Available));
        assert!(!TicketStatus::Sold.can_transition_to(TicketStatus::Cancelled));
    }

    #[test]
    fn void_and_cancelled_are_terminal() {
        for next in [
            TicketStatus::Available,
            TicketStatus::Sold,
            TicketStatus::Void,
            TicketStatus::Cancelled,
        ] {
            assert!(!TicketStatus::Void.can_transition_to(next));
            assert!(!TicketStatus::Cancelled.can_transition_to(next));
        }
    }
}
