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
pub enum InstantWinStatus {
    #[sea_orm(string_value = "allocated")]
    Allocated,
    #[sea_orm(string_value = "discovered")]
    Discovered,
    #[sea_orm(string_value = "pending_claim")]
    PendingClaim,
    #[sea_orm(string_value = "claimed")]
    Claimed,
    #[sea_orm(string_value = "expired")]
    Expired,
}

impl InstantWinStatus {
    /// 只前进不后退; 揭晓后不再回收
    pub fn can_transition_to(&self, next: InstantWinStatus) -> bool {
        use InstantWinStatus::*;
        matches!(
            (self, next),
            (Allocated, Discovered | Expired)
                | (Discovered, PendingClaim | Expired)
                | (PendingClaim, Claimed | Expired)
        )
    }
}

impl std::fmt::Display for InstantWinStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstantWinStatus::Allocated => write!(f, "allocated"),
            InstantWinStatus::Discovered => write!(f, "discovered"),
            InstantWinStatus::PendingClaim => write!(f, "pending_claim"),
            InstantWinStatus::Claimed => write!(f, "claimed"),
            InstantWinStatus::Expired => write!(f, "expired"),
        }
    }
}

/// 即开奖
/// 说明:
/// - 每张票最多一条 (ticket_id 唯一)
/// - prize_id 在分配时即绑定; claim_allocation_id 在揭晓时创建兑奖记录后回填
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "instant_wins")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub raffle_id: Uuid,
    pub ticket_id: Uuid,
    pub prize_id: Uuid,
    pub claim_allocation_id: Option<Uuid>,
    pub status: InstantWinStatus,
    pub discovered_at: Option<DateTime<Utc>>,
    pub claim_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_is_not_reversible() {
        use InstantWinStatus::*;
        assert!(Allocated.can_transition_to(Discovered));
        assert!(!Discovered.can_transition_to(Allocated));
        assert!(!PendingClaim.can_transition_to(Discovered));
        assert!(!Claimed.can_transition_to(Expired));
        assert!(!Allocated.can_transition_to(Claimed));
        // 票作废时未发现的即开奖直接失效
        assert!(Allocated.can_transition_to(Expired));
    }
}
