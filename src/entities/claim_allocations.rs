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
pub enum ClaimStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "claimed")]
    Claimed,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl ClaimStatus {
    pub fn can_transition_to(&self, next: ClaimStatus) -> bool {
        use ClaimStatus::*;
        matches!(
            (self, next),
            (Pending, Approved | Expired | Cancelled) | (Approved, Claimed | Expired | Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClaimStatus::Claimed | ClaimStatus::Expired | ClaimStatus::Cancelled
        )
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimStatus::Pending => write!(f, "pending"),
            ClaimStatus::Approved => write!(f, "approved"),
            ClaimStatus::Claimed => write!(f, "claimed"),
            ClaimStatus::Expired => write!(f, "expired"),
            ClaimStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// 中奖来源
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(24))")]
#[serde(rename_all = "snake_case")]
pub enum ClaimSource {
    #[sea_orm(string_value = "instant_win")]
    InstantWin,
    #[sea_orm(string_value = "draw")]
    Draw,
}

impl std::fmt::Display for ClaimSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimSource::InstantWin => write!(f, "instant_win"),
            ClaimSource::Draw => write!(f, "draw"),
        }
    }
}

/// 兑奖方式, 目前只有入账到余额
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(24))")]
#[serde(rename_all = "snake_case")]
pub enum ClaimMethod {
    #[sea_orm(string_value = "credit")]
    Credit,
}

impl std::fmt::Display for ClaimMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimMethod::Credit => write!(f, "credit"),
        }
    }
}

/// 兑奖记录
/// 概念说明:
/// - original_value_cents: 中奖时的奖品价值快照, 兑奖按此入账
/// - claimed_value_cents / claim_method: 兑奖完成后写入
/// - 终态 (claimed / expired / cancelled) 只会出现一次
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "claim_allocations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub raffle_id: Uuid,
    pub prize_id: Uuid,
    pub ticket_id: Uuid,
    pub winner_id: i64,
    pub source: ClaimSource,
    pub status: ClaimStatus,
    pub original_value_cents: i64,
    pub claimed_value_cents: Option<i64>,
    pub claim_method: Option<ClaimMethod>,
    pub claim_deadline: DateTime<Utc>,
    pub won_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        now >= self.claim_deadline
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approved_is_only_entered_from_pending() {
        use ClaimStatus::*;
        assert!(Pending.can_transition_to(Approved));
        for from in [Approved, Claimed, Expired, Cancelled] {
            assert!(!from.can_transition_to(Approved));
        }
    }

    #[test]
    fn pending_cannot_be_claimed_directly() {
        assert!(!ClaimStatus::Pending.can_transition_to(ClaimStatus::Claimed));
        assert!(ClaimStatus::Approved.can_transition_to(ClaimStatus::Claimed));
    }

    #[test]
    fn terminal_states() {
        assert!(ClaimStatus::Claimed.is_terminal());
        assert!(ClaimStatus::Expired.is_terminal());
        assert!(ClaimStatus::Cancelled.is_terminal());
        assert!(!ClaimStatus::Approved.is_terminal());
    }
}
