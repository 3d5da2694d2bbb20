use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// 경매 진행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    Active,
    Pending,
    Ended,
}

// 관리자 승인 상태 (경매, 입찰 공통)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

pub type BidStatus = ApprovalStatus;

// 경매 모델
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Auction {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub starting_bid: Decimal,
    pub current_bid: Option<Decimal>,
    pub status: AuctionStatus,
    pub approval_status: ApprovalStatus,
    pub end_time: DateTime<Utc>,
    pub seller_id: i64,
    #[serde(default)]
    pub bid_count: u32,
    #[serde(default)]
    pub category_id: Option<i64>,
}

impl Auction {
    /// 현재 최고가 (입찰이 없으면 시작가)
    pub fn current_highest(&self) -> Decimal {
        self.current_bid.unwrap_or(self.starting_bid)
    }

    /// 남은 시간: max(0, end_time - now)
    pub fn time_left_at(&self, now: DateTime<Utc>) -> Duration {
        let left = self.end_time - now;
        if left < Duration::zero() {
            Duration::zero()
        } else {
            left
        }
    }

    pub fn is_open_for_bids(&self, now: DateTime<Utc>) -> bool {
        self.status == AuctionStatus::Active
            && self.approval_status == ApprovalStatus::Approved
            && self.end_time > now
    }
}

// 입찰 모델
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub id: i64,
    pub auction_id: i64,
    pub bidder_id: i64,
    pub amount: Decimal,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ref: Option<Uuid>,
}

// 주문 결제 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
}

// 주문/결제 모델
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub auction_id: i64,
    pub amount: Decimal,
    pub status: OrderStatus,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

// 카테고리 모델
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// 관리자 통계
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminStats {
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub total_auctions: u64,
    #[serde(default)]
    pub active_auctions: u64,
    #[serde(default)]
    pub pending_auctions: u64,
    #[serde(default)]
    pub total_bids: u64,
    #[serde(default)]
    pub pending_bids: u64,
    #[serde(default)]
    pub total_revenue: Decimal,
}

// 관리자 활동 로그
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
