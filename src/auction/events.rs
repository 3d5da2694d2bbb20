use super::model::AuctionStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// 입찰 관련 푸시 이벤트 데이터
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BidEventData {
    pub auction_id: i64,
    #[serde(default)]
    pub bid_id: Option<i64>,
    pub bidder_id: i64,
    pub amount: Decimal,
    // 승인 후 서버가 계산한 경매 현재가
    #[serde(default)]
    pub current_bid: Option<Decimal>,
    #[serde(default)]
    pub client_ref: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// 결제 관련 푸시 이벤트 데이터
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PaymentEventData {
    pub auction_id: i64,
    pub order_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum PushEvent {
    // 경매 이벤트
    AuctionCreated {
        auction_id: i64,
        #[serde(default)]
        title: Option<String>,
    },
    AuctionUpdated {
        auction_id: i64,
        #[serde(default)]
        current_bid: Option<Decimal>,
        #[serde(default)]
        bid_count: Option<u32>,
        #[serde(default)]
        status: Option<AuctionStatus>,
    },
    AuctionDeleted {
        auction_id: i64,
    },
    AuctionApproved {
        auction_id: i64,
    },
    AuctionRejected {
        auction_id: i64,
        #[serde(default)]
        reason: Option<String>,
    },
    // 입찰 이벤트
    BidPlaced(BidEventData),
    BidApproved(BidEventData),
    BidRejected(BidEventData),
    // 결제 이벤트
    PaymentRequired(PaymentEventData),
    PaymentCompleted(PaymentEventData),
}

const KNOWN_EVENTS: &[&str] = &[
    "auction-created",
    "auction-updated",
    "auction-deleted",
    "auction-approved",
    "auction-rejected",
    "bid-placed",
    "bid-approved",
    "bid-rejected",
    "payment-required",
    "payment-completed",
];

impl PushEvent {
    pub fn auction_id(&self) -> i64 {
        match self {
            PushEvent::AuctionCreated { auction_id, .. }
            | PushEvent::AuctionUpdated { auction_id, .. }
            | PushEvent::AuctionDeleted { auction_id }
            | PushEvent::AuctionApproved { auction_id }
            | PushEvent::AuctionRejected { auction_id, .. } => *auction_id,
            PushEvent::BidPlaced(data)
            | PushEvent::BidApproved(data)
            | PushEvent::BidRejected(data) => data.auction_id,
            PushEvent::PaymentRequired(data) | PushEvent::PaymentCompleted(data) => {
                data.auction_id
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::AuctionCreated { .. } => "auction-created",
            PushEvent::AuctionUpdated { .. } => "auction-updated",
            PushEvent::AuctionDeleted { .. } => "auction-deleted",
            PushEvent::AuctionApproved { .. } => "auction-approved",
            PushEvent::AuctionRejected { .. } => "auction-rejected",
            PushEvent::BidPlaced(_) => "bid-placed",
            PushEvent::BidApproved(_) => "bid-approved",
            PushEvent::BidRejected(_) => "bid-rejected",
            PushEvent::PaymentRequired(_) => "payment-required",
            PushEvent::PaymentCompleted(_) => "payment-completed",
        }
    }

    /// 수신한 JSON 프레임 디코딩
    /// 알 수 없는 이벤트 이름은 Ok(None) 으로 건너뛴다.
    pub fn decode_frame(frame: &str) -> Result<Option<PushEvent>, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(frame)?;
        let name = value
            .get("event")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        if !KNOWN_EVENTS.contains(&name.as_str()) {
            warn!("{:<12} --> 알 수 없는 이벤트 타입: {:?}", "Push", name);
            return Ok(None);
        }
        serde_json::from_value(value).map(Some)
    }
}
