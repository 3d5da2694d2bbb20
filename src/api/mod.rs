/// 백엔드 REST API 접근 계층
/// 1. 경매/입찰 조회 및 입찰 요청
/// 2. 관리자 통계 조회
/// 3. 카테고리, 주문, 결제 조회
// region:    --- Imports
use crate::auction::model::{ActivityEntry, AdminStats, Auction, Bid, Order};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Modules
pub mod client;
pub mod routes;

pub use client::{HttpApiClient, PaymentHandoff};
// endregion: --- Modules

// region:    --- Session
/// 인증 세션 (뷰마다 명시적으로 주입)
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
    user_id: Option<i64>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(token: impl Into<String>, user_id: i64) -> Self {
        Self {
            token: Some(token.into()),
            user_id: Some(user_id),
        }
    }

    pub fn with_token(token: Option<String>) -> Self {
        Self {
            token,
            user_id: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}
// endregion: --- Session

// region:    --- Requests
/// 입찰 요청 바디
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBidRequest {
    pub amount: Decimal,
    pub client_ref: Uuid,
}

/// 입찰 응답 바디
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaceBidResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub bid: Option<Bid>,
    #[serde(default)]
    pub current_bid: Option<Decimal>,
}
// endregion: --- Requests

// region:    --- Traits
/// 경매 동기화에 필요한 API
#[async_trait]
pub trait AuctionApi: Send + Sync {
    async fn get_auction(&self, auction_id: i64) -> Result<Auction>;

    /// 승인된 입찰만 조회
    async fn get_bids(&self, auction_id: i64) -> Result<Vec<Bid>>;

    /// 모든 상태의 입찰 조회 (권한 필요)
    async fn get_all_bids(&self, auction_id: i64) -> Result<Vec<Bid>>;

    async fn place_bid(&self, auction_id: i64, request: &PlaceBidRequest)
        -> Result<PlaceBidResponse>;
}

/// 관리자 모니터링 API
#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn get_admin_stats(&self) -> Result<AdminStats>;

    async fn get_admin_activity(&self) -> Result<Vec<ActivityEntry>>;
}

/// 결제 API
#[async_trait]
pub trait PaymentApi: Send + Sync {
    async fn initiate_payment(&self, auction_id: i64) -> Result<PaymentHandoff>;

    async fn verify_payment(&self, reference: &str) -> Result<Order>;
}
// endregion: --- Traits
