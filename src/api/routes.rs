use crate::error::{ClientError, Result};
use reqwest::Url;

/// 경매 상세 조회
pub fn auction(auction_id: i64) -> String {
    format!("/auctions/{}", auction_id)
}

/// 승인된 입찰 목록 조회
pub fn approved_bids(auction_id: i64) -> String {
    format!("/auctions/{}/bids", auction_id)
}

/// 전체 입찰 목록 조회 (권한 필요)
pub fn all_bids(auction_id: i64) -> String {
    format!("/auctions/{}/bids/all", auction_id)
}

/// 입찰
pub fn place_bid(auction_id: i64) -> String {
    format!("/auctions/{}/bid", auction_id)
}

/// 카테고리 목록 조회
pub const CATEGORIES: &str = "/categories";

/// 관리자 통계 조회
pub const ADMIN_STATS: &str = "/admin/stats";

/// 관리자 활동 로그 조회
pub const ADMIN_ACTIVITY: &str = "/admin/activity";

/// 주문 조회
pub fn order(order_id: i64) -> String {
    format!("/orders/{}", order_id)
}

/// 결제 시작
pub const PAYMENT_INITIATE: &str = "/payments/initiate";

/// 결제 검증
/// 참조 번호는 게이트웨이가 준 값이므로 경로 세그먼트 하나로 인코딩한다
pub fn payment_verify(base_url: &str, reference: &str) -> Result<Url> {
    let mut url =
        Url::parse(base_url).map_err(|e| ClientError::Config(format!("invalid api url: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| ClientError::Config(format!("api url cannot be a base: {}", base_url)))?
        .pop_if_empty()
        .extend(["payments", "verify", reference]);
    Ok(url)
}

// endregion: --- Tests
