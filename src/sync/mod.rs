/// 경매/입찰 상태 동기화
/// 1. state: 순수 상태 병합 규칙
/// 2. synchronizer: 폴링, 푸시, 입찰 전송을 묶는 비동기 구동부
pub mod state;
pub mod synchronizer;

pub use state::{
    parse_bid_amount, AuctionSnapshot, AuctionView, BidEntry, BidLifecycle, BidListScope,
    OptimisticBid,
};
pub use synchronizer::{AuctionSynchronizer, BidReceipt};
