/// 경매 뷰 상태
/// 폴링, 푸시, 낙관적 입찰 세 입력을 하나의 상태로 합친다.
/// - current_bid 는 단조 증가 (monotonic-max) 로만 병합
/// - 낙관적 입찰은 서버 기록과 매칭되면 교체 (client_ref 우선, 없으면 금액+입찰자+시간)
// region:    --- Imports
use crate::auction::events::{BidEventData, PushEvent};
use crate::auction::model::{ApprovalStatus, Auction, AuctionStatus, Bid, BidStatus};
use crate::error::{BidValidationError, ClientError, Result};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Types
/// 클라이언트에서 보이는 입찰 생명주기
/// none -> OptimisticPending -> {ConfirmedPending | Approved | Rejected}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidLifecycle {
    OptimisticPending,
    ConfirmedPending,
    Approved,
    Rejected,
}

impl BidLifecycle {
    fn from_status(status: BidStatus) -> Self {
        match status {
            ApprovalStatus::Pending => BidLifecycle::ConfirmedPending,
            ApprovalStatus::Approved => BidLifecycle::Approved,
            ApprovalStatus::Rejected => BidLifecycle::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BidEntry {
    pub bid: Bid,
    pub lifecycle: BidLifecycle,
}

impl BidEntry {
    pub fn is_optimistic(&self) -> bool {
        self.lifecycle == BidLifecycle::OptimisticPending
    }
}

/// 현재 표시 중인 입찰 목록의 범위
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidListScope {
    All,
    ApprovedOnly,
}

/// 낙관적 입찰 접수 정보
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticBid {
    pub local_id: i64,
    pub client_ref: Uuid,
    pub amount: Decimal,
    pub bidder_id: i64,
}

/// 구독자에게 전달되는 상태 사본
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuctionSnapshot {
    pub auction: Option<Auction>,
    pub bids: Vec<BidEntry>,
    pub current_bid: Option<Decimal>,
    pub scope: Option<BidListScope>,
    pub deleted: bool,
}

impl AuctionSnapshot {
    pub fn time_left(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.auction.as_ref().map(|a| a.time_left_at(now))
    }
}
// endregion: --- Types

// region:    --- Input Parsing
/// 사용자 입력 금액 파싱 (네트워크 호출 전 검증)
pub fn parse_bid_amount(input: &str) -> std::result::Result<Decimal, BidValidationError> {
    let cleaned: String = input
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    if cleaned.is_empty() {
        return Err(BidValidationError::Empty);
    }
    let amount = Decimal::from_str(&cleaned)
        .map_err(|_| BidValidationError::Malformed(input.trim().to_string()))?;
    if amount <= Decimal::ZERO {
        return Err(BidValidationError::NotPositive);
    }
    Ok(amount)
}
// endregion: --- Input Parsing

// region:    --- Auction View
#[derive(Debug)]
pub struct AuctionView {
    auction_id: i64,
    auction: Option<Auction>,
    // 최신순 정렬
    bids: Vec<BidEntry>,
    scope: Option<BidListScope>,
    deleted: bool,
    next_local_id: i64,
    correlation_window: Duration,
}

impl AuctionView {
    pub fn new(auction_id: i64, correlation_window: Duration) -> Self {
        Self {
            auction_id,
            auction: None,
            bids: Vec::new(),
            scope: None,
            deleted: false,
            next_local_id: -1,
            correlation_window,
        }
    }

    pub fn auction_id(&self) -> i64 {
        self.auction_id
    }

    pub fn auction(&self) -> Option<&Auction> {
        self.auction.as_ref()
    }

    pub fn bids(&self) -> &[BidEntry] {
        &self.bids
    }

    pub fn scope(&self) -> Option<BidListScope> {
        self.scope
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// 표시용 현재가: 서버 값과 아직 매칭되지 않은 낙관적 입찰 중 최대값
    pub fn current_bid(&self) -> Option<Decimal> {
        let server = self.auction.as_ref().and_then(|a| a.current_bid);
        let optimistic = self
            .bids
            .iter()
            .filter(|e| e.is_optimistic())
            .map(|e| e.bid.amount)
            .max();
        match (server, optimistic) {
            (Some(s), Some(o)) => Some(s.max(o)),
            (s, o) => s.or(o),
        }
    }

    /// 다음 입찰이 넘어야 하는 금액
    pub fn current_highest(&self) -> Option<Decimal> {
        let auction = self.auction.as_ref()?;
        Some(
            self.current_bid()
                .map(|c| c.max(auction.starting_bid))
                .unwrap_or(auction.starting_bid),
        )
    }

    pub fn time_left(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.auction.as_ref().map(|a| a.time_left_at(now))
    }

    pub fn optimistic_entries(&self) -> impl Iterator<Item = &BidEntry> {
        self.bids.iter().filter(|e| e.is_optimistic())
    }

    pub fn snapshot(&self) -> AuctionSnapshot {
        AuctionSnapshot {
            auction: self.auction.clone(),
            bids: self.bids.clone(),
            current_bid: self.current_bid(),
            scope: self.scope,
            deleted: self.deleted,
        }
    }

    /// 폴링으로 받은 경매 정보로 교체
    pub fn apply_auction(&mut self, auction: Auction) {
        debug!(
            "{:<12} --> 경매 갱신 id: {}, current_bid: {:?}",
            "View", auction.id, auction.current_bid
        );
        self.auction = Some(auction);
    }

    /// 폴링으로 받은 입찰 목록으로 교체
    /// 매칭되지 않은 낙관적 입찰은 유지하되, 매칭 허용 시간을 넘긴 것은 버린다.
    pub fn apply_bids(&mut self, server_bids: Vec<Bid>, scope: BidListScope, now: DateTime<Utc>) {
        let optimistic: Vec<BidEntry> = self.bids.drain(..).filter(|e| e.is_optimistic()).collect();
        let mut claimed = vec![false; server_bids.len()];
        let mut kept = Vec::new();

        for entry in optimistic {
            let matched = server_bids
                .iter()
                .enumerate()
                .find(|(i, bid)| !claimed[*i] && self.correlates(&entry.bid, bid));
            match matched {
                Some((i, bid)) => {
                    claimed[i] = true;
                    info!(
                        "{:<12} --> 낙관적 입찰 확정: local {} -> server {}",
                        "View", entry.bid.id, bid.id
                    );
                }
                None if now - entry.bid.created_at > self.correlation_window => {
                    info!(
                        "{:<12} --> 확인되지 않은 낙관적 입찰 만료: local {}",
                        "View", entry.bid.id
                    );
                }
                None => kept.push(entry),
            }
        }

        self.bids = server_bids
            .into_iter()
            .map(|bid| BidEntry {
                lifecycle: BidLifecycle::from_status(bid.status),
                bid,
            })
            .chain(kept)
            .collect();
        self.sort_bids();
        self.scope = Some(scope);
    }

    /// 낙관적 입찰 적용
    /// 검증에 실패하면 상태를 변경하지 않는다.
    pub fn apply_optimistic_bid(
        &mut self,
        amount: Decimal,
        bidder_id: i64,
        now: DateTime<Utc>,
    ) -> Result<OptimisticBid> {
        let minimum = self
            .current_highest()
            .ok_or_else(|| ClientError::NotFound("Auction".to_string()))?;
        if amount <= Decimal::ZERO {
            return Err(BidValidationError::NotPositive.into());
        }
        if amount <= minimum {
            return Err(BidValidationError::TooLow { minimum }.into());
        }

        let local_id = self.next_local_id;
        self.next_local_id -= 1;
        let client_ref = Uuid::new_v4();

        self.bids.insert(
            0,
            BidEntry {
                bid: Bid {
                    id: local_id,
                    auction_id: self.auction_id,
                    bidder_id,
                    amount,
                    status: ApprovalStatus::Pending,
                    created_at: now,
                    client_ref: Some(client_ref),
                },
                lifecycle: BidLifecycle::OptimisticPending,
            },
        );
        info!(
            "{:<12} --> 낙관적 입찰 적용 local: {}, amount: {}",
            "View", local_id, amount
        );

        Ok(OptimisticBid {
            local_id,
            client_ref,
            amount,
            bidder_id,
        })
    }

    /// 전송 실패 시 낙관적 입찰 제거
    pub fn rollback_optimistic(&mut self, client_ref: Uuid) -> bool {
        let before = self.bids.len();
        self.bids
            .retain(|e| !(e.is_optimistic() && e.bid.client_ref == Some(client_ref)));
        before != self.bids.len()
    }

    /// 서버 기록으로 낙관적 입찰 교체 (client_ref 정확히 일치)
    pub fn confirm_optimistic(&mut self, client_ref: Uuid, server_bid: Bid) {
        let carried = self
            .bids
            .iter()
            .filter(|e| e.is_optimistic() && e.bid.client_ref == Some(client_ref))
            .map(|e| e.bid.amount)
            .max();
        self.bids
            .retain(|e| !(e.is_optimistic() && e.bid.client_ref == Some(client_ref)));
        if let Some(amount) = carried {
            self.carry_forward(amount, server_bid.status);
        }
        self.upsert_server_bid(server_bid);
    }

    /// 낙관적 입찰이 서버 기록으로 바뀌어도 표시 현재가가 내려가지 않게 유지
    fn carry_forward(&mut self, amount: Decimal, status: BidStatus) {
        if status != BidStatus::Rejected {
            self.raise_current_bid(amount);
        }
    }

    /// 서버가 알려준 현재가 병합 (더 클 때만)
    pub fn raise_current_bid(&mut self, value: Decimal) -> bool {
        let Some(auction) = self.auction.as_mut() else {
            return false;
        };
        match auction.current_bid {
            Some(current) if value <= current => {
                debug!(
                    "{:<12} --> 오래된 현재가 무시: {} <= {}",
                    "View", value, current
                );
                false
            }
            _ => {
                auction.current_bid = Some(value);
                true
            }
        }
    }

    /// 푸시 이벤트 병합, 상태가 바뀌었으면 true
    pub fn merge_push_event(&mut self, event: &PushEvent, now: DateTime<Utc>) -> bool {
        if event.auction_id() != self.auction_id {
            return false;
        }

        match event {
            PushEvent::AuctionUpdated {
                current_bid,
                bid_count,
                status,
                ..
            } => {
                let mut changed = current_bid.map_or(false, |v| self.raise_current_bid(v));
                if let Some(auction) = self.auction.as_mut() {
                    if let Some(count) = bid_count {
                        if *count > auction.bid_count {
                            auction.bid_count = *count;
                            changed = true;
                        }
                    }
                    if let Some(status) = status {
                        if auction.status != *status {
                            auction.status = *status;
                            changed = true;
                        }
                    }
                }
                changed
            }
            PushEvent::AuctionApproved { .. } => self.set_approval(ApprovalStatus::Approved),
            PushEvent::AuctionRejected { .. } => self.set_approval(ApprovalStatus::Rejected),
            PushEvent::AuctionDeleted { .. } => {
                let changed = !self.deleted;
                self.deleted = true;
                if let Some(auction) = self.auction.as_mut() {
                    auction.status = AuctionStatus::Ended;
                }
                changed
            }
            PushEvent::BidPlaced(data) => self.apply_bid_event(data, ApprovalStatus::Pending, now),
            PushEvent::BidApproved(data) => {
                let raised = self.raise_current_bid(data.current_bid.unwrap_or(data.amount));
                let updated = self.apply_bid_event(data, ApprovalStatus::Approved, now);
                raised || updated
            }
            PushEvent::BidRejected(data) => {
                self.apply_bid_event(data, ApprovalStatus::Rejected, now)
            }
            PushEvent::AuctionCreated { .. }
            | PushEvent::PaymentRequired(_)
            | PushEvent::PaymentCompleted(_) => false,
        }
    }

    fn set_approval(&mut self, status: ApprovalStatus) -> bool {
        match self.auction.as_mut() {
            Some(auction) if auction.approval_status != status => {
                auction.approval_status = status;
                true
            }
            _ => false,
        }
    }

    /// 입찰 이벤트를 목록에 반영
    fn apply_bid_event(&mut self, data: &BidEventData, status: BidStatus, now: DateTime<Utc>) -> bool {
        let incoming = Bid {
            id: data.bid_id.unwrap_or_default(),
            auction_id: data.auction_id,
            bidder_id: data.bidder_id,
            amount: data.amount,
            status,
            created_at: data.created_at.unwrap_or(now),
            client_ref: data.client_ref,
        };

        // 매칭되는 낙관적 입찰 제거
        let position = self
            .bids
            .iter()
            .position(|e| e.is_optimistic() && self.correlates(&e.bid, &incoming));
        let matched = position.map(|i| self.bids.remove(i));

        match (data.bid_id, matched) {
            (Some(_), matched) => {
                if let Some(entry) = matched {
                    self.carry_forward(entry.bid.amount, status);
                }
                self.upsert_server_bid(incoming);
                true
            }
            // 서버 id 가 없으면 낙관적 항목의 상태만 갱신
            (None, Some(mut entry)) => {
                entry.bid.status = status;
                entry.lifecycle = BidLifecycle::from_status(status);
                self.bids.push(entry);
                self.sort_bids();
                true
            }
            (None, None) => false,
        }
    }

    fn upsert_server_bid(&mut self, bid: Bid) {
        let lifecycle = BidLifecycle::from_status(bid.status);
        match self
            .bids
            .iter_mut()
            .find(|e| !e.is_optimistic() && e.bid.id == bid.id)
        {
            Some(existing) => {
                existing.bid = bid;
                existing.lifecycle = lifecycle;
            }
            None => {
                self.bids.push(BidEntry { bid, lifecycle });
                self.sort_bids();
            }
        }
    }

    /// 낙관적 입찰과 서버 기록의 동일성 판단
    fn correlates(&self, optimistic: &Bid, server: &Bid) -> bool {
        match (optimistic.client_ref, server.client_ref) {
            (Some(local), Some(remote)) => local == remote,
            _ => {
                optimistic.amount == server.amount
                    && optimistic.bidder_id == server.bidder_id
                    && (server.created_at - optimistic.created_at).num_milliseconds().abs()
                        <= self.correlation_window.num_milliseconds()
            }
        }
    }

    fn sort_bids(&mut self) {
        self.bids
            .sort_by(|a, b| b.bid.created_at.cmp(&a.bid.created_at));
    }
}
// endregion: --- Auction View

// endregion: --- Tests
