// region:    --- Imports
use super::state::{parse_bid_amount, AuctionSnapshot, AuctionView, BidListScope, OptimisticBid};
use crate::api::{AuctionApi, PlaceBidRequest, Session};
use crate::auction::events::PushEvent;
use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::push::PushSubscription;
use crate::scheduler::{spawn_delayed, Poller};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// endregion: --- Imports

// region:    --- Bid Receipt
/// 입찰 제출 결과
#[derive(Debug, Clone, PartialEq)]
pub struct BidReceipt {
    pub optimistic: OptimisticBid,
    // 서버 응답에 기록이 포함되어 즉시 확정되었는지
    pub confirmed: bool,
    pub message: Option<String>,
}
// endregion: --- Bid Receipt

// region:    --- Inner
struct Inner {
    auction_id: i64,
    api: Arc<dyn AuctionApi>,
    session: Session,
    reconcile_delay: Duration,
    view: Mutex<AuctionView>,
    closed: AtomicBool,
    updates: watch::Sender<AuctionSnapshot>,
}

impl Inner {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// 뷰가 살아있을 때만 변경 적용 후 구독자에게 알림
    async fn write<F, R>(&self, apply: F) -> Option<R>
    where
        F: FnOnce(&mut AuctionView) -> R,
    {
        let mut view = self.view.lock().await;
        if self.is_closed() {
            debug!(
                "{:<12} --> 종료된 뷰에 대한 갱신 무시 auction_id: {}",
                "Sync", self.auction_id
            );
            return None;
        }
        let result = apply(&mut view);
        self.updates.send_replace(view.snapshot());
        Some(result)
    }

    async fn refresh_auction(&self) -> Result<()> {
        let auction = self.api.get_auction(self.auction_id).await?;
        self.write(|view| view.apply_auction(auction)).await;
        Ok(())
    }

    async fn refresh_bids(&self) -> Result<BidListScope> {
        let (bids, scope) = if self.session.is_authenticated() {
            match self.api.get_all_bids(self.auction_id).await {
                Ok(bids) => (bids, BidListScope::All),
                Err(ClientError::Unauthorized) => {
                    warn!(
                        "{:<12} --> 전체 입찰 조회 권한 없음, 승인된 입찰만 표시 auction_id: {}",
                        "Sync", self.auction_id
                    );
                    (
                        self.api.get_bids(self.auction_id).await?,
                        BidListScope::ApprovedOnly,
                    )
                }
                Err(e) => return Err(e),
            }
        } else {
            (
                self.api.get_bids(self.auction_id).await?,
                BidListScope::ApprovedOnly,
            )
        };

        let now = Utc::now();
        self.write(|view| view.apply_bids(bids, scope, now)).await;
        Ok(scope)
    }

    async fn refresh_all(&self) -> Result<()> {
        self.refresh_auction().await?;
        self.refresh_bids().await?;
        Ok(())
    }

    async fn merge_push_event(&self, event: &PushEvent) -> bool {
        if event.auction_id() != self.auction_id {
            return false;
        }
        let mut view = self.view.lock().await;
        if self.is_closed() {
            return false;
        }
        let changed = view.merge_push_event(event, Utc::now());
        if changed {
            debug!(
                "{:<12} --> 푸시 이벤트 반영: {} auction_id: {}",
                "Sync",
                event.name(),
                self.auction_id
            );
            self.updates.send_replace(view.snapshot());
        }
        changed
    }
}
// endregion: --- Inner

// region:    --- Auction Synchronizer
/// 경매 상태 동기화기
/// 폴링, 푸시, 낙관적 입찰을 하나의 AuctionView 로 합친다.
pub struct AuctionSynchronizer {
    inner: Arc<Inner>,
    poll_interval: Duration,
    poller: StdMutex<Option<Poller>>,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
}

impl AuctionSynchronizer {
    pub fn new(
        auction_id: i64,
        api: Arc<dyn AuctionApi>,
        session: Session,
        config: &Config,
    ) -> Self {
        let correlation_window = chrono::Duration::from_std(config.correlation_window)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));
        let view = AuctionView::new(auction_id, correlation_window);
        let (updates, _) = watch::channel(view.snapshot());

        Self {
            inner: Arc::new(Inner {
                auction_id,
                api,
                session,
                reconcile_delay: config.reconcile_delay,
                view: Mutex::new(view),
                closed: AtomicBool::new(false),
                updates,
            }),
            poll_interval: config.auction_poll_interval,
            poller: StdMutex::new(None),
            tasks: StdMutex::new(Vec::new()),
        }
    }

    pub fn auction_id(&self) -> i64 {
        self.inner.auction_id
    }

    /// 폴링과 푸시 소비 시작
    pub fn start(&self, push: Option<PushSubscription>) {
        info!(
            "{:<12} --> 동기화 시작 auction_id: {}, poll: {:?}",
            "Sync", self.inner.auction_id, self.poll_interval
        );
        let inner = Arc::clone(&self.inner);
        let poller = Poller::start("auction", self.poll_interval, move || {
            let inner = Arc::clone(&inner);
            async move { inner.refresh_all().await }
        });
        if let Ok(mut slot) = self.poller.lock() {
            *slot = Some(poller);
        }

        if let Some(subscription) = push {
            let inner = Arc::clone(&self.inner);
            let handle = tokio::spawn(async move {
                subscription
                    .consume_events(|event| {
                        let inner = Arc::clone(&inner);
                        async move {
                            inner.merge_push_event(&event).await;
                        }
                    })
                    .await;
            });
            self.track(handle);
        }
    }

    /// 경매 정보 재조회
    pub async fn refresh_auction(&self) -> Result<()> {
        self.inner.refresh_auction().await
    }

    /// 입찰 목록 재조회, 실제로 적용된 목록 범위 반환
    pub async fn refresh_bids(&self) -> Result<BidListScope> {
        self.inner.refresh_bids().await
    }

    /// 푸시 이벤트 병합
    pub async fn merge_push_event(&self, event: &PushEvent) -> bool {
        self.inner.merge_push_event(event).await
    }

    /// 로컬 검증 후 낙관적 입찰만 적용 (네트워크 호출 없음)
    pub async fn apply_optimistic_bid(&self, amount: Decimal) -> Result<OptimisticBid> {
        let bidder_id = self.inner.session.user_id().unwrap_or_default();
        let now = Utc::now();
        self.inner
            .write(|view| view.apply_optimistic_bid(amount, bidder_id, now))
            .await
            .unwrap_or(Err(ClientError::Closed))
    }

    /// 사용자 입력 문자열로 입찰
    pub async fn place_bid_input(&self, input: &str) -> Result<BidReceipt> {
        let amount = parse_bid_amount(input)?;
        self.place_bid(amount).await
    }

    /// 입찰: 낙관적 적용 -> 전송 -> 확정 또는 지연 재조회
    pub async fn place_bid(&self, amount: Decimal) -> Result<BidReceipt> {
        if !self.inner.session.is_authenticated() {
            return Err(ClientError::Unauthorized);
        }
        let optimistic = self.apply_optimistic_bid(amount).await?;
        let request = PlaceBidRequest {
            amount,
            client_ref: optimistic.client_ref,
        };

        let response = match self.inner.api.place_bid(self.inner.auction_id, &request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    "{:<12} --> 입찰 전송 실패, 낙관적 입찰 취소: {:?}",
                    "Sync", e
                );
                let client_ref = optimistic.client_ref;
                self.inner
                    .write(|view| view.rollback_optimistic(client_ref))
                    .await;
                return Err(e);
            }
        };

        let client_ref = optimistic.client_ref;
        let confirmed = match response.bid {
            Some(bid) if bid.client_ref.map_or(true, |r| r == client_ref) => {
                let current_bid = response.current_bid;
                self.inner
                    .write(move |view| {
                        view.confirm_optimistic(client_ref, bid);
                        if let Some(value) = current_bid {
                            view.raise_current_bid(value);
                        }
                    })
                    .await;
                true
            }
            _ => {
                if let Some(value) = response.current_bid {
                    self.inner.write(|view| view.raise_current_bid(value)).await;
                }
                false
            }
        };

        // 서버 확정 여부와 무관하게 권위 있는 상태로 한 번 더 맞춘다
        let inner = Arc::clone(&self.inner);
        let handle = spawn_delayed(self.inner.reconcile_delay, async move {
            if inner.is_closed() {
                return Ok(());
            }
            inner.refresh_all().await
        });
        self.track(handle);

        Ok(BidReceipt {
            optimistic,
            confirmed,
            message: response.message,
        })
    }

    pub async fn snapshot(&self) -> AuctionSnapshot {
        self.inner.view.lock().await.snapshot()
    }

    /// 상태 변경 구독
    pub fn subscribe(&self) -> watch::Receiver<AuctionSnapshot> {
        self.inner.updates.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// 종료: 폴링, 푸시, 지연 작업 중단
    /// 반환 이후에는 진행 중이던 요청이 끝나도 상태가 바뀌지 않는다.
    pub async fn shutdown(&self) {
        {
            let _view = self.inner.view.lock().await;
            self.inner.closed.store(true, Ordering::SeqCst);
        }
        self.abort_tasks();
        info!(
            "{:<12} --> 동기화 종료 auction_id: {}",
            "Sync", self.inner.auction_id
        );
    }

    fn track(&self, handle: JoinHandle<()>) {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.retain(|h| !h.is_finished());
            tasks.push(handle);
        }
    }

    fn abort_tasks(&self) {
        if let Ok(mut slot) = self.poller.lock() {
            if let Some(poller) = slot.take() {
                poller.stop();
            }
        }
        if let Ok(mut tasks) = self.tasks.lock() {
            for handle in tasks.drain(..) {
                handle.abort();
            }
        }
    }
}

impl Drop for AuctionSynchronizer {
    fn drop(&mut self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.abort_tasks();
    }
}
// endregion: --- Auction Synchronizer

// endregion: --- Tests
