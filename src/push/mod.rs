/// 실시간 이벤트 채널
/// 소켓 등 외부 전송 계층에서 받은 프레임을 디코딩해 구독자들에게 fan-out 한다.
/// 각 구독자는 독립적으로 자신의 상태 사본을 유지한다.
// region:    --- Imports
use crate::auction::events::PushEvent;
use crate::error::Result;
use std::future::Future;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

// endregion: --- Imports

const DEFAULT_CAPACITY: usize = 256;

// region:    --- Push Hub
#[derive(Clone)]
pub struct PushHub {
    sender: broadcast::Sender<PushEvent>,
}

impl Default for PushHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl PushHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 이벤트 발행, 수신한 구독자 수 반환
    pub fn publish(&self, event: PushEvent) -> usize {
        debug!(
            "{:<12} --> 이벤트 발행: {} auction_id={}",
            "Push",
            event.name(),
            event.auction_id()
        );
        // 구독자가 없으면 send 는 실패하지만 정상 상황이다
        self.sender.send(event).unwrap_or(0)
    }

    /// 전송 계층에서 받은 원시 JSON 프레임 발행
    pub fn publish_frame(&self, frame: &str) -> Result<usize> {
        match PushEvent::decode_frame(frame) {
            Ok(Some(event)) => Ok(self.publish(event)),
            Ok(None) => Ok(0),
            Err(e) => {
                error!("{:<12} --> deserialize 오류: {:?}", "Push", e);
                Err(e.into())
            }
        }
    }

    pub fn subscribe(&self) -> PushSubscription {
        PushSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
// endregion: --- Push Hub

// region:    --- Push Subscription
pub struct PushSubscription {
    receiver: broadcast::Receiver<PushEvent>,
}

impl PushSubscription {
    /// 다음 이벤트 수신. 채널이 닫히면 None.
    /// 밀린 이벤트는 건너뛰고 계속 진행한다.
    pub async fn recv(&mut self) -> Option<PushEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "{:<12} --> 처리 지연으로 이벤트 {}개 건너뜀",
                        "Push", skipped
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// 채널이 닫힐 때까지 이벤트 소비
    pub async fn consume_events<F, Fut>(mut self, handler: F)
    where
        F: Fn(PushEvent) -> Fut,
        Fut: Future<Output = ()>,
    {
        info!("{:<12} --> 이벤트 소비 시작", "Push");
        while let Some(event) = self.recv().await {
            handler(event).await;
        }
        info!("{:<12} --> 이벤트 채널 종료", "Push");
    }
}
// endregion: --- Push Subscription

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_each_subscriber_gets_its_own_copy() {
        let hub = PushHub::new(8);
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        let delivered = hub.publish(PushEvent::AuctionApproved { auction_id: 5 });
        assert_eq!(delivered, 2);

        assert_eq!(
            first.recv().await,
            Some(PushEvent::AuctionApproved { auction_id: 5 })
        );
        assert_eq!(
            second.recv().await,
            Some(PushEvent::AuctionApproved { auction_id: 5 })
        );
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let hub = PushHub::default();
        assert_eq!(hub.publish(PushEvent::AuctionDeleted { auction_id: 1 }), 0);
    }

    #[tokio::test]
    async fn test_publish_frame() {
        let hub = PushHub::new(8);
        let mut sub = hub.subscribe();
        let n = hub
            .publish_frame(r#"{"event": "auction-deleted", "data": {"auction_id": 3}}"#)
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(
            sub.recv().await,
            Some(PushEvent::AuctionDeleted { auction_id: 3 })
        );

        assert_eq!(hub.publish_frame(r#"{"event": "chat", "data": {}}"#).unwrap(), 0);
        assert!(hub.publish_frame("not json").is_err());
    }

    #[tokio::test]
    async fn test_lagged_subscriber_keeps_going() {
        let hub = PushHub::new(2);
        let mut sub = hub.subscribe();
        for id in 1..=5 {
            hub.publish(PushEvent::AuctionApproved { auction_id: id });
        }
        // 가장 오래된 이벤트들은 버려지고 최신 두 개만 남는다
        assert_eq!(
            sub.recv().await,
            Some(PushEvent::AuctionApproved { auction_id: 4 })
        );
        assert_eq!(
            sub.recv().await,
            Some(PushEvent::AuctionApproved { auction_id: 5 })
        );
    }

    #[tokio::test]
    async fn test_recv_returns_none_when_closed() {
        let hub = PushHub::new(2);
        let mut sub = hub.subscribe();
        drop(hub);
        assert_eq!(sub.recv().await, None);
    }
}
