/// 관리자 시스템 모니터
/// 통계와 활동 로그를 주기적으로(기본 30초) 조회해 최신 스냅샷을 유지한다.
// region:    --- Imports
use crate::api::AdminApi;
use crate::auction::model::{ActivityEntry, AdminStats};
use crate::config::Config;
use crate::error::Result;
use crate::scheduler::Poller;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

// endregion: --- Imports

// region:    --- Snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorSnapshot {
    pub stats: Option<AdminStats>,
    // 최신순, activity_limit 개까지
    pub activity: Vec<ActivityEntry>,
    pub refreshed_at: Option<DateTime<Utc>>,
}
// endregion: --- Snapshot

// region:    --- System Monitor
struct MonitorInner {
    api: Arc<dyn AdminApi>,
    activity_limit: usize,
    closed: AtomicBool,
    updates: watch::Sender<MonitorSnapshot>,
}

impl MonitorInner {
    async fn refresh(&self) -> Result<()> {
        let stats = self.api.get_admin_stats().await?;
        let mut activity = self.api.get_admin_activity().await?;
        activity.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        activity.truncate(self.activity_limit);

        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        info!(
            "{:<12} --> 통계 갱신 active: {}, pending: {}",
            "Monitor", stats.active_auctions, stats.pending_auctions
        );
        self.updates.send_replace(MonitorSnapshot {
            stats: Some(stats),
            activity,
            refreshed_at: Some(Utc::now()),
        });
        Ok(())
    }
}

pub struct SystemMonitor {
    inner: Arc<MonitorInner>,
    poll_interval: Duration,
    poller: StdMutex<Option<Poller>>,
}

impl SystemMonitor {
    pub fn new(api: Arc<dyn AdminApi>, config: &Config) -> Self {
        let (updates, _) = watch::channel(MonitorSnapshot::default());
        Self {
            inner: Arc::new(MonitorInner {
                api,
                activity_limit: config.activity_limit,
                closed: AtomicBool::new(false),
                updates,
            }),
            poll_interval: config.monitor_poll_interval,
            poller: StdMutex::new(None),
        }
    }

    /// 모니터링 시작
    pub fn start(&self) {
        info!(
            "{:<12} --> 시스템 모니터링 시작 poll: {:?}",
            "Monitor", self.poll_interval
        );
        let inner = Arc::clone(&self.inner);
        let poller = Poller::start("monitor", self.poll_interval, move || {
            let inner = Arc::clone(&inner);
            async move { inner.refresh().await }
        });
        if let Ok(mut slot) = self.poller.lock() {
            *slot = Some(poller);
        }
    }

    pub async fn refresh(&self) -> Result<()> {
        self.inner.refresh().await
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        self.inner.updates.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MonitorSnapshot> {
        self.inner.updates.subscribe()
    }

    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        if let Ok(mut slot) = self.poller.lock() {
            if let Some(poller) = slot.take() {
                poller.stop();
            }
        }
    }
}

impl Drop for SystemMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
// endregion: --- System Monitor
