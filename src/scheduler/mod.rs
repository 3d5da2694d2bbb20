/// 주기적 폴링 스케줄러
/// 실패는 로그만 남기고 다음 주기에 다시 시도한다 (백오프 없음).
// region:    --- Imports
use crate::error::Result;
use std::future::Future;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};
use tracing::{debug, error};

// endregion: --- Imports

// region:    --- Poller
/// 주기 작업 핸들. drop 되거나 stop 하면 루프가 중단된다.
pub struct Poller {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl Poller {
    /// 폴링 시작 (첫 실행은 즉시)
    pub fn start<F, Fut>(name: &'static str, period: Duration, task: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match task().await {
                    Ok(()) => debug!("{:<12} --> {} 폴링 완료", "Scheduler", name),
                    Err(e) => error!(
                        "{:<12} --> {} 폴링 중 오류 발생: {:?}",
                        "Scheduler", name, e
                    ),
                }
            }
        });
        Self { name, handle }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(&self) {
        debug!("{:<12} --> {} 폴링 중지", "Scheduler", self.name);
        self.handle.abort();
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
// endregion: --- Poller

// region:    --- Delayed Task
/// 지연 후 한 번 실행
pub fn spawn_delayed<F>(delay: Duration, task: F) -> JoinHandle<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        sleep(delay).await;
        if let Err(e) = task.await {
            error!("{:<12} --> 지연 작업 실패: {:?}", "Scheduler", e);
        }
    })
}
// endregion: --- Delayed Task
