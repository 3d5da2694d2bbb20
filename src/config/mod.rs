/// 클라이언트 설정
/// 환경 변수에서 읽고, 없으면 기본값을 사용한다.
// region:    --- Imports
use crate::error::{ClientError, Result};
use std::time::Duration;

// endregion: --- Imports

// region:    --- Defaults
/// 경매 상세 폴링 주기
pub const DEFAULT_AUCTION_POLL_SECS: u64 = 10;
/// 관리자 시스템 모니터링 폴링 주기
pub const DEFAULT_MONITOR_POLL_SECS: u64 = 30;
/// 낙관적 입찰 후 재조회 지연
pub const DEFAULT_RECONCILE_DELAY_MS: u64 = 2000;
/// 결제 완료 마커 유효 시간
pub const DEFAULT_PAYMENT_MARKER_TTL_SECS: u64 = 5 * 60;
/// 서버 기록과 낙관적 입찰을 매칭할 때 허용하는 시간 범위
pub const DEFAULT_CORRELATION_WINDOW_SECS: u64 = 60;
// endregion: --- Defaults

// region:    --- Config
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub auth_token: Option<String>,
    pub auction_poll_interval: Duration,
    pub monitor_poll_interval: Duration,
    pub reconcile_delay: Duration,
    pub payment_marker_ttl: Duration,
    pub correlation_window: Duration,
    pub request_timeout: Duration,
    pub activity_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            auth_token: None,
            auction_poll_interval: Duration::from_secs(DEFAULT_AUCTION_POLL_SECS),
            monitor_poll_interval: Duration::from_secs(DEFAULT_MONITOR_POLL_SECS),
            reconcile_delay: Duration::from_millis(DEFAULT_RECONCILE_DELAY_MS),
            payment_marker_ttl: Duration::from_secs(DEFAULT_PAYMENT_MARKER_TTL_SECS),
            correlation_window: Duration::from_secs(DEFAULT_CORRELATION_WINDOW_SECS),
            request_timeout: Duration::from_secs(15),
            activity_limit: 20,
        }
    }
}

impl Config {
    /// 환경 변수로부터 설정 생성
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let api_base_url =
            std::env::var("AUCTION_API_URL").unwrap_or_else(|_| defaults.api_base_url.clone());
        let auth_token = std::env::var("AUCTION_AUTH_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            auth_token,
            auction_poll_interval: Duration::from_secs(env_u64(
                "AUCTION_POLL_SECS",
                DEFAULT_AUCTION_POLL_SECS,
            )?),
            monitor_poll_interval: Duration::from_secs(env_u64(
                "MONITOR_POLL_SECS",
                DEFAULT_MONITOR_POLL_SECS,
            )?),
            reconcile_delay: Duration::from_millis(env_u64(
                "RECONCILE_DELAY_MS",
                DEFAULT_RECONCILE_DELAY_MS,
            )?),
            payment_marker_ttl: Duration::from_secs(env_u64(
                "PAYMENT_MARKER_TTL_SECS",
                DEFAULT_PAYMENT_MARKER_TTL_SECS,
            )?),
            correlation_window: defaults.correlation_window,
            request_timeout: Duration::from_secs(env_u64("REQUEST_TIMEOUT_SECS", 15)?),
            activity_limit: env_u64("ACTIVITY_LIMIT", defaults.activity_limit as u64)? as usize,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.auction_poll_interval = interval;
        self
    }

    pub fn with_reconcile_delay(mut self, delay: Duration) -> Self {
        self.reconcile_delay = delay;
        self
    }
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ClientError::Config(format!("{} must be an integer, got {:?}", key, raw))),
        Err(_) => Ok(default),
    }
}
// endregion: --- Config
