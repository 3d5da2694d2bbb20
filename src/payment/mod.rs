/// 결제 체크아웃 흐름
/// 1. 게이트웨이 핸드오프 요청
/// 2. 복귀 URL 의 쿼리 파라미터(status, ref, auction_id) 로 완료 감지
/// 3. 쿼리가 없으면 로컬에 저장된 결제 성공 마커(기본 5분 유효) 확인
/// 4. 결제 푸시 이벤트를 주문 상태에 반영
// region:    --- Imports
use crate::api::{PaymentApi, PaymentHandoff};
use crate::auction::events::PushEvent;
use crate::auction::model::{Order, OrderStatus};
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Return Parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnStatus {
    Success,
    Failed,
    Cancelled,
    Other(String),
}

impl ReturnStatus {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "success" | "successful" | "paid" | "completed" => ReturnStatus::Success,
            "failed" | "failure" | "error" => ReturnStatus::Failed,
            "cancelled" | "canceled" => ReturnStatus::Cancelled,
            _ => ReturnStatus::Other(raw.to_string()),
        }
    }
}

/// 게이트웨이에서 돌아올 때의 쿼리 파라미터
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReturn {
    pub status: ReturnStatus,
    pub reference: Option<String>,
    pub auction_id: Option<i64>,
}

impl PaymentReturn {
    /// 복귀 URL 파싱. status 파라미터가 없으면 None.
    pub fn from_url(url: &str) -> Option<Self> {
        let url = Url::parse(url).ok()?;
        let mut status = None;
        let mut reference = None;
        let mut auction_id = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "status" => status = Some(ReturnStatus::parse(&value)),
                "ref" | "reference" => reference = Some(value.into_owned()),
                "auction_id" => auction_id = value.parse::<i64>().ok(),
                _ => {}
            }
        }
        Some(Self {
            status: status?,
            reference,
            auction_id,
        })
    }

    /// "?status=..&ref=.." 형태의 쿼리 문자열 파싱
    pub fn from_query(query: &str) -> Option<Self> {
        let query = query.trim_start_matches('?');
        Self::from_url(&format!("http://return.local/?{}", query))
    }
}
// endregion: --- Return Parameters

// region:    --- Pending Success Marker
/// 결제 성공 직후 저장하는 마커 (복귀 시 쿼리가 유실된 경우 대비)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSuccessMarker {
    pub auction_id: i64,
    #[serde(default)]
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PendingSuccessMarker {
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at <= ttl
    }
}

#[async_trait]
pub trait MarkerStore: Send + Sync {
    async fn save(&self, marker: &PendingSuccessMarker) -> Result<()>;

    async fn load(&self) -> Result<Option<PendingSuccessMarker>>;

    async fn clear(&self) -> Result<()>;
}

/// 메모리 저장소
#[derive(Default)]
pub struct MemoryMarkerStore {
    marker: Mutex<Option<PendingSuccessMarker>>,
}

#[async_trait]
impl MarkerStore for MemoryMarkerStore {
    async fn save(&self, marker: &PendingSuccessMarker) -> Result<()> {
        *self.marker.lock().await = Some(marker.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<PendingSuccessMarker>> {
        Ok(self.marker.lock().await.clone())
    }

    async fn clear(&self) -> Result<()> {
        *self.marker.lock().await = None;
        Ok(())
    }
}

/// JSON 파일 저장소 (프로세스 재시작 후에도 유지)
pub struct FileMarkerStore {
    path: PathBuf,
}

impl FileMarkerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MarkerStore for FileMarkerStore {
    async fn save(&self, marker: &PendingSuccessMarker) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec(marker)?;
        tokio::fs::write(&self.path, body).await?;
        Ok(())
    }

    async fn load(&self) -> Result<Option<PendingSuccessMarker>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(marker) => Ok(Some(marker)),
                Err(e) => {
                    warn!("{:<12} --> 손상된 결제 마커 무시: {:?}", "Payment", e);
                    Ok(None)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
// endregion: --- Pending Success Marker

// region:    --- Checkout Flow
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// 결제 완료 확인
    Completed {
        auction_id: Option<i64>,
        reference: Option<String>,
        order: Option<Order>,
    },
    /// 결제 실패 또는 취소
    Failed {
        auction_id: Option<i64>,
        reason: String,
    },
    /// 완료 신호 없음
    NotDetected,
}

pub struct CheckoutFlow {
    api: Arc<dyn PaymentApi>,
    markers: Arc<dyn MarkerStore>,
    marker_ttl: Duration,
}

impl CheckoutFlow {
    pub fn new(
        api: Arc<dyn PaymentApi>,
        markers: Arc<dyn MarkerStore>,
        marker_ttl: std::time::Duration,
    ) -> Self {
        Self {
            api,
            markers,
            marker_ttl: Duration::from_std(marker_ttl).unwrap_or_else(|_| Duration::minutes(5)),
        }
    }

    /// 결제 시작: 게이트웨이로 넘길 정보 반환
    pub async fn begin(&self, auction_id: i64) -> Result<PaymentHandoff> {
        let handoff = self.api.initiate_payment(auction_id).await?;
        info!(
            "{:<12} --> 결제 게이트웨이 핸드오프 준비 auction_id: {}",
            "Payment", auction_id
        );
        Ok(handoff)
    }

    /// 게이트웨이가 성공을 알렸을 때 마커 저장
    pub async fn mark_pending_success(
        &self,
        auction_id: i64,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.markers
            .save(&PendingSuccessMarker {
                auction_id,
                reference,
                created_at: now,
            })
            .await
    }

    /// 복귀 시 결제 완료 감지
    pub async fn detect_completion(
        &self,
        return_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<CheckoutOutcome> {
        if let Some(params) = return_url.and_then(PaymentReturn::from_url) {
            self.markers.clear().await?;
            return self.resolve_return(params).await;
        }

        let Some(marker) = self.markers.load().await? else {
            return Ok(CheckoutOutcome::NotDetected);
        };
        self.markers.clear().await?;
        if !marker.is_fresh(now, self.marker_ttl) {
            info!(
                "{:<12} --> 만료된 결제 마커 폐기 auction_id: {}",
                "Payment", marker.auction_id
            );
            return Ok(CheckoutOutcome::NotDetected);
        }
        Ok(CheckoutOutcome::Completed {
            auction_id: Some(marker.auction_id),
            reference: marker.reference,
            order: None,
        })
    }

    async fn resolve_return(&self, params: PaymentReturn) -> Result<CheckoutOutcome> {
        match params.status {
            ReturnStatus::Success => {
                // 참조 번호가 있으면 서버에서 실제 결제 상태 확인
                let order = match params.reference.as_deref() {
                    Some(reference) => Some(self.api.verify_payment(reference).await?),
                    None => None,
                };
                match order {
                    Some(order) if order.status != OrderStatus::Paid => {
                        Ok(CheckoutOutcome::Failed {
                            auction_id: params.auction_id.or(Some(order.auction_id)),
                            reason: format!("payment not settled: {:?}", order.status),
                        })
                    }
                    order => Ok(CheckoutOutcome::Completed {
                        auction_id: params
                            .auction_id
                            .or_else(|| order.as_ref().map(|o| o.auction_id)),
                        reference: params.reference,
                        order,
                    }),
                }
            }
            ReturnStatus::Failed => Ok(CheckoutOutcome::Failed {
                auction_id: params.auction_id,
                reason: "payment failed".to_string(),
            }),
            ReturnStatus::Cancelled => Ok(CheckoutOutcome::Failed {
                auction_id: params.auction_id,
                reason: "payment cancelled".to_string(),
            }),
            ReturnStatus::Other(raw) => Err(ClientError::Status {
                status: 200,
                code: crate::error::ErrorCode::Unknown,
                message: format!("unrecognised payment status {:?}", raw),
            }),
        }
    }
}
// endregion: --- Checkout Flow

// region:    --- Order Tracking
/// 결제 푸시 이벤트를 주문에 반영, 변경되면 true
pub fn apply_payment_event(order: &mut Order, event: &PushEvent) -> bool {
    match event {
        // 결제 완료된 주문은 늦게 도착한 결제 요청으로 되돌리지 않는다
        PushEvent::PaymentRequired(data)
            if data.order_id == order.id && order.status != OrderStatus::Paid =>
        {
            let mut changed = order.status != OrderStatus::Pending;
            order.status = OrderStatus::Pending;
            if let Some(amount) = data.amount {
                changed |= order.amount != amount;
                order.amount = amount;
            }
            changed
        }
        PushEvent::PaymentCompleted(data) if data.order_id == order.id => {
            let changed =
                order.status != OrderStatus::Paid || order.transaction_id != data.transaction_id;
            order.status = OrderStatus::Paid;
            if data.transaction_id.is_some() {
                order.transaction_id = data.transaction_id.clone();
            }
            changed
        }
        _ => false,
    }
}
// endregion: --- Order Tracking

// endregion: --- Tests
