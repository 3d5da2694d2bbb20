// region:    --- Imports
use super::{
    routes, AdminApi, AuctionApi, PaymentApi, PlaceBidRequest, PlaceBidResponse, Session,
};
use crate::auction::model::{ActivityEntry, AdminStats, Auction, Bid, Category, Order};
use crate::config::Config;
use crate::error::{ClientError, ErrorBody, ErrorCode, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

// endregion: --- Imports

// region:    --- Payment Handoff
/// 결제 게이트웨이로 넘기는 방법
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentHandoff {
    /// 새 창 또는 현재 창을 이동할 URL
    Redirect { url: String },
    /// 자동 제출되는 HTML 폼
    Form { html: String },
}

#[derive(Deserialize)]
struct RawHandoff {
    #[serde(default, alias = "redirect_url")]
    payment_url: Option<String>,
    #[serde(default)]
    html: Option<String>,
}
// endregion: --- Payment Handoff

// region:    --- Http Api Client
#[derive(Clone)]
pub struct HttpApiClient {
    http: Client,
    base_url: String,
    session: Session,
}

impl HttpApiClient {
    pub fn new(config: &Config, session: Session) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 세션에 토큰이 있으면 Authorization 헤더 추가
    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, resource: &str) -> Result<T> {
        debug!("{:<12} --> GET {}", "Api", path);
        let response = self
            .authorize(self.http.get(self.url(path)))
            .send()
            .await?;
        decode_response(response, resource).await
    }

    async fn get_json_at<T: DeserializeOwned>(&self, url: Url, resource: &str) -> Result<T> {
        debug!("{:<12} --> GET {}", "Api", url.path());
        let response = self.authorize(self.http.get(url)).send().await?;
        decode_response(response, resource).await
    }

    /// 카테고리 목록 조회
    pub async fn get_categories(&self) -> Result<Vec<Category>> {
        self.get_json(routes::CATEGORIES, "Category").await
    }

    /// 카테고리 단건 조회
    pub async fn get_category(&self, category_id: i64) -> Result<Category> {
        self.get_categories()
            .await?
            .into_iter()
            .find(|c| c.id == category_id)
            .ok_or_else(|| ClientError::NotFound("Category".to_string()))
    }

    /// 주문 조회
    pub async fn get_order(&self, order_id: i64) -> Result<Order> {
        self.get_json(&routes::order(order_id), "Order").await
    }
}

/// 응답 상태 코드에 따라 본문 디코딩 또는 오류 변환
async fn decode_response<T: DeserializeOwned>(response: Response, resource: &str) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        let bytes = response.bytes().await?;
        return Ok(serde_json::from_slice(&bytes)?);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ClientError::Unauthorized),
        StatusCode::NOT_FOUND => Err(ClientError::NotFound(resource.to_string())),
        _ => {
            let text = response.text().await.unwrap_or_default();
            let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) => (body.resolved_code(), body.error),
                Err(_) => (ErrorCode::from_legacy_message(&text), text),
            };
            warn!(
                "{:<12} --> 요청 실패 status: {}, code: {:?}",
                "Api", status, code
            );
            Err(ClientError::Status {
                status: status.as_u16(),
                code,
                message,
            })
        }
    }
}

#[async_trait]
impl AuctionApi for HttpApiClient {
    async fn get_auction(&self, auction_id: i64) -> Result<Auction> {
        self.get_json(&routes::auction(auction_id), "Auction").await
    }

    async fn get_bids(&self, auction_id: i64) -> Result<Vec<Bid>> {
        self.get_json(&routes::approved_bids(auction_id), "Auction")
            .await
    }

    async fn get_all_bids(&self, auction_id: i64) -> Result<Vec<Bid>> {
        self.get_json(&routes::all_bids(auction_id), "Auction")
            .await
    }

    async fn place_bid(
        &self,
        auction_id: i64,
        request: &PlaceBidRequest,
    ) -> Result<PlaceBidResponse> {
        info!(
            "{:<12} --> 입찰 요청 auction_id: {}, amount: {}",
            "Api", auction_id, request.amount
        );
        let response = self
            .authorize(self.http.post(self.url(&routes::place_bid(auction_id))))
            .json(request)
            .send()
            .await?;
        decode_response(response, "Auction").await
    }
}

#[async_trait]
impl AdminApi for HttpApiClient {
    async fn get_admin_stats(&self) -> Result<AdminStats> {
        self.get_json(routes::ADMIN_STATS, "Stats").await
    }

    async fn get_admin_activity(&self) -> Result<Vec<ActivityEntry>> {
        self.get_json(routes::ADMIN_ACTIVITY, "Activity").await
    }
}

#[async_trait]
impl PaymentApi for HttpApiClient {
    /// 결제 시작: 게이트웨이 핸드오프 정보 요청
    async fn initiate_payment(&self, auction_id: i64) -> Result<PaymentHandoff> {
        info!("{:<12} --> 결제 요청 auction_id: {}", "Api", auction_id);
        let response = self
            .authorize(self.http.post(self.url(routes::PAYMENT_INITIATE)))
            .json(&serde_json::json!({ "auction_id": auction_id }))
            .send()
            .await?;
        let raw: RawHandoff = decode_response(response, "Auction").await?;
        match (raw.payment_url, raw.html) {
            (Some(url), _) => Ok(PaymentHandoff::Redirect { url }),
            (None, Some(html)) => Ok(PaymentHandoff::Form { html }),
            (None, None) => Err(ClientError::Status {
                status: 200,
                code: ErrorCode::PaymentFailed,
                message: "payment handoff missing url and form".to_string(),
            }),
        }
    }

    /// 결제 참조 번호로 주문 상태 검증
    async fn verify_payment(&self, reference: &str) -> Result<Order> {
        let url = routes::payment_verify(&self.base_url, reference)?;
        self.get_json_at(url, "Order").await
    }
}
// endregion: --- Http Api Client
