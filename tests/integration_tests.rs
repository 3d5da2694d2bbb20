use auction_sync::admin::SystemMonitor;
use auction_sync::api::{AuctionApi, HttpApiClient, PaymentApi, PaymentHandoff, Session};
use auction_sync::auction::events::PushEvent;
use auction_sync::auction::model::{ApprovalStatus, Auction, AuctionStatus, Bid};
use auction_sync::config::Config;
use auction_sync::error::{ClientError, ErrorCode};
use auction_sync::payment::{CheckoutFlow, CheckoutOutcome, MemoryMarkerStore};
use auction_sync::push::PushHub;
use auction_sync::sync::{AuctionSynchronizer, BidLifecycle, BidListScope};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, Once};
use tokio::net::TcpListener;
use uuid::Uuid;

const ADMIN_TOKEN: &str = "admin-token";
const BIDDER_TOKEN: &str = "bidder-token";

/// 트레이싱 초기화
fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .without_time()
            .with_target(false)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).expect("트레이싱 구독자 설정 실패");
    });
}

// region:    --- Mock Backend
#[derive(Clone)]
struct MockBackend {
    auction: Arc<Mutex<Auction>>,
    bids: Arc<Mutex<Vec<Bid>>>,
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

async fn get_auction(State(backend): State<MockBackend>, Path(id): Path<i64>) -> Response {
    let auction = backend.auction.lock().unwrap().clone();
    if auction.id != id {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response();
    }
    Json(auction).into_response()
}

async fn get_bids(State(backend): State<MockBackend>) -> Response {
    let bids: Vec<Bid> = backend
        .bids
        .lock()
        .unwrap()
        .iter()
        .filter(|b| b.status == ApprovalStatus::Approved)
        .cloned()
        .collect();
    Json(bids).into_response()
}

async fn get_all_bids(State(backend): State<MockBackend>, headers: HeaderMap) -> Response {
    match bearer(&headers).as_deref() {
        Some(ADMIN_TOKEN) => Json(backend.bids.lock().unwrap().clone()).into_response(),
        Some(_) => (StatusCode::FORBIDDEN, Json(json!({"error": "forbidden"}))).into_response(),
        None => (StatusCode::UNAUTHORIZED, Json(json!({"error": "login"}))).into_response(),
    }
}

async fn place_bid(
    State(backend): State<MockBackend>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if bearer(&headers).is_none() {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "login"}))).into_response();
    }
    let amount: Decimal = match serde_json::from_value(body["amount"].clone()) {
        Ok(amount) => amount,
        Err(_) => {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": "bad amount"})))
                .into_response()
        }
    };
    let client_ref: Option<Uuid> = serde_json::from_value(body["client_ref"].clone()).ok();

    let mut auction = backend.auction.lock().unwrap();
    if amount <= auction.current_highest() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Bid must be higher than the current bid",
                "code": "LOW_BID"
            })),
        )
            .into_response();
    }

    let mut bids = backend.bids.lock().unwrap();
    let bid = Bid {
        id: 100 + bids.len() as i64,
        auction_id: id,
        bidder_id: 7,
        amount,
        status: ApprovalStatus::Approved,
        created_at: Utc::now(),
        client_ref,
    };
    bids.push(bid.clone());
    auction.current_bid = Some(amount);
    auction.bid_count += 1;

    Json(json!({
        "message": "Bid placed",
        "bid": bid,
        "current_bid": amount
    }))
    .into_response()
}

async fn get_categories() -> Response {
    Json(json!([
        {"id": 1, "name": "Furniture"},
        {"id": 2, "name": "Ceramics", "description": "Porcelain and pottery"}
    ]))
    .into_response()
}

async fn get_order(Path(id): Path<i64>) -> Response {
    if id != 5 {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "Order not found"}))).into_response();
    }
    Json(json!({"id": 5, "auction_id": 1, "amount": 150, "status": "pending"})).into_response()
}

async fn initiate_payment(Json(body): Json<Value>) -> Response {
    let auction_id = body["auction_id"].as_i64().unwrap_or_default();
    Json(json!({"payment_url": format!("https://gateway.test/pay/{}", auction_id)}))
        .into_response()
}

async fn verify_payment(Path(reference): Path<String>) -> Response {
    Json(json!({
        "id": 5, "auction_id": 1, "amount": 150,
        "status": "paid", "transaction_id": reference
    }))
    .into_response()
}

async fn admin_stats(headers: HeaderMap) -> Response {
    if bearer(&headers).as_deref() != Some(ADMIN_TOKEN) {
        return (StatusCode::FORBIDDEN, Json(json!({"error": "forbidden"}))).into_response();
    }
    Json(json!({
        "total_users": 12, "total_auctions": 8, "active_auctions": 3,
        "pending_auctions": 2, "total_bids": 40, "pending_bids": 4,
        "total_revenue": 5230.5
    }))
    .into_response()
}

async fn admin_activity() -> Response {
    Json(json!([
        {"id": 1, "type": "auction", "message": "Auction created", "created_at": "2024-05-01T10:00:00Z"},
        {"id": 2, "type": "bid", "message": "Bid approved", "created_at": "2024-05-01T11:00:00Z"}
    ]))
    .into_response()
}

fn test_auction() -> Auction {
    Auction {
        id: 1,
        title: "Louis XV commode".to_string(),
        description: "Walnut, circa 1760".to_string(),
        starting_bid: Decimal::from(100),
        current_bid: None,
        status: AuctionStatus::Active,
        approval_status: ApprovalStatus::Approved,
        end_time: Utc::now() + Duration::hours(2),
        seller_id: 3,
        bid_count: 0,
        category_id: Some(1),
    }
}

/// 목 서버 실행, (설정, 백엔드 상태) 반환
async fn setup() -> (Config, MockBackend) {
    init_tracing();
    let backend = MockBackend {
        auction: Arc::new(Mutex::new(test_auction())),
        bids: Arc::new(Mutex::new(Vec::new())),
    };

    let routes_all = Router::new()
        .route("/auctions/:id", get(get_auction))
        .route("/auctions/:id/bids", get(get_bids))
        .route("/auctions/:id/bids/all", get(get_all_bids))
        .route("/auctions/:id/bid", post(place_bid))
        .route("/categories", get(get_categories))
        .route("/orders/:id", get(get_order))
        .route("/payments/initiate", post(initiate_payment))
        .route("/payments/verify/:reference", get(verify_payment))
        .route("/admin/stats", get(admin_stats))
        .route("/admin/activity", get(admin_activity))
        .with_state(backend.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, routes_all.into_make_service())
            .await
            .unwrap();
    });

    let config = Config::default()
        .with_base_url(format!("http://{}", addr))
        .with_poll_interval(std::time::Duration::from_secs(60))
        .with_reconcile_delay(std::time::Duration::from_millis(100));
    (config, backend)
}

fn synchronizer(config: &Config, session: Session) -> AuctionSynchronizer {
    let client = HttpApiClient::new(config, session.clone()).unwrap();
    AuctionSynchronizer::new(1, Arc::new(client), session, config)
}
// endregion: --- Mock Backend

/// 입찰 후 즉시 표시, 서버 확정 후 한 건만 남는지 확인
#[tokio::test]
async fn test_place_bid_confirms_single_row() {
    let (config, _backend) = setup().await;
    let sync = synchronizer(&config, Session::authenticated(ADMIN_TOKEN, 7));
    sync.refresh_auction().await.unwrap();
    assert_eq!(sync.refresh_bids().await.unwrap(), BidListScope::All);

    let receipt = sync.place_bid_input("150").await.unwrap();
    assert!(receipt.confirmed);
    assert_eq!(receipt.message.as_deref(), Some("Bid placed"));

    let snapshot = sync.snapshot().await;
    assert_eq!(snapshot.current_bid, Some(Decimal::from(150)));
    assert_eq!(snapshot.bids.len(), 1);
    assert_eq!(snapshot.bids[0].lifecycle, BidLifecycle::Approved);

    // 지연 재조회 이후에도 중복 행이 없어야 한다
    tokio::time::sleep(tokio::time::Duration::from_millis(400)).await;
    let snapshot = sync.snapshot().await;
    assert_eq!(snapshot.bids.len(), 1);
    assert_eq!(snapshot.bids[0].bid.amount, Decimal::from(150));
    assert_eq!(snapshot.bids[0].bid.status, ApprovalStatus::Approved);
    assert_eq!(snapshot.auction.unwrap().bid_count, 1);

    sync.shutdown().await;
}

/// 서버가 거절하면 낙관적 입찰이 사라지고 에러 코드가 구조화되어 전달된다
#[tokio::test]
async fn test_server_rejection_rolls_back() {
    let (config, backend) = setup().await;
    let sync = synchronizer(&config, Session::authenticated(BIDDER_TOKEN, 7));
    sync.refresh_auction().await.unwrap();

    // 다른 사용자가 먼저 높은 금액으로 입찰
    backend.auction.lock().unwrap().current_bid = Some(Decimal::from(500));

    let err = sync.place_bid(Decimal::from(150)).await.unwrap_err();
    match &err {
        ClientError::Status { status, code, .. } => {
            assert_eq!(*status, 400);
            assert_eq!(*code, ErrorCode::LowBid);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(
        err.user_message(),
        "Your bid must be higher than the current bid."
    );

    let snapshot = sync.snapshot().await;
    assert!(snapshot.bids.is_empty());
    assert_eq!(snapshot.current_bid, None);
}

/// 권한이 없으면 승인된 입찰 목록으로 대체되고 범위가 기록된다
#[tokio::test]
async fn test_bid_list_scope_fallback() {
    let (config, backend) = setup().await;
    backend.bids.lock().unwrap().extend([
        Bid {
            id: 1,
            auction_id: 1,
            bidder_id: 4,
            amount: Decimal::from(110),
            status: ApprovalStatus::Approved,
            created_at: Utc::now() - Duration::minutes(10),
            client_ref: None,
        },
        Bid {
            id: 2,
            auction_id: 1,
            bidder_id: 5,
            amount: Decimal::from(120),
            status: ApprovalStatus::Pending,
            created_at: Utc::now() - Duration::minutes(5),
            client_ref: None,
        },
    ]);

    let bidder = synchronizer(&config, Session::authenticated(BIDDER_TOKEN, 7));
    assert_eq!(
        bidder.refresh_bids().await.unwrap(),
        BidListScope::ApprovedOnly
    );
    assert_eq!(bidder.snapshot().await.bids.len(), 1);

    let anonymous = synchronizer(&config, Session::anonymous());
    assert_eq!(
        anonymous.refresh_bids().await.unwrap(),
        BidListScope::ApprovedOnly
    );

    let admin = synchronizer(&config, Session::authenticated(ADMIN_TOKEN, 1));
    assert_eq!(admin.refresh_bids().await.unwrap(), BidListScope::All);
    let snapshot = admin.snapshot().await;
    assert_eq!(snapshot.bids.len(), 2);
    // 최신순
    assert_eq!(snapshot.bids[0].bid.id, 2);
    assert_eq!(snapshot.bids[0].lifecycle, BidLifecycle::ConfirmedPending);
}

/// 여러 구독자가 같은 푸시 채널에서 각자 상태를 유지한다
#[tokio::test]
async fn test_push_events_fan_out_to_independent_views() {
    let (config, _backend) = setup().await;
    let hub = PushHub::default();
    let first = synchronizer(&config, Session::anonymous());
    let second = synchronizer(&config, Session::anonymous());
    first.start(Some(hub.subscribe()));
    second.start(Some(hub.subscribe()));
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    hub.publish_frame(
        r#"{"event": "bid-approved", "data": {"auction_id": 1, "bid_id": 77, "bidder_id": 9, "amount": 200}}"#,
    )
    .unwrap();
    hub.publish_frame(
        r#"{"event": "bid-approved", "data": {"auction_id": 1, "bid_id": 76, "bidder_id": 8, "amount": 180}}"#,
    )
    .unwrap();
    hub.publish(PushEvent::AuctionUpdated {
        auction_id: 2,
        current_bid: Some(Decimal::from(9000)),
        bid_count: None,
        status: None,
    });
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    for sync in [&first, &second] {
        let snapshot = sync.snapshot().await;
        assert_eq!(snapshot.current_bid, Some(Decimal::from(200)));
        assert_eq!(snapshot.bids.len(), 2);
    }

    first.shutdown().await;
    second.shutdown().await;
}

/// 존재하지 않는 리소스는 NotFound 로 변환된다
#[tokio::test]
async fn test_missing_resources() {
    let (config, _backend) = setup().await;
    let client = HttpApiClient::new(&config, Session::anonymous()).unwrap();

    let err = client.get_order(99).await.unwrap_err();
    assert_eq!(err.user_message(), "Order Not Found");

    let err = client.get_category(42).await.unwrap_err();
    assert_eq!(err.user_message(), "Category Not Found");

    let category = client.get_category(2).await.unwrap();
    assert_eq!(category.name, "Ceramics");

    let order = client.get_order(5).await.unwrap();
    assert_eq!(order.amount, Decimal::from(150));

    assert!(matches!(
        client.get_auction(404).await,
        Err(ClientError::NotFound(_))
    ));
}

/// 결제 핸드오프 후 복귀 URL 로 완료 확인
#[tokio::test]
async fn test_checkout_flow() {
    let (config, _backend) = setup().await;
    let client = Arc::new(HttpApiClient::new(&config, Session::authenticated(BIDDER_TOKEN, 7)).unwrap());
    let flow = CheckoutFlow::new(
        client,
        Arc::new(MemoryMarkerStore::default()),
        config.payment_marker_ttl,
    );

    let handoff = flow.begin(1).await.unwrap();
    assert_eq!(
        handoff,
        PaymentHandoff::Redirect {
            url: "https://gateway.test/pay/1".to_string()
        }
    );

    let outcome = flow
        .detect_completion(
            Some("https://shop.test/payment/return?status=success&ref=TX42&auction_id=1"),
            Utc::now(),
        )
        .await
        .unwrap();
    match outcome {
        CheckoutOutcome::Completed {
            auction_id, order, ..
        } => {
            assert_eq!(auction_id, Some(1));
            assert_eq!(order.unwrap().transaction_id.as_deref(), Some("TX42"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

/// 특수문자가 들어간 결제 참조 번호도 같은 검증 경로로 전달된다
#[tokio::test]
async fn test_verify_payment_with_reserved_characters() {
    let (config, _backend) = setup().await;
    let client = HttpApiClient::new(&config, Session::authenticated(BIDDER_TOKEN, 7)).unwrap();

    let order = client.verify_payment("TX/1?x#y").await.unwrap();
    assert_eq!(order.transaction_id.as_deref(), Some("TX/1?x#y"));
}

/// 관리자 통계 조회
#[tokio::test]
async fn test_admin_monitor() {
    let (config, _backend) = setup().await;

    let anonymous = SystemMonitor::new(
        Arc::new(HttpApiClient::new(&config, Session::anonymous()).unwrap()),
        &config,
    );
    assert!(matches!(
        anonymous.refresh().await,
        Err(ClientError::Unauthorized)
    ));

    let admin = SystemMonitor::new(
        Arc::new(HttpApiClient::new(&config, Session::authenticated(ADMIN_TOKEN, 1)).unwrap()),
        &config,
    );
    admin.refresh().await.unwrap();
    let snapshot = admin.snapshot();
    let stats = snapshot.stats.unwrap();
    assert_eq!(stats.active_auctions, 3);
    assert_eq!(stats.total_revenue, Decimal::new(52305, 1));
    assert_eq!(snapshot.activity[0].id, 2);
}
