// region:    --- Imports
use auction_sync::admin::SystemMonitor;
use auction_sync::api::{HttpApiClient, Session};
use auction_sync::config::Config;
use auction_sync::push::PushHub;
use auction_sync::sync::AuctionSynchronizer;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Cli
#[derive(Parser)]
#[command(name = "auction-sync", about = "경매 상태 동기화 클라이언트")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 경매 하나를 따라가며 변경 사항을 출력
    Watch {
        auction_id: i64,
        /// 표준 입력에서 실시간 이벤트 JSON 프레임을 한 줄씩 읽는다
        #[arg(long)]
        push_stdin: bool,
    },
    /// 관리자 통계 모니터링
    Monitor,
}
// endregion: --- Cli

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let session = Session::with_token(config.auth_token.clone());
    let client = Arc::new(HttpApiClient::new(&config, session.clone())?);
    info!("{:<12} --> API: {}", "Main", config.api_base_url);

    match cli.command {
        Command::Watch {
            auction_id,
            push_stdin,
        } => watch(auction_id, push_stdin, client, session, &config).await,
        Command::Monitor => monitor(client, &config).await,
    }
}

/// 경매 상태 추적
async fn watch(
    auction_id: i64,
    push_stdin: bool,
    client: Arc<HttpApiClient>,
    session: Session,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let hub = PushHub::default();
    let synchronizer = AuctionSynchronizer::new(auction_id, client, session, config);
    synchronizer.start(Some(hub.subscribe()));

    if push_stdin {
        let hub = hub.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                if let Err(e) = hub.publish_frame(&line) {
                    error!("{:<12} --> 프레임 처리 실패: {}", "Main", e);
                }
            }
        });
    }

    let mut updates = synchronizer.subscribe();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                let time_left = snapshot
                    .time_left(Utc::now())
                    .map(|d| d.num_seconds())
                    .unwrap_or_default();
                info!(
                    "{:<12} --> current_bid: {:?}, bids: {}, scope: {:?}, time_left: {}s, deleted: {}",
                    "Watch",
                    snapshot.current_bid,
                    snapshot.bids.len(),
                    snapshot.scope,
                    time_left,
                    snapshot.deleted
                );
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    synchronizer.shutdown().await;
    Ok(())
}

/// 관리자 통계 모니터링
async fn monitor(
    client: Arc<HttpApiClient>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let monitor = SystemMonitor::new(client, config);
    monitor.start();

    let mut updates = monitor.subscribe();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if let Some(stats) = snapshot.stats {
                    info!(
                        "{:<12} --> users: {}, auctions: {} (active {}, pending {}), bids: {} (pending {}), revenue: {}",
                        "Monitor",
                        stats.total_users,
                        stats.total_auctions,
                        stats.active_auctions,
                        stats.pending_auctions,
                        stats.total_bids,
                        stats.pending_bids,
                        stats.total_revenue
                    );
                }
                for entry in snapshot.activity.iter().take(5) {
                    info!("{:<12} --> [{}] {}", "Activity", entry.kind, entry.message);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    monitor.shutdown();
    Ok(())
}
// endregion: --- Main
