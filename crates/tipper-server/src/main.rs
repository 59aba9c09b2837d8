mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use tipper_db::Database;
use tipper_gateway::dispatcher::{DispatchSettings, TransferDispatcher};
use tipper_gateway::handlers::Handler;
use tipper_gateway::identity::SelfIdentity;
use tipper_gateway::notifier::Notifier;
use tipper_gateway::registry::SqliteRegistry;
use tipper_gateway::session::{Session, SessionConfig};
use tipper_ledger::JsonRpcLedger;
use tipper_slack::{SlackApi, SlackPlatform};

use crate::config::Config;

const STATUS_TEXT: &str = "tipper: tips ERC-20 tokens from Slack reactions and mentions";

/// Platform events buffered between the Slack listener and the session loop.
const EVENT_BUFFER: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tipper=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {}", e);
            eprintln!("       All credentials and ledger settings must be supplied");
            eprintln!("       through the environment or a .env file.");
            std::process::exit(1);
        }
    };

    // Collaborators
    let db = Arc::new(Database::connect(&config.database_url)?);
    let registry = Arc::new(SqliteRegistry::new(db));
    let ledger = Arc::new(JsonRpcLedger::new(config.ledger)?);
    let platform = SlackPlatform::new(Arc::new(SlackApi::new(config.slack_token)));

    // Dispatch core
    let identity = Arc::new(SelfIdentity::new());
    let dispatcher = TransferDispatcher::new(
        registry,
        ledger,
        DispatchSettings {
            amount: config.tip_amount,
            ledger_timeout: config.ledger_timeout,
        },
    );
    let notifier = Notifier::new(Arc::new(platform.clone()));
    let handler = Handler::new(dispatcher, notifier, identity.clone());
    let session = Session::new(
        SessionConfig {
            trigger_reaction: config.tip_reaction,
            workers: config.workers,
            dedup_capacity: config.dedup_capacity,
        },
        identity,
        handler,
    );

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
                cancel.cancel();
            }
        }
    });

    // Status endpoint
    let app = Router::new()
        .route("/", get(|| async { STATUS_TEXT }))
        .layer(TraceLayer::new_for_http());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Status endpoint listening on {}", addr);

    let status = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await
        }
    });

    // Slack listener feeds the session loop
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let slack = tokio::spawn({
        let cancel = cancel.clone();
        async move { platform.run(tx, cancel).await }
    });

    let result = session.run(rx, cancel.clone()).await;

    cancel.cancel();
    let _ = slack.await;
    if let Ok(Err(e)) = status.await {
        error!("Status endpoint failed: {}", e);
    }

    match result {
        Ok(end) => {
            info!("Session ended: {:?}", end);
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            Err(e.into())
        }
    }
}
