// region:    --- Imports
use crate::advisor::BidAdvisor;
use crate::database::DatabaseManager;
use crate::message_broker::{KafkaManager, EVENTS_TOPIC};
use crate::scheduler::ListingSweeper;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Modules
mod account;
mod advisor;
mod bidding;
mod context;
mod database;
mod error;
mod events;
mod handlers;
mod listing;
mod message_broker;
mod moderation;
mod query;
mod reputation;
mod scheduler;
mod settlement;
mod state;

// endregion: --- Modules

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let db_manager = Arc::new(DatabaseManager::new().await);

    if let Err(e) = db_manager.initialize_database().await {
        error!("{:<12} --> database initialization failed: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> database initialized", "Main");

    let kafka_manager = Arc::new(KafkaManager::new());
    kafka_manager.create_topic(EVENTS_TOPIC, 5, 1).await?;
    info!("{:<12} --> Kafka initialized", "Main");

    // Converges ACTIVE listings past expiry to ENDED
    let sweeper = ListingSweeper::new(db_manager.get_pool());
    sweeper.start().await;

    let state = AppState {
        db: Arc::clone(&db_manager),
        producer: kafka_manager.get_producer(),
        advisor: Arc::new(BidAdvisor::from_env()),
    };

    // cors for the test page
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes_all = Router::new()
        .route(
            "/listings",
            post(handlers::create_listing).get(handlers::list_listings),
        )
        .route("/listings/:id", get(handlers::get_listing))
        .route("/listings/:id/bids", get(handlers::get_listing_bids))
        .route("/listings/:id/highest-bid", get(handlers::get_highest_bid))
        .route(
            "/listings/:id/comments",
            post(handlers::add_comment).get(handlers::get_listing_comments),
        )
        .route("/listings/:id/watch", post(handlers::toggle_watch))
        .route("/listings/:id/advice", post(handlers::bid_advice))
        .route("/bid", post(handlers::place_bid))
        .route("/checkout", post(handlers::checkout))
        .route("/orders", get(handlers::my_orders))
        .route("/bids", get(handlers::my_bids))
        .route("/watchlist", get(handlers::my_watchlist))
        .route("/me", get(handlers::me))
        .route("/me/reload", post(handlers::reload_balance))
        .route("/me/reactivate", post(handlers::reactivate))
        .route("/reviews", post(handlers::record_review))
        .route(
            "/issues",
            post(handlers::report_issue).get(handlers::list_issues),
        )
        .route("/issues/:id", get(handlers::get_issue))
        .route("/issues/:id/responses", post(handlers::respond_issue))
        .route("/issues/:id/resolve", post(handlers::resolve_issue))
        .route("/issues/:id/refund", post(handlers::refund_issue))
        .route(
            "/applications",
            post(handlers::apply).get(handlers::list_applications),
        )
        .route("/applications/:id", get(handlers::get_application))
        .route(
            "/applications/:id/review",
            post(handlers::take_up_application),
        )
        .route(
            "/applications/:id/resolve",
            post(handlers::resolve_application),
        )
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 20))
        .with_state(state);

    let addr = std::env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
