use axum::http::{HeaderValue, Method};
use axum::{
    Router,
    routing::{get, post, put},
};
use lonetown::db::PgStore;
use lonetown::services::TracingEventSink;
use lonetown::utils::SystemClock;
use lonetown::{Config, MatchEngine, get_db_pool, handlers, utils};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();

    let config = Config::from_env()?;
    let db_config = lonetown::db::DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;

    // Run migrations
    lonetown::db::migrations::run_migrations(&pool).await?;

    let engine = Arc::new(MatchEngine::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(TracingEventSink),
        Arc::new(SystemClock),
    ));

    let port = config.port;
    let app = create_router(engine, config);

    let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Server running on port {}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router(engine: Arc<MatchEngine>, config: Config) -> Router {
    let cors_layer = create_cors_layer(&config);
    let app_state = handlers::AppState { engine };

    Router::new()
        .route("/health", get(health_check))
        // Matchmaking and lifecycle
        .route("/api/matches/daily", post(handlers::daily_match))
        .route("/api/matches/current", get(handlers::current_match))
        .route("/api/matches/history", get(handlers::match_history))
        .route("/api/matches/{id}/pin", put(handlers::pin_match))
        .route("/api/matches/{id}/unpin", put(handlers::unpin_match))
        .route(
            "/api/matches/{id}/feedback",
            post(handlers::submit_feedback).get(handlers::match_feedback),
        )
        // Engagement monitor
        .route("/api/matches/{id}/messages", post(handlers::message_sent))
        .route(
            "/api/matches/{id}/video-status",
            get(handlers::video_call_status),
        )
        .layer(cors_layer)
        .with_state(app_state)
}

fn create_cors_layer(_config: &Config) -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    // Check if ALLOWED_ORIGINS environment variable is set for multiple domains
    if let Ok(cors_origins) = std::env::var("ALLOWED_ORIGINS") {
        let origins: Vec<HeaderValue> = cors_origins
            .split(',')
            .filter_map(|origin| {
                let trimmed = origin.trim();
                if !trimmed.is_empty() {
                    trimmed.parse().ok()
                } else {
                    None
                }
            })
            .collect();

        if !origins.is_empty() {
            cors = cors.allow_origin(origins);
        } else {
            // Fallback to permissive if parsing fails
            cors = cors.allow_origin(Any);
        }
    } else {
        // Default to permissive for development
        cors = cors.allow_origin(Any);
    }

    cors
}

async fn health_check() -> &'static str {
    "OK"
}
