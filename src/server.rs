use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
    routing::get_service,
};
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::agent::{AgentSettings, GeminiClient};
use crate::api;
use crate::config::AppConfig;
use crate::portfolio::seed_portfolio_files;
use crate::session::{DEFAULT_SESSION_TIMEOUT, SessionStore};

/// How often the background task sweeps for expired sessions.
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Build the application router for the given state.
///
/// Split out of [`start_server`] so integration tests can drive the router
/// directly.
pub fn app(state: AppState) -> Router {
    let timeout_duration = if state.config.resilience.timeout_disabled {
        // Effectively disabled without changing the router type.
        Duration::from_secs(365 * 24 * 60 * 60)
    } else {
        Duration::from_secs(120)
    };

    Router::new()
        .route("/", get_service(ServeFile::new("static/index.html")))
        .nest("/api", api::router())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB limit
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| {
                let duration = timeout_duration;
                async move {
                    match tokio::time::timeout(duration, next.run(req)).await {
                        Ok(res) => res,
                        Err(_) => {
                            (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response()
                        }
                    }
                }
            },
        ))
        .with_state(state)
}

/// Spawn a background task that periodically evicts idle sessions.
///
/// Without this the session map grows for the life of the process; the
/// task sweeps it every `interval` and removes sessions inactive longer
/// than `timeout`.
pub fn spawn_session_cleanup(
    sessions: SessionStore,
    interval: Duration,
    timeout: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = sessions.cleanup_expired_with_timeout(timeout);
            if removed > 0 {
                info!(
                    name: "session.cleanup",
                    removed,
                    remaining = sessions.len(),
                    "Expired sessions removed"
                );
            }
        }
    })
}

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>, settings: AgentSettings) -> anyhow::Result<()> {
    info!(
        name: "agent.config.loaded",
        base_url = %settings.base_url,
        model = %settings.model,
        "Agent configuration loaded"
    );

    // Local storage setup
    tokio::fs::create_dir_all(&config.storage.upload_dir).await?;
    seed_portfolio_files(&config.storage.portfolio_dir)?;

    let agent = Arc::new(GeminiClient::new(settings));
    let sessions = SessionStore::new();
    let _cleanup = spawn_session_cleanup(
        sessions.clone(),
        SESSION_CLEANUP_INTERVAL,
        DEFAULT_SESSION_TIMEOUT,
    );

    let state = AppState {
        agent,
        sessions,
        config: config.clone(),
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app(state).into_make_service()).await?;
    Ok(())
}
