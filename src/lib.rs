pub mod auth;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod scheduler;
pub mod settings;
pub mod store;
pub mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use handlers::{healthz_live, healthz_ready, list_classes, register_class, remove_classes, root};
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::dispatch::DiscordSink;
use crate::openapi::ApiDoc;
use crate::scheduler::{ReminderScheduler, SystemClock};
use crate::settings::Settings;
use crate::store::ScheduleStore;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub store: Arc<ScheduleStore>,
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    let env_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .without_time()
        .init();

    if settings.discord_bot_token.is_empty() {
        return Err("APP_DISCORD_BOT_TOKEN is not set".into());
    }

    // A malformed schedule file is fatal: refusing to start beats silently
    // dropping registrations.
    let store = Arc::new(ScheduleStore::load(settings.data_file.clone()).await?);

    let scheduler = ReminderScheduler::new(
        store.clone(),
        SystemClock::new(settings.timezone),
        DiscordSink::new(
            settings.discord_api_base.clone(),
            settings.discord_bot_token.clone(),
        ),
    )
    .spawn();

    let state = AppState {
        settings: settings.clone(),
        store,
    };
    let app = build_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.port));
    info!("Starting Class Reminder API on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    let mut router = Router::new()
        .route("/", get(root))
        .route("/healthz/live", get(healthz_live))
        .route("/healthz/ready", get(healthz_ready))
        .route(
            "/classes",
            get(list_classes).post(register_class).delete(remove_classes),
        )
        .with_state(state.clone());

    if state.settings.enable_swagger {
        let openapi = ApiDoc::openapi();
        let swagger = SwaggerUi::new("/docs").url("/openapi.json", openapi);
        router = router.merge(swagger);
    }

    router.layer(trace_layer)
}
