use axum::http::{self, HeaderValue, Method};
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use werewolf_server::{app, models::config::GameConfig, state::AppState};

fn init_logger() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "werewolf_server=debug,tower_http=debug,axum=info".into()),
        )
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv_result = dotenv();
    init_logger();
    if let Err(e) = dotenv_result {
        warn!(error = %e, "no .env file loaded");
    }

    let config = GameConfig::from_env();
    let addr = config.bind_addr;
    info!(?config, "configuration loaded");

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:3000".parse::<HeaderValue>()?])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION]);

    let app = app::create_app_with_state(AppState::with_config(config))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &http::Request<_>| {
                tracing::info_span!(
                    "HTTP request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
