mod cache;
mod config;
mod error;
mod filter;
mod model;
mod prompt;
mod rank;
mod routes;
mod store;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use catalogue_common::chat::{ChatClient, ChatConfig};
use catalogue_common::redis::RedisCache;

use cache::CourseCache;
use config::Config;
use routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("starting course-api");

    let config = Config::from_env()?;
    info!(
        data_dir = %config.data_dir.display(),
        bind_addr = %config.bind_addr,
        redis = config.redis_url.is_some(),
        "configuration loaded"
    );

    let redis = RedisCache::new(config.redis_url.as_deref());
    if redis.is_available().await {
        info!("redis connected");
    } else {
        info!("redis unavailable, reloading course data per request");
    }
    let cache = CourseCache::new(redis, config.cache_ttl_secs);

    let chat_config = ChatConfig::from_env();
    info!(
        base_url = %chat_config.base_url,
        model = %chat_config.model,
        timeout_ms = chat_config.timeout.as_millis(),
        "chat client configured"
    );
    let chat = ChatClient::new(chat_config)?;

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState { config, chat, cache });

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/courses", get(routes::api_courses))
        .route("/api/course/{code}", get(routes::api_course_detail))
        .route("/api/colleges", get(routes::api_colleges))
        .route("/api/schools", get(routes::api_schools))
        .route("/api/subjects", get(routes::api_subjects))
        .route("/api/chatbot", post(routes::api_chatbot))
        .route("/api/generateBullets", post(routes::api_generate_bullets))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "course-api listening");
    axum::serve(listener, app).await?;

    Ok(())
}
