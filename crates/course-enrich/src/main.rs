mod enrich;

use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use catalogue_common::chat::{ChatClient, ChatConfig};
use catalogue_common::redis::RedisCache;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("starting course-enrich");

    let data_dir = std::env::var("COURSE_DATA_DIR")
        .map(PathBuf::from)
        .map_err(|_| anyhow::anyhow!("COURSE_DATA_DIR environment variable is required"))?;

    let chat_config = ChatConfig::from_env();
    info!(
        base_url = %chat_config.base_url,
        model = %chat_config.model,
        "chat client configured"
    );
    let chat = ChatClient::new(chat_config)?;

    let stats = enrich::enrich_directory(&data_dir, &chat).await;
    info!(
        files_processed = stats.files_processed,
        files_updated = stats.files_updated,
        courses_seen = stats.courses_seen,
        courses_enriched = stats.courses_enriched,
        errors = stats.errors,
        "enrichment pass complete"
    );

    // The API caches the deduplicated snapshot under this prefix; drop it so
    // the new bullet points are visible immediately.
    if stats.files_updated > 0 {
        let redis = RedisCache::new(std::env::var("REDIS_URL").ok().as_deref());
        if redis.delete_by_prefix("courses:v1:").await {
            info!("api cache invalidated");
        }
    }

    Ok(())
}
