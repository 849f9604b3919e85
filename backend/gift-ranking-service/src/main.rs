use anyhow::{bail, Context};
use gift_ranking_service::{
    config::CacheBackend,
    models::RecommendationRequest,
    services::{MokaPreferenceCache, PreferenceCache, RedisPreferenceCache},
    store::{CatalogFixture, CatalogStore, InteractionStore, PgCatalogStore, PgInteractionStore},
    Config, RecommendationEngine,
};
use sqlx::postgres::PgPoolOptions;
use std::io::Read;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load config")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.service.log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    info!("Starting {}", config.service.service_name);

    let fixture = parse_fixture_arg(std::env::args().skip(1))?;

    let (catalog, interactions): (Arc<dyn CatalogStore>, Arc<dyn InteractionStore>) =
        match fixture {
            Some(path) => {
                let (catalog, interactions) = CatalogFixture::from_path(&path)
                    .with_context(|| format!("Failed to load fixture {}", path))?
                    .into_stores();
                info!(path = %path, products = catalog.len(), "Using in-memory fixture catalog");
                let catalog: Arc<dyn CatalogStore> = Arc::new(catalog);
                let interactions: Arc<dyn InteractionStore> = Arc::new(interactions);
                (catalog, interactions)
            }
            None => {
                let pool = PgPoolOptions::new()
                    .max_connections(config.database.database_max_connections)
                    .acquire_timeout(config.timeouts.candidate_query())
                    .connect(&config.database.database_url)
                    .await
                    .context("Failed to connect to Postgres")?;
                let catalog: Arc<dyn CatalogStore> = Arc::new(PgCatalogStore::new(pool.clone()));
                let interactions: Arc<dyn InteractionStore> =
                    Arc::new(PgInteractionStore::new(pool));
                (catalog, interactions)
            }
        };

    let cache: Arc<dyn PreferenceCache> = match config.cache.preference_cache_backend {
        CacheBackend::Memory => Arc::new(MokaPreferenceCache::new(
            config.cache.preference_cache_capacity,
            config.cache.ttl(),
        )),
        CacheBackend::Redis => {
            let client = redis::Client::open(config.redis.redis_url.clone())
                .context("Failed to create Redis client")?;
            Arc::new(
                RedisPreferenceCache::connect(client, config.cache.ttl())
                    .await
                    .context("Failed to connect to Redis")?,
            )
        }
    };

    let engine = RecommendationEngine::new(config.engine.clone(), catalog, interactions, cache)?;

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read request from stdin")?;
    let request: RecommendationRequest =
        serde_json::from_str(&input).context("Invalid recommendation request JSON")?;

    let page = engine.get_recommendations(request).await?;
    println!("{}", serde_json::to_string_pretty(&page)?);

    Ok(())
}

fn parse_fixture_arg(mut args: impl Iterator<Item = String>) -> anyhow::Result<Option<String>> {
    let mut fixture = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--fixture" => match args.next() {
                Some(path) => fixture = Some(path),
                None => bail!("--fixture requires a path"),
            },
            other => bail!("Unknown argument: {}", other),
        }
    }
    Ok(fixture)
}
