use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use pressreel::{
    default_news_sources, AppConfig, ArticlePriorityPolicy, ClientFactory, Database,
    FilterService, ScraperService, SpiderService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = AppConfig::from_env();
    info!("Starting pressreel spider");

    let database = Database::connect(&config.database_url).await?;
    database.migrate().await?;

    let client = Arc::new(ClientFactory::with_fallback(&config, None));
    let mut scraper = ScraperService::new(client.clone());
    if let Some(dir) = &config.snapshot_dir {
        scraper = scraper.with_snapshots(dir);
    }

    let spider = SpiderService::new(
        scraper,
        &database,
        config.queue.clone(),
        Some(FilterService::with_defaults()),
        Some(ArticlePriorityPolicy::default()),
    );

    spider.start().await;
    spider.spawn_monitor(Duration::from_secs(30)).await;

    for source in default_news_sources() {
        let seed = source.seed_url();
        match spider.enqueue_url(&seed, source.priority).await {
            Ok(()) => info!("Seeded {} ({})", source.name, seed),
            Err(e) => warn!("Skipped seed {} ({}): {}", source.name, seed, e),
        }
    }

    info!("Spider running; press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    spider.stop().await;
    client.close().await;

    match spider.stats().await {
        Ok(stats) => info!(
            "Final stats: pending={} processing={} done={} failed={} skipped={}",
            stats.pending, stats.processing, stats.done, stats.failed, stats.skipped
        ),
        Err(e) => warn!("Could not read final stats: {}", e),
    }
    database.close().await;

    Ok(())
}
