use movely_core::{AppConfig, LoadOptions};
use movely_db::{connect_with_settings, migrations};

pub async fn run(options: LoadOptions) -> anyhow::Result<()> {
    let config = AppConfig::load(options)?;
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await?;

    migrations::run_pending(&pool).await?;
    println!("migrations applied: {}", config.database.url);

    pool.close().await;
    Ok(())
}
