use movely_core::{AppConfig, LoadOptions};
use movely_db::{connect_with_settings, JobRepository, SqlJobRepository};

pub async fn run(options: LoadOptions) -> anyhow::Result<()> {
    let config = AppConfig::load(options)?;
    print!("database connectivity... ");
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await?;
    sqlx_ping(&pool).await?;
    println!("ok");

    print!("job queue... ");
    let jobs = SqlJobRepository::new(pool.clone());
    let counts = jobs.count_by_status().await?;
    if counts.is_empty() {
        println!("empty");
    } else {
        let summary: Vec<String> =
            counts.iter().map(|(status, count)| format!("{status}={count}")).collect();
        println!("{}", summary.join(", "));
    }

    let failed = counts.get("failed").copied().unwrap_or(0);
    if failed > 0 {
        println!("warning: {failed} jobs in terminal failure need operator attention");
    }

    pool.close().await;
    Ok(())
}

async fn sqlx_ping(pool: &movely_db::DbPool) -> anyhow::Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
