use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use movely_db::DbPool;

pub async fn spawn(bind_address: &str, port: u16, pool: DbPool) -> anyhow::Result<()> {
    let app = Router::new().route("/healthz", get(healthz)).with_state(pool);
    let listener = tokio::net::TcpListener::bind((bind_address, port)).await?;

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, app).await {
            tracing::error!(
                event_name = "system.health.serve_failed",
                error = %error,
                "health endpoint stopped"
            );
        }
    });

    tracing::info!(
        event_name = "system.health.started",
        port,
        "health endpoint listening"
    );
    Ok(())
}

async fn healthz(State(pool): State<DbPool>) -> (StatusCode, Json<serde_json::Value>) {
    match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => (StatusCode::OK, Json(json!({"status": "ok", "database": "up"}))),
        Err(error) => {
            tracing::error!(
                event_name = "system.health.database_down",
                error = %error,
                "health check failed"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "degraded", "database": "down"})),
            )
        }
    }
}
