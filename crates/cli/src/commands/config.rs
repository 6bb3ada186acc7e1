use movely_core::{AppConfig, LoadOptions};

pub fn run(options: LoadOptions) -> anyhow::Result<()> {
    let config = AppConfig::load(options)?;

    // Secrets stay out: only operational knobs are printed.
    let rendered = serde_json::json!({
        "database": {
            "url": config.database.url,
            "max_connections": config.database.max_connections,
        },
        "server": {
            "bind_address": config.server.bind_address,
            "health_check_port": config.server.health_check_port,
            "role": format!("{:?}", config.server.role).to_lowercase(),
        },
        "worker": {
            "role": config.worker.role.as_str(),
            "poll_interval_ms": config.worker.poll_interval_ms,
            "lease_timeout_secs": config.worker.lease_timeout_secs,
        },
        "operator": {
            "lead_translation_enabled": config.operator.lead_translation_enabled,
            "lead_target_lang": config.operator.lead_target_lang.as_str(),
        },
        "dispatch": {
            "crew_fallback_enabled": config.dispatch.crew_fallback_enabled,
            "crew_fallback_delay_secs": config.dispatch.crew_fallback_delay_secs,
        },
        "estimate": { "display_enabled": config.estimate.display_enabled },
        "media": {
            "ttl_days": config.media.ttl_days,
            "max_inline_media_count": config.media.max_inline_media_count,
        },
        "session": {
            "ttl_seconds": config.session.ttl_seconds,
            "stale_hint_seconds": config.session.stale_hint_seconds,
        },
        "enabled_bots": config.enabled_bots,
    });
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}
