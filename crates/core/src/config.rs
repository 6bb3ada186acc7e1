use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::job::WorkerRole;
use crate::domain::session::Language;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub worker: WorkerConfig,
    pub operator: OperatorConfig,
    pub dispatch: DispatchConfig,
    pub estimate: EstimateConfig,
    pub media: MediaConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
    /// Bot ids allowed to register at startup; only listed bots load.
    pub enabled_bots: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
    /// `web` runs only the ingress surface, `worker`/`poller` only the job
    /// loops, `all` runs both in one process.
    pub role: ProcessRole,
}

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub role: WorkerRole,
    pub poll_interval_ms: u64,
    pub lease_timeout_secs: i64,
    pub base_backoff_secs: i64,
    pub max_backoff_secs: i64,
    pub completed_retention_days: i64,
    pub failed_retention_days: i64,
}

#[derive(Clone, Debug)]
pub struct OperatorConfig {
    pub lead_translation_enabled: bool,
    pub lead_target_lang: Language,
}

#[derive(Clone, Debug)]
pub struct DispatchConfig {
    pub crew_fallback_enabled: bool,
    /// Delay between the operator notification and the crew fallback, so
    /// the full lead always arrives first.
    pub crew_fallback_delay_secs: i64,
}

#[derive(Clone, Debug)]
pub struct EstimateConfig {
    /// When false the user-facing range is suppressed ("to be confirmed")
    /// but the breakdown is still persisted for the operator.
    pub display_enabled: bool,
}

#[derive(Clone, Debug)]
pub struct MediaConfig {
    pub ttl_days: i64,
    /// Above this count, operator delivery switches from inline attachments
    /// to signed links.
    pub max_inline_media_count: usize,
    pub max_size_bytes: i64,
    pub signing_secret: SecretString,
    pub delivery_base_url: String,
    pub link_ttl_secs: i64,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub ttl_seconds: i64,
    pub stale_hint_seconds: i64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessRole {
    Web,
    Worker,
    All,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub worker_role: Option<WorkerRole>,
    pub process_role: Option<ProcessRole>,
    pub estimate_display_enabled: Option<bool>,
    pub crew_fallback_enabled: Option<bool>,
    pub media_signing_secret: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://movely.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
                role: ProcessRole::All,
            },
            worker: WorkerConfig {
                role: WorkerRole::All,
                poll_interval_ms: 250,
                lease_timeout_secs: 300,
                base_backoff_secs: 60,
                max_backoff_secs: 3600,
                completed_retention_days: 7,
                failed_retention_days: 30,
            },
            operator: OperatorConfig {
                lead_translation_enabled: false,
                lead_target_lang: Language::Ru,
            },
            dispatch: DispatchConfig {
                crew_fallback_enabled: true,
                crew_fallback_delay_secs: 2,
            },
            estimate: EstimateConfig { display_enabled: true },
            media: MediaConfig {
                ttl_days: 30,
                max_inline_media_count: 3,
                max_size_bytes: 25 * 1024 * 1024,
                signing_secret: String::new().into(),
                delivery_base_url: "http://127.0.0.1:8080".to_string(),
                link_ttl_secs: 7 * 24 * 3600,
            },
            session: SessionConfig { ttl_seconds: 72 * 3600, stale_hint_seconds: 6 * 3600 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            enabled_bots: vec![crate::domain::session::MOVING_BOT_TYPE.to_string()],
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("movely.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.health_check_port {
                self.server.health_check_port = port;
            }
            if let Some(secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = secs;
            }
            if let Some(role) = server.role {
                self.server.role = role;
            }
        }

        if let Some(worker) = patch.worker {
            if let Some(role) = worker.role {
                self.worker.role = role;
            }
            if let Some(ms) = worker.poll_interval_ms {
                self.worker.poll_interval_ms = ms;
            }
            if let Some(secs) = worker.lease_timeout_secs {
                self.worker.lease_timeout_secs = secs;
            }
            if let Some(secs) = worker.base_backoff_secs {
                self.worker.base_backoff_secs = secs;
            }
            if let Some(secs) = worker.max_backoff_secs {
                self.worker.max_backoff_secs = secs;
            }
            if let Some(days) = worker.completed_retention_days {
                self.worker.completed_retention_days = days;
            }
            if let Some(days) = worker.failed_retention_days {
                self.worker.failed_retention_days = days;
            }
        }

        if let Some(operator) = patch.operator {
            if let Some(enabled) = operator.lead_translation_enabled {
                self.operator.lead_translation_enabled = enabled;
            }
            if let Some(lang) = operator.lead_target_lang {
                self.operator.lead_target_lang = lang;
            }
        }

        if let Some(dispatch) = patch.dispatch {
            if let Some(enabled) = dispatch.crew_fallback_enabled {
                self.dispatch.crew_fallback_enabled = enabled;
            }
            if let Some(secs) = dispatch.crew_fallback_delay_secs {
                self.dispatch.crew_fallback_delay_secs = secs;
            }
        }

        if let Some(estimate) = patch.estimate {
            if let Some(enabled) = estimate.display_enabled {
                self.estimate.display_enabled = enabled;
            }
        }

        if let Some(media) = patch.media {
            if let Some(days) = media.ttl_days {
                self.media.ttl_days = days;
            }
            if let Some(count) = media.max_inline_media_count {
                self.media.max_inline_media_count = count;
            }
            if let Some(bytes) = media.max_size_bytes {
                self.media.max_size_bytes = bytes;
            }
            if let Some(signing_secret_value) = media.signing_secret {
                self.media.signing_secret = signing_secret_value.into();
            }
            if let Some(url) = media.delivery_base_url {
                self.media.delivery_base_url = url;
            }
            if let Some(secs) = media.link_ttl_secs {
                self.media.link_ttl_secs = secs;
            }
        }

        if let Some(session) = patch.session {
            if let Some(secs) = session.ttl_seconds {
                self.session.ttl_seconds = secs;
            }
            if let Some(secs) = session.stale_hint_seconds {
                self.session.stale_hint_seconds = secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(enabled_bots) = patch.enabled_bots {
            self.enabled_bots = enabled_bots;
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("MOVELY_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("MOVELY_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("MOVELY_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("MOVELY_WORKER_ROLE") {
            self.worker.role = WorkerRole::parse(&value).ok_or(ConfigError::InvalidEnvOverride {
                key: "MOVELY_WORKER_ROLE".to_string(),
                value,
            })?;
        }
        if let Some(value) = read_env("MOVELY_SERVER_ROLE") {
            self.server.role = match value.as_str() {
                "web" => ProcessRole::Web,
                "worker" | "poller" => ProcessRole::Worker,
                "all" => ProcessRole::All,
                _ => {
                    return Err(ConfigError::InvalidEnvOverride {
                        key: "MOVELY_SERVER_ROLE".to_string(),
                        value,
                    })
                }
            };
        }
        if let Some(value) = read_env("MOVELY_OPERATOR_LEAD_TARGET_LANG") {
            self.operator.lead_target_lang =
                Language::parse(&value).ok_or(ConfigError::InvalidEnvOverride {
                    key: "MOVELY_OPERATOR_LEAD_TARGET_LANG".to_string(),
                    value,
                })?;
        }
        if let Some(value) = read_env("MOVELY_OPERATOR_LEAD_TRANSLATION_ENABLED") {
            self.operator.lead_translation_enabled =
                parse_bool("MOVELY_OPERATOR_LEAD_TRANSLATION_ENABLED", &value)?;
        }
        if let Some(value) = read_env("MOVELY_DISPATCH_CREW_FALLBACK_ENABLED") {
            self.dispatch.crew_fallback_enabled =
                parse_bool("MOVELY_DISPATCH_CREW_FALLBACK_ENABLED", &value)?;
        }
        if let Some(value) = read_env("MOVELY_ESTIMATE_DISPLAY_ENABLED") {
            self.estimate.display_enabled = parse_bool("MOVELY_ESTIMATE_DISPLAY_ENABLED", &value)?;
        }
        if let Some(value) = read_env("MOVELY_MEDIA_TTL_DAYS") {
            self.media.ttl_days = parse_i64("MOVELY_MEDIA_TTL_DAYS", &value)?;
        }
        if let Some(value) = read_env("MOVELY_MEDIA_SIGNING_SECRET") {
            self.media.signing_secret = value.into();
        }
        if let Some(value) = read_env("MOVELY_LOG_LEVEL") {
            self.logging.level = value;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(role) = overrides.worker_role {
            self.worker.role = role;
        }
        if let Some(role) = overrides.process_role {
            self.server.role = role;
        }
        if let Some(enabled) = overrides.estimate_display_enabled {
            self.estimate.display_enabled = enabled;
        }
        if let Some(enabled) = overrides.crew_fallback_enabled {
            self.dispatch.crew_fallback_enabled = enabled;
        }
        if let Some(secret) = overrides.media_signing_secret {
            self.media.signing_secret = secret.into();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.database.url.trim();
        let sqlite_url =
            url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
        if !sqlite_url {
            return Err(ConfigError::Validation(
                "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                    .to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be greater than zero".to_string(),
            ));
        }

        // Poll interval clamps to the 50..=500ms window the queue is tuned for.
        if !(50..=500).contains(&self.worker.poll_interval_ms) {
            return Err(ConfigError::Validation(
                "worker.poll_interval_ms must be in range 50..=500".to_string(),
            ));
        }
        if self.worker.lease_timeout_secs < 300 {
            return Err(ConfigError::Validation(
                "worker.lease_timeout_secs must be at least 300".to_string(),
            ));
        }

        if self.dispatch.crew_fallback_delay_secs < 0 {
            return Err(ConfigError::Validation(
                "dispatch.crew_fallback_delay_secs must not be negative".to_string(),
            ));
        }

        if self.media.ttl_days <= 0 {
            return Err(ConfigError::Validation(
                "media.ttl_days must be greater than zero".to_string(),
            ));
        }
        if self.media.signing_secret.expose_secret().is_empty() {
            return Err(ConfigError::Validation(
                "media.signing_secret is required (set MOVELY_MEDIA_SIGNING_SECRET)".to_string(),
            ));
        }

        if self.session.ttl_seconds <= self.session.stale_hint_seconds {
            return Err(ConfigError::Validation(
                "session.ttl_seconds must exceed session.stale_hint_seconds".to_string(),
            ));
        }

        let level = self.logging.level.trim().to_ascii_lowercase();
        if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
            return Err(ConfigError::Validation(
                "logging.level must be one of trace|debug|info|warn|error".to_string(),
            ));
        }

        if self.enabled_bots.is_empty() {
            return Err(ConfigError::Validation(
                "enabled_bots must list at least one bot id".to_string(),
            ));
        }

        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("movely.toml"), PathBuf::from("config/movely.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    worker: Option<WorkerPatch>,
    operator: Option<OperatorPatch>,
    dispatch: Option<DispatchPatch>,
    estimate: Option<EstimatePatch>,
    media: Option<MediaPatch>,
    session: Option<SessionPatch>,
    logging: Option<LoggingPatch>,
    enabled_bots: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    role: Option<ProcessRole>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkerPatch {
    role: Option<WorkerRole>,
    poll_interval_ms: Option<u64>,
    lease_timeout_secs: Option<i64>,
    base_backoff_secs: Option<i64>,
    max_backoff_secs: Option<i64>,
    completed_retention_days: Option<i64>,
    failed_retention_days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct OperatorPatch {
    lead_translation_enabled: Option<bool>,
    lead_target_lang: Option<Language>,
}

#[derive(Debug, Default, Deserialize)]
struct DispatchPatch {
    crew_fallback_enabled: Option<bool>,
    crew_fallback_delay_secs: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct EstimatePatch {
    display_enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct MediaPatch {
    ttl_days: Option<i64>,
    max_inline_media_count: Option<usize>,
    max_size_bytes: Option<i64>,
    signing_secret: Option<String>,
    delivery_base_url: Option<String>,
    link_ttl_secs: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    ttl_seconds: Option<i64>,
    stale_hint_seconds: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
