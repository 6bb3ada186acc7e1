// Re-export chrono for downstream crates that need DateTime types
pub use chrono;

pub mod bots;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod engine;
pub mod errors;

pub use bots::build_engine;
pub use bots::moving::pricing::PricingSettings;
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use dispatch::{CrewLeadView, CrewStop};
pub use domain::job::{job_types, Job, JobStatus, WorkerRole, DEFAULT_MAX_ATTEMPTS};
pub use domain::lead::{
    CargoItem, Estimate, Lead, LeadPayload, LeadStatus, PriceBreakdown, RouteBand,
    RouteClassification, VolumeCategory,
};
pub use domain::media::{media_object_key, MediaAsset, MediaKind};
pub use domain::message::{
    Button, InboundLocation, InboundMedia, OutboundMessage, Provider, ProviderEvent,
};
pub use domain::session::{
    new_lead_id, ExtraService, Extensions, GeoPoint, Language, LeadData, SessionState, Step, Stop,
    TimeWindow, MOVING_BOT_TYPE,
};
pub use domain::tenant::{
    ChannelBinding, CredentialCipher, CredentialMap, CryptoError, TenantConfig, TenantContext,
};
pub use engine::{EngineContext, EngineOutcome, InputEvent, MovingBotEngine};
pub use errors::{ApplicationError, DomainError, InterfaceError};
