use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeCategory {
    Small,
    Medium,
    Large,
    Xl,
}

impl VolumeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Xl => "xl",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            "large" => Some(Self::Large),
            "xl" => Some(Self::Xl),
            _ => None,
        }
    }
}

/// One recognised cargo item with its catalog price range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CargoItem {
    pub key: String,
    pub qty: u32,
    pub price_min: i64,
    pub price_max: i64,
    #[serde(default)]
    pub heavy: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteBand {
    SameCity,
    SameMetro,
    InterRegionShort,
    InterRegionLong,
    CrossCountry,
}

impl RouteBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SameCity => "same_city",
            Self::SameMetro => "same_metro",
            Self::InterRegionShort => "inter_region_short",
            Self::InterRegionLong => "inter_region_long",
            Self::CrossCountry => "cross_country",
        }
    }

    pub fn is_inter_region(&self) -> bool {
        matches!(self, Self::InterRegionShort | Self::InterRegionLong | Self::CrossCountry)
    }
}

/// Locality display names per language, taken from the locality table.
pub type LocalityNames = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteClassification {
    pub band: RouteBand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_names: Option<LocalityNames>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_names: Option<LocalityNames>,
}

/// One line of the operator-side price breakdown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub label: String,
    pub amount: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub entries: Vec<BreakdownEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_band: Option<RouteBand>,
    pub complexity_score: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub complexity_triggers: Vec<String>,
    pub complexity_applied: bool,
    pub minimum_applied: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub min: i64,
    pub max: i64,
    pub currency: String,
    pub breakdown: PriceBreakdown,
    #[serde(default)]
    pub suppressed: bool,
}

/// The frozen snapshot persisted as the lead's `payload` at finalization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeadPayload {
    pub lead_number: i64,
    pub language: crate::domain::session::Language,
    pub data: crate::domain::session::LeadData,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    InProgress,
    Done,
    Rejected,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(Self::New),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Persisted, finalized intake record. `lead_seq` is assigned exactly once
/// at insert, monotonically increasing across all tenants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub tenant_id: String,
    pub lead_id: String,
    pub chat_id: String,
    pub lead_seq: i64,
    pub status: LeadStatus,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}
