use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::lead::{CargoItem, Estimate, RouteClassification, VolumeCategory};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    He,
    En,
    Ru,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::He => "he",
            Self::En => "en",
            Self::Ru => "ru",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "he" => Some(Self::He),
            "en" => Some(Self::En),
            "ru" => Some(Self::Ru),
            _ => None,
        }
    }
}

/// Intake step vocabulary. The conversation only ever moves along the edges
/// returned by [`Step::successors`]; everything else is a bug.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Welcome,
    ConfirmAddresses,
    Cargo,
    Volume,
    PickupCount,
    AddrFrom,
    FloorFrom,
    AddrFrom2,
    FloorFrom2,
    AddrFrom3,
    FloorFrom3,
    AddrTo,
    FloorTo,
    Date,
    SpecificDate,
    TimeSlot,
    ExactTime,
    PhotoMenu,
    PhotoWait,
    Extras,
    Estimate,
    Done,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::ConfirmAddresses => "confirm_addresses",
            Self::Cargo => "cargo",
            Self::Volume => "volume",
            Self::PickupCount => "pickup_count",
            Self::AddrFrom => "addr_from",
            Self::FloorFrom => "floor_from",
            Self::AddrFrom2 => "addr_from_2",
            Self::FloorFrom2 => "floor_from_2",
            Self::AddrFrom3 => "addr_from_3",
            Self::FloorFrom3 => "floor_from_3",
            Self::AddrTo => "addr_to",
            Self::FloorTo => "floor_to",
            Self::Date => "date",
            Self::SpecificDate => "specific_date",
            Self::TimeSlot => "time_slot",
            Self::ExactTime => "exact_time",
            Self::PhotoMenu => "photo_menu",
            Self::PhotoWait => "photo_wait",
            Self::Extras => "extras",
            Self::Estimate => "estimate",
            Self::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|step| step.as_str() == value)
    }

    pub const ALL: [Step; 22] = [
        Self::Welcome,
        Self::ConfirmAddresses,
        Self::Cargo,
        Self::Volume,
        Self::PickupCount,
        Self::AddrFrom,
        Self::FloorFrom,
        Self::AddrFrom2,
        Self::FloorFrom2,
        Self::AddrFrom3,
        Self::FloorFrom3,
        Self::AddrTo,
        Self::FloorTo,
        Self::Date,
        Self::SpecificDate,
        Self::TimeSlot,
        Self::ExactTime,
        Self::PhotoMenu,
        Self::PhotoWait,
        Self::Extras,
        Self::Estimate,
        Self::Done,
    ];

    /// Steps a single engine invocation may land on from `self`.
    ///
    /// Re-entry (validator rejection) is always allowed, and every step can
    /// fall back to `cargo` because the reset intent restarts the intake.
    pub fn successors(&self) -> &'static [Step] {
        match self {
            Self::Welcome => &[Self::Cargo, Self::Volume, Self::ConfirmAddresses, Self::PickupCount],
            Self::ConfirmAddresses => &[Self::PickupCount, Self::Date, Self::TimeSlot],
            Self::Cargo => &[Self::Volume, Self::PickupCount],
            Self::Volume => &[Self::PickupCount],
            Self::PickupCount => &[Self::AddrFrom],
            Self::AddrFrom => &[Self::FloorFrom],
            Self::FloorFrom => &[Self::AddrFrom2, Self::AddrTo],
            Self::AddrFrom2 => &[Self::FloorFrom2],
            Self::FloorFrom2 => &[Self::AddrFrom3, Self::AddrTo],
            Self::AddrFrom3 => &[Self::FloorFrom3],
            Self::FloorFrom3 => &[Self::AddrTo],
            Self::AddrTo => &[Self::FloorTo],
            Self::FloorTo => &[Self::Date, Self::TimeSlot],
            Self::Date => &[Self::SpecificDate, Self::TimeSlot],
            Self::SpecificDate => &[Self::TimeSlot],
            Self::TimeSlot => &[Self::ExactTime, Self::PhotoMenu],
            Self::ExactTime => &[Self::PhotoMenu],
            Self::PhotoMenu => &[Self::PhotoWait, Self::Extras],
            Self::PhotoWait => &[Self::Extras],
            Self::Extras => &[Self::Estimate],
            Self::Estimate => &[Self::Done],
            Self::Done => &[],
        }
    }

    /// Whether a single transition from `self` to `to` is legal.
    pub fn can_transition_to(&self, to: Step) -> bool {
        if *self == to {
            return true;
        }
        // Reset restarts the intake at the cargo question.
        if to == Step::Cargo {
            return true;
        }
        self.successors().contains(&to)
    }

    /// Free-text steps are the only ones where language detection may run.
    pub fn accepts_free_text(&self) -> bool {
        matches!(
            self,
            Self::Welcome
                | Self::Cargo
                | Self::AddrFrom
                | Self::FloorFrom
                | Self::AddrFrom2
                | Self::FloorFrom2
                | Self::AddrFrom3
                | Self::FloorFrom3
                | Self::AddrTo
                | Self::FloorTo
                | Self::SpecificDate
                | Self::Extras
        )
    }

    /// Steps that accept a shared GPS pin instead of a typed address.
    pub fn accepts_location(&self) -> bool {
        matches!(self, Self::AddrFrom | Self::AddrFrom2 | Self::AddrFrom3 | Self::AddrTo)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// One pickup or the destination: the typed (or pinned) address plus the
/// floor/elevator answer parsed out of free text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub address_text: String,
    pub floor_num: i32,
    pub has_elevator: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoPoint>,
}

impl Stop {
    pub fn new(address_text: impl Into<String>) -> Self {
        Self {
            address_text: address_text.into(),
            floor_num: 1,
            has_elevator: true,
            locality_key: None,
            geo: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    Morning,
    Day,
    Evening,
    Exact,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Day => "day",
            Self::Evening => "evening",
            Self::Exact => "exact",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraService {
    Movers,
    Assembly,
    Packing,
}

impl ExtraService {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movers => "movers",
            Self::Assembly => "assembly",
            Self::Packing => "packing",
        }
    }
}

/// Scratch map with typed accessors for the keys the engine is allowed to
/// read. Unknown keys pass through serialization untouched but are never
/// interpreted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extensions(BTreeMap<String, Value>);

impl Extensions {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    fn get_bool(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    pub fn lead_number(&self) -> Option<i64> {
        self.0.get("lead_number").and_then(Value::as_i64)
    }

    pub fn set_lead_number(&mut self, seq: i64) {
        self.set("lead_number", Value::from(seq));
    }

    pub fn estimate_display_disabled(&self) -> bool {
        self.get_bool("estimate_display_disabled")
    }

    pub fn set_estimate_display_disabled(&mut self) {
        self.set("estimate_display_disabled", Value::Bool(true));
    }

    pub fn sender_name(&self) -> Option<&str> {
        self.get_str("sender_name")
    }

    pub fn set_sender_name(&mut self, name: &str) {
        self.set("sender_name", Value::from(name));
    }

    pub fn source(&self) -> Option<&str> {
        self.get_str("source")
    }

    pub fn set_source(&mut self, source: &str) {
        self.set("source", Value::from(source));
    }

    pub fn volume_from_rooms(&self) -> bool {
        self.get_bool("volume_from_rooms")
    }

    pub fn set_volume_from_rooms(&mut self) {
        self.set("volume_from_rooms", Value::Bool(true));
    }

    pub fn landing_date_parsed(&self) -> bool {
        self.get_bool("landing_date_parsed")
    }

    pub fn set_landing_date_parsed(&mut self, parsed: bool) {
        self.set("landing_date_parsed", Value::Bool(parsed));
    }

    pub fn landing_date_hint(&self) -> Option<&str> {
        self.get_str("landing_date_hint")
    }

    pub fn set_landing_date_hint(&mut self, hint: &str) {
        self.set("landing_date_hint", Value::from(hint));
    }

    pub fn landing_move_type(&self) -> Option<&str> {
        self.get_str("landing_move_type")
    }

    pub fn set_landing_move_type(&mut self, move_type: &str) {
        self.set("landing_move_type", Value::from(move_type));
    }

    /// Address typed at an `addr_from_k` step, held until the matching floor
    /// answer commits the pickup.
    pub fn pending_address(&self) -> Option<Stop> {
        self.0.get("pending_address").and_then(|raw| serde_json::from_value(raw.clone()).ok())
    }

    pub fn set_pending_address(&mut self, stop: &Stop) {
        if let Ok(value) = serde_json::to_value(stop) {
            self.set("pending_address", value);
        }
    }

    pub fn take_pending_address(&mut self) -> Option<Stop> {
        self.0.remove("pending_address").and_then(|raw| serde_json::from_value(raw).ok())
    }
}

/// Everything collected during the intake. Frozen into the lead payload on
/// finalization.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cargo_raw: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<CargoItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_category: Option<VolumeCategory>,
    #[serde(default = "default_pickup_count")]
    pub pickup_count: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pickups: Vec<Stop>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<Stop>,
    /// ISO `YYYY-MM-DD` once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_time: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<ExtraService>,
    /// Media asset ids attached during `photo_wait`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<String>,
    #[serde(default)]
    pub photo_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details_free: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<Estimate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_classification: Option<RouteClassification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translations: Option<BTreeMap<String, BTreeMap<String, String>>>,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub extensions: Extensions,
}

fn default_pickup_count() -> u8 {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub tenant_id: String,
    pub chat_id: String,
    /// Opaque 12-hex identifier minted at session creation.
    pub lead_id: String,
    pub bot_type: String,
    pub step: Step,
    pub language: Language,
    pub data: LeadData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const MOVING_BOT_TYPE: &str = "moving_bot_v1";

impl SessionState {
    pub fn new(
        tenant_id: impl Into<String>,
        chat_id: impl Into<String>,
        language: Language,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            chat_id: chat_id.into(),
            lead_id: new_lead_id(),
            bot_type: MOVING_BOT_TYPE.to_string(),
            step: Step::Welcome,
            language,
            data: LeadData { pickup_count: 1, ..LeadData::default() },
            created_at: now,
            updated_at: now,
        }
    }

    /// Fresh session for the same chat. Only identity and language survive.
    pub fn reset(&self, now: DateTime<Utc>) -> Self {
        Self::new(self.tenant_id.clone(), self.chat_id.clone(), self.language, now)
    }
}

/// Lead ids are 12 hex characters: opaque, short enough for operators to
/// read aloud, unique enough per tenant.
pub fn new_lead_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..12].to_string()
}
