use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Twilio,
    Meta,
    Telegram,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twilio => "twilio",
            Self::Meta => "meta",
            Self::Telegram => "telegram",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "twilio" => Some(Self::Twilio),
            "meta" => Some(Self::Meta),
            "telegram" => Some(Self::Telegram),
            _ => None,
        }
    }
}

/// One media attachment as the provider adapter normalizes it. The
/// `source_ref` is provider-specific and only meaningful to that provider's
/// media fetcher (a download URL for Twilio/Telegram, a media id for Meta).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InboundMedia {
    pub content_type: String,
    pub size_bytes: i64,
    pub source_ref: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InboundLocation {
    pub lat: f64,
    pub lng: f64,
}

/// Provider-normalized inbound event, as handed to the ingress service by a
/// webhook adapter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderEvent {
    pub provider: Provider,
    pub provider_account_id: String,
    pub chat_id: String,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<InboundLocation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<InboundMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
}

impl ProviderEvent {
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Button {
    pub payload: String,
    pub label: String,
}

/// Provider-normalized outbound message; the bound adapter renders it for
/// its channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub tenant_id: String,
    pub chat_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media_refs: Vec<String>,
}

impl OutboundMessage {
    pub fn text_only(
        tenant_id: impl Into<String>,
        chat_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            chat_id: chat_id.into(),
            text: text.into(),
            buttons: Vec::new(),
            media_refs: Vec::new(),
        }
    }
}
