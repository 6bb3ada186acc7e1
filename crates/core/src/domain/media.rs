use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            "document" => Some(Self::Document),
            _ => None,
        }
    }

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let lowered = content_type.to_ascii_lowercase();
        if lowered.starts_with("image/") {
            Some(Self::Image)
        } else if lowered.starts_with("video/") {
            Some(Self::Video)
        } else if lowered.starts_with("audio/") {
            Some(Self::Audio)
        } else if lowered.starts_with("application/") {
            Some(Self::Document)
        } else {
            None
        }
    }

    pub fn extension(&self, content_type: &str) -> &'static str {
        match content_type.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "video/mp4" => "mp4",
            "video/3gpp" => "3gp",
            "audio/ogg" => "ogg",
            "audio/mpeg" => "mp3",
            "application/pdf" => "pdf",
            _ => match self {
                Self::Image => "jpg",
                Self::Video => "mp4",
                Self::Audio => "ogg",
                Self::Document => "bin",
            },
        }
    }
}

/// Stored media object. Keys are UUID-based only — no public URLs are ever
/// persisted; delivery links are signed on demand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: String,
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
    pub chat_id: String,
    pub provider: String,
    pub kind: MediaKind,
    pub content_type: String,
    pub size_bytes: i64,
    pub s3_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Object storage key layout: `media/{tenant}/{lead}/{uuid}.{ext}`.
pub fn media_object_key(
    tenant_id: &str,
    lead_id: Option<&str>,
    asset_id: &str,
    extension: &str,
) -> String {
    format!("media/{}/{}/{}.{}", tenant_id, lead_id.unwrap_or("unassigned"), asset_id, extension)
}
