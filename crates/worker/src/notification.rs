//! Operator notification formatting.
//!
//! Unlike the crew view, the operator message carries the full lead: raw
//! cargo text, complete addresses, contact identifiers, and the estimate
//! even when it was hidden from the user. Free-text fields honor the
//! lead's `translations` map when a pass for the target language exists.

use chrono::Utc;
use movely_core::{Language, LeadPayload, MediaAsset, OutboundMessage, TimeWindow};

use crate::signing::MediaUrlSigner;

#[derive(Clone, Debug)]
pub struct NotificationSettings {
    pub target_lang: Language,
    pub translation_enabled: bool,
    pub max_inline_media_count: usize,
    pub link_ttl_secs: i64,
}

struct OperatorLabels {
    new_lead: &'static str,
    contact: &'static str,
    name: &'static str,
    cargo: &'static str,
    items: &'static str,
    route: &'static str,
    pickup: &'static str,
    destination: &'static str,
    floor: &'static str,
    elevator_yes: &'static str,
    elevator_no: &'static str,
    date: &'static str,
    volume: &'static str,
    extras: &'static str,
    details: &'static str,
    estimate: &'static str,
    estimate_pending: &'static str,
    estimate_hidden: &'static str,
    photos: &'static str,
    source: &'static str,
}

impl OperatorLabels {
    fn for_lang(lang: Language) -> Self {
        match lang {
            Language::Ru => Self {
                new_lead: "Новая заявка",
                contact: "Контакт",
                name: "Имя",
                cargo: "Груз",
                items: "Распознано",
                route: "Маршрут",
                pickup: "Забор",
                destination: "Доставка",
                floor: "этаж",
                elevator_yes: "лифт",
                elevator_no: "без лифта",
                date: "Дата",
                volume: "Объём",
                extras: "Услуги",
                details: "Детали",
                estimate: "Оценка",
                estimate_pending: "требует уточнения",
                estimate_hidden: "(скрыта от клиента)",
                photos: "Фото",
                source: "Источник",
            },
            Language::En => Self {
                new_lead: "New lead",
                contact: "Contact",
                name: "Name",
                cargo: "Cargo",
                items: "Recognized",
                route: "Route",
                pickup: "Pickup",
                destination: "Delivery",
                floor: "floor",
                elevator_yes: "elevator",
                elevator_no: "no elevator",
                date: "Date",
                volume: "Volume",
                extras: "Services",
                details: "Details",
                estimate: "Estimate",
                estimate_pending: "to be confirmed",
                estimate_hidden: "(hidden from customer)",
                photos: "Photos",
                source: "Source",
            },
            Language::He => Self {
                new_lead: "פנייה חדשה",
                contact: "איש קשר",
                name: "שם",
                cargo: "מטען",
                items: "זוהה",
                route: "מסלול",
                pickup: "איסוף",
                destination: "משלוח",
                floor: "קומה",
                elevator_yes: "מעלית",
                elevator_no: "ללא מעלית",
                date: "תאריך",
                volume: "נפח",
                extras: "שירותים",
                details: "פרטים",
                estimate: "הערכה",
                estimate_pending: "דורש אישור",
                estimate_hidden: "(מוסתר מהלקוח)",
                photos: "תמונות",
                source: "מקור",
            },
        }
    }
}

/// Free-text fields go through the translations map when a pass for the
/// target language exists; otherwise the original text is kept verbatim.
fn translated<'a>(
    payload: &'a LeadPayload,
    field: &str,
    original: &'a str,
    settings: &NotificationSettings,
) -> &'a str {
    if !settings.translation_enabled {
        return original;
    }
    payload
        .data
        .translations
        .as_ref()
        .and_then(|map| map.get(field))
        .and_then(|per_lang| per_lang.get(settings.target_lang.as_str()))
        .map(String::as_str)
        .unwrap_or(original)
}

pub fn format_operator_message(
    payload: &LeadPayload,
    chat_id: &str,
    settings: &NotificationSettings,
) -> String {
    let lang = settings.target_lang;
    let labels = OperatorLabels::for_lang(lang);
    let data = &payload.data;

    let mut lines = vec![format!("📦 {} #{}", labels.new_lead, payload.lead_number)];
    lines.push(format!("{}: {chat_id}", labels.contact));
    if let Some(name) = data.extensions.sender_name() {
        lines.push(format!("{}: {name}", labels.name));
    }
    lines.push(String::new());

    if let Some(ref cargo) = data.cargo_raw {
        lines.push(format!("{}: {}", labels.cargo, translated(payload, "cargo_raw", cargo, settings)));
    }
    if !data.items.is_empty() {
        let items: Vec<String> = data
            .items
            .iter()
            .map(|item| {
                let label = movely_core::bots::moving::catalog::item_label(&item.key, lang)
                    .map(str::to_string)
                    .unwrap_or_else(|| item.key.clone());
                if item.qty > 1 {
                    format!("{label} ×{}", item.qty)
                } else {
                    label
                }
            })
            .collect();
        lines.push(format!("{}: {}", labels.items, items.join(", ")));
    }
    if let Some(volume) = data.volume_category {
        lines.push(format!("{}: {}", labels.volume, volume.as_str()));
    }
    lines.push(String::new());

    for (index, stop) in data.pickups.iter().enumerate() {
        let elevator = if stop.has_elevator { labels.elevator_yes } else { labels.elevator_no };
        lines.push(format!(
            "{} {}: {} — {} {} ({elevator})",
            labels.pickup,
            index + 1,
            stop.address_text,
            labels.floor,
            stop.floor_num,
        ));
    }
    if let Some(ref destination) = data.destination {
        let elevator =
            if destination.has_elevator { labels.elevator_yes } else { labels.elevator_no };
        lines.push(format!(
            "{}: {} — {} {} ({elevator})",
            labels.destination,
            destination.address_text,
            labels.floor,
            destination.floor_num,
        ));
    }
    if let Some(ref route) = data.route_classification {
        let distance = route
            .distance_km
            .map(|km| format!(", ~{km:.0} km"))
            .unwrap_or_default();
        lines.push(format!("{}: {}{distance}", labels.route, route.band.as_str()));
    }
    lines.push(String::new());

    if let Some(ref date) = data.date {
        let window = match (data.time_window, &data.exact_time) {
            (Some(TimeWindow::Exact), Some(time)) => format!(", {time}"),
            (Some(window), _) => format!(", {}", window.as_str()),
            (None, _) => String::new(),
        };
        lines.push(format!("{}: {date}{window}", labels.date));
    }
    if !data.extras.is_empty() {
        let extras: Vec<&str> = data.extras.iter().map(|extra| extra.as_str()).collect();
        lines.push(format!("{}: {}", labels.extras, extras.join(", ")));
    }
    if let Some(ref details) = data.details_free {
        lines.push(format!(
            "{}: {}",
            labels.details,
            translated(payload, "details_free", details, settings)
        ));
    }
    if data.photo_count > 0 {
        lines.push(format!("{}: {}", labels.photos, data.photo_count));
    }

    match data.estimate {
        Some(ref estimate) if estimate.suppressed => {
            lines.push(format!("{}: {}", labels.estimate, labels.estimate_pending));
        }
        Some(ref estimate) => {
            let hidden = if data.extensions.estimate_display_disabled() {
                format!(" {}", labels.estimate_hidden)
            } else {
                String::new()
            };
            lines.push(format!(
                "{}: ₪{}–₪{}{hidden}",
                labels.estimate, estimate.min, estimate.max
            ));
        }
        None => {}
    }

    if let Some(source) = data.extensions.source() {
        lines.push(format!("{}: {source}", labels.source));
    }

    // Collapse the blank separators left by empty sections.
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.is_empty() && out.last().is_some_and(String::is_empty) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(String::is_empty) {
        out.pop();
    }
    out.join("\n")
}

/// Assemble the operator delivery: few photos ride along as attachments,
/// many photos become signed links appended to the text.
pub fn build_operator_delivery(
    payload: &LeadPayload,
    tenant_id: &str,
    operator_chat_id: &str,
    customer_chat_id: &str,
    assets: &[MediaAsset],
    signer: &MediaUrlSigner,
    settings: &NotificationSettings,
) -> OutboundMessage {
    let mut text = format_operator_message(payload, customer_chat_id, settings);
    let mut message = OutboundMessage::text_only(tenant_id, operator_chat_id, String::new());

    if assets.len() <= settings.max_inline_media_count {
        message.media_refs = assets.iter().map(|asset| asset.id.clone()).collect();
    } else {
        let expires_unix = Utc::now().timestamp() + settings.link_ttl_secs;
        text.push('\n');
        for asset in assets {
            let url = signer.signed_url(tenant_id, asset.kind, &asset.id, expires_unix);
            text.push_str(&format!("\n📎 {url}"));
        }
    }

    message.text = text;
    message
}
