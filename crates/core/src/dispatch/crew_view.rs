//! Crew-safe projection of a finalized lead.
//!
//! `CrewLeadView` is built from an explicit allowlist. Nothing else from
//! the lead payload can reach the crew message: no phone, no street
//! address, no raw cargo text, no user name, no links, no media.

use serde::{Deserialize, Serialize};

use crate::domain::lead::VolumeCategory;
use crate::domain::session::{ExtraService, Language, LeadData, TimeWindow};

/// One stop as the crew sees it: floor and elevator, never the address.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrewStop {
    pub floor_num: i32,
    pub has_elevator: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrewLeadView {
    pub lead_number: i64,
    pub from_locality: Option<String>,
    pub to_locality: Option<String>,
    pub date: Option<String>,
    pub time_window: Option<TimeWindow>,
    pub exact_time: Option<String>,
    pub volume_category: Option<VolumeCategory>,
    pub pickups: Vec<CrewStop>,
    pub destination: Option<CrewStop>,
    pub extras: Vec<ExtraService>,
    /// Localized labels of recognised items, with quantities.
    pub items: Vec<String>,
    /// `None` when the estimate is suppressed or display-disabled.
    pub estimate_range: Option<(i64, i64)>,
}

const MAX_CREW_ITEMS: usize = 8;

impl CrewLeadView {
    /// Project a finalized lead's data into the allowlist. `lang` selects
    /// the locality display names and item labels.
    pub fn project(lead_number: i64, data: &LeadData, lang: Language) -> Self {
        let route = data.route_classification.as_ref();
        let lang_key = lang.as_str();

        let from_locality = route
            .and_then(|r| r.from_names.as_ref())
            .and_then(|names| names.get(lang_key).cloned());
        let to_locality = route
            .and_then(|r| r.to_names.as_ref())
            .and_then(|names| names.get(lang_key).cloned());

        let items = data
            .items
            .iter()
            .take(MAX_CREW_ITEMS)
            .map(|item| {
                let label = crate::bots::moving::catalog::item_label(&item.key, lang)
                    .map(str::to_string)
                    .unwrap_or_else(|| item.key.replace('_', " "));
                if item.qty > 1 {
                    format!("{label} ×{}", item.qty)
                } else {
                    label
                }
            })
            .collect();

        let estimate_range = data.estimate.as_ref().and_then(|estimate| {
            let display_disabled = data.extensions.estimate_display_disabled();
            (!estimate.suppressed && !display_disabled).then_some((estimate.min, estimate.max))
        });

        Self {
            lead_number,
            from_locality,
            to_locality,
            date: data.date.clone(),
            time_window: data.time_window,
            exact_time: data.exact_time.clone(),
            volume_category: data.volume_category,
            pickups: data
                .pickups
                .iter()
                .map(|stop| CrewStop { floor_num: stop.floor_num, has_elevator: stop.has_elevator })
                .collect(),
            destination: data.destination.as_ref().map(|stop| CrewStop {
                floor_num: stop.floor_num,
                has_elevator: stop.has_elevator,
            }),
            extras: data.extras.clone(),
            items,
            estimate_range,
        }
    }

    /// Render the copy-paste crew message in `lang`.
    pub fn render(&self, lang: Language) -> String {
        let labels = CrewLabels::for_lang(lang);

        let route = match (&self.from_locality, &self.to_locality) {
            (Some(from), Some(to)) => format!("{from} → {to}"),
            (Some(from), None) => format!("{from} → ?"),
            (None, Some(to)) => format!("? → {to}"),
            (None, None) => labels.not_specified.to_string(),
        };

        let date = match (&self.date, self.time_window) {
            (Some(date), Some(window)) => {
                format!("{date}, {}", self.time_window_label(window, lang))
            }
            (Some(date), None) => date.clone(),
            (None, Some(window)) => self.time_window_label(window, lang),
            (None, None) => labels.not_specified.to_string(),
        };

        let volume = self
            .volume_category
            .map(|category| volume_label(category, lang).to_string())
            .unwrap_or_else(|| labels.not_specified.to_string());

        let floor_line = |stop: &CrewStop| {
            let elevator =
                if stop.has_elevator { labels.elevator_yes } else { labels.elevator_no };
            format!("{} ({elevator})", stop.floor_num)
        };

        let floors = if self.pickups.len() > 1 {
            let mut parts: Vec<String> = self
                .pickups
                .iter()
                .enumerate()
                .map(|(i, stop)| format!("{} {}: {}", labels.pickup, i + 1, floor_line(stop)))
                .collect();
            if let Some(ref destination) = self.destination {
                parts.push(format!("{}: {}", labels.destination, floor_line(destination)));
            }
            parts.join("\n  ")
        } else {
            let from = self.pickups.first().map(&floor_line);
            let to = self.destination.as_ref().map(&floor_line);
            match (from, to) {
                (Some(from), Some(to)) => format!("{from} → {to}"),
                (Some(from), None) => from,
                (None, Some(to)) => to,
                (None, None) => labels.not_specified.to_string(),
            }
        };

        let mut lines = vec![
            format!("🧰 {} #{}", labels.job, self.lead_number),
            String::new(),
            format!("{}: {route}", labels.route),
            format!("{}: {date}", labels.date),
            format!("{}: {volume}", labels.volume),
            format!("{}: {floors}", labels.floors),
        ];

        if !self.items.is_empty() {
            lines.push(format!("{}: {}", labels.items, self.items.join(", ")));
        }
        if !self.extras.is_empty() {
            let extras: Vec<&str> =
                self.extras.iter().map(|extra| extra_label(*extra, lang)).collect();
            lines.push(format!("{}: {}", labels.services, extras.join(", ")));
        }
        if let Some((min, max)) = self.estimate_range {
            lines.push(format!("{}: ₪{min}–₪{max}", labels.estimate));
        }

        lines.join("\n")
    }

    fn time_window_label(&self, window: TimeWindow, lang: Language) -> String {
        match (window, &self.exact_time) {
            (TimeWindow::Exact, Some(time)) => {
                format!("{} {time}", time_window_label(TimeWindow::Exact, lang))
            }
            (window, _) => time_window_label(window, lang).to_string(),
        }
    }
}

struct CrewLabels {
    job: &'static str,
    route: &'static str,
    date: &'static str,
    volume: &'static str,
    floors: &'static str,
    items: &'static str,
    services: &'static str,
    estimate: &'static str,
    not_specified: &'static str,
    elevator_yes: &'static str,
    elevator_no: &'static str,
    pickup: &'static str,
    destination: &'static str,
}

impl CrewLabels {
    fn for_lang(lang: Language) -> Self {
        match lang {
            Language::Ru => Self {
                job: "Заказ",
                route: "Маршрут",
                date: "Дата",
                volume: "Объём",
                floors: "Этажи",
                items: "Вещи",
                services: "Услуги",
                estimate: "Оценка",
                not_specified: "не указано",
                elevator_yes: "есть лифт",
                elevator_no: "без лифта",
                pickup: "Забор",
                destination: "Доставка",
            },
            Language::En => Self {
                job: "Job",
                route: "Route",
                date: "Date",
                volume: "Volume",
                floors: "Floors",
                items: "Items",
                services: "Services",
                estimate: "Estimate",
                not_specified: "not specified",
                elevator_yes: "elevator",
                elevator_no: "no elevator",
                pickup: "Pickup",
                destination: "Delivery",
            },
            Language::He => Self {
                job: "הזמנה",
                route: "מסלול",
                date: "תאריך",
                volume: "נפח",
                floors: "קומות",
                items: "פריטים",
                services: "שירותים",
                estimate: "הערכה",
                not_specified: "לא צוין",
                elevator_yes: "מעלית",
                elevator_no: "ללא מעלית",
                pickup: "איסוף",
                destination: "משלוח",
            },
        }
    }
}

fn volume_label(category: VolumeCategory, lang: Language) -> &'static str {
    match (lang, category) {
        (Language::Ru, VolumeCategory::Small) => "малый (до 1 м³)",
        (Language::Ru, VolumeCategory::Medium) => "средний (1–3 м³)",
        (Language::Ru, VolumeCategory::Large) => "большой (3–10 м³)",
        (Language::Ru, VolumeCategory::Xl) => "очень большой (10+ м³)",
        (Language::En, VolumeCategory::Small) => "small (up to 1 m³)",
        (Language::En, VolumeCategory::Medium) => "medium (1–3 m³)",
        (Language::En, VolumeCategory::Large) => "large (3–10 m³)",
        (Language::En, VolumeCategory::Xl) => "extra large (10+ m³)",
        (Language::He, VolumeCategory::Small) => "קטן (עד 1 מ\"ק)",
        (Language::He, VolumeCategory::Medium) => "בינוני (1–3 מ\"ק)",
        (Language::He, VolumeCategory::Large) => "גדול (3–10 מ\"ק)",
        (Language::He, VolumeCategory::Xl) => "גדול מאוד (10+ מ\"ק)",
    }
}

fn extra_label(extra: ExtraService, lang: Language) -> &'static str {
    match (lang, extra) {
        (Language::Ru, ExtraService::Movers) => "грузчики",
        (Language::Ru, ExtraService::Assembly) => "сборка/разборка",
        (Language::Ru, ExtraService::Packing) => "упаковка",
        (Language::En, ExtraService::Movers) => "movers",
        (Language::En, ExtraService::Assembly) => "assembly/disassembly",
        (Language::En, ExtraService::Packing) => "packing",
        (Language::He, ExtraService::Movers) => "סבלים",
        (Language::He, ExtraService::Assembly) => "הרכבה/פירוק",
        (Language::He, ExtraService::Packing) => "אריזה",
    }
}

fn time_window_label(window: TimeWindow, lang: Language) -> &'static str {
    match (lang, window) {
        (Language::Ru, TimeWindow::Morning) => "утро (08:00–12:00)",
        (Language::Ru, TimeWindow::Day) => "день (12:00–17:00)",
        (Language::Ru, TimeWindow::Evening) => "вечер (17:00–21:00)",
        (Language::Ru, TimeWindow::Exact) => "точное время",
        (Language::En, TimeWindow::Morning) => "morning (08:00–12:00)",
        (Language::En, TimeWindow::Day) => "afternoon (12:00–17:00)",
        (Language::En, TimeWindow::Evening) => "evening (17:00–21:00)",
        (Language::En, TimeWindow::Exact) => "exact time",
        (Language::He, TimeWindow::Morning) => "בוקר (08:00–12:00)",
        (Language::He, TimeWindow::Day) => "צהריים (12:00–17:00)",
        (Language::He, TimeWindow::Evening) => "ערב (17:00–21:00)",
        (Language::He, TimeWindow::Exact) => "שעה מדויקת",
    }
}
