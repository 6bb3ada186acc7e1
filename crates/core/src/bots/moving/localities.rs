//! Built-in locality table: trilingual names, coordinates, metro cluster.
//!
//! Resolves free-text addresses to known localities offline, with no
//! geocoding API. Matching is normalized substring search with word
//! boundaries, longest alias first, so "кирьят ата" wins over "ата".

use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::domain::lead::LocalityNames;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Locality {
    pub key: &'static str,
    pub he: &'static str,
    pub en: &'static str,
    pub ru: &'static str,
    pub lat: f64,
    pub lng: f64,
    /// Localities sharing a metro cluster classify as `same_metro`.
    pub metro: Option<&'static str>,
    pub aliases: &'static [&'static str],
}

impl Locality {
    pub fn names(&self) -> LocalityNames {
        let mut names = BTreeMap::new();
        names.insert("he".to_string(), self.he.to_string());
        names.insert("en".to_string(), self.en.to_string());
        names.insert("ru".to_string(), self.ru.to_string());
        names
    }
}

macro_rules! locality {
    ($key:literal, $he:literal, $en:literal, $ru:literal, $lat:literal, $lng:literal, $metro:expr, [$($alias:literal),* $(,)?]) => {
        Locality {
            key: $key,
            he: $he,
            en: $en,
            ru: $ru,
            lat: $lat,
            lng: $lng,
            metro: $metro,
            aliases: &[$($alias),*],
        }
    };
}

pub static LOCALITIES: &[Locality] = &[
    locality!("tel_aviv", "תל אביב-יפו", "Tel Aviv", "Тель-Авив", 32.0853, 34.7818, Some("gush_dan"),
        ["тель авив", "tel aviv", "תל אביב", "тель-авив яффо"]),
    locality!("ramat_gan", "רמת גן", "Ramat Gan", "Рамат-Ган", 32.0823, 34.8100, Some("gush_dan"),
        ["рамат ган", "ramat gan", "רמת גן"]),
    locality!("givatayim", "גבעתיים", "Givatayim", "Гиватаим", 32.0723, 34.8125, Some("gush_dan"),
        ["гиватаим", "givatayim", "גבעתיים"]),
    locality!("holon", "חולון", "Holon", "Холон", 32.0167, 34.7792, Some("gush_dan"),
        ["холон", "holon", "חולון"]),
    locality!("bat_yam", "בת ים", "Bat Yam", "Бат-Ям", 32.0231, 34.7503, Some("gush_dan"),
        ["бат ям", "bat yam", "בת ים"]),
    locality!("bnei_brak", "בני ברק", "Bnei Brak", "Бней-Брак", 32.0807, 34.8338, Some("gush_dan"),
        ["бней брак", "bnei brak", "בני ברק"]),
    locality!("petah_tikva", "פתח תקווה", "Petah Tikva", "Петах-Тиква", 32.0871, 34.8878, Some("gush_dan"),
        ["петах тиква", "petah tikva", "petach tikva", "פתח תקווה", "פתח תקוה"]),
    locality!("rishon_lezion", "ראשון לציון", "Rishon LeZion", "Ришон ле-Цион", 31.9730, 34.7925, Some("gush_dan"),
        ["ришон ле цион", "ришон лецион", "ришон", "rishon lezion", "rishon le zion", "ראשון לציון"]),
    locality!("herzliya", "הרצליה", "Herzliya", "Герцлия", 32.1663, 34.8436, Some("gush_dan"),
        ["герцлия", "herzliya", "הרצליה"]),
    locality!("netanya", "נתניה", "Netanya", "Нетания", 32.3215, 34.8532, None,
        ["нетания", "нетания", "netanya", "נתניה"]),
    locality!("haifa", "חיפה", "Haifa", "Хайфа", 32.7940, 34.9896, Some("haifa_krayot"),
        ["хайфа", "haifa", "חיפה"]),
    locality!("kiryat_ata", "קריית אתא", "Kiryat Ata", "Кирьят-Ата", 32.8064, 35.1053, Some("haifa_krayot"),
        ["кирьят ата", "kiryat ata", "קריית אתא", "קרית אתא"]),
    locality!("kiryat_bialik", "קריית ביאליק", "Kiryat Bialik", "Кирьят-Бялик", 32.8275, 35.0859, Some("haifa_krayot"),
        ["кирьят бялик", "kiryat bialik", "קריית ביאליק", "קרית ביאליק"]),
    locality!("kiryat_yam", "קריית ים", "Kiryat Yam", "Кирьят-Ям", 32.8497, 35.0661, Some("haifa_krayot"),
        ["кирьят ям", "kiryat yam", "קריית ים", "קרית ים"]),
    locality!("nesher", "נשר", "Nesher", "Нешер", 32.7711, 35.0448, Some("haifa_krayot"),
        ["нешер", "nesher", "נשר"]),
    locality!("jerusalem", "ירושלים", "Jerusalem", "Иерусалим", 31.7683, 35.2137, Some("jerusalem_ring"),
        ["иерусалим", "jerusalem", "ירושלים"]),
    locality!("beer_sheva", "באר שבע", "Be'er Sheva", "Беэр-Шева", 31.2520, 34.7915, Some("beer_sheva_area"),
        ["беэр шева", "беер шева", "beer sheva", "be'er sheva", "באר שבע"]),
    locality!("ashdod", "אשדוד", "Ashdod", "Ашдод", 31.8014, 34.6435, None,
        ["ашдод", "ashdod", "אשדוד"]),
    locality!("ashkelon", "אשקלון", "Ashkelon", "Ашкелон", 31.6688, 34.5743, None,
        ["ашкелон", "ashkelon", "אשקלון"]),
    locality!("eilat", "אילת", "Eilat", "Эйлат", 29.5577, 34.9519, None,
        ["эйлат", "eilat", "אילת"]),
    locality!("nazareth", "נצרת", "Nazareth", "Назарет", 32.7021, 35.2978, None,
        ["назарет", "nazareth", "נצרת"]),
    locality!("afula", "עפולה", "Afula", "Афула", 32.6078, 35.2897, None,
        ["афула", "afula", "עפולה"]),
    locality!("tiberias", "טבריה", "Tiberias", "Тверия", 32.7922, 35.5312, None,
        ["тверия", "tiberias", "טבריה"]),
    locality!("hadera", "חדרה", "Hadera", "Хадера", 32.4340, 34.9196, None,
        ["хадера", "hadera", "חדרה"]),
    locality!("rehovot", "רחובות", "Rehovot", "Реховот", 31.8928, 34.8113, None,
        ["реховот", "rehovot", "רחובות"]),
    locality!("modiin", "מודיעין", "Modi'in", "Модиин", 31.8928, 35.0124, None,
        ["модиин", "modiin", "modi'in", "מודיעין"]),
    locality!("beit_shemesh", "בית שמש", "Beit Shemesh", "Бейт-Шемеш", 31.7497, 34.9886, None,
        ["бейт шемеш", "beit shemesh", "בית שמש"]),
];

/// `(normalized alias, locality index)` sorted longest first.
static LOCALITY_LOOKUP: LazyLock<Vec<(String, usize)>> = LazyLock::new(|| {
    let mut lookup: Vec<(String, usize)> = Vec::new();
    for (index, locality) in LOCALITIES.iter().enumerate() {
        for alias in locality.aliases {
            lookup.push((normalize_name(alias), index));
        }
        lookup.push((normalize_name(locality.en), index));
        lookup.push((normalize_name(locality.he), index));
        lookup.push((normalize_name(locality.ru), index));
    }
    lookup.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()).then(a.0.cmp(&b.0)));
    lookup.dedup_by(|a, b| a.0 == b.0);
    lookup
});

/// Lowercase, fold `ё`, normalize dashes to spaces, strip quotes and
/// apostrophes, collapse whitespace. Combining marks are left alone — NFD
/// stripping would corrupt Hebrew and Cyrillic.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.to_lowercase().chars() {
        match ch {
            'ё' => out.push('е'),
            '-' | '–' | '—' | '\u{2011}' => out.push(' '),
            '"' | '\'' | '`' | '\u{2018}' | '\u{2019}' | '\u{201c}' | '\u{201d}' | '\u{05f3}'
            | '\u{05f4}' | '(' | ')' | '.' | ',' => {}
            _ => out.push(ch),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn boundary_before(text: &str, byte_pos: usize) -> bool {
    byte_pos == 0
        || text[..byte_pos].chars().next_back().is_some_and(|ch| !ch.is_alphanumeric())
}

fn boundary_after(text: &str, byte_pos: usize) -> bool {
    byte_pos >= text.len()
        || text[byte_pos..].chars().next().is_some_and(|ch| !ch.is_alphanumeric())
}

/// Resolve a free-text address to a locality, or `None` if no known city
/// name appears in it.
pub fn find_locality(address_text: &str) -> Option<&'static Locality> {
    let normalized = normalize_name(address_text);
    if normalized.is_empty() {
        return None;
    }

    for (alias, index) in LOCALITY_LOOKUP.iter() {
        let mut search_from = 0;
        while let Some(rel) = normalized[search_from..].find(alias.as_str()) {
            let start = search_from + rel;
            let end = start + alias.len();
            if boundary_before(&normalized, start) && boundary_after(&normalized, end) {
                return Some(&LOCALITIES[*index]);
            }
            search_from = end;
        }
    }
    None
}
