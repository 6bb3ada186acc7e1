//! Input validators for the moving intake.
//!
//! Everything here is a pure function over text. Validator rejection is an
//! expected outcome, modeled as `Option`/`Result` values — never an error
//! path through the engine.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::domain::session::Language;

// ---------------------------------------------------------------------------
// Sanitisation
// ---------------------------------------------------------------------------

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?://\S+|www\.\S+").unwrap());
static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]{1,200}>").unwrap());
static SCRIPT_URI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:javascript|vbscript|data)\s*:").unwrap());
static CONTROL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x08\x0b\x0c\x0e-\x1f\x7f]").unwrap());
static MULTI_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());

pub const MAX_FIELD_LEN: usize = 500;

/// Strip HTML tags, URLs, script URIs and control characters; collapse
/// runs of spaces and cap the length. Returns `None` when a non-empty input
/// consisted entirely of stripped content — the caller rejects the message.
pub fn sanitize_text(input: &str, max_length: usize) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Some(String::new());
    }

    let mut text: String = trimmed.chars().take(max_length).collect();
    text = HTML_TAG_RE.replace_all(&text, "").into_owned();
    text = URL_RE.replace_all(&text, "").into_owned();
    text = SCRIPT_URI_RE.replace_all(&text, "").into_owned();
    text = CONTROL_RE.replace_all(&text, "").into_owned();
    text = MULTI_SPACE_RE.replace_all(&text, " ").trim().to_string();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

const JUNK_INPUTS: &[&str] = &[".", "..", "...", "ок", "ok", "ага", "да", "нет", "?"];

/// Too short, or a known low-information response ("ok", "да", "...").
pub fn looks_too_short(input: &str, min_chars: usize) -> bool {
    let trimmed = input.trim();
    if trimmed.chars().count() < min_chars {
        return true;
    }
    JUNK_INPUTS.contains(&trimmed.to_lowercase().as_str())
}

// ---------------------------------------------------------------------------
// Language detection (script-based, no external service)
// ---------------------------------------------------------------------------

// Below this many script letters the input is ambiguous (button digit,
// phone number) and detection abstains.
const MIN_LETTERS_FOR_DETECTION: usize = 3;

/// Detect the user's language from the writing system. Hebrew block wins
/// outright; otherwise the dominant of Cyrillic vs Latin decides.
pub fn detect_language(text: &str) -> Option<Language> {
    let mut hebrew = 0usize;
    let mut cyrillic = 0usize;
    let mut latin = 0usize;

    for ch in text.chars() {
        match ch {
            '\u{0590}'..='\u{05FF}' => hebrew += 1,
            '\u{0400}'..='\u{04FF}' => cyrillic += 1,
            'A'..='Z' | 'a'..='z' => latin += 1,
            _ => {}
        }
    }

    if hebrew + cyrillic + latin < MIN_LETTERS_FOR_DETECTION {
        return None;
    }
    if hebrew > 0 {
        return Some(Language::He);
    }
    if cyrillic > latin {
        return Some(Language::Ru);
    }
    Some(Language::En)
}

// ---------------------------------------------------------------------------
// Intents
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Reset,
    DonePhotos,
    Yes,
    No,
}

const RESET_PATTERNS: &[&str] = &[
    "заново", "сначала", "рестарт", "перезапуск", "/start", "start", "reset", "restart",
    "מחדש", "התחל", "ריסט",
];
const DONE_PHOTOS_PATTERNS: &[&str] = &[
    "готово", "всё", "все", "закончено", "done", "finish", "finished",
    "סיימתי", "גמרתי", "סיום", "סיימנו",
];
const YES_PATTERNS: &[&str] = &["да", "ага", "yes", "yep", "כן"];
const NO_PATTERNS: &[&str] = &["нет", "неа", "не нужно", "no", "nope", "skip", "לא"];

/// Exact-match intent lookup over the normalized input. Matched intents
/// bypass the step validator entirely.
pub fn detect_intent(text: &str) -> Option<Intent> {
    let normalized = text.trim().to_lowercase();
    if RESET_PATTERNS.contains(&normalized.as_str()) {
        return Some(Intent::Reset);
    }
    if DONE_PHOTOS_PATTERNS.contains(&normalized.as_str()) {
        return Some(Intent::DonePhotos);
    }
    if YES_PATTERNS.contains(&normalized.as_str()) {
        return Some(Intent::Yes);
    }
    if NO_PATTERNS.contains(&normalized.as_str()) {
        return Some(Intent::No);
    }
    None
}

// ---------------------------------------------------------------------------
// Choice parsing
// ---------------------------------------------------------------------------

pub fn parse_choices(text: &str) -> BTreeSet<char> {
    text.chars().filter(|ch| ('1'..='4').contains(ch)).collect()
}

static EXTRAS_LEADING_DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([1-4](?:\s*[,\s]\s*[1-4])*)\s+(.+)$").unwrap());

/// Parse the extras answer: digit choices, free text, or both.
///
/// `"1 3"` → choices only; `"нет парковки"` → details only;
/// `"1 3 + нет парковки"` → both. Separators between the digit part and the
/// comment: `+`, `,`, `и`, `and`, `также`.
pub fn parse_extras_input(text: &str) -> (BTreeSet<char>, Option<String>) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return (BTreeSet::new(), None);
    }

    // Explicit separator between digits and comment.
    if let Some((before, after)) = split_on_extras_separator(trimmed) {
        let choices = parse_choices(before);
        if !choices.is_empty() && !after.is_empty() {
            return (choices, Some(after.to_string()));
        }
    }

    // Pure numeric input: "1 3", "1,2,3".
    let cleaned: String = trimmed.chars().filter(|ch| !ch.is_whitespace() && *ch != ',').collect();
    if !cleaned.is_empty() && cleaned.chars().all(|ch| ('1'..='4').contains(&ch)) {
        return (cleaned.chars().collect(), None);
    }

    // Digits followed by text: "1 3 пятый этаж".
    if let Some(caps) = EXTRAS_LEADING_DIGITS_RE.captures(trimmed) {
        let choices = parse_choices(&caps[1]);
        let details = caps[2].trim();
        if !choices.is_empty()
            && !details.is_empty()
            && !details.starts_with(|ch: char| ch.is_ascii_digit())
        {
            return (choices, Some(details.to_string()));
        }
    }

    // Digits buried in a sentence read as free text, not choices.
    let all_choices = parse_choices(trimmed);
    let non_numeric: String = trimmed
        .chars()
        .filter(|ch| !('1'..='4').contains(ch) && !ch.is_whitespace() && *ch != ',')
        .collect();
    if !all_choices.is_empty()
        && non_numeric.chars().count() > 3
        && !trimmed.starts_with(|ch: char| ('1'..='4').contains(&ch))
    {
        return (BTreeSet::new(), Some(trimmed.to_string()));
    }

    if !all_choices.is_empty() {
        return (all_choices, None);
    }

    (BTreeSet::new(), Some(trimmed.to_string()))
}

fn split_on_extras_separator(text: &str) -> Option<(&str, &str)> {
    // '+' splits unconditionally; the word separators only when followed by
    // something that is not another digit choice.
    if let Some(pos) = text.find('+') {
        return Some((text[..pos].trim_end(), text[pos + 1..].trim_start()));
    }
    for separator in [" и ", " and ", " также ", ","] {
        let mut search_from = 0;
        while let Some(rel) = text[search_from..].find(separator) {
            let pos = search_from + rel;
            let after = text[pos + separator.len()..].trim_start();
            if !after.is_empty() && !after.starts_with(|ch: char| ch.is_ascii_digit()) {
                return Some((text[..pos].trim_end(), after));
            }
            search_from = pos + separator.len();
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Floor / elevator parsing
// ---------------------------------------------------------------------------

static ELEVATOR_NO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:без\s*лифта)|(?:лифта\s*нет)|(?:нет\s*лифта)|(?:no\s*elevator)|(?:without\s*elevator)|(?:elevator\s*(?:no|none))|(?:בלי\s*מעלית)|(?:אין\s*מעלית)",
    )
    .unwrap()
});

static FLOOR_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:(\d{1,2})\s*(?:этаж|эт|floor|fl|קומה))|(?:(?:этаж|эт|floor|fl|קומה)\s*(\d{1,2}))|(?:^(\d{1,2})$)",
    )
    .unwrap()
});

static GROUND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:частный\s*дом)|(?:private\s*house)|(?:בית\s*פרטי)|(?:ground)").unwrap()
});

/// Extract `(floor_number, has_elevator)` from a free-text answer.
///
/// "Private house" counts as ground level with no surcharge. Defaults are
/// floor 1 with an elevator, the no-surcharge case.
pub fn parse_floor_info(text: &str) -> (i32, bool) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return (1, true);
    }

    if GROUND_RE.is_match(trimmed) {
        return (1, true);
    }

    let mut floor = 1;
    if let Some(caps) = FLOOR_NUMBER_RE.captures(trimmed) {
        let digits = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3));
        if let Some(m) = digits {
            floor = m.as_str().parse().unwrap_or(1);
        }
    }

    // Default assumes an elevator (no surcharge); only an explicit
    // "no elevator" flips it.
    let has_elevator = !ELEVATOR_NO_RE.is_match(trimmed);

    (floor, has_elevator)
}

// ---------------------------------------------------------------------------
// Date parsing
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateParseError {
    Format,
    InvalidDate,
    TooSoon,
    TooFar,
}

impl DateParseError {
    /// Translation key for the re-entry hint.
    pub fn text_key(&self) -> &'static str {
        match self {
            Self::Format => "err_date_format",
            Self::InvalidDate => "err_date_invalid",
            Self::TooSoon => "err_date_too_soon",
            Self::TooFar => "err_date_too_far",
        }
    }
}

pub const MAX_DAYS_AHEAD: i64 = 180;

static NUMERIC_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})(?:\.(\d{4}))?$").unwrap());

const RELATIVE_DAYS: &[(&str, i64)] = &[
    ("послезавтра", 2),
    ("day after tomorrow", 2),
    ("מחרתיים", 2),
    ("сегодня", 0),
    ("today", 0),
    ("היום", 0),
    ("завтра", 1),
    ("tomorrow", 1),
    ("מחר", 1),
];

const WEEKDAY_NAMES: &[(&str, Weekday)] = &[
    ("понедельник", Weekday::Mon),
    ("вторник", Weekday::Tue),
    ("среду", Weekday::Wed),
    ("среда", Weekday::Wed),
    ("четверг", Weekday::Thu),
    ("пятницу", Weekday::Fri),
    ("пятница", Weekday::Fri),
    ("субботу", Weekday::Sat),
    ("суббота", Weekday::Sat),
    ("воскресенье", Weekday::Sun),
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
    ("יום שני", Weekday::Mon),
    ("יום שלישי", Weekday::Tue),
    ("יום רביעי", Weekday::Wed),
    ("יום חמישי", Weekday::Thu),
    ("יום שישי", Weekday::Fri),
    ("שבת", Weekday::Sat),
    ("יום ראשון", Weekday::Sun),
    ("שני", Weekday::Mon),
    ("שלישי", Weekday::Tue),
    ("רביעי", Weekday::Wed),
    ("חמישי", Weekday::Thu),
    ("שישי", Weekday::Fri),
    ("ראשון", Weekday::Sun),
    ("пн", Weekday::Mon),
    ("вт", Weekday::Tue),
    ("ср", Weekday::Wed),
    ("чт", Weekday::Thu),
    ("пт", Weekday::Fri),
    ("сб", Weekday::Sat),
    ("вс", Weekday::Sun),
    ("mon", Weekday::Mon),
    ("tue", Weekday::Tue),
    ("wed", Weekday::Wed),
    ("thu", Weekday::Thu),
    ("fri", Weekday::Fri),
    ("sat", Weekday::Sat),
    ("sun", Weekday::Sun),
];

const MONTH_NAMES: &[(&str, u32)] = &[
    ("января", 1),
    ("январь", 1),
    ("янв", 1),
    ("february", 2),
    ("февраля", 2),
    ("февраль", 2),
    ("фев", 2),
    ("марта", 3),
    ("march", 3),
    ("март", 3),
    ("мар", 3),
    ("апреля", 4),
    ("апрель", 4),
    ("april", 4),
    ("апр", 4),
    ("мая", 5),
    ("май", 5),
    ("may", 5),
    ("июня", 6),
    ("июнь", 6),
    ("june", 6),
    ("июн", 6),
    ("июля", 7),
    ("июль", 7),
    ("july", 7),
    ("июл", 7),
    ("августа", 8),
    ("август", 8),
    ("august", 8),
    ("авг", 8),
    ("сентября", 9),
    ("сентябрь", 9),
    ("september", 9),
    ("сент", 9),
    ("сен", 9),
    ("октября", 10),
    ("октябрь", 10),
    ("october", 10),
    ("окт", 10),
    ("ноября", 11),
    ("ноябрь", 11),
    ("november", 11),
    ("ноя", 11),
    ("декабря", 12),
    ("декабрь", 12),
    ("december", 12),
    ("дек", 12),
    ("january", 1),
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sept", 9),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
    ("ינואר", 1),
    ("פברואר", 2),
    ("מרץ", 3),
    ("מרס", 3),
    ("אפריל", 4),
    ("מאי", 5),
    ("יוני", 6),
    ("יולי", 7),
    ("אוגוסט", 8),
    ("ספטמבר", 9),
    ("אוקטובר", 10),
    ("נובמבר", 11),
    ("דצמבר", 12),
];

static NEXT_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:в\s+)?следующ(?:ий|ую|ее)\s+|next\s+|(?:ב\s*)?שבוע\s+הבא\s+)").unwrap()
});
static WEEKDAY_PREP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:в\s+|on\s+|ב\s*)").unwrap());

/// Parse a move date: `DD.MM`, `DD.MM.YYYY` (also `/` and `-` separators) or
/// natural language in any of the three languages.
///
/// Window: `today ..= today + 180 days`, both ends inclusive.
pub fn parse_date(text: &str, today: NaiveDate) -> Result<NaiveDate, DateParseError> {
    let cleaned = text.trim().replace(['/', '-'], ".");

    if let Some(caps) = NUMERIC_DATE_RE.captures(&cleaned) {
        let day: u32 = caps[1].parse().map_err(|_| DateParseError::Format)?;
        let month: u32 = caps[2].parse().map_err(|_| DateParseError::Format)?;
        let has_year = caps.get(3).is_some();
        let year = match caps.get(3) {
            Some(m) => m.as_str().parse().map_err(|_| DateParseError::Format)?,
            None => today.year(),
        };

        let mut result =
            NaiveDate::from_ymd_opt(year, month, day).ok_or(DateParseError::InvalidDate)?;

        // DD.MM without a year: a passed date means next year.
        if !has_year && result < today {
            result = NaiveDate::from_ymd_opt(year + 1, month, day)
                .ok_or(DateParseError::InvalidDate)?;
        }

        return validate_date_range(result, today);
    }

    if let Some(natural) = parse_natural_date(text, today)? {
        return validate_date_range(natural, today);
    }

    Err(DateParseError::Format)
}

fn parse_natural_date(
    text: &str,
    today: NaiveDate,
) -> Result<Option<NaiveDate>, DateParseError> {
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() {
        return Ok(None);
    }

    // Relative day keywords, longest first so "послезавтра" beats "завтра".
    for (keyword, offset) in RELATIVE_DAYS {
        if lowered == *keyword || lowered.starts_with(keyword) {
            return Ok(Some(today + Duration::days(*offset)));
        }
    }

    // Weekday, with optional "next ..." or plain preposition prefix.
    let (is_next, stripped) = match NEXT_PREFIX_RE.find(&lowered) {
        Some(m) => (true, lowered[m.end()..].trim().to_string()),
        None => match WEEKDAY_PREP_RE.find(&lowered) {
            Some(m) => (false, lowered[m.end()..].trim().to_string()),
            None => (false, lowered.clone()),
        },
    };
    for (name, weekday) in WEEKDAY_NAMES {
        if stripped == *name || stripped.starts_with(name) {
            let today_wd = today.weekday().num_days_from_monday() as i64;
            let target_wd = weekday.num_days_from_monday() as i64;
            let mut days_ahead = (target_wd - today_wd).rem_euclid(7);
            if days_ahead == 0 {
                days_ahead = 7;
            }
            if is_next {
                days_ahead += 7;
            }
            return Ok(Some(today + Duration::days(days_ahead)));
        }
    }

    // "20 февраля" / "March 5" — tokenize, then look the month word up.
    let tokens: Vec<&str> = lowered.split_whitespace().take(2).collect();
    if let [first, second] = tokens.as_slice() {
        if let (Ok(day), Some(month)) = (first.parse::<u32>(), month_number(second)) {
            return resolve_day_month(day, month, today).map(Some);
        }
        let day_token = second.trim_end_matches(|c: char| c.is_ascii_alphabetic());
        if let (Some(month), Ok(day)) = (month_number(first), day_token.parse::<u32>()) {
            return resolve_day_month(day, month, today).map(Some);
        }
    }

    Ok(None)
}

fn month_number(word: &str) -> Option<u32> {
    MONTH_NAMES.iter().find(|(name, _)| *name == word).map(|(_, month)| *month)
}

fn resolve_day_month(day: u32, month: u32, today: NaiveDate) -> Result<NaiveDate, DateParseError> {
    let this_year =
        NaiveDate::from_ymd_opt(today.year(), month, day).ok_or(DateParseError::InvalidDate)?;
    if this_year >= today {
        return Ok(this_year);
    }
    NaiveDate::from_ymd_opt(today.year() + 1, month, day).ok_or(DateParseError::InvalidDate)
}

fn validate_date_range(result: NaiveDate, today: NaiveDate) -> Result<NaiveDate, DateParseError> {
    if result < today {
        return Err(DateParseError::TooSoon);
    }
    if result > today + Duration::days(MAX_DAYS_AHEAD) {
        return Err(DateParseError::TooFar);
    }
    Ok(result)
}

static EXACT_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").unwrap());

/// Parse `HH:MM` (24-hour); `.` and `-` also accepted as separators.
pub fn parse_exact_time(text: &str) -> Option<String> {
    let cleaned = text.trim().replace(['.', '-'], ":");
    let caps = EXACT_TIME_RE.captures(&cleaned)?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some(format!("{hour:02}:{minute:02}"))
}

// ---------------------------------------------------------------------------
// Room-based volume detection
// ---------------------------------------------------------------------------

use crate::domain::lead::VolumeCategory;

static STUDIO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)студи[оя]|studio|סטודיו").unwrap());
static APARTMENT_ROOMS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*[-–]?\s*(?:комнатн|room\s*apart)").unwrap());
static BEDROOM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:спальн|bedroom)|(\d+)\s*חדרי?\s*שינה").unwrap());
static GENERIC_ROOM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*комнат|(\d+)\s*rooms?\b|(\d+)\s*חדרים").unwrap());
static LIVING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)салон|гостин|living\s*room|סלון").unwrap());

fn room_count_to_volume(count: u32) -> VolumeCategory {
    match count {
        0 | 1 => VolumeCategory::Small,
        2 => VolumeCategory::Medium,
        3 => VolumeCategory::Large,
        _ => VolumeCategory::Xl,
    }
}

/// Detect the move size from room descriptors ("3-комнатная квартира",
/// "2 bedrooms", "סטודיו"). Bedrooms and living rooms count; kitchens do
/// not. Returns `None` when no room keyword is present.
pub fn detect_volume_from_rooms(text: &str) -> Option<VolumeCategory> {
    if text.is_empty() {
        return None;
    }
    let lowered = text.to_lowercase();

    if STUDIO_RE.is_match(&lowered) {
        return Some(VolumeCategory::Small);
    }

    if let Some(caps) = APARTMENT_ROOMS_RE.captures(&lowered) {
        let count: u32 = caps[1].parse().ok()?;
        return Some(room_count_to_volume(count));
    }

    let mut major_rooms = 0u32;
    let mut found = false;

    for re in [&*BEDROOM_RE, &*GENERIC_ROOM_RE] {
        if let Some(caps) = re.captures(&lowered) {
            let digits =
                caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)).map(|m| m.as_str());
            if let Some(raw) = digits {
                if let Ok(count) = raw.parse::<u32>() {
                    major_rooms += count;
                    found = true;
                }
            }
        }
    }
    if LIVING_RE.is_match(&lowered) {
        major_rooms += 1;
        found = true;
    }

    if !found || major_rooms == 0 {
        return None;
    }
    Some(room_count_to_volume(major_rooms))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sanitize_strips_links_and_tags() {
        let cleaned = sanitize_text("see <b>this</b> https://spam.example now", 500).unwrap();
        assert_eq!(cleaned, "see this now");
    }

    #[test]
    fn sanitize_rejects_pure_payloads() {
        assert_eq!(sanitize_text("https://spam.example", 500), None);
        assert_eq!(sanitize_text("javascript:alert(1)", 500), Some("alert(1)".to_string()));
    }

    #[test]
    fn junk_inputs_count_as_too_short() {
        assert!(looks_too_short("ok", 2));
        assert!(looks_too_short("да", 2));
        assert!(looks_too_short("аб", 5));
        assert!(!looks_too_short("диван и шкаф", 5));
    }

    #[test]
    fn language_detection_follows_the_script() {
        assert_eq!(detect_language("Здравствуйте"), Some(Language::Ru));
        assert_eq!(detect_language("hello there"), Some(Language::En));
        assert_eq!(detect_language("שלום לך"), Some(Language::He));
        // Hebrew wins even when mixed with Latin.
        assert_eq!(detect_language("שלום hello"), Some(Language::He));
        // Button press: too few letters.
        assert_eq!(detect_language("1"), None);
    }

    #[test]
    fn intent_lookup_is_exact_match() {
        assert_eq!(detect_intent("Заново"), Some(Intent::Reset));
        assert_eq!(detect_intent("готово"), Some(Intent::DonePhotos));
        assert_eq!(detect_intent("  yes "), Some(Intent::Yes));
        assert_eq!(detect_intent("нет"), Some(Intent::No));
        assert_eq!(detect_intent("диван готово нет"), None);
    }

    #[test]
    fn extras_numbers_only() {
        let (choices, details) = parse_extras_input("1 3");
        assert_eq!(choices, BTreeSet::from(['1', '3']));
        assert_eq!(details, None);
    }

    #[test]
    fn extras_text_only() {
        let (choices, details) = parse_extras_input("5 этаж без лифта");
        assert!(choices.is_empty());
        assert_eq!(details.as_deref(), Some("5 этаж без лифта"));
    }

    #[test]
    fn extras_numbers_plus_comment() {
        let (choices, details) = parse_extras_input("1 3 + нет парковки");
        assert_eq!(choices, BTreeSet::from(['1', '3']));
        assert_eq!(details.as_deref(), Some("нет парковки"));
    }

    #[test]
    fn extras_and_separator() {
        let (choices, details) = parse_extras_input("1 и 2 и нужен лифт");
        assert_eq!(choices, BTreeSet::from(['1', '2']));
        assert_eq!(details.as_deref(), Some("нужен лифт"));
    }

    #[test]
    fn floor_parsing_reads_number_and_elevator() {
        assert_eq!(parse_floor_info("3 этаж, без лифта"), (3, false));
        assert_eq!(parse_floor_info("floor 5, elevator works"), (5, true));
        assert_eq!(parse_floor_info("קומה 2, אין מעלית"), (2, false));
        assert_eq!(parse_floor_info("частный дом"), (1, true));
        assert_eq!(parse_floor_info("7"), (7, true));
    }

    #[test]
    fn numeric_dates_parse_with_and_without_year() {
        let today = date(2026, 3, 1);
        assert_eq!(parse_date("25.03", today), Ok(date(2026, 3, 25)));
        assert_eq!(parse_date("25/03", today), Ok(date(2026, 3, 25)));
        assert_eq!(parse_date("25.03.2026", today), Ok(date(2026, 3, 25)));
    }

    #[test]
    fn passed_dates_without_year_roll_forward() {
        let today = date(2026, 11, 20);
        // 10.01 already passed this year → January next year.
        assert_eq!(parse_date("10.01", today), Ok(date(2027, 1, 10)));
    }

    #[test]
    fn date_window_boundaries() {
        let today = date(2026, 3, 1);
        // Exactly today is accepted.
        assert_eq!(parse_date("01.03.2026", today), Ok(today));
        // Yesterday is too soon.
        assert_eq!(parse_date("28.02.2026", today), Err(DateParseError::TooSoon));
        // today + 180 is the last acceptable day.
        let limit = today + Duration::days(180);
        assert_eq!(parse_date(&limit.format("%d.%m.%Y").to_string(), today), Ok(limit));
        let beyond = today + Duration::days(181);
        assert_eq!(
            parse_date(&beyond.format("%d.%m.%Y").to_string(), today),
            Err(DateParseError::TooFar)
        );
    }

    #[test]
    fn impossible_dates_are_invalid() {
        let today = date(2026, 3, 1);
        assert_eq!(parse_date("31.02", today), Err(DateParseError::InvalidDate));
    }

    #[test]
    fn natural_dates_parse_in_three_languages() {
        let today = date(2026, 3, 2); // a Monday
        assert_eq!(parse_date("завтра", today), Ok(date(2026, 3, 3)));
        assert_eq!(parse_date("tomorrow", today), Ok(date(2026, 3, 3)));
        assert_eq!(parse_date("מחר", today), Ok(date(2026, 3, 3)));
        assert_eq!(parse_date("послезавтра", today), Ok(date(2026, 3, 4)));
        // "в пятницу" → the coming Friday.
        assert_eq!(parse_date("в пятницу", today), Ok(date(2026, 3, 6)));
        // "next friday" skips a week.
        assert_eq!(parse_date("next friday", today), Ok(date(2026, 3, 13)));
        // Day + month name.
        assert_eq!(parse_date("20 марта", today), Ok(date(2026, 3, 20)));
        assert_eq!(parse_date("march 20", today), Ok(date(2026, 3, 20)));
    }

    #[test]
    fn exact_time_normalizes_separators() {
        assert_eq!(parse_exact_time("14:30").as_deref(), Some("14:30"));
        assert_eq!(parse_exact_time("9.05").as_deref(), Some("09:05"));
        assert_eq!(parse_exact_time("25:00"), None);
        assert_eq!(parse_exact_time("noon"), None);
    }

    #[test]
    fn room_volume_detection() {
        assert_eq!(detect_volume_from_rooms("студия в центре"), Some(VolumeCategory::Small));
        assert_eq!(
            detect_volume_from_rooms("3-комнатная квартира"),
            Some(VolumeCategory::Large)
        );
        assert_eq!(detect_volume_from_rooms("2 bedrooms"), Some(VolumeCategory::Medium));
        assert_eq!(detect_volume_from_rooms("4 комнаты"), Some(VolumeCategory::Xl));
        assert_eq!(detect_volume_from_rooms("диван и шкаф"), None);
    }
}
