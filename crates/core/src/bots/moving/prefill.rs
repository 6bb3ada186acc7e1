//! Landing-page prefill parsing.
//!
//! The landing form sends a structured first message: a fixed greeting line
//! followed by `Key: value` pairs. Each field value is sanitised on its own
//! so one hostile field cannot poison the rest.

use crate::bots::moving::validators::sanitize_text;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LandingPrefill {
    pub move_type: Option<String>,
    pub addr_from: Option<String>,
    pub addr_to: Option<String>,
    pub date_text: Option<String>,
    pub details: Option<String>,
}

const LANDING_SIGNATURE: &str = "здравствуйте! хочу узнать стоимость переезда.";

const LANDING_FIELDS: &[(&str, usize)] = &[
    ("тип:", 100),
    ("откуда:", 200),
    ("куда:", 200),
    ("дата:", 100),
    ("детали:", 500),
];

const VALID_MOVE_TYPES: &[&str] =
    &["квартира", "офис", "только машина + водитель", "подъёмник / window lift"];

/// Detect and parse a landing prefill message. `None` when the first line
/// does not carry the landing signature.
pub fn parse_landing_prefill(text: &str) -> Option<LandingPrefill> {
    let cleaned = sanitize_text(text, 2000)?;
    if cleaned.is_empty() {
        return None;
    }

    let mut lines = cleaned.split('\n');
    let first_line = lines.next()?.trim().to_lowercase();
    if !first_line.starts_with(LANDING_SIGNATURE) {
        return None;
    }

    let mut result = LandingPrefill::default();

    for line in lines {
        let stripped = line.trim();
        if stripped.is_empty() {
            continue;
        }
        let stripped_lower = stripped.to_lowercase();

        for (prefix, max_len) in LANDING_FIELDS {
            if !stripped_lower.starts_with(prefix) {
                continue;
            }
            let raw_value = stripped[prefix.len()..].trim();
            if raw_value.is_empty() {
                break;
            }
            let Some(safe_value) = sanitize_text(raw_value, *max_len) else {
                // Entire field was a payload.
                break;
            };
            if safe_value.is_empty() {
                break;
            }
            match *prefix {
                "тип:" => result.move_type = Some(safe_value),
                "откуда:" => result.addr_from = Some(safe_value),
                "куда:" => result.addr_to = Some(safe_value),
                "дата:" => result.date_text = Some(safe_value),
                "детали:" => result.details = Some(safe_value),
                _ => {}
            }
            break;
        }
    }

    // Move type outside the allowlist is dropped, not rejected.
    if let Some(ref move_type) = result.move_type {
        if !VALID_MOVE_TYPES.contains(&move_type.to_lowercase().as_str()) {
            result.move_type = None;
        }
    }

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Здравствуйте! Хочу узнать стоимость переезда.\n\
Тип: Квартира\n\
Откуда: Хайфа\n\
Куда: Тель-Авив\n\
Дата: 25.03\n\
Детали: Холодильник, диван";

    #[test]
    fn parses_all_fields() {
        let prefill = parse_landing_prefill(SAMPLE).expect("signature present");
        assert_eq!(prefill.move_type.as_deref(), Some("Квартира"));
        assert_eq!(prefill.addr_from.as_deref(), Some("Хайфа"));
        assert_eq!(prefill.addr_to.as_deref(), Some("Тель-Авив"));
        assert_eq!(prefill.date_text.as_deref(), Some("25.03"));
        assert_eq!(prefill.details.as_deref(), Some("Холодильник, диван"));
    }

    #[test]
    fn ordinary_greeting_is_not_a_prefill() {
        assert_eq!(parse_landing_prefill("Здравствуйте"), None);
        assert_eq!(parse_landing_prefill("привет, сколько стоит переезд?"), None);
    }

    #[test]
    fn unknown_move_type_is_dropped() {
        let message = "Здравствуйте! Хочу узнать стоимость переезда.\nТип: Дворец\nОткуда: Хайфа";
        let prefill = parse_landing_prefill(message).expect("signature present");
        assert_eq!(prefill.move_type, None);
        assert_eq!(prefill.addr_from.as_deref(), Some("Хайфа"));
    }

    #[test]
    fn hostile_field_is_discarded_alone() {
        let message = "Здравствуйте! Хочу узнать стоимость переезда.\n\
Откуда: https://spam.example\n\
Куда: Тель-Авив";
        let prefill = parse_landing_prefill(message).expect("signature present");
        assert_eq!(prefill.addr_from, None);
        assert_eq!(prefill.addr_to.as_deref(), Some("Тель-Авив"));
    }

    #[test]
    fn missing_fields_stay_none() {
        let message = "Здравствуйте! Хочу узнать стоимость переезда.";
        let prefill = parse_landing_prefill(message).expect("signature present");
        assert_eq!(prefill, LandingPrefill::default());
    }
}
