//! Item extraction from raw cargo text.
//!
//! Quantity policy, in priority order:
//! 1. explicit markers (`x5`, `5x`, `5шт`, `5 штук`, `5 pcs`, `qty:5`) —
//!    always honored;
//! 2. a digit glued to an attribute suffix (doors, seats, weight, volume,
//!    dimensions) — suppressed, qty = 1;
//! 3. a bare number ≤ 200 — used; anything else — qty = 1.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::bots::moving::catalog::{ALIAS_LOOKUP, ITEM_CATALOG};
use crate::domain::lead::CargoItem;

/// Dimension expressions ("120x60", "200×90×40 см") are stripped before the
/// text is split, so their numbers never read as quantities.
static DIMENSIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d+\s*[x×хХ]\s*\d+(\s*[x×хХ]\s*\d+)?(\s*(см|cm|мм|mm))?").unwrap()
});

static SEPARATORS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[,;\n]+|\s+и\s+|\s+and\s+|\s*\+\s*").unwrap());

static EXPLICIT_QTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:(\d+)\s*[xх×])|(?:[xх×]\s*(\d+))|(?:(\d+)\s*(?:шт\.?|штук))|(?:(\d+)\s*(?:pcs|pieces))|(?:qty\s*[:=]\s*(\d+))",
    )
    .unwrap()
});

/// A digit adjacent to one of these suffixes is an attribute (doors, seats,
/// weight, volume, dimension), not a quantity.
static ATTR_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\d+[\s\-]*(?:двер|местн|seater|кг|kg|л\b|l\b|см|cm|мм|mm|м\b|m\b)",
    )
    .unwrap()
});

static BARE_QTY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Unit words between a quantity and the item: "5 шт коробок" → "5 коробок".
static UNIT_STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:шт\.?|штук)\s*").unwrap());

const BARE_QTY_CAP: u32 = 200;

/// Extract recognised items from a cargo description. Best effort: unknown
/// words are skipped silently. Repeated keys accumulate their quantities.
pub fn extract_items(text: &str) -> Vec<CargoItem> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let stripped = DIMENSIONS_RE.replace_all(text, " ");

    // Accumulate per catalog index, preserving first-seen order.
    let mut order: Vec<usize> = Vec::new();
    let mut quantities: BTreeMap<usize, u32> = BTreeMap::new();

    for fragment in SEPARATORS_RE.split(&stripped) {
        let fragment = fragment.trim().to_lowercase();
        if fragment.is_empty() {
            continue;
        }
        let fragment = UNIT_STRIP_RE.replace_all(&fragment, "$1 ").trim().to_string();

        let Some((alias, index)) =
            ALIAS_LOOKUP.iter().find(|(alias, _)| fragment.contains(alias)).copied()
        else {
            continue;
        };
        let remainder = fragment.replacen(alias, "", 1).trim().to_string();

        let qty = quantity_from_remainder(&remainder);

        if !quantities.contains_key(&index) {
            order.push(index);
        }
        *quantities.entry(index).or_insert(0) += qty;
    }

    order
        .into_iter()
        .map(|index| ITEM_CATALOG[index].to_item(quantities[&index]))
        .collect()
}

fn quantity_from_remainder(remainder: &str) -> u32 {
    if remainder.is_empty() {
        return 1;
    }

    if let Some(caps) = EXPLICIT_QTY_RE.captures(remainder) {
        let digits = (1..=5).find_map(|i| caps.get(i)).map(|m| m.as_str());
        if let Some(raw) = digits {
            if let Ok(qty) = raw.parse::<u32>() {
                if qty > 0 {
                    return qty;
                }
            }
        }
    }

    if ATTR_SUFFIX_RE.is_match(remainder) {
        return 1;
    }

    if let Some(m) = BARE_QTY_RE.find(remainder) {
        if let Ok(qty) = m.as_str().parse::<u32>() {
            if qty > 0 && qty <= BARE_QTY_CAP {
                return qty;
            }
        }
    }

    1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(items: &[CargoItem]) -> Vec<(&str, u32)> {
        items.iter().map(|item| (item.key.as_str(), item.qty)).collect()
    }

    #[test]
    fn splits_on_commas_and_conjunctions() {
        let items = extract_items("Холодильник, диван и шкаф");
        assert_eq!(keys(&items), vec![("fridge", 1), ("sofa", 1), ("wardrobe", 1)]);
    }

    #[test]
    fn explicit_markers_always_win() {
        assert_eq!(keys(&extract_items("коробки x5")), vec![("boxes", 5)]);
        assert_eq!(keys(&extract_items("5шт коробок")), vec![("boxes", 5)]);
        assert_eq!(keys(&extract_items("boxes qty:12")), vec![("boxes", 12)]);
        assert_eq!(keys(&extract_items("chairs 6 pcs")), vec![("chair", 6)]);
    }

    #[test]
    fn attribute_digits_do_not_multiply() {
        // Weight and door counts are attributes, not quantities.
        let items = extract_items("Холодильник 200кг, 5 дверный шкаф");
        assert_eq!(keys(&items), vec![("fridge", 1), ("wardrobe", 1)]);
        assert_eq!(keys(&extract_items("3 местный диван")), vec![("sofa", 1)]);
        assert_eq!(keys(&extract_items("3 seater sofa")), vec![("sofa", 1)]);
    }

    #[test]
    fn bare_numbers_count_up_to_the_cap() {
        assert_eq!(keys(&extract_items("10 коробок")), vec![("boxes", 10)]);
        assert_eq!(keys(&extract_items("200 коробок")), vec![("boxes", 200)]);
        // 615 without a marker is noise (a model number), not a quantity.
        assert_eq!(keys(&extract_items("615 коробок")), vec![("boxes", 1)]);
    }

    #[test]
    fn dimensions_are_stripped_before_parsing() {
        let items = extract_items("стол 120x60 см");
        assert_eq!(keys(&items), vec![("table", 1)]);
        let items = extract_items("шкаф 200×90×40");
        assert_eq!(keys(&items), vec![("wardrobe", 1)]);
    }

    #[test]
    fn longest_alias_beats_prefix() {
        let items = extract_items("детская кровать");
        assert_eq!(keys(&items), vec![("kids_bed", 1)]);
        let items = extract_items("обеденный стол и стол");
        assert_eq!(keys(&items), vec![("dining_table", 1), ("table", 1)]);
    }

    #[test]
    fn repeated_items_accumulate() {
        let items = extract_items("диван, диван");
        assert_eq!(keys(&items), vec![("sofa", 2)]);
    }

    #[test]
    fn unknown_words_are_skipped() {
        assert!(extract_items("слон и жираф").is_empty());
        assert!(extract_items("").is_empty());
    }

    #[test]
    fn items_carry_catalog_prices_and_heavy_flag() {
        let items = extract_items("пианино");
        assert_eq!(items.len(), 1);
        assert!(items[0].heavy);
        assert!(items[0].price_min > 0);
        assert!(items[0].price_max >= items[0].price_min);
    }
}
