//! Item catalog: canonical keys, ILS price ranges, trilingual labels and
//! aliases.
//!
//! Alias matching is substring-based over the lowercased fragment, longest
//! alias first, so "детская кровать" wins over "кровать" and
//! "обеденный стол" over "стол".

use std::sync::LazyLock;

use crate::domain::lead::CargoItem;
use crate::domain::session::Language;

pub struct ItemSpec {
    pub key: &'static str,
    pub price_min: i64,
    pub price_max: i64,
    pub heavy: bool,
    pub label_ru: &'static str,
    pub label_en: &'static str,
    pub label_he: &'static str,
    pub aliases: &'static [&'static str],
}

impl ItemSpec {
    pub fn label(&self, lang: Language) -> &'static str {
        match lang {
            Language::Ru => self.label_ru,
            Language::En => self.label_en,
            Language::He => self.label_he,
        }
    }

    pub fn to_item(&self, qty: u32) -> CargoItem {
        CargoItem {
            key: self.key.to_string(),
            qty,
            price_min: self.price_min,
            price_max: self.price_max,
            heavy: self.heavy,
        }
    }
}

pub static ITEM_CATALOG: &[ItemSpec] = &[
    ItemSpec {
        key: "fridge",
        price_min: 200,
        price_max: 400,
        heavy: true,
        label_ru: "холодильник",
        label_en: "fridge",
        label_he: "מקרר",
        aliases: &["холодильник", "fridge", "refrigerator", "מקרר"],
    },
    ItemSpec {
        key: "sofa",
        price_min: 150,
        price_max: 350,
        heavy: false,
        label_ru: "диван",
        label_en: "sofa",
        label_he: "ספה",
        aliases: &["диван", "sofa", "couch", "ספה"],
    },
    ItemSpec {
        key: "wardrobe",
        price_min: 150,
        price_max: 400,
        heavy: false,
        label_ru: "шкаф",
        label_en: "wardrobe",
        label_he: "ארון",
        aliases: &["шкаф", "wardrobe", "closet", "ארון"],
    },
    ItemSpec {
        key: "kids_bed",
        price_min: 80,
        price_max: 180,
        heavy: false,
        label_ru: "детская кровать",
        label_en: "kids bed",
        label_he: "מיטת ילדים",
        aliases: &["детская кровать", "kids bed", "crib", "מיטת תינוק", "מיטת ילדים"],
    },
    ItemSpec {
        key: "bed",
        price_min: 100,
        price_max: 250,
        heavy: false,
        label_ru: "кровать",
        label_en: "bed",
        label_he: "מיטה",
        aliases: &["кровать", "bed", "מיטה"],
    },
    ItemSpec {
        key: "washing_machine",
        price_min: 150,
        price_max: 300,
        heavy: true,
        label_ru: "стиральная машина",
        label_en: "washing machine",
        label_he: "מכונת כביסה",
        aliases: &["стиральная машина", "стиралка", "washing machine", "washer", "מכונת כביסה"],
    },
    ItemSpec {
        key: "dryer",
        price_min: 100,
        price_max: 220,
        heavy: false,
        label_ru: "сушильная машина",
        label_en: "dryer",
        label_he: "מייבש",
        aliases: &["сушильная машина", "сушилка", "dryer", "מייבש"],
    },
    ItemSpec {
        key: "dishwasher",
        price_min: 100,
        price_max: 220,
        heavy: false,
        label_ru: "посудомоечная машина",
        label_en: "dishwasher",
        label_he: "מדיח כלים",
        aliases: &["посудомоечная машина", "посудомойка", "dishwasher", "מדיח כלים", "מדיח"],
    },
    ItemSpec {
        key: "oven",
        price_min: 80,
        price_max: 200,
        heavy: false,
        label_ru: "плита",
        label_en: "oven",
        label_he: "תנור",
        aliases: &["духовка", "плита", "oven", "stove", "תנור"],
    },
    ItemSpec {
        key: "dining_table",
        price_min: 100,
        price_max: 250,
        heavy: false,
        label_ru: "обеденный стол",
        label_en: "dining table",
        label_he: "שולחן אוכל",
        aliases: &["обеденный стол", "dining table", "שולחן אוכל"],
    },
    ItemSpec {
        key: "desk",
        price_min: 80,
        price_max: 180,
        heavy: false,
        label_ru: "письменный стол",
        label_en: "desk",
        label_he: "שולחן כתיבה",
        aliases: &["письменный стол", "desk", "שולחן כתיבה"],
    },
    ItemSpec {
        key: "table",
        price_min: 60,
        price_max: 150,
        heavy: false,
        label_ru: "стол",
        label_en: "table",
        label_he: "שולחן",
        aliases: &["стол", "table", "שולחן"],
    },
    ItemSpec {
        key: "chair",
        price_min: 10,
        price_max: 30,
        heavy: false,
        label_ru: "стул",
        label_en: "chair",
        label_he: "כיסא",
        aliases: &["стулья", "стул", "chairs", "chair", "כיסאות", "כיסא"],
    },
    ItemSpec {
        key: "armchair",
        price_min: 60,
        price_max: 150,
        heavy: false,
        label_ru: "кресло",
        label_en: "armchair",
        label_he: "כורסה",
        aliases: &["кресло", "armchair", "כורסה"],
    },
    ItemSpec {
        key: "bookshelf",
        price_min: 80,
        price_max: 200,
        heavy: false,
        label_ru: "стеллаж",
        label_en: "bookshelf",
        label_he: "כוננית",
        aliases: &["книжный шкаф", "стеллаж", "bookshelf", "shelving", "כוננית"],
    },
    ItemSpec {
        key: "boxes",
        price_min: 10,
        price_max: 25,
        heavy: false,
        label_ru: "коробки",
        label_en: "boxes",
        label_he: "קרטונים",
        aliases: &["коробок", "коробки", "коробка", "boxes", "box", "קרטונים", "קרטון"],
    },
    ItemSpec {
        key: "tv",
        price_min: 50,
        price_max: 120,
        heavy: false,
        label_ru: "телевизор",
        label_en: "TV",
        label_he: "טלוויזיה",
        aliases: &["телевизор", "television", "tv", "טלוויזיה"],
    },
    ItemSpec {
        key: "mattress",
        price_min: 50,
        price_max: 120,
        heavy: false,
        label_ru: "матрас",
        label_en: "mattress",
        label_he: "מזרן",
        aliases: &["матрас", "mattress", "מזרן"],
    },
    ItemSpec {
        key: "dresser",
        price_min: 80,
        price_max: 180,
        heavy: false,
        label_ru: "комод",
        label_en: "dresser",
        label_he: "שידה",
        aliases: &["комод", "chest of drawers", "dresser", "שידה"],
    },
    ItemSpec {
        key: "piano",
        price_min: 800,
        price_max: 1600,
        heavy: true,
        label_ru: "пианино",
        label_en: "piano",
        label_he: "פסנתר",
        aliases: &["пианино", "рояль", "piano", "פסנתר"],
    },
    ItemSpec {
        key: "safe",
        price_min: 400,
        price_max: 1000,
        heavy: true,
        label_ru: "сейф",
        label_en: "safe",
        label_he: "כספת",
        aliases: &["сейф", "safe", "כספת"],
    },
    ItemSpec {
        key: "treadmill",
        price_min: 150,
        price_max: 350,
        heavy: true,
        label_ru: "беговая дорожка",
        label_en: "treadmill",
        label_he: "הליכון",
        aliases: &["беговая дорожка", "treadmill", "הליכון"],
    },
    ItemSpec {
        key: "microwave",
        price_min: 30,
        price_max: 80,
        heavy: false,
        label_ru: "микроволновка",
        label_en: "microwave",
        label_he: "מיקרוגל",
        aliases: &["микроволновка", "микроволновая печь", "microwave", "מיקרוגל"],
    },
    ItemSpec {
        key: "bike",
        price_min: 40,
        price_max: 100,
        heavy: false,
        label_ru: "велосипед",
        label_en: "bike",
        label_he: "אופניים",
        aliases: &["велосипед", "bicycle", "bike", "אופניים"],
    },
];

/// `(alias, catalog index)` pairs sorted longest-alias-first.
pub static ALIAS_LOOKUP: LazyLock<Vec<(&'static str, usize)>> = LazyLock::new(|| {
    let mut lookup: Vec<(&'static str, usize)> = Vec::new();
    for (index, spec) in ITEM_CATALOG.iter().enumerate() {
        for alias in spec.aliases {
            lookup.push((alias, index));
        }
    }
    lookup.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()).then(a.0.cmp(b.0)));
    lookup
});

pub fn find_spec(key: &str) -> Option<&'static ItemSpec> {
    ITEM_CATALOG.iter().find(|spec| spec.key == key)
}

pub fn item_label(key: &str, lang: Language) -> Option<&'static str> {
    find_spec(key).map(|spec| spec.label(lang))
}
