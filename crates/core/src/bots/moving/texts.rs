//! Static trilingual text bundle for the moving intake.
//!
//! `text(key, lang)` resolves at call time so the session language can
//! change mid-conversation. Unknown keys fall back to the key itself, which
//! keeps a missing translation visible instead of silently blank.

use crate::domain::session::Language;

pub struct Translation {
    pub ru: &'static str,
    pub en: &'static str,
    pub he: &'static str,
}

impl Translation {
    fn get(&self, lang: Language) -> &'static str {
        match lang {
            Language::Ru => self.ru,
            Language::En => self.en,
            Language::He => self.he,
        }
    }
}

macro_rules! translations {
    ($(($key:literal, $ru:literal, $en:literal, $he:literal)),* $(,)?) => {
        static TRANSLATIONS: &[(&str, Translation)] = &[
            $(($key, Translation { ru: $ru, en: $en, he: $he })),*
        ];
    };
}

translations![
    (
        "welcome",
        "Привет! 👋\nЯ помогу быстро оформить заявку на перевозку.\nЗадам пару вопросов — это займёт 1–2 минуты.",
        "Hello! 👋\nI'll help you quickly arrange a move.\nI'll ask a few questions — it will take 1-2 minutes.",
        "שלום! 👋\nאני אעזור לך לארגן העברה במהירות.\nאשאל כמה שאלות - זה ייקח 1-2 דקות."
    ),
    (
        "welcome_contact",
        "📞 Связаться с оператором: {phone}",
        "📞 Contact operator: {phone}",
        "📞 ליצירת קשר עם המפעיל: {phone}"
    ),
    (
        "hint_can_reset",
        "Если хочешь начать заново — напиши «заново».",
        "If you want to start over — write \"reset\".",
        "אם אתה רוצה להתחיל מחדש - כתוב \"מחדש\"."
    ),
    (
        "hint_stale_resume",
        "У тебя есть незавершённая заявка. Можешь продолжить или написать «заново» чтобы начать сначала.",
        "You have an unfinished request. You can continue or write \"reset\" to start over.",
        "יש לך בקשה שלא הושלמה. אתה יכול להמשיך או לכתוב \"מחדש\" כדי להתחיל מחדש."
    ),
    (
        "q_cargo",
        "Что нужно перевезти?\nМожно коротко или списком.",
        "What needs to be moved?\nBrief description or list.",
        "מה צריך להעביר?\nתיאור קצר או רשימה."
    ),
    (
        "q_volume",
        "Какой примерный объём перевозки?\n1 — маленький (до 1 м³, пара сумок/коробок)\n2 — средний (1–3 м³, несколько предметов мебели)\n3 — большой (3–10 м³, комната или студия)\n4 — очень большой (10+ м³, квартира целиком)",
        "What is the approximate volume of the move?\n1 — small (up to 1 m³, a couple of bags/boxes)\n2 — medium (1-3 m³, several pieces of furniture)\n3 — large (3-10 m³, a room or studio)\n4 — extra large (10+ m³, entire apartment)",
        "מה הנפח המשוער של ההעברה?\n1 — קטן (עד 1 מ״ק, כמה תיקים/קרטונים)\n2 — בינוני (1-3 מ״ק, כמה פריטי ריהוט)\n3 — גדול (3-10 מ״ק, חדר או סטודיו)\n4 — גדול מאוד (10+ מ״ק, דירה שלמה)"
    ),
    (
        "q_pickup_count",
        "Сколько точек забора?\n1 — одна\n2 — две\n3 — три",
        "How many pickup locations?\n1 — one\n2 — two\n3 — three",
        "כמה נקודות איסוף?\n1 — אחת\n2 — שתיים\n3 — שלוש"
    ),
    (
        "q_addr_from",
        "Откуда забираем?\nНапишите адрес или район текстом\nили укажите на карте точку геолокации",
        "Where do we pick up from?\nType an address or district\nor share a map location pin",
        "מאיפה אוספים?\nכתוב כתובת או אזור\nאו שלח נקודת מיקום במפה"
    ),
    (
        "q_floor_from",
        "Какой этаж и есть ли лифт на месте загрузки?",
        "What floor and is there an elevator at the pickup?",
        "באיזו קומה ויש מעלית בנקודת האיסוף?"
    ),
    (
        "q_addr_from_n",
        "📍 Адрес точки забора #{n}:\n(адрес или район)",
        "📍 Pickup location #{n} address:\n(address or district)",
        "📍 כתובת נקודת איסוף #{n}:\n(כתובת או אזור)"
    ),
    (
        "q_floor_from_n",
        "Этаж и лифт на точке забора #{n}:",
        "Floor and elevator at pickup #{n}:",
        "קומה ומעלית בנקודת איסוף #{n}:"
    ),
    (
        "q_addr_to",
        "Куда доставляем?\nНапишите адрес или район текстом\nили укажите на карте точку геолокации",
        "Where do we deliver to?\nType an address or district\nor share a map location pin",
        "לאן מוסרים?\nכתוב כתובת או אזור\nאו שלח נקודת מיקום במפה"
    ),
    (
        "q_floor_to",
        "Какой этаж и есть ли лифт на месте выгрузки?",
        "What floor and is there an elevator at the delivery?",
        "באיזו קומה ויש מעלית בנקודת המסירה?"
    ),
    (
        "q_date",
        "Когда планируется перевозка?\n1 — завтра\n2 — в течение недели\n3 — выбрать конкретную дату\nили напишите дату текстом.",
        "When is the move planned?\n1 — tomorrow\n2 — within the next week\n3 — choose specific date\nor write the date as text.",
        "מתי מתוכנן המעבר?\n1 — מחר\n2 — במהלך השבוע\n3 — בחר תאריך ספציפי\nאו כתוב את התאריך בטקסט."
    ),
    (
        "q_specific_date",
        "Укажите дату в формате ДД.ММ или ДД.ММ.ГГГГ\nНапример: 25.03 или 25.03.2026",
        "Enter the date in DD.MM or DD.MM.YYYY format\nFor example: 25.03 or 25.03.2026",
        "הזן את התאריך בפורמט DD.MM או DD.MM.YYYY\nלדוגמה: 25.03 או 25.03.2026"
    ),
    (
        "q_time_slot",
        "В какое время удобно?\n1 — утро (08:00–12:00)\n2 — день (12:00–17:00)\n3 — вечер (17:00–21:00)\n4 — точное время",
        "What time works for you?\n1 — morning (08:00-12:00)\n2 — afternoon (12:00-17:00)\n3 — evening (17:00-21:00)\n4 — exact time",
        "מתי נוח לך?\n1 — בוקר (08:00-12:00)\n2 — צהריים (12:00-17:00)\n3 — ערב (17:00-21:00)\n4 — שעה מדויקת"
    ),
    (
        "q_exact_time",
        "Напишите время в формате ЧЧ:ММ (24-часовой)\nНапример: 14:30",
        "Write the time in HH:MM format (24-hour)\nFor example: 14:30",
        "כתוב את השעה בפורמט HH:MM (24 שעות)\nלדוגמה: 14:30"
    ),
    (
        "q_photo_menu",
        "Фото груза есть?\n1 — Да, отправлю фото\n2 — Нет фото",
        "Do you have photos?\n1 — Yes, I'll send photos\n2 — No photos",
        "יש לך תמונות?\n1 — כן, אני אשלח תמונות\n2 — אין תמונות"
    ),
    (
        "q_photo_menu_rooms",
        "Для переезда из квартиры фото помогут нам дать точную оценку! 📸\n1 — Да, отправлю фото\n2 — Нет фото",
        "For apartment moves, photos help us give a much more accurate estimate! 📸\n1 — Yes, I'll send photos\n2 — No photos",
        "להעברת דירה, תמונות עוזרות לנו לתת הערכה מדויקת יותר! 📸\n1 — כן, אני אשלח תמונות\n2 — אין תמונות"
    ),
    (
        "q_photo_wait",
        "Ок, пришлите фото одним или несколькими сообщениями.\nКогда закончите — напишите «готово».",
        "OK, send photos in one or more messages.\nWhen finished — write \"done\".",
        "אוקיי, שלח תמונות בהודעה אחת או יותר.\nכשתסיים - כתוב \"סיימתי\"."
    ),
    (
        "q_extras",
        "Нужны доп. услуги?\n1 — грузчики\n2 — сборка/разборка\n3 — упаковка\n4 — ничего из этого\nМожно выбрать несколько: 1 3\nИли с комментарием, пример: 1 3 + нет парковки\nИли только текст с деталями.",
        "Need extra services?\n1 — movers\n2 — assembly/disassembly\n3 — packing\n4 — none of these\nCan choose multiple: 1 3\nOr with comment: 1 3 + 5th floor, no elevator\nOr just text with details.",
        "צריך שירותים נוספים?\n1 — סבלים\n2 — הרכבה/פירוק\n3 — אריזה\n4 — אף אחד מאלה\nאפשר לבחור כמה: 1 3\nאו עם הערה: 1 3 + קומה 5, בלי מעלית\nאו רק טקסט עם פרטים."
    ),
    (
        "estimate_summary",
        "📋 Примерная стоимость перевозки:\n💰 {min_price}–{max_price} ₪\n\nЭто предварительная оценка. Точная цена будет согласована с исполнителем.\n\nВсё верно? Отправляем заявку?\n1 — Да, отправить\n2 — Начать заново",
        "📋 Estimated moving cost:\n💰 {min_price}–{max_price} ₪\n\nThis is a preliminary estimate. The exact price will be agreed with the mover.\n\nIs everything correct? Submit the request?\n1 — Yes, submit\n2 — Start over",
        "📋 עלות משוערת להעברה:\n💰 {min_price}–{max_price} ₪\n\nזהו אומדן ראשוני. המחיר המדויק יסוכם עם המוביל.\n\nהכל נכון? שולחים את הבקשה?\n1 — כן, שלח\n2 — התחל מחדש"
    ),
    (
        "estimate_no_price",
        "📋 Мы не смогли точно рассчитать стоимость по описанию.\n\nНаш менеджер свяжется с вами для уточнения.\n\nОтправляем заявку?\n1 — Да, отправить\n2 — Начать заново",
        "📋 We couldn't calculate an accurate estimate from the description.\n\nOur manager will contact you for details.\n\nSubmit the request?\n1 — Yes, submit\n2 — Start over",
        "📋 לא הצלחנו לחשב הערכה מדויקת מהתיאור.\n\nהמנהל שלנו ייצור איתך קשר לפרטים.\n\nשולחים את הבקשה?\n1 — כן, שלח\n2 — התחל מחדש"
    ),
    (
        "done",
        "Спасибо! Я передал информацию оператору, он скоро свяжется с вами 👍",
        "Thank you! I've sent the information to the operator, they will contact you soon 👍",
        "תודה! העברתי את המידע למפעיל, הוא ייצור איתך קשר בקרוב 👍"
    ),
    (
        "ack_landing_prefill",
        "Спасибо за заявку с сайта! 👋\nЯ уже получил ваши данные. Уточню пару деталей.",
        "Thanks for the website inquiry! 👋\nI've got your details. Let me confirm a few things.",
        "תודה על הפנייה מהאתר! 👋\nקיבלתי את הפרטים. אוודא כמה דברים."
    ),
    (
        "q_confirm_addresses",
        "Вы указали:\n📍 Откуда: {addr_from}\n📍 Куда: {addr_to}\n\nХотите уточнить адреса (улица, дом, этаж)?\n1 — Да, уточню адреса\n2 — Нет, продолжить без уточнения",
        "You provided:\n📍 From: {addr_from}\n📍 To: {addr_to}\n\nWould you like to specify full addresses (street, building, floor)?\n1 — Yes, I'll provide details\n2 — No, continue without",
        "ציינת:\n📍 מ: {addr_from}\n📍 אל: {addr_to}\n\nרוצה לפרט כתובות מלאות (רחוב, בניין, קומה)?\n1 — כן, אפרט\n2 — לא, להמשיך בלי"
    ),
    (
        "err_confirm_addresses",
        "Выбери: 1 — уточнить адреса, 2 — продолжить.",
        "Please choose: 1 — specify addresses, 2 — continue.",
        "אנא בחר: 1 — לפרט כתובות, 2 — להמשיך."
    ),
    (
        "err_rejected_input",
        "Не удалось обработать сообщение. Пожалуйста, отправьте текст без ссылок.",
        "Could not process the message. Please send text without links.",
        "לא ניתן לעבד את ההודעה. אנא שלח טקסט ללא קישורים."
    ),
    (
        "err_cargo_too_short",
        "Можешь чуть подробнее? Например: «диван, холодильник, коробки».",
        "Can you be more specific? For example: \"sofa, fridge, boxes\".",
        "אתה יכול להיות יותר ספציפי? למשל: \"ספה, מקרר, קרטונים\"."
    ),
    (
        "err_volume_choice",
        "Выбери вариант: 1, 2, 3 или 4.",
        "Please choose an option: 1, 2, 3, or 4.",
        "אנא בחר אפשרות: 1, 2, 3 או 4."
    ),
    (
        "err_pickup_count",
        "Выбери: 1, 2 или 3.",
        "Please choose: 1, 2, or 3.",
        "אנא בחר: 1, 2 או 3."
    ),
    (
        "err_addr_too_short",
        "Подскажи хотя бы город или район. Например: «Tel Aviv, ул. Дизенгоф 50».",
        "Please provide at least a city or district. For example: \"Tel Aviv, 50 Dizengoff St\".",
        "אנא ספק לפחות עיר או אזור. למשל: \"תל אביב, דיזנגוף 50\"."
    ),
    (
        "err_floor_too_short",
        "Напиши хотя бы этаж, например: «3 этаж, лифт есть» или «частный дом».",
        "Please provide at least the floor, e.g.: \"3rd floor, elevator available\" or \"private house\".",
        "אנא ציין לפחות את הקומה, למשל: \"קומה 3, יש מעלית\" או \"בית פרטי\"."
    ),
    (
        "err_date_choice",
        "Выбери вариант: 1, 2 или 3 — или напиши дату текстом.",
        "Please choose an option: 1, 2, or 3 — or write the date as text.",
        "אנא בחר אפשרות: 1, 2 או 3 — או כתוב את התאריך בטקסט."
    ),
    (
        "err_date_format",
        "Не могу разобрать дату. Напиши в формате ДД.ММ или ДД.ММ.ГГГГ\nНапример: 25.03 или 25.03.2026",
        "Can't parse the date. Please use DD.MM or DD.MM.YYYY format\nFor example: 25.03 or 25.03.2026",
        "לא מצליח לפענח את התאריך. אנא השתמש בפורמט DD.MM או DD.MM.YYYY\nלדוגמה: 25.03 או 25.03.2026"
    ),
    (
        "err_date_invalid",
        "Такой даты не существует. Проверь и попробуй ещё раз.",
        "This date doesn't exist. Please check and try again.",
        "התאריך הזה לא קיים. אנא בדוק ונסה שוב."
    ),
    (
        "err_date_too_soon",
        "Эта дата уже прошла. Укажи сегодняшнюю или более позднюю дату.",
        "That date has already passed. Please choose today or a later date.",
        "התאריך הזה כבר עבר. אנא בחר את היום או תאריך מאוחר יותר."
    ),
    (
        "err_date_too_far",
        "Слишком далёкая дата (максимум 180 дней). Укажи другую дату.",
        "The date is too far in the future (max 180 days). Please choose another date.",
        "התאריך רחוק מדי (מקסימום 180 ימים). אנא בחר תאריך אחר."
    ),
    (
        "err_time_slot_choice",
        "Выбери вариант: 1, 2, 3 или 4.",
        "Please choose an option: 1, 2, 3, or 4.",
        "אנא בחר אפשרות: 1, 2, 3 או 4."
    ),
    (
        "err_exact_time_format",
        "Не могу разобрать время. Напиши в формате ЧЧ:ММ, например: 14:30",
        "Can't parse the time. Please use HH:MM format, e.g.: 14:30",
        "לא מצליח לפענח את השעה. אנא השתמש בפורמט HH:MM, למשל: 14:30"
    ),
    (
        "err_photo_menu",
        "Можно выбрать:\n1 — отправлю фото\n2 — нет фото",
        "You can choose:\n1 — I'll send photos\n2 — no photos",
        "אתה יכול לבחור:\n1 — אני אשלח תמונות\n2 — אין תמונות"
    ),
    (
        "err_extras_empty",
        "Если ничего не нужно — напиши «нет». Иначе опиши детали в одном сообщении.",
        "If nothing is needed — write \"no\". Otherwise describe details in one message.",
        "אם אין צורך בכלום - כתוב \"לא\". אחרת תאר פרטים בהודעה אחת."
    ),
    (
        "err_estimate_choice",
        "Выбери: 1 — отправить заявку, 2 — начать заново.",
        "Please choose: 1 — submit request, 2 — start over.",
        "אנא בחר: 1 — שלח בקשה, 2 — התחל מחדש."
    ),
    (
        "info_photo_wait",
        "Пришли фото сообщениями. Когда закончишь — напиши «готово».",
        "Send photos in messages. When finished — write \"done\".",
        "שלח תמונות בהודעות. כשתסיים - כתוב \"סיימתי\"."
    ),
    (
        "info_photo_received_first",
        "Фото получил 👍 Пришли ещё, если нужно. Когда закончишь — напиши «готово».",
        "Photo received 👍 Send more if needed. When finished — write \"done\".",
        "תמונה התקבלה 👍 שלח עוד אם צריך. כשתסיים - כתוב \"סיימתי\"."
    ),
    (
        "info_photo_received_late",
        "Фото получил 👍 Если хочешь оформить заявку заново — напиши «заново».",
        "Photo received 👍 If you want to start over — write \"reset\".",
        "תמונה התקבלה 👍 אם אתה רוצה להתחיל מחדש - כתוב \"מחדש\"."
    ),
    (
        "info_already_done",
        "Заявка уже оформлена. Если нужно — напишите уточнение.",
        "Request already completed. If needed — write clarification.",
        "הבקשה כבר הושלמה. אם צריך - כתוב הבהרה."
    ),
    (
        "info_location_saved",
        "📍 Геолокация получена.",
        "📍 Location received.",
        "📍 מיקום התקבל."
    ),
    (
        "info_location_ignored",
        "📍 Отправка геолокации на этом шаге не поддерживается. Пожалуйста, отправьте текстом.",
        "📍 Location sharing is not supported at this step. Please type your answer.",
        "📍 שליחת מיקום לא נתמכת בשלב זה. אנא כתוב את תשובתך."
    ),
];

/// Resolve a translation. A missing key is a programming error; surfacing
/// the raw key in chat is the least bad failure mode.
pub fn text(key: &'static str, lang: Language) -> &'static str {
    TRANSLATIONS.iter().find(|(k, _)| *k == key).map(|(_, t)| t.get(lang)).unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_keys_have_three_nonempty_languages() {
        for (key, t) in TRANSLATIONS {
            assert!(!t.ru.is_empty(), "{key} missing ru");
            assert!(!t.en.is_empty(), "{key} missing en");
            assert!(!t.he.is_empty(), "{key} missing he");
        }
    }

    #[test]
    fn lookup_resolves_per_language() {
        assert!(text("q_cargo", Language::Ru).contains("перевезти"));
        assert!(text("q_cargo", Language::En).contains("moved"));
        assert!(text("q_cargo", Language::He).contains("להעביר"));
    }

    #[test]
    fn unknown_key_falls_back_to_itself() {
        assert_eq!(text("no_such_key", Language::En), "no_such_key");
    }
}
