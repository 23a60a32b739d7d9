//! Display formatting in the es-PY locale.
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

pub const NO_DATE: &str = "---";

const MONTHS: [&str; 12] = ["Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic"];

/// Rounds to a whole number and groups thousands with `.`.
pub fn thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{}", rounded.abs() as u64);
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    if rounded < 0.0 {
        out.insert(0, '-');
    }
    out
}

pub fn guaranies(value: f64) -> String {
    format!("Gs. {}", thousands(value))
}

/// Amount in the invoice currency. USD keeps two decimals with `,`.
pub fn money(value: f64, moneda: &str) -> String {
    match moneda {
        "USD" => {
            let cents = (value.abs() * 100.0).round() as u64;
            let sign = if value < 0.0 { "-" } else { "" };
            format!("US$ {}{},{:02}", sign, thousands((cents / 100) as f64), cents % 100)
        }
        _ => guaranies(value),
    }
}

/// Axis tick: `1,5M`, `250K`, or the plain number.
pub fn compact(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0).replace('.', ",")
    } else if abs >= 1_000.0 {
        format!("{:.0}K", value / 1_000.0)
    } else {
        thousands(value)
    }
}

/// Reads the leading `YYYY-MM-DD` of an ISO date or timestamp.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// `dd/mm/yyyy`, or `---` when missing or unreadable.
pub fn date(raw: Option<&str>) -> String {
    raw.and_then(parse_day)
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| NO_DATE.to_string())
}

/// `dd/mm` for chart axes.
pub fn short_date(raw: &str) -> String {
    parse_day(raw).map(|d| d.format("%d/%m").to_string()).unwrap_or_else(|| raw.to_string())
}

/// `"2025-01"` → `"Ene 25"`.
pub fn month_label(key: &str) -> String {
    let mut parts = key.splitn(2, '-');
    let year = parts.next().unwrap_or("");
    let month = parts.next().and_then(|m| m.parse::<usize>().ok());
    match month {
        Some(m @ 1..=12) if year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit()) => {
            format!("{} {}", MONTHS[m - 1], &year[2..])
        }
        _ => key.to_string(),
    }
}

/// Whole years between birth and `today`, never negative.
pub fn age(birth: &str, today: NaiveDate) -> Option<u32> {
    let b = parse_day(birth)?;
    let mut years = today.year() - b.year();
    if (today.month(), today.day()) < (b.month(), b.day()) {
        years -= 1;
    }
    Some(years.max(0) as u32)
}

pub fn age_label(birth: Option<&str>, today: NaiveDate) -> String {
    match birth.and_then(|b| age(b, today)) {
        Some(a) => format!("{} años", a),
        None => "N/A".to_string(),
    }
}

fn non_digits() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\D+").ok()).as_ref()
}

fn email_shape() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok()).as_ref()
}

/// Strips everything but digits, as the WhatsApp API expects.
pub fn phone_digits(raw: &str) -> String {
    match non_digits() {
        Some(re) => re.replace_all(raw, "").into_owned(),
        None => raw.chars().filter(char::is_ascii_digit).collect(),
    }
}

pub fn looks_like_email(raw: &str) -> bool {
    email_shape().is_some_and(|re| re.is_match(raw.trim()))
}

/// Cuts `name` to `max` characters followed by `...`.
pub fn truncate(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        name.to_string()
    } else {
        format!("{}...", name.chars().take(max).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(thousands(0.0), "0");
        assert_eq!(thousands(999.0), "999");
        assert_eq!(thousands(1234567.4), "1.234.567");
        assert_eq!(thousands(-45000.0), "-45.000");
        assert_eq!(guaranies(150000.0), "Gs. 150.000");
        assert_eq!(money(1234.5, "USD"), "US$ 1.234,50");
    }

    #[test]
    fn compact_ticks() {
        assert_eq!(compact(2_500_000.0), "2,5M");
        assert_eq!(compact(250_000.0), "250K");
        assert_eq!(compact(800.0), "800");
    }

    #[test]
    fn dates() {
        assert_eq!(date(Some("2025-03-07T12:00:00Z")), "07/03/2025");
        assert_eq!(date(Some("ayer")), NO_DATE);
        assert_eq!(date(None), NO_DATE);
        assert_eq!(short_date("2025-03-07"), "07/03");
        assert_eq!(month_label("2025-01"), "Ene 25");
        assert_eq!(month_label("2024-12"), "Dic 24");
        assert_eq!(month_label("Sin fecha"), "Sin fecha");
    }

    #[test]
    fn month_label_keeps_odd_year_keys() {
        assert_eq!(month_label("1é2-05"), "1é2-05");
        assert_eq!(month_label("ab25-05"), "ab25-05");
        assert_eq!(month_label("20x5-05"), "20x5-05");
    }

    #[test]
    fn age_counts_birthday() {
        let today = day("2025-05-15");
        assert_eq!(age("1990-05-15", today), Some(35));
        assert_eq!(age("1990-05-16", today), Some(34));
        assert_eq!(age("2030-01-01", today), Some(0));
        assert_eq!(age_label(None, today), "N/A");
    }

    #[test]
    fn phones_and_emails() {
        assert_eq!(phone_digits("+595 (981) 111-222"), "595981111222");
        assert!(looks_like_email("juan.perez@email.com"));
        assert!(!looks_like_email("juan@"));
        assert_eq!(truncate("Anestesia local lidocaína 2%", 20), "Anestesia local lido...");
        assert_eq!(truncate("Guantes", 20), "Guantes");
    }
}
