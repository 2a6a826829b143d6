//! Formatting and validation helpers.
//!
//! Pure functions with no remote interaction: date and price rendering,
//! id generation and syntactic email checks.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, FixedOffset, Offset, TimeZone, Utc};
use regex::Regex;
use serde_json::Value;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

const BENGALI_ZERO: u32 = 0x09E6;

const DHAKA_UTC_OFFSET_SECS: i32 = 6 * 3600;

/// Rendering locale for dates and prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    /// Bengali (Bangladesh): Bengali digits, lakh grouping, taka.
    #[default]
    BnBd,
    /// English (United States): ASCII digits, thousands grouping, dollars.
    EnUs,
}

impl Locale {
    /// Zone dates are rendered in. Asia/Dhaka observes no DST.
    fn offset(&self) -> FixedOffset {
        match self {
            Locale::BnBd => FixedOffset::east_opt(DHAKA_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix()),
            Locale::EnUs => Utc.fix(),
        }
    }

    fn localize_digits(&self, s: &str) -> String {
        match self {
            Locale::BnBd => s
                .chars()
                .map(|c| match c.to_digit(10) {
                    Some(d) => char::from_u32(BENGALI_ZERO + d).unwrap_or(c),
                    None => c,
                })
                .collect(),
            Locale::EnUs => s.to_string(),
        }
    }
}

/// Anything `format_date` accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum DateInput {
    /// Epoch milliseconds.
    Millis(i64),
    /// Remote timestamp wrapper (`{seconds, nanos}`).
    Remote { seconds: i64, nanos: u32 },
    /// RFC 3339 text, as timestamps are read back from the document store.
    Text(String),
    DateTime(DateTime<Utc>),
}

impl DateInput {
    /// Interpret a stored field value. Returns `None` for null and non-date shapes.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(DateInput::Millis),
            Value::String(s) => Some(DateInput::Text(s.clone())),
            Value::Object(map) => {
                let seconds = map
                    .get("seconds")
                    .or_else(|| map.get("_seconds"))
                    .and_then(Value::as_i64)?;
                let nanos = map
                    .get("nanos")
                    .or_else(|| map.get("nanoseconds"))
                    .or_else(|| map.get("_nanoseconds"))
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                Some(DateInput::Remote {
                    seconds,
                    nanos: u32::try_from(nanos).unwrap_or(0),
                })
            }
            _ => None,
        }
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            DateInput::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            DateInput::Remote { seconds, nanos } => Utc.timestamp_opt(*seconds, *nanos).single(),
            DateInput::Text(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            DateInput::DateTime(dt) => Some(*dt),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            DateInput::Millis(0) => true,
            DateInput::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<DateTime<Utc>> for DateInput {
    fn from(dt: DateTime<Utc>) -> Self {
        DateInput::DateTime(dt)
    }
}

impl From<i64> for DateInput {
    fn from(ms: i64) -> Self {
        DateInput::Millis(ms)
    }
}

/// Render a date as the locale's short date. Blank or unparseable input yields `""`.
pub fn format_date(input: &DateInput, locale: Locale) -> String {
    if input.is_blank() {
        return String::new();
    }
    let Some(dt) = input.to_datetime() else {
        return String::new();
    };
    let local = dt.with_timezone(&locale.offset());
    let text = match locale {
        Locale::BnBd => format!("{}/{}/{}", local.day(), local.month(), local.year()),
        Locale::EnUs => format!("{}/{}/{}", local.month(), local.day(), local.year()),
    };
    locale.localize_digits(&text)
}

/// `format_date` for a raw document field.
pub fn format_field_date(value: &Value, locale: Locale) -> String {
    DateInput::from_json(value)
        .map(|input| format_date(&input, locale))
        .unwrap_or_default()
}

/// Render an amount in the locale's currency with two decimals.
pub fn format_price(amount: f64, locale: Locale) -> String {
    if !amount.is_finite() {
        return amount.to_string();
    }
    let cents = (amount.abs() * 100.0).round() as u128;
    let whole = (cents / 100).to_string();
    let frac = cents % 100;
    let sign = if amount < 0.0 && cents != 0 { "-" } else { "" };

    match locale {
        Locale::BnBd => {
            let text = format!("{}{}.{:02}৳", sign, group_lakh(&whole), frac);
            locale.localize_digits(&text)
        }
        Locale::EnUs => format!("{}${}.{:02}", sign, group_thousands(&whole), frac),
    }
}

/// 1234567 -> 1,234,567
fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// 1234567 -> 12,34,567
fn group_lakh(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut out = String::new();
    for (i, c) in head.chars().enumerate() {
        if i > 0 && (head.len() - i) % 2 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out.push(',');
    out.push_str(tail);
    out
}

/// Time-prefixed random id. Uniqueness is best-effort.
pub fn generate_id() -> String {
    let millis = u128::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
    let (random, _) = uuid::Uuid::new_v4().as_u64_pair();
    format!("{}{}", to_base36(millis), to_base36(u128::from(random)))
}

fn to_base36(mut n: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

/// Syntactic email check only; says nothing about deliverability.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}
