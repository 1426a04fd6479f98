//! Per-field coercion from loosely typed model output.
//!
//! None of these functions fail: a value that cannot be made to fit its field
//! comes back as `None`.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::category::Category;

static NUMERIC_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4}|\d{2})$").unwrap());

static CLOCK_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d{1,2}:\d{2}(?::\d{2})?(?:\s*[ap]\.?m\.?)?").unwrap()
});

static STORE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#\s*\d+").unwrap());

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// [sign] [code] [symbol] [sign] number [symbol] [code]
static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?P<sign>[-+])?\s*",
        r"(?P<code>(?i:[a-z]{3}))?\s*",
        r"(?P<sym>[$€£¥₹₩])?\s*",
        r"(?P<sign2>[-+])?\s*",
        r"(?P<num>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?|\d+,\d{2}|\.\d+)",
        r"\s*(?P<sym2>[$€£¥₹₩])?",
        r"\s*(?P<code2>(?i:[a-z]{3}))?$"
    ))
    .unwrap()
});

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
];

/// Coerce a JSON value into a date. Only strings are considered.
pub fn coerce_date(value: Option<&Value>) -> Option<NaiveDate> {
    value.and_then(Value::as_str).and_then(parse_date)
}

/// Best-effort date parsing. ISO is preferred; `A/B/YYYY` is read month-first
/// unless `A` cannot be a month.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(caps) = NUMERIC_DATE_RE.captures(s) {
        return numeric_date(&caps);
    }

    // %Y happily reads "3" as year 3
    let year_first = s.as_bytes().iter().take(4).filter(|b| b.is_ascii_digit()).count() == 4;
    for fmt in DATE_FORMATS {
        if fmt.starts_with("%Y") && !year_first {
            continue;
        }
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    // ISO datetimes: "2024-05-01T10:22:00" / "2024-05-01 10:22"
    if let (Some(prefix), Some(sep)) = (s.get(..10), s.get(10..11)) {
        if year_first && (sep == "T" || sep == " ") {
            if let Ok(d) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
                return Some(d);
            }
        }
    }

    None
}

fn numeric_date(caps: &regex::Captures<'_>) -> Option<NaiveDate> {
    let a: u32 = caps[1].parse().ok()?;
    let b: u32 = caps[2].parse().ok()?;
    let mut year: i32 = caps[3].parse().ok()?;
    if caps[3].len() == 2 {
        year += 2000;
    }
    let (month, day) = if a > 12 { (b, a) } else { (a, b) };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Coerce a JSON value into a merchant name.
pub fn coerce_merchant(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).and_then(clean_merchant)
}

/// Strip clock times and store-number tags, collapse whitespace.
pub fn clean_merchant(raw: &str) -> Option<String> {
    let s = CLOCK_TIME_RE.replace_all(raw, " ");
    let s = STORE_NUMBER_RE.replace_all(&s, " ");
    let s = WHITESPACE_RE.replace_all(&s, " ");
    let s = s.trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | ',' | '|' | '@' | '/'));
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Coerce a JSON value into an amount. Numbers pass through; strings are parsed.
pub fn coerce_amount(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Parse a money string such as `"$12.50"`, `"-1,234.00"`, `"USD 9.99"` or `"(4.00)"`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let mut s = raw.trim();
    let mut negative = false;
    if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        negative = true;
        s = inner.trim();
    }

    let caps = AMOUNT_RE.captures(s)?;
    let both = |a: &str, b: &str| caps.name(a).is_some() && caps.name(b).is_some();
    if both("sign", "sign2") || both("sym", "sym2") || both("code", "code2") {
        return None;
    }
    let sign = caps
        .name("sign")
        .or_else(|| caps.name("sign2"))
        .map(|m| m.as_str());
    if sign == Some("-") {
        negative = !negative;
    }

    let num = &caps["num"];
    // "12,50" is a decimal comma; "1,234" is a thousands group
    let decimal_comma = num.len() > 3 && num.as_bytes()[num.len() - 3] == b',';
    let num = if decimal_comma && !num.contains('.') {
        num.replace(',', ".")
    } else {
        num.replace(',', "")
    };
    let value: f64 = num.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Coerce a JSON value into a category from the closed vocabulary.
pub fn coerce_category(value: Option<&Value>) -> Option<Category> {
    value.and_then(Value::as_str).and_then(Category::parse)
}
