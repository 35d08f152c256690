//! Typed parsing of raw field strings as they come out of OCR.

use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_day_first, r"^(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})$");
re!(re_year_first, r"^(\d{4})[/-](\d{1,2})[/-](\d{1,2})$");
re!(re_long_form, r"(?i)^(\d{1,2})(?:st|nd|rd|th)?\s+([a-z]+)\.?\s+(\d{4})$");

/// Parse an amount such as `123.45`, `1,234.56` or `123,45`.
///
/// A lone comma followed by one or two digits is read as a decimal
/// separator; otherwise commas are thousands separators.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let s = s.trim();
    let clean = match s.rfind(',') {
        Some(pos) if !s.contains('.') && s.len() - pos - 1 <= 2 && s.matches(',').count() == 1 => {
            s.replace(',', ".")
        }
        _ => s.replace(',', ""),
    };
    Decimal::from_str(&clean).ok()
}

/// Parse the date shapes the field extractor recognizes: day-first numeric
/// (`12/05/2024`, `12-05-24`), year-first numeric (`2024/05/12`) and long
/// form (`1st January 2025`, `3 Feb. 2024`).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Some(c) = re_day_first().captures(s) {
        let day: u32 = c.get(1)?.as_str().parse().ok()?;
        let month: u32 = c.get(2)?.as_str().parse().ok()?;
        let year = expand_year(c.get(3)?.as_str().parse().ok()?);
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(c) = re_year_first().captures(s) {
        let year: i32 = c.get(1)?.as_str().parse().ok()?;
        let month: u32 = c.get(2)?.as_str().parse().ok()?;
        let day: u32 = c.get(3)?.as_str().parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    let c = re_long_form().captures(s)?;
    let day: u32 = c.get(1)?.as_str().parse().ok()?;
    let month = month_to_num(c.get(2)?.as_str())?;
    let year: i32 = c.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn expand_year(y: i32) -> i32 {
    if y < 100 { 2000 + y } else { y }
}

/// Month number from a full or abbreviated English month name.
fn month_to_num(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    let prefix = name.get(..3)?;
    let month = match prefix {
        "jan" => 1, "feb" => 2, "mar" => 3, "apr" => 4,
        "may" => 5, "jun" => 6, "jul" => 7, "aug" => 8,
        "sep" => 9, "oct" => 10, "nov" => 11, "dec" => 12,
        _ => return None,
    };
    Some(month)
}
