use std::sync::OnceLock;

use regex::Regex;

fn re_disallowed() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"[^\w\s:/.-]").expect("invalid regex"))
}

fn re_whitespace() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\s+").expect("invalid regex"))
}

/// Normalize raw OCR output for field extraction.
///
/// Newlines become spaces, anything other than word characters, whitespace and
/// `:` `/` `.` `-` becomes a space, and whitespace runs collapse to one space.
/// Case is preserved for entity recognition.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = text.replace('\n', " ");
    let text = re_disallowed().replace_all(&text, " ");
    re_whitespace().replace_all(&text, " ").trim().to_string()
}
