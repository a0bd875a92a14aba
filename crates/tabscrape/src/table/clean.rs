use std::sync::LazyLock;

use regex::Regex;

static RE_FOOTNOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("invalid regex: footnote"));

static RE_NUMERIC_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\s,%'’_\x{a0}\x{202f}£$€+]").expect("invalid regex: numeric noise")
});

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn strip_footnotes(text: &str) -> String {
    normalize_whitespace(&RE_FOOTNOTE.replace_all(text, ""))
}

pub fn parse_number(text: &str) -> Option<f64> {
    let stripped = RE_FOOTNOTE.replace_all(text, "").replace('\u{2212}', "-");
    let cleaned = RE_NUMERIC_NOISE.replace_all(&stripped, "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}
