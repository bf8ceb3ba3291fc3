use once_cell::sync::Lazy;
use regex::Regex;

/// Organizational tokens that appear across many club names and carry no
/// discriminating signal.
pub const STOP_TOKENS: [&str; 7] = ["FC", "SC", "AC", "SS", "CF", "United", "City"];

static STOP_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = STOP_TOKENS.join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("stop token pattern is valid")
});

/// Canonical comparison form of a club name.
///
/// Stop tokens are removed as whole words, anything that is not an ASCII
/// letter, digit or whitespace is dropped, and the result is lowercased and
/// trimmed. Internal whitespace is kept as-is, so `"Real   Madrid"` and
/// `"Real Madrid"` normalize differently.
pub fn normalize_club_name(raw: &str) -> String {
    let stripped = STOP_TOKEN_RE.replace_all(raw, "");
    let mut out = String::with_capacity(stripped.len());
    for ch in stripped.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() {
            out.push(ch);
        }
    }
    out.trim().to_string()
}
