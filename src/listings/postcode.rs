use once_cell::sync::Lazy;
use regex::Regex;

/// UK postcode grammar, including the special `GIR 0AA`.
static POSTCODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(([Gg][Ii][Rr] 0[Aa]{2})|((([A-Za-z][0-9]{1,2})|(([A-Za-z][A-Ha-hJ-Yj-y][0-9]{1,2})|(([A-Za-z][0-9][A-Za-z])|([A-Za-z][A-Ha-hJ-Yj-y][0-9][A-Za-z]?))))\s?[0-9][A-Za-z]{2}))\b",
    )
    .expect("postcode pattern is valid")
});

/// Pull the first full UK postcode out of a free-text address, upper-cased.
pub fn extract_postcode(address: &str) -> Option<String> {
    POSTCODE_RE
        .find(address)
        .map(|m| m.as_str().to_ascii_uppercase())
}
