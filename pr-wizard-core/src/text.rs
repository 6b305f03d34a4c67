// text normalisation - cleans scraped strings and filters page boilerplate

use lazy_static::lazy_static;
use regex::Regex;

pub const MIN_TEXT_LEN: usize = 10;
pub const MAX_TEXT_LEN: usize = 200;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();

    // page chrome that sits next to commit titles
    static ref BOILERPLATE: Regex = Regex::new(
        r"(?i)files?\s+changed|\bcontributors?\b|\bcommits\b|\bcommitted\b|\bago\b"
    ).unwrap();

    static ref PURE_NUMBER: Regex = Regex::new(r"^[\d,.\s]+$").unwrap();
}

/// collapse whitespace, drop zero-width characters and trim
pub fn normalize(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| !matches!(c, '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{feff}'))
        .map(|c| if c == '\u{a0}' { ' ' } else { c })
        .collect();
    WHITESPACE.replace_all(stripped.trim(), " ").into_owned()
}

/// true for "3 files changed", "committed 2 days ago", "42" and friends
pub fn is_boilerplate(text: &str) -> bool {
    let text = text.trim();
    PURE_NUMBER.is_match(text) || BOILERPLATE.is_match(text)
}

/// the content filter every commit cascade level applies
pub fn is_commit_candidate(text: &str) -> bool {
    let len = text.chars().count();
    (MIN_TEXT_LEN..=MAX_TEXT_LEN).contains(&len) && !is_boilerplate(text)
}

/// page-wide scan filter: same bounds, and single tokens are rejected
pub fn is_page_text_candidate(text: &str) -> bool {
    is_commit_candidate(text) && text.contains(char::is_whitespace)
}

/// parse "1,234" style counters
pub fn parse_count(raw: &str) -> Option<usize> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  Fix\n\t login\u{a0} bug\u{200b} "), "Fix login bug");
    }

    #[test]
    fn test_short_strings_are_rejected() {
        for s in ["", "fix", "Fix bug", "123456789"] {
            assert!(!is_commit_candidate(s), "{s:?} should be rejected");
        }
        assert!(is_commit_candidate("Fix login bug"));
    }

    #[test]
    fn test_long_strings_are_rejected() {
        let long = "word ".repeat(50);
        assert!(!is_commit_candidate(long.trim()));
    }

    #[test]
    fn test_boilerplate_denylist() {
        assert!(is_boilerplate("12 files changed"));
        assert!(is_boilerplate("3 contributors"));
        assert!(is_boilerplate("5 commits"));
        assert!(is_boilerplate("jamie committed yesterday"));
        assert!(is_boilerplate("2 days ago"));
        assert!(is_boilerplate("1,024"));
        assert!(!is_boilerplate("Update wagon wheel renderer"));
        assert!(!is_boilerplate("Refactor commit parser"));
    }

    #[test]
    fn test_page_text_needs_whitespace() {
        assert!(!is_page_text_candidate("supercalifragilistic"));
        assert!(is_page_text_candidate("Add user search endpoint"));
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("+1,234"), Some(1234));
        assert_eq!(parse_count("−17"), Some(17));
        assert_eq!(parse_count("none"), None);
    }
}
