use regex::Regex;
use std::sync::OnceLock;

pub(super) const VALID_CANDIDATE_ID_PATTERN: &str = "[A-Za-z0-9:._-]+";

fn valid_candidate_id() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(&format!("^{}$", VALID_CANDIDATE_ID_PATTERN)).expect("candidate id pattern is a valid regex")
    })
}

/// Trims surrounding whitespace, then requires the whole id to match `[A-Za-z0-9:._-]+`.
pub(super) fn validate_candidate_id(id: &str) -> Option<String> {
    let id = id.trim();
    if valid_candidate_id().is_match(id) {
        Some(id.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_charset() {
        for id in &["svcA", "10.0.0.1", "host:8080", "a_b-c.d", "  padded  "] {
            assert!(validate_candidate_id(id).is_some(), "{:?} should be accepted", id);
        }
        assert_eq!(validate_candidate_id("  padded  ").as_deref(), Some("padded"));
    }

    #[test]
    fn rejects_everything_else() {
        for id in &["", "   ", "has space", "slash/y", "bang!", "tab\tbed", "ünï"] {
            assert!(validate_candidate_id(id).is_none(), "{:?} should be rejected", id);
        }
    }
}
