use std::fmt;

use super::CountError;

/// A validated target token.
///
/// Matching against corpus tokens is whole-token and case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    text: String,
}

impl Target {
    /// Validate `text` as a target token.
    ///
    /// Rejects empty input and anything containing whitespace: such a target
    /// can never equal a whitespace-delimited token.
    pub fn new(text: &str) -> Result<Self, CountError> {
        if text.is_empty() || text.chars().any(char::is_whitespace) {
            return Err(CountError::InvalidTarget(text.to_string()));
        }
        Ok(Self {
            text: text.to_string(),
        })
    }

    /// The target as given by the caller.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Raw bytes of the target, as uploaded to a compute device.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    /// Returns `true` if `token` equals the target ignoring case.
    #[must_use]
    pub fn matches(&self, token: &str) -> bool {
        eq_ignore_case(token, &self.text)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.text)
    }
}

/// Case-insensitive string equality, compared character by character.
///
/// Two characters are equal if they are identical or if their upper- or
/// lower-case mappings agree.  Pure ASCII inputs take a fast path.
#[must_use]
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    let mut left = a.chars();
    let mut right = b.chars();
    loop {
        match (left.next(), right.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) if chars_eq_ignore_case(x, y) => {}
            _ => return false,
        }
    }
}

fn chars_eq_ignore_case(x: char, y: char) -> bool {
    x == y || x.to_uppercase().eq(y.to_uppercase()) || x.to_lowercase().eq(y.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("the", "the")]
    #[case("The", "the")]
    #[case("THE", "the")]
    #[case("tHe", "ThE")]
    #[case("Ñandú", "ñANDÚ")]
    #[case("STRASSE", "strasse")]
    fn equal_ignoring_case(#[case] a: &str, #[case] b: &str) {
        assert!(eq_ignore_case(a, b));
    }

    #[rstest]
    #[case("the", "then")]
    #[case("then", "the")]
    #[case("the,", "the")]
    #[case("thé", "the")]
    #[case("", "the")]
    fn not_equal_ignoring_case(#[case] a: &str, #[case] b: &str) {
        assert!(!eq_ignore_case(a, b));
    }

    #[rstest]
    #[case("")]
    #[case("two words")]
    #[case("tab\there")]
    #[case(" ")]
    fn invalid_targets_are_rejected(#[case] text: &str) {
        assert!(matches!(Target::new(text), Err(CountError::InvalidTarget(_))));
    }

    #[test]
    fn target_matches_whole_tokens_only() {
        let target = Target::new("The").unwrap();
        assert!(target.matches("the"));
        assert!(target.matches("THE"));
        assert!(!target.matches("there"));
        assert!(!target.matches("other"));
    }
}
