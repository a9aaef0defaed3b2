//! Corpus loading and whitespace tokenization.

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use crate::count::CountError;

/// Separator written between tokens when the sequence is flattened.
pub const SEPARATOR: u8 = b' ';

/// Split `text` into maximal runs of non-whitespace characters.
///
/// Returns the byte span of every token in source order.  Whitespace is
/// anything `char::is_whitespace` accepts, so empty or all-whitespace input
/// yields an empty sequence rather than a single empty token.
#[must_use]
pub fn tokenize(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                spans.push(s..i);
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push(s..text.len());
    }
    spans
}

/// Read the file at `path` into memory.
///
/// Invalid UTF-8 sequences are replaced rather than rejected; sample corpora
/// are not guaranteed to be clean.
pub fn read_corpus(path: &Path) -> Result<String, CountError> {
    let bytes = std::fs::read(path).map_err(|source| CountError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

/// An immutable corpus together with the spans of its tokens.
///
/// Cloning is cheap: text and spans live behind `Arc`s, so worker tasks can
/// each hold a handle without copying any tokens.
#[derive(Clone, Debug)]
pub struct TokenSequence {
    text: Arc<str>,
    spans: Arc<[Range<usize>]>,
}

impl TokenSequence {
    /// Tokenize `text`.
    #[must_use]
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let spans = tokenize(&text).into();
        Self { text, spans }
    }

    /// Read and tokenize the file at `path`.
    pub fn load(path: &Path) -> Result<Self, CountError> {
        read_corpus(path).map(Self::new)
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Returns `true` if the corpus contains no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// The token at index `i`, if any.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<&str> {
        self.spans.get(i).map(|span| &self.text[span.clone()])
    }

    /// All tokens in source order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.spans.iter().map(|span| &self.text[span.clone()])
    }

    /// Tokens whose indices fall inside `range`.
    ///
    /// # Panics
    ///
    /// Panics if `range` is out of bounds for this sequence.
    pub fn range(&self, range: Range<usize>) -> impl Iterator<Item = &str> {
        self.spans[range]
            .iter()
            .map(|span| &self.text[span.clone()])
    }

    /// Rejoin the tokens into one byte buffer separated by [`SEPARATOR`].
    #[must_use]
    pub fn flatten(&self) -> Vec<u8> {
        // Rejoined text is never longer than the source.
        let mut buf = Vec::with_capacity(self.text.len());
        for (i, token) in self.iter().enumerate() {
            if i > 0 {
                buf.push(SEPARATOR);
            }
            buf.extend_from_slice(token.as_bytes());
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn words(text: &str) -> Vec<&str> {
        tokenize(text).into_iter().map(|r| &text[r]).collect()
    }

    #[rstest]
    #[case("", &[])]
    #[case("   \t\n ", &[])]
    #[case("one", &["one"])]
    #[case("  leading and trailing  ", &["leading", "and", "trailing"])]
    #[case("tabs\tand\nnewlines\r\nmixed", &["tabs", "and", "newlines", "mixed"])]
    #[case("punct, stays. attached!", &["punct,", "stays.", "attached!"])]
    fn tokenize_splits_on_whitespace_runs(#[case] text: &str, #[case] expected: &[&str]) {
        assert_eq!(words(text), expected);
    }

    /// Unicode whitespace (NBSP, ideographic space) separates tokens too.
    #[test]
    fn tokenize_handles_unicode_whitespace() {
        assert_eq!(words("a\u{00A0}b\u{3000}c"), vec!["a", "b", "c"]);
    }

    /// Multi-byte characters stay inside their token's span.
    #[test]
    fn tokenize_keeps_multibyte_tokens_whole() {
        assert_eq!(words("café naïve"), vec!["café", "naïve"]);
    }

    #[test]
    fn tokenize_is_deterministic() {
        let text = "the quick brown fox ".repeat(50);
        assert_eq!(tokenize(&text), tokenize(&text));
    }

    #[test]
    fn flatten_joins_with_single_separator() {
        let seq = TokenSequence::new("  the\tcat \n\n sat  ");
        assert_eq!(seq.flatten(), b"the cat sat");
    }

    #[test]
    fn flatten_of_empty_sequence_is_empty() {
        assert!(TokenSequence::new(" \n").flatten().is_empty());
    }

    #[test]
    fn range_yields_tokens_in_order() {
        let seq = TokenSequence::new("a b c d e");
        assert_eq!(seq.range(1..4).collect::<Vec<_>>(), vec!["b", "c", "d"]);
        assert_eq!(seq.get(4), Some("e"));
        assert_eq!(seq.get(5), None);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        let err = TokenSequence::load(&missing).unwrap_err();
        assert!(matches!(err, CountError::Io { ref path, .. } if *path == missing));
    }

    #[test]
    fn load_replaces_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        std::fs::write(&path, b"caf\xE9 the").unwrap();
        let seq = TokenSequence::load(&path).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.get(1), Some("the"));
    }
}
