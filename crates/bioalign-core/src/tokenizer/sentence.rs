use regex::Regex;

use crate::error::Result;

/// Splits text into sentences at `.`, `!` and `?`.
///
/// Spans are absolute char offsets with leading whitespace trimmed, so each
/// sentence starts at its first non-space char.
pub struct SentenceSplitter {
    re_sentence: Regex,
}

impl SentenceSplitter {
    /// # Errors
    ///
    /// Returns `BioalignError::RegexError` if the pattern fails to compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            re_sentence: Regex::new(r"[^.!?]+[.!?]?")?,
        })
    }

    /// Returns `(start, end)` char offsets of every non-empty sentence.
    pub fn split(&self, text: &str) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        let mut chars_seen = 0;
        let mut bytes_seen = 0;

        for m in self.re_sentence.find_iter(text) {
            chars_seen += text[bytes_seen..m.start()].chars().count();
            let body = m.as_str();
            let trimmed = body.trim_start();
            let start = chars_seen + (body.chars().count() - trimmed.chars().count());
            let end = chars_seen + body.chars().count();
            if start < end {
                spans.push((start, end));
            }
            chars_seen = end;
            bytes_seen = m.end();
        }

        spans
    }
}

/// One-shot sentence split. Build a [`SentenceSplitter`] when splitting many texts.
pub fn segment_sentences(text: &str) -> Result<Vec<(usize, usize)>> {
    Ok(SentenceSplitter::new()?.split(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::char_slice;

    #[test]
    fn test_split_sentences() {
        let splitter = SentenceSplitter::new().unwrap();
        let text = "Ana je v Zagrebu. Je li Marko tamo?  Nije!";
        let spans = splitter.split(text);

        let sentences: Vec<_> = spans
            .iter()
            .map(|&(s, e)| char_slice(text, s, e).unwrap())
            .collect();
        assert_eq!(sentences, ["Ana je v Zagrebu.", "Je li Marko tamo?", "Nije!"]);
    }

    #[test]
    fn test_split_without_final_mark() {
        let splitter = SentenceSplitter::new().unwrap();
        let text = "Привіт. Як справи";
        let spans = splitter.split(text);
        assert_eq!(spans, [(0, 7), (8, 17)]);
    }

    #[test]
    fn test_split_skips_blank_tail() {
        let splitter = SentenceSplitter::new().unwrap();
        assert_eq!(splitter.split("Done.   "), [(0, 5)]);
        assert!(splitter.split("").is_empty());
    }

    #[test]
    fn test_segment_sentences() {
        assert_eq!(segment_sentences("Da. Ne!").unwrap(), [(0, 3), (4, 7)]);
    }
}
