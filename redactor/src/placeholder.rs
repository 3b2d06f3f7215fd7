//! Placeholder syntax, ID encoding, and per-document allocation.
//!
//! A placeholder is `[{LABEL}_{ID}]`. IDs count from zero per label: counts
//! 0 through 25 encode as `A` through `Z`, larger counts as the decimal count
//! itself, so the 27th entity of one label is `26`.

use std::{
    collections::{HashMap, HashSet},
    ops::Range,
    sync::LazyLock,
};

use regex::Regex;

static PLACEHOLDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[A-Z][A-Z0-9_]*_(?:[A-Z]|[0-9]+)\]").expect("placeholder pattern is valid")
});

static LABEL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("label pattern is valid"));

/// Encodes a per-label count as a placeholder ID.
pub fn placeholder_id(count: usize) -> String {
    match u8::try_from(count) {
        Ok(n) if n < 26 => char::from(b'A' + n).to_string(),
        _ => count.to_string(),
    }
}

/// Formats the placeholder for the `count`-th entity of `label`.
pub fn format_placeholder(label: &str, count: usize) -> String {
    format!("[{label}_{}]", placeholder_id(count))
}

/// Returns true if `label` can appear inside a placeholder.
pub fn is_valid_label(label: &str) -> bool {
    LABEL_PATTERN.is_match(label)
}

/// Returns true if `token` is exactly one placeholder-shaped token.
pub fn is_placeholder(token: &str) -> bool {
    PLACEHOLDER_PATTERN
        .find(token)
        .is_some_and(|m| m.start() == 0 && m.end() == token.len())
}

/// A placeholder-shaped token found in some text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaceholderToken<'a> {
    pub text: &'a str,
    /// Byte range within the scanned text.
    pub range: Range<usize>,
}

/// Yields every placeholder-shaped token in `text`, left to right.
///
/// Tokens never nest or overlap: the label alphabet excludes brackets.
pub fn scan(text: &str) -> impl Iterator<Item = PlaceholderToken<'_>> {
    PLACEHOLDER_PATTERN.find_iter(text).map(|m| PlaceholderToken {
        text: m.as_str(),
        range: m.range(),
    })
}

/// Issues placeholders for one document.
///
/// Each label has its own counter starting at zero. An allocator is created
/// per aggregation run and dropped with it; it is never shared across
/// documents. Reserved placeholders, typically tokens that already occur in
/// the document, are stepped over so an issued placeholder never collides
/// with existing text.
#[derive(Debug, Default)]
pub struct PlaceholderAllocator {
    counters: HashMap<String, usize>,
    reserved: HashSet<String>,
}

impl PlaceholderAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// An allocator that never issues any of `reserved`.
    pub fn with_reserved<I, S>(reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            counters: HashMap::new(),
            reserved: reserved.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the next free placeholder for `label` and advances its counter.
    pub fn allocate(&mut self, label: &str) -> String {
        let counter = self.counters.entry(label.to_owned()).or_insert(0);
        loop {
            let placeholder = format_placeholder(label, *counter);
            *counter += 1;
            if !self.reserved.contains(&placeholder) {
                return placeholder;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_overflow_to_decimal_after_z() {
        assert_eq!(placeholder_id(0), "A");
        assert_eq!(placeholder_id(25), "Z");
        assert_eq!(placeholder_id(26), "26");
        assert_eq!(placeholder_id(300), "300");
    }

    #[test]
    fn twenty_seven_allocations_end_with_26() {
        let mut allocator = PlaceholderAllocator::new();
        let issued: Vec<String> = (0..27).map(|_| allocator.allocate("PERSON")).collect();
        let expected: Vec<String> = ('A'..='Z')
            .map(|c| format!("[PERSON_{c}]"))
            .chain(std::iter::once("[PERSON_26]".to_string()))
            .collect();
        assert_eq!(issued, expected);
    }

    #[test]
    fn counters_are_per_label() {
        let mut allocator = PlaceholderAllocator::new();
        assert_eq!(allocator.allocate("PERSON"), "[PERSON_A]");
        assert_eq!(allocator.allocate("EMAIL"), "[EMAIL_A]");
        assert_eq!(allocator.allocate("PERSON"), "[PERSON_B]");
    }

    #[test]
    fn reserved_placeholders_are_stepped_over() {
        let mut allocator = PlaceholderAllocator::with_reserved(["[PERSON_A]", "[PERSON_C]"]);
        assert_eq!(allocator.allocate("PERSON"), "[PERSON_B]");
        assert_eq!(allocator.allocate("PERSON"), "[PERSON_D]");
        assert_eq!(allocator.allocate("EMAIL"), "[EMAIL_A]");
    }

    #[test]
    fn scan_finds_multi_segment_labels() {
        let tokens: Vec<&str> = scan("see [OCR_TEXT_A], [PERSON_26] and [x_A] or [PERSON_]")
            .map(|t| t.text)
            .collect();
        assert_eq!(tokens, vec!["[OCR_TEXT_A]", "[PERSON_26]"]);
    }

    #[test]
    fn scan_reports_byte_ranges() {
        let text = "é [FACE_B]";
        let token = scan(text).next().unwrap();
        assert_eq!(&text[token.range.clone()], "[FACE_B]");
        assert_eq!(token.range.start, 3);
    }

    #[test]
    fn placeholder_and_label_validation() {
        assert!(is_placeholder("[EMAIL_A]"));
        assert!(!is_placeholder(" [EMAIL_A]"));
        assert!(!is_placeholder("[EMAIL_AB]"));
        assert!(is_valid_label("OCR_TEXT"));
        assert!(!is_valid_label("ocr"));
        assert!(!is_valid_label("9LIVES"));
        assert!(!is_valid_label(""));
    }
}
