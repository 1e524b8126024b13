use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;

// Text content only needs the markup-significant characters; `\r` is kept as a
// character reference so it survives end-of-line normalization on re-parse.
static TEXT_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(["&", "<", ">", "\r"])
        .expect("Failed to build XML text escaper")
});

// Attribute values are always written double-quoted. Whitespace other than a
// plain space would be normalized to a space by the next parser.
static ATTR_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(["&", "<", ">", "\"", "\t", "\n", "\r"])
        .expect("Failed to build XML attribute escaper")
});

/// Escape a string for use as XML character data.
///
/// # Examples
///
/// ```
/// use slidefill::common::xml::escape_text;
/// assert_eq!(escape_text("R&D <draft>"), "R&amp;D &lt;draft&gt;");
/// assert_eq!(escape_text("it's \"quoted\""), "it's \"quoted\"");
/// ```
#[inline]
pub fn escape_text(s: &str) -> String {
    TEXT_ESCAPER.replace_all(s, &["&amp;", "&lt;", "&gt;", "&#13;"])
}

/// Escape a string for use inside a double-quoted XML attribute value.
///
/// # Examples
///
/// ```
/// use slidefill::common::xml::escape_attr;
/// assert_eq!(escape_attr("a \"b\" & c"), "a &quot;b&quot; &amp; c");
/// assert_eq!(escape_attr("line1\nline2"), "line1&#10;line2");
/// ```
#[inline]
pub fn escape_attr(s: &str) -> String {
    ATTR_ESCAPER.replace_all(
        s,
        &["&amp;", "&lt;", "&gt;", "&quot;", "&#9;", "&#10;", "&#13;"],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text_leaves_plain_text_alone() {
        assert_eq!(escape_text("Quarterly Review"), "Quarterly Review");
        assert_eq!(escape_text(""), "");
    }

    #[test]
    fn test_escape_text_carriage_return() {
        assert_eq!(escape_text("a\r\nb"), "a&#13;\nb");
    }

    #[test]
    fn test_escape_attr_whitespace() {
        assert_eq!(escape_attr("a\tb"), "a&#9;b");
        assert_eq!(escape_attr("<x>"), "&lt;x&gt;");
    }
}
