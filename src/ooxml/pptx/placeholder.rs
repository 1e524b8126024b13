//! Placeholder location and rewriting inside a parsed document part.
//!
//! Tokens are searched in textual locations only: text nodes, CDATA sections
//! and attribute values. Element and attribute names are never touched, and
//! because substitution happens on decoded text the serializer re-escapes
//! whatever the values contain.
//!
//! A value with line breaks expands the DrawingML paragraph (`*:p`) holding
//! its token into one paragraph per line. Everything before the token stays
//! in the first paragraph, everything after it in the last, and paragraph
//! properties are copied to all of them. A multi-line value found outside any
//! paragraph is inserted as-is.

use crate::common::xml::{XmlDocument, XmlElement, XmlNode};
use memchr::memmem::Finder;

struct Replacement {
    token: String,
    finder: Finder<'static>,
    value: String,
    /// Lines of `value` when it spans more than one.
    lines: Option<Vec<String>>,
}

/// Applies a fixed list of token/value pairs to document trees.
///
/// Pairs are applied sequentially in the order given; each later pair sees
/// the output of the earlier ones. Empty tokens are discarded since they
/// would match everywhere.
pub struct PlaceholderRewriter {
    replacements: Vec<Replacement>,
    multiline: bool,
}

impl PlaceholderRewriter {
    pub fn new<I, T, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, V)>,
        T: Into<String>,
        V: Into<String>,
    {
        let replacements: Vec<Replacement> = pairs
            .into_iter()
            .map(|(token, value)| (token.into(), value.into()))
            .filter(|(token, _)| !token.is_empty())
            .map(|(token, value)| {
                let finder = Finder::new(token.as_bytes()).into_owned();
                let lines = split_lines(&value);
                Replacement {
                    token,
                    finder,
                    value,
                    lines,
                }
            })
            .collect();
        let multiline = replacements.iter().any(|r| r.lines.is_some());
        Self {
            replacements,
            multiline,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    /// Tokens in application order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.replacements.iter().map(|r| r.token.as_str())
    }

    /// Rewrite every placeholder occurrence in `doc`.
    ///
    /// Returns the number of occurrences replaced; zero means the tree was
    /// left exactly as it was.
    pub fn rewrite(&self, doc: &mut XmlDocument) -> usize {
        if self.is_empty() {
            return 0;
        }
        let mut count = 0;
        self.rewrite_element(&mut doc.root, &mut count);
        count
    }

    /// Scalar substitution of every pair over `text`.
    ///
    /// Returns `None` when no token occurs.
    pub fn substitute(&self, text: &str) -> Option<(String, usize)> {
        let mut current: Option<String> = None;
        let mut count = 0;
        for rep in &self.replacements {
            let haystack = current.as_deref().unwrap_or(text);
            if let Some((replaced, n)) = replace_literal(haystack, rep) {
                count += n;
                current = Some(replaced);
            }
        }
        current.map(|s| (s, count))
    }

    fn rewrite_element(&self, el: &mut XmlElement, count: &mut usize) {
        self.substitute_attributes(el, count);

        let mut i = 0;
        while i < el.children.len() {
            let expand = self.multiline
                && matches!(&el.children[i], XmlNode::Element(child) if child.local_name() == "p");
            if expand {
                if let XmlNode::Element(paragraph) = &el.children[i] {
                    let paragraphs = self.expand_paragraph(paragraph, count);
                    let added = paragraphs.len();
                    el.children
                        .splice(i..=i, paragraphs.into_iter().map(XmlNode::Element));
                    i += added;
                    continue;
                }
            }

            match &mut el.children[i] {
                XmlNode::Text(text) | XmlNode::CData(text) => {
                    if let Some((replaced, n)) = self.substitute(text) {
                        *text = replaced;
                        *count += n;
                    }
                },
                XmlNode::Element(child) => self.rewrite_element(child, count),
                _ => {},
            }
            i += 1;
        }
    }

    fn substitute_attributes(&self, el: &mut XmlElement, count: &mut usize) {
        for value in el.attribute_values_mut() {
            if let Some((replaced, n)) = self.substitute(value) {
                *value = replaced;
                *count += n;
            }
        }
    }

    /// Substitute inside one text node, splitting the result wherever a
    /// multi-line value introduced a line break.
    fn substitute_segments(&self, text: &str, count: &mut usize) -> Vec<String> {
        let mut segments = vec![text.to_string()];
        for rep in &self.replacements {
            let mut next = Vec::with_capacity(segments.len());
            for segment in segments {
                let positions: Vec<usize> = rep.finder.find_iter(segment.as_bytes()).collect();
                if positions.is_empty() {
                    next.push(segment);
                    continue;
                }
                *count += positions.len();

                let Some(lines) = &rep.lines else {
                    next.push(splice(&segment, &positions, rep.token.len(), &rep.value));
                    continue;
                };

                let mut current = String::new();
                let mut last = 0;
                for &pos in &positions {
                    current.push_str(&segment[last..pos]);
                    current.push_str(&lines[0]);
                    for line in &lines[1..] {
                        next.push(std::mem::take(&mut current));
                        current.push_str(line);
                    }
                    last = pos + rep.token.len();
                }
                current.push_str(&segment[last..]);
                next.push(current);
            }
            segments = next;
        }
        segments
    }

    /// Produce the paragraphs that replace `paragraph`.
    fn expand_paragraph(&self, paragraph: &XmlElement, count: &mut usize) -> Vec<XmlElement> {
        let mut template = paragraph.clone();
        template.walk_mut(&mut |el| self.substitute_attributes(el, count));

        // Segments of every text node in document order, and the index of the
        // first text node under each direct child.
        let mut segments: Vec<Vec<String>> = Vec::new();
        let mut first_text = Vec::with_capacity(template.children.len());
        let mut text_span = Vec::with_capacity(template.children.len());
        for child in &mut template.children {
            let first = segments.len();
            for_each_text_mut(child, &mut |text| {
                segments.push(self.substitute_segments(text, count));
            });
            first_text.push(first);
            text_span.push((segments.len() > first).then(|| (first, segments.len() - 1)));
        }

        // Output paragraph in which each text node's first segment lands.
        let mut starts = Vec::with_capacity(segments.len());
        let mut breaks = 0;
        for segs in &segments {
            starts.push(breaks);
            breaks += segs.len() - 1;
        }

        if breaks == 0 {
            let mut t = 0;
            for child in &mut template.children {
                for_each_text_mut(child, &mut |text| {
                    *text = std::mem::take(&mut segments[t][0]);
                    t += 1;
                });
            }
            return vec![template];
        }

        // Range of output paragraphs each direct child appears in; `None`
        // means all of them.
        let mut last_hi = 0;
        let ranges: Vec<Option<(usize, usize)>> = template
            .children
            .iter()
            .zip(&text_span)
            .map(|(child, span)| match (child, span) {
                (XmlNode::Element(_), Some((first, last))) => {
                    let lo = starts[*first];
                    let hi = starts[*last] + segments[*last].len() - 1;
                    last_hi = hi;
                    Some((lo, hi))
                },
                (XmlNode::Element(el), None) if is_paragraph_property(el) => None,
                (XmlNode::Element(_), None) => Some((last_hi, last_hi)),
                (XmlNode::Text(t) | XmlNode::CData(t), Some((first, _)))
                    if !t.trim().is_empty() || segments[*first].len() > 1 =>
                {
                    let lo = starts[*first];
                    last_hi = lo + segments[*first].len() - 1;
                    Some((lo, last_hi))
                },
                _ => None,
            })
            .collect();

        (0..=breaks)
            .map(|j| {
                let mut out = template.clone_empty();
                for (k, child) in template.children.iter().enumerate() {
                    let everywhere = match ranges[k] {
                        None => true,
                        Some((lo, hi)) if lo <= j && j <= hi => false,
                        Some(_) => continue,
                    };
                    let mut node = child.clone();
                    let mut t = first_text[k];
                    for_each_text_mut(&mut node, &mut |text| {
                        let segs = &segments[t];
                        let start = starts[t];
                        *text = if everywhere && segs.len() == 1 {
                            segs[0].clone()
                        } else if j >= start && j < start + segs.len() {
                            segs[j - start].clone()
                        } else {
                            String::new()
                        };
                        t += 1;
                    });
                    out.children.push(node);
                }
                out
            })
            .collect()
    }
}

/// Split a value into lines on `\n`, dropping a `\r` before each break.
///
/// Returns `None` for single-line values. A trailing break yields a final
/// empty line, so `"A\n"` is two lines.
fn split_lines(value: &str) -> Option<Vec<String>> {
    if !value.contains('\n') {
        return None;
    }
    let mut lines: Vec<String> = value.split('\n').map(str::to_string).collect();
    let last = lines.len() - 1;
    for line in &mut lines[..last] {
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Some(lines)
}

fn replace_literal(haystack: &str, rep: &Replacement) -> Option<(String, usize)> {
    let positions: Vec<usize> = rep.finder.find_iter(haystack.as_bytes()).collect();
    if positions.is_empty() {
        return None;
    }
    let replaced = splice(haystack, &positions, rep.token.len(), &rep.value);
    Some((replaced, positions.len()))
}

/// Replace the non-overlapping matches at `positions` with `value`.
fn splice(haystack: &str, positions: &[usize], token_len: usize, value: &str) -> String {
    let mut out = String::with_capacity(haystack.len() + positions.len() * value.len());
    let mut last = 0;
    for &pos in positions {
        out.push_str(&haystack[last..pos]);
        out.push_str(value);
        last = pos + token_len;
    }
    out.push_str(&haystack[last..]);
    out
}

fn for_each_text_mut<F: FnMut(&mut String)>(node: &mut XmlNode, f: &mut F) {
    match node {
        XmlNode::Text(text) | XmlNode::CData(text) => f(text),
        XmlNode::Element(el) => {
            for child in &mut el.children {
                for_each_text_mut(child, f);
            }
        },
        _ => {},
    }
}

fn is_paragraph_property(el: &XmlElement) -> bool {
    matches!(el.local_name(), "pPr" | "endParaRPr")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn slide(body: &str) -> XmlDocument {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:txBody>{}</p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
            body
        );
        XmlDocument::parse(xml.as_bytes()).unwrap()
    }

    fn paragraphs(doc: &XmlDocument) -> Vec<String> {
        let body = doc.root.find("txBody").unwrap();
        body.child_elements()
            .filter(|el| el.local_name() == "p")
            .map(XmlElement::text)
            .collect()
    }

    #[test]
    fn test_scalar_replacement_in_text() {
        let mut doc = slide(r#"<a:p><a:r><a:t>{{TITLE}}</a:t></a:r></a:p>"#);
        let rewriter = PlaceholderRewriter::new([("{{TITLE}}", "Quarterly Review")]);
        assert_eq!(rewriter.rewrite(&mut doc), 1);
        assert!(doc.to_xml_string().contains("<a:t>Quarterly Review</a:t>"));
    }

    #[test]
    fn test_values_are_escaped_on_output() {
        let mut doc = slide(r#"<a:p><a:r><a:t>{{NAME}}</a:t></a:r></a:p>"#);
        let rewriter = PlaceholderRewriter::new([("{{NAME}}", "R&D <team>")]);
        rewriter.rewrite(&mut doc);
        assert!(doc.to_xml_string().contains("<a:t>R&amp;D &lt;team&gt;</a:t>"));
    }

    #[test]
    fn test_attribute_values_are_rewritten() {
        let mut doc = slide(r#"<a:p><a:r><a:rPr lang="{{LANG}}"/><a:t>x</a:t></a:r></a:p>"#);
        let rewriter = PlaceholderRewriter::new([("{{LANG}}", "en-US")]);
        assert_eq!(rewriter.rewrite(&mut doc), 1);
        assert!(doc.to_xml_string().contains(r#"lang="en-US""#));
    }

    #[test]
    fn test_tag_names_are_not_rewritten() {
        let mut doc = slide(r#"<a:p><a:r><a:t>p:sp</a:t></a:r></a:p>"#);
        let rewriter = PlaceholderRewriter::new([("p:sp", "shape")]);
        assert_eq!(rewriter.rewrite(&mut doc), 1);
        let xml = doc.to_xml_string();
        assert!(xml.contains("<p:sp>"));
        assert!(xml.contains("<a:t>shape</a:t>"));
    }

    #[test]
    fn test_sequential_application() {
        let rewriter = PlaceholderRewriter::new([("{{A}}", "{{B}}"), ("{{B}}", "done")]);
        assert_eq!(
            rewriter.substitute("{{A}} {{B}}"),
            Some(("done done".to_string(), 3))
        );

        let reversed = PlaceholderRewriter::new([("{{B}}", "done"), ("{{A}}", "{{B}}")]);
        assert_eq!(
            reversed.substitute("{{A}} {{B}}"),
            Some(("{{B}} done".to_string(), 2))
        );
    }

    #[test]
    fn test_empty_token_and_no_match() {
        let rewriter = PlaceholderRewriter::new([("", "x"), ("{{MISSING}}", "y")]);
        assert_eq!(rewriter.tokens().count(), 1);
        let mut doc = slide(r#"<a:p><a:r><a:t>Hello</a:t></a:r></a:p>"#);
        let before = doc.clone();
        assert_eq!(rewriter.rewrite(&mut doc), 0);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let mut doc = slide(r#"<a:p><a:r><a:t>{{X}}</a:t></a:r></a:p>"#);
        let rewriter = PlaceholderRewriter::new([("{{X}}", "Line one\nLine two")]);
        assert_eq!(rewriter.rewrite(&mut doc), 1);
        let once = doc.to_xml_string();
        assert_eq!(rewriter.rewrite(&mut doc), 0);
        assert_eq!(doc.to_xml_string(), once);
    }

    #[test]
    fn test_multiline_value_expands_paragraphs() {
        let mut doc = slide(
            r#"<a:p><a:pPr algn="ctr"/><a:r><a:rPr b="1"/><a:t>{{AGENDA}}</a:t></a:r><a:endParaRPr lang="en-US"/></a:p>"#,
        );
        let rewriter = PlaceholderRewriter::new([("{{AGENDA}}", "A\n\nB")]);
        assert_eq!(rewriter.rewrite(&mut doc), 1);
        assert_eq!(paragraphs(&doc), vec!["A", "", "B"]);

        let body = doc.root.find("txBody").unwrap();
        for p in body.child_elements() {
            assert_eq!(p.child("pPr").and_then(|el| el.attr("algn")), Some("ctr"));
            assert!(p.child("endParaRPr").is_some());
            assert_eq!(p.find("rPr").and_then(|el| el.attr("b")), Some("1"));
        }
    }

    #[test]
    fn test_multiline_keeps_surrounding_runs() {
        let mut doc = slide(
            r#"<a:p><a:r><a:t>Before </a:t></a:r><a:r><a:t>x{{V}}y</a:t></a:r><a:br/><a:r><a:t> after</a:t></a:r></a:p>"#,
        );
        let rewriter = PlaceholderRewriter::new([("{{V}}", "one\r\ntwo\nthree")]);
        assert_eq!(rewriter.rewrite(&mut doc), 1);
        assert_eq!(paragraphs(&doc), vec!["Before xone", "two", "threey after"]);

        let body = doc.root.find("txBody").unwrap();
        let last = body.child_elements().last().unwrap();
        assert!(last.child("br").is_some());
    }

    #[test]
    fn test_trailing_newline_yields_empty_paragraph() {
        let mut doc = slide(r#"<a:p><a:r><a:t>{{V}}</a:t></a:r></a:p>"#);
        let rewriter = PlaceholderRewriter::new([("{{V}}", "A\n")]);
        rewriter.rewrite(&mut doc);
        assert_eq!(paragraphs(&doc), vec!["A", ""]);
    }

    #[test]
    fn test_multiline_outside_paragraph_is_literal() {
        let mut doc = XmlDocument::parse(b"<root><title>{{V}}</title></root>").unwrap();
        let rewriter = PlaceholderRewriter::new([("{{V}}", "A\nB")]);
        assert_eq!(rewriter.rewrite(&mut doc), 1);
        assert_eq!(doc.root.find("title").unwrap().text(), "A\nB");
    }

    #[test]
    fn test_paragraph_without_tokens_is_unchanged() {
        let mut doc = slide(r#"<a:p><a:r><a:t>Keep</a:t></a:r></a:p><a:p><a:r><a:t>{{V}}</a:t></a:r></a:p>"#);
        let rewriter = PlaceholderRewriter::new([("{{V}}", "1\n2")]);
        assert_eq!(rewriter.rewrite(&mut doc), 1);
        assert_eq!(paragraphs(&doc), vec!["Keep", "1", "2"]);
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines("single"), None);
        assert_eq!(
            split_lines("a\r\nb\n"),
            Some(vec!["a".to_string(), "b".to_string(), String::new()])
        );
    }

    proptest! {
        #[test]
        fn prop_no_token_survives_when_value_lacks_it(
            parts in proptest::collection::vec("[a-z ]{0,8}", 1..6),
            value in "[A-Z]{0,6}",
        ) {
            let text = parts.join("{{K}}");
            let rewriter = PlaceholderRewriter::new([("{{K}}", value.as_str())]);
            let out = rewriter
                .substitute(&text)
                .map(|(s, _)| s)
                .unwrap_or_else(|| text.clone());
            prop_assert!(!out.contains("{{K}}"));
            prop_assert_eq!(out, parts.join(value.as_str()));
        }
    }
}
