//! Locator-based field extraction from semi-structured HTML.
//!
//! A field is described by an ordered list of candidate [`Locator`]s; the
//! first one that yields a non-empty value wins. A field the document does
//! not carry comes back as `None`; absence is an expected outcome, never an
//! error, and one missing field can never affect extraction of another.
//! Malformed selectors and partial documents are tolerated the same way:
//! the candidate simply does not match.
//!
//! Everything here is **synchronous and pure**: `scraper`'s parsed types
//! are `!Send`, so callers parse and extract inside a non-async scope and
//! only carry owned `String`s across await points.

use scraper::{ElementRef, Html, Selector};

/// One rule for finding a field's value inside a document.
#[derive(Debug, Clone)]
pub enum Locator {
    /// Text of the first element matching a CSS selector.
    Css(String),
    /// Attribute value of the first element matching a CSS selector.
    CssAttr { selector: String, attr: String },
    /// `content` of `meta[property="…"]`.
    MetaProperty(String),
    /// First text node containing the given substring, returned whole.
    TextContains(String),
    /// Text of the first `<ul>` that follows a text node containing the
    /// given label (e.g. a "Benefits" heading).
    AfterHeading(String),
    /// Yields `"true"` when the selector matches at all. Presence probes
    /// (remote badges and the like).
    Present(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn attr(selector: impl Into<String>, attr: impl Into<String>) -> Self {
        Locator::CssAttr {
            selector: selector.into(),
            attr: attr.into(),
        }
    }

    pub fn meta(property: impl Into<String>) -> Self {
        Locator::MetaProperty(property.into())
    }

    pub fn text_contains(needle: impl Into<String>) -> Self {
        Locator::TextContains(needle.into())
    }

    pub fn after_heading(label: impl Into<String>) -> Self {
        Locator::AfterHeading(label.into())
    }

    pub fn present(selector: impl Into<String>) -> Self {
        Locator::Present(selector.into())
    }
}

/// Ordered candidate locators for one output field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub locators: Vec<Locator>,
}

impl FieldSpec {
    pub fn new(name: &'static str, locators: Vec<Locator>) -> Self {
        Self { name, locators }
    }
}

/// Try each candidate locator in order; first non-empty match wins.
pub fn extract(doc: &Html, spec: &FieldSpec) -> Option<String> {
    spec.locators.iter().find_map(|loc| extract_one(doc, loc))
}

/// Evaluate a single locator against the document.
pub fn extract_one(doc: &Html, locator: &Locator) -> Option<String> {
    match locator {
        Locator::Css(selector) => {
            let sel = Selector::parse(selector).ok()?;
            doc.select(&sel).find_map(|el| non_empty(element_text(&el)))
        }
        Locator::CssAttr { selector, attr } => {
            let sel = Selector::parse(selector).ok()?;
            doc.select(&sel)
                .find_map(|el| el.value().attr(attr).and_then(|v| non_empty(v.to_string())))
        }
        Locator::MetaProperty(property) => {
            let sel = Selector::parse(&format!(r#"meta[property="{property}"]"#)).ok()?;
            doc.select(&sel)
                .find_map(|el| el.value().attr("content").and_then(|v| non_empty(v.to_string())))
        }
        Locator::TextContains(needle) => first_text_containing(doc, needle),
        Locator::AfterHeading(label) => list_after_heading(doc, label),
        Locator::Present(selector) => {
            if present(doc, selector) {
                Some("true".to_string())
            } else {
                None
            }
        }
    }
}

/// Whether any element matches the selector. A malformed selector counts
/// as not present.
pub fn present(doc: &Html, selector: &str) -> bool {
    match Selector::parse(selector) {
        Ok(sel) => doc.select(&sel).next().is_some(),
        Err(_) => false,
    }
}

/// Collect one value per matching element: the given attribute when `attr`
/// is set, otherwise the element text. Empty values are skipped.
pub fn extract_each(doc: &Html, selector: &str, attr: Option<&str>) -> Vec<String> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };
    doc.select(&sel)
        .filter_map(|el| match attr {
            Some(a) => el.value().attr(a).and_then(|v| non_empty(v.to_string())),
            None => non_empty(element_text(&el)),
        })
        .collect()
}

/// Collect `(attribute, text)` per matching element; listing cards carry
/// their identifier in an attribute and their title as text.
pub fn extract_each_with_text(doc: &Html, selector: &str, attr: &str) -> Vec<(String, String)> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };
    doc.select(&sel)
        .filter_map(|el| {
            let id = el.value().attr(attr).and_then(|v| non_empty(v.to_string()))?;
            Some((id, element_text(&el)))
        })
        .collect()
}

/// Collect labeled `(key, value)` pairs from repeated items, e.g.
/// LinkedIn's job-criteria list. Items missing either part are skipped.
pub fn extract_pairs(
    doc: &Html,
    item_selector: &str,
    key_selector: &str,
    value_selector: &str,
) -> Vec<(String, String)> {
    let (Ok(item_sel), Ok(key_sel), Ok(val_sel)) = (
        Selector::parse(item_selector),
        Selector::parse(key_selector),
        Selector::parse(value_selector),
    ) else {
        return Vec::new();
    };
    doc.select(&item_sel)
        .filter_map(|item| {
            let key = item.select(&key_sel).next().map(|el| element_text(&el))?;
            let value = item.select(&val_sel).next().map(|el| element_text(&el))?;
            let key = non_empty(key)?;
            let value = non_empty(value)?;
            Some((key, value))
        })
        .collect()
}

/// Whitespace-collapsed text of an element's subtree.
pub fn element_text(el: &ElementRef<'_>) -> String {
    let raw: String = el.text().collect::<Vec<_>>().join(" ");
    collapse_ws(&raw)
}

/// Whether some text node, trimmed, equals `value` exactly. Stricter than
/// [`Locator::TextContains`]: a label mentioned inside prose does not count.
pub fn has_exact_text(doc: &Html, value: &str) -> bool {
    doc.root_element()
        .descendants()
        .any(|node| node.value().as_text().is_some_and(|t| t.trim() == value))
}

fn first_text_containing(doc: &Html, needle: &str) -> Option<String> {
    for node in doc.root_element().descendants() {
        if let Some(text) = node.value().as_text() {
            if text.contains(needle) {
                if let Some(v) = non_empty(collapse_ws(text)) {
                    return Some(v);
                }
            }
        }
    }
    None
}

fn list_after_heading(doc: &Html, label: &str) -> Option<String> {
    let mut seen_label = false;
    for node in doc.root_element().descendants() {
        if !seen_label {
            if let Some(text) = node.value().as_text() {
                if text.contains(label) {
                    seen_label = true;
                }
            }
        } else if let Some(el) = ElementRef::wrap(node) {
            if el.value().name() == "ul" {
                if let Some(v) = non_empty(element_text(&el)) {
                    return Some(v);
                }
            }
        }
    }
    None
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == s.len() {
        Some(s)
    } else {
        Some(trimmed.to_string())
    }
}
