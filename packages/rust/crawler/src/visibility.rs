//! Human-visibility test for HTML text nodes.

use std::sync::LazyLock;

use regex::Regex;

/// Parent elements whose text never renders as page content.
const HIDDEN_PARENTS: &[&str] = &["style", "script", "head", "title"];

/// Text that is an HTML comment in its entirety.
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^<!--.*-->").expect("comment regex"));

/// Whether a text node is visible to a reader.
///
/// `parent_tag` is the name of the enclosing element, or `None` when the node
/// hangs directly off the document root.
pub fn is_visible(parent_tag: Option<&str>, text: &str) -> bool {
    let Some(tag) = parent_tag else {
        return false;
    };
    if HIDDEN_PARENTS
        .iter()
        .any(|hidden| tag.eq_ignore_ascii_case(hidden))
    {
        return false;
    }
    !COMMENT_RE.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_parents_are_invisible() {
        for tag in ["style", "script", "head", "title", "SCRIPT"] {
            assert!(!is_visible(Some(tag), "body { color: red }"), "{tag}");
        }
    }

    #[test]
    fn document_root_is_invisible() {
        assert!(!is_visible(None, "html"));
    }

    #[test]
    fn comment_text_is_invisible() {
        assert!(!is_visible(Some("div"), "<!-- tracking -->"));
        assert!(!is_visible(Some("div"), "<!--\nmultiline\n-->"));
    }

    #[test]
    fn ordinary_text_is_visible() {
        assert!(is_visible(Some("p"), "Photons exhibit determinism."));
        assert!(is_visible(Some("span"), "Abstract:"));
        assert!(is_visible(Some("blockquote"), "\n"));
        assert!(is_visible(Some("p"), "a <!-- b --> c"));
    }
}
