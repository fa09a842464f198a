use crate::url_to_recipe::fetchers::RecipeDocument;
use log::{debug, warn};
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;

static JSON_LD_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("script[type='application/ld+json']").expect("valid JSON-LD selector")
});

/// Structured-data blocks of `document`, in document order.
///
/// Blocks are parsed as the iterator advances. Tags whose body is not valid
/// JSON are logged and skipped; an empty iterator means the page carries no
/// usable markup.
pub fn locate(document: &RecipeDocument) -> impl Iterator<Item = Value> + '_ {
    locate_in_html(document.html())
}

pub fn locate_in_html(html: &Html) -> impl Iterator<Item = Value> + '_ {
    html.select(&JSON_LD_SELECTOR)
        .enumerate()
        .filter_map(|(index, script)| {
            let raw: String = script.text().collect();
            match parse_block(&raw) {
                Ok(value) => {
                    debug!("Parsed JSON-LD block {}", index);
                    Some(value)
                }
                Err(e) => {
                    warn!("Error parsing JSON-LD block {}: {}", index, e);
                    None
                }
            }
        })
}

/// Parse one tag body, dropping a single trailing `;`.
pub fn parse_block(raw: &str) -> Result<Value, serde_json::Error> {
    let trimmed = raw.trim();
    let body = trimmed.strip_suffix(';').unwrap_or(trimmed);
    serde_json::from_str(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(scripts: &[&str]) -> RecipeDocument {
        let tags: String = scripts
            .iter()
            .map(|body| format!(r#"<script type="application/ld+json">{body}</script>"#))
            .collect();
        RecipeDocument::parse(
            "http://example.com",
            &format!("<html><head>{tags}</head><body></body></html>"),
        )
    }

    #[test]
    fn test_trailing_semicolon_stripped() {
        assert_eq!(parse_block(r#"{"a":1};"#).unwrap(), json!({"a": 1}));
        assert_eq!(parse_block("  {\"a\":1} ;\n").unwrap(), json!({"a": 1}));
        assert_eq!(parse_block(r#"{"a":1}"#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_only_one_terminator_stripped() {
        assert!(parse_block(r#"{"a":1};;"#).is_err());
    }

    #[test]
    fn test_unparseable_blocks_skipped() {
        let doc = document(&[r#"{"broken": "#, r#"{"a":1};"#, "", r#"[{"b":2}]"#]);
        let blocks: Vec<Value> = locate(&doc).collect();
        assert_eq!(blocks, vec![json!({"a": 1}), json!([{"b": 2}])]);
    }

    #[test]
    fn test_no_blocks() {
        let doc = RecipeDocument::parse(
            "http://example.com",
            r#"<html><script type="text/javascript">var a = 1;</script></html>"#,
        );
        assert_eq!(locate(&doc).count(), 0);
    }
}
