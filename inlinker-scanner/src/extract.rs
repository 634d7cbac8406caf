use scraper::{Html, Selector};

/// Text of every `<p>` element in document order, markup stripped and
/// trimmed.
///
/// Parsing is html5ever's error-recovering mode, so truncated or malformed
/// markup still yields whatever paragraphs can be recovered. A page without
/// paragraphs gives an empty vector.
pub fn extract_paragraphs(html: &str) -> Vec<String> {
    let Ok(paragraph_selector) = Selector::parse("p") else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&paragraph_selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs_in_document_order() {
        let html = r#"<html><body>
            <p>First paragraph.</p>
            <div><p>Second, nested.</p></div>
            <p>Third.</p>
        </body></html>"#;

        assert_eq!(
            extract_paragraphs(html),
            vec!["First paragraph.", "Second, nested.", "Third."]
        );
    }

    #[test]
    fn test_inline_markup_is_stripped() {
        let html = "<p>Read our <a href=\"/seo\">SEO <b>guide</b></a> today</p>";
        assert_eq!(extract_paragraphs(html), vec!["Read our SEO guide today"]);
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let html = "<p>\n      padded text   \n</p>";
        assert_eq!(extract_paragraphs(html), vec!["padded text"]);
    }

    #[test]
    fn test_non_paragraph_blocks_ignored() {
        let html = "<h1>Title</h1><div>div text</div><li>item</li><p>only this</p>";
        assert_eq!(extract_paragraphs(html), vec!["only this"]);
    }

    #[test]
    fn test_page_without_paragraphs_is_empty() {
        assert!(extract_paragraphs("<html><body><div>nothing</div></body></html>").is_empty());
        assert!(extract_paragraphs("").is_empty());
    }

    #[test]
    fn test_malformed_html_recovers_paragraphs() {
        // unclosed tags, stray closers, truncated document
        let html = "<html><body><p>one<p>two</span><div><p>three";
        assert_eq!(extract_paragraphs(html), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_not_html_at_all() {
        let paragraphs = extract_paragraphs("{\"json\": true}");
        assert!(paragraphs.is_empty());
    }

    #[test]
    fn test_empty_paragraph_kept_as_empty_block() {
        let html = "<p>   </p><p>text</p>";
        assert_eq!(extract_paragraphs(html), vec!["", "text"]);
    }
}
