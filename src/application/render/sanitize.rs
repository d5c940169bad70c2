use ammonia::Builder as AmmoniaBuilder;

/// Allow-list sanitizer applied to every rendered fragment. Ammonia's
/// defaults are extended with the structural tags Markdown produces; the
/// attribute surface is kept narrow so no allowed combination can execute
/// script. Disallowed markup is stripped, not escaped, and script/style
/// content is removed entirely.
pub(crate) fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    builder.add_tags(&[
        "p", "pre", "code", "span", "div", "h1", "h2", "h3", "h4", "h5", "h6", "table", "thead",
        "tbody", "tr", "th", "td", "blockquote", "hr", "br", "ul", "ol", "li", "em", "strong",
        "a", "img", "details", "summary",
    ]);

    // `rel` is caller-controlled markup here, so ammonia's automatic
    // rel-rewriting must be disabled before the attribute can be allowed.
    builder.link_rel(None);
    builder.add_tag_attributes("a", &["href", "title", "rel", "target"]);
    builder.add_tag_attributes("img", &["src", "alt", "title", "width", "height"]);
    builder.add_tag_attributes("code", &["class"]);
    builder.add_tag_attributes("span", &["class"]);
    builder.add_tag_attributes("div", &["class"]);
    builder.add_tag_attributes("pre", &["class"]);

    // Heading anchors.
    builder.add_generic_attributes(&["id"]);

    builder
}

#[cfg(test)]
mod tests {
    use super::build_sanitizer;

    fn clean(html: &str) -> String {
        build_sanitizer().clean(html).to_string()
    }

    #[test]
    fn strips_script_tags_and_their_content() {
        let html = clean("before<script>alert(1)</script>after");
        assert!(!html.contains("<script"));
        assert!(!html.contains("alert(1)"));
        assert!(html.contains("before"));
        assert!(html.contains("after"));
    }

    #[test]
    fn strips_mixed_case_script_tags() {
        let html = clean("<ScRiPt>alert(1)</ScRiPt>safe");
        assert!(!html.to_ascii_lowercase().contains("<script"));
        assert!(html.contains("safe"));
    }

    #[test]
    fn strips_event_handler_attributes() {
        let html = clean("<img src=\"https://example.com/x.png\" onerror=\"alert(1)\">");
        assert!(html.contains("<img"));
        assert!(!html.contains("onerror"));
    }

    #[test]
    fn rejects_javascript_scheme_urls() {
        let html = clean("<a href=\"javascript:alert(1)\">link</a>");
        assert!(!html.contains("javascript:"));
        assert!(html.contains("link"));

        let html = clean("<img src=\"javascript:alert(1)\">");
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn keeps_allowed_link_attributes() {
        let html = clean("<a href=\"https://example.com\" target=\"_blank\" rel=\"noopener\">x</a>");
        assert!(html.contains("href=\"https://example.com\""));
        assert!(html.contains("target=\"_blank\""));
        assert!(html.contains("rel=\"noopener\""));
    }

    #[test]
    fn keeps_class_on_code_containers_only() {
        let html = clean("<pre class=\"syntax-highlight\"><code class=\"language-rust\">x</code></pre>");
        assert!(html.contains("class=\"syntax-highlight\""));
        assert!(html.contains("class=\"language-rust\""));

        let html = clean("<a class=\"sneaky\" href=\"https://example.com\">x</a>");
        assert!(!html.contains("sneaky"));
    }

    #[test]
    fn keeps_details_and_summary() {
        let html = clean("<details><summary>more</summary>body</details>");
        assert!(html.contains("<details>"));
        assert!(html.contains("<summary>more</summary>"));
    }

    #[test]
    fn strips_style_blocks_entirely() {
        let html = clean("<style>body { display:none }</style>text");
        assert!(!html.contains("<style"));
        assert!(!html.contains("display:none"));
        assert!(html.contains("text"));
    }
}
