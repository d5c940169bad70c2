use riquadro::application::render::MarkdownRenderService;

fn render(markdown: &str) -> String {
    MarkdownRenderService::new()
        .render(markdown)
        .expect("render succeeds")
}

#[test]
fn html_passthrough_script_is_stripped() {
    let html = render("before\n\n<script>window.location='https://evil.example'</script>\n\nafter");
    assert!(!html.contains("<script"));
    assert!(!html.contains("evil.example"));
    assert!(html.contains("before"));
    assert!(html.contains("after"));
}

#[test]
fn inline_html_script_is_stripped() {
    let html = render("text with <ScRiPt>alert(1)</ScRiPt> inline");
    assert!(!html.to_ascii_lowercase().contains("<script"));
    assert!(html.contains("text with"));
    assert!(html.contains("inline"));
}

#[test]
fn event_handlers_never_survive() {
    for (markdown, handler) in [
        (
            "<img src=\"https://example.com/a.png\" onerror=\"alert(1)\">",
            "onerror",
        ),
        ("<div onclick=\"alert(1)\">click</div>", "onclick"),
        (
            "<a href=\"https://example.com\" onmouseover=\"alert(1)\">link</a>",
            "onmouseover",
        ),
        ("<BODY ONLOAD=alert(1)>", "onload"),
    ] {
        let html = render(markdown);
        assert!(
            !html.to_ascii_lowercase().contains(handler),
            "`{handler}` survived in `{markdown}`: {html}"
        );
    }
}

#[test]
fn javascript_scheme_urls_never_survive() {
    for markdown in [
        "[click](javascript:alert(1))",
        "[click](JaVaScRiPt:alert(1))",
        "<a href=\"javascript:alert(1)\">click</a>",
        "<img src=\"javascript:alert(1)\">",
        "![alt](javascript:alert(1))",
    ] {
        let html = render(markdown);
        assert!(
            !html.to_ascii_lowercase().contains("javascript:"),
            "javascript url survived in `{markdown}`: {html}"
        );
    }
}

#[test]
fn markdown_expressed_scripts_inside_code_blocks_are_inert() {
    let html = render("```html\n<script>alert(1)</script>\n```");
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;"));
}

#[test]
fn safe_formatting_survives_sanitization() {
    let markdown = "\
# Heading

A [link](https://example.com) and an ![image](https://example.com/a.png).

| a | b |
|---|---|
| 1 | 2 |

> quoted

- item one
- item two

<details><summary>more</summary>hidden</details>
";
    let html = render(markdown);

    assert!(html.contains("<h1"));
    assert!(html.contains("href=\"https://example.com\""));
    assert!(html.contains("src=\"https://example.com/a.png\""));
    assert!(html.contains("<table>"));
    assert!(html.contains("<blockquote>"));
    assert!(html.contains("<li>item one</li>"));
    assert!(html.contains("<summary>more</summary>"));
}

#[test]
fn conversion_is_total_over_hostile_input() {
    for markdown in [
        "",
        "\u{0}",
        "[[[[",
        "<<<<<>>>>>",
        "```\nunterminated",
        "<div><div><div>",
        "<script",
        "<script>never closed",
    ] {
        let html = render(markdown);
        assert!(
            !html.to_ascii_lowercase().contains("<script"),
            "script markup survived in `{markdown:?}`: {html}"
        );
    }
}
