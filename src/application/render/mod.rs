//! Markdown to sanitized HTML, plus content hashing for entity tags.

mod highlight;
mod sanitize;

use comrak::{
    Arena, Options, format_html,
    nodes::{AstNode, NodeHtmlBlock, NodeValue},
    parse_document,
};
use sha2::{Digest, Sha256};
use syntect::{html::ClassStyle, parsing::SyntaxSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("markdown could not be serialized: {message}")]
    Markdown { message: String },
    #[error("failed to highlight `{language}` code block: {message}")]
    Highlighting { language: String, message: String },
}

/// Comrak-based rendering pipeline with syntect highlighting and ammonia
/// sanitisation. Conversion is total over arbitrary text input: malformed
/// Markdown degrades to literal output and unsafe HTML is stripped, never
/// rejected.
pub struct MarkdownRenderService {
    options: Options<'static>,
    syntax_set: SyntaxSet,
    class_style: ClassStyle,
    sanitizer: ammonia::Builder<'static>,
}

impl MarkdownRenderService {
    pub fn new() -> Self {
        Self {
            options: default_options(),
            syntax_set: SyntaxSet::load_defaults_newlines(),
            class_style: ClassStyle::SpacedPrefixed { prefix: "syntax-" },
            sanitizer: sanitize::build_sanitizer(),
        }
    }

    /// Convert Markdown into a sanitized HTML fragment.
    pub fn render(&self, markdown: &str) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);

        highlight_stage(root, &self.syntax_set, &self.class_style)?;
        let html = render_html_stage(root, &self.options)?;

        Ok(self.sanitizer.clean(&html).to_string())
    }
}

impl Default for MarkdownRenderService {
    fn default() -> Self {
        Self::new()
    }
}

/// Hex SHA-256 of the upstream raw bytes; used as the response entity tag.
/// Changes if and only if the fetched bytes change.
pub fn etag_for(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

fn default_options() -> Options<'static> {
    let mut options = Options::default();

    let ext = &mut options.extension;
    ext.table = true;
    ext.strikethrough = true;
    ext.autolink = true;
    ext.header_ids = Some(String::new());
    ext.alerts = true;

    let render = &mut options.render;
    render.hardbreaks = true;
    render.github_pre_lang = true;
    render.full_info_string = true;
    // Raw HTML flows through to the sanitizer, which is the sole XSS defense.
    render.r#unsafe = true;

    options
}

/// Replace fenced code blocks with pre-highlighted HTML blocks before
/// serialization; the sanitizer sees only class-annotated spans.
fn highlight_stage<'a>(
    node: &'a AstNode<'a>,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> Result<(), RenderError> {
    if let Some((info, literal)) = extract_code_block(node) {
        let language = info.split_whitespace().next().map(|s| s.to_string());
        let html = highlight::highlight_code(
            language.as_deref(),
            &literal,
            syntax_set,
            class_style,
        )?;
        let mut data = node.data.borrow_mut();
        data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
            block_type: 0,
            literal: html,
        });
    }

    let mut child = node.first_child();
    while let Some(next) = child {
        highlight_stage(next, syntax_set, class_style)?;
        child = next.next_sibling();
    }

    Ok(())
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &Options<'static>,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}

fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    if let NodeValue::CodeBlock(block) = &data.value {
        if block.fenced {
            let info = block.info.trim().to_string();
            let literal = block.literal.clone();
            return Some((info, literal));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> String {
        MarkdownRenderService::new()
            .render(markdown)
            .expect("render succeeds")
    }

    #[test]
    fn renders_basic_markdown() {
        let html = render("# Title\n\nSome *emphasis* here.");
        assert!(html.contains("<h1"));
        assert!(html.contains("<em>emphasis</em>"));
    }

    #[test]
    fn headings_carry_anchor_ids() {
        let html = render("# Getting Started");
        assert!(html.contains("id=\"getting-started\""));
    }

    #[test]
    fn tables_are_rendered() {
        let html = render("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn fenced_code_is_highlighted_with_classes() {
        let html = render("```rust\nfn main() {}\n```");
        assert!(html.contains("language-rust"));
        assert!(html.contains("<pre"));
    }

    #[test]
    fn single_newlines_become_hard_breaks() {
        let html = render("line one\nline two");
        assert!(html.contains("<br"));
    }

    #[test]
    fn alert_blocks_are_rendered() {
        let html = render("> [!NOTE]\n> heads up");
        assert!(html.contains("markdown-alert"));
    }

    #[test]
    fn conversion_is_total_over_malformed_input() {
        let html = render("[broken](http://\n\n```unterminated\n<<<>>>");
        assert!(!html.is_empty());
    }

    #[test]
    fn etag_is_a_pure_function_of_bytes() {
        assert_eq!(etag_for(b"# Hi"), etag_for(b"# Hi"));
        assert_ne!(etag_for(b"# Hi"), etag_for(b"# Hi!"));
    }

    #[test]
    fn etag_is_lowercase_hex_sha256() {
        let etag = etag_for(b"# Hi");
        assert_eq!(etag.len(), 64);
        assert!(etag.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
