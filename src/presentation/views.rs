//! Typed presentation builders. Every caller- or upstream-derived string
//! is escaped for the context it lands in: HTML body and attribute values
//! through askama's autoescaping, JavaScript through an explicit string
//! literal writer. The sanitized fragment is the only `|safe` insertion.

use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use url::Url;

use crate::{
    application::error::ErrorReport,
    domain::source::SourceLocator,
};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl IntoResponse for TemplateRenderError {
    fn into_response(self) -> Response {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let report = ErrorReport::from_error(self.source, status, &self.error);
        let mut response = (status, self.public_message).into_response();
        report.attach(&mut response);
        response
    }
}

pub fn render_template<T: Template>(
    source: &'static str,
    template: &T,
) -> Result<String, TemplateRenderError> {
    template.render().map_err(|error| TemplateRenderError {
        source,
        public_message: "Template rendering failed",
        error,
    })
}

/// Source metadata shown around the rendered fragment.
#[derive(Debug, Clone)]
pub struct DocumentView {
    pub title: String,
    pub repository: String,
    pub revision: String,
    pub raw_url: String,
    pub blob_url: String,
}

/// Standalone page embedding the fragment inside a styled container.
#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate {
    pub view: DocumentView,
    pub content: String,
    pub max_width: u32,
    pub padding: String,
}

/// Embeddable snippet frame without a document wrapper.
#[derive(Template)]
#[template(path = "fragment.html")]
pub struct FragmentTemplate {
    pub view: DocumentView,
    pub content: String,
}

/// Serialize a fragment as the single statement the embed script serves:
/// `document.write("...")`. The literal must round-trip exactly.
pub fn document_write_snippet(fragment: &str) -> String {
    format!("document.write({});\n", js_string_literal(fragment))
}

/// Escape arbitrary text into a double-quoted JavaScript string literal.
/// `<` is escaped so the emitted statement can never terminate an
/// enclosing `</script>` context.
fn js_string_literal(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => literal.push_str("\\\\"),
            '"' => literal.push_str("\\\""),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            '<' => literal.push_str("\\u003C"),
            '\u{2028}' => literal.push_str("\\u2028"),
            '\u{2029}' => literal.push_str("\\u2029"),
            ch if (ch as u32) < 0x20 => {
                literal.push_str(&format!("\\u{:04X}", ch as u32));
            }
            ch => literal.push(ch),
        }
    }
    literal.push('"');
    literal
}

/// Build the self-referential embed-script URL for a locator.
pub fn embed_script_src(
    public_base: &Url,
    locator: &SourceLocator,
    title: Option<&str>,
) -> Url {
    let mut src = public_base.clone();
    {
        let mut segments = src
            .path_segments_mut()
            .expect("public base url validated as non-opaque at startup");
        segments.pop_if_empty().push("md").push("embed.js");
    }
    src.set_query(None);
    {
        let mut pairs = src.query_pairs_mut();
        pairs
            .append_pair("repo", locator.repository())
            .append_pair("path", locator.path())
            .append_pair("ref", locator.revision());
        if let Some(title) = title {
            pairs.append_pair("title", title);
        }
    }
    src
}

/// The `<script src=...>` tag handed out by the snippet endpoint.
pub fn script_embed_tag(src: &Url) -> String {
    format!("<script src=\"{}\"></script>", html_attribute_escape(src.as_str()))
}

fn html_attribute_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            ch => escaped.push(ch),
        }
    }
    escaped
}
