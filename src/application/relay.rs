//! The validate → resolve → fetch → render pipeline shared by every endpoint.

use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    config::UpstreamSettings,
    domain::{error::DomainError, source::SourceLocator},
};

use super::{
    error::RelayError,
    fetch::UpstreamClient,
    render::{MarkdownRenderService, etag_for},
    resolver::{SourceResolver, SourceUrls},
};

pub const MIN_CONTENT_WIDTH: u32 = 320;
pub const MAX_CONTENT_WIDTH: u32 = 1920;
const DEFAULT_CONTENT_WIDTH: u32 = 860;
const DEFAULT_PADDING: &str = "16px";

static PADDING_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+(px|em|rem|%)?( \d+(px|em|rem|%)?){0,3}$").expect("padding pattern")
});

/// Caller-supplied presentation knobs, validated by range and shape only;
/// they never affect rendering correctness. `padding` is constrained to a
/// CSS length list so no free-form text reaches the page style sheet.
#[derive(Debug, Clone)]
pub struct PresentationOptions {
    pub max_width: u32,
    pub padding: String,
    pub title: Option<String>,
}

impl PresentationOptions {
    pub fn new(
        max_width: Option<u32>,
        padding: Option<String>,
        title: Option<String>,
    ) -> Result<Self, DomainError> {
        let max_width = max_width.unwrap_or(DEFAULT_CONTENT_WIDTH);
        if !(MIN_CONTENT_WIDTH..=MAX_CONTENT_WIDTH).contains(&max_width) {
            return Err(DomainError::validation(format!(
                "max_width must be within {MIN_CONTENT_WIDTH}..={MAX_CONTENT_WIDTH}"
            )));
        }

        let padding = padding.unwrap_or_else(|| DEFAULT_PADDING.to_string());
        if !PADDING_PATTERN.is_match(&padding) {
            return Err(DomainError::validation(
                "padding must be up to four space-separated CSS lengths such as `16px` or `1em 8px`",
            ));
        }

        Ok(Self {
            max_width,
            padding,
            title,
        })
    }
}

impl Default for PresentationOptions {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_CONTENT_WIDTH,
            padding: DEFAULT_PADDING.to_string(),
            title: None,
        }
    }
}

/// Raw upstream bytes plus their entity tag; the `/md/raw` payload.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub body: Bytes,
    pub etag: String,
}

/// Sanitized fragment derived from one fetch. The entity tag hashes the
/// upstream raw bytes, not the rendered HTML.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub html: String,
    pub etag: String,
    pub title: String,
}

pub struct RelayService {
    resolver: SourceResolver,
    upstream: UpstreamClient,
    renderer: MarkdownRenderService,
    default_revision: String,
}

impl RelayService {
    pub fn new(settings: &UpstreamSettings, upstream: UpstreamClient) -> Self {
        Self {
            resolver: SourceResolver::new(settings.raw_base.clone(), settings.web_base.clone()),
            upstream,
            renderer: MarkdownRenderService::new(),
            default_revision: settings.default_revision.clone(),
        }
    }

    /// Validate raw request parameters into a locator. Performed before
    /// any network call; failure is terminal for the request.
    pub fn locator(
        &self,
        repo: &str,
        path: &str,
        revision: Option<&str>,
    ) -> Result<SourceLocator, DomainError> {
        SourceLocator::new(repo, path, revision.unwrap_or(&self.default_revision))
    }

    pub fn resolver(&self) -> &SourceResolver {
        &self.resolver
    }

    /// Fetch the file behind a locator without rendering it.
    pub async fn fetch_raw(&self, locator: &SourceLocator) -> Result<RawDocument, RelayError> {
        let urls = self.resolver.resolve(locator)?;
        let body = self.upstream.fetch(&urls.raw).await?;
        let etag = etag_for(&body);
        Ok(RawDocument { body, etag })
    }

    /// Fetch and render the file behind a locator. The title falls back to
    /// the final segment of the source path when the caller supplies none.
    pub async fn render_document(
        &self,
        locator: &SourceLocator,
        title: Option<&str>,
    ) -> Result<(RenderedDocument, SourceUrls), RelayError> {
        let urls = self.resolver.resolve(locator)?;
        let body = self.upstream.fetch(&urls.raw).await?;
        let etag = etag_for(&body);

        let markdown = String::from_utf8_lossy(&body);
        let html = self.renderer.render(&markdown)?;

        let title = title
            .map(str::to_string)
            .unwrap_or_else(|| locator.file_name().to_string());

        Ok((RenderedDocument { html, etag, title }, urls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presentation_defaults_apply_when_absent() {
        let options = PresentationOptions::new(None, None, None).expect("defaults");
        assert_eq!(options.max_width, DEFAULT_CONTENT_WIDTH);
        assert_eq!(options.padding, DEFAULT_PADDING);
        assert!(options.title.is_none());
    }

    #[test]
    fn max_width_is_range_checked() {
        assert!(PresentationOptions::new(Some(319), None, None).is_err());
        assert!(PresentationOptions::new(Some(1921), None, None).is_err());
        assert!(PresentationOptions::new(Some(320), None, None).is_ok());
        assert!(PresentationOptions::new(Some(1920), None, None).is_ok());
    }

    #[test]
    fn padding_accepts_css_length_lists() {
        for padding in ["16px", "0", "1em 8px", "8px 12px 8px 12px", "50%"] {
            assert!(
                PresentationOptions::new(None, Some(padding.to_string()), None).is_ok(),
                "padding `{padding}` should be accepted"
            );
        }
    }

    #[test]
    fn padding_rejects_markup_and_css_escapes() {
        for padding in ["16px; background:url(x)", "</style>", "16px}", "expression(1)"] {
            assert!(
                PresentationOptions::new(None, Some(padding.to_string()), None).is_err(),
                "padding `{padding}` should be rejected"
            );
        }
    }
}
