//! Deterministic mapping between locators and upstream URLs.

use thiserror::Error;
use url::Url;

use crate::domain::{error::DomainError, source::SourceLocator};

/// Upstream addresses derived from one locator: the raw-content URL the
/// relay fetches, and the browsable URL shown to readers.
#[derive(Debug, Clone)]
pub struct SourceUrls {
    pub raw: Url,
    pub blob: Url,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("url could not be parsed: {0}")]
    Malformed(#[from] url::ParseError),
    #[error("host `{host}` is not the configured source host")]
    UnexpectedHost { host: String },
    #[error("url path does not follow the `owner/repo/blob/revision/path` shape")]
    UnexpectedShape,
    #[error(transparent)]
    Locator(#[from] DomainError),
}

/// Pure URL arithmetic over the configured raw-content and browsable bases.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    raw_base: Url,
    web_base: Url,
}

impl SourceResolver {
    pub fn new(raw_base: Url, web_base: Url) -> Self {
        Self { raw_base, web_base }
    }

    /// Build both upstream URLs for a locator. Fields were validated at
    /// construction, so they are concatenated as path segments verbatim.
    pub fn resolve(&self, locator: &SourceLocator) -> Result<SourceUrls, ResolveError> {
        let raw = Url::parse(&format!(
            "{}/{}/{}/{}",
            base_str(&self.raw_base),
            locator.repository(),
            locator.revision(),
            locator.path(),
        ))?;
        let blob = Url::parse(&format!(
            "{}/{}/blob/{}/{}",
            base_str(&self.web_base),
            locator.repository(),
            locator.revision(),
            locator.path(),
        ))?;

        Ok(SourceUrls { raw, blob })
    }

    /// Inverse of [`resolve`](Self::resolve) for browsable file URLs:
    /// `https://host/owner/repo/blob/<revision>/<path...>` back into a locator.
    pub fn parse_blob_url(&self, input: &str) -> Result<SourceLocator, ResolveError> {
        let url = Url::parse(input)?;

        if url.host_str() != self.web_base.host_str() {
            return Err(ResolveError::UnexpectedHost {
                host: url.host_str().unwrap_or_default().to_string(),
            });
        }

        let segments: Vec<&str> = url
            .path_segments()
            .ok_or(ResolveError::UnexpectedShape)?
            .collect();
        if segments.len() < 5 || segments[2] != "blob" {
            return Err(ResolveError::UnexpectedShape);
        }

        let repository = format!("{}/{}", segments[0], segments[1]);
        let revision = segments[3];
        let path = segments[4..].join("/");

        Ok(SourceLocator::new(&repository, &path, revision)?)
    }

    /// Rewrite a browsable file URL into its raw-content equivalent by
    /// substituting the hosting domain and dropping the `/blob/` segment.
    pub fn raw_url_from_blob(&self, input: &str) -> Result<String, ResolveError> {
        let web_host = self.web_base.host_str().unwrap_or_default();
        let raw_host = self.raw_base.host_str().unwrap_or_default();

        if !input.contains(web_host) || !input.contains("/blob/") {
            return Err(ResolveError::UnexpectedShape);
        }

        Ok(input
            .replacen(web_host, raw_host, 1)
            .replacen("/blob/", "/", 1))
    }
}

fn base_str(base: &Url) -> &str {
    base.as_str().trim_end_matches('/')
}
