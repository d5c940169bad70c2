use axum::{
    Json,
    body::Body,
    extract::{Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE, ETAG},
    },
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    application::{
        error::RelayError,
        relay::{PresentationOptions, RawDocument, RenderedDocument},
    },
    domain::source::SourceLocator,
    presentation::views::{
        DocumentView, FragmentTemplate, PageTemplate, document_write_snippet, embed_script_src,
        render_template, script_embed_tag,
    },
};

use super::RelayState;

#[derive(Debug, Deserialize)]
pub(super) struct SourceQuery {
    repo: String,
    path: String,
    #[serde(rename = "ref")]
    revision: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PageQuery {
    repo: String,
    path: String,
    #[serde(rename = "ref")]
    revision: Option<String>,
    max_width: Option<u32>,
    padding: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FragmentQuery {
    repo: String,
    path: String,
    #[serde(rename = "ref")]
    revision: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SnippetQuery {
    url: String,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawUrlQuery {
    github_url: String,
}

pub(super) async fn health(State(state): State<RelayState>) -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "name": state.app_name,
        "version": state.app_version,
    }))
    .into_response()
}

pub(super) async fn md_raw(
    State(state): State<RelayState>,
    Query(query): Query<SourceQuery>,
) -> Response {
    let locator = match state
        .relay
        .locator(&query.repo, &query.path, query.revision.as_deref())
    {
        Ok(locator) => locator,
        Err(err) => return RelayError::from(err).into_response(),
    };

    match state.relay.fetch_raw(&locator).await {
        Ok(raw) => raw_markdown_response(raw, state.cache_max_age),
        Err(err) => err.into_response(),
    }
}

pub(super) async fn md_html(
    State(state): State<RelayState>,
    Query(query): Query<PageQuery>,
) -> Response {
    let locator = match state
        .relay
        .locator(&query.repo, &query.path, query.revision.as_deref())
    {
        Ok(locator) => locator,
        Err(err) => return RelayError::from(err).into_response(),
    };
    let options = match PresentationOptions::new(query.max_width, query.padding, query.title) {
        Ok(options) => options,
        Err(err) => return RelayError::from(err).into_response(),
    };

    match state
        .relay
        .render_document(&locator, options.title.as_deref())
        .await
    {
        Ok((document, urls)) => {
            let etag = document.etag.clone();
            let content = document.html.clone();
            let template = PageTemplate {
                view: document_view(&locator, document, urls.raw.as_str(), urls.blob.as_str()),
                content,
                max_width: options.max_width,
                padding: options.padding.clone(),
            };
            html_document_response(template, &etag, state.cache_max_age)
        }
        Err(err) => err.into_response(),
    }
}

pub(super) async fn md_fragment(
    State(state): State<RelayState>,
    Query(query): Query<FragmentQuery>,
) -> Response {
    let locator = match state
        .relay
        .locator(&query.repo, &query.path, query.revision.as_deref())
    {
        Ok(locator) => locator,
        Err(err) => return RelayError::from(err).into_response(),
    };

    match state
        .relay
        .render_document(&locator, query.title.as_deref())
        .await
    {
        Ok((document, urls)) => {
            let etag = document.etag.clone();
            let template = fragment_template(&locator, document, urls.raw.as_str(), urls.blob.as_str());
            match render_template("infra::http::relay::md_fragment", &template) {
                Ok(html) => {
                    let mut response = Html(html).into_response();
                    set_cache_headers(&mut response, &etag, state.cache_max_age);
                    response
                }
                Err(err) => err.into_response(),
            }
        }
        Err(err) => err.into_response(),
    }
}

pub(super) async fn md_embed_js(
    State(state): State<RelayState>,
    Query(query): Query<FragmentQuery>,
) -> Response {
    let locator = match state
        .relay
        .locator(&query.repo, &query.path, query.revision.as_deref())
    {
        Ok(locator) => locator,
        Err(err) => return RelayError::from(err).into_response(),
    };

    match state
        .relay
        .render_document(&locator, query.title.as_deref())
        .await
    {
        Ok((document, urls)) => {
            let etag = document.etag.clone();
            let template = fragment_template(&locator, document, urls.raw.as_str(), urls.blob.as_str());
            match render_template("infra::http::relay::md_embed_js", &template) {
                Ok(fragment) => {
                    let mut response = Response::new(Body::from(document_write_snippet(&fragment)));
                    response.headers_mut().insert(
                        CONTENT_TYPE,
                        HeaderValue::from_static("application/javascript; charset=utf-8"),
                    );
                    set_cache_headers(&mut response, &etag, state.cache_max_age);
                    response
                }
                Err(err) => err.into_response(),
            }
        }
        Err(err) => err.into_response(),
    }
}

pub(super) async fn md_snippet(
    State(state): State<RelayState>,
    Query(query): Query<SnippetQuery>,
) -> Response {
    let locator = match state.relay.resolver().parse_blob_url(&query.url) {
        Ok(locator) => locator,
        Err(err) => return RelayError::from(err).into_response(),
    };

    let src = embed_script_src(&state.public_base_url, &locator, query.title.as_deref());
    let mut response = Response::new(Body::from(script_embed_tag(&src)));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

pub(super) async fn raw_url(
    State(state): State<RelayState>,
    Query(query): Query<RawUrlQuery>,
) -> Response {
    match state.relay.resolver().raw_url_from_blob(&query.github_url) {
        Ok(raw_url) => Json(serde_json::json!({ "raw_url": raw_url })).into_response(),
        Err(err) => RelayError::from(err).into_response(),
    }
}

fn document_view(
    locator: &SourceLocator,
    document: RenderedDocument,
    raw_url: &str,
    blob_url: &str,
) -> DocumentView {
    DocumentView {
        title: document.title,
        repository: locator.repository().to_string(),
        revision: locator.revision().to_string(),
        raw_url: raw_url.to_string(),
        blob_url: blob_url.to_string(),
    }
}

fn fragment_template(
    locator: &SourceLocator,
    document: RenderedDocument,
    raw_url: &str,
    blob_url: &str,
) -> FragmentTemplate {
    let content = document.html.clone();
    FragmentTemplate {
        view: document_view(locator, document, raw_url, blob_url),
        content,
    }
}

fn raw_markdown_response(raw: RawDocument, max_age: u64) -> Response {
    let mut response = Response::new(Body::from(raw.body));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/markdown; charset=utf-8"),
    );
    set_cache_headers(&mut response, &raw.etag, max_age);
    response
}

fn html_document_response(template: PageTemplate, etag: &str, max_age: u64) -> Response {
    match render_template("infra::http::relay::md_html", &template) {
        Ok(html) => {
            let mut response = (StatusCode::OK, Html(html)).into_response();
            set_cache_headers(&mut response, etag, max_age);
            response
        }
        Err(err) => err.into_response(),
    }
}

fn set_cache_headers(response: &mut Response, etag: &str, max_age: u64) {
    if let Ok(value) = HeaderValue::from_str(etag) {
        response.headers_mut().insert(ETAG, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={max_age}")) {
        response.headers_mut().insert(CACHE_CONTROL, value);
    }
}
