use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::domain::error::DomainError;

use super::{fetch::FetchError, render::RenderError, resolver::ResolveError};

/// Diagnostic detail carried alongside an error response so the logging
/// middleware can emit the full cause chain without leaking it to clients.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Terminal pipeline failures. None are retried; none outlive the response.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl RelayError {
    fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Domain(_) | RelayError::Resolve(_) => StatusCode::BAD_REQUEST,
            RelayError::Fetch(FetchError::Upstream { status }) => {
                // The upstream status is propagated verbatim; anything that
                // is not a representable response code degrades to 502.
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            RelayError::Fetch(FetchError::Unreachable { .. }) => StatusCode::BAD_GATEWAY,
            RelayError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn presentation_message(&self) -> &'static str {
        match self {
            RelayError::Domain(_) | RelayError::Resolve(_) => "invalid parameters",
            RelayError::Fetch(FetchError::Upstream { .. }) => "upstream error",
            RelayError::Fetch(FetchError::Unreachable { .. }) => "upstream unreachable",
            RelayError::Render(_) => "render failed",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.presentation_message();
        let report = ErrorReport::from_error("application::error::RelayError", status, &self);
        let mut response = (status, message).into_response();
        report.attach(&mut response);
        response
    }
}
