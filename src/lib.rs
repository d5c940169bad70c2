//! Stateless relay that fetches remote Markdown and serves it as sanitized,
//! embeddable HTML.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
