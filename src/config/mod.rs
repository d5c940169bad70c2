//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "riquadro";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_PUBLIC_BASE_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";
const DEFAULT_WEB_BASE: &str = "https://github.com";
const DEFAULT_REVISION: &str = "main";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 15;
const DEFAULT_CACHE_MAX_AGE_SECS: u64 = 300;

/// Command-line arguments for the riquadro binary.
#[derive(Debug, Parser)]
#[command(name = "riquadro", version, about = "Markdown embed relay server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "RIQUADRO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the public base URL used for self-referential links.
    #[arg(long = "public-base-url", value_name = "URL")]
    pub public_base_url: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the raw-content base URL files are fetched from.
    #[arg(long = "upstream-raw-base", value_name = "URL")]
    pub upstream_raw_base: Option<String>,

    /// Override the browsable base URL files are linked to.
    #[arg(long = "upstream-web-base", value_name = "URL")]
    pub upstream_web_base: Option<String>,

    /// Override the revision used when the caller supplies none.
    #[arg(long = "upstream-default-revision", value_name = "REVISION")]
    pub upstream_default_revision: Option<String>,

    /// Override the outbound fetch timeout.
    #[arg(long = "upstream-timeout-seconds", value_name = "SECONDS")]
    pub upstream_timeout_seconds: Option<u64>,

    /// Override the response cache max-age.
    #[arg(long = "cache-max-age-seconds", value_name = "SECONDS")]
    pub cache_max_age_seconds: Option<u64>,

    /// Override the allowed CORS origins (comma-separated, `*` for any).
    #[arg(long = "cors-origins", value_name = "ORIGINS")]
    pub cors_origins: Option<String>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub upstream: UpstreamSettings,
    pub cache: CacheSettings,
    pub cors: CorsSettings,
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub public_base_url: Url,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub raw_base: Url,
    pub web_base: Url,
    pub default_revision: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub max_age_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct CorsSettings {
    pub origins: Vec<String>,
}

impl CorsSettings {
    pub fn allow_any(&self) -> bool {
        self.origins.iter().any(|origin| origin == "*")
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allow_any() || self.origins.iter().any(|allowed| allowed == origin)
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("RIQUADRO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    app: RawAppSettings,
    server: RawServerSettings,
    logging: RawLoggingSettings,
    upstream: RawUpstreamSettings,
    cache: RawCacheSettings,
    cors: RawCorsSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(url) = overrides.public_base_url.as_ref() {
            self.server.public_base_url = Some(url.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.upstream_raw_base.as_ref() {
            self.upstream.raw_base = Some(url.clone());
        }
        if let Some(url) = overrides.upstream_web_base.as_ref() {
            self.upstream.web_base = Some(url.clone());
        }
        if let Some(revision) = overrides.upstream_default_revision.as_ref() {
            self.upstream.default_revision = Some(revision.clone());
        }
        if let Some(seconds) = overrides.upstream_timeout_seconds {
            self.upstream.timeout_seconds = Some(seconds);
        }
        if let Some(seconds) = overrides.cache_max_age_seconds {
            self.cache.max_age_seconds = Some(seconds);
        }
        if let Some(origins) = overrides.cors_origins.as_ref() {
            self.cors.origins = Some(RawCorsOrigins::Csv(origins.clone()));
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            app,
            server,
            logging,
            upstream,
            cache,
            cors,
        } = raw;

        let app = build_app_settings(app);
        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let upstream = build_upstream_settings(upstream)?;
        let cache = build_cache_settings(cache);
        let cors = build_cors_settings(cors)?;

        Ok(Self {
            app,
            server,
            logging,
            upstream,
            cache,
            cors,
        })
    }
}

fn build_app_settings(app: RawAppSettings) -> AppSettings {
    AppSettings {
        name: app
            .name
            .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string()),
        version: app
            .version
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let public_base_url = parse_base_url(
        server
            .public_base_url
            .as_deref()
            .unwrap_or(DEFAULT_PUBLIC_BASE_URL),
        "server.public_base_url",
    )?;

    Ok(ServerSettings {
        addr,
        public_base_url,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_upstream_settings(upstream: RawUpstreamSettings) -> Result<UpstreamSettings, LoadError> {
    let raw_base = parse_base_url(
        upstream.raw_base.as_deref().unwrap_or(DEFAULT_RAW_BASE),
        "upstream.raw_base",
    )?;
    let web_base = parse_base_url(
        upstream.web_base.as_deref().unwrap_or(DEFAULT_WEB_BASE),
        "upstream.web_base",
    )?;

    let default_revision = upstream
        .default_revision
        .unwrap_or_else(|| DEFAULT_REVISION.to_string());
    if default_revision.trim().is_empty() {
        return Err(LoadError::invalid(
            "upstream.default_revision",
            "must not be empty",
        ));
    }

    let timeout_seconds = upstream
        .timeout_seconds
        .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS);
    if timeout_seconds == 0 {
        return Err(LoadError::invalid(
            "upstream.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(UpstreamSettings {
        raw_base,
        web_base,
        default_revision,
        timeout: Duration::from_secs(timeout_seconds),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> CacheSettings {
    CacheSettings {
        max_age_seconds: cache.max_age_seconds.unwrap_or(DEFAULT_CACHE_MAX_AGE_SECS),
    }
}

fn build_cors_settings(cors: RawCorsSettings) -> Result<CorsSettings, LoadError> {
    let origins = match cors.origins {
        None => vec!["*".to_string()],
        Some(RawCorsOrigins::List(list)) => list,
        Some(RawCorsOrigins::Csv(csv)) => csv
            .split(',')
            .map(|origin| origin.trim().to_string())
            .collect(),
    };

    let origins: Vec<String> = origins
        .into_iter()
        .filter(|origin| !origin.is_empty())
        .collect();
    if origins.is_empty() {
        return Err(LoadError::invalid(
            "cors.origins",
            "must list at least one origin or `*`",
        ));
    }

    Ok(CorsSettings { origins })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAppSettings {
    name: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    public_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUpstreamSettings {
    raw_base: Option<String>,
    web_base: Option<String>,
    default_revision: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    max_age_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCorsSettings {
    origins: Option<RawCorsOrigins>,
}

/// Config files provide a list; environment variables and the CLI provide a
/// comma-separated string. Both shapes are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawCorsOrigins {
    List(Vec<String>),
    Csv(String),
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_base_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    let url = Url::parse(value.trim_end_matches('/'))
        .map_err(|err| LoadError::invalid(key, format!("invalid url: {err}")))?;
    if url.cannot_be_a_base() {
        return Err(LoadError::invalid(key, "url must be an absolute base"));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_section() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

        assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
        assert_eq!(
            settings.upstream.raw_base.host_str(),
            Some("raw.githubusercontent.com")
        );
        assert_eq!(settings.upstream.default_revision, DEFAULT_REVISION);
        assert_eq!(
            settings.upstream.timeout,
            Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS)
        );
        assert_eq!(settings.cache.max_age_seconds, DEFAULT_CACHE_MAX_AGE_SECS);
        assert!(settings.cors.allow_any());
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.server.port = Some(4000);
        raw.logging.level = Some("info".to_string());

        let overrides = Overrides {
            server_port: Some(4321),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        raw.apply_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 4321);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = RawSettings::default();
        let overrides = Overrides {
            log_json: Some(true),
            ..Default::default()
        };

        raw.apply_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn cors_origins_accept_comma_separated_values() {
        let mut raw = RawSettings::default();
        raw.cors.origins = Some(RawCorsOrigins::Csv(
            "https://a.example, https://b.example".to_string(),
        ));

        let settings = Settings::from_raw(raw).expect("valid settings");
        assert!(!settings.cors.allow_any());
        assert!(settings.cors.is_allowed("https://a.example"));
        assert!(settings.cors.is_allowed("https://b.example"));
        assert!(!settings.cors.is_allowed("https://c.example"));
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut raw = RawSettings::default();
        raw.server.port = Some(0);
        assert!(Settings::from_raw(raw).is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut raw = RawSettings::default();
        raw.upstream.timeout_seconds = Some(0);
        assert!(Settings::from_raw(raw).is_err());
    }

    #[test]
    fn opaque_base_url_is_rejected() {
        let mut raw = RawSettings::default();
        raw.upstream.raw_base = Some("data:text/plain,nope".to_string());
        assert!(Settings::from_raw(raw).is_err());
    }

    #[test]
    fn parse_cli_overrides() {
        let args = CliArgs::parse_from([
            "riquadro",
            "--server-host",
            "0.0.0.0",
            "--upstream-raw-base",
            "https://mirror.example",
            "--cors-origins",
            "https://a.example",
        ]);

        assert_eq!(args.overrides.server_host.as_deref(), Some("0.0.0.0"));
        assert_eq!(
            args.overrides.upstream_raw_base.as_deref(),
            Some("https://mirror.example")
        );
        assert_eq!(
            args.overrides.cors_origins.as_deref(),
            Some("https://a.example")
        );
    }
}
