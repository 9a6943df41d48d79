//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{fmt, net::SocketAddr, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use time::{Date, macros::format_description};
use tracing::level_filters::LevelFilter;
use url::Url;

mod cli;

pub use cli::{CliArgs, Command, ServeArgs, ServeOverrides};

use crate::cache::{CacheConfig, default_ttl};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "jha-site";
const ENV_PREFIX: &str = "JHA";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_SITE_URL: &str = "https://jha.kr";
const DEFAULT_SITE_NAME: &str = "JHA (Korea)";
const DEFAULT_DATASET: &str = "production";
const DEFAULT_API_VERSION: &str = "2024-12-03";
const DEFAULT_CMS_TIMEOUT_SECS: u64 = 10;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub site: SiteSettings,
    pub cms: CmsSettings,
    pub revalidate: RevalidateSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteEnvironment {
    Development,
    Production,
}

impl SiteEnvironment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for SiteEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiteEnvironment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!(
                "unknown environment `{other}` (expected development or production)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    /// Absolute origin without a trailing slash, e.g. `https://jha.kr`.
    pub base_url: Url,
    pub name: String,
    pub environment: SiteEnvironment,
}

impl SiteSettings {
    /// Absolute URL for a site path.
    pub fn absolute_url(&self, path: &str) -> String {
        let origin = self.base_url.as_str().trim_end_matches('/');
        if path.is_empty() || path == "/" {
            format!("{origin}/")
        } else if path.starts_with('/') {
            format!("{origin}{path}")
        } else {
            format!("{origin}/{path}")
        }
    }
}

#[derive(Debug, Clone)]
pub struct CmsSettings {
    pub project_id: String,
    pub dataset: String,
    /// Version date without the leading `v`, e.g. `2024-12-03`.
    pub api_version: String,
    pub use_cdn: bool,
    pub token: Option<String>,
    pub timeout: Duration,
    /// Replaces `https://{project}.api.sanity.io` when set.
    pub api_base_url: Option<Url>,
}

#[derive(Clone, Default)]
pub struct RevalidateSettings {
    /// `None` makes the webhook refuse every call.
    pub secret: Option<String>,
}

impl fmt::Debug for RevalidateSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevalidateSettings")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enable_query_cache: bool,
    pub enable_response_cache: bool,
    pub query_limit: usize,
    pub response_limit: usize,
    pub response_body_limit_bytes: usize,
    pub query_ttl: Duration,
    pub response_ttl: Duration,
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

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

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
    server: RawServerSettings,
    logging: RawLoggingSettings,
    site: RawSiteSettings,
    cms: RawCmsSettings,
    revalidate: RawRevalidateSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if let Some(value) = value {
                *slot = Some(value.clone());
            }
        }

        set(&mut self.server.host, &overrides.server_host);
        set(&mut self.server.port, &overrides.server_port);
        set(
            &mut self.server.graceful_shutdown_seconds,
            &overrides.server_graceful_shutdown_seconds,
        );
        set(&mut self.logging.level, &overrides.log_level);
        set(&mut self.logging.json, &overrides.log_json);
        set(&mut self.site.base_url, &overrides.site_url);
        set(&mut self.site.environment, &overrides.site_environment);
        set(&mut self.cms.project_id, &overrides.cms_project_id);
        set(&mut self.cms.dataset, &overrides.cms_dataset);
        set(&mut self.cms.api_version, &overrides.cms_api_version);
        set(&mut self.cms.token, &overrides.cms_token);
        set(&mut self.cms.use_cdn, &overrides.cms_use_cdn);
        set(&mut self.revalidate.secret, &overrides.revalidate_secret);
        set(&mut self.cache.enable_query_cache, &overrides.cache_enable_query);
        set(
            &mut self.cache.enable_response_cache,
            &overrides.cache_enable_response,
        );
        set(
            &mut self.cache.query_ttl_seconds,
            &overrides.cache_query_ttl_seconds,
        );
        set(
            &mut self.cache.response_ttl_seconds,
            &overrides.cache_response_ttl_seconds,
        );
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            site,
            cms,
            revalidate,
            cache,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let site = build_site_settings(site)?;
        let cms = build_cms_settings(cms)?;
        let revalidate = build_revalidate_settings(revalidate);
        let cache = build_cache_settings(cache, site.environment)?;

        Ok(Self {
            server,
            logging,
            site,
            cms,
            revalidate,
            cache,
        })
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

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
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

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let raw_url = non_blank(site.base_url).unwrap_or_else(|| DEFAULT_SITE_URL.to_string());
    let base_url = parse_http_url(&raw_url).map_err(|reason| LoadError::invalid("site.base_url", reason))?;

    let name = non_blank(site.name).unwrap_or_else(|| DEFAULT_SITE_NAME.to_string());

    let environment = match non_blank(site.environment) {
        Some(value) => value
            .parse()
            .map_err(|reason: String| LoadError::invalid("site.environment", reason))?,
        None => SiteEnvironment::Production,
    };

    Ok(SiteSettings {
        base_url,
        name,
        environment,
    })
}

fn build_cms_settings(cms: RawCmsSettings) -> Result<CmsSettings, LoadError> {
    let project_id = non_blank(cms.project_id)
        .ok_or_else(|| LoadError::invalid("cms.project_id", "a CMS project id is required"))?;
    if !project_id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(LoadError::invalid(
            "cms.project_id",
            "may only contain a-z, 0-9 and dashes",
        ));
    }

    let dataset = non_blank(cms.dataset).unwrap_or_else(|| DEFAULT_DATASET.to_string());
    if !dataset
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(LoadError::invalid(
            "cms.dataset",
            "may only contain letters, digits, underscores and dashes",
        ));
    }

    let api_version = non_blank(cms.api_version).unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
    let api_version = parse_api_version(&api_version)
        .map_err(|reason| LoadError::invalid("cms.api_version", reason))?;

    let timeout_secs = cms.timeout_seconds.unwrap_or(DEFAULT_CMS_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "cms.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let api_base_url = non_blank(cms.api_base_url)
        .map(|value| parse_http_url(&value))
        .transpose()
        .map_err(|reason| LoadError::invalid("cms.api_base_url", reason))?;

    Ok(CmsSettings {
        project_id,
        dataset,
        api_version,
        use_cdn: cms.use_cdn.unwrap_or(false),
        token: non_blank(cms.token),
        timeout: Duration::from_secs(timeout_secs),
        api_base_url,
    })
}

fn build_revalidate_settings(revalidate: RawRevalidateSettings) -> RevalidateSettings {
    RevalidateSettings {
        // Compared byte for byte; only an empty value counts as unset.
        secret: revalidate.secret.filter(|secret| !secret.is_empty()),
    }
}

fn build_cache_settings(
    cache: RawCacheSettings,
    environment: SiteEnvironment,
) -> Result<CacheSettings, LoadError> {
    let defaults = CacheConfig::for_environment(environment);
    let fallback_ttl = default_ttl(environment);

    let ttl = |value: Option<u64>| value.map(Duration::from_secs).unwrap_or(fallback_ttl);

    let query_limit = cache.query_limit.unwrap_or(defaults.query_limit);
    if query_limit == 0 {
        return Err(LoadError::invalid(
            "cache.query_limit",
            "must be greater than zero",
        ));
    }
    let response_limit = cache.response_limit.unwrap_or(defaults.response_limit);
    if response_limit == 0 {
        return Err(LoadError::invalid(
            "cache.response_limit",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        enable_query_cache: cache.enable_query_cache.unwrap_or(true),
        enable_response_cache: cache.enable_response_cache.unwrap_or(true),
        query_limit,
        response_limit,
        response_body_limit_bytes: cache
            .response_body_limit_bytes
            .unwrap_or(defaults.response_body_limit_bytes),
        query_ttl: ttl(cache.query_ttl_seconds),
        response_ttl: ttl(cache.response_ttl_seconds),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    base_url: Option<String>,
    name: Option<String>,
    environment: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCmsSettings {
    project_id: Option<String>,
    dataset: Option<String>,
    api_version: Option<String>,
    use_cdn: Option<bool>,
    token: Option<String>,
    timeout_seconds: Option<u64>,
    api_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRevalidateSettings {
    secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enable_query_cache: Option<bool>,
    enable_response_cache: Option<bool>,
    query_limit: Option<usize>,
    response_limit: Option<usize>,
    response_body_limit_bytes: Option<usize>,
    query_ttl_seconds: Option<u64>,
    response_ttl_seconds: Option<u64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_http_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value).map_err(|err| format!("invalid URL `{value}`: {err}"))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(format!("`{value}` must be an absolute http(s) URL")),
    }
}

/// Accepts `2024-12-03`, `v2024-12-03`, `1` or `v1`; returns the value without `v`.
fn parse_api_version(value: &str) -> Result<String, String> {
    let version = value.strip_prefix('v').unwrap_or(value);
    if version == "1" || version == "X" {
        return Ok(version.to_string());
    }
    Date::parse(version, format_description!("[year]-[month]-[day]"))
        .map(|_| version.to_string())
        .map_err(|err| format!("`{value}` is not a YYYY-MM-DD date: {err}"))
}

#[cfg(test)]
mod tests;
