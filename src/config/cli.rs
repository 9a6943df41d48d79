use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the jha-site binary.
#[derive(Debug, Parser)]
#[command(name = "jha-site", version, about = "JHA (Korea) academy website server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "JHA_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve the public site and the revalidation webhook.
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

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

    /// Public base URL used for canonical links and the sitemap.
    #[arg(long = "site-url", env = "SITE_URL", value_name = "URL")]
    pub site_url: Option<String>,

    /// Deployment environment (development|production).
    #[arg(long = "site-environment", value_name = "ENV")]
    pub site_environment: Option<String>,

    /// CMS project identifier.
    #[arg(long = "cms-project-id", env = "SANITY_PROJECT_ID", value_name = "ID")]
    pub cms_project_id: Option<String>,

    /// CMS dataset name.
    #[arg(long = "cms-dataset", env = "SANITY_DATASET", value_name = "NAME")]
    pub cms_dataset: Option<String>,

    /// CMS query API version date.
    #[arg(long = "cms-api-version", env = "SANITY_API_VERSION", value_name = "DATE")]
    pub cms_api_version: Option<String>,

    /// Read token for private datasets.
    #[arg(
        long = "cms-token",
        env = "SANITY_API_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true
    )]
    pub cms_token: Option<String>,

    /// Query through the CMS edge cache.
    #[arg(
        long = "cms-use-cdn",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cms_use_cdn: Option<bool>,

    /// Shared secret expected on revalidation webhook calls.
    #[arg(
        long = "revalidate-secret",
        env = "SANITY_REVALIDATE_SECRET",
        value_name = "SECRET",
        hide_env_values = true
    )]
    pub revalidate_secret: Option<String>,

    /// Toggle the CMS query cache.
    #[arg(
        long = "cache-enable-query",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enable_query: Option<bool>,

    /// Toggle the rendered response cache.
    #[arg(
        long = "cache-enable-response",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enable_response: Option<bool>,

    /// Override how long fetched CMS results stay fresh.
    #[arg(long = "cache-query-ttl-seconds", value_name = "SECONDS")]
    pub cache_query_ttl_seconds: Option<u64>,

    /// Override how long rendered responses stay fresh.
    #[arg(long = "cache-response-ttl-seconds", value_name = "SECONDS")]
    pub cache_response_ttl_seconds: Option<u64>,
}
