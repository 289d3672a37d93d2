use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the Vitrine binary.
#[derive(Debug, Parser)]
#[command(name = "vitrine", version, about = "Vitrine storefront server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "VITRINE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the public and admin HTTP listeners.
    Serve(Box<ServeArgs>),
    /// Probe the CMS once and exit non-zero if it is unreachable.
    Probe(ProbeArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CmsOverrides {
    /// Override the CMS base URL.
    #[arg(long = "cms-base-url", value_name = "URL")]
    pub cms_base_url: Option<String>,

    /// Override the CMS request timeout.
    #[arg(long = "cms-request-timeout-seconds", value_name = "SECONDS")]
    pub cms_request_timeout_seconds: Option<u64>,

    /// Override the CMS liveness probe path.
    #[arg(long = "cms-probe-path", value_name = "PATH")]
    pub cms_probe_path: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub cms: CmsOverrides,

    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the administrative listener host.
    #[arg(long = "server-admin-host", value_name = "HOST")]
    pub server_admin_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-public-port", value_name = "PORT")]
    pub public_port: Option<u16>,

    /// Override the administrative listener port.
    #[arg(long = "server-admin-port", value_name = "PORT")]
    pub admin_port: Option<u16>,

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

    /// Start with forced maintenance enabled or disabled.
    #[arg(
        long = "maintenance",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub maintenance: Option<bool>,

    /// Override how long a CMS health result is trusted.
    #[arg(long = "health-ttl-seconds", value_name = "SECONDS")]
    pub health_ttl_seconds: Option<u64>,

    /// Override the background CMS probe cadence.
    #[arg(long = "health-probe-interval-seconds", value_name = "SECONDS")]
    pub health_probe_interval_seconds: Option<u64>,

    /// Override the response cache capacity.
    #[arg(long = "cache-max-entries", value_name = "COUNT")]
    pub cache_max_entries: Option<usize>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub cms: CmsOverrides,
}
