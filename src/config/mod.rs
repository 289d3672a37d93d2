//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::infra::http::maintenance::DEFAULT_EXCLUDED_PREFIXES;

mod cli;

pub use cli::{CliArgs, CmsOverrides, Command, ProbeArgs, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "vitrine";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_ADMIN_HOST: &str = "127.0.0.1";
const DEFAULT_PUBLIC_PORT: u16 = 3000;
const DEFAULT_ADMIN_PORT: u16 = 3001;
const DEFAULT_CMS_BASE_URL: &str = "http://127.0.0.1:1337";
const DEFAULT_CMS_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CMS_PROBE_PATH: &str = "/_health";
const DEFAULT_CMS_PROBE_TIMEOUT_SECS: u64 = 2;
const DEFAULT_HEALTH_TTL_SECS: u64 = 5;
const DEFAULT_HEALTH_PROBE_INTERVAL_SECS: u64 = 15;
const DEFAULT_CACHE_MAX_ENTRIES: usize = 1000;
const DEFAULT_CACHE_SWEEP_INTERVAL_SECS: u64 = 60;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub cms: CmsSettings,
    pub health: HealthSettings,
    pub maintenance: MaintenanceSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub public_addr: SocketAddr,
    pub admin_addr: SocketAddr,
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

#[derive(Clone)]
pub struct CmsSettings {
    pub base_url: Url,
    pub read_api_key: String,
    pub write_api_key: String,
    pub request_timeout: Duration,
    pub probe_path: String,
    pub probe_timeout: Duration,
}

impl std::fmt::Debug for CmsSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CmsSettings")
            .field("base_url", &self.base_url.as_str())
            .field("read_api_key", &redact(&self.read_api_key))
            .field("write_api_key", &redact(&self.write_api_key))
            .field("request_timeout", &self.request_timeout)
            .field("probe_path", &self.probe_path)
            .field("probe_timeout", &self.probe_timeout)
            .finish()
    }
}

fn redact(key: &str) -> &'static str {
    if key.is_empty() { "<unset>" } else { "<redacted>" }
}

#[derive(Debug, Clone)]
pub struct HealthSettings {
    pub ttl: Duration,
    pub probe_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct MaintenanceSettings {
    pub enabled: bool,
    pub excluded_prefixes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub max_entries: usize,
    pub sweep_interval: Duration,
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

    builder = builder.add_source(
        Environment::with_prefix("VITRINE")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("maintenance.excluded_prefixes")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Probe(args)) => raw.apply_cms_overrides(&args.cms),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    cms: RawCmsSettings,
    health: RawHealthSettings,
    maintenance: RawMaintenanceSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(host) = overrides.server_admin_host.as_ref() {
            self.server.admin_host = Some(host.clone());
        }
        if let Some(port) = overrides.public_port {
            self.server.public_port = Some(port);
        }
        if let Some(port) = overrides.admin_port {
            self.server.admin_port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(enabled) = overrides.maintenance {
            self.maintenance.enabled = Some(enabled);
        }
        if let Some(ttl) = overrides.health_ttl_seconds {
            self.health.ttl_seconds = Some(ttl);
        }
        if let Some(interval) = overrides.health_probe_interval_seconds {
            self.health.probe_interval_seconds = Some(interval);
        }
        if let Some(max) = overrides.cache_max_entries {
            self.cache.max_entries = Some(max);
        }

        self.apply_cms_overrides(&overrides.cms);
    }

    fn apply_cms_overrides(&mut self, overrides: &CmsOverrides) {
        if let Some(url) = overrides.cms_base_url.as_ref() {
            self.cms.base_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.cms_request_timeout_seconds {
            self.cms.request_timeout_seconds = Some(seconds);
        }
        if let Some(path) = overrides.cms_probe_path.as_ref() {
            self.cms.probe_path = Some(path.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            cms,
            health,
            maintenance,
            cache,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            cms: build_cms_settings(cms)?,
            health: build_health_settings(health)?,
            maintenance: build_maintenance_settings(maintenance)?,
            cache: build_cache_settings(cache)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let admin_host = server
        .admin_host
        .unwrap_or_else(|| DEFAULT_ADMIN_HOST.to_string());

    let public_port = server.public_port.unwrap_or(DEFAULT_PUBLIC_PORT);
    if public_port == 0 {
        return Err(LoadError::invalid(
            "server.public_port",
            "port must be greater than zero",
        ));
    }

    let admin_port = server.admin_port.unwrap_or(DEFAULT_ADMIN_PORT);
    if admin_port == 0 {
        return Err(LoadError::invalid(
            "server.admin_port",
            "port must be greater than zero",
        ));
    }

    let public_addr = parse_socket_addr(&host, public_port)
        .map_err(|reason| LoadError::invalid("server.public_addr", reason))?;
    let admin_addr = parse_socket_addr(&admin_host, admin_port)
        .map_err(|reason| LoadError::invalid("server.admin_addr", reason))?;

    if public_addr == admin_addr {
        return Err(LoadError::invalid(
            "server.admin_port",
            "admin listener must not share the public address",
        ));
    }

    Ok(ServerSettings {
        public_addr,
        admin_addr,
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

fn build_cms_settings(cms: RawCmsSettings) -> Result<CmsSettings, LoadError> {
    let raw_url = cms
        .base_url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_CMS_BASE_URL.to_string());
    let base_url = Url::parse(&raw_url)
        .map_err(|err| LoadError::invalid("cms.base_url", format!("invalid url: {err}")))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "cms.base_url",
            "scheme must be http or https",
        ));
    }

    let request_timeout = positive_seconds(
        cms.request_timeout_seconds
            .unwrap_or(DEFAULT_CMS_REQUEST_TIMEOUT_SECS),
        "cms.request_timeout_seconds",
    )?;
    let probe_timeout = positive_seconds(
        cms.probe_timeout_seconds
            .unwrap_or(DEFAULT_CMS_PROBE_TIMEOUT_SECS),
        "cms.probe_timeout_seconds",
    )?;

    let probe_path = cms
        .probe_path
        .unwrap_or_else(|| DEFAULT_CMS_PROBE_PATH.to_string());
    if !probe_path.starts_with('/') {
        return Err(LoadError::invalid(
            "cms.probe_path",
            "path must start with `/`",
        ));
    }

    Ok(CmsSettings {
        base_url,
        read_api_key: cms.read_api_key.unwrap_or_default().trim().to_string(),
        write_api_key: cms.write_api_key.unwrap_or_default().trim().to_string(),
        request_timeout,
        probe_path,
        probe_timeout,
    })
}

fn build_health_settings(health: RawHealthSettings) -> Result<HealthSettings, LoadError> {
    let ttl = positive_seconds(
        health.ttl_seconds.unwrap_or(DEFAULT_HEALTH_TTL_SECS),
        "health.ttl_seconds",
    )?;
    let probe_interval = positive_seconds(
        health
            .probe_interval_seconds
            .unwrap_or(DEFAULT_HEALTH_PROBE_INTERVAL_SECS),
        "health.probe_interval_seconds",
    )?;

    Ok(HealthSettings {
        ttl,
        probe_interval,
    })
}

fn build_maintenance_settings(
    maintenance: RawMaintenanceSettings,
) -> Result<MaintenanceSettings, LoadError> {
    let excluded_prefixes = match maintenance.excluded_prefixes {
        Some(prefixes) => {
            if let Some(bad) = prefixes.iter().find(|prefix| !prefix.starts_with('/')) {
                return Err(LoadError::invalid(
                    "maintenance.excluded_prefixes",
                    format!("prefix `{bad}` must start with `/`"),
                ));
            }
            prefixes
        }
        None => DEFAULT_EXCLUDED_PREFIXES
            .iter()
            .map(|prefix| prefix.to_string())
            .collect(),
    };

    Ok(MaintenanceSettings {
        enabled: maintenance.enabled.unwrap_or(false),
        excluded_prefixes,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let sweep_interval = positive_seconds(
        cache
            .sweep_interval_seconds
            .unwrap_or(DEFAULT_CACHE_SWEEP_INTERVAL_SECS),
        "cache.sweep_interval_seconds",
    )?;

    Ok(CacheSettings {
        max_entries: cache.max_entries.unwrap_or(DEFAULT_CACHE_MAX_ENTRIES),
        sweep_interval,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    admin_host: Option<String>,
    public_port: Option<u16>,
    admin_port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawCmsSettings {
    base_url: Option<String>,
    read_api_key: Option<String>,
    write_api_key: Option<String>,
    request_timeout_seconds: Option<u64>,
    probe_path: Option<String>,
    probe_timeout_seconds: Option<u64>,
}

impl std::fmt::Debug for RawCmsSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawCmsSettings")
            .field("base_url", &self.base_url)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("probe_path", &self.probe_path)
            .field("probe_timeout_seconds", &self.probe_timeout_seconds)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawHealthSettings {
    ttl_seconds: Option<u64>,
    probe_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMaintenanceSettings {
    enabled: Option<bool>,
    excluded_prefixes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    max_entries: Option<usize>,
    sweep_interval_seconds: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn positive_seconds(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
