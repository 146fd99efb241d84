//! Service configuration sourced from environment variables, optionally
//! overridden by a YAML file named in `WARDEN_CONFIG`.
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CHANGES_LIMIT: u64 = 500;
pub const DEFAULT_CHANGE_RETENTION_MAX_ROWS: i64 = 10_000;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_PRINCIPAL_TIMEOUT: Duration = Duration::from_millis(2_000);
pub const DEFAULT_CHANGE_QUEUE_CAPACITY: usize = 1_024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" => Ok(Self::Postgres),
            other => bail!("unknown storage backend {other:?}"),
        }
    }
}

/// Where change records go once a mutation has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeSinkKind {
    /// Queued and persisted to the store's change table.
    Store,
    /// Emitted as structured log events only.
    Log,
}

impl FromStr for ChangeSinkKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "store" => Ok(Self::Store),
            "log" => Ok(Self::Log),
            other => bail!("unknown change sink {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
    #[serde(default = "default_pg_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_pg_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_pg_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

/// Identity service used to confirm principals before role assignment.
/// Without a base URL every principal is accepted.
#[derive(Debug, Clone, Default)]
pub struct DirectoryConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WardenConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    pub changes_limit: u64,
    pub change_retention_max_rows: Option<i64>,
    pub cache_ttl: Duration,
    pub cache_sweep_interval: Duration,
    pub menu_max_depth: usize,
    pub directory: DirectoryConfig,
    /// Shared secret required on `/v1` routes when set.
    pub internal_api_key: Option<String>,
    pub change_sink: ChangeSinkKind,
    pub change_queue_capacity: usize,
}

#[derive(Debug, Default, Deserialize)]
struct WardenConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<StorageBackend>,
    postgres: Option<PostgresConfig>,
    changes_limit: Option<u64>,
    change_retention_max_rows: Option<i64>,
    cache_ttl_secs: Option<u64>,
    cache_sweep_secs: Option<u64>,
    menu_max_depth: Option<usize>,
    auth_service_url: Option<String>,
    principal_timeout_ms: Option<u64>,
    change_sink: Option<ChangeSinkKind>,
    change_queue_capacity: Option<usize>,
}

impl WardenConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_or("WARDEN_BIND", "0.0.0.0:8443")?;
        let metrics_bind = env_or("WARDEN_METRICS_BIND", "0.0.0.0:8080")?;
        let storage = env_or("WARDEN_STORAGE", "memory")?;
        let postgres = match non_empty_env("WARDEN_POSTGRES_URL") {
            Some(url) => Some(PostgresConfig {
                url,
                max_connections: env_or("WARDEN_PG_MAX_CONNECTIONS", "10")?,
                connect_timeout_ms: env_or("WARDEN_PG_CONNECT_TIMEOUT_MS", "5000")?,
                acquire_timeout_ms: env_or("WARDEN_PG_ACQUIRE_TIMEOUT_MS", "5000")?,
            }),
            None => None,
        };
        let cache_ttl = Duration::from_secs(env_or(
            "WARDEN_CACHE_TTL_SECS",
            &DEFAULT_CACHE_TTL.as_secs().to_string(),
        )?);
        let cache_sweep_interval = Duration::from_secs(env_or("WARDEN_CACHE_SWEEP_SECS", "300")?);
        let directory = DirectoryConfig {
            base_url: non_empty_env("WARDEN_AUTH_SERVICE_URL"),
            api_key: non_empty_env("WARDEN_INTERNAL_API_KEY"),
            timeout: Duration::from_millis(env_or(
                "WARDEN_PRINCIPAL_TIMEOUT_MS",
                &DEFAULT_PRINCIPAL_TIMEOUT.as_millis().to_string(),
            )?),
        };
        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            changes_limit: env_or("WARDEN_CHANGES_LIMIT", &DEFAULT_CHANGES_LIMIT.to_string())?,
            change_retention_max_rows: Some(env_or(
                "WARDEN_CHANGE_RETENTION_MAX_ROWS",
                &DEFAULT_CHANGE_RETENTION_MAX_ROWS.to_string(),
            )?),
            cache_ttl,
            cache_sweep_interval,
            menu_max_depth: env_or(
                "WARDEN_MENU_MAX_DEPTH",
                &crate::menu::DEFAULT_MAX_DEPTH.to_string(),
            )?,
            internal_api_key: non_empty_env("WARDEN_INTERNAL_API_KEY"),
            directory,
            change_sink: env_or("WARDEN_CHANGE_SINK", "store")?,
            change_queue_capacity: env_or(
                "WARDEN_CHANGE_LOG_CAPACITY",
                &DEFAULT_CHANGE_QUEUE_CAPACITY.to_string(),
            )?,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Some(path) = non_empty_env("WARDEN_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read WARDEN_CONFIG: {path}"))?;
            let override_cfg: WardenConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse warden config yaml")?;
            config.apply(override_cfg)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, over: WardenConfigOverride) -> Result<()> {
        if let Some(value) = over.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = over.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = over.storage {
            self.storage = value;
        }
        if let Some(value) = over.postgres {
            self.postgres = Some(value);
        }
        if let Some(value) = over.changes_limit {
            self.changes_limit = value;
        }
        if let Some(value) = over.change_retention_max_rows {
            self.change_retention_max_rows = Some(value);
        }
        if let Some(value) = over.cache_ttl_secs {
            self.cache_ttl = Duration::from_secs(value);
        }
        if let Some(value) = over.cache_sweep_secs {
            self.cache_sweep_interval = Duration::from_secs(value);
        }
        if let Some(value) = over.menu_max_depth {
            self.menu_max_depth = value;
        }
        if let Some(value) = over.auth_service_url {
            self.directory.base_url = Some(value);
        }
        if let Some(value) = over.principal_timeout_ms {
            self.directory.timeout = Duration::from_millis(value);
        }
        if let Some(value) = over.change_sink {
            self.change_sink = value;
        }
        if let Some(value) = over.change_queue_capacity {
            self.change_queue_capacity = value;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.menu_max_depth == 0 {
            bail!("menu_max_depth must be at least 1");
        }
        if self.change_queue_capacity == 0 {
            bail!("change_queue_capacity must be at least 1");
        }
        if self.cache_sweep_interval.is_zero() {
            bail!("cache sweep interval must be non-zero");
        }
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn env_or<T>(name: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = non_empty_env(name).unwrap_or_else(|| default.to_string());
    raw.parse::<T>()
        .map_err(|err| anyhow::anyhow!("parse {name}: {err}"))
}

fn default_pg_max_connections() -> u32 {
    10
}

fn default_pg_timeout_ms() -> u64 {
    5_000
}
