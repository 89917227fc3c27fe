use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use glossary_core::{Collation, PoolOptions, DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_MAX_CONNECTIONS};
use serde::Deserialize;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:4200";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub database_path: PathBuf,
    pub bind_addr: String,
    /// Single origin allowed for cross-origin calls; empty disables CORS.
    pub allowed_origin: String,
    pub max_connections: u32,
    /// How long a request waits for a pooled connection before failing.
    pub acquire_timeout_ms: u64,
    pub busy_timeout_ms: u64,
    pub collation: Collation,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("glossary.sqlite"),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT.as_millis() as u64,
            busy_timeout_ms: 5_000,
            collation: Collation::default(),
        }
    }
}

impl ServiceConfig {
    /// Defaults, then the TOML file if it exists, then the environment.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup("GLOSSARY_DB") {
            self.database_path = PathBuf::from(db);
        }
        match (lookup("BIND_ADDR"), lookup("PORT")) {
            (Some(addr), _) => self.bind_addr = addr,
            (None, Some(port)) => {
                let port: u16 = port
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid PORT {port:?}"))?;
                self.bind_addr = format!("0.0.0.0:{port}");
            }
            (None, None) => {}
        }
        if let Some(origin) = lookup("CORS_ORIGIN") {
            self.allowed_origin = origin;
        }
        if let Some(max) = lookup("GLOSSARY_MAX_CONNECTIONS") {
            self.max_connections = max
                .trim()
                .parse()
                .with_context(|| format!("invalid GLOSSARY_MAX_CONNECTIONS {max:?}"))?;
        }
        if let Some(collation) = lookup("GLOSSARY_COLLATION") {
            self.collation = collation.parse()?;
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr
            .parse()
            .with_context(|| format!("invalid bind address {:?}", self.bind_addr))
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_millis(self.acquire_timeout_ms),
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }
}
