// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use pgnav_app::{ConnectionParams, DEFAULT_API_BASE};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_TIMEOUT: &str = "30s";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub connection: Connection,
    #[serde(default)]
    pub log: Log,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

/// Prefill for the connect prompt. The password never lives in the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Connection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub database: Option<String>,
    pub ssl_mode: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub path: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("PGNAV_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set PGNAV_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(pgnav_prefs::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                version: CONFIG_VERSION,
                ..Self::default()
            });
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [api], [connection], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.api.base_url {
            pgnav_api::validate_api_base(base_url)
                .with_context(|| format!("api.base_url in {}", path.display()))?;
        }

        if let Some(timeout) = &self.api.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "api.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if self.connection.port == Some(0) {
            bail!("connection.port in {} must be between 1 and 65535", path.display());
        }

        if let Some(level) = &self.log.level
            && level.parse::<tracing::Level>().is_err()
        {
            bail!(
                "log.level in {} must be one of error, warn, info, debug, trace; got {:?}",
                path.display(),
                level
            );
        }

        Ok(())
    }

    pub fn api_base(&self) -> Option<&str> {
        self.api
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn connection_defaults(&self, password: Option<String>) -> ConnectionParams {
        let defaults = ConnectionParams::default();
        let section = &self.connection;
        ConnectionParams {
            host: section.host.clone().unwrap_or(defaults.host),
            port: section.port.unwrap_or(defaults.port),
            username: section.username.clone().unwrap_or(defaults.username),
            password: password.unwrap_or(defaults.password),
            database: section.database.clone().unwrap_or(defaults.database),
            ssl_mode: section.ssl_mode.unwrap_or(defaults.ssl_mode),
        }
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log.path {
            return Ok(PathBuf::from(path));
        }
        let cache_root = dirs::cache_dir().ok_or_else(|| {
            anyhow!("cannot resolve cache directory; set [log].path in the config file")
        })?;
        Ok(cache_root.join(pgnav_prefs::APP_NAME).join("pgnav.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# pgnav config\n# Place this file at: {}\n\nversion = 1\n\n[api]\n# pgweb API root. A value saved from inside pgnav takes precedence.\nbase_url = \"{}\"\ntimeout = \"{}\"\n\n[connection]\n# Prefill for the connect prompt; the password comes from PGPASSWORD.\nhost = \"localhost\"\nport = 5432\nusername = \"postgres\"\ndatabase = \"postgres\"\nssl_mode = false\n\n[log]\nlevel = \"{}\"\n# Optional. Default is the platform cache dir (for example ~/.cache/pgnav/pgnav.log)\n# path = \"/absolute/path/to/pgnav.log\"\n",
            path.display(),
            DEFAULT_API_BASE,
            DEFAULT_TIMEOUT,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 30s)")
}
