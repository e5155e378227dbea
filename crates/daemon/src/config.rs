//! Worker configuration from environment variables

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use dynaq_api_rpc::server::DEFAULT_RPC_PORT;
use dynaq_core::application::registry::DEFAULT_SPECIFIER;
use dynaq_core::domain::poll_order::DEFAULT_POLL_TIMEOUT_SECS;

pub const DEFAULT_DB_PATH: &str = "~/.dynaq/dynaq.db";
pub const DEFAULT_CONCURRENCY: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub db_path: String,
    pub rpc_port: u16,
    /// Specifiers as configured, CLI escapes still in place
    pub queues: Vec<String>,
    pub strict: bool,
    pub poll_timeout: Duration,
    pub hostname: Option<String>,
    pub concurrency: usize,
    pub log_format: LogFormat,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup (tests pass a map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("DYNAQ_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let db_path = if db_path.contains(":memory:") {
            db_path
        } else {
            shellexpand::tilde(&db_path).into_owned()
        };

        let rpc_port = parse_or(&lookup, "DYNAQ_RPC_PORT", DEFAULT_RPC_PORT)?;
        let poll_timeout_secs =
            parse_or(&lookup, "DYNAQ_POLL_TIMEOUT_SECS", DEFAULT_POLL_TIMEOUT_SECS)?;
        let concurrency = parse_or(&lookup, "DYNAQ_CONCURRENCY", DEFAULT_CONCURRENCY)?;
        if concurrency == 0 {
            bail!("DYNAQ_CONCURRENCY must be at least 1");
        }

        let queues = lookup("DYNAQ_QUEUES")
            .map(|raw| split_list(&raw))
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_SPECIFIER.to_string()]);

        let strict = lookup("DYNAQ_STRICT")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let log_format = match lookup("DYNAQ_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            db_path,
            rpc_port,
            queues,
            strict,
            poll_timeout: Duration::from_secs(poll_timeout_secs),
            hostname: lookup("DYNAQ_HOSTNAME").filter(|h| !h.trim().is_empty()),
            concurrency,
            log_format,
        })
    }

    /// Create the database's parent directory if needed
    pub fn ensure_db_dir(&self) -> Result<()> {
        if self.db_path.contains(":memory:") {
            return Ok(());
        }
        if let Some(parent) = PathBuf::from(&self.db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {}='{}': {}", name, raw, e)),
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
