//! Server configuration management

use std::collections::HashMap;
use std::env;

use anyhow::{Context, Result};
use autoschema::SchemaOptions;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host (for generating URLs)
    pub host: Option<String>,

    /// Server port
    pub port: u16,

    /// SQLite database URL, e.g. `sqlite:data.db`
    pub database_url: String,

    pub database_max_connections: u32,

    pub log_format: LogFormat,

    /// Options passed on to the schema builder
    pub schema: SchemaOptions,
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid {}", name)),
        _ => Ok(None),
    }
}

/// `true`/`false`, `1`/`0`, `yes`/`no` or `on`/`off`, in any case
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_flag(name: &str) -> Result<Option<bool>> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => parse_bool(&value)
            .map(Some)
            .with_context(|| format!("Invalid {}: expected true/false, 1/0, yes/no or on/off", name)),
        _ => Ok(None),
    }
}

/// `EXCLUDE_MODELS=AuditLog,Session`
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// `TABLE_DESCRIPTIONS=Author=People who write books;Book=Published works`
fn parse_descriptions(value: &str) -> Result<HashMap<String, String>> {
    value
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (model, description) = pair
                .split_once('=')
                .with_context(|| format!("Invalid TABLE_DESCRIPTIONS entry `{}`", pair))?;
            Ok((model.trim().to_string(), description.trim().to_string()))
        })
        .collect()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut schema = SchemaOptions::default();

        if let Ok(exclude) = env::var("EXCLUDE_MODELS") {
            schema.exclude_models = parse_list(&exclude);
        }
        if let Ok(descriptions) = env::var("TABLE_DESCRIPTIONS") {
            schema.table_descriptions = parse_descriptions(&descriptions)?;
        }
        if let Some(from_db) = parse_flag("TABLE_DESCRIPTIONS_FROM_DB")? {
            schema.table_descriptions_from_db = from_db;
        }
        if let Some(max) = parse_var::<i64>("MAX_PAGE_SIZE")? {
            // 0 disables the limit
            schema.max_page_size = (max > 0).then_some(max);
        }
        if let Some(enabled) = parse_flag("ENABLE_MUTATIONS")? {
            schema.enable_mutations = enabled;
        }

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            host: env::var("HOST").ok(),

            port: parse_var("PORT")?.unwrap_or(3001),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:autoschema.db".to_string()),

            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS")?.unwrap_or(5),

            log_format,

            schema,
        })
    }
}
