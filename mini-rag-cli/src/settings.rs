//! Application settings read from the process environment.
//!
//! `main` calls `dotenvy::dotenv()` first, so a `.env` file in the working
//! directory is honoured.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};

/// Deployment environment selected by `ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => bail!("ENV must be 'dev' or 'prod', got '{other}'"),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
        })
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub env: Environment,
    pub app_name: String,
    pub dashscope_api_key: Option<String>,
    pub log_level: String,
}

impl Settings {
    pub const DEFAULT_APP_NAME: &'static str = "RAG Project";
    pub const DEFAULT_LOG_LEVEL: &'static str = "INFO";

    /// Load settings from environment variables.
    ///
    /// # Errors
    ///
    /// Fails on an unknown `ENV` value, or when `ENV=prod` and
    /// `DASHSCOPE_API_KEY` is missing.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through `lookup` instead of the real environment.
    ///
    /// # Errors
    ///
    /// See [`Settings::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let env = match non_empty("ENV") {
            Some(value) => value.parse()?,
            None => Environment::default(),
        };
        let settings = Self {
            env,
            app_name: non_empty("APP_NAME").unwrap_or_else(|| Self::DEFAULT_APP_NAME.to_string()),
            dashscope_api_key: non_empty("DASHSCOPE_API_KEY"),
            log_level: non_empty("LOG_LEVEL").unwrap_or_else(|| Self::DEFAULT_LOG_LEVEL.to_string()),
        };

        if settings.env == Environment::Prod && settings.dashscope_api_key.is_none() {
            bail!("DASHSCOPE_API_KEY is required when ENV=prod");
        }
        Ok(settings)
    }

    /// The DashScope API key, or an error naming the variable to set.
    ///
    /// # Errors
    ///
    /// Fails when `DASHSCOPE_API_KEY` is unset.
    pub fn require_api_key(&self) -> Result<&str> {
        self.dashscope_api_key
            .as_deref()
            .context("DASHSCOPE_API_KEY must be set to use the DashScope backends")
    }

    fn masked_key(&self) -> Option<&'static str> {
        self.dashscope_api_key.as_ref().map(|_| "***")
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("env", &self.env)
            .field("app_name", &self.app_name)
            .field("dashscope_api_key", &self.masked_key())
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "env={} app_name={:?} dashscope_api_key={} log_level={}",
            self.env,
            self.app_name,
            self.masked_key().unwrap_or("<unset>"),
            self.log_level
        )
    }
}
