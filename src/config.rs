//! Runtime configuration read from the environment.

use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Testing,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Production => "production",
        }
    }

    pub fn debug(&self) -> bool {
        matches!(self, Environment::Development)
    }

    /// Log filter used when `RUST_LOG` is unset.
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Environment::Development => "debug",
            Environment::Testing => "warn",
            Environment::Production => "info",
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "default" => Ok(Environment::Development),
            "testing" => Ok(Environment::Testing),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unknown environment '{other}' (expected development, testing or production)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub listen_addr: SocketAddr,
    /// Seed the demonstration cities at startup.
    pub seed_data: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let environment = match lookup("WEATHER_API_ENV") {
            Some(raw) => raw.parse::<Environment>().context("invalid WEATHER_API_ENV")?,
            None => Environment::default(),
        };

        let addr = lookup("WEATHER_API_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let listen_addr = addr
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid WEATHER_API_ADDR: {addr}"))?;

        let seed_data = match lookup("WEATHER_API_SEED") {
            Some(raw) => parse_flag(&raw).with_context(|| format!("invalid WEATHER_API_SEED: {raw}"))?,
            None => true,
        };

        Ok(Self {
            environment,
            listen_addr,
            seed_data,
        })
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("expected a boolean")),
    }
}
