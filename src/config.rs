//! Runtime configuration, read once from the environment at startup.

use crate::consts::limits;
use crate::error::ConfigError;
use chrono::FixedOffset;
use reqwest::Url;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_FOOTBALL_DATA_URL: &str = "https://api.football-data.org/v4";
const DEFAULT_COMMUNITY_API_URL: &str = "https://api.soccersuck.com/v1";
const DEFAULT_UTC_OFFSET_HOURS: i32 = 7;

#[derive(Debug, Clone)]
pub struct Config {
    /// Bot token (channel access token).
    pub bot_token: String,
    /// Secret the platform echoes on every webhook call. Required with `webhook_url`.
    pub channel_secret: Option<String>,
    /// Public URL for webhook mode; long polling when unset.
    pub webhook_url: Option<Url>,
    pub http_addr: SocketAddr,
    pub football_data_url: String,
    pub football_data_token: String,
    pub community_api_url: String,
    pub community_api_key: Option<String>,
    /// Offset kickoff times and timestamps are shown in.
    pub utc_offset: FixedOffset,
    pub request_timeout: Duration,
    pub news_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bot_token = get("TELOXIDE_TOKEN").ok_or(ConfigError::Missing("TELOXIDE_TOKEN"))?;
        let football_data_token =
            get("FOOTBALL_DATA_TOKEN").ok_or(ConfigError::Missing("FOOTBALL_DATA_TOKEN"))?;

        let webhook_url = get("WEBHOOK_URL")
            .map(|raw| Url::parse(&raw).map_err(|e| invalid("WEBHOOK_URL", e)))
            .transpose()?;
        let channel_secret = get("CHANNEL_SECRET");
        if webhook_url.is_some() && channel_secret.is_none() {
            return Err(ConfigError::Missing("CHANNEL_SECRET"));
        }

        let http_addr = parse_or("HTTP_ADDR", get("HTTP_ADDR"), DEFAULT_HTTP_ADDR.parse().ok())?;
        let offset_hours: i32 = parse_or("UTC_OFFSET_HOURS", get("UTC_OFFSET_HOURS"), Some(DEFAULT_UTC_OFFSET_HOURS))?;
        let utc_offset = FixedOffset::east_opt(offset_hours * 3600)
            .ok_or_else(|| invalid("UTC_OFFSET_HOURS", "out of range"))?;
        let timeout_secs: u64 =
            parse_or("REQUEST_TIMEOUT_SECS", get("REQUEST_TIMEOUT_SECS"), Some(limits::REQUEST_TIMEOUT_SECS))?;
        let news_limit: usize = parse_or("NEWS_LIMIT", get("NEWS_LIMIT"), Some(limits::DEFAULT_NEWS_LIMIT))?;
        if news_limit == 0 || news_limit > limits::MAX_FEED_LIMIT {
            return Err(invalid("NEWS_LIMIT", format!("must be 1..={}", limits::MAX_FEED_LIMIT)));
        }

        Ok(Self {
            bot_token,
            channel_secret,
            webhook_url,
            http_addr,
            football_data_url: get("FOOTBALL_DATA_URL")
                .unwrap_or_else(|| DEFAULT_FOOTBALL_DATA_URL.to_string()),
            football_data_token,
            community_api_url: get("COMMUNITY_API_URL")
                .unwrap_or_else(|| DEFAULT_COMMUNITY_API_URL.to_string()),
            community_api_key: get("COMMUNITY_API_KEY"),
            utc_offset,
            request_timeout: Duration::from_secs(timeout_secs),
            news_limit,
        })
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: Option<T>) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.trim().parse().map_err(|e| invalid(name, e)),
        None => default.ok_or(ConfigError::Missing(name)),
    }
}

fn invalid(name: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid { name, reason: reason.to_string() }
}
