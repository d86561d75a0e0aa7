use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;

use config::{Config, Environment, File};

use redis::aio::ConnectionManager;

use secrecy::{ExposeSecret, Secret};

use serde::Deserialize;
use serde_aux::prelude::*;

use sqlx::postgres::{PgConnectOptions, PgSslMode};

use url::Url;

use crate::domain::EmailAddress;
use crate::queue::JobQueues;

/// Runtime environment, either `Dev` for local development, or `Prod` for release
#[derive(Debug)]
pub enum Runtime {
    Dev,
    Prod,
}

impl Runtime {
    pub fn as_str(&self) -> &str {
        match self {
            Runtime::Dev => "dev",
            Runtime::Prod => "prod",
        }
    }
}

impl TryFrom<String> for Runtime {
    type Error = anyhow::Error;

    fn try_from(s: String) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => anyhow::bail!("{} is not a valid runtime environment", other),
        }
    }
}

/// Application settings wrapper
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: ApplicationSettings,
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub weather: WeatherSettings,
    pub queue: QueueSettings,
    pub email: EmailSettings,
    pub scheduler: SchedulerSettings,
}

impl Settings {
    /// Load application settings from the settings directory
    pub fn load() -> anyhow::Result<Self> {
        let path = env::current_dir()?.join("settings");
        // Runtime comes from `APP_ENV`, default `Dev`
        let runtime: Runtime = env::var("APP_ENV")
            .unwrap_or_else(|_| "dev".into())
            .try_into()?;

        Self::load_from(runtime, &path)
    }
    /// Load application settings from a specified path and runtime
    pub fn load_from(runtime: Runtime, base_path: &Path) -> anyhow::Result<Self> {
        Config::builder()
            .add_source(File::from(base_path.join("base")).required(true))
            .add_source(File::from(base_path.join(runtime.as_str())).required(true))
            // NOTE: Should be used for any prod secrets. Takes the form `APP_<settings category>__<setting name>`.
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
            .context("Failed to load/deserialize settings")
    }
}

fn parse_url(value: &str, what: &str) -> anyhow::Result<Url> {
    Url::parse(value).with_context(|| format!("Failed to parse {} URL", what))
}

#[derive(Debug, Deserialize)]
pub struct ApplicationSettings {
    host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    port: u16,
    base_url: String,

    secret_key: Secret<String>,
}

impl ApplicationSettings {
    /// The application address to bind to
    pub fn addr(&self) -> (&str, u16) {
        (&self.host, self.port)
    }
    /// Public URL of the API, used for links in emails
    pub fn base_url(&self) -> anyhow::Result<Url> {
        parse_url(&self.base_url, "application base")
    }
    /// The application secret key
    pub fn secret_key(&self) -> &Secret<String> {
        &self.secret_key
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    port: u16,
    host: String,
    name: String,
    username: String,
    password: Secret<String>,
    require_ssl: bool,
}

impl DatabaseSettings {
    /// The database connection options, without specifying the database name
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .port(self.port)
            .host(&self.host)
            .ssl_mode(ssl_mode)
            .username(&self.username)
            .password(self.password.expose_secret())
    }
    /// The database connection options, with the database name
    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.name)
    }
}

#[derive(Debug, Deserialize)]
pub struct RedisSettings {
    url: Secret<String>,
}

impl RedisSettings {
    /// Open a reconnecting connection to Redis
    pub async fn connect(&self) -> anyhow::Result<ConnectionManager> {
        let client = redis::Client::open(self.url.expose_secret().as_str())
            .context("Failed to parse Redis URL")?;
        ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")
    }
}

#[derive(Debug, Deserialize)]
pub struct WeatherSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    timeout_milliseconds: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    cache_ttl_seconds: u64,
    pub weather_api: ProviderSettings,
    pub open_weather: ProviderSettings,
}

impl WeatherSettings {
    /// Timeout applied to every weather provider request
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    base_url: String,
    api_key: Secret<String>,
}

impl ProviderSettings {
    pub fn base_url(&self) -> anyhow::Result<Url> {
        parse_url(&self.base_url, "weather provider")
    }
    pub fn api_key(&self) -> Secret<String> {
        self.api_key.clone()
    }
}

#[derive(Debug, Deserialize)]
pub struct QueueSettings {
    email: String,
    weather_update: String,
    group: String,
    consumer: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    batch_size: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    block_milliseconds: u64,
}

impl QueueSettings {
    pub fn queues(&self) -> JobQueues {
        JobQueues {
            email: self.email.clone(),
            weather_update: self.weather_update.clone(),
        }
    }
    /// Consumer group shared by all mail workers
    pub fn group(&self) -> &str {
        &self.group
    }
    /// Name of this worker within the group; must be stable across restarts
    pub fn consumer(&self) -> &str {
        &self.consumer
    }
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
    /// How long an idle consumer waits for new jobs per read
    pub fn block(&self) -> Duration {
        Duration::from_millis(self.block_milliseconds)
    }
}

#[derive(Debug, Deserialize)]
pub struct EmailSettings {
    sender: String,
    api_base_url: String,
    api_auth_token: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    api_timeout_milliseconds: u64,
}

impl EmailSettings {
    /// The email address to send application emails from
    pub fn sender(&self) -> anyhow::Result<EmailAddress> {
        self.sender
            .parse()
            .map_err(anyhow::Error::msg)
            .context("Failed to parse email sender address")
    }
    /// The email REST API timeout duration
    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_milliseconds)
    }
    /// The base URL for the email REST service
    pub fn api_base_url(&self) -> anyhow::Result<Url> {
        parse_url(&self.api_base_url, "email API base")
    }
    /// The authentication token to include when making email requests
    pub fn api_auth_token(&self) -> Secret<String> {
        self.api_auth_token.clone()
    }
}

#[derive(Debug, Deserialize)]
pub struct SchedulerSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    daily_hour: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    broadcast_concurrency: usize,
}

impl SchedulerSettings {
    /// UTC hour of the daily broadcast
    pub fn daily_hour(&self) -> anyhow::Result<u32> {
        if self.daily_hour > 23 {
            anyhow::bail!("{} is not a valid hour of the day", self.daily_hour);
        }
        Ok(self.daily_hour)
    }
    pub fn broadcast_concurrency(&self) -> usize {
        self.broadcast_concurrency
    }
}
