use core::fmt;
use std::{env, time::Duration};

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub static CONFIG: Lazy<AppConfig> =
    Lazy::new(|| AppConfig::load().unwrap_or_else(|e| panic!("{}", e)));

#[derive(Serialize, Deserialize, Debug)]
pub enum Runtime {
    Dev,
    Prod,
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Runtime::Dev => write!(f, "development"),
            Runtime::Prod => write!(f, "production"),
        }
    }
}

impl From<String> for Runtime {
    fn from(value: String) -> Self {
        match value.as_str() {
            "DEVELOPMENT" => Runtime::Dev,
            "PRODUCTION" => Runtime::Prod,
            _ => Runtime::Prod,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub telegram: TelegramConfig,
    pub database_url: String,
    #[serde(default)]
    pub quiz: QuizConfig,
    #[serde(default)]
    pub commands: CommandTokens,
}

fn default_address() -> String {
    "127.0.0.1".into()
}

fn default_port() -> String {
    "3000".into()
}

fn default_api_domain() -> String {
    "https://api.telegram.org".into()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(skip_serializing)]
    pub token: String,
    #[serde(skip_serializing)]
    pub webhook_secret: String,
    #[serde(default = "default_api_domain")]
    pub api_domain: String,
    /// Public URL of the webhook route. When set, the bot registers it on startup.
    pub public_url: Option<String>,
}

fn default_hint_delay_secs() -> u64 {
    60
}

fn default_round_timeout_secs() -> u64 {
    180
}

fn default_hint_cooldown_secs() -> u64 {
    30
}

fn default_hint_reveal_count() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    #[serde(default = "default_hint_delay_secs")]
    pub hint_delay_secs: u64,
    #[serde(default = "default_round_timeout_secs")]
    pub round_timeout_secs: u64,
    #[serde(default = "default_hint_cooldown_secs")]
    pub hint_cooldown_secs: u64,
    #[serde(default = "default_hint_reveal_count")]
    pub hint_reveal_count: usize,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            hint_delay_secs: default_hint_delay_secs(),
            round_timeout_secs: default_round_timeout_secs(),
            hint_cooldown_secs: default_hint_cooldown_secs(),
            hint_reveal_count: default_hint_reveal_count(),
        }
    }
}

impl QuizConfig {
    pub fn hint_delay(&self) -> Duration {
        Duration::from_secs(self.hint_delay_secs)
    }

    pub fn round_timeout(&self) -> Duration {
        Duration::from_secs(self.round_timeout_secs)
    }

    pub fn hint_cooldown(&self) -> Duration {
        Duration::from_secs(self.hint_cooldown_secs)
    }
}

fn default_start_token() -> String {
    "/퀴즈".into()
}

fn default_hint_token() -> String {
    "/힌트".into()
}

fn default_stop_token() -> String {
    "/중지".into()
}

fn default_ranking_token() -> String {
    "/랭킹".into()
}

fn default_score_token() -> String {
    "/점수".into()
}

fn default_add_question_token() -> String {
    "/퀴즈추가".into()
}

fn default_remove_question_token() -> String {
    "/퀴즈삭제".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandTokens {
    #[serde(default = "default_start_token")]
    pub start: String,
    #[serde(default = "default_hint_token")]
    pub hint: String,
    #[serde(default = "default_stop_token")]
    pub stop: String,
    #[serde(default = "default_ranking_token")]
    pub ranking: String,
    #[serde(default = "default_score_token")]
    pub score: String,
    #[serde(default = "default_add_question_token")]
    pub add_question: String,
    #[serde(default = "default_remove_question_token")]
    pub remove_question: String,
}

impl Default for CommandTokens {
    fn default() -> Self {
        Self {
            start: default_start_token(),
            hint: default_hint_token(),
            stop: default_stop_token(),
            ranking: default_ranking_token(),
            score: default_score_token(),
            add_question: default_add_question_token(),
            remove_question: default_remove_question_token(),
        }
    }
}

impl AppConfig {
    fn load() -> Result<Self, ConfigError> {
        let runtime: Runtime = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "DEVELOPMENT".into())
            .into();

        let config: AppConfig = Config::builder()
            .add_source(File::with_name(&format!("src/config/{}.toml", runtime)).required(false))
            .add_source(Environment::with_prefix("JAUM").separator("__"))
            .build()?
            .try_deserialize()?;

        debug!(
            "Loaded config: {}",
            serde_json::to_string_pretty(&config).unwrap_or_default()
        );

        Ok(config)
    }
}
