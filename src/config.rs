use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    /// Remote document vault endpoint. When unset the repository runs local-only.
    pub remote_vault_url: Option<String>,
    pub remote_vault_token: Option<String>,
    pub max_quiz_questions: usize,
    pub history_limit: usize,
    pub local_vault_limit: usize,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            gemini_api_key: get_env("GEMINI_API_KEY")?,
            gemini_api_base: env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            remote_vault_url: env::var("REMOTE_VAULT_URL").ok(),
            remote_vault_token: env::var("REMOTE_VAULT_TOKEN").ok(),
            max_quiz_questions: get_env_parse_or("MAX_QUIZ_QUESTIONS", 50)?,
            history_limit: get_env_parse_or("HISTORY_LIMIT", 15)?,
            local_vault_limit: get_env_parse_or("LOCAL_VAULT_LIMIT", 20)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
