use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            database_max_connections: get_env_parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            jwt_secret: get_env("JWT_SECRET")?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) => Err(Error::Config(format!("{} is set but empty", name))),
        Err(_) => Err(Error::Config(format!("{} must be set", name))),
    }
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

/// Loads the environment once and returns the process-wide config.
pub fn init_config() -> Result<&'static Config> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }
    let config = Config::from_env()?;
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_and_rejects_garbage() {
        env::remove_var("COURSE_TESTS_UNSET_VAR");
        assert_eq!(get_env_parse_or("COURSE_TESTS_UNSET_VAR", 7u32).unwrap(), 7);

        env::set_var("COURSE_TESTS_BAD_VAR", "many");
        let err = get_env_parse_or::<u32>("COURSE_TESTS_BAD_VAR", 7).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("COURSE_TESTS_BAD_VAR")));
    }

    #[test]
    fn missing_variable_is_config_error() {
        env::remove_var("COURSE_TESTS_MISSING_VAR");
        assert!(matches!(get_env("COURSE_TESTS_MISSING_VAR"), Err(Error::Config(_))));
    }

    #[test]
    fn blank_variable_is_config_error() {
        env::set_var("COURSE_TESTS_BLANK_VAR", "  ");
        let err = get_env("COURSE_TESTS_BLANK_VAR").unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("empty")));
    }
}
