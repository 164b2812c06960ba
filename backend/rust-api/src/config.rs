use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub execution_api_url: String,
    pub content_api_url: String,
    pub assist_api_url: String,
    pub grading_api_url: String,
    pub execution_timeout_seconds: u64,
    pub hint_unlock_interval_seconds: u32,
    pub assist_unlock_delay_seconds: u32,
    pub default_time_limit_seconds: u32,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load environment variables from root .env file (two levels up)
        // Try root .env first, then fallback to local .env
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            // Fallback to current directory .env for backward compatibility
            dotenvy::dotenv().ok();
        }

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let config_builder = config::Config::builder()
            // Load base config from TOML file
            .add_source(
                config::File::with_name(&format!("config/{}", env)).required(false), // Allow missing config file, fallback to ENV
            )
            // Override with environment variables (prefix: APP_)
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let settings = config_builder.build()?;

        let execution_api_url = settings
            .get_string("execution.url")
            .or_else(|_| env::var("EXECUTION_API_URL"))
            .unwrap_or_else(|_| "http://localhost:8100".to_string());

        let content_api_url = settings
            .get_string("content.url")
            .or_else(|_| env::var("CONTENT_API_URL"))
            .unwrap_or_else(|_| "http://localhost:8000".to_string());

        let assist_api_url = settings
            .get_string("assist.url")
            .or_else(|_| env::var("ASSIST_API_URL"))
            .unwrap_or_else(|_| "http://localhost:8200".to_string());

        let grading_api_url = settings
            .get_string("grading.url")
            .or_else(|_| env::var("GRADING_API_URL"))
            .unwrap_or_else(|_| "http://localhost:8300".to_string());

        let execution_timeout_seconds = settings
            .get_int("execution.timeout_seconds")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .or_else(|| parse_env_var("EXECUTION_TIMEOUT_SECONDS"))
            .filter(|v| *v > 0)
            .unwrap_or(30);

        let hint_unlock_interval_seconds = settings
            .get_int("hints.unlock_interval_seconds")
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .or_else(|| parse_env_var("HINT_UNLOCK_INTERVAL_SECONDS"))
            .unwrap_or(300);

        let assist_unlock_delay_seconds = settings
            .get_int("assist.unlock_delay_seconds")
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .or_else(|| parse_env_var("ASSIST_UNLOCK_DELAY_SECONDS"))
            .unwrap_or(420);

        let default_time_limit_seconds = settings
            .get_int("sessions.default_time_limit_seconds")
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .or_else(|| parse_env_var("SESSION_TIME_LIMIT_SECONDS"))
            .filter(|v| *v > 0)
            .unwrap_or(3600);

        Ok(Config {
            execution_api_url,
            content_api_url,
            assist_api_url,
            grading_api_url,
            execution_timeout_seconds,
            hint_unlock_interval_seconds,
            assist_unlock_delay_seconds,
            default_time_limit_seconds,
        })
    }
}

fn parse_env_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_overrides() {
        for name in [
            "EXECUTION_API_URL",
            "HINT_UNLOCK_INTERVAL_SECONDS",
            "ASSIST_UNLOCK_DELAY_SECONDS",
            "SESSION_TIME_LIMIT_SECONDS",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn defaults_hold_without_environment() {
        clear_overrides();
        let config = Config::load().unwrap();

        assert_eq!(config.hint_unlock_interval_seconds, 300);
        assert_eq!(config.assist_unlock_delay_seconds, 420);
        assert_eq!(config.default_time_limit_seconds, 3600);
        assert_eq!(config.execution_timeout_seconds, 30);
        assert!(config.execution_api_url.starts_with("http://"));
    }

    #[test]
    #[serial]
    fn environment_overrides_are_picked_up() {
        clear_overrides();
        env::set_var("EXECUTION_API_URL", "http://exec.internal:9000");
        env::set_var("HINT_UNLOCK_INTERVAL_SECONDS", "60");

        let config = Config::load().unwrap();
        assert_eq!(config.execution_api_url, "http://exec.internal:9000");
        assert_eq!(config.hint_unlock_interval_seconds, 60);

        clear_overrides();
    }

    #[test]
    #[serial]
    fn invalid_numeric_override_falls_back_to_default() {
        clear_overrides();
        env::set_var("HINT_UNLOCK_INTERVAL_SECONDS", "not-a-number");

        let config = Config::load().unwrap();
        assert_eq!(config.hint_unlock_interval_seconds, 300);

        clear_overrides();
    }
}
