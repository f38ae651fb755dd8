use std::env;

use crate::types::Language;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Notification channel gateways (optional; channels without a gateway
    // configured fail per-channel, never the whole job)
    pub push_gateway_url: Option<String>,
    pub sms_gateway_url: Option<String>,
    pub sms_sender_id: String,

    // Template fallback language
    pub default_language: Language,

    // Scheduler poll interval in seconds
    pub scheduler_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
            push_gateway_url: env::var("PUSH_GATEWAY_URL").ok(),
            sms_gateway_url: env::var("SMS_GATEWAY_URL").ok(),
            sms_sender_id: env::var("SMS_SENDER_ID").unwrap_or_else(|_| "CIVSIG".to_string()),
            default_language: Language::from_str_loose(
                &env::var("DEFAULT_LANGUAGE").unwrap_or_else(|_| "hindi".to_string()),
            ),
            scheduler_interval_secs: env::var("SCHEDULER_INTERVAL_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .expect("SCHEDULER_INTERVAL_SECS must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
