//! Configuration management for opsdesk.
//!
//! Configuration is read once at startup from environment variables:
//! - `OPENAI_API_KEY` - API key for the completion endpoint. Required unless
//!   `SANDBOX_MODE=true`.
//! - `OPSDESK_MODEL` - Optional. Completion model. Defaults to `gpt-4o`.
//! - `OPSDESK_DATA_DIR` - Optional. Root for per-client state. Defaults to `.opsdesk`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `OPSDESK_API_TOKEN` - Optional. Static bearer token for the HTTP API.
//! - `SANDBOX_MODE` - Optional. When `true`, outward actions are logged, not performed.
//! - `LOOP_INTERVAL_SECS` - Optional. Dispatch loop sleep interval. `0` disables
//!   the background loop. Defaults to `10`.
//! - `DEFAULT_CLIENT` - Optional. Client id used when a request omits one.
//! - `IMAP_SERVER` / `SMTP_SERVER` / `EMAIL_ACCOUNT` / `EMAIL_PASSWORD` /
//!   `IMAP_PORT` / `SMTP_PORT` - Optional mail credentials for the email agent.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Mail credentials for the email agent.
///
/// The live IMAP/SMTP transport is an external collaborator; these only gate
/// whether the agent performs mocked or real delivery.
#[derive(Debug, Clone, Default)]
pub struct MailConfig {
    pub imap_server: Option<String>,
    pub smtp_server: Option<String>,
    pub account: Option<String>,
    pub password: Option<String>,
    pub imap_port: u16,
    pub smtp_port: u16,
}

impl MailConfig {
    /// True when enough credentials are present to attempt real delivery.
    pub fn is_configured(&self) -> bool {
        self.smtp_server.is_some() && self.account.is_some() && self.password.is_some()
    }

    fn from_env() -> Result<Self, ConfigError> {
        let imap_port = std::env::var("IMAP_PORT")
            .unwrap_or_else(|_| "993".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("IMAP_PORT".to_string(), format!("{}", e)))?;
        let smtp_port = std::env::var("SMTP_PORT")
            .unwrap_or_else(|_| "465".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("SMTP_PORT".to_string(), format!("{}", e)))?;
        Ok(Self {
            imap_server: std::env::var("IMAP_SERVER").ok(),
            smtp_server: std::env::var("SMTP_SERVER").ok(),
            account: std::env::var("EMAIL_ACCOUNT").ok(),
            password: std::env::var("EMAIL_PASSWORD").ok(),
            imap_port,
            smtp_port,
        })
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the completion endpoint (empty in sandbox mode)
    pub api_key: String,

    /// Completion model identifier
    pub model: String,

    /// Root directory for per-client state
    pub data_dir: PathBuf,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Static bearer token protecting the HTTP API; `None` disables auth
    pub api_token: Option<String>,

    /// When set, outward actions (email send, site publish) are logged only
    pub sandbox_mode: bool,

    /// Dispatch loop sleep interval in seconds; `0` disables the loop
    pub loop_interval_secs: u64,

    /// Client id assumed when a request does not name one
    pub default_client: String,

    /// Mail credentials for the email agent
    pub mail: MailConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENAI_API_KEY` is not set
    /// and sandbox mode is off.
    pub fn from_env() -> Result<Self, ConfigError> {
        let sandbox_mode = std::env::var("SANDBOX_MODE")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let api_key = match std::env::var("OPENAI_API_KEY") {
            Ok(k) => k,
            Err(_) if sandbox_mode => String::new(),
            Err(_) => return Err(ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string())),
        };

        let model = std::env::var("OPSDESK_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let data_dir = std::env::var("OPSDESK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".opsdesk"));

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let loop_interval_secs = std::env::var("LOOP_INTERVAL_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("LOOP_INTERVAL_SECS".to_string(), format!("{}", e))
            })?;

        let api_token = std::env::var("OPSDESK_API_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        let default_client =
            std::env::var("DEFAULT_CLIENT").unwrap_or_else(|_| "default".to_string());

        Ok(Self {
            api_key,
            model,
            data_dir,
            host,
            port,
            api_token,
            sandbox_mode,
            loop_interval_secs,
            default_client,
            mail: MailConfig::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mail_config_requires_smtp_account_and_password() {
        let mut mail = MailConfig::default();
        assert!(!mail.is_configured());
        mail.smtp_server = Some("smtp.example.com".to_string());
        mail.account = Some("ops@example.com".to_string());
        assert!(!mail.is_configured());
        mail.password = Some("secret".to_string());
        assert!(mail.is_configured());
    }
}
