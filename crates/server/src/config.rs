//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `AUTOLEAD_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `AUTOLEAD_PUBLIC_URL` - Public URL of this server, used in tracking links
//! - `AUTH_SIGNING_SECRET` - Shared secret for gateway identity headers (min 32 chars)
//! - `SERPER_API_KEY` - Maps search API key
//! - `CLAUDE_API_KEY` - Anthropic Claude API key
//! - `SMTP_HOST` - Default SMTP server hostname
//! - `SMTP_USERNAME` - Default SMTP authentication username
//! - `SMTP_PASSWORD` - Default SMTP authentication password
//!
//! ## Optional
//! - `AUTOLEAD_HOST` - Bind address (default: 127.0.0.1)
//! - `AUTOLEAD_PORT` - Listen port (default: 3000)
//! - `CLAUDE_MODEL` - Claude model ID (default: claude-sonnet-4-20250514)
//! - `SMTP_PORT` - SMTP port (default: 465, implicit TLS)
//! - `SMTP_FROM` - Sender address (default: `SMTP_USERNAME`)
//! - `SMTP_FROM_NAME` - Sender display name (default: AutoLead Pro)
//! - `OUTREACH_DELAY_MS` - Pause between leads in a bulk run (default: 2000)
//! - `ENRICH_TIMEOUT_SECS` - Website fetch timeout (default: 5)
//! - `INITIAL_CREDITS` - Credits granted to new profiles (default: 10)
//! - `CORS_ALLOWED_ORIGIN` - Dashboard origin allowed to call the API
//! - `SENTRY_DSN` - Sentry error tracking DSN
//!
//! ## Optional (TLS)
//! - `AUTOLEAD_TLS_CERT` - PEM-encoded certificate chain
//! - `AUTOLEAD_TLS_KEY` - PEM-encoded private key

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SIGNING_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_FROM_NAME: &str = "AutoLead Pro";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, embedded in tracking pixels
    pub public_url: Url,
    /// Identity header verification
    pub auth: AuthConfig,
    /// Maps search API
    pub search: SearchConfig,
    /// Claude AI configuration
    pub claude: ClaudeConfig,
    /// Default SMTP transport
    pub email: EmailConfig,
    /// Bulk run and enrichment tuning
    pub outreach: OutreachConfig,
    /// Origin allowed by CORS (the hosted dashboard)
    pub cors_allowed_origin: Option<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// Gateway identity header verification.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC key shared with the auth gateway
    pub signing_secret: SecretString,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("signing_secret", &"[REDACTED]")
            .finish()
    }
}

/// Maps search API configuration.
#[derive(Clone)]
pub struct SearchConfig {
    pub api_key: SecretString,
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Claude AI API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ClaudeConfig {
    /// Anthropic API key
    pub api_key: SecretString,
    /// Model ID (e.g., claude-sonnet-4-20250514)
    pub model: String,
}

impl std::fmt::Debug for ClaudeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

/// Default SMTP configuration, used when a send names no account.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
    /// Display name in the From header
    pub from_name: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("from_name", &self.from_name)
            .finish()
    }
}

/// Tuning for enrichment and bulk runs.
#[derive(Debug, Clone, Copy)]
pub struct OutreachConfig {
    /// Pause between two leads of a bulk run
    pub inter_lead_delay: Duration,
    /// Timeout for fetching a lead's website
    pub enrich_timeout: Duration,
    /// Credits granted when a profile is first created
    pub initial_credits: i32,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            inter_lead_delay: Duration::from_millis(2000),
            enrich_timeout: Duration::from_secs(5),
            initial_credits: 10,
        }
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let cert_pem = get_optional_env("AUTOLEAD_TLS_CERT");
        let key_pem = get_optional_env("AUTOLEAD_TLS_KEY");

        match (cert_pem, key_pem) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "AUTOLEAD_TLS_*".to_string(),
                "Both AUTOLEAD_TLS_CERT and AUTOLEAD_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("AUTOLEAD_DATABASE_URL")?;
        let host = get_env_or_default("AUTOLEAD_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("AUTOLEAD_HOST".to_string(), e.to_string()))?;
        let port = parse_env("AUTOLEAD_PORT", "3000")?;
        let public_url = parse_public_url(&get_required_env("AUTOLEAD_PUBLIC_URL")?)?;

        let auth = AuthConfig::from_env()?;
        let search = SearchConfig {
            api_key: get_validated_secret("SERPER_API_KEY")?,
        };
        let claude = ClaudeConfig::from_env()?;
        let email = EmailConfig::from_env()?;
        let outreach = OutreachConfig::from_env()?;
        let cors_allowed_origin = get_optional_env("CORS_ALLOWED_ORIGIN");
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);
        let tls = TlsConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            public_url,
            auth,
            search,
            claude,
            email,
            outreach,
            cors_allowed_origin,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            tls,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl AuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let signing_secret = get_validated_secret("AUTH_SIGNING_SECRET")?;
        validate_signing_secret(&signing_secret, "AUTH_SIGNING_SECRET")?;
        Ok(Self { signing_secret })
    }
}

impl ClaudeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: get_validated_secret("CLAUDE_API_KEY")?,
            model: get_env_or_default("CLAUDE_MODEL", DEFAULT_CLAUDE_MODEL),
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let smtp_port = parse_env("SMTP_PORT", "465")?;
        let smtp_username = get_required_env("SMTP_USERNAME")?;
        let from_address =
            get_optional_env("SMTP_FROM").unwrap_or_else(|| smtp_username.clone());

        Ok(Self {
            smtp_host: get_required_env("SMTP_HOST")?,
            smtp_port,
            smtp_username,
            // Mailbox passwords are often user-chosen; only reject placeholders.
            smtp_password: get_non_placeholder_secret("SMTP_PASSWORD")?,
            from_address,
            from_name: get_env_or_default("SMTP_FROM_NAME", DEFAULT_FROM_NAME),
        })
    }
}

impl OutreachConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let delay_ms: u64 = parse_env("OUTREACH_DELAY_MS", "2000")?;
        let timeout_secs: u64 = parse_env("ENRICH_TIMEOUT_SECS", "5")?;
        let initial_credits: i32 = parse_env("INITIAL_CREDITS", "10")?;
        if initial_credits < 0 {
            return Err(ConfigError::InvalidEnvVar(
                "INITIAL_CREDITS".to_string(),
                "must not be negative".to_string(),
            ));
        }

        Ok(Self {
            inter_lead_delay: Duration::from_millis(delay_ms),
            enrich_timeout: Duration::from_secs(timeout_secs),
            initial_credits,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse the public base URL. Trailing slashes are dropped so paths can be
/// appended with `join`.
fn parse_public_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim_end_matches('/')).map_err(|e| {
        ConfigError::InvalidEnvVar("AUTOLEAD_PUBLIC_URL".to_string(), e.to_string())
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "AUTOLEAD_PUBLIC_URL".to_string(),
            "must be an http(s) URL".to_string(),
        ));
    }
    Ok(url)
}

/// Validate that the signing secret meets minimum length requirements.
fn validate_signing_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SIGNING_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SIGNING_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject values matching the placeholder blocklist.
fn reject_placeholder(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }
    Ok(())
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    reject_placeholder(secret, var_name)?;

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

fn get_non_placeholder_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    reject_placeholder(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-serper-key-here", "SERPER_API_KEY").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("abababababababababababababababab", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_signing_secret_too_short() {
        let secret = SecretString::from("k3Y!9zQ");
        assert!(validate_signing_secret(&secret, "AUTH_SIGNING_SECRET").is_err());
    }

    #[test]
    fn test_signing_secret_valid_length() {
        let secret = SecretString::from("q".repeat(32));
        assert!(validate_signing_secret(&secret, "AUTH_SIGNING_SECRET").is_ok());
    }

    #[test]
    fn test_public_url_trailing_slash_dropped() {
        let url = parse_public_url("https://leads.autolead.app/").unwrap();
        assert_eq!(
            url.join("/api/track-email").unwrap().as_str(),
            "https://leads.autolead.app/api/track-email"
        );
    }

    #[test]
    fn test_public_url_rejects_other_schemes() {
        assert!(parse_public_url("ftp://leads.autolead.app").is_err());
        assert!(parse_public_url("not a url").is_err());
    }

    #[test]
    fn test_outreach_defaults() {
        let defaults = OutreachConfig::default();
        assert_eq!(defaults.inter_lead_delay, Duration::from_secs(2));
        assert_eq!(defaults.enrich_timeout, Duration::from_secs(5));
        assert_eq!(defaults.initial_credits, 10);
    }

    #[test]
    fn test_claude_config_debug_redacts_secrets() {
        let config = ClaudeConfig {
            api_key: SecretString::from("sk-ant-super-secret-key"),
            model: DEFAULT_CLAUDE_MODEL.to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains(DEFAULT_CLAUDE_MODEL));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk-ant-super-secret-key"));
    }

    #[test]
    fn test_email_config_debug_redacts_secrets() {
        let config = EmailConfig {
            smtp_host: "smtp.mailhost.test".to_string(),
            smtp_port: 465,
            smtp_username: "outreach@agency.test".to_string(),
            smtp_password: SecretString::from("hunter2-smtp-pass"),
            from_address: "outreach@agency.test".to_string(),
            from_name: DEFAULT_FROM_NAME.to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.mailhost.test"));
        assert!(debug_output.contains("465"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2-smtp-pass"));
    }

    #[test]
    fn test_search_and_auth_debug_redact() {
        let search = SearchConfig {
            api_key: SecretString::from("serper-live-key-123"),
        };
        let auth = AuthConfig {
            signing_secret: SecretString::from("gateway-signing-key-abc"),
        };
        assert!(!format!("{search:?}").contains("serper-live-key-123"));
        assert!(!format!("{auth:?}").contains("gateway-signing-key-abc"));
    }
}
