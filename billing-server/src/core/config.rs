//! Billing server configuration
//!
//! Loaded from environment variables (a `.env` file is read by `main`).

use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn parse(s: &str) -> Result<Self, BoxError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("Unknown ENVIRONMENT: {other}").into()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine tunables shared by the services (independent of process wiring)
#[derive(Debug, Clone)]
pub struct BillingSettings {
    /// Plan Catalog in-process cache TTL
    pub plan_cache_ttl: Duration,
    /// Businesses invoiced in parallel by the monthly batch
    pub invoice_concurrency: usize,
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            plan_cache_ttl: Duration::from_secs(300),
            invoice_concurrency: 8,
        }
    }
}

/// Billing server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: Environment,
    /// HTTP port
    pub http_port: u16,
    /// PostgreSQL connection URL (`None` = in-memory store, development only)
    pub database_url: Option<String>,
    /// sqlx pool size
    pub database_max_connections: u32,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// JSON log lines
    pub log_json: bool,
    /// Enables file logs when set
    pub log_dir: Option<String>,
    /// Insert the default plan catalog if missing
    pub seed_plans: bool,
    /// Run the monthly invoicing task
    pub invoice_scheduler_enabled: bool,
    /// How often the scheduler checks for a closed month
    pub invoice_scheduler_interval: Duration,
    pub billing: BillingSettings,
}

impl Config {
    /// Parse an optional env var, falling back to `default` when unset or empty
    fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, BoxError> {
        match std::env::var(name) {
            Ok(v) if !v.trim().is_empty() => v
                .trim()
                .parse()
                .map_err(|_| -> BoxError { format!("{name} has an invalid value: {v}").into() }),
            _ => Ok(default),
        }
    }

    fn parse_bool(name: &str, default: bool) -> Result<bool, BoxError> {
        match std::env::var(name) {
            Ok(v) if !v.trim().is_empty() => match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(format!("{name} must be a boolean, got: {v}").into()),
            },
            _ => Ok(default),
        }
    }

    /// `DATABASE_URL` must be set outside development
    fn require_database_url(environment: Environment) -> Result<Option<String>, BoxError> {
        let url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        if url.is_none() && !environment.is_development() {
            return Err(format!("DATABASE_URL must be set in {environment} environment").into());
        }
        Ok(url)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = Environment::parse(
            &std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        )?;

        let invoice_concurrency: usize = Self::parse_var("INVOICE_CONCURRENCY", 8)?;
        if invoice_concurrency == 0 {
            return Err("INVOICE_CONCURRENCY must be at least 1".into());
        }

        Ok(Self {
            environment,
            http_port: Self::parse_var("HTTP_PORT", 8080)?,
            database_url: Self::require_database_url(environment)?,
            database_max_connections: Self::parse_var("DATABASE_MAX_CONNECTIONS", 10)?,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: Self::parse_bool(
                "LOG_JSON",
                environment == Environment::Production,
            )?,
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
            seed_plans: Self::parse_bool("SEED_PLANS", true)?,
            invoice_scheduler_enabled: Self::parse_bool("INVOICE_SCHEDULER_ENABLED", true)?,
            invoice_scheduler_interval: Duration::from_secs(
                Self::parse_var("INVOICE_SCHEDULER_INTERVAL_SECS", 3600u64)?.max(1),
            ),
            billing: BillingSettings {
                plan_cache_ttl: Duration::from_secs(Self::parse_var("PLAN_CACHE_TTL_SECS", 300)?),
                invoice_concurrency,
            },
        })
    }
}
