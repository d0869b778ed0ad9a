// Centralized configuration management
// Load ALL env vars ONCE at startup

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store_backend: StoreBackend,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub workflow: WorkflowConfig,
    pub bootstrap: BootstrapConfig,
    pub features: FeatureConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub environment: Environment,
    pub rust_log: String,
    pub cors_allowed_origins: Vec<String>,
}

/// Environment type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Where marketplace records live
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl From<String> for StoreBackend {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" => StoreBackend::Memory,
            _ => StoreBackend::Postgres,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: u64,
    pub idle_timeout: u64,
    pub max_lifetime: u64,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub access_expiry: u64,
    pub audience: String,
    pub issuer: String,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub provider: EmailProvider,
    pub resend_api_key: String,
    pub resend_api_url: String,
    pub from_email: String,
    pub from_name: String,
    pub support_email: String,
    pub frontend_url: String,
}

/// Email provider type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum EmailProvider {
    Resend,
    /// Write messages to the log instead of sending them
    Log,
}

impl From<String> for EmailProvider {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "log" | "console" => EmailProvider::Log,
            _ => EmailProvider::Resend,
        }
    }
}

/// Approval workflow settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowConfig {
    /// One-time code lifetime for dealer/user registration
    pub otp_ttl_seconds: i64,
    /// One-time code lifetime for company owners
    pub company_owner_otp_ttl_seconds: i64,
    /// Dealer ceiling of a company that has never been assigned a plan
    pub trial_max_dealers: i32,
    /// Property ceiling of a company that has never been assigned a plan
    pub trial_max_properties: i32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            otp_ttl_seconds: 180,
            company_owner_otp_ttl_seconds: 600,
            trial_max_dealers: 2,
            trial_max_properties: 10,
        }
    }
}

/// Platform super-admin seeded at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub super_admin_email: Option<String>,
    #[serde(skip_serializing)]
    pub super_admin_password: Option<String>,
    pub super_admin_name: String,
}

/// Feature flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub enable_tracing: bool,
    pub disable_embedded_migrations: bool,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Helper function to get required env var
        let get_required = |key: &str| -> Result<String, ConfigError> {
            env::var(key).map_err(|_| ConfigError::MissingVar(key.to_string()))
        };

        // Helper function to get optional env var with default
        let get_or_default = |key: &str, default: &str| -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let get_optional = |key: &str| -> Option<String> {
            env::var(key).ok().filter(|v| !v.trim().is_empty())
        };

        let parse_or_default = |key: &str, default: &str| -> Result<u32, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u32".to_string())
            })
        };

        let parse_u64_or_default = |key: &str, default: &str| -> Result<u64, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u64".to_string())
            })
        };

        let parse_positive = |key: &str, default: &str| -> Result<i64, ConfigError> {
            match get_or_default(key, default).parse::<i64>() {
                Ok(v) if v > 0 => Ok(v),
                _ => Err(ConfigError::InvalidValue(
                    key.to_string(),
                    "must be a positive integer".to_string(),
                )),
            }
        };

        let parse_bool_or_default = |key: &str, default: &str| -> bool {
            get_or_default(key, default).to_lowercase() == "true"
        };

        // Server
        let bind_address = get_or_default("BIND_ADDRESS", "0.0.0.0:8080");
        let port = bind_address
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let environment = Environment::from(get_or_default("ENVIRONMENT", "development"));
        let rust_log = get_or_default("RUST_LOG", "info");
        let cors_allowed_origins: Vec<String> = get_or_default("CORS_ALLOWED_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let server = ServerConfig {
            bind_address,
            port,
            environment: environment.clone(),
            rust_log,
            cors_allowed_origins,
        };

        // Storage
        let store_backend = StoreBackend::from(get_or_default("STORE_BACKEND", "postgres"));
        let database_url = match store_backend {
            StoreBackend::Postgres => get_required("DATABASE_URL")?,
            StoreBackend::Memory => get_or_default("DATABASE_URL", ""),
        };

        let database = DatabaseConfig {
            url: database_url,
            max_connections: parse_or_default("DATABASE_MAX_CONNECTIONS", "20")?,
            min_connections: parse_or_default("DATABASE_MIN_CONNECTIONS", "2")?,
            connect_timeout: parse_u64_or_default("DATABASE_CONNECT_TIMEOUT", "30")?,
            idle_timeout: parse_u64_or_default("DATABASE_IDLE_TIMEOUT", "600")?,
            max_lifetime: parse_u64_or_default("DATABASE_MAX_LIFETIME", "1800")?,
        };

        // JWT secrets validation
        let access_secret = get_required("JWT_ACCESS_SECRET")?;
        if access_secret.len() < 32 {
            return Err(ConfigError::InvalidValue(
                "JWT_ACCESS_SECRET".to_string(),
                "Secret must be at least 32 characters long".to_string(),
            ));
        }

        let jwt = JwtConfig {
            access_secret,
            access_expiry: parse_u64_or_default("JWT_ACCESS_EXPIRY", "86400")?,
            audience: get_or_default("JWT_AUDIENCE", "realty-marketplace"),
            issuer: get_or_default("JWT_ISSUER", "realty-marketplace"),
        };

        // Email
        let provider: EmailProvider = get_or_default("EMAIL_PROVIDER", "resend").into();
        let resend_api_key = match provider {
            EmailProvider::Resend => get_required("RESEND_API_KEY")?,
            EmailProvider::Log => get_or_default("RESEND_API_KEY", ""),
        };

        let email = EmailConfig {
            provider,
            resend_api_key,
            resend_api_url: get_or_default("RESEND_API_URL", "https://api.resend.com/emails"),
            from_email: get_or_default("EMAIL_FROM_ADDRESS", "noreply@realty.local"),
            from_name: get_or_default("EMAIL_FROM_NAME", "Realty Marketplace"),
            support_email: get_or_default("SUPPORT_EMAIL", "support@realty.local"),
            frontend_url: get_or_default("FRONTEND_URL", "http://localhost:3000"),
        };

        // Workflow
        let trial_max_dealers = parse_or_default("TRIAL_MAX_DEALERS", "2")?;
        let trial_max_properties = parse_or_default("TRIAL_MAX_PROPERTIES", "10")?;
        let workflow = WorkflowConfig {
            otp_ttl_seconds: parse_positive("OTP_TTL_SECONDS", "180")?,
            company_owner_otp_ttl_seconds: parse_positive("COMPANY_OWNER_OTP_TTL_SECONDS", "600")?,
            trial_max_dealers: i32::try_from(trial_max_dealers).map_err(|_| {
                ConfigError::InvalidValue("TRIAL_MAX_DEALERS".to_string(), "too large".to_string())
            })?,
            trial_max_properties: i32::try_from(trial_max_properties).map_err(|_| {
                ConfigError::InvalidValue(
                    "TRIAL_MAX_PROPERTIES".to_string(),
                    "too large".to_string(),
                )
            })?,
        };

        // Bootstrap super-admin
        let super_admin_email = get_optional("SUPER_ADMIN_EMAIL");
        let super_admin_password = get_optional("SUPER_ADMIN_PASSWORD");
        if super_admin_email.is_some() && super_admin_password.is_none() {
            return Err(ConfigError::MissingVar("SUPER_ADMIN_PASSWORD".to_string()));
        }

        let bootstrap = BootstrapConfig {
            super_admin_email,
            super_admin_password,
            super_admin_name: get_or_default("SUPER_ADMIN_NAME", "Platform Admin"),
        };

        let features = FeatureConfig {
            enable_tracing: parse_bool_or_default("ENABLE_TRACING", "true"),
            disable_embedded_migrations: parse_bool_or_default(
                "DISABLE_EMBEDDED_MIGRATIONS",
                "false",
            ),
        };

        Ok(Self {
            server,
            store_backend,
            database,
            jwt,
            email,
            workflow,
            bootstrap,
            features,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.server.environment == Environment::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "STORE_BACKEND",
        "DATABASE_URL",
        "JWT_ACCESS_SECRET",
        "EMAIL_PROVIDER",
        "RESEND_API_KEY",
        "OTP_TTL_SECONDS",
        "COMPANY_OWNER_OTP_TTL_SECONDS",
        "TRIAL_MAX_DEALERS",
        "SUPER_ADMIN_EMAIL",
        "SUPER_ADMIN_PASSWORD",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_environment_from_string() {
        assert_eq!(
            Environment::from("development".to_string()),
            Environment::Development
        );
        assert_eq!(
            Environment::from("prod".to_string()),
            Environment::Production
        );
        assert_eq!(Environment::from("test".to_string()), Environment::Test);
    }

    #[test]
    fn test_backend_and_provider_from_string() {
        assert_eq!(StoreBackend::from("memory".to_string()), StoreBackend::Memory);
        assert_eq!(StoreBackend::from("pg".to_string()), StoreBackend::Postgres);
        assert_eq!(EmailProvider::from("log".to_string()), EmailProvider::Log);
        assert_eq!(EmailProvider::from("resend".to_string()), EmailProvider::Resend);
    }

    #[test]
    #[serial]
    fn test_workflow_defaults() {
        clear_env();
        env::set_var("STORE_BACKEND", "memory");
        env::set_var(
            "JWT_ACCESS_SECRET",
            "test-secret-that-is-at-least-32-characters-long",
        );
        env::set_var("EMAIL_PROVIDER", "log");

        let config = AppConfig::from_env().expect("Failed to load test config");

        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.workflow, WorkflowConfig::default());
        assert_eq!(config.workflow.otp_ttl_seconds, 180);
        assert_eq!(config.workflow.company_owner_otp_ttl_seconds, 600);
        assert!(config.bootstrap.super_admin_email.is_none());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_workflow_overrides_and_validation() {
        clear_env();
        env::set_var("STORE_BACKEND", "memory");
        env::set_var(
            "JWT_ACCESS_SECRET",
            "test-secret-that-is-at-least-32-characters-long",
        );
        env::set_var("EMAIL_PROVIDER", "log");
        env::set_var("OTP_TTL_SECONDS", "60");
        env::set_var("TRIAL_MAX_DEALERS", "5");

        let config = AppConfig::from_env().expect("Failed to load test config");
        assert_eq!(config.workflow.otp_ttl_seconds, 60);
        assert_eq!(config.workflow.trial_max_dealers, 5);

        env::set_var("OTP_TTL_SECONDS", "0");
        assert!(matches!(
            AppConfig::from_env(),
            Err(ConfigError::InvalidValue(key, _)) if key == "OTP_TTL_SECONDS"
        ));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_required_values() {
        clear_env();
        env::set_var(
            "JWT_ACCESS_SECRET",
            "test-secret-that-is-at-least-32-characters-long",
        );
        env::set_var("EMAIL_PROVIDER", "log");

        // Postgres is the default backend and needs a URL
        assert!(matches!(
            AppConfig::from_env(),
            Err(ConfigError::MissingVar(key)) if key == "DATABASE_URL"
        ));

        env::set_var("STORE_BACKEND", "memory");
        env::set_var("JWT_ACCESS_SECRET", "short");
        assert!(matches!(
            AppConfig::from_env(),
            Err(ConfigError::InvalidValue(key, _)) if key == "JWT_ACCESS_SECRET"
        ));

        env::set_var(
            "JWT_ACCESS_SECRET",
            "test-secret-that-is-at-least-32-characters-long",
        );
        env::set_var("SUPER_ADMIN_EMAIL", "root@realty.local");
        assert!(matches!(
            AppConfig::from_env(),
            Err(ConfigError::MissingVar(key)) if key == "SUPER_ADMIN_PASSWORD"
        ));

        clear_env();
    }
}
