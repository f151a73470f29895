use anyhow::Result;
use config::Config;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub keycloak: KeycloakConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u8,
    pub run_migrations: bool,
}

#[derive(Clone, Deserialize)]
pub struct KeycloakConfig {
    pub url: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout_secs: u64,
    /// When false, `uma2_configuration` must carry the endpoints.
    pub uma2_discovery: bool,
    pub uma2_configuration: Option<ManualUma2Config>,
}

impl std::fmt::Debug for KeycloakConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeycloakConfig")
            .field("url", &self.url)
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .field("uma2_discovery", &self.uma2_discovery)
            .field("uma2_configuration", &self.uma2_configuration)
            .finish()
    }
}

/// Statically supplied UMA2 endpoints, used when discovery is disabled.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualUma2Config {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub introspection_endpoint: String,
    pub end_session_endpoint: Option<String>,
    pub registration_endpoint: String,
    pub resource_registration_endpoint: String,
    pub permission_endpoint: String,
    pub policy_endpoint: String,
    pub jwks_uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Development mode. Enables the browsable-API bypass when compiled in.
    pub debug: bool,
}

impl ServerConfig {
    /// ## Summary
    /// Returns the bind address in the format "host:port".
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Seconds between scheduled group syncs; 0 disables the schedule.
    pub interval_secs: u64,
    pub queue_depth: usize,
    pub run_on_startup: bool,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from environment variables and an optional `config.toml`.
    /// Environment variables use the `CATALOG_` prefix and `__` between sections,
    /// e.g. `CATALOG_KEYCLOAK__CLIENT_ID`.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.debug", false)?
            .set_default("database.backend", "postgres")?
            .set_default("database.url", "")?
            .set_default("database.max_connections", 4)?
            .set_default("database.run_migrations", true)?
            .set_default("keycloak.timeout_secs", 10)?
            .set_default("keycloak.uma2_discovery", true)?
            .set_default("logging.level", "info")?
            .set_default("sync.interval_secs", 3600)?
            .set_default("sync.queue_depth", 8)?
            .set_default("sync.run_on_startup", true)?
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            // Env
            .add_source(
                config::Environment::with_prefix("CATALOG")
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Self>()?;

        settings.validate()?;
        Ok(settings)
    }

    /// ## Summary
    /// Checks cross-field constraints that serde cannot express.
    ///
    /// ## Errors
    /// Returns a `ConfigError` when discovery is disabled without manual endpoints,
    /// or when the Postgres backend has no URL.
    pub fn validate(&self) -> crate::error::CoreResult<()> {
        if !self.keycloak.uma2_discovery && self.keycloak.uma2_configuration.is_none() {
            return Err(crate::error::CoreError::ConfigError(
                "keycloak.uma2_configuration is required when uma2_discovery is disabled"
                    .to_string(),
            ));
        }
        if self.database.backend == DatabaseBackend::Postgres && self.database.url.is_empty() {
            return Err(crate::error::CoreError::ConfigError(
                "database.url is required for the postgres backend".to_string(),
            ));
        }
        Ok(())
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
