//! # lb-config
//!
//! Layered settings: built-in defaults, then an optional `lifeblocks.toml`
//! in the working directory, then `LIFEBLOCKS__SECTION__KEY` environment
//! variables (a `.env` file is loaded first).

use std::path::PathBuf;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("auth.jwt_secret must be set (LIFEBLOCKS__AUTH__JWT_SECRET)")]
    MissingSecret,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub content: ContentSettings,
    #[serde(default)]
    pub cors: CorsSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// sqlx connection string, e.g. `sqlite:lifeblocks.db`.
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    #[serde(deserialize_with = "secret_string")]
    pub jwt_secret: SecretString,
    pub token_ttl_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentSettings {
    /// Check content entries against their content type before writing.
    pub strict_validation: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsSettings {
    /// Any origin is allowed when unset.
    #[serde(default)]
    pub allowed_origin: Option<String>,
}

fn secret_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    Config::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 5000)?
        .set_default("database.url", "sqlite:lifeblocks.db")?
        .set_default("auth.jwt_secret", "")?
        .set_default("auth.token_ttl_secs", 86_400)?
        .set_default("content.strict_validation", false)
}

/// Loads `.env` into the process environment, returning its path if one was
/// found. Existing variables win. Safe to call more than once.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

impl Settings {
    /// Loads settings for the running process.
    pub fn load() -> Result<Self, SettingsError> {
        load_dotenv();

        let builder = defaults()?
            .add_source(File::with_name("lifeblocks").required(false))
            .add_source(
                Environment::with_prefix("LIFEBLOCKS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::finish(builder)
    }

    /// Defaults overlaid with a TOML document; no file or environment lookups.
    pub fn from_toml(toml: &str) -> Result<Self, SettingsError> {
        Self::finish(defaults()?.add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        if settings.auth.jwt_secret.expose_secret().is_empty() {
            return Err(SettingsError::MissingSecret);
        }
        Ok(settings)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_everything_but_the_secret() {
        let settings = Settings::from_toml("[auth]\njwt_secret = \"s3cret\"\n").unwrap();
        assert_eq!(settings.bind_address(), ("127.0.0.1".to_string(), 5000));
        assert_eq!(settings.database.url, "sqlite:lifeblocks.db");
        assert_eq!(settings.auth.token_ttl_secs, 86_400);
        assert_eq!(settings.auth.jwt_secret.expose_secret(), "s3cret");
        assert!(!settings.content.strict_validation);
        assert!(settings.cors.allowed_origin.is_none());
    }

    #[test]
    fn missing_secret_is_an_error() {
        assert!(matches!(Settings::from_toml(""), Err(SettingsError::MissingSecret)));
    }

    #[test]
    fn toml_overrides_defaults() {
        let settings = Settings::from_toml(
            r#"
            [server]
            port = 8080

            [auth]
            jwt_secret = "x"

            [content]
            strict_validation = true

            [cors]
            allowed_origin = "http://localhost:5173"
            "#,
        )
        .unwrap();
        assert_eq!(settings.server.port, 8080);
        assert!(settings.content.strict_validation);
        assert_eq!(settings.cors.allowed_origin.as_deref(), Some("http://localhost:5173"));
    }

    #[test]
    fn dotenv_loading_is_repeatable() {
        let first = load_dotenv();
        assert_eq!(load_dotenv(), first);
    }

    #[test]
    fn secret_is_redacted_in_debug_output() {
        let settings = Settings::from_toml("[auth]\njwt_secret = \"s3cret\"\n").unwrap();
        assert!(!format!("{settings:?}").contains("s3cret"));
    }
}
