use std::net::SocketAddr;

use serde::Deserialize;

use crate::{
    error::{Error, ErrorKind},
    jwt::SessionKeys,
};

/// Runtime settings, read from the environment (and an optional `.env`).
#[derive(Deserialize, Debug, Clone)]
pub struct Configuration {
    pub database_url: String,
    /// Only `serve` signs sessions, so the other commands run without it.
    pub jwt_secret: Option<String>,

    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_session_lifetime_hours")]
    pub session_lifetime_hours: i64,
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_max_connections() -> u32 {
    5
}

fn default_session_lifetime_hours() -> i64 {
    24
}

impl Configuration {
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn session_keys(&self) -> Result<SessionKeys, Error> {
        let secret = self
            .jwt_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| {
                ErrorKind::InternalServerError.new("JWT_SECRET must be set to serve the API")
            })?;

        SessionKeys::new(secret, self.session_lifetime_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let vars = vec![
            (String::from("DATABASE_URL"), String::from("postgres://localhost/foodgram")),
            (String::from("JWT_SECRET"), String::from("secret")),
        ];
        let config: Configuration = envy::from_iter(vars).unwrap();

        assert_eq!(config.bind_address, default_bind_address());
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.session_lifetime_hours, 24);
    }

    #[test]
    fn overrides_are_read() {
        let vars = vec![
            (String::from("DATABASE_URL"), String::from("postgres://localhost/foodgram")),
            (String::from("JWT_SECRET"), String::from("secret")),
            (String::from("BIND_ADDRESS"), String::from("127.0.0.1:9000")),
            (String::from("SESSION_LIFETIME_HOURS"), String::from("2")),
        ];
        let config: Configuration = envy::from_iter(vars).unwrap();

        assert_eq!(config.bind_address.port(), 9000);
        assert_eq!(config.session_lifetime_hours, 2);
    }

    #[test]
    fn secret_is_only_needed_for_sessions() {
        let vars = vec![(
            String::from("DATABASE_URL"),
            String::from("postgres://localhost/foodgram"),
        )];
        let config: Configuration = envy::from_iter(vars).unwrap();

        assert!(config.jwt_secret.is_none());
        assert!(config.session_keys().is_err());
    }

    #[test]
    fn session_keys_come_from_the_secret() {
        let vars = vec![
            (String::from("DATABASE_URL"), String::from("postgres://localhost/foodgram")),
            (String::from("JWT_SECRET"), String::from("secret")),
        ];
        let config: Configuration = envy::from_iter(vars).unwrap();

        assert!(config.session_keys().is_ok());
    }
}
