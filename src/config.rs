use std::env;

use anyhow::{Context, Result};
use dotenv::dotenv;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    /// Emails are only logged when this is missing
    pub mailgun_token: Option<String>,
    pub mailgun_domain: String,
    pub mail_from_name: String,
    pub mail_from_address: String,
    pub contact_email: String,
    /// Base URL of the web frontend, used for links in emails
    pub frontend_url: String,
    pub upload_dir: String,
    pub bcrypt_cost: u32,
    /// Whether error responses carry internal detail. Off in production.
    pub diagnostics: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let mail_from_address =
            env::var("MAIL_FROM_ADDRESS").unwrap_or_else(|_| "no-reply@naus.org.ng".to_owned());

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            port: parse_or("PORT", 5000)?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_ttl_hours: parse_or("JWT_TTL_HOURS", 24)?,
            mailgun_token: env::var("MAILGUN_TOKEN").ok(),
            mailgun_domain: env::var("MAILGUN_DOMAIN")
                .unwrap_or_else(|_| "mail.naus.org.ng".to_owned()),
            mail_from_name: env::var("MAIL_FROM_NAME").unwrap_or_else(|_| "NAUS".to_owned()),
            contact_email: env::var("CONTACT_EMAIL").unwrap_or_else(|_| mail_from_address.clone()),
            mail_from_address,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_owned()),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_owned()),
            bcrypt_cost: parse_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            diagnostics: env::var("APP_ENV").map_or(true, |app_env| app_env != "production"),
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        Err(_) => Ok(default),
    }
}
