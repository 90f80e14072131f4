use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use time::Duration;

use crate::auth::{BcryptHasher, PasswordHasher, Tokener};
use crate::config::Config;
use crate::email::{LogMailer, MailgunMailer, Mailer, Notifier};
use crate::file::{FileStorage, LocalStorage};
use crate::store::{PgStore, Store};

/// Everything a request handler needs, shared across requests.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Tokener,
    pub files: Arc<dyn FileStorage>,
    pub notifier: Notifier,
}

impl AppState {
    /// Connects to Postgres and wires up the production collaborators.
    pub async fn connect(config: Config) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;

        let mailer: Arc<dyn Mailer> = match &config.mailgun_token {
            Some(token) => Arc::new(MailgunMailer::new(
                token,
                &config.mailgun_domain,
                &config.mail_from_name,
                &config.mail_from_address,
            )),
            None => Arc::new(LogMailer),
        };

        Ok(Self {
            store: Arc::new(PgStore::new(pool)),
            hasher: Arc::new(BcryptHasher::new(config.bcrypt_cost)),
            tokens: Tokener::new(&config.jwt_secret, Duration::hours(config.jwt_ttl_hours)),
            files: Arc::new(LocalStorage::new(&config.upload_dir)),
            notifier: Notifier::new(mailer),
            config: Arc::new(config),
        })
    }

    /// An absolute link into the web frontend.
    pub fn frontend_link(&self, path: &str) -> String {
        format!("{}{}", self.config.frontend_url.trim_end_matches('/'), path)
    }
}
