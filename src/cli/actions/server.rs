use crate::{
    auth::{AuthConfig, AuthService, MemoryStore, PgStore, UserStore},
    cli::{commands::keystore::KeySource, telemetry},
    mail::{spawn_mail_worker, HttpMailSender, LogMailSender, MailSender},
    swades,
    token::{KeyProvider, KeystoreKeyProvider, StaticKeyProvider, TokenSigner},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub key_alias: String,
    pub key_source: KeySource,
    pub activation_base_url: String,
    pub jwt_ttl_seconds: i64,
    pub verification_token_ttl_seconds: i64,
    pub mail_from: String,
    pub mail_api_url: Option<Url>,
    pub mail_api_key: Option<SecretString>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the signing key cannot be loaded, the database is
/// unreachable, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let signer = Arc::new(load_signer(&args)?);
    info!(kid = signer.kid(), "token signing key loaded");

    let store: Arc<dyn UserStore> = match &args.dsn {
        Some(dsn) => {
            let pool = PgPoolOptions::new()
                .min_connections(1)
                .max_connections(5)
                .max_lifetime(Duration::from_secs(60 * 2))
                .test_before_acquire(true)
                .connect(dsn)
                .await
                .context("Failed to connect to database")?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("no --dsn given, users are kept in memory and lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let sender: Arc<dyn MailSender> = match (args.mail_api_url, args.mail_api_key) {
        (Some(url), Some(key)) => {
            info!(url = %url, "sending activation mail through HTTP API");
            Arc::new(HttpMailSender::new(url, key, args.mail_from)?)
        }
        _ => {
            info!("activation mail is logged, not sent");
            Arc::new(LogMailSender)
        }
    };
    let (notifier, _mail_worker) = spawn_mail_worker(sender, None);

    let config = AuthConfig::new(args.activation_base_url)
        .with_verification_token_ttl_seconds(args.verification_token_ttl_seconds)
        .context("Invalid verification token ttl")?;
    let auth = Arc::new(AuthService::new(store, signer, notifier, config));

    let result = swades::new(args.port, auth).await;

    telemetry::shutdown_tracer();

    result
}

fn load_signer(args: &Args) -> Result<TokenSigner> {
    let provider: Box<dyn KeyProvider> = match &args.key_source {
        KeySource::Keystore {
            path,
            store_password,
            key_password,
        } => Box::new(KeystoreKeyProvider::new(
            path,
            store_password.clone(),
            args.key_alias.clone(),
            key_password.clone(),
        )),
        KeySource::Pem { path } => {
            warn!("using an unencrypted signing key, do not do this in production");
            Box::new(StaticKeyProvider::from_file(args.key_alias.clone(), path)?)
        }
    };

    TokenSigner::from_provider(provider.as_ref(), args.jwt_ttl_seconds)
        .context("Failed to load token signing key")
}
