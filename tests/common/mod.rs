//! Shared wiring for the integration tests: in-memory store, fixture signing
//! key, cheap Argon2 parameters and a mail sender that forwards every message
//! to a channel the test can read.
#![allow(dead_code)]

use argon2::Params;
use async_trait::async_trait;
use std::sync::Arc;
use swades::{
    auth::{AuthConfig, AuthService, MemoryStore, PasswordEncoder, UserStore},
    mail::{spawn_mail_worker, DeliveryError, MailSender, NotificationEmail},
    token::{KeyProvider, StaticKeyProvider, TokenSigner},
};
use tokio::sync::mpsc;

pub const SIGNING_KEY_PEM: &str = include_str!("../fixtures/signing_key.pem");
pub const OTHER_KEY_PEM: &str = include_str!("../fixtures/other_key.pem");

pub struct ChannelSender {
    tx: mpsc::UnboundedSender<NotificationEmail>,
}

#[async_trait]
impl MailSender for ChannelSender {
    async fn send(&self, email: &NotificationEmail) -> Result<(), DeliveryError> {
        let _ = self.tx.send(email.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub auth: Arc<AuthService>,
    pub store: Arc<MemoryStore>,
    pub outbox: mpsc::UnboundedReceiver<NotificationEmail>,
}

pub fn signer_for(pem: &str, ttl_seconds: i64) -> TokenSigner {
    let pair = StaticKeyProvider::from_pem("swades", pem)
        .load()
        .expect("fixture key should parse");
    TokenSigner::new(pair, ttl_seconds).expect("ttl should be positive")
}

pub fn cheap_encoder() -> PasswordEncoder {
    PasswordEncoder::new(Params::new(1024, 1, 1, None).expect("valid argon2 params"))
}

pub fn service_with(store: Arc<dyn UserStore>, config: AuthConfig) -> (AuthService, mpsc::UnboundedReceiver<NotificationEmail>) {
    let (tx, outbox) = mpsc::unbounded_channel();
    let (notifier, _worker) = spawn_mail_worker(Arc::new(ChannelSender { tx }), None);
    let service = AuthService::new(store, Arc::new(signer_for(SIGNING_KEY_PEM, 900)), notifier, config)
        .with_password_encoder(cheap_encoder());
    (service, outbox)
}

pub fn app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let (service, outbox) = service_with(store.clone(), AuthConfig::default());
    TestApp {
        auth: Arc::new(service),
        store,
        outbox,
    }
}

/// The raw verification token is the last path segment of the mailed link.
pub fn token_from(email: &NotificationEmail) -> String {
    email
        .body
        .rsplit('/')
        .next()
        .map(str::to_string)
        .unwrap_or_default()
}
