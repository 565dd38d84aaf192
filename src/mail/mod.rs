//! Verification mail delivery.
//!
//! Signup hands a [`NotificationEmail`] to the [`Notifier`], which only pushes
//! it onto an unbounded queue and returns. A worker task spawned with
//! [`spawn_mail_worker`] drains the queue and calls a [`MailSender`]. A failed
//! delivery is logged and, when a failure channel was supplied, forwarded
//! there as a [`DeliveryFailure`]. Nothing is retried and the request that
//! queued the message never sees the outcome.
//!
//! The default sender for local runs is [`LogMailSender`], which only logs the
//! message. [`HttpMailSender`] posts to a transactional mail HTTP API.

mod http;

pub use http::HttpMailSender;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info, info_span, Instrument};

pub const ACTIVATION_SUBJECT: &str = "Please Activate your account";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationEmail {
    pub subject: String,
    pub recipient: String,
    pub body: String,
}

impl NotificationEmail {
    /// The account activation message carrying `activation_url`.
    #[must_use]
    pub fn activation(recipient: &str, activation_url: &str) -> Self {
        Self {
            subject: ACTIVATION_SUBJECT.to_string(),
            recipient: recipient.to_string(),
            body: format!(
                "Thank you for signing up to Swades Soaps, please click on the below url to activate your account : {activation_url}"
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("mail queue is closed")]
    QueueClosed,
    #[error("mail provider rejected message to {recipient} (status={status}): {body}")]
    Rejected {
        recipient: String,
        status: u16,
        body: String,
    },
    #[error("mail transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Mail delivery abstraction used by the worker.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Deliver a message or report why it could not be delivered.
    async fn send(&self, email: &NotificationEmail) -> Result<(), DeliveryError>;
}

/// Local dev sender that logs the message instead of sending real email.
#[derive(Clone, Debug, Default)]
pub struct LogMailSender;

#[async_trait]
impl MailSender for LogMailSender {
    async fn send(&self, email: &NotificationEmail) -> Result<(), DeliveryError> {
        info!(
            recipient = %email.recipient,
            subject = %email.subject,
            body = %email.body,
            "mail send stub"
        );
        Ok(())
    }
}

/// A message the worker gave up on, with the reason.
#[derive(Debug)]
pub struct DeliveryFailure {
    pub email: NotificationEmail,
    pub error: DeliveryError,
}

/// Producer half of the mail queue; cheap to clone.
#[derive(Clone, Debug)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<NotificationEmail>,
}

impl Notifier {
    /// Queue `email` for delivery without waiting for it.
    ///
    /// # Errors
    /// Returns [`DeliveryError::QueueClosed`] if the worker is gone.
    pub fn dispatch(&self, email: NotificationEmail) -> Result<(), DeliveryError> {
        self.tx.send(email).map_err(|_| DeliveryError::QueueClosed)
    }
}

/// Spawn the delivery worker and return the notifier feeding it.
///
/// The worker exits once every [`Notifier`] clone has been dropped and the
/// queue is drained.
pub fn spawn_mail_worker(
    sender: Arc<dyn MailSender>,
    failures: Option<mpsc::UnboundedSender<DeliveryFailure>>,
) -> (Notifier, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<NotificationEmail>();

    let handle = tokio::spawn(async move {
        while let Some(email) = rx.recv().await {
            let span = info_span!("mail.send", recipient = %email.recipient);
            match sender.send(&email).instrument(span).await {
                Ok(()) => debug!(recipient = %email.recipient, "mail delivered"),
                Err(err) => {
                    error!(recipient = %email.recipient, "mail delivery failed: {err}");
                    if let Some(failures) = &failures {
                        let _ = failures.send(DeliveryFailure { email, error: err });
                    }
                }
            }
        }
        debug!("mail worker stopped");
    });

    (Notifier { tx }, handle)
}
