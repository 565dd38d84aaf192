use super::{DeliveryError, MailSender, NotificationEmail};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::{fmt, time::Duration};
use tracing::{debug, instrument};
use url::Url;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailAddress<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody<'a> {
    sender: EmailAddress<'a>,
    to: Vec<EmailAddress<'a>>,
    subject: &'a str,
    text_content: &'a str,
}

/// Sends mail through a transactional mail HTTP API.
///
/// The message is posted as JSON (`sender`, `to`, `subject`, `textContent`)
/// with the key in an `api-key` header. Any non-2xx answer is a rejection.
#[derive(Clone)]
pub struct HttpMailSender {
    client: Client,
    url: Url,
    api_key: SecretString,
    from: String,
}

impl HttpMailSender {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: Url, api_key: SecretString, from: impl Into<String>) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url,
            api_key,
            from: from.into(),
        })
    }
}

impl fmt::Debug for HttpMailSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpMailSender")
            .field("url", &self.url.as_str())
            .field("api_key", &"***")
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MailSender for HttpMailSender {
    #[instrument(skip(self, email), fields(recipient = %email.recipient))]
    async fn send(&self, email: &NotificationEmail) -> Result<(), DeliveryError> {
        let body = SendEmailBody {
            sender: EmailAddress { email: &self.from },
            to: vec![EmailAddress {
                email: &email.recipient,
            }],
            subject: &email.subject,
            text_content: &email.body,
        };

        let response = self
            .client
            .post(self.url.clone())
            .header("api-key", self.api_key.expose_secret())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "mail accepted by provider");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Rejected {
            recipient: email.recipient.clone(),
            status: status.as_u16(),
            body,
        })
    }
}
