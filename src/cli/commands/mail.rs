use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use url::Url;

pub const ARG_MAIL_FROM: &str = "mail-from";
pub const ARG_MAIL_API_URL: &str = "mail-api-url";
pub const ARG_MAIL_API_KEY: &str = "mail-api-key";

pub const DEFAULT_MAIL_FROM: &str = "no-reply@swadessoaps.com";

#[derive(Debug, Clone)]
pub struct Options {
    pub from: String,
    /// Mail API endpoint and key; `None` logs mail instead of sending it.
    pub api: Option<(Url, SecretString)>,
}

impl Options {
    /// # Errors
    /// Returns an error if the API URL is invalid or given without a key.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let from = matches
            .get_one::<String>(ARG_MAIL_FROM)
            .cloned()
            .unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string());

        let url = matches
            .get_one::<String>(ARG_MAIL_API_URL)
            .filter(|v| !v.trim().is_empty());

        let api = match url {
            Some(url) => {
                let url = Url::parse(url).with_context(|| format!("invalid --{ARG_MAIL_API_URL}: {url}"))?;
                let key = matches
                    .get_one::<String>(ARG_MAIL_API_KEY)
                    .filter(|v| !v.trim().is_empty())
                    .cloned()
                    .with_context(|| format!("missing required argument: --{ARG_MAIL_API_KEY}"))?;
                Some((url, SecretString::from(key)))
            }
            None => None,
        };

        Ok(Self { from, api })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MAIL_FROM)
                .long(ARG_MAIL_FROM)
                .help("Sender address of the activation email")
                .env("SWADES_MAIL_FROM")
                .default_value(DEFAULT_MAIL_FROM),
        )
        .arg(
            Arg::new(ARG_MAIL_API_URL)
                .long(ARG_MAIL_API_URL)
                .help("Transactional mail API endpoint, example: https://api.brevo.com/v3/smtp/email")
                .long_help("Transactional mail API endpoint. When unset, activation emails are only logged.")
                .env("SWADES_MAIL_API_URL"),
        )
        .arg(
            Arg::new(ARG_MAIL_API_KEY)
                .long(ARG_MAIL_API_KEY)
                .help("API key sent in the api-key header")
                .env("SWADES_MAIL_API_KEY")
                .hide_env_values(true),
        )
}
