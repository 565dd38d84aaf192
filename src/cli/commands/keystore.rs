use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_KEYSTORE_PATH: &str = "keystore-path";
pub const ARG_KEYSTORE_PASSWORD: &str = "keystore-password";
pub const ARG_KEY_ALIAS: &str = "key-alias";
pub const ARG_KEY_PASSWORD: &str = "key-password";
pub const ARG_SIGNING_KEY_PATH: &str = "signing-key-path";

/// Where the session token signing key comes from.
#[derive(Debug, Clone)]
pub enum KeySource {
    Keystore {
        path: String,
        store_password: SecretString,
        key_password: SecretString,
    },
    /// Unencrypted PEM file, for local development.
    Pem { path: String },
}

#[derive(Debug, Clone)]
pub struct Options {
    pub alias: String,
    pub source: KeySource,
}

impl Options {
    /// Parse key material arguments from matches.
    ///
    /// # Errors
    /// Returns an error if neither a keystore nor a PEM file is configured, or
    /// the keystore passwords are missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let alias = get_non_empty(ARG_KEY_ALIAS).unwrap_or_else(|| "swades".to_string());

        let source = if let Some(path) = get_non_empty(ARG_KEYSTORE_PATH) {
            let Some(store_password) = get_non_empty(ARG_KEYSTORE_PASSWORD) else {
                anyhow::bail!("missing required argument: --{ARG_KEYSTORE_PASSWORD}");
            };
            let Some(key_password) = get_non_empty(ARG_KEY_PASSWORD) else {
                anyhow::bail!("missing required argument: --{ARG_KEY_PASSWORD}");
            };
            KeySource::Keystore {
                path,
                store_password: SecretString::from(store_password),
                key_password: SecretString::from(key_password),
            }
        } else if let Some(path) = get_non_empty(ARG_SIGNING_KEY_PATH) {
            KeySource::Pem { path }
        } else {
            anyhow::bail!(
                "missing required argument: --{ARG_KEYSTORE_PATH} (or --{ARG_SIGNING_KEY_PATH})"
            );
        };

        Ok(Self { alias, source })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_KEYSTORE_PATH)
                .long(ARG_KEYSTORE_PATH)
                .help("Path to the JSON keystore holding the token signing key")
                .env("SWADES_KEYSTORE_PATH")
                .conflicts_with(ARG_SIGNING_KEY_PATH),
        )
        .arg(
            Arg::new(ARG_KEYSTORE_PASSWORD)
                .long(ARG_KEYSTORE_PASSWORD)
                .help("Keystore password (checks keystore integrity)")
                .env("SWADES_KEYSTORE_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_KEY_ALIAS)
                .long(ARG_KEY_ALIAS)
                .help("Alias of the signing key inside the keystore, also used as the token kid")
                .env("SWADES_KEY_ALIAS")
                .default_value("swades"),
        )
        .arg(
            Arg::new(ARG_KEY_PASSWORD)
                .long(ARG_KEY_PASSWORD)
                .help("Password protecting the signing key entry")
                .env("SWADES_KEY_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_SIGNING_KEY_PATH)
                .long(ARG_SIGNING_KEY_PATH)
                .help("Unencrypted PEM signing key, instead of a keystore (development only)")
                .env("SWADES_SIGNING_KEY_PATH"),
        )
}
