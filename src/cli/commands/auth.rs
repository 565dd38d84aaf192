use crate::auth::service::{
    DEFAULT_ACTIVATION_BASE_URL, DEFAULT_VERIFICATION_TOKEN_TTL_SECONDS,
    MAX_VERIFICATION_TOKEN_TTL_SECONDS,
};
use crate::token::DEFAULT_TOKEN_TTL_SECONDS;
use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use url::Url;

pub const ARG_ACTIVATION_BASE_URL: &str = "activation-base-url";
pub const ARG_JWT_TTL_SECONDS: &str = "jwt-ttl-seconds";
pub const ARG_VERIFICATION_TOKEN_TTL_SECONDS: &str = "verification-token-ttl-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    pub activation_base_url: String,
    pub jwt_ttl_seconds: i64,
    pub verification_token_ttl_seconds: i64,
}

impl Options {
    /// # Errors
    /// Returns an error if the activation base URL is not an absolute URL.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let activation_base_url = matches
            .get_one::<String>(ARG_ACTIVATION_BASE_URL)
            .cloned()
            .unwrap_or_else(|| DEFAULT_ACTIVATION_BASE_URL.to_string());
        Url::parse(&activation_base_url)
            .with_context(|| format!("invalid --{ARG_ACTIVATION_BASE_URL}: {activation_base_url}"))?;

        Ok(Self {
            activation_base_url,
            jwt_ttl_seconds: matches
                .get_one::<i64>(ARG_JWT_TTL_SECONDS)
                .copied()
                .unwrap_or(DEFAULT_TOKEN_TTL_SECONDS),
            verification_token_ttl_seconds: matches
                .get_one::<i64>(ARG_VERIFICATION_TOKEN_TTL_SECONDS)
                .copied()
                .unwrap_or(DEFAULT_VERIFICATION_TOKEN_TTL_SECONDS),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ACTIVATION_BASE_URL)
                .long(ARG_ACTIVATION_BASE_URL)
                .help("Base URL of the account activation link; the token is appended as the last path segment")
                .env("SWADES_ACTIVATION_BASE_URL")
                .default_value(DEFAULT_ACTIVATION_BASE_URL),
        )
        .arg(
            Arg::new(ARG_JWT_TTL_SECONDS)
                .long(ARG_JWT_TTL_SECONDS)
                .help("Session token lifetime in seconds")
                .env("SWADES_JWT_TTL_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_VERIFICATION_TOKEN_TTL_SECONDS)
                .long(ARG_VERIFICATION_TOKEN_TTL_SECONDS)
                .help("Verification token lifetime in seconds")
                .env("SWADES_VERIFICATION_TOKEN_TTL_SECONDS")
                .default_value("86400")
                .value_parser(
                    clap::value_parser!(i64).range(1..=MAX_VERIFICATION_TOKEN_TTL_SECONDS),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(args: &[&str]) -> Result<ArgMatches, clap::Error> {
        let mut argv = vec!["swades"];
        argv.extend_from_slice(args);
        with_args(Command::new("swades")).try_get_matches_from(argv)
    }

    #[test]
    fn defaults() {
        temp_env::with_vars(
            [
                ("SWADES_ACTIVATION_BASE_URL", None::<&str>),
                ("SWADES_JWT_TTL_SECONDS", None::<&str>),
                ("SWADES_VERIFICATION_TOKEN_TTL_SECONDS", None::<&str>),
            ],
            || {
                let options = Options::parse(&matches(&[]).unwrap()).unwrap();
                assert_eq!(
                    options.activation_base_url,
                    "http://localhost:8080/api/auth/accountVerification"
                );
                assert_eq!(options.jwt_ttl_seconds, 900);
                assert_eq!(options.verification_token_ttl_seconds, 86_400);
            },
        );
    }

    #[test]
    fn env_overrides() {
        temp_env::with_vars(
            [
                (
                    "SWADES_ACTIVATION_BASE_URL",
                    Some("https://swadessoaps.com/api/auth/accountVerification"),
                ),
                ("SWADES_JWT_TTL_SECONDS", Some("60")),
                ("SWADES_VERIFICATION_TOKEN_TTL_SECONDS", Some("3600")),
            ],
            || {
                let options = Options::parse(&matches(&[]).unwrap()).unwrap();
                assert_eq!(
                    options.activation_base_url,
                    "https://swadessoaps.com/api/auth/accountVerification"
                );
                assert_eq!(options.jwt_ttl_seconds, 60);
                assert_eq!(options.verification_token_ttl_seconds, 3600);
            },
        );
    }

    #[test]
    fn rejects_non_positive_ttl() {
        temp_env::with_var("SWADES_JWT_TTL_SECONDS", None::<&str>, || {
            assert!(matches(&["--jwt-ttl-seconds", "0"]).is_err());
            assert!(matches(&["--verification-token-ttl-seconds", "-5"]).is_err());
        });
    }

    #[test]
    fn verification_ttl_is_capped_at_one_year() {
        temp_env::with_var("SWADES_VERIFICATION_TOKEN_TTL_SECONDS", None::<&str>, || {
            assert!(matches(&["--verification-token-ttl-seconds", "9223372036854775807"]).is_err());
            assert!(matches(&["--verification-token-ttl-seconds", "31536001"]).is_err());

            let options =
                Options::parse(&matches(&["--verification-token-ttl-seconds", "31536000"]).unwrap())
                    .unwrap();
            assert_eq!(options.verification_token_ttl_seconds, 31_536_000);
        });
    }

    #[test]
    fn rejects_relative_activation_url() {
        let matches = matches(&["--activation-base-url", "/api/auth/accountVerification"]).unwrap();
        assert!(Options::parse(&matches).is_err());
    }
}
