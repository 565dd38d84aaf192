//! Map parsed CLI arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, keystore, mail};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .filter(|dsn| !dsn.trim().is_empty());

    let key_opts = keystore::Options::parse(matches)?;
    let auth_opts = auth::Options::parse(matches)?;
    let mail_opts = mail::Options::parse(matches)?;

    let (mail_api_url, mail_api_key) = match mail_opts.api {
        Some((url, key)) => (Some(url), Some(key)),
        None => (None, None),
    };

    Ok(Action::Server(Args {
        port,
        dsn,
        key_alias: key_opts.alias,
        key_source: key_opts.source,
        activation_base_url: auth_opts.activation_base_url,
        jwt_ttl_seconds: auth_opts.jwt_ttl_seconds,
        verification_token_ttl_seconds: auth_opts.verification_token_ttl_seconds,
        mail_from: mail_opts.from,
        mail_api_url,
        mail_api_key,
    }))
}
