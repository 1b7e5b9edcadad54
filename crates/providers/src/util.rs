//! Completion-service credentials and reqwest error mapping.

use pl_domain::config::AuthConfig;
use pl_domain::error::{Error, Result};

pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Where a completion-service key was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// `auth.key` in the config file.
    Inline,
    /// OS credential store entry `auth.service` / `auth.account`.
    Keychain,
    /// The variable named by `auth.env`.
    Env,
    /// `{SERVICE}_{ACCOUNT}` for hosts without a credential store.
    KeychainEnv,
}

/// Resolve the completion-service key. Sources are tried in
/// [`KeySource`] declaration order except that a keychain miss falls
/// through to `auth.env` before the keychain env variable is consulted.
pub fn resolve_api_key(auth: &AuthConfig) -> Result<String> {
    let (key, source) = locate_key(auth)?;
    match source {
        KeySource::Inline => {
            tracing::warn!("completion key read from config file; prefer auth.env or the keychain")
        }
        other => tracing::debug!(source = ?other, "completion key resolved"),
    }
    Ok(key)
}

fn locate_key(auth: &AuthConfig) -> Result<(String, KeySource)> {
    if let Some(key) = auth.key.as_deref() {
        return Ok((key.to_string(), KeySource::Inline));
    }

    let entry = auth.service.as_deref().zip(auth.account.as_deref());
    if let Some((service, account)) = entry {
        match read_keychain(service, account) {
            Ok(key) => return Ok((key, KeySource::Keychain)),
            Err(e) => tracing::warn!(service, account, error = %e, "keychain lookup failed"),
        }
    }

    if let Some(var) = auth.env.as_deref() {
        return std::env::var(var)
            .map(|key| (key, KeySource::Env))
            .map_err(|_| Error::Auth(format!("env var {var} is not set")));
    }

    if let Some((service, account)) = entry {
        let var = keychain_env_name(service, account);
        if let Ok(key) = std::env::var(&var) {
            return Ok((key, KeySource::KeychainEnv));
        }
    }

    Err(Error::Auth(
        "no completion key: set auth.key, auth.env or auth.service + auth.account".into(),
    ))
}

fn read_keychain(service: &str, account: &str) -> Result<String> {
    keyring::Entry::new(service, account)
        .and_then(|entry| entry.get_password())
        .map_err(|e| Error::Auth(format!("keychain {service}/{account}: {e}")))
}

/// `("parley", "gateway-key")` → `PARLEY_GATEWAY_KEY`.
pub fn keychain_env_name(service: &str, account: &str) -> String {
    format!("{service}_{account}").to_uppercase().replace('-', "_")
}
