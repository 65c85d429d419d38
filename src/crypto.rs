//! # Signature & Standard-Claim Primitives
//!
//! Low-level sign/verify math and JWK/JWS wire encoding belong to
//! [`credibil_infosec`] (the external crypto provider, spec §1); this
//! module wraps it with the two checks every validator needs: verifying a
//! token's signature against a resolved or directly-supplied key, and
//! checking the standard `exp`/`nbf`/`aud`/`iss` claims (spec §4.4).

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use credibil_did::{DidResolver, PublicKeyJwk};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::keys::{self, KeyCache};
use crate::token::ClaimToken;
use crate::{malformed, rejected};

/// Default tolerance for `exp` clock skew (spec §9 Open Questions).
pub const DEFAULT_CLOCK_SKEW: chrono::Duration = chrono::Duration::minutes(5);

/// Verify `token`'s signature against a directly-supplied public key (used
/// for a SIOP's self-carried `sub_jwk`).
///
/// # Errors
///
/// Returns `Error::Rejected` if the signature does not verify, or
/// `Error::Malformed` if the token has no signature segment.
pub fn verify_detached(token: &ClaimToken, key: &PublicKeyJwk) -> Result<(), Error> {
    let (signing_input, signature) = token.signing_input_and_signature()?;
    key.verify(&signing_input, &signature).map_err(|e| rejected!("signature verification failed: {e}"))
}

/// Verify `token`'s signature against a key resolved from its issuer DID
/// via `resolver`, using the `kid` header claim (spec §4.3).
///
/// # Errors
///
/// Returns `Error::Malformed` if `kid` is missing, `Error::Unavailable` if
/// DID resolution fails, or `Error::Rejected` if the signature does not
/// verify.
pub async fn verify_resolved(
    token: &ClaimToken, resolver: &(impl DidResolver + Clone), cache: Option<&KeyCache>,
) -> Result<(), Error> {
    let kid = token.kid().ok_or_else(|| malformed!("token header has no 'kid'"))?;
    let key = keys::resolve_verification_key(kid, resolver, cache).await?;
    verify_detached(token, &key)
}

/// Checked standard claims (spec §4.4). All fields are independent checks;
/// callers select which to run for a given token type.
#[derive(Clone, Debug, Default)]
pub struct ClaimChecks<'a> {
    /// The audience the token must be addressed to (string or array member).
    pub expected_audience: Option<&'a str>,

    /// The issuer the token must carry, directly or via `configuration`.
    pub expected_issuer: Option<&'a str>,

    /// Issuer name -> configuration URL map, consulted when `expected_issuer`
    /// does not directly match `iss`.
    pub configuration: Option<&'a HashMap<String, String>>,

    /// Tolerance applied to `exp`.
    pub clock_skew: chrono::Duration,
}

/// `exp` present and in the future (within `clock_skew`); `nbf` absent or
/// in the past; `aud` matches; `iss` matches directly or via
/// `configuration`.
///
/// # Errors
///
/// Returns `Error::Rejected` naming the specific claim that failed.
pub fn check_standard_claims(payload: &Map<String, Value>, checks: &ClaimChecks<'_>) -> Result<(), Error> {
    check_exp(payload, checks.clock_skew)?;
    check_nbf(payload)?;
    if let Some(aud) = checks.expected_audience {
        check_aud(payload, aud)?;
    }
    if let Some(iss) = checks.expected_issuer {
        check_iss(payload, iss, checks.configuration)?;
    }
    Ok(())
}

fn check_exp(payload: &Map<String, Value>, skew: chrono::Duration) -> Result<(), Error> {
    let Some(exp) = payload.get("exp").and_then(Value::as_i64) else {
        return Err(rejected!("token has no 'exp' claim"));
    };
    let expires = Utc.timestamp_opt(exp, 0).single().ok_or_else(|| rejected!("invalid 'exp' claim"))?;
    if expires + skew < Utc::now() {
        return Err(rejected!("token expired at {expires}"));
    }
    Ok(())
}

fn check_nbf(payload: &Map<String, Value>) -> Result<(), Error> {
    let Some(nbf) = payload.get("nbf").and_then(Value::as_i64) else {
        return Ok(());
    };
    let not_before = Utc.timestamp_opt(nbf, 0).single().ok_or_else(|| rejected!("invalid 'nbf' claim"))?;
    if not_before > Utc::now() {
        return Err(rejected!("token not valid until {not_before}"));
    }
    Ok(())
}

fn check_aud(payload: &Map<String, Value>, expected: &str) -> Result<(), Error> {
    match payload.get("aud") {
        Some(Value::String(aud)) if aud == expected => Ok(()),
        Some(Value::Array(auds)) if auds.iter().any(|a| a.as_str() == Some(expected)) => Ok(()),
        other => Err(rejected!("'aud' claim {other:?} does not match expected audience {expected}")),
    }
}

fn check_iss(
    payload: &Map<String, Value>, expected: &str, configuration: Option<&HashMap<String, String>>,
) -> Result<(), Error> {
    let Some(iss) = payload.get("iss").and_then(Value::as_str) else {
        return Err(rejected!("token has no 'iss' claim"));
    };
    if iss == expected {
        return Ok(());
    }
    if let Some(configuration) = configuration {
        if configuration.get(expected).is_some_and(|url| url == iss || url.contains(iss)) {
            return Ok(());
        }
    }
    Err(rejected!("'iss' claim {iss} does not match expected issuer {expected}"))
}
