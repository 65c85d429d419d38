//! # Status-Receipt Sub-Protocol
//!
//! Enabled by [`crate::builder::ValidatorBuilder::enable_status_check`].
//! For each verifiable presentation in the assembled result, every nested
//! VC exposing a `credentialStatus.id` is checked against its issuer's
//! status endpoint: sign a status-request envelope, POST it, validate the
//! signed receipt, and accumulate a [`StatusEntry`] per credential `jti`
//! (spec §4.8).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use base64ct::{Base64UrlUnpadded, Encoding};
use credibil_did::DidResolver;
use credibil_infosec::{Algorithm, Curve, KeyType, PublicKeyJwk, Signer};
use serde_json::{Value, json};

use crate::crypto::{self, ClaimChecks};
use crate::error::Error;
use crate::keys::KeyCache;
use crate::token::{self, ClaimToken};
use crate::types::{StatusEntry, ValidationResult};
use crate::{malformed, misconfigured, rejected, unavailable};

/// HTTP transport for the status sub-protocol, supplied by the caller (the
/// same out-of-scope-collaborator boundary as the DID resolver).
pub trait StatusClient: Send + Sync {
    /// POST `body` to `url`, returning the response body.
    ///
    /// # Errors
    ///
    /// Returns an error for any transport failure; a non-2xx response is
    /// the caller's responsibility to map into an `Err` here.
    fn post<'a>(&'a self, url: &'a str, body: String) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;
}

/// Run the status sub-protocol over every VP in `result`, returning a
/// per-`jti` status map, or the first failure encountered.
pub async fn check_all<R, S>(
    result: &ValidationResult, signer: &S, resolver: &R, cache: Option<&KeyCache>, client: &dyn StatusClient,
    timeout: Duration,
) -> Result<HashMap<String, StatusEntry>, Error>
where
    R: DidResolver + Clone + Send + Sync + 'static,
    S: Signer + Clone + Send + Sync + 'static,
{
    let mut statuses = HashMap::new();
    let Some(vps) = &result.verifiable_presentations else {
        return Ok(statuses);
    };

    let self_kid = signer.verification_method().await.map_err(|e| unavailable!("issue reading verifier's verification method: {e}"))?;
    let self_did = self_kid.split('#').next().unwrap_or(&self_kid).to_string();
    let self_jwk = signer_jwk(signer).await?;

    for vp in vps.values() {
        let credentials = vp
            .payload
            .get("vp")
            .and_then(|vp| vp.get("verifiableCredential"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for raw in &credentials {
            let Some(raw_token) = raw.as_str() else { continue };
            let vc = ClaimToken::from_raw(raw_token).map_err(|e| rejected!("status check: {e}"))?;
            let Some(status_url) =
                vc.payload.get("vc").and_then(|vc| vc.get("credentialStatus")).and_then(|cs| cs.get("id")).and_then(Value::as_str)
            else {
                continue;
            };

            let envelope = json!({
                "did": self_did,
                "kid": self_kid,
                "vp": vp.payload,
                "sub_jwk": self_jwk,
            });
            let envelope_map = envelope.as_object().expect("object literal").clone();
            let signed = sign_envelope(&envelope_map, signer).await?;

            let post = client.post(status_url, signed);
            let response_body = match tokio::time::timeout(timeout, post).await {
                Ok(Ok(body)) => body,
                Ok(Err(_)) | Err(_) => {
                    return Err(unavailable!("status check could not fetch response from {status_url}"));
                }
            };

            let receipt = ClaimToken::from_raw(response_body.trim()).map_err(|e| rejected!("status receipt: {e}"))?;
            let issuer_did = vc.iss().ok_or_else(|| malformed!("verifiableCredential has no 'iss' claim"))?.to_string();

            crypto::verify_resolved(&receipt, resolver, cache).await?;
            let checks = ClaimChecks {
                expected_audience: Some(self_did.as_str()),
                expected_issuer: Some(issuer_did.as_str()),
                ..ClaimChecks::default()
            };
            crypto::check_standard_claims(&receipt.payload, &checks)?;

            for (jti, child) in token::children_from_receipt(&receipt.payload)? {
                crypto::verify_resolved(&child, resolver, cache).await?;
                statuses.insert(
                    jti,
                    StatusEntry {
                        valid: child.payload.get("valid").and_then(Value::as_bool).unwrap_or(true),
                        detail: child.payload.get("detail").and_then(Value::as_str).map(str::to_string),
                    },
                );
            }
        }
    }

    Ok(statuses)
}

async fn signer_jwk<S: Signer>(signer: &S) -> Result<PublicKeyJwk, Error> {
    if !matches!(signer.algorithm(), Algorithm::EdDSA) {
        return Err(misconfigured!("status envelope signing only supports EdDSA keys"));
    }
    let raw = signer.verifying_key().await.map_err(|e| unavailable!("issue reading verifier's signing key: {e}"))?;
    Ok(PublicKeyJwk { kty: KeyType::Okp, crv: Curve::Ed25519, x: Base64UrlUnpadded::encode_string(&raw), ..PublicKeyJwk::default() })
}

async fn sign_envelope<S: Signer>(envelope: &serde_json::Map<String, Value>, signer: &S) -> Result<String, Error> {
    let header = json!({"alg": "EdDSA"});
    let header_b64 = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&header).map_err(|e| malformed!("issue encoding header: {e}"))?);
    let payload_b64 =
        Base64UrlUnpadded::encode_string(&serde_json::to_vec(envelope).map_err(|e| malformed!("issue encoding envelope: {e}"))?);
    let signing_input = format!("{header_b64}.{payload_b64}");
    let signature = signer.try_sign(signing_input.as_bytes()).await.map_err(|e| unavailable!("issue signing status envelope: {e}"))?;
    let signature_b64 = Base64UrlUnpadded::encode_string(&signature);
    Ok(format!("{signing_input}.{signature_b64}"))
}
