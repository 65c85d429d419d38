//! # DID / Key Resolution
//!
//! Thin wrapper over [`credibil_did`]'s resolver, matching a JWS header's
//! `kid` (stripping a `did#` fragment) against a DID Document's
//! verification methods. Resolution may be cached (§5); the cache is a
//! simple process-wide, lock-guarded map, safe to share across concurrent
//! `validate()` calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use credibil_did::{DidResolver, PublicKeyJwk, Resource};

use crate::error::Error;
use crate::unavailable;

/// Process-wide cache of resolved verification keys, keyed by the full
/// `kid` DID URL. Append-only; no eviction is mandated by the spec.
#[derive(Clone, Default)]
pub struct KeyCache(Arc<Mutex<HashMap<String, PublicKeyJwk>>>);

impl KeyCache {
    /// An empty, enabled cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, kid: &str) -> Option<PublicKeyJwk> {
        self.0.lock().expect("key cache lock poisoned").get(kid).cloned()
    }

    fn put(&self, kid: &str, key: PublicKeyJwk) {
        self.0.lock().expect("key cache lock poisoned").insert(kid.to_string(), key);
    }
}

/// Resolve the verification key identified by `kid` (a DID URL, optionally
/// carrying a `#fragment`) using the supplied resolver, going through
/// `cache` first when provided.
///
/// # Errors
///
/// Returns `Error::Unavailable` if DID resolution fails, or
/// `Error::Rejected` if the DID Document has no matching verification
/// method.
pub async fn resolve_verification_key(
    kid: &str, resolver: &(impl DidResolver + Clone), cache: Option<&KeyCache>,
) -> Result<PublicKeyJwk, Error> {
    if let Some(cache) = cache {
        if let Some(key) = cache.get(kid) {
            return Ok(key);
        }
    }

    let resp = credibil_did::dereference(kid, None, resolver.clone())
        .await
        .map_err(|e| unavailable!("issue dereferencing DID {kid}: {e}"))?;
    let Some(Resource::VerificationMethod(vm)) = resp.content_stream else {
        return Err(crate::rejected!("verification method not found for {kid}"));
    };
    let key = vm
        .method_type
        .jwk()
        .map_err(|e| crate::rejected!("JWK not found for {kid}: {e}"))?
        .clone();

    if let Some(cache) = cache {
        cache.put(kid, key.clone());
    }
    Ok(key)
}
