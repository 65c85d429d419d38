//! Shared fixtures for the integration tests in this directory: an
//! Ed25519 `did:key` identity usable as both `DidResolver` and `Signer`,
//! plus compact-JWS signing helpers. Integration tests run as a separate
//! crate from `siop_verifier`'s own unit tests, so this duplicates (rather
//! than reuses) `src/test_support.rs`.

use base64ct::{Base64UrlUnpadded, Encoding};
use credibil_did::document::{CreateOptions, Document};
use credibil_did::{DidKey, DidOperator, DidResolver, KeyPurpose};
use credibil_infosec::{Algorithm, Curve, KeyType, PublicKeyJwk, Signer};
use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use rand_core::OsRng;
use serde_json::{Map, Value};

#[derive(Clone)]
pub struct TestKeyring {
    did: String,
    document: Option<Document>,
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl TestKeyring {
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        let mut keyring = Self { did: String::new(), document: None, signing_key, verifying_key };
        let document = DidKey::create(&keyring, CreateOptions::default()).expect("did:key document");
        keyring.did = document.id.clone();
        keyring.document = Some(document);
        keyring
    }

    pub fn did(&self) -> &str {
        &self.did
    }

    pub fn kid(&self) -> String {
        let document = self.document.as_ref().expect("document generated");
        document.verification_method.as_ref().expect("verification methods")[0].id.clone()
    }

    pub fn public_jwk(&self) -> PublicKeyJwk {
        PublicKeyJwk {
            kty: KeyType::Okp,
            crv: Curve::Ed25519,
            x: Base64UrlUnpadded::encode_string(self.verifying_key.as_bytes()),
            ..PublicKeyJwk::default()
        }
    }
}

impl DidOperator for TestKeyring {
    fn verification(&self, purpose: KeyPurpose) -> Option<PublicKeyJwk> {
        match purpose {
            KeyPurpose::VerificationMethod => Some(self.public_jwk()),
            _ => None,
        }
    }
}

impl DidResolver for TestKeyring {
    async fn resolve(&self, _url: &str) -> anyhow::Result<Document> {
        self.document.clone().ok_or_else(|| anyhow::anyhow!("document not generated"))
    }
}

/// A resolver backing multiple independent `did:key` identities, keyed by
/// DID. A single [`TestKeyring`] can only resolve itself; scenarios
/// involving more than one signer (e.g. a SIOP holder plus a separate
/// credential issuer) need this instead.
#[derive(Clone, Default)]
pub struct Registry(std::collections::HashMap<String, Document>);

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn register(mut self, keyring: &TestKeyring) -> Self {
        self.0.insert(keyring.did.clone(), keyring.document.clone().expect("document generated"));
        self
    }
}

impl DidResolver for Registry {
    async fn resolve(&self, url: &str) -> anyhow::Result<Document> {
        let did = url.split('#').next().unwrap_or(url);
        self.0.get(did).cloned().ok_or_else(|| anyhow::anyhow!("no registered document for {did}"))
    }
}

impl Signer for TestKeyring {
    async fn try_sign(&self, msg: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(self.signing_key.sign(msg).to_bytes().to_vec())
    }

    async fn verifying_key(&self) -> anyhow::Result<Vec<u8>> {
        Ok(self.verifying_key.as_bytes().to_vec())
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::EdDSA
    }

    async fn verification_method(&self) -> anyhow::Result<String> {
        Ok(self.kid())
    }
}

/// Sign `payload` as a compact JWS, resolvable via `keyring.kid()`.
pub fn sign_compact(keyring: &TestKeyring, payload: &Value) -> String {
    sign_compact_with_header(keyring, &serde_json::json!({"kid": keyring.kid()}), payload)
}

/// Sign `payload` with no `kid` header, for tokens (like the SIOP envelope)
/// verified via an inline `sub_jwk` instead of DID resolution.
pub fn sign_compact_detached(keyring: &TestKeyring, payload: &Value) -> String {
    sign_compact_with_header(keyring, &serde_json::json!({}), payload)
}

fn sign_compact_with_header(keyring: &TestKeyring, header: &Value, payload: &Value) -> String {
    let mut header: Map<String, Value> = header.as_object().unwrap().clone();
    header.insert("alg".to_string(), Value::String("EdDSA".to_string()));
    let header_b64 = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&header).unwrap());
    let payload_b64 = Base64UrlUnpadded::encode_string(&serde_json::to_vec(payload).unwrap());
    let signing_input = format!("{header_b64}.{payload_b64}");
    let signature = keyring.signing_key.sign(signing_input.as_bytes());
    let sig_b64 = Base64UrlUnpadded::encode_string(&signature.to_bytes());
    format!("{signing_input}.{sig_b64}")
}
