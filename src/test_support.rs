//! In-crate test fakes: an Ed25519 keypair bound to a `did:key` document,
//! usable as both [`DidResolver`] and signing source, so validator unit
//! tests can exercise real sign/verify round trips without a network.

use base64ct::{Base64UrlUnpadded, Encoding};
use credibil_did::document::{CreateOptions, Document};
use credibil_did::{DidKey, DidOperator, DidResolver, KeyPurpose};
use credibil_infosec::{Algorithm, Curve, KeyType, PublicKeyJwk, Signer};
use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use rand_core::OsRng;
use serde_json::{Map, Value};

/// A single-key `did:key` identity, generated fresh for each test.
#[derive(Clone)]
pub(crate) struct TestKeyring {
    did: String,
    document: Option<Document>,
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl TestKeyring {
    pub(crate) fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();

        let mut keyring =
            Self { did: String::new(), document: None, signing_key, verifying_key };

        let document = DidKey::create(&keyring, CreateOptions::default()).expect("did:key document");
        keyring.did = document.id.clone();
        keyring.document = Some(document);
        keyring
    }

    pub(crate) fn did(&self) -> &str {
        &self.did
    }

    pub(crate) fn kid(&self) -> String {
        let document = self.document.as_ref().expect("document generated");
        document.verification_method.as_ref().expect("verification methods")[0].id.clone()
    }

    pub(crate) fn public_jwk(&self) -> PublicKeyJwk {
        PublicKeyJwk {
            kty: KeyType::Okp,
            crv: Curve::Ed25519,
            x: Base64UrlUnpadded::encode_string(self.verifying_key.as_bytes()),
            ..PublicKeyJwk::default()
        }
    }

    fn sign(&self, msg: &str) -> Vec<u8> {
        self.signing_key.sign(msg.as_bytes()).to_bytes().to_vec()
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

/// Sign `payload` under `header` (merged with `alg`/`kid`) as a compact JWS.
pub(crate) fn sign_compact(keyring: &TestKeyring, header: &Map<String, Value>, payload: &Map<String, Value>) -> String {
    let mut header = header.clone();
    header.insert("alg".to_string(), Value::String("EdDSA".to_string()));
    header.insert("kid".to_string(), Value::String(keyring.kid()));

    let header_b64 = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&header).unwrap());
    let payload_b64 = Base64UrlUnpadded::encode_string(&serde_json::to_vec(payload).unwrap());
    let signing_input = format!("{header_b64}.{payload_b64}");
    let signature = Base64UrlUnpadded::encode_string(&keyring.sign(&signing_input));
    format!("{signing_input}.{signature}")
}

/// Sign `payload` with no `kid` header, for tokens verified via an inline
/// `sub_jwk` (the SIOP envelope) instead of DID resolution.
pub(crate) fn sign_compact_detached(keyring: &TestKeyring, payload: &Map<String, Value>) -> String {
    let header = serde_json::json!({"alg": "EdDSA"});
    let header_b64 = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&header).unwrap());
    let payload_b64 = Base64UrlUnpadded::encode_string(&serde_json::to_vec(payload).unwrap());
    let signing_input = format!("{header_b64}.{payload_b64}");
    let signature = Base64UrlUnpadded::encode_string(&keyring.sign(&signing_input));
    format!("{signing_input}.{signature}")
}
