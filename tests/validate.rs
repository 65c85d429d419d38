//! End-to-end scenarios from spec §8, driven through the public
//! `ValidatorBuilder`/`Validator` surface rather than individual
//! validators.

mod common;

use std::collections::HashSet;
use std::pin::Pin;

use common::{Registry, TestKeyring, sign_compact, sign_compact_detached};
use serde_json::json;
use siop_verifier::{Expected, StatusClient, TokenType, ValidatorBuilder};

fn exp() -> i64 {
    chrono::Utc::now().timestamp() + 3600
}

const AUDIENCE: &str = "https://verifier.example";

/// Returns the precomputed status receipt handed to it, ignoring the
/// signed request envelope — stands in for the real status endpoint.
struct FixtureStatusClient {
    receipt: String,
}

impl StatusClient for FixtureStatusClient {
    fn post<'a>(
        &'a self, _url: &'a str, _body: String,
    ) -> Pin<Box<dyn std::future::Future<Output = anyhow::Result<String>> + Send + 'a>> {
        let receipt = self.receipt.clone();
        Box::pin(async move { Ok(receipt) })
    }
}

/// The builder's trusted-issuer map is keyed by the decoded contract id
/// (the last path segment of the SIOP's `contract` URL, per
/// `read_contract_id`), not the URL itself.
const CONTRACT_URL: &str = "https://issuer.example/contracts/Test";
const CONTRACT_ID: &str = "Test";

/// Scenario 1: happy SIOP carrying both a `contract` (establishing the
/// trust context for the nested VC) and an `attestations` object (fanning
/// out an id-token, a self-issued claim bundle, and a VP nesting one VC).
#[tokio::test]
async fn happy_siop_with_id_token_self_issued_and_vp_vc() {
    let holder = TestKeyring::generate();
    let issuer_key = TestKeyring::generate();
    let id_issuer = TestKeyring::generate();
    let registry =
        Registry::new().register(&holder).register(&issuer_key).register(&id_issuer);

    let vc_raw = sign_compact(
        &issuer_key,
        &json!({
            "iss": issuer_key.did(),
            "aud": holder.did(),
            "vc": {"credentialSubject": {"givenName": "Jules"}},
            "exp": exp(),
        }),
    );
    let vp_raw = sign_compact(
        &holder,
        &json!({
            "iss": holder.did(),
            "aud": AUDIENCE,
            "vp": {"verifiableCredential": [vc_raw]},
            "exp": exp(),
        }),
    );
    let id_token_raw = sign_compact(
        &id_issuer,
        &json!({"iss": "https://idp.example", "aud": AUDIENCE, "sub": "user-1", "exp": exp()}),
    );

    let siop_raw = sign_compact_detached(
        &holder,
        &json!({
            "iss": "https://self-issued.me",
            "aud": AUDIENCE,
            "did": holder.did(),
            "sub_jwk": holder.public_jwk(),
            "contract": CONTRACT_URL,
            "attestations": {
                "selfIssued": {"name": "jules"},
                "idTokens": {"https://idp.example/.well-known/openid-configuration": id_token_raw},
                "presentations": {"VerifiablePresentation": vp_raw},
            },
            "exp": exp(),
        }),
    );

    let validator = ValidatorBuilder::<Registry, TestKeyring>::new()
        .resolver(registry)
        .with_default_validators()
        .trust_issuers(CONTRACT_ID, [issuer_key.did().to_string()])
        .build()
        .unwrap();
    let expected = Expected { audience: AUDIENCE.to_string(), ..Expected::default() };

    let resp = validator.validate(&siop_raw, &expected).await;
    assert!(resp.result, "{:?}", resp.detailed_error);
    assert_eq!(resp.status, 200);

    let payload = resp.payload_object.expect("assembled result");
    assert_eq!(payload["did"], json!(holder.did()));
    assert_eq!(payload["contract"], json!(CONTRACT_URL));
    assert_eq!(payload["self_issued"]["payload"]["name"], json!("jules"));
    assert!(payload["id_tokens"].as_object().unwrap().values().next().is_some());
    let vcs = &payload["verifiable_credentials"];
    let vc = vcs.as_object().unwrap().values().next().unwrap();
    assert_eq!(vc["payload"]["vc"]["credentialSubject"]["givenName"], json!("Jules"));
}

/// Scenario 2: PE-style SIOP with `presentation_submission` removed falls
/// back through the attestation/issuance checks and is rejected.
#[tokio::test]
async fn missing_presentation_submission_is_unrecognised() {
    let holder = TestKeyring::generate();
    let siop_raw = sign_compact_detached(
        &holder,
        &json!({
            "iss": "https://self-issued.me",
            "aud": AUDIENCE,
            "did": holder.did(),
            "sub_jwk": holder.public_jwk(),
            "exp": exp(),
        }),
    );

    let validator = ValidatorBuilder::<Registry, TestKeyring>::new()
        .resolver(Registry::new().register(&holder))
        .with_default_validators()
        .build()
        .unwrap();
    let expected = Expected { audience: AUDIENCE.to_string(), ..Expected::default() };

    let resp = validator.validate(&siop_raw, &expected).await;
    assert!(!resp.result);
    assert_eq!(resp.detailed_error.as_deref(), Some("SIOP was not recognized."));
}

/// Scenario 3: a descriptor whose `path` resolves to nothing names the
/// descriptor id and says so.
#[tokio::test]
async fn descriptor_with_unresolved_path_names_descriptor() {
    let holder = TestKeyring::generate();
    let siop_raw = sign_compact_detached(
        &holder,
        &json!({
            "iss": "https://self-issued.me",
            "aud": AUDIENCE,
            "did": holder.did(),
            "sub_jwk": holder.public_jwk(),
            "presentation_submission": {
                "descriptor_map": [{"id": "VerifiablePresentation", "path": "$.tokens.presentations"}]
            },
            "exp": exp(),
        }),
    );

    let validator = ValidatorBuilder::<Registry, TestKeyring>::new()
        .resolver(Registry::new().register(&holder))
        .with_default_validators()
        .build()
        .unwrap();
    let expected = Expected { audience: AUDIENCE.to_string(), ..Expected::default() };

    let resp = validator.validate(&siop_raw, &expected).await;
    assert!(!resp.result);
    let detail = resp.detailed_error.unwrap();
    assert!(detail.contains("VerifiablePresentation"));
    assert!(detail.contains("did not return"));
}

/// Scenario 4: a descriptor-map entry with no `path` property fails with a
/// message ending in the exact wording.
#[tokio::test]
async fn descriptor_missing_path_property() {
    let holder = TestKeyring::generate();
    let siop_raw = sign_compact_detached(
        &holder,
        &json!({
            "iss": "https://self-issued.me",
            "aud": AUDIENCE,
            "did": holder.did(),
            "sub_jwk": holder.public_jwk(),
            "presentation_submission": {
                "descriptor_map": [{"id": "VerifiablePresentation"}]
            },
            "exp": exp(),
        }),
    );

    let validator = ValidatorBuilder::<Registry, TestKeyring>::new()
        .resolver(Registry::new().register(&holder))
        .with_default_validators()
        .build()
        .unwrap();
    let expected = Expected { audience: AUDIENCE.to_string(), ..Expected::default() };

    let resp = validator.validate(&siop_raw, &expected).await;
    assert!(!resp.result);
    assert!(resp.detailed_error.unwrap().ends_with("No path property found."));
}

/// Scenario 5: a valid SIOP+id-token pair, but the caller only trusts an
/// unrelated issuer name.
#[tokio::test]
async fn wrong_id_token_issuer_fails_configuration_lookup() {
    let holder = TestKeyring::generate();
    let id_issuer = TestKeyring::generate();
    let registry = Registry::new().register(&holder).register(&id_issuer);
    let id_token_raw = sign_compact(
        &id_issuer,
        &json!({"iss": "https://idp.example", "aud": AUDIENCE, "sub": "user-1", "exp": exp()}),
    );
    let siop_raw = sign_compact_detached(
        &holder,
        &json!({
            "iss": "https://self-issued.me",
            "aud": AUDIENCE,
            "did": holder.did(),
            "sub_jwk": holder.public_jwk(),
            "attestations": {
                "idTokens": {"https://idp.example/.well-known/openid-configuration": id_token_raw},
            },
            "exp": exp(),
        }),
    );

    let validator = ValidatorBuilder::<Registry, TestKeyring>::new()
        .resolver(registry)
        .with_default_validators()
        .build()
        .unwrap();
    let expected = Expected {
        audience: AUDIENCE.to_string(),
        issuers: HashSet::from(["xxx".to_string()]),
        ..Expected::default()
    };

    let resp = validator.validate(&siop_raw, &expected).await;
    assert!(!resp.result);
    assert_eq!(resp.detailed_error.as_deref(), Some("Could not fetch token configuration"));
}

/// Scenario 6: a SIOP whose carried `did` claim diverges from the actual
/// holder DID that signed the nested VP (the signature itself is valid,
/// since it verifies against the SIOP's own `sub_jwk`).
#[tokio::test]
async fn vp_holder_did_mismatch_names_both_dids() {
    let holder = TestKeyring::generate();
    let vp_raw = sign_compact(
        &holder,
        &json!({"iss": holder.did(), "aud": AUDIENCE, "vp": {"verifiableCredential": []}, "exp": exp()}),
    );
    let siop_raw = sign_compact_detached(
        &holder,
        &json!({
            "iss": "https://self-issued.me",
            "aud": AUDIENCE,
            "did": "abcdef",
            "sub_jwk": holder.public_jwk(),
            "attestations": {"presentations": {"VerifiablePresentation": vp_raw}},
            "exp": exp(),
        }),
    );

    let validator = ValidatorBuilder::<Registry, TestKeyring>::new()
        .resolver(Registry::new().register(&holder))
        .with_default_validators()
        .build()
        .unwrap();
    let expected = Expected { audience: AUDIENCE.to_string(), ..Expected::default() };

    let resp = validator.validate(&siop_raw, &expected).await;
    assert!(!resp.result);
    assert_eq!(
        resp.detailed_error.as_deref(),
        Some(format!(
            "The DID used for the SIOP abcdef is not equal to the DID used for the verifiable presentation {}",
            holder.did()
        ))
        .as_deref()
    );
}

/// Scenario 7: a VP nests a VC, but the registry has no validator for
/// `verifiableCredential`.
#[tokio::test]
async fn missing_vc_validator_is_misconfigured() {
    let holder = TestKeyring::generate();
    let issuer_key = TestKeyring::generate();
    let registry = Registry::new().register(&holder).register(&issuer_key);
    let vc_raw = sign_compact(
        &issuer_key,
        &json!({"iss": issuer_key.did(), "aud": holder.did(), "vc": {}, "exp": exp()}),
    );
    let vp_raw = sign_compact(
        &holder,
        &json!({"iss": holder.did(), "aud": AUDIENCE, "vp": {"verifiableCredential": [vc_raw]}, "exp": exp()}),
    );
    let siop_raw = sign_compact_detached(
        &holder,
        &json!({
            "iss": "https://self-issued.me",
            "aud": AUDIENCE,
            "did": holder.did(),
            "sub_jwk": holder.public_jwk(),
            "attestations": {"presentations": {"VerifiablePresentation": vp_raw}},
            "exp": exp(),
        }),
    );

    let validator = ValidatorBuilder::<Registry, TestKeyring>::new()
        .resolver(registry)
        .validator(TokenType::SiopIssuance, Box::new(siop_verifier::SiopValidator))
        .validator(TokenType::SiopPresentationAttestation, Box::new(siop_verifier::SiopValidator))
        .validator(TokenType::SiopPresentationExchange, Box::new(siop_verifier::SiopValidator))
        .validator(TokenType::VerifiablePresentation, Box::new(siop_verifier::VpValidator))
        .build()
        .unwrap();
    let expected = Expected { audience: AUDIENCE.to_string(), ..Expected::default() };

    let resp = validator.validate(&siop_raw, &expected).await;
    assert!(!resp.result);
    assert_eq!(resp.status, 500);
    assert_eq!(resp.detailed_error.as_deref(), Some("verifiableCredential does not has a TokenValidator"));
}

/// Scenario 8: the credential-status sub-protocol (spec §4.8) is enabled,
/// so the assembled result carries a status entry fetched from the
/// configured `StatusClient` for the one credential exposing
/// `credentialStatus.id`.
#[tokio::test]
async fn status_check_reports_credential_validity() {
    let holder = TestKeyring::generate();
    let issuer_key = TestKeyring::generate();
    let verifier_signer = TestKeyring::generate();
    let registry = Registry::new().register(&holder).register(&issuer_key);

    let vc_raw = sign_compact(
        &issuer_key,
        &json!({
            "iss": issuer_key.did(),
            "aud": holder.did(),
            "vc": {"credentialStatus": {"id": "https://status.example/check"}},
            "exp": exp(),
        }),
    );
    let vp_raw = sign_compact(
        &holder,
        &json!({"iss": holder.did(), "aud": AUDIENCE, "vp": {"verifiableCredential": [vc_raw]}, "exp": exp()}),
    );
    let siop_raw = sign_compact_detached(
        &holder,
        &json!({
            "iss": "https://self-issued.me",
            "aud": AUDIENCE,
            "did": holder.did(),
            "sub_jwk": holder.public_jwk(),
            "contract": CONTRACT_URL,
            "attestations": {"presentations": {"VerifiablePresentation": vp_raw}},
            "exp": exp(),
        }),
    );

    let child_raw = sign_compact(&issuer_key, &json!({"valid": true}));
    let receipt_raw = sign_compact(
        &issuer_key,
        &json!({
            "iss": issuer_key.did(),
            "aud": verifier_signer.did(),
            "exp": exp(),
            "receipt": {"vc-1": child_raw},
        }),
    );

    let validator = ValidatorBuilder::<Registry, TestKeyring>::new()
        .resolver(registry)
        .signer(verifier_signer)
        .with_default_validators()
        .trust_issuers(CONTRACT_ID, [issuer_key.did().to_string()])
        .enable_status_check(Box::new(FixtureStatusClient { receipt: receipt_raw }))
        .build()
        .unwrap();
    let expected = Expected { audience: AUDIENCE.to_string(), ..Expected::default() };

    let resp = validator.validate(&siop_raw, &expected).await;
    assert!(resp.result, "{:?}", resp.detailed_error);
    let payload = resp.payload_object.expect("assembled result");
    let status = &payload["verifiable_presentation_status"]["vc-1"];
    assert_eq!(status["valid"], json!(true));
}
