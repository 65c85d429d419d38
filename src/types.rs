//! # Core Data Model
//!
//! Shared types used across the queue, validators, and orchestrator. Token
//! headers and payloads are kept as opaque JSON (`serde_json::Map`) rather
//! than typed structs so the presentation-exchange descriptor-map logic can
//! run `JSONPath` queries against them unchanged (see [`crate::token`]).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::token::ClaimToken;

/// The shape of a token's payload, discriminated by the presence of
/// specific claims (see [`crate::token::classify`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
    /// An unsigned bundle of self-asserted claims nested inside a SIOP.
    #[serde(rename = "selfIssued")]
    SelfIssued,

    /// A standard OpenID Connect ID Token.
    #[serde(rename = "idToken")]
    IdToken,

    /// A SIOP response carrying a `contract` claim (issuance flavour).
    #[serde(rename = "siopIssuance")]
    SiopIssuance,

    /// A SIOP response carrying an `attestations` claim.
    #[serde(rename = "siopPresentationAttestation")]
    SiopPresentationAttestation,

    /// A SIOP response carrying a `presentation_submission` claim.
    #[serde(rename = "siopPresentationExchange")]
    SiopPresentationExchange,

    /// A W3C Verifiable Presentation (payload carries a `vp` claim).
    #[serde(rename = "verifiablePresentation")]
    VerifiablePresentation,

    /// A W3C Verifiable Credential (payload carries a `vc` claim).
    #[serde(rename = "verifiableCredential")]
    VerifiableCredential,

    /// A signed status-receipt envelope.
    #[serde(rename = "verifiablePresentationStatus")]
    VerifiablePresentationStatus,
}

impl TokenType {
    /// Alias kept for source compatibility: some call sites refer to a bare
    /// `siop` token type that was never a distinct variant upstream. It is
    /// treated as [`TokenType::SiopIssuance`] (see `DESIGN.md`).
    pub const SIOP: Self = Self::SiopIssuance;

    /// `true` for any of the three SIOP response flavours.
    #[must_use]
    pub const fn is_siop(self) -> bool {
        matches!(self, Self::SiopIssuance | Self::SiopPresentationAttestation | Self::SiopPresentationExchange)
    }

    /// The wire name used in error messages and serde tags (matches the
    /// `#[serde(rename = ...)]` on each variant).
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::SelfIssued => "selfIssued",
            Self::IdToken => "idToken",
            Self::SiopIssuance => "siopIssuance",
            Self::SiopPresentationAttestation => "siopPresentationAttestation",
            Self::SiopPresentationExchange => "siopPresentationExchange",
            Self::VerifiablePresentation => "verifiablePresentation",
            Self::VerifiableCredential => "verifiableCredential",
            Self::VerifiablePresentationStatus => "verifiablePresentationStatus",
        }
    }
}

/// The outcome of validating a single queue item.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationResponse {
    /// `true` iff this item (and, once aggregated, the whole run) passed.
    pub result: bool,

    /// HTTP-like status: 200 ok, 400 malformed, 403 rejected, 500 misconfig.
    pub status: u16,

    /// Human-readable failure detail, set whenever `result` is `false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_error: Option<String>,

    /// The decoded payload of the token that was validated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_object: Option<Value>,

    /// The DID established by this token, if any (set by the SIOP validator).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,

    /// Child tokens discovered while validating this item, keyed by the id
    /// they were enqueued under.
    #[serde(skip)]
    pub tokens_to_validate: Option<HashMap<String, ClaimToken>>,
}

impl ValidationResponse {
    /// A successful response carrying the decoded payload.
    #[must_use]
    pub fn ok(payload_object: Value) -> Self {
        Self { result: true, status: 200, payload_object: Some(payload_object), ..Self::default() }
    }

    /// Build a failed response from an [`Error`].
    #[must_use]
    pub fn failed(err: &Error) -> Self {
        Self { result: false, status: err.status(), detailed_error: Some(err.detail()), ..Self::default() }
    }
}

impl From<Error> for ValidationResponse {
    fn from(err: Error) -> Self {
        Self::failed(&err)
    }
}

/// Caller-supplied expectations a token must satisfy, common to every type.
#[derive(Clone, Debug, Default)]
pub struct Expected {
    /// The audience (`aud`) the token must be addressed to.
    pub audience: String,

    /// SIOP-only: expected `nonce` to be echoed back.
    pub nonce: Option<String>,

    /// SIOP-only: expected `state` to be echoed back.
    pub state: Option<String>,

    /// id-token-only: trusted issuer names.
    pub issuers: std::collections::HashSet<String>,

    /// id-token-only: issuer name -> OIDC discovery document URL.
    pub configuration: HashMap<String, String>,

    /// VC/VP-only: contract id -> trusted issuer DIDs.
    pub did_issuers: HashMap<String, std::collections::HashSet<String>>,

    /// VC/VP-only: the DID credentials/presentations must be addressed to.
    pub did_audience: Option<String>,
}

/// An entry in the merged credential-status report (§4.8).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusEntry {
    /// Whether the credential identified by this entry's `jti` is valid.
    pub valid: bool,

    /// The issuer-reported status detail, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// The final, assembled outcome of one `validate()` call.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    /// The DID established by the outermost SIOP.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,

    /// The contract id carried by the outermost SIOP.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,

    /// The `jti` of the outermost SIOP.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub siop_jti: Option<String>,

    /// Validated id-tokens, keyed by queue item id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_tokens: Option<HashMap<String, ClaimToken>>,

    /// Validated verifiable credentials, keyed by queue item id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifiable_credentials: Option<HashMap<String, ClaimToken>>,

    /// Validated verifiable presentations, keyed by queue item id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifiable_presentations: Option<HashMap<String, ClaimToken>>,

    /// The self-issued claim bundle, if one was present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_issued: Option<ClaimToken>,

    /// The validated outer SIOP token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub siop: Option<ClaimToken>,

    /// Credential status results, keyed by the credential's `jti` (only
    /// populated when status checking is enabled, §4.8).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifiable_presentation_status: Option<HashMap<String, StatusEntry>>,
}
