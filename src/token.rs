//! # `ClaimToken`
//!
//! Parses a compact JWS, classifies it by payload shape, and — for the
//! token types that nest children — extracts those children so the
//! orchestrator can enqueue them.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_json_path::JsonPath;

use crate::error::Error;
use crate::types::TokenType;
use crate::{malformed, rejected};

pub(crate) const SIOP_ISSUER: &str = "https://self-issued.me";

/// A single decoded token, immutable once constructed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClaimToken {
    /// The classified type of this token.
    #[serde(rename = "type")]
    pub type_: TokenType,

    /// The original compact JWS (empty for tokens synthesized from an
    /// already-decoded payload, e.g. the `selfIssued` attestation).
    pub raw_token: String,

    /// The decoded JWS header, or empty for unsigned tokens.
    pub header: Map<String, Value>,

    /// The decoded JWS payload.
    pub payload: Map<String, Value>,

    /// An OIDC discovery URL carried by some id-tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration_url: Option<String>,
}

impl ClaimToken {
    /// Decode and classify a raw compact-JWS string.
    ///
    /// # Errors
    ///
    /// Returns `Error::Malformed` if the token cannot be split, decoded or
    /// parsed as JSON, or if its payload shape does not match any known
    /// [`TokenType`].
    pub fn from_raw(raw: &str) -> Result<Self, Error> {
        let segments: Vec<&str> = raw.split('.').collect();
        if segments.len() < 2 {
            return Err(malformed!("token does not have at least 2 segments: {raw}"));
        }

        let header = decode_segment(segments[0])?;
        let payload = decode_segment(segments[1])?;
        let signed = segments.len() == 3 && !segments[2].is_empty();
        let type_ = classify(&payload, signed)?;

        Ok(Self {
            type_,
            raw_token: raw.to_string(),
            header,
            payload,
            configuration_url: None,
        })
    }

    /// Construct a token directly from an already-decoded payload, with no
    /// signature segment. Used for the `selfIssued` attestation sub-object,
    /// which is embedded as a JSON object rather than a JWS string.
    #[must_use]
    pub fn from_payload(type_: TokenType, payload: Map<String, Value>) -> Self {
        Self { type_, raw_token: String::new(), header: Map::new(), payload, configuration_url: None }
    }

    /// `true` if this token carries a (non-empty) signature segment.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        matches!(self.raw_token.split('.').collect::<Vec<_>>().as_slice(), [_, _, sig] if !sig.is_empty())
    }

    /// The `header.payload` signing input and raw signature bytes, decoded
    /// from base64url. Used by [`crate::crypto`] to verify the signature.
    ///
    /// # Errors
    ///
    /// Returns `Error::Malformed` if the token has no signature segment or
    /// the segment is not valid base64url.
    pub fn signing_input_and_signature(&self) -> Result<(String, Vec<u8>), Error> {
        let segments: Vec<&str> = self.raw_token.split('.').collect();
        let [header, payload, sig] = segments.as_slice() else {
            return Err(malformed!("token has no signature segment"));
        };
        let sig_bytes = Base64UrlUnpadded::decode_vec(sig)
            .map_err(|e| malformed!("issue decoding signature: {e}"))?;
        Ok((format!("{header}.{payload}"), sig_bytes))
    }

    /// The `kid` claim from the JWS header, if present.
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        self.header.get("kid").and_then(Value::as_str)
    }

    fn str_claim(&self, name: &str) -> Option<&str> {
        self.payload.get(name).and_then(Value::as_str)
    }

    /// The `iss` claim.
    #[must_use]
    pub fn iss(&self) -> Option<&str> {
        self.str_claim("iss")
    }

    /// The `jti` claim.
    #[must_use]
    pub fn jti(&self) -> Option<&str> {
        self.str_claim("jti")
    }
}

/// Classify a decoded payload by shape, per spec §4.1's dispatch order.
fn classify(payload: &Map<String, Value>, signed: bool) -> Result<TokenType, Error> {
    if payload.get("iss").and_then(Value::as_str) == Some(SIOP_ISSUER) {
        if payload.contains_key("contract") {
            return Ok(TokenType::SiopIssuance);
        }
        if payload.contains_key("presentation_submission") {
            return Ok(TokenType::SiopPresentationExchange);
        }
        if payload.contains_key("attestations") {
            return Ok(TokenType::SiopPresentationAttestation);
        }
        return Err(rejected!("SIOP was not recognized."));
    }
    if payload.contains_key("vc") {
        return Ok(TokenType::VerifiableCredential);
    }
    if payload.contains_key("vp") {
        return Ok(TokenType::VerifiablePresentation);
    }
    if payload.contains_key("receipt") {
        return Ok(TokenType::VerifiablePresentationStatus);
    }
    if signed {
        return Ok(TokenType::IdToken);
    }
    Ok(TokenType::SelfIssued)
}

fn decode_segment(segment: &str) -> Result<Map<String, Value>, Error> {
    let bytes = Base64UrlUnpadded::decode_vec(segment)
        .map_err(|e| malformed!("issue decoding token segment: {e}"))?;
    let value: Value =
        serde_json::from_slice(&bytes).map_err(|e| malformed!("issue parsing token segment: {e}"))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(malformed!("token segment is not a JSON object")),
    }
}

/// A child token discovered during fan-out, paired with the id it should be
/// enqueued under.
pub type Child = (String, ClaimToken);

/// Reserved key, within an `attestations` object, for the inline self-issued
/// claim bundle (never itself a JWS).
const SELF_ISSUED_KEY: &str = "selfIssued";

/// Reserved key, within an `attestations` object, for nested id-tokens. Its
/// sub-keys are the OIDC discovery URL for each id-token, not an arbitrary
/// id (spec's attestations shape, §6).
const ID_TOKENS_KEY: &str = "idTokens";

/// Extract children from a SIOP-presentation-attestation payload's
/// `attestations` object (spec §4.1 "From attestations object").
///
/// # Errors
///
/// Returns `Error::Rejected` if any nested raw token fails to classify.
pub fn children_from_attestations(payload: &Map<String, Value>) -> Result<Vec<Child>, Error> {
    let Some(Value::Object(attestations)) = payload.get("attestations") else {
        return Ok(Vec::new());
    };

    let mut children = Vec::new();
    for (outer_key, value) in attestations {
        if outer_key == SELF_ISSUED_KEY {
            let Value::Object(claims) = value else {
                return Err(rejected!("selfIssued attestation is not an object"));
            };
            children.push((
                SELF_ISSUED_KEY.to_string(),
                ClaimToken::from_payload(TokenType::SelfIssued, claims.clone()),
            ));
            continue;
        }

        let Value::Object(sub_tokens) = value else {
            return Err(rejected!("attestation '{outer_key}' is not a map of tokens"));
        };
        for (sub_key, raw) in sub_tokens {
            let Some(raw_token) = raw.as_str() else {
                return Err(rejected!("attestation '{outer_key}.{sub_key}' is not a string token"));
            };
            let mut token = ClaimToken::from_raw(raw_token)
                .map_err(|e| rejected!("attestation '{outer_key}.{sub_key}': {e}"))?;
            if outer_key == ID_TOKENS_KEY {
                token.configuration_url = Some(sub_key.clone());
            }
            children.push((sub_key.clone(), token));
        }
    }
    Ok(children)
}

/// Extract children from a SIOP-presentation-exchange payload's
/// `presentation_submission.descriptor_map` (spec §4.1 "From
/// presentation-exchange payload").
///
/// # Errors
///
/// Returns `Error::Rejected` naming the offending descriptor id and
/// whether its `path` was missing, matched nothing, or matched more than
/// one node.
pub fn children_from_descriptor_map(payload: &Map<String, Value>) -> Result<Vec<Child>, Error> {
    let full = Value::Object(payload.clone());
    let Some(descriptors) = payload
        .get("presentation_submission")
        .and_then(|ps| ps.get("descriptor_map"))
        .and_then(Value::as_array)
    else {
        return Ok(Vec::new());
    };

    let mut children = Vec::new();
    for descriptor in descriptors {
        let Some(id) = descriptor.get("id").and_then(Value::as_str) else {
            return Err(rejected!("descriptor map entry has no 'id' property."));
        };
        let Some(path) = descriptor.get("path").and_then(Value::as_str) else {
            return Err(rejected!("Descriptor '{id}': No path property found."));
        };

        let jpath = JsonPath::parse(path)
            .map_err(|e| rejected!("Descriptor '{id}': invalid JSONPath '{path}': {e}"))?;
        let nodes = jpath.query(&full).all();
        let raw_token = match nodes.len() {
            0 => {
                return Err(rejected!(
                    "Descriptor '{id}' path '{path}' did not return any token."
                ));
            }
            1 => nodes[0].as_str().ok_or_else(|| {
                rejected!("Descriptor '{id}' path '{path}' did not return a string token.")
            })?,
            n => {
                return Err(rejected!(
                    "Descriptor '{id}' path '{path}' did not return a single token (found {n})."
                ));
            }
        };

        let token =
            ClaimToken::from_raw(raw_token).map_err(|e| rejected!("descriptor '{id}': {e}"))?;
        children.push((id.to_string(), token));
    }
    Ok(children)
}

/// Extract children from a status-receipt payload's `receipt` map (spec
/// §4.1 "From status receipt").
///
/// # Errors
///
/// Returns `Error::Rejected` if any nested raw token fails to classify.
pub fn children_from_receipt(payload: &Map<String, Value>) -> Result<Vec<Child>, Error> {
    let Some(Value::Object(receipt)) = payload.get("receipt") else {
        return Ok(Vec::new());
    };

    let mut children = Vec::new();
    for (id, raw) in receipt {
        let Some(raw_token) = raw.as_str() else {
            return Err(rejected!("receipt entry '{id}' is not a string token"));
        };
        let token =
            ClaimToken::from_raw(raw_token).map_err(|e| rejected!("receipt entry '{id}': {e}"))?;
        children.push((id.clone(), token));
    }
    Ok(children)
}
