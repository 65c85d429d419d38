//! # Orchestrator
//!
//! Drives the [`ValidationQueue`] to completion: classify each dequeued
//! item, dispatch it to the registered [`TokenValidator`], track the DID
//! and contract established by the outer SIOP, and — once the queue
//! drains — assemble the final [`ValidationResult`] and run the
//! status-receipt sub-protocol if enabled (spec §4.7).

use std::collections::HashMap;

use credibil_did::DidResolver;
use credibil_infosec::Signer;
use serde_json::Value;
use tracing::instrument;

use crate::keys::KeyCache;
use crate::queue::ValidationQueue;
use crate::status::{self, StatusClient};
use crate::token::ClaimToken;
use crate::types::{Expected, TokenType, ValidationResponse, ValidationResult};
use crate::validators::{TokenValidator, ValidatorContext};
use crate::{misconfigured, rejected, unavailable};

/// An assembled, immutable validation engine (spec §6's `Validator`). Built
/// once via [`crate::builder::ValidatorBuilder::build`] and reused across
/// calls to [`Validator::validate`].
pub struct Validator<R, S>
where
    R: DidResolver + Clone + Send + Sync + 'static,
    S: Signer + Clone + Send + Sync + 'static,
{
    pub(crate) resolver: R,
    pub(crate) signer: Option<S>,
    pub(crate) cache: Option<KeyCache>,
    pub(crate) validators: HashMap<TokenType, Box<dyn TokenValidator<R>>>,
    pub(crate) trusted_issuers: HashMap<String, std::collections::HashSet<String>>,
    pub(crate) clock_skew: chrono::Duration,
    pub(crate) http_timeout: std::time::Duration,
    pub(crate) status_check_enabled: bool,
    pub(crate) status_client: Option<Box<dyn StatusClient>>,
}

impl<R, S> Validator<R, S>
where
    R: DidResolver + Clone + Send + Sync + 'static,
    S: Signer + Clone + Send + Sync + 'static,
{
    /// Validate a raw SIOP response token end to end, per spec §4.7.
    /// Never panics or returns early on a recoverable condition: every
    /// outcome, success or failure, is reported through the returned
    /// [`ValidationResponse`].
    #[instrument(level = "debug", skip(self, raw, expected))]
    pub async fn validate(&self, raw: &str, expected: &Expected) -> ValidationResponse {
        match self.run(raw, expected).await {
            Ok(result) => ValidationResponse {
                result: true,
                status: 200,
                payload_object: serde_json::to_value(&result).ok(),
                ..ValidationResponse::default()
            },
            Err(failure) => failure,
        }
    }

    async fn run(&self, raw: &str, expected: &Expected) -> Result<ValidationResult, ValidationResponse> {
        let expected = self.effective_expected(expected);
        let expected = &expected;

        let mut queue = ValidationQueue::new();
        queue.enqueue_token("siop", raw.to_string());

        let mut context_did: Option<String> = None;
        let mut context_contract_id: Option<String> = None;
        let mut seen_siop = false;

        while let Some(index) = queue.next_index() {
            if queue.item(index).claim_token.is_none() {
                let raw_token = queue.item(index).token_to_validate.clone();
                match ClaimToken::from_raw(&raw_token) {
                    Ok(classified) => queue.item_mut(index).claim_token = Some(classified),
                    Err(err) => return Err(ValidationResponse::from(err)),
                }
            }
            let token_type = queue.item(index).claim_token.as_ref().expect("just classified").type_;

            if token_type.is_siop() {
                if seen_siop {
                    return Err(ValidationResponse::from(rejected!(
                        "multiple SIOP tokens in a single response are not supported"
                    )));
                }
                seen_siop = true;
            }

            let Some(validator) = self.validators.get(&token_type) else {
                return Err(ValidationResponse::from(misconfigured!(
                    "{} does not has a TokenValidator",
                    token_type.wire_name()
                )));
            };

            let ctx = ValidatorContext {
                resolver: &self.resolver,
                cache: self.cache.as_ref(),
                expected,
                clock_skew: self.clock_skew,
            };
            let validate_call =
                validator.validate(&ctx, &mut queue, index, context_did.as_deref(), context_contract_id.as_deref());
            let response = match tokio::time::timeout(self.http_timeout, validate_call).await {
                Ok(response) => response,
                Err(_) => ValidationResponse::from(unavailable!("timed out validating token '{}'", queue.item(index).id)),
            };

            if token_type.is_siop() && response.result {
                context_did.clone_from(&response.did);
                context_contract_id = response
                    .payload_object
                    .as_ref()
                    .and_then(|payload| payload.get("contract"))
                    .and_then(Value::as_str)
                    .map(read_contract_id);
            }

            let failed = !response.result;
            let validated = queue.item(index).claim_token.clone().expect("just classified");
            queue.set_result(index, response, validated);
            if failed {
                break;
            }
        }

        let aggregate = queue.aggregate();
        if !aggregate.result {
            return Err(aggregate);
        }

        let mut result = assemble(&queue);

        if self.status_check_enabled {
            let client = self
                .status_client
                .as_deref()
                .ok_or_else(|| ValidationResponse::from(misconfigured!("status check enabled with no status client configured")))?;
            let signer = self
                .signer
                .as_ref()
                .ok_or_else(|| ValidationResponse::from(misconfigured!("status check enabled with no signer configured")))?;
            let statuses = status::check_all(&result, signer, &self.resolver, self.cache.as_ref(), client, self.http_timeout)
                .await
                .map_err(ValidationResponse::from)?;
            result.verifiable_presentation_status = Some(statuses);
        }

        Ok(result)
    }

    /// Merge the builder's configured trusted-issuer map (spec §6) under
    /// the caller-supplied `expected.did_issuers`, so a caller may still
    /// override or add contract entries per call without having to repeat
    /// the full trust set every time.
    fn effective_expected(&self, expected: &Expected) -> Expected {
        if self.trusted_issuers.is_empty() {
            return expected.clone();
        }
        let mut merged = self.trusted_issuers.clone();
        for (contract_id, dids) in &expected.did_issuers {
            merged.entry(contract_id.clone()).or_default().extend(dids.iter().cloned());
        }
        Expected { did_issuers: merged, ..expected.clone() }
    }
}

/// `URL-parse, take last non-empty path segment, URL-decode it` (spec §4.7).
fn read_contract_id(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit('/').find(|segment| !segment.is_empty()).unwrap_or(trimmed);
    urlencoding::decode(last).map(std::borrow::Cow::into_owned).unwrap_or_else(|_| last.to_string())
}

/// Scan the drained queue and group children by type into the final result
/// (spec §4.7 `assemble`).
fn assemble(queue: &ValidationQueue) -> ValidationResult {
    let mut result = ValidationResult::default();
    let mut id_tokens = HashMap::new();
    let mut verifiable_credentials = HashMap::new();
    let mut verifiable_presentations = HashMap::new();

    for item in queue.items() {
        let Some(token) = &item.validated_token else { continue };
        match token.type_ {
            TokenType::SiopIssuance | TokenType::SiopPresentationAttestation | TokenType::SiopPresentationExchange => {
                result.did = item.validation_response.as_ref().and_then(|response| response.did.clone());
                result.contract = token.payload.get("contract").and_then(Value::as_str).map(str::to_string);
                result.siop_jti = token.jti().map(str::to_string);
                result.siop = Some(token.clone());
            }
            TokenType::IdToken => {
                id_tokens.insert(item.id.clone(), token.clone());
            }
            TokenType::VerifiableCredential => {
                if result.did.is_none() {
                    result.did = token.payload.get("aud").and_then(Value::as_str).map(str::to_string);
                }
                verifiable_credentials.insert(item.id.clone(), token.clone());
            }
            TokenType::VerifiablePresentation => {
                verifiable_presentations.insert(item.id.clone(), token.clone());
            }
            TokenType::SelfIssued => {
                result.self_issued = Some(token.clone());
            }
            TokenType::VerifiablePresentationStatus => {}
        }
    }

    if !id_tokens.is_empty() {
        result.id_tokens = Some(id_tokens);
    }
    if !verifiable_credentials.is_empty() {
        result.verifiable_credentials = Some(verifiable_credentials);
    }
    if !verifiable_presentations.is_empty() {
        result.verifiable_presentations = Some(verifiable_presentations);
    }
    result
}
