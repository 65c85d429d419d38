//! # Self-Issued Validator
//!
//! The `selfIssued` attestation carries no signature (spec §4.5): it is an
//! unsigned bundle of claims nested directly in the SIOP's `attestations`
//! object. Validation is structural only — the payload must be a non-empty
//! JSON object.

use credibil_did::DidResolver;
use serde_json::Value;

use super::{TokenValidator, ValidateFuture, ValidatorContext};
use crate::error::Error;
use crate::queue::ValidationQueue;
use crate::rejected;
use crate::types::{TokenType, ValidationResponse};

/// Validates `selfIssued` tokens.
#[derive(Clone, Copy, Debug, Default)]
pub struct SelfIssuedValidator;

impl<R> TokenValidator<R> for SelfIssuedValidator
where
    R: DidResolver + Clone + Send + Sync + 'static,
{
    const IS_TYPE: TokenType = TokenType::SelfIssued;

    fn validate<'a>(
        &'a self, _ctx: &'a ValidatorContext<'a, R>, queue: &'a mut ValidationQueue, index: usize,
        _subject_did: Option<&'a str>, _contract_id: Option<&'a str>,
    ) -> ValidateFuture<'a> {
        Box::pin(async move {
            match run(queue, index) {
                Ok(resp) => resp,
                Err(err) => ValidationResponse::from(err),
            }
        })
    }
}

fn run(queue: &mut ValidationQueue, index: usize) -> Result<ValidationResponse, Error> {
    let token = queue
        .item(index)
        .claim_token
        .clone()
        .ok_or_else(|| rejected!("selfIssued queue item has no classified token"))?;

    if token.payload.is_empty() {
        return Err(rejected!("selfIssued attestation has no claims"));
    }

    Ok(ValidationResponse {
        result: true,
        status: 200,
        payload_object: Some(Value::Object(token.payload.clone())),
        ..ValidationResponse::default()
    })
}
