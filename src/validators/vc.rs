//! # Verifiable-Credential Validator
//!
//! Verifies a W3C Verifiable Credential nested inside a VP (spec §4.5):
//! signature against the issuer DID, audience against the established SIOP
//! DID, and issuer trust against the per-contract trusted-issuer set.

use credibil_did::DidResolver;
use serde_json::Value;

use super::{TokenValidator, ValidateFuture, ValidatorContext};
use crate::crypto::{self, ClaimChecks};
use crate::error::Error;
use crate::queue::ValidationQueue;
use crate::types::{TokenType, ValidationResponse};
use crate::{malformed, misconfigured, rejected};

/// Validates `verifiableCredential` tokens.
#[derive(Clone, Copy, Debug, Default)]
pub struct VcValidator;

impl<R> TokenValidator<R> for VcValidator
where
    R: DidResolver + Clone + Send + Sync + 'static,
{
    const IS_TYPE: TokenType = TokenType::VerifiableCredential;

    fn validate<'a>(
        &'a self, ctx: &'a ValidatorContext<'a, R>, queue: &'a mut ValidationQueue, index: usize,
        subject_did: Option<&'a str>, contract_id: Option<&'a str>,
    ) -> ValidateFuture<'a> {
        Box::pin(async move {
            match run(ctx, queue, index, subject_did, contract_id).await {
                Ok(resp) => resp,
                Err(err) => ValidationResponse::from(err),
            }
        })
    }
}

async fn run<R>(
    ctx: &ValidatorContext<'_, R>, queue: &mut ValidationQueue, index: usize, subject_did: Option<&str>,
    contract_id: Option<&str>,
) -> Result<ValidationResponse, Error>
where
    R: DidResolver + Clone + Send + Sync + 'static,
{
    let token = queue
        .item(index)
        .claim_token
        .clone()
        .ok_or_else(|| malformed!("verifiableCredential queue item has no classified token"))?;

    let iss = token.iss().ok_or_else(|| malformed!("verifiableCredential has no 'iss' claim"))?;
    crypto::verify_resolved(&token, ctx.resolver, ctx.cache).await?;

    let subject_did =
        subject_did.ok_or_else(|| misconfigured!("verifiableCredential validated with no established SIOP DID"))?;
    let checks = ClaimChecks {
        expected_audience: Some(subject_did),
        clock_skew: ctx.clock_skew,
        ..ClaimChecks::default()
    };
    crypto::check_standard_claims(&token.payload, &checks)?;

    let contract_id =
        contract_id.ok_or_else(|| misconfigured!("verifiableCredential validated with no established contract"))?;
    let trusted = ctx.expected.did_issuers.get(contract_id);
    if !trusted.is_some_and(|set| set.contains(iss)) {
        return Err(rejected!("issuer DID '{iss}' is not a trusted issuer for contract '{contract_id}'"));
    }

    Ok(ValidationResponse {
        result: true,
        status: 200,
        payload_object: Some(Value::Object(token.payload.clone())),
        ..ValidationResponse::default()
    })
}
