//! # Verifiable-Presentation Validator
//!
//! Verifies a W3C Verifiable Presentation nested inside a SIOP (spec §4.5):
//! signature against the holder DID, DID continuity against the SIOP's
//! established DID, audience, then fans out each nested
//! `vp.verifiableCredential[i]` as a new VC queue item.

use credibil_did::DidResolver;
use serde_json::Value;

use super::{TokenValidator, ValidateFuture, ValidatorContext};
use crate::crypto::{self, ClaimChecks};
use crate::error::Error;
use crate::queue::ValidationQueue;
use crate::token::ClaimToken;
use crate::types::{TokenType, ValidationResponse};
use crate::{malformed, rejected};

/// Validates `verifiablePresentation` tokens.
#[derive(Clone, Copy, Debug, Default)]
pub struct VpValidator;

impl<R> TokenValidator<R> for VpValidator
where
    R: DidResolver + Clone + Send + Sync + 'static,
{
    const IS_TYPE: TokenType = TokenType::VerifiablePresentation;

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
    _contract_id: Option<&str>,
) -> Result<ValidationResponse, Error>
where
    R: DidResolver + Clone + Send + Sync + 'static,
{
    let token = queue
        .item(index)
        .claim_token
        .clone()
        .ok_or_else(|| malformed!("verifiablePresentation queue item has no classified token"))?;

    let iss = token.iss().ok_or_else(|| malformed!("verifiablePresentation has no 'iss' claim"))?;
    crypto::verify_resolved(&token, ctx.resolver, ctx.cache).await?;

    if let Some(subject_did) = subject_did {
        if subject_did != iss {
            return Err(rejected!(
                "The DID used for the SIOP {subject_did} is not equal to the DID used for the verifiable presentation {iss}"
            ));
        }
    }

    let checks = ClaimChecks {
        expected_audience: Some(ctx.expected.audience.as_str()),
        clock_skew: ctx.clock_skew,
        ..ClaimChecks::default()
    };
    crypto::check_standard_claims(&token.payload, &checks)?;

    let credentials = token
        .payload
        .get("vp")
        .and_then(|vp| vp.get("verifiableCredential"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    for (i, raw) in credentials.iter().enumerate() {
        let raw_token =
            raw.as_str().ok_or_else(|| rejected!("vp.verifiableCredential[{i}] is not a string token"))?;
        let child = ClaimToken::from_raw(raw_token)
            .map_err(|e| rejected!("vp.verifiableCredential[{i}]: {e}"))?;
        let id = if i == 0 { "VerifiableCredential".to_string() } else { format!("VerifiableCredential{i}") };
        queue.enqueue_item(id, child);
    }

    Ok(ValidationResponse {
        result: true,
        status: 200,
        payload_object: Some(Value::Object(token.payload.clone())),
        did: Some(iss.to_string()),
        ..ValidationResponse::default()
    })
}
