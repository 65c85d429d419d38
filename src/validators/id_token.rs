//! # ID-Token Validator
//!
//! Validates a standard OpenID Connect id-token nested inside a SIOP
//! attestation (spec §4.5). Discovery/JWKS fetch is modeled through the
//! same [`credibil_did::DidResolver`] collaborator used elsewhere (no
//! separate HTTP-based OIDC discovery client is in scope, see `DESIGN.md`);
//! the caller's `configuration` map is consulted only to decide whether an
//! issuer is recognized at all.

use credibil_did::DidResolver;
use serde_json::Value;

use super::{TokenValidator, ValidateFuture, ValidatorContext};
use crate::crypto::{self, ClaimChecks};
use crate::error::Error;
use crate::malformed;
use crate::queue::ValidationQueue;
use crate::types::{TokenType, ValidationResponse};

/// Validates `idToken` tokens.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdTokenValidator;

impl<R> TokenValidator<R> for IdTokenValidator
where
    R: DidResolver + Clone + Send + Sync + 'static,
{
    const IS_TYPE: TokenType = TokenType::IdToken;

    fn validate<'a>(
        &'a self, ctx: &'a ValidatorContext<'a, R>, queue: &'a mut ValidationQueue, index: usize,
        _subject_did: Option<&'a str>, _contract_id: Option<&'a str>,
    ) -> ValidateFuture<'a> {
        Box::pin(async move {
            match run(ctx, queue, index).await {
                Ok(resp) => resp,
                Err(err) => ValidationResponse::from(err),
            }
        })
    }
}

async fn run<R>(
    ctx: &ValidatorContext<'_, R>, queue: &mut ValidationQueue, index: usize,
) -> Result<ValidationResponse, Error>
where
    R: DidResolver + Clone + Send + Sync + 'static,
{
    let token = queue
        .item(index)
        .claim_token
        .clone()
        .ok_or_else(|| malformed!("id-token queue item has no classified token"))?;

    let iss = token.iss().ok_or_else(|| malformed!("id-token has no 'iss' claim"))?;
    if !ctx.expected.issuers.is_empty() && !ctx.expected.issuers.contains(iss) {
        return Err(crate::rejected!("Could not fetch token configuration"));
    }

    crypto::verify_resolved(&token, ctx.resolver, ctx.cache).await?;

    let checks = ClaimChecks {
        expected_audience: Some(ctx.expected.audience.as_str()),
        clock_skew: ctx.clock_skew,
        ..ClaimChecks::default()
    };
    crypto::check_standard_claims(&token.payload, &checks)?;

    Ok(ValidationResponse {
        result: true,
        status: 200,
        payload_object: Some(Value::Object(token.payload.clone())),
        ..ValidationResponse::default()
    })
}
