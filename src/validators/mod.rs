//! # Per-Type Validators
//!
//! One state machine per [`TokenType`](crate::types::TokenType):
//! `Parse -> ResolveKey -> VerifySignature -> CheckClaims -> CrossValidate ->
//! Finish`. Each validator is registered in a
//! [`Validator`](crate::orchestrator::Validator)'s registry, keyed by the
//! [`TokenType`] it handles.

pub mod id_token;
pub mod self_issued;
pub mod siop;
pub mod vc;
pub mod vp;

use std::future::Future;
use std::pin::Pin;

use credibil_did::DidResolver;

use crate::keys::KeyCache;
use crate::queue::ValidationQueue;
use crate::types::{Expected, TokenType, ValidationResponse};

/// The boxed future a [`TokenValidator`] returns, since the registry holds
/// validators behind `Box<dyn TokenValidator<R>>` and trait objects cannot
/// return `impl Future` directly.
pub type ValidateFuture<'a> = Pin<Box<dyn Future<Output = ValidationResponse> + Send + 'a>>;

/// Read-only context shared by every validator invocation: the DID resolver,
/// its key cache, and the caller's expectations for this run (spec §3
/// `Expected`).
pub struct ValidatorContext<'a, R> {
    /// External DID resolver collaborator.
    pub resolver: &'a R,

    /// Process-wide verification-key cache, if enabled.
    pub cache: Option<&'a KeyCache>,

    /// Caller-supplied expectations (audience, nonce, state, trusted
    /// issuers, OIDC configuration, per-contract trusted DIDs).
    pub expected: &'a Expected,

    /// Tolerance applied to `exp` checks.
    pub clock_skew: chrono::Duration,
}

/// A single token-type's validation state machine.
///
/// `subject_did` and `contract_id` carry context established by an
/// already-validated outer SIOP (spec §4.7's `contextDid`/
/// `contextContractId`); they are `None` while validating the SIOP itself.
pub trait TokenValidator<R>: Send + Sync
where
    R: DidResolver + Clone + Send + Sync + 'static,
{
    /// The token type this validator handles.
    const IS_TYPE: TokenType
    where
        Self: Sized;

    /// Run this validator's state machine against the queue item at
    /// `index` (see [`ValidationQueue::next_index`]), mutating the queue in
    /// place to append any children discovered along the way.
    fn validate<'a>(
        &'a self, ctx: &'a ValidatorContext<'a, R>, queue: &'a mut ValidationQueue, index: usize,
        subject_did: Option<&'a str>, contract_id: Option<&'a str>,
    ) -> ValidateFuture<'a>;
}
