//! A recursive token-validation engine for a Self-Issued OpenID Provider
//! (SIOP) verifiable-credentials verifier.
//!
//! Given a single signed SIOP response token received from an end-user
//! wallet, [`Validator::validate`] recursively discovers, decodes,
//! authenticates, and cross-validates every token nested within it — an
//! outer SIOP envelope plus any combination of OpenID Connect id-tokens,
//! self-issued claim bundles, W3C verifiable credentials, and verifiable
//! presentations — then optionally polls credential-status endpoints,
//! producing a single structured [`ValidationResponse`].
//!
//! The credential-status sub-protocol (§4.8) is not a cargo feature; it is
//! a runtime choice made via [`ValidatorBuilder::enable_status_check`],
//! which requires a [`status::StatusClient`] and a signer.
//!
//! DID resolution, raw cryptographic primitives, and the status-check HTTP
//! transport are external collaborators, exposed only as traits
//! (`credibil_did::DidResolver`, `credibil_infosec::Signer`, and
//! [`status::StatusClient`]).

mod builder;
mod crypto;
mod error;
mod keys;
mod orchestrator;
mod queue;
mod status;
#[cfg(test)]
mod test_support;
mod token;
mod types;
mod validators;

pub use builder::ValidatorBuilder;
pub use error::Error;
pub use orchestrator::Validator;
pub use queue::{ValidationQueue, ValidationQueueItem};
pub use status::StatusClient;
pub use token::ClaimToken;
pub use types::{Expected, StatusEntry, TokenType, ValidationResponse, ValidationResult};
pub use validators::id_token::IdTokenValidator;
pub use validators::self_issued::SelfIssuedValidator;
pub use validators::siop::SiopValidator;
pub use validators::vc::VcValidator;
pub use validators::vp::VpValidator;
pub use validators::{TokenValidator, ValidatorContext};

/// Re-export DID resolution.
pub mod did {
    pub use credibil_did::*;
}

/// Re-export cryptographic types and functions.
pub mod infosec {
    pub use credibil_infosec::*;
}
