//! # `ValidatorBuilder`
//!
//! Wires the collaborators spec §1 leaves external — DID resolver, signer,
//! per-type validator registry, trusted-issuer policy, and the
//! status-check feature flag — into an immutable [`Validator`] (spec §6).
//! Mirrors the teacher crate's provider/builder split: a plain struct that
//! accumulates configuration through consuming setter methods, then
//! `build()`s into the read-only engine the orchestrator drives.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use credibil_did::DidResolver;
use credibil_infosec::Signer;

use crate::error::Error;
use crate::keys::KeyCache;
use crate::misconfigured;
use crate::orchestrator::Validator;
use crate::status::StatusClient;
use crate::types::TokenType;
use crate::validators::TokenValidator;
use crate::validators::id_token::IdTokenValidator;
use crate::validators::self_issued::SelfIssuedValidator;
use crate::validators::siop::SiopValidator;
use crate::validators::vc::VcValidator;
use crate::validators::vp::VpValidator;

/// Default tolerance applied to `exp`, absent an explicit `clock_skew`
/// (spec §9 Open Questions: "pick a documented default (5 min)").
pub const DEFAULT_CLOCK_SKEW: ChronoDuration = ChronoDuration::minutes(5);

/// Default per-call network timeout (spec §5).
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds an immutable [`Validator`] (spec §6's "Builder/configuration
/// surface"). Every setter consumes and returns `self`; once [`build`]
/// is called the resulting [`Validator`] holds a read-only handle to its
/// configuration and may be shared across concurrent `validate()` calls.
///
/// [`build`]: ValidatorBuilder::build
pub struct ValidatorBuilder<R, S>
where
    R: DidResolver + Clone + Send + Sync + 'static,
    S: Signer + Clone + Send + Sync + 'static,
{
    resolver: Option<R>,
    signer: Option<S>,
    cache: Option<KeyCache>,
    validators: HashMap<TokenType, Box<dyn TokenValidator<R>>>,
    trusted_issuers: HashMap<String, HashSet<String>>,
    clock_skew: ChronoDuration,
    http_timeout: Duration,
    status_check_enabled: bool,
    status_client: Option<Box<dyn StatusClient>>,
}

impl<R, S> Default for ValidatorBuilder<R, S>
where
    R: DidResolver + Clone + Send + Sync + 'static,
    S: Signer + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            resolver: None,
            signer: None,
            cache: None,
            validators: HashMap::new(),
            trusted_issuers: HashMap::new(),
            clock_skew: DEFAULT_CLOCK_SKEW,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            status_check_enabled: false,
            status_client: None,
        }
    }
}

impl<R, S> ValidatorBuilder<R, S>
where
    R: DidResolver + Clone + Send + Sync + 'static,
    S: Signer + Clone + Send + Sync + 'static,
{
    /// An empty builder with no resolver, no signer, and no validators
    /// registered. Callers typically chain [`Self::with_default_validators`]
    /// immediately after.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The DID resolver collaborator used to resolve verification keys
    /// (spec §4.3) and, when status checking is enabled, to verify status
    /// receipts.
    #[must_use]
    pub fn resolver(mut self, resolver: R) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// The verifier's own signing identity (`did`, `signingKeyReference`,
    /// `signingProtocol`, `keyStore` in spec §6's terms, collapsed here
    /// into the single `credibil_infosec::Signer` collaborator), required
    /// only when the status-receipt sub-protocol (§4.8) is enabled.
    #[must_use]
    pub fn signer(mut self, signer: S) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Enable the process-wide JWKS/DID verification-key cache (spec §5).
    /// Disabled (no caching) unless called.
    #[must_use]
    pub fn with_key_cache(mut self) -> Self {
        self.cache = Some(KeyCache::new());
        self
    }

    /// Register a validator for a single [`TokenType`]. Overwrites any
    /// previously registered validator for that type.
    #[must_use]
    pub fn validator(mut self, token_type: TokenType, validator: Box<dyn TokenValidator<R>>) -> Self {
        self.validators.insert(token_type, validator);
        self
    }

    /// Register the five built-in validators against all eight
    /// [`TokenType`] variants (the SIOP validator handles all three SIOP
    /// flavours), per spec §1's "per-type validator registry" wiring note.
    #[must_use]
    pub fn with_default_validators(mut self) -> Self {
        self.validators.insert(TokenType::SiopIssuance, Box::new(SiopValidator));
        self.validators.insert(TokenType::SiopPresentationAttestation, Box::new(SiopValidator));
        self.validators.insert(TokenType::SiopPresentationExchange, Box::new(SiopValidator));
        self.validators.insert(TokenType::IdToken, Box::new(IdTokenValidator));
        self.validators.insert(TokenType::SelfIssued, Box::new(SelfIssuedValidator));
        self.validators.insert(TokenType::VerifiableCredential, Box::new(VcValidator));
        self.validators.insert(TokenType::VerifiablePresentation, Box::new(VpValidator));
        self
    }

    /// Trust a set of issuer DIDs for a contract id (spec §6's
    /// `{ contractId → set<DID> }`). Called once per contract; repeated
    /// calls for the same id replace the previous set.
    #[must_use]
    pub fn trust_issuers(mut self, contract_id: impl Into<String>, dids: impl IntoIterator<Item = String>) -> Self {
        self.trusted_issuers.insert(contract_id.into(), dids.into_iter().collect());
        self
    }

    /// Override the default 5-minute `exp` clock-skew tolerance.
    #[must_use]
    pub const fn clock_skew(mut self, skew: ChronoDuration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// Override the default 10-second per-call network timeout.
    #[must_use]
    pub const fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Enable the credential-status sub-protocol (spec §4.8), requires a
    /// [`Self::signer`] and a [`StatusClient`] at [`Self::build`] time.
    #[must_use]
    pub fn enable_status_check(mut self, client: Box<dyn StatusClient>) -> Self {
        self.status_check_enabled = true;
        self.status_client = Some(client);
        self
    }

    /// Assemble the immutable [`Validator`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Misconfigured` if no resolver was set, or if status
    /// checking was enabled without both a signer and a status client.
    pub fn build(self) -> Result<Validator<R, S>, Error> {
        let resolver = self.resolver.ok_or_else(|| misconfigured!("ValidatorBuilder requires a resolver"))?;
        if self.status_check_enabled && (self.signer.is_none() || self.status_client.is_none()) {
            return Err(misconfigured!(
                "status check enabled with no signer and/or status client configured"
            ));
        }

        Ok(Validator {
            resolver,
            signer: self.signer,
            cache: self.cache,
            validators: self.validators,
            trusted_issuers: self.trusted_issuers,
            clock_skew: self.clock_skew,
            http_timeout: self.http_timeout,
            status_check_enabled: self.status_check_enabled,
            status_client: self.status_client,
        })
    }
}
