//! # `ValidationQueue`
//!
//! The FIFO work-list the orchestrator drains. Items are appended as tokens
//! are discovered (the root SIOP first, then its children), each carrying
//! its own result slot so the final [`crate::types::ValidationResult`] can
//! be assembled by scanning the queue once it is fully drained.

use crate::token::ClaimToken;
use crate::types::ValidationResponse;

/// One entry in a [`ValidationQueue`].
#[derive(Clone, Debug)]
pub struct ValidationQueueItem {
    /// Caller-chosen handle: `"siop"` for the root, a descriptor-map id or
    /// attestation sub-key for children.
    pub id: String,

    /// The raw token string to validate.
    pub token_to_validate: String,

    /// The classified token, set once it has been parsed.
    pub claim_token: Option<ClaimToken>,

    /// The validated, type-tagged token, set once validation completes.
    pub validated_token: Option<ClaimToken>,

    /// The validator's response, set once validation completes.
    pub validation_response: Option<ValidationResponse>,

    /// `true` once this item has a final result.
    pub is_validated: bool,
}

impl ValidationQueueItem {
    fn new(id: impl Into<String>, token_to_validate: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            token_to_validate: token_to_validate.into(),
            claim_token: None,
            validated_token: None,
            validation_response: None,
            is_validated: false,
        }
    }
}

/// The append-only, single-`validate()`-call work-list of tokens to check.
#[derive(Clone, Debug, Default)]
pub struct ValidationQueue {
    items: Vec<ValidationQueueItem>,
}

impl ValidationQueue {
    /// An empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Append a new, unvalidated item carrying a raw token to be classified
    /// later. Duplicate ids are permitted (though discouraged).
    pub fn enqueue_token(&mut self, id: impl Into<String>, raw: impl Into<String>) {
        self.items.push(ValidationQueueItem::new(id, raw));
    }

    /// Append a new item whose token has already been classified, skipping
    /// re-parsing.
    pub fn enqueue_item(&mut self, id: impl Into<String>, claim_token: ClaimToken) {
        let mut item = ValidationQueueItem::new(id, claim_token.raw_token.clone());
        item.claim_token = Some(claim_token);
        self.items.push(item);
    }

    /// Index of the first unvalidated item in insertion order, if any.
    #[must_use]
    pub fn next_index(&self) -> Option<usize> {
        self.items.iter().position(|item| !item.is_validated)
    }

    /// Borrow the item at `index`.
    #[must_use]
    pub fn item(&self, index: usize) -> &ValidationQueueItem {
        &self.items[index]
    }

    /// Mutably borrow the item at `index`.
    pub fn item_mut(&mut self, index: usize) -> &mut ValidationQueueItem {
        &mut self.items[index]
    }

    /// All items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[ValidationQueueItem] {
        &self.items
    }

    /// How many items have been enqueued so far, validated or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` if no items have been enqueued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Record the final result for the item at `index`. Once set, a result
    /// is final and `next_index` will skip this item.
    pub fn set_result(&mut self, index: usize, response: ValidationResponse, validated_token: ClaimToken) {
        let item = &mut self.items[index];
        item.validated_token = Some(validated_token);
        item.validation_response = Some(response);
        item.is_validated = true;
    }

    /// Success iff every item's response succeeded; else the first failure
    /// verbatim.
    #[must_use]
    pub fn aggregate(&self) -> ValidationResponse {
        for item in &self.items {
            match &item.validation_response {
                Some(response) if !response.result => return response.clone(),
                None => {
                    // Queue has not fully drained; treat as not-yet-successful.
                    return ValidationResponse {
                        result: false,
                        status: 500,
                        detailed_error: Some(format!("item '{}' was never validated", item.id)),
                        ..ValidationResponse::default()
                    };
                }
                Some(_) => {}
            }
        }
        ValidationResponse { result: true, status: 200, ..ValidationResponse::default() }
    }
}
