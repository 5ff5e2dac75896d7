use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::{ListingKind, ListingRef};

/// One subscription: a listing, who asked for it and where changes go.
///
/// Items are never edited in place; a changed subscription is removed and
/// registered again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub external_id: String,
    pub kind: ListingKind,
    pub owner_id: String,
    pub delivery_target: String,
    pub scope_id: Option<String>,
}

impl TrackedItem {
    pub fn listing(&self) -> ListingRef {
        ListingRef::new(self.external_id.clone(), self.kind)
    }

    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }

    /// `None` matches every scope.
    pub fn in_scope(&self, scope_id: Option<&str>) -> bool {
        match scope_id {
            Some(scope) => self.scope_id.as_deref() == Some(scope),
            None => true,
        }
    }
}

/// Registration request coming from a command front end.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewListing {
    #[validate(custom(function = "validate_external_id"))]
    pub external_id: String,
    pub kind: ListingKind,
    #[validate(length(min = 1, message = "owner id must not be empty"))]
    pub owner_id: String,
    #[validate(length(min = 1, message = "delivery target must not be empty"))]
    pub delivery_target: String,
    pub scope_id: Option<String>,
}

impl NewListing {
    pub fn into_item(self) -> TrackedItem {
        TrackedItem {
            external_id: self.external_id,
            kind: self.kind,
            owner_id: self.owner_id,
            delivery_target: self.delivery_target,
            scope_id: self.scope_id,
        }
    }
}

/// Storefront ids are plain decimal numbers.
pub fn validate_external_id(external_id: &str) -> Result<(), ValidationError> {
    if !external_id.is_empty() && external_id.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("external_id_not_numeric"))
    }
}
