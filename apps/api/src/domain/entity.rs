use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::errors::DomainError;

/// How a field's query-string values are typed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    Text,
    Timestamp,
    Bool,
    Id,
}

/// A field that list queries may filter and sort on, named as in JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// A persisted document type handled by the generic CRUD handlers
pub trait Entity: Serialize + Clone + Send + Sync + 'static {
    /// Partial update accepted by `PATCH`
    type Patch: DeserializeOwned + Send + 'static;

    /// Singular name used in messages, e.g. "tour"
    const NAME: &'static str;

    /// Whitelist of queryable fields
    const FIELDS: &'static [Field];

    fn id(&self) -> Uuid;

    /// Applies a patch and re-runs the entity's validators
    fn apply(&mut self, patch: Self::Patch) -> Result<(), DomainError>;
}

/// Entities that can be created directly from a request body
pub trait FromDraft: Entity {
    type Draft: DeserializeOwned + Send + 'static;

    fn from_draft(draft: Self::Draft) -> Result<Self, DomainError>;
}
