//! Composite record identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::{ObjectType, RecordId};

/// Identity of one presence bucket: an object type plus a record id.
///
/// Immutable once created. Ordering is by object type, then record id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    object_type: ObjectType,
    record_id: RecordId,
}

impl RecordKey {
    /// Build a key from its two parts.
    pub fn new(object_type: ObjectType, record_id: RecordId) -> Self {
        Self {
            object_type,
            record_id,
        }
    }

    /// The object type of the record.
    pub fn object_type(&self) -> &ObjectType {
        &self.object_type
    }

    /// The record id.
    pub fn record_id(&self) -> &RecordId {
        &self.record_id
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type, self.record_id)
    }
}
