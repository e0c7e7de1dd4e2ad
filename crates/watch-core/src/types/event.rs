//! Record change events delivered over the push channel.

use serde::{Deserialize, Serialize};

use super::id::{ObjectType, RecordId};
use super::record::RecordKey;

/// A change to some record's presence entry, published by any client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// Object type of the changed record.
    pub object_type: ObjectType,
    /// Id of the changed record.
    pub record_id: RecordId,
    /// Monotonic position of the event in the channel.
    pub change_marker: i64,
}

impl ChangeEvent {
    /// Create a change event.
    pub fn new(object_type: ObjectType, record_id: RecordId, change_marker: i64) -> Self {
        Self {
            object_type,
            record_id,
            change_marker,
        }
    }

    /// The record key this event refers to.
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.object_type.clone(), self.record_id.clone())
    }
}
