use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single student entry recognized under a room header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentRecord {
    /// Recognized name token. Not validated beyond being non-empty.
    pub name: String,
    /// Parenthesized numeric id. Not unique within or across rooms.
    pub id: u64,
}

impl StudentRecord {
    pub fn new(name: impl Into<String>, id: u64) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

/// Students of one room, in order of appearance in the source text.
pub type RoomRoster = Vec<StudentRecord>;

/// Room identifier (the digits of a `Room-<digits>` header) to its roster.
///
/// Keys iterate in first-insertion order; replacing a key keeps its position.
pub type RosterMap = IndexMap<String, RoomRoster>;
