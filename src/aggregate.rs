use crate::parser::parse_roster;
use crate::roster::{RoomRoster, RosterMap};

/// Merges per-image rosters into one aggregate mapping.
///
/// Merging is last-write-wins at room granularity: a later roster for a room replaces the
/// earlier one outright rather than extending it. A replaced room keeps the position it
/// was first inserted at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchAggregator {
    rooms: RosterMap,
}

impl BatchAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one blob-level mapping into the aggregate.
    pub fn merge(&mut self, rosters: RosterMap) {
        for (room, roster) in rosters {
            self.rooms.insert(room, roster);
        }
    }

    /// Parse one recognized-text blob and merge the result.
    pub fn merge_text(&mut self, text: &str) {
        self.merge(parse_roster(text));
    }

    pub fn rooms(&self) -> &RosterMap {
        &self.rooms
    }

    pub fn room(&self, id: &str) -> Option<&RoomRoster> {
        self.rooms.get(id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn into_inner(self) -> RosterMap {
        self.rooms
    }
}

impl Extend<RosterMap> for BatchAggregator {
    fn extend<I: IntoIterator<Item = RosterMap>>(&mut self, iter: I) {
        for rosters in iter {
            self.merge(rosters);
        }
    }
}

/// Parse every blob in order and merge the results.
pub fn aggregate_texts<I, S>(texts: I) -> RosterMap
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut agg = BatchAggregator::new();
    for text in texts {
        agg.merge_text(text.as_ref());
    }
    agg.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::StudentRecord;

    fn single(room: &str, records: Vec<StudentRecord>) -> RosterMap {
        let mut map = RosterMap::new();
        map.insert(room.to_owned(), records);
        map
    }

    #[test]
    fn later_room_replaces_earlier_room() {
        let x = StudentRecord::new("X", 1);
        let y = StudentRecord::new("Y", 2);

        let mut agg = BatchAggregator::new();
        agg.merge(single("5", vec![x]));
        agg.merge(single("5", vec![y.clone()]));

        assert_eq!(agg.len(), 1);
        assert_eq!(agg.room("5"), Some(&vec![y]));
    }

    #[test]
    fn distinct_rooms_accumulate_in_first_seen_order() {
        let merged = aggregate_texts([
            "Room-2\n1. A(1)",
            "Room-1\n1. B(2)",
            "Room-2\n1. C(3)",
        ]);

        let keys: Vec<&str> = merged.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["2", "1"]);
        assert_eq!(merged["2"], vec![StudentRecord::new("C", 3)]);
        assert_eq!(merged["1"], vec![StudentRecord::new("B", 2)]);
    }

    #[test]
    fn empty_later_roster_still_replaces() {
        let merged = aggregate_texts(["Room-8\n1. A(1)", "Room-8"]);
        assert!(merged["8"].is_empty());
    }

    #[test]
    fn extend_merges_in_iteration_order() {
        let mut agg = BatchAggregator::new();
        agg.extend([
            single("1", vec![StudentRecord::new("A", 1)]),
            single("1", vec![StudentRecord::new("B", 2)]),
        ]);
        assert_eq!(agg.into_inner()["1"], vec![StudentRecord::new("B", 2)]);
    }

    #[test]
    fn blobs_without_headers_leave_aggregate_untouched() {
        let mut agg = BatchAggregator::new();
        agg.merge_text("no rooms here\n1. A(1)");
        assert!(agg.is_empty());
    }
}
