//! Line-oriented parser turning recognized roster text into structured records.
//!
//! OCR output is noisy, so parsing is best-effort: every line is tried against three
//! patterns in a fixed priority order and anything that matches none of them is dropped.
//!
//! 1. Room header, e.g. `Room-101` (optionally preceded by other text).
//! 2. Numbered student line, e.g. `1. Alice(23)`.
//! 3. Unstructured student line, e.g. `Sajid (7)`, found anywhere in the line.
//!
//! Student lines only count once a room header has been seen.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::roster::{RosterMap, StudentRecord};

static DEFAULT_PARSER: LazyLock<RosterTextParser> = LazyLock::new(RosterTextParser::new);

/// Parse one blob of recognized text into a room-to-roster mapping.
///
/// This is a pure function of `text`: parsing the same input twice yields the same mapping.
pub fn parse_roster(text: &str) -> RosterMap {
    DEFAULT_PARSER.parse(text)
}

/// Compiled patterns for roster parsing.
///
/// Most callers want [`parse_roster`]; this type exists for callers that prefer to own
/// their parser instance.
#[derive(Debug, Clone)]
pub struct RosterTextParser {
    room_header: Regex,
    numbered_student: Regex,
    loose_student: Regex,
}

impl Default for RosterTextParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RosterTextParser {
    pub fn new() -> Self {
        // The patterns are literals; failing to compile them is a programming error.
        Self {
            room_header: Regex::new(r"^.*?Room-(\d+)").expect("room header pattern is valid"),
            numbered_student: Regex::new(r"^(\d+)\.\s*(\w+)\s*\((\d+)\)")
                .expect("numbered student pattern is valid"),
            loose_student: Regex::new(r"(\w+)\s*\((\d+)\)")
                .expect("unstructured student pattern is valid"),
        }
    }

    pub fn parse(&self, text: &str) -> RosterMap {
        let mut rosters = RosterMap::new();
        let mut current_room: Option<String> = None;

        for line in text.trim().lines() {
            match self.classify(line) {
                Line::RoomHeader(room) => {
                    // A repeated header starts that room over.
                    rosters.insert(room.clone(), Vec::new());
                    current_room = Some(room);
                }
                Line::Student(record) => {
                    if let Some(roster) = current_room
                        .as_deref()
                        .and_then(|room| rosters.get_mut(room))
                    {
                        roster.push(record);
                    }
                }
                Line::Ignored => {}
            }
        }

        rosters
    }

    fn classify(&self, line: &str) -> Line {
        if let Some(caps) = self.room_header.captures(line) {
            return Line::RoomHeader(caps[1].to_owned());
        }

        if let Some(caps) = self.numbered_student.captures(line) {
            return record_from(&caps, 2, 3).map_or(Line::Ignored, Line::Student);
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Line::Ignored;
        }

        self.loose_student
            .captures(trimmed)
            .and_then(|caps| record_from(&caps, 1, 2))
            .map_or(Line::Ignored, Line::Student)
    }
}

/// What a single line contributes to the roster.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    RoomHeader(String),
    Student(StudentRecord),
    Ignored,
}

fn record_from(caps: &Captures<'_>, name_group: usize, id_group: usize) -> Option<StudentRecord> {
    let digits = &caps[id_group];
    let Some(id) = decimal_value(digits) else {
        debug!(id = digits, "student id is not a usable u64; skipping line");
        return None;
    };
    Some(StudentRecord::new(&caps[name_group], id))
}

/// First code point of every run of ten Unicode decimal digits (general category `Nd`).
///
/// Each run holds the values 0 through 9 in order, so a digit's value is its offset from
/// the nearest zero below it.
const DECIMAL_ZEROS: &[u32] = &[
    0x0030, 0x0660, 0x06F0, 0x07C0, 0x0966, 0x09E6, 0x0A66, 0x0AE6, 0x0B66, 0x0BE6, 0x0C66,
    0x0CE6, 0x0D66, 0x0DE6, 0x0E50, 0x0ED0, 0x0F20, 0x1040, 0x1090, 0x17E0, 0x1810, 0x1946,
    0x19D0, 0x1A80, 0x1A90, 0x1B50, 0x1BB0, 0x1C40, 0x1C50, 0xA620, 0xA8D0, 0xA900, 0xA9D0,
    0xA9F0, 0xAA50, 0xABF0, 0xFF10, 0x104A0, 0x10D30, 0x10D40, 0x11066, 0x110F0, 0x11136,
    0x111D0, 0x112F0, 0x11450, 0x114D0, 0x11650, 0x116C0, 0x11730, 0x118E0, 0x11950,
    0x11C50, 0x11D50, 0x11DA0, 0x11F50, 0x16A60, 0x16AC0, 0x16B50, 0x1D7CE, 0x1D7D8,
    0x1D7E2, 0x1D7EC, 0x1D7F6, 0x1E140, 0x1E2F0, 0x1E4F0, 0x1E950, 0x1FBF0,
];

fn digit_value(c: char) -> Option<u64> {
    if let Some(d) = c.to_digit(10) {
        return Some(u64::from(d));
    }
    let cp = u32::from(c);
    let zero = match DECIMAL_ZEROS.binary_search(&cp) {
        Ok(_) => return Some(0),
        Err(0) => return None,
        Err(i) => DECIMAL_ZEROS[i - 1],
    };
    (cp - zero < 10).then_some(u64::from(cp - zero))
}

/// Numeric value of a run of decimal digits from any script, or `None` on overflow or an
/// unknown digit.
fn decimal_value(digits: &str) -> Option<u64> {
    digits.chars().try_fold(0u64, |acc, c| {
        acc.checked_mul(10)?.checked_add(digit_value(c)?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str, id: u64) -> StudentRecord {
        StudentRecord::new(name, id)
    }

    #[test]
    fn numbered_lines_under_a_room_header() {
        let rosters = parse_roster("Room-101\n1. Alice(23)\n2. Bob(45)");
        assert_eq!(rosters.len(), 1);
        assert_eq!(rosters["101"], vec![rec("Alice", 23), rec("Bob", 45)]);
    }

    #[test]
    fn records_before_any_header_are_dropped() {
        assert!(parse_roster("1. Alice(23)").is_empty());
        assert!(parse_roster("Sajid (7)\nnoise").is_empty());
    }

    #[test]
    fn unstructured_lines_fall_back_to_a_search() {
        let rosters = parse_roster("Room-5\nSajid (7)");
        assert_eq!(rosters["5"], vec![rec("Sajid", 7)]);
    }

    #[test]
    fn unstructured_match_can_sit_anywhere_in_the_line() {
        let rosters = parse_roster("Room-5\n  - maybe Karim (12) ??");
        assert_eq!(rosters["5"], vec![rec("Karim", 12)]);
    }

    #[test]
    fn empty_room_still_appears() {
        let rosters = parse_roster("Room-5\n\nRoom-6\n1. Eve(9)");
        let keys: Vec<&str> = rosters.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["5", "6"]);
        assert!(rosters["5"].is_empty());
        assert_eq!(rosters["6"], vec![rec("Eve", 9)]);
    }

    #[test]
    fn repeated_header_resets_that_room() {
        let rosters = parse_roster("Room-5\n1. A(1)\nRoom-5\n1. B(2)");
        assert_eq!(rosters.len(), 1);
        assert_eq!(rosters["5"], vec![rec("B", 2)]);
    }

    #[test]
    fn repeated_header_keeps_first_position() {
        let rosters = parse_roster("Room-5\nRoom-6\n1. X(3)\nRoom-5\n1. Y(4)");
        let keys: Vec<&str> = rosters.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["5", "6"]);
        assert_eq!(rosters["5"], vec![rec("Y", 4)]);
    }

    #[test]
    fn header_may_follow_leading_text() {
        let rosters = parse_roster("Dorm B Room-12\n1. Nadia(3)");
        assert_eq!(rosters["12"], vec![rec("Nadia", 3)]);
    }

    #[test]
    fn surrounding_whitespace_and_crlf_are_tolerated() {
        let rosters = parse_roster("\n\n  Room-7\r\n1.Rafi (8)\r\n\r\n2. Tania(9)\r\n   ");
        assert_eq!(rosters["7"], vec![rec("Rafi", 8), rec("Tania", 9)]);
    }

    #[test]
    fn unreadable_lines_are_ignored() {
        let rosters = parse_roster("Room-3\n---\n1. (4)\nAmin 5\n2. Lima(6)");
        assert_eq!(rosters["3"], vec![rec("Lima", 6)]);
    }

    #[test]
    fn oversized_ids_are_skipped() {
        let rosters = parse_roster("Room-3\n1. Big(99999999999999999999999)\n2. Ok(1)");
        assert_eq!(rosters["3"], vec![rec("Ok", 1)]);
    }

    #[test]
    fn non_ascii_digit_ids_keep_their_value() {
        let rosters = parse_roster("Room-5\n১. Rahim(২৩)\nKarim (৭)");
        assert_eq!(rosters["5"], vec![rec("Rahim", 23), rec("Karim", 7)]);
    }

    #[test]
    fn decimal_values_across_scripts() {
        assert_eq!(decimal_value("0042"), Some(42));
        assert_eq!(decimal_value("٣٠"), Some(30));
        assert_eq!(decimal_value("१०"), Some(10));
        assert_eq!(decimal_value("１２"), Some(12));
        assert_eq!(decimal_value("18446744073709551615"), Some(u64::MAX));
        assert_eq!(decimal_value("18446744073709551616"), None);
    }

    #[test]
    fn header_wins_over_student_patterns() {
        let parser = RosterTextParser::new();
        assert_eq!(
            parser.classify("1. Room-4(2)"),
            Line::RoomHeader("4".to_owned())
        );
    }

    #[test]
    fn unicode_names_are_word_characters() {
        let rosters = parse_roster("Room-9\n1. Zoë(11)");
        assert_eq!(rosters["9"], vec![rec("Zoë", 11)]);
    }

    #[test]
    fn parsing_is_idempotent() {
        let text = "Room-1\n1. A(1)\nRoom-2\nB (2)\nC(3)";
        assert_eq!(parse_roster(text), parse_roster(text));
        let owned = RosterTextParser::default();
        assert_eq!(owned.parse(text), parse_roster(text));
    }

    #[test]
    fn text_without_headers_yields_empty_mapping() {
        assert!(parse_roster("").is_empty());
        assert!(parse_roster("   \n\t\n").is_empty());
        assert!(parse_roster("Class list\nAlice(1)").is_empty());
    }
}
