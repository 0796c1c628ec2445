//! Cell position parsing and formatting.
//!
//! Provides bidirectional conversion between spreadsheet-style positions
//! (e.g., "A1", "B2", "AA100") and zero-indexed row/column coordinates.
//! Positions beyond the sheet bounds are representable (the formula layer
//! needs them to round-trip references like `ZZZZ99999` through canonical
//! printing) but rejected by [`Position::is_valid`] at every API boundary.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Maximum number of rows a sheet may address.
pub const MAX_ROWS: usize = 16_384;
/// Maximum number of columns a sheet may address.
pub const MAX_COLS: usize = 16_384;

// Reference tokens longer than this cannot name an in-bounds position and
// their coordinate arithmetic is not worth carrying; the lexer rejects them.
pub(crate) const MAX_REF_LETTERS: usize = 8;
pub(crate) const MAX_REF_DIGITS: usize = 8;

/// A cell position by row and column indices (0-indexed).
///
/// Ordering is row-major: all of row 0 sorts before row 1.
#[derive(
    Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

fn position_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Z]{1,3})(?<digits>[0-9]{1,5})$")
            .expect("position regex must compile")
    })
}

impl Position {
    pub fn new(row: usize, col: usize) -> Position {
        Position { row, col }
    }

    /// Whether this position lies inside the sheet bounds.
    pub fn is_valid(&self) -> bool {
        self.row < MAX_ROWS && self.col < MAX_COLS
    }

    /// Build a position from the letter and digit parts of an A1-style
    /// reference. The result may be out of bounds; `None` means the parts
    /// exceed the representable token widths.
    pub(crate) fn from_a1_parts(letters: &str, digits: &str) -> Option<Position> {
        if letters.is_empty()
            || digits.is_empty()
            || letters.len() > MAX_REF_LETTERS
            || digits.len() > MAX_REF_DIGITS
        {
            return None;
        }

        let col = letters
            .bytes()
            .fold(0u64, |acc, c| acc * 26 + u64::from(c - b'A') + 1)
            - 1;
        let row = digits.parse::<u64>().ok()?.checked_sub(1)?;

        Some(Position::new(row as usize, col as usize))
    }

    /// Convert a column index to spreadsheet letters (0 -> A, 25 -> Z, 26 -> AA).
    pub fn col_to_letters(col: usize) -> String {
        let mut result = String::new();
        let mut n = col as u64 + 1;
        while n > 0 {
            n -= 1;
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        result
    }
}

impl std::str::FromStr for Position {
    type Err = String;

    /// Parse an in-bounds position from strict A1 notation: uppercase
    /// letters, then a 1-based row. Lowercase, out-of-bounds coordinates,
    /// and trailing garbage are all rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        position_re()
            .captures(s)
            .and_then(|caps| Position::from_a1_parts(&caps["letters"], &caps["digits"]))
            .filter(Position::is_valid)
            .ok_or_else(|| format!("Invalid cell position: {}", s))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Position::col_to_letters(self.col), self.row + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Position {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_basic() {
        assert_eq!(parse("A1"), Position::new(0, 0));
        assert_eq!(parse("B3"), Position::new(2, 1));
        assert_eq!(parse("Z1"), Position::new(0, 25));
        assert_eq!(parse("AA100"), Position::new(99, 26));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for s in ["", "A", "1", "a1", "A1B", "A0", " A1", "A1 ", "A-1", "$A$1"] {
            assert!(s.parse::<Position>().is_err(), "accepted {:?}", s);
        }
    }

    #[test]
    fn test_parse_rejects_out_of_bounds() {
        // XFD is column 16384, the last addressable one.
        assert_eq!(parse("XFD1"), Position::new(0, MAX_COLS - 1));
        assert!("XFE1".parse::<Position>().is_err());
        assert!("ZZZ1".parse::<Position>().is_err());
        assert_eq!(parse("A16384"), Position::new(MAX_ROWS - 1, 0));
        assert!("A16385".parse::<Position>().is_err());
        assert!("ZZZZ1".parse::<Position>().is_err());
        assert!("A123456".parse::<Position>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for s in ["A1", "Z100", "AA1", "AZ52", "XFD16384"] {
            assert_eq!(parse(s).to_string(), s);
        }
    }

    #[test]
    fn test_col_letters() {
        assert_eq!(Position::col_to_letters(0), "A");
        assert_eq!(Position::col_to_letters(25), "Z");
        assert_eq!(Position::col_to_letters(26), "AA");
        assert_eq!(Position::col_to_letters(701), "ZZ");
        assert_eq!(Position::col_to_letters(702), "AAA");
    }

    #[test]
    fn test_out_of_bounds_representable() {
        let pos = Position::from_a1_parts("ZZZZZ", "99999").unwrap();
        assert!(!pos.is_valid());
        assert_eq!(pos.to_string(), "ZZZZZ99999");
    }

    #[test]
    fn test_ordering_is_row_major() {
        assert!(Position::new(0, 5) < Position::new(1, 0));
        assert!(Position::new(2, 1) < Position::new(2, 3));
    }
}
