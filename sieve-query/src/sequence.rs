//! Structural rules for a clause list.
//!
//! OR separators split a clause list into AND groups, so a separator must sit
//! between two comparisons: never first, never last, never next to another.

use crate::error::SequenceError;
use crate::model_filter::{Clause, ClauseField};

/// Anything that occupies one position in a clause list.
pub trait SequenceItem {
    /// Whether this position is an OR separator.
    fn is_separator(&self) -> bool;
}

impl SequenceItem for ClauseField {
    fn is_separator(&self) -> bool {
        ClauseField::is_separator(self)
    }
}

impl SequenceItem for Clause {
    fn is_separator(&self) -> bool {
        Clause::is_separator(self)
    }
}

impl<T: SequenceItem + ?Sized> SequenceItem for &T {
    fn is_separator(&self) -> bool {
        (**self).is_separator()
    }
}

/// Check the placement of OR separators in a clause list.
///
/// `clauses` is the list as it will be saved, with deleted clauses already
/// removed. Rules are checked in order and the first violation is returned.
pub fn validate_sequence<I>(clauses: I) -> Result<(), SequenceError>
where
    I: IntoIterator,
    I::Item: SequenceItem,
{
    let separators: Vec<bool> = clauses.into_iter().map(|c| c.is_separator()).collect();

    let (Some(first), Some(last)) = (separators.first(), separators.last()) else {
        return Err(SequenceError::AtLeastOneRequired);
    };
    if *first {
        return Err(SequenceError::LeadingSeparator);
    }
    if *last {
        return Err(SequenceError::TrailingSeparator);
    }
    if separators.windows(2).any(|pair| pair[0] && pair[1]) {
        return Err(SequenceError::ConsecutiveSeparators);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seq(pattern: &str) -> Vec<Clause> {
        pattern
            .chars()
            .map(|c| match c {
                '|' => Clause::or(),
                _ => Clause::new("name", "exact", c.to_string()),
            })
            .collect()
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(validate_sequence(seq("")), Err(SequenceError::AtLeastOneRequired));
    }

    #[test]
    fn test_separator_placement() {
        assert_eq!(validate_sequence(seq("|a")), Err(SequenceError::LeadingSeparator));
        assert_eq!(validate_sequence(seq("a|")), Err(SequenceError::TrailingSeparator));
        assert_eq!(validate_sequence(seq("a||b")), Err(SequenceError::ConsecutiveSeparators));
        // A lone separator is both first and last; the first rule wins.
        assert_eq!(validate_sequence(seq("|")), Err(SequenceError::LeadingSeparator));
    }

    #[test]
    fn test_valid_sequences() {
        for pattern in ["a", "ab", "a|b", "a|bc|d", "abc|d|e"] {
            assert_eq!(validate_sequence(seq(pattern)), Ok(()), "pattern {pattern}");
        }
    }

    #[test]
    fn test_accepts_borrowed_items() {
        let clauses = seq("a|b");
        assert!(validate_sequence(clauses.iter()).is_ok());
        assert!(validate_sequence(clauses.iter().map(|c| &c.field)).is_ok());
    }

    /// Exhaustive check over every sequence of up to six positions.
    #[test]
    fn test_rejects_exactly_the_malformed_sequences() {
        for len in 0..=6u32 {
            for bits in 0..(1u32 << len) {
                let flags: Vec<bool> = (0..len).map(|i| bits & (1 << i) != 0).collect();
                let clauses: Vec<Clause> = flags
                    .iter()
                    .map(|&sep| if sep { Clause::or() } else { Clause::new("name", "exact", "x") })
                    .collect();

                let malformed = flags.is_empty()
                    || flags[0]
                    || flags[flags.len() - 1]
                    || flags.windows(2).any(|w| w[0] && w[1]);
                assert_eq!(validate_sequence(&clauses).is_err(), malformed, "flags {flags:?}");
            }
        }
    }
}
