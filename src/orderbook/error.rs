//! Order book error types

use super::entry::BookAction;
use pricelevel::Side;
use rust_decimal::Decimal;
use std::fmt;

/// Errors raised by the sequenced book when a change cannot be applied.
///
/// Every check runs before the book is touched, so an error always means the
/// book is unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderBookError {
    /// The new transaction id does not advance the book
    StaleTransaction {
        /// Last transaction applied to the book
        last: u64,
        /// Transaction id that was offered
        received: u64,
    },

    /// The caller's notion of the previous transaction disagrees with the book
    OutOfSequence {
        /// Last transaction applied to the book
        expected: u64,
        /// Previous transaction id given by the caller
        received: u64,
    },

    /// An entry was passed in the list for the other side
    SideMismatch {
        /// Composite level id
        id: u64,
        /// Side of the list the entry was passed in
        expected: Side,
        /// Side carried by the entry
        found: Side,
    },

    /// An entry belongs to another instrument
    SymbolMismatch {
        /// Symbol of the book
        expected: String,
        /// Symbol carried by the entry
        found: String,
    },

    /// Negative level price
    InvalidPrice {
        /// Composite level id
        id: u64,
        /// Offending price
        price: Decimal,
    },

    /// The action is not a diff
    InvalidAction(BookAction),
}

impl fmt::Display for OrderBookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderBookError::StaleTransaction { last, received } => {
                write!(
                    f,
                    "Stale transaction: {} does not advance past {}",
                    received, last
                )
            }
            OrderBookError::OutOfSequence { expected, received } => {
                write!(
                    f,
                    "Out of sequence: expected previous transaction {}, got {}",
                    expected, received
                )
            }
            OrderBookError::SideMismatch {
                id,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Side mismatch for level {}: expected {}, found {}",
                    id, expected, found
                )
            }
            OrderBookError::SymbolMismatch { expected, found } => {
                write!(f, "Symbol mismatch: expected {}, found {}", expected, found)
            }
            OrderBookError::InvalidPrice { id, price } => {
                write!(f, "Invalid price {} for level {}", price, id)
            }
            OrderBookError::InvalidAction(action) => {
                write!(f, "Invalid diff action: {}", action)
            }
        }
    }
}

impl std::error::Error for OrderBookError {}
