//! Semantic failures raised while building directives.
//!
//! Each one rejects the construct being reduced; the grammar engine turns
//! its message into a semantic diagnostic and carries on with the next
//! declaration.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("invalid date '{0}'")]
    InvalidDate(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("numeric overflow in {op}")]
    Overflow { op: &'static str },

    #[error("too many strings on transaction description ({count}); expected at most 2")]
    TooManyStrings { count: usize },

    #[error("attempting to pop absent tag: '{0}'")]
    AbsentTag(String),

    #[error("unbalanced pushed tag: '{0}'")]
    UnbalancedTag(String),

    #[error("duplicate {0} in lot specification")]
    DuplicateLotComponent(&'static str),

    #[error("total price on a posting without units")]
    TotalPriceWithoutUnits,

    #[error("total price on a posting with zero units")]
    TotalPriceWithZeroUnits,

    #[error("invalid booking method '{0}'")]
    InvalidBooking(String),

    #[error("expected {expected}, found {found}")]
    UnexpectedNode {
        expected: &'static str,
        found: &'static str,
    },
}
