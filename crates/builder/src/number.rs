//! Decimal numbers with checked arithmetic.
//!
//! All arithmetic uses `rust_decimal::Decimal`; overflow and division by
//! zero are errors rather than panics.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::BuildError;

/// Parses a number literal. Commas are thousands separators.
pub fn parse_number(text: &str) -> Result<Decimal, BuildError> {
    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    Decimal::from_str(&cleaned).map_err(|_| BuildError::InvalidNumber(text.to_string()))
}

pub fn add(lhs: Decimal, rhs: Decimal) -> Result<Decimal, BuildError> {
    lhs.checked_add(rhs)
        .ok_or(BuildError::Overflow { op: "addition" })
}

pub fn subtract(lhs: Decimal, rhs: Decimal) -> Result<Decimal, BuildError> {
    lhs.checked_sub(rhs)
        .ok_or(BuildError::Overflow { op: "subtraction" })
}

pub fn multiply(lhs: Decimal, rhs: Decimal) -> Result<Decimal, BuildError> {
    lhs.checked_mul(rhs)
        .ok_or(BuildError::Overflow { op: "multiplication" })
}

pub fn divide(lhs: Decimal, rhs: Decimal) -> Result<Decimal, BuildError> {
    if rhs.is_zero() {
        return Err(BuildError::DivisionByZero);
    }
    lhs.checked_div(rhs)
        .ok_or(BuildError::Overflow { op: "division" })
}
