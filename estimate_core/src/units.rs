//! # Measurement Units
//!
//! Site measurements are taken in feet and inches. This module turns a
//! feet+inches pair into a decimal length in feet, and two lengths into an
//! area in square feet. Everything here is pure and infallible.
//!
//! Inches are conventionally 0-11 but are not clamped: `5' 14"` resolves to
//! `6.1666…` feet, exactly what was typed.
//!
//! ## Example
//!
//! ```rust
//! use estimate_core::units::{resolve_area, resolve_length, FeetInches};
//! use rust_decimal::Decimal;
//!
//! assert_eq!(resolve_length(10, 6), Decimal::new(105, 1));
//! assert_eq!(resolve_area(10, 6, 8, 0), Decimal::from(84));
//!
//! let wall = FeetInches::new(12, 3);
//! assert_eq!(wall.to_string(), "12' 3\"");
//! ```

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Inches per foot
pub const INCHES_PER_FOOT: u32 = 12;

/// Resolve a feet+inches pair into a length in feet: `feet + inches / 12`.
pub fn resolve_length(feet: u32, inches: u32) -> Decimal {
    Decimal::from(feet) + Decimal::from(inches) / Decimal::from(INCHES_PER_FOOT)
}

/// Resolve two feet+inches measurements into an area in square feet.
pub fn resolve_area(length_feet: u32, length_inches: u32, width_feet: u32, width_inches: u32) -> Decimal {
    resolve_length(length_feet, length_inches).saturating_mul(resolve_length(width_feet, width_inches))
}

/// A length entered as whole feet plus whole inches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FeetInches {
    pub feet: u32,
    pub inches: u32,
}

impl FeetInches {
    pub const fn new(feet: u32, inches: u32) -> Self {
        FeetInches { feet, inches }
    }

    /// Length in decimal feet
    pub fn resolve(&self) -> Decimal {
        resolve_length(self.feet, self.inches)
    }

    /// Area of a `self` x `other` rectangle in square feet
    pub fn area_with(&self, other: FeetInches) -> Decimal {
        resolve_area(self.feet, self.inches, other.feet, other.inches)
    }

    pub fn is_zero(&self) -> bool {
        self.feet == 0 && self.inches == 0
    }
}

impl fmt::Display for FeetInches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}' {}\"", self.feet, self.inches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_resolve_length_whole_feet() {
        assert_eq!(resolve_length(0, 0), Decimal::ZERO);
        assert_eq!(resolve_length(8, 0), Decimal::from(8));
    }

    #[test]
    fn test_resolve_length_with_inches() {
        assert_eq!(resolve_length(10, 6), Decimal::from_str("10.5").unwrap());
        assert_eq!(resolve_length(12, 3), Decimal::from_str("12.25").unwrap());
        assert_eq!(resolve_length(8, 9), Decimal::from_str("8.75").unwrap());
    }

    #[test]
    fn test_inches_are_not_clamped() {
        // 14 inches is more than a foot; it still counts in full
        assert!(resolve_length(5, 14) > Decimal::from(6));
        assert_eq!(resolve_length(0, 24), Decimal::from(2));
    }

    #[test]
    fn test_resolve_area_known_rooms() {
        // 9'6" x 7'0"
        assert_eq!(resolve_area(9, 6, 7, 0), Decimal::from_str("66.5").unwrap());
        // 12'3" x 8'9"
        assert_eq!(resolve_area(12, 3, 8, 9), Decimal::from_str("107.1875").unwrap());
        // 12'6" x 10'0"
        assert_eq!(resolve_area(12, 6, 10, 0), Decimal::from(125));
    }

    #[test]
    fn test_zero_side_gives_zero_area() {
        assert_eq!(resolve_area(10, 6, 0, 0), Decimal::ZERO);
    }

    #[test]
    fn test_feet_inches_helpers() {
        let length = FeetInches::new(10, 6);
        let width = FeetInches::new(8, 0);
        assert_eq!(length.resolve(), Decimal::from_str("10.5").unwrap());
        assert_eq!(length.area_with(width), Decimal::from(84));
        assert!(FeetInches::default().is_zero());
        assert_eq!(format!("{}", width), "8' 0\"");
    }
}
