//! Field equality policy.

use rust_decimal::Decimal;

/// Null-safe, scale-insensitive decimal equality.
///
/// Equal when both are null, or both are present and numerically equal:
/// `1.50` equals `1.5000`. A null never equals a value.
pub fn decimal_eq(a: Option<&Decimal>, b: Option<&Decimal>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.normalize() == b.normalize(),
        _ => false,
    }
}

/// Exact, null-safe string equality for status/enum codes.
pub fn status_eq(a: Option<&str>, b: Option<&str>) -> bool {
    a == b
}
