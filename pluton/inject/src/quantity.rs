//! Validation of Kubernetes resource quantities (`500m`, `64Mi`, `1e3`, ...).
//!
//! Follows the grammar of `k8s.io/apimachinery/pkg/api/resource`:
//!
//! ```text
//! <quantity>        ::= <signedNumber><suffix>
//! <signedNumber>    ::= [+-] <digits> [ . [<digits>] ] | [+-] . <digits>
//! <suffix>          ::= <binarySI> | <decimalExponent> | <decimalSI>
//! <binarySI>        ::= Ki | Mi | Gi | Ti | Pi | Ei
//! <decimalSI>       ::= n | u | m | "" | k | M | G | T | P | E
//! <decimalExponent> ::= e <signedInteger> | E <signedInteger>
//! ```
//!
//! The quantity keeps the exact string it was parsed from.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use thiserror::Error;

const SUFFIXES: [&str; 16] = [
    "", "n", "u", "m", "k", "M", "G", "T", "P", "E", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuantityError {
    #[error("quantity is empty")]
    Empty,

    #[error("quantity `{0}` does not start with a valid number")]
    InvalidNumber(String),

    #[error("quantity `{raw}` has an unknown suffix `{suffix}`")]
    UnknownSuffix { raw: String, suffix: String },
}

fn is_signed_integer(value: &str) -> bool {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_valid_number(number: &str) -> bool {
    number.matches('.').count() <= 1 && number.chars().any(|c| c.is_ascii_digit())
}

fn is_valid_suffix(suffix: &str) -> bool {
    SUFFIXES.contains(&suffix)
        || suffix
            .strip_prefix(['e', 'E'])
            .is_some_and(is_signed_integer)
}

/// Parses `raw` into a [`Quantity`].
///
/// Callers decide what an empty string means, here it is always an error.
pub fn parse_quantity(raw: &str) -> Result<Quantity, QuantityError> {
    if raw.is_empty() {
        return Err(QuantityError::Empty);
    }

    let unsigned = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    let number_len = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(number_len);

    if !is_valid_number(number) {
        return Err(QuantityError::InvalidNumber(raw.to_owned()));
    }

    if !is_valid_suffix(suffix) {
        return Err(QuantityError::UnknownSuffix {
            raw: raw.to_owned(),
            suffix: suffix.to_owned(),
        });
    }

    Ok(Quantity(raw.to_owned()))
}
