//! # Quantity Parser
//!
//! Parses CPU and memory quantities (`"2"`, `"500m"`, `"4Gi"`, `"1e3"`) into
//! a fixed-point value held at nano precision, and renders them back in a
//! canonical form:
//!
//! - binary inputs (`Ki`..`Ei`) use the largest binary suffix that divides
//!   the value exactly (`"1024Mi"` becomes `"1Gi"`),
//! - decimal inputs use the largest decimal suffix that divides exactly
//!   (`"0.5"` becomes `"500m"`, `"1000m"` becomes `"1"`),
//! - exponent inputs render as `<n>e<3k>`.
//!
//! Digits finer than one nano round up in magnitude. Parsing a canonical
//! string yields the same canonical string.

use std::fmt;
use std::str::FromStr;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity as StoredQuantity;
use thiserror::Error;

use crate::core::error::{GatewayError, GatewayResult};

const NANOS_PER_UNIT: i128 = 1_000_000_000;

/// Decimal suffixes paired with their power of ten, largest first
const DECIMAL_SUFFIXES: [(&str, i32); 10] = [
    ("E", 18),
    ("P", 15),
    ("T", 12),
    ("G", 9),
    ("M", 6),
    ("k", 3),
    ("", 0),
    ("m", -3),
    ("u", -6),
    ("n", -9),
];

/// Binary suffixes indexed by their power of 1024
const BINARY_SUFFIXES: [&str; 7] = ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuantityError {
    #[error("quantity is empty")]
    Empty,

    #[error("quantity has no numeric part")]
    InvalidNumber,

    #[error("unknown quantity suffix \"{0}\"")]
    InvalidSuffix(String),

    #[error("quantity is out of range")]
    OutOfRange,
}

/// How a quantity was written, which decides how it is rendered back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityFormat {
    BinarySI,
    DecimalSI,
    DecimalExponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantity {
    nanos: i128,
    format: QuantityFormat,
}

enum Suffix {
    Decimal(i32),
    Binary(u32),
    Exponent(i32),
}

impl Quantity {
    /// Value in billionths of a unit
    pub fn nanos(&self) -> i128 {
        self.nanos
    }

    pub fn format(&self) -> QuantityFormat {
        self.format
    }

    /// Whole units, when the value has no fractional part
    pub fn whole_units(&self) -> Option<i128> {
        (self.nanos % NANOS_PER_UNIT == 0).then(|| self.nanos / NANOS_PER_UNIT)
    }

    pub fn parse(input: &str) -> Result<Self, QuantityError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(QuantityError::Empty);
        }

        let (negative, rest) = match input.as_bytes()[0] {
            b'-' => (true, &input[1..]),
            b'+' => (false, &input[1..]),
            _ => (false, input),
        };

        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_digits, rest) = rest.split_at(int_len);
        let (frac_digits, suffix) = match rest.strip_prefix('.') {
            Some(after_dot) => {
                let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
                after_dot.split_at(frac_len)
            }
            None => ("", rest),
        };

        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(QuantityError::InvalidNumber);
        }

        let digits = format!("{}{}", int_digits, frac_digits);
        let digits = digits.trim_start_matches('0');
        if digits.len() > 38 {
            return Err(QuantityError::OutOfRange);
        }
        let mantissa: i128 = if digits.is_empty() {
            0
        } else {
            digits.parse().map_err(|_| QuantityError::OutOfRange)?
        };

        let (format, multiplier, exponent) = match parse_suffix(suffix)? {
            Suffix::Decimal(exp) => (QuantityFormat::DecimalSI, 1, exp),
            Suffix::Binary(power) => (QuantityFormat::BinarySI, 1024_i128.pow(power), 0),
            Suffix::Exponent(exp) => (QuantityFormat::DecimalExponent, 1, exp),
        };

        let scaled = mantissa
            .checked_mul(multiplier)
            .ok_or(QuantityError::OutOfRange)?;

        // nanos = scaled * 10^(exponent + 9 - fraction digits)
        let shift = exponent as i64 + 9 - frac_digits.len() as i64;
        let magnitude = if shift >= 0 {
            if scaled == 0 {
                0
            } else {
                let factor = pow10(shift).ok_or(QuantityError::OutOfRange)?;
                scaled.checked_mul(factor).ok_or(QuantityError::OutOfRange)?
            }
        } else {
            match pow10(-shift) {
                Some(divisor) => scaled / divisor + i128::from(scaled % divisor != 0),
                None => i128::from(scaled != 0),
            }
        };

        Ok(Self {
            nanos: if negative { -magnitude } else { magnitude },
            format,
        })
    }

    fn write_decimal(&self, f: &mut fmt::Formatter<'_>, exponent_form: bool) -> fmt::Result {
        for (suffix, exp) in DECIMAL_SUFFIXES {
            let divisor = 10_i128.pow((exp + 9) as u32);
            if self.nanos % divisor == 0 {
                let value = self.nanos / divisor;
                return if !exponent_form {
                    write!(f, "{}{}", value, suffix)
                } else if exp == 0 {
                    write!(f, "{}", value)
                } else {
                    write!(f, "{}e{}", value, exp)
                };
            }
        }
        unreachable!("every nano value is divisible by 10^0")
    }
}

fn parse_suffix(suffix: &str) -> Result<Suffix, QuantityError> {
    if let Some((_, exp)) = DECIMAL_SUFFIXES.iter().find(|(s, _)| *s == suffix) {
        return Ok(Suffix::Decimal(*exp));
    }
    if let Some(power) = BINARY_SUFFIXES
        .iter()
        .skip(1)
        .position(|s| *s == suffix)
    {
        return Ok(Suffix::Binary(power as u32 + 1));
    }
    if let Some(exp) = suffix
        .strip_prefix('e')
        .or_else(|| suffix.strip_prefix('E'))
    {
        let unsigned = exp.strip_prefix(['+', '-']).unwrap_or(exp);
        if !unsigned.is_empty() && unsigned.bytes().all(|b| b.is_ascii_digit()) {
            return exp
                .parse::<i32>()
                .map(Suffix::Exponent)
                .map_err(|_| QuantityError::OutOfRange);
        }
    }
    Err(QuantityError::InvalidSuffix(suffix.to_string()))
}

fn pow10(exp: i64) -> Option<i128> {
    u32::try_from(exp).ok().and_then(|e| 10_i128.checked_pow(e))
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanos == 0 {
            return write!(f, "0");
        }
        match self.format {
            QuantityFormat::BinarySI => match self.whole_units() {
                Some(units) => {
                    let power = (0..BINARY_SUFFIXES.len() as u32)
                        .rev()
                        .find(|p| units % 1024_i128.pow(*p) == 0)
                        .unwrap_or(0);
                    write!(
                        f,
                        "{}{}",
                        units / 1024_i128.pow(power),
                        BINARY_SUFFIXES[power as usize]
                    )
                }
                None => self.write_decimal(f, false),
            },
            QuantityFormat::DecimalSI => self.write_decimal(f, false),
            QuantityFormat::DecimalExponent => self.write_decimal(f, true),
        }
    }
}

/// Validate a request quantity and return it in canonical stored form
pub fn canonical_quantity(field: &str, value: &str) -> GatewayResult<StoredQuantity> {
    let quantity = Quantity::parse(value)
        .map_err(|e| GatewayError::validation(field, format!("{:?}: {}", value, e)))?;
    Ok(StoredQuantity(quantity.to_string()))
}
