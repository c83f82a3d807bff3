//! Canonical value of resource quantities.
//!
//! The API server re-serializes quantities (`1000m` comes back as `1`,
//! `1024Mi` as `1Gi`), so requests and limits are compared by value.
//! Values are held as signed nano-units, rounded up like the API server does.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

const NANO_EXPONENT: u32 = 9;

enum Multiplier {
    Binary(u32),
    Decimal(i32),
}

fn multiplier(suffix: &str) -> Option<Multiplier> {
    let multiplier = match suffix {
        "" => Multiplier::Decimal(0),
        "n" => Multiplier::Decimal(-9),
        "u" => Multiplier::Decimal(-6),
        "m" => Multiplier::Decimal(-3),
        "k" => Multiplier::Decimal(3),
        "M" => Multiplier::Decimal(6),
        "G" => Multiplier::Decimal(9),
        "T" => Multiplier::Decimal(12),
        "P" => Multiplier::Decimal(15),
        "E" => Multiplier::Decimal(18),
        "Ki" => Multiplier::Binary(10),
        "Mi" => Multiplier::Binary(20),
        "Gi" => Multiplier::Binary(30),
        "Ti" => Multiplier::Binary(40),
        "Pi" => Multiplier::Binary(50),
        "Ei" => Multiplier::Binary(60),
        _ => {
            // decimal exponent form: 1e3, 5E-2
            let exponent = suffix.strip_prefix(|c: char| c == 'e' || c == 'E')?;
            if exponent.is_empty() {
                return None;
            }
            Multiplier::Decimal(exponent.parse().ok()?)
        }
    };
    Some(multiplier)
}

fn pow10(exponent: u32) -> Option<i128> {
    10i128.checked_pow(exponent)
}

/// Parse a quantity string into nano-units. `None` if malformed or out of range.
#[must_use]
pub fn parse_nanos(value: &str) -> Option<i128> {
    let value = value.trim();
    let (negative, unsigned) = match value.as_bytes().first()? {
        b'-' => (true, &value[1..]),
        b'+' => (false, &value[1..]),
        _ => (false, value),
    };

    let number_end = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(number_end);

    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if fraction.contains('.') {
        return None;
    }

    let mut numerator: i128 = 0;
    for digit in whole.bytes().chain(fraction.bytes()) {
        numerator = numerator
            .checked_mul(10)?
            .checked_add(i128::from(digit - b'0'))?;
    }
    let mut denominator = pow10(u32::try_from(fraction.len()).ok()?)?;

    match multiplier(suffix)? {
        Multiplier::Binary(shift) => {
            numerator = numerator.checked_mul(1i128 << shift)?;
            numerator = numerator.checked_mul(pow10(NANO_EXPONENT)?)?;
        }
        Multiplier::Decimal(exponent) => {
            let scale = exponent.checked_add(NANO_EXPONENT as i32)?;
            if scale >= 0 {
                numerator = numerator.checked_mul(pow10(scale.unsigned_abs())?)?;
            } else {
                denominator = denominator.checked_mul(pow10(scale.unsigned_abs())?)?;
            }
        }
    }

    let nanos = numerator / denominator + i128::from(numerator % denominator != 0);
    Some(if negative { -nanos } else { nanos })
}

/// Compare two quantities by value. `Err` carries the unparseable input.
pub fn quantities_equal<'a>(a: &'a Quantity, b: &'a Quantity) -> Result<bool, &'a str> {
    let left = parse_nanos(&a.0).ok_or(a.0.as_str())?;
    let right = parse_nanos(&b.0).ok_or(b.0.as_str())?;
    Ok(left == right)
}
