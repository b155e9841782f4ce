//! Fixed-point amounts for balances, share sizes and limit prices.
//!
//! # Scales
//!
//! - [`Quantity`]: 1e-6. Share sizes and every asset balance, cash included.
//! - [`Price`]: 1e-4. Limit price, in cash units per share.
//!
//! Both wrap a raw `i64`. There is no `From<i64>` impl: callers use
//! `from_raw` when they already hold an integer at the right scale, so a raw
//! integer never silently becomes money.
//!
//! # Parsing
//!
//! Amounts are parsed from decimal text without going through floats. Text
//! with more fractional digits than the scale is rejected, never rounded, so a
//! parsed amount is exactly what the client sent.
//!
//! # Notional
//!
//! `price × size` lands at 1e-10 and is rounded HALF_UP back to the
//! [`Quantity`] scale. Overflow is reported, not wrapped.

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::OmsError;

/// Fractional digits carried by [`Quantity`].
pub const QUANTITY_SCALE: u32 = 6;

/// Fractional digits carried by [`Price`].
pub const PRICE_SCALE: u32 = 4;

// ---------------------------------------------------------------------------
// Quantity
// ---------------------------------------------------------------------------

/// A share size or balance at 1e-6 scale. `1 XYZ = Quantity::from_raw(1_000_000)`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);
    pub const MAX: Quantity = Quantity(i64::MAX);

    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Quantity(raw)
    }

    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Whole units (e.g. `from_units(5)` is five shares). `None` on overflow.
    pub fn from_units(units: i64) -> Option<Self> {
        units.checked_mul(scale_factor(QUANTITY_SCALE)).map(Quantity)
    }

    /// Parse decimal text; `field` names the value in error messages.
    pub fn parse(s: &str, field: &str) -> Result<Self, OmsError> {
        parse_scaled(s, QUANTITY_SCALE, field).map(Quantity)
    }

    #[inline]
    pub fn checked_add(self, rhs: Quantity) -> Option<Quantity> {
        self.0.checked_add(rhs.0).map(Quantity)
    }

    #[inline]
    pub fn checked_sub(self, rhs: Quantity) -> Option<Quantity> {
        self.0.checked_sub(rhs.0).map(Quantity)
    }

    #[inline]
    pub fn saturating_add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0.saturating_add(rhs.0))
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_scaled(f, self.0, QUANTITY_SCALE)
    }
}

// ---------------------------------------------------------------------------
// Price
// ---------------------------------------------------------------------------

/// A limit price at 1e-4 scale. `10.00 TRY = Price::from_raw(100_000)`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i64);

impl Price {
    pub const ZERO: Price = Price(0);

    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Price(raw)
    }

    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Whole cash units per share. `None` on overflow.
    pub fn from_units(units: i64) -> Option<Self> {
        units.checked_mul(scale_factor(PRICE_SCALE)).map(Price)
    }

    pub fn parse(s: &str, field: &str) -> Result<Self, OmsError> {
        parse_scaled(s, PRICE_SCALE, field).map(Price)
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Cash value of `size` shares at this price, rounded HALF_UP to the
    /// quantity scale. `None` when the result does not fit.
    pub fn notional(self, size: Quantity) -> Option<Quantity> {
        let product = i128::from(self.0) * i128::from(size.raw());
        let divisor = i128::from(scale_factor(PRICE_SCALE));
        let quotient = product / divisor;
        let remainder = product % divisor;
        let rounded = if remainder.abs() * 2 >= divisor {
            quotient + product.signum()
        } else {
            quotient
        };
        i64::try_from(rounded).ok().map(Quantity)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_scaled(f, self.0, PRICE_SCALE)
    }
}

// ---------------------------------------------------------------------------
// Serde: decimal strings out, strings or numbers in
// ---------------------------------------------------------------------------

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = deserializer.deserialize_any(DecimalTextVisitor)?;
        Quantity::parse(&text, "quantity").map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = deserializer.deserialize_any(DecimalTextVisitor)?;
        Price::parse(&text, "price").map_err(de::Error::custom)
    }
}

/// Collects a JSON string or number as decimal text.
struct DecimalTextVisitor;

impl<'de> de::Visitor<'de> for DecimalTextVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal number or decimal string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
        Ok(float_to_decimal_text(v))
    }
}

/// Render a float as plain decimal text (never exponent notation).
///
/// `Display` for `f64` prints the shortest text that round-trips, so `0.1`
/// stays `"0.1"` and the scale check sees the digits the client wrote.
pub fn float_to_decimal_text(v: f64) -> String {
    format!("{v}")
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const fn scale_factor(scale: u32) -> i64 {
    10_i64.pow(scale)
}

fn write_scaled(f: &mut fmt::Formatter<'_>, raw: i64, scale: u32) -> fmt::Result {
    let factor = scale_factor(scale);
    let units = raw / factor;
    let frac = (raw % factor).abs();
    let width = scale as usize;
    // Truncating division loses the sign for -1 < value < 0.
    if raw < 0 && units == 0 {
        write!(f, "-0.{frac:0width$}")
    } else {
        write!(f, "{units}.{frac:0width$}")
    }
}

/// Parse decimal text into an integer at `scale` fractional digits.
fn parse_scaled(s: &str, scale: u32, field: &str) -> Result<i64, OmsError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(OmsError::Validation(format!("{field} is required")));
    }

    let (negative, body) = match s.as_bytes()[0] {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let malformed = || OmsError::Validation(format!("{field} is not a valid decimal number"));

    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, f),
        None => (body, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(malformed());
    }
    if !int_part.bytes().all(|c| c.is_ascii_digit()) || !frac_part.bytes().all(|c| c.is_ascii_digit())
    {
        return Err(malformed());
    }
    if frac_part.len() > scale as usize {
        return Err(OmsError::Validation(format!(
            "{field} scale exceeds {scale} decimals"
        )));
    }

    let out_of_range = || OmsError::Validation(format!("{field} is out of range"));

    let int_val: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| out_of_range())?
    };

    let mut frac_digits = frac_part.to_string();
    while frac_digits.len() < scale as usize {
        frac_digits.push('0');
    }
    let frac_val: i64 = if frac_digits.is_empty() {
        0
    } else {
        frac_digits.parse().map_err(|_| malformed())?
    };

    let magnitude = int_val
        .checked_mul(scale_factor(scale))
        .and_then(|v| v.checked_add(frac_val))
        .ok_or_else(out_of_range)?;

    Ok(if negative { -magnitude } else { magnitude })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
