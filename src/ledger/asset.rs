//! Asset value handling
//!
//! Quantities travel through the relay as strings like `"1.0000 EOS"`.
//! They are validated before anything is broadcast so a malformed stake or
//! transfer amount fails in-band instead of at the chain.

use std::fmt;
use std::str::FromStr;

use crate::error::{RelayError, Result};

/// Maximum number of decimal places a symbol may carry.
pub const MAX_PRECISION: u32 = 18;

/// A parsed asset quantity: integer amount scaled by the symbol precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub amount: i64,
    pub precision: u32,
    pub symbol: String,
}

impl FromStr for Asset {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |detail: &str| RelayError::InvalidAsset(format!("'{}': {}", s, detail));

        let mut parts = s.split_whitespace();
        let quantity = parts.next().ok_or_else(|| invalid("missing amount"))?;
        let symbol = parts.next().ok_or_else(|| invalid("missing symbol"))?;
        if parts.next().is_some() {
            return Err(invalid("unexpected trailing tokens"));
        }

        if symbol.is_empty()
            || symbol.len() > 7
            || !symbol.bytes().all(|b| b.is_ascii_uppercase())
        {
            return Err(invalid("symbol must be 1-7 uppercase letters"));
        }

        let (negative, digits) = match quantity.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, quantity),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("amount is not a number"));
        }
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("fractional part is not a number"));
        }
        let precision = frac.len() as u32;
        if precision > MAX_PRECISION {
            return Err(invalid("too many decimal places"));
        }

        let mut amount: i64 = 0;
        for b in whole.bytes().chain(frac.bytes()) {
            amount = amount
                .checked_mul(10)
                .and_then(|a| a.checked_add((b - b'0') as i64))
                .ok_or_else(|| invalid("amount overflows"))?;
        }
        if negative {
            amount = -amount;
        }

        Ok(Asset {
            amount,
            precision,
            symbol: symbol.to_string(),
        })
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let scale = 10i64.pow(self.precision);
        let magnitude = self.amount.unsigned_abs();
        let whole = magnitude / scale as u64;
        let frac = magnitude % scale as u64;
        let sign = if self.amount < 0 { "-" } else { "" };
        if self.precision == 0 {
            write!(f, "{}{} {}", sign, whole, self.symbol)
        } else {
            write!(
                f,
                "{}{}.{:0width$} {}",
                sign,
                whole,
                frac,
                self.symbol,
                width = self.precision as usize
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard_quantity() {
        let asset: Asset = "1.0000 EOS".parse().unwrap();
        assert_eq!(asset.amount, 10000);
        assert_eq!(asset.precision, 4);
        assert_eq!(asset.symbol, "EOS");
    }

    #[test]
    fn test_display_round_trip() {
        for s in ["1.0000 EOS", "0.5000 EOS", "12.34 ABC", "7 SYS", "-3.140 PI"] {
            let asset: Asset = s.parse().unwrap();
            assert_eq!(asset.to_string(), s);
        }
    }

    #[test]
    fn test_negative_amount() {
        let asset: Asset = "-1.0000 EOS".parse().unwrap();
        assert_eq!(asset.amount, -10000);
    }

    #[test]
    fn test_invalid_quantities() {
        assert!("EOS".parse::<Asset>().is_err());
        assert!("1.0000".parse::<Asset>().is_err());
        assert!("1.0000 eos".parse::<Asset>().is_err());
        assert!("1.0000 TOOLONGSYM".parse::<Asset>().is_err());
        assert!("one EOS".parse::<Asset>().is_err());
        assert!("1.0 0 EOS".parse::<Asset>().is_err());
        assert!("1.0000000000000000000 EOS".parse::<Asset>().is_err());
        assert!(".5 EOS".parse::<Asset>().is_err());
    }
}
