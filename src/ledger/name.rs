//! EOS account-name encoding
//!
//! Names are up to 12 characters from the alphabet `.12345a-z`, packed
//! big-endian into a u64 at five bits per character (a 13th character, if
//! present, is limited to the first 16 symbols and occupies the low four
//! bits).

use crate::error::{RelayError, Result};

const NAME_ALPHABET: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

fn char_to_symbol(c: u8) -> Option<u64> {
    match c {
        b'.' => Some(0),
        b'1'..=b'5' => Some((c - b'1') as u64 + 1),
        b'a'..=b'z' => Some((c - b'a') as u64 + 6),
        _ => None,
    }
}

/// Encode an account name into its on-chain u64 representation.
pub fn name_to_u64(s: &str) -> Result<u64> {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return Err(RelayError::InvalidName("name is empty".to_string()));
    }
    if bytes.len() > 13 {
        return Err(RelayError::InvalidName(format!(
            "'{}' is longer than 13 characters",
            s
        )));
    }

    let mut value: u64 = 0;
    for (i, &c) in bytes.iter().enumerate() {
        let symbol = char_to_symbol(c).ok_or_else(|| {
            RelayError::InvalidName(format!("'{}' contains invalid character '{}'", s, c as char))
        })?;
        if i < 12 {
            value |= (symbol & 0x1f) << (64 - 5 * (i + 1));
        } else {
            // 13th character only has four bits available
            if symbol > 0x0f {
                return Err(RelayError::InvalidName(format!(
                    "'{}' has an invalid 13th character '{}'",
                    s, c as char
                )));
            }
            value |= symbol & 0x0f;
        }
    }
    Ok(value)
}

/// Decode an on-chain u64 back into its textual name, trailing dots
/// trimmed.
pub fn u64_to_name(value: u64) -> String {
    let mut chars = [b'.'; 13];
    let mut v = value;
    for i in (0..13).rev() {
        let symbol = if i == 12 {
            (v & 0x0f) as usize
        } else {
            (v & 0x1f) as usize
        };
        chars[i] = NAME_ALPHABET[symbol];
        v >>= if i == 12 { 4 } else { 5 };
    }
    let name: String = chars.iter().map(|&c| c as char).collect();
    name.trim_end_matches('.').to_string()
}

/// Validate a name for use as a newly created account. The chain restricts
/// plain `newaccount` names to at most 12 characters.
pub fn validate_new_account(s: &str) -> Result<()> {
    if s.len() > 12 {
        return Err(RelayError::InvalidName(format!(
            "new account name '{}' is longer than 12 characters",
            s
        )));
    }
    name_to_u64(s).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for name in ["eosio", "eosio.token", "cptblackbill", "a", "abc.def", "zzzzzzzzzzzz"] {
            let value = name_to_u64(name).unwrap();
            assert_eq!(u64_to_name(value), name, "round trip failed for {}", name);
        }
    }

    #[test]
    fn test_thirteenth_character() {
        // 13th character limited to the 16 low symbols: '.', '1'-'5', 'a'-'j'
        let value = name_to_u64("zzzzzzzzzzzzj").unwrap();
        assert_eq!(u64_to_name(value), "zzzzzzzzzzzzj");
        assert!(name_to_u64("zzzzzzzzzzzzz").is_err());
    }

    #[test]
    fn test_invalid_names() {
        assert!(name_to_u64("").is_err());
        assert!(name_to_u64("Account").is_err());
        assert!(name_to_u64("acc0unt").is_err());
        assert!(name_to_u64("acc-ount").is_err());
        assert!(name_to_u64("abcdefghijklmn").is_err());
    }

    #[test]
    fn test_trailing_dots_trimmed() {
        let value = name_to_u64("abc").unwrap();
        assert_eq!(u64_to_name(value), "abc");
        // dots in the middle survive
        let value = name_to_u64("a.c").unwrap();
        assert_eq!(u64_to_name(value), "a.c");
    }

    #[test]
    fn test_ordering_follows_alphabet() {
        // '.' < digits < letters in the packed representation
        let dot = name_to_u64("a.a").unwrap();
        let digit = name_to_u64("a1a").unwrap();
        let letter = name_to_u64("aaa").unwrap();
        assert!(dot < digit);
        assert!(digit < letter);
    }

    #[test]
    fn test_validate_new_account() {
        assert!(validate_new_account("alice").is_ok());
        assert!(validate_new_account("zzzzzzzzzzzz").is_ok());
        // 13 characters are representable but not creatable
        assert!(validate_new_account("zzzzzzzzzzzzj").is_err());
        assert!(validate_new_account("UPPER").is_err());
    }
}
