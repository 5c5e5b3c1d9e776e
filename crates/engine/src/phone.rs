//! Phone number normalisation.
//!
//! Pending participants are matched to newly registered users by phone
//! number, so both sides must be compared in one canonical form (E.164:
//! `+` followed by 8 to 15 digits).

use unicode_normalization::UnicodeNormalization;

use crate::{EngineError, ResultEngine};

const MIN_DIGITS: usize = 8;
const MAX_DIGITS: usize = 15;

/// Normalises a phone number into E.164.
///
/// - full-width/compatibility digits are folded with NFKC
/// - spaces, dots, dashes, slashes and parentheses are dropped
/// - a leading `00` becomes `+`
/// - numbers without a country prefix get `default_country_code` (digits
///   only, e.g. `"39"`), dropping a single national trunk `0`
///
/// ```rust
/// use engine::normalize_phone;
///
/// assert_eq!(normalize_phone("+39 333 123-4567", "39").unwrap(), "+393331234567");
/// assert_eq!(normalize_phone("0039 333 1234567", "39").unwrap(), "+393331234567");
/// assert_eq!(normalize_phone("333 1234567", "39").unwrap(), "+393331234567");
/// ```
pub fn normalize_phone(raw: &str, default_country_code: &str) -> ResultEngine<String> {
    let invalid = || EngineError::InvalidInput(format!("invalid phone number: {raw}"));

    let folded: String = raw.nfkc().collect();
    let mut compact = String::with_capacity(folded.len());
    for ch in folded.trim().chars() {
        match ch {
            '0'..='9' => compact.push(ch),
            '+' if compact.is_empty() => compact.push(ch),
            ' ' | '.' | '-' | '/' | '(' | ')' => {}
            _ => return Err(invalid()),
        }
    }

    let digits = if let Some(rest) = compact.strip_prefix('+') {
        rest.to_string()
    } else if let Some(rest) = compact.strip_prefix("00") {
        rest.to_string()
    } else {
        let country = default_country_code.trim().trim_start_matches('+');
        if country.is_empty() || !country.chars().all(|c| c.is_ascii_digit()) {
            return Err(EngineError::InvalidInput(format!(
                "invalid default country code: {default_country_code}"
            )));
        }
        let national = compact.strip_prefix('0').unwrap_or(&compact);
        format!("{country}{national}")
    };

    if !(MIN_DIGITS..=MAX_DIGITS).contains(&digits.len())
        || !digits.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    Ok(format!("+{digits}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_formatting() {
        assert_eq!(
            normalize_phone("(+44) 20.7946-0958", "39").unwrap(),
            "+442079460958"
        );
    }

    #[test]
    fn national_trunk_zero_is_dropped() {
        assert_eq!(normalize_phone("020 7946 0958", "44").unwrap(), "+442079460958");
    }

    #[test]
    fn folds_full_width_digits() {
        assert_eq!(
            normalize_phone("＋３９３３３１２３４５６７", "1").unwrap(),
            "+393331234567"
        );
    }

    #[test]
    fn rejects_letters_and_short_numbers() {
        assert!(normalize_phone("call me", "39").is_err());
        assert!(normalize_phone("+39 12", "39").is_err());
        assert!(normalize_phone("1+2345678901", "39").is_err());
        assert!(normalize_phone("3331234567", "x").is_err());
    }

    #[test]
    fn same_number_different_spellings_match() {
        let a = normalize_phone("+39 333 1234567", "39").unwrap();
        let b = normalize_phone("0039-333-1234567", "39").unwrap();
        let c = normalize_phone("3331234567", "39").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }
}
