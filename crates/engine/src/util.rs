//! Internal helpers for input validation.
//!
//! These utilities are **not** part of the public API. They centralize the
//! checks shared by the write operations so every entry point rejects the same
//! inputs the same way.

use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

/// Parse a UUID received from a caller and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Fresh record id.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

pub(crate) fn ensure_positive(amount: Money, label: &str) -> ResultEngine<()> {
    if !amount.is_positive() {
        return Err(EngineError::InvalidAmount(format!(
            "{label} must be > 0"
        )));
    }
    if amount > Money::MAX {
        return Err(EngineError::InvalidAmount(format!(
            "{label} must be <= {}",
            Money::MAX
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_text_drops_blank() {
        assert_eq!(normalize_optional_text(Some("  ")), None);
        assert_eq!(
            normalize_optional_text(Some(" taxi ")),
            Some("taxi".to_string())
        );
        assert_eq!(normalize_optional_text(None), None);
    }

    #[test]
    fn required_name_rejects_blank() {
        assert!(matches!(
            normalize_required_name("\t", "group name"),
            Err(EngineError::InvalidInput(_))
        ));
        assert_eq!(normalize_required_name(" Rome ", "group name").unwrap(), "Rome");
    }

    #[test]
    fn parse_uuid_labels_errors() {
        let err = parse_uuid("nope", "settlement").unwrap_err();
        assert_eq!(err, EngineError::InvalidId("invalid settlement id".to_string()));
        assert!(parse_uuid(&new_id(), "settlement").is_ok());
    }

    #[test]
    fn positive_amount_is_bounded() {
        assert!(ensure_positive(Money::MAX, "amount").is_ok());
        assert!(matches!(
            ensure_positive(Money::new(Money::MAX.cents() + 1), "amount"),
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(matches!(
            ensure_positive(Money::ZERO, "amount"),
            Err(EngineError::InvalidAmount(_))
        ));
    }
}
