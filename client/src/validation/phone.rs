use shared::fold_digits;
use thiserror::Error;

pub const PHONE_LENGTH: usize = 11;
pub const PHONE_PREFIX: &str = "09";

pub const PHONE_REQUIRED_MESSAGE: &str = "Phone number is required";
pub const PHONE_FORMAT_MESSAGE: &str = "Phone number must be 11 digits and start with 09";

/// Why a candidate phone number was rejected before any remote check
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhoneFormatError {
    #[error("{}", PHONE_REQUIRED_MESSAGE)]
    Empty,
    #[error("{}", PHONE_FORMAT_MESSAGE)]
    Malformed,
}

/// Normalize `raw` and check it has the shape `09` followed by nine digits.
/// Returns the normalized ASCII form.
pub fn validate_format(raw: &str) -> Result<String, PhoneFormatError> {
    let phone = fold_digits(raw);
    if phone.is_empty() {
        return Err(PhoneFormatError::Empty);
    }

    let well_formed = phone.len() == PHONE_LENGTH
        && phone.starts_with(PHONE_PREFIX)
        && phone.bytes().all(|b| b.is_ascii_digit());
    if !well_formed {
        return Err(PhoneFormatError::Malformed);
    }
    Ok(phone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_numbers() {
        assert_eq!(validate_format("09123823886").unwrap(), "09123823886");
        assert_eq!(validate_format("  09123823886 ").unwrap(), "09123823886");
    }

    #[test]
    fn test_persian_and_ascii_agree() {
        let persian = validate_format("۰۹۱۲۳۸۲۳۸۸۶");
        let arabic = validate_format("٠٩١٢٣٨٢٣٨٨٦");
        assert_eq!(persian, validate_format("09123823886"));
        assert_eq!(arabic, persian);
    }

    #[test]
    fn test_empty_is_required() {
        assert_eq!(validate_format(""), Err(PhoneFormatError::Empty));
        assert_eq!(validate_format("   "), Err(PhoneFormatError::Empty));
        assert_eq!(PhoneFormatError::Empty.to_string(), PHONE_REQUIRED_MESSAGE);
    }

    #[test]
    fn test_malformed_numbers() {
        for raw in [
            "0912",
            "091238238861",
            "08123823886",
            "19123823886",
            "0912382388a",
            "0912-382388",
            "+9891238238",
        ] {
            assert_eq!(validate_format(raw), Err(PhoneFormatError::Malformed), "{}", raw);
        }
    }

    #[test]
    fn test_format_message_names_length() {
        let message = validate_format("0912").unwrap_err().to_string();
        assert!(message.contains("11 digits"));
    }

    #[test]
    fn test_folded_digits_with_trailing_letter() {
        assert_eq!(validate_format("09١٢٣٨٢٣٨٨x"), Err(PhoneFormatError::Malformed));
    }
}
