pub mod phone;
pub mod uniqueness;

pub use phone::{validate_format, PhoneFormatError, PHONE_FORMAT_MESSAGE, PHONE_REQUIRED_MESSAGE};
pub use uniqueness::{PhoneCheckCache, PhoneFieldSession, PhoneValidation};
