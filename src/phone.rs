//! Phone-number capability.
//!
//! E.164 parsing and validation are delegated to the `phonenumber` crate
//! behind the [`PhoneNumbers`] trait, so callers can swap in their own
//! numbering plan data or a test double.

use std::fmt;

use phonenumber::country;
use phonenumber::{Mode, PhoneNumber};

use crate::ValidationError;

/// Parse, validate and format phone numbers for a default region.
pub trait PhoneNumbers: Send + Sync + fmt::Debug {
    /// Parses `raw`, interpreting national formats against the default region.
    ///
    /// Returns `None` if `raw` is not a phone number at all.
    fn parse(&self, raw: &str) -> Option<PhoneNumber>;

    /// Returns true if `number` is a valid, dialable number.
    fn is_valid(&self, number: &PhoneNumber) -> bool;

    /// Formats `number` as E.164 (`+CCNNNN...`).
    fn format_e164(&self, number: &PhoneNumber) -> String;
}

/// The default [`PhoneNumbers`] implementation, backed by libphonenumber
/// metadata from the `phonenumber` crate.
#[derive(Debug, Clone, Copy)]
pub struct LibPhoneNumbers {
    region: country::Id,
}

impl LibPhoneNumbers {
    /// Creates a capability that resolves national numbers against `region`.
    pub fn new(region: country::Id) -> Self {
        Self { region }
    }

    /// Returns the default region.
    pub fn region(&self) -> country::Id {
        self.region
    }
}

impl Default for LibPhoneNumbers {
    fn default() -> Self {
        Self::new(country::Id::US)
    }
}

impl PhoneNumbers for LibPhoneNumbers {
    fn parse(&self, raw: &str) -> Option<PhoneNumber> {
        phonenumber::parse(Some(self.region), raw).ok()
    }

    fn is_valid(&self, number: &PhoneNumber) -> bool {
        number.is_valid()
    }

    fn format_e164(&self, number: &PhoneNumber) -> String {
        number.format().mode(Mode::E164).to_string()
    }
}

/// Checks that `raw` parses to a valid number.
pub(crate) fn validate_phone_number(
    phones: &dyn PhoneNumbers,
    raw: &str,
) -> Result<PhoneNumber, ValidationError> {
    let number = phones
        .parse(raw)
        .ok_or(ValidationError::format("invalid phone number"))?;

    if !phones.is_valid(&number) {
        return Err(ValidationError::format("invalid phone number"));
    }

    Ok(number)
}

/// Formats a phone number in E.164.
///
/// # Errors
///
/// Returns a [`ValidationError::Format`] if `raw` is not a valid number.
///
/// # Examples
///
/// ```
/// use twiml_core::{format_number, LibPhoneNumbers};
///
/// let phones = LibPhoneNumbers::default();
/// assert_eq!(format_number(&phones, "(800) 564-2365").unwrap(), "+18005642365");
/// assert!(format_number(&phones, "not a number").is_err());
/// ```
pub fn format_number(phones: &dyn PhoneNumbers, raw: &str) -> Result<String, ValidationError> {
    let number = validate_phone_number(phones, raw)?;
    Ok(phones.format_e164(&number))
}
