use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::endpoint::parse_sip_uri;
use crate::phone::{validate_phone_number, PhoneNumbers};
use crate::ValidationError;

/// Characters a keypad entry (`Digits`) may contain.
pub const KEYPAD_CHARACTERS: &str = "0123456789#*";

/// Options attached to a field rule.
///
/// The one recognized option is `allow-empty`, which lets an absent or empty
/// value pass without running the rule.
///
/// # Examples
///
/// ```
/// use twiml_core::RuleOptions;
///
/// let options: RuleOptions = "allow-empty".parse().unwrap();
/// assert!(options.allow_empty());
/// assert!("".parse::<RuleOptions>().map(|o| !o.allow_empty()).unwrap());
/// assert!("strict".parse::<RuleOptions>().is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleOptions {
    allow_empty: bool,
}

impl RuleOptions {
    /// Option token that permits absent or empty values.
    pub const ALLOW_EMPTY: &'static str = "allow-empty";

    /// Options that permit absent or empty values.
    pub fn allowing_empty() -> Self {
        Self { allow_empty: true }
    }

    /// True if absent or empty values pass.
    pub fn allow_empty(&self) -> bool {
        self.allow_empty
    }
}

/// Error returned when an option string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOption(String);

impl fmt::Display for UnknownOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown validator option {:?}", self.0)
    }
}

impl std::error::Error for UnknownOption {}

impl FromStr for RuleOptions {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Ok(Self::default()),
            Self::ALLOW_EMPTY => Ok(Self::allowing_empty()),
            other => Err(UnknownOption(other.to_string())),
        }
    }
}

/// A rule applied to one form field.
///
/// `value` is `None` when the field was not sent and `Some("")` when it was
/// sent empty. Implementations must be pure: the same input always yields the
/// same outcome, so rules can be shared across threads and requests.
///
/// Plain functions with the matching signature are validators too:
///
/// ```
/// use twiml_core::{FieldValidator, RuleOptions, ValidationError};
///
/// fn call_sid(value: Option<&str>, _: &RuleOptions) -> Result<(), ValidationError> {
///     match value {
///         Some(v) if v.starts_with("CA") => Ok(()),
///         _ => Err(ValidationError::Format { reason: "expected a call SID" }),
///     }
/// }
///
/// let rule: fn(Option<&str>, &RuleOptions) -> Result<(), ValidationError> = call_sid;
/// assert!(rule.validate(Some("CA123"), &RuleOptions::default()).is_ok());
/// ```
pub trait FieldValidator: Send + Sync {
    /// Checks `value` under `options`.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] describing the first problem found.
    fn validate(&self, value: Option<&str>, options: &RuleOptions) -> Result<(), ValidationError>;
}

impl<F> FieldValidator for F
where
    F: Fn(Option<&str>, &RuleOptions) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, value: Option<&str>, options: &RuleOptions) -> Result<(), ValidationError> {
        self(value, options)
    }
}

/// Applies the required/allow-empty check shared by every built-in rule.
///
/// Returns the value to check further, or `None` if the rule is satisfied
/// by an allowed empty value.
fn require<'a>(
    value: Option<&'a str>,
    options: &RuleOptions,
) -> Result<Option<&'a str>, ValidationError> {
    match value {
        Some(v) if !v.is_empty() => Ok(Some(v)),
        _ if options.allow_empty() => Ok(None),
        _ => Err(ValidationError::Required),
    }
}

/// Accepts valid phone numbers.
#[derive(Debug, Clone)]
pub struct PhoneNumberRule {
    phones: Arc<dyn PhoneNumbers>,
}

impl PhoneNumberRule {
    /// Creates the rule over a phone-number capability.
    pub fn new(phones: Arc<dyn PhoneNumbers>) -> Self {
        Self { phones }
    }
}

impl FieldValidator for PhoneNumberRule {
    fn validate(&self, value: Option<&str>, options: &RuleOptions) -> Result<(), ValidationError> {
        match require(value, options)? {
            Some(v) => validate_phone_number(self.phones.as_ref(), v).map(|_| ()),
            None => Ok(()),
        }
    }
}

/// Accepts structurally valid `sip:`/`sips:` URIs.
///
/// This is the strict gate: malformed URIs are errors, not a silent
/// "not a routing endpoint".
#[derive(Debug, Clone, Copy, Default)]
pub struct SipUriRule;

impl FieldValidator for SipUriRule {
    fn validate(&self, value: Option<&str>, options: &RuleOptions) -> Result<(), ValidationError> {
        match require(value, options)? {
            Some(v) => parse_sip_uri(v).map(|_| ()),
            None => Ok(()),
        }
    }
}

/// Accepts a phone number or a SIP URI, in that order.
///
/// When both fail the phone-number error is reported.
#[derive(Debug, Clone)]
pub struct EndpointRule {
    phone: PhoneNumberRule,
}

impl EndpointRule {
    /// Creates the rule over a phone-number capability.
    pub fn new(phones: Arc<dyn PhoneNumbers>) -> Self {
        Self {
            phone: PhoneNumberRule::new(phones),
        }
    }
}

impl FieldValidator for EndpointRule {
    fn validate(&self, value: Option<&str>, options: &RuleOptions) -> Result<(), ValidationError> {
        let phone_err = match self.phone.validate(value, options) {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        match SipUriRule.validate(value, options) {
            Ok(()) => Ok(()),
            Err(_) => Err(phone_err),
        }
    }
}

/// Accepts values made only of whitelisted characters.
///
/// # Examples
///
/// ```
/// use twiml_core::{CharacterWhitelist, FieldValidator, RuleOptions, ValidationError};
///
/// let keypad = CharacterWhitelist::keypad();
/// assert!(keypad.validate(Some("123#*0"), &RuleOptions::default()).is_ok());
/// assert_eq!(
///     keypad.validate(Some("12a3"), &RuleOptions::default()),
///     Err(ValidationError::Character { character: 'a' })
/// );
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CharacterWhitelist {
    allowed: &'static str,
}

impl CharacterWhitelist {
    /// Creates a whitelist of the characters in `allowed`.
    pub const fn new(allowed: &'static str) -> Self {
        Self { allowed }
    }

    /// Whitelist for DTMF keypad entries: digits, `#` and `*`.
    pub const fn keypad() -> Self {
        Self::new(KEYPAD_CHARACTERS)
    }
}

impl FieldValidator for CharacterWhitelist {
    fn validate(&self, value: Option<&str>, options: &RuleOptions) -> Result<(), ValidationError> {
        let Some(v) = require(value, options)? else {
            return Ok(());
        };

        match v.chars().find(|c| !self.allowed.contains(*c)) {
            Some(character) => Err(ValidationError::Character { character }),
            None => Ok(()),
        }
    }
}
