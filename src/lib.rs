//! Authentication and field validation for Twilio voice webhooks.
//!
//! Every callback the provider sends is signed. This crate checks that
//! signature and the identity fields of the callback before any of its data
//! reaches application code:
//!
//! - **Canonicalization**: [`CanonicalMessage`] rebuilds the exact string
//!   the provider signed from the public URL and the sorted form fields
//! - **Signature check**: [`SignatureVerifier`] compares
//!   `base64(HMAC-SHA1(auth_token, message))` in constant time
//! - **Endpoint parsing**: [`EndpointParser`] tells phone numbers from
//!   provider SIP routing URIs and extracts their domain and region
//! - **Field rules**: [`ValidatorRegistry`] maps form fields to
//!   [`FieldValidator`]s
//!
//! [`RequestValidator`] chains these steps and yields [`RequestValues`]
//! only when all of them pass.
//!
//! # Examples
//!
//! ```
//! use twiml_core::{CallbackRequest, FormFields, HttpMethod, RequestValidator, ValidatorConfig};
//!
//! let config = ValidatorConfig::new("https://voice.example.com", "12345");
//! let validator = RequestValidator::new(&config).expect("valid config");
//!
//! let fields = [
//!     ("CallSid", "CA1234567890ABCDE"),
//!     ("From", "+18005642365"),
//!     ("To", "sips:8005642365@acme.sip.us1.twilio.com:5061"),
//! ];
//! let form: FormFields = fields.iter().copied().collect();
//!
//! let request = CallbackRequest::new(HttpMethod::Post, "/voice")
//!     .header("X-Twilio-Signature", validator.sign("/voice", &form))
//!     .form(fields);
//!
//! let values = validator.validate(&request).expect("authentic callback");
//! let to = values.to(validator.endpoint_parser());
//! assert!(to.is_routing_uri());
//! assert_eq!(to.routing_domain(), "acme");
//!
//! // Tampering with any field breaks the signature.
//! let forged = CallbackRequest::new(HttpMethod::Post, "/voice")
//!     .header("X-Twilio-Signature", validator.sign("/voice", &form))
//!     .form([("CallSid", "CA1234567890ABCDE"), ("From", "+14158675309")]);
//! assert!(validator.validate(&forged).is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod canonical;
mod config;
mod endpoint;
mod error;
mod phone;
mod pipeline;
mod registry;
mod request;
mod secret;
mod signature;
mod tainted;
mod validator;
mod values;

#[cfg(test)]
mod test_utils;

pub use canonical::CanonicalMessage;
pub use config::ValidatorConfig;
pub use endpoint::{
    parse_sip_uri, EndpointParser, ParsedEndpoint, SipScheme, SipUri, PROVIDER_DOMAIN,
    ROUTING_MARKER,
};
pub use error::{AuthFailure, Error, FieldError, ValidationError, ValidationErrorKind, ValueError};
pub use phone::{format_number, LibPhoneNumbers, PhoneNumbers};
pub use pipeline::RequestValidator;
pub use registry::{FieldRule, ValidatorRegistry, ValidatorRegistryBuilder};
pub use request::{CallbackRequest, FormFields, HttpMethod, IncomingRequest, FORM_CONTENT_TYPE};
pub use secret::Secret;
pub use signature::{SignatureVerifier, SIGNATURE_HEADER};
pub use tainted::Tainted;
pub use validator::{
    CharacterWhitelist, EndpointRule, FieldValidator, PhoneNumberRule, RuleOptions, SipUriRule,
    UnknownOption, KEYPAD_CHARACTERS,
};
pub use values::RequestValues;

/// Re-exported so callers can name regions without depending on
/// `phonenumber` directly.
pub use phonenumber::country::Id as Region;
