use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;

use crate::canonical::CanonicalMessage;
use crate::error::{AuthFailure, Error};
use crate::request::HttpMethod;
use crate::Secret;

type HmacSha1 = Hmac<Sha1>;

/// Header in which the provider sends the request signature.
pub const SIGNATURE_HEADER: &str = "X-Twilio-Signature";

/// Checks `X-Twilio-Signature` values against the account auth token.
///
/// The signature is `base64(HMAC-SHA1(auth_token, canonical_message))`.
/// Verification is all-or-nothing and the digest comparison runs in
/// constant time.
///
/// # Examples
///
/// ```
/// use twiml_core::{CanonicalMessage, FormFields, HttpMethod, Secret, SignatureVerifier};
///
/// let verifier = SignatureVerifier::new(&Secret::new("12345".to_string())).unwrap();
/// let form: FormFields = [("Digits", "1234")].into_iter().collect();
/// let message = CanonicalMessage::build("https://example.com", "/voice", &form);
///
/// let signature = verifier.sign(&message);
/// assert!(verifier.verify(&HttpMethod::Post, &message, &[signature]).is_ok());
/// ```
#[derive(Clone)]
pub struct SignatureVerifier {
    keyed: HmacSha1,
}

impl SignatureVerifier {
    /// Prepares a verifier keyed with `auth_token`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the token is empty.
    pub fn new(auth_token: &Secret<String>) -> Result<Self, Error> {
        if auth_token.is_empty() {
            return Err(Error::config("auth token must not be empty"));
        }
        let keyed = HmacSha1::new_from_slice(auth_token.expose_secret().as_bytes())
            .map_err(|_| Error::config("auth token cannot key HMAC-SHA1"))?;

        Ok(Self { keyed })
    }

    fn digest(&self, message: &CanonicalMessage) -> Vec<u8> {
        let mut mac = self.keyed.clone();
        mac.update(message.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Computes the base64 signature the provider would send for `message`.
    pub fn sign(&self, message: &CanonicalMessage) -> String {
        STANDARD.encode(self.digest(message))
    }

    /// Verifies a request signature.
    ///
    /// `header_values` must hold every value the request carried for
    /// [`SIGNATURE_HEADER`]; exactly one is accepted.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthFailure`] describing why the request is rejected.
    pub fn verify(
        &self,
        method: &HttpMethod,
        message: &CanonicalMessage,
        header_values: &[String],
    ) -> Result<(), AuthFailure> {
        if *method != HttpMethod::Post {
            return Err(AuthFailure::WrongMethod);
        }

        let provided = match header_values {
            [] => return Err(AuthFailure::MissingSignature),
            [single] => single,
            _ => return Err(AuthFailure::DuplicateSignature),
        };

        let provided = STANDARD
            .decode(provided.trim().as_bytes())
            .map_err(|_| AuthFailure::Mismatch)?;
        let computed = self.digest(message);

        if bool::from(computed.as_slice().ct_eq(provided.as_slice())) {
            Ok(())
        } else {
            Err(AuthFailure::Mismatch)
        }
    }
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
