use std::fmt;

use crate::request::FormFields;

/// The exact byte string the provider signs for a callback.
///
/// Built from the public origin, the requested path and query, and every
/// form field name (ascending byte order) immediately followed by its first
/// value. Nothing separates the pieces; a single extra byte changes the
/// signature.
///
/// # Examples
///
/// ```
/// use twiml_core::{CanonicalMessage, FormFields};
///
/// let form: FormFields = [("To", "+18005642365"), ("CallSid", "CA1")].into_iter().collect();
/// let message = CanonicalMessage::build("https://example.com", "/voice?x=1", &form);
///
/// assert_eq!(
///     message.as_str(),
///     "https://example.com/voice?x=1CallSidCA1To+18005642365"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalMessage(pub(crate) String);

impl CanonicalMessage {
    /// Canonicalizes a request.
    ///
    /// `origin` is `scheme://host` as the provider sees it, which may differ
    /// from the address the service listens on.
    pub fn build(origin: &str, path_and_query: &str, form: &FormFields) -> Self {
        let mut message = String::with_capacity(origin.len() + path_and_query.len());
        message.push_str(origin);
        message.push_str(path_and_query);

        // FormFields iterates in byte order already.
        for (name, value) in form.first_values() {
            message.push_str(name);
            message.push_str(value);
        }

        CanonicalMessage(message)
    }

    /// Returns the message as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the message bytes fed to the MAC.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for CanonicalMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
