use std::fmt;

/// A value that must never show up in logs or error messages.
///
/// The account auth token used to sign callbacks is held as a
/// `Secret<String>` from the moment it is read out of configuration. Its
/// `Debug` and `Display` output is always `[REDACTED]`, so a config struct
/// containing one can be traced freely.
///
/// # Examples
///
/// ```
/// use twiml_core::Secret;
///
/// let token = Secret::new("12345".to_string());
/// assert_eq!(format!("{:?}", token), "[REDACTED]");
/// assert_eq!(token.expose_secret(), "12345");
/// ```
// No Clone/Copy/Default: copies of the token should be deliberate.
pub struct Secret<T> {
    inner: T,
}

impl<T> Secret<T> {
    /// Wraps a sensitive value.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Returns the wrapped value.
    ///
    /// Callers must not log or format the returned reference.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }
}

impl<T: AsRef<[u8]>> Secret<T> {
    /// Returns true if the wrapped value is zero bytes long.
    pub fn is_empty(&self) -> bool {
        self.inner.as_ref().is_empty()
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
