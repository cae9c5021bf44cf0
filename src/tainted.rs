use std::fmt;

/// A form value that has not yet been authenticated.
///
/// Everything decoded from a callback body starts out as `Tainted<String>`.
/// Only the validation pipeline, after the signature checks out and the
/// field's rule passes, can read the value and move it into
/// [`RequestValues`](crate::RequestValues).
///
/// # Examples
///
/// ```
/// use twiml_core::Tainted;
///
/// let digits = Tainted::new("1234#".to_string());
/// println!("{:?}", digits); // Tainted { inner: "1234#" }
///
/// // No Deref, AsRef or Into: the value cannot be used directly.
/// // let s: &str = digits.as_ref(); // does not compile
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Tainted<T> {
    // Must stay private; external reads would bypass the signature check.
    inner: T,
}

impl<T> Tainted<T> {
    /// Marks a value as untrusted.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Borrows the raw value for canonicalization and rule checks.
    pub(crate) fn peek(&self) -> &T {
        &self.inner
    }

    /// Releases the value once it has been authenticated and validated.
    pub(crate) fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: fmt::Debug> fmt::Debug for Tainted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tainted")
            .field("inner", &self.inner)
            .finish()
    }
}
