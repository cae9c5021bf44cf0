use std::fmt;

/// Errors produced while validating a callback request.
///
/// Every variant is fatal for the request: the pipeline stops at the first
/// error and never hands out partially validated values. No variant carries
/// the auth token or the computed signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The request used an HTTP method other than `POST`.
    Method {
        /// The method that was received
        received: String,
    },
    /// The form body could not be decoded.
    Decode {
        /// Why decoding failed
        reason: String,
    },
    /// The request signature could not be verified.
    Authentication(AuthFailure),
    /// A form field failed its registered validator.
    Field(FieldError),
    /// The validator configuration is incomplete or malformed.
    Config {
        /// What is wrong with the configuration
        reason: String,
    },
    /// A validated value could not be converted to the requested type.
    ///
    /// The pipeline never returns this variant. It exists so that the
    /// [`RequestValues`](crate::RequestValues) accessors, which return a bare
    /// [`ValueError`], can be chained with `?` in functions returning `Error`.
    Value(ValueError),
}

impl Error {
    pub(crate) fn decode(reason: impl Into<String>) -> Self {
        Error::Decode {
            reason: reason.into(),
        }
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Error::Config {
            reason: reason.into(),
        }
    }

    /// Short, stable name of the error class, suitable for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Method { .. } => "method",
            Error::Decode { .. } => "decode",
            Error::Authentication(_) => "authentication",
            Error::Field(_) => "field",
            Error::Config { .. } => "config",
            Error::Value(_) => "value",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Method { received } => {
                write!(f, "expected a POST request, received {}", received)
            }
            Error::Decode { reason } => write!(f, "malformed form body: {}", reason),
            Error::Authentication(failure) => write!(f, "authentication failed: {}", failure),
            Error::Field(err) => write!(f, "{}", err),
            Error::Config { reason } => write!(f, "invalid configuration: {}", reason),
            Error::Value(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Field(err) => Some(err),
            Error::Value(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AuthFailure> for Error {
    fn from(failure: AuthFailure) -> Self {
        Error::Authentication(failure)
    }
}

impl From<FieldError> for Error {
    fn from(err: FieldError) -> Self {
        Error::Field(err)
    }
}

impl From<ValueError> for Error {
    fn from(err: ValueError) -> Self {
        Error::Value(err)
    }
}

/// Why signature verification rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// Signed callbacks are only accepted over `POST`.
    WrongMethod,
    /// The signature header was not sent.
    MissingSignature,
    /// The signature header was sent more than once.
    DuplicateSignature,
    /// The header did not match the signature computed for the request.
    Mismatch,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailure::WrongMethod => write!(f, "signed requests must use POST"),
            AuthFailure::MissingSignature => write!(f, "signature header is missing"),
            AuthFailure::DuplicateSignature => write!(f, "signature header appears more than once"),
            AuthFailure::Mismatch => write!(f, "signature does not match request"),
        }
    }
}

/// A value failed a field rule.
///
/// # Examples
///
/// ```
/// use twiml_core::{ValidationError, ValidationErrorKind};
///
/// let err = ValidationError::Character { character: 'a' };
/// assert_eq!(err.kind(), ValidationErrorKind::Character);
/// assert_eq!(err.to_string(), "invalid: character 'a' is not allowed");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The value is absent or empty and the rule does not allow that.
    Required,
    /// The value is structurally invalid for the rule.
    Format {
        /// What shape was expected
        reason: &'static str,
    },
    /// The value contains a character outside the rule's whitelist.
    Character {
        /// First disallowed character, scanning left to right
        character: char,
    },
}

impl ValidationError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            ValidationError::Required => ValidationErrorKind::Required,
            ValidationError::Format { .. } => ValidationErrorKind::Format,
            ValidationError::Character { .. } => ValidationErrorKind::Character,
        }
    }

    pub(crate) fn format(reason: &'static str) -> Self {
        ValidationError::Format { reason }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Required => write!(f, "required"),
            ValidationError::Format { reason } => write!(f, "{}", reason),
            ValidationError::Character { character } => {
                write!(f, "invalid: character '{}' is not allowed", character)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Kind of [`ValidationError`], without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Empty value on a non-optional field.
    Required,
    /// Structurally invalid value.
    Format,
    /// Disallowed character.
    Character,
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "required"),
            Self::Format => write!(f, "format"),
            Self::Character => write!(f, "character"),
        }
    }
}

/// A [`ValidationError`] tied to the form field that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    field: String,
    cause: ValidationError,
}

impl FieldError {
    /// Creates a new field error.
    pub fn new(field: impl Into<String>, cause: ValidationError) -> Self {
        Self {
            field: field.into(),
            cause,
        }
    }

    /// Name of the offending form field.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The underlying rule failure.
    pub fn cause(&self) -> &ValidationError {
        &self.cause
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid form value {}: {}", self.field, self.cause)
    }
}

impl std::error::Error for FieldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// A validated value could not be read as the requested type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueError {
    field: &'static str,
    value: String,
}

impl ValueError {
    pub(crate) fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    /// Name of the field that failed to convert.
    pub fn field(&self) -> &'static str {
        self.field
    }
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot parse {} from {:?}", self.field, self.value)
    }
}

impl std::error::Error for ValueError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn value_error_converts_with_question_mark() {
        fn duration(raw: &str) -> Result<u64, Error> {
            let seconds = raw
                .parse()
                .map_err(|_| ValueError::new("CallDuration", raw))?;
            Ok(seconds)
        }

        let err = duration("ten").unwrap_err();
        assert_eq!(err.kind(), "value");
        assert_eq!(err.to_string(), "cannot parse CallDuration from \"ten\"");
        assert!(err.source().is_some());
    }

    #[test]
    fn field_error_names_field_and_chains_cause() {
        let err = Error::from(FieldError::new("Digits", ValidationError::Character { character: 'a' }));

        assert_eq!(err.kind(), "field");
        assert_eq!(
            err.to_string(),
            "invalid form value Digits: invalid: character 'a' is not allowed"
        );

        let field = err.source().expect("field error has a source");
        let cause = field.source().expect("cause is chained");
        assert_eq!(cause.to_string(), "invalid: character 'a' is not allowed");
    }

    #[test]
    fn authentication_errors_do_not_mention_signatures_values() {
        let err = Error::from(AuthFailure::Mismatch);

        assert_eq!(err.kind(), "authentication");
        assert_eq!(err.to_string(), "authentication failed: signature does not match request");
    }

    #[test]
    fn method_error_reports_received_method() {
        let err = Error::Method {
            received: "GET".to_string(),
        };
        assert_eq!(err.to_string(), "expected a POST request, received GET");
    }

    #[test]
    fn validation_error_kinds_display() {
        assert_eq!(ValidationError::Required.kind(), ValidationErrorKind::Required);
        assert_eq!(format!("{}", ValidationErrorKind::Required), "required");
        assert_eq!(format!("{}", ValidationErrorKind::Format), "format");
        assert_eq!(format!("{}", ValidationErrorKind::Character), "character");
        assert_eq!(
            ValidationError::format("invalid SIP URI").to_string(),
            "invalid SIP URI"
        );
    }
}
