use std::sync::Arc;

use crate::canonical::CanonicalMessage;
use crate::config::ValidatorConfig;
use crate::endpoint::EndpointParser;
use crate::error::Error;
use crate::phone::{LibPhoneNumbers, PhoneNumbers};
use crate::registry::ValidatorRegistry;
use crate::request::{CallbackRequest, FormFields, HttpMethod, IncomingRequest};
use crate::signature::SignatureVerifier;
use crate::values::RequestValues;
use crate::Tainted;

/// Authenticates and validates provider callbacks.
///
/// Validation runs in a fixed order and stops at the first failure:
///
/// 1. the method must be `POST`;
/// 2. the body must decode as a form;
/// 3. the signature header must match the canonical message;
/// 4. every field with a registered rule must pass it.
///
/// Only then are the values returned. A `RequestValidator` holds no
/// per-request state and can be shared across threads.
///
/// # Examples
///
/// ```
/// use twiml_core::{CallbackRequest, HttpMethod, RequestValidator, ValidatorConfig};
///
/// let validator = RequestValidator::new(&ValidatorConfig::new("https://example.com", "12345"))
///     .expect("valid config");
///
/// let fields = [("From", "+18005642365"), ("Digits", "42#")];
/// let signature = validator.sign("/voice", &fields.iter().copied().collect());
///
/// let request = CallbackRequest::new(HttpMethod::Post, "/voice")
///     .header("X-Twilio-Signature", signature)
///     .form(fields);
///
/// let values = validator.validate(&request).expect("authentic request");
/// assert_eq!(values.get("Digits"), Some("42#"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestValidator {
    origin: String,
    signature_header: String,
    verifier: SignatureVerifier,
    registry: Arc<ValidatorRegistry>,
    parser: EndpointParser,
}

impl RequestValidator {
    /// Creates a validator with the standard field rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` does not pass
    /// [`ValidatorConfig::check`].
    pub fn new(config: &ValidatorConfig) -> Result<Self, Error> {
        let phones: Arc<dyn PhoneNumbers> = Arc::new(LibPhoneNumbers::new(config.default_region()));
        let registry = Arc::new(ValidatorRegistry::standard(Arc::clone(&phones)));

        Self::build(config, registry, EndpointParser::new(phones))
    }

    /// Creates a validator with a caller-supplied rule table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` does not pass
    /// [`ValidatorConfig::check`].
    pub fn with_registry(
        config: &ValidatorConfig,
        registry: Arc<ValidatorRegistry>,
    ) -> Result<Self, Error> {
        let phones: Arc<dyn PhoneNumbers> = Arc::new(LibPhoneNumbers::new(config.default_region()));

        Self::build(config, registry, EndpointParser::new(phones))
    }

    fn build(
        config: &ValidatorConfig,
        registry: Arc<ValidatorRegistry>,
        parser: EndpointParser,
    ) -> Result<Self, Error> {
        config.check()?;

        Ok(Self {
            origin: config.public_origin().to_string(),
            signature_header: config.signature_header().to_string(),
            verifier: SignatureVerifier::new(config.auth_token())?,
            registry,
            parser,
        })
    }

    /// The field rules in use.
    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    /// An endpoint parser using the same phone region as the field rules,
    /// for classifying `From`/`To` on the returned values.
    pub fn endpoint_parser(&self) -> &EndpointParser {
        &self.parser
    }

    /// Computes the signature the provider would send for a request to
    /// `path_and_query` carrying `form`.
    pub fn sign(&self, path_and_query: &str, form: &FormFields) -> String {
        self.verifier
            .sign(&CanonicalMessage::build(&self.origin, path_and_query, form))
    }

    /// Runs the full pipeline on a raw callback.
    ///
    /// # Errors
    ///
    /// Returns the first failure: [`Error::Method`], [`Error::Decode`],
    /// [`Error::Authentication`] or [`Error::Field`].
    #[tracing::instrument(name = "twiml.validate", skip_all, fields(path = %raw.path_and_query()))]
    pub fn validate(&self, raw: &CallbackRequest) -> Result<RequestValues, Error> {
        check_method(raw.method()).map_err(rejected)?;

        let request = IncomingRequest::decode(raw, &self.signature_header).map_err(rejected)?;
        tracing::debug!(fields = request.form().len(), "decoded callback form");

        self.authenticate_and_validate(request)
    }

    /// Runs the pipeline on a request whose body was decoded elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Method`], [`Error::Authentication`] or
    /// [`Error::Field`].
    #[tracing::instrument(name = "twiml.validate", skip_all, fields(path = %request.path_and_query()))]
    pub fn validate_decoded(&self, request: IncomingRequest) -> Result<RequestValues, Error> {
        check_method(request.method()).map_err(rejected)?;
        self.authenticate_and_validate(request)
    }

    fn authenticate_and_validate(&self, request: IncomingRequest) -> Result<RequestValues, Error> {
        let message = CanonicalMessage::build(&self.origin, request.path_and_query(), request.form());
        self.verifier
            .verify(request.method(), &message, request.signatures())
            .map_err(|failure| rejected(failure.into()))?;
        tracing::debug!("signature verified");

        // Values stay local until every field has passed.
        let mut values = RequestValues::default();
        for (field, value) in request.into_form().into_entries() {
            let raw = value.as_ref().map(|v| v.peek().as_str()).unwrap_or("");
            self.registry
                .validate(&field, Some(raw))
                .map_err(|err| rejected(err.into()))?;

            values.insert(field, value.map(Tainted::into_inner).unwrap_or_default());
        }

        tracing::debug!(fields = values.len(), "callback validated");
        Ok(values)
    }
}

fn check_method(method: &HttpMethod) -> Result<(), Error> {
    match method {
        HttpMethod::Post => Ok(()),
        other => Err(Error::Method {
            received: other.to_string(),
        }),
    }
}

fn rejected(err: Error) -> Error {
    match &err {
        Error::Field(field) => {
            tracing::warn!(kind = err.kind(), field = field.field(), error = %err, "callback rejected")
        }
        _ => tracing::warn!(kind = err.kind(), error = %err, "callback rejected"),
    }
    err
}
