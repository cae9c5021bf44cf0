use phonenumber::country;
use url::Url;

use crate::signature::SIGNATURE_HEADER;
use crate::{Error, Secret};

/// Settings for a [`RequestValidator`](crate::RequestValidator).
///
/// The public origin is the `scheme://host[:port]` the provider was told to
/// call. Behind a proxy it differs from the listen address, and it is what
/// the provider signs.
///
/// # Examples
///
/// ```
/// use twiml_core::ValidatorConfig;
///
/// let config = ValidatorConfig::new("https://voice.example.com/", "12345");
/// assert_eq!(config.public_origin(), "https://voice.example.com");
/// assert_eq!(config.signature_header(), "X-Twilio-Signature");
/// assert_eq!(format!("{:?}", config.auth_token()), "[REDACTED]");
/// ```
#[derive(Debug)]
pub struct ValidatorConfig {
    public_origin: String,
    auth_token: Secret<String>,
    default_region: country::Id,
    signature_header: String,
}

impl ValidatorConfig {
    /// Environment variable holding the public origin.
    pub const ORIGIN_ENV: &'static str = "TWIML_PUBLIC_ORIGIN";
    /// Environment variable holding the account auth token.
    pub const TOKEN_ENV: &'static str = "TWIML_AUTH_TOKEN";
    /// Optional environment variable holding the default phone region (ISO 3166 alpha-2).
    pub const REGION_ENV: &'static str = "TWIML_DEFAULT_REGION";

    /// Creates a config with the default region (US) and signature header.
    /// A trailing `/` on the origin is dropped.
    pub fn new(public_origin: impl Into<String>, auth_token: impl Into<String>) -> Self {
        let mut public_origin = public_origin.into();
        while public_origin.ends_with('/') {
            public_origin.pop();
        }

        Self {
            public_origin,
            auth_token: Secret::new(auth_token.into()),
            default_region: country::Id::US,
            signature_header: SIGNATURE_HEADER.to_string(),
        }
    }

    /// Reads the config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or the
    /// region is not a known country code.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let origin = lookup(Self::ORIGIN_ENV)
            .ok_or_else(|| Error::config(format!("{} is not set", Self::ORIGIN_ENV)))?;
        let token = lookup(Self::TOKEN_ENV)
            .ok_or_else(|| Error::config(format!("{} is not set", Self::TOKEN_ENV)))?;

        let mut config = Self::new(origin, token);
        if let Some(region) = lookup(Self::REGION_ENV) {
            let id = region
                .trim()
                .to_ascii_uppercase()
                .parse::<country::Id>()
                .map_err(|_| Error::config(format!("unknown region {:?}", region)))?;
            config = config.with_default_region(id);
        }

        Ok(config)
    }

    /// Sets the region national phone numbers are resolved against.
    pub fn with_default_region(mut self, region: country::Id) -> Self {
        self.default_region = region;
        self
    }

    /// Overrides the header the signature is read from.
    pub fn with_signature_header(mut self, header: impl Into<String>) -> Self {
        self.signature_header = header.into();
        self
    }

    /// The origin the provider signs against.
    pub fn public_origin(&self) -> &str {
        &self.public_origin
    }

    /// The account auth token.
    pub fn auth_token(&self) -> &Secret<String> {
        &self.auth_token
    }

    /// Region for national phone numbers.
    pub fn default_region(&self) -> country::Id {
        self.default_region
    }

    /// Header carrying the request signature.
    pub fn signature_header(&self) -> &str {
        &self.signature_header
    }

    /// Checks that the origin is an absolute http(s) URL without a path and
    /// that the token is present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem.
    pub fn check(&self) -> Result<(), Error> {
        let url = Url::parse(&self.public_origin)
            .map_err(|_| Error::config(format!("public origin {:?} is not a URL", self.public_origin)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config("public origin must use http or https"));
        }
        if url.host_str().is_none() {
            return Err(Error::config("public origin has no host"));
        }
        if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
            return Err(Error::config("public origin must not carry a path, query or fragment"));
        }
        if self.auth_token.is_empty() {
            return Err(Error::config("auth token must not be empty"));
        }
        if self.signature_header.is_empty() {
            return Err(Error::config("signature header must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| env.get(key).cloned()
    }

    #[test]
    fn new_applies_defaults() {
        let config = ValidatorConfig::new("https://example.com", "tok");

        assert_eq!(config.default_region(), country::Id::US);
        assert_eq!(config.signature_header(), SIGNATURE_HEADER);
        assert!(config.check().is_ok());
    }

    #[test]
    fn from_lookup_reads_all_variables() {
        let config = ValidatorConfig::from_lookup(lookup(&[
            ("TWIML_PUBLIC_ORIGIN", "https://voice.example.com//"),
            ("TWIML_AUTH_TOKEN", "secret-token"),
            ("TWIML_DEFAULT_REGION", "gb"),
        ]))
        .expect("complete environment");

        assert_eq!(config.public_origin(), "https://voice.example.com");
        assert_eq!(config.auth_token().expose_secret(), "secret-token");
        assert_eq!(config.default_region(), country::Id::GB);
    }

    #[test]
    fn from_lookup_requires_origin_and_token() {
        let err = ValidatorConfig::from_lookup(lookup(&[("TWIML_AUTH_TOKEN", "t")])).unwrap_err();
        assert_eq!(err.to_string(), "invalid configuration: TWIML_PUBLIC_ORIGIN is not set");

        let err = ValidatorConfig::from_lookup(lookup(&[("TWIML_PUBLIC_ORIGIN", "https://h")]))
            .unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn from_lookup_rejects_unknown_region() {
        let result = ValidatorConfig::from_lookup(lookup(&[
            ("TWIML_PUBLIC_ORIGIN", "https://h"),
            ("TWIML_AUTH_TOKEN", "t"),
            ("TWIML_DEFAULT_REGION", "ZZZ"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn check_rejects_bad_origins() {
        for origin in ["example.com", "ftp://example.com", "https://example.com/voice"] {
            let config = ValidatorConfig::new(origin, "tok");
            assert!(config.check().is_err(), "{origin} should be rejected");
        }
    }

    #[test]
    fn check_rejects_empty_token() {
        assert!(ValidatorConfig::new("https://example.com", "").check().is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let output = format!("{:?}", ValidatorConfig::new("https://example.com", "tok-123"));
        assert!(!output.contains("tok-123"));
        assert!(output.contains("https://example.com"));
    }
}
