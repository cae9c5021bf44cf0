//! Caller and callee endpoint classification.
//!
//! `From` and `To` carry either a phone number or a SIP URI. A SIP URI whose
//! host has the shape `<domain>.sip.<edge>.twilio.com` routes through the
//! provider's own SIP infrastructure; anything else is just an address.

use std::fmt;
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::phone::{validate_phone_number, LibPhoneNumbers, PhoneNumbers};
use crate::ValidationError;

/// Last two host labels of a provider routing URI.
pub const PROVIDER_DOMAIN: &str = "twilio.com";

/// Host label, fourth from the end, that marks a routing URI.
pub const ROUTING_MARKER: &str = "sip";

const MIN_ROUTING_LABELS: usize = 5;

/// SIP URI scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SipScheme {
    /// `sip:`
    Sip,
    /// `sips:` (TLS)
    Sips,
}

impl SipScheme {
    /// The scheme token without the colon.
    pub fn as_str(&self) -> &'static str {
        match self {
            SipScheme::Sip => "sip",
            SipScheme::Sips => "sips",
        }
    }
}

impl fmt::Display for SipScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structurally valid SIP URI: scheme, user part and host, nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SipUri {
    scheme: SipScheme,
    user: String,
    host: String,
    port: Option<u16>,
}

impl SipUri {
    /// The URI scheme.
    pub fn scheme(&self) -> SipScheme {
        self.scheme
    }

    /// Percent-decoded user part.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Host without the port.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, if one was given.
    pub fn port(&self) -> Option<u16> {
        self.port
    }
}

fn invalid_sip_uri() -> ValidationError {
    ValidationError::format("invalid SIP URI")
}

/// Parses a SIP URI with the strict grammar used for callback fields.
///
/// The input is lowercased as a whole, then must start with `sip:` or
/// `sips:`, carry a user part and a host, and have no path or opaque
/// component.
///
/// # Errors
///
/// Returns [`ValidationError::Format`] for anything else.
///
/// # Examples
///
/// ```
/// use twiml_core::{parse_sip_uri, SipScheme};
///
/// let uri = parse_sip_uri("SIPS:8005642365@Domain.sip.us1.twilio.com:5061").unwrap();
/// assert_eq!(uri.scheme(), SipScheme::Sips);
/// assert_eq!(uri.host(), "domain.sip.us1.twilio.com");
/// assert_eq!(uri.port(), Some(5061));
///
/// assert!(parse_sip_uri("https://user@host:5061").is_err());
/// ```
pub fn parse_sip_uri(raw: &str) -> Result<SipUri, ValidationError> {
    let lowered = raw.to_lowercase();

    let (scheme, rest) = if let Some(rest) = lowered.strip_prefix("sips:") {
        (SipScheme::Sips, rest)
    } else if let Some(rest) = lowered.strip_prefix("sip:") {
        (SipScheme::Sip, rest)
    } else {
        return Err(invalid_sip_uri());
    };

    // The URL parser would percent-encode these instead of failing.
    if rest.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid_sip_uri());
    }

    // With an authority marker the generic parser splits out user and host
    // instead of treating everything after the scheme as opaque.
    let url = Url::parse(&format!("{}://{}", scheme.as_str(), rest))
        .map_err(|_| invalid_sip_uri())?;

    if url.scheme() != scheme.as_str() {
        return Err(invalid_sip_uri());
    }
    if !url.path().is_empty() || url.cannot_be_a_base() {
        return Err(invalid_sip_uri());
    }

    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => return Err(invalid_sip_uri()),
    };
    if url.username().is_empty() && url.password().is_none() {
        return Err(invalid_sip_uri());
    }

    let user = percent_decode_str(url.username())
        .decode_utf8_lossy()
        .into_owned();

    Ok(SipUri {
        scheme,
        user,
        host,
        port: url.port(),
    })
}

/// The classification of a raw `From`/`To` value.
///
/// Never mutated after construction. [`raw`](Self::raw) always holds the
/// original input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEndpoint {
    valid: bool,
    number: String,
    routing_uri: bool,
    routing_domain: String,
    region: String,
    raw: String,
}

impl ParsedEndpoint {
    fn unrecognized(raw: &str) -> Self {
        Self {
            valid: false,
            number: raw.to_string(),
            routing_uri: false,
            routing_domain: String::new(),
            region: String::new(),
            raw: raw.to_string(),
        }
    }

    /// True if the value is a valid phone number or a provider routing URI.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// E.164 number for routing URIs; the raw input otherwise.
    pub fn number(&self) -> &str {
        &self.number
    }

    /// True if the value is a provider routing URI.
    pub fn is_routing_uri(&self) -> bool {
        self.routing_uri
    }

    /// Labels before the routing marker, joined by `.`. Empty unless routing.
    pub fn routing_domain(&self) -> &str {
        &self.routing_domain
    }

    /// The routing marker label. Empty unless routing.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The input exactly as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Classifies endpoint strings as phone numbers or routing URIs.
///
/// Classification never fails: a value that is neither comes back with
/// [`ParsedEndpoint::is_valid`] false. Use the field validators when a bad
/// value should be rejected.
///
/// # Examples
///
/// ```
/// use twiml_core::EndpointParser;
///
/// let parser = EndpointParser::default();
///
/// let phone = parser.parse("+18005642365");
/// assert!(phone.is_valid());
/// assert!(!phone.is_routing_uri());
///
/// let sip = parser.parse("sips:8005642365@domain.sip.us1.twilio.com:5061");
/// assert!(sip.is_routing_uri());
/// assert_eq!(sip.number(), "+18005642365");
/// assert_eq!(sip.routing_domain(), "domain");
/// ```
#[derive(Debug, Clone)]
pub struct EndpointParser {
    phones: Arc<dyn PhoneNumbers>,
}

impl EndpointParser {
    /// Creates a parser using `phones` for number validation.
    pub fn new(phones: Arc<dyn PhoneNumbers>) -> Self {
        Self { phones }
    }

    /// The phone-number capability in use.
    pub fn phones(&self) -> &dyn PhoneNumbers {
        self.phones.as_ref()
    }

    /// Classifies `raw`, trying a phone number first and a routing URI second.
    pub fn parse(&self, raw: &str) -> ParsedEndpoint {
        if validate_phone_number(self.phones(), raw).is_ok() {
            return ParsedEndpoint {
                valid: true,
                ..ParsedEndpoint::unrecognized(raw)
            };
        }

        self.parse_routing_uri(raw)
            .unwrap_or_else(|| ParsedEndpoint::unrecognized(raw))
    }

    fn parse_routing_uri(&self, raw: &str) -> Option<ParsedEndpoint> {
        let uri = parse_sip_uri(raw).ok()?;

        let labels: Vec<&str> = uri.host().split('.').collect();
        let count = labels.len();
        if count < MIN_ROUTING_LABELS
            || labels[count - 2..].join(".") != PROVIDER_DOMAIN
            || labels[count - 4] != ROUTING_MARKER
        {
            return None;
        }

        let number = validate_phone_number(self.phones(), uri.user()).ok()?;

        Some(ParsedEndpoint {
            valid: true,
            number: self.phones.format_e164(&number),
            routing_uri: true,
            routing_domain: labels[..count - 4].join("."),
            region: labels[count - 4].to_string(),
            raw: raw.to_string(),
        })
    }
}

impl Default for EndpointParser {
    fn default() -> Self {
        Self::new(Arc::new(LibPhoneNumbers::default()))
    }
}
