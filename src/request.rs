//! Request types at the HTTP boundary.
//!
//! [`CallbackRequest`] is the raw, framework-neutral shape of a webhook call.
//! HTTP integrations build one from their own request type and hand it to the
//! [`RequestValidator`](crate::RequestValidator). Decoding it yields an
//! [`IncomingRequest`] whose form values are still [`Tainted`].

use std::collections::BTreeMap;
use std::fmt;

use percent_encoding::percent_decode;

use crate::{Error, Tainted};

/// Content type the provider uses for callback bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP method of a callback request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    /// HTTP GET method
    Get,
    /// HTTP POST method
    Post,
    /// HTTP PUT method
    Put,
    /// HTTP DELETE method
    Delete,
    /// HTTP PATCH method
    Patch,
    /// Any other method token, kept verbatim
    Other(String),
}

impl HttpMethod {
    /// Maps a method token to an `HttpMethod`. Matching is case-sensitive,
    /// as method tokens are.
    pub fn from_token(token: &str) -> Self {
        match token {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "DELETE" => HttpMethod::Delete,
            "PATCH" => HttpMethod::Patch,
            other => HttpMethod::Other(other.to_string()),
        }
    }
}

impl From<&str> for HttpMethod {
    fn from(token: &str) -> Self {
        HttpMethod::from_token(token)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Put => write!(f, "PUT"),
            HttpMethod::Delete => write!(f, "DELETE"),
            HttpMethod::Patch => write!(f, "PATCH"),
            HttpMethod::Other(token) => write!(f, "{}", token),
        }
    }
}

/// A raw callback request as received from the HTTP layer.
///
/// # Examples
///
/// ```
/// use twiml_core::{CallbackRequest, HttpMethod};
///
/// let request = CallbackRequest::new(HttpMethod::Post, "/voice?tenant=7")
///     .header("X-Twilio-Signature", "bm90LWEtcmVhbC1zaWduYXR1cmU=")
///     .form([("From", "+14158675309"), ("Digits", "12#")]);
///
/// assert_eq!(request.path_and_query(), "/voice?tenant=7");
/// assert_eq!(request.header_values("x-twilio-signature").count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CallbackRequest {
    method: HttpMethod,
    path_and_query: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl CallbackRequest {
    /// Creates a request with no headers and an empty body.
    ///
    /// `path_and_query` is the path as originally requested by the provider,
    /// including any query string.
    pub fn new(method: impl Into<HttpMethod>, path_and_query: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path_and_query: path_and_query.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Appends a header. Repeated names are kept as separate entries.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(self, value: impl Into<String>) -> Self {
        self.header("Content-Type", value)
    }

    /// Sets the raw body bytes.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Encodes `pairs` as a form body and sets the matching content type.
    pub fn form<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in pairs {
            serializer.append_pair(name.as_ref(), value.as_ref());
        }
        let body = serializer.finish();

        self.content_type(FORM_CONTENT_TYPE).body(body)
    }

    /// Returns the request method.
    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    /// Returns the path and query as originally requested.
    pub fn path_and_query(&self) -> &str {
        &self.path_and_query
    }

    /// Returns the raw body.
    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Iterates every value of header `name`, compared case-insensitively.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn content_type_header(&self) -> Option<&str> {
        self.header_values("Content-Type").next()
    }
}

/// Decoded form fields, ordered by name.
///
/// Names sort by byte order, which is the order the signature scheme needs.
/// Every value stays [`Tainted`] until the pipeline releases it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    fields: BTreeMap<String, Vec<Tainted<String>>>,
}

impl FormFields {
    /// Creates an empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value for `name`.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields
            .entry(name.into())
            .or_default()
            .push(Tainted::new(value.into()));
    }

    /// Replaces all values for `name`. An empty `values` records the key
    /// with no value, which signs and validates as an empty string.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.fields
            .insert(name.into(), values.into_iter().map(Tainted::new).collect());
    }

    /// Returns true if `name` was sent.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Number of distinct field names.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no fields were sent.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in ascending byte order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// First value of `name`, if the field was sent with at least one value.
    pub fn first(&self, name: &str) -> Option<&Tainted<String>> {
        self.fields.get(name).and_then(|values| values.first())
    }

    /// Consumes the fields into each name and its first value.
    pub(crate) fn into_entries(self) -> impl Iterator<Item = (String, Option<Tainted<String>>)> {
        self.fields
            .into_iter()
            .map(|(name, values)| (name, values.into_iter().next()))
    }

    /// Each name with its first raw value, empty when the key had none.
    pub(crate) fn first_values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(name, values)| {
            let value = values.first().map(|v| v.peek().as_str()).unwrap_or("");
            (name.as_str(), value)
        })
    }
}

impl<K, V> FromIterator<(K, V)> for FormFields
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = FormFields::new();
        for (name, value) in iter {
            fields.push(name, value);
        }
        fields
    }
}

/// A callback whose body has been decoded but not yet authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingRequest {
    method: HttpMethod,
    path_and_query: String,
    form: FormFields,
    signatures: Vec<String>,
}

impl IncomingRequest {
    /// Assembles a request from parts decoded elsewhere.
    ///
    /// `signatures` holds every value of the signature header, in order.
    pub fn new(
        method: HttpMethod,
        path_and_query: impl Into<String>,
        form: FormFields,
        signatures: Vec<String>,
    ) -> Self {
        Self {
            method,
            path_and_query: path_and_query.into(),
            form,
            signatures,
        }
    }

    /// Decodes the body of `raw` and collects the `signature_header` values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the content type is not a form type, a
    /// percent escape is malformed, or a decoded name or value is not UTF-8.
    pub fn decode(raw: &CallbackRequest, signature_header: &str) -> Result<Self, Error> {
        if let Some(content_type) = raw.content_type_header() {
            let essence = content_type.split(';').next().unwrap_or("").trim();
            if !essence.eq_ignore_ascii_case(FORM_CONTENT_TYPE) {
                return Err(Error::decode(format!(
                    "unsupported content type {}",
                    essence
                )));
            }
        }

        let form = decode_form(raw.body_bytes())?;
        let signatures = raw
            .header_values(signature_header)
            .map(str::to_string)
            .collect();

        Ok(Self {
            method: raw.method().clone(),
            path_and_query: raw.path_and_query().to_string(),
            form,
            signatures,
        })
    }

    /// Returns the request method.
    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    /// Returns the path and query as originally requested.
    pub fn path_and_query(&self) -> &str {
        &self.path_and_query
    }

    /// Returns the decoded form fields.
    pub fn form(&self) -> &FormFields {
        &self.form
    }

    /// Returns every value of the signature header.
    pub fn signatures(&self) -> &[String] {
        &self.signatures
    }

    pub(crate) fn into_form(self) -> FormFields {
        self.form
    }
}

fn decode_form(body: &[u8]) -> Result<FormFields, Error> {
    let mut form = FormFields::new();

    for pair in body.split(|&b| b == b'&') {
        if pair.is_empty() {
            continue;
        }
        let (name, value) = match pair.iter().position(|&b| b == b'=') {
            Some(eq) => (&pair[..eq], &pair[eq + 1..]),
            None => (pair, &[][..]),
        };
        form.push(decode_component(name)?, decode_component(value)?);
    }

    Ok(form)
}

fn decode_component(raw: &[u8]) -> Result<String, Error> {
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let escape = raw.get(i + 1..i + 3);
            match escape {
                Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i += 3,
                _ => return Err(Error::decode("invalid percent escape")),
            }
        } else {
            i += 1;
        }
    }

    let spaced: Vec<u8> = raw
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();

    percent_decode(&spaced)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| Error::decode("form value is not valid UTF-8"))
}
