use std::collections::btree_map;
use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};

use crate::endpoint::{EndpointParser, ParsedEndpoint};
use crate::error::ValueError;

/// Form values from an authenticated, validated callback.
///
/// Only [`RequestValidator`](crate::RequestValidator) can produce a
/// `RequestValues`, and only after the signature matched and every
/// registered field rule passed. Each field maps to its first value.
///
/// Values are exposed as plain strings, with typed accessors for the fields
/// that usually need conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestValues {
    values: BTreeMap<String, String>,
}

impl RequestValues {
    pub(crate) fn insert(&mut self, field: String, value: String) {
        self.values.insert(field, value);
    }

    /// Returns the value of `field`, if it was sent.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Returns the value of `field`, or `""` if it was not sent.
    pub fn get_or_empty(&self, field: &str) -> &str {
        self.get(field).unwrap_or("")
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.values.iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the callback carried no fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consumes the values into a plain map.
    pub fn into_map(self) -> BTreeMap<String, String> {
        self.values
    }

    /// Call length from `CallDuration`, in whole seconds.
    ///
    /// A missing or empty field reads as zero.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError`] if the field is not a non-negative integer.
    pub fn call_duration(&self) -> Result<Duration, ValueError> {
        let seconds = self.parse_count("CallDuration")?;
        Ok(Duration::from_secs(seconds))
    }

    /// Callback ordering from `SequenceNumber`. A missing or empty field
    /// reads as zero.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError`] if the field is not a non-negative integer.
    pub fn sequence_number(&self) -> Result<u64, ValueError> {
        self.parse_count("SequenceNumber")
    }

    fn parse_count(&self, field: &'static str) -> Result<u64, ValueError> {
        match self.get(field) {
            None | Some("") => Ok(0),
            Some(raw) => raw.parse().map_err(|_| ValueError::new(field, raw)),
        }
    }

    /// The `Timestamp` field, an RFC 1123 date with a numeric zone
    /// (`Mon, 16 Aug 2010 03:45:01 +0000`).
    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        self.get("Timestamp")
            .and_then(|raw| DateTime::parse_from_rfc2822(raw).ok())
    }

    /// The `Timestamp` field, or the current time if it is missing or
    /// unparseable.
    pub fn timestamp_or_now(&self) -> DateTime<FixedOffset> {
        self.timestamp().unwrap_or_else(|| Utc::now().into())
    }

    /// Classifies the `From` field.
    pub fn from(&self, parser: &EndpointParser) -> ParsedEndpoint {
        parser.parse(self.get_or_empty("From"))
    }

    /// Classifies the `To` field.
    pub fn to(&self, parser: &EndpointParser) -> ParsedEndpoint {
        parser.parse(self.get_or_empty("To"))
    }
}

impl<'a> IntoIterator for &'a RequestValues {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
