//! Shared proptest strategies and test setup.

use proptest::prelude::*;

/// Installs a test-writer tracing subscriber once per process.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Printable form values, including the characters that need URL encoding.
pub(crate) fn arb_form_value() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 +:@#*&=%/._-]{0,40}").unwrap()
}

/// A list of fields whose names are all distinct.
pub(crate) fn arb_unique_fields() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::btree_map("[A-Za-z][A-Za-z0-9]{0,11}", arb_form_value(), 0..12)
        .prop_map(|fields| fields.into_iter().collect())
}
