//! Property tests over the public validation flow.

use std::collections::BTreeMap;

use proptest::prelude::*;
use twiml_core::{
    AuthFailure, CallbackRequest, Error, FormFields, HttpMethod, RequestValidator,
    ValidatorConfig, FORM_CONTENT_TYPE,
};

fn validator() -> RequestValidator {
    RequestValidator::new(&ValidatorConfig::new("https://voice.example.com", "12345")).unwrap()
}

// Field names that no standard rule applies to.
fn arb_fields() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map(
        "Param[A-Z][a-z]{0,6}",
        prop::string::string_regex("[ -~]{0,24}").unwrap(),
        0..10,
    )
}

fn request(v: &RequestValidator, fields: &[(String, String)]) -> CallbackRequest {
    let form: FormFields = fields.iter().cloned().collect();
    CallbackRequest::new(HttpMethod::Post, "/voice?id=1")
        .header("X-Twilio-Signature", v.sign("/voice?id=1", &form))
        .form(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

proptest! {
    /// Any signed form is accepted whatever order its fields arrive in.
    #[test]
    fn field_order_does_not_matter(fields in arb_fields().prop_map(|m| m.into_iter().collect::<Vec<_>>()).prop_shuffle()) {
        let v = validator();
        let values = v.validate(&request(&v, &fields)).unwrap();

        prop_assert_eq!(values.len(), fields.len());
        for (name, value) in &fields {
            prop_assert_eq!(values.get(name), Some(value.as_str()));
        }
    }

    /// Changing one signed value invalidates the signature.
    #[test]
    fn tampered_value_is_rejected(fields in arb_fields(), suffix in "[a-z]{1,4}") {
        prop_assume!(!fields.is_empty());
        let v = validator();
        let original: Vec<(String, String)> = fields.into_iter().collect();
        let signed = request(&v, &original);
        let signature: Vec<String> = signed
            .header_values("X-Twilio-Signature")
            .map(str::to_string)
            .collect();

        let mut tampered = original.clone();
        tampered[0].1.push_str(&suffix);
        let mut forged = CallbackRequest::new(HttpMethod::Post, "/voice?id=1")
            .form(tampered.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        for value in signature {
            forged = forged.header("X-Twilio-Signature", value);
        }

        prop_assert_eq!(
            v.validate(&forged),
            Err(Error::Authentication(AuthFailure::Mismatch))
        );
    }

    /// Validation never panics on arbitrary bodies.
    #[test]
    fn arbitrary_bodies_never_panic(body in prop::collection::vec(any::<u8>(), 0..64)) {
        let request = CallbackRequest::new(HttpMethod::Post, "/voice")
            .header("X-Twilio-Signature", "AAAAAAAAAAAAAAAAAAAAAAAAAAA=")
            .content_type(FORM_CONTENT_TYPE)
            .body(body);

        prop_assert!(validator().validate(&request).is_err());
    }
}
