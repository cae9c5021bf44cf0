use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use twiml_core::{
    AuthFailure, CallbackRequest, CanonicalMessage, CharacterWhitelist, EndpointParser, Error,
    FormFields, HttpMethod, RequestValidator, RuleOptions, Secret, SignatureVerifier,
    ValidationError, ValidatorConfig, ValidatorRegistry,
};

const ORIGIN: &str = "https://voice.example.com";
const TOKEN: &str = "12345";

/// Signs `origin + path + sorted(name + value)` without going through the crate.
fn provider_signature(token: &str, url: &str, fields: &[(&str, &str)]) -> String {
    let mut sorted = fields.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut message = url.to_string();
    for (name, value) in sorted {
        message.push_str(name);
        message.push_str(value);
    }

    let mut mac = Hmac::<Sha1>::new_from_slice(token.as_bytes()).unwrap();
    mac.update(message.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

fn callback(path: &str, fields: &[(&str, &str)]) -> CallbackRequest {
    let url = format!("{ORIGIN}{path}");
    CallbackRequest::new(HttpMethod::Post, path)
        .header("X-Twilio-Signature", provider_signature(TOKEN, &url, fields))
        .form(fields.iter().copied())
}

fn validator() -> RequestValidator {
    RequestValidator::new(&ValidatorConfig::new(ORIGIN, TOKEN)).unwrap()
}

#[test]
fn known_provider_signature_verifies() {
    let form: FormFields = [
        ("CallSid", "CA1234567890ABCDE"),
        ("Caller", "+14158675309"),
        ("Digits", "1234"),
        ("From", "+14158675309"),
        ("To", "+18005551212"),
    ]
    .into_iter()
    .collect();
    let message = CanonicalMessage::build("https://mycompany.com", "/myapp.php?foo=1&bar=2", &form);
    let verifier = SignatureVerifier::new(&Secret::new(TOKEN.to_string())).unwrap();

    assert_eq!(verifier.sign(&message), "RSOYDt4T1cUTdK1PDd93/VVr8B8=");
    assert!(verifier
        .verify(&HttpMethod::Post, &message, &["RSOYDt4T1cUTdK1PDd93/VVr8B8=".to_string()])
        .is_ok());
}

#[test]
fn independently_signed_callback_is_accepted() {
    let fields = [
        ("AccountSid", "AC0000"),
        ("CallSid", "CA1234567890ABCDE"),
        ("From", "+18005642365"),
        ("To", "sips:8005642365@acme.sip.us1.twilio.com:5061"),
        ("Digits", "#42*"),
    ];

    let v = validator();
    let values = v.validate(&callback("/voice/inbound?tenant=7", &fields)).unwrap();

    assert_eq!(values.len(), fields.len());
    assert_eq!(values.get("Digits"), Some("#42*"));

    let from = values.from(v.endpoint_parser());
    assert!(from.is_valid());
    assert!(!from.is_routing_uri());
    assert_eq!(from.number(), "+18005642365");

    let to = values.to(v.endpoint_parser());
    assert!(to.is_routing_uri());
    assert_eq!(to.number(), "+18005642365");
    assert_eq!(to.routing_domain(), "acme");
    assert_eq!(to.region(), "sip");
}

#[test]
fn url_encoded_values_are_signed_decoded() {
    let fields = [("SpeechResult", "hello world & more"), ("Digits", "1")];

    let values = validator().validate(&callback("/gather", &fields)).unwrap();
    assert_eq!(values.get("SpeechResult"), Some("hello world & more"));
}

#[test]
fn wrong_token_fails_closed() {
    let fields = [("From", "+18005642365")];
    let request = CallbackRequest::new(HttpMethod::Post, "/voice")
        .header(
            "X-Twilio-Signature",
            provider_signature("other-token", &format!("{ORIGIN}/voice"), &fields),
        )
        .form(fields);

    assert_eq!(
        validator().validate(&request),
        Err(Error::Authentication(AuthFailure::Mismatch))
    );
}

#[test]
fn wrong_origin_fails_closed() {
    let fields = [("From", "+18005642365")];
    let request = CallbackRequest::new(HttpMethod::Post, "/voice")
        .header(
            "X-Twilio-Signature",
            provider_signature(TOKEN, "http://voice.example.com/voice", &fields),
        )
        .form(fields);

    assert!(validator().validate(&request).is_err());
}

#[test]
fn duplicate_signature_headers_are_rejected() {
    let fields = [("Digits", "1")];
    let signature = provider_signature(TOKEN, &format!("{ORIGIN}/voice"), &fields);
    let request = CallbackRequest::new(HttpMethod::Post, "/voice")
        .header("X-Twilio-Signature", signature.clone())
        .header("x-twilio-signature", signature)
        .form(fields);

    assert_eq!(
        validator().validate(&request),
        Err(Error::Authentication(AuthFailure::DuplicateSignature))
    );
}

#[test]
fn non_post_methods_are_rejected() {
    for method in ["GET", "PUT", "DELETE"] {
        let request = CallbackRequest::new(method, "/voice");
        let err = validator().validate(&request).unwrap_err();
        assert_eq!(err.kind(), "method", "{method} should be rejected");
    }
}

#[test]
fn signed_but_invalid_identity_is_rejected() {
    let fields = [("From", "https://user@host:5061")];

    match validator().validate(&callback("/voice", &fields)) {
        Err(Error::Field(err)) => {
            assert_eq!(err.field(), "From");
            assert!(matches!(err.cause(), ValidationError::Format { .. }));
        }
        other => panic!("expected a field error, got {other:?}"),
    }
}

#[test]
fn unregistered_fields_pass_through_unchecked() {
    let fields = [("CustomParam", "<anything goes>")];

    let values = validator().validate(&callback("/voice", &fields)).unwrap();
    assert_eq!(values.get("CustomParam"), Some("<anything goes>"));
}

#[test]
fn injected_registry_replaces_the_standard_rules() {
    let registry = ValidatorRegistry::builder()
        .rule_with(
            "RecordingStatus",
            CharacterWhitelist::new("abcdefghijklmnopqrstuvwxyz-"),
            RuleOptions::default(),
        )
        .build();
    let v = RequestValidator::with_registry(&ValidatorConfig::new(ORIGIN, TOKEN), Arc::new(registry))
        .unwrap();

    let ok = [("RecordingStatus", "in-progress"), ("Digits", "not keypad")];
    assert!(v.validate(&callback("/status", &ok)).is_ok());

    let bad = [("RecordingStatus", "Completed")];
    match v.validate(&callback("/status", &bad)) {
        Err(Error::Field(err)) => {
            assert_eq!(err.cause(), &ValidationError::Character { character: 'C' })
        }
        other => panic!("expected a field error, got {other:?}"),
    }
}

#[test]
fn endpoint_parser_examples() {
    let parser = EndpointParser::default();

    let phone = parser.parse("+18005642365");
    assert!(phone.is_valid());
    assert!(!phone.is_routing_uri());
    assert_eq!(phone.number(), "+18005642365");

    let foreign = parser.parse("sips:8005642365@domain.sip.us1.example.com:5061");
    assert!(!foreign.is_valid());
    assert_eq!(foreign.number(), "sips:8005642365@domain.sip.us1.example.com:5061");

    assert!(!parser.parse("https://user@host:5061").is_valid());
}

#[test]
fn validator_is_shareable_across_threads() {
    let v = Arc::new(validator());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let v = Arc::clone(&v);
            std::thread::spawn(move || {
                let digits = i.to_string();
                let fields = [("Digits", digits.as_str())];
                v.validate(&callback("/voice", &fields)).is_ok()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
