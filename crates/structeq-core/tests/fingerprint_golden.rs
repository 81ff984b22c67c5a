use structeq_core::json::JsonInput;
use structeq_core::{canonicalize, fingerprint, CanonicalForm, Scalar};

// Pinned digests of the canonical byte encoding; a change here breaks every
// stored fingerprint.
#[test]
fn json_object_digest_is_stable() {
    let form = canonicalize(&JsonInput::Text(r#"{"b": [2, 1], "a": null}"#)).unwrap();
    assert_eq!(
        fingerprint(&form).to_string(),
        "defe53c9ce929c863a2f8b130b364568bd2e227dcea17ac5026d156346251123"
    );
}

#[test]
fn null_digest_is_stable() {
    let form = CanonicalForm::Scalar(Scalar::Null);
    assert_eq!(
        fingerprint(&form).to_string(),
        "1b16b1df538ba12dc3f97edbb85caa7050d46c148134290feba80f8236c83db9"
    );
}

#[test]
fn serialized_fingerprint_is_hex_string() {
    let form = CanonicalForm::Scalar(Scalar::Null);
    let json = serde_json::to_string(&fingerprint(&form)).unwrap();
    assert_eq!(json, "\"1b16b1df538ba12dc3f97edbb85caa7050d46c148134290feba80f8236c83db9\"");
}
