/// Integration tests for the crypto-core token codec
///
/// This test module covers:
/// - Tamper detection across every payload and signature position
/// - Codec sharing across threads
/// - Lifecycle of a token from issuance to expiry
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Duration, TimeZone, Utc};
use crypto_core::jwt::{Principal, RejectReason, TokenCodec, ValidationOutcome};

const TEST_SECRET: &[u8] = b"integration-test-secret-do-not-use-in-prod";

fn codec() -> TokenCodec {
    TokenCodec::new(TEST_SECRET, Duration::minutes(15)).expect("Failed to build codec")
}

fn issued_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 8, 30, 0).unwrap()
}

fn flip(c: u8) -> u8 {
    // Stay inside the base64url alphabet so only the signature can catch it.
    if c == b'A' {
        b'B'
    } else {
        b'A'
    }
}

fn tamper_at(token: &str, index: usize) -> String {
    let mut bytes = token.as_bytes().to_vec();
    bytes[index] = flip(bytes[index]);
    String::from_utf8(bytes).unwrap()
}

#[test]
fn test_every_payload_position_is_tamper_evident() {
    let codec = codec();
    let principal = Principal::new(42, "shopper@example.com", false).unwrap();
    let token = codec.encode(&principal, issued_at()).unwrap();

    let first_dot = token.find('.').unwrap();
    let last_dot = token.rfind('.').unwrap();

    for index in (first_dot + 1)..last_dot {
        let tampered = tamper_at(&token, index);
        assert_eq!(
            codec.decode(&tampered, issued_at()),
            ValidationOutcome::Rejected(RejectReason::SignatureInvalid),
            "payload byte {index} flipped"
        );
    }
}

#[test]
fn test_every_signature_position_is_tamper_evident() {
    let codec = codec();
    let principal = Principal::new(42, "shopper@example.com", true).unwrap();
    let token = codec.encode(&principal, issued_at()).unwrap();

    let last_dot = token.rfind('.').unwrap();
    for index in (last_dot + 1)..token.len() {
        let tampered = tamper_at(&token, index);
        assert_eq!(
            codec.decode(&tampered, issued_at()),
            ValidationOutcome::Rejected(RejectReason::SignatureInvalid),
            "signature byte {index} flipped"
        );
    }
}

#[test]
fn test_truncated_signature_is_rejected() {
    let codec = codec();
    let principal = Principal::new(7, "shopper@example.com", false).unwrap();
    let token = codec.encode(&principal, issued_at()).unwrap();

    let truncated = &token[..token.len() - 4];
    assert_eq!(
        codec.decode(truncated, issued_at()),
        ValidationOutcome::Rejected(RejectReason::SignatureInvalid)
    );
}

#[test]
fn test_codec_shared_across_threads() {
    let codec = Arc::new(codec());
    let now = issued_at();

    let handles: Vec<_> = (1..=32)
        .map(|id| {
            let codec = Arc::clone(&codec);
            thread::spawn(move || {
                let principal =
                    Principal::new(id, format!("user{id}@example.com"), id % 2 == 0).unwrap();
                let token = codec.encode(&principal, now).unwrap();
                let claims = codec.decode(&token, now).into_result().unwrap();
                (id, claims)
            })
        })
        .collect();

    for handle in handles {
        let (id, claims) = handle.join().expect("thread panicked");
        assert_eq!(claims.subject_id(), id);
        assert_eq!(claims.contact(), format!("user{id}@example.com"));
        assert_eq!(claims.privileged(), id % 2 == 0);
    }
}

#[test]
fn test_complete_token_lifecycle() {
    let codec = codec();
    let principal = Principal::new(99, "shopper@example.com", false).unwrap();
    let token = codec.encode(&principal, issued_at()).unwrap();

    // Freshly issued
    assert!(codec.decode(&token, issued_at()).into_result().is_ok());

    // One second before expiry
    let almost = issued_at() + codec.lifetime() - Duration::seconds(1);
    assert!(codec.decode(&token, almost).into_result().is_ok());

    // At expiry
    let at_expiry = issued_at() + codec.lifetime();
    assert_eq!(
        codec.decode(&token, at_expiry).into_result(),
        Err(RejectReason::Expired)
    );
}

#[test]
fn test_tokens_from_separate_codecs_with_same_secret_interoperate() {
    let issuer = codec();
    let verifier = codec();
    let principal = Principal::new(3, "shopper@example.com", false).unwrap();

    let token = issuer.encode(&principal, issued_at()).unwrap();
    let claims = verifier.decode(&token, issued_at()).into_result().unwrap();
    assert_eq!(claims.subject_id(), 3);
}
