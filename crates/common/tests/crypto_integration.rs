//! Integration tests for the sealing and signature primitives
//!
//! Exercises round-trips across service instances, tamper detection on every
//! byte of a sealed blob, and HMAC verification the way webhook receivers use
//! it.

#![cfg(feature = "runtime")]

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::{Rng, RngCore};
use relaygate_common::crypto::{SealedBlob, NONCE_LEN, TAG_LEN};
use relaygate_common::{hmac_sha256_hex, verify_hmac_sha256_hex, CommonError, SealingService};

/// Round-trip random plaintexts of varying length across two instances that
/// share a key.
#[test]
fn sealing_round_trips_random_plaintexts() {
    let key = SealingService::generate_key();
    let sealer = SealingService::new(key.clone()).expect("failed to init sealer");
    let opener = SealingService::new(key).expect("failed to init opener with same key");

    let mut rng = rand::thread_rng();
    for len in [0usize, 1, 15, 16, 17, 255, 4096] {
        let mut plaintext = vec![0u8; len];
        rng.fill_bytes(&mut plaintext);

        let sealed = sealer.seal_to_string(&plaintext).expect("seal should succeed");
        let opened = opener.open_from_string(&sealed).expect("open should succeed");
        assert_eq!(opened, plaintext, "round trip failed for length {len}");
    }
}

/// Flipping any single bit anywhere in the blob must be detected.
#[test]
fn every_single_bit_flip_is_rejected() {
    let service = SealingService::new(SealingService::generate_key()).expect("service");
    let sealed = service.seal(b"gho_exampletoken").expect("seal");
    let bytes = sealed.to_bytes();

    for index in 0..bytes.len() {
        let mut tampered = bytes.clone();
        let bit = rand::thread_rng().gen_range(0..8);
        tampered[index] ^= 1 << bit;

        let encoded = BASE64.encode(&tampered);
        let err = service.open_from_string(&encoded).expect_err("tampered blob must not open");
        assert!(
            matches!(err, CommonError::Decryption { .. }),
            "byte {index} flip produced unexpected error {err:?}"
        );
    }
}

/// Nonce and tag are recoverable independently of the ciphertext.
#[test]
fn nonce_and_tag_are_recoverable_from_encoded_blob() {
    let service = SealingService::new(SealingService::generate_key()).expect("service");
    let encoded = service.seal_to_string(b"xoxb-bot-token").expect("seal");
    let raw = BASE64.decode(&encoded).expect("base64");

    let blob = SealedBlob::from_bytes(&raw).expect("parse blob");
    assert_eq!(&raw[..NONCE_LEN], &blob.nonce);
    assert_eq!(&raw[NONCE_LEN..NONCE_LEN + TAG_LEN], &blob.tag);
    assert_eq!(blob.ciphertext.len(), b"xoxb-bot-token".len());
}

/// Garbage input surfaces as an integrity failure rather than plaintext.
#[test]
fn malformed_input_never_returns_plaintext() {
    let service = SealingService::new(SealingService::generate_key()).expect("service");

    for input in ["", "%%%not-base64%%%", "AAAA"] {
        let err = service.open_from_string(input).expect_err("must fail");
        assert!(err.is_integrity_failure(), "input {input:?} gave {err:?}");
    }
}

/// Signatures computed with one secret verify only with that secret.
#[test]
fn hmac_signatures_verify_only_with_matching_secret() {
    let body = br#"{"action":"create","type":"Issue","organizationId":"org_1"}"#;
    let signature = hmac_sha256_hex(b"lin_wh_secret", body).expect("sign");

    assert!(verify_hmac_sha256_hex(b"lin_wh_secret", body, &signature));
    assert!(!verify_hmac_sha256_hex(b"another_secret", body, &signature));

    let mut altered = body.to_vec();
    altered[2] = b'A';
    assert!(!verify_hmac_sha256_hex(b"lin_wh_secret", &altered, &signature));
}
