// signature.rs — Ed25519 signature evidence.
//
// The signer must be `ok` in the keyring at the evaluation instant. The
// signature covers the exact UTF-8 bytes of `payload`; nothing is
// canonicalized or re-encoded before verification.

use chrono::{DateTime, Utc};
use pic_keyring::{decode_base64_lenient, KeyStatus, TrustedKeyRing};
use pic_proposal::SigEvidence;
use ring::signature::{UnparsedPublicKey, ED25519};

use crate::error::EvidenceError;

const ED25519_SIGNATURE_LEN: usize = 64;

/// Verify one signature entry against the keyring at `now`.
pub fn verify_signature(
    entry: &SigEvidence,
    keyring: &TrustedKeyRing,
    now: DateTime<Utc>,
) -> Result<(), EvidenceError> {
    let public_key = match keyring.status(&entry.key_id, now) {
        KeyStatus::Ok(pk) => pk,
        other => {
            return Err(EvidenceError::SignerKey {
                key_id: entry.key_id.clone(),
                status: other.as_str(),
            })
        }
    };

    let signature = decode_base64_lenient(&entry.signature)
        .map_err(|_| EvidenceError::InvalidSignatureEncoding)?;
    if signature.len() != ED25519_SIGNATURE_LEN {
        return Err(EvidenceError::InvalidSignatureEncoding);
    }

    UnparsedPublicKey::new(&ED25519, &public_key)
        .verify(entry.payload.as_bytes(), &signature)
        .map_err(|_| EvidenceError::SignatureFailed)
}


#[cfg(test)]
mod tests {
    use super::test_keys::*;
    use super::*;
    use chrono::{Duration, TimeZone};
    use pic_keyring::TrustedKey;

    const PAYLOAD: &str = "amount=500;currency=USD;invoice=123";

    fn entry(signature: String) -> SigEvidence {
        SigEvidence {
            id: "approval_123".into(),
            payload: PAYLOAD.into(),
            signature,
            key_id: "demo_signer_v1".into(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn valid_signature_verifies() {
        let pair = keypair(7);
        let ring = keyring_with("demo_signer_v1", &pair);
        verify_signature(&entry(sign_b64(&pair, PAYLOAD)), &ring, now()).unwrap();
    }

    #[test]
    fn tampered_payload_fails() {
        let pair = keypair(7);
        let ring = keyring_with("demo_signer_v1", &pair);
        let mut e = entry(sign_b64(&pair, PAYLOAD));
        e.payload = "amount=5000;currency=USD;invoice=123".into();
        assert!(matches!(
            verify_signature(&e, &ring, now()),
            Err(EvidenceError::SignatureFailed)
        ));
    }

    #[test]
    fn wrong_key_fails() {
        let ring = keyring_with("demo_signer_v1", &keypair(1));
        let e = entry(sign_b64(&keypair(2), PAYLOAD));
        assert!(matches!(
            verify_signature(&e, &ring, now()),
            Err(EvidenceError::SignatureFailed)
        ));
    }

    #[test]
    fn unknown_key_is_missing() {
        let pair = keypair(7);
        let e = entry(sign_b64(&pair, PAYLOAD));
        match verify_signature(&e, &TrustedKeyRing::empty(), now()) {
            Err(EvidenceError::SignerKey { status, .. }) => assert_eq!(status, "missing"),
            other => panic!("expected missing signer, got {:?}", other),
        }
    }

    #[test]
    fn revoked_key_never_verifies() {
        let pair = keypair(7);
        let mut ring = TrustedKeyRing::empty();
        ring.insert(TrustedKey {
            key_id: "demo_signer_v1".into(),
            public_key: public_key(&pair),
            expires_at: Some(now() + Duration::days(30)),
        });
        ring.revoke("demo_signer_v1");
        let err = verify_signature(&entry(sign_b64(&pair, PAYLOAD)), &ring, now()).unwrap_err();
        assert_eq!(err.to_string(), "signer key revoked: 'demo_signer_v1'");
    }

    #[test]
    fn expired_key_never_verifies() {
        let pair = keypair(7);
        let mut ring = TrustedKeyRing::empty();
        ring.insert(TrustedKey {
            key_id: "demo_signer_v1".into(),
            public_key: public_key(&pair),
            expires_at: Some(now() - Duration::seconds(1)),
        });
        match verify_signature(&entry(sign_b64(&pair, PAYLOAD)), &ring, now()) {
            Err(EvidenceError::SignerKey { status, .. }) => assert_eq!(status, "expired"),
            other => panic!("expected expired signer, got {:?}", other),
        }
    }

    #[test]
    fn malformed_signature_is_an_encoding_failure() {
        let ring = keyring_with("demo_signer_v1", &keypair(7));
        for bad in ["***", "AAAA"] {
            assert!(matches!(
                verify_signature(&entry(bad.into()), &ring, now()),
                Err(EvidenceError::InvalidSignatureEncoding)
            ));
        }
    }
}
