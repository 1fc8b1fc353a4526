use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Reasons an authenticity check rejected a request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("signature header is missing")]
    MissingSignature,
    #[error("signature must start with '{0}'")]
    InvalidPrefix(&'static str),
    #[error("signature is not valid hex")]
    InvalidHex,
    #[error("signature is not valid base64")]
    InvalidBase64,
    #[error("signature mismatch")]
    Mismatch,
    #[error("shared secret mismatch")]
    SecretMismatch,
    #[error("invalid verification key: {0}")]
    InvalidKey(String),
}

/// Whether a route authenticates its callers with a shared secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretPolicy {
    /// No secret configured; every request is accepted.
    Disabled,
    Required(String),
}

impl SecretPolicy {
    pub fn from_config(secret: Option<String>) -> Self {
        match secret {
            Some(secret) if !secret.is_empty() => Self::Required(secret),
            _ => Self::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Required(_))
    }

    /// Compares a token delivered in a header or body field.
    pub fn check_token(&self, provided: Option<&str>) -> Result<(), VerifyError> {
        match self {
            Self::Disabled => Ok(()),
            Self::Required(expected) => verify_shared_token(expected, provided),
        }
    }

    /// Checks an HMAC signature header computed over the raw body.
    pub fn check_hmac(
        &self,
        body: &[u8],
        provided: Option<&str>,
        algorithm: HmacAlgorithm,
    ) -> Result<(), VerifyError> {
        match self {
            Self::Disabled => Ok(()),
            Self::Required(secret) => {
                let provided = provided.ok_or(VerifyError::MissingSignature)?;
                verify_hmac_signature(secret.as_bytes(), body, provided, algorithm)
            }
        }
    }
}

/// Digest used for `X-Hub-Signature` style headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmacAlgorithm {
    Sha1,
    Sha256,
}

impl HmacAlgorithm {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1=",
            Self::Sha256 => "sha256=",
        }
    }
}

/// Computes the HMAC of `body` keyed by `secret`.
pub fn compute_hmac(
    secret: &[u8],
    body: &[u8],
    algorithm: HmacAlgorithm,
) -> Result<Vec<u8>, VerifyError> {
    let digest = match algorithm {
        HmacAlgorithm::Sha1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(secret)
                .map_err(|err| VerifyError::InvalidKey(err.to_string()))?;
            mac.update(body);
            mac.finalize().into_bytes().to_vec()
        }
        HmacAlgorithm::Sha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(secret)
                .map_err(|err| VerifyError::InvalidKey(err.to_string()))?;
            mac.update(body);
            mac.finalize().into_bytes().to_vec()
        }
    };
    Ok(digest)
}

/// Verifies a `sha1=<hex>` / `sha256=<hex>` signature over the exact body bytes.
pub fn verify_hmac_signature(
    secret: &[u8],
    body: &[u8],
    provided: &str,
    algorithm: HmacAlgorithm,
) -> Result<(), VerifyError> {
    let hex_part = provided
        .strip_prefix(algorithm.prefix())
        .ok_or(VerifyError::InvalidPrefix(algorithm.prefix()))?;
    let provided_bytes = hex::decode(hex_part).map_err(|_| VerifyError::InvalidHex)?;

    let expected = compute_hmac(secret, body, algorithm)?;
    if expected.as_slice().ct_eq(provided_bytes.as_slice()).into() {
        Ok(())
    } else {
        Err(VerifyError::Mismatch)
    }
}

/// Constant-time comparison of a configured token against the delivered one.
pub fn verify_shared_token(expected: &str, provided: Option<&str>) -> Result<(), VerifyError> {
    let provided = provided.unwrap_or_default();
    if expected.as_bytes().ct_eq(provided.as_bytes()).into() {
        Ok(())
    } else {
        Err(VerifyError::SecretMismatch)
    }
}

/// Verifies a base64 PKCS#1 v1.5 RSA-SHA1 signature of `payload`.
///
/// The key may be SPKI (`BEGIN PUBLIC KEY`) or PKCS#1 (`BEGIN RSA PUBLIC KEY`) PEM.
pub fn verify_rsa_sha1(
    public_key_pem: &str,
    payload: &[u8],
    signature_b64: &str,
) -> Result<(), VerifyError> {
    let key = parse_public_key(public_key_pem)?;
    let raw_signature = BASE64
        .decode(signature_b64.trim())
        .map_err(|_| VerifyError::InvalidBase64)?;
    let signature =
        Signature::try_from(raw_signature.as_slice()).map_err(|_| VerifyError::Mismatch)?;

    VerifyingKey::<Sha1>::new(key)
        .verify(payload, &signature)
        .map_err(|_| VerifyError::Mismatch)
}

fn parse_public_key(pem: &str) -> Result<RsaPublicKey, VerifyError> {
    let pem = pem.trim();
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|err| VerifyError::InvalidKey(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1v15::SigningKey;
    use rsa::pkcs8::{EncodePublicKey, LineEnding};
    use rsa::signature::{SignatureEncoding, Signer};
    use rsa::RsaPrivateKey;

    const SECRET: &[u8] = b"It's a Secret to Everybody";
    const BODY: &[u8] = b"Hello, World!";

    fn sign(body: &[u8], algorithm: HmacAlgorithm) -> String {
        format!(
            "{}{}",
            algorithm.prefix(),
            hex::encode(compute_hmac(SECRET, body, algorithm).expect("hmac"))
        )
    }

    #[test]
    fn accepts_matching_sha1_signature() {
        let signature = sign(BODY, HmacAlgorithm::Sha1);
        assert_eq!(
            verify_hmac_signature(SECRET, BODY, &signature, HmacAlgorithm::Sha1),
            Ok(())
        );
    }

    #[test]
    fn sha256_matches_published_github_vector() {
        let signature = "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17";
        assert_eq!(
            verify_hmac_signature(SECRET, BODY, signature, HmacAlgorithm::Sha256),
            Ok(())
        );
    }

    #[test]
    fn rejects_every_single_byte_mutation_of_signature() {
        let signature = sign(BODY, HmacAlgorithm::Sha1);
        let hex_part = &signature["sha1=".len()..];
        let mut bytes = hex::decode(hex_part).expect("hex");
        for index in 0..bytes.len() {
            bytes[index] ^= 0x01;
            let mutated = format!("sha1={}", hex::encode(&bytes));
            assert_eq!(
                verify_hmac_signature(SECRET, BODY, &mutated, HmacAlgorithm::Sha1),
                Err(VerifyError::Mismatch),
                "mutation at byte {index} must be rejected"
            );
            bytes[index] ^= 0x01;
        }
    }

    #[test]
    fn rejects_every_single_byte_mutation_of_body() {
        let signature = sign(BODY, HmacAlgorithm::Sha1);
        let mut body = BODY.to_vec();
        for index in 0..body.len() {
            body[index] = body[index].wrapping_add(1);
            assert_eq!(
                verify_hmac_signature(SECRET, &body, &signature, HmacAlgorithm::Sha1),
                Err(VerifyError::Mismatch)
            );
            body[index] = body[index].wrapping_sub(1);
        }
    }

    #[test]
    fn rejects_missing_prefix_and_bad_hex() {
        let signature = sign(BODY, HmacAlgorithm::Sha1);
        let bare = signature.trim_start_matches("sha1=");
        assert_eq!(
            verify_hmac_signature(SECRET, BODY, bare, HmacAlgorithm::Sha1),
            Err(VerifyError::InvalidPrefix("sha1="))
        );
        assert_eq!(
            verify_hmac_signature(SECRET, BODY, "sha1=zz", HmacAlgorithm::Sha1),
            Err(VerifyError::InvalidHex)
        );
    }

    #[test]
    fn disabled_policy_accepts_anything() {
        let policy = SecretPolicy::from_config(None);
        assert!(!policy.is_enabled());
        assert_eq!(policy.check_token(None), Ok(()));
        assert_eq!(policy.check_token(Some("whatever")), Ok(()));
        assert_eq!(
            policy.check_hmac(BODY, Some("garbage"), HmacAlgorithm::Sha1),
            Ok(())
        );
        assert_eq!(SecretPolicy::from_config(Some(String::new())), policy);
    }

    #[test]
    fn required_policy_compares_tokens() {
        let policy = SecretPolicy::from_config(Some("s3cret".into()));
        assert_eq!(policy.check_token(Some("s3cret")), Ok(()));
        assert_eq!(
            policy.check_token(Some("s3cre")),
            Err(VerifyError::SecretMismatch)
        );
        assert_eq!(policy.check_token(None), Err(VerifyError::SecretMismatch));
    }

    #[test]
    fn required_policy_needs_signature_header() {
        let policy = SecretPolicy::Required("key".into());
        assert_eq!(
            policy.check_hmac(BODY, None, HmacAlgorithm::Sha1),
            Err(VerifyError::MissingSignature)
        );
    }

    #[test]
    fn rsa_sha1_signature_round_trip() {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 1024).expect("generate key");
        let public_pem = private_key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .expect("public pem");

        let payload = br#"{"status":0,"status_message":"Passed"}"#;
        let signing_key = SigningKey::<Sha1>::new(private_key);
        let signature = BASE64.encode(signing_key.sign(payload).to_bytes());

        assert_eq!(verify_rsa_sha1(&public_pem, payload, &signature), Ok(()));
        assert_eq!(
            verify_rsa_sha1(&public_pem, b"tampered", &signature),
            Err(VerifyError::Mismatch)
        );
        assert_eq!(
            verify_rsa_sha1(&public_pem, payload, "%%%"),
            Err(VerifyError::InvalidBase64)
        );
        assert!(matches!(
            verify_rsa_sha1("not a key", payload, &signature),
            Err(VerifyError::InvalidKey(_))
        ));
    }
}
