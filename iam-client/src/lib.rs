//! Stateless authenticated token codec binding a student id (`sid`) to
//! a printable API key string, with no server-side session storage.
//!
//! Construction: `BLAKE2b(sid)` (16-byte digest) is encrypted under a
//! `ChaCha20` stream keyed by a 32-byte system secret with a nonce
//! derived from that same secret, then base64url-encoded and joined
//! to the cleartext `sid` with a colon: `<digest-ciphertext>:<sid>`.
//! Verifying recomputes the digest from the cleartext suffix and
//! checks it against the decrypted prefix.

use blake2::Blake2b;
use blake2::digest::{Digest, consts::U16};
use chacha20::ChaCha20;
use chacha20::cipher::{KeyIvInit, StreamCipher};
use thiserror::Error;

const SECRET_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const DIGEST_LEN: usize = 16;

type Blake2b128 = Blake2b<U16>;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("api key secret must be exactly {SECRET_LEN} bytes, got {0}")]
    BadSecretLen(usize),
}

/// Holds the system secret and derives the codec's cipher key/nonce
/// from it once, rather than on every call.
#[derive(Clone)]
pub struct TokenCodec {
    secret: [u8; SECRET_LEN],
}

impl TokenCodec {
    pub fn new(secret: [u8; SECRET_LEN]) -> Self {
        Self { secret }
    }

    pub fn from_slice(secret: &[u8]) -> Result<Self, TokenError> {
        let secret: [u8; SECRET_LEN] = secret
            .try_into()
            .map_err(|_| TokenError::BadSecretLen(secret.len()))?;
        Ok(Self::new(secret))
    }

    fn nonce(&self) -> [u8; NONCE_LEN] {
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&self.secret[..NONCE_LEN]);
        nonce
    }

    fn cipher(&self) -> ChaCha20 {
        ChaCha20::new(&self.secret.into(), &self.nonce().into())
    }

    fn digest(sid: &str) -> [u8; DIGEST_LEN] {
        let mut hasher = Blake2b128::new();
        hasher.update(sid.as_bytes());
        let out = hasher.finalize();
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&out);
        digest
    }

    /// Produces `<b64url ciphertext>:<sid>` for the given principal.
    pub fn encode(&self, sid: &str) -> String {
        let mut buf = Self::digest(sid);
        self.cipher().apply_keystream(&mut buf);
        format!("{}:{}", base64_url::encode(&buf), sid)
    }

    /// Recovers the principal from a token, or `None` if it is
    /// malformed or fails authentication.
    pub fn verify(&self, token: &str) -> Option<String> {
        let (prefix, sid) = token.split_once(':')?;
        let mut ciphertext = base64_url::decode(prefix).ok()?;
        if ciphertext.len() != DIGEST_LEN {
            return None;
        }
        self.cipher().apply_keystream(&mut ciphertext);
        if ciphertext[..] != Self::digest(sid)[..] {
            return None;
        }
        Some(sid.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new([7u8; SECRET_LEN])
    }

    #[test]
    fn round_trips_a_student_id() {
        let codec = codec();
        let token = codec.encode("24111352");
        assert_eq!(codec.verify(&token), Some("24111352".to_string()));
    }

    #[test]
    fn rejects_tampered_prefix() {
        let codec = codec();
        let mut token = codec.encode("24111352");
        token.replace_range(0..1, if token.starts_with('A') { "B" } else { "A" });
        assert_eq!(codec.verify(&token), None);
    }

    #[test]
    fn rejects_mismatched_suffix() {
        let codec = codec();
        let token = codec.encode("24111352");
        let (prefix, _) = token.split_once(':').unwrap();
        let forged = format!("{prefix}:99999999");
        assert_eq!(codec.verify(&forged), None);
    }

    #[test]
    fn rejects_malformed_token() {
        let codec = codec();
        assert_eq!(codec.verify("not-a-token-at-all"), None);
        assert_eq!(codec.verify(""), None);
    }

    #[test]
    fn different_secrets_do_not_cross_verify() {
        let a = TokenCodec::new([1u8; SECRET_LEN]);
        let b = TokenCodec::new([2u8; SECRET_LEN]);
        let token = a.encode("24111352");
        assert_eq!(b.verify(&token), None);
    }

    #[test]
    fn encoding_is_deterministic() {
        let codec = codec();
        assert_eq!(codec.encode("abc"), codec.encode("abc"));
    }
}
