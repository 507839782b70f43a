//! Token codec.
//!
//! A token is the standard-alphabet Base64 of the AES-128-CBC/PKCS#7
//! ciphertext of `"{subject_id}\|{issued_at_ms}"`, under a fixed key and IV.
//! There is no version byte. Identical inputs always yield the identical
//! token.

use std::fmt;

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};

use crate::{Error, Result, identity::SubjectId};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Length in bytes of both the key and the IV.
pub const KEY_LEN: usize = 16;

/// Literal backslash followed by a pipe.
pub const DELIMITER: &str = "\\|";

/// The decoded content of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
  pub subject_id:   SubjectId,
  pub issued_at_ms: i64,
}

/// Encodes and decodes tokens under one key/IV pair.
///
/// Cloning is cheap; the codec holds 32 bytes and no other state.
#[derive(Clone)]
pub struct TokenCodec {
  key: [u8; KEY_LEN],
  iv:  [u8; KEY_LEN],
}

impl TokenCodec {
  /// Build a codec, rejecting key material that is not exactly
  /// [`KEY_LEN`] bytes. Call once at startup.
  pub fn new(key: &[u8], iv: &[u8]) -> Result<Self> {
    Ok(Self {
      key: fixed_len("token key", key)?,
      iv:  fixed_len("token iv", iv)?,
    })
  }

  pub fn encode(&self, subject_id: SubjectId, issued_at_ms: i64) -> String {
    let raw = format!("{subject_id}{DELIMITER}{issued_at_ms}");
    let ciphertext = Aes128CbcEnc::new(&self.key.into(), &self.iv.into())
      .encrypt_padded_vec_mut::<Pkcs7>(raw.as_bytes());
    B64.encode(ciphertext)
  }

  pub fn decode(&self, token: &str) -> Result<Claim> {
    if token.is_empty() {
      return Err(Error::MalformedToken("empty token".into()));
    }

    let ciphertext = B64
      .decode(token)
      .map_err(|e| Error::MalformedToken(format!("base64: {e}")))?;

    let plaintext = Aes128CbcDec::new(&self.key.into(), &self.iv.into())
      .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
      .map_err(|_| Error::MalformedToken("decryption failed".into()))?;

    let raw = String::from_utf8(plaintext)
      .map_err(|_| Error::MalformedToken("payload is not utf-8".into()))?;

    let fields: Vec<&str> = raw.split(DELIMITER).collect();
    let [subject, issued_at] = fields.as_slice() else {
      return Err(Error::MalformedToken(format!(
        "expected 2 fields, found {}",
        fields.len()
      )));
    };

    let subject_id = subject
      .parse::<i64>()
      .map(SubjectId)
      .map_err(|e| Error::MalformedToken(format!("subject id: {e}")))?;
    let issued_at_ms = issued_at
      .parse::<i64>()
      .map_err(|e| Error::MalformedToken(format!("issue time: {e}")))?;

    tracing::debug!(%subject_id, issued_at_ms, "decoded token");
    Ok(Claim { subject_id, issued_at_ms })
  }
}

impl fmt::Debug for TokenCodec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TokenCodec").finish_non_exhaustive()
  }
}

fn fixed_len(name: &'static str, bytes: &[u8]) -> Result<[u8; KEY_LEN]> {
  bytes.try_into().map_err(|_| Error::KeyLength {
    name,
    expected: KEY_LEN,
    actual: bytes.len(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  const KEY: &[u8] = b"0123456789abcdef";
  const IV: &[u8] = b"fedcba9876543210";

  fn codec() -> TokenCodec { TokenCodec::new(KEY, IV).unwrap() }

  fn assert_malformed(token: &str) {
    match codec().decode(token) {
      Err(Error::MalformedToken(_)) => {}
      other => panic!("expected MalformedToken for {token:?}, got {other:?}"),
    }
  }

  #[test]
  fn matches_reference_ciphertext() {
    // Cross-checked with `openssl enc -aes-128-cbc`.
    let token = codec().encode(SubjectId(1), 1_700_000_000_000);
    assert_eq!(token, "EC3a8lICV5V4ucbq/Rgqgmkcrr1Vjb37SoPltgd5XOg=");
  }

  #[test]
  fn round_trip() {
    let c = codec();
    for (id, at) in [(1, 0), (42, 1_700_000_000_000), (i64::MAX, i64::MAX), (7, -5)] {
      let claim = c.decode(&c.encode(SubjectId(id), at)).unwrap();
      assert_eq!(claim, Claim { subject_id: SubjectId(id), issued_at_ms: at });
    }
  }

  #[test]
  fn deterministic() {
    let c = codec();
    assert_eq!(c.encode(SubjectId(5), 123), c.encode(SubjectId(5), 123));
    assert_ne!(c.encode(SubjectId(5), 123), c.encode(SubjectId(5), 124));
    assert_ne!(c.encode(SubjectId(5), 123), c.encode(SubjectId(6), 123));
  }

  #[test]
  fn rejects_wrong_key_lengths() {
    let err = TokenCodec::new(b"short", IV).unwrap_err();
    assert!(matches!(err, Error::KeyLength { name: "token key", actual: 5, .. }));

    let err = TokenCodec::new(KEY, b"seventeen bytes!!").unwrap_err();
    assert!(matches!(err, Error::KeyLength { name: "token iv", actual: 17, .. }));
  }

  #[test]
  fn rejects_empty_and_non_base64() {
    assert_malformed("");
    assert_malformed("!!!not-base64!!!");
  }

  #[test]
  fn rejects_truncated_ciphertext() {
    // 15 bytes: not a whole number of blocks.
    assert_malformed(&B64.encode([0u8; 15]));
  }

  #[test]
  fn rejects_token_from_another_key() {
    let other = TokenCodec::new(b"ffffffffffffffff", IV).unwrap();
    let token = codec().encode(SubjectId(1), 1_700_000_000_000);
    assert!(matches!(other.decode(&token), Err(Error::MalformedToken(_))));
  }

  #[test]
  fn rejects_wrong_field_count() {
    // "1|1700000000000": plain pipe, one field.
    assert_malformed("a9P/PgnfjkjPvA6FdhIwVg==");
    // "1\|2\|3": three fields.
    assert_malformed("2Zt0jcPXsYI96i8cPb2cLw==");
  }

  #[test]
  fn rejects_non_numeric_fields() {
    // "abc\|1700000000000"
    assert_malformed("zpo1x9/kbJDZ9i9NLfGKT6DVCkIqjczv9SyvXKmJ0Mk=");
    // "1\|17x"
    assert_malformed("ZUabh0GH5N+ZFtCzFJRUgw==");
  }

  #[test]
  fn debug_hides_key_material() {
    assert_eq!(format!("{:?}", codec()), "TokenCodec { .. }");
  }
}
