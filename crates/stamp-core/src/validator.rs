//! Freshness check and token rotation.

use chrono::Utc;

use crate::{
  Error, Result,
  identity::SubjectId,
  token::TokenCodec,
};

/// How long a token stays fresh after issue: one hour.
pub const VALIDITY_WINDOW_MS: i64 = 60 * 60 * 1000;

/// Checks that a token belongs to the expected subject and is inside the
/// validity window, and issues its replacement.
///
/// Stateless: the result depends only on the token, the subject and the
/// local wall clock. Clock skew between issuers is not compensated.
#[derive(Debug, Clone)]
pub struct TokenValidator {
  codec: TokenCodec,
}

impl TokenValidator {
  pub fn new(codec: TokenCodec) -> Self { Self { codec } }

  pub fn codec(&self) -> &TokenCodec { &self.codec }

  /// A fresh token for `subject_id`, issued now.
  pub fn mint(&self, subject_id: SubjectId) -> String {
    self.codec.encode(subject_id, now_ms())
  }

  pub fn check_fresh_and_rotate(
    &self,
    token: &str,
    expected: SubjectId,
  ) -> Result<String> {
    self.check_at(token, expected, now_ms())
  }

  /// [`check_fresh_and_rotate`](Self::check_fresh_and_rotate) against an
  /// explicit clock reading.
  pub fn check_at(&self, token: &str, expected: SubjectId, now_ms: i64) -> Result<String> {
    let claim = self.codec.decode(token)?;

    if claim.subject_id != expected {
      return Err(Error::SubjectMismatch { expected, found: claim.subject_id });
    }

    let age_ms = now_ms.saturating_sub(claim.issued_at_ms);
    if age_ms > VALIDITY_WINDOW_MS {
      return Err(Error::Expired { age_ms });
    }

    // The replacement must differ from the presented token.
    let issued_at_ms = now_ms.max(claim.issued_at_ms.saturating_add(1));
    Ok(self.codec.encode(expected, issued_at_ms))
  }
}

pub(crate) fn now_ms() -> i64 { Utc::now().timestamp_millis() }
