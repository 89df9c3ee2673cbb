//! HS256 compact tokens for the identity flows.
//!
//! Password-reset and email-change links carry a signed token whose payload
//! is `{user_id, new_email?, exp}` with `exp` in unix seconds. The format is
//! the standard three-part compact serialization (`header.payload.signature`,
//! base64url without padding) so existing clients keep working.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac as _};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::TokenError;
use crate::models::UserId;

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Claims carried by an identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// The user this token acts for.
    pub user_id: UserId,
    /// Present only on email-change tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_email: Option<String>,
    /// Expiry, unix seconds.
    pub exp: i64,
}

impl TokenClaims {
    /// Claims for a password-reset token.
    #[must_use]
    pub fn password_reset(user_id: UserId, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            new_email: None,
            exp: expires_at.timestamp(),
        }
    }

    /// Claims for an email-change token.
    #[must_use]
    pub fn email_change(user_id: UserId, new_email: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            new_email: Some(new_email),
            exp: expires_at.timestamp(),
        }
    }

    /// Expiry as an instant.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Signs the claims into a compact token.
pub fn encode(claims: &TokenClaims, secret: &str) -> Result<String, TokenError> {
    let payload = serde_json::to_string(claims).map_err(|e| TokenError::Malformed {
        reason: format!("claims serialization: {e}"),
    })?;

    let head = URL_SAFE_NO_PAD.encode(HEADER.as_bytes());
    let body = URL_SAFE_NO_PAD.encode(payload.as_bytes());
    let signing_input = format!("{head}.{body}");

    let signature = URL_SAFE_NO_PAD.encode(sign(signing_input.as_bytes(), secret)?);
    Ok(format!("{signing_input}.{signature}"))
}

/// Verifies signature and expiry, returning the claims.
pub fn decode(token: &str, secret: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
    let mut parts = token.split('.');
    let (head, body, signature) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(b), Some(s), None) => (h, b, s),
        _ => {
            return Err(TokenError::Malformed {
                reason: "expected three dot-separated segments".to_string(),
            })
        }
    };

    let signing_input = format!("{head}.{body}");
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| TokenError::Malformed {
            reason: format!("bad key: {e}"),
        })?;
    mac.update(signing_input.as_bytes());

    let given = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|e| TokenError::Malformed {
            reason: format!("signature segment: {e}"),
        })?;
    mac.verify_slice(&given)
        .map_err(|_| TokenError::BadSignature)?;

    let payload = URL_SAFE_NO_PAD
        .decode(body)
        .map_err(|e| TokenError::Malformed {
            reason: format!("payload segment: {e}"),
        })?;
    let claims: TokenClaims =
        serde_json::from_slice(&payload).map_err(|e| TokenError::Malformed {
            reason: format!("payload json: {e}"),
        })?;

    if claims.expires_at() <= now {
        return Err(TokenError::Expired {
            expired_at: claims.expires_at(),
        });
    }

    Ok(claims)
}

fn sign(input: &[u8], secret: &str) -> Result<Vec<u8>, TokenError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| TokenError::Malformed {
            reason: format!("bad key: {e}"),
        })?;
    mac.update(input);
    Ok(mac.finalize().into_bytes().to_vec())
}
