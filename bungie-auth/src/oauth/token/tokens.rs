//! OAuth token types.

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::Deserialize;

use crate::error::{oauth_error, Error, OAuthErrorKind};

/// Tokens closer than this to their expiry are treated as expired, so a
/// request is never started with a token that lapses in flight.
const EXPIRY_SKEW_SECONDS: i64 = 30;

/// Whether a token expiring at `expires_at` must no longer be used at `now`.
///
/// A token without an expiry never expires.
pub fn is_expired_at(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expires_at {
        Some(expires) => now
            .checked_add_signed(Duration::seconds(EXPIRY_SKEW_SECONDS))
            .map_or(true, |deadline| expires <= deadline),
        None => false,
    }
}

/// Access token with metadata.
#[derive(Debug, Clone)]
pub struct Tokens {
    /// Access token for API requests.
    pub access_token: SecretString,
    /// When the access token expires, if the server said so.
    pub expires_at: Option<DateTime<Utc>>,
    /// Bungie.net membership id of the user the token was issued to.
    pub membership_id: Option<String>,
}

impl Tokens {
    /// Check expiry against an explicit point in time.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        is_expired_at(self.expires_at, now)
    }

    /// Get the remaining time until expiration.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expires_at.map(|expires| expires - Utc::now())
    }
}

/// Successful body of the token endpoint.
///
/// Bungie.net also returns refresh token fields for confidential clients; they
/// are ignored because tokens are never refreshed.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub membership_id: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenResponse {
    /// Convert into `Tokens`, anchoring `expires_in` at `issued_at`.
    ///
    /// Only bearer tokens are accepted, since that is how they are sent.
    pub fn into_tokens(self, issued_at: DateTime<Utc>) -> Result<Tokens, Error> {
        if self.access_token.trim().is_empty() {
            return Err(oauth_error(
                OAuthErrorKind::InvalidResponse,
                "token response contained an empty access_token",
            ));
        }
        if !self.token_type.eq_ignore_ascii_case("bearer") {
            return Err(oauth_error(
                OAuthErrorKind::InvalidResponse,
                &format!("unsupported token_type {}", self.token_type),
            ));
        }

        let expires_at = match self.expires_in {
            Some(seconds) => Some(
                Duration::try_seconds(seconds)
                    .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
                    .ok_or_else(|| {
                        oauth_error(
                            OAuthErrorKind::InvalidResponse,
                            &format!("expires_in {seconds} is out of range"),
                        )
                    })?,
            ),
            None => None,
        };

        Ok(Tokens {
            access_token: SecretString::new(self.access_token),
            expires_at,
            membership_id: self.membership_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn tokens_expiring_at(expires_at: Option<DateTime<Utc>>) -> Tokens {
        Tokens {
            access_token: SecretString::new("test".to_string()),
            expires_at,
            membership_id: None,
        }
    }

    #[test]
    fn test_token_not_expired() {
        let tokens = tokens_expiring_at(Some(Utc::now() + Duration::hours(1)));
        assert!(!tokens.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_token_expired() {
        let tokens = tokens_expiring_at(Some(Utc::now() - Duration::hours(1)));
        assert!(tokens.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_token_expiring_within_skew() {
        let tokens = tokens_expiring_at(Some(Utc::now() + Duration::seconds(10)));
        assert!(tokens.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_token_without_expiry_never_expires() {
        assert!(!tokens_expiring_at(None).is_expired_at(Utc::now()));
    }

    #[test]
    fn test_expiry_check_near_the_end_of_time() {
        assert!(is_expired_at(Some(DateTime::<Utc>::MAX_UTC), DateTime::<Utc>::MAX_UTC));
    }

    #[test]
    fn test_token_response_computes_expiry() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"tok-1","token_type":"Bearer","expires_in":3600,"membership_id":"4611686018467284386"}"#,
        )
        .unwrap();
        let issued_at = Utc::now();

        let tokens = response.into_tokens(issued_at).unwrap();
        assert_eq!(tokens.access_token.expose_secret(), "tok-1");
        assert_eq!(tokens.expires_at, Some(issued_at + Duration::seconds(3600)));
        assert_eq!(tokens.membership_id.as_deref(), Some("4611686018467284386"));
    }

    #[test]
    fn test_token_response_defaults_to_bearer_without_expiry() {
        let response: TokenResponse = serde_json::from_str(r#"{"access_token":"tok-1"}"#).unwrap();
        let tokens = response.into_tokens(Utc::now()).unwrap();
        assert_eq!(tokens.expires_at, None);
    }

    #[test]
    fn test_token_response_rejects_non_bearer_token_type() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"tok-1","token_type":"mac"}"#).unwrap();
        let err = response.into_tokens(Utc::now()).unwrap_err();
        assert_eq!(
            err.error_kind,
            crate::ErrorKind::OAuth(OAuthErrorKind::InvalidResponse)
        );
    }

    #[test]
    fn test_token_response_rejects_out_of_range_expires_in() {
        for expires_in in [i64::MAX, i64::MIN] {
            let response: TokenResponse = serde_json::from_str(&format!(
                r#"{{"access_token":"tok-1","expires_in":{expires_in}}}"#
            ))
            .unwrap();
            let err = response.into_tokens(Utc::now()).unwrap_err();
            assert_eq!(
                err.error_kind,
                crate::ErrorKind::OAuth(OAuthErrorKind::InvalidResponse)
            );
        }
    }

    #[test]
    fn test_token_response_rejects_empty_token() {
        let response: TokenResponse = serde_json::from_str(r#"{"access_token":""}"#).unwrap();
        let err = response.into_tokens(Utc::now()).unwrap_err();
        assert_eq!(
            err.error_kind,
            crate::ErrorKind::OAuth(OAuthErrorKind::InvalidResponse)
        );
    }
}
