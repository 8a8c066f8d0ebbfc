//! Request signing for robots that verify origin with a shared secret.
//!
//! The string to sign is `"{timestamp_ms}\n{secret}"`, keyed by the secret and
//! hashed with HMAC-SHA256; the raw digest travels Base64-encoded in the `sign`
//! query parameter next to the same `timestamp`.

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::OffsetDateTime;

type HmacSha256 = Hmac<Sha256>;

/// Computes the Base64 signature for `timestamp_ms`. Returns `None` when no
/// secret is configured so callers skip the signature parameters entirely.
pub fn compute_signature(secret: Option<&str>, timestamp_ms: i64) -> Option<String> {
    let secret = secret.filter(|s| !s.is_empty())?;
    let string_to_sign = format!("{timestamp_ms}\n{secret}");
    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(string_to_sign.as_bytes());
    Some(B64.encode(mac.finalize().into_bytes()))
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// The `timestamp`/`sign` pair appended to a signed request URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedQuery {
    pub timestamp_ms: i64,
    pub sign: String,
}

impl SignedQuery {
    /// Captures the clock once and signs it; `None` when signing is disabled.
    pub fn now(secret: Option<&str>) -> Option<Self> {
        let timestamp_ms = now_millis();
        compute_signature(secret, timestamp_ms).map(|sign| Self { timestamp_ms, sign })
    }

    pub fn append_to(&self, url: &mut String) {
        url.push_str("&timestamp=");
        url.push_str(&self.timestamp_ms.to_string());
        url.push_str("&sign=");
        url.push_str(&urlencoding::encode(&self.sign));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic() {
        let a = compute_signature(Some("SECabc"), 1_700_000_000_000).unwrap();
        let b = compute_signature(Some("SECabc"), 1_700_000_000_000).unwrap();
        assert_eq!(a, b);
        let c = compute_signature(Some("SECabc"), 1_700_000_000_001).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn signature_matches_known_vector() {
        let secret = "SEC1234567890abcdef";
        let sig = compute_signature(Some(secret), 1_700_000_000_000).unwrap();
        assert_eq!(sig, "RqBq3E1RTBDv3n2QBCh4adZ2WHk9mVklyUoDBLxarjI=");
        assert_eq!(B64.decode(&sig).unwrap().len(), 32);

        let query = SignedQuery {
            timestamp_ms: 1_700_000_000_000,
            sign: sig,
        };
        let mut url = String::new();
        query.append_to(&mut url);
        assert_eq!(
            url,
            "&timestamp=1700000000000&sign=RqBq3E1RTBDv3n2QBCh4adZ2WHk9mVklyUoDBLxarjI%3D"
        );
    }

    #[test]
    fn missing_or_empty_secret_skips_signing() {
        assert!(compute_signature(None, 1).is_none());
        assert!(compute_signature(Some(""), 1).is_none());
        assert!(SignedQuery::now(None).is_none());
    }

    #[test]
    fn appended_sign_is_url_encoded() {
        let query = SignedQuery {
            timestamp_ms: 42,
            sign: "a+b/c=".into(),
        };
        let mut url = String::from("https://robot.test/send?access_token=t");
        query.append_to(&mut url);
        assert_eq!(
            url,
            "https://robot.test/send?access_token=t&timestamp=42&sign=a%2Bb%2Fc%3D"
        );
    }

    #[test]
    fn clock_is_in_milliseconds() {
        // 2020-01-01T00:00:00Z in ms; anything earlier means seconds or a broken clock.
        assert!(now_millis() > 1_577_836_800_000);
    }
}
