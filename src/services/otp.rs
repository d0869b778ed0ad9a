// One-time registration codes
// Six-digit numeric codes with an absolute expiry, compared in constant time

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use subtle::ConstantTimeEq;

/// A freshly issued code and the instant after which it stops being accepted
#[derive(Debug, Clone)]
pub struct OneTimeCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl OneTimeCode {
    /// Issue a new code valid for `ttl_seconds` from `now`
    pub fn issue(ttl_seconds: i64, now: DateTime<Utc>) -> Self {
        Self {
            code: generate_code(),
            expires_at: now + Duration::seconds(ttl_seconds),
        }
    }
}

/// Random 6-digit code in 100000..=999999
pub fn generate_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..=999_999);
    code.to_string()
}

/// A code is still valid at exactly its expiry instant
pub fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > expires_at
}

/// Constant-time comparison of a stored code against user input
pub fn codes_match(stored: &str, provided: &str) -> bool {
    let provided = provided.trim();
    if stored.len() != provided.len() {
        return false;
    }
    stored.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// True only when a pending code exists, matches and has not expired
pub fn accepts(
    stored: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    provided: &str,
    now: DateTime<Utc>,
) -> bool {
    match (stored, expires_at) {
        (Some(stored), Some(expires_at)) => {
            // Evaluate both so timing does not reveal which check failed
            let matched = codes_match(stored, provided);
            let live = !is_expired(expires_at, now);
            matched & live
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_shape() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            let n: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn test_issue_sets_future_expiry() {
        let now = Utc::now();
        let otp = OneTimeCode::issue(180, now);
        assert_eq!(otp.expires_at - now, Duration::seconds(180));
        assert!(!is_expired(otp.expires_at, now));
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        assert!(!is_expired(now, now));
        assert!(is_expired(now, now + Duration::seconds(1)));
        assert!(!is_expired(now + Duration::seconds(600), now));
    }

    #[test]
    fn test_codes_match() {
        assert!(codes_match("123456", "123456"));
        assert!(codes_match("123456", " 123456 "));
        assert!(!codes_match("123456", "123457"));
        assert!(!codes_match("123456", "12345"));
        assert!(!codes_match("123456", ""));
    }

    #[test]
    fn test_accepts() {
        let now = Utc::now();
        let later = now + Duration::seconds(180);

        assert!(accepts(Some("111111"), Some(later), "111111", now));
        assert!(!accepts(Some("111111"), Some(later), "222222", now));
        assert!(!accepts(
            Some("111111"),
            Some(later),
            "111111",
            later + Duration::seconds(1)
        ));
        // Cleared after verification
        assert!(!accepts(None, None, "111111", now));
    }
}
