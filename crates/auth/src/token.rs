//! Short-lived IAM bearer tokens for SASL/OAUTHBEARER.
//!
//! A token is a presigned `kafka-cluster:Connect` request, base64url-encoded.
//! [`IamTokenProvider`] caches one token and moves it through
//!
//! ```text
//! Unset ──generate──► Valid ──(margin reached)──► Expiring ──(expiry)──► Expired
//!                       ▲                            │                     │
//!                       └────────regenerate──────────┴─────────────────────┘
//! ```
//!
//! The provider is called from librdkafka's own threads, so the whole
//! check-then-regenerate sequence runs under one mutex. Regeneration is pure
//! signing over already-resolved keys; nothing in the critical section
//! touches the network.

use crate::error::{AuthError, Result};
use crate::identity::AwsKeys;
use crate::sigv4::{uri_encode, Presigner};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Lifetime the broker grants a token, in seconds.
pub const TOKEN_VALIDITY_SECS: i64 = 900;

/// How long before expiry a cached token counts as expiring.
pub const DEFAULT_REFRESH_MARGIN_SECS: i64 = 60;

const SERVICE: &str = "kafka-cluster";
const ACTION: &str = "kafka-cluster:Connect";
const USER_AGENT: &str = concat!("msk-admin/", env!("CARGO_PKG_VERSION"));

/// Wall-clock source, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A signed token and its validity window.
#[derive(Clone, PartialEq, Eq)]
pub struct IamToken {
    value: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl IamToken {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl fmt::Debug for IamToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IamToken")
            .field("value", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Unset,
    Valid,
    Expiring,
    Expired,
}

/// Classify a cached token's expiry against `now`.
pub fn token_state(
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    refresh_margin: Duration,
) -> TokenState {
    let Some(expires_at) = expires_at else {
        return TokenState::Unset;
    };
    let remaining = expires_at - now;
    if remaining <= Duration::zero() {
        TokenState::Expired
    } else if remaining <= refresh_margin {
        TokenState::Expiring
    } else {
        TokenState::Valid
    }
}

/// Sign a fresh token for `region` at `issued_at`.
///
/// The issue time is truncated to whole seconds, matching the resolution of
/// `X-Amz-Date`.
pub fn generate_token(region: &str, keys: &AwsKeys, issued_at: DateTime<Utc>) -> IamToken {
    let issued_at = issued_at.trunc_subsecs(0);
    let host = format!("kafka.{region}.amazonaws.com");
    let presigner = Presigner {
        service: SERVICE,
        region,
        host: &host,
        expires_secs: TOKEN_VALIDITY_SECS as u64,
    };

    let mut url = presigner.presign(keys, &[("Action", ACTION)], issued_at);
    url.push_str("&User-Agent=");
    url.push_str(&uri_encode(USER_AGENT));

    IamToken {
        value: URL_SAFE_NO_PAD.encode(url.as_bytes()),
        issued_at,
        expires_at: issued_at + Duration::seconds(TOKEN_VALIDITY_SECS),
    }
}

#[derive(Default)]
struct Cache {
    token: Option<IamToken>,
    // Set once the Expiring token has been handed out; the next call regenerates.
    refresh_due: bool,
}

/// Thread-safe cache of one IAM token for one identity.
pub struct IamTokenProvider {
    region: String,
    keys: AwsKeys,
    refresh_margin: Duration,
    clock: Arc<dyn Clock>,
    cache: Mutex<Cache>,
}

impl IamTokenProvider {
    pub fn new(region: impl Into<String>, keys: AwsKeys) -> Self {
        Self {
            region: region.into(),
            keys,
            refresh_margin: Duration::seconds(DEFAULT_REFRESH_MARGIN_SECS),
            clock: Arc::new(SystemClock),
            cache: Mutex::new(Cache::default()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Principal name reported to the broker alongside the token.
    pub fn principal(&self) -> &str {
        self.keys.access_key_id()
    }

    pub fn state(&self) -> TokenState {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        token_state(
            cache.token.as_ref().map(IamToken::expires_at),
            self.clock.now(),
            self.refresh_margin,
        )
    }

    /// Return `(token, expiry as epoch seconds)`, regenerating when needed.
    pub fn token(&self) -> Result<(String, i64)> {
        let now = self.clock.now();
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());

        let state = token_state(
            cache.token.as_ref().map(IamToken::expires_at),
            now,
            self.refresh_margin,
        );
        let reuse = match state {
            TokenState::Valid => true,
            TokenState::Expiring if !cache.refresh_due => {
                cache.refresh_due = true;
                true
            }
            TokenState::Expiring | TokenState::Expired | TokenState::Unset => false,
        };
        if reuse {
            if let Some(token) = &cache.token {
                return Ok((token.value.clone(), token.expires_at.timestamp()));
            }
        }

        if self.keys.is_expired_at(now) {
            return Err(AuthError::CredentialUnavailable(
                "AWS credentials have expired; re-resolve the identity".to_string(),
            ));
        }

        let token = generate_token(&self.region, &self.keys, now);
        debug!(previous = ?state, expires_at = %token.expires_at, "Generated IAM token");
        if state == TokenState::Unset {
            info!(region = %self.region, "Issued first IAM token");
        }

        let result = (token.value.clone(), token.expires_at.timestamp());
        cache.token = Some(token);
        cache.refresh_due = false;
        Ok(result)
    }
}

impl fmt::Debug for IamTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IamTokenProvider")
            .field("region", &self.region)
            .field("keys", &self.keys)
            .field("refresh_margin", &self.refresh_margin)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::thread;

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn at(t: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(t)))
        }

        fn advance(&self, secs: i64) {
            let mut now = self.0.lock().unwrap();
            *now += Duration::seconds(secs);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn provider(clock: Arc<ManualClock>) -> IamTokenProvider {
        IamTokenProvider::new("us-east-1", AwsKeys::new("AKIDEXAMPLE", "secret", None))
            .with_clock(clock)
    }

    #[test]
    fn test_token_state_boundaries() {
        let now = start();
        let margin = Duration::seconds(60);
        assert_eq!(token_state(None, now, margin), TokenState::Unset);
        assert_eq!(
            token_state(Some(now + Duration::seconds(61)), now, margin),
            TokenState::Valid
        );
        assert_eq!(
            token_state(Some(now + Duration::seconds(60)), now, margin),
            TokenState::Expiring
        );
        assert_eq!(token_state(Some(now), now, margin), TokenState::Expired);
        assert_eq!(
            token_state(Some(now - Duration::seconds(1)), now, margin),
            TokenState::Expired
        );
    }

    #[test]
    fn test_generated_token_decodes_to_presigned_url() {
        let keys = AwsKeys::new("AKIDEXAMPLE", "secret", Some("session".to_string()));
        let token = generate_token("eu-west-1", &keys, start());

        assert_eq!(token.expires_at() - token.issued_at(), Duration::seconds(900));
        assert!(!token.value().contains('='));

        let url = String::from_utf8(URL_SAFE_NO_PAD.decode(token.value()).unwrap()).unwrap();
        assert!(url.starts_with("https://kafka.eu-west-1.amazonaws.com/?Action=kafka-cluster%3AConnect&"));
        assert!(url.contains("X-Amz-Security-Token=session"));
        assert!(url.contains("&X-Amz-Signature="));
        assert!(url.ends_with(&format!("&User-Agent={}", uri_encode(USER_AGENT))));
    }

    #[test]
    fn test_generated_token_golden_value() {
        assert_eq!(USER_AGENT, "msk-admin/0.1.0");
        let keys = AwsKeys::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            Some("session-token-example".to_string()),
        );
        let issued_at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let token = generate_token("us-east-1", &keys, issued_at);

        assert_eq!(
            token.value(),
            "aHR0cHM6Ly9rYWZrYS51cy1lYXN0LTEuYW1hem9uYXdzLmNvbS8_QWN0aW9uPWthZmthLWNsdXN0ZXIlM0FDb25uZWN0JlgtQW16LUFsZ29yaXRobT1BV1M0LUhNQUMtU0hBMjU2JlgtQW16LUNyZWRlbnRpYWw9QUtJREVYQU1QTEUlMkYyMDI0MDExNSUyRnVzLWVhc3QtMSUyRmthZmthLWNsdXN0ZXIlMkZhd3M0X3JlcXVlc3QmWC1BbXotRGF0ZT0yMDI0MDExNVQxMDMwMDBaJlgtQW16LUV4cGlyZXM9OTAwJlgtQW16LVNlY3VyaXR5LVRva2VuPXNlc3Npb24tdG9rZW4tZXhhbXBsZSZYLUFtei1TaWduZWRIZWFkZXJzPWhvc3QmWC1BbXotU2lnbmF0dXJlPTdjYWVlN2MyNjUyMTNlZmUzMjhhZWQxMGI4NmE5ZDk4OGMyZjYzM2JhODRlNzc5NjUyMjk2NmY4ZWY2NTA1ZjkmVXNlci1BZ2VudD1tc2stYWRtaW4lMkYwLjEuMA"
        );
        assert_eq!(token.expires_at().timestamp(), issued_at.timestamp() + 900);
    }

    #[test]
    fn test_issue_time_truncated_to_seconds() {
        let keys = AwsKeys::new("AKID", "secret", None);
        let t = start() + Duration::milliseconds(750);
        let token = generate_token("us-east-1", &keys, t);
        assert_eq!(token.issued_at(), start());
    }

    #[test]
    fn test_valid_token_is_reused() {
        let clock = ManualClock::at(start());
        let p = provider(clock.clone());
        assert_eq!(p.state(), TokenState::Unset);

        let first = p.token().unwrap();
        assert_eq!(p.state(), TokenState::Valid);
        clock.advance(300);
        let second = p.token().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_expiring_token_served_once_then_regenerated() {
        let clock = ManualClock::at(start());
        let p = provider(clock.clone());
        let (first, first_expiry) = p.token().unwrap();

        clock.advance(TOKEN_VALIDITY_SECS - 30);
        assert_eq!(p.state(), TokenState::Expiring);
        let (again, _) = p.token().unwrap();
        assert_eq!(again, first);

        let (fresh, fresh_expiry) = p.token().unwrap();
        assert_ne!(fresh, first);
        assert!(fresh_expiry > first_expiry);
        assert_eq!(p.state(), TokenState::Valid);
    }

    #[test]
    fn test_expired_token_regenerated_with_later_expiry() {
        let clock = ManualClock::at(start());
        let p = provider(clock.clone());
        let (first, first_expiry) = p.token().unwrap();

        clock.advance(TOKEN_VALIDITY_SECS + 5);
        assert_eq!(p.state(), TokenState::Expired);
        let (second, second_expiry) = p.token().unwrap();
        assert_ne!(first, second);
        assert!(second_expiry > first_expiry);
    }

    #[test]
    fn test_expired_keys_are_unavailable() {
        let clock = ManualClock::at(start());
        let keys = AwsKeys::new("AKID", "secret", Some("t".to_string()))
            .with_expiry(start() - Duration::seconds(1));
        let p = IamTokenProvider::new("us-east-1", keys).with_clock(clock);

        let err = p.token().unwrap_err();
        assert_eq!(err.kind(), "CredentialUnavailable");
    }

    #[test]
    fn test_concurrent_callers_share_one_token() {
        let clock = ManualClock::at(start());
        let p = Arc::new(provider(clock));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let p = Arc::clone(&p);
                thread::spawn(move || p.token().unwrap())
            })
            .collect();
        let tokens: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(tokens.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_debug_redacts_token() {
        let keys = AwsKeys::new("AKID", "secret", None);
        let token = generate_token("us-east-1", &keys, start());
        let rendered = format!("{token:?}");
        assert!(!rendered.contains(token.value()));
        assert!(rendered.contains("REDACTED"));
    }
}
