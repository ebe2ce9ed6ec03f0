use std::net::IpAddr;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;

const OTP_MIN_INTERVAL_SECS: i64 = 60;
const OTP_DAY_WINDOW_SECS: i64 = 24 * 3600;
const OTP_DAY_LIMIT: u32 = 5;

/// Backing store for the OTP limiter: key -> (last_sent_epoch, day_count).
/// In-memory by default; a deployment spanning multiple instances must
/// supply a shared implementation.
pub trait OtpRateStore: Send + Sync {
    fn get(&self, key: &str) -> Option<(i64, u32)>;
    fn set(&self, key: &str, last: i64, day_count: u32);
}

#[derive(Default)]
pub struct InMemoryOtpStore {
    entries: DashMap<String, (i64, u32)>,
}

impl OtpRateStore for InMemoryOtpStore {
    fn get(&self, key: &str) -> Option<(i64, u32)> {
        self.entries.get(key).map(|e| *e.value())
    }

    fn set(&self, key: &str, last: i64, day_count: u32) {
        self.entries.insert(key.to_string(), (last, day_count));
    }
}

/// OTP issuance limiter: at most 1 request per minute and 5 per rolling
/// 24-hour window per (client, email-or-account-code) key.
pub struct OtpLimiter {
    store: Box<dyn OtpRateStore>,
}

impl OtpLimiter {
    pub fn new() -> Self {
        Self::with_store(Box::new(InMemoryOtpStore::default()))
    }

    pub fn with_store(store: Box<dyn OtpRateStore>) -> Self {
        Self { store }
    }

    /// Returns true when the request is allowed and records it.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Utc::now().timestamp())
    }

    fn check_at(&self, key: &str, now: i64) -> bool {
        let (last, mut day_count) = self.store.get(key).unwrap_or((0, 0));

        if now - last < OTP_MIN_INTERVAL_SECS {
            return false;
        }
        if now - last > OTP_DAY_WINDOW_SECS {
            day_count = 0;
        }
        if day_count >= OTP_DAY_LIMIT {
            return false;
        }

        self.store.set(key, now, day_count + 1);
        true
    }
}

impl Default for OtpLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-IP-per-endpoint-class limiter using a fixed window, shared by all
/// mutating and scan endpoints.
pub struct EndpointLimiter {
    /// (class, ip) -> (count, window_start)
    entries: DashMap<(&'static str, IpAddr), (u32, Instant)>,
}

impl EndpointLimiter {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Check if a request is allowed. Returns Ok(()) or Err with
    /// retry-after seconds.
    pub fn check(
        &self,
        class: &'static str,
        ip: IpAddr,
        limit: u32,
        window_secs: u64,
    ) -> Result<(), u64> {
        let window = Duration::from_secs(window_secs);
        let now = Instant::now();

        let mut entry = self.entries.entry((class, ip)).or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > window {
            *count = 1;
            *start = now;
            return Ok(());
        }

        if *count >= limit {
            let elapsed = now.duration_since(*start).as_secs();
            return Err(window_secs.saturating_sub(elapsed));
        }

        *count += 1;
        Ok(())
    }
}

impl Default for EndpointLimiter {
    fn default() -> Self {
        Self::new()
    }
}
