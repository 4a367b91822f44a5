use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::services::cache::{CacheClient, CacheError, client::ttl_seconds};

/// OTP lifetime for password resets (10 minutes).
pub const OTP_TTL_SECONDS: u64 = 600;

/// Wrong guesses allowed before the OTP is discarded.
pub const MAX_OTP_ATTEMPTS: u64 = 5;

/// Stores password-reset OTPs, hashed, with a TTL. Each OTP verifies at most once
/// and is dropped after `MAX_OTP_ATTEMPTS` misses.
#[derive(Clone)]
pub struct OtpStore {
    cache: Arc<dyn CacheClient>,
    prefix: String,
}

impl OtpStore {
    pub fn new(cache: Arc<dyn CacheClient>) -> Self {
        Self::new_with_prefix(cache, "otp:pwreset")
    }

    pub fn new_with_prefix(cache: Arc<dyn CacheClient>, prefix: impl Into<String>) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
        }
    }

    fn key(&self, email: &str) -> String {
        format!("{}:{}", self.prefix, email.trim().to_ascii_lowercase())
    }

    fn tries_key(key: &str) -> String {
        format!("{key}:tries")
    }

    /// Generate a 6-digit OTP for `email`, replacing any previous one.
    pub async fn issue(&self, email: &str) -> Result<String, CacheError> {
        let otp = generate_otp()?;
        let key = self.key(email);
        self.cache
            .set_with_ttl(&key, &hash_otp(&otp), ttl_seconds(OTP_TTL_SECONDS))
            .await?;
        self.cache.del(&Self::tries_key(&key)).await?;
        Ok(otp)
    }

    /// Returns `true` when `otp` matches the stored one. A match deletes it.
    pub async fn verify_and_consume(&self, email: &str, otp: &str) -> Result<bool, CacheError> {
        let key = self.key(email);
        let Some(stored) = self.cache.get_string(&key).await? else {
            return Ok(false);
        };
        let tries_key = Self::tries_key(&key);
        if stored != hash_otp(otp.trim()) {
            let tries = self
                .cache
                .incr_with_ttl(&tries_key, ttl_seconds(OTP_TTL_SECONDS))
                .await?;
            if tries >= MAX_OTP_ATTEMPTS {
                tracing::warn!(tries, "too many wrong reset codes, discarding OTP");
                self.cache.del(&key).await?;
                self.cache.del(&tries_key).await?;
            }
            return Ok(false);
        }
        // Whoever deletes the key wins; a concurrent second attempt sees 0.
        let won = self.cache.del(&key).await? == 1;
        self.cache.del(&tries_key).await?;
        Ok(won)
    }
}

fn generate_otp() -> Result<String, CacheError> {
    let mut bytes = [0u8; 4];
    getrandom::fill(&mut bytes).map_err(|e| CacheError::InvalidValue(e.to_string()))?;
    let n = u32::from_le_bytes(bytes) % 1_000_000;
    Ok(format!("{n:06}"))
}

fn hash_otp(otp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(otp.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cache::MemoryCache;

    fn store() -> OtpStore {
        OtpStore::new(Arc::new(MemoryCache::new()))
    }

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..50 {
            let otp = generate_otp().unwrap();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn otp_verifies_once() {
        let store = store();
        let otp = store.issue("Alice@Example.com").await.unwrap();

        assert!(store.verify_and_consume("alice@example.com", &otp).await.unwrap());
        assert!(!store.verify_and_consume("alice@example.com", &otp).await.unwrap());
    }

    #[tokio::test]
    async fn wrong_otp_keeps_the_stored_one() {
        let store = store();
        let otp = store.issue("bob@example.com").await.unwrap();
        let wrong = if otp == "000000" { "111111" } else { "000000" };

        assert!(!store.verify_and_consume("bob@example.com", wrong).await.unwrap());
        assert!(store.verify_and_consume("bob@example.com", &otp).await.unwrap());
    }

    #[tokio::test]
    async fn otp_is_discarded_after_too_many_misses() {
        let store = store();
        let otp = store.issue("dave@example.com").await.unwrap();
        let wrong = if otp == "000000" { "111111" } else { "000000" };

        for _ in 0..MAX_OTP_ATTEMPTS {
            assert!(!store.verify_and_consume("dave@example.com", wrong).await.unwrap());
        }
        assert!(!store.verify_and_consume("dave@example.com", &otp).await.unwrap());
    }

    #[tokio::test]
    async fn reissue_resets_the_miss_count() {
        let store = store();
        let first = store.issue("erin@example.com").await.unwrap();
        let wrong = if first == "000000" { "111111" } else { "000000" };
        for _ in 0..MAX_OTP_ATTEMPTS - 1 {
            assert!(!store.verify_and_consume("erin@example.com", wrong).await.unwrap());
        }

        let second = store.issue("erin@example.com").await.unwrap();
        let wrong = if second == "000000" { "111111" } else { "000000" };
        assert!(!store.verify_and_consume("erin@example.com", wrong).await.unwrap());
        assert!(store.verify_and_consume("erin@example.com", &second).await.unwrap());
    }

    #[tokio::test]
    async fn reissue_invalidates_previous_otp() {
        let store = store();
        let first = store.issue("carol@example.com").await.unwrap();
        let second = store.issue("carol@example.com").await.unwrap();

        if first != second {
            assert!(!store.verify_and_consume("carol@example.com", &first).await.unwrap());
        }
        assert!(store.verify_and_consume("carol@example.com", &second).await.unwrap());
    }
}
