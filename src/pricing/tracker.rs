//! Stale-response guard for estimation requests
//!
//! Estimates are re-run on every input change and the network replies can
//! land out of order. Each request takes a monotonically increasing
//! generation; only the newest issued generation may publish its quote, so a
//! slow reply can never overwrite the result of a later request.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// A completed estimation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub origin_token: String,
    pub destination_token: String,
    pub destination_amount: f64,
    pub rate: f64,
    pub source_amount: f64,
    pub generation: u64,
}

/// Tracks estimation request generations and the latest published quote
pub struct QuoteTracker {
    issued: AtomicU64,
    latest: RwLock<Option<Quote>>,
}

impl QuoteTracker {
    pub fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
            latest: RwLock::new(None),
        }
    }

    /// Stamp a new request. The returned generation must accompany the
    /// eventual `publish` call.
    pub fn begin(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publish a completed quote. Returns false (and drops the quote) when a
    /// newer request was issued while this one was in flight.
    pub async fn publish(&self, quote: Quote) -> bool {
        if quote.generation != self.issued.load(Ordering::SeqCst) {
            return false;
        }
        *self.latest.write().await = Some(quote);
        true
    }

    /// Most recently published quote, if any
    pub async fn latest(&self) -> Option<Quote> {
        self.latest.read().await.clone()
    }
}

impl Default for QuoteTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(generation: u64, rate: f64) -> Quote {
        Quote {
            origin_token: "ETH".to_string(),
            destination_token: "USDC".to_string(),
            destination_amount: 300.0,
            rate,
            source_amount: 300.0 / rate,
            generation,
        }
    }

    #[tokio::test]
    async fn test_newest_generation_publishes() {
        let tracker = QuoteTracker::new();
        let generation = tracker.begin();

        assert!(tracker.publish(quote(generation, 3000.0)).await);
        assert_eq!(tracker.latest().await.unwrap().rate, 3000.0);
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let tracker = QuoteTracker::new();
        let first = tracker.begin();
        let second = tracker.begin();

        // the older request resolves after the newer one was issued
        assert!(!tracker.publish(quote(first, 2900.0)).await);
        assert!(tracker.latest().await.is_none());

        assert!(tracker.publish(quote(second, 3000.0)).await);
        assert_eq!(tracker.latest().await.unwrap().rate, 3000.0);
    }

    #[tokio::test]
    async fn test_stale_response_cannot_overwrite_newer_result() {
        let tracker = QuoteTracker::new();
        let first = tracker.begin();
        let second = tracker.begin();

        assert!(tracker.publish(quote(second, 3000.0)).await);
        assert!(!tracker.publish(quote(first, 2900.0)).await);

        assert_eq!(tracker.latest().await.unwrap().generation, second);
    }

    #[tokio::test]
    async fn test_generations_are_monotonic() {
        let tracker = QuoteTracker::new();
        let a = tracker.begin();
        let b = tracker.begin();
        let c = tracker.begin();
        assert!(a < b && b < c);
    }
}
