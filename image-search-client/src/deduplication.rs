use crate::error::{Error, Result};
use crate::image::{ResolvedImage, Source};
use crate::search_key::SearchKey;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::Future;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Configuration for request deduplication
#[derive(Clone, Debug)]
pub struct DeduplicationConfig {
    /// Upper bound on a single outbound request
    pub request_timeout: Duration,
    /// Whether deduplication is enabled
    pub enabled: bool,
}

impl Default for DeduplicationConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::seconds(30),
            enabled: true,
        }
    }
}

/// Identifies one coalescing slot.
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub struct FlightKey {
    pub key: SearchKey,
    pub source: Source,
}

impl FlightKey {
    pub fn new(key: SearchKey, source: Source) -> Self {
        Self { key, source }
    }
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source, self.key)
    }
}

/// Terminal value of a flight, delivered identically to every caller.
#[derive(Clone, Debug, PartialEq)]
pub enum FlightOutcome {
    Resolved(Vec<ResolvedImage>),
    Failed(String),
}

/// Whether a caller drove the outbound request or joined one in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlightRole {
    Leader,
    Follower,
}

/// A pending request and the callers waiting on it.
struct InFlightRequest {
    started_at: DateTime<Utc>,
    waiters: Vec<oneshot::Sender<FlightOutcome>>,
}

impl InFlightRequest {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            waiters: Vec::new(),
        }
    }
}

/// Clears the slot when the leader finishes or is dropped mid-flight, so a
/// cancelled leader never strands its followers.
struct FlightGuard<'a> {
    pending: &'a DashMap<FlightKey, InFlightRequest>,
    key: &'a FlightKey,
    settled: bool,
}

impl FlightGuard<'_> {
    fn settle(mut self, outcome: &FlightOutcome) {
        self.settled = true;
        if let Some((_, request)) = self.pending.remove(self.key) {
            log::debug!(
                "Notifying {} waiters for {} after {}ms",
                request.waiters.len(),
                self.key,
                (Utc::now() - request.started_at).num_milliseconds()
            );

            for waiter in request.waiters {
                let _ = waiter.send(outcome.clone());
            }
        }
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.settled && self.pending.remove(self.key).is_some() {
            log::warn!("In-flight request for {} dropped before completion", self.key);
        }
    }
}

/// Request deduplication system
/// When multiple identical requests come in, only the first one is executed
/// and the outcome is shared with all waiting requests
pub struct RequestDeduplicator {
    /// Map of flight keys to pending requests
    pending: DashMap<FlightKey, InFlightRequest>,
    config: DeduplicationConfig,
}

impl RequestDeduplicator {
    pub fn new(config: DeduplicationConfig) -> Self {
        Self {
            pending: DashMap::new(),
            config,
        }
    }

    /// Execute a fetch with deduplication
    /// If the same (key, source) is already in flight, wait for its outcome.
    /// Otherwise run `fetch`, bounded by the request timeout, and hand the
    /// outcome to every request that joined meanwhile.
    pub async fn execute<F, Fut>(&self, key: FlightKey, fetch: F) -> (FlightOutcome, FlightRole)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<ResolvedImage>>>,
    {
        if !self.config.enabled {
            return (self.run(fetch).await, FlightRole::Leader);
        }

        // Claiming the slot and joining it happen under the same shard lock.
        let joined = match self.pending.entry(key.clone()) {
            Entry::Occupied(mut slot) => {
                let (tx, rx) = oneshot::channel();
                slot.get_mut().waiters.push(tx);
                Some(rx)
            }
            Entry::Vacant(slot) => {
                slot.insert(InFlightRequest::new());
                None
            }
        };

        if let Some(rx) = joined {
            log::debug!("Request already pending for {}", key);
            let outcome = match rx.await {
                Ok(outcome) => outcome,
                Err(_) => FlightOutcome::Failed(Error::Coalesce(key.to_string()).to_string()),
            };
            return (outcome, FlightRole::Follower);
        }

        log::debug!("Executing new request for {}", key);
        let guard = FlightGuard {
            pending: &self.pending,
            key: &key,
            settled: false,
        };
        let outcome = self.run(fetch).await;
        guard.settle(&outcome);

        (outcome, FlightRole::Leader)
    }

    async fn run<F, Fut>(&self, fetch: F) -> FlightOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<ResolvedImage>>>,
    {
        let limit = self
            .config
            .request_timeout
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);

        match tokio::time::timeout(limit, fetch()).await {
            Ok(Ok(images)) => FlightOutcome::Resolved(images),
            Ok(Err(err)) => FlightOutcome::Failed(err.to_string()),
            Err(_) => FlightOutcome::Failed(
                Error::Timeout {
                    seconds: self.config.request_timeout.num_seconds(),
                }
                .to_string(),
            ),
        }
    }

    /// Whether a request for `key` is currently in flight
    pub fn is_pending(&self, key: &FlightKey) -> bool {
        self.pending.contains_key(key)
    }

    /// Get statistics about pending requests
    pub fn stats(&self) -> DeduplicationStats {
        let pending_requests = self.pending.len();
        let total_waiters = self
            .pending
            .iter()
            .map(|entry| entry.value().waiters.len())
            .sum();

        DeduplicationStats {
            pending_requests,
            total_waiters,
        }
    }
}

/// Statistics for request deduplication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeduplicationStats {
    pub pending_requests: usize,
    pub total_waiters: usize,
}

/// Thread-safe wrapper for the deduplicator
pub type SharedRequestDeduplicator = Arc<RequestDeduplicator>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    fn flight(name: &str) -> FlightKey {
        FlightKey::new(SearchKey::normalize(name), Source::Primary)
    }

    #[tokio::test]
    async fn test_request_deduplication() {
        let deduplicator = Arc::new(RequestDeduplicator::new(DeduplicationConfig::default()));
        let execution_count = Arc::new(AtomicUsize::new(0));

        // Execute multiple identical requests concurrently
        let mut handles = vec![];
        for _ in 0..5 {
            let deduplicator = deduplicator.clone();
            let execution_count = execution_count.clone();

            let handle = tokio::spawn(async move {
                deduplicator
                    .execute(flight("Chambord"), || async move {
                        execution_count.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(StdDuration::from_millis(100)).await;
                        Ok(vec![])
                    })
                    .await
            });

            handles.push(handle);
        }

        let mut leaders = 0;
        for handle in handles {
            let (outcome, role) = handle.await.unwrap();
            assert_eq!(outcome, FlightOutcome::Resolved(vec![]));
            if role == FlightRole::Leader {
                leaders += 1;
            }
        }

        // Should have executed only once due to deduplication
        assert_eq!(execution_count.load(Ordering::SeqCst), 1);
        assert_eq!(leaders, 1);
        assert_eq!(deduplicator.stats().pending_requests, 0);
    }

    #[tokio::test]
    async fn test_different_keys_not_deduplicated() {
        let deduplicator = RequestDeduplicator::new(DeduplicationConfig::default());
        let execution_count = AtomicUsize::new(0);
        let count = &execution_count;

        let run = |name: &'static str| {
            deduplicator.execute(flight(name), move || async move {
                count.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(StdDuration::from_millis(20)).await;
                Ok(vec![])
            })
        };
        let commons = deduplicator.execute(
            FlightKey::new(SearchKey::normalize("test1"), Source::Commons),
            move || async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(vec![])
            },
        );

        futures::join!(run("test1"), run("test2"), commons);

        // Different names, and the same name on another source, all run
        assert_eq!(execution_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failure_is_shared() {
        let deduplicator = RequestDeduplicator::new(DeduplicationConfig::default());

        let leader = deduplicator.execute(flight("Lascaux"), || async {
            tokio::time::sleep(StdDuration::from_millis(50)).await;
            Err(Error::Http("connection reset".to_string()))
        });
        let follower = async {
            tokio::time::sleep(StdDuration::from_millis(10)).await;
            deduplicator
                .execute(flight(" LASCAUX "), || async {
                    Err(Error::Http("must join the pending request".to_string()))
                })
                .await
        };

        let ((first, first_role), (second, second_role)) = futures::join!(leader, follower);
        assert_eq!(first_role, FlightRole::Leader);
        assert_eq!(second_role, FlightRole::Follower);
        assert_eq!(first, second);
        assert!(matches!(first, FlightOutcome::Failed(ref reason) if reason.contains("connection reset")));
    }

    #[tokio::test]
    async fn test_timeout_releases_slot() {
        let deduplicator = RequestDeduplicator::new(DeduplicationConfig {
            request_timeout: Duration::milliseconds(20),
            enabled: true,
        });

        let (outcome, _) = deduplicator
            .execute(flight("Alhambra"), || async {
                tokio::time::sleep(StdDuration::from_secs(5)).await;
                Ok(vec![])
            })
            .await;

        assert!(matches!(outcome, FlightOutcome::Failed(_)));
        assert!(!deduplicator.is_pending(&flight("Alhambra")));
    }

    #[tokio::test]
    async fn test_dropped_leader_releases_followers() {
        let deduplicator = Arc::new(RequestDeduplicator::new(DeduplicationConfig::default()));

        let leader = {
            let deduplicator = deduplicator.clone();
            tokio::spawn(async move {
                deduplicator
                    .execute(flight("Petra"), || async {
                        tokio::time::sleep(StdDuration::from_secs(60)).await;
                        Ok(vec![])
                    })
                    .await
            })
        };
        tokio::time::sleep(StdDuration::from_millis(20)).await;

        let follower = {
            let deduplicator = deduplicator.clone();
            tokio::spawn(async move {
                deduplicator
                    .execute(flight("Petra"), || async { Ok(vec![]) })
                    .await
            })
        };
        tokio::time::sleep(StdDuration::from_millis(20)).await;

        leader.abort();
        let (outcome, role) = follower.await.unwrap();
        assert_eq!(role, FlightRole::Follower);
        assert!(matches!(outcome, FlightOutcome::Failed(_)));
        assert!(!deduplicator.is_pending(&flight("Petra")));
    }
}
