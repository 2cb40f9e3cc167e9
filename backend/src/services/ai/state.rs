//! Per-client, per-feature request state.
//!
//! `Idle → Pending → {Succeeded, Failed}`. A second call for the same
//! (client, feature) pair while one is pending is rejected with
//! [`AiError::Busy`]. Finished states can start a new request and are
//! swept once they are older than the retention window.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use utoipa::ToSchema;

use super::models::{AiError, AiFeature, ErrorCategory};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RequestState {
    Idle,
    Pending {
        started_at: DateTime<Utc>,
    },
    Succeeded {
        finished_at: DateTime<Utc>,
        fallback: bool,
    },
    Failed {
        finished_at: DateTime<Utc>,
        category: Option<ErrorCategory>,
        message: String,
    },
}

impl RequestState {
    pub fn is_pending(&self) -> bool {
        matches!(self, RequestState::Pending { .. })
    }

    fn finished_at(&self) -> Option<DateTime<Utc>> {
        match self {
            RequestState::Succeeded { finished_at, .. } | RequestState::Failed { finished_at, .. } => Some(*finished_at),
            RequestState::Idle | RequestState::Pending { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FeatureState {
    pub feature: AiFeature,
    pub status: RequestState,
}

type Key = (String, AiFeature);

const DEFAULT_RETENTION: Duration = Duration::from_secs(10 * 60);
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct RequestTracker {
    states: DashMap<Key, RequestState>,
    retention: ChronoDuration,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// How long a finished state stays visible before it is swept.
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            states: DashMap::new(),
            retention: ChronoDuration::from_std(retention).unwrap_or_else(|_| ChronoDuration::minutes(10)),
            sweeper: Mutex::new(None),
        }
    }

    /// Start the background sweep of finished states. Idempotent.
    pub fn init(self: &Arc<Self>) {
        let Ok(mut sweeper) = self.sweeper.lock() else {
            return;
        };
        if sweeper.is_some() {
            return;
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        *sweeper = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let Some(tracker) = weak.upgrade() else { break };
                tracker.purge_finished(Utc::now());
            }
        }));
        tracing::info!("Request tracker initialized (retention {}s)", self.retention.num_seconds());
    }

    pub fn dispose(&self) {
        if let Ok(mut sweeper) = self.sweeper.lock()
            && let Some(handle) = sweeper.take()
        {
            handle.abort();
        }
        self.states.clear();
    }

    /// Move the pair to `Pending`, or fail with `Busy` if it already is.
    pub fn begin(self: &Arc<Self>, client: &str, feature: AiFeature) -> Result<PendingGuard, AiError> {
        let pending = RequestState::Pending { started_at: Utc::now() };

        match self.states.entry((client.to_string(), feature)) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_pending() {
                    tracing::debug!("Rejecting {} for client {}: already pending", feature, client);
                    return Err(AiError::Busy(feature));
                }
                entry.insert(pending);
            },
            Entry::Vacant(entry) => {
                entry.insert(pending);
            },
        }

        Ok(PendingGuard {
            tracker: Arc::clone(self),
            key: Some((client.to_string(), feature)),
        })
    }

    pub fn state(&self, client: &str, feature: AiFeature) -> RequestState {
        self.states
            .get(&(client.to_string(), feature))
            .map(|s| s.value().clone())
            .unwrap_or(RequestState::Idle)
    }

    /// Non-idle states recorded for a client.
    pub fn snapshot(&self, client: &str) -> Vec<FeatureState> {
        let mut states: Vec<FeatureState> = self
            .states
            .iter()
            .filter(|e| e.key().0 == client)
            .map(|e| FeatureState { feature: e.key().1, status: e.value().clone() })
            .collect();
        states.sort_by_key(|s| s.feature.as_str());
        states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Drop finished states older than the retention window. Pending entries stay.
    pub fn purge_finished(&self, now: DateTime<Utc>) {
        let cutoff = now - self.retention;
        let before = self.states.len();
        self.states.retain(|_, state| state.finished_at().is_none_or(|at| at > cutoff));
        let purged = before.saturating_sub(self.states.len());
        if purged > 0 {
            tracing::debug!("Purged {} finished request state(s)", purged);
        }
    }

    fn finish(&self, key: Key, state: RequestState) {
        self.states.insert(key, state);
    }
}

/// Completes the transition out of `Pending`. Dropping it without calling
/// `succeed`/`fail` records the request as abandoned.
#[must_use]
pub struct PendingGuard {
    tracker: Arc<RequestTracker>,
    key: Option<Key>,
}

impl PendingGuard {
    pub fn succeed(mut self, fallback: bool) {
        if let Some(key) = self.key.take() {
            self.tracker.finish(key, RequestState::Succeeded { finished_at: Utc::now(), fallback });
        }
    }

    pub fn fail(mut self, err: &AiError) {
        if let Some(key) = self.key.take() {
            self.tracker.finish(
                key,
                RequestState::Failed { finished_at: Utc::now(), category: err.category(), message: err.to_string() },
            );
        }
    }

    /// Record the outcome of a feature call and pass it through.
    pub fn complete<T>(self, result: Result<T, AiError>, is_fallback: impl FnOnce(&T) -> bool) -> Result<T, AiError> {
        match &result {
            Ok(value) => self.succeed(is_fallback(value)),
            Err(e) => self.fail(e),
        }
        result
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            tracing::debug!("Request {} for client {} abandoned", key.1, key.0);
            self.tracker.finish(
                key,
                RequestState::Failed { finished_at: Utc::now(), category: None, message: "request abandoned".to_string() },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_begin_is_busy() {
        let tracker = Arc::new(RequestTracker::new());
        let guard = tracker.begin("alice", AiFeature::Budget).unwrap();
        assert!(tracker.state("alice", AiFeature::Budget).is_pending());

        let err = tracker.begin("alice", AiFeature::Budget).err().unwrap();
        assert!(matches!(err, AiError::Busy(AiFeature::Budget)));

        // Other features and other clients are independent.
        let _other = tracker.begin("alice", AiFeature::Safety).unwrap();
        let _bob = tracker.begin("bob", AiFeature::Budget).unwrap();

        guard.succeed(false);
        assert!(matches!(tracker.state("alice", AiFeature::Budget), RequestState::Succeeded { fallback: false, .. }));
        assert!(tracker.begin("alice", AiFeature::Budget).is_ok());
    }

    #[test]
    fn test_fail_records_category() {
        let tracker = Arc::new(RequestTracker::new());
        let guard = tracker.begin("c", AiFeature::Itinerary).unwrap();
        guard.fail(&AiError::Quota("QUOTA".into()));

        match tracker.state("c", AiFeature::Itinerary) {
            RequestState::Failed { category, .. } => assert_eq!(category, Some(ErrorCategory::QuotaError)),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_dropped_guard_marks_failed() {
        let tracker = Arc::new(RequestTracker::new());
        drop(tracker.begin("c", AiFeature::Concierge).unwrap());

        match tracker.state("c", AiFeature::Concierge) {
            RequestState::Failed { message, category, .. } => {
                assert_eq!(message, "request abandoned");
                assert_eq!(category, None);
            },
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_finished_states_are_purged_after_retention() {
        let tracker = Arc::new(RequestTracker::with_retention(Duration::from_secs(60)));
        for i in 0..10_000 {
            tracker.begin(&format!("client-{i}"), AiFeature::Budget).unwrap().succeed(false);
        }
        let _held = tracker.begin("busy", AiFeature::Safety).unwrap();
        assert_eq!(tracker.len(), 10_001);

        // Still inside the window
        tracker.purge_finished(Utc::now());
        assert_eq!(tracker.len(), 10_001);

        tracker.purge_finished(Utc::now() + ChronoDuration::minutes(5));
        assert_eq!(tracker.len(), 1);
        assert!(tracker.state("busy", AiFeature::Safety).is_pending());
        assert_eq!(tracker.state("client-0", AiFeature::Budget), RequestState::Idle);
    }

    #[tokio::test]
    async fn test_dispose_clears_states() {
        let tracker = Arc::new(RequestTracker::new());
        tracker.init();
        tracker.begin("c", AiFeature::Budget).unwrap().succeed(true);
        assert!(!tracker.is_empty());

        tracker.dispose();
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_idle_by_default_and_snapshot() {
        let tracker = Arc::new(RequestTracker::new());
        assert_eq!(tracker.state("c", AiFeature::Safety), RequestState::Idle);

        let guard = tracker.begin("c", AiFeature::Safety).unwrap();
        let _ = guard.complete(Ok::<_, AiError>(1), |_| true);
        tracker.begin("other", AiFeature::Budget).unwrap().succeed(false);

        let snapshot = tracker.snapshot("c");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].feature, AiFeature::Safety);
        let json = serde_json::to_value(&snapshot[0]).unwrap();
        assert_eq!(json["status"]["state"], "succeeded");
        assert_eq!(json["status"]["fallback"], true);
    }
}
