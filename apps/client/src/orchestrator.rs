//! Request orchestrator — the async state machine between the input form and
//! the results table.
//!
//! Each `execute` call takes the next generation number the moment it is
//! issued. A response only changes the state if its generation is still the
//! latest one, so a slow early request can never overwrite a newer result.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::ClientError;
use crate::models::recommendation::RecommendationResult;
use crate::query::Query;
use crate::recommend_client::RecommendTransport;

/// What the orchestrator currently shows. `Loading`, `Success` and `Error`
/// never overlap.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
    Success(Arc<RecommendationResult>),
    Error(String),
}

impl RequestState {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading)
    }
}

/// Returned from `execute` so the caller decides how to present a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecuteOutcome {
    Success(Arc<RecommendationResult>),
    Failed(String),
    /// A newer request was issued before this one resolved; its response was
    /// dropped without touching the state.
    Superseded { generation: u64 },
}

struct Inner {
    transport: Arc<dyn RecommendTransport>,
    generation: AtomicU64,
    state: watch::Sender<RequestState>,
}

/// Owns the single state cell. Cloning shares the same state.
#[derive(Clone)]
pub struct RequestOrchestrator {
    inner: Arc<Inner>,
}

impl RequestOrchestrator {
    pub fn new(transport: Arc<dyn RecommendTransport>) -> Self {
        let (state, _) = watch::channel(RequestState::Idle);
        Self {
            inner: Arc::new(Inner {
                transport,
                generation: AtomicU64::new(0),
                state,
            }),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> RequestState {
        self.inner.state.borrow().clone()
    }

    /// Receiver that wakes on every state change. Read-only by construction.
    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.inner.state.subscribe()
    }

    /// Generation of the most recently issued request (0 before the first).
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Issues `query` to the service.
    ///
    /// The state moves to `Loading` and the generation is taken right here,
    /// before the returned future is first polled, so issuance order is the
    /// call order. Several futures may be in flight at once; only the latest
    /// one can settle the state.
    pub fn execute(&self, query: Query) -> impl Future<Output = ExecuteOutcome> + Send + 'static {
        let generation = self.inner.begin();
        let inner = Arc::clone(&self.inner);

        async move {
            let response = inner.transport.recommend(&query).await;
            inner.finish(generation, response)
        }
    }
}

impl Inner {
    fn begin(&self) -> u64 {
        let mut generation = 0;
        // Bump and publish under the channel lock so `finish` never sees a
        // new generation paired with a stale state.
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = RequestState::Loading;
        });
        info!(generation, "Recommendation request issued");
        generation
    }

    fn finish(
        &self,
        generation: u64,
        response: Result<RecommendationResult, ClientError>,
    ) -> ExecuteOutcome {
        let (next, outcome) = match response {
            Ok(result) => {
                let result = Arc::new(result);
                (
                    RequestState::Success(Arc::clone(&result)),
                    ExecuteOutcome::Success(result),
                )
            }
            Err(e) => {
                let message = e.user_message();
                (
                    RequestState::Error(message.clone()),
                    ExecuteOutcome::Failed(message),
                )
            }
        };

        let applied = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = next;
            true
        });

        if !applied {
            debug!(
                generation,
                latest = self.generation.load(Ordering::SeqCst),
                "Dropping superseded response"
            );
            return ExecuteOutcome::Superseded { generation };
        }

        match &outcome {
            ExecuteOutcome::Success(result) => {
                info!(
                    generation,
                    rows = result.rows.len(),
                    reported = ?result.results_count,
                    "Recommendation request succeeded"
                )
            }
            ExecuteOutcome::Failed(message) => {
                warn!(generation, %message, "Recommendation request failed")
            }
            ExecuteOutcome::Superseded { .. } => {}
        }
        outcome
    }
}
