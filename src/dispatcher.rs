// src/dispatcher.rs
//! Fan-out engine: runs one query's SourceCalls concurrently and collects
//! exactly one outcome per source into a `ResultBag`.
//!
//! - in-flight calls are capped by a semaphore (`max_in_flight`)
//! - each call gets its own timeout, started once it holds a permit
//! - the whole fan-out is bounded by `global_deadline`; stragglers are aborted
//!   and recorded as `Failure`
//! - panics inside an adapter are caught and recorded as `Failure`

use std::any::Any;
use std::collections::BTreeSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::aggregator::DispatchConfig;
use crate::normalize::normalize_result;
use crate::sources::SourceError;
use crate::types::{ResultBag, SourceId, SourceOutcome};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "source_calls_total",
            "Source calls completed, labelled by source and outcome."
        );
        describe_counter!(
            "dispatch_abandoned_total",
            "Source calls still in flight when the global deadline expired."
        );
        describe_histogram!("source_call_ms", "Per-source call latency in milliseconds.");
        describe_histogram!("dispatch_ms", "Whole fan-out latency in milliseconds.");
    });
}

/// One self-contained unit of work for one source.
pub struct SourceCall {
    id: SourceId,
    work: BoxFuture<'static, Result<Value, SourceError>>,
}

impl SourceCall {
    pub fn new<F>(id: SourceId, work: F) -> Self
    where
        F: Future<Output = Result<Value, SourceError>> + Send + 'static,
    {
        Self {
            id,
            work: work.boxed(),
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }
}

impl std::fmt::Debug for SourceCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceCall").field("id", &self.id).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    pub global_deadline: Duration,
    pub per_call_timeout: Duration,
    pub max_in_flight: usize,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            global_deadline: Duration::from_millis(15_000),
            per_call_timeout: Duration::from_millis(10_000),
            max_in_flight: 8,
        }
    }
}

impl From<&DispatchConfig> for DispatchPolicy {
    fn from(cfg: &DispatchConfig) -> Self {
        Self {
            global_deadline: Duration::from_millis(cfg.global_deadline_ms),
            per_call_timeout: Duration::from_millis(cfg.per_call_timeout_ms),
            max_in_flight: cfg.max_in_flight,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    policy: DispatchPolicy,
}

impl Dispatcher {
    pub fn new(policy: DispatchPolicy) -> Self {
        Self { policy }
    }

    /// Run every call and return once all finished or the global deadline hit.
    ///
    /// The returned bag holds exactly one outcome per distinct SourceId in
    /// `calls`. A repeated SourceId keeps its first call; later ones are dropped.
    pub async fn run(&self, calls: Vec<SourceCall>) -> ResultBag {
        ensure_metrics_described();
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.policy.global_deadline;
        let permits = Arc::new(Semaphore::new(self.policy.max_in_flight.max(1)));

        let mut pending: BTreeSet<SourceId> = BTreeSet::new();
        let mut tasks = JoinSet::new();
        for call in calls {
            if !pending.insert(call.id) {
                tracing::warn!(target: "dispatch", source = %call.id, "duplicate source call dropped");
                continue;
            }
            tasks.spawn(run_one(
                call,
                Arc::clone(&permits),
                self.policy.per_call_timeout,
            ));
        }
        tracing::debug!(target: "dispatch", calls = pending.len(), "fan-out started");

        let mut bag = ResultBag::new();
        let mut deadline_hit = false;
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((id, outcome)))) => {
                    pending.remove(&id);
                    bag.insert_once(id, outcome);
                }
                Ok(Some(Err(e))) => {
                    // run_one catches adapter panics, so this is unexpected.
                    tracing::warn!(target: "dispatch", error = ?e, "source task failed");
                }
                Ok(None) => break,
                Err(_) => {
                    deadline_hit = true;
                    tasks.abort_all();
                    break;
                }
            }
        }

        for id in pending {
            let error = if deadline_hit {
                counter!("dispatch_abandoned_total").increment(1);
                tracing::warn!(target: "dispatch", source = %id, "abandoned at global deadline");
                SourceError::Abandoned
            } else {
                SourceError::Panicked("task ended without an outcome".into())
            };
            counter!("source_calls_total", "source" => id.as_str(), "outcome" => "failure")
                .increment(1);
            bag.insert_once(
                id,
                SourceOutcome::Failure {
                    error: error.to_string(),
                },
            );
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        histogram!("dispatch_ms").record(elapsed_ms as f64);
        let (ok, empty, failed) = bag.tally();
        tracing::info!(
            target: "dispatch",
            elapsed_ms,
            ok,
            empty,
            failed,
            deadline_hit,
            "fan-out finished"
        );
        bag
    }
}

async fn run_one(
    call: SourceCall,
    permits: Arc<Semaphore>,
    per_call: Duration,
) -> (SourceId, SourceOutcome) {
    let SourceCall { id, work } = call;

    let Ok(_permit) = permits.acquire_owned().await else {
        return (
            id,
            SourceOutcome::Failure {
                error: "dispatcher shut down".into(),
            },
        );
    };

    let started = Instant::now();
    let raw = match tokio::time::timeout(per_call, AssertUnwindSafe(work).catch_unwind()).await {
        Ok(Ok(result)) => result,
        Ok(Err(panic)) => Err(SourceError::Panicked(panic_message(panic.as_ref()))),
        Err(_) => Err(SourceError::Timeout(per_call)),
    };
    if let Err(e) = &raw {
        tracing::warn!(target: "dispatch", source = %id, error = %e, "source call failed");
    }
    let outcome = normalize_result(raw);

    let elapsed_ms = started.elapsed().as_millis() as u64;
    histogram!("source_call_ms", "source" => id.as_str()).record(elapsed_ms as f64);
    counter!("source_calls_total", "source" => id.as_str(), "outcome" => outcome.kind())
        .increment(1);
    tracing::debug!(target: "dispatch", source = %id, outcome = outcome.kind(), elapsed_ms, "source call finished");

    (id, outcome)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy(deadline_ms: u64, per_call_ms: u64, pool: usize) -> DispatchPolicy {
        DispatchPolicy {
            global_deadline: Duration::from_millis(deadline_ms),
            per_call_timeout: Duration::from_millis(per_call_ms),
            max_in_flight: pool,
        }
    }

    #[tokio::test]
    async fn empty_call_set_yields_empty_bag() {
        let bag = Dispatcher::default().run(Vec::new()).await;
        assert!(bag.is_empty());
    }

    #[tokio::test]
    async fn duplicate_sources_keep_the_first_call() {
        let calls = vec![
            SourceCall::new(SourceId::Arxiv, async { Ok(json!([{"title": "first"}])) }),
            SourceCall::new(SourceId::Arxiv, async { Ok(json!({"error": "second"})) }),
        ];
        let bag = Dispatcher::new(policy(1_000, 500, 4)).run(calls).await;
        assert_eq!(bag.len(), 1);
        assert!(bag.get(SourceId::Arxiv).is_some_and(SourceOutcome::is_success));
    }

    #[tokio::test(start_paused = true)]
    async fn per_call_timeout_becomes_failure() {
        let calls = vec![SourceCall::new(SourceId::Weather, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(json!({"temperature_c": "20"}))
        })];
        let bag = Dispatcher::new(policy(30_000, 100, 2)).run(calls).await;
        match bag.get(SourceId::Weather) {
            Some(SourceOutcome::Failure { error }) => assert!(error.contains("timed out")),
            other => panic!("expected timeout failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn global_deadline_abandons_stragglers() {
        let calls = vec![
            SourceCall::new(
                SourceId::Wikipedia,
                std::future::pending::<Result<Value, SourceError>>(),
            ),
            SourceCall::new(SourceId::Duckduckgo, async { Ok(json!([])) }),
        ];
        let bag = Dispatcher::new(policy(2_000, 60_000, 4)).run(calls).await;
        assert_eq!(bag.get(SourceId::Duckduckgo).map(|o| o.kind()), Some("empty"));
        match bag.get(SourceId::Wikipedia) {
            Some(SourceOutcome::Failure { error }) => assert!(error.contains("abandoned")),
            other => panic!("expected abandoned failure, got {other:?}"),
        }
    }

    #[test]
    fn panic_payloads_are_readable() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }
}
