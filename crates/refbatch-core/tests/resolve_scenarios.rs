//! End-to-end resolver scenarios against a recording in-memory lookup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{Barrier, Notify};

use refbatch_core::{BatchBudget, BatchLookup, BatchResolver, CancelSignal, ResolveError};

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// In-memory lookup that records every batch it receives.
#[derive(Default)]
struct Recording {
    entities: HashMap<String, Value>,
    calls: Mutex<Vec<Vec<String>>>,
    fail_on: Option<String>,
    barrier: Option<Arc<Barrier>>,
}

impl Recording {
    fn with(uris: &[&str]) -> Self {
        let entities = uris
            .iter()
            .map(|u| (u.to_string(), json!({ "uri": u, "name": format!("entity {u}") })))
            .collect();
        Self {
            entities,
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BatchLookup for Recording {
    type Entity = Value;

    async fn fetch_batch(
        &self,
        keys: Vec<String>,
        cancel: Option<&CancelSignal>,
    ) -> Result<Vec<Value>, ResolveError> {
        self.calls.lock().unwrap().push(keys.clone());

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(token) = cancel {
            if token.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }
        }
        if let Some(bad) = &self.fail_on {
            if keys.contains(bad) {
                return Err(ResolveError::Status {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
        }

        // answer in reverse order to prove reassembly ignores response order
        Ok(keys
            .iter()
            .rev()
            .filter_map(|k| self.entities.get(k).cloned())
            .collect())
    }

    fn endpoint(&self) -> &str {
        "memory://recording"
    }
}

/// Lookup that holds back the batch containing `held` and records the
/// first key of every batch that returned entities, in settle order.
struct Staged {
    held: String,
    hold_until_cancelled: bool,
    released: Notify,
    settled: Mutex<Vec<String>>,
}

impl Staged {
    fn new(held: &str, hold_until_cancelled: bool) -> Self {
        Self {
            held: held.to_string(),
            hold_until_cancelled,
            released: Notify::new(),
            settled: Mutex::new(Vec::new()),
        }
    }

    fn settled(&self) -> Vec<String> {
        self.settled.lock().unwrap().clone()
    }
}

#[async_trait]
impl BatchLookup for Staged {
    type Entity = Value;

    async fn fetch_batch(
        &self,
        keys: Vec<String>,
        cancel: Option<&CancelSignal>,
    ) -> Result<Vec<Value>, ResolveError> {
        let held = keys.contains(&self.held);
        if held && self.hold_until_cancelled {
            cancel.expect("held batch needs a signal").cancelled().await;
            return Err(ResolveError::Cancelled);
        }
        if held {
            self.released.notified().await;
        }

        self.settled.lock().unwrap().push(keys[0].clone());
        if !held {
            self.released.notify_one();
        }
        Ok(keys
            .iter()
            .map(|k| json!({ "uri": k, "name": format!("entity {k}") }))
            .collect())
    }

    fn endpoint(&self) -> &str {
        "memory://staged"
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Obj {
    id: u32,
    k: String,
}

fn obj(id: u32, k: &str) -> Obj {
    Obj { id, k: k.to_string() }
}

fn key_of(o: &Obj) -> String {
    o.k.clone()
}

fn combine(o: Obj, e: &Value) -> (u32, String) {
    (o.id, e["name"].as_str().unwrap_or_default().to_string())
}

// ─── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn shared_key_single_batch_in_source_order() {
    let lookup = Recording::with(&["u1", "u2"]);
    let resolver = BatchResolver::new(&lookup);

    let out = resolver
        .resolve(
            Some(vec![obj(1, "u1"), obj(2, "u1"), obj(3, "u2")]),
            key_of,
            combine,
            None,
        )
        .await
        .unwrap();

    assert_eq!(lookup.calls(), vec![vec!["u1".to_string(), "u2".to_string()]]);
    assert_eq!(
        out,
        vec![
            (1, "entity u1".to_string()),
            (2, "entity u1".to_string()),
            (3, "entity u2".to_string()),
        ]
    );
}

#[tokio::test]
async fn keys_over_combined_budget_go_out_concurrently() {
    let k1 = "a".repeat(40);
    let k2 = "b".repeat(40);
    let barrier = Arc::new(Barrier::new(2));
    let lookup = Recording {
        barrier: Some(barrier),
        ..Recording::with(&[k1.as_str(), k2.as_str()])
    };
    // each key costs 45; together 90 > 64
    let resolver = BatchResolver::with_budget(&lookup, BatchBudget::new(64, 5).unwrap()).unwrap();

    // both batches must be in flight at once or the barrier never releases
    let out = tokio::time::timeout(
        Duration::from_secs(5),
        resolver.resolve(Some(vec![obj(1, &k1), obj(2, &k2)]), key_of, combine, None),
    )
    .await
    .expect("batches were not dispatched concurrently")
    .unwrap();

    let mut calls = lookup.calls();
    calls.sort();
    assert_eq!(calls, vec![vec![k1.clone()], vec![k2.clone()]]);
    assert_eq!(out.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![1, 2]);
}

#[tokio::test]
async fn hundred_repeats_fetch_once_fan_out_to_all() {
    let lookup = Recording::with(&["skill/x"]);
    let resolver = BatchResolver::new(&lookup);
    let objects: Vec<Obj> = (0..100).map(|i| obj(i, "skill/x")).collect();

    let out = resolver.resolve(Some(objects), key_of, combine, None).await.unwrap();

    assert_eq!(lookup.calls(), vec![vec!["skill/x".to_string()]]);
    assert_eq!(out.len(), 100);
    assert!(out.iter().enumerate().all(|(i, (id, _))| *id == i as u32));
}

#[tokio::test]
async fn unmatched_key_is_silently_omitted() {
    let lookup = Recording::with(&["u1"]);
    let resolver = BatchResolver::new(&lookup);

    let out = resolver
        .resolve(
            Some(vec![obj(1, "gone"), obj(2, "u1"), obj(3, "gone")]),
            key_of,
            combine,
            None,
        )
        .await
        .unwrap();

    assert_eq!(out, vec![(2, "entity u1".to_string())]);
}

#[tokio::test]
async fn one_failed_batch_fails_the_call() {
    let k1 = "a".repeat(40);
    let k2 = "b".repeat(40);
    let lookup = Recording {
        fail_on: Some(k2.clone()),
        ..Recording::with(&[k1.as_str(), k2.as_str()])
    };
    let resolver = BatchResolver::with_budget(&lookup, BatchBudget::new(64, 5).unwrap()).unwrap();

    let err = resolver
        .resolve(Some(vec![obj(1, &k1), obj(2, &k2)]), key_of, combine, None)
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::Status { status: 503, .. }));
}

#[tokio::test]
async fn empty_and_absent_input_make_no_calls() {
    let lookup = Recording::with(&["u1"]);
    let resolver = BatchResolver::new(&lookup);

    let none = resolver
        .resolve(None::<Vec<Obj>>, key_of, combine, None)
        .await
        .unwrap();
    let empty = resolver
        .resolve(Some(Vec::<Obj>::new()), key_of, combine, None)
        .await
        .unwrap();

    assert!(none.is_empty());
    assert!(empty.is_empty());
    assert!(lookup.calls().is_empty());
}

#[tokio::test]
async fn cancelled_signal_rejects_whole_call() {
    let lookup = Recording::with(&["u1", "u2"]);
    let resolver = BatchResolver::new(&lookup);
    let token = CancelSignal::new();
    token.cancel();

    let err = resolver
        .resolve(
            Some(vec![obj(1, "u1"), obj(2, "u2")]),
            key_of,
            combine,
            Some(&token),
        )
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
}

#[tokio::test]
async fn every_distinct_key_requested_exactly_once_across_batches() {
    let keys: Vec<String> = (0..400).map(|i| format!("http://example.org/skill/{i:04}")).collect();
    let uris: Vec<&str> = keys.iter().map(String::as_str).collect();
    let lookup = Recording::with(&uris);
    let resolver = BatchResolver::new(&lookup);

    // every key appears three times, interleaved
    let objects: Vec<Obj> = (0..3)
        .flat_map(|round| keys.iter().enumerate().map(move |(i, k)| obj(round * 1000 + i as u32, k)))
        .collect();
    let expected_ids: Vec<u32> = objects.iter().map(|o| o.id).collect();

    let out = resolver.resolve(Some(objects), key_of, combine, None).await.unwrap();

    let calls = lookup.calls();
    assert!(calls.len() > 1, "400 long keys must not fit one 4096 budget");
    let budget = resolver.budget();
    for batch in &calls {
        assert!(budget.encoded_len(batch) <= budget.max_len);
    }
    let mut requested: Vec<String> = calls.into_iter().flatten().collect();
    requested.sort();
    assert_eq!(requested, keys);

    assert_eq!(out.iter().map(|(id, _)| *id).collect::<Vec<_>>(), expected_ids);
}

#[tokio::test]
async fn cancel_during_flight_fails_call_after_other_batch_returned() {
    let fast = "a".repeat(40);
    let slow = "b".repeat(40);
    let lookup = Staged::new(&slow, true);
    let resolver = BatchResolver::with_budget(&lookup, BatchBudget::new(64, 5).unwrap()).unwrap();
    let token = CancelSignal::new();

    let (result, ()) = tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(
            resolver.resolve(
                Some(vec![obj(1, &fast), obj(2, &slow)]),
                key_of,
                combine,
                Some(&token),
            ),
            async {
                // cancel only once the fast batch has settled
                lookup.released.notified().await;
                token.cancel();
            }
        )
    })
    .await
    .expect("held batch never observed the cancellation");

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(lookup.settled(), vec![fast]);
}

#[tokio::test]
async fn batches_settling_in_reverse_keep_source_order() {
    let first = "a".repeat(40);
    let second = "b".repeat(40);
    // the batch holding `first` waits until the `second` batch has returned
    let lookup = Staged::new(&first, false);
    let resolver = BatchResolver::with_budget(&lookup, BatchBudget::new(64, 5).unwrap()).unwrap();

    let out = tokio::time::timeout(
        Duration::from_secs(5),
        resolver.resolve(
            Some(vec![obj(1, &first), obj(2, &second), obj(3, &first)]),
            key_of,
            combine,
            None,
        ),
    )
    .await
    .expect("batches were not dispatched concurrently")
    .unwrap();

    assert_eq!(lookup.settled(), vec![second.clone(), first.clone()]);
    assert_eq!(
        out,
        vec![
            (1, format!("entity {first}")),
            (2, format!("entity {second}")),
            (3, format!("entity {first}")),
        ]
    );
}
