//! Write-through, rollback, restore and restart behavior.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use orderdesk_engine::LifecycleEngine;
use orderdesk_store::{FileSink, MemorySink, SnapshotSink};
use orderdesk_types::{DeskConfig, DeskError, OrderStatus, ProofRef, UserId};

const OPERATOR: UserId = UserId(99);

fn config() -> DeskConfig {
    DeskConfig::with_operators([99])
}

/// Sink whose writes block the calling thread for `delay`.
struct SlowSink {
    inner: MemorySink,
    delay: Duration,
}

impl SnapshotSink for SlowSink {
    fn write(&self, blob: &[u8]) -> io::Result<()> {
        std::thread::sleep(self.delay);
        self.inner.write(blob)
    }

    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        self.inner.read()
    }

    fn describe(&self) -> String {
        "slow".to_string()
    }
}

async fn seed(engine: &LifecycleEngine) {
    engine.create_or_get_order(UserId(1), "a", "week").await.unwrap();
    engine.choose_network(UserId(1), "TRC20").await.unwrap();
    engine.submit_proof(UserId(1), ProofRef::new("img1"), Utc::now()).await.unwrap();
    engine.create_or_get_order(UserId(2), "b", "month").await.unwrap();
    engine.create_or_get_order(UserId(3), "c", "day").await.unwrap();
    engine.cancel(UserId(3)).await.unwrap();
    engine.ban(UserId(4)).await.unwrap();
}

#[tokio::test]
async fn every_mutation_is_written_through() {
    let sink = MemorySink::new();
    let engine = LifecycleEngine::new(config(), sink.clone()).unwrap();

    engine.create_or_get_order(UserId(1), "a", "week").await.unwrap();
    assert_eq!(sink.writes(), 1);
    engine.choose_network(UserId(1), "TRC20").await.unwrap();
    assert_eq!(sink.writes(), 2);

    // Rejected operations and reads do not write.
    let _ = engine.choose_network(UserId(1), "TRC20").await;
    let _ = engine.stats().await;
    assert_eq!(sink.writes(), 2);
}

#[tokio::test]
async fn claims_are_not_durable_writes() {
    let sink = MemorySink::new();
    let engine = LifecycleEngine::new(config(), sink.clone()).unwrap();
    seed(&engine).await;
    let before = sink.writes();
    engine.accept_for_review(OPERATOR, UserId(1)).await.unwrap();
    assert_eq!(sink.writes(), before);
}

// Single-threaded runtime: a write on the worker thread would stall the timer
// below until the write finished.
#[tokio::test(flavor = "current_thread")]
async fn slow_write_does_not_stall_runtime() {
    let sink = MemorySink::new();
    let slow = SlowSink {
        inner: sink.clone(),
        delay: Duration::from_millis(300),
    };
    let engine = Arc::new(LifecycleEngine::new(config(), slow).unwrap());

    let create = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.create_or_get_order(UserId(1), "a", "week").await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!create.is_finished(), "write should still be in flight");
    assert_eq!(sink.writes(), 0);

    let order = create.await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::New);
    assert_eq!(sink.writes(), 1);
}

#[tokio::test]
async fn failed_write_rolls_back_transition() {
    let sink = MemorySink::new();
    let engine = LifecycleEngine::new(config(), sink.clone()).unwrap();
    engine.create_or_get_order(UserId(1), "a", "week").await.unwrap();

    sink.fail_writes(true);
    let err = engine.choose_network(UserId(1), "TRC20").await.unwrap_err();
    assert!(matches!(err, DeskError::Persistence(_)));
    let order = engine.order(UserId(1)).await.unwrap();
    assert_eq!(order.status, OrderStatus::New);
    assert!(order.network.is_none());

    sink.fail_writes(false);
    engine.choose_network(UserId(1), "TRC20").await.unwrap();
}

#[tokio::test]
async fn failed_write_rolls_back_ban() {
    let sink = MemorySink::new();
    let engine = LifecycleEngine::new(config(), sink.clone()).unwrap();
    engine.create_or_get_order(UserId(5), "e", "week").await.unwrap();

    sink.fail_writes(true);
    assert!(matches!(engine.ban(UserId(5)).await, Err(DeskError::Persistence(_))));
    assert!(!engine.is_banned(UserId(5)).await);
    assert_eq!(engine.order(UserId(5)).await.unwrap().status, OrderStatus::New);
    assert_eq!(engine.stats().await.cancelled, 0);
}

#[tokio::test]
async fn failed_write_keeps_claim_on_reject() {
    let sink = MemorySink::new();
    let engine = LifecycleEngine::new(config(), sink.clone()).unwrap();
    seed(&engine).await;
    engine.accept_for_review(OPERATOR, UserId(1)).await.unwrap();

    sink.fail_writes(true);
    assert!(engine.reject(OPERATOR, UserId(1)).await.is_err());
    assert!(engine.deliver_code(OPERATOR, "ABC123").await.is_err());
    assert_eq!(engine.claims().await.len(), 1);
    assert_eq!(engine.order(UserId(1)).await.unwrap().status, OrderStatus::UnderReview);

    sink.fail_writes(false);
    let fulfillment = engine.deliver_code(OPERATOR, "ABC123").await.unwrap();
    assert_eq!(fulfillment.order.status, OrderStatus::Completed);
}

#[tokio::test]
async fn snapshot_restores_into_fresh_engine() {
    let source = LifecycleEngine::new(config(), MemorySink::new()).unwrap();
    seed(&source).await;
    source.accept_for_review(OPERATOR, UserId(1)).await.unwrap();
    let blob = source.snapshot().await.unwrap();

    let sink = MemorySink::new();
    let target = LifecycleEngine::new(config(), sink.clone()).unwrap();
    target.restore(&blob).await.unwrap();

    for owner in [UserId(1), UserId(2), UserId(3)] {
        assert_eq!(target.order(owner).await, source.order(owner).await);
    }
    assert_eq!(target.list_banned().await, vec![UserId(4)]);
    assert_eq!(target.stats().await, source.stats().await);
    assert!(target.claims().await.is_empty(), "claims do not survive a restore");
    assert_eq!(sink.writes(), 1, "restored state is written through");
}

#[tokio::test]
async fn corrupt_restore_leaves_tables_empty() {
    let engine = LifecycleEngine::new(config(), MemorySink::new()).unwrap();
    seed(&engine).await;

    let err = engine.restore(b"{\"format\":\"orderdesk-snapshot\"}").await.unwrap_err();
    assert!(matches!(err, DeskError::CorruptSnapshot { .. }));
    let stats = engine.stats().await;
    assert_eq!(stats.total, 0);
    assert_eq!(stats.banned, 0);
    assert!(engine.order(UserId(1)).await.is_none());
}

#[tokio::test]
async fn state_survives_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("desk.json");

    {
        let engine = LifecycleEngine::open(config(), FileSink::new(&path)).unwrap();
        seed(&engine).await;
    }

    let engine = LifecycleEngine::open(config(), FileSink::new(&path)).unwrap();
    assert_eq!(engine.order(UserId(1)).await.unwrap().status, OrderStatus::UnderReview);
    assert_eq!(engine.order(UserId(2)).await.unwrap().status, OrderStatus::New);
    assert!(engine.is_banned(UserId(4)).await);
    assert_eq!(engine.stats().await.cancelled, 1);

    // A fresh session after restart can claim again.
    engine.accept_for_review(OPERATOR, UserId(1)).await.unwrap();
    engine.deliver_code(OPERATOR, "ABC123").await.unwrap();
}

#[tokio::test]
async fn open_refuses_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("desk.json");
    std::fs::write(&path, b"definitely not a snapshot").unwrap();

    let err = LifecycleEngine::open(config(), FileSink::new(&path)).unwrap_err();
    assert!(matches!(err, DeskError::CorruptSnapshot { .. }));
}
