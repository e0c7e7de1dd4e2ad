//! Reconciler properties against a shared store.

mod helpers;

use std::sync::Arc;

use chrono::Utc;

use watch_core::config::presence::PresenceConfig;
use watch_core::error::ErrorKind;
use watch_core::types::{PresenceEntry, TabDescriptor};
use watch_engine::{Reconciler, SnapshotResolver, TabSnapshot};

use helpers::{FlakyStore, key, tab, user};

fn snapshot(tabs: &[TabDescriptor]) -> TabSnapshot {
    SnapshotResolver::default().resolve(tabs)
}

fn reconciler(store: &Arc<FlakyStore>, user_id: &str) -> Reconciler {
    Reconciler::new(user(user_id), store.clone(), PresenceConfig::default())
}

#[tokio::test]
async fn test_unchanged_snapshot_is_idempotent() {
    let store = FlakyStore::new().await;
    let mut reconciler = reconciler(&store, "U1");
    let s = snapshot(&[tab("R1", true), tab("R2", false)]);

    reconciler.reconcile(&s).await;
    let after_first = store.writes();
    assert_eq!(after_first, 1);

    let report = reconciler.reconcile(&s).await;
    assert_eq!(report.writes(), 0);
    assert_eq!(store.writes(), after_first);
}

#[tokio::test]
async fn test_converges_to_final_focus() {
    let store = FlakyStore::new().await;
    let mut reconciler = reconciler(&store, "U1");

    let sequence = [
        vec![tab("A", true)],
        vec![tab("A", false), tab("B", true)],
        vec![tab("B", true), tab("C", false)],
        vec![],
        vec![tab("C", true)],
        vec![tab("A", false).with_subtabs(vec![tab("D", true)]), tab("C", false)],
    ];
    for tabs in &sequence {
        reconciler.reconcile(&snapshot(tabs)).await;
    }

    let watched: Vec<_> = reconciler.state().watched.iter().cloned().collect();
    assert_eq!(watched, vec![key("D")]);

    for id in ["A", "B", "C"] {
        let entry = store.peek(&key(id)).await.unwrap_or_default();
        assert!(!entry.contains(&user("U1")), "U1 still marked on {id}");
    }
    assert!(store.peek(&key("D")).await.unwrap().contains(&user("U1")));
}

#[tokio::test]
async fn test_r1_then_r2_leaves_r1_empty() {
    let store = FlakyStore::new().await;
    let mut reconciler = reconciler(&store, "U1");

    reconciler.reconcile(&snapshot(&[tab("R1", true)])).await;
    let r1 = store.peek(&key("R1")).await.unwrap();
    assert_eq!(r1.len(), 1);
    assert!(r1.contains(&user("U1")));

    let report = reconciler
        .reconcile(&snapshot(&[tab("R1", false), tab("R2", true)]))
        .await;
    assert_eq!(report.unwatched, vec![key("R1")]);
    assert_eq!(report.watched, vec![key("R2")]);

    assert!(store.peek(&key("R1")).await.unwrap().is_empty());
    assert!(store.peek(&key("R2")).await.unwrap().contains(&user("U1")));
}

#[tokio::test]
async fn test_other_clients_marks_survive() {
    let store = FlakyStore::new().await;
    let mut u1 = reconciler(&store, "U1");
    let mut u2 = reconciler(&store, "U2");

    u1.reconcile(&snapshot(&[tab("R1", true)])).await;
    u2.reconcile(&snapshot(&[tab("R1", true)])).await;
    u1.reconcile(&TabSnapshot::empty()).await;

    let entry = store.peek(&key("R1")).await.unwrap();
    assert!(!entry.contains(&user("U1")));
    assert!(entry.contains(&user("U2")));
}

#[tokio::test]
async fn test_failed_get_retries_next_pass() {
    let store = FlakyStore::new().await;
    let mut reconciler = reconciler(&store, "U1");
    let s = snapshot(&[tab("R1", true)]);

    store.set_fail_get(true);
    let report = reconciler.reconcile(&s).await;
    assert_eq!(report.failed, vec![(key("R1"), ErrorKind::StoreUnavailable)]);
    assert!(reconciler.state().watched.is_empty());
    assert_eq!(store.writes(), 0);

    store.set_fail_get(false);
    let report = reconciler.reconcile(&s).await;
    assert_eq!(report.watched, vec![key("R1")]);
    assert!(reconciler.state().is_watching(&key("R1")));
}

#[tokio::test]
async fn test_failed_unwatch_keeps_key_watched() {
    let store = FlakyStore::new().await;
    let mut reconciler = reconciler(&store, "U1");
    reconciler.reconcile(&snapshot(&[tab("R1", true)])).await;

    store.set_fail_put(true);
    let report = reconciler.reconcile(&snapshot(&[tab("R2", true)])).await;
    assert_eq!(report.failed, vec![(key("R1"), ErrorKind::StoreUnavailable)]);
    assert_eq!(report.deferred, vec![key("R2")]);
    assert!(reconciler.state().is_watching(&key("R1")));
    assert!(!reconciler.state().is_watching(&key("R2")));

    store.set_fail_put(false);
    reconciler.reconcile(&snapshot(&[tab("R2", true)])).await;
    let watched: Vec<_> = reconciler.state().watched.iter().cloned().collect();
    assert_eq!(watched, vec![key("R2")]);
}

#[tokio::test]
async fn test_teardown_removes_mark() {
    let store = FlakyStore::new().await;
    let mut reconciler = reconciler(&store, "U1");
    reconciler.reconcile(&snapshot(&[tab("R1", true)])).await;

    store.set_fail_put(true);
    assert!(reconciler.teardown(&key("R1")).await.is_err());
    assert!(!reconciler.state().is_watching(&key("R1")));

    store.set_fail_put(false);
    reconciler.reconcile(&snapshot(&[tab("R1", true)])).await;
    assert!(reconciler.teardown(&key("R1")).await.unwrap());
    assert!(!store.peek(&key("R1")).await.unwrap().contains(&user("U1")));
}

#[tokio::test]
async fn test_subtab_focus_is_exclusive() {
    let store = FlakyStore::new().await;
    let mut reconciler = reconciler(&store, "U1");

    let tabs = vec![tab("A", false).with_subtabs(vec![tab("B", true)])];
    reconciler.reconcile(&snapshot(&tabs)).await;

    assert_eq!(reconciler.focused(), Some(&key("B")));
    let watched: Vec<_> = reconciler.state().watched.iter().cloned().collect();
    assert_eq!(watched, vec![key("B")]);
    assert!(store.peek(&key("A")).await.is_none());
}

#[tokio::test]
async fn test_existing_fresh_mark_is_adopted_without_write() {
    let store = FlakyStore::new().await;
    let mut entry = PresenceEntry::new();
    entry.mark(user("U1"), Utc::now());
    store.seed(&key("R1"), &entry).await;

    let mut reconciler = reconciler(&store, "U1");
    let report = reconciler.reconcile(&snapshot(&[tab("R1", true)])).await;
    assert_eq!(report.watched, vec![key("R1")]);
    assert_eq!(report.writes(), 0);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_stuck_unwatch_defers_new_mark() {
    let store = FlakyStore::new().await;
    let mut reconciler = reconciler(&store, "U1");
    reconciler.reconcile(&snapshot(&[tab("R1", true)])).await;

    store.break_record(&key("R1"));
    let report = reconciler
        .reconcile(&snapshot(&[tab("R1", false), tab("R2", true)]))
        .await;

    assert_eq!(report.failed, vec![(key("R1"), ErrorKind::StoreUnavailable)]);
    assert_eq!(report.deferred, vec![key("R2")]);
    assert!(report.watched.is_empty());
    let watched: Vec<_> = reconciler.state().watched.iter().cloned().collect();
    assert_eq!(watched, vec![key("R1")]);
    assert!(store.peek(&key("R2")).await.is_none());

    store.repair(&key("R1"));
    let report = reconciler
        .reconcile(&snapshot(&[tab("R1", false), tab("R2", true)]))
        .await;
    assert_eq!(report.unwatched, vec![key("R1")]);
    assert_eq!(report.watched, vec![key("R2")]);
    assert!(!store.peek(&key("R1")).await.unwrap().contains(&user("U1")));
    assert!(store.peek(&key("R2")).await.unwrap().contains(&user("U1")));
}

#[tokio::test]
async fn test_teardown_of_unfocused_watched_record() {
    let store = FlakyStore::new().await;
    let mut reconciler = reconciler(&store, "U1");
    reconciler.reconcile(&snapshot(&[tab("R1", true)])).await;

    // R1 loses focus but its mark cannot be removed yet.
    store.break_record(&key("R1"));
    reconciler
        .reconcile(&snapshot(&[tab("R1", false), tab("R2", true)]))
        .await;
    assert_eq!(reconciler.focused(), Some(&key("R2")));
    assert!(reconciler.state().is_watching(&key("R1")));

    store.repair(&key("R1"));
    assert!(reconciler.teardown(&key("R1")).await.unwrap());
    assert!(!reconciler.state().is_watching(&key("R1")));
    assert_eq!(reconciler.focused(), Some(&key("R2")));
    assert!(!store.peek(&key("R1")).await.unwrap().contains(&user("U1")));

    let report = reconciler.reconcile(&snapshot(&[tab("R2", true)])).await;
    assert_eq!(report.watched, vec![key("R2")]);
    let watched: Vec<_> = reconciler.state().watched.iter().cloned().collect();
    assert_eq!(watched, vec![key("R2")]);
}
