//! Shared helpers for engine integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use watch_cache::CachePresenceStore;
use watch_core::config::AppConfig;
use watch_core::config::cache::CacheConfig;
use watch_core::error::AppError;
use watch_core::result::AppResult;
use watch_core::traits::channel::PushChannel;
use watch_core::traits::store::PresenceStore;
use watch_core::traits::tabs::TabSource;
use watch_core::types::{ObjectType, PresenceEntry, RecordId, RecordKey, TabDescriptor, UserId, UserProfile};
use watch_engine::host::{ProfileDirectory, StaticTabSource};
use watch_engine::{Collaborators, OutboundUpdate, WatchSession};

/// Presence store over the in-memory cache that counts writes and can be
/// told to fail or hang.
#[derive(Debug)]
pub struct FlakyStore {
    inner: CachePresenceStore,
    pub writes: AtomicUsize,
    pub reads: AtomicUsize,
    pub fail_get: AtomicBool,
    pub fail_put: AtomicBool,
    pub hang_get: AtomicBool,
    pub capable: AtomicBool,
    /// Records for which every call fails.
    broken: Mutex<HashSet<RecordKey>>,
}

impl FlakyStore {
    pub async fn new() -> Arc<Self> {
        let inner = CachePresenceStore::from_config(&CacheConfig::default())
            .await
            .expect("memory cache");
        Arc::new(Self {
            inner,
            writes: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            fail_get: AtomicBool::new(false),
            fail_put: AtomicBool::new(false),
            hang_get: AtomicBool::new(false),
            capable: AtomicBool::new(true),
            broken: Mutex::new(HashSet::new()),
        })
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_put(&self, fail: bool) {
        self.fail_put.store(fail, Ordering::SeqCst);
    }

    /// Make every call on `key` fail until [`FlakyStore::repair`].
    pub fn break_record(&self, key: &RecordKey) {
        self.broken.lock().unwrap().insert(key.clone());
    }

    pub fn repair(&self, key: &RecordKey) {
        self.broken.lock().unwrap().remove(key);
    }

    fn check(&self, key: &RecordKey) -> AppResult<()> {
        if self.broken.lock().unwrap().contains(key) {
            return Err(AppError::store_unavailable(format!("injected failure for {key}")));
        }
        Ok(())
    }

    /// Read an entry without counting it.
    pub async fn peek(&self, key: &RecordKey) -> Option<PresenceEntry> {
        self.inner.get(key).await.expect("memory cache read")
    }

    /// Seed an entry without counting it.
    pub async fn seed(&self, key: &RecordKey, entry: &PresenceEntry) {
        self.inner.put(key, entry).await.expect("memory cache write");
    }
}

#[async_trait]
impl PresenceStore for FlakyStore {
    async fn get(&self, key: &RecordKey) -> AppResult<Option<PresenceEntry>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.hang_get.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(AppError::store_unavailable("injected get failure"));
        }
        self.check(key)?;
        self.inner.get(key).await
    }

    async fn put(&self, key: &RecordKey, entry: &PresenceEntry) -> AppResult<()> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(AppError::store_unavailable("injected put failure"));
        }
        self.check(key)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, entry).await
    }

    async fn remove(&self, key: &RecordKey) -> AppResult<()> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(AppError::store_unavailable("injected remove failure"));
        }
        self.check(key)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self.capable.load(Ordering::SeqCst))
    }
}

/// Host tab source that can be switched off.
#[derive(Debug, Default)]
pub struct FlakyTabs {
    inner: StaticTabSource,
    unavailable: AtomicBool,
}

impl FlakyTabs {
    pub async fn set_tabs(&self, tabs: Vec<TabDescriptor>) {
        self.inner.set_tabs(tabs).await;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl TabSource for FlakyTabs {
    async fn open_tabs(&self) -> AppResult<Vec<TabDescriptor>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::snapshot_unavailable("injected tab failure"));
        }
        self.inner.open_tabs().await
    }
}

pub fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

pub fn case() -> ObjectType {
    ObjectType::new("Case").unwrap()
}

pub fn key(id: &str) -> RecordKey {
    RecordKey::new(case(), RecordId::new(id).unwrap())
}

pub fn tab(id: &str, focused: bool) -> TabDescriptor {
    TabDescriptor::record("Case", id, focused)
}

pub fn profile(id: &str, name: &str) -> UserProfile {
    UserProfile {
        user_id: user(id),
        display_name: name.to_string(),
        photo_url: None,
    }
}

/// A session for `user_id` over shared collaborators.
pub struct TestSession {
    pub session: WatchSession,
    pub updates: mpsc::Receiver<OutboundUpdate>,
    pub tabs: Arc<FlakyTabs>,
}

impl TestSession {
    pub fn new(
        user_id: &str,
        store: Arc<FlakyStore>,
        channel: Arc<dyn PushChannel>,
        profiles: Arc<ProfileDirectory>,
    ) -> Self {
        Self::with_config(user_id, store, channel, profiles, AppConfig::default())
    }

    pub fn with_config(
        user_id: &str,
        store: Arc<FlakyStore>,
        channel: Arc<dyn PushChannel>,
        profiles: Arc<ProfileDirectory>,
        config: AppConfig,
    ) -> Self {
        let tabs = Arc::new(FlakyTabs::default());
        let collaborators = Collaborators {
            store,
            tabs: tabs.clone(),
            channel,
            profiles,
        };
        let (session, updates) =
            WatchSession::new(&config, user(user_id), vec![case()], collaborators).unwrap();
        Self {
            session,
            updates,
            tabs,
        }
    }

    /// Most recent watcher list sent, draining the update queue.
    pub fn last_watchers(&mut self) -> Option<watch_engine::WatcherList> {
        let mut last = None;
        while let Ok(update) = self.updates.try_recv() {
            if let OutboundUpdate::Watchers(list) = update {
                last = Some(list);
            }
        }
        last
    }

    /// Every update currently queued.
    pub fn drain_updates(&mut self) -> Vec<OutboundUpdate> {
        let mut all = Vec::new();
        while let Ok(update) = self.updates.try_recv() {
            all.push(update);
        }
        all
    }
}

/// Let spawned forwarder tasks run.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
