//! Builds [`WatcherList`]s and caches the profiles behind them.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use watch_core::config::presence::PresenceConfig;
use watch_core::error::AppError;
use watch_core::traits::profile::ProfileLookup;
use watch_core::types::{PresenceEntry, UserId, UserProfile};

use super::view::{WatcherList, WatcherStatus, WatcherView};
use crate::io::with_deadline;

/// Turns the focused record's presence entry into a sorted watcher list.
///
/// Profiles are looked up only when the set of other watchers differs
/// from the one last resolved. Watchers the lookup could not resolve are
/// shown with a placeholder, and the next projection asks again.
#[derive(Debug)]
pub struct WatcherProjector {
    local: UserId,
    lookup: Arc<dyn ProfileLookup>,
    active_threshold: chrono::Duration,
    inline_limit: usize,
    io_timeout: Duration,
    /// Watcher set whose profiles are fully resolved. `None` forces a lookup.
    known: Option<BTreeSet<UserId>>,
    profiles: HashMap<UserId, UserProfile>,
    lookups: usize,
}

impl WatcherProjector {
    pub fn new(local: UserId, lookup: Arc<dyn ProfileLookup>, config: &PresenceConfig) -> Self {
        Self {
            local,
            lookup,
            active_threshold: config.active_threshold(),
            inline_limit: config.inline_limit,
            io_timeout: config.io_timeout(),
            known: None,
            profiles: HashMap::new(),
            lookups: 0,
        }
    }

    /// Number of profile lookups issued so far.
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    /// Project `entry` as of `now`. An absent entry yields an empty list.
    pub async fn project(&mut self, entry: Option<&PresenceEntry>, now: DateTime<Utc>) -> WatcherList {
        let Some(entry) = entry else {
            return WatcherList {
                watchers: Vec::new(),
                inline_limit: self.inline_limit,
            };
        };

        let ids: BTreeSet<UserId> = entry.others(&self.local).into_iter().collect();
        if self.known.as_ref() != Some(&ids) {
            self.resolve(&ids).await;
        }

        let mut watchers: Vec<WatcherView> = entry
            .iter()
            .filter(|(id, _)| **id != self.local)
            .map(|(id, seen)| {
                let status = if now.signed_duration_since(*seen) <= self.active_threshold {
                    WatcherStatus::Active
                } else {
                    WatcherStatus::Inactive
                };
                match self.profiles.get(id) {
                    Some(profile) => WatcherView::new(profile, status),
                    None => WatcherView::new(&UserProfile::placeholder(id.clone()), status),
                }
            })
            .collect();

        watchers.sort_by(|a, b| {
            b.is_active
                .cmp(&a.is_active)
                .then_with(|| {
                    a.display_name
                        .to_lowercase()
                        .cmp(&b.display_name.to_lowercase())
                })
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        WatcherList {
            watchers,
            inline_limit: self.inline_limit,
        }
    }

    async fn resolve(&mut self, ids: &BTreeSet<UserId>) {
        if ids.is_empty() {
            self.known = Some(BTreeSet::new());
            return;
        }

        self.lookups += 1;
        let request: Vec<UserId> = ids.iter().cloned().collect();
        let result = with_deadline(
            self.io_timeout,
            "profiles.resolve",
            self.lookup.resolve(&request),
        )
        .await;

        match result {
            Ok(profiles) => {
                for profile in profiles {
                    if ids.contains(&profile.user_id) {
                        self.profiles.insert(profile.user_id.clone(), profile);
                    }
                }
                self.profiles.retain(|id, _| ids.contains(id));

                let missing: Vec<&UserId> =
                    ids.iter().filter(|id| !self.profiles.contains_key(*id)).collect();
                if missing.is_empty() {
                    debug!(watchers = ids.len(), "Resolved watcher profiles");
                    self.known = Some(ids.clone());
                } else {
                    let e = AppError::profile_lookup_partial(format!(
                        "{} of {} profiles unresolved",
                        missing.len(),
                        ids.len()
                    ));
                    warn!(error = %e, missing = ?missing, "Using placeholders");
                    self.known = None;
                }
            }
            Err(e) => {
                warn!(error = %e, op = "profiles.resolve", "Profile lookup failed, using placeholders");
                self.known = None;
            }
        }
    }
}
