//! # Volatile Cache
//!
//! RAM-only record stores, empty on every start.
//!
//! ## Freshness
//!
//! - Each entry remembers when it was written
//! - An entry is fresh while `now - written_at < ttl`
//! - Readers decide freshness at read time; a stale entry is a miss, not an error
//! - The sweeper only bounds memory, it never decides what gets served
//!
//! ## TTLs
//!
//! - Profiles: 30 minutes
//! - Presences: 15 minutes
//! - Sweep: every 10 minutes
//!
//! Writes replace whole entries, so the map-level locking `DashMap` does per
//! shard is all the coordination needed. The last writer wins.

use std::{sync::Arc, time::Duration as StdDuration};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::{task::JoinHandle, time::interval};
use tracing::info;

use crate::{
    auth::SessionStore,
    models::{PresenceRecord, ProfileRecord},
};

pub const PROFILE_TTL_MINUTES: i64 = 30;
pub const PRESENCE_TTL_MINUTES: i64 = 15;
pub const SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(10 * 60);

#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub written_at: DateTime<Utc>,
}

impl<T> Cached<T> {
    pub fn is_fresh_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.written_at < ttl
    }
}

pub struct TtlStore<T> {
    entries: DashMap<String, Cached<T>>,
    ttl: Duration,
}

impl<T: Clone> TtlStore<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The entry regardless of age.
    pub fn get(&self, id: &str) -> Option<Cached<T>> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    pub fn get_fresh(&self, id: &str) -> Option<T> {
        self.get_fresh_at(id, Utc::now())
    }

    pub fn get_fresh_at(&self, id: &str, now: DateTime<Utc>) -> Option<T> {
        self.entries
            .get(id)
            .filter(|entry| entry.is_fresh_at(now, self.ttl))
            .map(|entry| entry.value.clone())
    }

    pub fn set(&self, id: &str, value: T) {
        self.set_at(id, value, Utc::now());
    }

    pub fn set_at(&self, id: &str, value: T, written_at: DateTime<Utc>) {
        self.entries
            .insert(id.to_string(), Cached { value, written_at });
    }

    pub fn remove(&self, id: &str) -> Option<T> {
        self.entries.remove(id).map(|(_, entry)| entry.value)
    }

    /// Drops entries older than the TTL; returns how many were dropped.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now - entry.written_at <= self.ttl);

        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct VolatileCache {
    pub profiles: TtlStore<ProfileRecord>,
    pub presences: TtlStore<PresenceRecord>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub profiles_evicted: usize,
    pub presences_evicted: usize,
}

impl VolatileCache {
    pub fn new() -> Self {
        Self {
            profiles: TtlStore::new(Duration::minutes(PROFILE_TTL_MINUTES)),
            presences: TtlStore::new(Duration::minutes(PRESENCE_TTL_MINUTES)),
        }
    }

    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(Utc::now())
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        SweepReport {
            profiles_evicted: self.profiles.sweep_at(now),
            presences_evicted: self.presences.sweep_at(now),
        }
    }
}

impl Default for VolatileCache {
    fn default() -> Self {
        Self::new()
    }
}

pub fn spawn_sweeper(
    cache: Arc<VolatileCache>,
    sessions: Arc<SessionStore>,
    every: StdDuration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let report = cache.sweep();
            let sessions_evicted = sessions.sweep();

            info!(
                "Cache cleanup: evicted {} profiles, {} presences, {} sessions; {} users and {} presences in memory",
                report.profiles_evicted,
                report.presences_evicted,
                sessions_evicted,
                cache.profiles.len(),
                cache.presences.len(),
            );
        }
    })
}
