//! # Resolution
//!
//! Every JSON lookup walks the same steps:
//!
//! 1. Validate the id, 400 on failure
//! 2. Connect the bot if connecting is deferred to the first request
//! 3. Fresh cache hit, done
//! 4. Live lookup, bounded by a timeout, cached on success
//! 5. Deterministic mock
//!
//! Steps 4 and 5 never fail. Callers cannot tell live data from mock data.
//!
//! A request carrying a login tries the live lookup before the cache and never
//! writes what it gets back. Token lookups can see owner-only data, and the
//! cache is shared by every caller.

use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{
    cache::VolatileCache,
    error::AppError,
    id::UserId,
    mock,
    models::{Activity, Connection, ProfileRecord, Status, UserSummary},
    resolver::{AuthContext, LiveResolver},
};

pub struct Pipeline {
    cache: Arc<VolatileCache>,
    resolver: Arc<dyn LiveResolver>,
    lazy_connect: bool,
    resolve_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        cache: Arc<VolatileCache>,
        resolver: Arc<dyn LiveResolver>,
        lazy_connect: bool,
        resolve_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            resolver,
            lazy_connect,
            resolve_timeout,
        }
    }

    pub fn cache(&self) -> &Arc<VolatileCache> {
        &self.cache
    }

    pub fn resolver(&self) -> &Arc<dyn LiveResolver> {
        &self.resolver
    }

    async fn prepare(&self, raw: &str) -> Result<UserId, AppError> {
        let id = UserId::parse(raw)?;

        if self.lazy_connect {
            self.bounded("connect", async {
                self.resolver.ensure_connected().await;
                Some(())
            })
            .await;
        }

        Ok(id)
    }

    /// A hung upstream call counts as NotFound.
    async fn bounded<T>(&self, what: &str, lookup: impl Future<Output = Option<T>>) -> Option<T> {
        match timeout(self.resolve_timeout, lookup).await {
            Ok(found) => found,
            Err(_) => {
                warn!("Live {what} lookup timed out after {:?}", self.resolve_timeout);
                None
            }
        }
    }

    fn with_fresh_status(&self, id: &UserId, mut profile: ProfileRecord) -> ProfileRecord {
        if let Some(presence) = self.cache.presences.get_fresh(id.as_str()) {
            profile.status = presence.status;
        }
        profile
    }

    pub async fn profile(&self, raw: &str, auth: Option<&AuthContext>) -> Result<ProfileRecord, AppError> {
        let id = self.prepare(raw).await?;

        if let Some(auth) = auth {
            let private = self.bounded("profile", self.resolver.resolve_profile(&id, Some(auth))).await;

            if let Some(profile) = private {
                return Ok(self.with_fresh_status(&id, profile));
            }
        }

        if let Some(cached) = self.cache.profiles.get_fresh(id.as_str()) {
            debug!("Profile cache hit for {id}");
            return Ok(cached);
        }

        // a logged-in lookup already came back empty above
        let live = match auth {
            Some(_) => None,
            None => self.bounded("profile", self.resolver.resolve_profile(&id, None)).await,
        };

        let profile = match live {
            Some(live) => self.with_fresh_status(&id, live),
            None => {
                debug!("Simulating profile for {id}");
                mock::synthesize_id(&id)
            }
        };

        self.cache.profiles.set(id.as_str(), profile.clone());

        Ok(profile)
    }

    pub async fn status(&self, raw: &str) -> Result<Status, AppError> {
        let id = self.prepare(raw).await?;

        if let Some(presence) = self.cache.presences.get_fresh(id.as_str()) {
            return Ok(presence.status);
        }

        if let Some(status) = self.bounded("status", self.resolver.resolve_status(&id)).await {
            return Ok(status);
        }

        Ok(mock::mock_status(&id))
    }

    pub async fn presence(&self, raw: &str) -> Result<Vec<Activity>, AppError> {
        let id = self.prepare(raw).await?;

        if let Some(presence) = self.cache.presences.get_fresh(id.as_str()) {
            return Ok(presence.activities);
        }

        if let Some(presence) = self.bounded("presence", self.resolver.resolve_presence(&id)).await {
            self.cache.presences.set(id.as_str(), presence.clone());
            return Ok(presence.activities);
        }

        Ok(mock::mock_activities(&id, Utc::now()))
    }

    pub async fn connections(&self, raw: &str, auth: Option<&AuthContext>) -> Result<Vec<Connection>, AppError> {
        let id = self.prepare(raw).await?;

        if auth.is_some() {
            if let Some(connections) = self
                .bounded("connections", self.resolver.resolve_connections(&id, auth))
                .await
            {
                return Ok(connections);
            }
        }

        if let Some(profile) = self.cache.profiles.get_fresh(id.as_str()) {
            return Ok(profile.connections);
        }

        Ok(mock::mock_endpoint_connections(&id))
    }

    pub async fn user(&self, raw: &str, auth: Option<&AuthContext>) -> Result<UserSummary, AppError> {
        self.profile(raw, auth).await.map(UserSummary::from)
    }
}
