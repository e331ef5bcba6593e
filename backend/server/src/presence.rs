//! Presence updates pushed to us, outside of any request.
//!
//! Producers (the webhook route, or anything else holding a sender) push
//! [`PresenceEvent`]s into a bounded channel and a single task writes them
//! into the presence store. Last writer wins; a read racing a write sees
//! either record.

use std::sync::Arc;

use serde::Deserialize;
use tokio::{
    sync::mpsc::{Receiver, Sender, channel},
    task::JoinHandle,
};
use tracing::{debug, info};

use crate::{
    cache::VolatileCache,
    discord::models::WireActivity,
    id::UserId,
    models::{Activity, PresenceRecord, Status},
};

pub const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct PresenceEvent {
    pub user_id: UserId,
    pub presence: PresenceRecord,
}

#[derive(Deserialize, Debug)]
pub struct PresenceUser {
    pub id: String,
}

/// Accepts both the gateway's `PRESENCE_UPDATE` shape (`user.id`) and a flat
/// `user_id`/`userId` field.
#[derive(Deserialize, Debug)]
pub struct PresenceUpdate {
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user: Option<PresenceUser>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub activities: Vec<WireActivity>,
}

impl PresenceUpdate {
    /// `None` unless the payload names a valid id and carries a status.
    pub fn into_event(self) -> Option<PresenceEvent> {
        let raw = self.user_id.or(self.user.map(|user| user.id))?;
        let status = self.status?;
        let user_id = UserId::parse(&raw).ok()?;

        Some(PresenceEvent {
            user_id,
            presence: PresenceRecord {
                status: Status::from_wire(&status),
                activities: self.activities.into_iter().map(Activity::from).collect(),
            },
        })
    }
}

pub fn presence_channel() -> (Sender<PresenceEvent>, Receiver<PresenceEvent>) {
    channel(CHANNEL_CAPACITY)
}

pub fn spawn_presence_ingest(cache: Arc<VolatileCache>, mut rx: Receiver<PresenceEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            debug!("Presence update for {}: {}", event.user_id, event.presence.status);
            cache.presences.set(event.user_id.as_str(), event.presence);
        }

        info!("Presence channel closed");
    })
}
