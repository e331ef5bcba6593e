use std::sync::{
    RwLock,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{
    http::{Auth, DiscordError, DiscordHttp},
    models::{DiscordUser, GuildMember, PartialGuild},
};

/// A bot login and the guilds it can see.
#[async_trait]
pub trait SessionClient: Send + Sync {
    fn is_ready(&self) -> bool;

    /// Whether member lookups come back with presence attached. REST member
    /// objects never do, so scanning guilds for a status is wasted I/O there.
    fn sees_presences(&self) -> bool {
        false
    }

    async fn connect(&self) -> Result<(), DiscordError>;

    async fn fetch_user(&self, user_id: &str) -> Result<DiscordUser, DiscordError>;

    /// Snapshot of the guild list; order is whatever Discord returned.
    fn guilds(&self) -> Vec<PartialGuild>;

    async fn fetch_member(&self, guild_id: &str, user_id: &str) -> Result<GuildMember, DiscordError>;
}

pub struct RestSession {
    http: DiscordHttp,
    token: String,
    ready: AtomicBool,
    guilds: RwLock<Vec<PartialGuild>>,
    connecting: Mutex<()>,
}

impl RestSession {
    pub fn new(http: DiscordHttp, token: String) -> Self {
        Self {
            http,
            token,
            ready: AtomicBool::new(false),
            guilds: RwLock::new(Vec::new()),
            connecting: Mutex::new(()),
        }
    }

    fn auth(&self) -> Auth<'_> {
        Auth::Bot(&self.token)
    }
}

#[async_trait]
impl SessionClient for RestSession {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    async fn connect(&self) -> Result<(), DiscordError> {
        let _guard = self.connecting.lock().await;

        if self.is_ready() {
            return Ok(());
        }

        let me: DiscordUser = self
            .http
            .get("/users/@me", self.auth())
            .await
            .inspect_err(|e| warn!("Failed to login to Discord: {e}"))?;
        let guilds: Vec<PartialGuild> = self.http.get("/users/@me/guilds", self.auth()).await?;

        info!("Logged in as {}!", me.username);
        info!("Bot is in {} servers", guilds.len());

        *self.guilds.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = guilds;
        self.ready.store(true, Ordering::Release);

        Ok(())
    }

    async fn fetch_user(&self, user_id: &str) -> Result<DiscordUser, DiscordError> {
        if !self.is_ready() {
            return Err(DiscordError::NotReady);
        }

        self.http.get(&format!("/users/{user_id}"), self.auth()).await
    }

    fn guilds(&self) -> Vec<PartialGuild> {
        self.guilds
            .read()
            .map(|guilds| guilds.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    async fn fetch_member(&self, guild_id: &str, user_id: &str) -> Result<GuildMember, DiscordError> {
        if !self.is_ready() {
            return Err(DiscordError::NotReady);
        }

        self.http
            .get(&format!("/guilds/{guild_id}/members/{user_id}"), self.auth())
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn offline_session() -> RestSession {
        let http = DiscordHttp::with_base("http://127.0.0.1:9", Duration::from_millis(500), None).unwrap();
        RestSession::new(http, "token".to_string())
    }

    #[tokio::test]
    async fn test_not_ready_skips_io() {
        let session = offline_session();

        assert!(!session.is_ready());
        assert!(!session.sees_presences());
        assert!(session.guilds().is_empty());
        assert!(matches!(
            session.fetch_user("80351110224678912").await,
            Err(DiscordError::NotReady)
        ));
        assert!(matches!(
            session.fetch_member("1", "80351110224678912").await,
            Err(DiscordError::NotReady)
        ));
    }

    #[tokio::test]
    async fn test_failed_connect_stays_not_ready() {
        let session = offline_session();

        assert!(session.connect().await.is_err());
        assert!(!session.is_ready());
    }
}
