//! # Live Data
//!
//! Best-effort lookups against Discord. Every failure here is absorbed: the
//! caller only ever sees "found" or "not found" and falls back to mock data on
//! the latter.
//!
//! ## Sources, in order
//!
//! 1. The logged-in user's bearer token, when the request carries a session
//! 2. The bot's direct user lookup
//! 3. The bot's guilds, one member lookup at a time, first match wins
//!
//! Guild order is whatever Discord returned when the bot connected. The guild
//! scan only runs when the session can see presences; a REST-only bot gets
//! statuses through the presence store instead.

use std::{fmt::Display, future::Future, sync::Arc};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    discord::{
        DiscordError, OAuthApi, SessionClient, cdn,
        models::{DiscordConnection, DiscordUser, GuildMember, MemberPresence},
    },
    id::UserId,
    models::{Activity, Connection, PresenceRecord, ProfileRecord, Status},
    snowflake,
};

#[derive(Debug, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    Exhausted { attempts: usize },
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Exhausted { .. } => None,
        }
    }
}

/// Runs `attempt` over `items` in order and stops at the first success.
/// Failures are logged and skipped, never returned.
pub async fn first_success<I, F, Fut, T, E>(items: I, mut attempt: F) -> Lookup<T>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempts = 0;

    for item in items {
        attempts += 1;

        match attempt(item).await {
            Ok(found) => return Lookup::Found(found),
            Err(e) => debug!("Lookup attempt {attempts} failed: {e}"),
        }
    }

    Lookup::Exhausted { attempts }
}

/// Who is asking, when they logged in with Discord.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub access_token: String,
}

#[async_trait]
pub trait LiveResolver: Send + Sync {
    /// Connects the underlying session if it is configured and idle.
    async fn ensure_connected(&self) {}

    async fn resolve_profile(&self, id: &UserId, auth: Option<&AuthContext>) -> Option<ProfileRecord>;

    async fn resolve_status(&self, id: &UserId) -> Option<Status>;

    async fn resolve_presence(&self, id: &UserId) -> Option<PresenceRecord>;

    async fn resolve_connections(&self, id: &UserId, auth: Option<&AuthContext>)
    -> Option<Vec<Connection>>;
}

/// Used when neither a bot token nor OAuth credentials are configured.
pub struct NoopResolver;

#[async_trait]
impl LiveResolver for NoopResolver {
    async fn resolve_profile(&self, _id: &UserId, _auth: Option<&AuthContext>) -> Option<ProfileRecord> {
        None
    }

    async fn resolve_status(&self, _id: &UserId) -> Option<Status> {
        None
    }

    async fn resolve_presence(&self, _id: &UserId) -> Option<PresenceRecord> {
        None
    }

    async fn resolve_connections(
        &self,
        _id: &UserId,
        _auth: Option<&AuthContext>,
    ) -> Option<Vec<Connection>> {
        None
    }
}

/// Resolves through a bot session and, for logged-in users, their own token.
/// With neither configured every lookup is NotFound.
pub struct DiscordResolver {
    session: Option<Arc<dyn SessionClient>>,
    oauth: Option<Arc<dyn OAuthApi>>,
}

impl DiscordResolver {
    pub fn new(session: Option<Arc<dyn SessionClient>>, oauth: Option<Arc<dyn OAuthApi>>) -> Self {
        Self { session, oauth }
    }

    fn ready_session(&self) -> Option<&dyn SessionClient> {
        self.session
            .as_deref()
            .filter(|session| session.is_ready())
    }

    fn presence_session(&self, id: &UserId) -> Option<&dyn SessionClient> {
        let session = self.ready_session()?;

        if !session.sees_presences() {
            debug!("Session cannot see presences, skipping guild scan for {id}");
            return None;
        }

        Some(session)
    }

    async fn profile_via_token(&self, id: &UserId, auth: &AuthContext) -> Option<ProfileRecord> {
        let oauth = self.oauth.as_deref()?;

        let user = oauth
            .fetch_user(&auth.access_token, id.as_str())
            .await
            .inspect_err(|e| debug!("Token lookup for {id} failed: {e}"))
            .ok()?;

        let connections = if auth.user_id == id.as_str() {
            own_connections(oauth, &auth.access_token).await
        } else {
            Vec::new()
        };

        Some(profile_from_user(id, &user, None, Status::Offline, connections))
    }

    async fn first_member<T, F>(&self, session: &dyn SessionClient, id: &UserId, pick: F) -> Option<T>
    where
        F: Fn(GuildMember) -> Option<T>,
    {
        let guilds = session.guilds();
        let user_id = id.as_str();
        let pick = &pick;

        let lookup = first_success(guilds, |guild| async move {
            session
                .fetch_member(&guild.id, user_id)
                .await
                .and_then(|member| pick(member).ok_or(DiscordError::Missing("presence")))
        })
        .await;

        if let Lookup::Exhausted { attempts } = lookup {
            debug!("Could not find {id} in any of {attempts} guilds");
            return None;
        }

        lookup.found()
    }
}

#[async_trait]
impl LiveResolver for DiscordResolver {
    async fn ensure_connected(&self) {
        let Some(session) = &self.session else {
            return;
        };

        if !session.is_ready() {
            if let Err(e) = session.connect().await {
                warn!("Bot login failed, serving simulated data instead: {e}");
            }
        }
    }

    async fn resolve_profile(&self, id: &UserId, auth: Option<&AuthContext>) -> Option<ProfileRecord> {
        if let Some(auth) = auth {
            if let Some(profile) = self.profile_via_token(id, auth).await {
                return Some(profile);
            }
        }

        let session = self.ready_session()?;

        let user = session
            .fetch_user(id.as_str())
            .await
            .inspect_err(|e| debug!("Bot lookup for {id} failed: {e}"))
            .ok()?;

        let member = if session.sees_presences() {
            self.first_member(session, id, Some).await
        } else {
            None
        };
        let presence = member.as_ref().and_then(|m| m.presence.as_ref());
        let status = presence
            .map(|p| Status::from_wire(&p.status))
            .unwrap_or_default();

        Some(profile_from_user(
            id,
            &user,
            member.as_ref().and_then(|m| m.user.as_ref()),
            status,
            Vec::new(),
        ))
    }

    async fn resolve_status(&self, id: &UserId) -> Option<Status> {
        let session = self.presence_session(id)?;

        self.first_member(session, id, |member| member.presence)
            .await
            .map(|presence| Status::from_wire(&presence.status))
    }

    async fn resolve_presence(&self, id: &UserId) -> Option<PresenceRecord> {
        let session = self.presence_session(id)?;

        self.first_member(session, id, |member| {
            member
                .presence
                .filter(|presence| !presence.activities.is_empty())
        })
        .await
        .map(presence_record)
    }

    async fn resolve_connections(
        &self,
        id: &UserId,
        auth: Option<&AuthContext>,
    ) -> Option<Vec<Connection>> {
        // bots cannot read connections, only the account owner's token can
        let auth = auth.filter(|auth| auth.user_id == id.as_str())?;
        let oauth = self.oauth.as_deref()?;

        Some(own_connections(oauth, &auth.access_token).await)
    }
}

async fn own_connections(oauth: &dyn OAuthApi, token: &str) -> Vec<Connection> {
    oauth
        .connections(token)
        .await
        .inspect_err(|e| debug!("Connections lookup failed: {e}"))
        .unwrap_or_default()
        .into_iter()
        .filter(DiscordConnection::is_public)
        .map(DiscordConnection::into)
        .collect()
}

pub fn presence_record(presence: MemberPresence) -> PresenceRecord {
    PresenceRecord {
        status: Status::from_wire(&presence.status),
        activities: presence.activities.into_iter().map(Activity::from).collect(),
    }
}

/// Shapes a Discord user into the served record. `member_user` is the copy
/// returned by a guild member lookup, which sometimes carries richer fields.
pub fn profile_from_user(
    id: &UserId,
    user: &DiscordUser,
    member_user: Option<&DiscordUser>,
    status: Status,
    connections: Vec<Connection>,
) -> ProfileRecord {
    let richer = |field: fn(&DiscordUser) -> Option<String>| {
        member_user.and_then(field).or_else(|| field(user))
    };

    let banner = richer(|u| u.banner.clone()).map(|hash| cdn::banner_url(&user.id, &hash));
    let banner_color = member_user
        .and_then(|u| u.accent_color)
        .or(user.accent_color)
        .map(cdn::accent_hex);

    ProfileRecord {
        id: id.to_string(),
        username: user.username.clone(),
        discriminator: user
            .discriminator
            .clone()
            .unwrap_or_else(|| "0000".to_string()),
        avatar: cdn::avatar_url(user),
        banner,
        banner_color,
        created_at: snowflake::decode_id(id),
        about_me: richer(|u| u.bio.clone()),
        status,
        badges: cdn::badges(user),
        connections,
    }
}
