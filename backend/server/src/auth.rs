//! # Login
//!
//! Discord OAuth2 authorization-code flow, sessions kept in memory.
//!
//! ## Flow
//!
//! - `/auth/discord` issues a one-shot `state` (10 minutes) and redirects to Discord
//! - `/auth/discord/callback` checks the `state`, exchanges the code, fetches `@me`
//! - A session id goes back in the `sid` cookie, lasts a week
//!
//! ## Cookie
//!
//! - `HttpOnly`, `SameSite=Lax`, `Path=/`
//! - `Secure` only in production, local development runs over plain http
//!
//! Sessions die with the process. Lookups never require one, a session only
//! unlocks the user's own token for richer data.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::{
        HeaderMap,
        header::{COOKIE, SET_COOKIE},
    },
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    cache::TtlStore,
    config::OAuthCredentials,
    discord::{DiscordError, cdn, models::DiscordUser},
    error::AppError,
    models::iso_millis,
    resolver::AuthContext,
    snowflake,
    state::AppState,
};

pub const SESSION_COOKIE: &str = "sid";
pub const SESSION_TTL_DAYS: i64 = 7;
const STATE_TTL_MINUTES: i64 = 10;

const AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";
const SCOPES: &str = "identify connections email";

const LOGIN_UNAVAILABLE: &str = "/?error=login_unavailable";
const AUTH_FAILED: &str = "/?error=auth_failed";

#[derive(Serialize, Debug, Clone)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    pub discriminator: String,
    pub avatar: String,
    #[serde(skip)]
    pub access_token: String,
    #[serde(serialize_with = "iso_millis")]
    pub created_at: DateTime<Utc>,
}

impl SessionUser {
    pub fn from_discord(user: &DiscordUser, access_token: String) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            discriminator: user.discriminator.clone().unwrap_or_else(|| "0".to_string()),
            avatar: cdn::avatar_url(user),
            access_token,
            created_at: snowflake::decode(&user.id).unwrap_or(DateTime::UNIX_EPOCH),
        }
    }
}

pub struct SessionStore {
    sessions: TtlStore<SessionUser>,
    pending: TtlStore<()>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: TtlStore::new(Duration::days(SESSION_TTL_DAYS)),
            pending: TtlStore::new(Duration::minutes(STATE_TTL_MINUTES)),
        }
    }

    pub fn create(&self, user: SessionUser) -> String {
        let sid = Uuid::new_v4().simple().to_string();
        self.sessions.set(&sid, user);
        sid
    }

    pub fn get(&self, sid: &str) -> Option<SessionUser> {
        self.sessions.get_fresh(sid)
    }

    pub fn remove(&self, sid: &str) -> Option<SessionUser> {
        self.sessions.remove(sid)
    }

    pub fn issue_state(&self) -> String {
        let state = Uuid::new_v4().simple().to_string();
        self.pending.set(&state, ());
        state
    }

    /// One use only, whether it was still valid or not.
    pub fn take_state(&self, state: &str) -> bool {
        let fresh = self.pending.get_fresh(state).is_some();
        self.pending.remove(state);
        fresh
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops expired sessions and abandoned logins, returns how many sessions went.
    pub fn sweep(&self) -> usize {
        let now = Utc::now();
        self.pending.sweep_at(now);
        self.sessions.sweep_at(now)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(sid: &str, secure: bool) -> String {
    let max_age = Duration::days(SESSION_TTL_DAYS).num_seconds();
    let secure = if secure { "; Secure" } else { "" };

    format!("{SESSION_COOKIE}={sid}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}{secure}")
}

pub fn clear_cookie(secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };

    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0{secure}")
}

pub fn authorize_url(credentials: &OAuthCredentials, state: &str) -> Result<Url, url::ParseError> {
    Url::parse_with_params(
        AUTHORIZE_URL,
        &[
            ("client_id", credentials.client_id.as_str()),
            ("redirect_uri", credentials.callback_url.as_str()),
            ("response_type", "code"),
            ("scope", SCOPES),
            ("state", state),
        ],
    )
}

/// The session behind the request's cookie, if any.
pub fn current_user(state: &AppState, headers: &HeaderMap) -> Option<SessionUser> {
    session_id(headers).and_then(|sid| state.sessions.get(&sid))
}

pub fn auth_context(state: &AppState, headers: &HeaderMap) -> Option<AuthContext> {
    current_user(state, headers).map(|user| AuthContext {
        user_id: user.id,
        access_token: user.access_token,
    })
}

#[derive(Error, Debug)]
enum LoginError {
    #[error("OAuth is not configured")]
    Unavailable,

    #[error("Discord denied the request: {0}")]
    Denied(String),

    #[error("missing or expired state")]
    InvalidState,

    #[error("missing authorization code")]
    MissingCode,

    #[error(transparent)]
    Discord(#[from] DiscordError),
}

#[derive(Deserialize, Debug, Default)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

pub async fn login_handler(State(state): State<Arc<AppState>>) -> Redirect {
    let Some(credentials) = &state.config.oauth else {
        warn!("Login requested but OAuth is not configured");
        return Redirect::to(LOGIN_UNAVAILABLE);
    };

    match authorize_url(credentials, &state.sessions.issue_state()) {
        Ok(url) => Redirect::to(url.as_str()),
        Err(e) => {
            warn!("Failed to build authorize url: {e}");
            Redirect::to(LOGIN_UNAVAILABLE)
        }
    }
}

pub async fn callback_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    match complete_login(&state, params).await {
        Ok(sid) => (
            [(SET_COOKIE, session_cookie(&sid, state.config.production))],
            Redirect::to("/profile"),
        )
            .into_response(),
        Err(e) => {
            warn!("Discord login failed: {e}");
            Redirect::to(AUTH_FAILED).into_response()
        }
    }
}

async fn complete_login(state: &AppState, params: CallbackParams) -> Result<String, LoginError> {
    if let Some(error) = params.error {
        return Err(LoginError::Denied(error));
    }

    let oauth = state.oauth.as_deref().ok_or(LoginError::Unavailable)?;

    let csrf = params.state.ok_or(LoginError::InvalidState)?;
    if !state.sessions.take_state(&csrf) {
        return Err(LoginError::InvalidState);
    }

    let code = params.code.ok_or(LoginError::MissingCode)?;
    let token = oauth.exchange_code(&code).await?;
    let user = oauth.current_user(&token.access_token).await?;

    info!("{} logged in", user.username);

    Ok(state
        .sessions
        .create(SessionUser::from_discord(&user, token.access_token)))
}

pub async fn logout_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(sid) = session_id(&headers) {
        state.sessions.remove(&sid);
    }

    (
        [(SET_COOKIE, clear_cookie(state.config.production))],
        Redirect::to("/"),
    )
}

pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SessionUser>, AppError> {
    current_user(&state, &headers)
        .map(Json)
        .ok_or(AppError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn user() -> SessionUser {
        SessionUser::from_discord(
            &DiscordUser {
                id: "80351110224678912".to_string(),
                username: "nelly".to_string(),
                discriminator: Some("1337".to_string()),
                ..Default::default()
            },
            "secret-token".to_string(),
        )
    }

    #[test]
    fn test_session_id_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; sid=abc123; other=1"));
        assert_eq!(session_id(&headers).as_deref(), Some("abc123"));

        headers.insert(COOKIE, HeaderValue::from_static("sidecar=1; sid="));
        assert!(session_id(&headers).is_none());

        assert!(session_id(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = session_cookie("abc", false);
        assert!(cookie.starts_with("sid=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(!cookie.contains("Secure"));

        assert!(session_cookie("abc", true).ends_with("; Secure"));
        assert!(clear_cookie(false).contains("Max-Age=0"));
    }

    #[test]
    fn test_session_round_trip() {
        let store = SessionStore::new();
        let sid = store.create(user());

        let found = store.get(&sid).unwrap();
        assert_eq!(found.username, "nelly");
        assert_eq!(found.created_at, snowflake::decode("80351110224678912").unwrap());

        store.remove(&sid);
        assert!(store.get(&sid).is_none());
    }

    #[test]
    fn test_token_never_serialized() {
        let body = serde_json::to_value(user()).unwrap();
        assert!(body.get("access_token").is_none());
        assert_eq!(body["discriminator"], "1337");
    }

    #[test]
    fn test_state_is_single_use() {
        let store = SessionStore::new();
        let state = store.issue_state();

        assert!(store.take_state(&state));
        assert!(!store.take_state(&state));
        assert!(!store.take_state("forged"));
    }

    #[test]
    fn test_sweep_drops_expired_sessions() {
        let store = SessionStore::new();
        let expired = Utc::now() - Duration::days(SESSION_TTL_DAYS) - Duration::minutes(1);
        store.sessions.set_at("old", user(), expired);
        let sid = store.create(user());

        assert_eq!(store.sweep(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(&sid).is_some());
    }

    #[test]
    fn test_authorize_url() {
        let credentials = OAuthCredentials {
            client_id: "42".to_string(),
            client_secret: "shh".to_string(),
            callback_url: "http://localhost:3000/auth/discord/callback".to_string(),
        };

        let url = authorize_url(&credentials, "xyz").unwrap();
        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert!(url.as_str().starts_with(AUTHORIZE_URL));
        assert!(params.contains(&("scope".to_string(), SCOPES.to_string())));
        assert!(params.contains(&("state".to_string(), "xyz".to_string())));
        assert!(!url.as_str().contains("shh"));
    }
}
