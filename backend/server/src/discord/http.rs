use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use super::models::{DiscordConnection, DiscordUser, TokenResponse};
use crate::config::OAuthCredentials;

pub const API_BASE: &str = "https://discord.com/api/v10";

#[derive(Error, Debug)]
pub enum DiscordError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{path} answered {status}")]
    Status { status: StatusCode, path: String },

    #[error("session is not connected")]
    NotReady,

    #[error("no {0} in response")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub enum Auth<'a> {
    Bot(&'a str),
    Bearer(&'a str),
}

impl Auth<'_> {
    fn header(&self) -> String {
        match self {
            Auth::Bot(token) => format!("Bot {token}"),
            Auth::Bearer(token) => format!("Bearer {token}"),
        }
    }
}

/// Thin REST client. Every call is bounded by the client timeout.
#[derive(Clone)]
pub struct DiscordHttp {
    client: Client,
    base: String,
    credentials: Option<OAuthCredentials>,
}

impl DiscordHttp {
    pub fn new(timeout: Duration, credentials: Option<OAuthCredentials>) -> Result<Self, DiscordError> {
        Self::with_base(API_BASE, timeout, credentials)
    }

    pub fn with_base(
        base: &str,
        timeout: Duration,
        credentials: Option<OAuthCredentials>,
    ) -> Result<Self, DiscordError> {
        let client = Client::builder().use_rustls_tls().timeout(timeout).build()?;

        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, auth: Auth<'_>) -> Result<T, DiscordError> {
        let request = self
            .client
            .get(format!("{}{path}", self.base))
            .header(reqwest::header::AUTHORIZATION, auth.header());

        self.send(path, request).await
    }

    async fn send<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T, DiscordError> {
        let response = request.send().await?;
        let status = response.status();

        debug!("Discord {path} -> {status}");

        if !status.is_success() {
            return Err(DiscordError::Status {
                status,
                path: path.to_string(),
            });
        }

        Ok(response.json::<T>().await?)
    }
}

/// Calls made on behalf of a logged-in user.
#[async_trait]
pub trait OAuthApi: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, DiscordError>;

    async fn current_user(&self, token: &str) -> Result<DiscordUser, DiscordError>;

    async fn fetch_user(&self, token: &str, user_id: &str) -> Result<DiscordUser, DiscordError>;

    async fn connections(&self, token: &str) -> Result<Vec<DiscordConnection>, DiscordError>;
}

#[async_trait]
impl OAuthApi for DiscordHttp {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, DiscordError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(DiscordError::Missing("oauth credentials"))?;

        let path = "/oauth2/token";
        let request = self.client.post(format!("{}{path}", self.base)).form(&[
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", credentials.callback_url.as_str()),
        ]);

        self.send(path, request).await
    }

    async fn current_user(&self, token: &str) -> Result<DiscordUser, DiscordError> {
        self.get("/users/@me", Auth::Bearer(token)).await
    }

    async fn fetch_user(&self, token: &str, user_id: &str) -> Result<DiscordUser, DiscordError> {
        self.get(&format!("/users/{user_id}"), Auth::Bearer(token)).await
    }

    async fn connections(&self, token: &str) -> Result<Vec<DiscordConnection>, DiscordError> {
        self.get("/users/@me/connections", Auth::Bearer(token)).await
    }
}
