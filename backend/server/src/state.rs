use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{RwLock, mpsc::Sender};
use tracing::info;

use super::{
    auth::SessionStore,
    cache::VolatileCache,
    config::Config,
    discord::{DiscordHttp, OAuthApi, RestSession, SessionClient},
    pipeline::Pipeline,
    presence::{PresenceEvent, presence_channel, spawn_presence_ingest},
    resolver::{DiscordResolver, LiveResolver, NoopResolver},
};

pub struct AppState {
    pub config: Config,
    pub cache: Arc<VolatileCache>,
    pub sessions: Arc<SessionStore>,
    pub pipeline: Pipeline,
    pub oauth: Option<Arc<dyn OAuthApi>>,
    pub presence_tx: Sender<PresenceEvent>,
    pub last_webhook: RwLock<Option<Value>>,
}

impl AppState {
    /// Wires the Discord clients the config allows for. Must run inside a tokio runtime.
    pub fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let http = DiscordHttp::new(config.upstream_timeout, config.oauth.clone())?;

        let session = config.bot_token.clone().map(|token| {
            info!("Bot token found, live lookups enabled");
            Arc::new(RestSession::new(http.clone(), token)) as Arc<dyn SessionClient>
        });
        let oauth = config
            .oauth
            .is_some()
            .then(|| Arc::new(http) as Arc<dyn OAuthApi>);

        let resolver: Arc<dyn LiveResolver> = if session.is_none() && oauth.is_none() {
            Arc::new(NoopResolver)
        } else {
            Arc::new(DiscordResolver::new(session, oauth.clone()))
        };

        Ok(Self::with_resolver(config, resolver, oauth))
    }

    /// Same as [`AppState::new`] with the Discord side supplied by the caller.
    pub fn with_resolver(
        config: Config,
        resolver: Arc<dyn LiveResolver>,
        oauth: Option<Arc<dyn OAuthApi>>,
    ) -> Arc<Self> {
        let cache = Arc::new(VolatileCache::new());

        let (presence_tx, presence_rx) = presence_channel();
        spawn_presence_ingest(cache.clone(), presence_rx);

        let pipeline = Pipeline::new(
            cache.clone(),
            resolver,
            config.lazy_connect,
            config.resolve_timeout,
        );

        Arc::new(Self {
            config,
            cache,
            sessions: Arc::new(SessionStore::new()),
            pipeline,
            oauth,
            presence_tx,
            last_webhook: RwLock::new(None),
        })
    }
}
