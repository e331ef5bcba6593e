use chrono::DateTime;
use serde::Deserialize;

use crate::models::{Activity, ActivityAssets, ActivityTimestamps, Connection};

#[derive(Deserialize, Debug, Clone, Default)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub accent_color: Option<u32>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub public_flags: Option<u64>,
    #[serde(default)]
    pub premium_type: Option<u8>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PartialGuild {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct GuildMember {
    #[serde(default)]
    pub user: Option<DiscordUser>,
    #[serde(default)]
    pub nick: Option<String>,
    /// Only filled by sessions where `sees_presences` holds; REST member objects never carry it.
    #[serde(default)]
    pub presence: Option<MemberPresence>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct MemberPresence {
    pub status: String,
    #[serde(default)]
    pub activities: Vec<WireActivity>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct WireTimestamps {
    /// Unix milliseconds.
    #[serde(default)]
    pub start: Option<i64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct WireAssets {
    #[serde(default)]
    pub large_image: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct WireActivity {
    pub name: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, alias = "applicationId")]
    pub application_id: Option<String>,
    #[serde(default)]
    pub timestamps: Option<WireTimestamps>,
    #[serde(default)]
    pub assets: Option<WireAssets>,
}

impl From<WireActivity> for Activity {
    fn from(wire: WireActivity) -> Self {
        Self {
            name: wire.name,
            details: wire.details,
            state: wire.state,
            application_id: wire.application_id,
            timestamps: wire.timestamps.map(|t| ActivityTimestamps {
                start: t.start.and_then(DateTime::from_timestamp_millis),
            }),
            assets: wire.assets.map(|a| ActivityAssets {
                large_image: a.large_image,
            }),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct DiscordConnection {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub verified: bool,
    /// 0 is hidden from everyone but the owner, 1 is shown on the profile.
    #[serde(default)]
    pub visibility: u8,
}

impl DiscordConnection {
    pub fn is_public(&self) -> bool {
        self.visibility == 1
    }
}

impl From<DiscordConnection> for Connection {
    fn from(wire: DiscordConnection) -> Self {
        Self {
            kind: wire.kind,
            name: wire.name,
            verified: wire.verified,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}
