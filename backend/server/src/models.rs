//! # Records
//!
//! Canonical shapes served by the JSON endpoints. Live and mock resolution
//! both produce exactly these types, so handlers never branch on where a
//! record came from.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Online,
    Idle,
    Dnd,
    #[default]
    Offline,
}

impl Status {
    /// Declaration order; mock indexing relies on it.
    pub const ALL: [Status; 4] = [Status::Online, Status::Idle, Status::Dnd, Status::Offline];

    /// Anything Discord reports that is not one of the four (e.g. `invisible`) is offline.
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "online" => Status::Online,
            "idle" => Status::Idle,
            "dnd" => Status::Dnd,
            _ => Status::Offline,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Online => "online",
            Status::Idle => "idle",
            Status::Dnd => "dnd",
            Status::Offline => "offline",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivityTimestamps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivityAssets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_image: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<ActivityTimestamps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<ActivityAssets>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub id: String,
    pub username: String,
    pub discriminator: String,
    pub avatar: String,
    pub banner: Option<String>,
    pub banner_color: Option<String>,
    #[serde(serialize_with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    pub about_me: Option<String>,
    pub status: Status,
    pub badges: Vec<String>,
    pub connections: Vec<Connection>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct PresenceRecord {
    pub status: Status,
    pub activities: Vec<Activity>,
}

/// Reduced profile served by `/api/user/:id`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub discriminator: String,
    #[serde(rename = "avatarURL")]
    pub avatar_url: String,
    #[serde(rename = "bannerURL")]
    pub banner_url: Option<String>,
    pub status: Status,
    pub about_me: Option<String>,
    #[serde(serialize_with = "iso_millis")]
    pub created_at: DateTime<Utc>,
}

impl From<ProfileRecord> for UserSummary {
    fn from(profile: ProfileRecord) -> Self {
        Self {
            id: profile.id,
            username: profile.username,
            discriminator: profile.discriminator,
            avatar_url: profile.avatar,
            banner_url: profile.banner,
            status: profile.status,
            about_me: profile.about_me,
            created_at: profile.created_at,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct StatusBody {
    pub status: Status,
}

#[derive(Serialize, Debug)]
pub struct ActivitiesBody {
    pub activities: Vec<Activity>,
}

#[derive(Serialize, Debug)]
pub struct ConnectionsBody {
    pub connections: Vec<Connection>,
}

pub fn iso_millis<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_status_is_offline() {
        assert_eq!(Status::from_wire("invisible"), Status::Offline);
        assert_eq!(Status::from_wire(""), Status::Offline);
        assert_eq!(Status::from_wire("dnd"), Status::Dnd);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let body = serde_json::to_value(StatusBody { status: Status::Idle }).unwrap();
        assert_eq!(body["status"], "idle");
    }

    #[test]
    fn test_summary_renames_urls() {
        let profile = ProfileRecord {
            id: "123456789012345678".to_string(),
            username: "someone".to_string(),
            discriminator: "0".to_string(),
            avatar: "https://cdn.discordapp.com/embed/avatars/0.png".to_string(),
            banner: None,
            banner_color: None,
            created_at: DateTime::from_timestamp_millis(1_420_070_400_000).unwrap(),
            about_me: None,
            status: Status::Offline,
            badges: vec![],
            connections: vec![],
        };

        let body = serde_json::to_value(UserSummary::from(profile)).unwrap();
        assert_eq!(body["avatarURL"], "https://cdn.discordapp.com/embed/avatars/0.png");
        assert!(body["bannerURL"].is_null());
        assert_eq!(body["created_at"], "2015-01-01T00:00:00.000Z");
    }
}
