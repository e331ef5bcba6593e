//! # Mock Profiles
//!
//! Stand-in data for ids no live source could resolve. Every field is derived
//! from the id's digits, so the same id always yields the same profile and a
//! cache hit is indistinguishable from a fresh synthesis.
//!
//! `dN` below means the N-th digit of the id, counting from the left.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::{
    id::UserId,
    models::{Activity, ActivityAssets, ActivityTimestamps, Connection, ProfileRecord, Status},
    snowflake,
};

pub const AVATAR_COUNT: u32 = 5;

pub const BANNER_COLORS: [&str; 5] = ["#5865F2", "#57F287", "#FEE75C", "#EB459E", "#ED4245"];

pub const BADGES: [&str; 7] = [
    "Nitro",
    "Server Booster",
    "Early Supporter",
    "Verified",
    "Partner",
    "Staff",
    "Bug Hunter",
];

pub const CONNECTION_TYPES: [&str; 7] = [
    "twitch", "youtube", "twitter", "github", "spotify", "reddit", "steam",
];

const MAX_CONNECTIONS: u32 = 4;

/// `/api/connections/:id` allows one more than the profile card does.
const ENDPOINT_MAX_CONNECTIONS: u32 = 5;

pub const ABOUT_ME: [&str; 6] = [
    "Hello! I'm a Discord user who enjoys gaming and chatting with friends.",
    "Just a casual gamer looking for new friends to play with!",
    "Music lover, gamer, and tech enthusiast.",
    "I stream on Twitch occasionally. Come say hi!",
    "Developer by day, gamer by night.",
    "Nothing to see here yet.",
];

struct Game {
    name: &'static str,
    details: &'static str,
    state: &'static str,
}

const GAMES: [Game; 6] = [
    Game { name: "TimeKill", details: "Killing Time Somewhere", state: "Somewhere out there" },
    Game { name: "Fun", details: "Maybe Having Fun!", state: "Who knows where" },
    Game { name: "Thinking", details: "Might Be Thinking!", state: "Deep in thought" },
    Game { name: "Fortnite", details: "Battle Royale", state: "Squad mode with friends" },
    Game { name: "Watching", details: "Watching a stream", state: "Chilling" },
    Game { name: "Nothing", details: "Doing nothing at all", state: "Idle hands" },
];

pub const MOCK_APPLICATION_ID: &str = "123456789012345678";
const MOCK_ASSET: &str = "game_icon";

const FALLBACK_MAX_AGE_DAYS: i64 = 3 * 365;

/// Synthesize from a raw id. `None` when the id is not a valid snowflake.
pub fn synthesize(raw: &str) -> Option<ProfileRecord> {
    UserId::parse(raw).ok().map(|id| synthesize_id(&id))
}

pub fn synthesize_id(id: &UserId) -> ProfileRecord {
    let last4 = id.last4();
    let discriminator = last4.parse::<u32>().unwrap_or(0) % 9000 + 1000;

    ProfileRecord {
        id: id.to_string(),
        username: format!("Discord{last4}"),
        discriminator: discriminator.to_string(),
        avatar: embed_avatar(id.last_digit() % AVATAR_COUNT),
        banner: None,
        banner_color: Some(BANNER_COLORS[id.digit(0) as usize % BANNER_COLORS.len()].to_string()),
        created_at: created_at(id.as_str()),
        about_me: Some(ABOUT_ME[id.digits(0..2) as usize % ABOUT_ME.len()].to_string()),
        status: mock_status(id),
        badges: mock_badges(id),
        connections: mock_connections(id),
    }
}

pub fn embed_avatar(index: u32) -> String {
    format!("https://cdn.discordapp.com/embed/avatars/{index}.png")
}

pub fn mock_status(id: &UserId) -> Status {
    Status::ALL[id.digit(0) as usize % Status::ALL.len()]
}

/// Picks from `pool` using the two-digit window starting at each position,
/// keeping first occurrences only.
fn windowed_picks<'a>(id: &UserId, pool: &[&'a str], count: u32) -> Vec<&'a str> {
    let mut picks: Vec<&str> = Vec::new();

    for i in 0..count as usize {
        let pick = pool[id.digits(i..i + 2) as usize % pool.len()];
        if !picks.contains(&pick) {
            picks.push(pick);
        }
    }

    picks
}

pub fn mock_badges(id: &UserId) -> Vec<String> {
    let count = id.digit(0) % BADGES.len() as u32;

    windowed_picks(id, &BADGES, count)
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn mock_connections(id: &UserId) -> Vec<Connection> {
    connections_up_to(id, MAX_CONNECTIONS)
}

/// Fallback for the standalone connections endpoint.
pub fn mock_endpoint_connections(id: &UserId) -> Vec<Connection> {
    connections_up_to(id, ENDPOINT_MAX_CONNECTIONS)
}

fn connections_up_to(id: &UserId, max: u32) -> Vec<Connection> {
    let count = id.digit(0) % max;

    windowed_picks(id, &CONNECTION_TYPES, count)
        .into_iter()
        .enumerate()
        .map(|(i, kind)| Connection {
            kind: kind.to_string(),
            name: format!("{kind}_user{}", id.last4()),
            verified: id.digits(i..i + 2) % 2 == 0,
        })
        .collect()
}

/// Roughly two in three ids get an activity, started 5 to 184 minutes before `now`.
pub fn mock_activities(id: &UserId, now: DateTime<Utc>) -> Vec<Activity> {
    if id.digit(0) % 3 == 0 {
        return Vec::new();
    }

    let game = &GAMES[id.digit(1) as usize % GAMES.len()];
    let minutes_ago = (id.digits(2..4) % 180) + 5;

    vec![Activity {
        name: game.name.to_string(),
        details: Some(game.details.to_string()),
        state: Some(game.state.to_string()),
        application_id: Some(MOCK_APPLICATION_ID.to_string()),
        timestamps: Some(ActivityTimestamps {
            start: Some(now - Duration::minutes(minutes_ago as i64)),
        }),
        assets: Some(ActivityAssets {
            large_image: Some(MOCK_ASSET.to_string()),
        }),
    }]
}

fn created_at(raw: &str) -> DateTime<Utc> {
    snowflake::decode(raw).unwrap_or_else(|_| {
        let days = rand::thread_rng().gen_range(0..FALLBACK_MAX_AGE_DAYS);
        Utc::now() - Duration::days(days)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> UserId {
        UserId::parse(raw).unwrap()
    }

    #[test]
    fn test_deterministic() {
        for raw in [
            "123456789012345678",
            "80351110224678912",
            "999999999999999999",
            "1234567890123456789",
        ] {
            assert_eq!(synthesize(raw), synthesize(raw));
        }
    }

    #[test]
    fn test_invalid_ids_are_not_synthesized() {
        assert!(synthesize("abc").is_none());
        assert!(synthesize("").is_none());
    }

    #[test]
    fn test_concrete_profile() {
        let profile = synthesize("123456789012345678").unwrap();

        assert_eq!(profile.id, "123456789012345678");
        assert_eq!(profile.username, "Discord5678");
        // 5678 % 9000 + 1000
        assert_eq!(profile.discriminator, "6678");
        assert_eq!(profile.avatar, "https://cdn.discordapp.com/embed/avatars/3.png");
        assert_eq!(profile.banner_color.as_deref(), Some("#57F287"));
        assert_eq!(profile.status, Status::Idle);
        assert_eq!(profile.about_me.as_deref(), Some(ABOUT_ME[0]));
        // d0 = 1: one badge from window "12", one connection from window "12"
        assert_eq!(profile.badges, vec!["Staff"]);
        assert_eq!(
            profile.connections,
            vec![Connection {
                kind: "reddit".to_string(),
                name: "reddit_user5678".to_string(),
                verified: true,
            }]
        );
        assert!(profile.created_at < Utc::now());
    }

    #[test]
    fn test_duplicates_skipped() {
        // six windows of 66 all land on the same badge
        let badges = mock_badges(&id("666666666666666666"));
        assert_eq!(badges, vec![BADGES[3]]);

        let connections = mock_connections(&id("333333333333333333"));
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].kind, "reddit");
    }

    #[test]
    fn test_zero_leading_digit_is_sparse() {
        let profile = synthesize("012345678901234567").unwrap();
        assert!(profile.badges.is_empty());
        assert!(profile.connections.is_empty());
        assert_eq!(profile.status, Status::Online);
    }

    #[test]
    fn test_counts_bounded() {
        for raw in ["912345678901234567", "612345678901234567", "412345678901234567"] {
            let id = id(raw);
            assert!(mock_badges(&id).len() < BADGES.len());
            assert!(mock_connections(&id).len() < MAX_CONNECTIONS as usize);
            assert!(mock_endpoint_connections(&id).len() < ENDPOINT_MAX_CONNECTIONS as usize);
        }
    }

    #[test]
    fn test_endpoint_connections_allow_four() {
        let kinds = |raw: &str| -> Vec<String> {
            mock_endpoint_connections(&id(raw))
                .into_iter()
                .map(|c| c.kind)
                .collect()
        };

        // 4 % 4 leaves the profile card empty, 4 % 5 takes the windows 41 12 23 34
        assert!(mock_connections(&id("412345678901234567")).is_empty());
        assert_eq!(kinds("412345678901234567"), ["steam", "reddit", "twitter"]);

        assert_eq!(mock_connections(&id("912345678901234567")).len(), 1);
        assert_eq!(kinds("912345678901234567"), ["twitch", "reddit", "twitter", "steam"]);
    }

    #[test]
    fn test_activities() {
        let now = Utc::now();

        assert!(mock_activities(&id("312345678901234567"), now).is_empty());

        let activities = mock_activities(&id("123456789012345678"), now);
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].name, "Thinking");
        // (34 % 180) + 5 minutes
        let start = activities[0].timestamps.as_ref().unwrap().start.unwrap();
        assert_eq!(now - start, Duration::minutes(39));
    }

    #[test]
    fn test_status_follows_declaration_order() {
        assert_eq!(mock_status(&id("012345678901234567")), Status::Online);
        assert_eq!(mock_status(&id("112345678901234567")), Status::Idle);
        assert_eq!(mock_status(&id("212345678901234567")), Status::Dnd);
        assert_eq!(mock_status(&id("312345678901234567")), Status::Offline);
        assert_eq!(mock_status(&id("412345678901234567")), Status::Online);
    }
}
