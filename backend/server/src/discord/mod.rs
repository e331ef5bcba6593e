//! # Discord
//!
//! REST access to Discord, split by who is asking:
//!
//! - `session`: the bot login, its guild list and per-guild member lookups
//! - `http`: raw calls, plus the bearer-token calls made for a logged-in user
//! - `cdn`: turning hashes and flags into urls and badge names

pub mod cdn;
pub mod http;
pub mod models;
pub mod session;

pub use http::{DiscordError, DiscordHttp, OAuthApi};
pub use session::{RestSession, SessionClient};
