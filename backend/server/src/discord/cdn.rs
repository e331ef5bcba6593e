//! Discord CDN urls and the bits of user data that only make sense rendered.

use crate::mock::embed_avatar;

use super::models::DiscordUser;

const CDN: &str = "https://cdn.discordapp.com";

const FLAG_BADGES: [(u64, &str); 12] = [
    (1 << 0, "Staff"),
    (1 << 1, "Partner"),
    (1 << 2, "HypeSquad Events"),
    (1 << 3, "Bug Hunter"),
    (1 << 6, "HypeSquad Bravery"),
    (1 << 7, "HypeSquad Brilliance"),
    (1 << 8, "HypeSquad Balance"),
    (1 << 9, "Early Supporter"),
    (1 << 14, "Bug Hunter Gold"),
    (1 << 17, "Verified Bot Developer"),
    (1 << 18, "Moderator Programs Alumni"),
    (1 << 22, "Active Developer"),
];

fn extension(hash: &str) -> &'static str {
    if hash.starts_with("a_") { "gif" } else { "png" }
}

/// Custom avatar if the user has one, otherwise the default Discord assigns.
pub fn avatar_url(user: &DiscordUser) -> String {
    if let Some(hash) = &user.avatar {
        return format!("{CDN}/avatars/{}/{hash}.{}?size=256", user.id, extension(hash));
    }

    // pomelo usernames pick the default from the id, legacy tags from the discriminator
    let index = match user.discriminator.as_deref().map(str::parse::<u64>) {
        Some(Ok(discriminator)) if discriminator != 0 => discriminator % 5,
        _ => user.id.parse::<u64>().map(|id| (id >> 22) % 6).unwrap_or(0),
    };

    embed_avatar(index as u32)
}

pub fn banner_url(user_id: &str, hash: &str) -> String {
    format!("{CDN}/banners/{user_id}/{hash}.{}?size=1024", extension(hash))
}

pub fn accent_hex(color: u32) -> String {
    format!("#{color:06x}")
}

/// Badge names in display order. Nitro is only visible to bearer tokens.
pub fn badges(user: &DiscordUser) -> Vec<String> {
    let mut badges = Vec::new();

    if user.premium_type.is_some_and(|tier| tier > 0) {
        badges.push("Nitro".to_string());
    }

    let flags = user.public_flags.unwrap_or(0);
    badges.extend(
        FLAG_BADGES
            .iter()
            .filter(|(bit, _)| flags & bit != 0)
            .map(|(_, name)| name.to_string()),
    );

    badges
}
