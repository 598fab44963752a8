use serenity::all::{Context, GuildId};

use crate::config;

/// Leaves any guild that is not on the allow-list. One best-effort attempt;
/// a failed leave is logged and retried the next time the guild shows up in
/// an event.
pub async fn enforce_allow_list(cx: &Context, guild: GuildId, name: &str) -> bool {
    if config::config().is_guild_allowed(guild) {
        return true;
    }
    log::warn!("Leaving unauthorized guild: {} ({})", name, guild);
    if let Err(err) = guild.leave(&cx.http).await {
        log::warn!("Unable to leave guild {}: {err:?}", guild);
    }
    false
}
