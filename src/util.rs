use std::collections::HashMap;

use serenity::all::{
    ChannelId, ChannelType, GuildChannel, Http, Member, PermissionOverwrite,
    PermissionOverwriteType, Permissions,
};

use crate::Error;

pub fn temp_channel_name(member: &Member) -> String {
    let name = member
        .nick
        .clone()
        .unwrap_or(member.user.display_name().to_string());
    format!("{}'s VC", name)
}

/// Merges new allow/deny bits into an existing overwrite pair. A bit newly
/// allowed is cleared from the deny mask and vice versa, so the two masks
/// stay disjoint (same net effect as discord.js `permissionOverwrites.edit`).
pub fn merge_overwrite(
    allow: Permissions,
    deny: Permissions,
    allow_add: Permissions,
    deny_add: Permissions,
) -> (Permissions, Permissions) {
    ((allow | allow_add) & !deny_add, (deny | deny_add) & !allow_add)
}

/// Reads the subject's current overwrite on the channel, merges the new bits
/// in and writes the result back.
pub async fn edit_overwrite(
    http: &Http,
    channel: &GuildChannel,
    kind: PermissionOverwriteType,
    allow_add: Permissions,
    deny_add: Permissions,
) -> Result<(), Error> {
    let (allow, deny) = channel
        .permission_overwrites
        .iter()
        .find(|x| x.kind == kind)
        .map(|x| (x.allow, x.deny))
        .unwrap_or((Permissions::empty(), Permissions::empty()));
    let (allow, deny) = merge_overwrite(allow, deny, allow_add, deny_add);
    channel
        .create_permission(http, PermissionOverwrite { allow, deny, kind })
        .await?;
    Ok(())
}

/// Whether the channel's @everyone overwrite currently denies connecting.
pub fn is_locked(channel: &GuildChannel) -> bool {
    channel.permission_overwrites.iter().any(|x| {
        matches!(x.kind, PermissionOverwriteType::Role(role) if role.get() == channel.guild_id.get())
            && x.deny.contains(Permissions::CONNECT)
    })
}

/// Categories match on the exact name, ignoring case. `vmsetup` relies on
/// this to reuse an existing category instead of creating a duplicate.
pub fn category_name_matches(channel_name: &str, wanted: &str) -> bool {
    channel_name.eq_ignore_ascii_case(wanted)
}

/// Triggers match loosely: the wanted name only has to appear somewhere in
/// the channel name, case-insensitively.
pub fn trigger_name_matches(channel_name: &str, wanted: &str) -> bool {
    channel_name.to_lowercase().contains(&wanted.to_lowercase())
}

pub fn find_category(
    channels: &HashMap<ChannelId, GuildChannel>,
    name: &str,
) -> Option<ChannelId> {
    channels
        .values()
        .find(|x| x.kind == ChannelType::Category && category_name_matches(&x.name, name))
        .map(|x| x.id)
}

pub fn find_trigger(channels: &HashMap<ChannelId, GuildChannel>, name: &str) -> Option<ChannelId> {
    channels
        .values()
        .find(|x| x.kind == ChannelType::Voice && trigger_name_matches(&x.name, name))
        .map(|x| x.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_starts_from_empty_masks() {
        let (allow, deny) = merge_overwrite(
            Permissions::empty(),
            Permissions::empty(),
            Permissions::CONNECT,
            Permissions::empty(),
        );
        assert_eq!(allow, Permissions::CONNECT);
        assert_eq!(deny, Permissions::empty());
    }

    #[test]
    fn merge_keeps_unrelated_bits() {
        // hide on top of an existing lock keeps CONNECT denied.
        let (allow, deny) = merge_overwrite(
            Permissions::empty(),
            Permissions::CONNECT,
            Permissions::empty(),
            Permissions::VIEW_CHANNEL,
        );
        assert_eq!(allow, Permissions::empty());
        assert_eq!(deny, Permissions::CONNECT | Permissions::VIEW_CHANNEL);
    }

    #[test]
    fn category_match_is_exact_but_case_insensitive() {
        assert!(category_name_matches("Public VCs", "Public VCs"));
        assert!(category_name_matches("public vcs", "Public VCs"));
        // a second setup run must treat these as the same category.
        assert!(category_name_matches("PUBLIC VCS", "Public VCs"));
        assert!(!category_name_matches("Public VCs 2", "Public VCs"));
        assert!(!category_name_matches("Private VCs", "Public VCs"));
    }

    #[test]
    fn trigger_match_allows_substrings() {
        assert!(trigger_name_matches("Join to Create", "Join to Create"));
        assert!(trigger_name_matches("🔊 join to create!", "Join to Create"));
        assert!(trigger_name_matches("JOIN A RANDOM VC", "Join a Random VC"));
        assert!(!trigger_name_matches("Alice's VC", "Join to Create"));
        assert!(!trigger_name_matches("Join", "Join to Create"));
    }

    #[test]
    fn merge_never_leaves_a_bit_on_both_sides() {
        // unlock flips a previously denied bit back to allow.
        let (allow, deny) = merge_overwrite(
            Permissions::empty(),
            Permissions::CONNECT | Permissions::VIEW_CHANNEL,
            Permissions::CONNECT | Permissions::VIEW_CHANNEL,
            Permissions::empty(),
        );
        assert_eq!(allow, Permissions::CONNECT | Permissions::VIEW_CHANNEL);
        assert_eq!(deny, Permissions::empty());
        assert!((allow & deny).is_empty());
    }
}
