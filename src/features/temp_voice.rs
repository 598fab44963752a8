use std::collections::HashMap;

use rand::seq::SliceRandom;
use serenity::all::{
    ChannelId, ChannelType, Context, CreateChannel, EditChannel, GuildId, Member,
    PermissionOverwrite, PermissionOverwriteType, Permissions, RoleId, VoiceState,
};

use crate::{
    config,
    data::RegistryKey,
    registry::{GuildLayout, VoiceRegistry},
    util,
};

/// Permissions the creator of a temporary channel gets on it.
pub const OWNER_PERMISSIONS: Permissions = Permissions::CONNECT
    .union(Permissions::VIEW_CHANNEL)
    .union(Permissions::MANAGE_CHANNELS)
    .union(Permissions::MUTE_MEMBERS)
    .union(Permissions::MOVE_MEMBERS);

/// Snapshot of one voice channel, taken before any mutation is issued.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ChannelView {
    pub id: ChannelId,
    pub parent: Option<ChannelId>,
    pub members: usize,
    /// 0 means unlimited.
    pub user_limit: u32,
    pub locked: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    /// Create a fresh channel for the member and move them into it.
    CreateTemp,
    /// Move the member into one of the candidates, picked uniformly.
    Redirect(Vec<ChannelId>),
    Delete(ChannelId),
    /// Move the channel under the private category.
    Reparent(ChannelId),
}

/// The lifecycle decision logic, pure over a snapshot. Rules, in order:
/// create on the "join to create" trigger, redirect on the "join a random
/// vc" trigger, sweep empty managed channels, and reparent a locked channel
/// its owner just left.
pub(crate) fn plan(
    layout: &GuildLayout,
    channels: &[ChannelView],
    tracked: &[ChannelId],
    old_channel: Option<ChannelId>,
    new_channel: Option<ChannelId>,
    member_owns_old: bool,
) -> Vec<Action> {
    let mut actions = vec![];

    if new_channel.is_some() && new_channel == layout.create_trigger {
        actions.push(Action::CreateTemp);
    }

    if new_channel.is_some() && new_channel == layout.random_trigger {
        let candidates = channels
            .iter()
            .filter(|x| {
                x.parent == layout.public_category
                    && layout.public_category.is_some()
                    && !layout.is_trigger(x.id)
                    && (x.user_limit == 0 || x.members < x.user_limit as usize)
            })
            .map(|x| x.id)
            .collect::<Vec<_>>();
        if !candidates.is_empty() {
            actions.push(Action::Redirect(candidates));
        }
    }

    for channel in channels {
        if channel.members == 0
            && !layout.is_trigger(channel.id)
            && (tracked.contains(&channel.id) || layout.is_managed_category(channel.parent))
        {
            actions.push(Action::Delete(channel.id));
        }
    }

    if let Some(old) = old_channel {
        if old_channel != new_channel && member_owns_old {
            if let Some(view) = channels.iter().find(|x| x.id == old) {
                if view.locked
                    && view.members > 0
                    && layout.private_category.is_some()
                    && view.parent != layout.private_category
                {
                    actions.push(Action::Reparent(old));
                }
            }
        }
    }

    actions
}

/// Looks the layout up in the registry, falling back to a name scan over the
/// guild's channel list. A successful scan is cached until `vmreset`.
pub async fn resolve_layout(
    cx: &Context,
    guild: GuildId,
    registry: &VoiceRegistry,
) -> Option<GuildLayout> {
    if let Some(layout) = registry.layout(guild) {
        return Some(layout);
    }
    let channels = guild.channels(&cx.http).await.ok()?;
    let config = config::config();
    let layout = GuildLayout {
        public_category: util::find_category(&channels, &config.public_category),
        private_category: util::find_category(&channels, &config.private_category),
        create_trigger: util::find_trigger(&channels, &config.create_channel),
        random_trigger: util::find_trigger(&channels, &config.random_channel),
    };
    if !layout.is_usable() {
        return None;
    }
    registry.set_layout(guild, layout);
    Some(layout)
}

pub async fn registry_from(cx: &Context) -> VoiceRegistry {
    cx.data
        .read()
        .await
        .get::<RegistryKey>()
        .expect("Registry is always inserted at startup.")
        .clone()
}

pub async fn handle_voice_state_update(cx: Context, old: Option<VoiceState>, new: VoiceState) {
    let Some(guild_id) = new.guild_id.or(old.as_ref().and_then(|x| x.guild_id)) else {
        return;
    };
    if !config::config().is_guild_allowed(guild_id) {
        return;
    }

    let registry = registry_from(&cx).await;
    let Some(layout) = resolve_layout(&cx, guild_id, &registry).await else {
        return;
    };

    let Ok(channels) = guild_id.channels(&cx.http).await else {
        return;
    };

    // Occupancy comes from the gateway cache; the guard must not live across
    // an await, so counts are copied out first.
    let counts: HashMap<ChannelId, usize> = match cx.cache.guild(guild_id) {
        Some(guild) => {
            let mut counts = HashMap::new();
            for state in guild.voice_states.values() {
                if let Some(channel) = state.channel_id {
                    *counts.entry(channel).or_insert(0) += 1;
                }
            }
            counts
        }
        None => return,
    };

    let views = channels
        .values()
        .filter(|x| x.kind == ChannelType::Voice)
        .map(|x| ChannelView {
            id: x.id,
            parent: x.parent_id,
            members: counts.get(&x.id).copied().unwrap_or(0),
            user_limit: x.user_limit.unwrap_or(0),
            locked: util::is_locked(x),
        })
        .collect::<Vec<_>>();

    let old_channel = old.as_ref().and_then(|x| x.channel_id);
    let member_owns_old = old_channel
        .is_some_and(|channel| registry.owner_of(guild_id, channel) == Some(new.user_id));

    let actions = plan(
        &layout,
        &views,
        &registry.tracked_channels(guild_id),
        old_channel,
        new.channel_id,
        member_owns_old,
    );

    for action in actions {
        match action {
            Action::CreateTemp => {
                let Some(member) = new.member.as_ref() else {
                    continue;
                };
                create_temp_channel(&cx, guild_id, &layout, &registry, member).await;
            }
            Action::Redirect(candidates) => {
                let Some(member) = new.member.as_ref() else {
                    continue;
                };
                let target = candidates
                    .choose(&mut rand::thread_rng())
                    .copied()
                    .expect("Redirect is only planned with candidates.");
                if let Err(err) = member.move_to_voice_channel(&cx, target).await {
                    log::warn!("Unable to redirect member to {}: {err:?}", target);
                }
            }
            Action::Delete(channel) => match channel.delete(&cx.http).await {
                Ok(_) => registry.untrack(guild_id, channel),
                Err(err) => {
                    // stays tracked, the next sweep pass picks it up again.
                    log::debug!("Unable to delete empty channel {}: {err:?}", channel);
                }
            },
            Action::Reparent(channel) => {
                if let Err(err) = channel
                    .edit(
                        &cx.http,
                        EditChannel::new().category(layout.private_category),
                    )
                    .await
                {
                    log::debug!("Unable to move locked channel {}: {err:?}", channel);
                }
            }
        }
    }
}

async fn create_temp_channel(
    cx: &Context,
    guild_id: GuildId,
    layout: &GuildLayout,
    registry: &VoiceRegistry,
    member: &Member,
) {
    let overwrites = vec![
        PermissionOverwrite {
            allow: OWNER_PERMISSIONS,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Member(member.user.id),
        },
        PermissionOverwrite {
            allow: Permissions::CONNECT | Permissions::VIEW_CHANNEL,
            deny: Permissions::empty(),
            // the @everyone role shares the guild's id.
            kind: PermissionOverwriteType::Role(RoleId::new(guild_id.get())),
        },
    ];
    let mut create_channel = CreateChannel::new(util::temp_channel_name(member))
        .kind(ChannelType::Voice)
        .permissions(overwrites);
    if let Some(category) = layout.public_category {
        create_channel = create_channel.category(category);
    }
    match guild_id.create_channel(&cx.http, create_channel).await {
        Ok(channel) => {
            registry.track(guild_id, channel.id, member.user.id);
            log::info!(
                "Created temporary channel \"{}\" ({}) for @{}",
                channel.name,
                channel.id,
                member.user.name
            );
            if member.move_to_voice_channel(cx, channel.id).await.is_err() {
                // member left voice while the channel was being created,
                // take the empty channel right back down.
                registry.untrack(guild_id, channel.id);
                if let Err(err) = channel.delete(&cx.http).await {
                    log::debug!("Unable to delete abandoned channel: {err:?}");
                }
            }
        }
        Err(err) => {
            log::warn!("Unable to create temporary channel: {err:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> GuildLayout {
        GuildLayout {
            public_category: Some(ChannelId::new(1)),
            private_category: Some(ChannelId::new(2)),
            create_trigger: Some(ChannelId::new(10)),
            random_trigger: Some(ChannelId::new(11)),
        }
    }

    fn view(id: u64, parent: Option<u64>, members: usize, user_limit: u32) -> ChannelView {
        ChannelView {
            id: ChannelId::new(id),
            parent: parent.map(ChannelId::new),
            members,
            user_limit,
            locked: false,
        }
    }

    #[test]
    fn joining_create_trigger_plans_one_creation() {
        let layout = layout();
        let channels = [view(10, Some(1), 1, 0), view(11, Some(1), 0, 0)];
        let actions = plan(
            &layout,
            &channels,
            &[],
            None,
            Some(ChannelId::new(10)),
            false,
        );
        assert_eq!(actions, vec![Action::CreateTemp]);
    }

    #[test]
    fn triggers_are_never_swept() {
        let layout = layout();
        // both triggers sit empty under the public category.
        let channels = [view(10, Some(1), 0, 0), view(11, Some(1), 0, 0)];
        let actions = plan(&layout, &channels, &[], None, None, false);
        assert!(actions.is_empty());
    }

    #[test]
    fn random_join_excludes_full_private_and_trigger_channels() {
        let layout = layout();
        let channels = [
            view(10, Some(1), 0, 0),  // create trigger
            view(11, Some(1), 1, 0),  // random trigger, occupied by the joiner
            view(20, Some(1), 2, 2),  // full
            view(21, Some(1), 1, 2),  // eligible
            view(22, Some(1), 5, 0),  // eligible, unlimited
            view(23, Some(2), 1, 0),  // private category
            view(24, None, 1, 0),     // uncategorized
        ];
        let actions = plan(
            &layout,
            &channels,
            &[],
            None,
            Some(ChannelId::new(11)),
            false,
        );
        assert_eq!(
            actions,
            vec![Action::Redirect(vec![
                ChannelId::new(21),
                ChannelId::new(22)
            ])]
        );
    }

    #[test]
    fn random_join_with_no_candidates_is_a_no_op() {
        let layout = layout();
        let channels = [
            view(11, Some(1), 1, 0),
            view(20, Some(1), 2, 2), // full
        ];
        let actions = plan(
            &layout,
            &channels,
            &[],
            None,
            Some(ChannelId::new(11)),
            false,
        );
        assert!(actions.is_empty());
    }

    #[test]
    fn sweep_deletes_exactly_the_empty_managed_channels() {
        let layout = layout();
        let tracked = [ChannelId::new(30)];
        let channels = [
            view(20, Some(1), 0, 0), // empty, public category
            view(21, Some(1), 3, 0), // occupied
            view(30, None, 0, 0),    // empty, tracked but orphaned from the category
            view(31, None, 0, 0),    // empty but neither tracked nor categorized
        ];
        let actions = plan(&layout, &channels, &tracked, Some(ChannelId::new(21)), None, false);
        assert_eq!(
            actions,
            vec![
                Action::Delete(ChannelId::new(20)),
                Action::Delete(ChannelId::new(30))
            ]
        );
    }

    #[test]
    fn owner_leaving_locked_channel_reparents_it() {
        let layout = layout();
        let mut locked = view(20, Some(1), 2, 0);
        locked.locked = true;
        let actions = plan(
            &layout,
            &[locked],
            &[ChannelId::new(20)],
            Some(ChannelId::new(20)),
            None,
            true,
        );
        assert_eq!(actions, vec![Action::Reparent(ChannelId::new(20))]);
    }

    #[test]
    fn non_owner_leaving_locked_channel_does_not_reparent() {
        let layout = layout();
        let mut locked = view(20, Some(1), 2, 0);
        locked.locked = true;
        let actions = plan(
            &layout,
            &[locked],
            &[ChannelId::new(20)],
            Some(ChannelId::new(20)),
            None,
            false,
        );
        assert!(actions.is_empty());
    }

    #[test]
    fn already_private_locked_channel_stays_put() {
        let layout = layout();
        let mut locked = view(20, Some(2), 2, 0);
        locked.locked = true;
        let actions = plan(
            &layout,
            &[locked],
            &[ChannelId::new(20)],
            Some(ChannelId::new(20)),
            None,
            true,
        );
        assert!(actions.is_empty());
    }
}
