use std::{collections::HashMap, sync::Arc};

use dashmap::DashMap;
use serenity::all::{ChannelId, GuildId, UserId};

/// Resolved identifiers for a guild's Voice Master channels. Resolved once
/// (at ready, lazily, or by `vmsetup`) instead of re-scanning channel names
/// in every handler; name collisions can't bite after that.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GuildLayout {
    pub public_category: Option<ChannelId>,
    pub private_category: Option<ChannelId>,
    pub create_trigger: Option<ChannelId>,
    pub random_trigger: Option<ChannelId>,
}

impl GuildLayout {
    pub fn is_trigger(&self, channel: ChannelId) -> bool {
        self.create_trigger == Some(channel) || self.random_trigger == Some(channel)
    }

    pub fn is_managed_category(&self, parent: Option<ChannelId>) -> bool {
        parent.is_some() && (parent == self.public_category || parent == self.private_category)
    }

    /// The lifecycle rules need at least the triggers to do anything useful.
    pub fn is_usable(&self) -> bool {
        self.create_trigger.is_some() || self.random_trigger.is_some()
    }
}

#[derive(Debug, Default)]
struct GuildVoice {
    layout: GuildLayout,
    owners: HashMap<ChannelId, UserId>,
}

/// Per-guild tracking of bot-created voice channels and their owners.
///
/// Ownership is recorded when a channel is created and reassigned only by
/// `vc transfer`; it is never derived from who currently sits in the channel.
/// Everything here is process-lifetime only. Callers must not hold the inner
/// map guards across an await point.
#[derive(Clone, Debug)]
pub struct VoiceRegistry {
    guilds: Arc<DashMap<GuildId, GuildVoice>>,
}

impl VoiceRegistry {
    pub fn new() -> VoiceRegistry {
        VoiceRegistry {
            guilds: Arc::new(DashMap::new()),
        }
    }

    pub fn layout(&self, guild: GuildId) -> Option<GuildLayout> {
        self.guilds
            .get(&guild)
            .map(|entry| entry.layout)
            .filter(|layout| layout.is_usable())
    }

    pub fn set_layout(&self, guild: GuildId, layout: GuildLayout) {
        self.guilds.entry(guild).or_default().layout = layout;
    }

    /// Drops the resolved layout so the next lookup re-scans by name.
    pub fn invalidate_layout(&self, guild: GuildId) {
        if let Some(mut entry) = self.guilds.get_mut(&guild) {
            entry.layout = GuildLayout::default();
        }
    }

    pub fn track(&self, guild: GuildId, channel: ChannelId, owner: UserId) {
        self.guilds
            .entry(guild)
            .or_default()
            .owners
            .insert(channel, owner);
    }

    pub fn untrack(&self, guild: GuildId, channel: ChannelId) {
        if let Some(mut entry) = self.guilds.get_mut(&guild) {
            entry.owners.remove(&channel);
        }
    }

    pub fn owner_of(&self, guild: GuildId, channel: ChannelId) -> Option<UserId> {
        self.guilds
            .get(&guild)
            .and_then(|entry| entry.owners.get(&channel).copied())
    }

    /// Reassigns ownership. Returns false when the channel is not tracked,
    /// in which case nothing changes.
    pub fn transfer(&self, guild: GuildId, channel: ChannelId, new_owner: UserId) -> bool {
        let Some(mut entry) = self.guilds.get_mut(&guild) else {
            return false;
        };
        match entry.owners.get_mut(&channel) {
            Some(owner) => {
                *owner = new_owner;
                true
            }
            None => false,
        }
    }

    pub fn tracked_channels(&self, guild: GuildId) -> Vec<ChannelId> {
        self.guilds
            .get(&guild)
            .map(|entry| entry.owners.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn clear_tracked(&self, guild: GuildId) {
        if let Some(mut entry) = self.guilds.get_mut(&guild) {
            entry.owners.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUILD: GuildId = GuildId::new(1);
    const CHANNEL: ChannelId = ChannelId::new(10);
    const ALICE: UserId = UserId::new(100);
    const BOB: UserId = UserId::new(200);

    #[test]
    fn tracks_and_untracks_channels() {
        let registry = VoiceRegistry::new();
        registry.track(GUILD, CHANNEL, ALICE);
        assert_eq!(registry.owner_of(GUILD, CHANNEL), Some(ALICE));
        assert_eq!(registry.tracked_channels(GUILD), vec![CHANNEL]);

        registry.untrack(GUILD, CHANNEL);
        assert_eq!(registry.owner_of(GUILD, CHANNEL), None);
        assert!(registry.tracked_channels(GUILD).is_empty());
    }

    #[test]
    fn transfer_only_touches_tracked_channels() {
        let registry = VoiceRegistry::new();
        assert!(!registry.transfer(GUILD, CHANNEL, BOB));

        registry.track(GUILD, CHANNEL, ALICE);
        assert!(registry.transfer(GUILD, CHANNEL, BOB));
        assert_eq!(registry.owner_of(GUILD, CHANNEL), Some(BOB));
    }

    #[test]
    fn ownership_is_per_guild() {
        let registry = VoiceRegistry::new();
        let other = GuildId::new(2);
        registry.track(GUILD, CHANNEL, ALICE);
        assert_eq!(registry.owner_of(other, CHANNEL), None);
    }

    #[test]
    fn unresolved_layout_reads_back_as_none() {
        let registry = VoiceRegistry::new();
        assert_eq!(registry.layout(GUILD), None);

        let layout = GuildLayout {
            create_trigger: Some(ChannelId::new(20)),
            ..Default::default()
        };
        registry.set_layout(GUILD, layout);
        assert_eq!(registry.layout(GUILD), Some(layout));

        registry.invalidate_layout(GUILD);
        assert_eq!(registry.layout(GUILD), None);
    }

    #[test]
    fn layout_classifies_triggers_and_categories() {
        let layout = GuildLayout {
            public_category: Some(ChannelId::new(1)),
            private_category: Some(ChannelId::new(2)),
            create_trigger: Some(ChannelId::new(3)),
            random_trigger: Some(ChannelId::new(4)),
        };
        assert!(layout.is_trigger(ChannelId::new(3)));
        assert!(layout.is_trigger(ChannelId::new(4)));
        assert!(!layout.is_trigger(ChannelId::new(5)));
        assert!(layout.is_managed_category(Some(ChannelId::new(1))));
        assert!(layout.is_managed_category(Some(ChannelId::new(2))));
        assert!(!layout.is_managed_category(Some(ChannelId::new(9))));
        assert!(!layout.is_managed_category(None));
    }
}
