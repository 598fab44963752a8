use serenity::{
    all::{
        ActivityData, ChannelType, Context, EventHandler, Guild, GuildChannel, Message, Ready,
        VoiceState,
    },
    async_trait,
};

use crate::features::{guild_gate, temp_voice};

pub struct Handler;

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, cx: Context, ready: Ready) {
        log::info!("{} is connected!", ready.user.name);
        cx.set_presence(
            Some(ActivityData::listening("Join to Create")),
            serenity::all::OnlineStatus::Online,
        );

        let registry = temp_voice::registry_from(&cx).await;
        for guild in ready.guilds {
            if !guild_gate::enforce_allow_list(&cx, guild.id, "unknown").await {
                continue;
            }
            // warm the layout cache so the first voice event doesn't pay
            // for the name scan.
            if temp_voice::resolve_layout(&cx, guild.id, &registry).await.is_none() {
                log::info!("Voice Master layout not found in guild {}, waiting for vmsetup.", guild.id);
            }
        }
    }

    async fn guild_create(&self, cx: Context, guild: Guild, _is_new: Option<bool>) {
        guild_gate::enforce_allow_list(&cx, guild.id, &guild.name).await;
    }

    async fn channel_delete(
        &self,
        cx: Context,
        channel: GuildChannel,
        _messages: Option<Vec<Message>>,
    ) {
        if channel.kind == ChannelType::Voice {
            // drop the ownership record no matter who deleted the channel.
            let registry = temp_voice::registry_from(&cx).await;
            registry.untrack(channel.guild_id, channel.id);
        }
    }

    async fn voice_state_update(&self, cx: Context, old: Option<VoiceState>, new: VoiceState) {
        tokio::spawn(temp_voice::handle_voice_state_update(cx, old, new));
    }
}
