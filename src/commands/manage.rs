use poise::CreateReply;
use serenity::all::{ChannelType, CreateChannel};

use crate::{config, embeds, features::temp_voice, registry::GuildLayout, util, Context, Error};

/// Set up the Voice Master categories and trigger channels.
///
/// Idempotent: existing categories and triggers are reused by name, only the
/// missing pieces are created.
#[poise::command(
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_CHANNELS",
    required_bot_permissions = "MANAGE_CHANNELS|MOVE_MEMBERS"
)]
pub async fn vmsetup(cx: Context<'_>) -> Result<(), Error> {
    let guild_id = cx.guild_id().ok_or("Guild-only command")?;
    let config = config::config();
    let channels = guild_id.channels(cx.http()).await?;

    let public_category = match util::find_category(&channels, &config.public_category) {
        Some(id) => id,
        None => {
            guild_id
                .create_channel(
                    cx.http(),
                    CreateChannel::new(&config.public_category).kind(ChannelType::Category),
                )
                .await?
                .id
        }
    };
    let private_category = match util::find_category(&channels, &config.private_category) {
        Some(id) => id,
        None => {
            guild_id
                .create_channel(
                    cx.http(),
                    CreateChannel::new(&config.private_category).kind(ChannelType::Category),
                )
                .await?
                .id
        }
    };

    let create_trigger = match util::find_trigger(&channels, &config.create_channel) {
        Some(id) => id,
        None => {
            guild_id
                .create_channel(
                    cx.http(),
                    CreateChannel::new(&config.create_channel)
                        .kind(ChannelType::Voice)
                        .category(public_category),
                )
                .await?
                .id
        }
    };
    let random_trigger = match util::find_trigger(&channels, &config.random_channel) {
        Some(id) => id,
        None => {
            guild_id
                .create_channel(
                    cx.http(),
                    CreateChannel::new(&config.random_channel)
                        .kind(ChannelType::Voice)
                        .category(public_category),
                )
                .await?
                .id
        }
    };

    cx.data().registry.set_layout(
        guild_id,
        GuildLayout {
            public_category: Some(public_category),
            private_category: Some(private_category),
            create_trigger: Some(create_trigger),
            random_trigger: Some(random_trigger),
        },
    );

    cx.send(CreateReply::default().embed(embeds::success("Voice Master setup complete!")))
        .await?;
    Ok(())
}

/// Tear down every managed voice channel, keeping categories and triggers.
#[poise::command(
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_CHANNELS",
    required_bot_permissions = "MANAGE_CHANNELS"
)]
pub async fn vmreset(cx: Context<'_>) -> Result<(), Error> {
    let guild_id = cx.guild_id().ok_or("Guild-only command")?;
    let registry = &cx.data().registry;
    let Some(layout) =
        temp_voice::resolve_layout(cx.serenity_context(), guild_id, registry).await
    else {
        cx.send(CreateReply::default().embed(embeds::failure("Voice Master is not set up.")))
            .await?;
        return Ok(());
    };

    let channels = guild_id.channels(cx.http()).await?;
    for channel in channels.values() {
        if channel.kind != ChannelType::Voice || layout.is_trigger(channel.id) {
            continue;
        }
        if layout.is_managed_category(channel.parent_id)
            || registry.owner_of(guild_id, channel.id).is_some()
        {
            if let Err(err) = channel.id.delete(cx.http()).await {
                log::debug!("Unable to delete channel {} on reset: {err:?}", channel.id);
            }
        }
    }

    registry.clear_tracked(guild_id);
    registry.invalidate_layout(guild_id);

    cx.send(CreateReply::default().embed(embeds::success("Voice Master has been reset!")))
        .await?;
    Ok(())
}
