use poise::CreateReply;
use serenity::all::{
    CacheHttp, ChannelId, CreateEmbed, EditChannel, EditMember, GuildChannel, Member,
    PermissionOverwrite, PermissionOverwriteType, Permissions, RoleId,
};

use crate::{
    embeds,
    features::temp_voice::{self, OWNER_PERMISSIONS},
    util, Context, Error,
};

async fn reply(cx: Context<'_>, embed: CreateEmbed) -> Result<(), Error> {
    cx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

fn everyone(channel: &GuildChannel) -> PermissionOverwriteType {
    PermissionOverwriteType::Role(RoleId::new(channel.guild_id.get()))
}

/// The issuer's current voice channel, from the gateway cache.
fn current_voice_channel_id(cx: &Context<'_>) -> Option<ChannelId> {
    let guild = cx.guild()?;
    guild
        .voice_states
        .get(&cx.author().id)
        .and_then(|x| x.channel_id)
}

async fn fetch_channel(cx: &Context<'_>, channel: ChannelId) -> Result<GuildChannel, Error> {
    Ok(channel
        .to_channel(cx)
        .await?
        .guild()
        .ok_or("Not a guild channel")?)
}

/// Resolves the issuer's current voice channel, reporting a failure embed
/// and returning `None` when they aren't in one.
async fn voice_channel(cx: &Context<'_>) -> Result<Option<GuildChannel>, Error> {
    let Some(channel) = current_voice_channel_id(cx) else {
        reply(*cx, embeds::failure("You must be in a voice channel.")).await?;
        return Ok(None);
    };
    Ok(Some(fetch_channel(cx, channel).await?))
}

/// Like [`voice_channel`], but additionally requires the issuer to be the
/// registered owner of the channel. The failure embed names the action.
async fn owned_voice_channel(
    cx: &Context<'_>,
    action: &str,
) -> Result<Option<GuildChannel>, Error> {
    let Some(channel) = voice_channel(cx).await? else {
        return Ok(None);
    };
    let guild_id = cx.guild_id().ok_or("Guild-only command")?;
    let owner = cx.data().registry.owner_of(guild_id, channel.id);
    if owner != Some(cx.author().id) {
        reply(
            *cx,
            embeds::failure(format!("Only the channel owner can {}.", action)),
        )
        .await?;
        return Ok(None);
    }
    Ok(Some(channel))
}

/// Best-effort category move; a failure leaves the channel where it is.
async fn reparent(cx: &Context<'_>, channel: &GuildChannel, target: Option<ChannelId>) {
    let Some(target) = target else {
        return;
    };
    if channel.parent_id == Some(target) {
        return;
    }
    if let Err(err) = channel
        .id
        .edit(cx.http(), EditChannel::new().category(Some(target)))
        .await
    {
        log::debug!("Unable to move channel {}: {err:?}", channel.id);
    }
}

async fn layout_of(cx: &Context<'_>) -> Option<crate::registry::GuildLayout> {
    let guild_id = cx.guild_id()?;
    temp_voice::resolve_layout(cx.serenity_context(), guild_id, &cx.data().registry).await
}

/// Manage your voice channel.
#[poise::command(
    prefix_command,
    guild_only,
    subcommands(
        "lock", "unlock", "hide", "unhide", "kick", "ban", "permit", "limit", "rename",
        "transfer", "info", "unmute"
    )
)]
pub async fn vc(cx: Context<'_>) -> Result<(), Error> {
    reply(cx, embeds::failure("Specify a subcommand.")).await
}

/// Lock your voice channel and move it to the private category.
#[poise::command(prefix_command, guild_only)]
pub async fn lock(cx: Context<'_>) -> Result<(), Error> {
    let Some(channel) = owned_voice_channel(&cx, "lock").await? else {
        return Ok(());
    };
    util::edit_overwrite(
        cx.http(),
        &channel,
        everyone(&channel),
        Permissions::empty(),
        Permissions::CONNECT | Permissions::VIEW_CHANNEL,
    )
    .await?;
    let layout = layout_of(&cx).await;
    reparent(&cx, &channel, layout.and_then(|x| x.private_category)).await;
    reply(
        cx,
        embeds::success("VC has been locked and moved to private!"),
    )
    .await
}

/// Unlock your voice channel and make it public again.
#[poise::command(prefix_command, guild_only)]
pub async fn unlock(cx: Context<'_>) -> Result<(), Error> {
    let Some(channel) = owned_voice_channel(&cx, "unlock").await? else {
        return Ok(());
    };
    util::edit_overwrite(
        cx.http(),
        &channel,
        everyone(&channel),
        Permissions::CONNECT | Permissions::VIEW_CHANNEL,
        Permissions::empty(),
    )
    .await?;
    let layout = layout_of(&cx).await;
    reparent(&cx, &channel, layout.and_then(|x| x.public_category)).await;
    reply(
        cx,
        embeds::success("VC has been unlocked and is public again!"),
    )
    .await
}

/// Hide your voice channel from everyone.
#[poise::command(prefix_command, guild_only)]
pub async fn hide(cx: Context<'_>) -> Result<(), Error> {
    let Some(channel) = owned_voice_channel(&cx, "hide").await? else {
        return Ok(());
    };
    util::edit_overwrite(
        cx.http(),
        &channel,
        everyone(&channel),
        Permissions::empty(),
        Permissions::VIEW_CHANNEL,
    )
    .await?;
    reply(cx, embeds::success("Your VC is now hidden!")).await
}

/// Make your voice channel visible again.
#[poise::command(prefix_command, guild_only)]
pub async fn unhide(cx: Context<'_>) -> Result<(), Error> {
    let Some(channel) = owned_voice_channel(&cx, "unhide").await? else {
        return Ok(());
    };
    util::edit_overwrite(
        cx.http(),
        &channel,
        everyone(&channel),
        Permissions::VIEW_CHANNEL,
        Permissions::empty(),
    )
    .await?;
    reply(cx, embeds::success("Your VC is now visible!")).await
}

/// Kick a member out of your voice channel.
#[poise::command(prefix_command, guild_only)]
pub async fn kick(cx: Context<'_>, target: Member) -> Result<(), Error> {
    let Some(channel) = owned_voice_channel(&cx, "kick users").await? else {
        return Ok(());
    };
    let target_in_channel = cx.guild().is_some_and(|guild| {
        guild
            .voice_states
            .get(&target.user.id)
            .and_then(|x| x.channel_id)
            == Some(channel.id)
    });
    if !target_in_channel {
        return reply(cx, embeds::failure("User is not in your VC.")).await;
    }
    target.disconnect_from_voice(cx.http()).await?;
    reply(
        cx,
        embeds::success(format!(
            "{} has been kicked from your VC.",
            target.user.name
        )),
    )
    .await
}

/// Ban a member from connecting to your voice channel.
#[poise::command(prefix_command, guild_only)]
pub async fn ban(cx: Context<'_>, target: Member) -> Result<(), Error> {
    let Some(channel) = owned_voice_channel(&cx, "ban users").await? else {
        return Ok(());
    };
    util::edit_overwrite(
        cx.http(),
        &channel,
        PermissionOverwriteType::Member(target.user.id),
        Permissions::empty(),
        Permissions::CONNECT,
    )
    .await?;
    reply(
        cx,
        embeds::success(format!("{} has been banned from your VC.", target.user.name)),
    )
    .await
}

/// Allow a member to connect to your voice channel.
#[poise::command(prefix_command, guild_only)]
pub async fn permit(cx: Context<'_>, target: Member) -> Result<(), Error> {
    let Some(channel) = owned_voice_channel(&cx, "permit users").await? else {
        return Ok(());
    };
    util::edit_overwrite(
        cx.http(),
        &channel,
        PermissionOverwriteType::Member(target.user.id),
        Permissions::CONNECT,
        Permissions::empty(),
    )
    .await?;
    reply(
        cx,
        embeds::success(format!("{} is now allowed in your VC.", target.user.name)),
    )
    .await
}

/// Set the user limit of your voice channel.
#[poise::command(prefix_command, guild_only)]
pub async fn limit(cx: Context<'_>, count: u32) -> Result<(), Error> {
    let Some(channel) = voice_channel(&cx).await? else {
        return Ok(());
    };
    channel
        .id
        .edit(cx.http(), EditChannel::new().user_limit(count))
        .await?;
    reply(
        cx,
        embeds::success(format!("VC user limit set to {}.", count)),
    )
    .await
}

/// Rename your voice channel.
#[poise::command(prefix_command, guild_only)]
pub async fn rename(cx: Context<'_>, #[rest] name: String) -> Result<(), Error> {
    let Some(channel) = voice_channel(&cx).await? else {
        return Ok(());
    };
    if name.trim().is_empty() {
        return reply(cx, embeds::failure("Provide a new name.")).await;
    }
    let actor = cx.author();
    let reason = format!("Renamed by @{} ({})", actor.name, actor.id);
    channel
        .id
        .edit(
            cx.http(),
            EditChannel::new().name(&name).audit_log_reason(&reason),
        )
        .await?;
    reply(cx, embeds::success(format!("VC renamed to {}.", name))).await
}

/// Transfer ownership of your voice channel.
#[poise::command(prefix_command, guild_only)]
pub async fn transfer(cx: Context<'_>, target: Member) -> Result<(), Error> {
    let Some(channel) = owned_voice_channel(&cx, "transfer ownership").await? else {
        return Ok(());
    };
    let guild_id = cx.guild_id().ok_or("Guild-only command")?;
    // the old owner keeps plain access, the new owner gets the elevated set.
    channel
        .create_permission(
            cx.http(),
            PermissionOverwrite {
                allow: Permissions::CONNECT | Permissions::VIEW_CHANNEL,
                deny: Permissions::empty(),
                kind: PermissionOverwriteType::Member(cx.author().id),
            },
        )
        .await?;
    channel
        .create_permission(
            cx.http(),
            PermissionOverwrite {
                allow: OWNER_PERMISSIONS,
                deny: Permissions::empty(),
                kind: PermissionOverwriteType::Member(target.user.id),
            },
        )
        .await?;
    cx.data().registry.transfer(guild_id, channel.id, target.user.id);
    reply(
        cx,
        embeds::success(format!(
            "VC ownership transferred to {}.",
            target.user.name
        )),
    )
    .await
}

/// Show information about your voice channel.
#[poise::command(prefix_command, guild_only)]
pub async fn info(cx: Context<'_>) -> Result<(), Error> {
    let Some(channel) = voice_channel(&cx).await? else {
        return Ok(());
    };
    let guild_id = cx.guild_id().ok_or("Guild-only command")?;
    let owner = cx
        .data()
        .registry
        .owner_of(guild_id, channel.id)
        .map(|x| format!("<@{}>", x))
        .unwrap_or("unknown".to_string());
    let members = channel.members(cx).map(|x| x.len()).unwrap_or(0);
    let limit = channel
        .user_limit
        .filter(|x| *x > 0)
        .map(|x| x.to_string())
        .unwrap_or("None".to_string());
    reply(
        cx,
        embeds::info(
            "VC Info",
            format!(
                "Name: {}\nOwner: {}\nMembers: {}\nUser Limit: {}",
                channel.name, owner, members, limit
            ),
        ),
    )
    .await
}

/// Clear the server-mute on yourself.
#[poise::command(prefix_command, guild_only)]
pub async fn unmute(cx: Context<'_>) -> Result<(), Error> {
    let guild_id = cx.guild_id().ok_or("Guild-only command")?;
    match guild_id
        .edit_member(cx.http(), cx.author().id, EditMember::new().mute(false))
        .await
    {
        Ok(_) => reply(cx, embeds::success("You are now unmuted!")).await,
        Err(_) => reply(cx, embeds::failure("Unable to unmute you.")).await,
    }
}
