use std::{env, process, time::Duration};

use commands::build_commands;
use data::Data;
use event_handler::Handler;
use logging::{handle_framework_error, setup_logger, setup_panic_logger_hook};
use poise::{FrameworkError, PrefixFrameworkOptions};
use serenity::{all::GatewayIntents, Client};
use tokio::signal;

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

mod commands;
mod config;
mod data;
mod embeds;
mod event_handler;
mod features;
mod logging;
mod registry;
mod util;

async fn async_main() {
    let config = config::config();

    let options = poise::FrameworkOptions::<_, Error> {
        commands: build_commands(),
        prefix_options: PrefixFrameworkOptions {
            prefix: Some(config.prefix.clone()),
            case_insensitive_commands: true,
            ..Default::default()
        },
        // Commands only work inside allow-listed guilds. The gateway-level
        // filter already leaves foreign guilds, this covers the window
        // before that leave call resolves.
        command_check: Some(|cx: Context<'_>| {
            Box::pin(async move {
                Ok(cx
                    .guild_id()
                    .is_some_and(|id| config::config().is_guild_allowed(id)))
            })
        }),
        on_error: |err: FrameworkError<'_, Data, Error>| {
            Box::pin(async move {
                handle_framework_error(err).await;
            })
        },
        post_command: |cx: Context<'_>| {
            Box::pin(async move {
                log::info!(target: "voicemaster_bot::command", "@{} ({}) executed \"{}\"", cx.author().name, cx.author().id, cx.command().qualified_name);
            })
        },
        ..Default::default()
    };

    // One registry shared between the poise commands and the raw event
    // handler, so the lifecycle rules and the `vc` commands see the same
    // ownership records.
    let registry = registry::VoiceRegistry::new();

    let registry_clone = registry.clone();
    let framework = poise::Framework::builder()
        .setup(move |_cx, _ready, _framework| {
            Box::pin(async move {
                Ok(Data {
                    registry: registry_clone,
                })
            })
        })
        .options(options)
        .build();

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::MESSAGE_CONTENT;

    log::info!("Starting bot...");

    let mut client = Client::builder(&config.token, intents)
        .event_handler(Handler)
        .framework(framework)
        .type_map_insert::<data::RegistryKey>(registry)
        .await
        .expect("Unable to create the client");

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        let shutdown = async move {
            log::info!("Shutting down...");
            tokio::select! {
                _ = async move {
                    shard_manager.shutdown_all().await;
                } => {},
                _ = tokio::time::sleep(Duration::from_secs(5)) => {
                    log::error!("Unable to gracefully shutdown in time.");
                    process::exit(2);
                }
            }
            process::exit(0);
        };
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).unwrap();
        tokio::select! {
            _ = signal::ctrl_c() => shutdown.await,
            _ = sigterm.recv() => shutdown.await
        };
    });

    if let Err(err) = client.start().await {
        log::error!("Client error: {err:?}");
    }

    process::exit(1);
}

fn main() {
    // behavior of logger can be configured with environment variables,
    // so loads .env before setting up the logger.
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            panic!("{err}");
        }
    }

    setup_logger().expect("Unable to setup logger.");
    setup_panic_logger_hook();

    let _guard;
    if let Ok(sentry_dsn) = env::var("SENTRY_DSN") {
        _guard = sentry::init((
            sentry_dsn,
            sentry::ClientOptions {
                release: Some(
                    format!(
                        "{}@{}{}",
                        env!("CARGO_PKG_NAME"),
                        env!("CARGO_PKG_VERSION"),
                        option_env!("BUILD_COMMIT")
                            .map(|x| format!("+{}", x))
                            .unwrap_or_default()
                    )
                    .into(),
                ),
                ..Default::default()
            },
        ));
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async_main());
}
