use honeypot_warden::{BOT_NAME, Data, Error, Settings, commands, handlers, logging};
use poise::serenity_prelude::{self as serenity, GatewayIntents};
use tracing::{error, info};

/// Main function to run the bot
async fn async_main() -> Result<(), Error> {
    let settings = Settings::from_env()?;
    logging::init(&settings.log_dir)?;
    info!(settings = ?settings, "Starting {BOT_NAME}");

    let data = Data::load(&settings.data_file).await;
    let framework_data = data.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![commands::honeypot()],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("!".into()),
                ..Default::default()
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_start(ctx);
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_end(ctx);
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    logging::log_command_error(&error);
                    if let Err(e) = poise::builtins::on_error(error).await {
                        error!("Error while handling framework error: {e}");
                    }
                })
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                logging::log_console("Registering commands globally");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(framework_data)
            })
        })
        .build();

    // Member lookups for exemptions and role stripping need the members intent
    let intents = GatewayIntents::non_privileged()
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS;
    let mut client = serenity::ClientBuilder::new(&settings.token, intents)
        .event_handler(handlers::Handler::new(data))
        .framework(framework)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            shard_manager.shutdown_all().await;
        }
    });

    info!("Starting bot...");
    client.start().await?;
    Ok(())
}

fn main() {
    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(Error::from)
        .and_then(|runtime| runtime.block_on(async_main()));

    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
