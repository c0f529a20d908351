use std::{env::var, sync::Arc};

use color_eyre::Result;
use lazy_static::lazy_static;
use teloxide::prelude::*;
use tracing::{error, info};

use crate::thumbnail::{HttpFetcher, RenderConfig, Renderer, YtDlp};

mod telegram;
mod thumbnail;
mod utils;

lazy_static! {
    static ref RENDER_CONFIG: RenderConfig = RenderConfig::from_env();
    static ref YT_DLP_PATH: String = var("YT_DLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string());
}

#[tokio::main]
async fn main() -> Result<()> {
    utils::pre_flight()?;

    let renderer = Arc::new(Renderer::new(
        RENDER_CONFIG.clone(),
        YtDlp::new(YT_DLP_PATH.as_str()),
        HttpFetcher::default(),
    ));
    info!(cache_dir = %renderer.config().cache_dir, "Thumbnails cached in");

    let bot = Bot::from_env();
    let me = bot.get_me().await?;
    info!(?me, "Starting with");
    let bot_name = me.username().to_string();

    teloxide::repl(bot, move |bot: Bot, msg: Message| {
        let renderer = Arc::clone(&renderer);
        let bot_name = bot_name.clone();
        async move {
            if let Err(err) = telegram::deal_with_message(&bot, &msg, &renderer, &bot_name).await {
                error!(?err, "Something went wrong");
                bot.send_message(msg.chat.id, format!("Something went wrong: \n{err:?}"))
                    .await?;
            }
            Ok(())
        }
    })
    .await;
    Ok(())
}
