use lazy_static::lazy_static;
use regex::Regex;
use teloxide::{
    prelude::*,
    types::{ChatAction, InputFile},
    utils::command::BotCommands,
    Bot,
};
use tracing::{info, instrument};

use crate::thumbnail::{Gradient, HttpFetcher, Renderer, Style, YtDlp};

pub type BotRenderer = Renderer<YtDlp, HttpFetcher>;

lazy_static! {
    static ref LINKED_ID: Regex =
        Regex::new(r"(?:[?&]v=|youtu\.be/|/shorts/|/live/|/embed/)([A-Za-z0-9_-]{11})").unwrap();
    static ref BARE_ID: Regex = Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap();
}

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "show this help.")]
    Help,
    #[command(description = "now-playing card: /thumb <link or id> [diagonal|radial]")]
    Thumb(String),
    #[command(description = "animated now-playing card: /pulse <link or id> [diagonal|radial]")]
    Pulse(String),
}

/// Pulls the 11-character video id out of a YouTube link, or takes a bare id.
pub fn extract_video_id(link: &str) -> Option<String> {
    let link = link.trim();
    if BARE_ID.is_match(link) {
        return Some(link.to_string());
    }
    LINKED_ID
        .captures(link)
        .map(|captures| captures[1].to_string())
}

/// "<link> [gradient]" → video id and style.
pub fn parse_request(args: &str, animated: bool) -> Result<(String, Style), String> {
    let mut parts = args.split_whitespace();
    let link = parts.next().ok_or("Send me a YouTube link or video id.")?;
    let video_id = extract_video_id(link).ok_or("That doesn't look like a YouTube link.")?;
    let gradient = match parts.next() {
        Some(name) => name.parse::<Gradient>()?,
        None => Gradient::Diagonal,
    };
    let style = if animated {
        Style::pulsing(gradient)
    } else {
        Style::still(gradient)
    };
    Ok((video_id, style))
}

#[instrument(skip_all, fields(chat_id = %msg.chat.id), err)]
pub async fn deal_with_message(
    bot: &Bot,
    msg: &Message,
    renderer: &BotRenderer,
    bot_name: &str,
) -> color_eyre::Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Ok(command) = Command::parse(text, bot_name) else {
        return Ok(()); // not for us
    };
    info!(?command, "Processing command");

    let (args, animated) = match command {
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .reply_to_message_id(msg.id)
                .await?;
            return Ok(());
        }
        Command::Thumb(args) => (args, false),
        Command::Pulse(args) => (args, true),
    };
    let (video_id, style) = match parse_request(&args, animated) {
        Ok(request) => request,
        Err(complaint) => {
            bot.send_message(msg.chat.id, complaint)
                .reply_to_message_id(msg.id)
                .await?;
            return Ok(());
        }
    };

    bot.send_chat_action(msg.chat.id, ChatAction::UploadPhoto)
        .await?;
    let link = format!("https://youtu.be/{video_id}");
    match renderer.render(&video_id, style).await {
        Some(path) if style.animated => {
            bot.send_animation(msg.chat.id, InputFile::file(path.into_std_path_buf()))
                .caption(link)
                .reply_to_message_id(msg.id)
                .await?;
        }
        Some(path) => {
            bot.send_photo(msg.chat.id, InputFile::file(path.into_std_path_buf()))
                .caption(link)
                .reply_to_message_id(msg.id)
                .await?;
        }
        None => {
            // No picture is fine, the link still gets through.
            bot.send_message(msg.chat.id, format!("🎵 {link}\n(no preview available)"))
                .reply_to_message_id(msg.id)
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_ids_in_links() {
        for link in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42",
            "https://youtu.be/dQw4w9WgXcQ?si=abc",
            "https://youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/live/dQw4w9WgXcQ",
            "dQw4w9WgXcQ",
        ] {
            assert_eq!(extract_video_id(link).as_deref(), Some("dQw4w9WgXcQ"), "{link}");
        }
        assert_eq!(extract_video_id("https://example.com/watch"), None);
        assert_eq!(extract_video_id("short"), None);
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            Command::parse("/thumb https://youtu.be/dQw4w9WgXcQ radial", "nowplaying_bot").ok(),
            Some(Command::Thumb("https://youtu.be/dQw4w9WgXcQ radial".to_string()))
        );
        assert_eq!(
            Command::parse("/pulse@nowplaying_bot dQw4w9WgXcQ", "nowplaying_bot").ok(),
            Some(Command::Pulse("dQw4w9WgXcQ".to_string()))
        );
    }

    #[test]
    fn parses_requests() {
        assert_eq!(
            parse_request("https://youtu.be/dQw4w9WgXcQ radial", false),
            Ok(("dQw4w9WgXcQ".to_string(), Style::still(Gradient::Radial)))
        );
        assert_eq!(
            parse_request("dQw4w9WgXcQ", true),
            Ok(("dQw4w9WgXcQ".to_string(), Style::pulsing(Gradient::Diagonal)))
        );
        assert!(parse_request("", false).is_err());
        assert!(parse_request("dQw4w9WgXcQ spiral", false).is_err());
    }
}
