//! Bot command set and bot instance creation

use anyhow::Context;
use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use wishcore::config;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
pub enum Command {
    #[command(description = "главное меню")]
    Start,
    #[command(description = "справка")]
    Help,
    #[command(description = "добавить желание")]
    Add,
    #[command(description = "мой список (топ-5)")]
    List,
    #[command(description = "поделиться списком")]
    Share,
}

/// Creates a Bot from the configured token with a bounded request timeout
pub fn create_bot() -> anyhow::Result<Bot> {
    if config::BOT_TOKEN.is_empty() {
        anyhow::bail!("BOT_TOKEN environment variable not set");
    }
    let client = ClientBuilder::new()
        .timeout(config::network::timeout())
        .build()
        .context("Failed to build HTTP client for the Bot API")?;

    Ok(Bot::with_client(config::BOT_TOKEN.as_str(), client))
}

/// Publishes the command list shown in the Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_descriptions() {
        let descriptions = Command::descriptions().to_string();
        assert!(descriptions.contains("Доступные команды"));
        for command in ["/start", "/help", "/add", "/list", "/share"] {
            assert!(descriptions.contains(command), "missing {}", command);
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/list", "wish_bot").unwrap(), Command::List);
        assert_eq!(Command::parse("/share@wish_bot", "wish_bot").unwrap(), Command::Share);
        assert!(Command::parse("/unknown", "wish_bot").is_err());
    }
}
