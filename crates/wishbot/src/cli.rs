use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wishbot")]
#[command(author, version, about = "Wish-list Telegram bot and Mini-App API", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// API server port (overrides API_PORT)
    #[arg(long, global = true)]
    pub port: Option<u16>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot (long polling) and the API server
    Run,

    /// Run only the API server
    Api,

    /// Run only the bot
    Bot,

    /// Print a signed initData string for local API testing
    DevInitData {
        /// Telegram user id to put into the payload
        #[arg(long)]
        user_id: i64,

        #[arg(long, default_value = "Dev")]
        first_name: String,

        #[arg(long)]
        username: Option<String>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::try_parse_from(["wishbot"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.port, None);
    }

    #[test]
    fn test_port_is_global() {
        let cli = Cli::try_parse_from(["wishbot", "api", "--port", "9000"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Api));
        assert_eq!(cli.port, Some(9000));
    }

    #[test]
    fn test_dev_init_data_args() {
        let cli = Cli::try_parse_from(["wishbot", "dev-init-data", "--user-id", "42"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::DevInitData {
                user_id: 42,
                first_name: "Dev".to_string(),
                username: None,
            })
        );
        assert!(Cli::try_parse_from(["wishbot", "dev-init-data"]).is_err());
    }
}
