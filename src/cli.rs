use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "vidrelay")]
#[command(author, version, about = "Telegram bot that downloads videos and relays them to chats", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot (default)
    Run {
        /// Use webhook mode instead of long polling
        #[arg(long)]
        webhook: bool,
    },

    /// Print video metadata without downloading anything
    Info {
        /// Video URL
        url: String,

        /// Print the raw metadata as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
