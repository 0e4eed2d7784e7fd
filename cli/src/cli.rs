use clap::Parser;
use std::path::PathBuf;

/// Terminal office assistant: chat with a hosted model and manage meetings
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding chat_history.json and meetings.json
    #[arg(long, env = "OFFICE_ASSISTANT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to the TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Start a new conversation (clears the saved chat history)
    #[arg(long, default_value_t = false)]
    pub new_chat: bool,

    /// Print replies at once instead of with the typing effect
    #[arg(long, default_value_t = false)]
    pub no_typing: bool,

    /// Show the current configuration and exit
    #[arg(long, default_value_t = false)]
    pub show_config: bool,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
