//! Command-line interface parsing and dispatch.

use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::config::Config;
use crate::logging;
use crate::relay::{self, RelayState};
use crate::ui::chat_loop::run_chat;

#[derive(Parser)]
#[command(name = "gemterm")]
#[command(about = "A terminal chat client for the Gemini API")]
#[command(
    long_about = "Gemterm is a full-screen terminal chat interface for the Gemini API. \
It streams responses incrementally, either directly from the client process or \
through a relay server that holds the credential.\n\n\
Environment Variables:\n\
  API_KEY           Gemini API key (required for direct mode and for the relay)\n\n\
Configuration (config.toml in the platform config directory):\n\
  mode              \"direct\" or \"proxied\" (default: proxied)\n\
  model             Model id (default: gemini-2.5-flash)\n\
  relay_url         Relay base URL for proxied mode\n\
  log_file          Optional diagnostic log file\n\n\
Controls:\n\
  Type              Enter your message in the input field\n\
  Enter             Send the message\n\
  Up/Down           Scroll through chat history\n\
  Ctrl+C            Quit the application"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Use an alternate configuration file
    #[arg(short = 'c', long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Run the relay server that proxied clients talk to
    Relay {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:3000")]
        listen: SocketAddr,
    },
}

pub async fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match args.command {
        None | Some(Commands::Chat) => {
            logging::init_for_tui(config.log_file.as_deref())?;
            run_chat(&config).await
        }
        Some(Commands::Relay { listen }) => {
            logging::init_for_server();
            let state = RelayState::from_env(config.model.clone());
            relay::serve(listen, state).await?;
            Ok(())
        }
    }
}
